//! Info command implementation

use anyhow::{Context, Result};
use clap::Args;
use shardline_shamir::{PieceHeader, Prime, VALUE_WIDTH};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::utils;

#[derive(Args)]
pub struct InfoCommand {
    /// Piece files or directories of piece files to analyze
    #[arg(value_name = "PIECES", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Threshold to check the piece set against
    #[arg(short = 'k', long, value_name = "THRESHOLD")]
    pub threshold: Option<u32>,

    /// Show one row per piece
    #[arg(short, long)]
    pub detailed: bool,

    /// Output format for information
    #[arg(long, value_enum, default_value = "table")]
    pub output_format: InfoOutputFormat,
}

#[derive(clap::ValueEnum, Clone)]
pub enum InfoOutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Debug, serde::Serialize)]
struct PieceInfo {
    index: u32,
    prime: u32,
    payload_bytes: u64,
    secret_bytes: u64,
    file_path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
struct PieceSetInfo {
    total_pieces: usize,
    unique_indices: usize,
    prime: Option<u32>,
    secret_bytes: Option<u64>,
    required_pieces: u32,
    recoverable: bool,
    pieces: Vec<PieceInfo>,
    consistency_issues: Vec<String>,
}

impl InfoCommand {
    pub fn execute(&self, _config: &Config) -> Result<()> {
        let mut pieces = Vec::new();
        let mut issues = Vec::new();

        for input in &self.inputs {
            if input.is_dir() {
                self.analyze_directory(input, &mut pieces, &mut issues)?;
            } else {
                match analyze_file(input) {
                    Ok(info) => pieces.push(info),
                    Err(e) => issues.push(format!("{}: {:#}", input.display(), e)),
                }
            }
        }

        let set_info = self.analyze_piece_set(pieces, issues);
        self.output_info(&set_info)
    }

    fn analyze_directory(
        &self,
        dir: &Path,
        pieces: &mut Vec<PieceInfo>,
        issues: &mut Vec<String>,
    ) -> Result<()> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file()
                && path.extension().and_then(|e| e.to_str())
                    == Some(shardline_shamir::file::PIECE_EXTENSION)
            {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            match analyze_file(&path) {
                Ok(info) => pieces.push(info),
                Err(e) => issues.push(format!("{}: {:#}", path.display(), e)),
            }
        }

        Ok(())
    }

    fn analyze_piece_set(&self, pieces: Vec<PieceInfo>, mut issues: Vec<String>) -> PieceSetInfo {
        let mut index_counts = BTreeMap::new();
        for piece in &pieces {
            *index_counts.entry(piece.index).or_insert(0) += 1;
        }
        for (index, count) in &index_counts {
            if *count > 1 {
                issues.push(format!(
                    "Duplicate index: {} (appears {} times)",
                    index, count
                ));
            }
        }

        let prime = pieces.first().map(|piece| piece.prime);
        if let Some(expected) = prime {
            for piece in pieces.iter().filter(|piece| piece.prime != expected) {
                issues.push(format!(
                    "{} uses prime {}, expected {}",
                    piece.file_path.display(),
                    piece.prime,
                    expected
                ));
            }
            if let Err(e) = Prime::new(expected) {
                issues.push(e.to_string());
            }
        }

        let secret_bytes = pieces.first().map(|piece| piece.secret_bytes);
        if let Some(expected) = pieces.first().map(|piece| piece.payload_bytes) {
            for piece in pieces.iter().filter(|piece| piece.payload_bytes != expected) {
                issues.push(format!(
                    "{} holds {} bytes of share data, expected {}",
                    piece.file_path.display(),
                    piece.payload_bytes,
                    expected
                ));
            }
        }

        let required_pieces = self
            .threshold
            .unwrap_or(shardline_shamir::Shamir::MIN_THRESHOLD);
        let unique_indices = index_counts.len();
        let recoverable = issues.is_empty() && unique_indices >= required_pieces as usize;

        PieceSetInfo {
            total_pieces: pieces.len(),
            unique_indices,
            prime,
            secret_bytes,
            required_pieces,
            recoverable,
            pieces,
            consistency_issues: issues,
        }
    }

    fn output_info(&self, info: &PieceSetInfo) -> Result<()> {
        match self.output_format {
            InfoOutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(info)?);
            }
            InfoOutputFormat::Yaml => {
                println!("{}", serde_yaml::to_string(info)?);
            }
            InfoOutputFormat::Table => {
                self.output_table(info);
            }
        }
        Ok(())
    }

    fn output_table(&self, info: &PieceSetInfo) {
        println!("Piece Set Information");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━");

        println!("Total pieces: {}", info.total_pieces);
        println!("Unique indices: {}", info.unique_indices);

        match info.prime {
            Some(prime) => println!("Prime: {}", prime),
            None => println!("Prime: ?"),
        }
        if let Some(bytes) = info.secret_bytes {
            println!("Secret size: {}", utils::format_bytes(bytes));
        }

        if !info.consistency_issues.is_empty() {
            println!("\n⚠️  Consistency Issues:");
            for issue in &info.consistency_issues {
                println!("  • {}", issue);
            }
        }

        if self.detailed && !info.pieces.is_empty() {
            println!("\nIndividual Pieces:");
            println!("┌───────┬─────────┬─────────────┬──────────────────────────────┐");
            println!("│ Index │ Prime   │ Secret size │ File                         │");
            println!("├───────┼─────────┼─────────────┼──────────────────────────────┤");

            for piece in &info.pieces {
                println!(
                    "│ {:<5} │ {:<7} │ {:<11} │ {:<28} │",
                    piece.index,
                    piece.prime,
                    utils::format_bytes(piece.secret_bytes),
                    piece.file_path.display()
                );
            }
            println!("└───────┴─────────┴─────────────┴──────────────────────────────┘");
        }

        println!("\nRecovery Status:");
        if info.recoverable {
            println!(
                "✅ Sufficient pieces for recovery ({} >= {})",
                info.unique_indices, info.required_pieces
            );
        } else if !info.consistency_issues.is_empty() {
            println!("❌ Piece set is inconsistent");
        } else {
            println!(
                "❌ Insufficient pieces for recovery ({} < {})",
                info.unique_indices, info.required_pieces
            );
        }
    }
}

fn analyze_file(path: &Path) -> Result<PieceInfo> {
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
    );
    let (header, header_len) = PieceHeader::read_from(&mut reader)?;
    let payload_bytes = reader
        .get_ref()
        .metadata()?
        .len()
        .saturating_sub(header_len as u64);

    Ok(PieceInfo {
        index: header.index,
        prime: header.prime,
        payload_bytes,
        secret_bytes: payload_bytes / VALUE_WIDTH as u64,
        file_path: path.to_path_buf(),
    })
}
