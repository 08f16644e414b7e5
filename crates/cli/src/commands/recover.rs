//! Recover command implementation

use anyhow::{bail, Context, Result};
use clap::Args;
use log::info;
use shardline_shamir::{file, validate, Prime, StreamOptions, VALUE_WIDTH};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use crate::config::Config;
use crate::formats::{self, ParsedPieces};
use crate::utils::{self, ProgressLog};

#[derive(Args)]
pub struct RecoverCommand {
    /// Piece files (`.shard`) to recover a file from
    #[arg(value_name = "PIECES")]
    pub pieces: Vec<PathBuf>,

    /// Destination file (required for piece files; stdout otherwise)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Text-mode piece as INDEX:BASE64 (repeatable)
    #[arg(long = "piece", value_name = "INDEX:BASE64")]
    pub piece_args: Vec<String>,

    /// Read text or JSON pieces from a file ('-' for stdin)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<String>,

    /// Prime the text-mode pieces were generated with
    #[arg(long, value_name = "PRIME")]
    pub prime: Option<u32>,

    /// Secret bytes processed per window for piece files
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<usize>,
}

impl RecoverCommand {
    pub fn execute(&self, config: &Config) -> Result<()> {
        let sources = [
            !self.pieces.is_empty(),
            !self.piece_args.is_empty(),
            self.input.is_some(),
        ];
        match sources.iter().filter(|&&x| x).count() {
            0 => bail!("No pieces provided: pass piece files, --piece or --input"),
            1 => {}
            _ => bail!("Piece files, --piece and --input cannot be combined"),
        }

        if self.pieces.is_empty() {
            self.recover_text(config)
        } else {
            self.recover_files(config)
        }
    }

    fn recover_files(&self, config: &Config) -> Result<()> {
        let Some(destination) = &self.output else {
            bail!("--output is required when recovering from piece files");
        };
        if self.prime.is_some() {
            bail!("--prime applies to text-mode pieces only; piece files record their prime");
        }

        let payload = validate::validate_piece_files(&self.pieces)
            .context("Piece files are inconsistent")?;
        let total = payload / VALUE_WIDTH as u64;
        let options = StreamOptions::with_chunk_size(config.chunk_size(self.chunk_size)?);
        let mut progress = ProgressLog::new("recover", total);

        file::interpolate_file_with(&self.pieces, destination, &options, &mut progress)
            .context("Failed to recover file from pieces")?;

        info!(
            "Recovered {} ({}) from {} pieces",
            destination.display(),
            utils::format_bytes(total),
            self.pieces.len()
        );
        Ok(())
    }

    fn recover_text(&self, config: &Config) -> Result<()> {
        let parsed = match &self.input {
            Some(input) => formats::parse_pieces(&read_input(input)?)?,
            None => ParsedPieces {
                prime: None,
                threshold: None,
                pieces: formats::parse_piece_lines(self.piece_args.iter().map(String::as_str))?,
            },
        };

        let prime = self.resolve_prime(parsed.prime, config)?;
        if let Some(threshold) = parsed.threshold {
            if parsed.pieces.len() < threshold as usize {
                bail!(
                    "These pieces need {} to recover the secret, but only {} were given",
                    threshold,
                    parsed.pieces.len()
                );
            }
        }

        let total = parsed.pieces.first().map_or(0, |piece| piece.len() as u64);
        let mut progress = ProgressLog::new("recover", total);

        let secret = Zeroizing::new(
            shardline_shamir::interpolate_with_progress(&parsed.pieces, prime, &mut progress)
                .context("Failed to recover secret from pieces")?,
        );

        match &self.output {
            Some(path) => write_secret(path, &secret)?,
            None => io::stdout()
                .write_all(&secret)
                .context("Failed to write to stdout")?,
        }

        info!("Secret recovered from {} pieces", parsed.pieces.len());
        Ok(())
    }

    fn resolve_prime(&self, recorded: Option<u32>, config: &Config) -> Result<Prime> {
        match (self.prime, recorded) {
            (Some(flag), Some(recorded)) if flag != recorded => bail!(
                "--prime {} disagrees with the prime {} recorded with the pieces",
                flag,
                recorded
            ),
            (flag, recorded) => Ok(config.prime(flag.or(recorded))?),
        }
    }
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read from stdin")?;
        Ok(content)
    } else {
        fs::read_to_string(input).with_context(|| format!("Failed to read file: {}", input))
    }
}

fn write_secret(path: &Path, secret: &[u8]) -> Result<()> {
    fs::write(path, secret).with_context(|| format!("Failed to write to file: {}", path.display()))
}
