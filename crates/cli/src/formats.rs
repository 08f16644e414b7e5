//! Text and JSON transport of in-memory pieces

use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use shardline_shamir::{Piece, Prime};

use crate::error::CliError;

#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One `INDEX:BASE64` line per piece
    Text,
    /// A piece set object carrying the prime
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    Text,
    Json,
}

impl InputFormat {
    pub fn detect(content: &str) -> Self {
        let content = content.trim();

        if content.starts_with('{') && content.ends_with('}') {
            Self::Json
        } else {
            Self::Text
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PieceData {
    /// Share index (x-coordinate)
    pub index: u32,

    /// Url-safe base64 of the big-endian 16-bit values
    pub data: String,
}

impl PieceData {
    pub fn from_piece(piece: &Piece) -> Self {
        Self {
            index: piece.index(),
            data: URL_SAFE.encode(piece.to_bytes()),
        }
    }

    pub fn into_piece(self) -> Result<Piece> {
        let bytes = URL_SAFE
            .decode(self.data.trim())
            .map_err(|source| CliError::InvalidEncoding {
                index: self.index,
                source,
            })?;
        Piece::from_bytes(self.index, &bytes)
            .with_context(|| format!("Failed to decode piece {}", self.index))
    }

    pub fn to_line(&self) -> String {
        format!("{}:{}", self.index, self.data)
    }

    /// Parses `INDEX:BASE64`.
    pub fn from_line(line: &str) -> Result<Self, CliError> {
        let line = line.trim();
        let (index, data) = line
            .split_once(':')
            .ok_or_else(|| CliError::InvalidPiece(line.to_string()))?;
        let index = index
            .trim()
            .parse()
            .map_err(|_| CliError::InvalidPiece(line.to_string()))?;

        Ok(Self {
            index,
            data: data.trim().to_string(),
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PieceSet {
    pub prime: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u32>,

    pub pieces: Vec<PieceData>,
}

impl PieceSet {
    pub fn new(pieces: &[Piece], prime: Prime, threshold: u32) -> Self {
        Self {
            prime: prime.value(),
            threshold: Some(threshold),
            pieces: pieces.iter().map(PieceData::from_piece).collect(),
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(self).context("Failed to serialize pieces")
            }
            OutputFormat::Text => Ok(self
                .pieces
                .iter()
                .map(PieceData::to_line)
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }
}

/// Pieces read back from text or JSON, with whatever parameters the input records.
#[derive(Debug)]
pub struct ParsedPieces {
    pub prime: Option<u32>,
    pub threshold: Option<u32>,
    pub pieces: Vec<Piece>,
}

pub fn parse_pieces(content: &str) -> Result<ParsedPieces> {
    match InputFormat::detect(content) {
        InputFormat::Json => {
            let set: PieceSet =
                serde_json::from_str(content).context("Failed to parse JSON piece set")?;
            Ok(ParsedPieces {
                prime: Some(set.prime),
                threshold: set.threshold,
                pieces: set
                    .pieces
                    .into_iter()
                    .map(PieceData::into_piece)
                    .collect::<Result<_>>()?,
            })
        }
        InputFormat::Text => Ok(ParsedPieces {
            prime: None,
            threshold: None,
            pieces: parse_piece_lines(content.lines())?,
        }),
    }
}

/// Parses `INDEX:BASE64` entries, skipping blank lines.
pub fn parse_piece_lines<'a, I>(lines: I) -> Result<Vec<Piece>>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| PieceData::from_line(line)?.into_piece())
        .collect()
}
