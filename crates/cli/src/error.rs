//! Error handling

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid piece '{0}': expected INDEX:BASE64")]
    InvalidPiece(String),

    #[error("Invalid piece data for index {index}: {source}")]
    InvalidEncoding {
        index: u32,
        source: base64::DecodeError,
    },

    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
