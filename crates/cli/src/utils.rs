//! Utility functions

use log::info;
use shardline_shamir::Progress;

use crate::error::CliError;

/// Format bytes as human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Parse a 32-byte hex seed for deterministic coefficients
pub fn parse_seed(hex_seed: &str) -> Result<[u8; 32], CliError> {
    let bytes = hex::decode(hex_seed.trim()).map_err(|e| CliError::InvalidSeed(e.to_string()))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        CliError::InvalidSeed(format!(
            "expected 32 bytes (64 hex characters), got {}",
            bytes.len()
        ))
    })
}

/// Logs progress of an operation in steps of ten percent.
pub struct ProgressLog {
    label: &'static str,
    total: u64,
    done: u64,
    last_step: Option<u64>,
}

impl ProgressLog {
    pub fn new(label: &'static str, total: u64) -> Self {
        Self {
            label,
            total,
            done: 0,
            last_step: None,
        }
    }

    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            100
        } else {
            (self.done.min(self.total) * 100) / self.total
        }
    }
}

impl Progress for ProgressLog {
    fn advance(&mut self, bytes: u64) -> shardline_shamir::Result<()> {
        self.done += bytes;
        let percent = self.percent();
        let step = percent / 10;
        if self.last_step != Some(step) {
            self.last_step = Some(step);
            info!(
                "{}: {}% ({} of {})",
                self.label,
                percent,
                format_bytes(self.done),
                format_bytes(self.total)
            );
        }
        Ok(())
    }
}
