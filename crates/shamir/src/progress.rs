//! Progress reporting and cancellation.
use crate::Result;

/// Receives progress after each unit of work.
///
/// `advance` is called with the number of secret bytes just processed: one
/// per byte for in-memory operations, one chunk's worth for streams.
/// Returning an error (typically `ShamirError::Aborted`) stops the operation;
/// the error propagates to the caller and every open handle is dropped.
///
/// Any `FnMut(u64) -> Result<()>` closure is a `Progress`.
pub trait Progress {
    fn advance(&mut self, bytes: u64) -> Result<()>;
}

/// Ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    #[inline]
    fn advance(&mut self, _bytes: u64) -> Result<()> {
        Ok(())
    }
}

impl<F> Progress for F
where
    F: FnMut(u64) -> Result<()>,
{
    #[inline]
    fn advance(&mut self, bytes: u64) -> Result<()> {
        self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShamirError;

    #[test]
    fn test_closure_progress() {
        let mut total = 0;
        let mut progress = |bytes: u64| -> Result<()> {
            total += bytes;
            Ok(())
        };
        progress.advance(3).unwrap();
        progress.advance(4).unwrap();
        assert_eq!(total, 7);
    }

    #[test]
    fn test_closure_can_abort() {
        let mut progress = |_: u64| -> Result<()> { Err(ShamirError::Aborted) };
        assert!(matches!(progress.advance(1), Err(ShamirError::Aborted)));
        assert!(NoProgress.advance(1).is_ok());
    }
}
