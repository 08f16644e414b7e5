//! Validation of share sets and piece files.
//!
//! Every check runs before any field arithmetic, so interpolation never
//! produces a result from malformed or inconsistent input.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use hashbrown::HashSet;

use crate::field::Prime;
use crate::poly::Point;
use crate::share::{Piece, VALUE_WIDTH};
use crate::stream::PieceHeader;
use crate::{Result, ShamirError};

/// Fewest points that can determine the constant term of a polynomial of
/// degree two or more.
pub const MIN_POINTS: usize = 3;

/// Checks a set of points before interpolating one byte.
///
/// # Errors
/// * `ShamirError::InsufficientPoints` - fewer than three points
/// * `ShamirError::MalformedShare` - an x-coordinate of zero or not below the prime
/// * `ShamirError::PrimeTooSmall` - a y-value not below the prime
/// * `ShamirError::DuplicateIndex` - two points share an x-coordinate
pub fn validate_points(points: &[Point], prime: Prime) -> Result<()> {
    require_points(points.len())?;

    let mut seen = HashSet::with_capacity(points.len());
    for point in points {
        check_index(point.x, prime)?;
        check_value(point.y, prime)?;
        if !seen.insert(point.x) {
            return Err(ShamirError::DuplicateIndex(point.x));
        }
    }

    Ok(())
}

/// Checks that a set of pieces is structurally usable.
///
/// # Errors
/// * `ShamirError::InsufficientPoints` - fewer than three pieces
/// * `ShamirError::MalformedShare` - a piece with index zero
/// * `ShamirError::MismatchedShareLengths` - pieces cover different byte counts
/// * `ShamirError::DuplicateIndex` - two pieces share an index
pub fn validate_pieces(pieces: &[Piece]) -> Result<()> {
    require_points(pieces.len())?;

    let expected = pieces[0].len();
    let mut seen = HashSet::with_capacity(pieces.len());

    for piece in pieces {
        if piece.index() == 0 {
            return Err(ShamirError::MalformedShare(
                "index 0 would hold the secret itself".to_string(),
            ));
        }

        if piece.len() != expected {
            return Err(ShamirError::MismatchedShareLengths {
                expected,
                found: piece.len(),
            });
        }

        if !seen.insert(piece.index()) {
            return Err(ShamirError::DuplicateIndex(piece.index()));
        }
    }

    Ok(())
}

/// Checks every index and value of `pieces` against `prime`.
pub fn validate_piece_values(pieces: &[Piece], prime: Prime) -> Result<()> {
    for piece in pieces {
        check_index(piece.index(), prime)?;
        if let Some(&value) = piece.values().iter().max() {
            check_value(u32::from(value), prime)?;
        }
    }
    Ok(())
}

/// Checks that piece-file headers describe one consistent share set.
///
/// # Errors
/// * `ShamirError::DuplicateIndex` - two files declare the same index
/// * `ShamirError::PrimeMismatch` - files declare different primes
pub fn validate_headers(headers: &[PieceHeader]) -> Result<()> {
    let Some(first) = headers.first() else {
        return Ok(());
    };

    let mut seen = HashSet::with_capacity(headers.len());
    for header in headers {
        if !seen.insert(header.index) {
            return Err(ShamirError::DuplicateIndex(header.index));
        }
        if header.prime != first.prime {
            return Err(ShamirError::PrimeMismatch {
                expected: first.prime,
                found: header.prime,
            });
        }
    }

    Ok(())
}

/// Checks that every piece file carries the same amount of share data.
///
/// Headers are excluded from the comparison, since their length depends on
/// the number of digits in the index. Returns the common payload length.
///
/// # Errors
/// * `ShamirError::MismatchedFileSize` - payload sizes differ
/// * `ShamirError::MalformedShare` - a header cannot be parsed or a payload
///   is not a whole number of values
pub fn validate_piece_files<P: AsRef<Path>>(paths: &[P]) -> Result<u64> {
    let mut expected = None;

    for path in paths {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let (_, header_len) = PieceHeader::read_from(&mut reader)?;
        let payload = reader
            .get_ref()
            .metadata()?
            .len()
            .saturating_sub(header_len as u64);

        if payload % VALUE_WIDTH as u64 != 0 {
            return Err(ShamirError::MalformedShare(format!(
                "{} holds {} data bytes, not a whole number of values",
                path.display(),
                payload
            )));
        }

        match expected {
            None => expected = Some(payload),
            Some(size) if size != payload => {
                return Err(ShamirError::MismatchedFileSize {
                    path: path.to_path_buf(),
                    expected: size,
                    found: payload,
                });
            }
            Some(_) => {}
        }
    }

    Ok(expected.unwrap_or(0))
}

fn require_points(provided: usize) -> Result<()> {
    if provided < MIN_POINTS {
        return Err(ShamirError::InsufficientPoints {
            required: MIN_POINTS,
            provided,
        });
    }
    Ok(())
}

fn check_index(index: u32, prime: Prime) -> Result<()> {
    if index == 0 || index >= prime.value() {
        return Err(ShamirError::MalformedShare(format!(
            "index {} is outside 1..{}",
            index, prime
        )));
    }
    Ok(())
}

fn check_value(value: u32, prime: Prime) -> Result<()> {
    if value >= prime.value() {
        return Err(ShamirError::PrimeTooSmall {
            value,
            prime: prime.value(),
        });
    }
    Ok(())
}
