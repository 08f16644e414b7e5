//! Piece representation and its 16-bit big-endian byte codec.
use crate::{Result, ShamirError};

/// Width of one encoded share value.
pub const VALUE_WIDTH: usize = 2;

/// One participant's share of a secret.
///
/// A piece pairs a share index (the x-coordinate every byte polynomial was
/// evaluated at) with one value per secret byte. The prime modulus is shared
/// by all pieces of a secret and is kept alongside them by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Piece {
    index: u32,
    values: Vec<u16>,
}

impl Piece {
    /// Creates a piece with the given index and share values.
    pub fn new(index: u32, values: Vec<u16>) -> Self {
        Self { index, values }
    }

    /// Returns the share index (x-coordinate) of this piece.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Returns the share values, one per secret byte.
    pub fn values(&self) -> &[u16] {
        &self.values
    }

    /// Returns the number of secret bytes this piece covers.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the piece covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Packs the values into bytes, big-endian, two bytes per value.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.values.len() * VALUE_WIDTH);
        encode_values(&self.values, &mut bytes);
        bytes
    }

    /// Unpacks a piece from its index and packed values.
    ///
    /// # Errors
    /// Returns `ShamirError::MalformedShare` if `bytes` has an odd length.
    pub fn from_bytes(index: u32, bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(index, decode_values(bytes)?))
    }
}

impl std::fmt::Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Piece(index={}, values=[", self.index)?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "])")
    }
}

/// Appends `values` to `out` as big-endian `u16`s.
pub fn encode_values(values: &[u16], out: &mut Vec<u8>) {
    out.reserve(values.len() * VALUE_WIDTH);
    for value in values {
        out.extend_from_slice(&value.to_be_bytes());
    }
}

/// Reads big-endian `u16`s from `bytes`.
pub fn decode_values(bytes: &[u8]) -> Result<Vec<u16>> {
    if bytes.len() % VALUE_WIDTH != 0 {
        return Err(ShamirError::MalformedShare(format!(
            "{} data bytes is not a whole number of {}-byte values",
            bytes.len(),
            VALUE_WIDTH
        )));
    }

    Ok(bytes
        .chunks_exact(VALUE_WIDTH)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_creation() {
        let piece = Piece::new(5, vec![10, 20, 30]);

        assert_eq!(piece.index(), 5);
        assert_eq!(piece.values(), &[10, 20, 30]);
        assert_eq!(piece.len(), 3);
        assert!(!piece.is_empty());
        assert!(Piece::new(1, vec![]).is_empty());
    }

    #[test]
    fn test_big_endian_layout() {
        let piece = Piece::new(2, vec![0x1234, 7918, 0]);
        assert_eq!(piece.to_bytes(), vec![0x12, 0x34, 0x1e, 0xee, 0x00, 0x00]);

        let decoded = Piece::from_bytes(2, &piece.to_bytes()).unwrap();
        assert_eq!(decoded, piece);
    }

    #[test]
    fn test_odd_length_is_malformed() {
        assert!(matches!(
            Piece::from_bytes(1, &[0x00, 0x01, 0x02]),
            Err(ShamirError::MalformedShare(_))
        ));
        assert!(Piece::from_bytes(1, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_encode_appends() {
        let mut out = vec![0xff];
        encode_values(&[1, 256], &mut out);
        assert_eq!(out, vec![0xff, 0x00, 0x01, 0x01, 0x00]);
    }

    #[test]
    fn test_display() {
        let piece = Piece::new(1, vec![2, 3]);
        assert_eq!(format!("{}", piece), "Piece(index=1, values=[2, 3])");
    }
}
