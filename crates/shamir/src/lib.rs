//! Shamir's Secret Sharing over a small prime field.
//!
//! A secret is split byte by byte: every byte becomes the constant term of a
//! fresh random polynomial of degree `threshold - 1`, evaluated modulo a
//! prime at the indices `1..=pieces`. Any `threshold` pieces recover the
//! byte by Lagrange interpolation; fewer reveal nothing about it.
//!
//! Share values are below the prime, which never exceeds `2^16`, so each is
//! stored as a big-endian `u16`. The [`stream`] and [`file`] modules apply
//! the scheme to arbitrarily large inputs in fixed windows.

pub mod field;
pub mod file;
pub mod poly;
pub mod progress;
mod share;
pub mod stream;
pub mod validate;

use std::path::PathBuf;

pub use field::Prime;
pub use file::{generate_file_with, interpolate_file, interpolate_file_with, piece_path};
#[cfg(feature = "std")]
pub use file::generate_file;
pub use poly::Point;
pub use progress::{NoProgress, Progress};
pub use share::{decode_values, encode_values, Piece, VALUE_WIDTH};
pub use stream::{
    Decoder, Encoder, PieceHeader, StreamOptions, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE,
};

/// Errors that can occur during secret sharing operations.
#[derive(Debug, thiserror::Error)]
pub enum ShamirError {
    /// Not enough points or pieces to interpolate
    #[error("need at least {required} shares, but only {provided} provided")]
    InsufficientPoints { required: usize, provided: usize },
    /// A share value is not below the modulus
    #[error("share value {value} is not below the prime {prime}")]
    PrimeTooSmall { value: u32, prime: u32 },
    /// A share or piece file is structurally invalid
    #[error("malformed share: {0}")]
    MalformedShare(String),
    /// Pieces cover different numbers of secret bytes
    #[error("shares have different lengths: expected {expected}, found {found}")]
    MismatchedShareLengths { expected: usize, found: usize },
    /// Two shares carry the same index
    #[error("duplicate share with index {0}")]
    DuplicateIndex(u32),
    /// Piece files were produced with different primes
    #[error("pieces use different primes: expected {expected}, found {found}")]
    PrimeMismatch { expected: u32, found: u32 },
    /// Piece files carry different amounts of share data
    #[error("{} holds {found} bytes of share data, expected {expected}", path.display())]
    MismatchedFileSize {
        path: PathBuf,
        expected: u64,
        found: u64,
    },
    /// Threshold outside `3..=pieces`
    #[error("threshold {threshold} must be at least 3 and at most the piece count {pieces}")]
    InvalidThreshold { threshold: u32, pieces: u32 },
    /// More pieces than non-zero field elements
    #[error("{pieces} pieces need a prime larger than {prime}")]
    TooManyPieces { pieces: u32, prime: u32 },
    /// Modulus is composite or out of range
    #[error("{0} is not a prime in 256..=65536")]
    InvalidPrime(u32),
    /// A byte position interpolated to a value that is not a byte
    #[error("shares are inconsistent: byte {position} interpolated to {value}")]
    InconsistentShares { position: usize, value: u32 },
    /// An encoder was given the wrong number of sinks
    #[error("expected {expected} piece outputs, got {found}")]
    SinkCountMismatch { expected: u32, found: usize },
    /// Cancelled by a progress receiver
    #[error("operation aborted")]
    Aborted,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ShamirError>;

/// A `threshold`-of-`pieces` sharing scheme over a prime field.
///
/// # Examples
/// ```
/// use shardline_shamir::{NoProgress, Shamir};
/// use rand_chacha::rand_core::SeedableRng;
///
/// let shamir = Shamir::new(5, 3).unwrap();
/// let mut rng = rand_chacha::ChaCha8Rng::from_seed([0x90; 32]);
/// let pieces = shamir
///     .generate_buffer(b"Hello world!", &mut rng, &mut NoProgress)
///     .unwrap();
///
/// let recovered = shamir.interpolate(&pieces[1..4]).unwrap();
/// assert_eq!(&recovered, b"Hello world!");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shamir {
    pieces: u32,
    threshold: u32,
    prime: Prime,
}

impl Shamir {
    /// Smallest supported threshold.
    pub const MIN_THRESHOLD: u32 = validate::MIN_POINTS as u32;

    /// Creates a scheme over [`Prime::DEFAULT`].
    ///
    /// # Errors
    /// See [`Shamir::with_prime`].
    pub fn new(pieces: u32, threshold: u32) -> Result<Self> {
        Self::with_prime(pieces, threshold, Prime::DEFAULT)
    }

    /// Creates a scheme over `prime`.
    ///
    /// # Errors
    /// * `ShamirError::InvalidThreshold` - threshold below 3 or above `pieces`
    /// * `ShamirError::TooManyPieces` - `pieces` is not below the prime, so
    ///   some index would coincide with another modulo `prime`
    pub fn with_prime(pieces: u32, threshold: u32, prime: Prime) -> Result<Self> {
        if threshold < Self::MIN_THRESHOLD || threshold > pieces {
            return Err(ShamirError::InvalidThreshold { threshold, pieces });
        }
        if pieces >= prime.value() {
            return Err(ShamirError::TooManyPieces {
                pieces,
                prime: prime.value(),
            });
        }
        Ok(Self {
            pieces,
            threshold,
            prime,
        })
    }

    pub fn pieces(&self) -> u32 {
        self.pieces
    }

    /// Minimum number of pieces required to recover a secret.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn prime(&self) -> Prime {
        self.prime
    }

    /// Splits `secret` into pieces using the provided random number generator.
    ///
    /// `progress` advances by one after each secret byte. An empty secret
    /// yields empty pieces.
    pub fn generate_buffer<R, P>(
        &self,
        secret: &[u8],
        rng: &mut R,
        progress: &mut P,
    ) -> Result<Vec<Piece>>
    where
        R: rand::Rng + ?Sized,
        P: Progress + ?Sized,
    {
        poly::generate_buffer(
            secret,
            self.pieces,
            self.threshold,
            self.prime,
            rng,
            progress,
        )
    }

    /// Splits `secret` using the thread-local random number generator.
    #[cfg(feature = "std")]
    pub fn generate(&self, secret: &[u8]) -> Result<Vec<Piece>> {
        self.generate_buffer(secret, &mut rand::thread_rng(), &mut NoProgress)
    }

    /// Recovers a secret from at least `threshold` pieces of this scheme.
    ///
    /// # Errors
    /// * `ShamirError::InsufficientPoints` - fewer than `threshold` pieces
    /// * Any error from [`poly::interpolate_buffer`]
    pub fn interpolate(&self, pieces: &[Piece]) -> Result<Vec<u8>> {
        if pieces.len() < self.threshold as usize {
            return Err(ShamirError::InsufficientPoints {
                required: self.threshold as usize,
                provided: pieces.len(),
            });
        }
        poly::interpolate_buffer(pieces, self.prime, &mut NoProgress)
    }
}

/// Splits `secret` into `pieces` pieces over the default prime, any
/// `threshold` of which recover it. Returns the pieces with the prime they
/// must be recovered with.
///
/// # Examples
/// ```
/// let (pieces, prime) = shardline_shamir::generate(b"pin: 4921", 6, 4).unwrap();
/// assert_eq!(pieces.len(), 6);
///
/// let recovered = shardline_shamir::interpolate(&pieces[2..], prime).unwrap();
/// assert_eq!(&recovered, b"pin: 4921");
/// ```
#[cfg(feature = "std")]
pub fn generate(secret: &[u8], pieces: u32, threshold: u32) -> Result<(Vec<Piece>, Prime)> {
    generate_with_progress(secret, pieces, threshold, &mut NoProgress)
}

/// [`generate`] reporting progress after each byte.
#[cfg(feature = "std")]
pub fn generate_with_progress<P: Progress + ?Sized>(
    secret: &[u8],
    pieces: u32,
    threshold: u32,
    progress: &mut P,
) -> Result<(Vec<Piece>, Prime)> {
    let scheme = Shamir::new(pieces, threshold)?;
    let pieces = scheme.generate_buffer(secret, &mut rand::thread_rng(), progress)?;
    Ok((pieces, scheme.prime()))
}

/// Recovers a secret from pieces generated with `prime`.
pub fn interpolate(pieces: &[Piece], prime: Prime) -> Result<Vec<u8>> {
    interpolate_with_progress(pieces, prime, &mut NoProgress)
}

/// [`interpolate`] reporting progress after each byte.
pub fn interpolate_with_progress<P: Progress + ?Sized>(
    pieces: &[Piece],
    prime: Prime,
    progress: &mut P,
) -> Result<Vec<u8>> {
    poly::interpolate_buffer(pieces, prime, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;

    fn subsets(n: usize, k: usize) -> Vec<Vec<usize>> {
        if k == 0 {
            return vec![vec![]];
        }
        if n < k {
            return vec![];
        }
        let mut with_last = subsets(n - 1, k - 1);
        for subset in &mut with_last {
            subset.push(n - 1);
        }
        let mut result = subsets(n - 1, k);
        result.extend(with_last);
        result
    }

    #[test]
    fn test_scheme_validation() {
        assert!(Shamir::new(5, 3).is_ok());
        assert!(Shamir::new(3, 3).is_ok());

        assert!(matches!(
            Shamir::new(5, 2),
            Err(ShamirError::InvalidThreshold {
                threshold: 2,
                pieces: 5
            })
        ));
        assert!(matches!(
            Shamir::new(4, 5),
            Err(ShamirError::InvalidThreshold { .. })
        ));

        let small = Prime::new(257).unwrap();
        assert!(Shamir::with_prime(256, 3, small).is_ok());
        assert!(matches!(
            Shamir::with_prime(257, 3, small),
            Err(ShamirError::TooManyPieces {
                pieces: 257,
                prime: 257
            })
        ));
    }

    #[test]
    fn test_every_threshold_subset_recovers() {
        let shamir = Shamir::new(6, 3).unwrap();
        let mut rng = rand_chacha::ChaCha8Rng::from_seed([0x90; 32]);
        let secret = b"Hello world!";
        let pieces = shamir
            .generate_buffer(secret, &mut rng, &mut NoProgress)
            .unwrap();

        for k in 3..=6 {
            for subset in subsets(6, k) {
                let chosen: Vec<Piece> = subset.iter().map(|&i| pieces[i].clone()).collect();
                assert_eq!(shamir.interpolate(&chosen).unwrap(), secret, "{subset:?}");
            }
        }
    }

    #[test]
    fn test_below_threshold_is_refused() {
        let shamir = Shamir::new(5, 4).unwrap();
        let mut rng = rand_chacha::ChaCha8Rng::from_seed([1; 32]);
        let pieces = shamir.generate_buffer(b"abc", &mut rng, &mut NoProgress).unwrap();

        assert!(matches!(
            shamir.interpolate(&pieces[..3]),
            Err(ShamirError::InsufficientPoints {
                required: 4,
                provided: 3
            })
        ));
    }

    #[test]
    fn test_empty_and_single_byte() {
        let (pieces, prime) = generate(b"", 3, 3).unwrap();
        assert!(pieces.iter().all(Piece::is_empty));
        assert!(interpolate(&pieces, prime).unwrap().is_empty());

        for byte in [0u8, 1, 127, 255] {
            let (pieces, prime) = generate(&[byte], 4, 3).unwrap();
            assert_eq!(interpolate(&pieces[1..], prime).unwrap(), vec![byte]);
        }
    }

    #[test]
    fn test_progress_sums_to_twice_length() {
        let secret = vec![0xa5u8; 300];
        let mut total = 0u64;
        let mut progress = |bytes: u64| -> Result<()> {
            total += bytes;
            Ok(())
        };

        let (pieces, prime) = generate_with_progress(&secret, 5, 3, &mut progress).unwrap();
        let recovered = interpolate_with_progress(&pieces[..3], prime, &mut progress).unwrap();

        assert_eq!(recovered, secret);
        assert_eq!(total, 2 * secret.len() as u64);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let shamir = Shamir::new(4, 3).unwrap();
        let split_seeded = |seed| {
            let mut rng = rand_chacha::ChaCha8Rng::from_seed([seed; 32]);
            shamir
                .generate_buffer(b"same input", &mut rng, &mut NoProgress)
                .unwrap()
        };

        assert_eq!(split_seeded(7), split_seeded(7));
        assert_ne!(split_seeded(7), split_seeded(8));
    }

    #[test]
    fn test_validation_is_deterministic() {
        // Both a duplicate and a short piece; the first offender in order wins.
        let pieces = vec![
            Piece::new(1, vec![1, 2]),
            Piece::new(1, vec![3, 4]),
            Piece::new(2, vec![5]),
        ];
        for _ in 0..3 {
            assert!(matches!(
                interpolate(&pieces, Prime::DEFAULT),
                Err(ShamirError::DuplicateIndex(1))
            ));
        }

        let reordered = vec![pieces[0].clone(), pieces[2].clone(), pieces[1].clone()];
        assert!(matches!(
            interpolate(&reordered, Prime::DEFAULT),
            Err(ShamirError::MismatchedShareLengths {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_piece_bytes_round_trip() {
        let (pieces, prime) = generate(b"transport", 3, 3).unwrap();
        let decoded: Vec<Piece> = pieces
            .iter()
            .map(|piece| Piece::from_bytes(piece.index(), &piece.to_bytes()).unwrap())
            .collect();
        assert_eq!(interpolate(&decoded, prime).unwrap(), b"transport");
    }

    #[test]
    fn test_error_messages() {
        let err = ShamirError::MismatchedFileSize {
            path: PathBuf::from("a-2.shard"),
            expected: 10,
            found: 8,
        };
        assert_eq!(
            err.to_string(),
            "a-2.shard holds 8 bytes of share data, expected 10"
        );
        assert_eq!(
            ShamirError::DuplicateIndex(3).to_string(),
            "duplicate share with index 3"
        );
    }
}
