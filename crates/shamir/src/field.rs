//! Arithmetic in the prime field Z/pZ.
//!
//! Intermediate values are carried as `i64` so that negative terms such as
//! `0 - x_j` keep floored-modulus semantics. Callers reduce products as they
//! form them, which keeps every magnitude well below `p^2 * 2^16`.
use crate::{Result, ShamirError};

/// A prime modulus shared by every piece of one secret.
///
/// The modulus must exceed every byte value and every share value must fit
/// in 16 bits, so only primes in `256..=65536` are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Prime(u32);

impl Prime {
    /// The modulus used when none is chosen explicitly.
    pub const DEFAULT: Self = Self(7919);

    /// Smallest accepted modulus (one more than the largest byte).
    pub const MIN: u32 = 256;

    /// Largest accepted modulus; values below it fit in a `u16`.
    pub const MAX: u32 = 1 << 16;

    /// Validates `value` as a modulus.
    ///
    /// # Errors
    /// Returns `ShamirError::InvalidPrime` if `value` is out of range or composite.
    ///
    /// # Examples
    /// ```
    /// use shardline_shamir::Prime;
    /// assert_eq!(Prime::new(7919).unwrap().value(), 7919);
    /// assert!(Prime::new(7917).is_err());
    /// ```
    pub fn new(value: u32) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&value) || !is_prime(value) {
            return Err(ShamirError::InvalidPrime(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying integer.
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn modulus(self) -> i64 {
        self.0 as i64
    }
}

impl Default for Prime {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for Prime {
    type Error = ShamirError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Prime> for u32 {
    fn from(prime: Prime) -> u32 {
        prime.0
    }
}

impl std::fmt::Display for Prime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trial division; the accepted range is small enough for it.
pub fn is_prime(value: u32) -> bool {
    match value {
        0 | 1 => false,
        2 | 3 => true,
        _ if value % 2 == 0 => false,
        _ => {
            let value = u64::from(value);
            (3u64..)
                .step_by(2)
                .take_while(|d| d * d <= value)
                .all(|d| value % d != 0)
        }
    }
}

/// Computes the [modular multiplicative inverse](https://en.wikipedia.org/wiki/Extended_Euclidean_algorithm)
/// of `a` modulo `p` with the extended Euclidean algorithm.
///
/// The raw Bézout coefficient is returned, so the result may be negative;
/// `(a * inverse).rem_euclid(p) == 1` holds either way.
///
/// # Panics
/// Panics if `a` is a multiple of `p`. Validation rules out duplicate or zero
/// indices before any division, so reaching this is a logic error.
///
/// # Examples
/// ```
/// use shardline_shamir::field::modular_inverse;
/// assert_eq!(modular_inverse(-4, 3617), 904);
/// assert_eq!(modular_inverse(-4, 7211), -1803);
/// ```
pub fn modular_inverse(a: i64, p: i64) -> i64 {
    assert_ne!(a.rem_euclid(p), 0, "{a} has no inverse modulo {p}");

    let (mut a, mut z) = (a, p);
    let (mut x, mut last_x) = (0i64, 1i64);

    while z != 0 {
        let quotient = a.div_euclid(z);
        (a, z) = (z, a.rem_euclid(z));
        (last_x, x) = (x, last_x - quotient * x);
    }

    last_x
}

/// Multiplies `numerator` by the inverse of `denominator`.
///
/// The product is left unreduced; callers reduce once after combining terms.
#[inline]
pub fn divide_mod(numerator: i64, denominator: i64, p: i64) -> i64 {
    numerator * modular_inverse(denominator, p)
}

/// Multiplicative fold. The empty product is 1.
pub fn product<I: IntoIterator<Item = i64>>(values: I) -> i64 {
    values.into_iter().fold(1, |total, value| total * value)
}

/// Multiplicative fold reduced into `[0, p)` after every step.
pub fn product_mod<I: IntoIterator<Item = i64>>(values: I, p: i64) -> i64 {
    values
        .into_iter()
        .fold(normalize(1, p), |total, value| normalize(total * value, p))
}

/// Maps any `value` into `[0, p)`, whatever its sign or magnitude.
#[inline]
pub fn normalize(value: i64, p: i64) -> i64 {
    value.rem_euclid(p)
}
