//! Polynomial operations for Shamir's Secret Sharing over a prime field.
//!
//! Every secret byte gets its own random polynomial
//! `f(x) = secret + c1*x + ... + c(k-1)*x^(k-1)`, evaluated at the share
//! indices `1..=n`. Recovery evaluates the
//! [Lagrange interpolation](https://en.wikipedia.org/wiki/Lagrange_polynomial)
//! of any `k` points at `x = 0`.
use rand::distributions::{Distribution, Uniform};

use crate::field::{self, Prime};
use crate::progress::Progress;
use crate::share::Piece;
use crate::validate;
use crate::{Result, ShamirError};

/// A point `(x, y)` on one byte's polynomial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    /// Share index.
    pub x: u32,
    /// Polynomial value at `x`, reduced modulo the prime.
    pub y: u32,
}

/// Draws `threshold - 1` coefficients uniformly from `[0, prime)`.
///
/// Coefficients must be drawn afresh for every secret byte; reusing them
/// across bytes would leak relations between the bytes.
///
/// # Examples
/// ```
/// use shardline_shamir::Prime;
/// use shardline_shamir::poly::generate_coefficients;
/// use rand_chacha::rand_core::SeedableRng;
///
/// let mut rng = rand_chacha::ChaCha8Rng::from_seed([0; 32]);
/// let coefficients = generate_coefficients(6, Prime::DEFAULT, &mut rng);
/// assert_eq!(coefficients.len(), 5);
/// assert!(coefficients.iter().all(|&c| c < 7919));
/// ```
pub fn generate_coefficients<R: rand::Rng + ?Sized>(
    threshold: u32,
    prime: Prime,
    rng: &mut R,
) -> Vec<u32> {
    let distribution = Uniform::new(0, prime.value());
    (1..threshold).map(|_| distribution.sample(rng)).collect()
}

/// Evaluates `secret + Σ coefficients[i] * x^(i+1)` at `x = 1..=pieces`.
///
/// `x = 0` is never emitted since it is the secret itself. Evaluation uses
/// [Horner's method](https://en.wikipedia.org/wiki/Horner%27s_method) and
/// reduces after every step.
///
/// # Examples
/// ```
/// use shardline_shamir::Prime;
/// use shardline_shamir::poly::evaluate_points;
///
/// let prime = Prime::new(1613).unwrap();
/// let ys: Vec<u32> = evaluate_points(1234, 6, &[166, 94], prime)
///     .iter()
///     .map(|point| point.y)
///     .collect();
/// assert_eq!(ys, vec![1494, 329, 965, 176, 1188, 775]);
/// ```
pub fn evaluate_points(secret: u32, pieces: u32, coefficients: &[u32], prime: Prime) -> Vec<Point> {
    let p = prime.modulus();
    let constant = field::normalize(i64::from(secret), p);

    (1..=pieces)
        .map(|x| {
            let x_mod = field::normalize(i64::from(x), p);
            let higher = coefficients
                .iter()
                .rev()
                .fold(0, |accumulator, &coefficient| {
                    field::normalize(accumulator * x_mod + i64::from(coefficient), p)
                });
            let y = field::normalize(higher * x_mod + constant, p);

            Point { x, y: y as u32 }
        })
        .collect()
}

/// Splits `secret` into `pieces` pieces, any `threshold` of which recover it.
///
/// Fresh coefficients are drawn for every byte. The returned pieces are in
/// index order `1..=pieces`, each holding one value per secret byte.
/// `progress` advances by one after every byte.
pub fn generate_buffer<R, P>(
    secret: &[u8],
    pieces: u32,
    threshold: u32,
    prime: Prime,
    rng: &mut R,
    progress: &mut P,
) -> Result<Vec<Piece>>
where
    R: rand::Rng + ?Sized,
    P: Progress + ?Sized,
{
    let mut buffers: Vec<Vec<u16>> = (0..pieces)
        .map(|_| Vec::with_capacity(secret.len()))
        .collect();

    for &byte in secret {
        let coefficients = generate_coefficients(threshold, prime, rng);
        for (point, buffer) in evaluate_points(u32::from(byte), pieces, &coefficients, prime)
            .into_iter()
            .zip(buffers.iter_mut())
        {
            // Values are below the prime, which never exceeds 2^16.
            buffer.push(point.y as u16);
        }
        progress.advance(1)?;
    }

    Ok((1..)
        .zip(buffers)
        .map(|(index, values)| Piece::new(index, values))
        .collect())
}

/// Lagrange basis at `x = 0` for a fixed set of share indices.
///
/// Only the y-values change from one byte position to the next, so the
/// products over the indices are computed once per piece set.
struct LagrangeBasis {
    numerators: Vec<i64>,
    denominators: Vec<i64>,
    denominator: i64,
    p: i64,
}

impl LagrangeBasis {
    /// The indices must already be validated as distinct and in `1..p`.
    fn at_zero(xs: &[i64], prime: Prime) -> Self {
        let p = prime.modulus();
        let mut numerators = Vec::with_capacity(xs.len());
        let mut denominators = Vec::with_capacity(xs.len());

        for (i, &x_i) in xs.iter().enumerate() {
            let others = xs
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &x_j)| x_j);

            numerators.push(field::product_mod(others.clone().map(|x_j| 0 - x_j), p));
            denominators.push(field::product_mod(others.map(|x_j| x_i - x_j), p));
        }

        let denominator = field::product_mod(denominators.iter().copied(), p);

        Self {
            numerators,
            denominators,
            denominator,
            p,
        }
    }

    fn evaluate<I: IntoIterator<Item = u32>>(&self, ys: I) -> u32 {
        let p = self.p;
        let numerator = ys
            .into_iter()
            .zip(self.numerators.iter().zip(&self.denominators))
            .fold(0, |total, (y, (&numerator_i, &denominator_i))| {
                let scaled =
                    field::normalize(numerator_i * self.denominator % p * i64::from(y), p);
                field::normalize(total + field::divide_mod(scaled, denominator_i, p), p)
            });

        field::normalize(field::divide_mod(numerator, self.denominator, p), p) as u32
    }
}

/// Recovers `f(0)` from points on `f`.
///
/// # Errors
/// Fails before any arithmetic if `validate::validate_points` rejects the
/// points.
///
/// # Examples
/// ```
/// use shardline_shamir::Prime;
/// use shardline_shamir::poly::{interpolate_secret, Point};
///
/// let prime = Prime::new(1613).unwrap();
/// let points = [
///     Point { x: 2, y: 329 },
///     Point { x: 4, y: 176 },
///     Point { x: 5, y: 1188 },
/// ];
/// assert_eq!(interpolate_secret(&points, prime).unwrap(), 1234);
/// ```
pub fn interpolate_secret(points: &[Point], prime: Prime) -> Result<u32> {
    validate::validate_points(points, prime)?;

    let xs: Vec<i64> = points.iter().map(|point| i64::from(point.x)).collect();
    let basis = LagrangeBasis::at_zero(&xs, prime);
    Ok(basis.evaluate(points.iter().map(|point| point.y)))
}

/// Recovers a secret byte sequence from pieces.
///
/// All pieces are validated up front. Each byte position is then
/// interpolated from the values the pieces hold at that position.
/// `progress` advances by one after every byte.
///
/// # Errors
/// * Any validation error from `validate::validate_pieces` or
///   `validate::validate_piece_values`
/// * `ShamirError::InconsistentShares` - a position interpolates to a value
///   that is not a byte, which happens when too few or unrelated pieces are
///   combined
pub fn interpolate_buffer<P: Progress + ?Sized>(
    pieces: &[Piece],
    prime: Prime,
    progress: &mut P,
) -> Result<Vec<u8>> {
    validate::validate_pieces(pieces)?;
    validate::validate_piece_values(pieces, prime)?;

    let xs: Vec<i64> = pieces.iter().map(|piece| i64::from(piece.index())).collect();
    let basis = LagrangeBasis::at_zero(&xs, prime);

    let len = pieces[0].len();
    let mut secret = Vec::with_capacity(len);

    for position in 0..len {
        let value = basis.evaluate(
            pieces
                .iter()
                .map(|piece| u32::from(piece.values()[position])),
        );
        let byte = u8::try_from(value)
            .map_err(|_| ShamirError::InconsistentShares { position, value })?;
        secret.push(byte);
        progress.advance(1)?;
    }

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use rand_chacha::rand_core::SeedableRng;

    const WORKED_Y: [u32; 6] = [1494, 329, 965, 176, 1188, 775];

    fn worked_prime() -> Prime {
        Prime::new(1613).unwrap()
    }

    #[test]
    fn test_worked_example_points() {
        let points = evaluate_points(1234, 6, &[166, 94], worked_prime());

        assert_eq!(points.len(), 6);
        for (i, point) in points.iter().enumerate() {
            assert_eq!(point.x, i as u32 + 1);
            assert_eq!(point.y, WORKED_Y[i]);
        }
    }

    #[test]
    fn test_worked_example_any_three_points() {
        let points: Vec<Point> = (1..=6)
            .zip(WORKED_Y)
            .map(|(x, y)| Point { x, y })
            .collect();

        for a in 0..6 {
            for b in a + 1..6 {
                for c in b + 1..6 {
                    let subset = [points[a], points[b], points[c]];
                    assert_eq!(interpolate_secret(&subset, worked_prime()).unwrap(), 1234);
                }
            }
        }
    }

    #[test]
    fn test_all_points_recover_secret() {
        let points = evaluate_points(1234, 6, &[166, 94], worked_prime());
        assert_eq!(interpolate_secret(&points, worked_prime()).unwrap(), 1234);
    }

    #[test]
    fn test_coefficients_in_range() {
        let mut rng = rand_chacha::ChaCha8Rng::from_seed([0; 32]);
        let prime = worked_prime();

        let coefficients = generate_coefficients(6, prime, &mut rng);
        assert_eq!(coefficients.len(), 5);
        assert!(coefficients.iter().all(|&c| c < prime.value()));

        assert!(generate_coefficients(1, prime, &mut rng).is_empty());
    }

    #[test]
    fn test_coefficients_are_fresh() {
        let mut rng = rand_chacha::ChaCha8Rng::from_seed([1; 32]);
        let first = generate_coefficients(8, Prime::DEFAULT, &mut rng);
        let second = generate_coefficients(8, Prime::DEFAULT, &mut rng);
        assert_ne!(first, second);
    }

    #[test]
    fn test_constant_polynomial() {
        let points = evaluate_points(42, 4, &[], Prime::DEFAULT);
        assert!(points.iter().all(|point| point.y == 42));
    }

    #[test]
    fn test_evaluation_reduces_large_index() {
        // A high-degree polynomial at a large index must not overflow.
        let prime = Prime::new(65521).unwrap();
        let coefficients = vec![65520; 40];
        let points = evaluate_points(255, 65520, &coefficients, prime);
        assert_eq!(points.len(), 65520);
        assert!(points.iter().all(|point| point.y < 65521));
    }

    #[test]
    fn test_buffer_round_trip() {
        let mut rng = rand_chacha::ChaCha8Rng::from_seed([42; 32]);
        let secret: Vec<u8> = (0..=255).collect();

        let pieces =
            generate_buffer(&secret, 5, 3, Prime::DEFAULT, &mut rng, &mut NoProgress).unwrap();
        assert_eq!(pieces.len(), 5);
        assert!(pieces.iter().all(|piece| piece.len() == secret.len()));
        assert_eq!(
            pieces.iter().map(Piece::index).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );

        let recovered = interpolate_buffer(&pieces[2..], Prime::DEFAULT, &mut NoProgress).unwrap();
        assert_eq!(recovered, secret);
    }

    #[test]
    fn test_high_threshold_round_trip() {
        let mut rng = rand_chacha::ChaCha8Rng::from_seed([7; 32]);
        let prime = Prime::new(65521).unwrap();
        let secret = b"forty of sixty";

        let pieces = generate_buffer(secret, 60, 40, prime, &mut rng, &mut NoProgress).unwrap();
        let recovered = interpolate_buffer(&pieces[10..50], prime, &mut NoProgress).unwrap();
        assert_eq!(&recovered, secret);
    }

    #[test]
    fn test_too_few_pieces_is_inconsistent() {
        let mut rng = rand_chacha::ChaCha8Rng::from_seed([9; 32]);
        let secret = vec![7u8; 64];

        let pieces =
            generate_buffer(&secret, 6, 5, Prime::DEFAULT, &mut rng, &mut NoProgress).unwrap();

        // Three of five needed pieces interpolate the wrong polynomial; with
        // 64 bytes some position lands outside the byte range.
        let result = interpolate_buffer(&pieces[..3], Prime::DEFAULT, &mut NoProgress);
        match result {
            Ok(recovered) => assert_ne!(recovered, secret),
            Err(err) => assert!(matches!(err, ShamirError::InconsistentShares { .. })),
        }
    }

    #[test]
    fn test_progress_counts_bytes() {
        let mut rng = rand_chacha::ChaCha8Rng::from_seed([3; 32]);
        let secret = b"progress";
        let mut total = 0u64;
        let mut progress = |bytes: u64| -> Result<()> {
            total += bytes;
            Ok(())
        };

        let pieces =
            generate_buffer(secret, 4, 3, Prime::DEFAULT, &mut rng, &mut progress).unwrap();
        interpolate_buffer(&pieces, Prime::DEFAULT, &mut progress).unwrap();

        assert_eq!(total, 2 * secret.len() as u64);
    }

    #[test]
    fn test_abort_stops_generation() {
        let mut rng = rand_chacha::ChaCha8Rng::from_seed([4; 32]);
        let mut calls = 0;
        let mut progress = |_: u64| -> Result<()> {
            calls += 1;
            if calls == 2 {
                Err(ShamirError::Aborted)
            } else {
                Ok(())
            }
        };

        let result = generate_buffer(b"abcdef", 4, 3, Prime::DEFAULT, &mut rng, &mut progress);
        assert!(matches!(result, Err(ShamirError::Aborted)));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_invalid_value_fails_before_arithmetic() {
        let pieces = vec![
            Piece::new(1, vec![10, 20]),
            Piece::new(2, vec![11, 7919]),
            Piece::new(3, vec![12, 22]),
        ];
        let mut calls = 0;
        let mut progress = |_: u64| -> Result<()> {
            calls += 1;
            Ok(())
        };

        let result = interpolate_buffer(&pieces, Prime::DEFAULT, &mut progress);
        assert!(matches!(
            result,
            Err(ShamirError::PrimeTooSmall { value: 7919, .. })
        ));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_empty_buffer() {
        let mut rng = rand_chacha::ChaCha8Rng::from_seed([5; 32]);
        let pieces = generate_buffer(&[], 3, 3, Prime::DEFAULT, &mut rng, &mut NoProgress).unwrap();
        assert!(pieces.iter().all(Piece::is_empty));

        let recovered = interpolate_buffer(&pieces, Prime::DEFAULT, &mut NoProgress).unwrap();
        assert!(recovered.is_empty());
    }
}
