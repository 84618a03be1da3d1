//! Deterministic Shamir Secret Sharing of the Nexus root key over the
//! scalar field of P-256.
//!
//! This is the design's most consequential choice (`spec.md` §4.1): the
//! polynomial's non-constant coefficients are sampled from a pseudorandom
//! stream keyed by the root key itself, so `split` is idempotent — Nexus can
//! always recompute "the" set of shares for a given root key without any
//! persisted state, which is what makes periodic redistribution safe after
//! crashes. Security rests on secrecy of the root key and the shares, not on
//! the randomness of the stream.
//!
//! Every locally-allocated scalar and byte buffer is zeroized before this
//! module's functions return, on both the success and the failure path.

use std::collections::HashSet;

use nexus_types::crypto::{KEY_LEN, Share};
use p256::elliptic_curve::{Field, PrimeField};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

type Scalar = p256::Scalar;

/// Domain separator for deriving the deterministic coefficient stream from
/// the root key via BLAKE3's key-derivation mode.
const SHAMIR_KDF_CONTEXT: &str = "spike.nexus.shamir.v1";

/// Errors raised by [`split`] and [`reconstruct`].
///
/// Per `spec.md` §7, every variant here is a **fatal**/**corrupt-input**
/// condition: callers (the bootstrap, recovery and pilot-restore flows in
/// `nexus-keeper`) must treat an `Err` from this module as terminal, log it,
/// and let the process exit for an orchestrator to restart it — never retry
/// or paper over it.
#[derive(Debug, thiserror::Error)]
pub enum ShareEngineError {
    /// The root key (or a reconstructed scalar) did not decode to a valid
    /// P-256 scalar.
    #[error("value does not decode to a canonical P-256 scalar")]
    InvalidScalarEncoding,
    /// Fewer than `threshold` shares were supplied to [`reconstruct`].
    #[error("need at least {threshold} shares, got {got}")]
    InsufficientShares {
        /// The required threshold.
        threshold: u16,
        /// The number of shares actually supplied.
        got: usize,
    },
    /// Two supplied shares had the same id.
    #[error("duplicate share id {0}")]
    DuplicateShareId(u64),
    /// Reconstructing from the first `T` freshly split shares did not
    /// reproduce the original root key. Indicates a coefficient-sampling or
    /// field-arithmetic bug; shares must never be shipped to Keepers.
    #[error("post-split sanity check failed: reconstruction mismatch")]
    SanityCheckFailed,
}

/// Splits a 32-byte root key into `N` deterministic Shamir shares
/// reconstructable from any `T` of them.
///
/// See the module docs for why the coefficient stream is seeded by the root
/// key itself. After splitting, this function reconstructs from the first
/// `T` generated shares and requires bitwise equality with the input,
/// failing with [`ShareEngineError::SanityCheckFailed`] otherwise — this
/// catches coefficient-sampling or field-arithmetic bugs before shares are
/// ever transmitted to a Keeper.
pub fn split(
    root_key: &[u8; KEY_LEN],
    params: nexus_types::ShamirParameters,
) -> Result<Vec<Share>, ShareEngineError> {
    let threshold = params.threshold();
    let total = params.total();

    let mut secret = bytes_to_scalar(root_key)?;

    let mut seed = [0u8; 32];
    blake3::derive_key(SHAMIR_KDF_CONTEXT, root_key, &mut seed);
    let mut rng = ChaCha20Rng::from_seed(seed);
    seed.zeroize();

    let mut coeffs = Vec::with_capacity(usize::from(threshold));
    coeffs.push(secret);
    for _ in 1..threshold {
        coeffs.push(sample_scalar(&mut rng));
    }

    let shares = (1..=total)
        .map(|x| {
            let y = evaluate_poly(&coeffs, scalar_from_u64(u64::from(x)));
            let share = Share::new(u64::from(x), scalar_to_le_bytes(&y))
                .expect("x ranges over 1..=total, never 0");
            y.zeroize();
            share
        })
        .collect::<Vec<_>>();

    for c in &mut coeffs {
        c.zeroize();
    }

    let sanity_subset = &shares[..usize::from(threshold)];
    let reconstructed = reconstruct(sanity_subset, threshold);
    let sanity_ok = match &reconstructed {
        Ok(value) => value.ct_eq(root_key).into(),
        Err(_) => false,
    };
    secret.zeroize();
    if !sanity_ok {
        return Err(ShareEngineError::SanityCheckFailed);
    }

    Ok(shares)
}

/// Reconstructs the 32-byte root key from `>= threshold` shares with
/// distinct ids via Lagrange interpolation at `x = 0`.
///
/// Fails with [`ShareEngineError::InsufficientShares`] if fewer than
/// `threshold` shares are supplied (`spec.md` §9's open question on `t-1`
/// vs. `t` library conventions is resolved here by taking an explicit,
/// caller-supplied threshold rather than inferring it from a library's
/// recover-call arity) and with [`ShareEngineError::DuplicateShareId`] if
/// two shares share an id.
pub fn reconstruct(shares: &[Share], threshold: u16) -> Result<[u8; KEY_LEN], ShareEngineError> {
    if shares.len() < usize::from(threshold) {
        return Err(ShareEngineError::InsufficientShares {
            threshold,
            got: shares.len(),
        });
    }

    let mut seen = HashSet::with_capacity(shares.len());
    for share in shares {
        if !seen.insert(share.id()) {
            return Err(ShareEngineError::DuplicateShareId(share.id()));
        }
    }

    let xs = shares
        .iter()
        .map(|s| scalar_from_u64(s.id()))
        .collect::<Vec<_>>();
    let mut ys = match shares
        .iter()
        .map(|s| le_bytes_to_scalar(s.value()))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(ys) => ys,
        Err(err) => return Err(err),
    };

    let mut secret = Scalar::ZERO;
    let mut error = None;
    for (i, y_i) in ys.iter().enumerate() {
        let mut num = Scalar::ONE;
        let mut den = Scalar::ONE;
        for (j, x_j) in xs.iter().enumerate() {
            if i == j {
                continue;
            }
            num *= x_j;
            den *= *x_j - xs[i];
        }
        let inv_den = Option::<Scalar>::from(den.invert());
        den.zeroize();
        let mut lagrange_i = match inv_den {
            Some(inv_den) => num * inv_den,
            None => {
                num.zeroize();
                error = Some(ShareEngineError::InvalidScalarEncoding);
                break;
            }
        };
        num.zeroize();
        secret += *y_i * lagrange_i;
        lagrange_i.zeroize();
    }
    for y in ys.iter_mut() {
        y.zeroize();
    }

    if let Some(err) = error {
        secret.zeroize();
        return Err(err);
    }

    let bytes = scalar_to_le_bytes(&secret);
    secret.zeroize();
    Ok(bytes)
}

/// Evaluates `f(x) = coeffs[0] + coeffs[1]*x + ... + coeffs[d]*x^d` using
/// Horner's method.
fn evaluate_poly(coeffs: &[Scalar], x: Scalar) -> Scalar {
    let mut acc = Scalar::ZERO;
    for c in coeffs.iter().rev() {
        acc = acc * x + c;
    }
    acc
}

/// Rejection-samples a uniformly random scalar from `rng`.
///
/// P-256's order is close enough to 2^256 that the rejection probability is
/// negligible; this loop terminates after one iteration with overwhelming
/// probability.
fn sample_scalar(rng: &mut ChaCha20Rng) -> Scalar {
    use rand::RngCore;
    loop {
        let mut bytes = [0u8; KEY_LEN];
        rng.fill_bytes(&mut bytes);
        let candidate = Scalar::from_repr(bytes.into());
        bytes.zeroize();
        if let Some(s) = Option::<Scalar>::from(candidate) {
            return s;
        }
    }
}

fn scalar_from_u64(n: u64) -> Scalar {
    let mut be = [0u8; KEY_LEN];
    be[KEY_LEN - 8..].copy_from_slice(&n.to_be_bytes());
    // n < 2^64 is always < the P-256 order, so this never fails.
    Scalar::from_repr(be.into()).expect("u64 always fits the P-256 scalar field")
}

/// Decodes the canonical little-endian encoding of a P-256 scalar.
///
/// RustCrypto's field-element encoding is big-endian (SEC1); Nexus's wire
/// format is little-endian per `spec.md` §4.1, so the bytes are reversed
/// before the canonical decode.
fn bytes_to_scalar(le: &[u8; KEY_LEN]) -> Result<Scalar, ShareEngineError> {
    let mut be = *le;
    be.reverse();
    let scalar = Scalar::from_repr(be.into());
    be.zeroize();
    Option::from(scalar).ok_or(ShareEngineError::InvalidScalarEncoding)
}

fn le_bytes_to_scalar(le: &[u8; KEY_LEN]) -> Result<Scalar, ShareEngineError> {
    bytes_to_scalar(le)
}

fn scalar_to_le_bytes(scalar: &Scalar) -> [u8; KEY_LEN] {
    let mut be_array = [0u8; KEY_LEN];
    be_array.copy_from_slice(scalar.to_repr().as_slice());
    be_array.reverse();
    be_array
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_types::ShamirParameters;

    fn key(byte: u8) -> [u8; KEY_LEN] {
        let mut k = [byte; KEY_LEN];
        // avoid the all-zero key, which is not a valid root key anywhere in
        // this system.
        k[0] = k[0].wrapping_add(1);
        k
    }

    #[test]
    fn split_then_reconstruct_is_identity() {
        let root = key(7);
        let params = ShamirParameters::new(2, 3).unwrap();
        let shares = split(&root, params).unwrap();
        assert_eq!(shares.len(), 3);
        for (expected_id, share) in (1u64..=3).zip(shares.iter()) {
            assert_eq!(share.id(), expected_id);
        }

        let subset = &shares[0..2];
        let recovered = reconstruct(subset, 2).unwrap();
        assert_eq!(recovered, root);

        // any T-subset works, not just a prefix
        let subset = [shares[0].clone(), shares[2].clone()];
        let recovered = reconstruct(&subset, 2).unwrap();
        assert_eq!(recovered, root);
    }

    #[test]
    fn split_is_deterministic() {
        let root = key(42);
        let params = ShamirParameters::new(3, 5).unwrap();
        let a = split(&root, params).unwrap();
        let b = split(&root, params).unwrap();
        for (sa, sb) in a.iter().zip(b.iter()) {
            assert_eq!(sa.id(), sb.id());
            assert_eq!(sa.value(), sb.value());
        }
    }

    #[test]
    fn reconstruct_rejects_too_few_shares() {
        let root = key(9);
        let params = ShamirParameters::new(2, 3).unwrap();
        let shares = split(&root, params).unwrap();
        let err = reconstruct(&shares[0..1], 2).unwrap_err();
        assert!(matches!(err, ShareEngineError::InsufficientShares { .. }));
    }

    #[test]
    fn reconstruct_rejects_duplicate_ids() {
        let root = key(9);
        let params = ShamirParameters::new(2, 3).unwrap();
        let shares = split(&root, params).unwrap();
        let dup = [shares[0].clone(), shares[0].clone()];
        let err = reconstruct(&dup, 2).unwrap_err();
        assert!(matches!(err, ShareEngineError::DuplicateShareId(1)));
    }

    #[test]
    fn different_keys_split_to_different_shares() {
        let params = ShamirParameters::new(2, 3).unwrap();
        let a = split(&key(1), params).unwrap();
        let b = split(&key(2), params).unwrap();
        assert_ne!(a[0].value(), b[0].value());
    }
}
