//! Cryptographic entities shared between the share engine, the root-key
//! custodian and the Keeper protocol driver.
//!
//! Main types:
//! * [`Share`]
//! * [`ShamirParameters`]
//! * [`KeeperId`]

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};
use zeroize::ZeroizeOnDrop;

/// The length in bytes of a root-key and of every Shamir share value.
pub const KEY_LEN: usize = 32;

/// One point `(id, value)` on the Shamir polynomial for the root key.
///
/// `id` is a small positive integer (`1..=N`); `id == 0` is reserved by
/// `spec.md` §3 to mean "no share" and is therefore rejected at
/// construction. `value` is the little-endian encoding of a P-256 scalar.
///
/// Shares are secret material: the value is zeroized on drop and the type
/// deliberately does not implement `Debug`/`Display` to avoid accidental
/// leakage into logs.
#[derive(Clone, Serialize, Deserialize, ZeroizeOnDrop)]
pub struct Share {
    #[zeroize(skip)]
    id: NonZeroU64,
    value: [u8; KEY_LEN],
}

/// Error returned when constructing a [`Share`] with an invalid id.
#[derive(Debug, thiserror::Error)]
#[error("share id must be >= 1, got 0")]
pub struct ZeroShareId;

impl Share {
    /// Builds a new share. Returns [`ZeroShareId`] if `id == 0`.
    pub fn new(id: u64, value: [u8; KEY_LEN]) -> Result<Self, ZeroShareId> {
        Ok(Self {
            id: NonZeroU64::new(id).ok_or(ZeroShareId)?,
            value,
        })
    }

    /// The share's id (`1..=N`).
    pub fn id(&self) -> u64 {
        self.id.get()
    }

    /// Borrows the share's 32-byte value.
    pub fn value(&self) -> &[u8; KEY_LEN] {
        &self.value
    }

    /// Returns `true` iff the share's value is all-zero.
    ///
    /// Per `spec.md` §4.4, an all-zero shard means "the Keeper has not yet
    /// been seeded" and must be treated as no-data rather than a valid
    /// share.
    pub fn is_zero_value(&self) -> bool {
        self.value.iter().all(|b| *b == 0)
    }
}

/// `(threshold T, total N)` for Shamir Secret Sharing.
///
/// Invariants (enforced by [`ShamirParameters::new`]): `1 <= T <= N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShamirParameters {
    threshold: u16,
    total: u16,
}

/// Error returned when `(T, N)` violate `1 <= T <= N`.
#[derive(Debug, thiserror::Error)]
pub enum InvalidShamirParameters {
    /// `T == 0`.
    #[error("threshold must be >= 1")]
    ZeroThreshold,
    /// `T > N`.
    #[error("threshold {threshold} exceeds total shares {total}")]
    ThresholdExceedsTotal {
        /// The requested threshold.
        threshold: u16,
        /// The requested total.
        total: u16,
    },
}

impl ShamirParameters {
    /// Builds new Shamir parameters, validating `1 <= T <= N`.
    pub fn new(threshold: u16, total: u16) -> Result<Self, InvalidShamirParameters> {
        if threshold == 0 {
            return Err(InvalidShamirParameters::ZeroThreshold);
        }
        if threshold > total {
            return Err(InvalidShamirParameters::ThresholdExceedsTotal { threshold, total });
        }
        Ok(Self { threshold, total })
    }

    /// The reconstruction threshold `T`.
    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    /// The total number of shares `N`.
    pub fn total(&self) -> u16 {
        self.total
    }

    /// Returns `true` iff production bootstrap's minimum of `N >= 3` holds.
    pub fn meets_production_minimum(&self) -> bool {
        self.total >= 3
    }
}

/// The id of a Keeper, as it appears both in the keeper directory and as a
/// [`Share`] id.
///
/// Keeper ids must parse as positive integers (`spec.md` §9's "Open
/// questions": negative ids accepted by the source's `atoi` are rejected
/// here, not propagated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeeperId(NonZeroU64);

/// Error returned when a string does not parse as a valid [`KeeperId`].
#[derive(Debug, thiserror::Error)]
pub enum InvalidKeeperId {
    /// The string was not a valid non-negative integer.
    #[error("keeper id {0:?} is not a valid unsigned integer")]
    NotAnInteger(String),
    /// The string parsed but was zero.
    #[error("keeper id must be >= 1, got 0")]
    Zero,
}

impl KeeperId {
    /// Wraps a non-zero integer as a [`KeeperId`].
    pub fn new(id: u64) -> Result<Self, InvalidKeeperId> {
        NonZeroU64::new(id).map(Self).ok_or(InvalidKeeperId::Zero)
    }

    /// Returns the inner value.
    pub fn into_inner(self) -> u64 {
        self.0.get()
    }
}

impl std::str::FromStr for KeeperId {
    type Err = InvalidKeeperId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .parse::<u64>()
            .map_err(|_| InvalidKeeperId::NotAnInteger(s.to_owned()))?;
        KeeperId::new(value)
    }
}

impl fmt::Display for KeeperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<KeeperId> for u64 {
    fn from(value: KeeperId) -> Self {
        value.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_rejects_zero_id() {
        assert!(Share::new(0, [1u8; KEY_LEN]).is_err());
        assert!(Share::new(1, [1u8; KEY_LEN]).is_ok());
    }

    #[test]
    fn share_detects_all_zero_value() {
        let zero = Share::new(1, [0u8; KEY_LEN]).unwrap();
        assert!(zero.is_zero_value());
        let nonzero = Share::new(1, [1u8; KEY_LEN]).unwrap();
        assert!(!nonzero.is_zero_value());
    }

    #[test]
    fn shamir_parameters_enforce_threshold_le_total() {
        assert!(ShamirParameters::new(2, 3).is_ok());
        assert!(ShamirParameters::new(0, 3).is_err());
        assert!(ShamirParameters::new(4, 3).is_err());
    }

    #[test]
    fn keeper_id_rejects_zero_and_negative() {
        assert!("0".parse::<KeeperId>().is_err());
        assert!("-1".parse::<KeeperId>().is_err());
        assert!("not-a-number".parse::<KeeperId>().is_err());
        assert_eq!("7".parse::<KeeperId>().unwrap().into_inner(), 7);
    }
}
