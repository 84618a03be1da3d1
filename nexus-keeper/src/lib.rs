#![deny(missing_docs)]
//! Bootstrap, recovery and periodic redistribution of root-key shares across
//! a directory of Keepers, plus the operator ("pilot") break-glass path.
//!
//! This crate is the Keeper protocol driver (`spec.md` §4.4): it never holds
//! the root key itself, borrowing it briefly from [`nexus_core::RootKeyCustodian`]
//! to split or passing a freshly reconstructed key straight into it. Network
//! calls to Keepers go through [`client::KeeperClient`], an injected
//! `reqwest::Client` that the hosting application has already configured for
//! mutual TLS — this crate never touches TLS identity material.

pub mod bootstrap;
pub mod client;
pub mod driver;
pub mod pilot;
pub mod recovery;
pub mod redistribute;
pub mod tombstone;

use std::time::Duration;

use nexus_types::{KeeperDirectory, ShamirParameters};

pub use driver::{Driver, DriverState};

/// Error taxonomy for the Keeper protocol driver, mirroring `spec.md` §7.
///
/// `Transient` is logged and retried by the calling loop, never fatal.
/// Every other variant is fatal: callers propagate it up to the process,
/// which is expected to exit for an orchestrator to restart.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Keeper unreachable, mTLS handshake failure, non-2xx response, or
    /// request/response JSON that failed to encode/decode. Recoverable by
    /// retrying on the next pass.
    #[error("transient Keeper-protocol failure: {0}")]
    Transient(String),
    /// A share or pilot shard failed validation (id `0`, wrong length,
    /// all-zero value from an operator). Continuing could propagate invalid
    /// recovery material.
    #[error("corrupt recovery input: {0}")]
    CorruptInput(String),
    /// Splitting or reconstructing the root key failed.
    #[error(transparent)]
    Cryptographic(#[from] nexus_core::ShareEngineError),
    /// The root key could not be installed into the custodian.
    #[error(transparent)]
    CustodianRejectedKey(#[from] nexus_core::custodian::NilRootKey),
    /// A durable write (tombstone, backend initialization) failed.
    #[error("persistence failure: {0}")]
    Persistence(String),
    /// The backend rejected an operation.
    #[error(transparent)]
    Backend(#[from] nexus_backend::Error),
}

/// Static configuration for the Keeper protocol driver.
#[derive(Debug, Clone)]
pub struct KeeperConfig {
    /// The directory of Keeper base URLs.
    pub directory: KeeperDirectory,
    /// `(T, N)` for the root key's Shamir split.
    pub shamir: ShamirParameters,
    /// Path to the bootstrap tombstone file.
    pub tombstone_path: std::path::PathBuf,
    /// Sleep between bootstrap passes while Keepers are still being
    /// contributed to. `spec.md` §4.4 fixes this at 5 seconds.
    pub bootstrap_retry_interval: Duration,
    /// Floor for the recovery loop's exponential back-off.
    pub recovery_retry_floor: Duration,
    /// Total time budget for a single recovery attempt; `None` means
    /// unbounded (`recovery_operation_timeout = 0` in configuration).
    pub recovery_operation_timeout: Option<Duration>,
    /// Interval of the periodic redistribution timer.
    pub redistribution_interval: Duration,
}
