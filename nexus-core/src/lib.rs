#![deny(missing_docs)]
//! Deterministic Shamir Secret Sharing over P-256 and in-memory custody of
//! the Nexus root key.
//!
//! This crate provides the two lowest-level components of the root-of-trust
//! subsystem:
//!
//! * [`shamir`] — component A, the deterministic share engine.
//! * [`custodian`] — component B, the process-singleton root-key custodian.
//!
//! Neither module talks to the network or to disk; both are pure,
//! side-effect-free (beyond the custodian's lock) building blocks consumed
//! by `nexus-backend` and `nexus-keeper`.

pub mod custodian;
pub mod shamir;

pub use custodian::RootKeyCustodian;
pub use shamir::{ShareEngineError, reconstruct, split};
