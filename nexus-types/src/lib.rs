#![deny(missing_docs)]
//! Shared data model for the Nexus root-of-trust subsystem.
//!
//! This crate has no behaviour of its own; it defines the entities that flow
//! between the share engine, the root-key custodian, the backend gateway,
//! the Keeper protocol driver and the policy evaluator so every crate in the
//! workspace agrees on their shape without depending on each other's
//! implementation crates.

pub mod crypto;
pub mod directory;
pub mod policy;
pub mod secret;

pub use crypto::{KeeperId, ShamirParameters, Share};
pub use directory::KeeperDirectory;
pub use policy::{Permission, Policy};
pub use secret::{Secret, SecretVersion};

/// A signal returned by storage-backed lookups that distinguishes
/// "the entity does not exist" from a genuine I/O or encoding failure.
///
/// Per `spec.md` §7's "Not-found" error kind: callers are expected to treat
/// this distinctly from other errors (e.g. not log it at error level), so
/// it is a plain marker type rather than folded into a crate's `thiserror`
/// enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotFound;

impl std::fmt::Display for NotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("entity not found")
    }
}

impl std::error::Error for NotFound {}
