//! API module for a Nexus instance.
//!
//! - [`health`] – the `/healthz` observability endpoint.

pub mod health;
