//! ssecast core: transport-agnostic frame encoding and the shared error type.
//!
//! This crate defines the wire-level contract (server-sent-events framing) and
//! the error surface shared by the gateway and tooling. It intentionally carries
//! no transport or runtime dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `SseCastError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{Result, SseCastError};
