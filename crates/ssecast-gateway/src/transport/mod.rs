//! Transport layer (HTTP event stream).
//!
//! Exposes the event-stream handler and the HTTP mapping of the shared error
//! type.

pub mod error;
pub mod sse;
