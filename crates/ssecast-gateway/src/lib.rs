//! ssecast gateway library entry.
//!
//! This crate wires the broker, the streaming session adapter, the HTTP
//! transport and the demo producer into one server. It is intended to be
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod broker;
pub mod config;
pub mod ops;
pub mod producer;
pub mod router;
pub mod session;
pub mod transport;
