//! Wire protocol for the event stream.
//!
//! Only the `data:` field of the server-sent-events format is produced; no
//! `event:`, `id:` or `retry:` fields are emitted.

pub mod frame;
