//! Server-sent-events frame encoding.
//!
//! One published message is always exactly one event: a single-line payload
//! becomes `data: <payload>\n\n`. Line breaks inside a payload (`\n`, `\r\n`
//! or `\r`) start a new `data:` line of the same event, so a payload can never
//! terminate its frame early.
//!
//! The gateway only encodes. `decode_data` and `split_frames` are the reading
//! side for stream consumers (clients, test harnesses) built on this crate.

use bytes::{BufMut, Bytes, BytesMut};

/// Field prefix for every data line.
pub const DATA_PREFIX: &str = "data: ";

/// Payload of the first frame a session emits.
pub fn welcome_payload(client_id: &str) -> String {
    format!("Welcome {client_id}!")
}

/// Encode one payload as a complete frame.
pub fn encode_data(payload: &str) -> Bytes {
    let normalized = payload.replace("\r\n", "\n");
    let mut buf = BytesMut::with_capacity(normalized.len() + DATA_PREFIX.len() + 2);
    for line in normalized.split(['\n', '\r']) {
        buf.put_slice(DATA_PREFIX.as_bytes());
        buf.put_slice(line.as_bytes());
        buf.put_u8(b'\n');
    }
    buf.put_u8(b'\n');
    buf.freeze()
}

/// Welcome frame for `client_id`.
pub fn encode_welcome(client_id: &str) -> Bytes {
    encode_data(&welcome_payload(client_id))
}

/// Decode one frame (with or without its trailing blank line) back into its
/// payload. Returns `None` if the frame carries no `data` field.
///
/// Lines of other fields and comments (`:`) are ignored; a `data:` line with no
/// space after the colon is accepted.
pub fn decode_data(frame: &str) -> Option<String> {
    let mut out: Option<String> = None;
    for line in frame.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(rest) = line.strip_prefix("data:") else { continue; };
        let value = rest.strip_prefix(' ').unwrap_or(rest);
        match out.as_mut() {
            Some(acc) => {
                acc.push('\n');
                acc.push_str(value);
            }
            None => out = Some(value.to_string()),
        }
    }
    out
}

/// Split a buffered stream into complete frames, returning them and the
/// unconsumed tail.
pub fn split_frames(buf: &str) -> (Vec<&str>, &str) {
    let mut frames = Vec::new();
    let mut rest = buf;
    while let Some(idx) = rest.find("\n\n") {
        frames.push(&rest[..idx]);
        rest = &rest[idx + 2..];
    }
    (frames, rest)
}
