//! Protocol commands and their execution against the cache.

use crate::cache::CacheStore;

pub const STORED: &[u8] = b"STORED\r\n";
pub const NOT_STORED: &[u8] = b"NOT_STORED\r\n";
pub const DELETED: &[u8] = b"DELETED\r\n";
pub const NOT_FOUND: &[u8] = b"NOT_FOUND\r\n";
pub const END: &[u8] = b"END\r\n";
pub const ERROR: &[u8] = b"ERROR\r\n";

// == Command ==
/// A decoded request header.
///
/// Storage commands carry the length of the data block that follows the
/// header; the data itself is passed to [`Command::execute`] as the argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `set`: insert or overwrite
    Set { key: String, bytes: usize },
    /// `add`: insert only if absent
    Add { key: String, bytes: usize },
    /// `replace`: overwrite only if present
    Replace { key: String, bytes: usize },
    /// `get`: read one or more keys
    Get { keys: Vec<String> },
    /// `delete`: remove a key
    Delete { key: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "set",
            Command::Add { .. } => "add",
            Command::Replace { .. } => "replace",
            Command::Get { .. } => "get",
            Command::Delete { .. } => "delete",
        }
    }

    /// Length of the data block expected after the header.
    pub fn argument_len(&self) -> usize {
        match self {
            Command::Set { bytes, .. }
            | Command::Add { bytes, .. }
            | Command::Replace { bytes, .. } => *bytes,
            Command::Get { .. } | Command::Delete { .. } => 0,
        }
    }

    // == Execute ==
    /// Runs the command and renders the textual reply, CRLF included.
    ///
    /// `argument` must already have the length announced in the header.
    pub fn execute(&self, cache: &mut CacheStore, argument: &[u8]) -> Vec<u8> {
        let stored = |ok: bool| reply(ok, STORED, NOT_STORED);

        match self {
            Command::Set { key, .. } => stored(cache.put(key, argument)),
            Command::Add { key, .. } => stored(cache.put_if_absent(key, argument)),
            Command::Replace { key, .. } => stored(cache.set(key, argument)),
            Command::Delete { key } => reply(cache.delete(key), DELETED, NOT_FOUND),
            Command::Get { keys } => {
                let mut out = Vec::new();
                for key in keys {
                    if let Some(value) = cache.get(key) {
                        let header = format!("VALUE {} 0 {}\r\n", key, value.len());
                        out.extend_from_slice(header.as_bytes());
                        out.extend_from_slice(value);
                        out.extend_from_slice(b"\r\n");
                    }
                }
                out.extend_from_slice(END);
                out
            }
        }
    }
}

fn reply(ok: bool, success: &[u8], failure: &[u8]) -> Vec<u8> {
    if ok {
        success.to_vec()
    } else {
        failure.to_vec()
    }
}

// == Error Replies ==
/// `CLIENT_ERROR <reason>` reply.
pub fn client_error(reason: impl std::fmt::Display) -> Vec<u8> {
    format!("CLIENT_ERROR {reason}\r\n").into_bytes()
}

/// `SERVER_ERROR <reason>` reply.
pub fn server_error(reason: impl std::fmt::Display) -> Vec<u8> {
    format!("SERVER_ERROR {reason}\r\n").into_bytes()
}
