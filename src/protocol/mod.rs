//! Protocol Module
//!
//! memcached-style text protocol: `set`, `add`, `replace`, `get` and
//! `delete`, mapped onto the five cache operations.

pub mod command;
pub mod parser;

pub use command::Command;
pub use parser::{parse, Parsed, Request};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 250;

/// Maximum allowed data block size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

/// Maximum header line length in bytes, CRLF excluded
pub const MAX_LINE_LENGTH: usize = 2048;
