//! Text Protocol Parser
//!
//! Extracts complete requests (header line plus data block) from the front of
//! a connection buffer. The parser keeps no state of its own: the caller owns
//! the buffer, drains `consumed` bytes after each result and calls again.

use crate::error::ProtocolError;
use crate::protocol::{Command, MAX_KEY_LENGTH, MAX_LINE_LENGTH, MAX_VALUE_SIZE};

/// A fully received request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    /// Data block without its trailing CRLF; empty for retrieval commands
    pub argument: Vec<u8>,
}

/// Outcome of one parse attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Parsed {
    /// More bytes are needed
    Incomplete,
    /// A request was decoded from the first `consumed` bytes
    Request { request: Request, consumed: usize },
    /// The first `consumed` bytes are invalid and should be discarded
    Invalid { error: ProtocolError, consumed: usize },
}

// == Parse ==
/// Parses one request from the start of `buf`.
pub fn parse(buf: &[u8]) -> Parsed {
    let Some(line_end) = find_crlf(buf) else {
        // A full-length line may still be waiting for the LF after its CR
        if buf.len() > MAX_LINE_LENGTH + 1 {
            return Parsed::Invalid {
                error: ProtocolError::LineTooLong,
                consumed: buf.len(),
            };
        }
        return Parsed::Incomplete;
    };
    let header_len = line_end + 2;
    if line_end > MAX_LINE_LENGTH {
        return Parsed::Invalid {
            error: ProtocolError::LineTooLong,
            consumed: header_len,
        };
    }

    let command = match parse_header(&buf[..line_end]) {
        Ok(command) => command,
        Err(error) => {
            return Parsed::Invalid {
                error,
                consumed: header_len,
            }
        }
    };

    let bytes = command.argument_len();
    if matches!(command, Command::Get { .. } | Command::Delete { .. }) {
        return Parsed::Request {
            request: Request {
                command,
                argument: Vec::new(),
            },
            consumed: header_len,
        };
    }

    let total = header_len + bytes + 2;
    if buf.len() < total {
        return Parsed::Incomplete;
    }
    if &buf[header_len + bytes..total] != b"\r\n" {
        return Parsed::Invalid {
            error: ProtocolError::BadDataChunk,
            consumed: total,
        };
    }

    Parsed::Request {
        request: Request {
            command,
            argument: buf[header_len..header_len + bytes].to_vec(),
        },
        consumed: total,
    }
}

// == Header ==
/// Decodes a header line (without CRLF) into a command.
pub fn parse_header(line: &[u8]) -> Result<Command, ProtocolError> {
    let line = std::str::from_utf8(line).map_err(|_| ProtocolError::BadFormat)?;
    let mut tokens = line.split_ascii_whitespace();
    let name = tokens.next().ok_or(ProtocolError::UnknownCommand)?;
    let args: Vec<&str> = tokens.collect();

    match name {
        "set" | "add" | "replace" => {
            let [key, flags, exptime, bytes] = args[..] else {
                return Err(ProtocolError::BadFormat);
            };
            let key = parse_key(key)?;
            flags.parse::<u32>().map_err(|_| ProtocolError::BadFormat)?;
            exptime.parse::<i64>().map_err(|_| ProtocolError::BadFormat)?;
            let bytes = bytes.parse::<usize>().map_err(|_| ProtocolError::BadFormat)?;
            if bytes > MAX_VALUE_SIZE {
                return Err(ProtocolError::ValueTooLarge);
            }
            Ok(match name {
                "set" => Command::Set { key, bytes },
                "add" => Command::Add { key, bytes },
                _ => Command::Replace { key, bytes },
            })
        }
        "get" | "gets" => {
            if args.is_empty() {
                return Err(ProtocolError::BadFormat);
            }
            let keys = args
                .into_iter()
                .map(parse_key)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Command::Get { keys })
        }
        "delete" => {
            let [key] = args[..] else {
                return Err(ProtocolError::BadFormat);
            };
            Ok(Command::Delete {
                key: parse_key(key)?,
            })
        }
        _ => Err(ProtocolError::UnknownCommand),
    }
}

fn parse_key(key: &str) -> Result<String, ProtocolError> {
    if key.is_empty() || key.len() > MAX_KEY_LENGTH || key.chars().any(char::is_control) {
        return Err(ProtocolError::InvalidKey);
    }
    Ok(key.to_string())
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|window| window == b"\r\n")
}
