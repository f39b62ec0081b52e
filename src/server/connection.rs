//! Client Connection
//!
//! Per-connection loop: buffer incoming bytes, cut complete requests off the
//! front of the buffer, dispatch them one by one and write each reply before
//! the next request runs, so replies keep request order.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{ProtocolError, RejectReason};
use crate::protocol::command::{self, client_error, server_error};
use crate::protocol::{self, Parsed};
use crate::server::Dispatcher;

const READ_CHUNK: usize = 4096;

/// What the connection does after handling buffered input.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

// == Connection ==
/// A client session over any byte stream.
pub struct Connection<S> {
    stream: S,
    buffer: Vec<u8>,
    dispatcher: Dispatcher,
    shutdown: watch::Receiver<bool>,
    peer: String,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        peer: impl Into<String>,
        dispatcher: Dispatcher,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            stream,
            buffer: Vec::with_capacity(READ_CHUNK),
            dispatcher,
            shutdown,
            peer: peer.into(),
        }
    }

    // == Run ==
    /// Serves the client until it disconnects, sends unrecoverable input, or
    /// the server shuts down.
    pub async fn run(mut self) -> io::Result<()> {
        debug!(peer = %self.peer, "connection opened");
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if self.process_buffer().await? == Flow::Close {
                break;
            }
            if *self.shutdown.borrow() {
                break;
            }

            let read = tokio::select! {
                read = self.stream.read(&mut chunk) => read?,
                _ = self.shutdown.changed() => break,
            };
            if read == 0 {
                if !self.buffer.is_empty() {
                    debug!(peer = %self.peer, pending = self.buffer.len(), "client closed mid-request");
                }
                break;
            }
            self.buffer.extend_from_slice(&chunk[..read]);
        }

        self.stream.flush().await?;
        debug!(peer = %self.peer, "connection closed");
        Ok(())
    }

    /// Handles every complete request currently buffered.
    async fn process_buffer(&mut self) -> io::Result<Flow> {
        loop {
            match protocol::parse(&self.buffer) {
                Parsed::Incomplete => return Ok(Flow::Continue),
                Parsed::Request { request, consumed } => {
                    self.buffer.drain(..consumed);
                    debug!(
                        peer = %self.peer,
                        command = request.command.name(),
                        argument_len = request.argument.len(),
                        "request"
                    );

                    match self.dispatcher.dispatch(request).await {
                        Ok(reply) => self.stream.write_all(&reply).await?,
                        Err(RejectReason::QueueFull) => {
                            warn!(peer = %self.peer, "executor queue full, request rejected");
                            self.stream
                                .write_all(&server_error("out of capacity"))
                                .await?;
                        }
                        Err(RejectReason::NotRunning) => {
                            self.stream.write_all(&server_error("shutting down")).await?;
                            return Ok(Flow::Close);
                        }
                    }
                }
                Parsed::Invalid { error, consumed } => {
                    self.buffer.drain(..consumed);
                    debug!(peer = %self.peer, %error, "invalid request");

                    let reply = match error {
                        ProtocolError::UnknownCommand => command::ERROR.to_vec(),
                        ref other => client_error(other),
                    };
                    self.stream.write_all(&reply).await?;
                    if !error.is_recoverable() {
                        return Ok(Flow::Close);
                    }
                }
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio_test::io::Builder;

    use crate::cache::{self, CacheStore};
    use crate::executor::{ExecutorConfig, TaskExecutor};

    fn inline() -> Dispatcher {
        Dispatcher::inline(cache::shared(CacheStore::new(1024)))
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let stream = Builder::new()
            .read(b"set greeting 0 0 5\r\nhello\r\n")
            .write(b"STORED\r\n")
            .read(b"get greeting\r\n")
            .write(b"VALUE greeting 0 5\r\nhello\r\nEND\r\n")
            .build();
        let (_tx, rx) = watch::channel(false);

        Connection::new(stream, "test", inline(), rx).run().await.unwrap();
    }

    #[tokio::test]
    async fn test_request_split_across_reads() {
        let stream = Builder::new()
            .read(b"se")
            .read(b"t k 0 0 4\r\nab")
            .read(b"cd\r")
            .read(b"\ndelete k\r\ndelete k\r\n")
            .write(b"STORED\r\n")
            .write(b"DELETED\r\n")
            .write(b"NOT_FOUND\r\n")
            .build();
        let (_tx, rx) = watch::channel(false);

        Connection::new(stream, "test", inline(), rx).run().await.unwrap();
    }

    #[tokio::test]
    async fn test_errors_keep_connection_open() {
        let stream = Builder::new()
            .read(b"bogus\r\n")
            .write(b"ERROR\r\n")
            .read(b"set k 0 0 2\r\nabc\r")
            .write(b"CLIENT_ERROR bad data chunk\r\n")
            .read(b"add k 0 0 1\r\nx\r\n")
            .write(b"STORED\r\n")
            .build();
        let (_tx, rx) = watch::channel(false);

        Connection::new(stream, "test", inline(), rx).run().await.unwrap();
    }

    #[tokio::test]
    async fn test_line_too_long_closes_connection() {
        let long_line = vec![b'a'; protocol::MAX_LINE_LENGTH + 10];
        let stream = Builder::new()
            .read(&long_line)
            .write(b"CLIENT_ERROR line too long\r\n")
            .build();
        let (_tx, rx) = watch::channel(false);

        Connection::new(stream, "test", inline(), rx).run().await.unwrap();
    }

    #[tokio::test]
    async fn test_longest_line_split_before_lf() {
        let mut first = crate::protocol::parser::tests::longest_get_line();
        first.push(b'\r');
        let stream = Builder::new()
            .read(&first)
            .read(b"\n")
            .write(b"END\r\n")
            .build();
        let (_tx, rx) = watch::channel(false);

        Connection::new(stream, "test", inline(), rx).run().await.unwrap();
    }

    #[tokio::test]
    async fn test_stopped_executor_closes_connection() {
        let executor = TaskExecutor::new(ExecutorConfig {
            idle_timeout: Duration::from_millis(20),
            ..ExecutorConfig::default()
        });
        executor.start().unwrap();
        executor.stop(true);
        let dispatcher =
            Dispatcher::pooled(cache::shared(CacheStore::new(1024)), Arc::new(executor));

        let stream = Builder::new()
            .read(b"get k\r\n")
            .write(b"SERVER_ERROR shutting down\r\n")
            .build();
        let (_tx, rx) = watch::channel(false);

        Connection::new(stream, "test", dispatcher, rx).run().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_signal_closes_idle_connection() {
        let (client, server) = tokio::io::duplex(64);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(Connection::new(server, "test", inline(), rx).run());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("connection did not stop")
            .unwrap()
            .unwrap();
        drop(client);
    }
}
