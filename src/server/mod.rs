//! Server Module
//!
//! TCP front end for the text protocol: accept loop, per-client connection
//! tasks and request dispatch.

pub mod connection;
pub mod dispatch;

pub use connection::Connection;
pub use dispatch::Dispatcher;

use std::io;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

// == Accept Loop ==
/// Accepts clients until `shutdown` flips to `true`, then waits for the open
/// connections to finish their current request and close.
pub async fn run_server(
    listener: TcpListener,
    dispatcher: Dispatcher,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    info!("Cache protocol listening on {}", listener.local_addr()?);
    let mut connections = JoinSet::new();

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(%peer, "set_nodelay failed: {}", e);
                }

                let connection =
                    Connection::new(stream, peer.to_string(), dispatcher.clone(), shutdown.clone());
                connections.spawn(async move {
                    if let Err(e) = connection.run().await {
                        debug!(%peer, "connection error: {}", e);
                    }
                });
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            _ = shutdown.changed() => break,
        }
    }

    info!(open = connections.len(), "Cache protocol listener stopping");
    while connections.join_next().await.is_some() {}
    Ok(())
}
