//! TCP socket transport.
//!
//! Same newline-delimited framing as stdio, one [`LineServer`] per
//! accepted connection. Connections are independent: a protocol error or
//! disconnect on one never affects another, and the accept loop runs
//! until the process shuts down.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

use super::dispatcher::Dispatcher;
use super::server::LineServer;
use super::transport::LineTransport;

/// Binds the listener and serves connections until shutdown.
///
/// # Errors
///
/// Returns an error if the bind fails. Per-connection I/O errors are
/// logged and never propagate out of the accept loop.
pub async fn run_socket(bind: SocketAddr, dispatcher: Dispatcher) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    tracing::info!(%bind, "socket transport listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };

        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            handle_connection(stream, peer, dispatcher).await;
        });
    }
}

/// Serves one accepted connection to completion.
async fn handle_connection(stream: TcpStream, peer: SocketAddr, dispatcher: Dispatcher) {
    tracing::info!(%peer, "connection accepted");

    let (reader, writer) = stream.into_split();
    let mut server = LineServer::new(LineTransport::new(reader, writer), dispatcher);

    match server.serve().await {
        Ok(()) => tracing::info!(%peer, "connection closed"),
        Err(e) => tracing::warn!(%peer, error = %e, "connection failed"),
    }
}
