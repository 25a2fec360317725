//! Line-oriented MCP server loop.
//!
//! [`LineServer`] drives one newline-delimited connection: read a line,
//! parse it, dispatch requests, write the response. The stdio transport
//! runs exactly one such loop for the process lifetime with signal-driven
//! shutdown; the TCP socket transport runs one per accepted connection.
//!
//! Malformed input never tears the connection down: a parse or envelope
//! error is answered with the corresponding JSON-RPC error and the loop
//! continues. Notifications are consumed without producing any output.

use tokio::io::{AsyncRead, AsyncWrite};

use super::dispatcher::Dispatcher;
use super::protocol::{parse_message, IncomingMessage, JsonRpcNotification, JsonRpcRequest};
use super::transport::{LineTransport, StdioTransport};

/// One newline-delimited JSON-RPC connection bound to a dispatcher.
pub struct LineServer<R, W> {
    transport: LineTransport<R, W>,
    dispatcher: Dispatcher,
}

impl<R, W> LineServer<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a server loop over a transport.
    #[must_use]
    pub fn new(transport: LineTransport<R, W>, dispatcher: Dispatcher) -> Self {
        Self {
            transport,
            dispatcher,
        }
    }

    /// Serves the connection until the peer closes it.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails. A clean end of stream is
    /// not an error.
    pub async fn serve(&mut self) -> std::io::Result<()> {
        loop {
            let line_result = self.transport.read_line().await;
            if self.handle_transport_result(line_result).await? {
                return Ok(());
            }
        }
    }

    /// Handles the result from a transport read.
    ///
    /// Returns `true` if the connection ended.
    async fn handle_transport_result(
        &mut self,
        line_result: std::io::Result<Option<String>>,
    ) -> std::io::Result<bool> {
        let Some(line) = line_result? else {
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        self.handle_line(&line).await?;
        Ok(false)
    }

    /// Handles a single line of input.
    async fn handle_line(&mut self, line: &str) -> std::io::Result<()> {
        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => self.handle_request(req).await,
            Ok(IncomingMessage::Notification(ref notif)) => {
                Self::handle_notification(notif);
                Ok(())
            }
            Err(error) => self.transport.write_error(&error).await,
        }
    }

    /// Dispatches a request and writes its response.
    async fn handle_request(&mut self, req: JsonRpcRequest) -> std::io::Result<()> {
        tracing::debug!(method = %req.method, id = %req.id, "handling request");
        match self.dispatcher.dispatch(req).await {
            Ok(response) => self.transport.write_response(&response).await,
            Err(error) => self.transport.write_error(&error).await,
        }
    }

    /// Consumes a notification. Notifications never produce output.
    fn handle_notification(notif: &JsonRpcNotification) {
        tracing::debug!(method = %notif.method, "ignoring notification");
    }
}

/// Runs the stdio transport until stdin closes or a shutdown signal
/// arrives.
///
/// stdout carries nothing but protocol messages; all diagnostics go to
/// stderr via tracing.
///
/// # Errors
///
/// Returns an error if stdio I/O fails or signal handlers cannot be
/// installed.
#[cfg(unix)]
pub async fn run_stdio(dispatcher: Dispatcher) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;
    let mut server = LineServer::new(StdioTransport::stdio(), dispatcher);

    tracing::info!("stdio transport ready");

    tokio::select! {
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
            Ok(())
        }

        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
            Ok(())
        }

        result = server.serve() => {
            tracing::info!("stdin closed, shutting down");
            result
        }
    }
}

/// Runs the stdio transport until stdin closes or Ctrl+C arrives.
///
/// # Errors
///
/// Returns an error if stdio I/O fails.
#[cfg(windows)]
pub async fn run_stdio(dispatcher: Dispatcher) -> std::io::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut server = LineServer::new(StdioTransport::stdio(), dispatcher);

    tracing::info!("stdio transport ready");

    tokio::select! {
        _ = &mut ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
            Ok(())
        }

        result = server.serve() => {
            tracing::info!("stdin closed, shutting down");
            result
        }
    }
}
