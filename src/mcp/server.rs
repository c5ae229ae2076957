//! MCP server loop.
//!
//! The server reads one line at a time, hands it to the [`Dispatcher`] and
//! writes back at most one line before reading the next:
//!
//! 1. **Decode**: lines that are not valid envelopes are answered directly
//!    with a parse or invalid-request error.
//! 2. **Dispatch**: requests get exactly one response; notifications get none.
//! 3. **Shutdown**: EOF or a termination signal ends the loop cleanly. An I/O
//!    failure on either stream ends it with an error; a line that is not
//!    UTF-8 is answered like any other parse failure.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::mcp::dispatch::Dispatcher;
use crate::mcp::protocol::{parse_message, JsonRpcError};
use crate::mcp::transport::{Line, LineTransport, StdioTransport};

/// Loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Reading and handling lines.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// The MCP server: a dispatcher attached to a line transport.
pub struct McpServer<R, W> {
    /// Current loop state.
    state: ServerState,
    /// The transport layer.
    transport: LineTransport<R, W>,
    /// Session, registry and method routing.
    dispatcher: Dispatcher,
}

impl McpServer<tokio::io::Stdin, tokio::io::Stdout> {
    /// Creates a server speaking over the process's stdin and stdout.
    #[must_use]
    pub fn stdio(dispatcher: Dispatcher) -> Self {
        Self::new(dispatcher, StdioTransport::stdio())
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a server over an arbitrary transport.
    #[must_use]
    pub const fn new(dispatcher: Dispatcher, transport: LineTransport<R, W>) -> Self {
        Self {
            state: ServerState::Running,
            transport,
            dispatcher,
        }
    }

    /// Returns the current loop state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Returns the dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Consumes the server, returning the transport's writer.
    pub fn into_writer(self) -> W {
        self.transport.into_writer()
    }

    /// Runs the main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.run_with_shutdown().await
    }

    /// Runs the main loop until the input reaches EOF, without signal
    /// handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run_until_eof(&mut self) -> std::io::Result<()> {
        loop {
            let line_result = self.transport.read_line().await;
            if self.handle_transport_result(line_result).await? {
                return Ok(());
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        line_result: std::io::Result<Option<Line>>,
    ) -> std::io::Result<bool> {
        let Some(line) = line_result? else {
            tracing::info!("Input closed, shutting down");
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected line that is not valid UTF-8");
                self.transport.write_error(&JsonRpcError::parse_error()).await?;
                return Ok(false);
            }
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        self.handle_line(&line).await?;

        Ok(self.state == ServerState::ShuttingDown)
    }

    /// Handles a single line of input.
    async fn handle_line(&mut self, line: &str) -> std::io::Result<()> {
        let msg = match parse_message(line) {
            Ok(msg) => msg,
            Err(error) => {
                tracing::warn!(
                    code = error.error.code,
                    message = %error.error.message,
                    "Rejected malformed message"
                );
                return self.transport.write_error(&error).await;
            }
        };

        tracing::debug!(method = msg.method(), id = ?msg.id(), "Received message");

        match self.dispatcher.handle(&msg) {
            Some(Ok(response)) => self.transport.write_response(&response).await,
            Some(Err(error)) => self.transport.write_error(&error).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::dispatch::ServerInfo;
    use crate::mcp::registry::Registry;
    use serde_json::Value;

    async fn run(input: &str) -> (Vec<Value>, ServerState) {
        run_bytes(input.as_bytes()).await
    }

    async fn run_bytes(input: &[u8]) -> (Vec<Value>, ServerState) {
        let dispatcher = Dispatcher::new(Registry::default(), ServerInfo::default());
        let transport = LineTransport::new(input, Vec::new());
        let mut server = McpServer::new(dispatcher, transport);

        server.run_until_eof().await.unwrap();
        let state = server.state();

        let output = String::from_utf8(server.into_writer()).unwrap();
        let lines = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (lines, state)
    }

    #[tokio::test]
    async fn eof_shuts_down_cleanly() {
        let (lines, state) = run("").await;
        assert!(lines.is_empty());
        assert_eq!(state, ServerState::ShuttingDown);
    }

    #[tokio::test]
    async fn blank_lines_are_ignored() {
        let (lines, _) = run("\n   \n\r\n").await;
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn notifications_are_silent() {
        let (lines, _) = run(concat!(
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"no/such/method"}"#,
            "\n",
        ))
        .await;
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn parse_error_then_continue() {
        let (lines, _) = run(concat!(
            "{not json\n",
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#,
            "\n",
        ))
        .await;

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["error"]["code"], -32700);
        assert!(lines[0]["id"].is_null());
        assert_eq!(lines[1]["id"], 1);
        assert!(lines[1]["result"].is_object());
    }

    #[tokio::test]
    async fn non_utf8_line_gets_parse_error() {
        let (lines, state) =
            run_bytes(b"\xc3\x28\n{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"initialize\"}\n").await;

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["error"]["code"], -32700);
        assert!(lines[0]["id"].is_null());
        assert_eq!(lines[1]["id"], 3);
        assert_eq!(state, ServerState::ShuttingDown);
    }
}
