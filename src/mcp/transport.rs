//! Line transport for the MCP server.
//!
//! This module implements the stdio transport as specified by MCP:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! [`LineTransport`] is generic over any async reader and writer so the
//! server loop can be driven from in-memory buffers; [`StdioTransport`] is the
//! process-level instance.

use std::io;
use std::string::FromUtf8Error;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::mcp::protocol::{JsonRpcError, JsonRpcResponse};

/// One decoded input line, or the UTF-8 error for a line that could not be
/// decoded.
pub type Line = Result<String, FromUtf8Error>;

/// A newline-delimited JSON transport.
pub struct LineTransport<R, W> {
    /// Buffered reader for incoming lines.
    reader: BufReader<R>,
    /// Sink for outgoing lines.
    writer: W,
}

/// The transport bound to the process's stdin and stdout.
pub type StdioTransport = LineTransport<tokio::io::Stdin, tokio::io::Stdout>;

impl StdioTransport {
    /// Creates a new stdio transport.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over the given reader and writer.
    #[must_use]
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Consumes the transport, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Reads the next message line.
    ///
    /// Returns `None` if the input is closed (EOF). A line that is not valid
    /// UTF-8 is returned as `Some(Err(_))`; it does not end the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from the underlying stream fails.
    pub async fn read_line(&mut self) -> io::Result<Option<Line>> {
        let mut buf = Vec::new();
        let bytes_read = self.reader.read_until(b'\n', &mut buf).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }

        Ok(Some(String::from_utf8(buf)))
    }

    /// Writes a JSON-RPC response.
    ///
    /// The response is serialised to JSON and terminated with a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        self.write_message(response).await
    }

    /// Writes a JSON-RPC error.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_error(&mut self, error: &JsonRpcError) -> io::Result<()> {
        self.write_message(error).await
    }

    async fn write_message<T: Serialize>(&mut self, message: &T) -> io::Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.write_raw(&json).await
    }

    /// Writes a raw JSON string with newline termination.
    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        // MCP spec: messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }
}
