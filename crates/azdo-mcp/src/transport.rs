//! Stdio transport for MCP JSON-RPC communication.
//!
//! MCP uses newline-delimited JSON over stdin/stdout. Logging goes to stderr,
//! so stdout carries nothing but responses.

use std::io::{self, BufRead, Write};

use crate::protocol::{IncomingMessage, JsonRpcResponse};

/// Transport for reading/writing JSON-RPC messages.
pub struct StdioTransport {
    reader: Box<dyn BufRead + Send>,
    writer: Box<dyn Write + Send>,
}

impl StdioTransport {
    /// Create a transport using stdin/stdout.
    pub fn stdio() -> Self {
        Self {
            reader: Box::new(io::BufReader::new(io::stdin())),
            writer: Box::new(io::stdout()),
        }
    }

    /// Create a transport with custom reader/writer.
    pub fn new(reader: Box<dyn BufRead + Send>, writer: Box<dyn Write + Send>) -> Self {
        Self { reader, writer }
    }

    /// Read the next JSON-RPC message, skipping blank lines.
    ///
    /// Returns `Ok(None)` at EOF. A line that is not valid JSON-RPC yields an
    /// `InvalidData` error; the stream stays usable afterwards.
    pub fn read_message(&mut self) -> io::Result<Option<IncomingMessage>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            tracing::debug!("Received: {}", trimmed);

            return match IncomingMessage::parse(trimmed) {
                Ok(msg) => Ok(Some(msg)),
                Err(e) => {
                    tracing::warn!("Failed to parse message: {}", trimmed);
                    Err(io::Error::new(io::ErrorKind::InvalidData, e.message))
                }
            };
        }
    }

    /// Write a JSON-RPC response to the transport.
    pub fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        let json = serde_json::to_string(response).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Serialization error: {}", e))
        })?;

        tracing::debug!("Sending: {}", json);

        writeln!(self.writer, "{}", json)?;
        self.writer.flush()
    }
}
