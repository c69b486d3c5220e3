use async_trait::async_trait;
use std::io;
use taquilla_core::{SearchRequest, SearchResponse};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// The server replies with a single document well under this size.
pub const DEFAULT_READ_LIMIT: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },

    #[error("could not send the request: {0}")]
    Write(#[source] io::Error),

    #[error("could not read the response: {0}")]
    Read(#[source] io::Error),

    /// The payload was not JSON at all.
    #[error("malformed response: {0}")]
    Decode(#[source] serde_json::Error),

    /// Well-formed JSON that does not match the response schema.
    #[error("unexpected response shape: {0}")]
    Protocol(#[source] serde_json::Error),
}

impl TransportError {
    /// Whether the socket itself failed, as opposed to the server sending a
    /// document we could not understand.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            TransportError::Connect { .. } | TransportError::Write(_) | TransportError::Read(_)
        )
    }
}

/// Port for the one-exchange request/response cycle. The engine and the
/// dispatcher only ever talk to this trait, so tests can swap the socket
/// for a scripted double.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn send(&self, request: &SearchRequest) -> Result<SearchResponse, TransportError>;
}

/// One TCP connection per exchange: connect, write the JSON document,
/// half-close, read until the server closes, decode. No pooling, no retry —
/// retry policy belongs to the caller.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    addr: String,
    read_limit: usize,
}

impl TcpTransport {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            read_limit: DEFAULT_READ_LIMIT,
        }
    }

    pub fn with_read_limit(mut self, read_limit: usize) -> Self {
        self.read_limit = read_limit;
        self
    }
}

#[async_trait]
impl SearchTransport for TcpTransport {
    async fn send(&self, request: &SearchRequest) -> Result<SearchResponse, TransportError> {
        let mut stream =
            TcpStream::connect(&self.addr)
                .await
                .map_err(|source| TransportError::Connect {
                    addr: self.addr.clone(),
                    source,
                })?;

        let payload = serde_json::to_vec(request).map_err(TransportError::Decode)?;
        tracing::debug!(addr = %self.addr, bytes = payload.len(), "sending request");
        stream
            .write_all(&payload)
            .await
            .map_err(TransportError::Write)?;
        // Half-close so the server sees EOF on its read.
        stream.shutdown().await.map_err(TransportError::Write)?;

        let mut raw = Vec::with_capacity(4096);
        let mut limited = stream.take(self.read_limit as u64);
        limited
            .read_to_end(&mut raw)
            .await
            .map_err(TransportError::Read)?;
        tracing::debug!(addr = %self.addr, bytes = raw.len(), "received response");

        decode_response(&raw)
    }
}

/// Two-stage decode: a syntax failure means the bytes were not JSON, while a
/// valid document missing expected fields is a protocol-level failure and is
/// reported apart.
fn decode_response(raw: &[u8]) -> Result<SearchResponse, TransportError> {
    let value: serde_json::Value = serde_json::from_slice(raw).map_err(TransportError::Decode)?;
    serde_json::from_value(value).map_err(TransportError::Protocol)
}
