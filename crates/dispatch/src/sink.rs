//! Response sink abstraction
//!
//! The dispatcher streams response bytes without knowing what transport they
//! land on. The HTTP implementation feeds a streamed response body; the
//! WebSocket implementation accumulates the text frame for the in-flight
//! request. Nothing beyond a single `write` call is atomic.

use async_trait::async_trait;
use thiserror::Error;

/// The client went away before the response was fully written.
///
/// Dispatchers treat this as cancellation: they stop the TSDB streams and
/// release their admission slot.
#[derive(Debug, Error)]
#[error("client disconnected")]
pub struct SinkError;

/// Destination for response bytes.
#[async_trait]
pub trait ResponseSink: Send {
    /// Write one chunk of the response.
    async fn write(&mut self, chunk: &[u8]) -> Result<(), SinkError>;
}

/// Sink that accumulates the response in memory.
///
/// Used for WebSocket frames (a frame is the message unit, so it is built
/// whole before sending) and by tests.
#[derive(Debug, Default)]
pub struct BufferSink {
    buf: Vec<u8>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The accumulated bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

#[async_trait]
impl ResponseSink for BufferSink {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), SinkError> {
        self.buf.extend_from_slice(chunk);
        Ok(())
    }
}
