//! HTTP streaming sink
//!
//! Bridges the dispatcher's [`ResponseSink`] writes into a streamed axum
//! response body. When the client goes away the channel closes and the next
//! write fails, which the dispatcher treats as cancellation.

use std::convert::Infallible;

use async_trait::async_trait;
use axum::body::Body;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use plotter_dispatch::{ResponseSink, SinkError};

/// Buffered chunks between the dispatcher and the HTTP connection.
const BODY_BUFFER: usize = 32;

/// Sink feeding a streamed response body.
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

#[async_trait]
impl ResponseSink for ChannelSink {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), SinkError> {
        self.tx
            .send(Bytes::copy_from_slice(chunk))
            .await
            .map_err(|_| SinkError)
    }
}

/// Create a sink/body pair: bytes written to the sink stream out of the
/// body as they arrive.
pub fn streaming_body() -> (ChannelSink, Body) {
    let (tx, rx) = mpsc::channel(BODY_BUFFER);
    let stream = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    (ChannelSink { tx }, Body::from_stream(stream))
}
