//! In-memory TSDB backend
//!
//! Holds raw points per stream and computes aligned-window aggregates on the
//! fly. Used by the test suites and by dev-mode deployments that have no
//! database to talk to. Streams can be poisoned to exercise the dispatcher's
//! mid-stream error paths.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{Result, TsdbError};
use crate::{RawPoint, StatPoint, StatStream, TsdbClient};

/// Channel capacity for streamed windows; small so that backpressure from a
/// slow client reaches the producer quickly.
const STREAM_BUFFER: usize = 16;

struct MemoryStream {
    collection: String,
    /// Sorted by time.
    points: Vec<RawPoint>,
    /// When set, queries against this stream fail with this message after
    /// delivering any points.
    poison: Option<String>,
}

/// In-memory [`TsdbClient`] implementation.
pub struct MemoryTsdb {
    streams: RwLock<HashMap<Uuid, MemoryStream>>,
}

impl MemoryTsdb {
    pub fn new() -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
        }
    }

    /// Register a stream under a collection path.
    pub fn add_stream(&self, uuid: Uuid, collection: impl Into<String>) {
        self.streams.write().expect("tsdb lock poisoned").insert(
            uuid,
            MemoryStream {
                collection: collection.into(),
                points: Vec::new(),
                poison: None,
            },
        );
    }

    /// Append raw points to a stream. Points are kept sorted by time.
    ///
    /// # Panics
    ///
    /// Panics if the stream has not been registered.
    pub fn add_points(&self, uuid: Uuid, points: impl IntoIterator<Item = (i64, f64)>) {
        let mut streams = self.streams.write().expect("tsdb lock poisoned");
        let stream = streams.get_mut(&uuid).expect("unknown stream");
        stream
            .points
            .extend(points.into_iter().map(|(time, value)| RawPoint { time, value }));
        stream.points.sort_by_key(|p| p.time);
    }

    /// Make every subsequent query against `uuid` fail with `message`,
    /// after any buffered points have been delivered.
    pub fn poison(&self, uuid: Uuid, message: impl Into<String>) {
        let mut streams = self.streams.write().expect("tsdb lock poisoned");
        if let Some(stream) = streams.get_mut(&uuid) {
            stream.poison = Some(message.into());
        }
    }

    /// Aggregate the stream's points into aligned buckets. A poisoned stream
    /// still yields its points, followed by the injected error.
    fn windows(
        &self,
        uuid: Uuid,
        start: i64,
        end: i64,
        pw: u8,
    ) -> Result<(Vec<StatPoint>, Option<TsdbError>)> {
        let streams = self.streams.read().expect("tsdb lock poisoned");
        let stream = streams.get(&uuid).ok_or(TsdbError::StreamNotFound)?;

        let mut out: Vec<StatPoint> = Vec::new();
        for point in &stream.points {
            if point.time < start || point.time >= end {
                continue;
            }
            let bucket = (point.time >> pw) << pw;
            match out.last_mut() {
                Some(last) if last.time == bucket => {
                    last.min = last.min.min(point.value);
                    last.max = last.max.max(point.value);
                    // running mean over the bucket
                    let n = last.count as f64;
                    last.mean = (last.mean * n + point.value) / (n + 1.0);
                    last.count += 1;
                }
                _ => out.push(StatPoint {
                    time: bucket,
                    min: point.value,
                    mean: point.value,
                    max: point.value,
                    count: 1,
                }),
            }
        }

        let poison = stream
            .poison
            .as_ref()
            .map(|message| TsdbError::Backend(message.clone()));
        Ok((out, poison))
    }
}

impl Default for MemoryTsdb {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TsdbClient for MemoryTsdb {
    async fn exists(&self, uuid: Uuid) -> Result<bool> {
        let streams = self.streams.read().expect("tsdb lock poisoned");
        Ok(streams.contains_key(&uuid))
    }

    async fn collection(&self, uuid: Uuid) -> Result<String> {
        let streams = self.streams.read().expect("tsdb lock poisoned");
        streams
            .get(&uuid)
            .map(|s| s.collection.clone())
            .ok_or(TsdbError::StreamNotFound)
    }

    fn aligned_windows(
        &self,
        cancel: CancellationToken,
        uuid: Uuid,
        start: i64,
        end: i64,
        pw: u8,
    ) -> StatStream {
        let (point_tx, point_rx) = mpsc::channel(STREAM_BUFFER);
        let (error_tx, error_rx) = mpsc::channel(1);

        // Aggregation happens eagerly against the snapshot; delivery is lazy
        // and honors cancellation and receiver drop.
        let result = self.windows(uuid, start, end, pw);

        tokio::spawn(async move {
            let (windows, poison) = match result {
                Ok(pair) => pair,
                Err(err) => {
                    let _ = error_tx.send(err).await;
                    return;
                }
            };
            for window in windows {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    sent = point_tx.send(window) => {
                        if sent.is_err() {
                            return; // receiver dropped
                        }
                    }
                }
            }
            if let Some(err) = poison {
                let _ = error_tx.send(err).await;
            }
        });

        StatStream {
            points: point_rx,
            errors: error_rx,
        }
    }

    async fn nearest(
        &self,
        cancel: CancellationToken,
        uuid: Uuid,
        time: i64,
        backward: bool,
    ) -> Result<RawPoint> {
        if cancel.is_cancelled() {
            return Err(TsdbError::Cancelled);
        }
        let streams = self.streams.read().expect("tsdb lock poisoned");
        let stream = streams.get(&uuid).ok_or(TsdbError::StreamNotFound)?;
        if let Some(message) = &stream.poison {
            return Err(TsdbError::Backend(message.clone()));
        }

        let found = if backward {
            stream.points.iter().rev().find(|p| p.time < time)
        } else {
            stream.points.iter().find(|p| p.time >= time)
        };
        found.copied().ok_or(TsdbError::NoPoint)
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
