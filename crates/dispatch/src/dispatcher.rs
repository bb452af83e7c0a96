//! Bounded dispatcher
//!
//! One `Dispatcher` instance admission-controls one class of queries.
//! `data_request` streams aligned statistical windows as a JSON array;
//! `bracket_request` fans out `2N` nearest-value lookups and assembles the
//! bracket document.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use plotter_tsdb::{split_time, TsdbClient, INVALID_TIME, TIME_HIGH, TIME_LOW};

use crate::sink::{ResponseSink, SinkError};

/// Decrements the waiting gauge on every exit path.
struct GaugeGuard<'a>(&'a AtomicU64);

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Admission-controlled dispatcher for one query class.
pub struct Dispatcher {
    tsdb: Arc<dyn TsdbClient>,
    admission: Arc<Semaphore>,
    total_waiting: AtomicU64,
    timeout: Duration,
    label: &'static str,
}

impl Dispatcher {
    /// Create a dispatcher allowing at most `max_pending` in-flight requests,
    /// each bounded by `request_timeout`.
    pub fn new(
        tsdb: Arc<dyn TsdbClient>,
        max_pending: usize,
        request_timeout: Duration,
        label: &'static str,
    ) -> Self {
        Self {
            tsdb,
            admission: Arc::new(Semaphore::new(max_pending)),
            total_waiting: AtomicU64::new(0),
            timeout: request_timeout,
            label,
        }
    }

    /// Requests currently waiting for admission or in flight.
    pub fn total_waiting(&self) -> u64 {
        self.total_waiting.load(Ordering::Relaxed)
    }

    /// Label for instrumentation logs.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Serve one data query: stream the aligned windows of `uuid` over
    /// `[start, end)` at width `2^pw` into `sink` as a JSON array of
    /// `[millis, nanos, min, mean, max, count]` tuples.
    ///
    /// `start` and `end` must already be aligned. A missing stream produces
    /// the literal `[]`; a backend error mid-stream appends
    /// `\nError: <text>` after whatever was already delivered.
    pub async fn data_request(
        &self,
        uuid: Uuid,
        start: i64,
        end: i64,
        pw: u8,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), SinkError> {
        self.total_waiting.fetch_add(1, Ordering::Relaxed);
        let _gauge = GaugeGuard(&self.total_waiting);
        let _permit = self
            .admission
            .acquire()
            .await
            .expect("admission semaphore never closes");

        debug!(
            dispatcher = self.label,
            %uuid, start, end, pw,
            "issuing data request"
        );

        // Cancelled when this function returns on any path; the TSDB stream
        // observes the child token and shuts down.
        let cancel = CancellationToken::new();
        let _abort = cancel.clone().drop_guard();

        match timeout(
            self.timeout,
            self.stream_windows(&cancel, uuid, start, end, pw, sink),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    dispatcher = self.label,
                    %uuid, start, end, pw,
                    "data request timed out"
                );
                sink.write(b"\nError: request timed out").await
            }
        }
    }

    async fn stream_windows(
        &self,
        cancel: &CancellationToken,
        uuid: Uuid,
        start: i64,
        end: i64,
        pw: u8,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), SinkError> {
        match self.tsdb.exists(uuid).await {
            Ok(true) => {}
            Ok(false) => return sink.write(b"[]").await,
            Err(err) => {
                warn!(dispatcher = self.label, %uuid, error = %err, "existence check failed");
                return sink.write(format!("Error: {}", err).as_bytes()).await;
            }
        }

        let mut stream = self
            .tsdb
            .aligned_windows(cancel.child_token(), uuid, start, end, pw);

        sink.write(b"[").await?;
        let mut first = true;
        while let Some(point) = stream.points.recv().await {
            let (millis, nanos) = split_time(point.time);
            let mut tuple = String::with_capacity(64);
            if !first {
                tuple.push(',');
            }
            let _ = write!(
                tuple,
                "[{},{},{},{},{},{}]",
                millis, nanos, point.min, point.mean, point.max, point.count
            );
            sink.write(tuple.as_bytes()).await?;
            first = false;
        }

        // The point channel is closed; anything in the error channel is the
        // reason the stream ended early.
        match stream.errors.recv().await {
            Some(err) => {
                warn!(dispatcher = self.label, %uuid, error = %err, "data stream failed");
                sink.write(format!("\nError: {}", err).as_bytes()).await
            }
            None => sink.write(b"]").await,
        }
    }

    /// Serve one bracket query: for every UUID, look up its earliest and
    /// latest points concurrently, then emit the bracket document.
    ///
    /// Missing streams and failed lookups contribute the invalid-time
    /// sentinel to their slot; the merged bracket skips sentinels.
    pub async fn bracket_request(
        &self,
        uuids: &[Uuid],
        sink: &mut dyn ResponseSink,
    ) -> Result<(), SinkError> {
        self.total_waiting.fetch_add(1, Ordering::Relaxed);
        let _gauge = GaugeGuard(&self.total_waiting);
        let _permit = self
            .admission
            .acquire()
            .await
            .expect("admission semaphore never closes");

        debug!(
            dispatcher = self.label,
            streams = uuids.len(),
            "issuing bracket request"
        );

        let cancel = CancellationToken::new();
        let _abort = cancel.clone().drop_guard();

        // Slots 2i / 2i+1 hold the left / right boundary for uuids[i].
        let mut boundaries = vec![INVALID_TIME; uuids.len() * 2];
        let mut lookups: JoinSet<(usize, i64)> = JoinSet::new();

        for (i, &uuid) in uuids.iter().enumerate() {
            for (slot, from, backward) in
                [(2 * i, TIME_LOW, false), (2 * i + 1, TIME_HIGH, true)]
            {
                let tsdb = Arc::clone(&self.tsdb);
                let token = cancel.child_token();
                lookups.spawn(async move {
                    match tsdb.nearest(token, uuid, from, backward).await {
                        Ok(point) => (slot, point.time),
                        Err(err) => {
                            debug!(%uuid, backward, error = %err, "bracket lookup failed");
                            (slot, INVALID_TIME)
                        }
                    }
                });
            }
        }

        let barrier = async {
            while let Some(joined) = lookups.join_next().await {
                if let Ok((slot, time)) = joined {
                    boundaries[slot] = time;
                }
            }
        };
        if timeout(self.timeout, barrier).await.is_err() {
            warn!(
                dispatcher = self.label,
                streams = uuids.len(),
                "bracket request timed out"
            );
            return sink.write(b"Timed out").await;
        }

        self.write_brackets(uuids, &boundaries, sink).await
    }

    async fn write_brackets(
        &self,
        uuids: &[Uuid],
        boundaries: &[i64],
        sink: &mut dyn ResponseSink,
    ) -> Result<(), SinkError> {
        let mut lowest = TIME_HIGH;
        let mut highest = TIME_LOW;

        sink.write(b"{\"Brackets\":[").await?;

        for i in 0..uuids.len() {
            let left = boundaries[2 * i];
            if left != INVALID_TIME && left < lowest {
                lowest = left;
            }
            let (lms, lns) = split_time(left);

            let right = boundaries[2 * i + 1];
            if right != INVALID_TIME && right > highest {
                highest = right;
            }
            let (rms, rns) = split_time(right);

            // The closing ']' of the Brackets array replaces the separator
            // after the final entry.
            let trail = if i == uuids.len() - 1 { ']' } else { ',' };
            let mut entry = String::with_capacity(64);
            let _ = write!(entry, "[[{},{}],[{},{}]]{}", lms, lns, rms, rns, trail);
            sink.write(entry.as_bytes()).await?;
        }
        if uuids.is_empty() {
            sink.write(b"]").await?;
        }

        let (lms, lns) = split_time(lowest);
        let (rms, rns) = split_time(highest);
        let mut merged = String::with_capacity(64);
        let _ = write!(merged, ",\"Merged\":[[{},{}],[{},{}]]}}", lms, lns, rms, rns);
        sink.write(merged.as_bytes()).await
    }
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod tests;
