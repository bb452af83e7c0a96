//! Plotter TSDB - query driver contract
//!
//! The gateway composes four operations against the time-series database:
//! stream existence, collection lookup, aligned statistical windows, and
//! nearest-point queries. This crate defines that contract plus the point
//! types and timestamp arithmetic shared by the dispatcher and the protocol
//! adapter.
//!
//! Streaming queries hand back channels rather than materialized vectors so
//! the dispatcher can forward points to the client as they arrive. Every
//! streaming call takes a [`CancellationToken`]; implementations must stop
//! producing and close their channels once it fires or once the receiver is
//! dropped.

mod error;
mod memory;
mod time;

pub use error::{Result, TsdbError};
pub use memory::MemoryTsdb;
pub use time::{split_time, INVALID_TIME, TIME_HIGH, TIME_LOW};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One statistical window: aggregate of all raw points in a
/// `2^pw`-nanosecond bucket starting at `time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatPoint {
    /// Bucket start, nanoseconds since the epoch.
    pub time: i64,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub count: u64,
}

/// One raw point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPoint {
    /// Nanoseconds since the epoch.
    pub time: i64,
    pub value: f64,
}

/// Channel pair for a streaming statistical query.
///
/// Points arrive in time order. After the point channel closes, the error
/// channel holds at most one error describing why the stream ended early;
/// an empty error channel means the query completed.
pub struct StatStream {
    pub points: mpsc::Receiver<StatPoint>,
    pub errors: mpsc::Receiver<TsdbError>,
}

/// Driver operations the gateway consumes.
#[async_trait]
pub trait TsdbClient: Send + Sync {
    /// Whether a stream with this UUID exists.
    async fn exists(&self, uuid: Uuid) -> Result<bool>;

    /// The collection path the stream belongs to.
    async fn collection(&self, uuid: Uuid) -> Result<String>;

    /// Statistical aggregates over power-of-two buckets covering
    /// `[start, end)`. `start` and `end` must already be aligned to
    /// `2^pw` nanoseconds.
    fn aligned_windows(
        &self,
        cancel: CancellationToken,
        uuid: Uuid,
        start: i64,
        end: i64,
        pw: u8,
    ) -> StatStream;

    /// The point nearest to `time`: the earliest point with
    /// `point.time >= time` when `backward` is false, the latest point with
    /// `point.time < time` when `backward` is true.
    async fn nearest(
        &self,
        cancel: CancellationToken,
        uuid: Uuid,
        time: i64,
        backward: bool,
    ) -> Result<RawPoint>;
}
