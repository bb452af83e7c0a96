//! Plotter Dispatch - bounded-admission query serving
//!
//! Two independent dispatchers sit between the protocol adapter and the
//! TSDB: one for point-data queries, one for bracket (nearest-value)
//! queries. Data and bracket traffic have very different fan-out — one
//! stream versus `2N` concurrent lookups — so separate admission counters
//! keep one traffic class from starving the other.
//!
//! Admission is a semaphore: at most `max_pending` requests of a class are
//! in flight against the database, the rest queue FIFO, and the permit is
//! released on every exit path (success, error, cancellation) so no waiter
//! is ever lost. A `total_waiting` gauge counts requests between arrival and
//! completion for the periodic instrumentation log.
//!
//! The dispatchers write responses through [`ResponseSink`], the seam the
//! protocol adapter implements once for streamed HTTP bodies and once for
//! WebSocket frames.

mod dispatcher;
mod instrument;
mod sink;

pub use dispatcher::Dispatcher;
pub use instrument::{spawn_task_count_logger, spawn_waiting_logger};
pub use sink::{BufferSink, ResponseSink, SinkError};
