//! Periodic dispatcher instrumentation
//!
//! Two background tasks mirror what operators watch in production: how many
//! requests each dispatcher is holding, and how many tasks the runtime is
//! carrying overall.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::dispatcher::Dispatcher;

/// Periodically log the waiting-request gauge of both dispatchers.
pub fn spawn_waiting_logger(
    data: Arc<Dispatcher>,
    bracket: Arc<Dispatcher>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            info!(
                waiting_data_requests = data.total_waiting(),
                waiting_bracket_requests = bracket.total_waiting(),
                "outstanding requests"
            );
        }
    })
}

/// Periodically log the number of live tasks on the runtime.
pub fn spawn_task_count_logger(period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let metrics = tokio::runtime::Handle::current().metrics();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            info!(alive_tasks = metrics.num_alive_tasks(), "runtime tasks");
        }
    })
}
