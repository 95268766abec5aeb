//! The downstream hand-off seam.
//!
//! The scheduler core never calls the execution layer itself; its pass
//! result is the hand-off point. The service forwards each pass's committed
//! assignments to whatever sink is injected (a DNC push, a message bus, or
//! the default log).

use async_trait::async_trait;
use prodman_scheduler::Assignment;
use tracing::info;

/// Receives committed assignments after each scheduling pass.
#[async_trait]
pub trait TaskSink: Send + Sync {
    /// Hand the assignments to the downstream execution layer.
    async fn dispatch(&self, assignments: &[Assignment]);
}

/// Default sink: trace each assignment.
pub struct LogSink;

#[async_trait]
impl TaskSink for LogSink {
    async fn dispatch(&self, assignments: &[Assignment]) {
        for assignment in assignments {
            info!(
                task = %assignment.task_id,
                machine = %assignment.machine_id,
                change_cost = assignment.change_cost,
                "assignment dispatched"
            );
        }
    }
}
