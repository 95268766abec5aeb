//! The concurrent operations surface over the scheduler core.

use std::sync::Arc;

use prodman_core::{MachineId, MachineState, Task, TaskId};
use prodman_material::{LowStockEntry, StockReport};
use prodman_scheduler::{Assignment, SchedulerCore, SchedulerError, SchedulerStats};
use tokio::sync::Mutex;
use tracing::debug;

use crate::sink::{LogSink, TaskSink};

/// Snapshot of the task queues for presentation layers.
#[derive(Debug, Clone)]
pub struct TaskQueues {
    /// Tasks waiting for placement
    pub pending: Vec<Task>,
    /// Tasks placed on machines
    pub running: Vec<Task>,
    /// Finished and archived tasks
    pub completed: Vec<Task>,
    /// Tasks parked for changeover approval
    pub waiting_approval: Vec<Task>,
}

/// The engine's public operations surface.
///
/// All state lives in one `SchedulerCore` behind one coarse mutex; every
/// operation takes the lock, so the periodic loop, task intake, and status
/// pushes can enter concurrently without corrupting the queues. Committed
/// assignments are forwarded to the injected sink after the lock is
/// released.
pub struct SchedulerService {
    core: Arc<Mutex<SchedulerCore>>,
    sink: Arc<dyn TaskSink>,
    schedule_on_event: bool,
}

impl Clone for SchedulerService {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            sink: Arc::clone(&self.sink),
            schedule_on_event: self.schedule_on_event,
        }
    }
}

impl SchedulerService {
    /// Wrap a scheduler core with the default log sink.
    pub fn new(core: SchedulerCore) -> Self {
        Self {
            core: Arc::new(Mutex::new(core)),
            sink: Arc::new(LogSink),
            schedule_on_event: true,
        }
    }

    /// Inject the downstream assignment sink.
    pub fn with_sink(mut self, sink: Arc<dyn TaskSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Whether intake and status pushes trigger an immediate pass.
    pub fn with_schedule_on_event(mut self, on: bool) -> Self {
        self.schedule_on_event = on;
        self
    }

    /// Queue a task. When event scheduling is on, a pass runs immediately
    /// and its committed assignments are returned and dispatched.
    pub async fn add_task(&self, task: Task) -> Result<Vec<Assignment>, SchedulerError> {
        let assignments = {
            let mut core = self.core.lock().await;
            core.add_task(task)?;
            if self.schedule_on_event {
                core.schedule()
            } else {
                Vec::new()
            }
        };
        self.dispatch(&assignments).await;
        Ok(assignments)
    }

    /// Remove a still-pending task.
    pub async fn remove_task(&self, id: &TaskId) -> bool {
        self.core.lock().await.remove_task(id)
    }

    /// Push a machine snapshot. When event scheduling is on, a pass runs
    /// immediately, since a status change may have freed a machine.
    pub async fn update_machine(&self, state: MachineState) -> Vec<Assignment> {
        let assignments = {
            let mut core = self.core.lock().await;
            core.update_machine(state);
            if self.schedule_on_event {
                core.schedule()
            } else {
                Vec::new()
            }
        };
        self.dispatch(&assignments).await;
        assignments
    }

    /// Run one scheduling pass now.
    pub async fn schedule_now(&self) -> Vec<Assignment> {
        let assignments = self.core.lock().await.schedule();
        self.dispatch(&assignments).await;
        assignments
    }

    /// Begin production on an assigned task.
    pub async fn start_task(&self, id: &TaskId) -> Result<(), SchedulerError> {
        self.core.lock().await.start_task(id)
    }

    /// Finish a task.
    pub async fn complete_task(&self, id: &TaskId) -> Result<(), SchedulerError> {
        self.core.lock().await.complete_task(id)
    }

    /// Suspend a running task.
    pub async fn pause_task(&self, id: &TaskId) -> Result<(), SchedulerError> {
        self.core.lock().await.pause_task(id)
    }

    /// Resume a paused task.
    pub async fn resume_task(&self, id: &TaskId) -> Result<(), SchedulerError> {
        self.core.lock().await.resume_task(id)
    }

    /// Record a production failure.
    pub async fn fail_task(&self, id: &TaskId, reason: &str) -> Result<(), SchedulerError> {
        self.core.lock().await.fail_task(id, reason)
    }

    /// Switch the assignment strategy by name.
    pub async fn set_strategy(&self, name: &str) -> Result<(), SchedulerError> {
        self.core.lock().await.set_strategy(name)
    }

    /// Queue counters.
    pub async fn statistics(&self) -> SchedulerStats {
        self.core.lock().await.statistics()
    }

    /// Machines currently able to accept work.
    pub async fn list_available_machines(&self) -> Vec<MachineId> {
        self.core.lock().await.available_machines()
    }

    /// Snapshot of every known machine.
    pub async fn machines(&self) -> Vec<MachineState> {
        self.core.lock().await.registry().all().cloned().collect()
    }

    /// Snapshot of the task queues.
    pub async fn task_queues(&self) -> TaskQueues {
        let core = self.core.lock().await;
        TaskQueues {
            pending: core.pending_tasks().to_vec(),
            running: core.running_tasks().values().cloned().collect(),
            completed: core.completed_tasks().to_vec(),
            waiting_approval: core.pending_approvals().to_vec(),
        }
    }

    /// Share of placed-or-finished tasks per machine, in percent.
    pub async fn machine_utilization(&self) -> std::collections::HashMap<MachineId, f64> {
        self.core.lock().await.machine_utilization()
    }

    /// Aggregate stock counts.
    pub async fn stock_report(&self) -> StockReport {
        self.core.lock().await.material().stock_report()
    }

    /// Records at or below the low-stock threshold.
    pub async fn low_stock_materials(&self) -> Vec<LowStockEntry> {
        self.core.lock().await.material().low_stock_materials()
    }

    /// Tasks parked for changeover approval.
    pub async fn pending_approvals(&self) -> Vec<Task> {
        self.core.lock().await.pending_approvals().to_vec()
    }

    /// Grant a parked changeover and trigger a pass when configured.
    pub async fn approve(&self, id: &TaskId) -> Result<Vec<Assignment>, SchedulerError> {
        let assignments = {
            let mut core = self.core.lock().await;
            core.approve(id)?;
            if self.schedule_on_event {
                core.schedule()
            } else {
                Vec::new()
            }
        };
        self.dispatch(&assignments).await;
        Ok(assignments)
    }

    /// Refuse a parked changeover.
    pub async fn reject(&self, id: &TaskId) -> Result<(), SchedulerError> {
        self.core.lock().await.reject(id)
    }

    async fn dispatch(&self, assignments: &[Assignment]) {
        if assignments.is_empty() {
            return;
        }
        debug!(count = assignments.len(), "forwarding assignments to sink");
        self.sink.dispatch(assignments).await;
    }
}
