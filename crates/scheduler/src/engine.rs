//! The scheduling engine: queues, the schedule pass, and lifecycle mutators.

use std::collections::{HashMap, HashSet};

use prodman_core::{
    MachineId, MachineState, Task, TaskId, TaskStatus, TransitionError,
};
use prodman_material::MaterialEngine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::approval::{ApprovalDecision, ApprovalPolicy, AutoAccept};
use crate::registry::MachineRegistry;
use crate::scoring::assignment_score;
use crate::strategy::{AssignmentStrategy, Candidate, StrategyContext, StrategyKind};

/// Errors from the scheduler's validation surface.
///
/// Capacity conditions (no machine, no stock) are not errors; they surface
/// as empty assignment lists or boolean refusals.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Machine not present in the registry
    #[error("unknown machine: {0}")]
    UnknownMachine(MachineId),

    /// Task not present in the addressed queue
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),

    /// Task ID already known to the scheduler
    #[error("duplicate task id: {0}")]
    DuplicateTask(TaskId),

    /// Task rejected at intake
    #[error("invalid task: {0}")]
    InvalidTask(String),

    /// Unrecognized strategy name
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    /// Illegal task state transition
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// One committed placement from a scheduling pass. The pass's return value
/// is the hand-off point to the downstream execution layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    /// Task that was placed
    pub task_id: TaskId,
    /// Machine it was placed on
    pub machine_id: MachineId,
    /// Changeover cost the placement accepted, in minutes
    pub change_cost: u32,
    /// Assignment score the placement won with
    pub score: f64,
}

/// Queue counters for the statistics surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Tasks waiting for placement
    pub pending: usize,
    /// Tasks placed on machines
    pub running: usize,
    /// Finished (or archived errored) tasks
    pub completed: usize,
    /// Tasks parked for changeover approval
    pub waiting_approval: usize,
    /// All tasks known to the scheduler
    pub total: usize,
}

enum AssignOutcome {
    Assigned(Assignment),
    Deferred,
    Declined,
}

/// The scheduler core.
///
/// Owns the three task queues, the fleet registry, and the material engine;
/// runs the schedule pass with the active strategy. Single-threaded by
/// construction; the engine crate serializes access behind one mutex.
pub struct SchedulerCore {
    pending: Vec<Task>,
    running: HashMap<TaskId, Task>,
    completed: Vec<Task>,
    awaiting_approval: Vec<Task>,
    registry: MachineRegistry,
    material: MaterialEngine,
    strategy: Box<dyn AssignmentStrategy>,
    strategy_kind: StrategyKind,
    approval: Box<dyn ApprovalPolicy>,
    max_retries: u32,
}

impl SchedulerCore {
    /// Create a scheduler over a material engine, with the default strategy
    /// and auto-accept approval.
    pub fn new(material: MaterialEngine) -> Self {
        let strategy_kind = StrategyKind::default();
        Self {
            pending: Vec::new(),
            running: HashMap::new(),
            completed: Vec::new(),
            awaiting_approval: Vec::new(),
            registry: MachineRegistry::new(),
            material,
            strategy: strategy_kind.build(),
            strategy_kind,
            approval: Box::new(AutoAccept),
            max_retries: 3,
        }
    }

    /// Select the assignment strategy.
    pub fn with_strategy(mut self, kind: StrategyKind) -> Self {
        self.strategy = kind.build();
        self.strategy_kind = kind;
        self
    }

    /// Inject the changeover approval policy.
    pub fn with_approval_policy(mut self, policy: Box<dyn ApprovalPolicy>) -> Self {
        self.approval = policy;
        self
    }

    /// Set how many error re-queues a task gets before it is archived.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Switch the strategy by configuration name.
    pub fn set_strategy(&mut self, name: &str) -> Result<(), SchedulerError> {
        let kind: StrategyKind = name.parse()?;
        self.strategy = kind.build();
        self.strategy_kind = kind;
        info!(strategy = name, "scheduling strategy changed");
        Ok(())
    }

    /// The active strategy.
    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy_kind
    }

    /// The material engine.
    pub fn material(&self) -> &MaterialEngine {
        &self.material
    }

    /// The fleet registry.
    pub fn registry(&self) -> &MachineRegistry {
        &self.registry
    }

    /// Replace a machine snapshot (status provider push).
    pub fn update_machine(&mut self, state: MachineState) {
        self.registry.update(state);
    }

    /// Machines currently able to accept work.
    pub fn available_machines(&self) -> Vec<MachineId> {
        self.registry.available_machines()
    }

    /// Tasks waiting for placement, in queue order.
    pub fn pending_tasks(&self) -> &[Task] {
        &self.pending
    }

    /// Tasks placed on machines, keyed by ID.
    pub fn running_tasks(&self) -> &HashMap<TaskId, Task> {
        &self.running
    }

    /// Finished and archived tasks, in completion order.
    pub fn completed_tasks(&self) -> &[Task] {
        &self.completed
    }

    /// Tasks parked for changeover approval.
    pub fn pending_approvals(&self) -> &[Task] {
        &self.awaiting_approval
    }

    /// Accept a task into the pending queue.
    ///
    /// Intake is the validation boundary: an empty ID or a zero quantity is
    /// rejected, as is an ID already known to any queue. The material flag
    /// is resolved against the catalog here so downstream code never
    /// re-checks representation.
    pub fn add_task(&mut self, mut task: Task) -> Result<(), SchedulerError> {
        if task.id.is_empty() {
            return Err(SchedulerError::InvalidTask("empty task id".to_string()));
        }
        if task.order_quantity == 0 {
            return Err(SchedulerError::InvalidTask(format!(
                "task {} has zero order quantity",
                task.id
            )));
        }
        if self.knows_task(&task.id) {
            return Err(SchedulerError::DuplicateTask(task.id));
        }

        let known = self
            .material
            .catalog()
            .by_code(&task.material_spec)
            .or_else(|| self.material.catalog().by_name(&task.material_spec))
            .is_some();
        if !known {
            warn!(task = %task.id, material = %task.material_spec, "material not in catalog");
        }
        task.material_checked = match &task.scan_code {
            // A captured scan must also resolve to the ordered material
            Some(scan) => known && self.material.validate_scan(scan, &task.material_spec),
            None => known,
        };

        info!(task = %task.id, priority = %task.priority, "task queued");
        self.pending.push(task);
        Ok(())
    }

    /// Remove a task that is still pending. Returns false when the task is
    /// not in the pending queue (e.g. already assigned).
    pub fn remove_task(&mut self, id: &TaskId) -> bool {
        let Some(pos) = self.pending.iter().position(|t| &t.id == id) else {
            return false;
        };
        self.pending.remove(pos);
        info!(task = %id, "task removed from queue");
        true
    }

    /// Run one scheduling pass and return the committed assignments.
    ///
    /// With nothing pending or no available machine this is a no-op, not an
    /// error. A task that fails to place stays in the pending queue
    /// unchanged; repeated passes converge as machines free up.
    pub fn schedule(&mut self) -> Vec<Assignment> {
        if self.pending.is_empty() {
            return Vec::new();
        }

        let mut available = self.registry.available_machines();
        // A provider snapshot may have cleared current_task while a task is
        // still placed; the running queue is the authoritative claim.
        available.retain(|m| !self.machine_is_claimed(m));
        if available.is_empty() {
            warn!(
                pending = self.pending.len(),
                "no available machines, tasks stay pending"
            );
            return Vec::new();
        }

        let candidates = {
            let ctx = StrategyContext {
                pending: &self.pending,
                machines: &available,
                registry: &self.registry,
                running: &self.running,
                material: &self.material,
            };
            self.strategy.plan(&ctx)
        };

        let mut claimed: HashSet<MachineId> = HashSet::new();
        let mut committed = Vec::new();
        for candidate in candidates {
            if claimed.contains(&candidate.machine_id) {
                continue;
            }
            match self.try_assign(&candidate) {
                AssignOutcome::Assigned(assignment) => {
                    claimed.insert(assignment.machine_id.clone());
                    committed.push(assignment);
                }
                AssignOutcome::Deferred | AssignOutcome::Declined => {}
            }
        }

        if !committed.is_empty() {
            info!(
                assigned = committed.len(),
                strategy = %self.strategy_kind,
                "scheduling pass committed"
            );
        }
        committed
    }

    fn try_assign(&mut self, candidate: &Candidate) -> AssignOutcome {
        let Some(pos) = self.pending.iter().position(|t| t.id == candidate.task_id) else {
            return AssignOutcome::Declined;
        };
        let Some(machine) = self.registry.get(&candidate.machine_id) else {
            warn!(machine = %candidate.machine_id, "candidate machine vanished from registry");
            return AssignOutcome::Declined;
        };

        let check = self.material.check_compatibility(
            &self.pending[pos],
            &candidate.machine_id,
            &machine.current_material,
        );
        if !check.compatible {
            debug!(task = %candidate.task_id, machine = %candidate.machine_id, %check.message, "placement refused");
            return AssignOutcome::Declined;
        }

        if check.requires_change && !self.pending[pos].changeover_approved {
            match self.approval.decide(&self.pending[pos], &check) {
                ApprovalDecision::Approve => {}
                ApprovalDecision::Reject => {
                    debug!(
                        task = %candidate.task_id,
                        policy = self.approval.name(),
                        "changeover declined by policy"
                    );
                    return AssignOutcome::Declined;
                }
                ApprovalDecision::Defer => {
                    let mut task = self.pending.remove(pos);
                    match task.update_status(
                        TaskStatus::WaitingForMaterial,
                        "awaiting changeover approval",
                    ) {
                        Ok(()) => {
                            info!(task = %task.id, "task parked for changeover approval");
                            self.awaiting_approval.push(task);
                            return AssignOutcome::Deferred;
                        }
                        Err(err) => {
                            warn!(task = %task.id, %err, "could not park task");
                            self.pending.insert(pos, task);
                            return AssignOutcome::Declined;
                        }
                    }
                }
            }
        }

        let score = assignment_score(&self.pending[pos], machine, &check);
        let mut task = self.pending.remove(pos);
        task.assigned_machine = Some(candidate.machine_id.clone());
        if let Err(err) = task.update_status(
            TaskStatus::Ready,
            &format!("assigned to {}", candidate.machine_id),
        ) {
            warn!(task = %task.id, %err, "assignment rolled back");
            task.assigned_machine = None;
            self.pending.insert(pos, task);
            return AssignOutcome::Declined;
        }

        self.registry.claim(&candidate.machine_id, task.id.clone());
        let assignment = Assignment {
            task_id: task.id.clone(),
            machine_id: candidate.machine_id.clone(),
            change_cost: check.change_cost,
            score,
        };
        info!(
            task = %assignment.task_id,
            machine = %assignment.machine_id,
            change_cost = assignment.change_cost,
            "task assigned"
        );
        self.running.insert(task.id.clone(), task);
        AssignOutcome::Assigned(assignment)
    }

    /// Begin production on an assigned task (execution-layer callback).
    pub fn start_task(&mut self, id: &TaskId) -> Result<(), SchedulerError> {
        let task = self
            .running
            .get_mut(id)
            .ok_or_else(|| SchedulerError::UnknownTask(id.clone()))?;
        task.update_status(TaskStatus::Running, "production started")?;
        Ok(())
    }

    /// Finish a task: move it to the completed list, consume its material,
    /// and return its machine to the available pool.
    pub fn complete_task(&mut self, id: &TaskId) -> Result<(), SchedulerError> {
        let mut task = self
            .running
            .remove(id)
            .ok_or_else(|| SchedulerError::UnknownTask(id.clone()))?;

        if let Err(err) = task.update_status(TaskStatus::Completed, "production finished") {
            self.running.insert(id.clone(), task);
            return Err(err.into());
        }

        if !self.material.consume(&task.material_spec, task.order_quantity) {
            warn!(
                task = %task.id,
                material = %task.material_spec,
                "completion consumed more stock than recorded"
            );
        }

        if let Some(machine_id) = &task.assigned_machine {
            self.registry.release(machine_id);
        }
        info!(task = %task.id, "task completed");
        self.completed.push(task);
        Ok(())
    }

    /// Suspend a running task and mirror the machine's state token.
    pub fn pause_task(&mut self, id: &TaskId) -> Result<(), SchedulerError> {
        let task = self
            .running
            .get_mut(id)
            .ok_or_else(|| SchedulerError::UnknownTask(id.clone()))?;
        task.update_status(TaskStatus::Paused, "paused")?;
        if let Some(machine_id) = task.assigned_machine.clone() {
            self.registry.set_status(&machine_id, "PAUSED");
        }
        info!(task = %id, "task paused");
        Ok(())
    }

    /// Resume a paused task and mirror the machine's state token.
    pub fn resume_task(&mut self, id: &TaskId) -> Result<(), SchedulerError> {
        let task = self
            .running
            .get_mut(id)
            .ok_or_else(|| SchedulerError::UnknownTask(id.clone()))?;
        task.update_status(TaskStatus::Running, "resumed")?;
        if let Some(machine_id) = task.assigned_machine.clone() {
            self.registry.set_status(&machine_id, "RUNNING");
        }
        info!(task = %id, "task resumed");
        Ok(())
    }

    /// Record a production failure. The task is re-queued while it has
    /// retries left, otherwise archived to the completed list as errored.
    pub fn fail_task(&mut self, id: &TaskId, reason: &str) -> Result<(), SchedulerError> {
        let mut task = self
            .running
            .remove(id)
            .ok_or_else(|| SchedulerError::UnknownTask(id.clone()))?;

        if let Err(err) = task.update_status(TaskStatus::Error, reason) {
            self.running.insert(id.clone(), task);
            return Err(err.into());
        }

        if let Some(machine_id) = task.assigned_machine.clone() {
            self.registry.release(&machine_id);
        }

        if task.retry_count <= self.max_retries {
            task.assigned_machine = None;
            task.update_status(TaskStatus::Pending, "re-queued after error")?;
            info!(task = %task.id, attempt = task.retry_count, "errored task re-queued");
            self.pending.push(task);
        } else {
            warn!(task = %task.id, retries = task.retry_count, "task failed permanently");
            self.completed.push(task);
        }
        Ok(())
    }

    /// Grant a parked changeover: the task re-enters the pending queue with
    /// the approval recorded, so the next pass may place it.
    pub fn approve(&mut self, id: &TaskId) -> Result<(), SchedulerError> {
        let pos = self
            .awaiting_approval
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| SchedulerError::UnknownTask(id.clone()))?;
        let mut task = self.awaiting_approval.remove(pos);
        task.update_status(TaskStatus::Pending, "changeover approved")?;
        task.changeover_approved = true;
        info!(task = %id, "changeover approved");
        self.pending.push(task);
        Ok(())
    }

    /// Refuse a parked changeover: the task is archived as errored.
    pub fn reject(&mut self, id: &TaskId) -> Result<(), SchedulerError> {
        let pos = self
            .awaiting_approval
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| SchedulerError::UnknownTask(id.clone()))?;
        let mut task = self.awaiting_approval.remove(pos);
        task.update_status(TaskStatus::Error, "changeover rejected")?;
        info!(task = %id, "changeover rejected");
        self.completed.push(task);
        Ok(())
    }

    /// Queue counters.
    pub fn statistics(&self) -> SchedulerStats {
        let pending = self.pending.len();
        let running = self.running.len();
        let completed = self.completed.len();
        let waiting_approval = self.awaiting_approval.len();
        SchedulerStats {
            pending,
            running,
            completed,
            waiting_approval,
            total: pending + running + completed + waiting_approval,
        }
    }

    /// Share of placed-or-finished tasks per machine, in percent.
    pub fn machine_utilization(&self) -> HashMap<MachineId, f64> {
        let total = self.running.len() + self.completed.len();
        let mut utilization = HashMap::new();
        for machine in self.registry.all() {
            let count = self
                .running
                .values()
                .chain(self.completed.iter())
                .filter(|t| t.assigned_machine.as_ref() == Some(&machine.machine_id))
                .count();
            let share = if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            utilization.insert(machine.machine_id.clone(), share);
        }
        utilization
    }

    fn knows_task(&self, id: &TaskId) -> bool {
        self.pending.iter().any(|t| &t.id == id)
            || self.running.contains_key(id)
            || self.completed.iter().any(|t| &t.id == id)
            || self.awaiting_approval.iter().any(|t| &t.id == id)
    }

    fn machine_is_claimed(&self, id: &MachineId) -> bool {
        self.running
            .values()
            .any(|t| t.assigned_machine.as_ref() == Some(id))
    }
}
