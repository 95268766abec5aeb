//! Production task model - the work order the scheduler places on machines.

use serde::{Deserialize, Serialize};

use crate::id::{MachineId, TaskId};
use crate::Time;

/// Scheduling priority of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskPriority {
    /// Regular production order
    #[default]
    Normal,
    /// Expedited order
    High,
    /// Jump-the-queue order
    Urgent,
}

impl TaskPriority {
    /// Sort weight; higher schedules earlier.
    pub fn weight(self) -> u8 {
        match self {
            Self::Urgent => 3,
            Self::High => 2,
            Self::Normal => 1,
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Normal => "Normal",
            Self::High => "High",
            Self::Urgent => "Urgent",
        };
        f.write_str(s)
    }
}

/// Error parsing a priority token at the intake boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority: {0}")]
pub struct ParsePriorityError(pub String);

impl std::str::FromStr for TaskPriority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(ParsePriorityError(other.to_string())),
        }
    }
}

/// Task lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Queued, not yet assigned to a machine
    Pending,
    /// Assigned to a machine, waiting to start
    Ready,
    /// In production
    Running,
    /// Production suspended, resumable
    Paused,
    /// All ordered quantity produced
    Completed,
    /// Production failed
    Error,
    /// Parked until a material decision is made
    WaitingForMaterial,
}

impl TaskStatus {
    /// Legal transition targets from this state.
    pub fn allowed_transitions(self) -> &'static [TaskStatus] {
        match self {
            Self::Pending => &[Self::Ready, Self::WaitingForMaterial, Self::Error],
            Self::Ready => &[
                Self::Running,
                Self::Pending,
                Self::WaitingForMaterial,
                Self::Error,
            ],
            Self::Running => &[Self::Paused, Self::Completed, Self::Error],
            Self::Paused => &[Self::Running, Self::Error],
            Self::WaitingForMaterial => &[Self::Pending, Self::Ready, Self::Error],
            Self::Error => &[Self::Pending],
            Self::Completed => &[],
        }
    }

    /// Whether `to` is a legal next state.
    pub fn can_transition_to(self, to: TaskStatus) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// Whether this state admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Ready => "Ready",
            Self::Running => "Running",
            Self::Paused => "Paused",
            Self::Completed => "Completed",
            Self::Error => "Error",
            Self::WaitingForMaterial => "WaitingForMaterial",
        };
        f.write_str(s)
    }
}

/// Rejected task state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal task transition {from} -> {to}")]
pub struct TransitionError {
    /// State the task was in
    pub from: TaskStatus,
    /// State the caller asked for
    pub to: TaskStatus,
}

/// A production work order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Work instruction sheet reference
    pub instruction_id: String,

    /// Product model being produced
    pub product_model: String,

    /// Canonical code of the required material
    pub material_spec: String,

    /// Ordered quantity
    pub order_quantity: u32,

    /// Quantity produced so far
    pub completed_quantity: u32,

    /// Scheduling priority
    pub priority: TaskPriority,

    /// Lifecycle state
    pub status: TaskStatus,

    /// Machine the task is placed on, while assigned
    pub assigned_machine: Option<MachineId>,

    /// Creation timestamp
    pub created_at: Time,

    /// First entry into `Running`
    pub started_at: Option<Time>,

    /// Entry into `Completed`
    pub ended_at: Option<Time>,

    /// Timestamp of the last state change
    pub last_state_change: Time,

    /// Estimated processing time in minutes
    pub estimated_duration: u32,

    /// Material resolved against the catalog at intake
    pub material_checked: bool,

    /// NC program located for this product model
    pub program_available: bool,

    /// Material changeover granted by an out-of-band approval
    pub changeover_approved: bool,

    /// Material scan key captured at intake, if any
    pub scan_code: Option<String>,

    /// NC program name, if known
    pub program_name: Option<String>,

    /// Free-form notes
    pub notes: Option<String>,

    /// Failure reason from the last `Error` entry
    pub error_message: Option<String>,

    /// Number of `Error` entries so far
    pub retry_count: u32,
}

impl Task {
    /// Create a pending task.
    pub fn new(
        id: TaskId,
        instruction_id: impl Into<String>,
        product_model: impl Into<String>,
        material_spec: impl Into<String>,
        order_quantity: u32,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id,
            instruction_id: instruction_id.into(),
            product_model: product_model.into(),
            material_spec: material_spec.into(),
            order_quantity,
            completed_quantity: 0,
            priority: TaskPriority::Normal,
            status: TaskStatus::Pending,
            assigned_machine: None,
            created_at: now,
            started_at: None,
            ended_at: None,
            last_state_change: now,
            estimated_duration: 0,
            material_checked: false,
            program_available: false,
            changeover_approved: false,
            scan_code: None,
            program_name: None,
            notes: None,
            error_message: None,
            retry_count: 0,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the estimated processing time in minutes.
    pub fn with_estimated_duration(mut self, minutes: u32) -> Self {
        self.estimated_duration = minutes;
        self
    }

    /// Set the NC program name and mark the program available.
    pub fn with_program(mut self, name: impl Into<String>) -> Self {
        self.program_name = Some(name.into());
        self.program_available = true;
        self
    }

    /// Set the material scan key captured at intake.
    pub fn with_scan_code(mut self, scan: impl Into<String>) -> Self {
        self.scan_code = Some(scan.into());
        self
    }

    /// Set free-form notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Transition to `new_status`, enforcing the transition table.
    ///
    /// Side effects on success: `last_state_change` is stamped; the first
    /// entry into `Running` stamps `started_at`; entering `Completed` stamps
    /// `ended_at` and forces `completed_quantity` to the ordered quantity;
    /// entering `Error` stores a non-empty `reason` and bumps `retry_count`.
    pub fn update_status(
        &mut self,
        new_status: TaskStatus,
        reason: &str,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(new_status) {
            return Err(TransitionError {
                from: self.status,
                to: new_status,
            });
        }

        let now = chrono::Utc::now();
        self.status = new_status;
        self.last_state_change = now;

        match new_status {
            TaskStatus::Running => {
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
            }
            TaskStatus::Completed => {
                if self.ended_at.is_none() {
                    self.ended_at = Some(now);
                }
                self.completed_quantity = self.order_quantity;
            }
            TaskStatus::Error => {
                if !reason.is_empty() {
                    self.error_message = Some(reason.to_string());
                }
                self.retry_count += 1;
            }
            _ => {}
        }

        Ok(())
    }

    /// Completion percentage, 0 when nothing was ordered.
    pub fn progress_percent(&self) -> f64 {
        if self.order_quantity == 0 {
            return 0.0;
        }
        f64::from(self.completed_quantity) / f64::from(self.order_quantity) * 100.0
    }

    /// Quantity still to produce.
    pub fn remaining_quantity(&self) -> u32 {
        self.order_quantity.saturating_sub(self.completed_quantity)
    }

    /// Whether the task may start production.
    pub fn can_start(&self) -> bool {
        matches!(self.status, TaskStatus::Pending | TaskStatus::Ready)
            && self.material_checked
            && self.program_available
    }

    /// Whether the task finished.
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Whether the task is in production.
    pub fn is_running(&self) -> bool {
        self.status == TaskStatus::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task::new(TaskId::from("T1"), "INS001", "MODEL_A", "S45C", 10)
    }

    #[test]
    fn new_task_is_pending() {
        let t = task();
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.completed_quantity, 0);
        assert!(t.assigned_machine.is_none());
    }

    #[test]
    fn legal_lifecycle_walk() {
        let mut t = task();
        t.update_status(TaskStatus::Ready, "assigned").unwrap();
        t.update_status(TaskStatus::Running, "started").unwrap();
        t.update_status(TaskStatus::Paused, "operator break").unwrap();
        t.update_status(TaskStatus::Running, "resumed").unwrap();
        t.update_status(TaskStatus::Completed, "done").unwrap();
        assert!(t.is_completed());
    }

    #[test]
    fn completed_is_terminal() {
        let mut t = task();
        t.update_status(TaskStatus::Ready, "").unwrap();
        t.update_status(TaskStatus::Running, "").unwrap();
        t.update_status(TaskStatus::Completed, "").unwrap();

        let err = t.update_status(TaskStatus::Pending, "").unwrap_err();
        assert_eq!(err.from, TaskStatus::Completed);
        assert_eq!(err.to, TaskStatus::Pending);
    }

    #[test]
    fn illegal_jump_rejected_without_side_effects() {
        let mut t = task();
        let before = t.last_state_change;
        assert!(t.update_status(TaskStatus::Completed, "").is_err());
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.last_state_change, before);
        assert_eq!(t.completed_quantity, 0);
    }

    #[test]
    fn completion_forces_quantity_and_stamps_end() {
        let mut t = task();
        t.update_status(TaskStatus::Ready, "").unwrap();
        t.update_status(TaskStatus::Running, "").unwrap();
        assert!(t.started_at.is_some());
        t.update_status(TaskStatus::Completed, "").unwrap();
        assert_eq!(t.completed_quantity, t.order_quantity);
        assert!(t.ended_at.is_some());
    }

    #[test]
    fn error_stores_reason_and_counts_retry() {
        let mut t = task();
        t.update_status(TaskStatus::Error, "spindle alarm").unwrap();
        assert_eq!(t.error_message.as_deref(), Some("spindle alarm"));
        assert_eq!(t.retry_count, 1);

        // Errored tasks may be re-queued
        t.update_status(TaskStatus::Pending, "").unwrap();
        assert_eq!(t.status, TaskStatus::Pending);
    }

    #[test]
    fn progress_is_zero_for_empty_order() {
        let t = Task::new(TaskId::from("T0"), "INS", "M", "S45C", 0);
        assert_eq!(t.progress_percent(), 0.0);
    }

    #[test]
    fn can_start_requires_both_flags() {
        let mut t = task();
        assert!(!t.can_start());
        t.material_checked = true;
        assert!(!t.can_start());
        t.program_available = true;
        assert!(t.can_start());
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("urgent".parse::<TaskPriority>().unwrap(), TaskPriority::Urgent);
        assert_eq!("High".parse::<TaskPriority>().unwrap(), TaskPriority::High);
        assert!("asap".parse::<TaskPriority>().is_err());
    }
}
