//! Material-changeover approval policy.
//!
//! When a placement needs a material change, the decision to proceed is a
//! policy, not a prompt: the scheduling pass must never block on external
//! input. `QueueForApproval` parks the task for an out-of-band decision via
//! `SchedulerCore::approve`/`reject`.

use prodman_core::{MaterialCheckResult, Task};
use serde::{Deserialize, Serialize};

/// Outcome of a changeover decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// Proceed; the changeover cost is already folded into scoring
    Approve,
    /// Decline this placement; the task stays pending
    Reject,
    /// Park the task until an explicit approval arrives
    Defer,
}

/// Decides whether a material changeover may proceed.
pub trait ApprovalPolicy: Send + Sync {
    /// Policy name, for logs and configuration echo.
    fn name(&self) -> &'static str;

    /// Decide for one (task, check) pair. Called only when the check
    /// reports `requires_change`.
    fn decide(&self, task: &Task, check: &MaterialCheckResult) -> ApprovalDecision;
}

/// Accept every changeover; cost steers the strategy instead.
pub struct AutoAccept;

impl ApprovalPolicy for AutoAccept {
    fn name(&self) -> &'static str {
        "auto_accept"
    }

    fn decide(&self, _task: &Task, _check: &MaterialCheckResult) -> ApprovalDecision {
        ApprovalDecision::Approve
    }
}

/// Decline every changeover; only exact-material placements happen.
pub struct AutoReject;

impl ApprovalPolicy for AutoReject {
    fn name(&self) -> &'static str {
        "auto_reject"
    }

    fn decide(&self, _task: &Task, _check: &MaterialCheckResult) -> ApprovalDecision {
        ApprovalDecision::Reject
    }
}

/// Park changeover placements for an out-of-band decision.
pub struct QueueForApproval;

impl ApprovalPolicy for QueueForApproval {
    fn name(&self) -> &'static str {
        "queue"
    }

    fn decide(&self, _task: &Task, _check: &MaterialCheckResult) -> ApprovalDecision {
        ApprovalDecision::Defer
    }
}

/// The configurable approval policies, by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPolicyKind {
    /// `auto_accept`
    #[default]
    AutoAccept,
    /// `auto_reject`
    AutoReject,
    /// `queue`
    Queue,
}

impl ApprovalPolicyKind {
    /// Instantiate the policy.
    pub fn build(self) -> Box<dyn ApprovalPolicy> {
        match self {
            Self::AutoAccept => Box::new(AutoAccept),
            Self::AutoReject => Box::new(AutoReject),
            Self::Queue => Box::new(QueueForApproval),
        }
    }
}
