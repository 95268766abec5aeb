//! The scheduler core: queues, assignment strategies, scoring, and the task
//! lifecycle mutators.
//!
//! `SchedulerCore` is single-threaded by construction; concurrent access is
//! the job of `prodman-engine`, which wraps it behind one coarse mutex.

mod approval;
mod engine;
mod registry;
mod scoring;
mod strategy;

pub use approval::{
    ApprovalDecision, ApprovalPolicy, ApprovalPolicyKind, AutoAccept, AutoReject,
    QueueForApproval,
};
pub use engine::{Assignment, SchedulerCore, SchedulerError, SchedulerStats};
pub use registry::MachineRegistry;
pub use scoring::{assignment_score, efficiency_score};
pub use strategy::{
    AssignmentStrategy, Candidate, Efficiency, LoadBalance, MaterialFirst, PriorityFirst,
    StrategyContext, StrategyKind,
};
