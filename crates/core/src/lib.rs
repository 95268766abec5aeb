//! ProdMan core data models.
//!
//! This crate defines the fundamental data structures that power the
//! production work-order scheduling engine.

#![warn(missing_docs)]

// Core identities
mod id;

// Work orders
mod task;

// Fleet state
mod machine;

// Material catalog values
mod material;

// Re-exports
pub use id::{MachineId, TaskId};

// Task & lifecycle
pub use task::{ParsePriorityError, Task, TaskPriority, TaskStatus, TransitionError};

// Machines
pub use machine::MachineState;

// Materials
pub use material::{
    MaterialCheckResult, MaterialFamily, MaterialRecord, StockCheck, StockLevel,
};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
