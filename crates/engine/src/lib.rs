//! The scheduling trigger surface.
//!
//! Wraps `SchedulerCore` behind one coarse mutex and exposes the async
//! operations surface. Three independent call paths enter the scheduler
//! (the periodic tick loop, task intake, and machine status pushes), and
//! all of them serialize on that single lock, so a pass always plans
//! against one consistent snapshot.

mod config;
mod provider;
mod runner;
mod service;
mod sink;

pub use config::{EngineError, MachineSeed, ProdmanConfig, TaskSeed};
pub use provider::{StaticStatusProvider, StatusProvider};
pub use runner::EngineRunner;
pub use service::{SchedulerService, TaskQueues};
pub use sink::{LogSink, TaskSink};
