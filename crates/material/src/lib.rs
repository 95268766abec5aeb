//! Material compatibility and inventory engine.
//!
//! Answers the scheduler's two questions about a (task, machine) pair: may
//! the task run there, and at what changeover cost. Also owns the in-memory
//! material catalog, stock mutation, and stock reporting.

mod catalog;
mod changeover;
mod engine;
mod store;

pub use catalog::MaterialCatalog;
pub use changeover::ChangeoverMatrix;
pub use engine::{
    LowStockEntry, MaterialEngine, StockPolicy, StockReport, StockThresholds,
};
pub use store::{JsonMaterialStore, MaterialError, MaterialStore, Result};
