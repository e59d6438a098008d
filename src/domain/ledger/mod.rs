//! Cost ledger domain

mod entry;
mod snapshot;

pub use entry::{LedgerConfig, LedgerEntry};
pub use snapshot::{BudgetStatus, CostSnapshot, OptimizationMetrics};
