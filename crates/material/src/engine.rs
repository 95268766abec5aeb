//! The material compatibility and inventory engine.

use prodman_core::{
    MachineId, MaterialCheckResult, StockCheck, StockLevel, Task,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::MaterialCatalog;
use crate::changeover::ChangeoverMatrix;

/// Whether stock sufficiency gates compatibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    /// Stock never blocks compatibility; the check result reports the
    /// on-hand quantity and conservation is enforced at consumption time.
    #[default]
    Advisory,
    /// Insufficient stock (or an unrecognized material) makes the pair
    /// incompatible at check time.
    Strict,
}

/// Stock thresholds for the reporting surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StockThresholds {
    /// At or below: low stock
    pub low: u32,
    /// At or below: critical stock
    pub critical: u32,
}

impl Default for StockThresholds {
    fn default() -> Self {
        Self {
            low: 50,
            critical: 10,
        }
    }
}

/// Aggregate stock counts for operational dashboards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StockReport {
    /// Number of catalog records
    pub total_materials: usize,
    /// Sum of on-hand stock across records
    pub total_stock: u64,
    /// Records at or below the low threshold
    pub low_stock_count: usize,
    /// Records at or below the critical threshold
    pub critical_stock_count: usize,
    /// Records with nothing on hand
    pub out_of_stock_count: usize,
}

/// One catalog record flagged by the low-stock listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowStockEntry {
    /// Canonical material code
    pub code: String,
    /// Display name
    pub name: String,
    /// On-hand stock
    pub stock: u32,
    /// Severity classification
    pub level: StockLevel,
}

/// Compatibility decisions, changeover costing, and stock mutation over the
/// loaded catalog.
#[derive(Debug)]
pub struct MaterialEngine {
    catalog: MaterialCatalog,
    matrix: ChangeoverMatrix,
    policy: StockPolicy,
    thresholds: StockThresholds,
}

impl MaterialEngine {
    /// Create the engine over a loaded catalog.
    pub fn new(catalog: MaterialCatalog) -> Self {
        Self {
            catalog,
            matrix: ChangeoverMatrix::new(),
            policy: StockPolicy::default(),
            thresholds: StockThresholds::default(),
        }
    }

    /// Set the stock gating policy.
    pub fn with_policy(mut self, policy: StockPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the changeover cost matrix.
    pub fn with_matrix(mut self, matrix: ChangeoverMatrix) -> Self {
        self.matrix = matrix;
        self
    }

    /// Set the reporting thresholds.
    pub fn with_thresholds(mut self, thresholds: StockThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// The loaded catalog.
    pub fn catalog(&self) -> &MaterialCatalog {
        &self.catalog
    }

    /// The active stock policy.
    pub fn policy(&self) -> StockPolicy {
        self.policy
    }

    /// Decide whether `task` may run on the machine given its currently
    /// loaded material, and at what changeover cost.
    ///
    /// A differing material is a cost, not a refusal: the result stays
    /// compatible with `requires_change` set, so the strategy can prefer a
    /// zero-cost placement but still use the machine when nothing better
    /// exists. Under `StockPolicy::Strict`, insufficient stock or an
    /// unrecognized task material makes the pair incompatible instead.
    pub fn check_compatibility(
        &self,
        task: &Task,
        machine_id: &MachineId,
        current_material: &str,
    ) -> MaterialCheckResult {
        debug!(
            task = %task.id,
            machine = %machine_id,
            want = %task.material_spec,
            loaded = current_material,
            "material compatibility check"
        );

        let available = self.catalog.stock_of(&task.material_spec);

        if self.policy == StockPolicy::Strict && available < task.order_quantity {
            return MaterialCheckResult::incompatible(
                available,
                format!(
                    "insufficient stock: need {}, available {}",
                    task.order_quantity, available
                ),
            );
        }

        if task.material_spec == current_material {
            return MaterialCheckResult::compatible(available, "material match, no changeover");
        }

        if current_material.is_empty() {
            // First load on a bare machine costs nothing.
            return MaterialCheckResult::with_change(
                0,
                available,
                current_material,
                "first material load",
            );
        }

        let to = self.catalog.family_of(&task.material_spec);
        let from = self.catalog.family_of(current_material);

        let change_cost = match (from, to) {
            (Some(f), Some(t)) => self.matrix.cost_between(f, t),
            (_, None) if self.policy == StockPolicy::Strict => {
                return MaterialCheckResult::incompatible(
                    available,
                    format!("unrecognized material: {}", task.material_spec),
                );
            }
            _ => self.matrix.default_cost(),
        };

        MaterialCheckResult::with_change(
            change_cost,
            available,
            current_material,
            format!("material change required, estimated {change_cost} min"),
        )
    }

    /// Whether on-hand stock covers `required` units of `code`.
    pub fn check_stock(&self, code: &str, required: u32) -> StockCheck {
        let available = self.catalog.stock_of(code);
        StockCheck {
            sufficient: available >= required,
            available,
        }
    }

    /// Consume stock. Fails without mutation when on-hand stock is short.
    pub fn consume(&mut self, code: &str, qty: u32) -> bool {
        let available = self.catalog.stock_of(code);
        if available < qty {
            warn!(code, need = qty, available, "stock consumption refused");
            return false;
        }
        self.catalog.set_stock(code, available - qty);
        info!(code, consumed = qty, remaining = available - qty, "material consumed");
        true
    }

    /// Return stock to the catalog. Always succeeds for known codes.
    pub fn restore(&mut self, code: &str, qty: u32) {
        let available = self.catalog.stock_of(code);
        if !self.catalog.set_stock(code, available.saturating_add(qty)) {
            warn!(code, "restore ignored for unknown material");
            return;
        }
        info!(code, returned = qty, "material returned");
    }

    /// Aggregate counts against the configured thresholds.
    pub fn stock_report(&self) -> StockReport {
        let mut report = StockReport {
            total_materials: self.catalog.len(),
            total_stock: 0,
            low_stock_count: 0,
            critical_stock_count: 0,
            out_of_stock_count: 0,
        };
        for record in self.catalog.all() {
            report.total_stock += u64::from(record.stock);
            if record.stock == 0 {
                report.out_of_stock_count += 1;
            }
            if record.stock <= self.thresholds.critical {
                report.critical_stock_count += 1;
            }
            if record.stock <= self.thresholds.low {
                report.low_stock_count += 1;
            }
        }
        report
    }

    /// Records at or below the low threshold, most severe classification.
    pub fn low_stock_materials(&self) -> Vec<LowStockEntry> {
        self.catalog
            .all()
            .iter()
            .filter(|r| r.stock <= self.thresholds.low)
            .map(|r| LowStockEntry {
                code: r.code.clone(),
                name: r.name.clone(),
                stock: r.stock,
                level: if r.stock == 0 {
                    StockLevel::OutOfStock
                } else if r.stock <= self.thresholds.critical {
                    StockLevel::Critical
                } else {
                    StockLevel::Low
                },
            })
            .collect()
    }

    /// Resolve a scan key and compare its canonical code with `expected`.
    pub fn validate_scan(&self, scan_key: &str, expected_code: &str) -> bool {
        let Some(record) = self.catalog.by_scan_key(scan_key) else {
            warn!(scan_key, "unrecognized material scan");
            return false;
        };
        let matched = record.code == expected_code;
        if !matched {
            warn!(
                scan_key,
                scanned = %record.code,
                expected = expected_code,
                "scanned material does not match the order"
            );
        }
        matched
    }
}
