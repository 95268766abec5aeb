//! Material catalog records and check-result value objects.

use serde::{Deserialize, Serialize};

/// Broad material family, used for changeover costing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialFamily {
    /// Carbon and alloy steels
    Steel,
    /// Aluminum alloys
    Aluminum,
    /// Stainless steels
    StainlessSteel,
    /// Copper and copper alloys
    Copper,
    /// Catalog rows outside the cost matrix
    Other(String),
}

impl MaterialFamily {
    /// Parse a catalog family token. Unknown tokens map to `Other`.
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_uppercase().as_str() {
            "STEEL" => Self::Steel,
            "ALUMINUM" => Self::Aluminum,
            "STAINLESS_STEEL" | "STAINLESS" => Self::StainlessSteel,
            "COPPER" | "BRASS" => Self::Copper,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for MaterialFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Steel => f.write_str("STEEL"),
            Self::Aluminum => f.write_str("ALUMINUM"),
            Self::StainlessSteel => f.write_str("STAINLESS_STEEL"),
            Self::Copper => f.write_str("COPPER"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// One row of the material catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialRecord {
    /// Scan/lookup key (e.g. `MAT_S45C_001`), the record identity
    pub scan_key: String,

    /// Canonical material code (e.g. `S45C`)
    pub code: String,

    /// Display name
    pub name: String,

    /// Material family
    pub family: MaterialFamily,

    /// On-hand stock quantity
    pub stock: u32,

    /// Stock unit (e.g. `kg`)
    pub unit: String,

    /// Supplier name
    pub supplier: String,

    /// Free-form notes
    pub notes: Option<String>,
}

/// Outcome of a material compatibility check. Produced fresh on every
/// check; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialCheckResult {
    /// Whether the task may run on the machine at all
    pub compatible: bool,

    /// Whether the machine must switch materials first
    pub requires_change: bool,

    /// Estimated changeover time in minutes
    pub change_cost: u32,

    /// Human-readable summary of the decision
    pub message: String,

    /// On-hand stock of the task's material at check time
    pub available: u32,

    /// Material currently loaded on the machine, when it differs
    pub machine_material: Option<String>,
}

impl MaterialCheckResult {
    /// A compatible result with no changeover.
    pub fn compatible(available: u32, message: impl Into<String>) -> Self {
        Self {
            compatible: true,
            requires_change: false,
            change_cost: 0,
            message: message.into(),
            available,
            machine_material: None,
        }
    }

    /// A compatible result that requires a material changeover.
    pub fn with_change(
        change_cost: u32,
        available: u32,
        machine_material: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            compatible: true,
            requires_change: true,
            change_cost,
            message: message.into(),
            available,
            machine_material: Some(machine_material.into()),
        }
    }

    /// An incompatible result.
    pub fn incompatible(available: u32, message: impl Into<String>) -> Self {
        Self {
            compatible: false,
            requires_change: false,
            change_cost: 0,
            message: message.into(),
            available,
            machine_material: None,
        }
    }
}

/// Outcome of a stock sufficiency query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StockCheck {
    /// Whether on-hand stock covers the required quantity
    pub sufficient: bool,

    /// On-hand stock at query time
    pub available: u32,
}

/// Stock level classification against configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockLevel {
    /// At or below the low threshold
    Low,
    /// At or below the critical threshold
    Critical,
    /// Nothing on hand
    OutOfStock,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_parses_known_tokens() {
        assert_eq!(MaterialFamily::parse("steel"), MaterialFamily::Steel);
        assert_eq!(
            MaterialFamily::parse("STAINLESS_STEEL"),
            MaterialFamily::StainlessSteel
        );
        assert_eq!(MaterialFamily::parse("brass"), MaterialFamily::Copper);
        assert_eq!(
            MaterialFamily::parse("titanium"),
            MaterialFamily::Other("TITANIUM".into())
        );
    }
}
