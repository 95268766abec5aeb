//! In-memory material catalog with scan-key and code indexes.

use std::collections::HashMap;

use prodman_core::{MaterialFamily, MaterialRecord};
use tracing::debug;

/// The loaded material table, indexed for the two lookup paths the engine
/// uses: scan keys at intake, canonical codes everywhere else.
#[derive(Debug, Default)]
pub struct MaterialCatalog {
    records: Vec<MaterialRecord>,
    by_scan: HashMap<String, usize>,
    by_code: HashMap<String, usize>,
}

impl MaterialCatalog {
    /// Build the catalog from bulk-loaded records.
    pub fn new(records: Vec<MaterialRecord>) -> Self {
        let mut by_scan = HashMap::with_capacity(records.len());
        let mut by_code = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            by_scan.entry(record.scan_key.clone()).or_insert(idx);
            by_code.entry(record.code.clone()).or_insert(idx);
        }
        Self {
            records,
            by_scan,
            by_code,
        }
    }

    /// Look up a record by its scan key.
    pub fn by_scan_key(&self, scan_key: &str) -> Option<&MaterialRecord> {
        self.by_scan.get(scan_key).map(|&i| &self.records[i])
    }

    /// Look up a record by canonical code.
    pub fn by_code(&self, code: &str) -> Option<&MaterialRecord> {
        self.by_code.get(code).map(|&i| &self.records[i])
    }

    /// Look up a record by display name, falling back to the code index.
    pub fn by_name(&self, name: &str) -> Option<&MaterialRecord> {
        self.records
            .iter()
            .find(|r| r.name == name)
            .or_else(|| self.by_code(name))
    }

    /// On-hand stock for a code, 0 when unknown.
    pub fn stock_of(&self, code: &str) -> u32 {
        self.by_code(code).map(|r| r.stock).unwrap_or(0)
    }

    /// Overwrite stock for a code. Returns false when the code is unknown.
    pub fn set_stock(&mut self, code: &str, qty: u32) -> bool {
        let Some(&idx) = self.by_code.get(code) else {
            return false;
        };
        let old = self.records[idx].stock;
        self.records[idx].stock = qty;
        debug!(code, old, new = qty, "catalog stock set");
        true
    }

    /// Material family for a code, when known.
    pub fn family_of(&self, code: &str) -> Option<&MaterialFamily> {
        self.by_code(code).map(|r| &r.family)
    }

    /// Canonical codes of every record in the given family.
    pub fn compatible_codes(&self, family: &MaterialFamily) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| &r.family == family)
            .map(|r| r.code.as_str())
            .collect()
    }

    /// All records in load order.
    pub fn all(&self) -> &[MaterialRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(scan: &str, code: &str, name: &str, family: MaterialFamily, stock: u32) -> MaterialRecord {
        MaterialRecord {
            scan_key: scan.to_string(),
            code: code.to_string(),
            name: name.to_string(),
            family,
            stock,
            unit: "kg".to_string(),
            supplier: "test".to_string(),
            notes: None,
        }
    }

    fn catalog() -> MaterialCatalog {
        MaterialCatalog::new(vec![
            record("MAT_S45C_001", "S45C", "S45C carbon steel", MaterialFamily::Steel, 300),
            record("MAT_AL6061_001", "AL6061", "AL6061-T6", MaterialFamily::Aluminum, 50),
        ])
    }

    #[test]
    fn lookups_hit_both_indexes() {
        let c = catalog();
        assert_eq!(c.by_scan_key("MAT_S45C_001").unwrap().code, "S45C");
        assert_eq!(c.by_code("AL6061").unwrap().name, "AL6061-T6");
        assert_eq!(c.by_name("S45C carbon steel").unwrap().code, "S45C");
        // Name lookup falls back to the code index
        assert_eq!(c.by_name("AL6061").unwrap().scan_key, "MAT_AL6061_001");
        assert!(c.by_code("SS304").is_none());
    }

    #[test]
    fn stock_of_unknown_code_is_zero() {
        assert_eq!(catalog().stock_of("SS304"), 0);
    }

    #[test]
    fn set_stock_rejects_unknown_codes() {
        let mut c = catalog();
        assert!(c.set_stock("S45C", 10));
        assert_eq!(c.stock_of("S45C"), 10);
        assert!(!c.set_stock("SS304", 10));
    }

    #[test]
    fn compatible_codes_filters_by_family() {
        let c = catalog();
        assert_eq!(c.compatible_codes(&MaterialFamily::Steel), vec!["S45C"]);
        assert!(c.compatible_codes(&MaterialFamily::Copper).is_empty());
    }
}
