//! Material store abstraction and the JSON file backend.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use prodman_core::{MaterialFamily, MaterialRecord};
use regex::Regex;
use tokio::fs;
use tracing::{info, warn};

/// Error type for material store operations.
pub type Result<T> = std::result::Result<T, MaterialError>;

/// Errors that can occur in the material layer.
#[derive(Debug, thiserror::Error)]
pub enum MaterialError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Material not present in the catalog
    #[error("unknown material: {0}")]
    UnknownMaterial(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Store abstraction for the material catalog.
///
/// The engine loads the catalog in bulk at process start and works on the
/// in-memory copy; the store owns nothing beyond the backing file.
#[async_trait]
pub trait MaterialStore: Send + Sync {
    /// Load every catalog record.
    async fn load_all(&self) -> Result<Vec<MaterialRecord>>;

    /// Look up a record by canonical material code.
    async fn lookup_by_code(&self, code: &str) -> Result<Option<MaterialRecord>>;

    /// Look up a record by display name, falling back to the code.
    async fn lookup_by_name(&self, name: &str) -> Result<Option<MaterialRecord>>;

    /// Overwrite the stored stock quantity for a material code.
    ///
    /// Returns false when the code is not in the catalog.
    async fn mutate_stock(&mut self, code: &str, new_qty: u32) -> Result<bool>;
}

fn scan_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^MAT_[A-Z0-9]+_\d{3}$").unwrap())
}

/// File-based JSON catalog backend.
///
/// Creates a default catalog file when none exists, so a fresh deployment
/// starts with a usable material table.
pub struct JsonMaterialStore {
    path: PathBuf,
}

impl JsonMaterialStore {
    /// Open (or initialize) the catalog file at `path`.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !fs::try_exists(&path).await? {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            let defaults = default_catalog();
            let json = serde_json::to_string_pretty(&defaults)?;
            fs::write(&path, json).await?;
            info!(path = %path.display(), "created default material catalog");
        }

        Ok(Self { path })
    }

    async fn read(&self) -> Result<Vec<MaterialRecord>> {
        let raw = fs::read_to_string(&self.path).await?;
        let records: Vec<MaterialRecord> = serde_json::from_str(&raw)?;

        let mut seen = std::collections::HashSet::new();
        let mut valid = Vec::with_capacity(records.len());
        for record in records {
            if !scan_key_pattern().is_match(&record.scan_key) {
                warn!(scan_key = %record.scan_key, "rejecting record with malformed scan key");
                continue;
            }
            // First occurrence wins on duplicate scan keys
            if !seen.insert(record.scan_key.clone()) {
                warn!(scan_key = %record.scan_key, "duplicate scan key, keeping first");
                continue;
            }
            valid.push(record);
        }
        Ok(valid)
    }

    async fn write(&self, records: &[MaterialRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl MaterialStore for JsonMaterialStore {
    async fn load_all(&self) -> Result<Vec<MaterialRecord>> {
        let records = self.read().await?;
        info!(count = records.len(), "material catalog loaded");
        Ok(records)
    }

    async fn lookup_by_code(&self, code: &str) -> Result<Option<MaterialRecord>> {
        let records = self.read().await?;
        Ok(records.into_iter().find(|r| r.code == code))
    }

    async fn lookup_by_name(&self, name: &str) -> Result<Option<MaterialRecord>> {
        let records = self.read().await?;
        Ok(records
            .into_iter()
            .find(|r| r.name == name || r.code == name))
    }

    async fn mutate_stock(&mut self, code: &str, new_qty: u32) -> Result<bool> {
        let mut records = self.read().await?;
        let Some(record) = records.iter_mut().find(|r| r.code == code) else {
            return Ok(false);
        };
        let old = record.stock;
        record.stock = new_qty;
        self.write(&records).await?;
        info!(code, old, new = new_qty, "material stock updated");
        Ok(true)
    }
}

/// Default catalog seeded on first start.
fn default_catalog() -> Vec<MaterialRecord> {
    let row = |scan_key: &str, code: &str, name: &str, family: MaterialFamily, stock: u32| {
        MaterialRecord {
            scan_key: scan_key.to_string(),
            code: code.to_string(),
            name: name.to_string(),
            family,
            stock,
            unit: "kg".to_string(),
            supplier: "default".to_string(),
            notes: None,
        }
    };

    vec![
        row("MAT_S45C_001", "S45C", "S45C carbon steel", MaterialFamily::Steel, 100),
        row("MAT_AL6061_001", "AL6061", "AL6061-T6", MaterialFamily::Aluminum, 50),
        row("MAT_SS304_001", "SS304", "SS304-L", MaterialFamily::StainlessSteel, 80),
        row("MAT_H62_001", "H62", "H62 brass", MaterialFamily::Copper, 30),
    ]
}
