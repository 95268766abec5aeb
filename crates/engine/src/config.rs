//! Engine configuration, loaded from a JSON file at startup.

use std::path::{Path, PathBuf};

use prodman_core::TaskPriority;
use prodman_material::{MaterialError, StockPolicy, StockThresholds};
use prodman_scheduler::{ApprovalPolicyKind, SchedulerError, StrategyKind};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Errors from engine construction and configuration.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed configuration, fatal at startup
    #[error("config error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Material layer failure
    #[error(transparent)]
    Material(#[from] MaterialError),

    /// Scheduler validation failure
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// One machine in the configured fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSeed {
    /// Machine identifier
    pub id: String,
    /// Material loaded at startup
    pub material: String,
    /// Declared capability tags
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Controller network address
    #[serde(default)]
    pub address: Option<String>,
}

/// One pre-loaded work order (demo/bring-up fleets).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSeed {
    /// Task identifier; generated when omitted
    #[serde(default)]
    pub id: Option<String>,
    /// Work instruction reference
    pub instruction_id: String,
    /// Product model
    pub product_model: String,
    /// Required material code
    pub material_spec: String,
    /// Ordered quantity
    pub order_quantity: u32,
    /// Priority token (`Normal`/`High`/`Urgent`)
    #[serde(default)]
    pub priority: Option<String>,
    /// Estimated minutes of processing
    #[serde(default)]
    pub estimated_duration: u32,
    /// NC program name
    #[serde(default)]
    pub program_name: Option<String>,
}

impl TaskSeed {
    /// Parse the priority token, falling back to `Normal` with a warning.
    pub fn priority(&self) -> TaskPriority {
        match &self.priority {
            None => TaskPriority::Normal,
            Some(token) => token.parse().unwrap_or_else(|_| {
                warn!(token, "unknown priority in task seed, using Normal");
                TaskPriority::Normal
            }),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProdmanConfig {
    /// Active assignment strategy
    pub strategy: StrategyKind,
    /// Seconds between background scheduling passes
    pub check_interval_secs: u64,
    /// Run a pass synchronously on task intake and status pushes
    pub schedule_on_event: bool,
    /// Error re-queues a task gets before it is archived
    pub max_retries: u32,
    /// Changeover approval policy
    pub approval_policy: ApprovalPolicyKind,
    /// Whether stock gates compatibility
    pub stock_policy: StockPolicy,
    /// Low/critical stock reporting thresholds
    pub stock_thresholds: StockThresholds,
    /// Path of the material catalog file
    pub material_store_path: PathBuf,
    /// The machine fleet
    pub machines: Vec<MachineSeed>,
    /// Work orders queued at startup
    pub sample_tasks: Vec<TaskSeed>,
}

impl Default for ProdmanConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::MaterialFirst,
            check_interval_secs: 10,
            schedule_on_event: true,
            max_retries: 3,
            approval_policy: ApprovalPolicyKind::AutoAccept,
            stock_policy: StockPolicy::Advisory,
            stock_thresholds: StockThresholds::default(),
            material_store_path: PathBuf::from("materials.json"),
            machines: vec![
                MachineSeed {
                    id: "CNC001".to_string(),
                    material: "S45C".to_string(),
                    capabilities: vec!["turning".to_string(), "facing".to_string()],
                    address: Some("127.0.0.1:8193".to_string()),
                },
                MachineSeed {
                    id: "CNC002".to_string(),
                    material: "AL6061".to_string(),
                    capabilities: vec!["turning".to_string()],
                    address: Some("127.0.0.1:8194".to_string()),
                },
                MachineSeed {
                    id: "CNC003".to_string(),
                    material: "SS304".to_string(),
                    capabilities: vec!["turning".to_string(), "facing".to_string()],
                    address: Some("127.0.0.1:8195".to_string()),
                },
            ],
            sample_tasks: Vec::new(),
        }
    }
}

impl ProdmanConfig {
    /// Load the configuration file.
    ///
    /// A missing file is replaced by written defaults; a malformed file is
    /// fatal, because scheduling against a half-read configuration would be
    /// worse than not starting.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            info!(path = %path.display(), "wrote default configuration");
            return Ok(config);
        }

        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), machines = config.machines.len(), "configuration loaded");
        Ok(config)
    }

    /// Write the configuration to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_a_three_machine_fleet() {
        let config = ProdmanConfig::default();
        assert_eq!(config.machines.len(), 3);
        assert_eq!(config.strategy, StrategyKind::MaterialFirst);
        assert_eq!(config.check_interval_secs, 10);
        assert!(config.schedule_on_event);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = ProdmanConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: ProdmanConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.machines.len(), config.machines.len());
        assert_eq!(back.strategy, config.strategy);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: ProdmanConfig =
            serde_json::from_str(r#"{"strategy": "efficiency"}"#).unwrap();
        assert_eq!(config.strategy, StrategyKind::Efficiency);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn malformed_config_is_fatal() {
        let dir = std::env::temp_dir().join("prodman-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = ProdmanConfig::load(&path).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn seed_priority_token_parses_or_defaults() {
        let seed = TaskSeed {
            id: None,
            instruction_id: "INS001".to_string(),
            product_model: "MODEL_A".to_string(),
            material_spec: "S45C".to_string(),
            order_quantity: 10,
            priority: Some("urgent".to_string()),
            estimated_duration: 60,
            program_name: None,
        };
        assert_eq!(seed.priority(), TaskPriority::Urgent);

        let seed = TaskSeed {
            priority: Some("asap".to_string()),
            ..seed
        };
        assert_eq!(seed.priority(), TaskPriority::Normal);
    }
}
