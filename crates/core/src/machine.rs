//! Machine state snapshot and the availability predicate.

use serde::{Deserialize, Serialize};

use crate::id::{MachineId, TaskId};
use crate::Time;

/// Status tokens that mean a machine can accept work.
const AVAILABLE_TOKENS: &[&str] = &["OFF", "IDLE", "STANDBY", "READY"];

/// Status tokens that mean a machine is occupied.
const BUSY_TOKENS: &[&str] = &["ON", "RUNNING", "BUSY"];

/// Point-in-time snapshot of one machine, pushed by the status provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineState {
    /// Machine identifier
    pub machine_id: MachineId,

    /// Current status token, normalized upper-case
    pub status: String,

    /// Material currently loaded, canonical code ("" when none)
    pub current_material: String,

    /// Task currently placed on the machine
    pub current_task: Option<TaskId>,

    /// NC program currently loaded, if reported
    pub program_name: Option<String>,

    /// When this snapshot was taken
    pub last_update: Time,

    /// Declared capability tags (e.g. `turning`, `facing`)
    pub capabilities: Vec<String>,

    /// Network address of the controller, if known
    pub address: Option<String>,
}

impl MachineState {
    /// Create a snapshot with a normalized status token.
    pub fn new(
        machine_id: MachineId,
        status: impl AsRef<str>,
        current_material: impl Into<String>,
    ) -> Self {
        Self {
            machine_id,
            status: normalize(status.as_ref()),
            current_material: current_material.into(),
            current_task: None,
            program_name: None,
            last_update: chrono::Utc::now(),
            capabilities: Vec::new(),
            address: None,
        }
    }

    /// Set the declared capability tags.
    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the controller network address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Replace the status token (normalized) and stamp the snapshot.
    pub fn set_status(&mut self, token: &str) {
        self.status = normalize(token);
        self.last_update = chrono::Utc::now();
    }

    /// Whether the machine can accept a new task.
    ///
    /// True when the status token is in the availability allow-list and no
    /// task is currently placed on the machine. An unrecognized token (not
    /// in either list) also counts as available: the optimistic default, so
    /// a stale or missing status never deadlocks the fleet.
    pub fn is_available(&self) -> bool {
        if self.current_task.is_some() {
            return false;
        }
        if AVAILABLE_TOKENS.contains(&self.status.as_str()) {
            return true;
        }
        !BUSY_TOKENS.contains(&self.status.as_str())
    }

    /// Whether the status token reports active production.
    pub fn is_busy(&self) -> bool {
        BUSY_TOKENS.contains(&self.status.as_str())
    }

    /// Whether the machine declares the given capability tag.
    pub fn has_capability(&self, tag: &str) -> bool {
        self.capabilities.iter().any(|c| c.eq_ignore_ascii_case(tag))
    }
}

fn normalize(token: &str) -> String {
    token.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(status: &str) -> MachineState {
        MachineState::new(MachineId::from("CNC001"), status, "S45C")
    }

    #[test]
    fn idle_machine_is_available() {
        assert!(machine("IDLE").is_available());
        assert!(machine("off").is_available());
        assert!(machine(" Standby ").is_available());
    }

    #[test]
    fn busy_tokens_are_not_available() {
        assert!(!machine("RUNNING").is_available());
        assert!(!machine("busy").is_available());
        assert!(machine("RUNNING").is_busy());
    }

    #[test]
    fn unrecognized_token_is_available_by_policy() {
        assert!(machine("UNKNOWN").is_available());
        assert!(machine("E-STOP?").is_available());
    }

    #[test]
    fn held_task_blocks_availability() {
        let mut m = machine("IDLE");
        m.current_task = Some(TaskId::from("T1"));
        assert!(!m.is_available());
    }

    #[test]
    fn capability_lookup_ignores_case() {
        let m = machine("IDLE").with_capabilities(vec!["Turning".into(), "facing".into()]);
        assert!(m.has_capability("turning"));
        assert!(m.has_capability("FACING"));
        assert!(!m.has_capability("milling"));
    }
}
