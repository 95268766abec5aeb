//! The fleet registry: last-write-wins machine snapshots.

use std::collections::HashMap;

use prodman_core::{MachineId, MachineState, TaskId};
use tracing::debug;

/// Stored machine snapshots, replaced wholesale by provider pushes.
///
/// The registry does not merge: a push replaces the previous snapshot
/// entirely (last write wins). The only fields the engine itself writes are
/// `current_task` and the status token, via `claim`/`release`/`set_status`.
#[derive(Debug, Default)]
pub struct MachineRegistry {
    machines: HashMap<MachineId, MachineState>,
}

impl MachineRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored snapshot for a machine.
    pub fn update(&mut self, state: MachineState) {
        debug!(machine = %state.machine_id, status = %state.status, "machine state updated");
        self.machines.insert(state.machine_id.clone(), state);
    }

    /// The stored snapshot for a machine.
    pub fn get(&self, id: &MachineId) -> Option<&MachineState> {
        self.machines.get(id)
    }

    /// All stored snapshots, in no guaranteed order.
    pub fn all(&self) -> impl Iterator<Item = &MachineState> {
        self.machines.values()
    }

    /// Number of known machines.
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    /// Whether no machines are known.
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// IDs of machines satisfying the availability predicate. Callers must
    /// not depend on the ordering.
    pub fn available_machines(&self) -> Vec<MachineId> {
        self.machines
            .values()
            .filter(|m| m.is_available())
            .map(|m| m.machine_id.clone())
            .collect()
    }

    /// Place a task on a machine and mark it busy.
    pub fn claim(&mut self, id: &MachineId, task: TaskId) -> bool {
        let Some(machine) = self.machines.get_mut(id) else {
            return false;
        };
        machine.current_task = Some(task);
        machine.set_status("RUNNING");
        true
    }

    /// Clear a machine's task and return it to idle.
    pub fn release(&mut self, id: &MachineId) {
        if let Some(machine) = self.machines.get_mut(id) {
            machine.current_task = None;
            machine.set_status("IDLE");
        }
    }

    /// Overwrite a machine's status token.
    pub fn set_status(&mut self, id: &MachineId, token: &str) {
        if let Some(machine) = self.machines.get_mut(id) {
            machine.set_status(token);
        }
    }
}
