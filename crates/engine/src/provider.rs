//! The machine status seam.
//!
//! The engine never polls hardware; a provider observes the fleet and
//! pushes snapshots into the service. `StaticStatusProvider` emits the
//! configured fleet as an idle snapshot, which is all a bring-up or demo
//! deployment needs.

use async_trait::async_trait;
use prodman_core::{MachineId, MachineState};

use crate::config::MachineSeed;

/// A source of machine state snapshots.
#[async_trait]
pub trait StatusProvider: Send + Sync {
    /// The current snapshot of every machine this provider observes.
    async fn snapshot(&mut self) -> Vec<MachineState>;
}

/// Provider backed by the configured fleet, reporting every machine idle.
pub struct StaticStatusProvider {
    seeds: Vec<MachineSeed>,
}

impl StaticStatusProvider {
    /// Build from the configured machine list.
    pub fn new(seeds: Vec<MachineSeed>) -> Self {
        Self { seeds }
    }
}

#[async_trait]
impl StatusProvider for StaticStatusProvider {
    async fn snapshot(&mut self) -> Vec<MachineState> {
        self.seeds
            .iter()
            .map(|seed| {
                let mut state = MachineState::new(
                    MachineId::from(seed.id.as_str()),
                    "IDLE",
                    seed.material.clone(),
                )
                .with_capabilities(seed.capabilities.clone());
                if let Some(address) = &seed.address {
                    state = state.with_address(address.clone());
                }
                state
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_reports_the_configured_fleet_idle() {
        let mut provider = StaticStatusProvider::new(vec![MachineSeed {
            id: "CNC001".to_string(),
            material: "S45C".to_string(),
            capabilities: vec!["turning".to_string()],
            address: None,
        }]);

        let snapshot = provider.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].status, "IDLE");
        assert!(snapshot[0].is_available());
        assert!(snapshot[0].has_capability("turning"));
    }
}
