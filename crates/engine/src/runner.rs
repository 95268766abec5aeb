//! The background scheduling loop.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::service::SchedulerService;

/// Drives periodic scheduling passes until shutdown is signalled.
///
/// Shutdown is graceful: the loop stops taking ticks, and because a pass
/// runs to completion under the core's lock, an in-flight pass always
/// finishes before the runner returns.
pub struct EngineRunner {
    service: SchedulerService,
    interval: Duration,
}

impl EngineRunner {
    /// Create a runner ticking at the given interval.
    pub fn new(service: SchedulerService, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Run until the shutdown channel reads true (or closes).
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = self.interval.as_secs(), "scheduling loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let assignments = self.service.schedule_now().await;
                    if !assignments.is_empty() {
                        info!(assigned = assignments.len(), "periodic pass committed");
                    }
                }
                changed = shutdown.changed() => {
                    match changed {
                        Ok(()) if !*shutdown.borrow() => continue,
                        Ok(()) => {
                            info!("shutdown requested, scheduling loop stopping");
                            break;
                        }
                        Err(err) => {
                            error!(%err, "shutdown channel closed, scheduling loop stopping");
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodman_core::{
        MachineId, MachineState, MaterialFamily, MaterialRecord, Task, TaskId,
    };
    use prodman_material::{MaterialCatalog, MaterialEngine};
    use prodman_scheduler::SchedulerCore;

    fn service() -> SchedulerService {
        let material = MaterialEngine::new(MaterialCatalog::new(vec![MaterialRecord {
            scan_key: "MAT_S45C_001".to_string(),
            code: "S45C".to_string(),
            name: "S45C".to_string(),
            family: MaterialFamily::Steel,
            stock: 300,
            unit: "kg".to_string(),
            supplier: "test".to_string(),
            notes: None,
        }]));
        let mut core = SchedulerCore::new(material);
        core.update_machine(MachineState::new(MachineId::from("CNC001"), "IDLE", "S45C"));
        // Only the loop schedules in these tests
        SchedulerService::new(core).with_schedule_on_event(false)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_place_pending_work() {
        let service = service();
        service
            .add_task(Task::new(TaskId::from("T1"), "INS001", "MODEL_A", "S45C", 10))
            .await
            .unwrap();
        assert_eq!(service.statistics().await.pending, 1);

        let (tx, rx) = watch::channel(false);
        let runner = EngineRunner::new(service.clone(), Duration::from_secs(1));
        let handle = tokio::spawn(async move { runner.run(rx).await });

        // First tick fires immediately under the paused clock
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(service.statistics().await.running, 1);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_loop() {
        let service = service();
        let (tx, rx) = watch::channel(false);
        let runner = EngineRunner::new(service, Duration::from_secs(1));
        let handle = tokio::spawn(async move { runner.run(rx).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_also_stops_the_loop() {
        let service = service();
        let (tx, rx) = watch::channel(false);
        let runner = EngineRunner::new(service, Duration::from_secs(1));
        let handle = tokio::spawn(async move { runner.run(rx).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(tx);
        handle.await.unwrap();
    }
}
