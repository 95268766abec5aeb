//! Pluggable assignment strategies.
//!
//! A strategy maps (pending tasks, candidate machines) to an ordered list of
//! candidate assignments. It proposes; `SchedulerCore::schedule` commits,
//! re-validating each candidate against the live state.

use std::collections::{HashMap, HashSet};

use prodman_core::{MachineId, MaterialCheckResult, Task, TaskId};
use prodman_material::MaterialEngine;
use serde::{Deserialize, Serialize};

use crate::engine::SchedulerError;
use crate::registry::MachineRegistry;
use crate::scoring::{assignment_score, efficiency_score};

/// A proposed (task, machine) pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Task to place
    pub task_id: TaskId,
    /// Machine to place it on
    pub machine_id: MachineId,
}

/// Read-only view of the scheduler state a strategy plans against.
pub struct StrategyContext<'a> {
    /// Pending tasks in queue order
    pub pending: &'a [Task],
    /// Candidate machines for this pass
    pub machines: &'a [MachineId],
    /// Fleet snapshots
    pub registry: &'a MachineRegistry,
    /// Tasks currently placed, keyed by ID
    pub running: &'a HashMap<TaskId, Task>,
    /// Compatibility oracle
    pub material: &'a MaterialEngine,
}

impl StrategyContext<'_> {
    /// Compatibility check for a (task, machine) pair.
    pub fn check(&self, task: &Task, machine_id: &MachineId) -> MaterialCheckResult {
        match self.registry.get(machine_id) {
            Some(machine) => {
                self.material
                    .check_compatibility(task, machine_id, &machine.current_material)
            }
            None => MaterialCheckResult::incompatible(0, format!("unknown machine: {machine_id}")),
        }
    }

    /// Aggregate estimated minutes of running work placed on a machine.
    pub fn machine_load(&self, machine_id: &MachineId) -> u64 {
        self.running
            .values()
            .filter(|t| t.assigned_machine.as_ref() == Some(machine_id))
            .map(|t| u64::from(t.estimated_duration))
            .sum()
    }

    /// Number of running tasks placed on a machine.
    pub fn running_count(&self, machine_id: &MachineId) -> usize {
        self.running
            .values()
            .filter(|t| t.assigned_machine.as_ref() == Some(machine_id))
            .count()
    }
}

/// A pluggable assignment strategy.
pub trait AssignmentStrategy: Send + Sync {
    /// Strategy name, as accepted by `set_strategy`.
    fn name(&self) -> &'static str;

    /// Plan candidate assignments against the given state.
    fn plan(&self, ctx: &StrategyContext<'_>) -> Vec<Candidate>;
}

/// Pending tasks sorted by priority, highest first; queue order breaks ties.
fn priority_sorted(pending: &[Task]) -> Vec<&Task> {
    let mut order: Vec<&Task> = pending.iter().collect();
    order.sort_by(|a, b| b.priority.weight().cmp(&a.priority.weight()));
    order
}

/// Best compatible machine in the pool by assignment score. Ties go to the
/// lexicographically smaller machine ID so a pass is deterministic.
fn best_machine_for(task: &Task, pool: &[MachineId], ctx: &StrategyContext<'_>) -> Option<MachineId> {
    let mut best: Option<(MachineId, f64)> = None;
    for machine_id in pool {
        let check = ctx.check(task, machine_id);
        if !check.compatible {
            continue;
        }
        let Some(machine) = ctx.registry.get(machine_id) else {
            continue;
        };
        let score = assignment_score(task, machine, &check);
        let better = match &best {
            None => true,
            Some((best_id, best_score)) => {
                score > *best_score
                    || (score == *best_score && machine_id.as_str() < best_id.as_str())
            }
        };
        if better {
            best = Some((machine_id.clone(), score));
        }
    }
    best.map(|(id, _)| id)
}

/// Priority-descending sweep, each task taking its best-scoring machine and
/// removing it from the pool (one task per machine per pass).
fn plan_priority_greedy(ctx: &StrategyContext<'_>) -> Vec<Candidate> {
    let mut pool: Vec<MachineId> = ctx.machines.to_vec();
    let mut candidates = Vec::new();

    for task in priority_sorted(ctx.pending) {
        let Some(machine_id) = best_machine_for(task, &pool, ctx) else {
            continue;
        };
        pool.retain(|m| *m != machine_id);
        candidates.push(Candidate {
            task_id: task.id.clone(),
            machine_id,
        });
    }
    candidates
}

/// Prefer placements that avoid a material changeover; the material term
/// dominates the assignment score.
pub struct MaterialFirst;

impl AssignmentStrategy for MaterialFirst {
    fn name(&self) -> &'static str {
        "material_first"
    }

    fn plan(&self, ctx: &StrategyContext<'_>) -> Vec<Candidate> {
        plan_priority_greedy(ctx)
    }
}

/// Serve the most urgent orders first; same mechanics, priority-only intent.
pub struct PriorityFirst;

impl AssignmentStrategy for PriorityFirst {
    fn name(&self) -> &'static str {
        "priority_first"
    }

    fn plan(&self, ctx: &StrategyContext<'_>) -> Vec<Candidate> {
        plan_priority_greedy(ctx)
    }
}

/// Spread work across the fleet: each task goes to the least-loaded
/// compatible machine.
pub struct LoadBalance;

impl AssignmentStrategy for LoadBalance {
    fn name(&self) -> &'static str {
        "load_balance"
    }

    fn plan(&self, ctx: &StrategyContext<'_>) -> Vec<Candidate> {
        let mut pool: Vec<MachineId> = ctx.machines.to_vec();
        let mut load: HashMap<MachineId, u64> = pool
            .iter()
            .map(|m| (m.clone(), ctx.machine_load(m)))
            .collect();
        let mut candidates = Vec::new();

        for task in priority_sorted(ctx.pending) {
            let mut best: Option<(MachineId, u64)> = None;
            for machine_id in &pool {
                if !ctx.check(task, machine_id).compatible {
                    continue;
                }
                let machine_load = load.get(machine_id).copied().unwrap_or(0);
                let better = match &best {
                    None => true,
                    Some((best_id, best_load)) => {
                        machine_load < *best_load
                            || (machine_load == *best_load
                                && machine_id.as_str() < best_id.as_str())
                    }
                };
                if better {
                    best = Some((machine_id.clone(), machine_load));
                }
            }

            let Some((machine_id, _)) = best else {
                continue;
            };
            if let Some(entry) = load.get_mut(&machine_id) {
                *entry += u64::from(task.estimated_duration);
            }
            pool.retain(|m| *m != machine_id);
            candidates.push(Candidate {
                task_id: task.id.clone(),
                machine_id,
            });
        }
        candidates
    }
}

/// Global greedy matching on the efficiency score: every (task, machine)
/// pair is scored, then the best pair whose task and machine are both still
/// free is accepted, repeatedly.
pub struct Efficiency;

impl AssignmentStrategy for Efficiency {
    fn name(&self) -> &'static str {
        "efficiency"
    }

    fn plan(&self, ctx: &StrategyContext<'_>) -> Vec<Candidate> {
        let mut scored: Vec<(f64, TaskId, MachineId)> = Vec::new();
        for task in ctx.pending {
            for machine_id in ctx.machines {
                let check = ctx.check(task, machine_id);
                if let Some(score) = efficiency_score(task, &check, ctx.running_count(machine_id))
                {
                    scored.push((score, task.id.clone(), machine_id.clone()));
                }
            }
        }

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.as_str().cmp(b.1.as_str()))
                .then_with(|| a.2.as_str().cmp(b.2.as_str()))
        });

        let mut taken_tasks: HashSet<TaskId> = HashSet::new();
        let mut taken_machines: HashSet<MachineId> = HashSet::new();
        let mut candidates = Vec::new();

        for (_, task_id, machine_id) in scored {
            if taken_tasks.contains(&task_id) || taken_machines.contains(&machine_id) {
                continue;
            }
            taken_tasks.insert(task_id.clone());
            taken_machines.insert(machine_id.clone());
            candidates.push(Candidate {
                task_id,
                machine_id,
            });
        }
        candidates
    }
}

/// The selectable strategies, by configuration name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// `material_first`
    #[default]
    MaterialFirst,
    /// `priority_first`
    PriorityFirst,
    /// `load_balance`
    LoadBalance,
    /// `efficiency`
    Efficiency,
}

impl StrategyKind {
    /// Instantiate the strategy.
    pub fn build(self) -> Box<dyn AssignmentStrategy> {
        match self {
            Self::MaterialFirst => Box::new(MaterialFirst),
            Self::PriorityFirst => Box::new(PriorityFirst),
            Self::LoadBalance => Box::new(LoadBalance),
            Self::Efficiency => Box::new(Efficiency),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MaterialFirst => "material_first",
            Self::PriorityFirst => "priority_first",
            Self::LoadBalance => "load_balance",
            Self::Efficiency => "efficiency",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "material_first" => Ok(Self::MaterialFirst),
            "priority_first" => Ok(Self::PriorityFirst),
            "load_balance" => Ok(Self::LoadBalance),
            "efficiency" => Ok(Self::Efficiency),
            other => Err(SchedulerError::UnknownStrategy(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodman_core::{MachineState, MaterialFamily, MaterialRecord, TaskPriority, TaskStatus};
    use prodman_material::MaterialCatalog;

    fn record(scan: &str, code: &str, family: MaterialFamily) -> MaterialRecord {
        MaterialRecord {
            scan_key: scan.to_string(),
            code: code.to_string(),
            name: code.to_string(),
            family,
            stock: 500,
            unit: "kg".to_string(),
            supplier: "test".to_string(),
            notes: None,
        }
    }

    fn material() -> MaterialEngine {
        MaterialEngine::new(MaterialCatalog::new(vec![
            record("MAT_S45C_001", "S45C", MaterialFamily::Steel),
            record("MAT_AL6061_001", "AL6061", MaterialFamily::Aluminum),
        ]))
    }

    fn task(id: &str, material: &str, priority: TaskPriority, duration: u32) -> Task {
        Task::new(TaskId::from(id), "INS001", "MODEL_A", material, 10)
            .with_priority(priority)
            .with_estimated_duration(duration)
    }

    fn registry(machines: &[(&str, &str)]) -> MachineRegistry {
        let mut r = MachineRegistry::new();
        for (id, mat) in machines {
            r.update(MachineState::new(MachineId::from(*id), "IDLE", *mat));
        }
        r
    }

    fn running_on(machine: &str, id: &str, duration: u32) -> Task {
        let mut t = task(id, "S45C", TaskPriority::Normal, duration);
        t.assigned_machine = Some(MachineId::from(machine));
        t.update_status(TaskStatus::Ready, "").unwrap();
        t.update_status(TaskStatus::Running, "").unwrap();
        t
    }

    #[test]
    fn priority_greedy_orders_by_urgency_then_queue_order() {
        let pending = vec![
            task("T-a", "S45C", TaskPriority::Normal, 60),
            task("T-b", "S45C", TaskPriority::Urgent, 60),
            task("T-c", "S45C", TaskPriority::Normal, 60),
        ];
        let machines = vec![MachineId::from("CNC001"), MachineId::from("CNC002")];
        let registry = registry(&[("CNC001", "S45C"), ("CNC002", "S45C")]);
        let running = HashMap::new();
        let material = material();
        let ctx = StrategyContext {
            pending: &pending,
            machines: &machines,
            registry: &registry,
            running: &running,
            material: &material,
        };

        let plan = PriorityFirst.plan(&ctx);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].task_id, TaskId::from("T-b"));
        // Tie between T-a and T-c broken by queue order
        assert_eq!(plan[1].task_id, TaskId::from("T-a"));
    }

    #[test]
    fn material_first_takes_the_matching_machine() {
        let pending = vec![task("T1", "AL6061", TaskPriority::Normal, 60)];
        let machines = vec![MachineId::from("CNC001"), MachineId::from("CNC002")];
        let registry = registry(&[("CNC001", "S45C"), ("CNC002", "AL6061")]);
        let running = HashMap::new();
        let material = material();
        let ctx = StrategyContext {
            pending: &pending,
            machines: &machines,
            registry: &registry,
            running: &running,
            material: &material,
        };

        let plan = MaterialFirst.plan(&ctx);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].machine_id, MachineId::from("CNC002"));
    }

    #[test]
    fn load_balance_ranks_by_running_minutes() {
        let pending = vec![task("T-new", "S45C", TaskPriority::Normal, 60)];
        let machines = vec![MachineId::from("CNC001"), MachineId::from("CNC002")];
        let registry = registry(&[("CNC001", "S45C"), ("CNC002", "S45C")]);
        let mut running = HashMap::new();
        let held = running_on("CNC001", "T-held", 240);
        running.insert(held.id.clone(), held);
        let material = material();
        let ctx = StrategyContext {
            pending: &pending,
            machines: &machines,
            registry: &registry,
            running: &running,
            material: &material,
        };

        let plan = LoadBalance.plan(&ctx);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].machine_id, MachineId::from("CNC002"));
    }

    #[test]
    fn efficiency_damps_loaded_machines() {
        let pending = vec![task("T-new", "S45C", TaskPriority::Normal, 60)];
        let machines = vec![MachineId::from("CNC001"), MachineId::from("CNC002")];
        let registry = registry(&[("CNC001", "S45C"), ("CNC002", "S45C")]);
        let mut running = HashMap::new();
        let held = running_on("CNC001", "T-held", 240);
        running.insert(held.id.clone(), held);
        let material = material();
        let ctx = StrategyContext {
            pending: &pending,
            machines: &machines,
            registry: &registry,
            running: &running,
            material: &material,
        };

        let plan = Efficiency.plan(&ctx);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].machine_id, MachineId::from("CNC002"));
    }

    #[test]
    fn strategy_names_round_trip() {
        for kind in [
            StrategyKind::MaterialFirst,
            StrategyKind::PriorityFirst,
            StrategyKind::LoadBalance,
            StrategyKind::Efficiency,
        ] {
            let parsed: StrategyKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
            assert_eq!(kind.build().name(), kind.to_string());
        }
        assert!("shortest_job".parse::<StrategyKind>().is_err());
    }
}
