//! Assignment and efficiency scoring.

use prodman_core::{MachineState, MaterialCheckResult, Task, TaskPriority};

/// Score a (task, machine) pair for the per-task-first strategies.
///
/// Sum of a material term (100 for a zero-changeover placement, decaying
/// with the changeover cost), a priority term, and a small capability bonus
/// for general-purpose machines when the task already has a program.
pub fn assignment_score(
    task: &Task,
    machine: &MachineState,
    check: &MaterialCheckResult,
) -> f64 {
    let material_term = if check.requires_change {
        f64::from(100u32.saturating_sub(check.change_cost))
    } else {
        100.0
    };

    let priority_term = match task.priority {
        TaskPriority::Urgent => 50.0,
        TaskPriority::High => 30.0,
        TaskPriority::Normal => 10.0,
    };

    let capability_term = if task.program_name.is_some()
        && (machine.has_capability("turning") || machine.has_capability("facing"))
    {
        20.0
    } else {
        0.0
    };

    material_term + priority_term + capability_term
}

/// Score a (task, machine) pair for the global-greedy efficiency strategy.
///
/// Base 100, changeover cost subtracted at double weight, scaled up by
/// priority and damped by the machine's current running-task count. Returns
/// `None` for incompatible pairs.
pub fn efficiency_score(
    task: &Task,
    check: &MaterialCheckResult,
    running_on_machine: usize,
) -> Option<f64> {
    if !check.compatible {
        return None;
    }

    let mut efficiency = 100.0;
    if check.requires_change {
        efficiency -= f64::from(check.change_cost) * 2.0;
    }

    efficiency *= match task.priority {
        TaskPriority::Urgent => 1.5,
        TaskPriority::High => 1.2,
        TaskPriority::Normal => 1.0,
    };

    Some(efficiency / (1.0 + 0.1 * running_on_machine as f64))
}
