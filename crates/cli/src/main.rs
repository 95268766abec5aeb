//! ProdMan CLI - production work-order scheduling over a machine fleet.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use prodman_core::{Task, TaskId, TaskPriority};
use prodman_engine::{
    EngineRunner, ProdmanConfig, SchedulerService, StaticStatusProvider, StatusProvider,
};
use prodman_material::{JsonMaterialStore, MaterialCatalog, MaterialEngine, MaterialStore};
use prodman_scheduler::SchedulerCore;

#[derive(Parser)]
#[command(name = "prodman")]
#[command(about = "Production work-order scheduling over a machine fleet", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "prodman.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduling loop until Ctrl-C
    Run,
    /// Queue a task and run a scheduling pass
    Add {
        /// Work instruction reference
        instruction: String,
        /// Product model
        model: String,
        /// Required material code
        material: String,
        /// Ordered quantity
        quantity: u32,
        /// Priority (Normal/High/Urgent)
        #[arg(long, default_value = "Normal")]
        priority: String,
        /// Estimated minutes of processing
        #[arg(long, default_value = "0")]
        duration: u32,
        /// NC program name
        #[arg(long)]
        program: Option<String>,
    },
    /// List the task queues
    List,
    /// Show the machine fleet
    Machines,
    /// Show the material stock report
    Materials,
    /// Show scheduler statistics
    Stats,
    /// Write a default configuration file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    if let Commands::InitConfig = cli.command {
        ProdmanConfig::default().save(&cli.config)?;
        println!("Wrote default configuration: {}", cli.config.display());
        return Ok(());
    }

    let config = ProdmanConfig::load(&cli.config)?;
    let service = build_service(&config).await?;

    match cli.command {
        Commands::Run => {
            let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
            let runner = EngineRunner::new(
                service.clone(),
                Duration::from_secs(config.check_interval_secs),
            );
            let loop_handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

            println!("Scheduling loop running. Press Ctrl-C to stop.");
            tokio::signal::ctrl_c().await?;
            shutdown_tx.send(true)?;
            loop_handle.await?;

            let stats = service.statistics().await;
            println!(
                "Stopped. pending={} running={} completed={}",
                stats.pending, stats.running, stats.completed
            );
        }
        Commands::Add {
            instruction,
            model,
            material,
            quantity,
            priority,
            duration,
            program,
        } => {
            let priority: TaskPriority = priority
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid priority: {e}"))?;
            let mut task = Task::new(TaskId::generate(), instruction, model, material, quantity)
                .with_priority(priority)
                .with_estimated_duration(duration);
            if let Some(program) = program {
                task = task.with_program(program);
            }
            let id = task.id.clone();

            let assignments = service.add_task(task).await?;
            println!("Queued task: {id}");
            for assignment in &assignments {
                println!(
                    "  assigned to {} (changeover {} min, score {:.1})",
                    assignment.machine_id, assignment.change_cost, assignment.score
                );
            }
            if assignments.is_empty() {
                println!("  no machine available yet, task stays pending");
            }
        }
        Commands::List => {
            let queues = service.task_queues().await;
            println!("Pending ({})", queues.pending.len());
            for task in &queues.pending {
                println!("  {} | {} | {} x{}", task.id, task.priority, task.material_spec, task.order_quantity);
            }
            println!("Running ({})", queues.running.len());
            for task in &queues.running {
                let machine = task
                    .assigned_machine
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_default();
                println!("  {} | {} | on {}", task.id, task.status, machine);
            }
            println!("Waiting approval ({})", queues.waiting_approval.len());
            for task in &queues.waiting_approval {
                println!("  {} | {}", task.id, task.material_spec);
            }
            println!("Completed ({})", queues.completed.len());
            for task in &queues.completed {
                println!("  {} | {} | {:.0}%", task.id, task.status, task.progress_percent());
            }
        }
        Commands::Machines => {
            let machines = service.machines().await;
            let available = service.list_available_machines().await;
            println!("Machines ({})", machines.len());
            for machine in &machines {
                let marker = if available.contains(&machine.machine_id) {
                    "available"
                } else {
                    "busy"
                };
                println!(
                    "  {} | {} | {} | material {}",
                    machine.machine_id, machine.status, marker, machine.current_material
                );
            }
        }
        Commands::Materials => {
            let report = service.stock_report().await;
            println!(
                "Materials: {} records, total stock {}",
                report.total_materials, report.total_stock
            );
            println!(
                "  low: {}  critical: {}  out of stock: {}",
                report.low_stock_count, report.critical_stock_count, report.out_of_stock_count
            );
            for entry in service.low_stock_materials().await {
                println!("  {} ({}) stock {} [{:?}]", entry.code, entry.name, entry.stock, entry.level);
            }
        }
        Commands::Stats => {
            let stats = service.statistics().await;
            println!("Tasks: pending={} running={} completed={} waiting={} total={}",
                stats.pending, stats.running, stats.completed, stats.waiting_approval, stats.total);
            for (machine, share) in service.machine_utilization().await {
                println!("  {machine}: {share:.1}% of placed work");
            }
        }
        Commands::InitConfig => unreachable!(),
    }

    Ok(())
}

/// Wire config -> store -> catalog -> scheduler -> service, then seed the
/// fleet and any configured sample tasks.
async fn build_service(config: &ProdmanConfig) -> Result<SchedulerService> {
    let store = JsonMaterialStore::new(&config.material_store_path).await?;
    let records = store.load_all().await?;
    let catalog = MaterialCatalog::new(records);
    let material = MaterialEngine::new(catalog)
        .with_policy(config.stock_policy)
        .with_thresholds(config.stock_thresholds);

    let core = SchedulerCore::new(material)
        .with_strategy(config.strategy)
        .with_approval_policy(config.approval_policy.build())
        .with_max_retries(config.max_retries);

    let service = SchedulerService::new(core).with_schedule_on_event(config.schedule_on_event);

    let mut provider = StaticStatusProvider::new(config.machines.clone());
    for state in provider.snapshot().await {
        service.update_machine(state).await;
    }
    info!(machines = config.machines.len(), "fleet seeded");

    for seed in &config.sample_tasks {
        let id = seed
            .id
            .clone()
            .map(TaskId::from)
            .unwrap_or_else(TaskId::generate);
        let mut task = Task::new(
            id,
            seed.instruction_id.clone(),
            seed.product_model.clone(),
            seed.material_spec.clone(),
            seed.order_quantity,
        )
        .with_priority(seed.priority())
        .with_estimated_duration(seed.estimated_duration);
        if let Some(program) = &seed.program_name {
            task = task.with_program(program.clone());
        }
        service.add_task(task).await?;
    }

    Ok(service)
}
