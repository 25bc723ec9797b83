use simulation::{run_simulation, SimulationConfigBuilder, SimulationStats};
use tracing_subscriber::EnvFilter;
pub mod simulation;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let rt = tokio::runtime::Runtime::new().unwrap();
    let converged = rt.block_on(async_main());
    if !converged {
        std::process::exit(1);
    }
}

async fn async_main() -> bool {
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            CONVERGENCE SIMULATIONS                         ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let configs = vec![
        // Two users, plain typing
        SimulationConfigBuilder::new().clients(2).edits(200).seed(1).undo_probability(0.0).build(),
        // Small group with undo
        SimulationConfigBuilder::new().clients(4).edits(500).seed(2).build(),
        // Undo-heavy session
        SimulationConfigBuilder::new().clients(4).edits(500).seed(3).undo_probability(0.35).build(),
        // Large group, slow delivery
        SimulationConfigBuilder::new()
            .clients(10)
            .edits(2000)
            .seed(4)
            .delivery_probability(0.2)
            .build(),
    ];

    // Sessions are independent; run them side by side.
    let handles = configs.into_iter().map(|config| {
        tokio::task::spawn_blocking(move || run_simulation(&config))
    });
    let results = futures::future::join_all(handles).await;

    let mut all_converged = true;
    let mut stats: Vec<SimulationStats> = Vec::new();
    for result in results {
        match result {
            Ok(run) => stats.push(run),
            Err(err) => {
                eprintln!("simulation task failed: {err}");
                all_converged = false;
            }
        }
    }

    for run in &stats {
        run.print();
        all_converged &= run.converged();
    }

    if all_converged {
        println!("\n✓ All replicas converged!");
    } else {
        println!("\n✗ Divergence detected");
    }
    all_converged
}
