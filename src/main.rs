use clap::Parser;
use stress_test::{stress_test_editing, stress_test_scaling, StressTestStats};
use tracing_subscriber::EnvFilter;

/// Concurrent editing stress test for the otext engine
#[derive(Parser, Debug)]
#[command(name = "otext", version, about)]
struct Args {
    /// Number of collaborators in the main runs
    #[arg(short, long, default_value_t = 4)]
    clients: usize,

    /// Edits made by each collaborator
    #[arg(short, long, default_value_t = 200)]
    edits: usize,

    /// Seed for the edit schedules
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Largest client count in the scaling analysis (0 skips it)
    #[arg(long, default_value_t = 12)]
    scaling: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(async_main(args)) {
        eprintln!("\n✗ Stress test failed: {}", e);
        std::process::exit(1);
    }
}

async fn async_main(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            ASYNC STRESS TESTS                               ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut runs: Vec<StressTestStats> = Vec::new();

    // Test 1: the configured scale
    let stats = stress_test_editing(args.clients, args.edits, args.seed).await?;
    stats.print();
    runs.push(stats);

    // Test 2: many clients, fewer edits each
    let stats = stress_test_editing(args.clients * 4, args.edits / 4 + 1, args.seed + 1).await?;
    stats.print();
    runs.push(stats);

    // Test 3: scaling analysis
    if args.scaling > 0 {
        runs.extend(stress_test_scaling(args.scaling, 2, args.seed).await?);
    }

    let diverged = runs.iter().filter(|stats| !stats.converged).count();
    if diverged > 0 {
        return Err(format!("{} run(s) diverged", diverged).into());
    }

    println!("\n✓ All stress tests completed and converged!");
    Ok(())
}
