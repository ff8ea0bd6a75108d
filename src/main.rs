use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use grid_traffic::simulation::{Grid, RoadNetwork, StaticHost, TrafficConfig, TrafficStepper};

#[derive(Parser)]
#[command(name = "grid_traffic")]
#[command(about = "Headless grid traffic simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "1200")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.016666668")]
    delta: f32,

    /// Seed for a reproducible run (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Text map to load instead of the built-in demo city
    #[arg(long)]
    map: Option<PathBuf>,

    /// World units per grid cell
    #[arg(long, default_value = "32")]
    tile_size: f32,

    /// Maximum number of live vehicles
    #[arg(long)]
    max_vehicles: Option<usize>,

    /// Seconds between spawn attempts
    #[arg(long)]
    spawn_interval: Option<f32>,

    /// Base vehicle speed in world units per second
    #[arg(long)]
    base_speed: Option<f32>,

    /// Only print the final summary
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    run_headless(&cli)
}

fn load_grid(cli: &Cli) -> Result<Grid> {
    match &cli.map {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read map {}", path.display()))?;
            Grid::from_ascii(&text, cli.tile_size)
                .with_context(|| format!("Failed to parse map {}", path.display()))
        }
        None => Grid::demo_city(cli.tile_size),
    }
}

fn build_config(cli: &Cli) -> TrafficConfig {
    let mut config = TrafficConfig::default();
    if let Some(max_vehicles) = cli.max_vehicles {
        config.max_vehicles = max_vehicles;
    }
    if let Some(spawn_interval) = cli.spawn_interval {
        config.spawn_interval = spawn_interval;
    }
    if let Some(base_speed) = cli.base_speed {
        config.base_speed = base_speed;
    }
    config
}

/// Run the simulation without graphics, printing the map once per simulated
/// second
fn run_headless(cli: &Cli) -> Result<()> {
    if cli.delta <= 0.0 || !cli.delta.is_finite() {
        anyhow::bail!("--delta must be a positive number of seconds");
    }

    let grid = load_grid(cli)?;
    let network = RoadNetwork::new(grid);
    let host = StaticHost::centered(network.world_size());
    let config = build_config(cli);

    let mut stepper = match cli.seed {
        Some(seed) => TrafficStepper::with_seed(network, config, seed)?,
        None => TrafficStepper::from_entropy(network, config)?,
    };

    info!(
        "Running grid traffic headless: {} ticks of {}s",
        cli.ticks, cli.delta
    );

    let ticks_per_second = (1.0 / cli.delta).ceil().max(1.0) as u32;
    if !cli.quiet {
        println!("{}", stepper.render_ascii());
    }

    let mut tick = 0;
    while tick < cli.ticks {
        let ticks_to_run = ticks_per_second.min(cli.ticks - tick);
        for _ in 0..ticks_to_run {
            tick += 1;
            stepper.update(cli.delta, &host);
        }

        if !cli.quiet {
            println!(
                "--- After tick {} ({:.1}s simulated time) ---",
                tick,
                tick as f32 * cli.delta
            );
            println!("{}", stepper.render_ascii());
        }
    }

    for line in stepper.summary().lines() {
        info!("{}", line);
    }
    info!("=== SIMULATION COMPLETE ===");

    stepper.shutdown();
    Ok(())
}
