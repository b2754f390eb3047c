use std::path::PathBuf;

use anyhow::Context;
use antwar::config::SimulationConfig;
use antwar::persistence;
use antwar::simulation::Simulation;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the headless runner.
#[derive(Parser)]
#[command(name = "antwar", version, about = "Ant colony stigmergy simulation")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames to run. Each frame runs `speed` ticks.
    #[arg(short, long, default_value_t = 10_000)]
    frames: u64,

    /// Overrides the configured RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Snapshot to start from instead of a generated garden.
    #[arg(long)]
    load: Option<PathBuf>,

    /// Where to write a snapshot once the run ends.
    #[arg(long)]
    save: Option<PathBuf>,

    /// Log a colony report every this many frames, 0 disables reports.
    #[arg(long, default_value_t = 1_000)]
    report_every: u64,
}

/// Loads the simulation configuration from a TOML file or uses defaults.
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SimulationConfig> {
    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            let config: SimulationConfig = toml::from_str(&content)
                .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
            tracing::info!(path = %path.display(), "loaded config");
            config
        }
        None => {
            tracing::info!("no config file provided, using defaults");
            SimulationConfig::default()
        }
    };
    config.validate().context("invalid configuration")?;
    tracing::debug!(?config, "effective configuration");
    Ok(config)
}

fn report(sim: &Simulation) {
    for colony in sim.garden.colonies() {
        let stats = &colony.stats;
        tracing::info!(
            tick = sim.total_ticks,
            colony = %colony.id,
            food = stats.food,
            living = stats.living_ants,
            workers = stats.workers,
            soldiers = stats.soldiers,
            starved = stats.starved_ants,
            killed = stats.killed_ants,
            war = colony.war_coefficient,
            "colony report"
        );
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let mut sim = Simulation::new(&config).context("failed to set up the garden")?;
    if let Some(path) = &cli.load {
        let snapshot = persistence::load_snapshot(path)
            .with_context(|| format!("failed to read snapshot '{}'", path.display()))?;
        sim.load(&snapshot)
            .with_context(|| format!("snapshot '{}' is unusable", path.display()))?;
    }

    for frame in 1..=cli.frames {
        sim.update();
        if cli.report_every > 0 && frame % cli.report_every == 0 {
            report(&sim);
        }
    }
    tracing::info!(
        ticks = sim.total_ticks,
        ants = sim.total_ant_count(),
        corpses = sim.garden.corpses.len(),
        "run finished"
    );

    if let Some(path) = &cli.save {
        persistence::save_snapshot(path, &sim.dump())
            .with_context(|| format!("failed to save snapshot '{}'", path.display()))?;
    }
    Ok(())
}
