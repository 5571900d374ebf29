use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec3;
use runway_kernel::World;
use runway_stream::{AgentSignal, DeathZone, SegmentCatalog, StreamConfig, StreamingWindow};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "runway-cli", about = "CLI tool for the runway segment streamer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Drive a kinematic runner through the window for a number of fixed steps
    Simulate {
        /// Number of fixed simulation steps
        #[arg(short, long, default_value = "3000")]
        ticks: u64,
        /// Placement RNG seed (overrides the config file)
        #[arg(short, long)]
        seed: Option<u64>,
        /// YAML stream config
        #[arg(long)]
        config: Option<PathBuf>,
        /// YAML segment catalog
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Restart the run every N steps (0 = never)
        #[arg(long, default_value = "0")]
        reset_every: u64,
        /// Write the final window layout as JSON
        #[arg(long)]
        dump: Option<PathBuf>,
    },
    /// Load a config and catalog and report whether the window can start
    Validate {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

/// Fixed step in seconds.
const DT: f32 = 0.02;
const INITIAL_SPEED: f32 = 5.0;
const ACCELERATION: f32 = 0.5;
const MAX_SPEED: f32 = 50.0;
/// Boundary distance below the lowest fresh segment.
const DEATH_ZONE_OFFSET: i32 = 5;
/// How quickly the runner steers toward the next segment's X.
const STEER: f32 = 0.2;

type Window = StreamingWindow<Option<AgentSignal>, DeathZone>;

#[derive(Serialize)]
struct SlotRecord {
    index: usize,
    kind: String,
    position: [f32; 3],
    spawn_tick: u64,
    /// Steps since the segment was spawned.
    age: u64,
}

#[derive(Serialize)]
struct Dump {
    tick: u64,
    tail: [f32; 3],
    death_zone: Option<i32>,
    slots: Vec<SlotRecord>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Info => {
            println!("runway-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("stream: {}", runway_stream::crate_info());
            let catalog = SegmentCatalog::builtin();
            println!("builtin catalog ({} kinds):", catalog.len());
            for d in catalog.descriptors() {
                println!(
                    "  {:<20} {} x {} x {}",
                    d.id.as_str(),
                    d.width(),
                    d.height(),
                    d.length()
                );
            }
        }
        Commands::Simulate {
            ticks,
            seed,
            config,
            catalog,
            reset_every,
            dump,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            let catalog = load_catalog(catalog.as_deref())?;
            simulate(config, catalog, ticks, reset_every, dump.as_deref())?;
        }
        Commands::Validate { config, catalog } => {
            let config = load_config(config.as_deref())?;
            let catalog = load_catalog(catalog.as_deref())?;
            let kinds = catalog.len();
            let starter = catalog.starter().id.clone();
            StreamingWindow::new(config, catalog, None::<AgentSignal>, ())
                .context("window refused to start")?;
            println!("OK: {kinds} segment kinds, starter '{starter}'");
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<StreamConfig> {
    match path {
        Some(p) => StreamConfig::load(p).with_context(|| format!("loading config {}", p.display())),
        None => Ok(StreamConfig::default()),
    }
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<SegmentCatalog> {
    match path {
        Some(p) => {
            SegmentCatalog::load(p).with_context(|| format!("loading catalog {}", p.display()))
        }
        None => Ok(SegmentCatalog::builtin()),
    }
}

fn simulate(
    config: StreamConfig,
    catalog: SegmentCatalog,
    ticks: u64,
    reset_every: u64,
    dump: Option<&Path>,
) -> anyhow::Result<()> {
    let start = AgentSignal::moving(Vec3::new(0.0, 1.0, 0.0), INITIAL_SPEED);
    let mut world = World::new();
    let mut window: Window =
        StreamingWindow::new(config, catalog, Some(start), DeathZone::new(DEATH_ZONE_OFFSET))?;
    window.reset(&mut world)?;

    let mut agent = start;
    let mut runs = 1u64;
    for step in 1..=ticks {
        if reset_every > 0 && step % reset_every == 0 {
            agent = start;
            *window.agent_mut() = Some(agent);
            window.reset(&mut world)?;
            runs += 1;
        }

        agent = advance_runner(agent, &window);
        *window.agent_mut() = Some(agent);
        world.step();
        let report = window.tick(&mut world);

        if window.is_ready() && window.boundary().has_fallen(agent.position.y) {
            tracing::info!(step, z = agent.position.z, "runner fell; restarting");
            agent = start;
            *window.agent_mut() = Some(agent);
            window.reset(&mut world)?;
            runs += 1;
        }

        if report.admitted {
            tracing::debug!(
                step,
                spawned = report.spawned,
                active = window.active_count(),
                "batch admitted"
            );
        }
        if step % 500 == 0 {
            let e = window.envelope();
            tracing::info!(
                step,
                z = agent.position.z,
                speed = agent.speed,
                active = window.active_count(),
                min_gap = e.min_gap,
                max_gap = e.max_gap,
                "progress"
            );
        }
    }

    let stats = window.stats();
    println!(
        "Simulated {ticks} steps over {runs} run(s): spawned={} retired={} batches={} active={} pooled={}",
        stats.spawned_total,
        stats.retired_total,
        stats.batches,
        stats.active,
        window.pooled_count()
    );
    println!(
        "Tail: {:?}, death zone: {:?}, degenerate envelopes: {}",
        window.tail_position(),
        window.boundary().boundary(),
        stats.degenerate_envelopes
    );
    println!(
        "World: tick={} entities={} hash={:#x}",
        world.tick(),
        world.entity_count(),
        world.state_hash()
    );

    if let Some(path) = dump {
        let now = world.tick();
        let record = Dump {
            tick: now,
            tail: window.tail_position().to_array(),
            death_zone: window.boundary().boundary(),
            slots: window
                .slots()
                .iter()
                .map(|s| SlotRecord {
                    index: s.index(),
                    kind: s.descriptor().map(|d| d.to_string()).unwrap_or_default(),
                    position: s.position().to_array(),
                    spawn_tick: s.spawn_tick(),
                    age: s.age(now),
                })
                .collect(),
        };
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating dump {}", path.display()))?;
        serde_json::to_writer_pretty(file, &record)?;
        println!("Layout written to {}", path.display());
    }

    Ok(())
}

/// Move the runner one fixed step: accelerate forward, steer toward the next
/// segment, and ride on top of it.
fn advance_runner(mut agent: AgentSignal, window: &Window) -> AgentSignal {
    agent.speed = (agent.speed + ACCELERATION * DT).min(MAX_SPEED);
    agent.acceleration = if agent.speed < MAX_SPEED { ACCELERATION } else { 0.0 };
    agent.position.z += agent.speed * DT;

    let ahead = window
        .slots()
        .iter()
        .find(|s| s.position().z >= agent.position.z);
    if let Some(slot) = ahead {
        let target = slot.position();
        agent.position.x += (target.x - agent.position.x) * STEER;
        agent.position.y = target.y + 1.0;
    }
    agent
}
