use anyhow::{Context, Result};
use clap::Parser;
use ecosphere_core::{SimConfig, SimError, World, WorldSnapshot};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

mod server;

#[derive(Parser, Debug)]
#[command(author, version, about = "Ecosphere: a deterministic evolutionary ecosystem simulation")]
struct Args {
    /// World width in world units
    #[arg(long)]
    width: Option<u16>,

    /// World height in world units
    #[arg(long)]
    height: Option<u16>,

    /// Master random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Initial entity population
    #[arg(long)]
    entities: Option<usize>,

    /// Initial plant population
    #[arg(long)]
    plants: Option<usize>,

    /// Ticks to simulate (0 = run until cancelled)
    #[arg(long, default_value_t = 1000)]
    ticks: u64,

    /// Custom config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Resume from a saved snapshot
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write a final snapshot here on exit
    #[arg(long)]
    save: Option<PathBuf>,

    /// Autosave interval in ticks (0 = off; requires --save)
    #[arg(long, default_value_t = 0)]
    autosave: u64,

    /// Serve the latest snapshot over HTTP on this port
    #[arg(long)]
    serve: Option<u16>,

    /// Directory for run artifacts (events.jsonl); disabled when unset
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn build_config(args: &Args) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            SimConfig::from_toml(&content)?
        }
        None => SimConfig::default(),
    };

    if let Some(width) = args.width {
        config.world.width = width;
    }
    if let Some(height) = args.height {
        config.world.height = height;
    }
    if let Some(seed) = args.seed {
        config.world.seed = seed;
    }
    if let Some(entities) = args.entities {
        config.world.initial_entities = entities;
    }
    if let Some(plants) = args.plants {
        config.world.initial_plants = plants;
    }
    config.validate()?;
    Ok(config)
}

struct RunArtifacts {
    events_file: std::io::BufWriter<std::fs::File>,
    written_through: u64,
}

impl RunArtifacts {
    fn new(dir: &PathBuf) -> Result<Self> {
        let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        let run_dir = dir.join(format!("run-{stamp}"));
        std::fs::create_dir_all(&run_dir)?;
        let file = std::fs::File::create(run_dir.join("events.jsonl"))?;
        tracing::info!("run artifacts in {}", run_dir.display());
        Ok(Self {
            events_file: std::io::BufWriter::new(file),
            written_through: 0,
        })
    }

    fn append_tick(&mut self, world: &World) -> Result<()> {
        let tick = world.clock.tick;
        for event in world.events.in_range(self.written_through + 1, tick + 1) {
            writeln!(self.events_file, "{}", serde_json::to_string(&event)?)?;
        }
        self.events_file.flush()?;
        self.written_through = tick;
        Ok(())
    }
}

fn run_simulation(
    mut world: World,
    args: &Args,
    cancel: Arc<AtomicBool>,
    snapshot_tx: Option<watch::Sender<Arc<String>>>,
) -> Result<World, SimError> {
    let mut artifacts = match &args.log_dir {
        Some(dir) => match RunArtifacts::new(dir) {
            Ok(a) => Some(a),
            Err(e) => {
                tracing::warn!(error = %e, "disabling run artifacts");
                None
            }
        },
        None => None,
    };

    let target = if args.ticks == 0 { u64::MAX } else { world.clock.tick + args.ticks };
    let publish_interval = 10u64;

    while world.clock.tick < target {
        // A set cancellation flag lets the current tick finish cleanly.
        if cancel.load(Ordering::Relaxed) {
            tracing::info!("cancellation requested; stopping after a clean tick");
            break;
        }

        if let Err(e) = world.step() {
            // An invariant violation dumps a crash snapshot before aborting.
            if matches!(e, SimError::Invariant(_)) {
                if let Some(path) = &args.save {
                    let dump = path.with_extension("crash.json");
                    if world.snapshot().save(&dump).is_ok() {
                        tracing::error!("crash snapshot dumped to {}", dump.display());
                    }
                }
            }
            return Err(e);
        }

        if let Some(artifacts) = &mut artifacts {
            if let Err(e) = artifacts.append_tick(&world) {
                tracing::warn!(error = %e, "event log write failed; disabling");
            }
        }

        if let Some(tx) = &snapshot_tx {
            if world.clock.tick % publish_interval == 0 {
                match world.snapshot().to_json() {
                    Ok(json) => {
                        let _ = tx.send_replace(Arc::new(json));
                    }
                    Err(e) => tracing::warn!(error = %e, "snapshot encoding failed"),
                }
            }
        }

        if args.autosave > 0 && world.clock.tick % args.autosave == 0 {
            if let Some(path) = &args.save {
                if let Err(e) = world.snapshot().save(path) {
                    tracing::warn!(error = %e, "autosave failed");
                }
            }
        }

        if world.clock.tick % 500 == 0 {
            tracing::info!(
                tick = world.clock.tick,
                entities = world.live_entity_count(),
                plants = world.live_plant_count(),
                species = world.species.records.len(),
                colonies = world.colonies.len(),
                "progress"
            );
        }
    }
    Ok(world)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ecosphere=info")),
        )
        .init();

    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::from(1);
        }
    };

    let world = match &args.load {
        Some(path) => WorldSnapshot::load(path).and_then(World::from_snapshot),
        None => World::new_seeded(config).map_err(|e| SimError::Config(e.to_string())),
    };
    let world = match world {
        Ok(w) => w,
        Err(e) => {
            tracing::error!(error = %e, "failed to build world");
            return ExitCode::from(1);
        }
    };

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let snapshot_tx = if let Some(port) = args.serve {
        let (tx, rx) = watch::channel(Arc::new(String::new()));
        tokio::spawn(async move {
            if let Err(e) = server::serve(port, rx).await {
                tracing::error!(error = %e, "snapshot publisher failed");
            }
        });
        Some(tx)
    } else {
        None
    };

    let sim = {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let result = run_simulation(world, &args, cancel, snapshot_tx);
            (args, result)
        })
    };

    let (args, result) = match sim.await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "simulation task panicked");
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(world) => {
            if let Some(path) = &args.save {
                if let Err(e) = world.snapshot().save(path) {
                    tracing::error!(error = %e, "failed to write final snapshot");
                    return ExitCode::from(1);
                }
                tracing::info!("snapshot written to {}", path.display());
            }
            tracing::info!(
                tick = world.clock.tick,
                entities = world.live_entity_count(),
                "clean shutdown"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "fatal simulation error");
            match e {
                SimError::Invariant(_) => ExitCode::from(2),
                _ => ExitCode::from(1),
            }
        }
    }
}
