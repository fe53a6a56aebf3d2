//! Ember - headless entity simulation
//!
//! Spawns a small scene of controlled entities, runs it at a fixed tick rate and
//! optionally persists the world between runs.

mod scene;
mod settings;
mod snapshot;

use std::sync::Arc;

use anyhow::{Context, Result};
use ember_entity::World;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use scene::SceneStats;
use settings::SimulationSettings;
use snapshot::Snapshot;

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    info!("Starting Ember simulation...");

    let settings = SimulationSettings::load();
    if !SimulationSettings::file_exists() {
        if let Err(e) = settings.save() {
            warn!("Failed to write default settings: {}", e);
        }
    }

    let stats = Arc::new(Mutex::new(SceneStats::default()));
    let mut world = World::new();
    world.add_listener(&stats);

    let snapshot_path = snapshot::snapshot_path()?;
    let mut restored = false;
    if settings.snapshot && snapshot_path.exists() {
        let result = snapshot::read_snapshot(&snapshot_path)
            .and_then(|s| s.restore(&mut world).map(|count| (count, s.frame)));
        match result {
            Ok((count, frame)) => {
                info!(
                    "Restored {} entities (frame {}) from {:?}",
                    count, frame, snapshot_path
                );
                restored = true;
            }
            Err(e) => warn!("Failed to restore snapshot, spawning a fresh scene: {:#}", e),
        }
    }
    if !restored {
        scene::spawn(&mut world, settings.entity_count, settings.seed)?;
        info!("Spawned {} entities", world.len());
    }

    let tpf = settings.tpf();
    for frame in 0..settings.frames {
        world.update(tpf);
        if frame % settings.tick_rate.max(1.0) as u32 == 0 {
            debug!("Frame {}: {} entities", frame, world.len());
        }
    }

    {
        let stats = stats.lock();
        info!(
            "Simulated {} frames ({:.1}s): {} spawned, {} despawned, {} remaining",
            settings.frames,
            settings.frames as f64 * tpf,
            stats.spawned,
            stats.despawned,
            world.len()
        );
    }

    if settings.snapshot {
        let snapshot = Snapshot::capture(&world, settings.frames)?;
        snapshot::write_snapshot(&snapshot_path, &snapshot)?;
    }

    Ok(())
}
