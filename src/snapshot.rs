//! World snapshots persisted as JSON
//!
//! A snapshot stores every entity's type tag and saved bundle so the scene can be
//! rebuilt from prefabs on the next run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ember_core::{Bundle, EntityId};
use ember_entity::World;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scene;

/// Current snapshot format version
const SNAPSHOT_VERSION: u32 = 1;

/// Top-level snapshot structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format version (for future migration)
    pub version: u32,
    /// Frames simulated when the snapshot was taken
    pub frame: u32,
    /// Saved entities
    pub entities: Vec<EntitySnapshot>,
}

/// Saved state of one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub entity_type: String,
    pub bundle: Bundle,
}

impl Snapshot {
    /// Save every entity currently in the world.
    pub fn capture(world: &World, frame: u32) -> Result<Self> {
        let mut entities = Vec::new();
        for entity in world.entities() {
            let mut bundle = Bundle::new(entity.id().to_string());
            entity
                .save(&mut bundle)
                .with_context(|| format!("Failed to save entity {}", entity.id()))?;
            entities.push(EntitySnapshot {
                id: entity.id(),
                entity_type: entity.entity_type().to_string(),
                bundle,
            });
        }
        Ok(Self {
            version: SNAPSHOT_VERSION,
            frame,
            entities,
        })
    }

    /// Rebuild entities from prefabs and load their saved state into `world`.
    pub fn restore(&self, world: &mut World) -> Result<usize> {
        for saved in &self.entities {
            let mut entity = scene::prefab(&saved.entity_type)?;
            entity.load(&saved.bundle);
            let id = world.add_entity(entity)?;
            debug!("Restored {} {} as {}", saved.entity_type, saved.id, id);
        }
        Ok(self.entities.len())
    }
}

/// Get the snapshot file path, creating its directory if needed
pub fn snapshot_path() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ember");
    fs::create_dir_all(&dir).context("Failed to create snapshot directory")?;
    Ok(dir.join("snapshot.json"))
}

pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;
    fs::write(path, json).context("Failed to write snapshot file")?;
    info!(
        "Wrote snapshot of {} entities to {:?}",
        snapshot.entities.len(),
        path
    );
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let json = fs::read_to_string(path).context("Failed to read snapshot file")?;
    let snapshot: Snapshot = serde_json::from_str(&json).context("Failed to parse snapshot")?;
    if snapshot.version > SNAPSHOT_VERSION {
        anyhow::bail!(
            "Snapshot version {} is newer than supported version {}",
            snapshot.version,
            SNAPSHOT_VERSION
        );
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::DVec2;
    use ember_entity::controls::CircularMovementControl;

    #[test]
    fn capture_and_restore() {
        let mut world = World::new();
        let mut orbiter = scene::prefab(scene::ORBITER).unwrap();
        orbiter.set_position(DVec2::new(100.0, 50.0));
        world.add_entity(orbiter).unwrap();
        world.update(0.5);

        let snapshot = Snapshot::capture(&world, 1).unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        let snapshot: Snapshot = serde_json::from_str(&json).unwrap();

        let mut restored = World::new();
        assert_eq!(snapshot.restore(&mut restored).unwrap(), 1);

        let before = world.entities().next().unwrap();
        let after = restored.entities().next().unwrap();
        assert!((after.position() - before.position()).length() < 1e-9);
        assert!(after.is_type(scene::ORBITER));
        let angle = |e: &ember_entity::Entity| {
            e.get_control::<CircularMovementControl>().unwrap().angle()
        };
        assert!((angle(after) - angle(before)).abs() < 1e-9);
    }

    #[test]
    fn file_round_trip() {
        let path = std::env::temp_dir().join(format!("ember-snapshot-{}.json", EntityId::new()));
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            frame: 3,
            entities: Vec::new(),
        };
        write_snapshot(&path, &snapshot).unwrap();
        let loaded = read_snapshot(&path).unwrap();
        assert_eq!(loaded.frame, 3);
        fs::remove_file(&path).unwrap();
    }
}
