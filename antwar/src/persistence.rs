// Snapshot files: rkyv archive of a StoredSimulation with run-length encoded terrain.
use std::path::Path;

use rkyv::rancor::Error as RkyvError;
use rkyv::util::AlignedVec;
use rkyv::{from_bytes, to_bytes};
use shared::{
    RunLengthError, SimulationSnapshot, StoredSimulation, compress_field, decompress_field,
};
use thiserror::Error;

use crate::simulation::{FIELD_CELL_SIZE, Grid};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot archive is invalid: {0}")]
    Archive(#[from] RkyvError),
    #[error("{field} field is corrupt: {source}")]
    Field {
        field: &'static str,
        source: RunLengthError,
    },
}

pub fn encode(snapshot: &SimulationSnapshot) -> Result<AlignedVec, PersistenceError> {
    let stored = StoredSimulation {
        width: snapshot.width,
        height: snapshot.height,
        food_field: compress_field(&snapshot.food_field),
        rock_field: compress_field(&snapshot.rock_field),
        colonies: snapshot.colonies.clone(),
    };
    Ok(to_bytes::<RkyvError>(&stored)?)
}

/// Decodes and expands a snapshot. Field lengths are checked against the
/// grid the stored garden size implies.
pub fn decode(bytes: &[u8]) -> Result<SimulationSnapshot, PersistenceError> {
    let mut aligned = AlignedVec::<16>::with_capacity(bytes.len());
    aligned.extend_from_slice(bytes);
    let stored = from_bytes::<StoredSimulation, RkyvError>(&aligned)?;

    let expected = Grid::covering(stored.width as f32, stored.height as f32, FIELD_CELL_SIZE).len();
    let food_field = decompress_field(&stored.food_field, expected)
        .map_err(|source| PersistenceError::Field { field: "food", source })?;
    let rock_field = decompress_field(&stored.rock_field, expected)
        .map_err(|source| PersistenceError::Field { field: "rock", source })?;

    Ok(SimulationSnapshot {
        width: stored.width,
        height: stored.height,
        food_field,
        rock_field,
        colonies: stored.colonies,
    })
}

pub fn save_snapshot(path: &Path, snapshot: &SimulationSnapshot) -> Result<(), PersistenceError> {
    let bytes = encode(snapshot)?;
    std::fs::write(path, &bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "snapshot saved");
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<SimulationSnapshot, PersistenceError> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Garden;
    use glam::Vec2;

    #[test]
    fn garden_snapshot_survives_the_archive() {
        let mut garden = Garden::new(400.0, 300.0, 3);
        garden.paint_rock(200.0, 150.0, 7, 1.0);
        garden.paint_food(50.0, 50.0, 5, 8.0);
        garden.place_colony(Vec2::new(350.0, 250.0), 10, 100).unwrap();
        let snapshot = garden.dump();

        let bytes = encode(&snapshot).unwrap();
        assert_eq!(decode(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn mismatched_field_size_is_reported() {
        let garden = Garden::new(400.0, 300.0, 3);
        let mut snapshot = garden.dump();
        snapshot.width = 500;
        let bytes = encode(&snapshot).unwrap();
        assert!(matches!(
            decode(&bytes),
            Err(PersistenceError::Field { field: "food", .. })
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode(&[1, 2, 3]).is_err());
    }
}
