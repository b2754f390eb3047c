use rkyv::{Archive, Deserialize, Serialize};
use std::fmt;

/// Hard ceiling on simultaneously live colonies, one per occupancy bit.
pub const MAX_COLONIES: usize = 31;

#[derive(Archive, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(C)]
pub struct ColonyId(pub u32);

impl fmt::Display for ColonyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Archive, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AntKind {
    Worker,
    Soldier,
}

/// Requests a controller can queue between ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pause,
    Resume,
    SetSpeed(f32),
    SetFreedom { colony: ColonyId, freedom: f32 },
    SetAggressiveness { colony: ColonyId, aggressiveness: f32 },
    AddAnts { colony: ColonyId, kind: AntKind, count: u32 },
    KillAnts { colony: ColonyId, kind: AntKind, count: u32 },
    /// `position: None` picks a spot the same way generated gardens do.
    PlaceColony { position: Option<(f32, f32)>, ants: u32 },
    RemoveColony { colony: ColonyId },
    PaintFood { x: f32, y: f32, diameter: u32, value: f32 },
    PaintRock { x: f32, y: f32, diameter: u32, value: f32 },
    ClearTerrain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    ColonyPlaced(ColonyId),
}

/// One `value` repeated `count` times in a row-major field buffer.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct FieldRun {
    pub value: f32,
    pub count: u32,
}

/// Restorable colony parameters. Ants themselves are not persisted,
/// `ants_to_release` re-seeds the population on load.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ColonySnapshot {
    pub x: f32,
    pub y: f32,
    pub ants_to_release: u32,
    pub ants_limit: u32,
    pub food: f32,
    /// Food gathered over the colony's lifetime.
    pub total_food: f32,
    pub aggressiveness: f32,
    pub freedom: f32,
}

/// Raw world state: garden size in world units, terrain buffers at field
/// resolution and colony parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSnapshot {
    pub width: u32,
    pub height: u32,
    pub food_field: Vec<f32>,
    pub rock_field: Vec<f32>,
    pub colonies: Vec<ColonySnapshot>,
}

/// On-disk form of [`SimulationSnapshot`] with run-length encoded terrain.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoredSimulation {
    pub width: u32,
    pub height: u32,
    pub food_field: Vec<FieldRun>,
    pub rock_field: Vec<FieldRun>,
    pub colonies: Vec<ColonySnapshot>,
}
