pub mod ant;
pub mod colony;
mod context;
mod corpse;
mod error;
pub mod field;
mod garden;
mod generator;
mod occupancy;
pub mod pheromone;
mod sampler;
mod sim;
mod symmetry;
mod timer;

// Re-export key types for easier imports
pub use ant::{Ant, AntKey, AntMode, AntRef, Dispersal};
pub use colony::{Colony, ColonyKey, ColonyStats, StatsSample};
pub use context::{Samplers, TickContext};
pub use corpse::Corpse;
pub use error::{GardenError, SnapshotError};
pub use field::{DrawOptions, Field, Grid};
pub use garden::{DEFAULT_CORPSE_DECAY_TICKS, DeathCause, Garden};
pub use occupancy::Occupancy;
pub use pheromone::{PheromoneField, PheromoneKind, PheromoneSet};
pub use sampler::{FieldSampler, Samples};
pub use sim::Simulation;
pub use symmetry::SymmetryMode;
pub use timer::Timer;

// Grid constants
pub const FIELD_CELL_SIZE: f32 = 10.0;
pub const ANTS_CELL_FACTOR: f32 = 6.0; // Coarse occupancy cells are 6x6 field cells
pub const MAP_MARGIN: f32 = 1.0;

// Ant behavior constants
pub const MAX_PHEROMONE_STRENGTH: f32 = 0.01;
pub const ENERGY_DECAY: f32 = 0.00004;
pub const STRENGTH_DECAY: f32 = 0.9997;
pub const LOW_ENERGY_RATIO: f32 = 0.6; // Below this share of max energy an ant heads home
pub const WORKER_SPEED: f32 = 4.0;
pub const SOLDIER_SPEED: f32 = 5.0;
pub const ATTACK_SPEED: f32 = 6.0;
pub const WORKER_HEALTH: f32 = 30.0;
pub const SOLDIER_BASE_HEALTH: f32 = 200.0;
pub const SOLDIER_HEALTH_SPREAD: f32 = 100.0;
pub const NEST_RADIUS: f32 = 40.0;
pub const ATTACK_RANGE: f32 = 30.0;
pub const CONTACT_DISTANCE: f32 = 25.0;
pub const ROCK_ATTACK_COOLDOWN: u32 = 10;
pub const FOOD_PER_DELIVERY: f32 = 3.0;
pub const STRONG_TURN: f32 = 0.3;

// Colony economy
pub const ANT_COST: u32 = 100;
pub const ANT_UPKEEP: u32 = 10;
pub const BIRTH_FOOD_COST: f32 = 20.0;
pub const ENERGY_FOOD_COST: f32 = 10.0;
pub const BIRTH_TIMEOUT_BASE: f32 = 50.0;
pub const WAR_COEFFICIENT_DECAY: f32 = 0.9995;
pub const DEFAULT_FREEDOM: f32 = 0.003;

// Stats history
pub const STATS_INTERVAL: u32 = 120; // in ticks
pub const HISTORY_CAPACITY: usize = 1000;

// Nest beacon
pub const BEACON_CHANCE: f32 = 0.01;
pub const BEACON_DIAMETER: u32 = 5;
pub const BEACON_VALUE: f32 = 2.0;

pub const PLACEMENT_TRIES: usize = 20;
