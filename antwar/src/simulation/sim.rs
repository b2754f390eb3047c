use glam::Vec2;
use shared::{Command, CommandOutcome, SimulationSnapshot};

use crate::config::{GardenConfig, SimulationConfig, SimulationSettings};

use super::context::{Samplers, TickContext};
use super::error::{GardenError, SnapshotError};
use super::garden::Garden;
use super::symmetry::SymmetryMode;

/// Host side of the world: owns the garden, the settings every tick reads,
/// and the pause/speed controls.
pub struct Simulation {
    pub garden: Garden,
    pub settings: SimulationSettings,
    pub garden_config: GardenConfig,
    pub total_ticks: u64,
    pub is_paused: bool,
    samplers: Samplers,
    seed: u64,
    tick_accumulator: f32,
}

impl Simulation {
    /// Generates a garden and places its colonies.
    pub fn new(config: &SimulationConfig) -> Result<Self, GardenError> {
        let seed = config.seed.unwrap_or_else(rand::random);
        let garden_config = &config.garden;

        let mut garden = Garden::new(garden_config.width as f32, garden_config.height as f32, seed);
        garden.symmetry =
            SymmetryMode::from_mirrors(garden_config.horizontal_mirror, garden_config.vertical_mirror);
        garden.generate_terrain(&garden_config.generation);
        for _ in 0..garden_config.number_of_colonies {
            garden.place_random_colony(garden_config.starting_ants, garden_config.colony_size_limit)?;
        }

        tracing::info!(
            seed,
            width = garden_config.width,
            height = garden_config.height,
            colonies = garden_config.number_of_colonies,
            "garden created"
        );
        Ok(Self::with_garden(garden, config, seed))
    }

    /// Wraps an existing garden.
    pub fn with_garden(mut garden: Garden, config: &SimulationConfig, seed: u64) -> Self {
        garden.corpse_decay_ticks = config.simulation.corpse_decay_ticks;
        Self {
            garden,
            settings: config.simulation.clone(),
            garden_config: config.garden.clone(),
            total_ticks: 0,
            is_paused: config.simulation.paused,
            samplers: Samplers::new(&config.simulation),
            seed,
            tick_accumulator: 0.0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Advances one frame. Fractional speeds accumulate across frames.
    /// Returns the number of ticks run.
    pub fn update(&mut self) -> u32 {
        if self.is_paused {
            return 0;
        }
        self.tick_accumulator += self.settings.speed;
        let mut ticks = 0;
        while self.tick_accumulator >= 1.0 {
            self.tick();
            self.tick_accumulator -= 1.0;
            ticks += 1;
        }
        ticks
    }

    /// Runs one tick regardless of pause and speed.
    pub fn tick(&mut self) {
        let ctx = TickContext {
            settings: &self.settings,
            samplers: &self.samplers,
            total_ticks: self.total_ticks,
        };
        self.garden.tick(&ctx);
        self.total_ticks += 1;
    }

    pub fn pause(&mut self) {
        self.is_paused = true;
    }

    pub fn unpause(&mut self) {
        self.is_paused = false;
    }

    /// Applies a controller command between ticks.
    pub fn apply(&mut self, command: Command) -> Result<CommandOutcome, GardenError> {
        tracing::debug!(?command, "applying command");
        match command {
            Command::Pause => self.pause(),
            Command::Resume => self.unpause(),
            Command::SetSpeed(speed) => {
                if !speed.is_finite() || speed < 0.0 {
                    return Err(GardenError::InvalidValue {
                        name: "speed",
                        value: speed,
                    });
                }
                self.settings.speed = speed;
            }
            Command::SetFreedom { colony, freedom } => {
                if !freedom.is_finite() || freedom <= 0.0 {
                    return Err(GardenError::InvalidValue {
                        name: "freedom",
                        value: freedom,
                    });
                }
                self.garden.colony_mut(colony)?.freedom = freedom;
            }
            Command::SetAggressiveness {
                colony,
                aggressiveness,
            } => {
                if !(0.0..=1.0).contains(&aggressiveness) {
                    return Err(GardenError::InvalidValue {
                        name: "aggressiveness",
                        value: aggressiveness,
                    });
                }
                self.garden.colony_mut(colony)?.aggressiveness = aggressiveness;
            }
            Command::AddAnts { colony, kind, count } => self.garden.add_ants(colony, kind, count)?,
            Command::KillAnts { colony, kind, count } => {
                let killed = self.garden.kill_ants(colony, kind, count)?;
                tracing::debug!(%colony, ?kind, killed, "ants culled");
            }
            Command::PlaceColony { position, ants } => {
                let limit = self.garden_config.colony_size_limit;
                let id = match position {
                    Some((x, y)) => self.garden.place_colony(Vec2::new(x, y), ants, limit)?,
                    None => self.garden.place_random_colony(ants, limit)?,
                };
                return Ok(CommandOutcome::ColonyPlaced(id));
            }
            Command::RemoveColony { colony } => self.garden.remove_colony(colony)?,
            Command::PaintFood { x, y, diameter, value } => self.garden.paint_food(x, y, diameter, value),
            Command::PaintRock { x, y, diameter, value } => self.garden.paint_rock(x, y, diameter, value),
            Command::ClearTerrain => self.garden.clear_terrain(),
        }
        Ok(CommandOutcome::Applied)
    }

    pub fn dump(&self) -> SimulationSnapshot {
        self.garden.dump()
    }

    /// Replaces the world with a snapshot. On error the current garden is
    /// left untouched.
    pub fn load(&mut self, snapshot: &SimulationSnapshot) -> Result<(), SnapshotError> {
        let mut garden = Garden::from_snapshot(snapshot, self.seed.wrapping_add(self.total_ticks))?;
        garden.symmetry = self.garden.symmetry;
        garden.corpse_decay_ticks = self.settings.corpse_decay_ticks;
        self.garden = garden;
        self.total_ticks = 0;
        self.tick_accumulator = 0.0;
        tracing::info!(
            width = snapshot.width,
            height = snapshot.height,
            colonies = snapshot.colonies.len(),
            "snapshot loaded"
        );
        Ok(())
    }

    /// Returns the total number of ants across all colonies
    pub fn total_ant_count(&self) -> usize {
        self.garden.total_ant_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{AntKind, ColonyId};

    fn config() -> SimulationConfig {
        let mut config = SimulationConfig {
            seed: Some(21),
            ..SimulationConfig::default()
        };
        config.garden.width = 800;
        config.garden.height = 800;
        config.garden.number_of_colonies = 2;
        config.garden.starting_ants = 5;
        config.garden.generation.rock_enabled = false;
        config
    }

    #[test]
    fn fractional_speed_accumulates() {
        let mut config = config();
        config.simulation.speed = 0.5;
        let mut sim = Simulation::new(&config).unwrap();
        let ran: u32 = (0..10).map(|_| sim.update()).sum();
        assert_eq!(ran, 5);
        assert_eq!(sim.total_ticks, 5);

        sim.apply(Command::SetSpeed(3.0)).unwrap();
        assert_eq!(sim.update(), 3);

        sim.apply(Command::Pause).unwrap();
        assert_eq!(sim.update(), 0);
        assert_eq!(sim.total_ticks, 8);
    }

    #[test]
    fn starting_ants_hatch_in_the_first_ticks() {
        let mut sim = Simulation::new(&config()).unwrap();
        assert_eq!(sim.garden.colonies().count(), 2);
        for _ in 0..5 {
            sim.tick();
        }
        assert_eq!(sim.total_ant_count(), 10);
    }

    #[test]
    fn commands_report_unknown_colonies_and_bad_values() {
        let mut sim = Simulation::new(&config()).unwrap();
        let missing = ColonyId(99);
        assert_eq!(
            sim.apply(Command::AddAnts {
                colony: missing,
                kind: AntKind::Worker,
                count: 1
            }),
            Err(GardenError::UnknownColony(missing))
        );
        assert!(matches!(
            sim.apply(Command::SetFreedom {
                colony: ColonyId(0),
                freedom: 0.0
            }),
            Err(GardenError::InvalidValue { name: "freedom", .. })
        ));
        assert!(sim.apply(Command::SetSpeed(f32::NAN)).is_err());
    }

    #[test]
    fn colonies_can_be_placed_and_removed() {
        let mut sim = Simulation::new(&config()).unwrap();
        let outcome = sim
            .apply(Command::PlaceColony {
                position: Some((400.0, 400.0)),
                ants: 3,
            })
            .unwrap();
        let CommandOutcome::ColonyPlaced(id) = outcome else {
            panic!("expected a new colony, got {outcome:?}");
        };
        sim.apply(Command::AddAnts {
            colony: id,
            kind: AntKind::Soldier,
            count: 4,
        })
        .unwrap();
        assert_eq!(sim.garden.colony(id).unwrap().stats.soldiers, 4);

        sim.apply(Command::RemoveColony { colony: id }).unwrap();
        assert!(sim.garden.colony(id).is_err());
        assert_eq!(sim.total_ant_count(), 0);
    }

    #[test]
    fn failed_load_keeps_the_current_world() {
        let mut sim = Simulation::new(&config()).unwrap();
        for _ in 0..10 {
            sim.tick();
        }
        let before = sim.dump();
        let ants = sim.total_ant_count();

        let mut broken = before.clone();
        broken.rock_field.truncate(10);
        assert!(sim.load(&broken).is_err());
        assert_eq!(sim.dump(), before);
        assert_eq!(sim.total_ant_count(), ants);
        assert_eq!(sim.total_ticks, 10);

        sim.load(&before).unwrap();
        assert_eq!(sim.total_ticks, 0);
        assert_eq!(sim.total_ant_count(), 0);
        assert_eq!(sim.garden.colonies().count(), 2);
    }
}
