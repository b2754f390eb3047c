use super::ant::{Ant, AntKey, AttackOutcome, FastTick, Surroundings};
use super::colony::{Colony, ColonyKey, first_unused_bit_id};
use super::context::TickContext;
use super::corpse::Corpse;
use super::error::{GardenError, SnapshotError};
use super::field::{Field, Grid};
use super::occupancy::Occupancy;
use super::pheromone::PheromoneKind;
use super::symmetry::SymmetryMode;
use super::{ANTS_CELL_FACTOR, FIELD_CELL_SIZE, MAP_MARGIN, PLACEMENT_TRIES};
use crate::config::MIN_GARDEN_SIZE;

use glam::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use shared::{AntKind, ColonyId, ColonySnapshot, MAX_COLONIES, SimulationSnapshot};
use slotmap::SlotMap;

/// Default lifetime of a corpse, in ticks.
pub const DEFAULT_CORPSE_DECAY_TICKS: u32 = 10_800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Starvation,
    Killed,
    /// Removed on request by a controller.
    Culled,
}

/// The world: terrain, colonies, ants, corpses and the tick loop.
#[derive(Debug)]
pub struct Garden {
    pub width: f32,
    pub height: f32,
    pub food_field: Field,
    pub rock_field: Field,
    pub occupancy: Occupancy,

    pub colonies: SlotMap<ColonyKey, Colony>,
    colony_order: Vec<ColonyKey>,
    pub ants: SlotMap<AntKey, Ant>,
    /// Tick order of the ants; index-stable during the ant phase.
    ant_order: Vec<AntKey>,
    pub corpses: Vec<Corpse>,

    pub symmetry: SymmetryMode,
    pub corpse_decay_ticks: u32,

    dead: Vec<AntKey>,
    slow_offset: usize,
    precise_offset: usize,
    degradation_phase: usize,
    corpse_phase: usize,
    next_colony_id: u32,
    /// Base colony of the symmetric group being filled and how many of its
    /// members are placed.
    mirror_group: Option<(ColonyKey, usize)>,
    rng: SmallRng,
}

impl Garden {
    pub fn new(width: f32, height: f32, seed: u64) -> Self {
        let grid = Grid::covering(width, height, FIELD_CELL_SIZE);
        let ants_grid = Grid::covering(width, height, FIELD_CELL_SIZE * ANTS_CELL_FACTOR);
        Self {
            width,
            height,
            food_field: Field::new(grid),
            rock_field: Field::new(grid),
            occupancy: Occupancy::new(ants_grid),
            colonies: SlotMap::with_key(),
            colony_order: Vec::new(),
            ants: SlotMap::with_key(),
            ant_order: Vec::new(),
            corpses: Vec::new(),
            symmetry: SymmetryMode::None,
            corpse_decay_ticks: DEFAULT_CORPSE_DECAY_TICKS,
            dead: Vec::new(),
            slow_offset: 0,
            precise_offset: 0,
            degradation_phase: 0,
            corpse_phase: 0,
            next_colony_id: 0,
            mirror_group: None,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub(crate) fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Colonies in placement order.
    pub fn colonies(&self) -> impl Iterator<Item = &Colony> {
        self.colony_order.iter().filter_map(|key| self.colonies.get(*key))
    }

    /// Ants in tick order.
    pub fn ants(&self) -> impl Iterator<Item = &Ant> {
        self.ant_order.iter().filter_map(|key| self.ants.get(*key))
    }

    pub fn total_ant_count(&self) -> usize {
        self.ant_order.len()
    }

    pub fn colony_key(&self, id: ColonyId) -> Result<ColonyKey, GardenError> {
        self.colony_order
            .iter()
            .copied()
            .find(|key| self.colonies.get(*key).is_some_and(|c| c.id == id))
            .ok_or(GardenError::UnknownColony(id))
    }

    pub fn colony(&self, id: ColonyId) -> Result<&Colony, GardenError> {
        let key = self.colony_key(id)?;
        self.colonies.get(key).ok_or(GardenError::UnknownColony(id))
    }

    pub fn colony_mut(&mut self, id: ColonyId) -> Result<&mut Colony, GardenError> {
        let key = self.colony_key(id)?;
        self.colonies.get_mut(key).ok_or(GardenError::UnknownColony(id))
    }

    /// Runs one simulation step: ants, colonies, corpses, then pheromone decay.
    pub fn tick(&mut self, ctx: &TickContext<'_>) {
        let performance = &ctx.settings.performance;
        let brain_timeout = performance.ant_brain_tick_timeout.max(1) as usize;
        let gradient_timeout = performance.ant_gradient_check_tick_timeout.max(1) as usize;
        self.slow_offset = (self.slow_offset + 1) % brain_timeout;
        self.precise_offset = (self.precise_offset + 1) % gradient_timeout;

        for i in 0..self.ant_order.len() {
            let key = self.ant_order[i];
            if !self.fast_tick_ant(key, ctx) {
                continue;
            }
            if (i + self.precise_offset) % gradient_timeout == 0 {
                self.think(key, ctx, true);
            } else if (i + self.slow_offset) % brain_timeout == 0 {
                self.think(key, ctx, false);
            }
        }
        self.bury_dead();

        for i in 0..self.colony_order.len() {
            let key = self.colony_order[i];
            let Some(colony) = self.colonies.get_mut(key) else {
                continue;
            };
            if let Some(kind) = colony.tick(ctx.total_ticks, &mut self.rng) {
                self.release_ant(key, kind);
            }
        }

        self.tick_corpses(ctx.settings.corpse_tick_slices);
        self.degrade_pheromones(ctx.settings.degradation_time, ctx.settings.pheromone_dissipation);
    }

    /// Returns false when the ant is dead by the end of its fast tick.
    fn fast_tick_ant(&mut self, key: AntKey, ctx: &TickContext<'_>) -> bool {
        let Some(ant) = self.ants.get_mut(key) else {
            return false;
        };
        if ant.is_marked_dead() {
            return false;
        }
        let colony_key = ant.colony();
        let Some(colony) = self.colonies.get_mut(colony_key) else {
            return false;
        };

        let mut env = Surroundings {
            width: self.width,
            height: self.height,
            food: &mut self.food_field,
            rock: &self.rock_field,
            occupancy: &mut self.occupancy,
        };
        let (cell, ants_cell) = match ant.fast_tick(&mut env, colony, ctx, &mut self.rng) {
            FastTick::Starved => {
                self.kill_ant(key, DeathCause::Starvation);
                return false;
            }
            FastTick::Moved { cell, ants_cell } => (cell, ants_cell),
        };

        self.process_fight(key, ants_cell, cell, ctx);

        let Some(ant) = self.ants.get_mut(key) else {
            return false;
        };
        let Some(colony) = self.colonies.get_mut(colony_key) else {
            return false;
        };
        ant.lay_pheromones(cell, colony);
        true
    }

    fn think(&mut self, key: AntKey, ctx: &TickContext<'_>, precise: bool) {
        let Some(ant) = self.ants.get_mut(key) else {
            return;
        };
        let Some(colony) = self.colonies.get_mut(ant.colony()) else {
            return;
        };
        let mut env = Surroundings {
            width: self.width,
            height: self.height,
            food: &mut self.food_field,
            rock: &self.rock_field,
            occupancy: &mut self.occupancy,
        };
        if precise {
            ant.precise_tick(&mut env, colony, ctx, &mut self.rng);
        } else {
            ant.slow_tick(&mut env, colony, ctx, &mut self.rng);
        }
    }

    /// Keeps a soldier on its locked target, or lets it pick the closest
    /// enemy sharing its coarse cell.
    fn process_fight(&mut self, key: AntKey, ants_cell: usize, cell: usize, ctx: &TickContext<'_>) {
        let reach = self.occupancy.grid.cell_size;
        let Some(ant) = self.ants.get_mut(key) else {
            return;
        };
        let Some(bit_id) = self.colonies.get(ant.colony()).map(|c| c.bit_id) else {
            return;
        };

        if let Some(target) = ant.target {
            let pos = ant.pos;
            let in_reach = self
                .ants
                .get(target)
                .is_some_and(|t| t.is_alive() && !t.is_marked_dead() && t.pos.distance(pos) <= reach);
            if in_reach {
                self.strike(key, target);
                return;
            }
            if let Some(ant) = self.ants.get_mut(key) {
                ant.target = None;
            }
            return;
        }

        if !self.occupancy.has_enemy(ants_cell, bit_id) {
            return;
        }

        let Some(ant) = self.ants.get_mut(key) else {
            return;
        };
        if !ant.in_ants_map {
            self.occupancy.register_ant_in_cell(ants_cell, key);
            ant.in_ants_map = true;
        }
        if ant.kind != AntKind::Soldier {
            return;
        }
        // Counts down only while an enemy shares the cell.
        if ant.rock_cooldown > 0 {
            ant.rock_cooldown -= 1;
            return;
        }

        let colony_key = ant.colony();
        let pos = ant.pos;
        if let Some(colony) = self.colonies.get_mut(colony_key) {
            let marker = &mut colony.pheromones.get_mut(PheromoneKind::EnemyHere).data[cell];
            if *marker > 0.0 {
                *marker -= 1.0;
                ant.disperse_to_enemy(&ctx.settings.ants);
            }
        }

        let closest = self
            .occupancy
            .ants_in_cell(ants_cell)
            .iter()
            .filter_map(|other| self.ants.get(*other))
            .filter(|other| other.colony() != colony_key && !other.is_marked_dead())
            .min_by(|a, b| a.pos.distance_squared(pos).total_cmp(&b.pos.distance_squared(pos)))
            .map(Ant::key);
        if let Some(target) = closest {
            self.strike(key, target);
        }
    }

    fn strike(&mut self, attacker: AntKey, target: AntKey) {
        let Some([ant, enemy]) = self.ants.get_disjoint_mut([attacker, target]) else {
            return;
        };
        ant.target = Some(target);
        let outcome = ant.attack(enemy, &self.rock_field, self.width, self.height, &mut self.rng);
        if outcome != AttackOutcome::Killed {
            return;
        }

        ant.target = None;
        let (winner, loser) = (ant.colony(), enemy.colony());
        if let Some(colony) = self.colonies.get_mut(winner) {
            colony.stats.killed_enemy_ants += 1;
        }
        if let Some(colony) = self.colonies.get_mut(loser) {
            colony.stats.killed_ants += 1;
        }
        self.kill_ant(target, DeathCause::Killed);
    }

    /// Hatches an ant at the colony nest.
    pub fn release_ant(&mut self, colony_key: ColonyKey, kind: AntKind) -> Option<AntKey> {
        let colony = self.colonies.get_mut(colony_key)?;
        let rng = &mut self.rng;
        let key = self.ants.insert_with_key(|key| {
            let mut ant = Ant::new(kind, colony.pos, colony_key, rng);
            ant.ant_ref.key = key;
            ant
        });
        colony.on_ant_released(key, kind);
        self.ant_order.push(key);
        Some(key)
    }

    /// Takes the ant out of the world: carried food falls to the ground,
    /// the occupancy index forgets it and a corpse is left behind. The arena
    /// slot is freed by the next [`Garden::bury_dead`].
    pub fn kill_ant(&mut self, key: AntKey, cause: DeathCause) {
        let Some(ant) = self.ants.get_mut(key) else {
            return;
        };
        if ant.is_marked_dead() {
            return;
        }
        ant.mark_dead();
        ant.target = None;

        if ant.carrying_food {
            let index = self.food_field.grid.index_of(ant.pos);
            self.food_field.data[index] += 1.0;
            ant.carrying_food = false;
        }

        let Some(colony) = self.colonies.get_mut(ant.colony()) else {
            self.dead.push(key);
            return;
        };
        ant.leave_occupancy(&mut self.occupancy, colony.bit_id);
        if cause == DeathCause::Starvation {
            colony.stats.starved_ants += 1;
        }
        self.corpses.push(Corpse::new(ant, colony, self.corpse_decay_ticks));
        colony.on_ant_removed(key, ant.kind);
        self.dead.push(key);
    }

    fn bury_dead(&mut self) {
        if self.dead.is_empty() {
            return;
        }
        tracing::trace!(count = self.dead.len(), "burying dead ants");
        for key in self.dead.drain(..) {
            self.ants.remove(key);
        }
        let ants = &self.ants;
        self.ant_order.retain(|key| ants.contains_key(*key));
    }

    fn tick_corpses(&mut self, slices: u32) {
        let slices = slices.max(1) as usize;
        let phase = self.corpse_phase % slices;
        self.corpse_phase = (phase + 1) % slices;

        let mut decayed = false;
        for corpse in self.corpses.iter_mut().skip(phase).step_by(slices) {
            decayed |= corpse.age(slices as u32);
        }
        if decayed {
            self.corpses.retain(|corpse| !corpse.decay.is_ready());
        }
    }

    /// Decays one `1 / degradation_time` slice of every trail field, so each
    /// cell is hit once per `degradation_time` ticks.
    fn degrade_pheromones(&mut self, degradation_time: u32, dissipation: f32) {
        let time = degradation_time.max(1) as usize;
        let phase = self.degradation_phase % time;
        self.degradation_phase = (phase + 1) % time;

        let factor = 1.0 / dissipation;
        let len = self.food_field.grid.len();
        for colony in self.colonies.values_mut() {
            for kind in PheromoneKind::TRAILS {
                let field = colony.pheromones.get_mut(kind);
                for index in (phase..len).step_by(time) {
                    field.dissipate_cell(index, factor);
                }
            }
        }
    }

    /// Founds a colony at `pos`.
    pub fn place_colony(
        &mut self,
        pos: Vec2,
        starting_ants: u32,
        ants_limit: u32,
    ) -> Result<ColonyId, GardenError> {
        if !(pos.x >= 0.0 && pos.x < self.width && pos.y >= 0.0 && pos.y < self.height) {
            return Err(GardenError::OutOfBounds { x: pos.x, y: pos.y });
        }
        let bit_id = first_unused_bit_id(self.colonies.values().map(|c| c.bit_id))
            .ok_or(GardenError::NoColonySlot(MAX_COLONIES))?;

        let id = ColonyId(self.next_colony_id);
        self.next_colony_id += 1;
        let mut colony = Colony::new(id, bit_id, pos, self.food_field.grid, ants_limit, &mut self.rng);
        colony.set_starting_ants(starting_ants);
        let key = self.colonies.insert(colony);
        self.colony_order.push(key);

        tracing::debug!(colony = %id, bit_id, x = pos.x, y = pos.y, starting_ants, "colony placed");
        Ok(id)
    }

    /// Founds a colony at a mirrored or random free spot.
    pub fn place_random_colony(
        &mut self,
        starting_ants: u32,
        ants_limit: u32,
    ) -> Result<ColonyId, GardenError> {
        if self.colonies.len() >= MAX_COLONIES {
            return Err(GardenError::NoColonySlot(MAX_COLONIES));
        }
        let mirrored = self.mirrored_colony_position();
        let pos = match mirrored {
            Some(pos) => pos,
            None => self.random_colony_position().ok_or(GardenError::NoPlacement)?,
        };
        let id = self.place_colony(pos, starting_ants, ants_limit)?;
        self.mirror_group = match (mirrored, self.mirror_group) {
            (Some(_), Some((base, placed))) => Some((base, placed + 1)),
            _ => self.colony_order.last().map(|key| (*key, 1)),
        };
        Ok(id)
    }

    /// Reflection of the base colony of the current symmetric group. `None`
    /// once the group is complete or its base was removed.
    fn mirrored_colony_position(&self) -> Option<Vec2> {
        let (base, k) = self.mirror_group?;
        if k >= self.symmetry.fold() {
            return None;
        }
        let base = self.colonies.get(base)?;
        let extent = Vec2::new(self.width, self.height);
        let pos = self.symmetry.reflection(base.pos, extent, k);
        Some(pos.clamp(Vec2::ZERO, extent - MAP_MARGIN))
    }

    fn random_colony_position(&mut self) -> Option<Vec2> {
        if !self.rock_field.has_empty_areas() {
            self.rock_field.preprocess_empty_areas();
        }

        let count = self.colonies.len().max(1) as f32;
        let min_distance = self.width.min(self.height) / count / 1.5;
        let small_area = self.rock_field.grid.len() as f32 / count / 2.0;

        let mut best: Option<(Vec2, usize)> = None;
        // Crowded gardens settle for the spot farthest from other nests.
        let mut farthest: Option<(Vec2, f32)> = None;
        for _ in 0..PLACEMENT_TRIES {
            let pos = Vec2::new(
                self.rng.random::<f32>() * self.width,
                self.rng.random::<f32>() * self.height,
            );
            let index = self.rock_field.grid.index_of(pos);
            if self.rock_field.data[index] != 0.0 {
                continue;
            }
            if let Some(distance) = self.closest_colony_distance(pos).filter(|d| *d < min_distance) {
                if farthest.is_none_or(|(_, d)| distance > d) {
                    farthest = Some((pos, distance));
                }
                continue;
            }
            if let Some(area) = self.rock_field.empty_area_at(index) {
                if (area as f32) < small_area {
                    if best.is_none_or(|(_, largest)| area > largest) {
                        best = Some((pos, area));
                    }
                    continue;
                }
            }
            return Some(pos);
        }
        best.map(|(pos, _)| pos).or(farthest.map(|(pos, _)| pos))
    }

    fn closest_colony_distance(&self, pos: Vec2) -> Option<f32> {
        self.colonies
            .values()
            .map(|colony| colony.pos.distance(pos))
            .min_by(f32::total_cmp)
    }

    /// Deletes a colony with all its ants. No corpses are left.
    pub fn remove_colony(&mut self, id: ColonyId) -> Result<(), GardenError> {
        let key = self.colony_key(id)?;
        let colony = self
            .colonies
            .remove(key)
            .ok_or(GardenError::UnknownColony(id))?;
        for ant_key in &colony.ants {
            if let Some(mut ant) = self.ants.remove(*ant_key) {
                ant.leave_occupancy(&mut self.occupancy, colony.bit_id);
            }
        }
        self.colony_order.retain(|k| *k != key);
        let ants = &self.ants;
        self.ant_order.retain(|k| ants.contains_key(*k));
        self.dead.retain(|k| ants.contains_key(*k));

        tracing::debug!(colony = %id, ants = colony.ants.len(), "colony removed");
        Ok(())
    }

    pub fn add_ants(&mut self, id: ColonyId, kind: AntKind, count: u32) -> Result<(), GardenError> {
        let key = self.colony_key(id)?;
        for _ in 0..count {
            self.release_ant(key, kind);
        }
        Ok(())
    }

    /// Kills up to `count` ants of `kind`, youngest first. Returns how many died.
    pub fn kill_ants(&mut self, id: ColonyId, kind: AntKind, count: u32) -> Result<usize, GardenError> {
        let key = self.colony_key(id)?;
        let colony = self.colonies.get(key).ok_or(GardenError::UnknownColony(id))?;
        let victims: Vec<AntKey> = colony
            .ants
            .iter()
            .rev()
            .copied()
            .filter(|k| self.ants.get(*k).is_some_and(|ant| ant.kind == kind))
            .take(count as usize)
            .collect();
        for victim in &victims {
            self.kill_ant(*victim, DeathCause::Culled);
        }
        self.bury_dead();
        Ok(victims.len())
    }

    /// Paints food, leaving rock cells untouched.
    pub fn paint_food(&mut self, x: f32, y: f32, diameter: u32, value: f32) {
        let rock = &self.rock_field;
        self.food_field
            .draw_with(x, y, diameter, self.symmetry, |cell, stamp| {
                if rock.data[stamp.index] == 0.0 {
                    *cell = value.max(0.0);
                }
            });
    }

    /// Paints rock. Food under new rock is cleared and ants caught inside
    /// are sent back to their nest.
    pub fn paint_rock(&mut self, x: f32, y: f32, diameter: u32, value: f32) {
        let value = value.max(0.0);
        let mut painted = Vec::new();
        self.rock_field
            .draw_with(x, y, diameter, self.symmetry, |cell, stamp| {
                *cell = value;
                painted.push(stamp.index);
            });
        if value > 0.0 {
            for index in painted {
                self.food_field.data[index] = 0.0;
            }
            self.relocate_buried_ants();
        }
    }

    fn relocate_buried_ants(&mut self) {
        let mut relocated = 0;
        for key in &self.ant_order {
            let Some(ant) = self.ants.get_mut(*key) else {
                continue;
            };
            if self.rock_field.at(ant.pos) == 0.0 {
                continue;
            }
            let Some(colony) = self.colonies.get(ant.colony()) else {
                continue;
            };
            ant.pos = colony.pos;
            ant.last_cell = None;
            relocated += 1;
        }
        if relocated > 0 {
            tracing::debug!(relocated, "ants moved out of painted rock");
        }
    }

    pub fn clear_terrain(&mut self) {
        self.food_field.clear();
        self.rock_field.clear();
        self.preprocess_terrain();
    }

    /// Recomputes the empty-area segmentation of the rock field.
    pub fn preprocess_terrain(&mut self) {
        self.rock_field.preprocess_empty_areas();
    }

    pub fn dump(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            width: self.width as u32,
            height: self.height as u32,
            food_field: self.food_field.data.clone(),
            rock_field: self.rock_field.data.clone(),
            colonies: self.colonies().map(Colony::dump).collect(),
        }
    }

    /// Builds a fresh garden from a snapshot. Everything is validated up
    /// front; nothing is constructed when the data is unusable.
    pub fn from_snapshot(snapshot: &SimulationSnapshot, seed: u64) -> Result<Self, SnapshotError> {
        if snapshot.width < MIN_GARDEN_SIZE || snapshot.height < MIN_GARDEN_SIZE {
            return Err(SnapshotError::InvalidDimensions {
                width: snapshot.width,
                height: snapshot.height,
                min: MIN_GARDEN_SIZE,
            });
        }
        let (width, height) = (snapshot.width as f32, snapshot.height as f32);
        let grid = Grid::covering(width, height, FIELD_CELL_SIZE);
        check_field("food", &snapshot.food_field, grid.len())?;
        check_field("rock", &snapshot.rock_field, grid.len())?;
        if snapshot.colonies.len() > MAX_COLONIES {
            return Err(SnapshotError::TooManyColonies(snapshot.colonies.len()));
        }
        for (index, colony) in snapshot.colonies.iter().enumerate() {
            check_colony(colony, width, height)
                .map_err(|reason| SnapshotError::InvalidColony { index, reason })?;
        }

        let mut garden = Garden::new(width, height, seed);
        garden.food_field.data.copy_from_slice(&snapshot.food_field);
        garden.rock_field.data.copy_from_slice(&snapshot.rock_field);
        for colony in &snapshot.colonies {
            let bit_id = first_unused_bit_id(garden.colonies.values().map(|c| c.bit_id))
                .ok_or(SnapshotError::TooManyColonies(snapshot.colonies.len()))?;
            let id = ColonyId(garden.next_colony_id);
            garden.next_colony_id += 1;
            let colony = Colony::from_snapshot(id, bit_id, colony, grid, &mut garden.rng);
            let key = garden.colonies.insert(colony);
            garden.colony_order.push(key);
        }
        garden.preprocess_terrain();
        Ok(garden)
    }
}

fn check_field(field: &'static str, data: &[f32], expected: usize) -> Result<(), SnapshotError> {
    if data.len() != expected {
        return Err(SnapshotError::FieldLength {
            field,
            expected,
            actual: data.len(),
        });
    }
    match data.iter().position(|v| !v.is_finite() || *v < 0.0) {
        Some(index) => Err(SnapshotError::InvalidCell { field, index }),
        None => Ok(()),
    }
}

fn check_colony(colony: &ColonySnapshot, width: f32, height: f32) -> Result<(), &'static str> {
    if !(colony.x >= 0.0 && colony.x < width && colony.y >= 0.0 && colony.y < height) {
        return Err("nest outside the garden");
    }
    if !colony.food.is_finite() || colony.food < 0.0 {
        return Err("food stock is negative or not a number");
    }
    if !colony.total_food.is_finite() || colony.total_food < 0.0 {
        return Err("lifetime food is negative or not a number");
    }
    if !(0.0..=1.0).contains(&colony.aggressiveness) {
        return Err("aggressiveness outside [0, 1]");
    }
    if !colony.freedom.is_finite() || colony.freedom <= 0.0 {
        return Err("freedom must be positive");
    }
    Ok(())
}
