use super::colony::{Colony, ColonyKey};
use super::context::TickContext;
use super::field::Field;
use super::occupancy::Occupancy;
use super::pheromone::{PheromoneField, PheromoneKind};
use super::sampler::FieldSampler;
use super::{
    ATTACK_RANGE, ATTACK_SPEED, CONTACT_DISTANCE, ENERGY_DECAY, FIELD_CELL_SIZE,
    FOOD_PER_DELIVERY, LOW_ENERGY_RATIO, MAP_MARGIN, MAX_PHEROMONE_STRENGTH, NEST_RADIUS,
    ROCK_ATTACK_COOLDOWN, SOLDIER_BASE_HEALTH, SOLDIER_HEALTH_SPREAD, SOLDIER_SPEED,
    STRENGTH_DECAY, STRONG_TURN, WORKER_HEALTH, WORKER_SPEED,
};
use crate::config::AntTuning;

use glam::Vec2;
use rand::Rng;
use rand::rngs::SmallRng;
use shared::{AntKind, fast_sin_cos, wrap_angle};
use slotmap::{Key, new_key_type};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

new_key_type! {
    /// Key for ant slotmap.
    pub struct AntKey;
}

/// Reference to an ant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AntRef {
    pub key: AntKey,
    pub colony: ColonyKey,
}

/// Trail erasing an ant performs while walking, e.g. after finding an
/// exhausted food source. The first `timeout` ticks are a grace window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dispersal {
    pub field: PheromoneKind,
    pub ticks_left: u32,
    pub max_ticks: u32,
    pub timeout: u32,
    pub strength: f32,
}

impl Dispersal {
    pub fn to_food(tuning: &AntTuning) -> Self {
        Self {
            field: PheromoneKind::ToFood,
            ticks_left: tuning.worker_max_disperse_ticks,
            max_ticks: tuning.worker_max_disperse_ticks,
            timeout: tuning.worker_disperse_timeout,
            strength: tuning.worker_disperse_strength,
        }
    }

    pub fn to_enemy(tuning: &AntTuning) -> Self {
        Self {
            field: PheromoneKind::ToEnemy,
            ticks_left: tuning.soldier_max_disperse_ticks,
            max_ticks: tuning.soldier_max_disperse_ticks,
            timeout: tuning.soldier_disperse_timeout,
            strength: tuning.soldier_disperse_strength,
        }
    }

    /// Grace window elapsed.
    pub fn is_active(&self) -> bool {
        self.ticks_left < self.max_ticks.saturating_sub(self.timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AntMode {
    SeekFood {
        dispersal: Option<Dispersal>,
    },
    /// `trail` is what the ant lays on its way back: to-food when carrying,
    /// to-enemy after a sighting, nothing otherwise.
    ReturnHome {
        trail: Option<PheromoneKind>,
        dispersal: Option<Dispersal>,
    },
    SeekEnemy {
        dispersal: Option<Dispersal>,
    },
}

impl AntMode {
    pub fn follows(&self) -> PheromoneKind {
        match self {
            AntMode::SeekFood { .. } => PheromoneKind::ToFood,
            AntMode::ReturnHome { .. } => PheromoneKind::ToHome,
            AntMode::SeekEnemy { .. } => PheromoneKind::ToEnemy,
        }
    }

    pub fn trail(&self) -> Option<PheromoneKind> {
        match self {
            AntMode::SeekFood { .. } | AntMode::SeekEnemy { .. } => Some(PheromoneKind::ToHome),
            AntMode::ReturnHome { trail, .. } => *trail,
        }
    }

    pub fn dispersal(&self) -> Option<&Dispersal> {
        match self {
            AntMode::SeekFood { dispersal }
            | AntMode::ReturnHome { dispersal, .. }
            | AntMode::SeekEnemy { dispersal } => dispersal.as_ref(),
        }
    }

    fn dispersal_mut(&mut self) -> &mut Option<Dispersal> {
        match self {
            AntMode::SeekFood { dispersal }
            | AntMode::ReturnHome { dispersal, .. }
            | AntMode::SeekEnemy { dispersal } => dispersal,
        }
    }
}

/// Borrowed garden state an ant reads and writes during its own tick.
pub struct Surroundings<'a> {
    pub width: f32,
    pub height: f32,
    pub food: &'a mut Field,
    pub rock: &'a Field,
    pub occupancy: &'a mut Occupancy,
}

/// Result of a fast tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastTick {
    Starved,
    /// Fine and coarse cells the ant ended up in.
    Moved { cell: usize, ants_cell: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    Chasing,
    Hit,
    Killed,
}

/// State of an ant.
#[derive(Debug, Clone)]
pub struct Ant {
    pub ant_ref: AntRef,
    pub kind: AntKind,
    pub mode: AntMode,

    pub pos: Vec2,
    /// Heading in `(-PI, PI]`.
    pub rotation: f32,
    pub speed: f32,

    pub max_energy: f32,
    pub energy: f32,
    pub max_health: f32,
    pub health: f32,
    pub carrying_food: bool,
    pub pheromone_strength: f32,

    pub target: Option<AntKey>,
    /// Soldiers hold off attacking right after bumping into rock, so they
    /// don't chase enemies through thin walls.
    pub rock_cooldown: u32,

    pub(crate) last_cell: Option<usize>,
    pub(crate) ants_cell: Option<usize>,
    pub(crate) in_ants_map: bool,
    alive: bool,
}

impl Ant {
    /// Create a new ant.
    pub fn new(kind: AntKind, pos: Vec2, colony: ColonyKey, rng: &mut SmallRng) -> Self {
        let (speed, max_health, mode) = match kind {
            AntKind::Worker => (
                WORKER_SPEED,
                WORKER_HEALTH,
                AntMode::SeekFood { dispersal: None },
            ),
            AntKind::Soldier => (
                SOLDIER_SPEED,
                SOLDIER_BASE_HEALTH + SOLDIER_HEALTH_SPREAD * (rng.random::<f32>() - 0.5),
                AntMode::SeekEnemy { dispersal: None },
            ),
        };
        let max_energy = 1.0 + (rng.random::<f32>() - 0.5) * 1.6;

        Self {
            ant_ref: AntRef {
                key: AntKey::null(),
                colony,
            },
            kind,
            mode,
            pos,
            rotation: wrap_angle(rng.random::<f32>() * TAU),
            speed,
            max_energy,
            energy: max_energy,
            max_health,
            health: max_health,
            carrying_food: false,
            pheromone_strength: MAX_PHEROMONE_STRENGTH,
            target: None,
            rock_cooldown: 0,
            last_cell: None,
            ants_cell: None,
            in_ants_map: false,
            alive: true,
        }
    }

    #[inline]
    pub fn key(&self) -> AntKey {
        self.ant_ref.key
    }

    #[inline]
    pub fn colony(&self) -> ColonyKey {
        self.ant_ref.colony
    }

    pub fn is_alive(&self) -> bool {
        self.alive && self.health > 0.0 && self.energy > 0.0
    }

    pub(crate) fn mark_dead(&mut self) {
        self.alive = false;
    }

    /// Coarse occupancy cell the ant is counted in.
    pub fn ants_cell(&self) -> Option<usize> {
        self.ants_cell
    }

    /// Already handed to the garden for burial.
    pub(crate) fn is_marked_dead(&self) -> bool {
        !self.alive
    }

    pub fn velocity(&self) -> Vec2 {
        let (sin, cos) = fast_sin_cos(self.rotation);
        Vec2::new(cos, sin) * self.speed
    }

    pub fn rotate(&mut self, angle: f32) {
        self.rotation = wrap_angle(self.rotation + angle);
    }

    pub fn rotate_to(&mut self, angle: f32) {
        self.rotation = wrap_angle(angle);
    }

    fn turn_around(&mut self) {
        self.rotate(PI);
    }

    fn turn_randomly(&mut self, rng: &mut SmallRng) {
        self.rotate(TAU * rng.random::<f32>());
    }

    fn turn_slightly(&mut self, randomness: f32, rng: &mut SmallRng) {
        self.rotate((rng.random::<f32>() - 0.5) / randomness);
    }

    fn turn_strongly(&mut self, power: f32, rng: &mut SmallRng) {
        self.rotate((rng.random::<f32>() - 0.5) * power);
    }

    fn within_margin(&self, width: f32, height: f32) -> bool {
        self.pos.x >= MAP_MARGIN
            && self.pos.x <= width - MAP_MARGIN
            && self.pos.y >= MAP_MARGIN
            && self.pos.y <= height - MAP_MARGIN
    }

    /// Per-tick movement, collision and occupancy bookkeeping.
    pub(crate) fn fast_tick(
        &mut self,
        env: &mut Surroundings<'_>,
        colony: &mut Colony,
        ctx: &TickContext<'_>,
        rng: &mut SmallRng,
    ) -> FastTick {
        self.energy -= ENERGY_DECAY;
        self.pheromone_strength *= STRENGTH_DECAY;
        if self.energy <= 0.0 {
            return FastTick::Starved;
        }

        let before = self.pos;
        self.pos += self.velocity();
        if !self.within_margin(env.width, env.height) {
            self.pos = before;
            self.turn_randomly(rng);
        }

        let mut cell = env.rock.grid.index_of(self.pos);
        if env.rock.data[cell] > 0.0 {
            self.pos = before;
            cell = env.rock.grid.index_of(self.pos);
            self.resolve_collision(env.rock, cell, rng);
            if self.kind == AntKind::Soldier {
                self.rock_cooldown = ROCK_ATTACK_COOLDOWN;
            }
        }

        self.tick_dispersal(&ctx.settings.ants);

        let ants_cell = env.occupancy.grid.index_of(self.pos);
        self.update_occupancy(cell, ants_cell, env.occupancy, colony, &ctx.settings.ants);

        FastTick::Moved { cell, ants_cell }
    }

    /// Picks a heading along the rock face: first the cardinal direction
    /// nearest the current heading, then the one across it.
    fn resolve_collision(&mut self, rock: &Field, cell: usize, rng: &mut SmallRng) {
        let grid = rock.grid;
        let (cx, cy) = grid.cell_coords(cell);
        let free = |dx: i64, dy: i64| {
            let x = cx as i64 + dx;
            let y = cy as i64 + dy;
            x >= 0
                && y >= 0
                && (x as usize) < grid.width
                && (y as usize) < grid.height
                && rock.data[y as usize * grid.width + x as usize] == 0.0
        };

        // (dx, dy, heading) pairs, tried in order.
        let west = (-1, 0, PI);
        let east = (1, 0, 0.0);
        let north = (0, -1, -FRAC_PI_2);
        let south = (0, 1, FRAC_PI_2);
        let candidates = if self.rotation < -FRAC_PI_2 {
            [west, north]
        } else if self.rotation >= FRAC_PI_2 {
            [west, south]
        } else if self.rotation < 0.0 {
            [north, east]
        } else {
            [east, south]
        };

        for (dx, dy, heading) in candidates {
            if free(dx, dy) {
                self.rotate_to(heading);
                return;
            }
        }
        self.turn_randomly(rng);
    }

    fn tick_dispersal(&mut self, tuning: &AntTuning) {
        let expired = match self.mode.dispersal_mut() {
            Some(dispersal) => {
                dispersal.ticks_left = dispersal.ticks_left.saturating_sub(1);
                dispersal.ticks_left == 0
            }
            None => false,
        };
        if expired {
            self.enter_return_home(tuning);
        }
    }

    fn update_occupancy(
        &mut self,
        cell: usize,
        ants_cell: usize,
        occupancy: &mut Occupancy,
        colony: &mut Colony,
        tuning: &AntTuning,
    ) {
        if self.ants_cell == Some(ants_cell) {
            return;
        }
        if let Some(previous) = self.ants_cell {
            if self.in_ants_map {
                occupancy.unregister_ant_from_cell(previous, self.key());
                self.in_ants_map = false;
            }
            occupancy.leave(previous, colony.bit_id);
        }
        occupancy.enter(ants_cell, colony.bit_id);
        self.ants_cell = Some(ants_cell);

        if self.kind == AntKind::Worker && occupancy.has_enemy(ants_cell, colony.bit_id) {
            self.enter_return_home_seeing_enemy();
            colony.pheromones.get_mut(PheromoneKind::EnemyHere).data[cell] =
                tuning.enemy_here_marker;
        }
    }

    /// Removes this ant from the coarse index.
    pub(crate) fn leave_occupancy(&mut self, occupancy: &mut Occupancy, bit_id: u32) {
        if let Some(previous) = self.ants_cell.take() {
            if self.in_ants_map {
                occupancy.unregister_ant_from_cell(previous, self.key());
            }
            occupancy.leave(previous, bit_id);
        }
        self.in_ants_map = false;
    }

    /// Steers at `target` and strikes it once within reach. The attacker
    /// bounces back to contact distance unless that would put it on rock.
    pub(crate) fn attack(
        &mut self,
        target: &mut Ant,
        rock: &Field,
        width: f32,
        height: f32,
        rng: &mut SmallRng,
    ) -> AttackOutcome {
        let offset = target.pos - self.pos;
        let distance = offset.length();
        let direction = offset.normalize_or_zero();
        if direction != Vec2::ZERO {
            self.rotate_to(direction.y.atan2(direction.x));
        }
        self.speed = ATTACK_SPEED;

        if distance >= ATTACK_RANGE {
            return AttackOutcome::Chasing;
        }

        target.health -= 1.0;
        let outcome = if target.health <= 0.0 {
            AttackOutcome::Killed
        } else {
            AttackOutcome::Hit
        };

        let before = self.pos;
        self.pos -= direction * (CONTACT_DISTANCE - distance);
        if rock.at(self.pos) != 0.0 {
            self.pos = before;
            return outcome;
        }
        if !self.within_margin(width, height) {
            self.pos = before;
            self.turn_randomly(rng);
        }
        if rng.random::<f32>() > 0.9 {
            self.turn_strongly(STRONG_TURN, rng);
        }
        outcome
    }

    /// Weakens the armed dispersal field and lays the mode's trail on `cell`.
    pub(crate) fn lay_pheromones(&mut self, cell: usize, colony: &mut Colony) {
        if self.last_cell == Some(cell) {
            return;
        }
        if let Some(dispersal) = self.mode.dispersal().filter(|d| d.is_active()) {
            colony
                .pheromones
                .get_mut(dispersal.field)
                .disperse_pheromone(cell, dispersal.strength);
        }
        if let Some(trail) = self.mode.trail() {
            colony.pheromones.get_mut(trail).drop_pheromone(
                cell,
                self.pheromone_strength,
                self.pheromone_strength / MAX_PHEROMONE_STRENGTH,
            );
        }
        self.last_cell = Some(cell);
    }

    /// Cheap steering along the followed field, then the mode logic.
    pub(crate) fn slow_tick(
        &mut self,
        env: &mut Surroundings<'_>,
        colony: &mut Colony,
        ctx: &TickContext<'_>,
        rng: &mut SmallRng,
    ) {
        let field = colony.pheromones.get(self.mode.follows());
        self.follow_field(field, &ctx.samplers.pheromone, false, env, colony.freedom, ctx, rng);
        self.brain_tick(env, colony, ctx);
    }

    /// Wide greedy look-around that also corrects foragers walking up the
    /// to-home gradient.
    pub(crate) fn precise_tick(
        &mut self,
        env: &mut Surroundings<'_>,
        colony: &mut Colony,
        ctx: &TickContext<'_>,
        rng: &mut SmallRng,
    ) {
        let field = colony.pheromones.get(self.mode.follows());
        let following =
            self.follow_field(field, &ctx.samplers.precise, true, env, colony.freedom, ctx, rng);

        if !following
            && matches!(self.mode, AntMode::SeekFood { .. })
            && rng.random::<f32>() > 0.5
        {
            let samples = ctx.samplers.direction.sample(
                self.pos,
                self.rotation,
                FIELD_CELL_SIZE,
                colony.pheromones.get(PheromoneKind::ToHome),
                env.rock,
                Some(&*env.food),
                freedom_exponent(colony.freedom),
            );
            if samples.values[1] < samples.values[0] {
                self.turn_around();
                self.turn_strongly(STRONG_TURN, rng);
            }
        }

        self.brain_tick(env, colony, ctx);
    }

    /// Returns true when the ant committed to a probabilistically chosen ray.
    #[allow(clippy::too_many_arguments)]
    fn follow_field(
        &mut self,
        field: &PheromoneField,
        sampler: &FieldSampler,
        choose_best: bool,
        env: &Surroundings<'_>,
        freedom: f32,
        ctx: &TickContext<'_>,
        rng: &mut SmallRng,
    ) -> bool {
        let randomness = ctx.settings.ant_seek_randomness;
        let exponent = freedom_exponent(freedom);
        let food = matches!(self.mode, AntMode::SeekFood { .. }).then_some(&*env.food);
        let samples = sampler.sample(
            self.pos,
            self.rotation,
            FIELD_CELL_SIZE,
            field,
            env.rock,
            food,
            exponent,
        );

        if samples.max == 0.0 {
            self.turn_slightly(randomness, rng);
            return false;
        }

        // Weights that overflowed degenerate into a greedy pick anyway.
        if choose_best || !samples.max.is_finite() {
            let mut best_value = 0.0;
            let mut best_index = None;
            for (i, &value) in samples.values.iter().enumerate() {
                if value > best_value {
                    best_value = value;
                    best_index = Some(i);
                }
            }
            if let Some(angle) = best_index.map(|i| sampler.angles[i]).filter(|a| *a != 0.0) {
                self.rotate(angle);
                self.turn_slightly(randomness, rng);
            }
            return !choose_best;
        }

        let weights: Vec<f64> = samples
            .values
            .iter()
            .map(|value| (value / samples.max).powf(exponent))
            .collect();
        let sum: f64 = weights.iter().sum();

        let r = rng.random::<f64>() * sum;
        let mut current = 0.0;
        for (i, weight) in weights.iter().enumerate() {
            current += weight;
            if r <= current {
                self.rotate(sampler.angles[i]);
                return true;
            }
        }

        self.turn_slightly(randomness, rng);
        false
    }

    fn brain_tick(&mut self, env: &mut Surroundings<'_>, colony: &mut Colony, ctx: &TickContext<'_>) {
        let tuning = &ctx.settings.ants;
        match self.mode {
            AntMode::SeekFood { .. } => self.seek_food(env, colony, tuning),
            AntMode::ReturnHome { .. } => {
                if self.pos.distance(colony.pos) < NEST_RADIUS {
                    self.visit_colony(colony);
                }
            }
            AntMode::SeekEnemy { dispersal } => {
                if self.energy <= self.max_energy * LOW_ENERGY_RATIO
                    || dispersal.is_some_and(|d| d.is_active())
                {
                    self.enter_return_home(tuning);
                }
            }
        }
    }

    fn seek_food(&mut self, env: &mut Surroundings<'_>, colony: &mut Colony, tuning: &AntTuning) {
        if self.energy <= self.max_energy * LOW_ENERGY_RATIO {
            self.enter_return_home(tuning);
            return;
        }

        let index = env.food.grid.index_of(self.pos);
        let food_here = colony.pheromones.get_mut(PheromoneKind::FoodHere);
        if env.food.data[index] > 0.0 {
            env.food.data[index] = (env.food.data[index] - 1.0).max(0.0);
            food_here.data[index] = tuning.food_here_marker;
            self.carrying_food = true;
            self.enter_return_home(tuning);
        } else if food_here.data[index] > 0.0 {
            food_here.data[index] -= 1.0;
            *self.mode.dispersal_mut() = Some(Dispersal::to_food(tuning));
        }
    }

    /// Arms the to-enemy dispersal, used by soldiers passing a fresh sighting.
    pub(crate) fn disperse_to_enemy(&mut self, tuning: &AntTuning) {
        *self.mode.dispersal_mut() = Some(Dispersal::to_enemy(tuning));
    }

    /// Restores the ant at its nest and hands over any carried food.
    pub fn visit_colony(&mut self, colony: &mut Colony) {
        self.health = self.max_health;
        self.pheromone_strength = MAX_PHEROMONE_STRENGTH;
        if self.carrying_food {
            colony.add_food(FOOD_PER_DELIVERY);
            self.carrying_food = false;
        }
        colony.visit(self);
        if self.energy < self.max_energy {
            return;
        }
        match self.kind {
            AntKind::Worker => self.enter_seek_food(),
            AntKind::Soldier => self.enter_seek_enemy(),
        }
    }

    pub fn enter_return_home(&mut self, tuning: &AntTuning) {
        self.turn_around();
        self.pheromone_strength = MAX_PHEROMONE_STRENGTH;
        self.mode = match self.kind {
            AntKind::Worker if self.carrying_food => AntMode::ReturnHome {
                trail: Some(PheromoneKind::ToFood),
                dispersal: None,
            },
            AntKind::Worker => AntMode::ReturnHome {
                trail: None,
                dispersal: Some(Dispersal::to_food(tuning)),
            },
            AntKind::Soldier => AntMode::ReturnHome {
                trail: None,
                dispersal: Some(Dispersal::to_enemy(tuning)),
            },
        };
    }

    /// Flight after sensing enemies: head home laying to-enemy. An ant
    /// already heading home keeps its course.
    pub fn enter_return_home_seeing_enemy(&mut self) {
        if !matches!(self.mode, AntMode::ReturnHome { .. }) {
            self.turn_around();
        }
        self.pheromone_strength = MAX_PHEROMONE_STRENGTH;
        self.mode = AntMode::ReturnHome {
            trail: Some(PheromoneKind::ToEnemy),
            dispersal: None,
        };
    }

    pub fn enter_seek_food(&mut self) {
        self.mode = AntMode::SeekFood { dispersal: None };
        self.turn_around();
    }

    pub fn enter_seek_enemy(&mut self) {
        self.mode = AntMode::SeekEnemy { dispersal: None };
        self.turn_around();
    }
}

#[inline]
fn freedom_exponent(freedom: f32) -> f64 {
    1.0 / freedom.max(f32::EPSILON) as f64
}
