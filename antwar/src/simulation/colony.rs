use super::ant::{Ant, AntKey};
use super::field::Grid;
use super::pheromone::{PheromoneKind, PheromoneSet};
use super::{
    ANT_COST, ANT_UPKEEP, BEACON_CHANCE, BEACON_DIAMETER, BEACON_VALUE, BIRTH_FOOD_COST,
    BIRTH_TIMEOUT_BASE, DEFAULT_FREEDOM, ENERGY_FOOD_COST, HISTORY_CAPACITY, STATS_INTERVAL,
    Timer, WAR_COEFFICIENT_DECAY,
};

use glam::Vec2;
use rand::Rng;
use rand::rngs::SmallRng;
use shared::{AntKind, ColonySnapshot, ColonyId, MAX_COLONIES};
use slotmap::new_key_type;
use std::collections::VecDeque;

new_key_type! {
    /// Key for colony slotmap.
    pub struct ColonyKey;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColonyStats {
    pub food: f32,
    pub total_food: f32,
    pub living_ants: u32,
    pub total_ants: u32,
    pub starved_ants: u32,
    pub killed_ants: u32,
    pub killed_enemy_ants: u32,
    pub workers: u32,
    pub soldiers: u32,
}

/// One stats sample, taken every [`STATS_INTERVAL`] ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSample {
    pub tick: u64,
    pub stats: ColonyStats,
    pub war_coefficient: f32,
}

/// Nest, trails, population and food economy of one colony.
#[derive(Debug, Clone)]
pub struct Colony {
    pub id: ColonyId,
    /// Single bit identifying the colony in the occupancy masks.
    pub bit_id: u32,
    pub pos: Vec2,
    pub ants: Vec<AntKey>,
    pub stats: ColonyStats,
    pub history: VecDeque<StatsSample>,
    pub pheromones: PheromoneSet,

    /// Chance of a newborn being a soldier, pushed up by returning scouts.
    pub war_coefficient: f32,
    pub aggressiveness: f32,
    /// Exploration temperature of trail following, lower is greedier.
    pub freedom: f32,
    /// Free births still owed, typically the starting population.
    pub ants_to_release: u32,
    pub ants_limit: u32,

    last_birth: u64,
    stats_timer: Timer,
}

/// First power of two not in `used`, or `None` when all 31 are taken.
pub fn first_unused_bit_id(used: impl IntoIterator<Item = u32>) -> Option<u32> {
    let taken = used.into_iter().fold(0u32, |acc, bit| acc | bit);
    (0..MAX_COLONIES as u32)
        .map(|i| 1u32 << i)
        .find(|bit| taken & bit == 0)
}

impl Colony {
    pub fn new(
        id: ColonyId,
        bit_id: u32,
        pos: Vec2,
        grid: Grid,
        ants_limit: u32,
        rng: &mut SmallRng,
    ) -> Self {
        let mut colony = Self {
            id,
            bit_id,
            pos,
            ants: Vec::new(),
            stats: ColonyStats::default(),
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            pheromones: PheromoneSet::new(grid),
            war_coefficient: 0.0,
            aggressiveness: rng.random::<f32>(),
            freedom: DEFAULT_FREEDOM,
            ants_to_release: 0,
            ants_limit,
            last_birth: 0,
            stats_timer: Timer::new(STATS_INTERVAL, STATS_INTERVAL - 1),
        };
        colony.refresh_nest_pheromones();
        colony
    }

    /// Rebuilds a colony from saved parameters.
    pub fn from_snapshot(
        id: ColonyId,
        bit_id: u32,
        snapshot: &ColonySnapshot,
        grid: Grid,
        rng: &mut SmallRng,
    ) -> Self {
        let mut colony = Self::new(
            id,
            bit_id,
            Vec2::new(snapshot.x, snapshot.y),
            grid,
            snapshot.ants_limit,
            rng,
        );
        colony.ants_to_release = snapshot.ants_to_release;
        colony.stats.food = snapshot.food;
        colony.stats.total_food = snapshot.total_food.max(snapshot.food);
        colony.aggressiveness = snapshot.aggressiveness;
        colony.freedom = snapshot.freedom;
        colony
    }

    pub fn dump(&self) -> ColonySnapshot {
        ColonySnapshot {
            x: self.pos.x,
            y: self.pos.y,
            ants_to_release: self.ants_to_release.max(self.ants.len() as u32),
            ants_limit: self.ants_limit,
            food: self.stats.food,
            total_food: self.stats.total_food,
            aggressiveness: self.aggressiveness,
            freedom: self.freedom,
        }
    }

    /// Seeds a fresh colony: enough food to raise `count` ants with a
    /// small reserve, released for free over the next ticks.
    pub fn set_starting_ants(&mut self, count: u32) {
        self.stats.food = count as f32 * (ANT_COST + ANT_UPKEEP) as f32;
        self.stats.total_food = self.stats.food;
        self.ants_to_release = count;
    }

    pub fn add_food(&mut self, amount: f32) {
        self.stats.food += amount;
        self.stats.total_food += amount;
    }

    /// Feeds a visiting ant. Each missing energy unit costs
    /// [`ENERGY_FOOD_COST`] food; a short stock only refills part of it.
    pub fn visit(&mut self, ant: &mut Ant) {
        if self.stats.food > 0.0 {
            let missing = (ant.max_energy - ant.energy).max(0.0);
            let cost = missing * ENERGY_FOOD_COST;
            if cost <= self.stats.food {
                self.stats.food -= cost;
                ant.energy = ant.max_energy;
            } else {
                ant.energy += self.stats.food / ENERGY_FOOD_COST;
                self.stats.food = 0.0;
            }
        }

        if ant.mode.trail() == Some(PheromoneKind::ToEnemy) && !self.ants.is_empty() {
            self.war_coefficient +=
                self.aggressiveness / self.ants.len() as f32 * (1.0 - self.war_coefficient);
        }
    }

    /// Kind of the next newborn, soldiers with probability `war_coefficient`.
    pub fn random_kind(&self, rng: &mut SmallRng) -> AntKind {
        if rng.random::<f32>() < self.war_coefficient {
            AntKind::Soldier
        } else {
            AntKind::Worker
        }
    }

    /// Pays for one birth. Owed free births are consumed first.
    fn pay_for_birth(&mut self) {
        if self.ants_to_release > 0 {
            self.ants_to_release -= 1;
        } else {
            self.stats.food = (self.stats.food - BIRTH_FOOD_COST).max(0.0);
        }
    }

    /// Bookkeeping for an ant that just joined the colony.
    pub(crate) fn on_ant_released(&mut self, key: AntKey, kind: AntKind) {
        self.ants.push(key);
        self.stats.living_ants += 1;
        self.stats.total_ants += 1;
        match kind {
            AntKind::Worker => self.stats.workers += 1,
            AntKind::Soldier => self.stats.soldiers += 1,
        }
    }

    /// Bookkeeping for an ant that left the colony, dead or destroyed.
    /// `ants` stays in birth order.
    pub(crate) fn on_ant_removed(&mut self, key: AntKey, kind: AntKind) {
        if let Some(position) = self.ants.iter().position(|&k| k == key) {
            self.ants.remove(position);
        } else {
            tracing::warn!(colony = %self.id, ?key, "removed ant was not listed in its colony");
        }
        self.stats.living_ants = self.stats.living_ants.saturating_sub(1);
        match kind {
            AntKind::Worker => self.stats.workers = self.stats.workers.saturating_sub(1),
            AntKind::Soldier => self.stats.soldiers = self.stats.soldiers.saturating_sub(1),
        }
    }

    /// Advances the economy by one tick and returns the kind of ant to
    /// hatch, if any.
    pub fn tick(&mut self, total_ticks: u64, rng: &mut SmallRng) -> Option<AntKind> {
        let birth = self.birth(total_ticks, rng);

        self.war_coefficient *= WAR_COEFFICIENT_DECAY + (1.0 - WAR_COEFFICIENT_DECAY) * self.aggressiveness;

        self.stats_timer.update(1);
        if self.stats_timer.is_ready() {
            self.stats_timer.wrap();
            self.store_stats(total_ticks);
        }

        if self.ants.is_empty() && birth.is_none() {
            self.stats.food = 0.0;
        } else if rng.random::<f32>() < BEACON_CHANCE {
            self.refresh_nest_pheromones();
        }

        birth
    }

    fn birth(&mut self, total_ticks: u64, rng: &mut SmallRng) -> Option<AntKind> {
        if self.ants_to_release > 0 {
            let kind = self.random_kind(rng);
            self.pay_for_birth();
            self.last_birth = total_ticks;
            return Some(kind);
        }

        let population = self.ants.len() as u32;
        if population >= self.ants_limit {
            return None;
        }

        let required = population as f32 * ANT_UPKEEP as f32;
        let surplus = self.stats.food - required;
        if surplus <= 0.0 {
            return None;
        }

        let ratio = surplus / (self.stats.food + required);
        let timeout = (BIRTH_TIMEOUT_BASE / ratio.powi(3)).round();
        if (self.last_birth as f32 + timeout) < total_ticks as f32 {
            let kind = self.random_kind(rng);
            self.pay_for_birth();
            self.last_birth = total_ticks;
            return Some(kind);
        }
        None
    }

    fn store_stats(&mut self, tick: u64) {
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(StatsSample {
            tick,
            stats: self.stats.clone(),
            war_coefficient: self.war_coefficient,
        });
    }

    /// Keeps a standing to-home beacon around the nest.
    pub fn refresh_nest_pheromones(&mut self) {
        self.pheromones.get_mut(PheromoneKind::ToHome).raise_ceiling(
            self.pos.x,
            self.pos.y,
            BEACON_DIAMETER,
            BEACON_VALUE,
            true,
        );
    }
}
