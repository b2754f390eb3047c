use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;

use antwar::config::{SimulationConfig, SimulationSettings};
use antwar::persistence;
use antwar::simulation::{
    AntKey, AntMode, ColonyKey, Garden, PheromoneKind, Samplers, Simulation, TickContext,
};
use glam::Vec2;
use shared::AntKind;

struct Harness {
    garden: Garden,
    settings: SimulationSettings,
    samplers: Samplers,
    ticks: u64,
}

impl Harness {
    fn new(width: f32, height: f32) -> Self {
        Self::with_settings(width, height, SimulationSettings::default())
    }

    fn with_settings(width: f32, height: f32, settings: SimulationSettings) -> Self {
        Self {
            garden: Garden::new(width, height, 42),
            samplers: Samplers::new(&settings),
            settings,
            ticks: 0,
        }
    }

    fn colony(&mut self, pos: Vec2) -> ColonyKey {
        let id = self.garden.place_colony(pos, 0, 100).expect("colony placed");
        self.garden.colony_key(id).expect("colony exists")
    }

    /// Releases an ant that stands still unless it attacks.
    fn still_ant(&mut self, colony: ColonyKey, kind: AntKind, pos: Vec2) -> AntKey {
        let key = self.garden.release_ant(colony, kind).expect("ant released");
        let ant = &mut self.garden.ants[key];
        ant.pos = pos;
        ant.speed = 0.0;
        key
    }

    fn tick(&mut self) {
        let ctx = TickContext {
            settings: &self.settings,
            samplers: &self.samplers,
            total_ticks: self.ticks,
        };
        self.garden.tick(&ctx);
        self.ticks += 1;
    }
}

#[test]
fn forager_brings_food_home_and_goes_out_again() {
    let mut h = Harness::new(600.0, 600.0);
    let nest = Vec2::new(300.0, 300.0);
    let colony = h.colony(nest);
    h.garden.paint_food(325.0, 305.0, 1, 1.0);
    let ant = h.still_ant(colony, AntKind::Worker, Vec2::new(325.0, 305.0));

    let mut picked_up = false;
    for _ in 0..30 {
        h.tick();
        picked_up |= h.garden.ants[ant].carrying_food;
        if h.garden.colonies[colony].stats.total_food > 0.0 {
            break;
        }
    }

    assert!(picked_up);
    assert_eq!(h.garden.food_field.at(Vec2::new(325.0, 305.0)), 0.0);
    let ant = &h.garden.ants[ant];
    assert_eq!(h.garden.colonies[colony].stats.total_food, 3.0);
    assert!(!ant.carrying_food);
    assert!(matches!(ant.mode, AntMode::SeekFood { .. }));
}

#[test]
fn forager_walks_to_food_and_carries_it_home() {
    let mut h = Harness::new(600.0, 600.0);
    let nest = Vec2::new(300.0, 300.0);
    let colony = h.colony(nest);
    h.garden.paint_food(400.0, 300.0, 9, 5.0);
    let food_before: f32 = h.garden.food_field.data.iter().sum();
    let ant = h.garden.release_ant(colony, AntKind::Worker).unwrap();
    {
        let ant = &mut h.garden.ants[ant];
        ant.rotation = 0.0;
        ant.max_energy = 1.0;
        ant.energy = 1.0;
    }

    let mut farthest = 0.0f32;
    let mut carried_home = false;
    for _ in 0..3000 {
        h.tick();
        let ant = &h.garden.ants[ant];
        farthest = farthest.max(ant.pos.distance(nest));
        carried_home |= ant.carrying_food
            && matches!(
                ant.mode,
                AntMode::ReturnHome {
                    trail: Some(PheromoneKind::ToFood),
                    ..
                }
            );
        if h.garden.colonies[colony].stats.total_food > 0.0 {
            break;
        }
    }

    assert!(carried_home);
    assert!(farthest > 50.0, "ant only got {farthest} away");
    assert_eq!(h.garden.colonies[colony].stats.total_food, 3.0);
    let ant = &h.garden.ants[ant];
    assert!(!ant.carrying_food);
    assert!(matches!(ant.mode, AntMode::SeekFood { .. }));
    assert!(ant.pos.distance(nest) < 45.0);

    let food_after: f32 = h.garden.food_field.data.iter().sum();
    assert!((food_before - food_after - 1.0).abs() < 1e-3);
    let to_food = h.garden.colonies[colony].pheromones.get(PheromoneKind::ToFood);
    assert!(to_food.data.iter().any(|v| *v > 0.0));
}

#[test]
fn worker_flees_in_the_tick_it_meets_an_enemy() {
    let mut h = Harness::new(600.0, 600.0);
    let home = h.colony(Vec2::new(100.0, 100.0));
    let enemies = h.colony(Vec2::new(500.0, 500.0));

    h.still_ant(enemies, AntKind::Worker, Vec2::new(330.0, 330.0));
    h.tick();

    let scout = h.still_ant(home, AntKind::Worker, Vec2::new(310.0, 310.0));
    assert!(matches!(h.garden.ants[scout].mode, AntMode::SeekFood { .. }));
    h.tick();

    let ant = &h.garden.ants[scout];
    assert!(matches!(
        ant.mode,
        AntMode::ReturnHome {
            trail: Some(PheromoneKind::ToEnemy),
            ..
        }
    ));
    let marker = h.garden.colonies[home].pheromones.get(PheromoneKind::EnemyHere);
    let cell = marker.grid.index_of(ant.pos);
    assert_eq!(marker.data[cell], h.settings.ants.enemy_here_marker);
}

#[test]
fn rock_reverts_the_move_and_turns_along_the_face() {
    let mut h = Harness::new(600.0, 600.0);
    let colony = h.colony(Vec2::new(100.0, 100.0));
    let ant = h.garden.release_ant(colony, AntKind::Worker).unwrap();
    let start = Vec2::new(308.0, 305.0);
    {
        let ant = &mut h.garden.ants[ant];
        ant.pos = start;
        ant.rotation = 0.0;
    }
    let wall = h.garden.rock_field.grid.index_of(Vec2::new(315.0, 305.0));
    h.garden.rock_field.data[wall] = 1.0;

    h.tick();

    let ant = &h.garden.ants[ant];
    assert_eq!(ant.pos, start);
    assert!((ant.rotation - FRAC_PI_2).abs() < 1e-5);
    assert_eq!(h.garden.rock_field.at(ant.pos + ant.velocity()), 0.0);
}

#[test]
fn soldier_hunts_down_an_intruder() {
    let mut h = Harness::new(600.0, 600.0);
    let guards = h.colony(Vec2::new(100.0, 100.0));
    let intruders = h.colony(Vec2::new(500.0, 500.0));
    let soldier = h.still_ant(guards, AntKind::Soldier, Vec2::new(300.0, 300.0));
    let worker = h.still_ant(intruders, AntKind::Worker, Vec2::new(310.0, 300.0));

    for _ in 0..200 {
        h.tick();
        if !h.garden.ants.contains_key(worker) {
            break;
        }
    }

    assert!(!h.garden.ants.contains_key(worker));
    assert!(h.garden.ants.contains_key(soldier));
    assert_eq!(h.garden.colonies[guards].stats.killed_enemy_ants, 1);
    assert_eq!(h.garden.colonies[intruders].stats.killed_ants, 1);
    assert_eq!(h.garden.colonies[intruders].stats.living_ants, 0);
    assert!(h.garden.colonies[intruders].ants.is_empty());
    assert_eq!(h.garden.corpses.len(), 1);
    assert_eq!(h.garden.ants[soldier].target, None);
}

#[test]
fn energy_only_drops_away_from_the_nest() {
    let mut h = Harness::new(1000.0, 1000.0);
    let colony = h.colony(Vec2::new(500.0, 500.0));
    let ant = h.garden.release_ant(colony, AntKind::Worker).unwrap();

    let mut energy = h.garden.ants[ant].energy;
    for _ in 0..300 {
        h.tick();
        let now = h.garden.ants[ant].energy;
        assert!(now < energy);
        energy = now;
    }
}

#[test]
fn energy_rises_only_on_nest_visits() {
    let mut h = Harness::new(600.0, 600.0);
    let nest = Vec2::new(300.0, 300.0);
    let colony = h.colony(nest);
    h.garden.colonies[colony].stats.food = 1000.0;
    let key = h.still_ant(colony, AntKind::Worker, nest);
    {
        let ant = &mut h.garden.ants[key];
        ant.energy = ant.max_energy * 0.5;
        ant.enter_return_home(&h.settings.ants);
    }

    let mut visits = 0;
    let mut energy = h.garden.ants[key].energy;
    for tick in 0..300 {
        let returning = matches!(h.garden.ants[key].mode, AntMode::ReturnHome { .. });
        h.tick();
        let ant = &h.garden.ants[key];
        if ant.energy >= energy {
            assert!(
                returning && matches!(ant.mode, AntMode::SeekFood { .. }),
                "energy rose without a visit at tick {tick}"
            );
            assert_eq!(ant.energy, ant.max_energy);
            visits += 1;
        }
        energy = ant.energy;
    }
    assert_eq!(visits, 1);
}

#[test]
fn trails_fade_out_without_deposits() {
    let settings = SimulationSettings {
        degradation_time: 10,
        pheromone_dissipation: 1.5,
        ..SimulationSettings::default()
    };
    let mut h = Harness::with_settings(400.0, 400.0, settings);
    let colony = h.colony(Vec2::new(200.0, 200.0));
    for kind in [PheromoneKind::ToFood, PheromoneKind::ToEnemy] {
        let field = h.garden.colonies[colony].pheromones.get_mut(kind);
        field.data.fill(1.0);
        field.max_values.fill(1.0);
    }

    let epsilon: f32 = 1e-6;
    let passes = ((1.0 / epsilon).ln() / 1.5f32.ln()).ceil() as u64;
    for _ in 0..(passes + 1) * 10 {
        h.tick();
    }

    for kind in PheromoneKind::TRAILS {
        let field = h.garden.colonies[colony].pheromones.get(kind);
        assert!(field.data.iter().all(|v| *v <= epsilon));
        // The nest beacon starts higher than 1.
        assert!(field.max_values.iter().all(|v| *v <= epsilon * 10.0));
    }
}

fn small_config(seed: u64) -> SimulationConfig {
    let mut config = SimulationConfig {
        seed: Some(seed),
        ..SimulationConfig::default()
    };
    config.garden.width = 700;
    config.garden.height = 700;
    config.garden.number_of_colonies = 3;
    config.garden.starting_ants = 40;
    config
}

#[test]
fn populations_and_masks_stay_consistent() {
    let mut sim = Simulation::new(&small_config(5)).unwrap();
    sim.apply(shared::Command::AddAnts {
        colony: shared::ColonyId(1),
        kind: AntKind::Soldier,
        count: 15,
    })
    .unwrap();

    for tick in 0..600 {
        sim.tick();
        if tick % 20 != 0 {
            continue;
        }
        let garden = &sim.garden;

        for (key, colony) in &garden.colonies {
            let owned = garden.ants().filter(|ant| ant.colony() == key).count();
            assert_eq!(colony.stats.living_ants as usize, colony.ants.len());
            assert_eq!(colony.ants.len(), owned);
        }

        let occupancy = &garden.occupancy;
        let mut expected = vec![0u32; occupancy.grid.len()];
        let mut counts: HashMap<(usize, u32), u32> = HashMap::new();
        for ant in garden.ants() {
            if let Some(cell) = ant.ants_cell() {
                let bit_id = garden.colonies[ant.colony()].bit_id;
                expected[cell] |= bit_id;
                *counts.entry((cell, bit_id)).or_default() += 1;
            }
        }
        for (cell, mask) in expected.iter().enumerate() {
            assert_eq!(occupancy.mask(cell), *mask, "cell {cell} at tick {tick}");
            for colony in garden.colonies() {
                let count = counts.get(&(cell, colony.bit_id)).copied().unwrap_or(0);
                assert_eq!(occupancy.count(cell, colony.bit_id), count);
            }
        }
    }
}

#[test]
fn saved_garden_loads_into_a_fresh_simulation() {
    let mut sim = Simulation::new(&small_config(8)).unwrap();
    for _ in 0..50 {
        sim.tick();
    }
    let snapshot = sim.dump();
    let path = std::env::temp_dir().join(format!("antwar-scenario-{}.bin", std::process::id()));
    persistence::save_snapshot(&path, &snapshot).unwrap();
    let loaded = persistence::load_snapshot(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let mut other = Simulation::new(&small_config(9)).unwrap();
    other.load(&loaded).unwrap();
    assert_eq!(other.dump(), snapshot);
    for _ in 0..3 {
        other.tick();
    }
    assert_eq!(other.total_ant_count(), 3 * 3);
}
