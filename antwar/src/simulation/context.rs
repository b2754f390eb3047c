use crate::config::SimulationSettings;

use super::sampler::FieldSampler;
use std::f32::consts::PI;

/// Rays cast by ants: the cheap cone, the wide precise fan and the
/// ahead/behind rays used to check the to-home gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct Samplers {
    pub pheromone: FieldSampler,
    pub precise: FieldSampler,
    pub direction: FieldSampler,
}

/// Hops the ahead/behind rays walk.
const DIRECTION_CHECK_DISTANCE: usize = 5;

impl Samplers {
    pub fn new(settings: &SimulationSettings) -> Self {
        Self {
            pheromone: FieldSampler::new(&settings.performance.pheromone_sampler),
            precise: FieldSampler::new(&settings.performance.precise_field_sampler),
            direction: FieldSampler::with_angles(vec![0.0, PI], DIRECTION_CHECK_DISTANCE),
        }
    }
}

/// Read-only inputs of a tick.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub settings: &'a SimulationSettings,
    pub samplers: &'a Samplers,
    pub total_ticks: u64,
}
