use glam::Vec2;
use shared::{AntKind, ColonyId};

use super::Timer;
use super::ant::Ant;
use super::colony::Colony;

/// Remains of a dead ant, fading out linearly.
#[derive(Debug, Clone)]
pub struct Corpse {
    pub pos: Vec2,
    pub rotation: f32,
    pub kind: AntKind,
    pub colony: ColonyId,
    pub decay: Timer,
}

impl Corpse {
    pub fn new(ant: &Ant, colony: &Colony, decay_ticks: u32) -> Self {
        Self {
            pos: ant.pos,
            rotation: ant.rotation,
            kind: ant.kind,
            colony: colony.id,
            decay: Timer::new(decay_ticks, 0),
        }
    }

    /// Ages the corpse by `ticks`. Returns true once it has fully decayed.
    pub fn age(&mut self, ticks: u32) -> bool {
        self.decay.update(ticks);
        self.decay.is_ready()
    }

    /// Remaining visibility, 1 when fresh and 0 when gone.
    pub fn opacity(&self) -> f32 {
        1.0 - self.decay.progress()
    }
}
