use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, TAU};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("garden must be at least {min}x{min} world units, got {width}x{height}")]
    GardenTooSmall { width: u32, height: u32, min: u32 },
    #[error("{name} needs at least 2 samples, got {value}")]
    TooFewSamples { name: &'static str, value: usize },
    #[error("{name} must be greater than zero")]
    ZeroTimeout { name: &'static str },
    #[error("pheromone dissipation must be finite and greater than 1, got {0}")]
    InvalidDissipation(f32),
    #[error("simulation speed must be finite and non-negative, got {0}")]
    InvalidSpeed(f32),
    #[error("at most {max} colonies are supported, asked for {requested}")]
    TooManyColonies { requested: usize, max: usize },
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
    pub garden: GardenConfig,
    pub simulation: SimulationSettings,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.garden.validate()?;
        self.simulation.validate()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GardenConfig {
    pub width: u32,
    pub height: u32,
    pub number_of_colonies: usize,
    pub starting_ants: u32,
    pub colony_size_limit: u32,
    pub horizontal_mirror: bool,
    pub vertical_mirror: bool,
    pub generation: GenerationConfig,
}

impl Default for GardenConfig {
    fn default() -> Self {
        Self {
            width: 5000,
            height: 5000,
            number_of_colonies: 4,
            starting_ants: 100,
            colony_size_limit: 500,
            horizontal_mirror: false,
            vertical_mirror: false,
            generation: GenerationConfig::default(),
        }
    }
}

/// Smallest garden edge: room for the map margin plus one coarse cell.
pub const MIN_GARDEN_SIZE: u32 = 100;

impl GardenConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.width < MIN_GARDEN_SIZE || self.height < MIN_GARDEN_SIZE {
            return Err(ConfigError::GardenTooSmall {
                width: self.width,
                height: self.height,
                min: MIN_GARDEN_SIZE,
            });
        }
        if self.number_of_colonies > shared::MAX_COLONIES {
            return Err(ConfigError::TooManyColonies {
                requested: self.number_of_colonies,
                max: shared::MAX_COLONIES,
            });
        }
        Ok(())
    }
}

/// Knobs for the noise-based terrain generator.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub food_enabled: bool,
    pub food_scale: f32,
    pub food_coverage: f32,
    pub food_richness: f32,
    pub rock_enabled: bool,
    pub rock_scale: f32,
    pub rock_coverage: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            food_enabled: true,
            food_scale: 0.2,
            food_coverage: 0.48,
            food_richness: 10.0,
            rock_enabled: true,
            rock_scale: 0.6,
            rock_coverage: 0.43,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationSettings {
    /// Ticks per frame, fractional values accumulate.
    pub speed: f32,
    pub paused: bool,
    /// Divisor applied to every pheromone cell once per decay sweep.
    pub pheromone_dissipation: f32,
    pub ant_seek_randomness: f32,
    /// Ticks needed for the decay sweep to touch every cell once.
    pub degradation_time: u32,
    pub corpse_decay_ticks: u32,
    pub corpse_tick_slices: u32,
    pub performance: PerformanceSettings,
    pub ants: AntTuning,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            paused: false,
            pheromone_dissipation: 1.009,
            ant_seek_randomness: 3.0,
            degradation_time: 180,
            corpse_decay_ticks: 10_800,
            corpse_tick_slices: 120,
            performance: PerformanceSettings::default(),
            ants: AntTuning::default(),
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(ConfigError::InvalidSpeed(self.speed));
        }
        if !self.pheromone_dissipation.is_finite() || self.pheromone_dissipation <= 1.0 {
            return Err(ConfigError::InvalidDissipation(self.pheromone_dissipation));
        }
        let timeouts = [
            ("degradation_time", self.degradation_time),
            ("corpse_tick_slices", self.corpse_tick_slices),
            ("ant_brain_tick_timeout", self.performance.ant_brain_tick_timeout),
            (
                "ant_gradient_check_tick_timeout",
                self.performance.ant_gradient_check_tick_timeout,
            ),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::ZeroTimeout { name });
            }
        }
        self.performance.pheromone_sampler.validate("pheromone_sampler")?;
        self.performance
            .precise_field_sampler
            .validate("precise_field_sampler")
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PerformanceSettings {
    pub ant_brain_tick_timeout: u32,
    pub ant_gradient_check_tick_timeout: u32,
    pub pheromone_sampler: SamplerConfig,
    pub precise_field_sampler: SamplerConfig,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            ant_brain_tick_timeout: 3,
            ant_gradient_check_tick_timeout: 180,
            pheromone_sampler: SamplerConfig {
                angle: FRAC_PI_2,
                angle_samples: 3,
                distance_samples: 3,
            },
            precise_field_sampler: SamplerConfig {
                angle: TAU,
                angle_samples: 10,
                distance_samples: 4,
            },
        }
    }
}

/// Angular cone sampled around the ant's heading.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct SamplerConfig {
    pub angle: f32,
    pub angle_samples: usize,
    pub distance_samples: usize,
}

impl SamplerConfig {
    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.angle_samples < 2 {
            return Err(ConfigError::TooFewSamples {
                name,
                value: self.angle_samples,
            });
        }
        if self.distance_samples == 0 {
            return Err(ConfigError::TooFewSamples {
                name,
                value: self.distance_samples,
            });
        }
        Ok(())
    }
}

/// Dispersal and marker tuning.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AntTuning {
    pub worker_max_disperse_ticks: u32,
    pub worker_disperse_timeout: u32,
    pub worker_disperse_strength: f32,
    pub soldier_max_disperse_ticks: u32,
    pub soldier_disperse_timeout: u32,
    pub soldier_disperse_strength: f32,
    pub food_here_marker: f32,
    pub enemy_here_marker: f32,
}

impl Default for AntTuning {
    fn default() -> Self {
        Self {
            worker_max_disperse_ticks: 4000,
            worker_disperse_timeout: 150,
            worker_disperse_strength: 1.1,
            soldier_max_disperse_ticks: 6000,
            soldier_disperse_timeout: 500,
            soldier_disperse_strength: 1.5,
            food_here_marker: 100.0,
            enemy_here_marker: 200.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: SimulationConfig = toml::from_str(
            r#"
            seed = 7

            [garden]
            width = 800
            height = 600

            [simulation.performance]
            ant_brain_tick_timeout = 5
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.seed, Some(7));
        assert_eq!(config.garden.width, 800);
        assert_eq!(config.garden.number_of_colonies, 4);
        assert_eq!(config.simulation.performance.ant_brain_tick_timeout, 5);
        assert_eq!(config.simulation.performance.ant_gradient_check_tick_timeout, 180);
        assert_eq!(config.simulation.ants, AntTuning::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = SimulationConfig::default();
        config.simulation.degradation_time = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroTimeout { name: "degradation_time" })
        );

        let mut config = SimulationConfig::default();
        config.simulation.pheromone_dissipation = 0.5;
        assert_eq!(config.validate(), Err(ConfigError::InvalidDissipation(0.5)));

        let mut config = SimulationConfig::default();
        config.simulation.performance.pheromone_sampler.angle_samples = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooFewSamples { name: "pheromone_sampler", .. })
        ));

        let mut config = SimulationConfig::default();
        config.garden.number_of_colonies = 40;
        assert!(matches!(config.validate(), Err(ConfigError::TooManyColonies { .. })));
    }
}
