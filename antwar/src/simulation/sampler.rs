use glam::Vec2;
use shared::fast_sin_cos;

use super::field::Field;
use super::pheromone::PheromoneField;
use crate::config::SamplerConfig;

/// Weight of a sample that ran into food while foraging.
pub const FOOD_SAMPLE_WEIGHT: f64 = 10_000.0;

/// Fan of rays cast from an ant, relative to its heading.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSampler {
    pub angles: Vec<f32>,
    pub distance_samples: usize,
}

/// Sampled ray totals and their maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct Samples {
    pub values: Vec<f64>,
    pub max: f64,
}

impl FieldSampler {
    /// `angle_samples` evenly spaced rays spanning `angle`, centred on the heading.
    pub fn new(config: &SamplerConfig) -> Self {
        let count = config.angle_samples.max(2);
        let step = config.angle / (count - 1) as f32;
        let angles = (0..count)
            .map(|i| -config.angle / 2.0 + step * i as f32)
            .collect();
        Self {
            angles,
            distance_samples: config.distance_samples,
        }
    }

    pub fn with_angles(angles: Vec<f32>, distance_samples: usize) -> Self {
        Self {
            angles,
            distance_samples,
        }
    }

    /// Walks each ray in `step` sized hops, summing `max_values^exponent`.
    /// Rock or the garden edge zeroes a ray. With `food` given, reaching a
    /// food cell adds [`FOOD_SAMPLE_WEIGHT`] and ends the ray.
    pub fn sample(
        &self,
        origin: Vec2,
        heading: f32,
        step: f32,
        field: &PheromoneField,
        rock: &Field,
        food: Option<&Field>,
        exponent: f64,
    ) -> Samples {
        let mut values = Vec::with_capacity(self.angles.len());
        let mut max = 0.0f64;

        for &angle in &self.angles {
            let (sin, cos) = fast_sin_cos(heading + angle);
            let hop = Vec2::new(cos, sin) * step;

            let mut total = 0.0f64;
            for i in 1..=self.distance_samples {
                let Some(index) = field.grid.checked_index(origin + hop * i as f32) else {
                    total = 0.0;
                    break;
                };
                if rock.data[index] != 0.0 {
                    total = 0.0;
                    break;
                }
                if food.is_some_and(|food| food.data[index] > 0.0) {
                    total += FOOD_SAMPLE_WEIGHT;
                    break;
                }
                total += (field.max_values[index] as f64).powf(exponent);
            }

            max = max.max(total);
            values.push(total);
        }

        Samples { values, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::field::Grid;
    use std::f32::consts::{FRAC_PI_2, PI, TAU};

    fn grid() -> Grid {
        Grid {
            width: 20,
            height: 20,
            cell_size: 10.0,
        }
    }

    #[test]
    fn angles_are_centred_on_heading() {
        let sampler = FieldSampler::new(&SamplerConfig {
            angle: FRAC_PI_2,
            angle_samples: 3,
            distance_samples: 3,
        });
        assert_eq!(sampler.angles.len(), 3);
        assert!((sampler.angles[0] + FRAC_PI_2 / 2.0).abs() < 1e-6);
        assert!(sampler.angles[1].abs() < 1e-6);

        let full = FieldSampler::new(&SamplerConfig {
            angle: TAU,
            angle_samples: 10,
            distance_samples: 4,
        });
        assert!((full.angles[0] + PI).abs() < 1e-5);
        assert!((full.angles[9] - PI).abs() < 1e-5);
    }

    #[test]
    fn rock_and_food_shape_the_samples() {
        let sampler = FieldSampler::with_angles(vec![-FRAC_PI_2, 0.0, FRAC_PI_2], 3);
        let mut trail = PheromoneField::new(grid());
        let mut rock = Field::new(grid());
        let mut food = Field::new(grid());
        let origin = Vec2::new(105.0, 105.0);

        // Ahead: a trail. Left (negative y): rock. Right: food two hops away.
        for x in 11..14 {
            trail.max_values[10 * 20 + x] = 0.5;
        }
        trail.max_values[9 * 20 + 10] = 1.0;
        rock.data[8 * 20 + 10] = 1.0;
        food.data[12 * 20 + 10] = 3.0;

        let samples = sampler.sample(origin, 0.0, 10.0, &trail, &rock, Some(&food), 1.0);
        assert_eq!(samples.values[0], 0.0, "rock blocks the ray");
        assert!((samples.values[1] - 1.5).abs() < 1e-6);
        assert_eq!(samples.values[2], FOOD_SAMPLE_WEIGHT);
        assert_eq!(samples.max, FOOD_SAMPLE_WEIGHT);

        let homebound = sampler.sample(origin, 0.0, 10.0, &trail, &rock, None, 1.0);
        assert_eq!(homebound.values[2], 0.0);
    }

    #[test]
    fn rays_leaving_the_garden_count_as_blocked() {
        let sampler = FieldSampler::with_angles(vec![PI], 3);
        let mut trail = PheromoneField::new(grid());
        trail.max_values.fill(1.0);
        let rock = Field::new(grid());
        let samples = sampler.sample(Vec2::new(15.0, 105.0), 0.0, 10.0, &trail, &rock, None, 1.0);
        assert_eq!(samples.values[0], 0.0);
    }
}
