// Procedural terrain: rock pockets and food patches from layered simplex noise.
use noise::{NoiseFn, Simplex};
use rand::Rng;

use super::field::Field;
use super::garden::Garden;
use super::symmetry::SymmetryMode;
use crate::config::GenerationConfig;

/// Food is pushed away from rock by this share of the rock noise.
const ROCK_FOOD_REPULSION: f64 = 0.5;
const ROCK_FOOD_REPULSION_NO_ROCK: f64 = 0.15;

/// Weighted octaves of simplex noise, normalized into `[0, 1]`.
struct LayeredNoise {
    source: Simplex,
    layers: Vec<(f64, f64)>,
    total: f64,
}

impl LayeredNoise {
    /// `layers` are `(frequency, intensity)` pairs.
    fn new(seed: u32, layers: Vec<(f64, f64)>) -> Self {
        let total = layers.iter().map(|(_, intensity)| intensity).sum();
        Self {
            source: Simplex::new(seed),
            layers,
            total,
        }
    }

    fn at(&self, x: f64, y: f64) -> f64 {
        let value: f64 = self
            .layers
            .iter()
            .enumerate()
            .map(|(octave, (frequency, intensity))| {
                // Offset octaves so they don't all share the origin.
                let shift = octave as f64 * 1000.0;
                self.source.get([x * frequency + shift, y * frequency + shift]) * intensity
            })
            .sum();
        ((value + self.total) / self.total / 2.0).clamp(0.0, 1.0)
    }
}

impl Garden {
    /// Fills the food and rock fields from noise, then mirrors them
    /// according to the garden symmetry and recomputes segmentation.
    pub fn generate_terrain(&mut self, config: &GenerationConfig) {
        self.food_field.clear();
        self.rock_field.clear();

        let rock_noise = config.rock_enabled.then(|| {
            let frequency = 0.0177 / f64::from(config.rock_scale.max(f32::EPSILON));
            LayeredNoise::new(self.rng().random(), vec![(frequency, 1.0)])
        });
        if let Some(noise) = &rock_noise {
            let threshold = 1.0 - f64::from(config.rock_coverage);
            fill_cells(&mut self.rock_field, |x, y, _| {
                let value = noise.at(x, y);
                (value > threshold).then_some(value as f32)
            });
        }

        if config.food_enabled {
            let scale = f64::from(config.food_scale.max(f32::EPSILON));
            let layers = [(0.0025, 6.0), (0.005, 5.0), (0.007, 4.0), (0.016, 3.0), (0.022, 2.0), (0.077, 1.0)]
                .into_iter()
                .map(|(frequency, intensity)| (frequency / scale, intensity))
                .collect();
            let food_noise = LayeredNoise::new(self.rng().random(), layers);
            let threshold = 1.0 - f64::from(config.food_coverage);
            let rock = &self.rock_field;
            fill_cells(&mut self.food_field, |x, y, index| {
                if rock.data[index] != 0.0 {
                    return None;
                }
                let mut value = food_noise.at(x, y);
                value -= match &rock_noise {
                    Some(noise) => noise.at(x, y) * ROCK_FOOD_REPULSION,
                    None => ROCK_FOOD_REPULSION_NO_ROCK,
                };
                (value > threshold).then_some(config.food_richness)
            });
        }

        mirror_field(&mut self.rock_field, self.symmetry);
        mirror_field(&mut self.food_field, self.symmetry);
        self.preprocess_terrain();

        tracing::debug!(
            rock_cells = self.rock_field.data.iter().filter(|v| **v > 0.0).count(),
            food_cells = self.food_field.data.iter().filter(|v| **v > 0.0).count(),
            "terrain generated"
        );
    }
}

/// Writes `value(x, y, index)` into every cell where it returns a value.
fn fill_cells<F>(field: &mut Field, mut value: F)
where
    F: FnMut(f64, f64, usize) -> Option<f32>,
{
    let width = field.grid.width;
    for (index, cell) in field.data.iter_mut().enumerate() {
        let (x, y) = ((index % width) as f64, (index / width) as f64);
        if let Some(v) = value(x, y, index) {
            *cell = v;
        }
    }
}

/// Copies the first half of the field onto the second half, across the
/// mirror lines of `symmetry`.
fn mirror_field(field: &mut Field, symmetry: SymmetryMode) {
    let (width, height) = (field.grid.width, field.grid.height);
    let flip_x = matches!(symmetry, SymmetryMode::MirrorHorizontal | SymmetryMode::MirrorBoth);
    let flip_y = matches!(symmetry, SymmetryMode::MirrorVertical | SymmetryMode::MirrorBoth);

    if flip_x {
        for y in 0..height {
            for x in width / 2..width {
                field.data[y * width + x] = field.data[y * width + (width - 1 - x)];
            }
        }
    }
    if flip_y {
        for y in height / 2..height {
            for x in 0..width {
                field.data[y * width + x] = field.data[(height - 1 - y) * width + x];
            }
        }
    }
    if symmetry == SymmetryMode::Center {
        for y in height / 2..height {
            for x in 0..width {
                field.data[y * width + x] = field.data[(height - 1 - y) * width + (width - 1 - x)];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layered_noise_stays_normalized() {
        let noise = LayeredNoise::new(3, vec![(0.01, 3.0), (0.05, 1.0)]);
        for i in 0..500 {
            let v = noise.at(i as f64 * 1.7, i as f64 * 0.3);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn generated_food_never_lies_on_rock() {
        let mut garden = Garden::new(2000.0, 1500.0, 11);
        let config = GenerationConfig {
            food_coverage: 0.9,
            ..GenerationConfig::default()
        };
        garden.generate_terrain(&config);
        let rock = &garden.rock_field.data;
        let food = &garden.food_field.data;
        assert!(rock.iter().any(|v| *v > 0.0));
        assert!(food.iter().any(|v| *v > 0.0));
        assert!(rock.iter().zip(food).all(|(r, f)| *r == 0.0 || *f == 0.0));
        assert!(garden.rock_field.has_empty_areas());
    }

    #[test]
    fn disabled_layers_stay_empty() {
        let mut garden = Garden::new(500.0, 500.0, 12);
        let config = GenerationConfig {
            food_enabled: false,
            rock_enabled: false,
            ..GenerationConfig::default()
        };
        garden.generate_terrain(&config);
        assert!(garden.rock_field.data.iter().all(|v| *v == 0.0));
        assert!(garden.food_field.data.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn mirrored_terrain_is_symmetric() {
        let mut garden = Garden::new(1000.0, 800.0, 13);
        garden.symmetry = SymmetryMode::MirrorBoth;
        garden.generate_terrain(&GenerationConfig::default());
        let grid = garden.rock_field.grid;
        for y in 0..grid.height {
            for x in 0..grid.width {
                let here = garden.rock_field.data[y * grid.width + x];
                let across = garden.rock_field.data[y * grid.width + grid.width - 1 - x];
                let below = garden.rock_field.data[(grid.height - 1 - y) * grid.width + x];
                assert_eq!(here, across);
                assert_eq!(here, below);
            }
        }
    }
}
