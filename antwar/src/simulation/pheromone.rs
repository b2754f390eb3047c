use super::field::{Grid, Stamp};
use super::symmetry::SymmetryMode;

/// The five fields every colony lays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PheromoneKind {
    ToFood,
    ToHome,
    ToEnemy,
    FoodHere,
    EnemyHere,
}

impl PheromoneKind {
    /// Fields ants navigate by; these are the ones global dissipation touches.
    pub const TRAILS: [PheromoneKind; 3] = [
        PheromoneKind::ToFood,
        PheromoneKind::ToHome,
        PheromoneKind::ToEnemy,
    ];
}

/// Pheromone concentration plus the strongest signal each cell has carried.
/// Deposits keep `0 <= data[i] <= max_values[i]`.
#[derive(Debug, Clone)]
pub struct PheromoneField {
    pub grid: Grid,
    pub data: Vec<f32>,
    pub max_values: Vec<f32>,
}

impl PheromoneField {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            data: vec![0.0; grid.len()],
            max_values: vec![0.0; grid.len()],
        }
    }

    /// Adds `value` at `index` unless the cell already exceeds `relative_max`.
    /// Positive deposits lift the cell ceiling to `relative_max`, negative ones
    /// pull it down by the same amount. A quarter of the applied change spills
    /// into each orthogonal neighbour, bounded by that neighbour's ceiling.
    pub fn drop_pheromone(&mut self, index: usize, value: f32, relative_max: f32) {
        let ceiling = &mut self.max_values[index];
        if value >= 0.0 {
            *ceiling = ceiling.max(relative_max);
        } else {
            *ceiling = (*ceiling + value).max(0.0);
        }
        let ceiling = *ceiling;

        let current = self.data[index];
        if current > relative_max && value >= 0.0 {
            return;
        }
        let updated = (current + value).clamp(0.0, ceiling);
        self.data[index] = updated;

        let spill = (updated - current) / 4.0;
        if spill == 0.0 {
            return;
        }
        for neighbour in self.grid.neighbours(index) {
            let cell = &mut self.data[neighbour];
            *cell = (*cell + spill).clamp(0.0, self.max_values[neighbour].max(0.0));
        }
    }

    /// Weakens the trail at `index` and its orthogonal neighbours.
    pub fn disperse_pheromone(&mut self, index: usize, strength: f32) {
        if strength <= 0.0 {
            return;
        }
        self.data[index] /= strength;
        self.max_values[index] /= strength;
        for neighbour in self.grid.neighbours(index) {
            self.data[neighbour] /= strength;
            self.max_values[neighbour] /= strength;
        }
    }

    /// Multiplies one cell by `factor` (< 1).
    #[inline]
    pub fn dissipate_cell(&mut self, index: usize, factor: f32) {
        if self.data[index] > 0.0 || self.max_values[index] > 0.0 {
            self.data[index] *= factor;
            self.max_values[index] *= factor;
        }
    }

    /// Raises ceilings on a disk to at least the brush value. Used as a
    /// standing beacon, e.g. around a nest, without touching concentrations.
    pub fn raise_ceiling(&mut self, x: f32, y: f32, diameter: u32, value: f32, smooth: bool) {
        let stamps: Vec<Stamp> = self.grid.footprint(x, y, diameter, SymmetryMode::None);
        for stamp in stamps {
            let ceiling = &mut self.max_values[stamp.index];
            *ceiling = ceiling.max(stamp.value(value, smooth));
        }
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.max_values.fill(0.0);
    }
}

/// Five fields keyed by [`PheromoneKind`].
#[derive(Debug, Clone)]
pub struct PheromoneSet {
    fields: [PheromoneField; 5],
}

impl PheromoneSet {
    pub fn new(grid: Grid) -> Self {
        Self {
            fields: std::array::from_fn(|_| PheromoneField::new(grid)),
        }
    }

    #[inline]
    fn slot(kind: PheromoneKind) -> usize {
        match kind {
            PheromoneKind::ToFood => 0,
            PheromoneKind::ToHome => 1,
            PheromoneKind::ToEnemy => 2,
            PheromoneKind::FoodHere => 3,
            PheromoneKind::EnemyHere => 4,
        }
    }

    #[inline]
    pub fn get(&self, kind: PheromoneKind) -> &PheromoneField {
        &self.fields[Self::slot(kind)]
    }

    #[inline]
    pub fn get_mut(&mut self, kind: PheromoneKind) -> &mut PheromoneField {
        &mut self.fields[Self::slot(kind)]
    }

    pub fn clear(&mut self) {
        for field in &mut self.fields {
            field.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn grid() -> Grid {
        Grid {
            width: 8,
            height: 6,
            cell_size: 10.0,
        }
    }

    fn assert_bounded(field: &PheromoneField) {
        for i in 0..field.data.len() {
            assert!(field.data[i] >= 0.0, "negative concentration at {}", i);
            assert!(
                field.data[i] <= field.max_values[i],
                "cell {} holds {} above its ceiling {}",
                i,
                field.data[i],
                field.max_values[i]
            );
        }
    }

    #[test]
    fn deposit_is_capped_by_relative_max() {
        let mut field = PheromoneField::new(grid());
        for _ in 0..1000 {
            field.drop_pheromone(10, 0.01, 0.5);
        }
        assert!(field.data[10] <= 0.5 + 0.01);
        assert!(field.data[10] > 0.49);
        assert_eq!(field.max_values[10], 0.5);
    }

    #[test]
    fn deposit_spills_only_under_neighbour_ceilings() {
        let mut field = PheromoneField::new(grid());
        field.max_values[11] = 1.0;
        field.drop_pheromone(10, 0.4, 1.0);
        assert!((field.data[10] - 0.4).abs() < 1e-6);
        assert!((field.data[11] - 0.1).abs() < 1e-6);
        assert_eq!(field.data[9], 0.0, "neighbour without a ceiling stays empty");
    }

    #[test]
    fn disperse_divides_cell_and_neighbours() {
        let mut field = PheromoneField::new(grid());
        field.data.fill(1.0);
        field.max_values.fill(2.0);
        field.disperse_pheromone(9, 2.0);
        for i in [9, 8, 10, 1, 17] {
            assert_eq!(field.data[i], 0.5);
            assert_eq!(field.max_values[i], 1.0);
        }
        assert_eq!(field.data[0], 1.0);
    }

    #[test]
    fn random_operations_keep_concentration_under_ceiling() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut field = PheromoneField::new(grid());
        let cells = field.data.len();
        for _ in 0..20_000 {
            let index = rng.random_range(0..cells);
            match rng.random_range(0..4) {
                0 | 1 => {
                    let value = rng.random_range(0.0..0.05);
                    let relative_max = rng.random_range(0.01..1.0);
                    field.drop_pheromone(index, value, relative_max);
                }
                2 => field.disperse_pheromone(index, rng.random_range(1.0..2.0)),
                _ => field.dissipate_cell(index, 1.0 / 1.009),
            }
        }
        assert_bounded(&field);
    }

    #[test]
    fn beacon_never_lowers_a_ceiling() {
        let mut field = PheromoneField::new(grid());
        field.max_values[0] = 50.0;
        field.raise_ceiling(5.0, 5.0, 3, 2.0, true);
        assert_eq!(field.max_values[0], 50.0);
        assert!(field.max_values[1] > 2.0);
        assert!(field.data.iter().all(|&v| v == 0.0));
    }
}
