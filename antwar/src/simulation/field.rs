use glam::Vec2;
use std::collections::VecDeque;

use super::symmetry::SymmetryMode;

/// Cell geometry shared by every grid laid over the garden.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub cell_size: f32,
}

/// One painted cell of a disk footprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stamp {
    pub index: usize,
    /// `radius + 1 - distance`, used by smooth painting.
    pub falloff: f32,
}

impl Stamp {
    /// Value a brush of `value` leaves here. Smooth strokes are meant to be added.
    #[inline]
    pub fn value(&self, value: f32, smooth: bool) -> f32 {
        if smooth {
            value + value * self.falloff
        } else {
            value
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DrawOptions {
    /// Additive soft brush instead of an overwrite.
    pub smooth: bool,
    pub symmetry: SymmetryMode,
}

impl Grid {
    /// Grid covering a `world_width` x `world_height` area.
    pub fn covering(world_width: f32, world_height: f32, cell_size: f32) -> Self {
        Self {
            width: ((world_width / cell_size).ceil() as usize).max(1),
            height: ((world_height / cell_size).ceil() as usize).max(1),
            cell_size,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Cell index of a world position. Coordinates outside the grid saturate
    /// to the border cell, so the result is always a valid index.
    #[inline]
    pub fn get_index(&self, x: f32, y: f32) -> usize {
        let cx = ((x / self.cell_size) as usize).min(self.width - 1);
        let cy = ((y / self.cell_size) as usize).min(self.height - 1);
        cy * self.width + cx
    }

    #[inline]
    pub fn index_of(&self, pos: Vec2) -> usize {
        self.get_index(pos.x, pos.y)
    }

    /// Index of a world position, or `None` when it lies outside the grid.
    #[inline]
    pub fn checked_index(&self, pos: Vec2) -> Option<usize> {
        if pos.x < 0.0 || pos.y < 0.0 || !pos.x.is_finite() || !pos.y.is_finite() {
            return None;
        }
        let cx = (pos.x / self.cell_size) as usize;
        let cy = (pos.y / self.cell_size) as usize;
        (cx < self.width && cy < self.height).then(|| cy * self.width + cx)
    }

    #[inline]
    pub fn cell_coords(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// Orthogonal neighbours that exist on the grid.
    pub fn neighbours(&self, index: usize) -> impl Iterator<Item = usize> {
        let (cx, cy) = self.cell_coords(index);
        let width = self.width;
        [
            (cx > 0).then(|| index - 1),
            (cx + 1 < self.width).then(|| index + 1),
            (cy > 0).then(|| index - width),
            (cy + 1 < self.height).then(|| index + width),
        ]
        .into_iter()
        .flatten()
    }

    /// Cells of a disk of `diameter` cells centred on the cell holding (x, y),
    /// plus its mirrored copies, clipped to the grid.
    pub fn footprint(&self, x: f32, y: f32, diameter: u32, symmetry: SymmetryMode) -> Vec<Stamp> {
        let center = Vec2::new(
            (x / self.cell_size).floor(),
            (y / self.cell_size).floor(),
        );
        let extent = Vec2::new(self.width as f32 - 1.0, self.height as f32 - 1.0);
        let radius = diameter as f32 / 2.0;

        let mut stamps = Vec::new();
        for at in symmetry.symmetric_positions(center, extent) {
            let min_x = (at.x - radius + 0.5).floor() as i64;
            let min_y = (at.y - radius + 0.5).floor() as i64;
            let xs = min_x.max(0)..(min_x + diameter as i64).min(self.width as i64);
            let ys = min_y.max(0)..(min_y + diameter as i64).min(self.height as i64);
            for cy in ys {
                for cx in xs.clone() {
                    let distance = Vec2::new(cx as f32 - at.x, cy as f32 - at.y).length();
                    if distance <= radius {
                        stamps.push(Stamp {
                            index: cy as usize * self.width + cx as usize,
                            falloff: radius + 1.0 - distance,
                        });
                    }
                }
            }
        }
        stamps
    }
}

const NO_SEGMENT: u32 = u32::MAX;

/// Connected components of zero-valued cells.
#[derive(Debug, Clone)]
struct EmptyAreas {
    segment_of: Vec<u32>,
    areas: Vec<usize>,
}

/// Flat scalar grid laid over the garden.
#[derive(Debug, Clone)]
pub struct Field {
    pub grid: Grid,
    pub data: Vec<f32>,
    empty_areas: Option<EmptyAreas>,
}

impl Field {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            data: vec![0.0; grid.len()],
            empty_areas: None,
        }
    }

    /// Wraps an existing buffer, `None` if its length doesn't match the grid.
    pub fn from_data(grid: Grid, data: Vec<f32>) -> Option<Self> {
        (data.len() == grid.len()).then(|| Self {
            grid,
            data,
            empty_areas: None,
        })
    }

    #[inline]
    pub fn get_index(&self, x: f32, y: f32) -> usize {
        self.grid.get_index(x, y)
    }

    #[inline]
    pub fn at(&self, pos: Vec2) -> f32 {
        self.data[self.grid.index_of(pos)]
    }

    /// Paints a disk of `value`. Plain strokes overwrite, so repeating one is a no-op.
    /// Smooth strokes add `value + value * (radius + 1 - distance)` per cell.
    pub fn draw(&mut self, x: f32, y: f32, diameter: u32, value: f32, options: DrawOptions) {
        self.draw_with(x, y, diameter, options.symmetry, |cell, stamp| {
            if options.smooth {
                *cell += stamp.value(value, true);
            } else {
                *cell = value;
            }
        });
    }

    /// Runs `paint` on every cell of the disk footprint.
    pub fn draw_with<F>(&mut self, x: f32, y: f32, diameter: u32, symmetry: SymmetryMode, mut paint: F)
    where
        F: FnMut(&mut f32, Stamp),
    {
        for stamp in self.grid.footprint(x, y, diameter, symmetry) {
            paint(&mut self.data[stamp.index], stamp);
        }
        self.empty_areas = None;
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.empty_areas = None;
    }

    /// Labels 4-connected regions of zero cells and records their areas.
    pub fn preprocess_empty_areas(&mut self) {
        let mut segment_of = vec![NO_SEGMENT; self.data.len()];
        let mut areas = Vec::new();
        let mut queue = VecDeque::new();

        for start in 0..self.data.len() {
            if self.data[start] != 0.0 || segment_of[start] != NO_SEGMENT {
                continue;
            }
            let segment = areas.len() as u32;
            let mut area = 0;
            segment_of[start] = segment;
            queue.push_back(start);
            while let Some(index) = queue.pop_front() {
                area += 1;
                for next in self.grid.neighbours(index) {
                    if self.data[next] == 0.0 && segment_of[next] == NO_SEGMENT {
                        segment_of[next] = segment;
                        queue.push_back(next);
                    }
                }
            }
            areas.push(area);
        }

        self.empty_areas = Some(EmptyAreas { segment_of, areas });
    }

    pub fn has_empty_areas(&self) -> bool {
        self.empty_areas.is_some()
    }

    /// Area in cells of the empty pocket holding `index`. `Some(0)` on an
    /// occupied cell, `None` until [`Field::preprocess_empty_areas`] ran.
    pub fn empty_area_at(&self, index: usize) -> Option<usize> {
        let areas = self.empty_areas.as_ref()?;
        match areas.segment_of.get(index) {
            Some(&NO_SEGMENT) | None => Some(0),
            Some(&segment) => Some(areas.areas[segment as usize]),
        }
    }
}
