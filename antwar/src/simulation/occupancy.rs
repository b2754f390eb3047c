use std::collections::HashMap;

use super::ant::AntKey;
use super::field::Grid;
use shared::MAX_COLONIES;

/// Coarse presence index over the garden.
///
/// Every cell keeps a bitmask of the colonies with ants in it. Per-colony
/// head counts make the mask exact: a bit clears only when the last ant of
/// that colony walks out. Resident lists are sparse and only filled by ants
/// that actually need to look for neighbours (enemy contact).
#[derive(Debug, Clone)]
pub struct Occupancy {
    pub grid: Grid,
    masks: Vec<u32>,
    counts: Vec<u32>,
    residents: HashMap<usize, Vec<AntKey>>,
}

#[inline]
fn slot_of(bit_id: u32) -> usize {
    bit_id.trailing_zeros() as usize
}

impl Occupancy {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            masks: vec![0; grid.len()],
            counts: vec![0; grid.len() * MAX_COLONIES],
            residents: HashMap::new(),
        }
    }

    #[inline]
    pub fn mask(&self, cell: usize) -> u32 {
        self.masks[cell]
    }

    /// True when some colony other than `bit_id` is present in `cell`.
    #[inline]
    pub fn has_enemy(&self, cell: usize, bit_id: u32) -> bool {
        self.masks[cell] & !bit_id != 0
    }

    pub fn count(&self, cell: usize, bit_id: u32) -> u32 {
        self.counts[cell * MAX_COLONIES + slot_of(bit_id)]
    }

    pub fn enter(&mut self, cell: usize, bit_id: u32) {
        self.counts[cell * MAX_COLONIES + slot_of(bit_id)] += 1;
        self.masks[cell] |= bit_id;
    }

    pub fn leave(&mut self, cell: usize, bit_id: u32) {
        let count = &mut self.counts[cell * MAX_COLONIES + slot_of(bit_id)];
        if *count == 0 {
            tracing::warn!(cell, bit_id, "leaving a cell the colony was not counted in");
            return;
        }
        *count -= 1;
        if *count == 0 {
            self.masks[cell] &= !bit_id;
        }
    }

    pub fn register_ant_in_cell(&mut self, cell: usize, key: AntKey) {
        self.residents.entry(cell).or_default().push(key);
    }

    /// Returns false when the ant wasn't listed in `cell`.
    pub fn unregister_ant_from_cell(&mut self, cell: usize, key: AntKey) -> bool {
        let Some(list) = self.residents.get_mut(&cell) else {
            return false;
        };
        let Some(position) = list.iter().position(|&k| k == key) else {
            return false;
        };
        list.swap_remove(position);
        if list.is_empty() {
            self.residents.remove(&cell);
        }
        true
    }

    pub fn ants_in_cell(&self, cell: usize) -> &[AntKey] {
        self.residents.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.masks.fill(0);
        self.counts.fill(0);
        self.residents.clear();
    }
}
