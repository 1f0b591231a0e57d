//! Per-pixel lookup from position to particle
//!
//! Two single-owner maps (matter and energy) plus an independent stacking
//! count. Callers bounds-check coordinates before touching the maps.

use powdersim_simulation::{PackedCell, XRES, YRES, in_bounds};

#[inline]
fn idx(x: i32, y: i32) -> usize {
    (y * XRES + x) as usize
}

pub struct SpatialIndex {
    pmap: Vec<PackedCell>,
    photons: Vec<PackedCell>,
    pmap_count: Vec<u32>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        let size = (XRES * YRES) as usize;
        Self {
            pmap: vec![PackedCell::EMPTY; size],
            photons: vec![PackedCell::EMPTY; size],
            pmap_count: vec![0; size],
        }
    }

    /// Matter occupant of a pixel, empty when out of bounds
    #[inline]
    pub fn pmap(&self, x: i32, y: i32) -> PackedCell {
        if in_bounds(x, y) {
            self.pmap[idx(x, y)]
        } else {
            PackedCell::EMPTY
        }
    }

    /// Energy occupant of a pixel, empty when out of bounds
    #[inline]
    pub fn photon(&self, x: i32, y: i32) -> PackedCell {
        if in_bounds(x, y) {
            self.photons[idx(x, y)]
        } else {
            PackedCell::EMPTY
        }
    }

    #[inline]
    pub fn set_pmap(&mut self, x: i32, y: i32, cell: PackedCell) {
        if in_bounds(x, y) {
            self.pmap[idx(x, y)] = cell;
        }
    }

    #[inline]
    pub fn set_photon(&mut self, x: i32, y: i32, cell: PackedCell) {
        if in_bounds(x, y) {
            self.photons[idx(x, y)] = cell;
        }
    }

    /// Clear the matter entry only if it still points at `index`
    pub fn clear_pmap_if(&mut self, x: i32, y: i32, index: usize) {
        if in_bounds(x, y) && self.pmap[idx(x, y)].occupant() == Some(index) {
            self.pmap[idx(x, y)] = PackedCell::EMPTY;
        }
    }

    /// Clear the energy entry only if it still points at `index`
    pub fn clear_photon_if(&mut self, x: i32, y: i32, index: usize) {
        if in_bounds(x, y) && self.photons[idx(x, y)].occupant() == Some(index) {
            self.photons[idx(x, y)] = PackedCell::EMPTY;
        }
    }

    #[inline]
    pub fn count(&self, x: i32, y: i32) -> u32 {
        if in_bounds(x, y) {
            self.pmap_count[idx(x, y)]
        } else {
            0
        }
    }

    pub fn set_count(&mut self, x: i32, y: i32, count: u32) {
        if in_bounds(x, y) {
            self.pmap_count[idx(x, y)] = count;
        }
    }

    pub fn increment_count(&mut self, x: i32, y: i32) {
        if in_bounds(x, y) {
            self.pmap_count[idx(x, y)] += 1;
        }
    }

    /// Empty both maps and the stacking counts
    pub fn clear(&mut self) {
        self.pmap.fill(PackedCell::EMPTY);
        self.photons.fill(PackedCell::EMPTY);
        self.pmap_count.fill(0);
    }

    /// Snapshot used to compare rebuilds
    pub fn matter_map(&self) -> &[PackedCell] {
        &self.pmap
    }

    pub fn photon_map(&self) -> &[PackedCell] {
        &self.photons
    }

    pub fn counts(&self) -> &[u32] {
        &self.pmap_count
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}
