//! Particle records and packed spatial-map entries

use crate::grid::{PMAPBITS, PMAPMASK, ROOM_TEMP};
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Per-particle state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ParticleFlags: u32 {
        /// Movement failed last tick
        const STAGNANT = 0x1;
        /// Do not move this tick
        const SKIPMOVE = 0x2;
        const WATEREQUAL = 0x4;
        const PHOTDECO = 0x8;
        const EXPLODE = 0x10;
        const DISAPPEAR = 0x20;
    }
}

/// One slot of the particle store
///
/// `element == 0` marks a free slot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub element: u16,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub life: i32,
    /// Carried type or colour, meaning depends on the element
    pub ctype: i32,
    /// Kelvin
    pub temp: f32,
    pub tmp: i32,
    pub tmp2: i32,
    pub pavg: [f32; 2],
    /// ARGB decoration colour
    pub dcolour: u32,
    pub flags: ParticleFlags,
}

impl Particle {
    /// A free slot
    pub const EMPTY: Particle = Particle {
        element: 0,
        x: 0.0,
        y: 0.0,
        vx: 0.0,
        vy: 0.0,
        life: 0,
        ctype: 0,
        temp: 0.0,
        tmp: 0,
        tmp2: 0,
        pavg: [0.0; 2],
        dcolour: 0,
        flags: ParticleFlags::empty(),
    };

    pub fn new(element: u16, x: f32, y: f32) -> Self {
        Self {
            element,
            x,
            y,
            temp: ROOM_TEMP,
            ..Self::EMPTY
        }
    }

    pub fn is_empty(&self) -> bool {
        self.element == 0
    }
}

impl Default for Particle {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// A spatial-map entry packing a particle index with its element type
///
/// Layout is `index << PMAPBITS | element`; zero means the cell is empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackedCell(u32);

impl PackedCell {
    pub const EMPTY: PackedCell = PackedCell(0);

    #[inline]
    pub fn new(index: usize, element: u16) -> Self {
        Self(((index as u32) << PMAPBITS) | (element as u32 & PMAPMASK))
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn index(self) -> usize {
        (self.0 >> PMAPBITS) as usize
    }

    #[inline]
    pub fn element(self) -> u16 {
        (self.0 & PMAPMASK) as u16
    }

    /// The occupant index, if any
    #[inline]
    pub fn occupant(self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(self.index())
        }
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{NPART, PT_NUM};

    #[test]
    fn test_packed_cell_roundtrip() {
        let cell = PackedCell::new(1234, 45);
        assert_eq!(cell.index(), 1234);
        assert_eq!(cell.element(), 45);
        assert!(!cell.is_empty());
        assert_eq!(cell.occupant(), Some(1234));
    }

    #[test]
    fn test_packed_cell_extremes_fit() {
        let cell = PackedCell::new(NPART - 1, (PT_NUM - 1) as u16);
        assert_eq!(cell.index(), NPART - 1);
        assert_eq!(cell.element(), (PT_NUM - 1) as u16);
    }

    #[test]
    fn test_packed_cell_empty() {
        assert!(PackedCell::EMPTY.is_empty());
        assert_eq!(PackedCell::EMPTY.occupant(), None);
    }

    #[test]
    fn test_new_particle_defaults() {
        let p = Particle::new(2, 10.0, 20.0);
        assert_eq!(p.temp, ROOM_TEMP);
        assert!(!p.is_empty());
        assert!(Particle::default().is_empty());
    }
}
