//! Coarse air and gravity grids
//!
//! The solvers that evolve these fields run outside the tick pipeline and
//! are plugged in through [`FieldSolver`]. Particles only read and nudge
//! the most recently published values.

use glam::Vec2;
use powdersim_simulation::{CELL, XCELLS, YCELLS};

use crate::settings::SimSettings;

/// Index of a coarse cell from coarse coordinates
#[inline]
pub fn cell_at(cx: usize, cy: usize) -> usize {
    cy * XCELLS + cx
}

/// Index of the coarse cell containing a pixel
#[inline]
pub fn cell_of(x: i32, y: i32) -> usize {
    cell_at((x / CELL) as usize, (y / CELL) as usize)
}

/// Per-cell air state
pub struct AirGrid {
    /// Pressure
    pub pv: Vec<f32>,
    pub vx: Vec<f32>,
    pub vy: Vec<f32>,
    /// Ambient heat, Kelvin
    pub hv: Vec<f32>,
    /// Walls that stop air flow
    pub blockair: Vec<bool>,
    /// Walls that stop ambient heat, `0x8` when blocking, low bits count particle blocks
    pub blockairh: Vec<u8>,
    /// Fan velocities
    pub fvx: Vec<f32>,
    pub fvy: Vec<f32>,
}

impl AirGrid {
    pub fn new(ambient_temp: f32) -> Self {
        let size = XCELLS * YCELLS;
        Self {
            pv: vec![0.0; size],
            vx: vec![0.0; size],
            vy: vec![0.0; size],
            hv: vec![ambient_temp; size],
            blockair: vec![false; size],
            blockairh: vec![0; size],
            fvx: vec![0.0; size],
            fvy: vec![0.0; size],
        }
    }

    /// Reset pressure and velocity
    pub fn clear(&mut self) {
        self.pv.fill(0.0);
        self.vx.fill(0.0);
        self.vy.fill(0.0);
    }

    /// Reset ambient heat to a uniform temperature
    pub fn clear_heat(&mut self, ambient_temp: f32) {
        self.hv.fill(ambient_temp);
    }
}

/// Newtonian gravity field sampled per coarse cell
pub struct GravityGrid {
    pub gravx: Vec<f32>,
    pub gravy: Vec<f32>,
    /// Gravity mass deposited by particles this frame
    pub mass: Vec<f32>,
    pub enabled: bool,
}

impl GravityGrid {
    pub fn new() -> Self {
        let size = XCELLS * YCELLS;
        Self {
            gravx: vec![0.0; size],
            gravy: vec![0.0; size],
            mass: vec![0.0; size],
            enabled: false,
        }
    }

    /// Field at a pixel, zero when disabled
    pub fn sample(&self, x: i32, y: i32) -> Vec2 {
        if !self.enabled {
            return Vec2::ZERO;
        }
        let cell = cell_of(x, y);
        Vec2::new(self.gravx[cell], self.gravy[cell])
    }

    pub fn clear(&mut self) {
        self.gravx.fill(0.0);
        self.gravy.fill(0.0);
        self.mass.fill(0.0);
    }
}

impl Default for GravityGrid {
    fn default() -> Self {
        Self::new()
    }
}

/// External solver for the air and gravity fields
pub trait FieldSolver: Send {
    /// Advance pressure, velocity and ambient heat
    fn update_air(&mut self, _air: &mut AirGrid, _settings: &SimSettings) {}

    /// Recompute the gravity field from the deposited mass
    fn update_gravity(&mut self, _gravity: &mut GravityGrid) {}
}

/// Leaves every field as it is
#[derive(Default)]
pub struct StillAir;

impl FieldSolver for StillAir {}

#[cfg(test)]
mod tests {
    use super::*;
    use powdersim_simulation::{XRES, YRES};

    #[test]
    fn test_cell_of_corners() {
        assert_eq!(cell_of(0, 0), 0);
        assert_eq!(cell_of(XRES - 1, YRES - 1), XCELLS * YCELLS - 1);
        assert_eq!(cell_of(CELL, CELL), cell_at(1, 1));
    }

    #[test]
    fn test_gravity_disabled_samples_zero() {
        let mut grav = GravityGrid::new();
        grav.gravx[cell_of(8, 8)] = 3.0;
        assert_eq!(grav.sample(8, 8), Vec2::ZERO);
        grav.enabled = true;
        assert_eq!(grav.sample(8, 8), Vec2::new(3.0, 0.0));
    }

    #[test]
    fn test_still_air_changes_nothing() {
        let mut air = AirGrid::new(295.15);
        air.pv[5] = 2.0;
        let mut solver = StillAir;
        solver.update_air(&mut air, &SimSettings::default());
        assert_eq!(air.pv[5], 2.0);
        air.clear();
        assert_eq!(air.pv[5], 0.0);
        assert_eq!(air.hv[5], 295.15);
    }
}
