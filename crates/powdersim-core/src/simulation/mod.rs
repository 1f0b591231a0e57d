//! The particle simulation
//!
//! A [`Simulation`] owns every piece of mutable state: the particle store,
//! the matter and photon maps, the coarse air/gravity/wall grids, signs and
//! the random number generator. One call to [`Simulation::tick`] runs the
//! Before, Particles and After phases in order on the calling thread.

mod can_move;
mod heat;
mod legacy;
mod movement;
mod normals;
mod particles;
mod region;
mod scheduler;
mod spark;
mod update;

use powdersim_simulation::{CELL, ElementDescriptor, Elements, WallId, XCELLS, YCELLS};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

use crate::elements::{Behavior, ElementBehavior, default_behaviors};
use crate::fields::{AirGrid, FieldSolver, GravityGrid, StillAir};
use crate::rng::SimRng;
use crate::settings::{EdgeMode, SimSettings};
use crate::sign::Sign;
use crate::spatial::SpatialIndex;
use crate::store::ParticleStore;
use crate::walls::WallGrid;

pub use can_move::MoveTable;
pub use normals::{SurfaceProbe, get_wavelength_bin};
pub use region::LoadMode;
pub use scheduler::DebugStep;
pub(crate) use movement::remainder_p;

/// Complete simulation state
pub struct Simulation {
    /// Element registry
    pub elements: Elements,
    behaviors: Vec<Behavior>,
    /// Particle slots
    pub parts: ParticleStore,
    map: SpatialIndex,
    pub air: AirGrid,
    pub gravity: GravityGrid,
    pub walls: WallGrid,
    pub settings: SimSettings,
    pub signs: Vec<Sign>,
    can_move: MoveTable,
    rng: Box<dyn SimRng + Send>,
    solver: Box<dyn FieldSolver>,

    /// Skip the Before/Particles/After phases in `tick`
    pub paused: bool,
    tick_count: u64,
    /// Next particle the debug stepper will update, 0 at tick boundaries
    debug_current_particle: usize,
    force_stacking_check: bool,
    num_parts: usize,
}

impl Simulation {
    /// A simulation seeded from `settings.seed`
    pub fn new(settings: SimSettings) -> Self {
        let rng = Xoshiro256StarStar::seed_from_u64(settings.seed);
        Self::with_rng(settings, Box::new(rng))
    }

    /// A simulation drawing from a caller-supplied generator
    pub fn with_rng(settings: SimSettings, rng: Box<dyn SimRng + Send>) -> Self {
        let elements = Elements::new();
        let can_move = MoveTable::build(&elements);
        let ambient = settings.ambient_air_temp;
        let mut sim = Self {
            elements,
            behaviors: default_behaviors(),
            parts: ParticleStore::new(),
            map: SpatialIndex::new(),
            air: AirGrid::new(ambient),
            gravity: GravityGrid::new(),
            walls: WallGrid::new(),
            settings,
            signs: Vec::new(),
            can_move,
            rng,
            solver: Box::new(StillAir),
            paused: false,
            tick_count: 0,
            debug_current_particle: 0,
            force_stacking_check: false,
            num_parts: 0,
        };
        if sim.settings.edge_mode == EdgeMode::Solid {
            sim.draw_border_frame();
        }
        sim
    }

    /// Replace the external air/gravity solver
    pub fn set_solver(&mut self, solver: Box<dyn FieldSolver>) {
        self.solver = solver;
    }

    /// Let the field solver advance the air and gravity grids
    pub fn update_fields(&mut self) {
        self.gravity.enabled = self.settings.newtonian_gravity;
        self.solver.update_air(&mut self.air, &self.settings);
        if self.gravity.enabled {
            self.solver.update_gravity(&mut self.gravity);
        }
    }

    /// Reset particles, maps, grids, signs and counters
    pub fn clear_sim(&mut self) {
        self.parts.clear();
        self.map.clear();
        self.air.clear();
        self.air.clear_heat(self.settings.ambient_air_temp);
        self.air.blockair.fill(false);
        self.air.blockairh.fill(0);
        self.air.fvx.fill(0.0);
        self.air.fvy.fill(0.0);
        self.gravity.clear();
        self.walls.clear();
        self.signs.clear();
        self.num_parts = 0;
        self.debug_current_particle = 0;
        if self.settings.edge_mode == EdgeMode::Solid {
            self.draw_border_frame();
        }
    }

    /// Switch edge behaviour, adding or removing the solid border walls
    pub fn set_edge_mode(&mut self, mode: EdgeMode) {
        let previous = self.settings.edge_mode;
        self.settings.edge_mode = mode;
        if mode == EdgeMode::Solid {
            self.draw_border_frame();
        } else if previous == EdgeMode::Solid {
            self.erase_border_frame();
        }
    }

    fn draw_border_frame(&mut self) {
        self.set_border_frame(WallId::WALL);
    }

    fn erase_border_frame(&mut self) {
        self.set_border_frame(WallId::NONE);
    }

    fn set_border_frame(&mut self, wall: u8) {
        let w = XCELLS as i32;
        let h = YCELLS as i32;
        for cx in 0..w {
            self.walls.set_wall(cx, 0, wall);
            self.walls.set_wall(cx, h - 1, wall);
        }
        for cy in 1..h - 1 {
            self.walls.set_wall(0, cy, wall);
            self.walls.set_wall(w - 1, cy, wall);
        }
    }

    /// The element descriptor for a type id
    #[inline]
    pub fn element(&self, t: u16) -> &ElementDescriptor {
        self.elements.get(t)
    }

    /// The behavior handler of a type id
    #[inline]
    pub(crate) fn behavior(&self, t: u16) -> &'static dyn ElementBehavior {
        self.behaviors
            .get(t as usize)
            .copied()
            .unwrap_or_default()
            .handler()
    }

    /// Override the behavior of one element
    pub fn set_behavior(&mut self, t: u16, behavior: Behavior) {
        if let Some(slot) = self.behaviors.get_mut(t as usize) {
            *slot = behavior;
        }
    }

    /// Rebuild the move table after editing element descriptors
    pub fn rebuild_move_table(&mut self) {
        self.can_move = MoveTable::build(&self.elements);
    }

    pub fn move_table(&self) -> &MoveTable {
        &self.can_move
    }

    pub fn map(&self) -> &SpatialIndex {
        &self.map
    }

    pub(crate) fn rng(&mut self) -> &mut (dyn SimRng + Send) {
        self.rng.as_mut()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Live particles counted by the last reconcile
    pub fn num_parts(&self) -> usize {
        self.num_parts
    }

    pub fn debug_current_particle(&self) -> usize {
        self.debug_current_particle
    }

    /// Run the stacking check on the next Before phase
    pub fn force_stacking_check(&mut self) {
        self.force_stacking_check = true;
    }

    /// Pressure of the coarse cell containing pixel (x, y)
    #[inline]
    pub(crate) fn pv_at(&self, x: i32, y: i32) -> f32 {
        self.air.pv[crate::fields::cell_of(x, y)]
    }

    #[inline]
    pub(crate) fn pv_at_mut(&mut self, x: i32, y: i32) -> &mut f32 {
        &mut self.air.pv[crate::fields::cell_of(x, y)]
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimSettings::default())
    }
}

/// Coarse cell coordinates of a pixel
#[inline]
pub(crate) fn coarse(x: i32, y: i32) -> (i32, i32) {
    (x / CELL, y / CELL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use powdersim_simulation::{ElementId, WallId};

    #[test]
    fn test_new_simulation_is_empty() {
        let sim = Simulation::default();
        assert_eq!(sim.num_parts(), 0);
        assert_eq!(sim.tick_count(), 0);
        assert!(sim.parts.iter_live().next().is_none());
    }

    #[test]
    fn test_solid_edge_mode_draws_frame() {
        let mut sim = Simulation::default();
        sim.set_edge_mode(EdgeMode::Solid);
        assert_eq!(sim.walls.wall(0, 0), WallId::WALL);
        assert_eq!(sim.walls.wall(XCELLS as i32 - 1, 5), WallId::WALL);
        assert_eq!(sim.walls.wall(5, 5), WallId::NONE);
        sim.set_edge_mode(EdgeMode::Loop);
        assert_eq!(sim.walls.wall(0, 0), WallId::NONE);
    }

    #[test]
    fn test_clear_sim_keeps_frame_in_solid_mode() {
        let settings = SimSettings {
            edge_mode: EdgeMode::Solid,
            ..Default::default()
        };
        let mut sim = Simulation::new(settings);
        sim.walls.set_wall(10, 10, WallId::WALLELEC);
        sim.clear_sim();
        assert_eq!(sim.walls.wall(10, 10), WallId::NONE);
        assert_eq!(sim.walls.wall(0, 3), WallId::WALL);
    }

    #[test]
    fn test_behavior_override() {
        let mut sim = Simulation::default();
        sim.set_behavior(ElementId::DUST, Behavior::Ember);
        assert_eq!(sim.behaviors[ElementId::DUST as usize], Behavior::Ember);
        sim.set_behavior(9999, Behavior::Fire);
    }
}
