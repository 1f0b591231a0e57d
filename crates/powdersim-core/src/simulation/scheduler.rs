//! Tick phases and the particle-by-particle debug stepper

use powdersim_simulation::{
    CELL, ElementId as E, MAX_TEMP, NPART, WallId, XCELLS, XRES, YCELLS, YRES, round_pos,
};

use super::Simulation;
use crate::elements::{Behavior, SlotHint};
use crate::fields::cell_at;

/// Stacked particles per pixel tolerated before the check considers converting them
const STACKING_THRESHOLD: u32 = 5;
/// Above this count conversion is certain (and in E-holes, the only trigger)
const STACKING_LIMIT: u32 = 1500;
/// Upper bound of the gravity strength given to the resulting black hole
const MAX_STACK_STRENGTH: u32 = 51200;

/// How far [`Simulation::particle_debug`] should advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugStep {
    /// Update the next live particle
    Next,
    /// Update every particle up to the one under (x, y), or to the end
    Through { x: i32, y: i32 },
}

/// Walls that stop air flow
fn blocks_air(wall: u8, charged: bool) -> bool {
    matches!(wall, WallId::WALL | WallId::WALLELEC | WallId::BLOCKAIR)
        || (wall == WallId::EWALL && !charged)
}

impl Simulation {
    /// Run one full tick
    ///
    /// Reconciles the maps first unless a debug step is in progress, then
    /// runs the Before, Particles and After phases unless paused.
    pub fn tick(&mut self) {
        if self.debug_current_particle == 0 {
            self.recalc_free_particles(true);
        }
        if !self.paused {
            self.update_before();
            self.update_particles(0, NPART);
            self.update_after();
            self.tick_count += 1;
        }
    }

    /// Wall bookkeeping, stacking check and per-element before hooks
    pub fn update_before(&mut self) {
        self.walls.decay_charges();
        for cy in 0..YCELLS {
            for cx in 0..XCELLS {
                let wall = self.walls.wall(cx as i32, cy as i32);
                let charged = self.walls.charge(cx as i32, cy as i32) != 0;
                let block = blocks_air(wall, charged);
                let cell = cell_at(cx, cy);
                self.air.blockair[cell] = block;
                self.air.blockairh[cell] = if block || wall == WallId::GRAV { 0x8 } else { 0 };
            }
        }

        if self.force_stacking_check || self.rng.chance(1, 10) {
            self.force_stacking_check = false;
            self.check_stacking();
        }

        for behavior in self.distinct_behaviors() {
            behavior.handler().before_tick(self);
        }
    }

    /// Update live particles with indices in `start..=end`
    ///
    /// The high-water mark is re-read every step so particles created
    /// during the loop are updated in the same pass.
    pub fn update_particles(&mut self, start: usize, end: usize) {
        let mut i = start;
        while i <= end && i <= self.parts.last_active() && i < self.parts.capacity() {
            if !self.parts[i].is_empty() {
                self.update_particle(i);
            }
            i += 1;
        }
    }

    /// Per-element after hooks
    pub fn update_after(&mut self) {
        for behavior in self.distinct_behaviors() {
            behavior.handler().after_tick(self);
        }
    }

    /// Each behavior in the table once, in element order
    fn distinct_behaviors(&self) -> Vec<Behavior> {
        let mut seen: Vec<Behavior> = Vec::new();
        for &behavior in self.behaviors.iter().skip(1) {
            if behavior != Behavior::Inert && !seen.contains(&behavior) {
                seen.push(behavior);
            }
        }
        seen
    }

    /// Turn pixels with excessive stacking into black holes
    ///
    /// Marked pixels get `NPART` added to their count. The first matter
    /// particle found on a marked pixel becomes NBHL with the excess as
    /// its strength, the rest stacked there are removed.
    fn check_stacking(&mut self) {
        let marker = NPART as u32;
        let mut found = 0usize;
        for y in 0..YRES {
            for x in 0..XRES {
                let count = self.map.count(x, y);
                if count <= STACKING_THRESHOLD {
                    continue;
                }
                let excessive = if self.walls.wall(x / CELL, y / CELL) == WallId::EHOLE {
                    count > STACKING_LIMIT
                } else {
                    count > STACKING_LIMIT || self.rng.between(0, 1599) as u32 <= count + 100
                };
                if excessive {
                    self.map.set_count(x, y, count + marker);
                    found += 1;
                }
            }
        }
        if found == 0 {
            return;
        }

        log::debug!("Stacking check found {found} overfull pixels");
        let mut i = 0;
        while i <= self.parts.last_active() && i < self.parts.capacity() {
            let part = self.parts[i];
            let (x, y) = (round_pos(part.x), round_pos(part.y));
            if part.is_empty()
                || x < 0
                || y < 0
                || x >= XRES
                || y >= YRES
                || self.elements.get(part.element).properties.is_energy()
            {
                i += 1;
                continue;
            }
            let count = self.map.count(x, y);
            if count > marker {
                self.part_create(SlotHint::Replace(i), x, y, E::NBHL);
                self.parts[i].temp = MAX_TEMP;
                self.parts[i].tmp = (count - marker).min(MAX_STACK_STRENGTH) as i32;
                self.map.set_count(x, y, marker);
            } else if count == marker {
                self.part_kill(i);
            }
            i += 1;
        }
    }

    /// Advance the simulation particle by particle
    ///
    /// The Before phase runs when the cursor is at the start of a tick and
    /// the After phase when it passes the end. Returns a message describing
    /// what was updated.
    pub fn particle_debug(&mut self, step: DebugStep) -> String {
        let current = self.debug_current_particle;
        let (last, message) = match step {
            DebugStep::Next => {
                if self.num_parts == 0 && self.parts.iter_live().next().is_none() {
                    return String::new();
                }
                let mut i = current;
                while i < NPART && (i >= self.parts.capacity() || self.parts[i].is_empty()) {
                    i += 1;
                }
                if i == NPART {
                    (i, "End of particles reached, updated sim".to_string())
                } else {
                    (i, format!("Updated particle #{i}"))
                }
            }
            DebugStep::Through { x, y } => match self.map.pmap(x, y).occupant() {
                Some(i) if i >= current => (i, format!("Updated particles #{current} through #{i}")),
                _ => (
                    NPART,
                    format!("Updated particles from #{current} to end, updated sim"),
                ),
            },
        };

        if current == 0 {
            self.recalc_free_particles(true);
            self.update_before();
        }
        self.update_particles(current, last);
        if last < NPART - 1 {
            self.debug_current_particle = last + 1;
        } else {
            self.update_after();
            self.tick_count += 1;
            self.debug_current_particle = 0;
        }
        log::debug!("{message}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SimSettings;
    use powdersim_simulation::ParticleFlags;

    fn sim() -> Simulation {
        Simulation::new(SimSettings {
            seed: 11,
            ..Default::default()
        })
    }

    #[test]
    fn test_tick_counts_and_pause() {
        let mut sim = sim();
        sim.tick();
        assert_eq!(sim.tick_count(), 1);
        sim.paused = true;
        sim.tick();
        assert_eq!(sim.tick_count(), 1);
    }

    #[test]
    fn test_paused_tick_still_reconciles() {
        let mut sim = sim();
        let i = sim.part_create(SlotHint::Auto, 50, 50, E::DUST).unwrap();
        sim.paused = true;
        sim.parts[i].x = 60.0;
        sim.tick();
        assert_eq!(sim.map().pmap(60, 50).occupant(), Some(i));
        assert_eq!(sim.parts[i].x, 60.0);
    }

    #[test]
    fn test_before_phase_blocks_air() {
        let mut sim = sim();
        sim.walls.set_wall(3, 3, WallId::WALL);
        sim.walls.set_wall(4, 3, WallId::GRAV);
        sim.walls.set_wall(5, 3, WallId::EWALL);
        sim.walls.set_charge(6, 3, 5);
        sim.update_before();
        assert!(sim.air.blockair[cell_at(3, 3)]);
        assert!(!sim.air.blockair[cell_at(4, 3)]);
        assert_eq!(sim.air.blockairh[cell_at(4, 3)], 0x8);
        assert!(sim.air.blockair[cell_at(5, 3)]);
        assert_eq!(sim.walls.charge(6, 3), 4);
    }

    #[test]
    fn test_forced_stacking_check_makes_black_hole() {
        let mut sim = sim();
        let mut stacked = Vec::new();
        for _ in 0..1600 {
            stacked.push(sim.part_create(SlotHint::Unchecked, 100, 100, E::DUST).unwrap());
        }
        sim.recalc_free_particles(false);
        assert_eq!(sim.map().count(100, 100), 1600);
        sim.force_stacking_check();
        sim.update_before();

        let first = sim.parts[stacked[0]];
        assert_eq!(first.element, E::NBHL);
        assert_eq!(first.temp, MAX_TEMP);
        assert_eq!(first.tmp, 1600);
        assert!(stacked[1..].iter().all(|&i| sim.parts[i].is_empty()));
    }

    #[test]
    fn test_light_stacking_is_tolerated() {
        let mut sim = sim();
        for _ in 0..5 {
            sim.part_create(SlotHint::Unchecked, 100, 100, E::DUST).unwrap();
        }
        sim.recalc_free_particles(false);
        sim.force_stacking_check();
        sim.update_before();
        assert_eq!(sim.element_count(E::DUST), 5);
        assert_eq!(sim.element_count(E::NBHL), 0);
    }

    #[test]
    fn test_update_particles_skips_range() {
        let mut sim = sim();
        let a = sim.part_create(SlotHint::Auto, 100, 100, E::DUST).unwrap();
        let b = sim.part_create(SlotHint::Auto, 200, 100, E::DUST).unwrap();
        sim.recalc_free_particles(false);
        sim.update_particles(b, b);
        assert_eq!(sim.parts[a].y, 100.0);
        assert!(sim.parts[b].y > 100.0 || sim.parts[b].flags.contains(ParticleFlags::STAGNANT));
    }

    #[test]
    fn test_debug_step_walks_particles() {
        let mut sim = sim();
        let a = sim.part_create(SlotHint::Auto, 100, 100, E::STNE).unwrap();
        let b = sim.part_create(SlotHint::Auto, 200, 100, E::STNE).unwrap();
        sim.recalc_free_particles(false);

        assert_eq!(sim.particle_debug(DebugStep::Next), format!("Updated particle #{a}"));
        assert_eq!(sim.debug_current_particle(), a + 1);
        assert_eq!(sim.particle_debug(DebugStep::Next), format!("Updated particle #{b}"));
        assert_eq!(sim.tick_count(), 0);
        let end = sim.particle_debug(DebugStep::Next);
        assert_eq!(end, "End of particles reached, updated sim");
        assert_eq!(sim.debug_current_particle(), 0);
        assert_eq!(sim.tick_count(), 1);
    }

    #[test]
    fn test_debug_step_through_position() {
        let mut sim = sim();
        sim.part_create(SlotHint::Auto, 100, 100, E::STNE).unwrap();
        let b = sim.part_create(SlotHint::Auto, 200, 100, E::STNE).unwrap();
        sim.part_create(SlotHint::Auto, 300, 100, E::STNE).unwrap();
        sim.recalc_free_particles(false);

        let msg = sim.particle_debug(DebugStep::Through { x: 200, y: 100 });
        assert_eq!(msg, format!("Updated particles #0 through #{b}"));
        assert_eq!(sim.debug_current_particle(), b + 1);
        let msg = sim.particle_debug(DebugStep::Through { x: -5, y: 0 });
        assert!(msg.ends_with("to end, updated sim"));
        assert_eq!(sim.debug_current_particle(), 0);
    }

    #[test]
    fn test_debug_step_on_empty_sim_does_nothing() {
        let mut sim = sim();
        assert_eq!(sim.particle_debug(DebugStep::Next), "");
        assert_eq!(sim.tick_count(), 0);
    }
}
