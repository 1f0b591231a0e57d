//! One particle's update: kill checks, air coupling, heat, transitions,
//! element behavior and finally movement

use glam::Vec2;
use powdersim_simulation::{
    CELL, CFDS, ElementId as E, MAX_TEMP, MIN_TEMP, PackedCell, ParticleFlags, Properties as P,
    WallId, XCELLS, XRES, YCELLS, YRES, in_bounds, restrict_flt, round_pos,
};

use super::Simulation;
use crate::elements::{SlotHint, UpdateContext};
use crate::fields::{cell_at, cell_of};

/// Walls that destroy particles of this element standing in them
fn wall_kills(wall: u8, props: P, charge: u8) -> bool {
    match wall {
        WallId::WALL | WallId::WALLELEC | WallId::ALLOWAIR | WallId::DESTROYALL => true,
        WallId::ALLOWLIQUID => !props.contains(P::TYPE_LIQUID),
        WallId::ALLOWPOWDER => !props.contains(P::TYPE_PART),
        WallId::ALLOWGAS => !props.contains(P::TYPE_GAS),
        WallId::ALLOWENERGY => !props.contains(P::TYPE_ENERGY),
        WallId::EWALL => charge == 0,
        _ => false,
    }
}

/// Wall cell a conductor at this pixel touches: the neighbour cell when
/// sitting on a cell edge
fn touching_cell(v: i32) -> i32 {
    match v % CELL {
        0 => v / CELL - 1,
        r if r == CELL - 1 => v / CELL + 1,
        _ => v / CELL,
    }
}

/// Walls a spark can electrify
fn spark_powers_wall(wall: u8) -> bool {
    matches!(
        wall,
        WallId::DETECT
            | WallId::EWALL
            | WallId::ALLOWLIQUID
            | WallId::WALLELEC
            | WallId::ALLOWALLELEC
            | WallId::EHOLE
    )
}

impl Simulation {
    /// Update particle `i` for this tick
    ///
    /// Returns true when the particle was destroyed or must not be
    /// processed further this tick.
    pub fn update_particle(&mut self, i: usize) -> bool {
        let mut t = self.parts[i].element;
        let x = round_pos(self.parts[i].x);
        let y = round_pos(self.parts[i].y);
        let mut transition_occurred = false;

        let props = self.elements.get(t).properties;
        let wall = self.walls.wall_at(x, y);
        if !in_bounds(x, y)
            || (wall != WallId::NONE
                && wall_kills(wall, props, self.walls.charge_at(x, y))
                && !matches!(t, E::STKM | E::STKM2 | E::FIGH))
        {
            self.part_kill(i);
            return true;
        }

        if self.walls.is_inactive_stasis(x, y) {
            return false;
        }
        if wall == WallId::DETECT && self.walls.charge_at(x, y) < 8 {
            self.walls.set_emap(x / CELL, y / CELL);
        }
        if self.parts[i].flags.contains(ParticleFlags::SKIPMOVE) {
            return false;
        }

        let cell = cell_of(x, y);
        let el = self.elements.get(t);
        let (air_loss, air_drag, hot_air) = (el.air_loss, el.air_drag, el.hot_air);
        let (loss, advection, diffusion) = (el.loss, el.advection, el.diffusion);
        let (gravity, newtonian) = (el.gravity, el.newtonian_gravity);

        // The particle drags the air along
        self.air.vx[cell] = self.air.vx[cell] * air_loss + air_drag * self.parts[i].vx;
        self.air.vy[cell] = self.air.vy[cell] * air_loss + air_drag * self.parts[i].vy;

        if hot_air != 0.0 {
            self.apply_hot_air(t, x, y, hot_air);
        }

        let mut grav = Vec2::ZERO;
        if !props.contains(P::TYPE_SOLID) {
            if gravity != 0.0 {
                grav = self.mode_gravity(x, y, gravity);
            }
            if newtonian != 0.0 {
                grav += newtonian * self.gravity_grid_at(x, y);
            }
        }

        {
            let (avx, avy) = (self.air.vx[cell], self.air.vy[cell]);
            let p = &mut self.parts[i];
            p.vx = p.vx * loss + advection * avx + grav.x;
            p.vy = p.vy * loss + advection * avy + grav.y;
        }

        if diffusion != 0.0 {
            let scale = if self.settings.realistic_heat {
                0.05 * self.parts[i].temp.sqrt() * diffusion
            } else {
                diffusion
            };
            let dvx = scale * (2.0 * self.rng.uniform01() - 1.0);
            let dvy = scale * (2.0 * self.rng.uniform01() - 1.0);
            self.parts[i].vx += dvx;
            self.parts[i].vy += dvy;
        }

        let ctx = self.gather_context(i, x, y);

        if !self.settings.legacy_enable {
            if self.transfer_heat(i, t, &ctx.surround) {
                transition_occurred = true;
                t = self.parts[i].element;
            }
            if t == E::NONE {
                return true;
            }
        }

        // Sparks from electrified walls
        let props = self.elements.get(t).properties;
        if props.contains(P::CONDUCTS) || t == E::SPRK {
            let (nx, ny) = (touching_cell(x), touching_cell(y));
            if nx >= 0 && ny >= 0 && nx < XCELLS as i32 && ny < YCELLS as i32 {
                let wall = self.walls.wall(nx, ny);
                if t != E::SPRK {
                    if self.walls.charge(nx, ny) == 12 && self.parts[i].life == 0 && wall != WallId::STASIS {
                        self.spark_conductive(i, x, y);
                        self.parts[i].life = 4;
                        t = E::SPRK;
                    }
                } else if spark_powers_wall(wall) {
                    self.walls.set_emap(nx, ny);
                }
            }
        }

        // Explosive under pressure
        let el = self.elements.get(t);
        if !el.properties.contains(P::INDESTRUCTIBLE) && el.explosive & 2 != 0 && self.pv_at(x, y) > 2.5 {
            let flammable = el.flammable;
            let fire_temp = self.elements.get(E::FIRE).default_temp;
            self.parts[i].life = self.rng.between(180, 259);
            self.parts[i].temp = restrict_flt(fire_temp + (flammable / 2) as f32, MIN_TEMP, MAX_TEMP);
            t = E::FIRE;
            self.part_change_type(i, x, y, t);
            *self.pv_at_mut(x, y) += 0.25 * CFDS;
        }

        if !self.elements.get(t).properties.contains(P::INDESTRUCTIBLE) {
            if self.check_pressure_transitions(i, t) {
                transition_occurred = true;
                t = self.parts[i].element;
            }
            if t == E::NONE {
                return true;
            }
        }

        if self.elements.get(t).properties.contains(P::POWERED) && self.update_powered(&ctx) {
            return true;
        }

        if self.behavior(t).update(self, &ctx) {
            return true;
        }

        if self.settings.legacy_enable {
            self.update_legacy_all(&ctx);
        }
        if self.parts[i].element == E::NONE {
            return true;
        }

        if self.parts[i].flags.contains(ParticleFlags::EXPLODE) && self.rng.chance(1, 10) {
            self.parts[i].flags.remove(ParticleFlags::EXPLODE);
            *self.pv_at_mut(x, y) += 5.0;
            if self.rng.chance(1, 3) {
                let into = if self.rng.chance(1, 2) { E::BOMB } else { E::PLSM };
                self.part_create(SlotHint::Replace(i), x, y, into);
                self.parts[i].temp = MAX_TEMP;
            } else {
                self.part_create(SlotHint::Replace(i), x, y, E::EMBR);
                self.parts[i].temp = MAX_TEMP;
                self.parts[i].vx = self.rng.between(-10, 10) as f32;
                self.parts[i].vy = self.rng.between(-10, 10) as f32;
            }
            return true;
        }

        if transition_occurred {
            return false;
        }
        if self.parts[i].vx == 0.0 && self.parts[i].vy == 0.0 {
            return false;
        }
        self.move_particle(i, t, x, y, grav, ctx.nt, ctx.surround_space)
    }

    /// Heat sources raise the pressure of their own and the next coarse cells
    fn apply_hot_air(&mut self, t: u16, x: i32, y: i32, hot_air: f32) {
        let (cx, cy) = ((x / CELL) as usize, (y / CELL) as usize);
        let mut cells = vec![cell_at(cx, cy)];
        if y + CELL < YRES {
            cells.push(cell_at(cx, cy + 1));
        }
        if x + CELL < XRES {
            cells.push(cell_at(cx + 1, cy));
            if y + CELL < YRES {
                cells.push(cell_at(cx + 1, cy + 1));
            }
        }
        if t == E::GAS || t == E::NBLE {
            // Gases only push the pressure towards a ceiling
            for c in cells {
                let pv = &mut self.air.pv[c];
                if *pv < 3.5 {
                    *pv += hot_air * (3.5 - *pv);
                }
            }
        } else {
            let value = restrict_flt(hot_air, -256.0, 256.0);
            for c in cells {
                self.air.pv[c] += value;
            }
        }
    }

    /// Collect the 3x3 neighbourhood, column by column
    fn gather_context(&self, i: usize, x: i32, y: i32) -> UpdateContext {
        let t = self.parts[i].element;
        let mut surround = [PackedCell::EMPTY; 8];
        let mut surround_space = 0;
        let mut nt = 0;
        let mut k = 0;
        for nx in -1..=1 {
            for ny in -1..=1 {
                if nx == 0 && ny == 0 {
                    continue;
                }
                if in_bounds(x + nx, y + ny) {
                    let r = self.map.pmap(x + nx, y + ny);
                    surround[k] = r;
                    if r.element() == E::NONE {
                        surround_space += 1;
                    }
                    if r.element() != t {
                        nt += 1;
                    }
                } else {
                    surround_space += 1;
                    nt += 1;
                }
                k += 1;
            }
        }
        UpdateContext {
            index: i,
            x,
            y,
            surround_space,
            nt,
            surround,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SimSettings;

    fn sim() -> Simulation {
        Simulation::new(SimSettings {
            seed: 21,
            ..Default::default()
        })
    }

    #[test]
    fn test_touching_cell_edges() {
        assert_eq!(touching_cell(8), 1);
        assert_eq!(touching_cell(9), 2);
        assert_eq!(touching_cell(11), 3);
    }

    #[test]
    fn test_particle_in_wall_is_killed() {
        let mut sim = sim();
        let i = sim.part_create(SlotHint::Auto, 50, 50, E::DUST).unwrap();
        sim.walls.set_wall(12, 12, WallId::WALL);
        assert!(sim.update_particle(i));
        assert!(sim.parts[i].is_empty());
    }

    #[test]
    fn test_skipmove_particle_does_not_move() {
        let mut sim = sim();
        let i = sim.part_create(SlotHint::Auto, 50, 50, E::DUST).unwrap();
        sim.parts[i].flags.insert(ParticleFlags::SKIPMOVE);
        assert!(!sim.update_particle(i));
        assert_eq!(sim.parts[i].y, 50.0);
        assert_eq!(sim.parts[i].vy, 0.0);
    }

    #[test]
    fn test_dust_falls() {
        let mut sim = sim();
        let i = sim.part_create(SlotHint::Auto, 50, 50, E::DUST).unwrap();
        for _ in 0..10 {
            sim.update_particle(i);
        }
        assert!(sim.parts[i].y > 50.0);
        let y = round_pos(sim.parts[i].y);
        assert_eq!(sim.map().pmap(50, y).occupant(), Some(i));
    }

    #[test]
    fn test_context_counts_edges_as_space() {
        let mut sim = sim();
        let i = sim.part_create(SlotHint::Unchecked, 0, 0, E::STNE).unwrap();
        let ctx = sim.gather_context(i, 0, 0);
        assert_eq!(ctx.surround_space, 8);
        assert_eq!(ctx.nt, 8);
    }

    #[test]
    fn test_charged_wall_sparks_conductor() {
        let mut sim = sim();
        let m = sim.part_create(SlotHint::Auto, 50, 50, E::METL).unwrap();
        // 50 sits inside cell 12, so the conductor touches that cell
        sim.walls.set_charge(12, 12, 12);
        sim.update_particle(m);
        assert_eq!(sim.parts[m].element, E::SPRK);
        assert_eq!(sim.parts[m].ctype, E::METL as i32);
    }

    #[test]
    fn test_hot_air_pressurises() {
        let mut sim = sim();
        sim.apply_hot_air(E::FIRE, 50, 50, 0.1);
        assert!((sim.pv_at(50, 50) - 0.1).abs() < 1e-6);
        assert!((sim.pv_at(54, 54) - 0.1).abs() < 1e-6);
        sim.apply_hot_air(E::GAS, 100, 100, 0.5);
        assert!((sim.pv_at(100, 100) - 1.75).abs() < 1e-6);
    }
}
