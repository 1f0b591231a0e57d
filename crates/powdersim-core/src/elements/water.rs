//! WATR, DSTW and SLTW reactions with salt, fire and alkali metals

use powdersim_simulation::ElementId as E;

use super::{ElementBehavior, UpdateContext, neighbours_3x3};
use crate::rng::SimRng;
use crate::simulation::Simulation;

pub struct Water;
pub struct DistilledWater;
pub struct SaltWater;

/// What a watery particle did to itself this tick
enum Outcome {
    Continue,
    Killed,
}

/// Alkali metals explode on contact with water
fn alkali_reaction(sim: &mut Simulation, i: usize, x: i32, y: i32, threshold: f32) -> bool {
    let warm = sim.settings.legacy_enable || sim.parts[i].temp > threshold;
    if warm && sim.rng().chance(1, 100) {
        sim.part_change_type(i, x, y, E::FIRE);
        sim.parts[i].life = 4;
        true
    } else {
        false
    }
}

/// Put out a flame next to the water, sometimes boiling the water off too
fn douse(sim: &mut Simulation, i: usize, fire: usize) -> Outcome {
    sim.part_kill(fire);
    if sim.rng().chance(1, 30) {
        sim.part_kill(i);
        Outcome::Killed
    } else {
        Outcome::Continue
    }
}

/// Salt dissolving into a water particle
fn dissolve_salt(sim: &mut Simulation, i: usize, x: i32, y: i32, salt: usize, sx: i32, sy: i32) {
    sim.part_change_type(i, x, y, E::SLTW);
    // On average three water particles turn salty before the salt is used up
    if sim.rng().chance(1, 3) {
        sim.part_change_type(salt, sx, sy, E::SLTW);
    }
}

impl ElementBehavior for Water {
    fn update(&self, sim: &mut Simulation, ctx: &UpdateContext) -> bool {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        for (rx, ry) in neighbours_3x3() {
            let (nx, ny) = (x + rx, y + ry);
            let r = sim.map().pmap(nx, ny);
            let Some(ri) = r.occupant() else {
                continue;
            };
            match r.element() {
                E::SALT if sim.rng().chance(1, 50) => dissolve_salt(sim, i, x, y, ri, nx, ny),
                E::RBDM | E::LRBD if alkali_reaction(sim, i, x, y, 273.15 + 12.0) => {
                    sim.parts[i].ctype = E::WATR as i32;
                }
                E::FIRE if sim.parts[ri].ctype != E::WATR as i32 => {
                    if let Outcome::Killed = douse(sim, i, ri) {
                        return true;
                    }
                }
                E::SLTW if sim.rng().chance(1, 2000) => {
                    sim.part_change_type(i, x, y, E::SLTW);
                }
                E::ROCK => {
                    let p = sim.parts[i];
                    if p.vx.abs() + p.vy.abs() >= 0.5 && sim.rng().chance(1, 1000) {
                        let eroded = if sim.rng().chance(1, 3) { E::SAND } else { E::STNE };
                        sim.part_change_type(ri, nx, ny, eroded);
                    }
                }
                _ => {}
            }
        }
        false
    }
}

impl ElementBehavior for DistilledWater {
    fn update(&self, sim: &mut Simulation, ctx: &UpdateContext) -> bool {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        for (rx, ry) in neighbours_3x3() {
            let (nx, ny) = (x + rx, y + ry);
            let r = sim.map().pmap(nx, ny);
            let Some(ri) = r.occupant() else {
                continue;
            };
            match r.element() {
                E::SALT => {
                    if sim.rng().chance(1, 50) {
                        dissolve_salt(sim, i, x, y, ri, nx, ny);
                    }
                }
                rt @ (E::SLTW | E::WATR) => {
                    if rt == E::SLTW && sim.rng().chance(1, 2000) {
                        sim.part_change_type(i, x, y, E::SLTW);
                    }
                    // Impurities mix in
                    if sim.rng().chance(1, 100) {
                        sim.part_change_type(i, x, y, E::WATR);
                    }
                }
                E::RBDM | E::LRBD => {
                    alkali_reaction(sim, i, x, y, 273.15 + 12.0);
                }
                E::FIRE => {
                    if let Outcome::Killed = douse(sim, i, ri) {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }
}

impl ElementBehavior for SaltWater {
    fn update(&self, sim: &mut Simulation, ctx: &UpdateContext) -> bool {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        for (rx, ry) in neighbours_3x3() {
            let (nx, ny) = (x + rx, y + ry);
            let r = sim.map().pmap(nx, ny);
            let Some(ri) = r.occupant() else {
                continue;
            };
            match r.element() {
                E::SALT => {
                    if sim.rng().chance(1, 2000) {
                        sim.part_change_type(ri, nx, ny, E::SLTW);
                    }
                }
                E::PLNT => {
                    if sim.rng().chance(1, 40) {
                        sim.part_kill(ri);
                    }
                }
                E::RBDM | E::LRBD => {
                    if alkali_reaction(sim, i, x, y, 273.15 + 12.0) {
                        sim.parts[i].ctype = E::WATR as i32;
                    }
                }
                E::FIRE if sim.parts[ri].ctype != E::WATR as i32 => {
                    if let Outcome::Killed = douse(sim, i, ri) {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }
}
