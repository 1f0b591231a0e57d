//! FIRE, PLSM and LAVA: burning out and setting neighbours alight

use powdersim_simulation::{
    CELL, CFDS, ElementId as E, MAX_TEMP, MIN_TEMP, WallId, in_bounds, restrict_flt,
};

use super::{ElementBehavior, UpdateContext, neighbours_5x5};
use crate::rng::SimRng;
use crate::simulation::Simulation;

pub struct Fire;

impl ElementBehavior for Fire {
    fn update(&self, sim: &mut Simulation, ctx: &UpdateContext) -> bool {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        let t = burn_out(sim, i, x, y);
        ignite_neighbours(sim, ctx, t);
        if sim.settings.legacy_enable {
            return melt_legacy(sim, ctx, t);
        }
        false
    }

    fn on_create(&self, sim: &mut Simulation, i: usize, _x: i32, _y: i32, element: u16, _v: i32) {
        if element == E::FIRE {
            sim.parts[i].life = sim.rng().between(120, 169);
        }
    }
}

/// End of life for flames; returns the type the particle has afterwards
fn burn_out(sim: &mut Simulation, i: usize, x: i32, y: i32) -> u16 {
    let t = sim.parts[i].element;
    if sim.parts[i].life > 1 {
        return t;
    }
    let p = sim.parts[i];
    match t {
        E::PLSM if p.ctype == E::NBLE as i32 => {
            sim.part_change_type(i, x, y, E::NBLE);
            sim.parts[i].life = 0;
        }
        E::PLSM | E::FIRE if p.tmp & 3 == 3 => {
            // Burnt hydrogen and oxygen
            sim.part_change_type(i, x, y, E::DSTW);
            sim.parts[i].life = 0;
            sim.parts[i].ctype = E::FIRE as i32;
        }
        E::FIRE if p.temp < 625.0 => {
            sim.part_change_type(i, x, y, E::SMKE);
            sim.parts[i].life = sim.rng().between(250, 269);
        }
        _ => {}
    }
    sim.parts[i].element
}

/// Spread flames from a `t` particle to flammable neighbours
///
/// Shared with SPRK and hot PHOT, which ignite things the same way with
/// their own exceptions.
pub(crate) fn ignite_neighbours(sim: &mut Simulation, ctx: &UpdateContext, t: u16) {
    let (i, x, y) = (ctx.index, ctx.x, ctx.y);
    let hot = matches!(t, E::FIRE | E::PLSM | E::LAVA);

    for (rx, ry) in neighbours_5x5() {
        let (nx, ny) = (x + rx, y + ry);
        let r = sim.map().pmap(nx, ny);
        let Some(ri) = r.occupant() else {
            continue;
        };
        let rt = r.element();

        if rt == E::THRM && hot {
            burn_thermite(sim, ri, nx, ny);
            continue;
        }

        if rt == E::COAL || rt == E::BCOL {
            if t == E::FIRE || t == E::PLSM {
                if sim.parts[ri].life > 100 && sim.rng().chance(1, 500) {
                    sim.parts[ri].life = 99;
                }
            } else if t == E::LAVA && sim.parts[i].ctype == E::IRON as i32 && sim.rng().chance(1, 500) {
                // Coal carbonises molten iron into steel
                sim.parts[i].ctype = E::METL as i32;
                sim.part_kill(ri);
                continue;
            }
        }

        let el = sim.element(rt);
        let (flammable, explosive) = (el.flammable, el.explosive);
        if flammable == 0 || (ctx.surround_space == 0 && explosive == 0) {
            continue;
        }
        let exempt = (t == E::SPRK && matches!(rt, E::RBDM | E::LRBD | E::INSL))
            || (t == E::PHOT && rt == E::INSL)
            || (rt == E::SPNG && sim.parts[ri].life != 0);
        if exempt {
            continue;
        }
        let pressure = (sim.pv_at(nx, ny) * 10.0) as i32;
        if flammable + pressure <= sim.rng().between(0, 999) {
            continue;
        }

        sim.part_change_type(ri, nx, ny, E::FIRE);
        let fire_temp = sim.element(E::FIRE).default_temp;
        let life = sim.rng().between(180, 259);
        let p = &mut sim.parts[ri];
        p.temp = restrict_flt(fire_temp + (flammable / 2) as f32, MIN_TEMP, MAX_TEMP);
        p.life = life;
        p.tmp = 0;
        p.ctype = 0;
        if explosive != 0 {
            *sim.pv_at_mut(x, y) += 0.25 * CFDS;
        }
    }
}

fn burn_thermite(sim: &mut Simulation, ri: usize, nx: i32, ny: i32) {
    sim.part_change_type(ri, nx, ny, E::LAVA);
    if sim.rng().chance(1, 500) {
        let p = &mut sim.parts[ri];
        p.ctype = E::BMTL as i32;
        p.temp = 3500.0;
        *sim.pv_at_mut(nx, ny) += 50.0;
    } else {
        let p = &mut sim.parts[ri];
        p.life = 400;
        p.ctype = E::THRM as i32;
        p.temp = 3500.0;
        p.tmp = 20;
    }
}

/// Conductors that FIRE and PLSM never melt in legacy mode
const FIREPROOF_METALS: [u16; 11] = [
    E::METL,
    E::IRON,
    E::ETRD,
    E::PSCN,
    E::NSCN,
    E::NTCT,
    E::PTCT,
    E::BMTL,
    E::BRMT,
    E::SALT,
    E::INWR,
];

/// Melting, thawing and quenching used when heat simulation is off
fn melt_legacy(sim: &mut Simulation, ctx: &UpdateContext, t: u16) -> bool {
    let (i, x, y) = (ctx.index, ctx.x, ctx.y);
    for (rx, ry) in neighbours_5x5() {
        let (nx, ny) = (x + rx, y + ry);
        if !in_bounds(nx, ny) {
            continue;
        }
        let r = sim.map().pmap(nx, ny);
        let Some(ri) = r.occupant() else {
            continue;
        };
        let wall = sim.walls.wall(nx / CELL, ny / CELL);
        if wall != WallId::NONE && wall != WallId::STREAM {
            continue;
        }
        let rt = r.element();

        let meltable = sim.element(rt).meltable;
        let lpv = (sim.pv_at(nx, ny) as i32).max(1);
        let fireproof = (t == E::FIRE || t == E::PLSM) && FIREPROOF_METALS.contains(&rt);
        if meltable != 0 && !fireproof && meltable * lpv > sim.rng().between(0, 999) {
            if t != E::LAVA || sim.parts[i].life > 0 {
                sim.parts[ri].ctype = match rt {
                    E::BRMT => E::BMTL as i32,
                    E::SAND => E::GLAS as i32,
                    _ => rt as i32,
                };
                sim.part_change_type(ri, nx, ny, E::LAVA);
                sim.parts[ri].life = sim.rng().between(240, 359);
            } else {
                // Spent lava cools into stone
                sim.parts[i].life = 0;
                sim.parts[i].ctype = 0;
                sim.part_change_type(i, x, y, E::STNE);
                return true;
            }
        }

        if rt == E::ICEI || rt == E::SNOW {
            sim.part_change_type(ri, nx, ny, E::WATR);
            if quench(sim, i, x, y, t) {
                return true;
            }
        } else if matches!(rt, E::WATR | E::DSTW | E::SLTW) {
            sim.part_kill(ri);
            if quench(sim, i, x, y, t) {
                return true;
            }
        }
    }
    false
}

/// Water put out fire or cooled lava; true when the particle is gone
fn quench(sim: &mut Simulation, i: usize, x: i32, y: i32, t: u16) -> bool {
    match t {
        E::FIRE => {
            sim.part_kill(i);
            true
        }
        E::LAVA => {
            sim.parts[i].life = 0;
            sim.parts[i].ctype = 0;
            sim.part_change_type(i, x, y, E::STNE);
            false
        }
        _ => false,
    }
}
