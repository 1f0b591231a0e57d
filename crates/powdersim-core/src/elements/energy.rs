//! PHOT and NEUT: energy particles that start off in a random direction

use std::f32::consts::{FRAC_PI_4, PI};

use powdersim_simulation::ElementId as E;

use super::{ElementBehavior, UpdateContext, fire, neighbours_3x3};
use crate::rng::SimRng;
use crate::simulation::Simulation;

/// Photons launch at this speed along one of eight directions
const PHOTON_SPEED: f32 = 3.0;
/// Photons hotter than this can set things alight
const PHOTON_IGNITE_TEMP: f32 = 506.0;

pub struct Photon;
pub struct Neutron;

impl ElementBehavior for Photon {
    fn on_create(&self, sim: &mut Simulation, i: usize, _x: i32, _y: i32, _element: u16, _v: i32) {
        let angle = sim.rng().between(0, 7) as f32 * FRAC_PI_4;
        let p = &mut sim.parts[i];
        p.vx = PHOTON_SPEED * angle.cos();
        p.vy = PHOTON_SPEED * angle.sin();
    }

    fn update(&self, sim: &mut Simulation, ctx: &UpdateContext) -> bool {
        let i = ctx.index;
        // No wavelengths left
        if sim.parts[i].ctype == 0 {
            sim.part_kill(i);
            return true;
        }
        if sim.parts[i].temp > PHOTON_IGNITE_TEMP && sim.rng().chance(1, 10) {
            fire::ignite_neighbours(sim, ctx, E::PHOT);
        }
        false
    }
}

impl ElementBehavior for Neutron {
    fn on_create(&self, sim: &mut Simulation, i: usize, _x: i32, _y: i32, _element: u16, _v: i32) {
        let speed = sim.rng().between(128, 255) as f32 / 127.0;
        let angle = sim.rng().between(0, 359) as f32 * PI / 180.0;
        let life = sim.rng().between(480, 959);
        let p = &mut sim.parts[i];
        p.life = life;
        p.vx = speed * angle.cos();
        p.vy = speed * angle.sin();
    }

    fn update(&self, sim: &mut Simulation, ctx: &UpdateContext) -> bool {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        for (rx, ry) in neighbours_3x3() {
            let (nx, ny) = (x + rx, y + ry);
            let r = sim.map().pmap(nx, ny);
            let Some(ri) = r.occupant() else {
                continue;
            };
            let into = match r.element() {
                E::WATR if sim.rng().between(0, 19) < 3 => E::DSTW,
                E::GUNP if sim.rng().between(0, 199) < 3 => E::DUST,
                E::OIL if sim.rng().between(0, 199) < 3 => E::GAS,
                E::PLNT | E::COAL if sim.rng().chance(1, 20) => E::WOOD,
                E::ICEI | E::SNOW => {
                    // Ice moderates neutrons
                    let p = &mut sim.parts[i];
                    p.vx *= 0.995;
                    p.vy *= 0.995;
                    continue;
                }
                _ => continue,
            };
            sim.part_change_type(ri, nx, ny, into);
        }
        false
    }
}
