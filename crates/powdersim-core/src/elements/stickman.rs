//! STKM, STKM2 and FIGH bodies
//!
//! Each player stickman may exist only once. Fighters are numbered through
//! `tmp`, using the lowest free number below [`MAX_FIGHTERS`].

use powdersim_simulation::{ElementId as E, Properties as P};

use super::{ElementBehavior, SlotHint, UpdateContext, neighbours_3x3};
use crate::simulation::Simulation;

pub const MAX_FIGHTERS: usize = 100;

/// Stickmen shiver below this temperature
const COLD_BODY: f32 = 243.0;
/// Normal body temperature
const WARM_BODY: f32 = 309.6;
/// Touching something this hot hurts
const SCALDING: f32 = 323.0;

pub struct Stickman;

/// Lowest fighter number no live FIGH is using
pub(crate) fn next_fighter_number(sim: &Simulation) -> Option<i32> {
    let mut used = [false; MAX_FIGHTERS];
    for (_, p) in sim.parts.iter_live() {
        if p.element == E::FIGH && (0..MAX_FIGHTERS as i32).contains(&p.tmp) {
            used[p.tmp as usize] = true;
        }
    }
    used.iter().position(|u| !u).map(|n| n as i32)
}

impl ElementBehavior for Stickman {
    fn create_allowed(&self, sim: &Simulation, hint: SlotHint, _x: i32, _y: i32, element: u16) -> bool {
        if let SlotHint::Replace(i) = hint
            && sim.parts[i].element == element
        {
            return true;
        }
        match element {
            E::STKM | E::STKM2 => sim.element_count(element) == 0,
            E::FIGH => next_fighter_number(sim).is_some(),
            _ => true,
        }
    }

    fn on_create(&self, sim: &mut Simulation, i: usize, _x: i32, _y: i32, element: u16, v: i32) {
        let power = if sim.elements.is_element(v) { v } else { E::DUST as i32 };
        sim.parts[i].ctype = power;
        if element == E::FIGH {
            // Not counted against itself
            sim.parts[i].tmp = -1;
            sim.parts[i].tmp = next_fighter_number(sim).unwrap_or(-1);
        }
    }

    fn update(&self, sim: &mut Simulation, ctx: &UpdateContext) -> bool {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        {
            let p = &mut sim.parts[i];
            if p.temp < COLD_BODY {
                p.life -= 1;
            } else if p.temp < WARM_BODY {
                p.temp += 1.0;
            }
        }

        for (rx, ry) in neighbours_3x3() {
            let r = sim.map().pmap(x + rx, y + ry);
            let Some(ri) = r.occupant() else {
                continue;
            };
            let rt = r.element();
            if matches!(rt, E::STKM | E::STKM2 | E::FIGH) {
                continue;
            }
            let mut damage = 0;
            if sim.element(rt).properties.contains(P::DEADLY) {
                damage += 1;
            }
            let temp = sim.parts[ri].temp;
            if temp >= SCALDING || temp <= COLD_BODY {
                damage += 2;
            }
            sim.parts[i].life -= damage;
        }

        if sim.parts[i].life < 1 {
            sim.part_kill(i);
            return true;
        }
        false
    }
}
