//! SOAP and the links that hold bubbles together
//!
//! Bubble particles form a doubly linked chain through their particle
//! indices: `tmp` points forward, `tmp2` back. Bits of `ctype` say which
//! links are live.

use powdersim_simulation::ElementId as E;

use super::{ElementBehavior, UpdateContext};
use crate::simulation::Simulation;

/// Part of a bubble
pub const SOAP_BUBBLE: i32 = 1;
/// `tmp` holds a forward link
pub const SOAP_FORWARD: i32 = 2;
/// `tmp2` holds a back link
pub const SOAP_BACK: i32 = 4;
const SOAP_LINKED: i32 = SOAP_FORWARD | SOAP_BACK;

/// Bubbles pop above this temperature
const SOAP_FREEZING: f32 = 248.15;

pub struct Soap;

fn is_soap(sim: &Simulation, i: i32) -> bool {
    i >= 0 && (i as usize) < sim.parts.capacity() && sim.parts[i as usize].element == E::SOAP
}

/// Unlink a SOAP particle from both of its neighbours in the chain
pub fn detach_soap(sim: &mut Simulation, i: usize) {
    let p = sim.parts[i];
    if p.ctype & SOAP_FORWARD != 0 && is_soap(sim, p.tmp) {
        sim.parts[p.tmp as usize].ctype &= !SOAP_BACK;
    }
    if p.ctype & SOAP_BACK != 0 && is_soap(sim, p.tmp2) {
        sim.parts[p.tmp2 as usize].ctype &= !SOAP_FORWARD;
    }
    sim.parts[i].ctype = 0;
}

/// Link `from` forward to `to`
fn attach(sim: &mut Simulation, from: usize, to: usize) {
    sim.parts[from].tmp = to as i32;
    sim.parts[from].ctype |= SOAP_FORWARD;
    sim.parts[to].tmp2 = from as i32;
    sim.parts[to].ctype |= SOAP_BACK;
}

/// Break a chain that has lost one of its ends
fn pop_open_chain(sim: &mut Simulation, start: usize) {
    let mut target = start;
    // A chain never holds more particles than the store
    for _ in 0..sim.parts.capacity() {
        let p = sim.parts[target];
        let links = p.ctype & SOAP_LINKED;
        if p.element != E::SOAP || links == 0 || links == SOAP_LINKED {
            break;
        }
        let next = if links & SOAP_FORWARD != 0 { p.tmp } else { p.tmp2 };
        detach_soap(sim, target);
        if !is_soap(sim, next) {
            break;
        }
        target = next as usize;
    }
}

impl ElementBehavior for Soap {
    fn update(&self, sim: &mut Simulation, ctx: &UpdateContext) -> bool {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        if sim.parts[i].ctype & SOAP_BUBBLE == 0 {
            // Air pressure whips plain soap into bubble film
            if sim.pv_at(x, y).abs() > 0.5 {
                sim.parts[i].ctype = SOAP_BUBBLE;
                sim.parts[i].life = 10;
            }
            return false;
        }

        if sim.parts[i].temp > SOAP_FREEZING {
            if sim.parts[i].life <= 0 {
                let links = sim.parts[i].ctype & SOAP_LINKED;
                if links != 0 && links != SOAP_LINKED {
                    pop_open_chain(sim, i);
                }
                if sim.parts[i].ctype & SOAP_LINKED != SOAP_LINKED {
                    sim.parts[i].ctype = 0;
                }
            }
            // Film floats
            let p = &mut sim.parts[i];
            p.vy = (p.vy - 0.1) * 0.5;
            p.vx *= 0.5;
        }

        if sim.parts[i].ctype & SOAP_FORWARD == 0 {
            for rx in -2..=2 {
                for ry in -2..=2 {
                    let r = sim.map().pmap(x + rx, y + ry);
                    let Some(ri) = r.occupant() else {
                        continue;
                    };
                    let other = sim.parts[ri];
                    if ri != i
                        && r.element() == E::SOAP
                        && other.ctype & SOAP_BUBBLE != 0
                        && other.ctype & SOAP_BACK == 0
                        && sim.parts[i].ctype & SOAP_FORWARD == 0
                    {
                        attach(sim, i, ri);
                    }
                }
            }
        }
        false
    }

    fn on_change_type(&self, sim: &mut Simulation, i: usize, _x: i32, _y: i32, from: u16, to: u16) {
        if from == E::SOAP && to != E::SOAP {
            detach_soap(sim, i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::SlotHint;
    use crate::settings::SimSettings;
    use powdersim_simulation::PackedCell;

    fn ctx(i: usize, x: i32, y: i32) -> UpdateContext {
        UpdateContext {
            index: i,
            x,
            y,
            surround_space: 0,
            nt: 0,
            surround: [PackedCell::EMPTY; 8],
        }
    }

    fn linked_pair(sim: &mut Simulation) -> (usize, usize) {
        let a = sim.part_create(SlotHint::Auto, 20, 20, E::SOAP).unwrap();
        let b = sim.part_create(SlotHint::Auto, 21, 20, E::SOAP).unwrap();
        sim.parts[a].ctype = SOAP_BUBBLE;
        sim.parts[b].ctype = SOAP_BUBBLE;
        attach(sim, a, b);
        (a, b)
    }

    #[test]
    fn test_detach_clears_both_sides() {
        let mut sim = Simulation::new(SimSettings::default());
        let (a, b) = linked_pair(&mut sim);
        assert_eq!(sim.parts[b].ctype & SOAP_BACK, SOAP_BACK);
        detach_soap(&mut sim, a);
        assert_eq!(sim.parts[a].ctype, 0);
        assert_eq!(sim.parts[b].ctype, SOAP_BUBBLE);
    }

    #[test]
    fn test_killing_soap_unlinks_neighbour() {
        let mut sim = Simulation::new(SimSettings::default());
        let (a, b) = linked_pair(&mut sim);
        sim.part_kill(b);
        assert_eq!(sim.parts[a].ctype & SOAP_FORWARD, 0);
    }

    #[test]
    fn test_pressure_makes_bubbles_that_link() {
        let mut sim = Simulation::new(SimSettings::default());
        let a = sim.part_create(SlotHint::Auto, 20, 20, E::SOAP).unwrap();
        let b = sim.part_create(SlotHint::Auto, 22, 20, E::SOAP).unwrap();
        *sim.pv_at_mut(20, 20) = 2.0;
        Soap.update(&mut sim, &ctx(a, 20, 20));
        Soap.update(&mut sim, &ctx(b, 22, 20));
        assert_eq!(sim.parts[a].ctype, SOAP_BUBBLE);
        assert_eq!(sim.parts[a].life, 10);

        Soap.update(&mut sim, &ctx(a, 20, 20));
        assert_eq!(sim.parts[a].tmp, b as i32);
        assert_eq!(sim.parts[b].tmp2, a as i32);
        assert_eq!(sim.parts[b].ctype & SOAP_BACK, SOAP_BACK);
    }

    #[test]
    fn test_open_chain_pops_when_warm() {
        let mut sim = Simulation::new(SimSettings::default());
        let (a, b) = linked_pair(&mut sim);
        sim.parts[a].life = 0;
        sim.parts[a].temp = 300.0;
        // b is no longer film, so a cannot relink to it
        sim.parts[b].ctype = SOAP_BACK;
        Soap.update(&mut sim, &ctx(a, 20, 20));
        assert_eq!(sim.parts[a].ctype, 0);
        assert_eq!(sim.parts[b].ctype, 0);
    }
}
