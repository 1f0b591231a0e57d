//! The clone family: CLNE, BCLN, PCLN and PBCN
//!
//! A clone without a valid `ctype` learns one from whatever touches it,
//! then keeps emitting that element next to itself. Powered clones only
//! emit while switched on (`life == 10`). Breakable clones get knocked
//! loose by high pressure and crumble after a while.

use powdersim_simulation::{
    ElementId as E, ParticleFlags, Properties as P, TransitionTarget, in_bounds,
};

use super::{ElementBehavior, SlotHint, UpdateContext};
use crate::fields::cell_of;
use crate::rng::SimRng;
use crate::simulation::Simulation;

/// Pressure that starts breaking a breakable clone
const BREAK_PRESSURE: f32 = 4.0;
/// How strongly a loose clone follows the air
const LOOSE_ADVECTION: f32 = 0.1;

pub struct Cloner {
    pub breakable: bool,
}

pub struct PoweredCloner {
    pub breakable: bool,
}

impl ElementBehavior for Cloner {
    fn update(&self, sim: &mut Simulation, ctx: &UpdateContext) -> bool {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        if self.breakable {
            // The countdown itself runs through LIFE_DEC
            if sim.parts[i].life == 0 && sim.pv_at(x, y) > BREAK_PRESSURE {
                sim.parts[i].life = sim.rng().between(80, 119);
            }
            if sim.parts[i].life != 0 {
                drift(sim, i, x, y);
            }
        }
        if has_valid_ctype(sim, i) {
            emit(sim, i, x, y);
        } else {
            learn_ctype(sim, i, x, y);
        }
        false
    }
}

impl ElementBehavior for PoweredCloner {
    fn update(&self, sim: &mut Simulation, ctx: &UpdateContext) -> bool {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        if self.breakable {
            // `life` is the power state here, so the breaking timer lives in tmp2
            if sim.parts[i].tmp2 == 0 && sim.pv_at(x, y) > BREAK_PRESSURE {
                sim.parts[i].tmp2 = sim.rng().between(80, 119);
            }
            if sim.parts[i].tmp2 != 0 {
                drift(sim, i, x, y);
                sim.parts[i].tmp2 -= 1;
                if sim.parts[i].tmp2 == 0 {
                    sim.part_kill(i);
                    return true;
                }
            }
        }
        if !has_valid_ctype(sim, i) {
            learn_ctype(sim, i, x, y);
        }
        if has_valid_ctype(sim, i) && sim.parts[i].life == 10 {
            emit(sim, i, x, y);
        }
        false
    }
}

fn drift(sim: &mut Simulation, i: usize, x: i32, y: i32) {
    let cell = cell_of(x, y);
    let (avx, avy) = (sim.air.vx[cell], sim.air.vy[cell]);
    let p = &mut sim.parts[i];
    p.vx += LOOSE_ADVECTION * avx;
    p.vy += LOOSE_ADVECTION * avy;
}

fn has_valid_ctype(sim: &Simulation, i: usize) -> bool {
    sim.elements.is_element(sim.parts[i].ctype)
}

/// Whether a clone may copy elements of type `t`
fn clonable(sim: &Simulation, t: u16) -> bool {
    let props = sim.element(t).properties;
    !props.intersects(P::CLONE | P::BREAKABLECLONE)
        && !matches!(t, E::SPRK | E::NSCN | E::PSCN | E::STKM | E::STKM2)
}

/// Take the type of a touching particle, photons first
fn learn_ctype(sim: &mut Simulation, i: usize, x: i32, y: i32) {
    for rx in -1..=1 {
        for ry in -1..=1 {
            let (nx, ny) = (x + rx, y + ry);
            if !in_bounds(nx, ny) {
                continue;
            }
            let mut r = sim.map().photon(nx, ny);
            if r.is_empty() {
                r = sim.map().pmap(nx, ny);
            }
            let Some(ri) = r.occupant() else {
                continue;
            };
            let rt = r.element();
            if !clonable(sim, rt) {
                continue;
            }
            sim.parts[i].ctype = rt as i32;
            if rt == E::LAVA {
                // Remember what the lava melted from
                sim.parts[i].tmp = sim.parts[ri].ctype;
            }
        }
    }
}

fn emit(sim: &mut Simulation, i: usize, x: i32, y: i32) {
    let ct = sim.parts[i].ctype as u16;
    if ct == E::PHOT {
        emit_photon_burst(sim, i, x, y);
        return;
    }
    if ct == E::LIGH && !sim.rng().chance(1, 30) {
        return;
    }
    let nx = x + sim.rng().between(-1, 1);
    let ny = y + sim.rng().between(-1, 1);
    let Some(np) = sim.part_create(SlotHint::Auto, nx, ny, ct) else {
        return;
    };
    if ct == E::LAVA {
        let melted = sim.parts[i].tmp;
        let melts_to_lava = sim.elements.is_element(melted)
            && sim.element(melted as u16).high_temperature.target
                == TransitionTarget::Element(E::LAVA);
        if melts_to_lava {
            sim.parts[np].ctype = melted;
        }
    }
}

/// One photon in every direction, so beams have no gaps
fn emit_photon_burst(sim: &mut Simulation, i: usize, x: i32, y: i32) {
    for rx in -1..=1 {
        for ry in -1..=1 {
            if rx == 0 && ry == 0 {
                continue;
            }
            let Some(r) = sim.part_create(SlotHint::Auto, x + rx, y + ry, E::PHOT) else {
                continue;
            };
            let p = &mut sim.parts[r];
            p.vx = rx as f32 * 3.0;
            p.vy = ry as f32 * 3.0;
            if r > i {
                // Not yet visited this tick, hold it still until the next one
                p.flags |= ParticleFlags::SKIPMOVE;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SimSettings;
    use powdersim_simulation::PackedCell;

    fn sim() -> Simulation {
        Simulation::new(SimSettings {
            seed: 7,
            ..Default::default()
        })
    }

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

    const CLNE: Cloner = Cloner { breakable: false };
    const BCLN: Cloner = Cloner { breakable: true };
    const PCLN: PoweredCloner = PoweredCloner { breakable: false };
    const PBCN: PoweredCloner = PoweredCloner { breakable: true };

    #[test]
    fn test_clone_learns_then_emits() {
        let mut sim = sim();
        let c = sim.part_create(SlotHint::Auto, 50, 50, E::CLNE).unwrap();
        sim.part_create(SlotHint::Auto, 50, 49, E::WATR).unwrap();
        CLNE.update(&mut sim, &ctx(c, 50, 50));
        assert_eq!(sim.parts[c].ctype, E::WATR as i32);

        for _ in 0..20 {
            CLNE.update(&mut sim, &ctx(c, 50, 50));
        }
        assert!(sim.element_count(E::WATR) > 1);
    }

    #[test]
    fn test_clone_ignores_clones_and_sparks() {
        let mut sim = sim();
        let c = sim.part_create(SlotHint::Auto, 50, 50, E::CLNE).unwrap();
        sim.part_create(SlotHint::Auto, 51, 50, E::BCLN).unwrap();
        let m = sim.part_create(SlotHint::Auto, 49, 50, E::PSCN).unwrap();
        sim.spark_conductive(m, 49, 50);
        CLNE.update(&mut sim, &ctx(c, 50, 50));
        assert_eq!(sim.parts[c].ctype, 0);
    }

    #[test]
    fn test_clone_keeps_lava_origin() {
        let mut sim = sim();
        let c = sim.part_create(SlotHint::Auto, 50, 50, E::CLNE).unwrap();
        sim.parts[c].ctype = E::LAVA as i32;
        sim.parts[c].tmp = E::METL as i32;
        // The spot is random and may land on the clone itself
        for _ in 0..50 {
            CLNE.update(&mut sim, &ctx(c, 50, 50));
            if sim.element_count(E::LAVA) > 0 {
                break;
            }
        }
        let lava: Vec<_> = sim.parts.iter_live().filter(|(_, p)| p.element == E::LAVA).collect();
        assert_eq!(lava.len(), 1);
        assert_eq!(lava[0].1.ctype, E::METL as i32);
    }

    #[test]
    fn test_breakable_clone_loosens_under_pressure() {
        let mut sim = sim();
        let c = sim.part_create(SlotHint::Auto, 50, 50, E::BCLN).unwrap();
        BCLN.update(&mut sim, &ctx(c, 50, 50));
        assert_eq!(sim.parts[c].life, 0);
        *sim.pv_at_mut(50, 50) = 5.0;
        BCLN.update(&mut sim, &ctx(c, 50, 50));
        assert!((80..=119).contains(&sim.parts[c].life));
    }

    #[test]
    fn test_powered_clone_emits_only_when_on() {
        let mut sim = sim();
        let c = sim.part_create(SlotHint::Auto, 50, 50, E::PCLN).unwrap();
        sim.parts[c].ctype = E::DUST as i32;
        for _ in 0..10 {
            PCLN.update(&mut sim, &ctx(c, 50, 50));
        }
        assert_eq!(sim.element_count(E::DUST), 0);
        sim.parts[c].life = 10;
        for _ in 0..10 {
            PCLN.update(&mut sim, &ctx(c, 50, 50));
        }
        assert!(sim.element_count(E::DUST) > 0);
    }

    #[test]
    fn test_powered_clone_photon_burst() {
        let mut sim = sim();
        let c = sim.part_create(SlotHint::Auto, 50, 50, E::PCLN).unwrap();
        sim.parts[c].ctype = E::PHOT as i32;
        sim.parts[c].life = 10;
        PCLN.update(&mut sim, &ctx(c, 50, 50));
        assert_eq!(sim.element_count(E::PHOT), 8);
        let right = sim.map().photon(51, 50).index();
        assert_eq!((sim.parts[right].vx, sim.parts[right].vy), (3.0, 0.0));
        assert!(sim.parts[right].flags.contains(ParticleFlags::SKIPMOVE));
    }

    #[test]
    fn test_breakable_powered_clone_crumbles() {
        let mut sim = sim();
        let c = sim.part_create(SlotHint::Auto, 50, 50, E::PBCN).unwrap();
        *sim.pv_at_mut(50, 50) = 5.0;
        assert!(!PBCN.update(&mut sim, &ctx(c, 50, 50)));
        assert!((79..=118).contains(&sim.parts[c].tmp2));
        sim.parts[c].tmp2 = 1;
        assert!(PBCN.update(&mut sim, &ctx(c, 50, 50)));
        assert!(sim.parts[c].is_empty());
    }
}
