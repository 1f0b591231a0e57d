//! SPRK: current travelling through conductors
//!
//! A spark remembers the conductor it replaced in `ctype`. It counts down
//! from 4, passes itself on to idle conductors within two pixels while it is
//! still young, and turns back into its conductor when the count runs out.
//! The conductor then needs a few ticks of recharge (`life`) before it can
//! carry another spark, which is what makes current flow in one direction.

use powdersim_simulation::{ElementId as E, ROOM_TEMP};

use super::{ElementBehavior, UpdateContext, fire, neighbours_5x5};
use crate::rng::SimRng;
use crate::simulation::Simulation;

pub struct Spark;

impl ElementBehavior for Spark {
    fn update(&self, sim: &mut Simulation, ctx: &UpdateContext) -> bool {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        if sim.parts[i].life <= 0 {
            revert(sim, i, x, y);
            return false;
        }

        let ct = sim.parts[i].ctype;
        if ct == E::SPRK as i32 {
            sim.part_kill(i);
            return true;
        }
        if ct == E::NBLE as i32 && sim.parts[i].life <= 1 && sim.parts[i].tmp & 4 == 0 {
            ionise_noble_gas(sim, i, x, y);
            return false;
        }

        fire::ignite_neighbours(sim, ctx, E::SPRK);
        conduct(sim, ctx);
        false
    }
}

/// Turn a spent spark back into the conductor it came from
fn revert(sim: &mut Simulation, i: usize, x: i32, y: i32) {
    let mut ct = sim.parts[i].ctype;
    if [E::WATR, E::SLTW, E::PSCN, E::NSCN, E::ETRD, E::INWR]
        .iter()
        .any(|&t| t as i32 == ct)
    {
        sim.parts[i].temp = ROOM_TEMP;
    }
    if !sim.elements.is_element(ct) {
        ct = E::METL as i32;
    }
    let ct = ct as u16;
    sim.part_change_type(i, x, y, ct);
    let p = &mut sim.parts[i];
    p.ctype = 0;
    p.life = match ct {
        E::WATR => 64,
        E::SLTW => 54,
        E::SWCH => 14,
        _ => 4,
    };
}

/// Sparked NBLE glows as plasma for a while
fn ionise_noble_gas(sim: &mut Simulation, i: usize, x: i32, y: i32) {
    let life = sim.rng().between(50, 199);
    sim.part_change_type(i, x, y, E::PLSM);
    let p = &mut sim.parts[i];
    p.life = life;
    p.ctype = E::NBLE as i32;
    if p.temp > 5273.15 {
        p.tmp |= 4;
    }
    p.temp = 3500.0;
    *sim.pv_at_mut(x, y) += 1.0;
}

/// Pass the spark on to nearby conductors
fn conduct(sim: &mut Simulation, ctx: &UpdateContext) {
    let (i, x, y) = (ctx.index, ctx.x, ctx.y);
    let sender = sim.parts[i].ctype as u16;

    for (rx, ry) in neighbours_5x5() {
        let (nx, ny) = (x + rx, y + ry);
        let r = sim.map().pmap(nx, ny);
        let Some(ri) = r.occupant() else {
            continue;
        };
        let receiver = r.element();
        if sim.parts_avg(i, ri, E::INSL) == E::INSL {
            continue;
        }
        // N-type silicon never feeds P-type
        if sender == E::NSCN && receiver == E::PSCN {
            continue;
        }
        let life = sim.parts[i].life;
        let young_enough = if matches!(receiver, E::WATR | E::SLTW) {
            life < 3
        } else {
            life < 4
        };
        if !young_enough {
            continue;
        }

        match receiver {
            E::SWCH => {
                // Only a switch that is on carries current
                if sim.parts[ri].life == 10 && sender != E::PSCN && sender != E::NSCN {
                    sim.spark_conductive(ri, nx, ny);
                }
            }
            E::INST | E::WIRE => {
                sim.spark_all_attempt(ri, nx, ny);
            }
            _ => {
                sim.spark_conductive_attempt(ri, nx, ny);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::SlotHint;
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

    fn sparked(sim: &mut Simulation, x: i32, y: i32, t: u16) -> usize {
        let i = sim.part_create(SlotHint::Auto, x, y, t).unwrap();
        sim.spark_conductive(i, x, y);
        i
    }

    #[test]
    fn test_spent_spark_reverts_with_recharge() {
        let mut sim = sim();
        let s = sparked(&mut sim, 10, 10, E::METL);
        sim.parts[s].life = 0;
        Spark.update(&mut sim, &ctx(s, 10, 10));
        assert_eq!(sim.parts[s].element, E::METL);
        assert_eq!((sim.parts[s].ctype, sim.parts[s].life), (0, 4));
    }

    #[test]
    fn test_water_recharges_slowly_at_room_temperature() {
        let mut sim = sim();
        let s = sparked(&mut sim, 10, 10, E::WATR);
        sim.parts[s].life = 0;
        sim.parts[s].temp = 350.0;
        Spark.update(&mut sim, &ctx(s, 10, 10));
        assert_eq!(sim.parts[s].element, E::WATR);
        assert_eq!(sim.parts[s].life, 64);
        assert_eq!(sim.parts[s].temp, ROOM_TEMP);
    }

    #[test]
    fn test_unknown_ctype_reverts_to_metal() {
        let mut sim = sim();
        let s = sparked(&mut sim, 10, 10, E::METL);
        sim.parts[s].ctype = 0;
        sim.parts[s].life = 0;
        Spark.update(&mut sim, &ctx(s, 10, 10));
        assert_eq!(sim.parts[s].element, E::METL);
    }

    #[test]
    fn test_spark_travels_along_metal() {
        let mut sim = sim();
        let s = sparked(&mut sim, 10, 10, E::METL);
        let next = sim.part_create(SlotHint::Auto, 12, 10, E::METL).unwrap();
        // Too fresh to conduct
        Spark.update(&mut sim, &ctx(s, 10, 10));
        assert_eq!(sim.parts[next].element, E::METL);
        sim.parts[s].life = 3;
        Spark.update(&mut sim, &ctx(s, 10, 10));
        assert_eq!(sim.parts[next].element, E::SPRK);
        assert_eq!(sim.parts[next].ctype, E::METL as i32);
    }

    #[test]
    fn test_insulator_blocks_current() {
        let mut sim = sim();
        let s = sparked(&mut sim, 10, 10, E::METL);
        sim.part_create(SlotHint::Auto, 11, 10, E::INSL).unwrap();
        let far = sim.part_create(SlotHint::Auto, 12, 10, E::METL).unwrap();
        sim.parts[s].life = 3;
        Spark.update(&mut sim, &ctx(s, 10, 10));
        assert_eq!(sim.parts[far].element, E::METL);
    }

    #[test]
    fn test_n_type_does_not_feed_p_type() {
        let mut sim = sim();
        let s = sparked(&mut sim, 10, 10, E::NSCN);
        let p = sim.part_create(SlotHint::Auto, 11, 10, E::PSCN).unwrap();
        let m = sim.part_create(SlotHint::Auto, 9, 10, E::METL).unwrap();
        sim.parts[s].life = 3;
        Spark.update(&mut sim, &ctx(s, 10, 10));
        assert_eq!(sim.parts[p].element, E::PSCN);
        assert_eq!(sim.parts[m].element, E::SPRK);
    }

    #[test]
    fn test_recharging_conductor_is_skipped() {
        let mut sim = sim();
        let s = sparked(&mut sim, 10, 10, E::METL);
        let m = sim.part_create(SlotHint::Auto, 11, 10, E::METL).unwrap();
        sim.parts[m].life = 2;
        sim.parts[s].life = 3;
        Spark.update(&mut sim, &ctx(s, 10, 10));
        assert_eq!(sim.parts[m].element, E::METL);
    }
}
