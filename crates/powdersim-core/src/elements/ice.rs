//! ICEI and SNOW: frozen water that salt melts into SLTW

use powdersim_simulation::ElementId as E;

use super::{ElementBehavior, UpdateContext, neighbours_3x3};
use crate::rng::SimRng;
use crate::simulation::Simulation;

pub struct Ice;

impl ElementBehavior for Ice {
    /// Remember what melting should give back, water unless told otherwise
    fn on_create(&self, sim: &mut Simulation, i: usize, _x: i32, _y: i32, _element: u16, v: i32) {
        let frozen = if sim.elements.is_element(v) && v != E::ICEI as i32 && v != E::SNOW as i32 {
            v
        } else {
            E::WATR as i32
        };
        sim.parts[i].ctype = frozen;
    }

    fn update(&self, sim: &mut Simulation, ctx: &UpdateContext) -> bool {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        let t = sim.parts[i].element;
        // Salt only helps ice that is not far below the brine's freezing point
        let brine_freeze = sim.element(E::SLTW).low_temperature.threshold;
        if t == E::ICEI && sim.parts[i].temp <= brine_freeze {
            return false;
        }
        for (rx, ry) in neighbours_3x3() {
            let (nx, ny) = (x + rx, y + ry);
            let r = sim.map().pmap(nx, ny);
            let Some(ri) = r.occupant() else {
                continue;
            };
            if matches!(r.element(), E::SALT | E::SLTW) && sim.rng().chance(1, 200) {
                sim.part_change_type(i, x, y, E::SLTW);
                sim.part_change_type(ri, nx, ny, E::SLTW);
                return false;
            }
        }
        false
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

    #[test]
    fn test_ice_defaults_to_water() {
        let mut sim = Simulation::default();
        let i = sim.part_create(SlotHint::Auto, 40, 40, E::ICEI).unwrap();
        assert_eq!(sim.parts[i].ctype, E::WATR as i32);
        let j = sim
            .part_create_with(SlotHint::Auto, 41, 40, E::ICEI, E::SLTW as i32)
            .unwrap();
        assert_eq!(sim.parts[j].ctype, E::SLTW as i32);
    }

    #[test]
    fn test_salt_melts_ice() {
        let mut sim = Simulation::new(SimSettings {
            seed: 11,
            ..Default::default()
        });
        let i = sim.part_create(SlotHint::Auto, 40, 40, E::ICEI).unwrap();
        let s = sim.part_create(SlotHint::Auto, 40, 41, E::SALT).unwrap();
        sim.parts[i].temp = 260.0;
        for _ in 0..5000 {
            Ice.update(&mut sim, &ctx(i, 40, 40));
            if sim.parts[i].element != E::ICEI {
                break;
            }
        }
        assert_eq!(sim.parts[i].element, E::SLTW);
        assert_eq!(sim.parts[s].element, E::SLTW);
    }

    #[test]
    fn test_deep_frozen_ice_ignores_salt() {
        let mut sim = Simulation::default();
        let i = sim.part_create(SlotHint::Auto, 40, 40, E::ICEI).unwrap();
        sim.part_create(SlotHint::Auto, 40, 41, E::SALT).unwrap();
        sim.parts[i].temp = 200.0;
        for _ in 0..2000 {
            Ice.update(&mut sim, &ctx(i, 40, 40));
        }
        assert_eq!(sim.parts[i].element, E::ICEI);
    }
}
