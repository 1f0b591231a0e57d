//! IRON rusts into BMTL next to salt, water and oxygen

use powdersim_simulation::ElementId as E;

use super::{ElementBehavior, UpdateContext, neighbours_3x3};
use crate::rng::SimRng;
use crate::simulation::Simulation;

pub struct Iron;

/// One in `n` chance per tick and neighbour of rusting
fn rust_odds(t: u16) -> Option<i32> {
    match t {
        E::SALT => Some(47),
        E::SLTW => Some(67),
        E::WATR => Some(1200),
        E::O2 => Some(250),
        E::LO2 => Some(1),
        _ => None,
    }
}

impl ElementBehavior for Iron {
    fn update(&self, sim: &mut Simulation, ctx: &UpdateContext) -> bool {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        // Still recharging from a spark
        if sim.parts[i].life != 0 {
            return false;
        }
        for (rx, ry) in neighbours_3x3() {
            let t = sim.map().pmap(x + rx, y + ry).element();
            if let Some(n) = rust_odds(t)
                && sim.rng().chance(1, n)
            {
                sim.part_change_type(i, x, y, E::BMTL);
                sim.parts[i].tmp = sim.rng().between(20, 29);
                break;
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
    fn test_salt_rusts_iron() {
        let mut sim = Simulation::new(SimSettings {
            seed: 3,
            ..Default::default()
        });
        let i = sim.part_create(SlotHint::Auto, 40, 40, E::IRON).unwrap();
        sim.part_create(SlotHint::Auto, 41, 40, E::SALT).unwrap();
        for _ in 0..2000 {
            Iron.update(&mut sim, &ctx(i, 40, 40));
            if sim.parts[i].element != E::IRON {
                break;
            }
        }
        assert_eq!(sim.parts[i].element, E::BMTL);
        assert!((20..=29).contains(&sim.parts[i].tmp));
    }

    #[test]
    fn test_recharging_iron_does_not_rust() {
        let mut sim = Simulation::default();
        let i = sim.part_create(SlotHint::Auto, 40, 40, E::IRON).unwrap();
        sim.part_create(SlotHint::Auto, 41, 40, E::SALT).unwrap();
        sim.parts[i].life = 3;
        for _ in 0..500 {
            Iron.update(&mut sim, &ctx(i, 40, 40));
        }
        assert_eq!(sim.parts[i].element, E::IRON);
    }
}
