//! EMBR: glowing debris that goes out when it lands on something

use powdersim_simulation::Properties as P;

use super::{ElementBehavior, UpdateContext, neighbours_3x3};
use crate::simulation::Simulation;

pub struct Ember;

impl ElementBehavior for Ember {
    fn update(&self, sim: &mut Simulation, ctx: &UpdateContext) -> bool {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        let touches_matter = neighbours_3x3().any(|(rx, ry)| {
            let r = sim.map().pmap(x + rx, y + ry);
            if r.is_empty() {
                return false;
            }
            let props = sim.element(r.element()).properties;
            props.intersects(P::TYPE_SOLID | P::TYPE_PART | P::TYPE_LIQUID)
                && !props.contains(P::SPARKSETTLE)
        });
        if touches_matter {
            sim.part_kill(i);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::SlotHint;
    use crate::settings::SimSettings;
    use powdersim_simulation::{ElementId as E, PackedCell};

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
    fn test_ember_goes_out_on_contact() {
        let mut sim = Simulation::new(SimSettings::default());
        let e = sim.part_create(SlotHint::Auto, 30, 30, E::EMBR).unwrap();
        assert!(!Ember.update(&mut sim, &ctx(e, 30, 30)));

        // Other embers and bombs do not count
        sim.part_create(SlotHint::Auto, 31, 30, E::BOMB).unwrap();
        assert!(!Ember.update(&mut sim, &ctx(e, 30, 30)));

        sim.part_create(SlotHint::Auto, 30, 31, E::STNE).unwrap();
        assert!(Ember.update(&mut sim, &ctx(e, 30, 30)));
        assert!(sim.parts[e].is_empty());
    }

    #[test]
    fn test_gases_do_not_stop_embers() {
        let mut sim = Simulation::new(SimSettings::default());
        let e = sim.part_create(SlotHint::Auto, 30, 30, E::EMBR).unwrap();
        sim.part_create(SlotHint::Auto, 29, 29, E::SMKE).unwrap();
        assert!(!Ember.update(&mut sim, &ctx(e, 30, 30)));
    }
}
