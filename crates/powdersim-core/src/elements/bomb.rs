//! BOMB: blows a round hole on contact and showers embers

use powdersim_simulation::{ElementId as E, MAX_TEMP, Properties as P, in_bounds};

use super::{ElementBehavior, SlotHint, UpdateContext, neighbours_3x3};
use crate::rng::SimRng;
use crate::simulation::Simulation;

/// Radius of the destroyed disc
const BLAST_RADIUS: i32 = 8;

pub struct Bomb;

/// Elements a blast can neither trigger on nor destroy
fn blast_proof(sim: &Simulation, t: u16) -> bool {
    matches!(t, E::VIBR | E::BCLN)
        || sim
            .element(t)
            .properties
            .intersects(P::INDESTRUCTIBLE | P::CLONE)
}

impl ElementBehavior for Bomb {
    fn update(&self, sim: &mut Simulation, ctx: &UpdateContext) -> bool {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        let triggered = neighbours_3x3().any(|(rx, ry)| {
            let r = sim.map().pmap(x + rx, y + ry);
            !r.is_empty() && !matches!(r.element(), E::BOMB | E::EMBR) && !blast_proof(sim, r.element())
        });
        if !triggered {
            return false;
        }
        explode(sim, i, x, y);
        true
    }
}

fn within(dx: i32, dy: i32, radius: i32) -> bool {
    dx * dx + dy * dy <= radius * radius
}

fn explode(sim: &mut Simulation, i: usize, x: i32, y: i32) {
    // The bomb's own pixel is part of the blast
    sim.pmap_remove(i, x, y);

    for dy in -BLAST_RADIUS..=BLAST_RADIUS {
        for dx in -BLAST_RADIUS..=BLAST_RADIUS {
            let (nx, ny) = (x + dx, y + dy);
            if !within(dx, dy, BLAST_RADIUS) || !in_bounds(nx, ny) {
                continue;
            }
            let r = sim.map().pmap(nx, ny);
            if blast_proof(sim, r.element()) {
                continue;
            }
            if let Some(ri) = r.occupant() {
                sim.part_kill(ri);
            }
            *sim.pv_at_mut(nx, ny) += 0.1;
            if let Some(nb) = sim.part_create(SlotHint::Unchecked, nx, ny, E::EMBR) {
                let p = &mut sim.parts[nb];
                p.tmp = 2;
                p.life = 2;
                p.temp = MAX_TEMP;
            }
        }
    }

    // Sparks thrown out from the rim
    let rim = BLAST_RADIUS + 1;
    for dy in -rim..=rim {
        for dx in -rim..=rim {
            let (nx, ny) = (x + dx, y + dy);
            if !within(dx, dy, rim) || !sim.map().pmap(nx, ny).is_empty() {
                continue;
            }
            if let Some(nb) = sim.part_create(SlotHint::Unchecked, nx, ny, E::EMBR) {
                let vx = sim.rng().between(-20, 20) as f32;
                let vy = sim.rng().between(-20, 20) as f32;
                let p = &mut sim.parts[nb];
                p.tmp = 0;
                p.life = 50;
                p.temp = MAX_TEMP;
                p.vx = vx;
                p.vy = vy;
            }
        }
    }
    sim.part_kill(i);
}

#[cfg(test)]
mod tests {
    use super::*;
    use powdersim_simulation::PackedCell;
    use crate::settings::SimSettings;

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
    fn test_bomb_waits_for_contact() {
        let mut sim = Simulation::new(SimSettings::default());
        let b = sim.part_create(SlotHint::Auto, 100, 100, E::BOMB).unwrap();
        sim.part_create(SlotHint::Auto, 101, 100, E::BOMB).unwrap();
        assert!(!Bomb.update(&mut sim, &ctx(b, 100, 100)));
        assert_eq!(sim.parts[b].element, E::BOMB);
    }

    #[test]
    fn test_blast_clears_disc_but_spares_clone() {
        let mut sim = Simulation::new(SimSettings::default());
        let b = sim.part_create(SlotHint::Auto, 100, 100, E::BOMB).unwrap();
        let s = sim.part_create(SlotHint::Auto, 100, 101, E::STNE).unwrap();
        let c = sim.part_create(SlotHint::Auto, 104, 100, E::CLNE).unwrap();
        let far = sim.part_create(SlotHint::Auto, 120, 100, E::STNE).unwrap();

        assert!(Bomb.update(&mut sim, &ctx(b, 100, 100)));
        assert_ne!(sim.parts[b].element, E::BOMB);
        assert_eq!(sim.map().pmap(100, 101).element(), E::EMBR);
        assert_ne!(sim.parts[s].element, E::STNE);
        assert_eq!(sim.parts[c].element, E::CLNE);
        assert_eq!(sim.parts[far].element, E::STNE);
        assert_eq!(sim.map().pmap(100, 100).element(), E::EMBR);
        assert!(sim.pv_at(100, 100) > 0.0);
    }
}
