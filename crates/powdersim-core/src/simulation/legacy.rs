//! Simple state changes used instead of heat simulation in legacy mode

use powdersim_simulation::{ElementId as E, in_bounds};

use super::Simulation;
use crate::elements::{UpdateContext, neighbours_5x5};

impl Simulation {
    /// Neighbour-driven conversions for water, ice and a few pressure-sensitive liquids
    pub(crate) fn update_legacy_all(&mut self, ctx: &UpdateContext) {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        match self.parts[i].element {
            E::WTRV => {
                for (rx, ry) in neighbours_5x5() {
                    let (nx, ny) = (x + rx, y + ry);
                    let Some((ri, rt)) = self.legacy_neighbour(nx, ny) else {
                        continue;
                    };
                    if matches!(rt, E::WATR | E::DSTW | E::SLTW) && self.rng.chance(1, 1000) {
                        self.part_change_type(i, x, y, E::WATR);
                        self.part_change_type(ri, nx, ny, E::WATR);
                    }
                    if matches!(rt, E::ICEI | E::SNOW) && self.rng.chance(1, 1000) {
                        self.part_change_type(i, x, y, E::WATR);
                        if self.rng.chance(1, 1000) {
                            self.part_change_type(ri, nx, ny, E::WATR);
                        }
                    }
                }
                if self.pv_at(x, y) > 4.0 {
                    self.part_change_type(i, x, y, E::DSTW);
                }
            }
            E::WATR | E::DSTW => {
                for (rx, ry) in neighbours_5x5() {
                    if let Some((_, rt)) = self.legacy_neighbour(x + rx, y + ry)
                        && (rt == E::FIRE || rt == E::LAVA)
                        && self.rng.chance(1, 10)
                    {
                        self.part_change_type(i, x, y, E::WTRV);
                    }
                }
            }
            E::SLTW => {
                for (rx, ry) in neighbours_5x5() {
                    if let Some((_, rt)) = self.legacy_neighbour(x + rx, y + ry)
                        && (rt == E::FIRE || rt == E::LAVA)
                        && self.rng.chance(1, 10)
                    {
                        let into = if self.rng.chance(1, 4) { E::SALT } else { E::WTRV };
                        self.part_change_type(i, x, y, into);
                    }
                }
            }
            E::ICEI => {
                for (rx, ry) in neighbours_5x5() {
                    let (nx, ny) = (x + rx, y + ry);
                    if let Some((ri, rt)) = self.legacy_neighbour(nx, ny)
                        && (rt == E::WATR || rt == E::DSTW)
                        && self.rng.chance(1, 1000)
                    {
                        self.part_change_type(i, x, y, E::ICEI);
                        self.part_change_type(ri, nx, ny, E::ICEI);
                    }
                }
            }
            E::SNOW => {
                for (rx, ry) in neighbours_5x5() {
                    let (nx, ny) = (x + rx, y + ry);
                    let Some((ri, rt)) = self.legacy_neighbour(nx, ny) else {
                        continue;
                    };
                    let watery = rt == E::WATR || rt == E::DSTW;
                    if watery && self.rng.chance(1, 1000) {
                        self.part_change_type(i, x, y, E::ICEI);
                        self.part_change_type(ri, nx, ny, E::ICEI);
                    }
                    if watery && self.rng.chance(3, 200) {
                        self.part_change_type(i, x, y, E::WATR);
                    }
                }
            }
            E::OIL => {
                if self.pv_at(x, y) < -6.0 {
                    self.part_change_type(i, x, y, E::GAS);
                }
            }
            E::GAS => {
                if self.pv_at(x, y) > 6.0 {
                    self.part_change_type(i, x, y, E::OIL);
                }
            }
            E::DESL => {
                if self.pv_at(x, y) > 12.0 {
                    self.part_change_type(i, x, y, E::FIRE);
                    self.parts[i].life = self.rng.between(120, 169);
                }
            }
            _ => {}
        }
    }

    fn legacy_neighbour(&self, x: i32, y: i32) -> Option<(usize, u16)> {
        if !in_bounds(x, y) {
            return None;
        }
        let r = self.map.pmap(x, y);
        r.occupant().map(|ri| (ri, r.element()))
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
    fn test_compressed_oil_and_gas() {
        let mut sim = Simulation::new(SimSettings {
            legacy_enable: true,
            ..Default::default()
        });
        let g = sim.part_create(SlotHint::Auto, 10, 10, E::GAS).unwrap();
        *sim.pv_at_mut(10, 10) = 7.0;
        sim.update_legacy_all(&ctx(g, 10, 10));
        assert_eq!(sim.parts[g].element, E::OIL);
        *sim.pv_at_mut(10, 10) = -7.0;
        sim.update_legacy_all(&ctx(g, 10, 10));
        assert_eq!(sim.parts[g].element, E::GAS);
    }

    #[test]
    fn test_water_near_fire_evaporates() {
        let mut sim = Simulation::new(SimSettings {
            legacy_enable: true,
            seed: 99,
            ..Default::default()
        });
        let w = sim.part_create(SlotHint::Auto, 100, 100, E::WATR).unwrap();
        sim.part_create(SlotHint::Auto, 101, 100, E::FIRE).unwrap();
        for _ in 0..500 {
            sim.update_legacy_all(&ctx(w, 100, 100));
            if sim.parts[w].element != E::WATR {
                break;
            }
        }
        assert_eq!(sim.parts[w].element, E::WTRV);
    }
}
