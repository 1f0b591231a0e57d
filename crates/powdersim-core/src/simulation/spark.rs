//! Sparking conductors and the shared update of powered elements

use powdersim_simulation::{ElementId as E, Properties as P, round_pos};

use super::Simulation;
use crate::elements::{UpdateContext, neighbours_5x5};

/// Conductors that warm up a little each time they carry a spark
const SPARK_HEATED: [u16; 8] = [E::METL, E::BMTL, E::BRMT, E::PSCN, E::NSCN, E::ETRD, E::NBLE, E::IRON];
const SPARK_HEAT_LIMIT: f32 = 673.0;

/// Powered elements that do not toggle from a spark next to them
const POWER_IGNORES_SPARK: [u16; 4] = [E::PUMP, E::GPMP, E::HSWC, E::PBCN];

impl Simulation {
    /// Turn a conductor into SPRK carrying its old type in `ctype`
    pub fn spark_conductive(&mut self, i: usize, x: i32, y: i32) {
        let old = self.parts[i].element;
        self.part_change_type(i, x, y, E::SPRK);
        let p = &mut self.parts[i];
        p.ctype = old as i32;
        p.life = match old {
            E::WATR => 6,
            E::SLTW => 5,
            _ => 4,
        };
        if p.temp < SPARK_HEAT_LIMIT && !self.settings.legacy_enable && SPARK_HEATED.contains(&old) {
            p.temp = (p.temp + 10.0).min(SPARK_HEAT_LIMIT);
        }
    }

    /// Spark any sparkable particle, handling WIRE specially
    pub fn spark_all(&mut self, i: usize, x: i32, y: i32) {
        if self.parts[i].element == E::WIRE {
            self.parts[i].ctype = E::DUST as i32;
        } else {
            self.spark_conductive(i, x, y);
        }
    }

    /// [`Simulation::spark_all`] if the particle can take a spark now
    pub fn spark_all_attempt(&mut self, i: usize, x: i32, y: i32) -> bool {
        let p = self.parts[i];
        if (p.element == E::WIRE && p.ctype <= 0) || (p.element == E::INST && p.life <= 0) {
            self.spark_all(i, x, y);
            true
        } else {
            self.spark_conductive_attempt(i, x, y)
        }
    }

    /// [`Simulation::spark_conductive`] if the particle conducts and is not recharging
    pub fn spark_conductive_attempt(&mut self, i: usize, x: i32, y: i32) -> bool {
        let p = self.parts[i];
        if p.life == 0 && self.elements.get(p.element).properties.contains(P::CONDUCTS) {
            self.spark_conductive(i, x, y);
            true
        } else {
            false
        }
    }

    /// Element found between particles `ci` and `ni`
    ///
    /// For INSL the exact midpoint type is returned so insulators block
    /// current; for anything else returns `t` only if it sits there.
    pub fn parts_avg(&self, ci: usize, ni: usize, t: u16) -> u16 {
        let (a, b) = (&self.parts[ci], &self.parts[ni]);
        if t == E::INSL {
            let mx = (round_pos(a.x) + round_pos(b.x)) / 2;
            let my = (round_pos(a.y) + round_pos(b.y)) / 2;
            return self.map.pmap(mx, my).element();
        }
        let mx = round_pos((a.x + b.x) / 2.0);
        let my = round_pos((a.y + b.y) / 2.0);
        let r = self.map.pmap(mx, my);
        if r.occupant().is_some() && self.parts[r.index()].element == t {
            t
        } else {
            E::NONE
        }
    }

    /// Switch logic shared by all elements with the POWERED property
    ///
    /// `life == 10` means on, 1 to 9 is turning off. Returns true when the
    /// particle was turned into a spark and must not update further.
    pub(crate) fn update_powered(&mut self, ctx: &UpdateContext) -> bool {
        let (i, x, y) = (ctx.index, ctx.x, ctx.y);
        let t = self.parts[i].element;
        if self.parts[i].life > 0 && self.parts[i].life != 10 {
            self.parts[i].life -= 1;
        }

        for (rx, ry) in neighbours_5x5() {
            let r = self.map.pmap(x + rx, y + ry);
            let Some(ri) = r.occupant() else {
                continue;
            };
            let rt = r.element();
            if t == E::SWCH && self.parts_avg(i, ri, E::INSL) == E::INSL {
                continue;
            }
            let other = self.parts[ri];

            if rt == t && t == E::SWCH {
                let life = self.parts[i].life;
                if life >= 10 && other.life > 0 && other.life < 10 {
                    self.parts[i].life = 9;
                } else if life == 0 && other.life >= 10 {
                    // Copy the neighbour's life so a freshly sparked switch does not loop
                    self.parts[i].life = other.life;
                }
            }

            if rt == E::SPRK && other.life > 0 && (other.life < 4 || t == E::SWCH) {
                if POWER_IGNORES_SPARK.contains(&t) {
                    continue;
                }
                let life = self.parts[i].life;
                if t != E::SWCH && other.ctype == E::PSCN as i32 && life < 10 {
                    self.parts[i].life = 10;
                } else if t != E::SWCH && other.ctype == E::NSCN as i32 {
                    self.parts[i].life = 9;
                } else if t == E::SWCH
                    && other.ctype != E::PSCN as i32
                    && other.ctype != E::NSCN as i32
                    && !(other.ctype == E::INWR as i32 && other.tmp == 1)
                    && life == 10
                {
                    self.spark_conductive(i, x, y);
                    return true;
                }
            }

            if rt == t && t != E::SWCH {
                let life = self.parts[i].life;
                if life == 10 && other.life > 0 && other.life < 10 {
                    self.parts[i].life = 9;
                } else if life == 0 && other.life == 10 {
                    self.parts[i].life = 10;
                }
            }
        }
        false
    }
}
