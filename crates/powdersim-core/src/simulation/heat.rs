//! Heat exchange and the temperature, pressure and gravity state transitions

use glam::Vec2;
use powdersim_simulation::{
    ElementId as E, MAX_TEMP, MIN_TEMP, PT_NUM, PackedCell, Properties as P, TransitionTarget,
    XCNTR, XRES, YCNTR, YRES, restrict_flt, round_pos,
};

use super::Simulation;
use crate::fields::cell_of;

/// Scale applied to conductivity-weighted heat capacity in realistic mode
const HEAT_CAPACITY: f32 = 96.645;
/// Freezing point of molten rock with an unrecognised ctype
const LAVA_FREEZE: f32 = 973.0;

/// Result of looking up a temperature transition
enum Shift {
    /// Become this element (0 kills)
    To(u16),
    /// No change this tick
    Stay,
}

impl Simulation {
    /// Gravity acting on a particle at (x, y)
    ///
    /// Combines the Newtonian field scaled by `newton_grav` with the mode
    /// gravity scaled by `particle_grav`.
    pub fn gravity_field(&self, x: i32, y: i32, particle_grav: f32, newton_grav: f32) -> Vec2 {
        let mut g = newton_grav * self.gravity_grid_at(x, y);
        match self.settings.gravity_mode {
            1 => {}
            2 => {
                if x != XCNTR || y != YCNTR {
                    let (dx, dy) = ((x - XCNTR) as f32, (y - YCNTR) as f32);
                    let mult = particle_grav / (dx * dx + dy * dy).sqrt();
                    g.x -= mult * dx;
                    g.y -= mult * dy;
                }
            }
            _ => g.y += particle_grav,
        }
        g
    }

    /// Pressure with coordinates clamped into the grid
    fn pv_clamped(&self, x: i32, y: i32) -> f32 {
        self.pv_at(x.clamp(0, XRES - 1), y.clamp(0, YRES - 1))
    }

    /// Pressure felt by ceramic: the sum over a plus-shaped neighbourhood
    fn ceramic_pressure(&self, x: i32, y: i32) -> f32 {
        let sum = self.pv_clamped(x, y)
            + self.pv_clamped(x, y - 2)
            + self.pv_clamped(x, y + 2)
            + self.pv_clamped(x - 2, y)
            + self.pv_clamped(x + 2, y);
        (sum * 2.0).max(0.0)
    }

    /// Exchange heat with neighbours and the ambient grid, then apply
    /// temperature transitions
    ///
    /// Returns true when the particle changed type or was killed.
    pub(crate) fn transfer_heat(&mut self, i: usize, t: u16, surround: &[PackedCell; 8]) -> bool {
        let x = round_pos(self.parts[i].x);
        let y = round_pos(self.parts[i].y);
        let mut t = t;
        let el = self.elements.get(t);
        let props = el.properties;
        let heat_conduct = el.heat_conduct as f32;
        let weight = el.weight.abs() as f32;
        let realistic = self.settings.realistic_heat;
        let cell = cell_of(x, y);

        let gel_scale = if t == E::GEL {
            self.parts[i].tmp as f32 * 2.55
        } else {
            1.0
        };

        // Convection: hot liquid rises through its own kind
        if props.is_liquid()
            && (t != E::GEL || gel_scale > self.rng.between(1, 255) as f32)
            && y - 2 >= 0
            && y - 2 < YRES
        {
            let r = self.map.pmap(x, y - 2);
            if let Some(ri) = r.occupant()
                && r.element() == self.parts[i].element
                && self.parts[i].temp > self.parts[ri].temp
            {
                let swap = self.parts[i].temp;
                self.parts[i].temp = self.parts[ri].temp;
                self.parts[ri].temp = swap;
            }
        }

        let conduct = heat_conduct * gel_scale;
        if !((t != E::HSWC || self.parts[i].life == 10)
            && conduct != 0.0
            && (realistic || conduct > self.rng.between(0, 249) as f32))
        {
            if self.air.blockairh[cell] & 0x8 == 0 {
                self.air.blockairh[cell] = self.air.blockairh[cell].wrapping_add(1);
            }
            self.parts[i].temp = restrict_flt(self.parts[i].temp, MIN_TEMP, MAX_TEMP);
            return false;
        }

        let own_capacity = |heat_conduct: f32| HEAT_CAPACITY / heat_conduct * gel_scale * weight;
        let mut pt;
        let mut c_heat = 0.0f32;
        let mut c_cm = 0.0f32;

        if self.settings.aheat_enable && !props.contains(P::NOAMBHEAT) {
            let hv = self.air.hv[cell];
            if realistic {
                let pv = self.air.pv[cell];
                let heat = self.parts[i].temp * own_capacity(heat_conduct) + hv * 100.0 * (pv + 273.15) / 256.0;
                let cm = own_capacity(heat_conduct) + 100.0 * (pv + 273.15) / 256.0;
                let pt = restrict_flt(heat / cm, -MAX_TEMP + MIN_TEMP, MAX_TEMP - MIN_TEMP);
                self.parts[i].temp = pt;
                // Heating the air raises its pressure
                self.air.pv[cell] += (pt - hv) * 0.004;
                self.air.hv[cell] = pt;
            } else {
                let delta = restrict_flt((hv - self.parts[i].temp) * 0.04, -MAX_TEMP + MIN_TEMP, MAX_TEMP - MIN_TEMP);
                self.parts[i].temp += delta;
                self.air.hv[cell] -= delta;
            }
        }

        let mut conductors = [i; 8];
        let mut h_count = 0;
        for (slot, r) in conductors.iter_mut().zip(surround) {
            let Some(ri) = r.occupant() else {
                continue;
            };
            let rt = r.element();
            let other = self.elements.get(rt);
            if other.heat_conduct == 0
                || (rt == E::HSWC && self.parts[ri].life != 10)
                || (t == E::FILT && matches!(rt, E::BRAY | E::BIZR | E::BIZRG))
                || (rt == E::FILT && matches!(t, E::BRAY | E::BIZR | E::BIZRG | E::PHOT))
                || (t == E::ELEC && rt == E::DEUT)
                || (t == E::DEUT && rt == E::ELEC)
            {
                continue;
            }
            *slot = ri;
            if realistic {
                let cap = HEAT_CAPACITY / other.heat_conduct as f32 * other.weight.abs() as f32;
                c_heat += self.parts[ri].temp * cap;
                c_cm += cap;
            } else {
                c_heat += self.parts[ri].temp;
            }
            h_count += 1;
        }

        if realistic {
            let cap = own_capacity(heat_conduct);
            pt = if t == E::PHOT {
                (c_heat + self.parts[i].temp * HEAT_CAPACITY) / (c_cm + HEAT_CAPACITY)
            } else {
                (c_heat + self.parts[i].temp * cap) / (c_cm + cap)
            };
            c_heat += self.parts[i].temp * cap;
            c_cm += cap;
            self.parts[i].temp = restrict_flt(pt, MIN_TEMP, MAX_TEMP);
        } else if h_count == 0 {
            pt = self.parts[i].temp;
        } else {
            pt = restrict_flt((c_heat + self.parts[i].temp) / (h_count + 1) as f32, MIN_TEMP, MAX_TEMP);
            for &j in &conductors {
                self.parts[j].temp = pt;
            }
            self.parts[i].temp = pt;
        }

        // Boiling and condensation points shift with pressure
        let mut ctemph = pt;
        let mut ctempl = pt;
        let (high_t, low_t) = {
            let el = self.elements.get(t);
            (el.high_temperature, el.low_temperature)
        };
        let latent = self.elements.get(t).latent as f32;
        let target_props = |target: TransitionTarget| match target {
            TransitionTarget::Element(id) if self.elements.is_element_or_none(id as i32) => {
                Some(self.elements.get(id).properties)
            }
            _ => None,
        };
        if (props.is_liquid() && target_props(high_t.target).is_some_and(|p| p.is_gas()))
            || t == E::LNTG
            || t == E::SLTW
        {
            ctemph -= 2.0 * self.air.pv[cell];
        } else if (props.is_gas() && target_props(low_t.target).is_some_and(|p| p.is_liquid()))
            || t == E::WTRV
        {
            ctempl -= 2.0 * self.air.pv[cell];
        }

        let mut changed = false;
        if !props.contains(P::INDESTRUCTIBLE) {
            if (t == E::ICEI || t == E::SNOW) && {
                let ctype = self.parts[i].ctype;
                !self.elements.is_element(ctype) || ctype == E::ICEI as i32 || ctype == E::SNOW as i32
            } {
                self.parts[i].ctype = E::WATR as i32;
            }

            let shift = if high_t.is_some() && ctemph >= high_t.threshold {
                let dbt = ctempl - pt;
                let threshold = high_t.threshold;
                match high_t.target {
                    TransitionTarget::Element(target) => {
                        if !realistic {
                            Shift::To(target)
                        } else if latent <= c_heat - (threshold - dbt) * c_cm {
                            pt = (c_heat - latent) / c_cm;
                            Shift::To(target)
                        } else {
                            self.parts[i].temp = restrict_flt(threshold - dbt, MIN_TEMP, MAX_TEMP);
                            Shift::Stay
                        }
                    }
                    TransitionTarget::Special => {
                        self.high_temperature_special(i, t, x, y, ctemph, dbt, c_heat, c_cm, &mut pt)
                    },
                    TransitionTarget::None => Shift::Stay,
                }
            } else if low_t.is_some() && ctempl < low_t.threshold {
                let dbt = ctempl - pt;
                let threshold = low_t.threshold;
                match low_t.target {
                    TransitionTarget::Element(target) => {
                        let latent = self.elements.get(target).latent as f32;
                        if !realistic {
                            Shift::To(target)
                        } else if latent >= c_heat - (threshold - dbt) * c_cm {
                            pt = (c_heat + latent) / c_cm;
                            Shift::To(target)
                        } else {
                            self.parts[i].temp = restrict_flt(threshold - dbt, MIN_TEMP, MAX_TEMP);
                            Shift::Stay
                        }
                    }
                    TransitionTarget::Special => self.low_temperature_special(i, t, x, y, pt, ctemph),
                    TransitionTarget::None => Shift::Stay,
                }
            } else {
                Shift::Stay
            };

            if realistic {
                pt = restrict_flt(pt, MIN_TEMP, MAX_TEMP);
                for &j in &conductors {
                    self.parts[j].temp = pt;
                }
            }

            if let Shift::To(new_type) = shift {
                changed = true;
                t = new_type;
                if self.apply_temperature_shift(i, x, y, t) {
                    return true;
                }
            }
        }

        self.parts[i].temp = restrict_flt(self.parts[i].temp, MIN_TEMP, MAX_TEMP);
        if t == E::LAVA {
            let p = &mut self.parts[i];
            p.life = restrict_flt((p.temp - 700.0) / 7.0, 0.0, 400.0) as i32;
            if p.ctype == E::THRM as i32 && p.tmp > 0 {
                p.tmp -= 1;
                p.temp = 3500.0;
            }
            if p.ctype == E::PLUT as i32 && p.tmp > 0 {
                p.tmp -= 1;
                p.temp = MAX_TEMP;
            }
        }
        changed
    }

    /// Melting of elements whose high temperature target depends on state
    #[allow(clippy::too_many_arguments)]
    fn high_temperature_special(
        &mut self,
        i: usize,
        t: u16,
        x: i32,
        y: i32,
        ctemph: f32,
        dbt: f32,
        c_heat: f32,
        c_cm: f32,
        pt: &mut f32,
    ) -> Shift {
        let realistic = self.settings.realistic_heat;
        match t {
            E::ICEI | E::SNOW => {
                // Ice melts back into whatever froze
                let ctype = self.parts[i].ctype;
                if ctype <= 0 || ctype as usize >= PT_NUM || ctype == t as i32 {
                    return Shift::Stay;
                }
                let frozen = self.elements.get(ctype as u16);
                let melt_point = match frozen.low_temperature.target {
                    TransitionTarget::Element(E::ICEI) | TransitionTarget::Element(E::SNOW) => {
                        frozen.low_temperature.threshold
                    }
                    _ => 273.15,
                };
                if *pt < melt_point {
                    return Shift::Stay;
                }
                if realistic {
                    let latent = self.elements.get(t).latent as f32;
                    let threshold = frozen.low_temperature.threshold;
                    if latent <= c_heat - (threshold - dbt) * c_cm {
                        *pt = (c_heat - latent) / c_cm;
                    } else {
                        self.parts[i].temp = restrict_flt(threshold - dbt, MIN_TEMP, MAX_TEMP);
                        return Shift::Stay;
                    }
                }
                self.parts[i].ctype = E::NONE as i32;
                self.parts[i].life = 0;
                Shift::To(ctype as u16)
            }
            E::SLTW => {
                if realistic {
                    let el = self.elements.get(t);
                    let (latent, threshold) = (el.latent as f32, el.high_temperature.threshold);
                    if latent <= c_heat - (threshold - dbt) * c_cm {
                        *pt = (c_heat - latent) / c_cm;
                    } else {
                        self.parts[i].temp = restrict_flt(threshold - dbt, MIN_TEMP, MAX_TEMP);
                        return Shift::Stay;
                    }
                }
                if self.rng.between(0, 5) < 1 {
                    Shift::To(E::SALT)
                } else {
                    Shift::To(E::WTRV)
                }
            }
            E::BRMT => Shift::To(E::LAVA),
            E::CRMC => {
                let threshold = self.elements.get(E::CRMC).high_temperature.threshold;
                if ctemph < self.ceramic_pressure(x, y) + threshold {
                    Shift::Stay
                } else {
                    Shift::To(E::LAVA)
                }
            }
            _ => Shift::Stay,
        }
    }

    /// Freezing of vapour and molten rock
    fn low_temperature_special(&mut self, i: usize, t: u16, x: i32, y: i32, pt: f32, ctemph: f32) -> Shift {
        match t {
            E::WTRV => {
                if pt < 273.0 {
                    Shift::To(E::RIME)
                } else {
                    Shift::To(E::DSTW)
                }
            }
            E::LAVA => {
                let ctype = self.parts[i].ctype;
                let valid = ctype > 0
                    && (ctype as usize) < PT_NUM
                    && ctype != E::LAVA as i32
                    && self.elements.get(ctype as u16).enabled;
                if !valid {
                    return if pt < LAVA_FREEZE {
                        Shift::To(E::STNE)
                    } else {
                        Shift::Stay
                    };
                }
                let ct = ctype as u16;
                let high = self.elements.get(ct).high_temperature;
                let stays_molten = match ct {
                    E::THRM => pt >= self.elements.get(E::BMTL).high_temperature.threshold,
                    E::VIBR | E::BVBR => pt >= 273.15,
                    E::TUNG => pt >= high.threshold,
                    E::CRMC => {
                        ctemph >= self.ceramic_pressure(x, y) + high.threshold
                    }
                    _ if high.target == TransitionTarget::Element(E::LAVA) || ct == E::HEAC => {
                        pt >= high.threshold
                    }
                    _ => pt >= LAVA_FREEZE,
                };
                if stays_molten {
                    return Shift::Stay;
                }
                self.parts[i].ctype = E::NONE as i32;
                match ct {
                    E::THRM => {
                        self.parts[i].tmp = 0;
                        Shift::To(E::BMTL)
                    }
                    E::PLUT => {
                        self.parts[i].tmp = 0;
                        Shift::To(E::LAVA)
                    }
                    _ => Shift::To(ct),
                }
            }
            _ => Shift::Stay,
        }
    }

    /// Apply a temperature driven type change, returns true if the particle died
    fn apply_temperature_shift(&mut self, i: usize, x: i32, y: i32, t: u16) -> bool {
        let old = self.parts[i].element;
        if t == E::ICEI || t == E::LAVA || t == E::SNOW {
            self.parts[i].ctype = old as i32;
        }
        if !(t == E::ICEI && self.parts[i].ctype == E::FRZW as i32) {
            self.parts[i].life = 0;
        }
        if t == E::FIRE {
            self.parts[i].tmp = 0;
        }
        if self.elements.get(t).properties.is_gas() && !self.elements.get(old).properties.is_gas() {
            *self.pv_at_mut(x, y) += 0.5;
        }
        if t == E::NONE {
            self.part_kill(i);
            return true;
        }
        self.part_change_type(i, x, y, t);
        if matches!(t, E::FIRE | E::PLSM | E::HFLM) {
            self.parts[i].life = self.rng.between(120, 169);
        }
        if t == E::LAVA {
            let p = &mut self.parts[i];
            p.ctype = match p.ctype as u16 {
                E::BRMT => E::BMTL,
                E::SAND | E::BGLA => E::GLAS,
                E::PQRT => E::QRTZ,
                other => other,
            } as i32;
            p.life = self.rng.between(240, 359);
        }
        false
    }

    /// Pressure and gravity driven type changes
    ///
    /// Returns true when the particle changed type or was killed.
    pub(crate) fn check_pressure_transitions(&mut self, i: usize, t: u16) -> bool {
        let x = round_pos(self.parts[i].x);
        let y = round_pos(self.parts[i].y);
        let g = self.gravity_grid_at(x, y);
        let gravtot = g.x.abs() + g.y.abs();
        let pv = self.pv_at(x, y);
        let el = self.elements.get(t);
        let (high, low) = (el.high_pressure, el.low_pressure);

        let new_type = if high.is_some() && pv > high.threshold {
            match high.target {
                TransitionTarget::Element(target) => target,
                _ if t == E::BMTL && (pv > 2.5 || (pv > 1.0 && self.parts[i].tmp == 1)) => E::BRMT,
                _ => return false,
            }
        } else if low.is_some() && pv < low.threshold && gravtot <= high.threshold / 4.0 {
            match low.target {
                TransitionTarget::Element(target) => target,
                _ => return false,
            }
        } else if high.is_some() && gravtot > high.threshold / 4.0 {
            match high.target {
                TransitionTarget::Element(target) => target,
                _ if t == E::BMTL && (gravtot > 0.625 || (gravtot > 0.25 && self.parts[i].tmp == 1)) => {
                    E::BRMT
                }
                _ => return false,
            }
        } else {
            return false;
        };

        self.parts[i].life = 0;
        if new_type == E::NONE {
            self.part_kill(i);
        } else {
            self.part_change_type(i, x, y, new_type);
        }
        if new_type == E::FIRE {
            self.parts[i].life = self.rng.between(120, 169);
        }
        true
    }
}
