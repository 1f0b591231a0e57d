//! Movement resolution: occupancy checks, swaps and the per-class motion rules

use glam::Vec2;
use powdersim_simulation::{
    CELL, ElementId as E, ISTP, PackedCell, ParticleFlags, Properties as P, SIM_MAXVELOCITY,
    WallId, XCNTR, XRES, YCNTR, YRES, restrict_flt, MAX_TEMP, MIN_TEMP,
};
use smallvec::SmallVec;

use super::Simulation;
use super::normals::{SurfaceProbe, get_wavelength_bin};
use crate::fields::cell_of;
use crate::settings::EdgeMode;

const GLASS_IOR: f32 = 1.9;
const GLASS_DISP: f32 = 0.07;

/// Remainder with the sign of the divisor, for wrapping positions
pub(crate) fn remainder_p(x: f32, y: f32) -> f32 {
    let r = x % y;
    if x >= 0.0 { r } else { r + y }
}

/// Wrap a position into the playable area, leaving the border band out
fn wrap_loop_position(xf: f32, yf: f32) -> (f32, f32) {
    let cell = CELL as f32;
    let nx = (xf + 0.5) as i32;
    let ny = (yf + 0.5) as i32;
    let xf = if nx >= CELL && nx < XRES - CELL {
        xf
    } else {
        remainder_p(xf - cell + 0.5, XRES as f32 - cell * 2.0) + cell - 0.5
    };
    let yf = if ny >= CELL && ny < YRES - CELL {
        yf
    } else {
        remainder_p(yf - cell + 0.5, YRES as f32 - cell * 2.0) + cell - 0.5
    };
    (xf, yf)
}

#[inline]
fn round(v: f32) -> i32 {
    (v + 0.5) as i32
}

/// Outcome of a movement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MoveResult {
    Blocked,
    Moved,
    /// The particle left the area and was destroyed
    Killed,
}

impl MoveResult {
    /// Any result other than a plain block ends the search for a destination
    #[inline]
    fn settled(self) -> bool {
        self != MoveResult::Blocked
    }
}

impl Simulation {
    /// Walls that stop element `t` at pixel (x, y)
    pub fn is_wall_blocking(&self, x: i32, y: i32, t: u16) -> bool {
        let wall = self.walls.wall_at(x, y);
        if wall == WallId::NONE {
            return false;
        }
        let props = self.elements.get(t).properties;
        match wall {
            WallId::ALLOWGAS => !props.contains(P::TYPE_GAS),
            WallId::ALLOWENERGY => !props.contains(P::TYPE_ENERGY),
            WallId::ALLOWLIQUID => !props.contains(P::TYPE_LIQUID),
            WallId::ALLOWPOWDER => !props.contains(P::TYPE_PART),
            WallId::ALLOWAIR | WallId::WALL | WallId::WALLELEC => true,
            WallId::EWALL => self.walls.charge_at(x, y) == 0,
            _ => false,
        }
    }

    /// Can element `pt` enter (nx, ny)?
    ///
    /// 0 blocked, 1 swap with the occupant, 2 share the pixel.
    pub fn eval_move(&self, pt: u16, nx: i32, ny: i32) -> u8 {
        if nx < 0 || ny < 0 || nx >= XRES || ny >= YRES {
            return 0;
        }
        let r = self.map.pmap(nx, ny);
        let occupant = r.element();
        let mut result = self.can_move.get(pt, occupant);
        if result == 3 {
            let other = &self.parts[r.index()];
            result = match occupant {
                E::INVIS => {
                    let resistance = if other.tmp > 0 { other.tmp as f32 } else { 4.0 };
                    let pv = self.air.pv[cell_of(nx, ny)];
                    if pv < -resistance || pv > resistance { 2 } else { 0 }
                }
                E::PVOD if other.life != 10 => 0,
                E::PVOD | E::VOID => {
                    let matches_ctype = other.ctype == pt as i32;
                    if other.ctype == 0 || matches_ctype != (other.tmp & 1 != 0) {
                        1
                    } else {
                        0
                    }
                }
                _ => 1,
            };
        }
        let wall = self.walls.wall_at(nx, ny);
        if wall != WallId::NONE {
            if self.is_wall_blocking(nx, ny, pt) {
                return 0;
            }
            if wall == WallId::EHOLE
                && self.walls.charge_at(nx, ny) == 0
                && !self.elements.get(pt).properties.contains(P::TYPE_SOLID)
                && !self.elements.get(occupant).properties.contains(P::TYPE_SOLID)
            {
                return 2;
            }
        }
        result
    }

    /// Try to move particle `i` from (x, y) to (nx, ny), swapping or being eaten
    ///
    /// Returns true when the particle may take the destination position.
    pub fn try_move(&mut self, i: usize, x: i32, y: i32, nx: i32, ny: i32) -> bool {
        if x == nx && y == ny {
            return true;
        }
        if nx < 0 || ny < 0 || nx >= XRES || ny >= YRES {
            return true;
        }
        let t = self.parts[i].element;
        let r = self.map.pmap(nx, ny);
        let rt = r.element();
        let mut e = self.eval_move(t, nx, ny);

        // Half-silvered mirror
        if e == 0
            && t == E::PHOT
            && ((rt == E::BMTL && self.rng.chance(1, 2)) || self.map.pmap(x, y).element() == E::BMTL)
        {
            e = 2;
        }

        if e == 0 {
            if !self.elements.get(t).properties.is_energy() {
                return false;
            }
            if !self.settings.legacy_enable && t == E::PHOT && !r.is_empty() {
                let ri = r.index();
                if rt == E::COAL || rt == E::BCOL {
                    self.parts[ri].temp = self.parts[i].temp;
                }
                if self.elements.get(rt).heat_conduct != 0
                    && (rt != E::HSWC || self.parts[ri].life == 10)
                    && rt != E::FILT
                {
                    let temp = restrict_flt(
                        (self.parts[ri].temp + self.parts[i].temp) / 2.0,
                        MIN_TEMP,
                        MAX_TEMP,
                    );
                    self.parts[i].temp = temp;
                    self.parts[ri].temp = temp;
                }
            } else if (t == E::NEUT || t == E::ELEC)
                && matches!(rt, E::CLNE | E::PCLN | E::BCLN | E::PBCN)
            {
                let ri = r.index();
                if self.parts[ri].ctype == 0 {
                    self.parts[ri].ctype = t as i32;
                }
            }
            return false;
        }

        if e == 2 {
            return true;
        }

        // e == 1: swap, unless the occupant eats the particle
        if rt == E::VOID || rt == E::PVOD {
            self.part_kill(i);
            return false;
        }
        if rt == E::BHOL || rt == E::NBHL {
            if !self.settings.legacy_enable {
                let ri = r.index();
                self.parts[ri].temp =
                    restrict_flt(self.parts[ri].temp + self.parts[i].temp / 2.0, MIN_TEMP, MAX_TEMP);
            }
            self.part_kill(i);
            return false;
        }
        // CNCT does not stack on itself
        if t == E::CNCT && y < ny && self.map.pmap(x, y + 1).element() == E::CNCT {
            return false;
        }
        let closed_ehole = |sim: &Self, px: i32, py: i32| {
            sim.walls.wall_at(px, py) == WallId::EHOLE && sim.walls.charge_at(px, py) == 0
        };
        if closed_ehole(self, x, y) && !closed_ehole(self, nx, ny) {
            return false;
        }

        if let Some(e) = r.occupant() {
            if t == E::NEUT {
                let s = self.map.pmap(x, y);
                if !s.is_empty()
                    && !self
                        .elements
                        .get(s.element())
                        .properties
                        .contains(P::NEUTPENETRATE)
                {
                    return true;
                }
                if self.walls.wall_at(x, y) == WallId::ALLOWENERGY {
                    return true;
                }
                if let Some(si) = s.occupant() {
                    self.map
                        .set_pmap(nx, ny, PackedCell::new(si, self.parts[si].element));
                    self.parts[si].x = nx as f32;
                    self.parts[si].y = ny as f32;
                } else {
                    self.map.set_pmap(nx, ny, PackedCell::EMPTY);
                }
                self.parts[e].x = x as f32;
                self.parts[e].y = y as f32;
                self.map.set_pmap(x, y, PackedCell::new(e, self.parts[e].element));
                return true;
            }
            self.map.clear_pmap_if(nx, ny, e);
            self.parts[e].x += (x - nx) as f32;
            self.parts[e].y += (y - ny) as f32;
            let (ex, ey) = (round(self.parts[e].x), round(self.parts[e].y));
            self.map.set_pmap(ex, ey, PackedCell::new(e, self.parts[e].element));
        }
        true
    }

    /// Move particle `i` from (x, y) to the fractional position (nxf, nyf)
    pub(crate) fn do_move(&mut self, i: usize, x: i32, y: i32, nxf: f32, nyf: f32) -> MoveResult {
        let (nxf, nyf) = if self.settings.edge_mode == EdgeMode::Loop {
            wrap_loop_position(nxf, nyf)
        } else {
            (nxf, nyf)
        };
        let (nx, ny) = (round(nxf), round(nyf));
        if self.parts[i].element == E::NONE {
            return MoveResult::Blocked;
        }
        if !self.try_move(i, x, y, nx, ny) {
            return MoveResult::Blocked;
        }
        let t = self.parts[i].element;
        self.parts[i].x = nxf;
        self.parts[i].y = nyf;
        if nx != x || ny != y {
            self.relocate(i, t, x, y, nx, ny)
        } else {
            MoveResult::Moved
        }
    }

    /// Move without any occupancy checks, used for stickman heads
    fn move_unchecked(&mut self, i: usize, x: i32, y: i32, nxf: f32, nyf: f32) -> MoveResult {
        let (nxf, nyf) = if self.settings.edge_mode == EdgeMode::Loop {
            wrap_loop_position(nxf, nyf)
        } else {
            (nxf, nyf)
        };
        let (nx, ny) = (round(nxf), round(nyf));
        let t = self.parts[i].element;
        self.parts[i].x = nxf;
        self.parts[i].y = nyf;
        if nx != x || ny != y {
            self.relocate(i, t, x, y, nx, ny)
        } else {
            MoveResult::Moved
        }
    }

    /// Move the map entry of `i`, killing it inside the border band
    fn relocate(&mut self, i: usize, t: u16, x: i32, y: i32, nx: i32, ny: i32) -> MoveResult {
        if self.map.pmap(x, y).occupant() == Some(i) {
            self.map.set_pmap(x, y, PackedCell::EMPTY);
        } else if self.map.photon(x, y).occupant() == Some(i) {
            self.map.set_photon(x, y, PackedCell::EMPTY);
        }
        if nx < CELL || nx >= XRES - CELL || ny < CELL || ny >= YRES - CELL {
            self.part_kill(i);
            return MoveResult::Killed;
        }
        if self.elements.get(t).properties.is_energy() {
            self.map.set_photon(nx, ny, PackedCell::new(i, t));
        } else if t != E::NONE {
            self.map.set_pmap(nx, ny, PackedCell::new(i, t));
        }
        MoveResult::Moved
    }

    /// Level a liquid surface by moving particle `i` to a free spot above its body
    pub fn flood_water(&mut self, x: i32, y: i32, i: usize) -> bool {
        let original_y = y;
        if self.map.pmap(x, y).is_empty() {
            return false;
        }
        let t = self.parts[i].element;
        let is_liquid_at = |sim: &Self, px: i32, py: i32| {
            sim.elements.get(sim.map.pmap(px, py).element()).falldown == 2
        };

        let mut visited = vec![false; (XRES * YRES) as usize];
        let idx = |px: i32, py: i32| (py * XRES + px) as usize;
        let mut stack: SmallVec<[(i32, i32); 64]> = SmallVec::new();
        stack.push((x, y));

        while let Some((x, y)) = stack.pop() {
            let mut x1 = x;
            let mut x2 = x;
            while x1 >= CELL {
                if !is_liquid_at(self, x1 - 1, y) || visited[idx(x1 - 1, y)] {
                    break;
                }
                x1 -= 1;
            }
            while x2 < XRES - CELL {
                if !is_liquid_at(self, x2 + 1, y) || visited[idx(x2 + 1, y)] {
                    break;
                }
                x2 += 1;
            }

            let mut cx = x1;
            while cx <= x2 {
                if y - 1 > original_y && self.map.pmap(cx, y - 1).is_empty() {
                    let rand_pos = self.rng.between(cx, x2);
                    let target = if self.map.pmap(rand_pos, y - 1).is_empty()
                        && self.eval_move(t, rand_pos, y - 1) != 0
                    {
                        Some(rand_pos)
                    } else if self.eval_move(t, cx, y - 1) != 0 {
                        Some(cx)
                    } else {
                        None
                    };
                    if let Some(tx) = target {
                        let ox = round(self.parts[i].x);
                        let oy = round(self.parts[i].y);
                        let moved = self.map.pmap(ox, oy);
                        self.map.set_pmap(tx, y - 1, moved);
                        self.map.set_pmap(ox, oy, PackedCell::EMPTY);
                        self.parts[i].x = tx as f32;
                        self.parts[i].y = (y - 1) as f32;
                        return true;
                    }
                    cx += 1;
                    continue;
                }
                visited[idx(cx, y)] = true;
                cx += 1;
            }

            if y >= CELL + 1 {
                for cx in x1..=x2 {
                    if is_liquid_at(self, cx, y - 1) && !visited[idx(cx, y - 1)] {
                        stack.push((cx, y - 1));
                    }
                }
            }
            if y < YRES - CELL - 1 {
                for cx in x1..=x2 {
                    if is_liquid_at(self, cx, y + 1) && !visited[idx(cx, y + 1)] {
                        stack.push((cx, y + 1));
                    }
                }
            }
        }
        false
    }

    /// Gravity at pixel (x, y) for the given gravity mode, per unit element gravity
    pub(super) fn mode_gravity(&self, x: i32, y: i32, gravity: f32) -> Vec2 {
        match self.settings.gravity_mode {
            1 => Vec2::ZERO,
            2 => {
                let d = 0.01 - ((x - XCNTR) as f32).hypot((y - YCNTR) as f32);
                Vec2::new(
                    gravity * ((x - XCNTR) as f32 / d),
                    gravity * ((y - YCNTR) as f32 / d),
                )
            }
            _ => Vec2::new(0.0, gravity),
        }
    }

    /// Apply this tick's velocity to particle `i`
    ///
    /// Returns true when the particle was destroyed.
    pub(crate) fn move_particle(
        &mut self,
        i: usize,
        t: u16,
        x: i32,
        y: i32,
        grav: Vec2,
        nt: i32,
        surround_space: i32,
    ) -> bool {
        let el_collision = self.elements.get(t).collision;
        let mut mv = self.parts[i].vx.abs().max(self.parts[i].vy.abs());
        let (mut fin_xf, mut fin_yf);
        let (mut clear_xf, mut clear_yf);

        if mv < ISTP {
            clear_xf = self.parts[i].x;
            clear_yf = self.parts[i].y;
            fin_xf = clear_xf + self.parts[i].vx;
            fin_yf = clear_yf + self.parts[i].vy;
        } else {
            if mv > SIM_MAXVELOCITY {
                self.parts[i].vx *= SIM_MAXVELOCITY / mv;
                self.parts[i].vy *= SIM_MAXVELOCITY / mv;
                mv = SIM_MAXVELOCITY;
            }
            // Sub-step so fast particles cannot tunnel through thin obstacles
            let dx = self.parts[i].vx * ISTP / mv;
            let dy = self.parts[i].vy * ISTP / mv;
            fin_xf = self.parts[i].x;
            fin_yf = self.parts[i].y;
            let start = (round(fin_xf), round(fin_yf));
            let closed_ehole = |sim: &Self, px: i32, py: i32| {
                sim.walls.wall_at(px, py) == WallId::EHOLE && sim.walls.charge_at(px, py) == 0
            };
            let closed_ehole_start = powdersim_simulation::in_bounds(start.0, start.1)
                && closed_ehole(self, start.0, start.1);
            loop {
                mv -= ISTP;
                fin_xf += dx;
                fin_yf += dy;
                if self.settings.edge_mode == EdgeMode::Loop {
                    (fin_xf, fin_yf) = wrap_loop_position(fin_xf, fin_yf);
                }
                if mv <= 0.0 {
                    fin_xf = self.parts[i].x + self.parts[i].vx;
                    fin_yf = self.parts[i].y + self.parts[i].vy;
                    if self.settings.edge_mode == EdgeMode::Loop {
                        (fin_xf, fin_yf) = wrap_loop_position(fin_xf, fin_yf);
                    }
                    clear_xf = fin_xf - dx;
                    clear_yf = fin_yf - dy;
                    break;
                }
                let (fx, fy) = (round(fin_xf), round(fin_yf));
                let eval = self.eval_move(t, fx, fy);
                let occupant = self.map.pmap(fx, fy);
                if eval == 0
                    || (self.can_move.get(t, occupant.element()) == 3 && eval == 1)
                    || (t == E::PHOT && !occupant.is_empty())
                    || self.walls.wall_at(fx, fy) == WallId::DESTROYALL
                    || closed_ehole_start != closed_ehole(self, fx, fy)
                {
                    clear_xf = fin_xf - dx;
                    clear_yf = fin_yf - dy;
                    break;
                }
                if self.walls.wall_at(fx, fy) == WallId::DETECT && self.walls.charge_at(fx, fy) < 8 {
                    self.walls.set_emap(fx / CELL, fy / CELL);
                }
            }
        }
        let (mut fin_x, mut fin_y) = (round(fin_xf), round(fin_yf));
        let (mut clear_x, mut clear_y) = (round(clear_xf), round(clear_yf));

        let stagnant = self.parts[i].flags.contains(ParticleFlags::STAGNANT);
        self.parts[i].flags.remove(ParticleFlags::STAGNANT);
        let props = self.elements.get(t).properties;

        if matches!(t, E::STKM | E::STKM2 | E::FIGH) {
            // The head passes through anything
            let start = (round(self.parts[i].x), round(self.parts[i].y));
            let nxf = self.parts[i].x + self.parts[i].vx;
            let nyf = self.parts[i].y + self.parts[i].vy;
            let (nx, ny) = (round(nxf), round(nyf));
            if self.settings.edge_mode == EdgeMode::Loop
                && (nx < CELL || nx >= XRES - CELL || ny < CELL || ny >= YRES - CELL)
            {
                self.parts[i].vx *= 0.95;
                self.parts[i].vy *= 0.95;
            }
            if nx != x || ny != y {
                return self.move_unchecked(i, start.0, start.1, nxf, nyf) == MoveResult::Killed;
            }
            self.parts[i].x = nxf;
            self.parts[i].y = nyf;
            return false;
        }

        if props.is_energy() {
            if t == E::PHOT && self.eval_move(E::PHOT, fin_x, fin_y) != 0 {
                let rt = self.map.pmap(fin_x, fin_y).element();
                let lt = self.map.pmap(x, y).element();
                let rt_glas = rt == E::GLAS || rt == E::BGLA;
                let lt_glas = lt == E::GLAS || lt == E::BGLA;
                if rt_glas != lt_glas {
                    let p = self.parts[i];
                    let Some((nrx, nry)) =
                        self.get_normal_interp(SurfaceProbe::Refract, p.x, p.y, p.vx, p.vy)
                    else {
                        self.part_kill(i);
                        return true;
                    };
                    let mut ctype = self.parts[i].ctype;
                    let bin = get_wavelength_bin(&mut ctype, self.rng.as_mut());
                    self.parts[i].ctype = ctype;
                    let Some(bin) = bin.filter(|_| ctype & 0x3FFF_FFFF != 0) else {
                        self.part_kill(i);
                        return true;
                    };
                    let mut nn = GLASS_IOR - GLASS_DISP * (bin - 30) as f32 / 30.0;
                    nn *= nn;
                    let (nrx, nry) = (-nrx, -nry);
                    if rt_glas && !lt_glas {
                        nn = 1.0 / nn;
                    }
                    let part = &mut self.parts[i];
                    let ct1 = part.vx * nrx + part.vy * nry;
                    let ct2 = 1.0 - (nn * nn) * (1.0 - ct1 * ct1);
                    if ct2 < 0.0 {
                        // Total internal reflection
                        part.vx -= 2.0 * ct1 * nrx;
                        part.vy -= 2.0 * ct1 * nry;
                        fin_xf = part.x;
                        fin_yf = part.y;
                        fin_x = x;
                        fin_y = y;
                    } else {
                        let ct2 = ct2.sqrt() - nn * ct1;
                        part.vx = nn * part.vx + ct2 * nrx;
                        part.vy = nn * part.vy + ct2 * nry;
                    }
                }
            }
            if stagnant {
                // Was reflected last frame: retry with integer placement
                let result = self.do_move(i, x, y, fin_x as f32, fin_y as f32);
                if result == MoveResult::Blocked && self.parts[i].element != E::NONE {
                    self.part_kill(i);
                    return true;
                }
                return result == MoveResult::Killed;
            }
            match self.do_move(i, x, y, fin_xf, fin_yf) {
                MoveResult::Moved => return false,
                MoveResult::Killed => return true,
                MoveResult::Blocked => {}
            }
            if self.parts[i].element == E::NONE {
                return true;
            }
            self.parts[i].flags.insert(ParticleFlags::STAGNANT);
            if t == E::NEUT && self.rng.chance(1, 10) {
                self.part_kill(i);
                return true;
            }
            let r = self.map.pmap(fin_x, fin_y);
            let rt = r.element();
            if (rt == E::PIPE || rt == E::PPIP) && self.parts[r.index()].ctype & 0x1FF == 0 {
                let p = self.parts[i];
                let pipe = &mut self.parts[r.index()];
                pipe.ctype = p.element as i32;
                pipe.temp = p.temp;
                pipe.tmp2 = p.life;
                pipe.pavg = [p.tmp as f32, p.ctype as f32];
                self.part_kill(i);
                return true;
            }
            if rt != E::NONE {
                self.parts[i].ctype &= self.elements.get(rt).photon_reflect_wavelengths as i32;
            }
            let p = self.parts[i];
            match self.get_normal_interp(SurfaceProbe::Move(t), p.x, p.y, p.vx, p.vy) {
                Some((nrx, nry)) => {
                    let (nrx, nry) = if rt == E::CRMC {
                        let mut a = self.rng.between(-50, 50) as f32 * 0.01;
                        a = a * a * a;
                        let (ry, rx) = a.sin_cos();
                        (rx * nrx + ry * nry, rx * nry - ry * nrx)
                    } else {
                        (nrx, nry)
                    };
                    let part = &mut self.parts[i];
                    let dp = nrx * part.vx + nry * part.vy;
                    part.vx -= 2.0 * dp * nrx;
                    part.vy -= 2.0 * dp * nry;
                }
                None => {
                    if t != E::NEUT {
                        self.part_kill(i);
                        return true;
                    }
                    return false;
                }
            }
            if t == E::PHOT && self.parts[i].ctype & 0x3FFF_FFFF == 0 {
                self.part_kill(i);
                return true;
            }
            return false;
        }

        let falldown = self.elements.get(t).falldown;
        if falldown == 0 {
            // Gases and solids bounce
            match self.do_move(i, x, y, fin_xf, fin_yf) {
                MoveResult::Moved => return false,
                MoveResult::Killed => return true,
                MoveResult::Blocked => {}
            }
            if self.parts[i].element == E::NONE {
                return true;
            }
            let istp = ISTP as i32;
            fin_x = fin_x.clamp(x - istp, x + istp);
            fin_y = fin_y.clamp(y - istp, y + istp);
            if self
                .do_move(i, x, y, 0.25 + (2 * x - fin_x) as f32, 0.25 + fin_y as f32)
                .settled()
            {
                self.parts[i].vx *= el_collision;
            } else if self
                .do_move(i, x, y, 0.25 + fin_x as f32, 0.25 + (2 * y - fin_y) as f32)
                .settled()
            {
                self.parts[i].vy *= el_collision;
            } else {
                self.parts[i].vx *= el_collision;
                self.parts[i].vy *= el_collision;
            }
            return self.parts[i].element == E::NONE;
        }

        // Liquids and powders
        if self.settings.water_equal && falldown == 2 && self.rng.chance(1, 400) && !self.flood_water(x, y, i) {
            return false;
        }
        match self.do_move(i, x, y, fin_xf, fin_yf) {
            MoveResult::Moved => return false,
            MoveResult::Killed => return true,
            MoveResult::Blocked => {}
        }
        if self.parts[i].element == E::NONE {
            return true;
        }
        if fin_x != x && self.do_move(i, x, y, fin_xf, clear_yf).settled() {
            self.collide(i, el_collision);
            return false;
        }
        if fin_y != y && self.do_move(i, x, y, clear_xf, fin_yf).settled() {
            self.collide(i, el_collision);
            return false;
        }

        let mut r = self.rng.between(0, 1) * 2 - 1;
        if (clear_x != x || clear_y != y || nt != 0 || surround_space != 0)
            && (self.parts[i].vx.abs() > 0.01 || self.parts[i].vy.abs() > 0.01)
        {
            // Diagonal movement when the target is blocked
            let (vx, vy) = (self.parts[i].vx, self.parts[i].vy);
            let mut dx = vx - vy * r as f32;
            let mut dy = vy + vx * r as f32;
            let m = dx.abs().max(dy.abs());
            dx /= m;
            dy /= m;
            if self.do_move(i, x, y, clear_xf + dx, clear_yf + dy).settled() {
                self.collide(i, el_collision);
                return false;
            }
            let swappage = dx;
            dx = dy * r as f32;
            dy = -swappage * r as f32;
            if self.do_move(i, x, y, clear_xf + dx, clear_yf + dy).settled() {
                self.collide(i, el_collision);
                return false;
            }
        }

        let rt = if !stagnant || nt != 0 { 30 } else { 10 };
        let (vx, vy) = (self.parts[i].vx, self.parts[i].vy);
        if falldown > 1 && !self.gravity.enabled && self.settings.gravity_mode == 0 && vy > vx.abs() {
            let rt = if t == E::GEL {
                (self.parts[i].tmp as f32 * 0.20 + 5.0) as i32
            } else {
                rt
            };
            let mut s = MoveResult::Blocked;
            let (mut nx, mut ny) = (x, y);
            let mut j = clear_x + r;
            while j >= 0 && j >= clear_x - rt && j < clear_x + rt && j < XRES {
                let here = self.map.pmap(j, fin_y).element();
                if (here != t || self.walls.wall_at(j, fin_y) != 0) && {
                    s = self.do_move(i, x, y, j as f32, fin_yf);
                    s.settled()
                } {
                    nx = round(self.parts[i].x);
                    ny = round(self.parts[i].y);
                    break;
                }
                let clear_here = self.map.pmap(j, clear_y).element();
                if fin_y != clear_y
                    && (clear_here != t || self.walls.wall_at(j, clear_y) != 0)
                    && {
                        s = self.do_move(i, x, y, j as f32, clear_yf);
                        s.settled()
                    }
                {
                    nx = round(self.parts[i].x);
                    ny = round(self.parts[i].y);
                    break;
                }
                let wall = self.walls.wall_at(j, clear_y);
                if self.map.pmap(j, clear_y).element() != t
                    || (wall != 0 && wall != WallId::STREAM)
                {
                    break;
                }
                j += r;
            }
            r = if self.parts[i].vy > 0.0 { 1 } else { -1 };
            match s {
                MoveResult::Moved => {
                    let mut j = ny + r;
                    while j >= 0 && j < YRES && j >= ny - rt && j < ny + rt {
                        let here = self.map.pmap(nx, j).element();
                        let wall = self.walls.wall_at(nx, j);
                        if (here != t || wall != 0) && self.do_move(i, nx, ny, nx as f32, j as f32).settled() {
                            break;
                        }
                        if self.map.pmap(nx, j).element() != t || (wall != 0 && wall != WallId::STREAM) {
                            break;
                        }
                        j += r;
                    }
                }
                MoveResult::Killed => return true,
                MoveResult::Blocked => self.settle_or_stagnate(i, x, y, clear_xf, clear_yf),
            }
            self.collide(i, el_collision);
        } else if falldown > 1 && (grav.x * vx + grav.y * vy).abs() > (grav.y * vx - grav.x * vy).abs() {
            let pt_grav = self.elements.get(t).gravity;
            let mut s = MoveResult::Blocked;
            let (mut nxf, mut nyf) = (clear_xf, clear_yf);
            let (mut nx, mut ny) = (clear_x, clear_y);
            let mut prev = Vec2::ZERO;
            // Search perpendicular to gravity for a free spot
            for j in 0..rt {
                let mut g = self.mode_gravity(nx, ny, pt_grav) + self.gravity_grid_at(nx, ny);
                let m = g.x.abs().max(g.y.abs());
                if m < 0.0001 {
                    break;
                }
                g /= m;
                if j != 0 {
                    // Follow the curvature of radial gravity
                    nxf += r as f32 * (g.y * 2.0 - prev.y);
                    nyf += -r as f32 * (g.x * 2.0 - prev.x);
                } else {
                    nxf += r as f32 * g.y;
                    nyf += -r as f32 * g.x;
                }
                prev = g;
                nx = round(nxf);
                ny = round(nyf);
                if nx < 0 || ny < 0 || nx >= XRES || ny >= YRES {
                    break;
                }
                if self.map.pmap(nx, ny).element() != t || self.walls.wall_at(nx, ny) != 0 {
                    s = self.do_move(i, x, y, nxf, nyf);
                    if s.settled() {
                        nx = round(self.parts[i].x);
                        ny = round(self.parts[i].y);
                        break;
                    }
                    if self.map.pmap(nx, ny).element() != t
                        || self.walls.wall_at(nx, ny) != WallId::STREAM
                    {
                        break;
                    }
                }
            }
            match s {
                MoveResult::Moved => {
                    // Then settle along gravity from the new position
                    clear_x = nx;
                    clear_y = ny;
                    for _ in 0..rt {
                        let mut g = self.mode_gravity(nx, ny, pt_grav) + self.gravity_grid_at(nx, ny);
                        let m = g.x.abs().max(g.y.abs());
                        if m < 0.0001 {
                            break;
                        }
                        g /= m;
                        nxf += g.x;
                        nyf += g.y;
                        nx = round(nxf);
                        ny = round(nyf);
                        if nx < 0 || ny < 0 || nx >= XRES || ny >= YRES {
                            break;
                        }
                        if self.map.pmap(nx, ny).element() != t || self.walls.wall_at(nx, ny) != 0 {
                            let s = self.do_move(i, clear_x, clear_y, nxf, nyf);
                            if s.settled()
                                || self.map.pmap(nx, ny).element() != t
                                || self.walls.wall_at(nx, ny) != WallId::STREAM
                            {
                                break;
                            }
                        }
                    }
                }
                MoveResult::Killed => return true,
                MoveResult::Blocked => self.settle_or_stagnate(i, x, y, clear_xf, clear_yf),
            }
            self.collide(i, el_collision);
        } else {
            self.settle_or_stagnate(i, x, y, clear_xf, clear_yf);
            self.collide(i, el_collision);
        }
        self.parts[i].element == E::NONE
    }

    /// Fall back to the last clear position, or mark the particle stagnant
    fn settle_or_stagnate(&mut self, i: usize, x: i32, y: i32, clear_xf: f32, clear_yf: f32) {
        let (clear_x, clear_y) = (round(clear_xf), round(clear_yf));
        if (clear_x != x || clear_y != y) && self.do_move(i, x, y, clear_xf, clear_yf).settled() {
            return;
        }
        if self.parts[i].element != E::NONE {
            self.parts[i].flags.insert(ParticleFlags::STAGNANT);
        }
    }

    #[inline]
    fn collide(&mut self, i: usize, collision: f32) {
        self.parts[i].vx *= collision;
        self.parts[i].vy *= collision;
    }

    /// Raw Newtonian gravity grid value, regardless of the enabled flag
    #[inline]
    pub(crate) fn gravity_grid_at(&self, x: i32, y: i32) -> Vec2 {
        let cell = cell_of(x, y);
        Vec2::new(self.gravity.gravx[cell], self.gravity.gravy[cell])
    }
}
