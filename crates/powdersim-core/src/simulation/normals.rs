//! Surface normal estimation for reflecting and refracting energy particles

use powdersim_simulation::{ElementId as E, XRES, YRES};

use super::Simulation;
use crate::rng::SimRng;

/// Boundary steps taken in each direction when estimating a normal
const SURF_RANGE: usize = 10;
/// Minimum boundary steps for a usable estimate
const NORMAL_MIN_EST: i32 = 3;
const NORMAL_INTERP: usize = 20;
const NORMAL_FRAC: f32 = 16.0;

/// What counts as a surface when tracing a boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceProbe {
    /// Glass boundaries, for refraction
    Refract,
    /// Anything this element cannot move into
    Move(u16),
}

const DX: [i32; 8] = [1, 1, 0, -1, -1, -1, 0, 1];
const DY: [i32; 8] = [0, 1, 1, 1, 0, -1, -1, -1];
const DE: [u32; 8] = [0x83, 0x07, 0x0E, 0x1C, 0x38, 0x70, 0xE0, 0xC1];

/// Bit mask of the eight neighbour directions on the forward side of (dx, dy)
fn direction_to_map(dx: f32, dy: f32) -> u32 {
    (dx >= 0.0) as u32
        | (((dx + dy) >= 0.0) as u32) << 1
        | ((dy >= 0.0) as u32) << 2
        | (((dy - dx) >= 0.0) as u32) << 3
        | ((dx <= 0.0) as u32) << 4
        | (((dx + dy) <= 0.0) as u32) << 5
        | ((dy <= 0.0) as u32) << 6
        | (((dy - dx) <= 0.0) as u32) << 7
}

impl Simulation {
    fn is_blocking(&self, probe: SurfaceProbe, x: i32, y: i32) -> bool {
        match probe {
            SurfaceProbe::Refract => {
                if x < 0 || y < 0 || x >= XRES || y >= YRES {
                    return false;
                }
                matches!(self.map.pmap(x, y).element(), E::GLAS | E::BGLA)
            }
            SurfaceProbe::Move(t) => self.eval_move(t, x, y) == 0,
        }
    }

    /// A blocking pixel with at least one non-blocking 4-neighbour
    fn is_boundary(&self, probe: SurfaceProbe, x: i32, y: i32) -> bool {
        if !self.is_blocking(probe, x, y) {
            return false;
        }
        !(self.is_blocking(probe, x, y - 1)
            && self.is_blocking(probe, x, y + 1)
            && self.is_blocking(probe, x - 1, y)
            && self.is_blocking(probe, x + 1, y))
    }

    /// Step once along the boundary in one of the directions allowed by `dm`
    fn find_next_boundary(
        &self,
        probe: SurfaceProbe,
        pos: &mut (i32, i32),
        mut dm: u32,
        em: &mut Option<usize>,
    ) -> bool {
        let (x, y) = *pos;
        if x <= 0 || x >= XRES - 1 || y <= 0 || y >= YRES - 1 {
            return false;
        }
        let i0 = match *em {
            Some(e) => {
                dm &= DE[e];
                e
            }
            None => 0,
        };
        for ii in 0..8 {
            let i = (ii + i0) & 7;
            if dm & (1 << i) != 0 && self.is_boundary(probe, x + DX[i], y + DY[i]) {
                *pos = (x + DX[i], y + DY[i]);
                *em = Some(i);
                return true;
            }
        }
        false
    }

    /// Unit normal of the boundary at (x, y), walking the surface both ways
    pub fn get_normal(&self, probe: SurfaceProbe, x: i32, y: i32, dx: f32, dy: f32) -> Option<(f32, f32)> {
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        if !self.is_boundary(probe, x, y) {
            return None;
        }

        let ldm = direction_to_map(-dy, dx);
        let rdm = direction_to_map(dy, -dx);
        let mut l = (x, y);
        let mut r = (x, y);
        let (mut lv, mut rv) = (true, true);
        let (mut lm, mut rm) = (None, None);

        let mut steps = 0;
        for _ in 0..SURF_RANGE {
            if lv {
                lv = self.find_next_boundary(probe, &mut l, ldm, &mut lm);
            }
            if rv {
                rv = self.find_next_boundary(probe, &mut r, rdm, &mut rm);
            }
            steps += lv as i32 + rv as i32;
            if !lv && !rv {
                break;
            }
        }

        if steps < NORMAL_MIN_EST || l == r {
            return None;
        }
        let ex = (r.0 - l.0) as f32;
        let ey = (r.1 - l.1) as f32;
        let inv = 1.0 / ex.hypot(ey);
        Some((ey * inv, -ex * inv))
    }

    /// Trace from (x0, y0) along (dx, dy) to the first boundary and take its normal
    pub fn get_normal_interp(
        &self,
        probe: SurfaceProbe,
        mut x0: f32,
        mut y0: f32,
        dx: f32,
        dy: f32,
    ) -> Option<(f32, f32)> {
        let dx = dx / NORMAL_FRAC;
        let dy = dy / NORMAL_FRAC;
        for _ in 0..NORMAL_INTERP {
            let x = (x0 + 0.5) as i32;
            let y = (y0 + 0.5) as i32;
            if self.is_boundary(probe, x, y) {
                return self.get_normal(probe, x, y, dx, dy);
            }
            x0 += dx;
            y0 += dy;
        }
        None
    }
}

/// Narrow a photon's wavelength set to a random band
///
/// Returns the band index used for the refractive index, or `None` when the
/// photon carries no wavelengths.
pub fn get_wavelength_bin<R: SimRng + ?Sized>(ctype: &mut i32, rng: &mut R) -> Option<i32> {
    let wm = *ctype as u32 & 0x3FFF_FFFF;
    if wm == 0 {
        return None;
    }
    let w0 = (wm | 0xC000_0000).trailing_zeros() as i32;
    let wmax = 31 - wm.leading_zeros() as i32;
    if wmax - w0 < 5 {
        return Some(wmax + w0);
    }
    let r = rng.gen_u32();
    let i = ((r >> 1) % (wmax - w0 - 4) as u32) as i32 + w0;
    let narrowed = if r & 1 != 0 {
        *ctype = (wm & (0x1F << i)) as i32;
        (i + 2) * 2
    } else {
        *ctype = (wm & (0xF << i)) as i32;
        (i + 2) * 2 - 1
    };
    Some(narrowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::SlotHint;
    use crate::rng::test_rng::TestRng;

    #[test]
    fn test_direction_to_map_opposites() {
        assert_eq!(direction_to_map(1.0, 0.0) & 0x1, 0x1);
        assert_eq!(direction_to_map(-1.0, 0.0) & 0x10, 0x10);
        assert_eq!(direction_to_map(1.0, 0.0) & 0x10, 0);
    }

    #[test]
    fn test_flat_floor_normal_points_up() {
        let mut sim = Simulation::default();
        for x in 80..120 {
            for y in 100..104 {
                sim.part_create(SlotHint::Auto, x, y, E::GLAS);
            }
        }
        let n = sim.get_normal(SurfaceProbe::Refract, 100, 100, 0.0, 1.0).unwrap();
        assert!(n.0.abs() < 1e-4);
        assert!((n.1.abs() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_no_normal_in_open_space() {
        let sim = Simulation::default();
        assert!(sim.get_normal_interp(SurfaceProbe::Move(E::PHOT), 50.0, 50.0, 1.0, 0.0).is_none());
    }

    #[test]
    fn test_wavelength_bin_empty() {
        let mut rng = TestRng::constant(0);
        let mut ctype = 0;
        assert_eq!(get_wavelength_bin(&mut ctype, &mut rng), None);
    }

    #[test]
    fn test_wavelength_bin_narrow_band() {
        let mut rng = TestRng::constant(0);
        // Three adjacent bits: no narrowing
        let mut ctype = 0b111 << 10;
        assert_eq!(get_wavelength_bin(&mut ctype, &mut rng), Some(12 + 10));
        assert_eq!(ctype, 0b111 << 10);
    }

    #[test]
    fn test_wavelength_bin_full_spectrum() {
        // r = 3: odd draw keeps five bits starting at w0 + 1
        let mut rng = TestRng::constant(3);
        let mut ctype = 0x3FFF_FFFF;
        assert_eq!(get_wavelength_bin(&mut ctype, &mut rng), Some(6));
        assert_eq!(ctype, 0x1F << 1);
    }
}
