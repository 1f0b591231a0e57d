//! Upgrades applied to particles from saves made by older versions
//!
//! Each rule is tied to the save version that changed how an element
//! stores its state and must stay exactly as released.

use powdersim_simulation::{ElementId as E, Particle, ParticleFlags, restrict_flt};

/// Number of built-in Game of Life rules
pub const NGOL: i32 = 24;

const fn colpack(rgb: u32) -> u32 {
    0xFF00_0000 | rgb
}

/// The two display colours of each built-in life rule
const BUILTIN_GOL: [(u32, u32); NGOL as usize] = [
    (colpack(0x0CAC00), colpack(0x0CAC00)),
    (colpack(0xFF0000), colpack(0xFF0000)),
    (colpack(0x0000FF), colpack(0x0000FF)),
    (colpack(0xFFFF00), colpack(0xFFFF00)),
    (colpack(0x00FFFF), colpack(0x00FFFF)),
    (colpack(0xFF00FF), colpack(0xFF00FF)),
    (colpack(0xFFFFFF), colpack(0xFFFFFF)),
    (colpack(0xE05010), colpack(0xE05010)),
    (colpack(0x500000), colpack(0x500000)),
    (colpack(0x500050), colpack(0x500050)),
    (colpack(0x505050), colpack(0x505050)),
    (colpack(0x5000FF), colpack(0x5000FF)),
    (colpack(0xFBEC7D), colpack(0xFBEC7D)),
    (colpack(0xA8E4A0), colpack(0xA8E4A0)),
    (colpack(0x9ACD32), colpack(0x9ACD32)),
    (colpack(0x0047AB), colpack(0x0047AB)),
    (colpack(0xE5B73B), colpack(0xE5B73B)),
    (colpack(0x259588), colpack(0x259588)),
    (colpack(0x0C3C00), colpack(0x0C3C00)),
    (colpack(0xFF0000), colpack(0xFFFF00)),
    (colpack(0x006432), colpack(0x00FF5A)),
    (colpack(0x000040), colpack(0x0000E6)),
    (colpack(0x006400), colpack(0x00FF00)),
    (colpack(0xFFFF00), colpack(0x969600)),
];

/// Whether a LIFE ctype names one of the built-in rules
pub fn is_builtin_gol(ctype: i32) -> bool {
    (0..NGOL).contains(&ctype)
}

/// Display colours of a built-in life rule
pub fn builtin_gol_colours(ctype: i32) -> Option<(u32, u32)> {
    is_builtin_gol(ctype).then(|| BUILTIN_GOL[ctype as usize])
}

/// Number of entries in the firework colour ramp
const FIREWORK_COLOURS: usize = 200;

/// RGB colour of a firework ramp entry
///
/// The ramp sweeps the hue circle at full saturation and brightness.
fn firework_colour(index: usize) -> u32 {
    let index = index.min(FIREWORK_COLOURS - 1) as u32;
    let hue = index * 1536 / FIREWORK_COLOURS as u32;
    let (sector, offset) = (hue / 256, hue % 256);
    let (r, g, b) = match sector {
        0 => (255, offset, 0),
        1 => (255 - offset, 255, 0),
        2 => (0, 255, offset),
        3 => (0, 255 - offset, 255),
        4 => (offset, 0, 255),
        _ => (255, 0, 255 - offset),
    };
    (r << 16) | (g << 8) | b
}

/// Bring one freshly parsed particle up to the current format
///
/// Runs after all fields are read, so rules may change the type.
pub fn upgrade_particle(p: &mut Particle, created_version: i32) {
    if created_version < 81 {
        upgrade_pre_81(p);
    }
    if created_version < 87 && p.element == E::PSTN && p.ctype != 0 {
        p.life = 1;
    }
    if created_version < 89 {
        if p.element == E::FILT {
            if !(0..=3).contains(&p.tmp) {
                p.tmp = 6;
            }
            p.ctype = 0;
        } else if p.element == E::QRTZ || p.element == E::PQRT {
            p.tmp2 = p.tmp;
            p.tmp = p.ctype;
            p.ctype = 0;
        }
    }
    if created_version < 90 && p.element == E::PHOT {
        p.flags |= ParticleFlags::PHOTDECO;
    }
    if created_version < 91 {
        match p.element {
            E::VINE => p.tmp = 1,
            E::PSTN => p.temp = 283.15,
            E::DLAY => p.temp -= 1.0,
            E::CRAY if p.tmp2 != 0 => p.ctype |= p.tmp2 << 8,
            E::CONV if p.tmp != 0 => p.ctype |= p.tmp << 8,
            _ => {}
        }
    }
    if created_version < 93 {
        match p.element {
            E::PIPE | E::PPIP => {
                if p.ctype == 1 {
                    p.tmp |= PIPE_INITIALIZING;
                }
                p.tmp |= (p.ctype - 1) << 18;
                p.ctype = p.tmp & 0xFF;
            }
            E::TSNS | E::HSWC | E::PSNS | E::PUMP => p.tmp = 0,
            _ => {}
        }
    }
    if created_version < 96
        && p.element == E::LIFE
        && let Some((colour, colour2)) = builtin_gol_colours(p.ctype)
    {
        p.tmp2 = p.tmp;
        p.dcolour = colour;
        p.tmp = colour2 as i32;
    }
}

/// Pipe flag marking a pipe that still has to trace its path
const PIPE_INITIALIZING: i32 = 0x0002_0000;

/// Bombs, glowing dust and exploded fireworks all became EMBR
///
/// Out-of-range firework colour indices are clamped into the ramp.
fn upgrade_pre_81(p: &mut Particle) {
    if p.element == E::BOMB && p.tmp != 0 {
        p.element = E::EMBR;
        p.ctype = 0;
        if p.tmp == 1 {
            p.tmp = 0;
        }
    }
    if p.element == E::DUST && p.life > 0 {
        p.element = E::EMBR;
        p.ctype = (p.tmp2 << 16) | (p.tmp << 8) | p.ctype;
        p.tmp = 1;
    }
    if p.element == E::FIRW && p.tmp >= 2 {
        let index = restrict_flt((p.tmp - 4) as f32, 0.0, FIREWORK_COLOURS as f32) as usize;
        p.element = E::EMBR;
        p.tmp = 1;
        p.ctype = firework_colour(index) as i32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle(element: u16) -> Particle {
        Particle::new(element, 0.0, 0.0)
    }

    #[test]
    fn test_old_bomb_becomes_ember() {
        let mut p = particle(E::BOMB);
        p.tmp = 1;
        p.ctype = 5;
        upgrade_particle(&mut p, 80);
        assert_eq!(p.element, E::EMBR);
        assert_eq!((p.tmp, p.ctype), (0, 0));

        let mut fresh = particle(E::BOMB);
        fresh.tmp = 1;
        upgrade_particle(&mut fresh, 81);
        assert_eq!(fresh.element, E::BOMB);
    }

    #[test]
    fn test_glowing_dust_packs_colour() {
        let mut p = particle(E::DUST);
        p.life = 3;
        p.tmp2 = 0x12;
        p.tmp = 0x34;
        p.ctype = 0x56;
        upgrade_particle(&mut p, 70);
        assert_eq!(p.element, E::EMBR);
        assert_eq!(p.ctype, 0x123456);
        assert_eq!(p.tmp, 1);
    }

    #[test]
    fn test_firework_index_is_clamped() {
        let mut p = particle(E::FIRW);
        p.tmp = 100_000;
        upgrade_particle(&mut p, 80);
        assert_eq!(p.element, E::EMBR);
        assert_eq!(p.ctype, firework_colour(FIREWORK_COLOURS - 1) as i32);

        let mut low = particle(E::FIRW);
        low.tmp = 2;
        upgrade_particle(&mut low, 80);
        assert_eq!(low.ctype, firework_colour(0) as i32);
        assert_eq!(low.ctype, 0xFF0000);
    }

    #[test]
    fn test_quartz_fields_shuffle_before_89() {
        let mut p = particle(E::QRTZ);
        p.tmp = 7;
        p.ctype = 9;
        upgrade_particle(&mut p, 88);
        assert_eq!((p.tmp2, p.tmp, p.ctype), (7, 9, 0));
    }

    #[test]
    fn test_filter_mode_reset() {
        let mut p = particle(E::FILT);
        p.tmp = 9;
        p.ctype = 0x3FF;
        upgrade_particle(&mut p, 88);
        assert_eq!((p.tmp, p.ctype), (6, 0));
    }

    #[test]
    fn test_photon_deco_flag_before_90() {
        let mut p = particle(E::PHOT);
        upgrade_particle(&mut p, 89);
        assert!(p.flags.contains(ParticleFlags::PHOTDECO));
        let mut q = particle(E::PHOT);
        upgrade_particle(&mut q, 90);
        assert!(q.flags.is_empty());
    }

    #[test]
    fn test_ray_and_conveyor_pack_before_91() {
        let mut cray = particle(E::CRAY);
        cray.ctype = E::DUST as i32;
        cray.tmp2 = 3;
        upgrade_particle(&mut cray, 90);
        assert_eq!(cray.ctype, E::DUST as i32 | 3 << 8);

        let mut conv = particle(E::CONV);
        conv.ctype = E::WATR as i32;
        conv.tmp = 2;
        upgrade_particle(&mut conv, 90);
        assert_eq!(conv.ctype, E::WATR as i32 | 2 << 8);
    }

    #[test]
    fn test_pipe_flags_before_93() {
        let mut p = particle(E::PIPE);
        p.ctype = 1;
        p.tmp = E::WATR as i32;
        upgrade_particle(&mut p, 92);
        assert_eq!(p.tmp & PIPE_INITIALIZING, PIPE_INITIALIZING);
        assert_eq!(p.ctype, E::WATR as i32);

        let mut sensor = particle(E::TSNS);
        sensor.tmp = 1;
        upgrade_particle(&mut sensor, 92);
        assert_eq!(sensor.tmp, 0);
    }

    #[test]
    fn test_builtin_life_colours_before_96() {
        let mut p = particle(E::LIFE);
        p.ctype = 19;
        p.tmp = 2;
        upgrade_particle(&mut p, 95);
        assert_eq!(p.tmp2, 2);
        assert_eq!(p.dcolour, 0xFFFF0000);
        assert_eq!(p.tmp, 0xFFFFFF00u32 as i32);
        assert_eq!(builtin_gol_colours(NGOL), None);
    }
}
