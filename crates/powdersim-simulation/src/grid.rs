//! Grid dimensions and numeric constants
//!
//! Positions are continuous floats on a fine pixel grid of `XRES x YRES`.
//! Air, walls and gravity live on a coarse grid of `CELL x CELL` blocks.

/// Width of the simulation area in pixels
pub const XRES: i32 = 612;
/// Height of the simulation area in pixels
pub const YRES: i32 = 384;
/// Size of a coarse cell in pixels
pub const CELL: i32 = 4;

/// Coarse grid width
pub const XCELLS: usize = (XRES / CELL) as usize;
/// Coarse grid height
pub const YCELLS: usize = (YRES / CELL) as usize;

pub const XCNTR: i32 = XRES / 2;
pub const YCNTR: i32 = YRES / 2;

/// Particle store capacity
pub const NPART: usize = (XRES * YRES) as usize;

/// Bits reserved for the element type in a packed map entry
pub const PMAPBITS: u32 = 9;
pub const PMAPMASK: u32 = (1 << PMAPBITS) - 1;
/// Number of element type slots
pub const PT_NUM: usize = 1 << PMAPBITS;

/// Maximum movement sub-step length
pub const ISTP: f32 = (CELL / 2) as f32;
/// Air grid scaling factor
pub const CFDS: f32 = 4.0 / CELL as f32;
pub const SIM_MAXVELOCITY: f32 = 1.0e4;

/// Room temperature in Celsius
pub const R_TEMP: f32 = 22.0;
/// Room temperature in Kelvin, the default particle temperature
pub const ROOM_TEMP: f32 = R_TEMP + 273.15;
pub const MAX_TEMP: f32 = 9999.0;
pub const MIN_TEMP: f32 = 0.0;

// Threshold values meaning "never transitions"
pub const IPL: f32 = -257.0;
pub const IPH: f32 = 257.0;
pub const ITL: f32 = MIN_TEMP - 1.0;
pub const ITH: f32 = MAX_TEMP + 1.0;

/// Round a sub-cell position to its pixel: `+0.5` then truncate
#[inline]
pub fn round_pos(v: f32) -> i32 {
    (v + 0.5) as i32
}

#[inline]
pub fn in_bounds(x: i32, y: i32) -> bool {
    x >= 0 && x < XRES && y >= 0 && y < YRES
}

/// Index of the coarse cell containing pixel (x, y)
#[inline]
pub fn cell_index(x: i32, y: i32) -> usize {
    (y / CELL) as usize * XCELLS + (x / CELL) as usize
}

#[inline]
pub fn restrict_flt(v: f32, min: f32, max: f32) -> f32 {
    if v < min {
        min
    } else if v > max {
        max
    } else {
        v
    }
}
