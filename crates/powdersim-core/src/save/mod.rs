//! OPS save files
//!
//! A [`Save`] is a detached copy of a rectangular region: particles with
//! positions relative to the region's top-left corner, the coarse grids
//! covering it, signs and the simulation switches of the moment it was
//! taken. [`Save::parse`] and [`Save::build`] convert between this value
//! and the OPS byte format; region capture and placement live on the
//! simulation (`create_save` / `load_save`).

pub mod bson;
mod compat;
mod error;
mod fix_type;
mod ops;
mod transform;

use std::collections::BTreeSet;

use glam::Vec2;
use powdersim_simulation::{CELL, ElementId as E, NPART, PT_NUM, Particle};

use crate::sign::{MAX_SIGNS, Sign};

pub use bson::{Bson, Document};
pub use compat::{NGOL, builtin_gol_colours, is_builtin_gol};
pub use error::{BuildError, ParseError};
pub use fix_type::fix_type;

/// Official save version written into the header
pub const SAVE_VERSION: u8 = 95;
pub const MINOR_VERSION: i32 = 0;
pub const BUILD_NUM: i32 = 345;
/// Version of the modded save extensions, stored as `Jacob1's_Mod`
pub const MOD_SAVE_VERSION: i32 = 25;

/// Version compared against a save's `minimumVersion`
const FAKE_SAVE_VERSION: i32 = 95;
const FAKE_MINOR_VERSION: i32 = 0;

/// Largest decompressed document accepted or produced
pub const MAX_DOCUMENT_SIZE: u64 = 200 * 1024 * 1024;

/// Simulation switches carried by a save
///
/// `Option` fields were added by later versions; `None` means the save
/// did not mention them and loading keeps the current value.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveSettings {
    pub legacy_enable: bool,
    pub gravity_enable: bool,
    pub aheat_enable: bool,
    pub water_equal: bool,
    pub paused: bool,
    pub gravity_mode: i32,
    pub air_mode: i32,
    pub edge_mode: i32,
    /// Kelvin
    pub ambient_air_temp: Option<f32>,
    pub msrotation: Option<bool>,
    pub hud_enable: Option<bool>,
    pub decorations_enable: Option<bool>,
    pub active_menu: Option<i32>,
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            legacy_enable: false,
            gravity_enable: false,
            aheat_enable: false,
            water_equal: false,
            paused: false,
            gravity_mode: 0,
            air_mode: 0,
            edge_mode: 0,
            ambient_air_temp: None,
            msrotation: None,
            hud_enable: None,
            decorations_enable: None,
            active_menu: None,
        }
    }
}

/// Stickman power-ups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StkmOptions {
    pub rocket_boots1: bool,
    pub rocket_boots2: bool,
    pub fan1: bool,
    pub fan2: bool,
    /// Fighter numbers wearing rocket boots
    pub rocket_boots_figh: Vec<i32>,
    pub fan_figh: Vec<i32>,
}

impl StkmOptions {
    pub fn has_data(&self) -> bool {
        self.rocket_boots1
            || self.rocket_boots2
            || self.fan1
            || self.fan2
            || !self.rocket_boots_figh.is_empty()
            || !self.fan_figh.is_empty()
    }
}

/// Where the save was last opened from, kept so it can be re-saved in place
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveInfo {
    pub save_opened: bool,
    pub file_opened: bool,
    pub save_name: String,
    pub file_name: String,
    pub published: bool,
    pub id: i32,
    pub version: String,
    pub description: String,
    pub author: String,
    pub tags: String,
    pub my_vote: i32,
}

/// A detached region of a simulation
#[derive(Debug, Clone, PartialEq)]
pub struct Save {
    /// Size in coarse cells
    pub block_width: usize,
    pub block_height: usize,
    /// Positions are relative to the region's top-left pixel
    pub particles: Vec<Particle>,

    // Coarse grids, indexed `y * block_width + x`
    pub walls: Vec<u8>,
    pub fan_vx: Vec<f32>,
    pub fan_vy: Vec<f32>,
    pub pressure: Vec<f32>,
    pub vx: Vec<f32>,
    pub vy: Vec<f32>,
    pub ambient_heat: Vec<f32>,
    pub has_pressure: bool,
    pub has_ambient_heat: bool,

    pub signs: Vec<Sign>,
    /// Element identifiers and the ids they had when the save was made
    pub palette: Vec<(String, i32)>,
    pub settings: SaveSettings,
    pub stkm: StkmOptions,
    pub render_modes: Option<BTreeSet<u32>>,
    pub display_modes: Option<BTreeSet<u32>>,
    pub color_mode: Option<u32>,
    pub left_selected: String,
    pub right_selected: String,
    pub save_info: Option<SaveInfo>,
    /// Attribution tree, passed through untouched
    pub authors: Option<Document>,
    /// `(major, minor)` the writer declared as required to load the save
    pub minimum_version: Option<(i32, i32)>,

    /// Notes for the user after loading
    pub log_messages: Vec<String>,
    pub admin_log_messages: Vec<String>,
    pub created_version: i32,
    pub mod_created_version: i32,
    pub mobile_created_version: i32,
    /// Bits of packed type in ctype fields of CRAY/DRAY/CONV
    pub pmapbits: i32,

    /// Accumulated stamp translation, decides when grids shift a cell
    translated: Vec2,
}

impl Save {
    /// An empty save covering `block_width x block_height` cells
    pub fn new(block_width: usize, block_height: usize) -> Self {
        let cells = block_width * block_height;
        Self {
            block_width,
            block_height,
            particles: Vec::new(),
            walls: vec![0; cells],
            fan_vx: vec![0.0; cells],
            fan_vy: vec![0.0; cells],
            pressure: vec![0.0; cells],
            vx: vec![0.0; cells],
            vy: vec![0.0; cells],
            ambient_heat: vec![0.0; cells],
            has_pressure: false,
            has_ambient_heat: false,
            signs: Vec::new(),
            palette: Vec::new(),
            settings: SaveSettings::default(),
            stkm: StkmOptions::default(),
            render_modes: None,
            display_modes: None,
            color_mode: None,
            left_selected: String::new(),
            right_selected: String::new(),
            save_info: None,
            authors: None,
            minimum_version: None,
            log_messages: Vec::new(),
            admin_log_messages: Vec::new(),
            created_version: 0,
            mod_created_version: 0,
            mobile_created_version: 0,
            pmapbits: 8,
            translated: Vec2::ZERO,
        }
    }

    /// Decode an OPS buffer
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < 12 {
            return Err(ParseError::TooSmall);
        }
        match &data[..3] {
            b"fuC" | b"PSv" => Err(ParseError::UnsupportedLegacyFormat),
            b"OPS" if data[3] != b'1' => Err(ParseError::NewerFormat),
            b"OPS" => ops::parse(data),
            _ => Err(ParseError::InvalidFormat),
        }
    }

    /// Encode as an OPS buffer
    pub fn build(&self) -> Result<Vec<u8>, BuildError> {
        ops::build(self)
    }

    /// Width in pixels
    pub fn full_width(&self) -> i32 {
        self.block_width as i32 * CELL
    }

    pub fn full_height(&self) -> i32 {
        self.block_height as i32 * CELL
    }

    #[inline]
    pub fn block_index(&self, bx: usize, by: usize) -> usize {
        by * self.block_width + bx
    }

    /// Append a particle, ignoring empty ones and anything past capacity
    pub fn push_particle(&mut self, particle: Particle) {
        if self.particles.len() < NPART && !particle.is_empty() {
            self.particles.push(particle);
        }
    }

    /// Append a sign, ignoring empty text and anything past the sign limit
    pub fn push_sign(&mut self, sign: Sign) {
        if self.signs.len() < MAX_SIGNS && !sign.text.is_empty() {
            self.signs.push(sign);
        }
    }

    /// Whether `ctype` holds an element id for particles of this type
    pub fn type_in_ctype(element: u16, ctype: i32) -> bool {
        if !(0..PT_NUM as i32).contains(&ctype) {
            return false;
        }
        matches!(
            element,
            E::CLNE
                | E::PCLN
                | E::BCLN
                | E::PBCN
                | E::STOR
                | E::CONV
                | E::STKM
                | E::STKM2
                | E::FIGH
                | E::LAVA
                | E::SPRK
                | E::PSTN
                | E::CRAY
                | E::DTEC
                | E::DRAY
                | E::LDTC
        )
    }

    /// Whether the low bits of `tmp` hold an element id
    pub fn type_in_tmp(element: u16) -> bool {
        element == E::STOR
    }

    /// Whether `tmp2` holds an element id
    pub fn type_in_tmp2(element: u16, tmp2: i32) -> bool {
        matches!(element, E::VIRS | E::VRSG | E::VRSS) && (0..PT_NUM as i32).contains(&tmp2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_dispatch() {
        assert_eq!(Save::parse(b"OPS1"), Err(ParseError::TooSmall));
        assert_eq!(
            Save::parse(b"PSv\0\0\0\0\0\0\0\0\0"),
            Err(ParseError::UnsupportedLegacyFormat)
        );
        assert_eq!(
            Save::parse(b"OPS2\0\0\0\0\0\0\0\0"),
            Err(ParseError::NewerFormat)
        );
        assert_eq!(
            Save::parse(b"GIF89a\0\0\0\0\0\0"),
            Err(ParseError::InvalidFormat)
        );
    }

    #[test]
    fn test_push_limits() {
        let mut save = Save::new(2, 2);
        save.push_particle(Particle::EMPTY);
        save.push_particle(Particle::new(E::DUST, 1.0, 1.0));
        assert_eq!(save.particles.len(), 1);

        for i in 0..MAX_SIGNS + 3 {
            save.push_sign(Sign::new(format!("s{i}"), 1, 1, Default::default()));
        }
        save.push_sign(Sign::new("", 1, 1, Default::default()));
        assert_eq!(save.signs.len(), MAX_SIGNS);
    }

    #[test]
    fn test_type_fields() {
        assert!(Save::type_in_ctype(E::CLNE, E::WATR as i32));
        assert!(!Save::type_in_ctype(E::CLNE, PT_NUM as i32));
        assert!(!Save::type_in_ctype(E::DUST, E::WATR as i32));
        assert!(Save::type_in_tmp(E::STOR));
        assert!(Save::type_in_tmp2(E::VIRS, E::WATR as i32));
        assert!(!Save::type_in_tmp2(E::VIRS, -1));
    }

    #[test]
    fn test_stkm_has_data() {
        let mut stkm = StkmOptions::default();
        assert!(!stkm.has_data());
        stkm.fan_figh.push(3);
        assert!(stkm.has_data());
    }
}
