//! Global simulation switches

use powdersim_simulation::R_TEMP;
use serde::{Deserialize, Serialize};

/// How particles behave at the border of the simulation area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum EdgeMode {
    /// Particles leaving the area are destroyed
    #[default]
    Void,
    /// The border is lined with walls
    Solid,
    /// Positions wrap around to the opposite side
    Loop,
}

impl From<i32> for EdgeMode {
    fn from(mode: i32) -> Self {
        EdgeMode::from_i32(mode)
    }
}

impl From<EdgeMode> for i32 {
    fn from(mode: EdgeMode) -> Self {
        mode.as_i32()
    }
}

impl EdgeMode {
    pub fn from_i32(mode: i32) -> Self {
        match mode {
            1 => EdgeMode::Solid,
            2 => EdgeMode::Loop,
            _ => EdgeMode::Void,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            EdgeMode::Void => 0,
            EdgeMode::Solid => 1,
            EdgeMode::Loop => 2,
        }
    }
}

/// Simulation-wide settings, also transferred by saves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Old heat model: no heat conduction, legacy reaction rules instead
    pub legacy_enable: bool,
    /// Exchange heat with the ambient air grid
    pub aheat_enable: bool,
    /// Occasionally level water surfaces
    pub water_equal: bool,
    /// Diffusion scales with temperature
    pub realistic_heat: bool,
    /// 0 down, 1 off, 2 radial
    pub gravity_mode: i32,
    pub air_mode: i32,
    pub edge_mode: EdgeMode,
    pub newtonian_gravity: bool,
    /// Kelvin
    pub ambient_air_temp: f32,
    pub msrotation: bool,
    pub seed: u64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            legacy_enable: false,
            aheat_enable: false,
            water_equal: false,
            realistic_heat: false,
            gravity_mode: 0,
            air_mode: 0,
            edge_mode: EdgeMode::Void,
            newtonian_gravity: false,
            ambient_air_temp: R_TEMP + 273.15,
            msrotation: true,
            seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_mode_numbers() {
        for mode in 0..3 {
            assert_eq!(EdgeMode::from_i32(mode).as_i32(), mode);
        }
        assert_eq!(EdgeMode::from_i32(9), EdgeMode::Void);
    }

    #[test]
    fn test_default_settings() {
        let settings = SimSettings::default();
        assert_eq!(settings.gravity_mode, 0);
        assert_eq!(settings.edge_mode, EdgeMode::Void);
        assert!((settings.ambient_air_temp - 295.15).abs() < 1e-3);
    }
}
