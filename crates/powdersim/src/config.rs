//! Run configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `powdersim.ron` file (if exists)
//! 3. Environment variables prefixed with `POWDERSIM_`
//!
//! Example environment variable: `POWDERSIM_SIMULATION__GRAVITY_MODE=2`

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use powdersim_core::SimSettings;
use serde::{Deserialize, Serialize};

/// Default config file stem, looked up in the working directory
pub const DEFAULT_CONFIG_NAME: &str = "powdersim";

/// Everything the runner needs besides its command line
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunConfig {
    #[serde(default)]
    pub simulation: SimSettings,

    #[serde(default)]
    pub run: RunSettings,
}

/// How long to run and how chatty to be about it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Ticks to simulate after loading
    pub ticks: u64,
    /// Force a stacking check right after loading
    pub stacking_check: bool,
    /// Print element statistics every N ticks (0 disables)
    pub log_every: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            ticks: 100,
            stacking_check: false,
            log_every: 0,
        }
    }
}

impl RunConfig {
    /// Load from `powdersim.ron` and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_NAME)
    }

    /// Load with `name` as the config file path (extension optional)
    pub fn load_from(name: &str) -> Result<Self> {
        let defaults = SimSettings::default();
        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .set_default("simulation.legacy_enable", defaults.legacy_enable)?
            .set_default("simulation.aheat_enable", defaults.aheat_enable)?
            .set_default("simulation.water_equal", defaults.water_equal)?
            .set_default("simulation.gravity_mode", defaults.gravity_mode as i64)?
            .set_default("simulation.edge_mode", defaults.edge_mode.as_i32() as i64)?
            .set_default("simulation.ambient_air_temp", defaults.ambient_air_temp as f64)?
            .set_default("run.ticks", 100_i64)?
            .set_default("run.stacking_check", false)?
            .set_default("run.log_every", 0_i64)?
            // Layer 2: Config file (optional, won't error if missing)
            .add_source(
                File::with_name(name)
                    .format(config::FileFormat::Ron)
                    .required(false),
            )
            // Layer 3: Environment variables (POWDERSIM_RUN__TICKS, etc.)
            .add_source(Environment::with_prefix("POWDERSIM").separator("__"));

        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
