//! Falling-sand particle engine and OPS save codec
//!
//! - Particle storage and spatial maps (ParticleStore, SpatialIndex)
//! - Coarse air, gravity and wall grids (AirGrid, GravityGrid, WallGrid)
//! - Per-element behaviors (Behavior, ElementBehavior)
//! - The tick pipeline and region load/save (Simulation)
//! - The OPS file format (Save)

pub mod elements;
pub mod fields;
pub mod rng;
pub mod save;
pub mod settings;
pub mod sign;
pub mod simulation;
pub mod spatial;
pub mod store;
pub mod walls;

pub use elements::{Behavior, ElementBehavior, SlotHint, UpdateContext};
pub use fields::{AirGrid, FieldSolver, GravityGrid, StillAir};
pub use rng::SimRng;
pub use save::{BuildError, ParseError, Save};
pub use settings::{EdgeMode, SimSettings};
pub use sign::Sign;
pub use simulation::{DebugStep, LoadMode, Simulation};
pub use spatial::SpatialIndex;
pub use store::ParticleStore;
pub use walls::WallGrid;

pub use powdersim_simulation as data;
