//! Element data and particle types for powdersim
//!
//! This crate provides the foundational data types for the particle engine:
//! - Grid constants and the shared rounding rule (XRES, YRES, CELL, round_pos)
//! - Element definitions (ElementId, ElementDescriptor, Elements)
//! - Property and particle flags (Properties, ParticleFlags)
//! - Particle records and packed spatial-map entries (Particle, PackedCell)
//! - Wall ids and historical wall remapping (WallId, change_wallpp)

mod elements;
mod grid;
mod particle;
mod properties;
mod walls;

pub use elements::{
    ElementDescriptor, ElementId, Elements, IDENTIFIER_PREFIX, PT_NORMAL_NUM, Transition,
    TransitionTarget,
};
pub use grid::{
    CELL, CFDS, IPH, IPL, ISTP, ITH, ITL, MAX_TEMP, MIN_TEMP, NPART, PMAPBITS, PMAPMASK, PT_NUM,
    R_TEMP, ROOM_TEMP, SIM_MAXVELOCITY, XCELLS, XCNTR, XRES, YCELLS, YCNTR, YRES, cell_index,
    in_bounds, restrict_flt, round_pos,
};
pub use particle::{PackedCell, Particle, ParticleFlags};
pub use properties::Properties;
pub use walls::{WallId, change_wallpp};
