//! Per-element behavior callbacks
//!
//! Each element id maps to one [`Behavior`]. The enum is closed and
//! `Copy`, so the scheduler can look it up, release its borrow of the
//! table and then hand the simulation mutably to the handler.

mod bomb;
mod clone;
mod ember;
mod energy;
mod fire;
mod ice;
mod iron;
mod soap;
mod spark;
mod stickman;
mod water;

use powdersim_simulation::{ElementId, PT_NUM, PackedCell};

use crate::simulation::Simulation;

pub use soap::{SOAP_BACK, SOAP_BUBBLE, SOAP_FORWARD, detach_soap};
pub use stickman::MAX_FIGHTERS;
pub(crate) use stickman::next_fighter_number;

/// Neighbourhood data gathered once per particle per tick
#[derive(Debug, Clone, Copy)]
pub struct UpdateContext {
    pub index: usize,
    pub x: i32,
    pub y: i32,
    /// Empty (or out of bounds) neighbours
    pub surround_space: i32,
    /// Neighbours that are empty or of a different type
    pub nt: i32,
    pub surround: [PackedCell; 8],
}

/// Where a new particle should go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotHint {
    /// Allocate a free slot, only if the position allows this element
    Auto,
    /// Allocate a free slot without checking what is already there
    Unchecked,
    /// Overwrite an existing particle in place
    Replace(usize),
}

/// Element lifecycle and update hooks, all no-ops by default
pub trait ElementBehavior: Sync {
    /// Per-tick update, returns true when the particle was killed or
    /// must not move this tick
    fn update(&self, _sim: &mut Simulation, _ctx: &UpdateContext) -> bool {
        false
    }

    /// Called after defaults are written to a new particle
    fn on_create(&self, _sim: &mut Simulation, _i: usize, _x: i32, _y: i32, _element: u16, _v: i32) {}

    /// Called for both the old and the new type when a particle changes type
    fn on_change_type(&self, _sim: &mut Simulation, _i: usize, _x: i32, _y: i32, _from: u16, _to: u16) {}

    /// Veto creation or conversion into this element
    fn create_allowed(&self, _sim: &Simulation, _hint: SlotHint, _x: i32, _y: i32, _element: u16) -> bool {
        true
    }

    /// Runs once per tick before particles update
    fn before_tick(&self, _sim: &mut Simulation) {}

    /// Runs once per tick after particles update
    fn after_tick(&self, _sim: &mut Simulation) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behavior {
    #[default]
    Inert,
    Fire,
    Spark,
    Water,
    DistilledWater,
    SaltWater,
    Clone,
    BreakableClone,
    PoweredClone,
    PoweredBreakableClone,
    Photon,
    Neutron,
    Ember,
    Bomb,
    Iron,
    Ice,
    Soap,
    Stickman,
}

struct Inert;

impl ElementBehavior for Inert {}

impl Behavior {
    /// The handler implementing this behavior
    pub fn handler(self) -> &'static dyn ElementBehavior {
        match self {
            Behavior::Inert => &Inert,
            Behavior::Fire => &fire::Fire,
            Behavior::Spark => &spark::Spark,
            Behavior::Water => &water::Water,
            Behavior::DistilledWater => &water::DistilledWater,
            Behavior::SaltWater => &water::SaltWater,
            Behavior::Clone => &clone::Cloner { breakable: false },
            Behavior::BreakableClone => &clone::Cloner { breakable: true },
            Behavior::PoweredClone => &clone::PoweredCloner { breakable: false },
            Behavior::PoweredBreakableClone => &clone::PoweredCloner { breakable: true },
            Behavior::Photon => &energy::Photon,
            Behavior::Neutron => &energy::Neutron,
            Behavior::Ember => &ember::Ember,
            Behavior::Bomb => &bomb::Bomb,
            Behavior::Iron => &iron::Iron,
            Behavior::Ice => &ice::Ice,
            Behavior::Soap => &soap::Soap,
            Behavior::Stickman => &stickman::Stickman,
        }
    }
}

/// Behavior table indexed by element id
pub fn default_behaviors() -> Vec<Behavior> {
    use ElementId as E;

    let mut table = vec![Behavior::Inert; PT_NUM];
    let assignments = [
        (E::FIRE, Behavior::Fire),
        (E::PLSM, Behavior::Fire),
        (E::LAVA, Behavior::Fire),
        (E::SPRK, Behavior::Spark),
        (E::WATR, Behavior::Water),
        (E::DSTW, Behavior::DistilledWater),
        (E::SLTW, Behavior::SaltWater),
        (E::CLNE, Behavior::Clone),
        (E::BCLN, Behavior::BreakableClone),
        (E::PCLN, Behavior::PoweredClone),
        (E::PBCN, Behavior::PoweredBreakableClone),
        (E::PHOT, Behavior::Photon),
        (E::NEUT, Behavior::Neutron),
        (E::EMBR, Behavior::Ember),
        (E::BOMB, Behavior::Bomb),
        (E::IRON, Behavior::Iron),
        (E::ICEI, Behavior::Ice),
        (E::SNOW, Behavior::Ice),
        (E::SOAP, Behavior::Soap),
        (E::STKM, Behavior::Stickman),
        (E::STKM2, Behavior::Stickman),
        (E::FIGH, Behavior::Stickman),
    ];
    for (id, behavior) in assignments {
        table[id as usize] = behavior;
    }
    table
}

/// Offsets of the 5x5 neighbourhood, excluding the centre
pub(crate) fn neighbours_5x5() -> impl Iterator<Item = (i32, i32)> {
    (-2..=2).flat_map(|rx| (-2..=2).map(move |ry| (rx, ry))).filter(|&(rx, ry)| rx != 0 || ry != 0)
}

/// Offsets of the 3x3 neighbourhood, excluding the centre
pub(crate) fn neighbours_3x3() -> impl Iterator<Item = (i32, i32)> {
    (-1..=1).flat_map(|rx| (-1..=1).map(move |ry| (rx, ry))).filter(|&(rx, ry)| rx != 0 || ry != 0)
}
