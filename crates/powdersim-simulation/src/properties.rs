//! Element property flags

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Category and behavior flags of an element
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Properties: u32 {
        /// Powder
        const TYPE_PART = 0x1;
        const TYPE_LIQUID = 0x2;
        const TYPE_SOLID = 0x4;
        const TYPE_GAS = 0x8;
        /// Lives in the photon map instead of the matter map
        const TYPE_ENERGY = 0x10;
        /// Can be sparked
        const CONDUCTS = 0x20;
        const BLACK = 0x40;
        const NEUTPENETRATE = 0x80;
        const NEUTABSORB = 0x100;
        const NEUTPASS = 0x200;
        const DEADLY = 0x400;
        const HOT_GLOW = 0x800;
        const LIFE = 0x1000;
        const RADIOACTIVE = 0x2000;
        /// Life counts down once per tick
        const LIFE_DEC = 0x4000;
        /// Killed when life reaches zero
        const LIFE_KILL = 0x8000;
        /// Killed when life counts down to zero
        const LIFE_KILL_DEC = 0x10000;
        const INDESTRUCTIBLE = 0x20000;
        const CLONE = 0x40000;
        const BREAKABLECLONE = 0x80000;
        const POWERED = 0x100000;
        const SPARKSETTLE = 0x200000;
        /// Does not exchange heat with the ambient grid
        const NOAMBHEAT = 0x400000;
        const NOCTYPEDRAW = 0x1000000;
    }
}

impl Properties {
    /// Mask of the five movement categories
    pub const TYPE_MASK: Properties = Properties::TYPE_PART
        .union(Properties::TYPE_LIQUID)
        .union(Properties::TYPE_SOLID)
        .union(Properties::TYPE_GAS)
        .union(Properties::TYPE_ENERGY);

    pub fn is_energy(self) -> bool {
        self.contains(Properties::TYPE_ENERGY)
    }

    pub fn is_liquid(self) -> bool {
        self.contains(Properties::TYPE_LIQUID)
    }

    pub fn is_powder(self) -> bool {
        self.contains(Properties::TYPE_PART)
    }

    pub fn is_solid(self) -> bool {
        self.contains(Properties::TYPE_SOLID)
    }

    pub fn is_gas(self) -> bool {
        self.contains(Properties::TYPE_GAS)
    }
}
