//! Element definitions and registry

use crate::grid::{CFDS, IPH, IPL, ITH, ITL, MAX_TEMP, PT_NUM, R_TEMP};
use crate::properties::Properties;
use serde::{Deserialize, Serialize};

/// Built-in element IDs
///
/// These are the historical numeric ids; saves without a palette rely on them.
pub struct ElementId;

impl ElementId {
    pub const NONE: u16 = 0;
    pub const DUST: u16 = 1;
    pub const WATR: u16 = 2;
    pub const OIL: u16 = 3;
    pub const FIRE: u16 = 4;
    pub const STNE: u16 = 5;
    pub const LAVA: u16 = 6;
    pub const GUNP: u16 = 7;
    pub const NITR: u16 = 8;
    pub const CLNE: u16 = 9;
    pub const GAS: u16 = 10;
    pub const PLEX: u16 = 11;
    pub const GOO: u16 = 12;
    pub const ICEI: u16 = 13;
    pub const METL: u16 = 14;
    pub const SPRK: u16 = 15;
    pub const SNOW: u16 = 16;
    pub const WOOD: u16 = 17;
    pub const NEUT: u16 = 18;
    pub const PLUT: u16 = 19;
    pub const PLNT: u16 = 20;
    pub const ACID: u16 = 21;
    pub const VOID: u16 = 22;
    pub const WTRV: u16 = 23;
    pub const CNCT: u16 = 24;
    pub const DSTW: u16 = 25;
    pub const SALT: u16 = 26;
    pub const SLTW: u16 = 27;
    pub const DMND: u16 = 28;
    pub const BMTL: u16 = 29;
    pub const BRMT: u16 = 30;
    pub const PHOT: u16 = 31;
    pub const URAN: u16 = 32;
    pub const WAX: u16 = 33;
    pub const MWAX: u16 = 34;
    pub const PSCN: u16 = 35;
    pub const NSCN: u16 = 36;
    pub const LNTG: u16 = 37;
    pub const INSL: u16 = 38;
    pub const BHOL: u16 = 39;
    pub const WHOL: u16 = 40;
    pub const RBDM: u16 = 41;
    pub const LRBD: u16 = 42;
    pub const NTCT: u16 = 43;
    pub const SAND: u16 = 44;
    pub const GLAS: u16 = 45;
    pub const PTCT: u16 = 46;
    pub const BGLA: u16 = 47;
    pub const THDR: u16 = 48;
    pub const PLSM: u16 = 49;
    pub const ETRD: u16 = 50;
    pub const NICE: u16 = 51;
    pub const NBLE: u16 = 52;
    pub const BTRY: u16 = 53;
    pub const LCRY: u16 = 54;
    pub const STKM: u16 = 55;
    pub const SWCH: u16 = 56;
    pub const SMKE: u16 = 57;
    pub const DESL: u16 = 58;
    pub const COAL: u16 = 59;
    pub const LO2: u16 = 60;
    pub const O2: u16 = 61;
    pub const INWR: u16 = 62;
    pub const YEST: u16 = 63;
    pub const DYST: u16 = 64;
    pub const THRM: u16 = 65;
    pub const GLOW: u16 = 66;
    pub const BRCK: u16 = 67;
    pub const HFLM: u16 = 68;
    pub const FIRW: u16 = 69;
    pub const FUSE: u16 = 70;
    pub const FSEP: u16 = 71;
    pub const AMTR: u16 = 72;
    pub const BCOL: u16 = 73;
    pub const PCLN: u16 = 74;
    pub const HSWC: u16 = 75;
    pub const IRON: u16 = 76;
    pub const MORT: u16 = 77;
    pub const LIFE: u16 = 78;
    pub const DLAY: u16 = 79;
    pub const CO2: u16 = 80;
    pub const DRIC: u16 = 81;
    pub const CBNW: u16 = 82;
    pub const STOR: u16 = 83;
    pub const PVOD: u16 = 84;
    pub const CONV: u16 = 85;
    pub const CAUS: u16 = 86;
    pub const LIGH: u16 = 87;
    pub const TESC: u16 = 88;
    pub const DEST: u16 = 89;
    pub const SPNG: u16 = 90;
    pub const RIME: u16 = 91;
    pub const FOG: u16 = 92;
    pub const BCLN: u16 = 93;
    pub const LOVE: u16 = 94;
    pub const DEUT: u16 = 95;
    pub const WARP: u16 = 96;
    pub const PUMP: u16 = 97;
    pub const FWRK: u16 = 98;
    pub const PIPE: u16 = 99;
    pub const FRZZ: u16 = 100;
    pub const FRZW: u16 = 101;
    pub const GRAV: u16 = 102;
    pub const BIZR: u16 = 103;
    pub const BIZRG: u16 = 104;
    pub const BIZRS: u16 = 105;
    pub const INST: u16 = 106;
    pub const ISOZ: u16 = 107;
    pub const ISZS: u16 = 108;
    pub const PRTI: u16 = 109;
    pub const PRTO: u16 = 110;
    pub const PSTE: u16 = 111;
    pub const PSTS: u16 = 112;
    pub const ANAR: u16 = 113;
    pub const VINE: u16 = 114;
    pub const INVIS: u16 = 115;
    pub const EQUALVEL: u16 = 116;
    pub const SPAWN2: u16 = 117;
    pub const SPAWN: u16 = 118;
    pub const SHLD1: u16 = 119;
    pub const SHLD2: u16 = 120;
    pub const SHLD3: u16 = 121;
    pub const SHLD4: u16 = 122;
    pub const LOLZ: u16 = 123;
    pub const WIFI: u16 = 124;
    pub const FILT: u16 = 125;
    pub const ARAY: u16 = 126;
    pub const BRAY: u16 = 127;
    pub const STKM2: u16 = 128;
    pub const BOMB: u16 = 129;
    pub const C5: u16 = 130;
    pub const SING: u16 = 131;
    pub const QRTZ: u16 = 132;
    pub const PQRT: u16 = 133;
    pub const EMP: u16 = 134;
    pub const BREC: u16 = 135;
    pub const ELEC: u16 = 136;
    pub const ACEL: u16 = 137;
    pub const DCEL: u16 = 138;
    pub const BANG: u16 = 139;
    pub const IGNT: u16 = 140;
    pub const BOYL: u16 = 141;
    pub const GEL: u16 = 142;
    pub const TRON: u16 = 143;
    pub const TTAN: u16 = 144;
    pub const EXOT: u16 = 145;
    pub const EMBR: u16 = 147;
    pub const H2: u16 = 148;
    pub const SOAP: u16 = 149;
    pub const NBHL: u16 = 150;
    pub const NWHL: u16 = 151;
    pub const MERC: u16 = 152;
    pub const PBCN: u16 = 153;
    pub const GPMP: u16 = 154;
    pub const CLST: u16 = 155;
    pub const WIRE: u16 = 156;
    pub const GBMB: u16 = 157;
    pub const FIGH: u16 = 158;
    pub const FRAY: u16 = 159;
    pub const RPEL: u16 = 160;
    pub const PPIP: u16 = 161;
    pub const DTEC: u16 = 162;
    pub const DMG: u16 = 163;
    pub const TSNS: u16 = 164;
    pub const VIBR: u16 = 165;
    pub const BVBR: u16 = 166;
    pub const CRAY: u16 = 167;
    pub const PSTN: u16 = 168;
    pub const FRME: u16 = 169;
    pub const GOLD: u16 = 170;
    pub const TUNG: u16 = 171;
    pub const PSNS: u16 = 172;
    pub const PROT: u16 = 173;
    pub const VIRS: u16 = 174;
    pub const VRSS: u16 = 175;
    pub const VRSG: u16 = 176;
    pub const GRVT: u16 = 177;
    pub const DRAY: u16 = 178;
    pub const CRMC: u16 = 179;
    pub const HEAC: u16 = 180;
    pub const SAWD: u16 = 181;
    pub const POLO: u16 = 182;
    pub const RFRG: u16 = 183;
    pub const RFGL: u16 = 184;
    pub const LSNS: u16 = 185;
    pub const LDTC: u16 = 186;
    pub const SLCN: u16 = 187;
    pub const PTNM: u16 = 188;
    pub const VSNS: u16 = 189;
    pub const ROCK: u16 = 190;
    pub const LITH: u16 = 191;
}

/// Number of built-in element ids
pub const PT_NORMAL_NUM: u16 = 192;

/// Short names of the built-in elements, indexed by id
///
/// The save palette stores them as `DEFAULT_PT_<name>`. Empty entries are
/// unassigned ids.
const BUILTIN_NAMES: [&str; PT_NORMAL_NUM as usize] = [
    "NONE", "DUST", "WATR", "OIL", "FIRE", "STNE", "LAVA", "GUNP", "NITR", "CLNE", //
    "GAS", "PLEX", "GOO", "ICEI", "METL", "SPRK", "SNOW", "WOOD", "NEUT", "PLUT", //
    "PLNT", "ACID", "VOID", "WTRV", "CNCT", "DSTW", "SALT", "SLTW", "DMND", "BMTL", //
    "BRMT", "PHOT", "URAN", "WAX", "MWAX", "PSCN", "NSCN", "LNTG", "INSL", "BHOL", //
    "WHOL", "RBDM", "LRBD", "NTCT", "SAND", "GLAS", "PTCT", "BGLA", "THDR", "PLSM", //
    "ETRD", "NICE", "NBLE", "BTRY", "LCRY", "STKM", "SWCH", "SMKE", "DESL", "COAL", //
    "LO2", "O2", "INWR", "YEST", "DYST", "THRM", "GLOW", "BRCK", "HFLM", "FIRW", //
    "FUSE", "FSEP", "AMTR", "BCOL", "PCLN", "HSWC", "IRON", "MORT", "LIFE", "DLAY", //
    "CO2", "DRIC", "CBNW", "STOR", "PVOD", "CONV", "CAUS", "LIGH", "TESC", "DEST", //
    "SPNG", "RIME", "FOG", "BCLN", "LOVE", "DEUT", "WARP", "PUMP", "FWRK", "PIPE", //
    "FRZZ", "FRZW", "GRAV", "BIZR", "BIZRG", "BIZRS", "INST", "ISOZ", "ISZS", "PRTI", //
    "PRTO", "PSTE", "PSTS", "ANAR", "VINE", "INVIS", "EQUALVEL", "SPAWN2", "SPAWN", "SHLD1", //
    "SHLD2", "SHLD3", "SHLD4", "LOLZ", "WIFI", "FILT", "ARAY", "BRAY", "STKM2", "BOMB", //
    "C5", "SING", "QRTZ", "PQRT", "EMP", "BREC", "ELEC", "ACEL", "DCEL", "BANG", //
    "IGNT", "BOYL", "GEL", "TRON", "TTAN", "EXOT", "", "EMBR", "H2", "SOAP", //
    "NBHL", "NWHL", "MERC", "PBCN", "GPMP", "CLST", "WIRE", "GBMB", "FIGH", "FRAY", //
    "RPEL", "PPIP", "DTEC", "DMG", "TSNS", "VIBR", "BVBR", "CRAY", "PSTN", "FRME", //
    "GOLD", "TUNG", "PSNS", "PROT", "VIRS", "VRSS", "VRSG", "GRVT", "DRAY", "CRMC", //
    "HEAC", "SAWD", "POLO", "RFRG", "RFGL", "LSNS", "LDTC", "SLCN", "PTNM", "VSNS", //
    "ROCK", "LITH",
];

/// Prefix of every built-in element identifier
pub const IDENTIFIER_PREFIX: &str = "DEFAULT_PT_";

/// Where a pressure or temperature transition leads
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionTarget {
    /// No transition
    None,
    /// Become this element; `Element(0)` kills the particle
    Element(u16),
    /// Handled case by case in code (ice melting back to its ctype, lava solidifying, ...)
    Special,
}

/// One threshold/target pair of the transition table
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub threshold: f32,
    pub target: TransitionTarget,
}

impl Transition {
    pub const fn to(threshold: f32, element: u16) -> Self {
        Self {
            threshold,
            target: TransitionTarget::Element(element),
        }
    }

    pub const fn special(threshold: f32) -> Self {
        Self {
            threshold,
            target: TransitionTarget::Special,
        }
    }

    pub const fn never(threshold: f32) -> Self {
        Self {
            threshold,
            target: TransitionTarget::None,
        }
    }

    pub fn is_some(&self) -> bool {
        self.target != TransitionTarget::None
    }
}

/// Physical constants and defaults of one element type
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub id: u16,
    /// Stable palette identifier, e.g. `DEFAULT_PT_WATR`
    pub identifier: String,
    pub name: String,
    pub enabled: bool,

    // Air coupling
    pub advection: f32,
    pub air_drag: f32,
    pub air_loss: f32,
    pub loss: f32,
    pub collision: f32,
    pub gravity: f32,
    pub newtonian_gravity: f32,
    pub diffusion: f32,
    pub hot_air: f32,
    /// 0 solid or gas, 1 powder, 2 liquid
    pub falldown: u8,

    pub flammable: i32,
    pub explosive: i32,
    pub meltable: i32,
    pub hardness: i32,
    pub photon_reflect_wavelengths: u32,
    /// Relative density used to build the move table
    pub weight: i32,

    pub default_temp: f32,
    pub heat_conduct: u8,
    pub latent: u32,
    pub properties: Properties,

    pub low_pressure: Transition,
    pub high_pressure: Transition,
    pub low_temperature: Transition,
    pub high_temperature: Transition,

    // Particle defaults written on creation
    pub default_life: i32,
    pub default_tmp: i32,
    pub default_ctype: i32,
}

impl Default for ElementDescriptor {
    fn default() -> Self {
        Self {
            id: 0,
            identifier: String::new(),
            name: String::new(),
            enabled: false,
            advection: 0.0,
            air_drag: 0.0,
            air_loss: 1.0,
            loss: 1.0,
            collision: 0.0,
            gravity: 0.0,
            newtonian_gravity: 1.0,
            diffusion: 0.0,
            hot_air: 0.0,
            falldown: 0,
            flammable: 0,
            explosive: 0,
            meltable: 0,
            hardness: 30,
            photon_reflect_wavelengths: 0x3FFF_FFFF,
            weight: 50,
            default_temp: R_TEMP + 273.15,
            heat_conduct: 128,
            latent: 0,
            properties: Properties::TYPE_SOLID,
            low_pressure: Transition::never(IPL),
            high_pressure: Transition::never(IPH),
            low_temperature: Transition::never(ITL),
            high_temperature: Transition::never(ITH),
            default_life: 0,
            default_tmp: 0,
            default_ctype: 0,
        }
    }
}

impl ElementDescriptor {
    /// A descriptor for a built-in id with its name filled in
    fn builtin(id: u16) -> Self {
        let name = BUILTIN_NAMES
            .get(id as usize)
            .copied()
            .unwrap_or_default()
            .to_string();
        Self {
            id,
            identifier: if name.is_empty() {
                String::new()
            } else {
                format!("{IDENTIFIER_PREFIX}{name}")
            },
            name,
            ..Default::default()
        }
    }
}

/// Registry of all element types, indexed by id
pub struct Elements {
    elements: Vec<ElementDescriptor>,
}

impl Elements {
    pub fn new() -> Self {
        let mut elements = Self {
            elements: (0..PT_NUM as u16).map(ElementDescriptor::builtin).collect(),
        };
        elements.register_defaults();
        elements
    }

    /// Look up an element descriptor; unknown ids resolve to NONE
    pub fn get(&self, id: u16) -> &ElementDescriptor {
        self.elements
            .get(id as usize)
            .unwrap_or(&self.elements[0])
    }

    pub fn get_mut(&mut self, id: u16) -> Option<&mut ElementDescriptor> {
        self.elements.get_mut(id as usize)
    }

    /// True for enabled, non-NONE element ids
    pub fn is_element(&self, id: i32) -> bool {
        id > 0 && (id as usize) < PT_NUM && self.elements[id as usize].enabled
    }

    pub fn is_element_or_none(&self, id: i32) -> bool {
        id == 0 || self.is_element(id)
    }

    /// Find the id carrying a palette identifier
    pub fn lookup(&self, identifier: &str) -> Option<u16> {
        self.elements
            .iter()
            .skip(1)
            .find(|el| !el.identifier.is_empty() && el.identifier == identifier)
            .map(|el| el.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementDescriptor> {
        self.elements.iter()
    }

    pub fn register(&mut self, element: ElementDescriptor) {
        let id = element.id as usize;
        if id >= PT_NUM {
            log::warn!("Ignoring element {} with out of range id {id}", element.name);
            return;
        }
        self.elements[id] = element;
    }

    fn register_defaults(&mut self) {
        use ElementId as E;
        use Properties as P;

        // Every known id exists (so palettes and old saves resolve), but only
        // the physically described ones below are enabled.
        self.elements[0].name = "NONE".to_string();

        self.define(E::DUST, |el| {
            el.advection = 0.7;
            el.air_drag = 0.02 * CFDS;
            el.air_loss = 0.96;
            el.loss = 0.80;
            el.gravity = 0.1;
            el.falldown = 1;
            el.flammable = 10;
            el.hardness = 30;
            el.weight = 85;
            el.heat_conduct = 70;
            el.properties = P::TYPE_PART;
        });

        self.define(E::WATR, |el| {
            water_like(el);
            el.heat_conduct = 29;
            el.properties = P::TYPE_LIQUID | P::CONDUCTS | P::LIFE_DEC | P::NEUTPASS;
            el.low_temperature = Transition::to(273.15, E::ICEI);
            el.high_temperature = Transition::to(373.0, E::WTRV);
        });

        self.define(E::DSTW, |el| {
            water_like(el);
            el.heat_conduct = 23;
            el.properties = P::TYPE_LIQUID | P::NEUTPASS;
            el.low_temperature = Transition::to(273.15, E::ICEI);
            el.high_temperature = Transition::to(373.0, E::WTRV);
        });

        self.define(E::CBNW, |el| {
            water_like(el);
            el.heat_conduct = 29;
            el.properties = P::TYPE_LIQUID | P::CONDUCTS | P::LIFE_DEC | P::NEUTPENETRATE;
            el.low_temperature = Transition::to(273.15, E::ICEI);
            el.high_temperature = Transition::to(373.0, E::WTRV);
        });

        self.define(E::SLTW, |el| {
            water_like(el);
            el.weight = 35;
            el.heat_conduct = 75;
            el.properties = P::TYPE_LIQUID | P::CONDUCTS | P::LIFE_DEC | P::NEUTPENETRATE;
            el.low_temperature = Transition::to(252.05, E::ICEI);
            el.high_temperature = Transition::special(383.0);
        });

        self.define(E::OIL, |el| {
            el.advection = 0.6;
            el.air_drag = 0.01 * CFDS;
            el.air_loss = 0.98;
            el.loss = 0.95;
            el.gravity = 0.1;
            el.falldown = 2;
            el.flammable = 20;
            el.hardness = 5;
            el.weight = 20;
            el.heat_conduct = 42;
            el.properties = P::TYPE_LIQUID | P::NEUTPASS;
            el.high_temperature = Transition::to(333.0, E::GAS);
        });

        self.define(E::GAS, |el| {
            el.advection = 1.0;
            el.air_drag = 0.01 * CFDS;
            el.air_loss = 0.99;
            el.loss = 0.30;
            el.collision = -0.1;
            el.diffusion = 0.75;
            el.flammable = 600;
            el.hardness = 1;
            el.weight = 1;
            el.heat_conduct = 42;
            el.properties = P::TYPE_GAS;
            el.high_pressure = Transition::to(6.0, E::OIL);
            el.high_temperature = Transition::to(573.0, E::FIRE);
        });

        self.define(E::FIRE, |el| {
            fire_like(el);
            el.default_temp = R_TEMP + 400.0 + 273.15;
            el.heat_conduct = 88;
            el.properties = P::TYPE_GAS | P::LIFE_DEC | P::LIFE_KILL;
            el.high_temperature = Transition::to(2773.0, E::PLSM);
        });

        self.define(E::PLSM, |el| {
            fire_like(el);
            el.default_temp = MAX_TEMP;
            el.heat_conduct = 5;
            el.properties = P::TYPE_GAS | P::LIFE_DEC | P::LIFE_KILL;
        });

        self.define(E::SMKE, |el| {
            fire_like(el);
            el.default_temp = R_TEMP + 320.0 + 273.15;
            el.heat_conduct = 88;
            el.properties = P::TYPE_GAS | P::LIFE_DEC | P::LIFE_KILL_DEC;
            el.high_temperature = Transition::to(625.0, E::FIRE);
        });

        self.define(E::STNE, |el| {
            el.advection = 0.4;
            el.air_drag = 0.04 * CFDS;
            el.air_loss = 0.94;
            el.loss = 0.95;
            el.collision = -0.1;
            el.gravity = 0.3;
            el.falldown = 1;
            el.hardness = 5;
            el.weight = 90;
            el.heat_conduct = 150;
            el.properties = P::TYPE_PART;
            el.high_temperature = Transition::to(983.0, E::LAVA);
        });

        self.define(E::SAND, |el| {
            el.advection = 0.7;
            el.air_drag = 0.02 * CFDS;
            el.air_loss = 0.94;
            el.loss = 0.95;
            el.collision = -0.1;
            el.gravity = 0.3;
            el.falldown = 1;
            el.hardness = 30;
            el.weight = 90;
            el.heat_conduct = 150;
            el.properties = P::TYPE_PART;
            el.high_temperature = Transition::to(1973.0, E::LAVA);
        });

        self.define(E::SALT, |el| {
            el.advection = 0.4;
            el.air_drag = 0.04 * CFDS;
            el.air_loss = 0.94;
            el.loss = 0.95;
            el.collision = -0.1;
            el.gravity = 0.3;
            el.falldown = 1;
            el.hardness = 5;
            el.weight = 75;
            el.heat_conduct = 110;
            el.properties = P::TYPE_PART;
            el.high_temperature = Transition::to(1173.0, E::LAVA);
        });

        self.define(E::CNCT, |el| {
            el.advection = 0.4;
            el.air_drag = 0.04 * CFDS;
            el.air_loss = 0.94;
            el.loss = 0.95;
            el.collision = -0.1;
            el.gravity = 0.3;
            el.falldown = 1;
            el.hardness = 2;
            el.weight = 55;
            el.heat_conduct = 100;
            el.properties = P::TYPE_PART | P::HOT_GLOW;
            el.high_temperature = Transition::to(1123.0, E::LAVA);
        });

        self.define(E::LAVA, |el| {
            el.advection = 0.3;
            el.air_drag = 0.02 * CFDS;
            el.air_loss = 0.95;
            el.loss = 0.80;
            el.gravity = 0.15;
            el.falldown = 2;
            el.hardness = 2;
            el.weight = 45;
            el.default_temp = R_TEMP + 1500.0 + 273.15;
            el.heat_conduct = 60;
            el.properties = P::TYPE_LIQUID | P::LIFE_DEC;
            el.low_temperature = Transition::special(2573.15);
        });

        self.define(E::GUNP, |el| {
            el.advection = 0.7;
            el.air_drag = 0.02 * CFDS;
            el.air_loss = 0.94;
            el.loss = 0.80;
            el.gravity = 0.1;
            el.falldown = 1;
            el.flammable = 600;
            el.explosive = 1;
            el.hardness = 10;
            el.weight = 85;
            el.heat_conduct = 97;
            el.properties = P::TYPE_PART;
            el.high_temperature = Transition::to(673.0, E::FIRE);
        });

        self.define(E::NITR, |el| {
            el.advection = 0.5;
            el.air_drag = 0.02 * CFDS;
            el.air_loss = 0.92;
            el.loss = 0.97;
            el.gravity = 0.2;
            el.falldown = 2;
            el.flammable = 1000;
            el.explosive = 2;
            el.hardness = 3;
            el.weight = 23;
            el.heat_conduct = 50;
            el.properties = P::TYPE_LIQUID | P::NEUTPASS;
            el.high_temperature = Transition::to(673.0, E::FIRE);
        });

        self.define(E::PLEX, |el| {
            solid(el);
            el.flammable = 1000;
            el.explosive = 2;
            el.hardness = 1;
            el.heat_conduct = 88;
            el.properties = P::TYPE_SOLID | P::NEUTPENETRATE;
            el.high_temperature = Transition::to(673.0, E::FIRE);
        });

        self.define(E::WOOD, |el| {
            solid(el);
            el.flammable = 20;
            el.hardness = 15;
            el.heat_conduct = 164;
            el.properties = P::TYPE_SOLID;
            el.high_temperature = Transition::to(873.0, E::FIRE);
        });

        self.define(E::PLNT, |el| {
            solid(el);
            el.flammable = 20;
            el.hardness = 10;
            el.heat_conduct = 65;
            el.properties = P::TYPE_SOLID | P::NEUTPENETRATE | P::LIFE_DEC;
            el.high_temperature = Transition::to(573.0, E::FIRE);
        });

        self.define(E::COAL, |el| {
            solid(el);
            el.air_loss = 0.0;
            el.hardness = 20;
            el.heat_conduct = 200;
            el.default_life = 110;
            el.default_tmp = 50;
            el.properties = P::TYPE_SOLID;
        });

        self.define(E::BCOL, |el| {
            el.advection = 0.4;
            el.air_drag = 0.04 * CFDS;
            el.air_loss = 0.94;
            el.loss = 0.95;
            el.collision = -0.1;
            el.gravity = 0.3;
            el.falldown = 1;
            el.hardness = 2;
            el.weight = 90;
            el.heat_conduct = 150;
            el.default_life = 110;
            el.properties = P::TYPE_PART;
        });

        self.define(E::INSL, |el| {
            solid(el);
            el.flammable = 7;
            el.hardness = 10;
            el.heat_conduct = 0;
            el.properties = P::TYPE_SOLID;
        });

        self.define(E::METL, |el| {
            solid(el);
            el.meltable = 1;
            el.hardness = 1;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID | P::CONDUCTS | P::LIFE_DEC | P::HOT_GLOW;
            el.high_temperature = Transition::to(1273.0, E::LAVA);
        });

        self.define(E::IRON, |el| {
            solid(el);
            el.meltable = 1;
            el.hardness = 50;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID | P::CONDUCTS | P::LIFE_DEC | P::HOT_GLOW;
            el.high_temperature = Transition::to(1687.0, E::LAVA);
        });

        self.define(E::BMTL, |el| {
            solid(el);
            el.hardness = 1;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID | P::CONDUCTS | P::LIFE_DEC | P::HOT_GLOW;
            el.high_pressure = Transition::special(1.0);
            el.high_temperature = Transition::to(1273.0, E::LAVA);
        });

        self.define(E::BRMT, |el| {
            el.advection = 0.4;
            el.air_drag = 0.04 * CFDS;
            el.air_loss = 0.94;
            el.loss = 0.95;
            el.collision = -0.1;
            el.gravity = 0.3;
            el.falldown = 1;
            el.hardness = 2;
            el.weight = 90;
            el.heat_conduct = 211;
            el.properties = P::TYPE_PART | P::CONDUCTS | P::LIFE_DEC | P::HOT_GLOW;
            el.high_temperature = Transition::to(1273.0, E::LAVA);
        });

        self.define(E::PSCN, |el| {
            solid(el);
            el.meltable = 1;
            el.hardness = 1;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID | P::CONDUCTS | P::LIFE_DEC;
            el.high_temperature = Transition::to(1687.0, E::LAVA);
        });

        self.define(E::NSCN, |el| {
            solid(el);
            el.meltable = 1;
            el.hardness = 1;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID | P::CONDUCTS | P::LIFE_DEC;
            el.high_temperature = Transition::to(1687.0, E::LAVA);
        });

        self.define(E::ETRD, |el| {
            solid(el);
            el.hardness = 1;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID | P::CONDUCTS | P::LIFE_DEC;
        });

        self.define(E::INST, |el| {
            solid(el);
            el.hardness = 1;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID | P::CONDUCTS | P::LIFE_DEC;
        });

        self.define(E::WIRE, |el| {
            solid(el);
            el.hardness = 1;
            el.heat_conduct = 250;
            el.properties = P::TYPE_SOLID;
        });

        self.define(E::SWCH, |el| {
            solid(el);
            el.hardness = 1;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID | P::POWERED;
        });

        self.define(E::HSWC, |el| {
            solid(el);
            el.hardness = 1;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID | P::POWERED;
        });

        self.define(E::SPRK, |el| {
            solid(el);
            el.hardness = 1;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID | P::LIFE_DEC;
        });

        self.define(E::GLAS, |el| {
            solid(el);
            el.hardness = 0;
            el.heat_conduct = 150;
            el.properties = P::TYPE_SOLID | P::NEUTPASS | P::HOT_GLOW | P::SPARKSETTLE;
            el.high_temperature = Transition::to(1973.0, E::LAVA);
        });

        self.define(E::QRTZ, |el| {
            solid(el);
            el.hardness = 0;
            el.heat_conduct = 3;
            el.properties = P::TYPE_SOLID | P::HOT_GLOW | P::LIFE_DEC;
            el.high_temperature = Transition::to(2573.15, E::LAVA);
        });

        self.define(E::DMND, |el| {
            solid(el);
            el.hardness = 0;
            el.heat_conduct = 186;
            el.properties = P::TYPE_SOLID | P::INDESTRUCTIBLE;
        });

        self.define(E::VOID, |el| {
            solid(el);
            el.hardness = 0;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID;
        });

        self.define(E::PVOD, |el| {
            solid(el);
            el.hardness = 0;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID | P::POWERED;
        });

        self.define(E::NBHL, |el| {
            solid(el);
            el.advection = 0.0;
            el.hardness = 0;
            el.heat_conduct = 186;
            el.default_temp = MAX_TEMP;
            el.properties = P::TYPE_SOLID;
        });

        self.define(E::ICEI, |el| {
            solid(el);
            el.hardness = 20;
            el.default_temp = R_TEMP - 50.0 + 273.15;
            el.heat_conduct = 46;
            el.latent = 1095;
            el.properties = P::TYPE_SOLID | P::LIFE_DEC | P::NEUTPASS;
            el.high_pressure = Transition::to(0.8, E::SNOW);
            el.high_temperature = Transition::special(252.05);
        });

        self.define(E::SNOW, |el| {
            el.advection = 0.7;
            el.air_drag = 0.01 * CFDS;
            el.air_loss = 0.96;
            el.loss = 0.90;
            el.collision = -0.1;
            el.gravity = 0.05;
            el.falldown = 1;
            el.hardness = 20;
            el.default_temp = R_TEMP - 30.0 + 273.15;
            el.heat_conduct = 46;
            el.latent = 1095;
            el.properties = P::TYPE_PART | P::LIFE_DEC;
            el.high_temperature = Transition::special(252.05);
        });

        self.define(E::WTRV, |el| {
            el.advection = 1.0;
            el.air_drag = 0.01 * CFDS;
            el.air_loss = 0.99;
            el.loss = 0.30;
            el.collision = -0.1;
            el.gravity = -0.1;
            el.diffusion = 0.75;
            el.hot_air = 0.0003 * CFDS;
            el.hardness = 4;
            el.weight = 1;
            el.default_temp = R_TEMP + 100.0 + 273.15;
            el.heat_conduct = 48;
            el.latent = 7500;
            el.properties = P::TYPE_GAS | P::LIFE_DEC;
            el.low_temperature = Transition::special(371.0);
        });

        self.define(E::RIME, |el| {
            solid(el);
            el.hardness = 0;
            el.default_temp = 243.15;
            el.heat_conduct = 100;
            el.properties = P::TYPE_SOLID;
            el.high_temperature = Transition::to(273.15, E::WATR);
        });

        self.define(E::NBLE, |el| {
            el.advection = 1.0;
            el.air_drag = 0.01 * CFDS;
            el.air_loss = 0.99;
            el.loss = 0.30;
            el.collision = -0.1;
            el.diffusion = 0.75;
            el.weight = 1;
            el.heat_conduct = 106;
            el.properties = P::TYPE_GAS;
        });

        self.define(E::CAUS, |el| {
            el.advection = 2.0;
            el.air_drag = 0.01 * CFDS;
            el.air_loss = 0.99;
            el.loss = 0.30;
            el.collision = -0.1;
            el.diffusion = 1.5;
            el.weight = 1;
            el.heat_conduct = 70;
            el.default_life = 75;
            el.properties = P::TYPE_GAS | P::DEADLY;
        });

        self.define(E::ACID, |el| {
            el.advection = 0.6;
            el.air_drag = 0.01 * CFDS;
            el.air_loss = 0.98;
            el.loss = 0.95;
            el.gravity = 0.1;
            el.falldown = 2;
            el.flammable = 40;
            el.hardness = 0;
            el.photon_reflect_wavelengths = 0x1FE0_01FE;
            el.weight = 10;
            el.heat_conduct = 34;
            el.default_life = 75;
            el.properties = P::TYPE_LIQUID | P::DEADLY;
        });

        self.define(E::EMBR, |el| {
            el.advection = 0.4;
            el.air_drag = 0.001 * CFDS;
            el.air_loss = 0.99;
            el.loss = 0.90;
            el.gravity = 0.07;
            el.falldown = 1;
            el.hardness = 20;
            el.weight = 30;
            el.default_temp = 773.15;
            el.heat_conduct = 29;
            el.default_life = 50;
            el.properties = P::TYPE_PART | P::LIFE_DEC | P::LIFE_KILL | P::SPARKSETTLE;
        });

        self.define(E::BOMB, |el| {
            el.advection = 0.6;
            el.air_drag = 0.01 * CFDS;
            el.air_loss = 0.98;
            el.loss = 0.95;
            el.gravity = 0.1;
            el.falldown = 1;
            el.hardness = 20;
            el.weight = 30;
            el.heat_conduct = 29;
            el.properties = P::TYPE_PART | P::SPARKSETTLE;
        });

        self.define(E::PHOT, |el| {
            energy(el);
            el.default_temp = R_TEMP + 900.0 + 273.15;
            el.heat_conduct = 251;
            el.default_life = 680;
            el.default_ctype = 0x3FFF_FFFF;
            el.properties = P::TYPE_ENERGY | P::LIFE_DEC | P::LIFE_KILL_DEC;
        });

        self.define(E::NEUT, |el| {
            energy(el);
            el.diffusion = 0.01;
            el.default_temp = R_TEMP + 4.0 + 273.15;
            el.heat_conduct = 60;
            el.properties = P::TYPE_ENERGY | P::LIFE_DEC | P::LIFE_KILL_DEC;
        });

        self.define(E::THDR, |el| {
            energy(el);
            el.default_temp = 9000.0 + 273.15;
            el.heat_conduct = 1;
            el.properties = P::TYPE_ENERGY;
        });

        self.define(E::CLNE, |el| {
            solid(el);
            el.hardness = 1;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID | P::CLONE | P::NOCTYPEDRAW;
        });

        self.define(E::BCLN, |el| {
            solid(el);
            el.air_loss = 0.97;
            el.loss = 0.50;
            el.hardness = 12;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID | P::BREAKABLECLONE | P::LIFE_DEC | P::LIFE_KILL_DEC | P::NOCTYPEDRAW;
        });

        self.define(E::PCLN, |el| {
            solid(el);
            el.hardness = 1;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID | P::CLONE | P::POWERED | P::NOCTYPEDRAW;
        });

        self.define(E::PBCN, |el| {
            solid(el);
            el.air_loss = 0.97;
            el.loss = 0.50;
            el.hardness = 12;
            el.heat_conduct = 251;
            el.properties = P::TYPE_SOLID | P::BREAKABLECLONE | P::POWERED | P::NOCTYPEDRAW;
        });

        self.define(E::SOAP, |el| {
            el.advection = 0.6;
            el.air_drag = 0.01 * CFDS;
            el.air_loss = 0.98;
            el.loss = 0.95;
            el.gravity = 0.1;
            el.falldown = 2;
            el.hardness = 20;
            el.weight = 35;
            el.default_temp = R_TEMP - 2.0 + 273.15;
            el.heat_conduct = 29;
            el.properties = P::TYPE_LIQUID | P::NEUTPENETRATE | P::LIFE_DEC;
        });

        self.define(E::FILT, |el| {
            solid(el);
            el.hardness = 1;
            el.heat_conduct = 251;
            el.default_ctype = 0x3FFF_FFFF;
            el.properties = P::TYPE_SOLID | P::NOAMBHEAT | P::LIFE_DEC;
        });

        self.define(E::INVIS, |el| {
            solid(el);
            el.hardness = 15;
            el.heat_conduct = 164;
            el.properties = P::TYPE_SOLID | P::NEUTPASS;
        });

        for id in [E::STKM, E::STKM2, E::FIGH] {
            self.define(id, |el| {
                el.advection = 0.5;
                el.air_loss = 0.2;
                el.loss = 1.0;
                el.weight = 50;
                el.heat_conduct = 0;
                el.default_life = 100;
                el.properties = P::empty();
            });
        }
    }

    /// Enable a built-in element and fill in its constants
    fn define(&mut self, id: u16, configure: impl FnOnce(&mut ElementDescriptor)) {
        let mut el = ElementDescriptor::builtin(id);
        el.enabled = true;
        configure(&mut el);
        self.register(el);
    }
}

impl Default for Elements {
    fn default() -> Self {
        Self::new()
    }
}

fn water_like(el: &mut ElementDescriptor) {
    el.advection = 0.6;
    el.air_drag = 0.01 * CFDS;
    el.air_loss = 0.98;
    el.loss = 0.95;
    el.gravity = 0.1;
    el.falldown = 2;
    el.hardness = 20;
    el.weight = 30;
    el.default_temp = R_TEMP - 2.0 + 273.15;
    el.latent = 7500;
}

fn fire_like(el: &mut ElementDescriptor) {
    el.advection = 0.9;
    el.air_drag = 0.04 * CFDS;
    el.air_loss = 0.97;
    el.loss = 0.20;
    el.gravity = -0.1;
    el.hot_air = 0.001 * CFDS;
    el.falldown = 1;
    el.hardness = 1;
    el.weight = 2;
}

fn solid(el: &mut ElementDescriptor) {
    el.air_loss = 0.90;
    el.loss = 0.0;
    el.weight = 100;
}

fn energy(el: &mut ElementDescriptor) {
    el.air_loss = 1.0;
    el.loss = 1.0;
    el.collision = -0.99;
    el.weight = -1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_follow_ids() {
        let elements = Elements::new();
        assert_eq!(elements.get(ElementId::WATR).identifier, "DEFAULT_PT_WATR");
        assert_eq!(elements.get(ElementId::LITH).identifier, "DEFAULT_PT_LITH");
        assert_eq!(elements.get(ElementId::EMBR).name, "EMBR");
        assert_eq!(elements.lookup("DEFAULT_PT_SPRK"), Some(ElementId::SPRK));
        assert_eq!(elements.lookup("DEFAULT_PT_EQUALVEL"), Some(ElementId::EQUALVEL));
        assert_eq!(elements.lookup("DEFAULT_PT_NOPE"), None);
    }

    #[test]
    fn test_unassigned_id_has_no_identifier() {
        let elements = Elements::new();
        assert!(elements.get(146).identifier.is_empty());
        assert!(!elements.is_element(146));
        assert_eq!(elements.lookup(""), None);
    }

    #[test]
    fn test_unknown_id_falls_back_to_none() {
        let elements = Elements::new();
        assert_eq!(elements.get(9999).id, ElementId::NONE);
        assert!(!elements.is_element(-1));
        assert!(elements.is_element_or_none(0));
    }

    #[test]
    fn test_water_descriptor() {
        let elements = Elements::new();
        let water = elements.get(ElementId::WATR);
        assert!(water.enabled);
        assert_eq!(water.falldown, 2);
        assert!(water.properties.is_liquid());
        assert!(water.properties.contains(Properties::CONDUCTS));
        assert_eq!(
            water.high_temperature.target,
            TransitionTarget::Element(ElementId::WTRV)
        );
        assert_eq!(water.low_temperature.threshold, 273.15);
    }

    #[test]
    fn test_defaults_mean_no_transition() {
        let el = ElementDescriptor::default();
        assert!(!el.low_pressure.is_some());
        assert!(!el.high_temperature.is_some());
        assert_eq!(el.high_pressure.threshold, IPH);
        assert_eq!(el.properties, Properties::TYPE_SOLID);
        assert_eq!(el.photon_reflect_wavelengths, 0x3FFF_FFFF);
    }

    #[test]
    fn test_disabled_builtin_still_named() {
        let elements = Elements::new();
        let goo = elements.get(ElementId::GOO);
        assert!(!goo.enabled);
        assert_eq!(goo.identifier, "DEFAULT_PT_GOO");
    }

    #[test]
    fn test_diamond_is_indestructible() {
        let elements = Elements::new();
        assert!(
            elements
                .get(ElementId::DMND)
                .properties
                .contains(Properties::INDESTRUCTIBLE)
        );
    }
}
