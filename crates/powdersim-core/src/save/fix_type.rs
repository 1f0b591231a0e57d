//! Element id translation for saves written by the modded client
//!
//! Mod builds appended their own elements after the official ones, so
//! every official release that added elements pushed the mod ids up. A
//! save records the official version it was made with and the mod save
//! version; together they say where the mod ids started, and later mod
//! releases folded some of those elements into official ids.
//!
//! Saves without a mod version use official ids only and are returned
//! unchanged.

use powdersim_simulation::{ElementId as E, PT_NORMAL_NUM, PT_NUM};

const NORMAL: i32 = PT_NORMAL_NUM as i32;

/// First mod element id in one era of releases
///
/// An era matches when the save was created with at least `created`
/// official version, or with one of `mods` mod save versions.
struct Era {
    created: Option<i32>,
    mods: Option<(i32, i32)>,
    first_mod_id: i32,
}

impl Era {
    const fn new(created: Option<i32>, mods: Option<(i32, i32)>, first_mod_id: i32) -> Self {
        Self {
            created,
            mods,
            first_mod_id,
        }
    }

    fn matches(&self, created: i32, mod_version: i32) -> bool {
        self.created.is_some_and(|min| created >= min)
            || self
                .mods
                .is_some_and(|(lo, hi)| (lo..=hi).contains(&mod_version))
    }
}

/// Checked in order, the first match wins
const ERAS: [Era; 8] = [
    Era::new(Some(90), None, 179),
    Era::new(Some(89), Some((16, i32::MAX)), 177),
    Era::new(Some(87), None, 173),
    Era::new(Some(86), Some((14, 14)), 170),
    Era::new(Some(84), Some((13, 13)), 167),
    Era::new(None, Some((12, 12)), 165),
    Era::new(Some(83), None, 163),
    Era::new(Some(82), None, 162),
];
const OLDEST_FIRST_MOD_ID: i32 = 161;

/// A renumbering done by the mod itself, applied to saves up to `max_mod`
struct Remap {
    max_mod: i32,
    rule: fn(i32) -> i32,
}

/// VIRS family became official and CURE turned into SOAP
fn fold_virus_and_cure(t: i32) -> i32 {
    if (NORMAL + 6..=NORMAL + 8).contains(&t) {
        E::VIRS as i32 + t - (NORMAL + 6)
    } else if t == NORMAL + 9 {
        E::SOAP as i32
    } else if t > NORMAL + 9 {
        t - 4
    } else {
        t
    }
}

/// GRVT and DRAY became official
fn fold_grvt_dray(t: i32) -> i32 {
    if (NORMAL + 12..=NORMAL + 13).contains(&t) {
        t - 14
    } else {
        t
    }
}

/// OTWR and COND were dropped in favour of METL
fn fold_otwr_cond(t: i32) -> i32 {
    if t == NORMAL + 3 || t == NORMAL + 9 {
        E::METL as i32
    } else if t > NORMAL + 3 && t < NORMAL + 9 {
        t - 1
    } else if t > NORMAL + 9 {
        t - 2
    } else {
        t
    }
}

const REMAPS: [Remap; 3] = [
    Remap {
        max_mod: 15,
        rule: fold_virus_and_cure,
    },
    Remap {
        max_mod: 19,
        rule: fold_grvt_dray,
    },
    Remap {
        max_mod: 20,
        rule: fold_otwr_cond,
    },
];

/// Translate an element id stored by a save made with the given versions
///
/// Ids outside `0..=PT_NUM` are passed through so the loader can reject them.
pub fn fix_type(t: i32, created_version: i32, mod_version: i32) -> i32 {
    if t < 0 || t > PT_NUM as i32 || mod_version == 0 {
        return t;
    }
    // Mod save version 18 stored a block of removed elements as LOLZ
    if mod_version == 18 && (190..=204).contains(&t) {
        return E::LOLZ as i32;
    }

    let first_mod_id = ERAS
        .iter()
        .find(|era| era.matches(created_version, mod_version))
        .map_or(OLDEST_FIRST_MOD_ID, |era| era.first_mod_id);
    let mut t = if t >= first_mod_id {
        t + (NORMAL - first_mod_id)
    } else {
        t
    };

    for remap in &REMAPS {
        if mod_version <= remap.max_mod {
            t = (remap.rule)(t);
        }
    }
    t
}
