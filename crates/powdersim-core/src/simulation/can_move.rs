//! Pairwise movement rules between element types

use powdersim_simulation::{ElementId as E, Elements, PT_NUM, Properties as P};

/// Swap rule when `moving` tries to enter a cell holding `dest`
///
/// 0 bounce, 1 swap, 2 share the cell, 3 decided per particle.
pub struct MoveTable {
    table: Vec<u8>,
}

/// Elements photons pass straight through
const PHOTON_PASSABLE: [u16; 22] = [
    E::GLAS,
    E::PHOT,
    E::FILT,
    E::INVIS,
    E::CLNE,
    E::PCLN,
    E::BCLN,
    E::PBCN,
    E::WATR,
    E::DSTW,
    E::SLTW,
    E::GLOW,
    E::ISOZ,
    E::ISZS,
    E::QRTZ,
    E::PQRT,
    E::H2,
    E::BGLA,
    E::C5,
    E::BIZR,
    E::BIZRG,
    E::BIZRS,
];

impl MoveTable {
    pub fn build(elements: &Elements) -> Self {
        let mut t = Self {
            table: vec![0; PT_NUM * PT_NUM],
        };
        let props = |id: usize| elements.get(id as u16).properties;
        let weight = |id: usize| elements.get(id as u16).weight;

        for moving in 1..PT_NUM {
            for dest in 0..PT_NUM {
                t.set(moving, dest, 1);
            }
        }
        for dest in 1..PT_NUM {
            t.set(E::PHOT as usize, dest, 2);
        }

        for moving in 1..PT_NUM {
            for dest in 1..PT_NUM {
                // Also keeps particles of one type from displacing each other
                if weight(moving) <= weight(dest) || dest == E::GEL as usize {
                    t.set(moving, dest, 0);
                }
                if moving == E::NEUT as usize {
                    if props(dest).contains(P::NEUTPASS) {
                        t.set(moving, dest, 2);
                    }
                    if props(dest).intersects(P::NEUTABSORB | P::NEUTPENETRATE) {
                        t.set(moving, dest, 1);
                    }
                }
                if dest == E::NEUT as usize && props(moving).contains(P::NEUTPENETRATE) {
                    t.set(moving, dest, 0);
                }
                if props(moving).is_energy() && props(dest).is_energy() {
                    t.set(moving, dest, 2);
                }
            }
        }

        for dest in 0..PT_NUM {
            let fighter_rule = if props(dest).intersects(P::TYPE_LIQUID | P::TYPE_GAS)
                || dest == 0
                || dest == E::PRTO as usize
                || dest == E::SPAWN as usize
                || dest == E::SPAWN2 as usize
            {
                2
            } else {
                0
            };
            for fighter in [E::STKM, E::STKM2, E::FIGH] {
                t.set(fighter as usize, dest, fighter_rule);
            }
            t.set(E::SPRK as usize, dest, 0);
        }

        for moving in 1..PT_NUM {
            // Holes swap with everything so they can eat it
            t.set(moving, E::BHOL as usize, 1);
            t.set(moving, E::NBHL as usize, 1);
            for fighter in [E::STKM, E::STKM2, E::FIGH] {
                t.set(moving, fighter as usize, 0);
            }
            t.set(moving, E::INVIS as usize, 3);
            t.set(moving, E::CNCT as usize, 0);
            t.set(moving, E::PVOD as usize, 3);
            t.set(moving, E::VOID as usize, 3);
            t.set(moving, E::EMBR as usize, 0);
            t.set(E::EMBR as usize, moving, 0);
            if props(moving).is_energy() {
                t.set(moving, E::VIBR as usize, 1);
                t.set(moving, E::BVBR as usize, 1);
            }
            if props(moving).contains(P::TYPE_PART) {
                t.set(moving, E::SAWD as usize, 0);
            }
        }

        for dest in PHOTON_PASSABLE {
            t.set(E::PHOT as usize, dest as usize, 2);
        }

        t.set(E::ELEC as usize, E::LCRY as usize, 2);
        t.set(E::ELEC as usize, E::EXOT as usize, 2);
        t.set(E::ELEC as usize, E::GLOW as usize, 2);
        t.set(E::PHOT as usize, E::LCRY as usize, 3);
        t.set(E::NEUT as usize, E::INVIS as usize, 2);
        t.set(E::THDR as usize, E::THDR as usize, 2);
        t.set(E::EMBR as usize, E::EMBR as usize, 2);
        t.set(E::TRON as usize, E::SWCH as usize, 3);
        t.set(E::SOAP as usize, E::OIL as usize, 0);
        t.set(E::OIL as usize, E::SOAP as usize, 1);
        t
    }

    #[inline]
    fn set(&mut self, moving: usize, dest: usize, rule: u8) {
        self.table[moving * PT_NUM + dest] = rule;
    }

    /// Rule for `moving` entering a cell occupied by `dest`
    #[inline]
    pub fn get(&self, moving: u16, dest: u16) -> u8 {
        let (m, d) = (moving as usize, dest as usize);
        if m >= PT_NUM || d >= PT_NUM {
            return 0;
        }
        self.table[m * PT_NUM + d]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MoveTable {
        MoveTable::build(&Elements::new())
    }

    #[test]
    fn test_nothing_moves_as_none() {
        let t = table();
        for dest in 0..PT_NUM as u16 {
            assert_eq!(t.get(E::NONE, dest), 0);
        }
    }

    #[test]
    fn test_heavier_swaps_with_lighter() {
        let t = table();
        // DUST is denser than WATR
        assert_eq!(t.get(E::DUST, E::WATR), 1);
        assert_eq!(t.get(E::WATR, E::DUST), 0);
        assert_eq!(t.get(E::DUST, E::DUST), 0);
        assert_eq!(t.get(E::DUST, E::NONE), 1);
    }

    #[test]
    fn test_special_cells() {
        let t = table();
        assert_eq!(t.get(E::DUST, E::VOID), 3);
        assert_eq!(t.get(E::WATR, E::INVIS), 3);
        assert_eq!(t.get(E::DUST, E::CNCT), 0);
        assert_eq!(t.get(E::DUST, E::NBHL), 1);
        assert_eq!(t.get(E::SPRK, E::NONE), 0);
        assert_eq!(t.get(E::STKM, E::WATR), 2);
        assert_eq!(t.get(E::STKM, E::STNE), 0);
        assert_eq!(t.get(E::PHOT, E::GLAS), 2);
        assert_eq!(t.get(E::PHOT, E::NEUT), 2);
        assert_eq!(t.get(E::EMBR, E::EMBR), 2);
    }

    #[test]
    fn test_out_of_range_ids_bounce() {
        let t = table();
        assert_eq!(t.get(PT_NUM as u16, E::NONE), 0);
    }
}
