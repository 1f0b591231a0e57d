//! Copying rectangular regions into and out of [`Save`] values

use std::collections::BTreeSet;

use ahash::HashMap;
use powdersim_simulation::{
    CELL, ElementId as E, IDENTIFIER_PREFIX, PMAPBITS, PMAPMASK, PT_NUM, Particle, XRES, YRES,
    in_bounds, round_pos,
};

use super::Simulation;
use crate::elements::{SOAP_BACK, SOAP_FORWARD, next_fighter_number};
use crate::fields::cell_at;
use crate::save::{Save, SaveSettings, fix_type};
use crate::settings::EdgeMode;
use crate::sign::MAX_SIGNS;

/// How much of the simulation a loaded save takes over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Paste into the running simulation
    #[default]
    Merge,
    /// Clear everything first and adopt the save's settings
    Replace,
    /// As `Replace`, and the save's paused state always wins
    ReplaceAll,
}

impl LoadMode {
    fn replaces(self) -> bool {
        self != LoadMode::Merge
    }
}

/// Old type id to current type id
struct TypeMap {
    ids: Vec<i32>,
    palette: bool,
    created_version: i32,
    mod_version: i32,
}

impl TypeMap {
    fn new(sim: &Simulation, save: &Save) -> Self {
        let mut ids: Vec<i32> = (0..PT_NUM as i32).collect();
        for (identifier, old_id) in &save.palette {
            if *old_id <= 0 || *old_id >= PT_NUM as i32 {
                continue;
            }
            let found = sim
                .elements
                .lookup(identifier)
                .filter(|&t| sim.elements.get(t).enabled)
                .map_or(0, i32::from);
            // Renamed built-ins keep their number so older saves still show them
            if found != 0 || !identifier.starts_with(IDENTIFIER_PREFIX) {
                ids[*old_id as usize] = found;
            }
        }
        Self {
            ids,
            palette: !save.palette.is_empty(),
            created_version: save.created_version,
            mod_version: save.mod_created_version,
        }
    }

    /// Remap a type stored by the save
    fn map(&self, t: i32) -> i32 {
        if self.palette {
            self.raw(t)
        } else {
            fix_type(t, self.created_version, self.mod_version)
        }
    }

    /// Palette lookup only, no version fixes
    fn raw(&self, t: i32) -> i32 {
        self.ids.get(t as usize).copied().unwrap_or(t)
    }
}

impl Simulation {
    /// Copy the region `[x, x2) x [y, y2)` into a detached save
    ///
    /// The region grows outwards to whole coarse cells. Pressure, velocity
    /// and ambient heat are only copied with `include_pressure`.
    pub fn create_save(&self, x: i32, y: i32, x2: i32, y2: i32, include_pressure: bool) -> Save {
        let (x, x2) = (x.min(x2).clamp(0, XRES), x.max(x2).clamp(0, XRES));
        let (y, y2) = (y.min(y2).clamp(0, YRES), y.max(y2).clamp(0, YRES));

        let block_x = x / CELL;
        let block_y = y / CELL;
        let block_x2 = (x2 + CELL - 1) / CELL;
        let block_y2 = (y2 + CELL - 1) / CELL;
        let mut save = Save::new((block_x2 - block_x) as usize, (block_y2 - block_y) as usize);
        let (origin_x, origin_y) = ((block_x * CELL) as f32, (block_y * CELL) as f32);

        // Live index to index in the save
        let mut stored: HashMap<i32, i32> = HashMap::default();
        let mut palette = BTreeSet::new();
        let mut has_soap = false;
        for (i, p) in self.parts.iter_live() {
            let (px, py) = (round_pos(p.x), round_pos(p.y));
            if px < x || py < y || px >= x2 || py >= y2 || !self.elements.get(p.element).enabled {
                continue;
            }
            let t = p.element;
            stored.insert(i as i32, save.particles.len() as i32);
            save.push_particle(Particle {
                x: p.x - origin_x,
                y: p.y - origin_y,
                ..*p
            });
            has_soap |= t == E::SOAP;

            palette.insert(t as i32);
            if Save::type_in_ctype(t, p.ctype) {
                palette.insert(p.ctype);
            }
            if Save::type_in_tmp(t) {
                palette.insert(p.tmp & PMAPMASK as i32);
            }
            if Save::type_in_tmp2(t, p.tmp2) {
                palette.insert(p.tmp2);
            }
        }
        save.palette = palette
            .into_iter()
            .filter(|&t| t > 0)
            .map(|t| (self.elements.get(t as u16).identifier.clone(), t))
            .collect();

        if has_soap {
            for p in save.particles.iter_mut().filter(|p| p.element == E::SOAP) {
                if p.ctype & SOAP_FORWARD != 0 {
                    match stored.get(&p.tmp) {
                        Some(&n) => p.tmp = n,
                        None => {
                            p.tmp = 0;
                            p.ctype ^= SOAP_FORWARD;
                        }
                    }
                }
                if p.ctype & SOAP_BACK != 0 {
                    match stored.get(&p.tmp2) {
                        Some(&n) => p.tmp2 = n,
                        None => {
                            p.tmp2 = 0;
                            p.ctype ^= SOAP_BACK;
                        }
                    }
                }
            }
        }

        for sign in self.signs.iter().take(MAX_SIGNS) {
            if !sign.text.is_empty() && sign.is_in_area(x, y, x2, y2) {
                let mut copy = sign.clone();
                copy.x -= block_x * CELL;
                copy.y -= block_y * CELL;
                save.push_sign(copy);
            }
        }

        for by in 0..save.block_height {
            for bx in 0..save.block_width {
                let cell = cell_at(bx + block_x as usize, by + block_y as usize);
                let slot = save.block_index(bx, by);
                let wall = self.walls.walls()[cell];
                if wall != 0 {
                    save.walls[slot] = wall;
                    save.fan_vx[slot] = self.air.fvx[cell];
                    save.fan_vy[slot] = self.air.fvy[cell];
                }
                if include_pressure {
                    save.pressure[slot] = self.air.pv[cell];
                    save.vx[slot] = self.air.vx[cell];
                    save.vy[slot] = self.air.vy[cell];
                    if self.settings.aheat_enable {
                        save.ambient_heat[slot] = self.air.hv[cell];
                    }
                }
            }
        }
        save.has_pressure = include_pressure && save.block_width * save.block_height > 0;
        save.has_ambient_heat = save.has_pressure && self.settings.aheat_enable;

        let settings = &self.settings;
        save.settings = SaveSettings {
            legacy_enable: settings.legacy_enable,
            gravity_enable: settings.newtonian_gravity,
            aheat_enable: settings.aheat_enable,
            water_equal: settings.water_equal,
            paused: self.paused,
            gravity_mode: settings.gravity_mode,
            air_mode: settings.air_mode,
            edge_mode: settings.edge_mode.as_i32(),
            ambient_air_temp: Some(settings.ambient_air_temp),
            msrotation: Some(settings.msrotation),
            ..SaveSettings::default()
        };
        save.pmapbits = PMAPBITS as i32;
        save
    }

    /// Place a save with its top-left corner near pixel (x, y)
    ///
    /// The position snaps to the nearest coarse cell. Particles landing on
    /// an occupied pixel replace what is there. Returns false when the
    /// store filled up before every particle was placed; the rest of the
    /// save (signs, walls, air) is still applied.
    pub fn load_save(&mut self, x: i32, y: i32, save: &Save, mode: LoadMode, include_pressure: bool) -> bool {
        let block_x = (x + CELL / 2) / CELL;
        let block_y = (y + CELL / 2) / CELL;
        let (load_x, load_y) = (block_x * CELL, block_y * CELL);
        let save_mask = (1i64 << save.pmapbits.clamp(0, 31)) - 1;

        if mode.replaces() {
            self.clear_sim();
            self.erase_border_frame();
        }

        let types = TypeMap::new(self, save);
        let mut complete = true;
        // Index in the save to index in the simulation
        let mut soap: HashMap<i32, i32> = HashMap::default();

        for (n, stored) in save.particles.iter().enumerate() {
            let mut part = *stored;
            part.x += load_x as f32;
            part.y += load_y as f32;
            let (px, py) = (round_pos(part.x), round_pos(part.y));
            if !in_bounds(px, py) || part.element as usize >= PT_NUM {
                continue;
            }

            let t = types.map(part.element as i32);
            if t <= 0 || t >= PT_NUM as i32 {
                continue;
            }
            let t = t as u16;
            part.element = t;

            let single = matches!(t, E::STKM | E::STKM2 | E::SPAWN | E::SPAWN2);
            if single && self.element_count(t) > 0 {
                continue;
            }
            if t == E::FIGH && next_fighter_number(self).is_none() {
                continue;
            }
            if !self.elements.get(t).enabled {
                continue;
            }

            if matches!(t, E::CRAY | E::DRAY | E::CONV) {
                // Type in the low bits, extra data above
                let ctype = (part.ctype as i64 & save_mask) as i32;
                let extra = (part.ctype as i64 >> save.pmapbits.clamp(0, 31)) as i32;
                let ctype = if (0..PT_NUM as i32).contains(&ctype) {
                    types.raw(ctype)
                } else {
                    ctype
                };
                part.ctype = (extra << PMAPBITS) | (ctype & PMAPMASK as i32);
            } else if part.ctype > 0 && Save::type_in_ctype(t, part.ctype) {
                part.ctype = types.map(part.ctype);
            }
            if Save::type_in_tmp(t) {
                let tmp = (part.tmp as i64 & save_mask) as i32;
                let extra = (part.tmp as i64 >> save.pmapbits.clamp(0, 31)) as i32;
                let tmp = types.map(tmp & PMAPMASK as i32);
                part.tmp = (extra << PMAPBITS) | (tmp & PMAPMASK as i32);
            }
            if Save::type_in_tmp2(t, part.tmp2) && part.tmp2 > 0 {
                part.tmp2 = types.map(part.tmp2);
            }

            let existing = self.map.pmap(px, py).occupant().or(self.map.photon(px, py).occupant());
            let i = match existing {
                Some(ri) => {
                    let old = self.parts[ri].element;
                    self.parts.count_removed(old);
                    ri
                }
                None => match self.parts.allocate() {
                    Some(i) => i,
                    None => {
                        complete = false;
                        break;
                    }
                },
            };
            self.parts[i] = part;
            self.parts.count_added(t);

            match t {
                E::FIGH => {
                    // Fighters are renumbered, the save's numbers may be taken
                    self.parts[i].tmp = -1;
                    self.parts[i].tmp = next_fighter_number(self).unwrap_or(-1);
                }
                E::SOAP => {
                    soap.insert(n as i32, i as i32);
                }
                // pavg holds pressure history only when pressure came along
                E::QRTZ | E::GLAS | E::TUNG if !include_pressure => {
                    self.parts[i].pavg = [0.0; 2];
                }
                _ => {}
            }
        }

        // Links to soap that did not make it are left alone
        for &i in soap.values() {
            let p = &mut self.parts[i as usize];
            if p.ctype & SOAP_FORWARD != 0
                && let Some(&n) = soap.get(&p.tmp)
            {
                p.tmp = n;
            }
            if p.ctype & SOAP_BACK != 0
                && let Some(&n) = soap.get(&p.tmp2)
            {
                p.tmp2 = n;
            }
        }

        for sign in &save.signs {
            if self.signs.len() >= MAX_SIGNS {
                break;
            }
            if sign.text.is_empty() {
                continue;
            }
            let mut placed = sign.clone();
            placed.x += load_x;
            placed.y += load_y;
            if in_bounds(placed.x, placed.y) {
                self.signs.push(placed);
            }
        }

        for by in 0..save.block_height {
            for bx in 0..save.block_width {
                let (cx, cy) = (bx as i32 + block_x, by as i32 + block_y);
                if !in_bounds(cx * CELL, cy * CELL) {
                    continue;
                }
                let cell = cell_at(cx as usize, cy as usize);
                let slot = save.block_index(bx, by);
                if save.walls[slot] != 0 {
                    self.walls.set_wall(cx, cy, save.walls[slot]);
                    self.air.fvx[cell] = save.fan_vx[slot];
                    self.air.fvy[cell] = save.fan_vy[slot];
                }
                if include_pressure {
                    if save.has_pressure {
                        self.air.pv[cell] = save.pressure[slot];
                        self.air.vx[cell] = save.vx[slot];
                        self.air.vy[cell] = save.vy[slot];
                    }
                    if save.has_ambient_heat {
                        self.air.hv[cell] = save.ambient_heat[slot];
                    }
                }
            }
        }

        self.force_stacking_check();
        self.recalc_free_particles(false);

        let incoming = &save.settings;
        if incoming.paused {
            self.paused = true;
        }
        if mode.replaces() {
            let settings = &mut self.settings;
            settings.legacy_enable = incoming.legacy_enable;
            settings.aheat_enable = incoming.aheat_enable;
            settings.water_equal = incoming.water_equal;
            settings.air_mode = incoming.air_mode;
            settings.gravity_mode = incoming.gravity_mode;
            settings.newtonian_gravity = incoming.gravity_enable;
            if let Some(temp) = incoming.ambient_air_temp {
                settings.ambient_air_temp = temp;
            }
            if let Some(rotation) = incoming.msrotation {
                settings.msrotation = rotation;
            }
            if !self.paused || mode == LoadMode::ReplaceAll {
                self.paused = incoming.paused;
            }
            self.set_edge_mode(EdgeMode::from_i32(incoming.edge_mode));
        }

        for message in &save.log_messages {
            log::info!("{message}");
        }
        log::debug!(
            "loaded {} particles at ({load_x}, {load_y}), {} live",
            save.particles.len(),
            self.num_parts()
        );
        complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{SOAP_BUBBLE, SlotHint};
    use crate::settings::SimSettings;
    use crate::sign::{Justification, Sign};
    use crate::store::ParticleStore;
    use powdersim_simulation::WallId;

    fn sim() -> Simulation {
        Simulation::new(SimSettings {
            seed: 7,
            ..Default::default()
        })
    }

    #[test]
    fn test_create_save_aligns_to_cells() {
        let mut sim = sim();
        sim.part_create(SlotHint::Auto, 13, 22, E::DUST).unwrap();
        sim.part_create(SlotHint::Auto, 60, 60, E::DUST).unwrap();
        let save = sim.create_save(30, 30, 10, 10, false);
        assert_eq!((save.block_width, save.block_height), (6, 6));
        assert_eq!(save.particles.len(), 1);
        // Cell-aligned origin is (8, 8)
        assert_eq!((save.particles[0].x, save.particles[0].y), (5.0, 14.0));
        assert_eq!(save.palette, vec![("DEFAULT_PT_DUST".to_string(), E::DUST as i32)]);
        assert!(!save.has_pressure);
    }

    #[test]
    fn test_save_and_load_elsewhere() {
        let mut sim = sim();
        let c = sim
            .part_create_with(SlotHint::Auto, 12, 12, E::CLNE, E::WATR as i32)
            .unwrap();
        sim.parts[c].ctype = E::WATR as i32;
        sim.walls.set_wall(3, 3, WallId::WALL);
        sim.signs.push(Sign::new("hi", 14, 14, Justification::Left));
        let save = sim.create_save(8, 8, 20, 20, false);

        let mut other = self::sim();
        assert!(other.load_save(101, 99, &save, LoadMode::Merge, false));
        // 101 and 99 snap to 100
        let cell = other.map().pmap(104, 104);
        assert_eq!(cell.element(), E::CLNE);
        assert_eq!(other.parts[cell.index()].ctype, E::WATR as i32);
        assert_eq!(other.walls.wall(26, 26), WallId::WALL);
        assert_eq!((other.signs[0].x, other.signs[0].y), (106, 106));
        assert_eq!(other.element_count(E::CLNE), 1);
    }

    #[test]
    fn test_palette_remaps_types() {
        let mut save = Save::new(4, 4);
        save.palette = vec![
            ("DEFAULT_PT_WATR".to_string(), 200),
            ("MOD_PT_GONE".to_string(), 201),
            ("DEFAULT_PT_RENAMED".to_string(), E::OIL as i32),
        ];
        save.push_particle(Particle::new(200, 1.0, 1.0));
        save.push_particle(Particle::new(201, 2.0, 1.0));
        save.push_particle(Particle::new(E::OIL, 3.0, 1.0));

        let mut sim = sim();
        sim.load_save(0, 0, &save, LoadMode::Merge, false);
        assert_eq!(sim.map().pmap(1, 1).element(), E::WATR);
        // Unknown custom elements vanish
        assert!(sim.map().pmap(2, 1).is_empty());
        // Unknown built-ins keep their number
        assert_eq!(sim.map().pmap(3, 1).element(), E::OIL);
    }

    #[test]
    fn test_merge_replaces_occupant_and_keeps_single_stickman() {
        let mut sim = sim();
        let d = sim.part_create(SlotHint::Auto, 5, 5, E::DUST).unwrap();
        sim.part_create(SlotHint::Auto, 40, 40, E::STKM).unwrap();
        let mut save = Save::new(4, 4);
        save.push_particle(Particle::new(E::STNE, 5.0, 5.0));
        save.push_particle(Particle::new(E::STKM, 8.0, 8.0));
        sim.load_save(0, 0, &save, LoadMode::Merge, false);

        assert_eq!(sim.parts[d].element, E::STNE);
        assert_eq!(sim.element_count(E::DUST), 0);
        assert_eq!(sim.element_count(E::STKM), 1);
        assert!(sim.map().pmap(8, 8).is_empty());
    }

    #[test]
    fn test_fighters_are_renumbered() {
        let mut sim = sim();
        let f = sim.part_create(SlotHint::Auto, 50, 50, E::FIGH).unwrap();
        assert_eq!(sim.parts[f].tmp, 0);
        let mut save = Save::new(2, 2);
        let mut fighter = Particle::new(E::FIGH, 1.0, 1.0);
        fighter.tmp = 0;
        save.push_particle(fighter);
        sim.load_save(0, 0, &save, LoadMode::Merge, false);
        let loaded = sim.map().pmap(1, 1).index();
        assert_eq!(sim.parts[loaded].tmp, 1);
    }

    #[test]
    fn test_soap_links_survive_the_round_trip() {
        let mut sim = sim();
        let a = sim.part_create(SlotHint::Auto, 10, 10, E::SOAP).unwrap();
        let b = sim.part_create(SlotHint::Auto, 11, 10, E::SOAP).unwrap();
        let outside = sim.part_create(SlotHint::Auto, 30, 10, E::SOAP).unwrap();
        for i in [a, b, outside] {
            sim.parts[i].ctype = SOAP_BUBBLE;
        }
        sim.parts[a].ctype |= SOAP_FORWARD;
        sim.parts[a].tmp = b as i32;
        sim.parts[b].ctype |= SOAP_BACK | SOAP_FORWARD;
        sim.parts[b].tmp2 = a as i32;
        sim.parts[b].tmp = outside as i32;

        let save = sim.create_save(8, 8, 16, 16, false);
        assert_eq!(save.particles.len(), 2);
        let (sa, sb) = (&save.particles[0], &save.particles[1]);
        assert_eq!(sa.tmp, 1);
        assert_eq!(sb.tmp2, 0);
        // The link leaving the region is cut
        assert_eq!(sb.ctype, SOAP_BUBBLE | SOAP_BACK);

        let mut other = self::sim();
        other.part_create(SlotHint::Auto, 200, 200, E::DUST).unwrap();
        other.load_save(40, 40, &save, LoadMode::Merge, false);
        let la = other.map().pmap(42, 42).index();
        let lb = other.map().pmap(43, 42).index();
        assert_eq!(other.parts[la].tmp, lb as i32);
        assert_eq!(other.parts[lb].tmp2, la as i32);
    }

    #[test]
    fn test_pressure_only_when_requested() {
        let mut sim = sim();
        sim.air.pv[cell_at(2, 2)] = 3.0;
        sim.part_create(SlotHint::Auto, 9, 9, E::QRTZ).unwrap();
        let q = sim.map().pmap(9, 9).index();
        sim.parts[q].pavg = [1.0, 2.0];
        let with = sim.create_save(0, 0, 16, 16, true);
        assert!(with.has_pressure);
        assert!(!with.has_ambient_heat);
        assert_eq!(with.pressure[with.block_index(2, 2)], 3.0);

        let mut other = self::sim();
        other.load_save(0, 0, &with, LoadMode::Merge, false);
        assert_eq!(other.air.pv[cell_at(2, 2)], 0.0);
        assert_eq!(other.parts[other.map().pmap(9, 9).index()].pavg, [0.0; 2]);
        other.load_save(0, 0, &with, LoadMode::Merge, true);
        assert_eq!(other.air.pv[cell_at(2, 2)], 3.0);
    }

    #[test]
    fn test_replace_clears_and_adopts_settings() {
        let mut sim = sim();
        sim.part_create(SlotHint::Auto, 100, 100, E::DUST).unwrap();
        let mut save = Save::new(2, 2);
        save.settings.legacy_enable = true;
        save.settings.edge_mode = 1;
        save.settings.paused = true;
        save.push_particle(Particle::new(E::WATR, 1.0, 1.0));

        sim.load_save(0, 0, &save, LoadMode::Replace, false);
        assert_eq!(sim.element_count(E::DUST), 0);
        assert_eq!(sim.element_count(E::WATR), 1);
        assert!(sim.settings.legacy_enable);
        assert_eq!(sim.settings.edge_mode, EdgeMode::Solid);
        assert!(sim.paused);

        // Merging leaves settings alone
        let mut calm = Save::new(2, 2);
        calm.settings.legacy_enable = false;
        sim.load_save(0, 0, &calm, LoadMode::Merge, false);
        assert!(sim.settings.legacy_enable);
    }

    #[test]
    fn test_full_store_reports_incomplete_load() {
        let mut sim = sim();
        sim.parts = ParticleStore::with_capacity(2);
        let mut save = Save::new(4, 4);
        for x in 0..3 {
            save.push_particle(Particle::new(E::STNE, x as f32 + 1.0, 1.0));
        }
        assert!(!sim.load_save(0, 0, &save, LoadMode::Merge, false));
        assert_eq!(sim.element_count(E::STNE), 2);
    }
}
