//! Particle lifecycle: creation, type changes, removal and reconcile

use powdersim_simulation::{
    ElementId as E, NPART, PT_NUM, PackedCell, ParticleFlags, Properties as P, in_bounds,
    round_pos,
};

use super::Simulation;
use crate::elements::SlotHint;

impl Simulation {
    /// Insert a particle into whichever map its element lives in
    pub(crate) fn pmap_add(&mut self, i: usize, x: i32, y: i32, t: u16) {
        if !in_bounds(x, y) {
            return;
        }
        if self.elements.get(t).properties.is_energy() {
            self.map.set_photon(x, y, PackedCell::new(i, t));
        } else {
            self.map.set_pmap(x, y, PackedCell::new(i, t));
        }
    }

    /// Clear the map entry at (x, y) if it refers to particle `i`
    pub(crate) fn pmap_remove(&mut self, i: usize, x: i32, y: i32) {
        self.map.clear_pmap_if(x, y, i);
        self.map.clear_photon_if(x, y, i);
    }

    /// Create a particle with default properties
    ///
    /// Returns the slot used, or `None` when the position is rejected or the
    /// store is full. Creating SPRK sparks whatever conductor is already at
    /// the position instead of allocating.
    pub fn part_create(&mut self, hint: SlotHint, x: i32, y: i32, t: u16) -> Option<usize> {
        self.part_create_with(hint, x, y, t, -1)
    }

    /// [`Simulation::part_create`] with an extra value passed to the element's create hook
    pub fn part_create_with(
        &mut self,
        hint: SlotHint,
        x: i32,
        y: i32,
        t: u16,
        v: i32,
    ) -> Option<usize> {
        if !in_bounds(x, y) || t == 0 || t as usize >= PT_NUM || !self.elements.get(t).enabled {
            return None;
        }

        if t == E::SPRK {
            return self.spark_at(x, y);
        }

        if !self.behavior(t).create_allowed(self, hint, x, y, t) {
            return None;
        }

        let i = match hint {
            SlotHint::Auto => {
                let occupied = !self.map.pmap(x, y).is_empty();
                let rejected = if occupied {
                    self.eval_move(t, x, y) != 2
                } else {
                    self.walls.wall_at(x, y) != 0 && self.eval_move(t, x, y) == 0
                };
                if rejected {
                    return None;
                }
                self.parts.allocate()?
            }
            SlotHint::Unchecked => self.parts.allocate()?,
            SlotHint::Replace(p) => {
                if p >= self.parts.capacity() {
                    return None;
                }
                let old = self.parts[p];
                let (ox, oy) = (round_pos(old.x), round_pos(old.y));
                self.behavior(old.element)
                    .on_change_type(self, p, ox, oy, old.element, t);
                if old.element != 0 {
                    self.parts.count_removed(old.element);
                } else {
                    self.parts.claim(p);
                }
                self.pmap_remove(p, ox, oy);
                p
            }
        };

        let old_type = self.parts[i].element;
        let el = self.elements.get(t);
        let part = &mut self.parts[i];
        part.x = x as f32;
        part.y = y as f32;
        part.element = t;
        part.vx = 0.0;
        part.vy = 0.0;
        part.life = el.default_life;
        part.ctype = el.default_ctype;
        part.temp = el.default_temp;
        part.tmp = el.default_tmp;
        part.tmp2 = 0;
        part.pavg = [0.0; 2];
        part.dcolour = 0;
        part.flags = ParticleFlags::empty();

        self.behavior(t).on_create(self, i, x, y, t, v);
        self.pmap_add(i, x, y, t);
        self.behavior(t).on_change_type(self, i, x, y, old_type, t);
        self.parts.count_added(t);
        Some(i)
    }

    /// The SPRK branch of creation: spark the conductor under (x, y)
    fn spark_at(&mut self, x: i32, y: i32) -> Option<usize> {
        let cell = self.map.pmap(x, y);
        let index = cell.occupant()?;
        let ty = cell.element();
        if ty == E::WIRE {
            self.parts[index].ctype = E::DUST as i32;
            return Some(index);
        }
        if ty != E::INST && !self.elements.get(ty).properties.contains(P::CONDUCTS) {
            return None;
        }
        if self.parts[index].life != 0 {
            return None;
        }
        if ty == E::INST {
            self.spark_conductive(index, x, y);
        } else {
            self.spark_conductive_attempt(index, x, y);
        }
        Some(index)
    }

    /// Change a particle's type in place
    ///
    /// Changing to a disabled type kills the particle; indestructible
    /// particles never change.
    pub fn part_change_type(&mut self, i: usize, x: i32, y: i32, t: u16) -> bool {
        if !in_bounds(x, y) || t as usize >= PT_NUM || i >= self.parts.capacity() {
            return false;
        }
        let old = self.parts[i].element;
        if old == t {
            return true;
        }
        if !self.elements.is_element_or_none(t as i32) {
            self.part_kill(i);
            return true;
        }
        if self.elements.get(old).properties.contains(P::INDESTRUCTIBLE) {
            return false;
        }
        if !self
            .behavior(t)
            .create_allowed(self, SlotHint::Replace(i), x, y, t)
        {
            return false;
        }

        self.parts.count_removed(old);
        self.parts[i].element = t;
        self.pmap_remove(i, x, y);
        if t != 0 {
            self.pmap_add(i, x, y, t);
            self.parts.count_added(t);
        }
        self.behavior(old).on_change_type(self, i, x, y, old, t);
        self.behavior(t).on_change_type(self, i, x, y, old, t);
        true
    }

    /// Remove a particle and free its slot
    pub fn part_kill(&mut self, i: usize) {
        if i >= self.parts.capacity() {
            return;
        }
        let part = self.parts[i];
        let (x, y) = (round_pos(part.x), round_pos(part.y));
        self.behavior(part.element)
            .on_change_type(self, i, x, y, part.element, E::NONE);
        if in_bounds(x, y) {
            self.pmap_remove(i, x, y);
        }
        if part.element == E::NONE {
            return;
        }
        self.parts.count_removed(part.element);
        self.parts.release(i);
    }

    /// Delete whatever is at (x, y), photons first
    pub fn part_delete(&mut self, x: i32, y: i32) {
        if let Some(i) = self.map.photon(x, y).occupant() {
            self.part_kill(i);
        } else if let Some(i) = self.map.pmap(x, y).occupant() {
            self.part_kill(i);
        }
    }

    /// Number of live particles of one element
    pub fn element_count(&self, t: u16) -> u32 {
        self.parts.element_count(t)
    }

    /// Rebuild maps, counts and the free list from particle contents
    ///
    /// With `do_life_dec` set this also counts down `life` of `LIFE_DEC`
    /// elements and kills expired particles.
    pub fn recalc_free_particles(&mut self, do_life_dec: bool) {
        self.map.clear();
        let mut num_parts = 0;
        let last_active = self.parts.last_active().min(NPART - 1);
        let mut i = 0;
        while i <= last_active && i < self.parts.capacity() {
            let part = self.parts[i];
            if part.is_empty() {
                i += 1;
                continue;
            }
            let t = part.element;
            if t as usize >= PT_NUM {
                self.part_kill(i);
                i += 1;
                continue;
            }
            self.parts[i].flags.remove(ParticleFlags::SKIPMOVE);
            let (x, y) = (round_pos(part.x), round_pos(part.y));
            let props = self.elements.get(t).properties;
            if in_bounds(x, y) {
                if props.is_energy() {
                    self.map.set_photon(x, y, PackedCell::new(i, t));
                } else {
                    let cur = self.map.pmap(x, y);
                    if cur.is_empty() || (t != E::INVIS && t != E::FILT) {
                        self.map.set_pmap(x, y, PackedCell::new(i, t));
                    }
                    // Stacking count ignores elements meant to overlap
                    if !matches!(t, E::THDR | E::EMBR | E::FIGH | E::PLSM) {
                        self.map.increment_count(x, y);
                    }
                }
            }
            num_parts += 1;

            if do_life_dec && !self.walls.is_inactive_stasis(x, y) {
                let p = &mut self.parts[i];
                if p.life > 0 && props.contains(P::LIFE_DEC) {
                    p.life -= 1;
                    if p.life <= 0 && props.intersects(P::LIFE_KILL_DEC | P::LIFE_KILL) {
                        self.part_kill(i);
                        num_parts -= 1;
                    }
                } else if p.life <= 0 && props.contains(P::LIFE_KILL) {
                    self.part_kill(i);
                    num_parts -= 1;
                }
            }
            i += 1;
        }
        self.parts.rebuild_free(last_active);
        self.num_parts = num_parts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SimSettings;
    use powdersim_simulation::WallId;

    fn sim() -> Simulation {
        Simulation::new(SimSettings {
            seed: 7,
            ..Default::default()
        })
    }

    #[test]
    fn test_part_create_writes_defaults_and_maps() {
        let mut sim = sim();
        let i = sim.part_create(SlotHint::Auto, 100, 100, E::DUST).unwrap();
        let p = sim.parts[i];
        assert_eq!(p.element, E::DUST);
        assert_eq!(p.x, 100.0);
        assert_eq!(sim.map().pmap(100, 100), PackedCell::new(i, E::DUST));
        assert_eq!(sim.element_count(E::DUST), 1);
    }

    #[test]
    fn test_part_create_rejections() {
        let mut sim = sim();
        assert!(sim.part_create(SlotHint::Auto, -1, 5, E::DUST).is_none());
        assert!(sim.part_create(SlotHint::Auto, 5, 5, E::NONE).is_none());
        assert!(sim.part_create(SlotHint::Auto, 5, 5, E::LOVE).is_none());
        sim.part_create(SlotHint::Auto, 5, 5, E::STNE).unwrap();
        // Occupied by something that does not share cells
        assert!(sim.part_create(SlotHint::Auto, 5, 5, E::DUST).is_none());
        sim.walls.set_wall(10, 10, WallId::WALL);
        assert!(sim.part_create(SlotHint::Auto, 41, 41, E::DUST).is_none());
    }

    #[test]
    fn test_energy_goes_to_photon_map() {
        let mut sim = sim();
        let i = sim.part_create(SlotHint::Auto, 50, 50, E::PHOT).unwrap();
        assert_eq!(sim.map().photon(50, 50).occupant(), Some(i));
        assert!(sim.map().pmap(50, 50).is_empty());
    }

    #[test]
    fn test_spark_creation_sparks_conductor() {
        let mut sim = sim();
        let m = sim.part_create(SlotHint::Auto, 20, 20, E::METL).unwrap();
        assert_eq!(sim.part_create(SlotHint::Auto, 20, 20, E::SPRK), Some(m));
        assert_eq!(sim.parts[m].element, E::SPRK);
        assert_eq!(sim.parts[m].ctype, E::METL as i32);
        assert_eq!(sim.parts[m].life, 4);
        // Already sparked
        assert!(sim.part_create(SlotHint::Auto, 20, 20, E::SPRK).is_none());
        // Nothing to spark
        assert!(sim.part_create(SlotHint::Auto, 30, 30, E::SPRK).is_none());
    }

    #[test]
    fn test_replace_keeps_slot() {
        let mut sim = sim();
        let i = sim.part_create(SlotHint::Auto, 10, 10, E::DUST).unwrap();
        let j = sim.part_create(SlotHint::Replace(i), 12, 10, E::STNE).unwrap();
        assert_eq!(i, j);
        assert!(sim.map().pmap(10, 10).is_empty());
        assert_eq!(sim.map().pmap(12, 10).element(), E::STNE);
        assert_eq!(sim.element_count(E::DUST), 0);
        assert_eq!(sim.element_count(E::STNE), 1);
    }

    #[test]
    fn test_change_type_rules() {
        let mut sim = sim();
        let i = sim.part_create(SlotHint::Auto, 10, 10, E::WATR).unwrap();
        assert!(sim.part_change_type(i, 10, 10, E::WATR));
        assert!(sim.part_change_type(i, 10, 10, E::ICEI));
        assert_eq!(sim.map().pmap(10, 10).element(), E::ICEI);
        assert_eq!(sim.element_count(E::WATR), 0);
        assert_eq!(sim.element_count(E::ICEI), 1);
        assert!(!sim.part_change_type(i, -1, 10, E::WATR));

        // Disabled target kills
        assert!(sim.part_change_type(i, 10, 10, E::LOVE));
        assert!(sim.parts[i].is_empty());
        assert!(sim.map().pmap(10, 10).is_empty());
    }

    #[test]
    fn test_indestructible_does_not_change() {
        let mut sim = sim();
        let i = sim.part_create(SlotHint::Auto, 10, 10, E::DMND).unwrap();
        assert!(!sim.part_change_type(i, 10, 10, E::DUST));
        assert_eq!(sim.parts[i].element, E::DMND);
    }

    #[test]
    fn test_kill_frees_slot_for_reuse() {
        let mut sim = sim();
        let a = sim.part_create(SlotHint::Auto, 10, 10, E::DUST).unwrap();
        let b = sim.part_create(SlotHint::Auto, 11, 10, E::DUST).unwrap();
        sim.part_kill(a);
        assert!(sim.parts[a].is_empty());
        assert!(sim.map().pmap(10, 10).is_empty());
        let c = sim.part_create(SlotHint::Auto, 12, 10, E::DUST).unwrap();
        assert_eq!(a, c);
        // Killing twice is harmless
        sim.part_kill(b);
        sim.part_kill(b);
        assert_eq!(sim.element_count(E::DUST), 1);
    }

    #[test]
    fn test_part_delete_prefers_photons() {
        let mut sim = sim();
        let d = sim.part_create(SlotHint::Auto, 10, 10, E::GLAS).unwrap();
        let p = sim.part_create(SlotHint::Auto, 10, 10, E::PHOT).unwrap();
        sim.part_delete(10, 10);
        assert!(sim.parts[p].is_empty());
        assert!(!sim.parts[d].is_empty());
        sim.part_delete(10, 10);
        assert!(sim.parts[d].is_empty());
    }

    #[test]
    fn test_recalc_rebuilds_maps_and_counts() {
        let mut sim = sim();
        let a = sim.part_create(SlotHint::Auto, 10, 10, E::DUST).unwrap();
        let b = sim.part_create(SlotHint::Auto, 20, 10, E::DUST).unwrap();
        // Move a by hand, the maps are stale until reconcile
        sim.parts[a].x = 30.0;
        sim.parts[b].flags.insert(ParticleFlags::SKIPMOVE);
        sim.recalc_free_particles(false);
        assert_eq!(sim.map().pmap(30, 10).occupant(), Some(a));
        assert!(sim.map().pmap(10, 10).is_empty());
        assert_eq!(sim.map().count(30, 10), 1);
        assert!(!sim.parts[b].flags.contains(ParticleFlags::SKIPMOVE));
        assert_eq!(sim.num_parts(), 2);
        assert_eq!(sim.parts.last_active(), b);
    }

    #[test]
    fn test_recalc_is_idempotent() {
        let mut sim = sim();
        for x in 10..20 {
            sim.part_create(SlotHint::Auto, x, 10, E::STNE);
        }
        sim.recalc_free_particles(false);
        let first = sim.map().matter_map().to_vec();
        let free = sim.parts.free_count();
        sim.recalc_free_particles(false);
        assert_eq!(first, sim.map().matter_map());
        assert_eq!(free, sim.parts.free_count());
    }

    #[test]
    fn test_life_decrement_kills_expired() {
        let mut sim = sim();
        let i = sim.part_create(SlotHint::Auto, 10, 10, E::FIRE).unwrap();
        sim.parts[i].life = 1;
        sim.recalc_free_particles(true);
        assert!(sim.parts[i].is_empty());
        assert!(sim.map().pmap(10, 10).is_empty());
        assert_eq!(sim.num_parts(), 0);
    }

    #[test]
    fn test_stasis_wall_freezes_life() {
        let mut sim = sim();
        let i = sim.part_create(SlotHint::Unchecked, 10, 10, E::FIRE).unwrap();
        sim.walls.set_wall(2, 2, WallId::STASIS);
        sim.parts[i].life = 1;
        sim.recalc_free_particles(true);
        assert_eq!(sim.parts[i].life, 1);
    }
}
