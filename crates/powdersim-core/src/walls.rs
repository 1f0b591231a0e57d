//! Coarse wall map and electrified wall propagation

use powdersim_simulation::{CELL, WallId, XCELLS, YCELLS};
use smallvec::SmallVec;

use crate::fields::cell_at;

/// Walls that carry current
fn conducts_current(wall: u8) -> bool {
    matches!(
        wall,
        WallId::DETECT
            | WallId::EWALL
            | WallId::ALLOWLIQUID
            | WallId::WALLELEC
            | WallId::ALLOWALLELEC
            | WallId::EHOLE
            | WallId::STASIS
    )
}

/// Wall type and electric charge per coarse cell
pub struct WallGrid {
    bmap: Vec<u8>,
    /// Charge countdown, walls count as powered while it is at least 8
    emap: Vec<u8>,
}

impl WallGrid {
    pub fn new() -> Self {
        Self {
            bmap: vec![WallId::NONE; XCELLS * YCELLS],
            emap: vec![0; XCELLS * YCELLS],
        }
    }

    /// Wall in coarse cell (cx, cy), `NONE` outside the grid
    #[inline]
    pub fn wall(&self, cx: i32, cy: i32) -> u8 {
        if cx < 0 || cy < 0 || cx >= XCELLS as i32 || cy >= YCELLS as i32 {
            return WallId::NONE;
        }
        self.bmap[cell_at(cx as usize, cy as usize)]
    }

    /// Wall under pixel (x, y)
    #[inline]
    pub fn wall_at(&self, x: i32, y: i32) -> u8 {
        self.wall(x / CELL, y / CELL)
    }

    pub fn set_wall(&mut self, cx: i32, cy: i32, wall: u8) {
        if cx >= 0 && cy >= 0 && cx < XCELLS as i32 && cy < YCELLS as i32 {
            self.bmap[cell_at(cx as usize, cy as usize)] = wall;
        }
    }

    #[inline]
    pub fn charge(&self, cx: i32, cy: i32) -> u8 {
        if cx < 0 || cy < 0 || cx >= XCELLS as i32 || cy >= YCELLS as i32 {
            return 0;
        }
        self.emap[cell_at(cx as usize, cy as usize)]
    }

    /// Charge of the cell under pixel (x, y)
    #[inline]
    pub fn charge_at(&self, x: i32, y: i32) -> u8 {
        self.charge(x / CELL, y / CELL)
    }

    pub fn set_charge(&mut self, cx: i32, cy: i32, charge: u8) {
        if cx >= 0 && cy >= 0 && cx < XCELLS as i32 && cy < YCELLS as i32 {
            self.emap[cell_at(cx as usize, cy as usize)] = charge;
        }
    }

    /// Stasis wall that has not been powered recently
    pub fn is_inactive_stasis(&self, x: i32, y: i32) -> bool {
        self.wall_at(x, y) == WallId::STASIS && self.charge_at(x, y) < 8
    }

    pub fn is_wire(&self, cx: i32, cy: i32) -> bool {
        conducts_current(self.wall(cx, cy))
    }

    /// A conducting wall that can be powered right now
    pub fn is_wire_off(&self, cx: i32, cy: i32) -> bool {
        self.is_wire(cx, cy) && self.charge(cx, cy) < 8
    }

    /// Age every charge by one tick
    pub fn decay_charges(&mut self) {
        for charge in self.emap.iter_mut() {
            *charge = charge.saturating_sub(1);
        }
    }

    /// Power a connected run of conducting walls starting at (cx, cy)
    ///
    /// Fills horizontal spans, then continues into the rows above and
    /// below. Single-cell vertical wires skip a row when they cross a
    /// horizontal wire, so crossings do not short together.
    pub fn set_emap(&mut self, cx: i32, cy: i32) {
        let width = XCELLS as i32;
        let height = YCELLS as i32;
        let mut pending: Vec<(i32, i32)> = vec![(cx, cy)];

        while let Some((x, y)) = pending.pop() {
            if !self.is_wire_off(x, y) {
                continue;
            }

            let mut x1 = x;
            let mut x2 = x;
            while x1 > 0 && self.is_wire_off(x1 - 1, y) {
                x1 -= 1;
            }
            while x2 < width - 1 && self.is_wire_off(x2 + 1, y) {
                x2 += 1;
            }
            for sx in x1..=x2 {
                self.set_charge(sx, y, 16);
            }

            let mut next: SmallVec<[(i32, i32); 16]> = SmallVec::new();

            if y > 1 && x1 == x2 && self.crossing(x1, y - 1, y - 2) {
                next.push((x1, y - 2));
            } else if y > 0 {
                for sx in x1..=x2 {
                    if self.is_wire_off(sx, y - 1)
                        && (sx == x1
                            || sx == x2
                            || y >= height - 1
                            || self.is_wire(sx - 1, y - 1)
                            || self.is_wire(sx + 1, y - 1)
                            || self.is_wire(sx - 1, y + 1)
                            || !self.is_wire(sx, y + 1)
                            || self.is_wire(sx + 1, y + 1))
                    {
                        next.push((sx, y - 1));
                    }
                }
            }

            if y < height - 2 && x1 == x2 && self.crossing(x1, y + 1, y + 2) {
                next.push((x1, y + 2));
            } else if y < height - 1 {
                for sx in x1..=x2 {
                    if self.is_wire_off(sx, y + 1)
                        && (sx == x1
                            || sx == x2
                            || y < 0
                            || self.is_wire(sx - 1, y + 1)
                            || self.is_wire(sx + 1, y + 1)
                            || self.is_wire(sx - 1, y - 1)
                            || !self.is_wire(sx, y - 1)
                            || self.is_wire(sx + 1, y - 1))
                    {
                        next.push((sx, y + 1));
                    }
                }
            }

            // Stack order: the upward children are processed first
            pending.extend(next.into_iter().rev());
        }
    }

    /// A horizontal wire row at `near` with a lone vertical wire continuing at `far`
    fn crossing(&self, x: i32, near: i32, far: i32) -> bool {
        self.is_wire(x - 1, near)
            && self.is_wire(x, near)
            && self.is_wire(x + 1, near)
            && !self.is_wire(x - 1, far)
            && self.is_wire(x, far)
            && !self.is_wire(x + 1, far)
    }

    pub fn clear(&mut self) {
        self.bmap.fill(WallId::NONE);
        self.emap.fill(0);
    }

    pub fn walls(&self) -> &[u8] {
        &self.bmap
    }
}

impl Default for WallGrid {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_is_no_wall() {
        let walls = WallGrid::new();
        assert_eq!(walls.wall(-1, 0), WallId::NONE);
        assert_eq!(walls.charge(0, YCELLS as i32), 0);
    }

    #[test]
    fn test_set_emap_fills_span() {
        let mut walls = WallGrid::new();
        for x in 2..6 {
            walls.set_wall(x, 3, WallId::WALLELEC);
        }
        walls.set_wall(7, 3, WallId::WALLELEC);
        walls.set_emap(3, 3);
        for x in 2..6 {
            assert_eq!(walls.charge(x, 3), 16);
        }
        // Gap at x = 6 stops the current
        assert_eq!(walls.charge(7, 3), 0);
    }

    #[test]
    fn test_set_emap_follows_vertical_wire() {
        let mut walls = WallGrid::new();
        for y in 1..10 {
            walls.set_wall(4, y, WallId::EWALL);
        }
        walls.set_emap(4, 5);
        for y in 1..10 {
            assert_eq!(walls.charge(4, y), 16, "row {y}");
        }
    }

    #[test]
    fn test_set_emap_ignores_charged_and_plain_walls() {
        let mut walls = WallGrid::new();
        walls.set_wall(1, 1, WallId::WALL);
        walls.set_emap(1, 1);
        assert_eq!(walls.charge(1, 1), 0);

        walls.set_wall(2, 2, WallId::WALLELEC);
        walls.set_charge(2, 2, 9);
        walls.set_emap(2, 2);
        assert_eq!(walls.charge(2, 2), 9);
    }

    #[test]
    fn test_decay_and_stasis() {
        let mut walls = WallGrid::new();
        walls.set_wall(0, 0, WallId::STASIS);
        assert!(walls.is_inactive_stasis(1, 1));
        walls.set_charge(0, 0, 8);
        assert!(!walls.is_inactive_stasis(1, 1));
        walls.decay_charges();
        assert!(walls.is_inactive_stasis(1, 1));
    }
}
