//! Moving and rotating a save before it is placed
//!
//! Particles and signs move freely in pixel space. The coarse grids can
//! only move by whole cells, so the save remembers how far it has been
//! translated and shifts the grids once the accumulated offset crosses a
//! cell boundary.

use glam::{Mat2, Vec2};
use powdersim_simulation::{CELL, WallId, XRES, YRES};

use super::Save;

/// Round half up, matching how particle positions snap to pixels
fn snap(v: f32) -> i32 {
    (v + 0.5).floor() as i32
}

impl Save {
    /// Shift the contents by `offset` pixels
    ///
    /// Grows the save by whole cells when the shift would push particles or
    /// signs off an edge, as long as it still fits the simulation area.
    /// Returns how far the save's origin moved to make that room, so the
    /// caller can keep the stamp where the user put it.
    pub fn translate(&mut self, offset: Vec2) -> Vec2 {
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (0, 0, 0, 0);
        let sign_positions = self.signs.iter().map(|s| Vec2::new(s.x as f32, s.y as f32));
        let particle_positions = self
            .particles
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| Vec2::new(p.x, p.y));
        for pos in sign_positions.chain(particle_positions) {
            let moved = pos + offset;
            let (nx, ny) = (snap(moved.x), snap(moved.y));
            min_x = min_x.min(nx);
            max_x = max_x.max(nx);
            min_y = min_y.min(ny);
            max_y = max_y.max(ny);
        }

        let back_cells = |min: i32| if min < 0 { (CELL - 1 - min) / CELL } else { 0 };
        let front_cells = |max: i32, blocks: usize| (max / CELL + 1 - blocks as i32).max(0);
        let mut back = (back_cells(min_x), back_cells(min_y));
        let mut front = (
            front_cells(max_x, self.block_width),
            front_cells(max_y, self.block_height),
        );
        if (self.block_width as i32 + back.0 + front.0) * CELL > XRES {
            back.0 = 0;
            front.0 = 0;
        }
        if (self.block_height as i32 + back.1 + front.1) * CELL > YRES {
            back.1 = 0;
            front.1 = 0;
        }

        let back = Vec2::new(back.0 as f32, back.1 as f32);
        let front = Vec2::new(front.0 as f32, front.1 as f32);
        let new_width = (self.block_width as f32 + back.x + front.x) as i32 * CELL;
        let new_height = (self.block_height as f32 + back.y + front.y) as i32 * CELL;
        self.apply_transform(
            Mat2::IDENTITY,
            offset + back * CELL as f32,
            offset,
            new_width,
            new_height,
        );
        back * -(CELL as f32) + front * CELL as f32
    }

    /// Rotate or mirror the contents with `matrix`, then shift by `translate`
    ///
    /// The save is resized to the bounding box of its transformed corners so
    /// a rotation never leaves the contents at negative coordinates.
    pub fn transform(&mut self, matrix: Mat2, translate: Vec2) {
        let width = self.full_width() as f32;
        let height = self.full_height() as f32;
        let corners = [
            Vec2::ZERO,
            Vec2::new(width - 1.0, 0.0),
            Vec2::new(0.0, height - 1.0),
            Vec2::new(width - 1.0, height - 1.0),
        ]
        .map(|c| matrix * c);
        let top_left = corners.iter().fold(corners[0], |acc, c| acc.min(*c));
        let bottom_right = corners.iter().fold(corners[0], |acc, c| acc.max(*c));

        let origin = Vec2::new(snap(top_left.x) as f32, snap(top_left.y) as f32);
        let new_width = snap(bottom_right.x) - snap(top_left.x) + 1;
        let new_height = snap(bottom_right.y) - snap(top_left.y) + 1;
        self.apply_transform(matrix, translate - origin, translate, new_width, new_height);
    }

    /// `translate` places the transformed contents; `requested` is the shift
    /// the caller asked for and only drives the cell-sized grid shifts
    fn apply_transform(
        &mut self,
        matrix: Mat2,
        translate: Vec2,
        requested: Vec2,
        new_width: i32,
        new_height: i32,
    ) {
        let new_width = new_width.min(XRES);
        let new_height = new_height.min(YRES);
        let inside = |x: i32, y: i32| x >= 0 && x < new_width && y >= 0 && y < new_height;

        self.signs.retain_mut(|sign| {
            let pos = matrix * Vec2::new(sign.x as f32, sign.y as f32) + translate;
            let (nx, ny) = (snap(pos.x), snap(pos.y));
            sign.x = nx;
            sign.y = ny;
            inside(nx, ny)
        });

        // Out-of-range particles are emptied in place so SOAP link indices stay valid
        for p in self.particles.iter_mut().filter(|p| !p.is_empty()) {
            let pos = matrix * Vec2::new(p.x, p.y) + translate;
            let (nx, ny) = (snap(pos.x), snap(pos.y));
            if !inside(nx, ny) {
                p.element = 0;
                continue;
            }
            p.x = nx as f32;
            p.y = ny as f32;
            let vel = matrix * Vec2::new(p.vx, p.vy);
            p.vx = vel.x;
            p.vy = vel.y;
        }

        let shift = Vec2::new(
            grid_shift(requested.x, self.translated.x),
            grid_shift(requested.y, self.translated.y),
        );

        let new_bw = (new_width / CELL) as usize;
        let new_bh = (new_height / CELL) as usize;
        let mut moved = Save::new(new_bw, new_bh);
        for y in 0..self.block_height {
            for x in 0..self.block_width {
                let anchor = Vec2::new(x as f32, y as f32) * CELL as f32
                    + Vec2::splat(CELL as f32 * 0.4)
                    + shift;
                let pos = matrix * anchor + translate;
                let (nx, ny) = ((pos.x / CELL as f32) as i32, (pos.y / CELL as f32) as i32);
                if pos.x < 0.0 || pos.y < 0.0 || nx >= new_bw as i32 || ny >= new_bh as i32 {
                    continue;
                }
                let from = self.block_index(x, y);
                let to = moved.block_index(nx as usize, ny as usize);
                let wall = self.walls[from];
                if wall != 0 {
                    moved.walls[to] = wall;
                    if wall == WallId::FAN {
                        let fan = matrix * Vec2::new(self.fan_vx[from], self.fan_vy[from]);
                        moved.fan_vx[to] = fan.x;
                        moved.fan_vy[to] = fan.y;
                    }
                }
                moved.pressure[to] = self.pressure[from];
                moved.vx[to] = self.vx[from];
                moved.vy[to] = self.vy[from];
                moved.ambient_heat[to] = self.ambient_heat[from];
            }
        }

        self.translated = matrix * self.translated + requested;
        self.block_width = new_bw;
        self.block_height = new_bh;
        self.walls = moved.walls;
        self.fan_vx = moved.fan_vx;
        self.fan_vy = moved.fan_vy;
        self.pressure = moved.pressure;
        self.vx = moved.vx;
        self.vy = moved.vy;
        self.ambient_heat = moved.ambient_heat;
    }
}

/// Extra pixel offset for the grids on one axis
///
/// Grids follow the particles one cell at a time, when the accumulated
/// translation is about to cross into the next cell in the direction of
/// travel.
fn grid_shift(requested: f32, translated: f32) -> f32 {
    let cell = translated as i32 % CELL;
    if requested > 0.0 && (cell == CELL - 1 || (translated < 0.0 && cell == 0)) {
        CELL as f32
    } else if requested < 0.0 && (cell == 1 - CELL || (translated > 0.0 && cell == 0)) {
        -(CELL as f32)
    } else {
        0.0
    }
}
