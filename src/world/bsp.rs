use crate::world::camera::Camera;
use crate::world::geometry::{Aabb, Level, Node, SubsectorId};
use glam::Vec2;

pub const CHILD_MASK: u16 = 0x7FFF;

pub const SUBSECTOR_BIT: u16 = 0x8000;

// ──────────────────────────────────────────────────────────────────────────
//                       Level – public helpers
// ──────────────────────────────────────────────────────────────────────────
impl Level {
    /// Child reference of the BSP root. A node-less map is a single
    /// subsector leaf.
    #[inline(always)]
    pub fn bsp_root(&self) -> u16 {
        if self.nodes.is_empty() {
            SUBSECTOR_BIT
        } else {
            (self.nodes.len() - 1) as u16
        }
    }

    /// Walk the BSP and return the subsector id containing `p`.
    pub fn locate_subsector(&self, p: Vec2) -> SubsectorId {
        let mut idx = self.bsp_root();
        loop {
            if idx & SUBSECTOR_BIT != 0 {
                return idx & CHILD_MASK;
            }
            let node = &self.nodes[idx as usize];
            idx = node.child[node.point_side(p) as usize];
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────
//                       Node geometry helpers
// ──────────────────────────────────────────────────────────────────────────
impl Node {
    /// 0 = *front* of splitter, 1 = *back*.
    #[inline(always)]
    pub fn point_side(&self, p: Vec2) -> i32 {
        let d = (p.x - self.x) * self.dy - (p.y - self.y) * self.dx;
        if d >= 0.0 { 0 } else { 1 }
    }
}

// ──────────────────────────────────────────────────────────────────────────
//                       Aabb geometry helpers
// ──────────────────────────────────────────────────────────────────────────
impl Aabb {
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn bbox_in_fov(&self, cam: &Camera) -> bool {
        use std::f32::consts::PI;

        // Looking steeply up or down widens the effective horizontal FoV.
        let half_fov = (cam.fov * 0.5 / cam.aiming.cos().max(0.25)).min(PI);

        // Fast accept when camera inside bbox
        if self.contains(cam.pos.truncate()) {
            return true;
        }

        // 1. collect the four corner angles (wrapped to [-π, π])
        let rel = [
            Vec2::new(self.min.x - cam.pos.x, self.min.y - cam.pos.y),
            Vec2::new(self.max.x - cam.pos.x, self.min.y - cam.pos.y),
            Vec2::new(self.min.x - cam.pos.x, self.max.y - cam.pos.y),
            Vec2::new(self.max.x - cam.pos.x, self.max.y - cam.pos.y),
        ];

        let mut left = PI;
        let mut right = -PI;
        // closest-to-zero angles on each side, for the seam case
        let mut min_pos = PI;
        let mut max_neg = -PI;
        for v in &rel {
            let mut a = v.y.atan2(v.x) - cam.yaw;
            if a > PI {
                a -= 2.0 * PI;
            }
            if a < -PI {
                a += 2.0 * PI;
            }
            left = left.min(a);
            right = right.max(a);
            if a >= 0.0 {
                min_pos = min_pos.min(a);
            } else {
                max_neg = max_neg.max(a);
            }
        }

        let span = right - left;
        if span > PI {
            // Wedge crosses the ±π seam: it covers [min_pos, π] ∪ [-π, max_neg].
            return min_pos <= half_fov || max_neg >= -half_fov;
        }

        // Normal case: does [left,right] overlap [-half_fov, +half_fov] ?
        right >= -half_fov && left <= half_fov
    }
}

// ──────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::builder::two_room_level;
    use glam::{vec2, vec3};
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn point_side_matches_bbox() {
        let lvl = two_room_level();
        let root = &lvl.nodes[lvl.bsp_root() as usize];

        for side in 0..=1 {
            let bb = &root.bbox[side];
            let mid = (bb.min + bb.max) * 0.5;
            assert_eq!(root.point_side(mid), side as i32);
        }
    }

    #[test]
    fn locate_finds_each_room() {
        let lvl = two_room_level();
        let a = lvl.locate_subsector(vec2(64.0, 64.0));
        let b = lvl.locate_subsector(vec2(192.0, 64.0));
        assert_ne!(a, b);
        assert_eq!(lvl.subsectors[a as usize].sector, 0);
        assert_eq!(lvl.subsectors[b as usize].sector, 1);
    }

    #[test]
    fn nodeless_level_is_one_leaf() {
        let lvl = Level::default();
        assert_eq!(lvl.bsp_root(), SUBSECTOR_BIT);
        assert_eq!(lvl.locate_subsector(vec2(1.0, 1.0)), 0);
    }

    #[test]
    fn box_behind_camera_is_rejected() {
        let bb = Aabb {
            min: vec2(-200.0, -10.0),
            max: vec2(-100.0, 10.0),
        };
        let ahead = Camera::new(vec3(0.0, 0.0, 41.0), 0.0, FRAC_PI_2);
        let behind = Camera::new(vec3(0.0, 0.0, 41.0), PI, FRAC_PI_2);
        assert!(!bb.bbox_in_fov(&ahead));
        assert!(bb.bbox_in_fov(&behind));
    }
}
