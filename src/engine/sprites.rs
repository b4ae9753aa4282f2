//! Vis-sprites: things projected for this view, drawn far to near as
//! camera-facing billboards once the walls and planes are down.

use glam::{Vec3, vec2};

use crate::{
    engine::{
        lighting::{NUM_TRANSMAPS, translucency_alpha},
        split::band_light_at,
        texture_or_warn,
    },
    renderer::{BL, BR, PolyFlags, TL, TR, WallQuad, ZCLIP_PLANE},
    world::{Camera, ColormapId, Level, SectorId, TextureBank, TextureId, ThingId},
};

#[derive(Clone, Debug, PartialEq)]
pub struct VisSprite {
    pub thing: ThingId,
    pub pos: Vec3,
    /// Distance along the view direction.
    pub depth: f32,
    pub texture: TextureId,
    pub width: f32,
    pub height: f32,
    pub alpha: u8,
    pub flags: PolyFlags,
    pub flip: bool,
    pub precip: bool,
    pub light: i32,
    pub colormap: Option<ColormapId>,
}

impl VisSprite {
    /// Quad standing at the sprite's feet, facing the camera.
    pub fn billboard(&self, cam: &Camera) -> WallQuad {
        let half = cam.right() * (self.width * 0.5);
        let foot = self.pos.truncate();
        let mut q = WallQuad::on_segment(foot - half, foot + half);
        q.set_heights(
            self.pos.z,
            self.pos.z + self.height,
            self.pos.z,
            self.pos.z + self.height,
        );
        let (s0, s1) = if self.flip { (1.0, 0.0) } else { (0.0, 1.0) };
        q.set_s(s0, s1);
        q.0[TL].t = 0.0;
        q.0[TR].t = 0.0;
        q.0[BL].t = 1.0;
        q.0[BR].t = 1.0;
        q
    }
}

#[derive(Debug, Default)]
pub struct VisSprites {
    list: Vec<VisSprite>,
}

impl VisSprites {
    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Project every thing standing in `sector`. Returns how many were
    /// added.
    pub fn add_sector(
        &mut self,
        level: &Level,
        sector: SectorId,
        cam: &Camera,
        bank: &TextureBank,
    ) -> usize {
        let Some(sec) = level.sectors.get(sector as usize) else {
            return 0;
        };
        let before = self.list.len();
        let half_fov_tan = (cam.fov * 0.5).tan();

        for (id, thing) in level.things.iter().enumerate() {
            if thing.sector != sector || thing.translucency >= NUM_TRANSMAPS {
                continue;
            }
            let rel = cam.to_cam(thing.pos.truncate());
            let depth = rel.y;
            if depth < ZCLIP_PLANE {
                continue;
            }
            let tex = texture_or_warn(bank, thing.sprite);
            let width = tex.w as f32;
            let height = tex.h as f32;
            if rel.x.abs() - width * 0.5 > depth * half_fov_tan {
                continue;
            }

            let (light, colormap) = band_light_at(sec, vec2(thing.pos.x, thing.pos.y), thing.pos.z + height)
                .unwrap_or((sec.light, sec.colormap));
            let (alpha, flags) = if thing.translucency > 0 {
                (translucency_alpha(thing.translucency as i32), PolyFlags::TRANSLUCENT)
            } else {
                (255, PolyFlags::MASKED | PolyFlags::OCCLUDE)
            };

            self.list.push(VisSprite {
                thing: id as ThingId,
                pos: thing.pos,
                depth,
                texture: thing.sprite,
                width,
                height,
                alpha,
                flags,
                flip: thing.flip,
                precip: thing.precip,
                light,
                colormap,
            });
        }
        self.list.len() - before
    }

    /// Sort far to near and hand the list over, leaving this one empty.
    pub fn take_sorted(&mut self) -> Vec<VisSprite> {
        let mut list = std::mem::take(&mut self.list);
        list.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{
        Thing,
        builder::{WALL_TEX, demo_bank, single_room_level},
    };
    use glam::vec3;

    fn thing(x: f32, y: f32) -> Thing {
        Thing {
            pos: vec3(x, y, 0.0),
            sector: 0,
            sprite: WALL_TEX,
            translucency: 0,
            flip: false,
            precip: false,
        }
    }

    fn camera() -> Camera {
        Camera::new(vec3(8.0, 64.0, 41.0), 0.0, 90f32.to_radians())
    }

    #[test]
    fn sprites_sorted_far_to_near() {
        let mut level = single_room_level();
        level.things = vec![thing(40.0, 64.0), thing(120.0, 64.0), thing(80.0, 64.0)];
        let mut vs = VisSprites::default();
        assert_eq!(vs.add_sector(&level, 0, &camera(), &demo_bank()), 3);

        let order: Vec<_> = vs.take_sorted().iter().map(|s| s.thing).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!(vs.is_empty());
    }

    #[test]
    fn behind_and_invisible_things_are_skipped() {
        let mut level = single_room_level();
        let mut ghost = thing(60.0, 64.0);
        ghost.translucency = NUM_TRANSMAPS;
        level.things = vec![thing(2.0, 64.0), ghost];
        let mut vs = VisSprites::default();
        assert_eq!(vs.add_sector(&level, 0, &camera(), &demo_bank()), 0);
    }

    #[test]
    fn translucent_things_blend() {
        let mut level = single_room_level();
        let mut t = thing(60.0, 64.0);
        t.translucency = 5;
        level.things = vec![t];
        let mut vs = VisSprites::default();
        vs.add_sector(&level, 0, &camera(), &demo_bank());
        let s = &vs.take_sorted()[0];
        assert_eq!(s.flags, PolyFlags::TRANSLUCENT);
        assert_eq!(s.alpha, 128);
        assert_eq!(s.light, 255);
    }

    #[test]
    fn billboard_faces_the_camera() {
        let mut level = single_room_level();
        level.things = vec![thing(60.0, 64.0)];
        let mut vs = VisSprites::default();
        let cam = camera();
        vs.add_sector(&level, 0, &cam, &demo_bank());
        let q = vs.take_sorted()[0].billboard(&cam);
        // looking east: the quad spans north-south at x = 60
        assert_eq!(q.0[BL].x, 60.0);
        assert_eq!(q.0[BR].x, 60.0);
        assert_eq!((q.0[BL].z - q.0[BR].z).abs(), 64.0);
        assert_eq!(q.0[TL].y, 128.0);
        assert!(q.is_upright());
    }
}
