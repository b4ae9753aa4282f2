//! The scene engine: owns the driver and the map, walks the BSP front to
//! back and turns what it meets into driver calls.

use glam::Vec3;
use log::{debug, info};

use crate::{
    config::RenderConfig,
    engine::{
        batching::Batcher,
        drawnodes::{DrawNode, DrawNodes},
        frame::ViewWindow,
        lighting::{LightTableCache, LightingMode, resolve_lighting},
        planes::{PlanePiece, PlaneRoute, build_subsector_planes},
        split::split_wall,
        sprites::VisSprites,
        walls::{Route, SegContext, WallOptions, WallPiece, build_seg_walls},
    },
    renderer::{Driver, OutVertex, PolyFlags, ShaderKind, SurfaceInfo},
    world::{
        Camera, ColormapId, Level, SegmentId, SubsectorId, TextureBank, TextureId,
        bsp::{CHILD_MASK, SUBSECTOR_BIT},
    },
};

/// Counters for the last eye drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Polygons submitted, batched or not.
    pub draw_count: usize,
    pub walls: usize,
    pub planes: usize,
    pub sprites: usize,
    /// Polygons that went through the sorted draw-node list.
    pub deferred: usize,
    /// Draw calls the batcher turned its polygons into.
    pub batch_calls: usize,
}

pub struct Engine<D: Driver> {
    pub driver: D,
    pub level: Level,
    pub bank: TextureBank,
    pub config: RenderConfig,
    pub stats: FrameStats,
    /// Eye currently being drawn.
    pub(crate) camera: Camera,
    pub(crate) view: ViewWindow,
    pub(crate) light_tables: LightTableCache,
    pub(crate) draw_nodes: DrawNodes,
    pub(crate) batcher: Batcher,
    pub(crate) sprites: VisSprites,
    pub(crate) valid_count: u32,
    /// Per sector: the `valid_count` its things were last projected in.
    pub(crate) sector_marks: Vec<u32>,
    pub(crate) shaders_available: bool,
    pub(crate) palette_active: bool,
    /// Phase of the water / heat distortion wave.
    pub(crate) wave_phase: f64,
}

impl<D: Driver> Engine<D> {
    pub fn new(mut driver: D, level: Level, bank: TextureBank, config: RenderConfig) -> Self {
        let shaders_available = driver.init_shaders();
        let camera = Camera::new(Vec3::ZERO, 0.0, config.fov.to_radians());
        let sector_marks = vec![0; level.sectors.len()];

        let mut engine = Self {
            driver,
            level,
            bank,
            config,
            stats: FrameStats::default(),
            camera,
            view: ViewWindow::default(),
            light_tables: LightTableCache::default(),
            draw_nodes: DrawNodes::default(),
            batcher: Batcher::default(),
            sprites: VisSprites::default(),
            valid_count: 0,
            sector_marks,
            shaders_available,
            palette_active: false,
            wave_phase: 0.0,
        };
        engine.update_palette_rendering();
        engine.set_view_size();
        info!(
            "renderer ready for {}: shaders {}, palette {}",
            engine.level.name,
            engine.shaders_active(),
            engine.palette_active
        );
        engine
    }

    /// Shaders requested and supported by the driver.
    #[inline]
    pub fn shaders_active(&self) -> bool {
        self.config.shaders && self.shaders_available
    }

    #[inline]
    pub fn palette_active(&self) -> bool {
        self.palette_active
    }

    fn lighting_mode(&self) -> LightingMode {
        LightingMode {
            shaders: self.shaders_active(),
            palette: self.palette_active,
        }
    }

    /*──────────────────────── submission ────────────────────────────*/

    /// Color state for `light` under `colormap`. Alpha comes back opaque.
    pub(crate) fn shade(&mut self, light: i32, colormap: Option<ColormapId>) -> SurfaceInfo {
        let mut surf = SurfaceInfo::default();
        let mode = self.lighting_mode();
        resolve_lighting(
            &mut surf,
            light,
            self.level.colormap_entry(colormap),
            mode,
            &mut self.light_tables,
            &mut self.driver,
            self.bank.colormap().as_bytes(),
        );
        surf
    }

    /// Hand one polygon to the batcher, or straight to the driver when
    /// batching is off.
    pub(crate) fn submit(
        &mut self,
        surf: &SurfaceInfo,
        verts: &[OutVertex],
        flags: PolyFlags,
        texture: Option<TextureId>,
        shader: Option<ShaderKind>,
    ) {
        self.stats.draw_count += 1;
        if self.batcher.is_active() {
            self.batcher.add(surf, verts, flags, texture, shader);
            return;
        }
        if let Some(shader) = shader {
            self.driver.set_shader(shader);
        }
        self.driver.set_texture(texture);
        self.driver.draw_polygon(surf, verts, flags);
    }

    /// Shader for `kind` when shaders are on; marks `flags` color-mapped.
    fn pick_shader(&self, kind: ShaderKind, flags: &mut PolyFlags) -> Option<ShaderKind> {
        if !self.shaders_active() {
            return None;
        }
        *flags |= PolyFlags::COLOR_MAPPED;
        Some(kind)
    }

    /*──────────────────────── walls ─────────────────────────────────*/

    /// Light and draw an opaque wall piece.
    pub(crate) fn project_wall(&mut self, piece: &WallPiece) {
        let surf = self.shade(piece.light, piece.colormap);
        let mut flags = piece.flags;
        let shader = self.pick_shader(ShaderKind::Wall, &mut flags);
        flags |= PolyFlags::MODULATED | PolyFlags::OCCLUDE;
        self.submit(&surf, &piece.quad.0, flags, piece.texture, shader);
    }

    fn route_wall(&mut self, piece: &WallPiece) {
        match piece.route {
            Route::Direct | Route::Sky => self.project_wall(piece),
            Route::Transparent { fog } => {
                self.draw_nodes.add_wall(piece, fog);
                self.stats.deferred += 1;
            }
            Route::Split { sector, cut, fof } => {
                let pieces = split_wall(
                    &self.level,
                    sector,
                    cut,
                    fof,
                    piece,
                    self.config.fake_contrast,
                );
                for p in &pieces {
                    self.route_wall(p);
                }
            }
        }
    }

    fn render_seg(&mut self, seg_id: SegmentId) {
        let opts = WallOptions {
            fake_contrast: self.config.fake_contrast,
            shaders: self.shaders_active(),
        };
        let cam = self.camera;
        let Some(ctx) = SegContext::new(&self.level, seg_id) else {
            return;
        };

        // back face
        let c = cam.pos.truncate();
        let d = ctx.v2 - ctx.v1;
        if (c.x - ctx.v1.x) * d.y - (c.y - ctx.v1.y) * d.x < 0.0 {
            return;
        }
        // wholly behind the eye
        if cam.to_cam(ctx.v1).y < 0.0 && cam.to_cam(ctx.v2).y < 0.0 {
            return;
        }

        let pieces = build_seg_walls(&ctx, &self.bank, opts);
        self.stats.walls += pieces.len();
        for p in &pieces {
            self.route_wall(p);
        }
    }

    /*──────────────────────── planes ────────────────────────────────*/

    fn route_plane(&mut self, piece: PlanePiece) {
        match piece.route {
            PlaneRoute::Direct => {
                let mut surf = self.shade(piece.light, piece.colormap);
                surf.poly.a = piece.alpha;
                let mut flags = piece.flags | PolyFlags::OCCLUDE;
                let shader = self.pick_shader(ShaderKind::Floor, &mut flags);
                flags |= PolyFlags::MODULATED;
                self.submit(&surf, &piece.verts, flags, piece.texture, shader);
            }
            PlaneRoute::Transparent { fog } => {
                self.draw_nodes.add_plane(
                    piece.verts,
                    piece.height,
                    piece.texture,
                    piece.alpha,
                    piece.flags,
                    fog,
                    piece.light,
                    piece.colormap,
                );
                self.stats.deferred += 1;
            }
        }
    }

    /*──────────────────────── BSP walk ──────────────────────────────*/

    /// Draw the subtree under `child`, nearest subsectors first. A far
    /// child is skipped when its bounding box is outside the view.
    pub fn render_bsp_node(&mut self, child: u16) {
        if child & SUBSECTOR_BIT != 0 {
            self.render_subsector(child & CHILD_MASK);
            return;
        }

        let Some(node) = self.level.nodes.get(child as usize) else {
            return;
        };
        let side = node.point_side(self.camera.pos.truncate()) as usize;
        let near = node.child[side];
        let far = node.child[side ^ 1];
        let far_visible = node.bbox[side ^ 1].bbox_in_fov(&self.camera);

        self.render_bsp_node(near);
        if far_visible {
            self.render_bsp_node(far);
        }
    }

    fn render_subsector(&mut self, ss: SubsectorId) {
        let Some(sector) = self.level.subsectors.get(ss as usize).map(|s| s.sector) else {
            return;
        };

        let planes = build_subsector_planes(
            &self.level,
            ss,
            self.camera.pos.z,
            &self.bank,
            self.shaders_active(),
        );
        self.stats.planes += planes.len();
        for p in planes {
            self.route_plane(p);
        }

        // several subsectors share a sector; its things go in once
        if let Some(mark) = self.sector_marks.get_mut(sector as usize) {
            if *mark != self.valid_count {
                *mark = self.valid_count;
                self.sprites
                    .add_sector(&self.level, sector, &self.camera, &self.bank);
            }
        }

        for seg in self.level.segs_of_subsector(ss) {
            self.render_seg(seg);
        }
    }

    /// Start a new walk: sectors seen in an earlier one count as unseen.
    pub(crate) fn bump_valid_count(&mut self) {
        self.valid_count = self.valid_count.wrapping_add(1);
        if self.valid_count == 0 {
            self.sector_marks.fill(0);
            self.valid_count = 1;
        }
    }

    /*──────────────────────── sprites & draw nodes ──────────────────*/

    pub(crate) fn draw_sprites(&mut self) {
        let list = self.sprites.take_sorted();
        self.stats.sprites = list.len();
        for spr in &list {
            let quad = spr.billboard(&self.camera);
            let mut surf = self.shade(spr.light, spr.colormap);
            surf.poly.a = spr.alpha;
            let mut flags = spr.flags;
            let shader = self.pick_shader(ShaderKind::Sprite, &mut flags);
            flags |= PolyFlags::MODULATED;
            self.submit(&surf, &quad.0, flags, Some(spr.texture), shader);
        }
    }

    fn render_draw_node(&mut self, node: &DrawNode) {
        let mut surf = self.shade(node.light, node.colormap);
        surf.poly.a = node.alpha;

        let mut flags = node.flags;
        if flags.contains(PolyFlags::ENVIRONMENT) {
            flags |= PolyFlags::OCCLUDE;
        }
        let kind = match (node.fog, node.is_wall()) {
            (true, _) => ShaderKind::Fog,
            (false, true) => ShaderKind::Wall,
            (false, false) => ShaderKind::Floor,
        };
        let shader = self.pick_shader(kind, &mut flags);
        if node.fog {
            flags |= PolyFlags::FOG;
        }
        flags |= PolyFlags::MODULATED;
        self.submit(&surf, node.verts(), flags, node.texture, shader);
    }

    /// Replay every deferred polygon, far to near.
    pub(crate) fn draw_deferred(&mut self) {
        let eye = self.camera.pos;
        let nodes = self.draw_nodes.take_sorted(Vec3::new(eye.x, eye.z, eye.y));
        debug!("replaying {} draw nodes", nodes.len());
        for node in &nodes {
            self.render_draw_node(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::frame::{FrameInfo, PlayerView},
        renderer::{Call, Recorder},
        world::builder::{GRATE_TEX, demo_bank, single_room_level, two_room_level},
    };
    use glam::vec3;

    fn engine(level: Level, config: RenderConfig) -> Engine<Recorder> {
        Engine::new(Recorder::default(), level, demo_bank(), config)
    }

    fn view_from(pos: Vec3, yaw: f32) -> PlayerView {
        let mut v = PlayerView::new(Camera::new(pos, yaw, 90f32.to_radians()));
        v.draw_sky = false;
        v
    }

    #[test]
    fn room_draws_walls_in_front_and_both_planes() {
        let mut e = engine(single_room_level(), RenderConfig::default());
        e.render_player_view(0, &view_from(vec3(64.0, 64.0, 41.0), 0.0), &FrameInfo::default());

        // the west wall is behind the eye
        assert_eq!(e.stats.walls, 3);
        assert_eq!(e.stats.planes, 2);
        assert_eq!(e.stats.draw_count, 5);
        assert_eq!(e.stats.deferred, 0);
        assert!(e.stats.batch_calls >= 1);
        assert!(
            e.driver
                .polygons()
                .all(|(f, _, _)| f.contains(PolyFlags::MODULATED | PolyFlags::COLOR_MAPPED))
        );
    }

    #[test]
    fn unbatched_calls_bind_shader_and_texture() {
        let config = RenderConfig {
            batching: false,
            ..RenderConfig::default()
        };
        let mut e = engine(single_room_level(), config);
        e.render_player_view(0, &view_from(vec3(64.0, 64.0, 41.0), 0.0), &FrameInfo::default());

        let polys = e.driver.count(|c| matches!(c, Call::Polygon { .. }));
        assert_eq!(polys, 5);
        assert_eq!(e.driver.count(|c| matches!(c, Call::Triangles { .. })), 0);
        let walls = e.driver.count(|c| {
            matches!(
                c,
                Call::Polygon {
                    shader: Some(ShaderKind::Wall),
                    texture: Some(_),
                    ..
                }
            )
        });
        assert_eq!(walls, 3);
    }

    #[test]
    fn no_shader_calls_without_driver_support() {
        let mut e = Engine::new(
            Recorder::new(false),
            single_room_level(),
            demo_bank(),
            RenderConfig::default(),
        );
        assert!(!e.shaders_active());
        e.render_player_view(0, &view_from(vec3(64.0, 64.0, 41.0), 0.0), &FrameInfo::default());
        assert_eq!(e.driver.count(|c| matches!(c, Call::Shader(Some(_)))), 0);
        assert!(
            e.driver
                .polygons()
                .all(|(f, _, _)| !f.contains(PolyFlags::COLOR_MAPPED))
        );
    }

    #[test]
    fn near_subsector_is_drawn_first() {
        let mut e = engine(
            two_room_level(),
            RenderConfig {
                batching: false,
                ..RenderConfig::default()
            },
        );
        // in the west room looking east through the opening
        e.render_player_view(0, &view_from(vec3(32.0, 64.0, 41.0), 0.0), &FrameInfo::default());

        let lights: Vec<u8> = e
            .driver
            .polygons()
            .map(|(_, s, _)| s.light.light_level)
            .collect();
        let first_east = lights.iter().position(|&l| l < 190).unwrap();
        // fake contrast shifts walls by at most 8
        assert!(lights[..first_east].iter().all(|&l| l >= 192));
        assert!(lights[first_east..].iter().all(|&l| l <= 168));
    }

    #[test]
    fn far_room_skipped_when_looking_away() {
        let mut e = engine(two_room_level(), RenderConfig::default());
        e.render_player_view(
            0,
            &view_from(vec3(32.0, 64.0, 41.0), std::f32::consts::PI),
            &FrameInfo::default(),
        );
        // only the west room: floor, ceiling and the north, south and west walls
        assert_eq!(e.stats.planes, 2);
        assert_eq!(e.stats.walls, 3);
    }

    #[test]
    fn translucent_walls_are_drawn_once_and_last() {
        let mut level = two_room_level();
        // a half-transparent grate in the opening between the rooms
        let shared = level.linedefs[3].right_sidedef.unwrap() as usize;
        level.sidedefs[shared].middle = GRATE_TEX;
        level.linedefs[3].alpha = 0.5;
        let mut e = engine(level, RenderConfig::default());
        e.render_player_view(0, &view_from(vec3(32.0, 64.0, 41.0), 0.0), &FrameInfo::default());

        let flags: Vec<PolyFlags> = e.driver.polygons().map(|(f, _, _)| f).collect();
        let blended: Vec<usize> = flags
            .iter()
            .enumerate()
            .filter(|(_, f)| f.intersects(PolyFlags::BLENDED))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(e.stats.deferred, blended.len());
        assert!(!blended.is_empty());
        // all blended polygons trail every opaque one
        let first = blended[0];
        assert!(flags[first..].iter().all(|f| f.intersects(PolyFlags::BLENDED)));
    }

    #[test]
    fn things_project_once_per_walk() {
        let mut level = single_room_level();
        level.things.push(crate::world::Thing {
            pos: vec3(100.0, 64.0, 0.0),
            sector: 0,
            sprite: crate::world::builder::WALL_TEX,
            translucency: 0,
            flip: false,
            precip: false,
        });
        let mut e = engine(level, RenderConfig::default());
        let view = view_from(vec3(32.0, 64.0, 41.0), 0.0);
        e.render_player_view(0, &view, &FrameInfo::default());
        assert_eq!(e.stats.sprites, 1);
        e.render_player_view(0, &view, &FrameInfo::default());
        assert_eq!(e.stats.sprites, 1);
    }
}
