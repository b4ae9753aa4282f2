//! One frame, one eye at a time.
//!
//! [`Engine::render_player_view`] runs the whole pipeline for a player:
//! optional skybox pass, sky background, BSP walk, sprites, deferred
//! translucency and the post-processor. Whatever happens in between, the
//! driver leaves it with the identity transform, no shader and the full
//! screen clip rectangle.

use std::ops::{Deref, DerefMut};

use log::{debug, info};

use crate::{
    config::Shearing,
    engine::Engine,
    error::RenderError,
    renderer::{
        ClipRect, Driver, DriverExt, OutVertex, PolyFlags, ShaderInfo, ShaderKind, SpecialState,
        SurfaceInfo, Transform, WallQuad, ZCLIP_PLANE,
    },
    world::{Camera, NO_TEXTURE},
};

/// Reference resolution sprite scales are measured against.
const BASE_VID_WIDTH: f32 = 320.0;
const BASE_VID_HEIGHT: f32 = 200.0;

/// Full-screen effect applied after the 3D view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PostImage {
    #[default]
    None,
    Water,
    Heat,
    /// Upside-down view, handled by the projection.
    Flip,
}

/// Palette flash overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flash {
    Normal,
    /// Pinkish nuke flash.
    Nuke,
}

/// What one player sees this frame.
#[derive(Clone, Copy, Debug)]
pub struct PlayerView {
    pub camera: Camera,
    /// Skybox viewpoint, if the map has one.
    pub skybox: Option<Camera>,
    /// Some sky is in view.
    pub draw_sky: bool,
    pub post_image: PostImage,
    pub flash: Option<Flash>,
}

impl PlayerView {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            skybox: None,
            draw_sky: true,
            post_image: PostImage::None,
            flash: None,
        }
    }
}

/// Game state the frame depends on.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInfo {
    pub level_time: u32,
    pub intermission: bool,
    pub paused: bool,
}

/// Placement of the 3D view on screen, recomputed by
/// [`Engine::set_view_size`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewWindow {
    pub width: f32,
    pub height: f32,
    pub x: f32,
    /// Top of the first eye's view.
    pub y: f32,
    pub center_x: f32,
    pub center_y: f32,
    pub window_center_x: f32,
    pub window_center_y: f32,
    pub psprite_scale_x: f32,
    pub psprite_scale_y: f32,
}

/*──────────────────────── state guard ───────────────────────────────*/

/// Borrows the engine for one pass and puts the driver back into its 2D
/// state when dropped, early returns included.
struct PassGuard<'a, D: Driver> {
    engine: &'a mut Engine<D>,
}

impl<D: Driver> Deref for PassGuard<'_, D> {
    type Target = Engine<D>;
    fn deref(&self) -> &Engine<D> {
        self.engine
    }
}

impl<D: Driver> DerefMut for PassGuard<'_, D> {
    fn deref_mut(&mut self) -> &mut Engine<D> {
        self.engine
    }
}

impl<D: Driver> Drop for PassGuard<'_, D> {
    fn drop(&mut self) {
        let (w, h) = (self.engine.config.width, self.engine.config.height);
        self.engine.driver.reset_state(w, h);
    }
}

/*──────────────────────── frame entry points ────────────────────────*/

impl<D: Driver> Engine<D> {
    /// Render every eye of this frame: one, or two stacked in splitscreen.
    pub fn render_frame(&mut self, views: &[PlayerView], frame: &FrameInfo) {
        let eyes = if self.config.splitscreen { 2 } else { 1 };
        for (eye, view) in views.iter().take(eyes).enumerate() {
            self.render_player_view(eye, view, frame);
        }
    }

    /// Draw the 3D view of `eye` (0 = top / only, 1 = bottom in
    /// splitscreen).
    pub fn render_player_view(&mut self, eye: usize, view: &PlayerView, frame: &FrameInfo) {
        if self.shaders_active() {
            self.driver
                .set_shader_info(ShaderInfo::LevelTime(frame.level_time));
        }
        if eye == 0 {
            self.driver.clear_buffer(Some([0.0, 0.0, 0.0, 1.0]), false);
        }

        let skybox = view
            .skybox
            .filter(|_| view.draw_sky && self.config.skybox);
        if let Some(sky_cam) = skybox {
            self.render_pass(eye, &sky_cam, view, frame, Pass::Skybox);
        }
        let pass = if skybox.is_some() {
            Pass::MainOverSkybox
        } else {
            Pass::Main
        };
        self.render_pass(eye, &view.camera, view, frame, pass);
    }

    fn render_pass(
        &mut self,
        eye: usize,
        cam: &Camera,
        view: &PlayerView,
        frame: &FrameInfo,
        pass: Pass,
    ) {
        let mut guard = PassGuard { engine: self };
        let e: &mut Engine<D> = &mut guard;

        e.camera = *cam;
        e.camera.fov = e.config.fov.to_radians();
        let transform = e.view_transform(view.post_image == PostImage::Flip);

        let y = e.view.y + if eye == 1 { e.config.height as f32 / 2.0 } else { 0.0 };
        e.driver.set_clip_rect(ClipRect {
            x1: e.view.x as i32,
            y1: y as i32,
            x2: (e.view.x + e.view.width) as i32,
            y2: (y + e.view.height) as i32,
            near: ZCLIP_PLANE,
        });
        e.driver.clear_buffer(None, true);

        if view.draw_sky && pass != Pass::MainOverSkybox {
            e.draw_sky_background();
        }

        e.sprites.clear();
        e.stats = Default::default();
        e.driver.set_transform(Some(&transform));
        e.driver
            .set_special_state(SpecialState::Shaders(e.shaders_active()));
        e.bump_valid_count();

        if e.config.batching {
            e.batcher.start();
        }
        let root = e.level.bsp_root();
        e.render_bsp_node(root);
        if e.batcher.is_active() {
            let batched = e.batcher.flush(&mut e.driver);
            e.stats.batch_calls = batched.draw_calls;
        }

        e.draw_sprites();
        e.draw_deferred();

        e.driver.set_transform(None);
        e.driver.unset_shader();
        if pass != Pass::Skybox {
            e.post_process(eye, view, frame);
        }
        debug!("eye {eye} {pass:?}: {:?}", e.stats);
    }

    fn view_transform(&self, flip: bool) -> Transform {
        let cam = &self.camera;
        let shear = match self.config.shearing {
            Shearing::On => true,
            Shearing::ThirdPerson => cam.third_person,
            Shearing::Off => false,
        };
        let mut t = Transform {
            x: cam.pos.x,
            y: cam.pos.y,
            z: cam.pos.z,
            angle_y: cam.yaw_degrees(),
            fov_x: self.config.fov,
            fov_y: self.config.fov,
            scale_x: 1.0,
            scale_y: self.config.width as f32 / self.config.height.max(1) as f32,
            scale_z: 1.0,
            roll: cam.roll != 0.0,
            roll_angle: cam.roll.to_degrees(),
            flip,
            splitscreen: self.config.splitscreen,
            ..Default::default()
        };
        if shear {
            t.shearing = true;
            t.view_aiming = cam.aiming_dy();
            t.angle_x = 0.0;
        } else {
            t.angle_x = cam.aiming.to_degrees();
        }
        t
    }

    /// Sky texture behind the whole view, scrolled with the yaw.
    fn draw_sky_background(&mut self) {
        let sky = self.level.sky_texture;
        if sky == NO_TEXTURE {
            return;
        }
        let tw = super::texture_or_warn(&self.bank, sky).w.max(1) as f32;

        // four screen widths per turn at 256 texels
        let s_off = self.camera.yaw_degrees() / (90.0 * tw / 256.0);
        let (s0, s1) = (-s_off, -s_off + 1.0);
        let corner = |x: f32, y: f32, s: f32, t: f32| OutVertex { x, y, z: 1.0, s, t };
        let quad = WallQuad([
            corner(-1.0, -1.0, s0, 1.0),
            corner(1.0, -1.0, s1, 1.0),
            corner(1.0, 1.0, s1, 0.0),
            corner(-1.0, 1.0, s0, 0.0),
        ]);

        let shaders = self.shaders_active();
        if shaders {
            self.driver.set_shader(ShaderKind::Sky);
        }
        self.driver.set_texture(Some(sky));
        self.driver
            .draw_quad(&SurfaceInfo::opaque(), &quad, PolyFlags::empty());
        if shaders {
            self.driver.unset_shader();
        }
    }

    /*──────────────────────── setup ─────────────────────────────────*/

    /// Recompute the view window for the current resolution and layout.
    pub fn set_view_size(&mut self) {
        let (vid_w, vid_h) = (self.config.width as f32, self.config.height as f32);
        let width = vid_w;
        let height = if self.config.splitscreen { vid_h / 2.0 } else { vid_h };

        let full_width = (width - vid_w).abs() < f32::EPSILON;
        let (y, window_center_y) = if full_width {
            (0.0, height / 2.0)
        } else {
            ((vid_h - height) / 2.0, vid_h / 2.0)
        };
        let psprite_scale_x = width / BASE_VID_WIDTH;
        self.view = ViewWindow {
            width,
            height,
            x: (vid_w - width) / 2.0,
            y,
            center_x: width / 2.0,
            center_y: height / 2.0,
            window_center_x: vid_w / 2.0,
            window_center_y,
            psprite_scale_x,
            psprite_scale_y: (vid_h * psprite_scale_x * BASE_VID_WIDTH / BASE_VID_HEIGHT)
                / vid_w.max(1.0),
        };
        self.driver.flush_screen_textures();
    }

    /// Push filter settings to the driver after (re)selecting it.
    pub fn switch_renderer(&mut self) {
        self.driver
            .set_special_state(SpecialState::TextureFilter(self.config.filter));
        self.driver
            .set_special_state(SpecialState::Anisotropy(self.config.anisotropy));
        self.set_view_size();
        self.update_palette_rendering();
    }

    pub fn set_palette_rendering(&mut self, on: bool) {
        self.config.palette_rendering = on;
        self.update_palette_rendering();
    }

    pub fn set_shaders(&mut self, on: bool) {
        self.config.shaders = on;
        self.update_palette_rendering();
    }

    /// Follow the palette-rendering setting. Textures and light tables
    /// are color-space specific, so a change drops both.
    pub(crate) fn update_palette_rendering(&mut self) {
        let should = self.config.palette_rendering && self.shaders_active();
        if should == self.palette_active {
            return;
        }
        self.palette_active = should;
        info!("palette rendering {}", if should { "on" } else { "off" });
        self.driver.flush_textures();
        self.light_tables.invalidate(&mut self.driver);
    }

    /// A fresh texture set: cached uploads and light tables go stale.
    pub fn replace_textures(&mut self, bank: crate::world::TextureBank) {
        self.bank = bank;
        self.driver.flush_textures();
        self.light_tables.invalidate(&mut self.driver);
    }

    pub fn texture_used(&self) -> usize {
        self.driver.texture_used()
    }

    pub fn view_window(&self) -> ViewWindow {
        self.view
    }
}

/// The renderer only works on 8-bit indexed video modes.
pub fn check_pixel_depth(bytes_per_pixel: u8) -> Result<(), RenderError> {
    if bytes_per_pixel != 1 {
        return Err(RenderError::UnsupportedPixelDepth(bytes_per_pixel));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pass {
    Skybox,
    Main,
    /// Main view after a skybox pass; the sky is already down.
    MainOverSkybox,
}
