//! Rendering abstraction layer.
//!
//! *The scene code never talks to a graphics API directly.*
//! Everything it draws goes through a type that implements [`Driver`]:
//! buffer clears, clip rectangles, transforms, textured polygons, shader
//! selection, light tables, screen captures and wipes.
//!
//! * Back-ends (`gl`, `vk`, the headless [`Recorder`]) plug in without the
//!   scene code changing.
//! * A helper blanket‐impl [`DriverExt`] adds `draw_quad` and
//!   `reset_state` so call-sites stay short.

use bitflags::bitflags;

use crate::{config::FilterMode, world::TextureId};

pub mod recorder;

pub use recorder::{Call, Recorder};

/*──────────────────────────── colors ────────────────────────────────*/

/// One RGBA byte quadruple. Packs little-endian: red is the low byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(0xFF, 0xFF, 0xFF, 0xFF);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn from_packed(v: u32) -> Self {
        let [r, g, b, a] = v.to_le_bytes();
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn packed(self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }
}

/*──────────────────────────── geometry ──────────────────────────────*/

/// Submission vertex. `x`/`z` are map x/y, `y` is height.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OutVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub s: f32,
    pub t: f32,
}

/// Corner indices of a [`WallQuad`].
///
/// ```text
///   TL--TR
///   | /  |
///   |/   |
///   BL--BR
/// ```
pub const BL: usize = 0;
pub const BR: usize = 1;
pub const TR: usize = 2;
pub const TL: usize = 3;

/// Four wall corners in the fixed order {bottom-left, bottom-right,
/// top-right, top-left}.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WallQuad(pub [OutVertex; 4]);

impl WallQuad {
    /// Quad standing on the 2D segment `a → b` with all heights and
    /// texture coordinates zero.
    pub fn on_segment(a: glam::Vec2, b: glam::Vec2) -> Self {
        let mut q = WallQuad::default();
        for i in [BL, TL] {
            q.0[i].x = a.x;
            q.0[i].z = a.y;
        }
        for i in [BR, TR] {
            q.0[i].x = b.x;
            q.0[i].z = b.y;
        }
        q
    }

    /// Heights as (start bottom, start top, end bottom, end top).
    pub fn set_heights(&mut self, bottom: f32, top: f32, end_bottom: f32, end_top: f32) {
        self.0[BL].y = bottom;
        self.0[TL].y = top;
        self.0[BR].y = end_bottom;
        self.0[TR].y = end_top;
    }

    pub fn set_s(&mut self, low: f32, high: f32) {
        self.0[BL].s = low;
        self.0[TL].s = low;
        self.0[BR].s = high;
        self.0[TR].s = high;
    }

    pub fn clear_st(&mut self) {
        for v in self.0.iter_mut() {
            v.s = 0.0;
            v.t = 0.0;
        }
    }

    pub fn centroid(&self) -> glam::Vec3 {
        self.0
            .iter()
            .fold(glam::Vec3::ZERO, |acc, v| acc + glam::vec3(v.x, v.y, v.z))
            * 0.25
    }

    /// True when neither end is inverted.
    pub fn is_upright(&self) -> bool {
        self.0[TL].y >= self.0[BL].y && self.0[TR].y >= self.0[BR].y
    }

    /// Collapse an inverted end onto its bottom. Returns `false` when no
    /// height is left at either end.
    pub fn make_upright(&mut self) -> bool {
        for (top, bottom) in [(TL, BL), (TR, BR)] {
            if self.0[top].y < self.0[bottom].y {
                self.0[top].y = self.0[bottom].y;
                self.0[top].t = self.0[bottom].t;
            }
        }
        self.0[TL].y > self.0[BL].y || self.0[TR].y > self.0[BR].y
    }
}

/*──────────────────────────── surfaces ──────────────────────────────*/

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LightInfo {
    pub light_level: u8,
    pub fade_start: u8,
    pub fade_end: u8,
}

/// Resolved per-polygon color state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SurfaceInfo {
    pub poly: Rgba,
    pub tint: Rgba,
    pub fade: Rgba,
    pub light: LightInfo,
    /// Driver light table; 0 outside palette rendering.
    pub light_table: u32,
}

impl SurfaceInfo {
    pub fn opaque() -> Self {
        Self {
            poly: Rgba::WHITE,
            ..Default::default()
        }
    }
}

bitflags! {
    /// Blend and raster state for one polygon.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct PolyFlags: u32 {
        const MASKED            = 0x0000_0001;
        const TRANSLUCENT       = 0x0000_0002;
        const ENVIRONMENT       = 0x0000_0004;
        const ADDITIVE          = 0x0000_0008;
        const SUBTRACTIVE       = 0x0000_0010;
        const REVERSE_SUBTRACT  = 0x0000_0020;
        const MULTIPLICATIVE    = 0x0000_0040;
        const FOG               = 0x0000_0080;
        const OCCLUDE           = 0x0000_0200;
        const NO_DEPTH_TEST     = 0x0000_0400;
        const INVISIBLE         = 0x0000_0800;
        const DECAL             = 0x0000_1000;
        const MODULATED         = 0x0000_2000;
        const NO_TEXTURE        = 0x0000_4000;
        const COLOR_MAPPED      = 0x0002_0000;

        /// Any of these means the polygon has to be alpha sorted.
        const BLENDED = Self::TRANSLUCENT.bits()
            | Self::ADDITIVE.bits()
            | Self::SUBTRACTIVE.bits()
            | Self::REVERSE_SUBTRACT.bits()
            | Self::MULTIPLICATIVE.bits()
            | Self::ENVIRONMENT.bits();
    }
}

/*──────────────────────────── view state ────────────────────────────*/

/// Projection parameters of one eye. Angles are degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Pitch; zero while shearing handles look up/down.
    pub angle_x: f32,
    /// Yaw.
    pub angle_y: f32,
    pub fov_x: f32,
    pub fov_y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub scale_z: f32,
    pub shearing: bool,
    pub view_aiming: f32,
    pub roll: bool,
    pub roll_angle: f32,
    pub flip: bool,
    pub splitscreen: bool,
}

/// Near plane used while the 3D view is drawn.
pub const ZCLIP_PLANE: f32 = 4.0;
/// Near plane for 2D drawing.
pub const NZCLIP_PLANE: f32 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub near: f32,
}

impl ClipRect {
    pub fn full_screen(width: u32, height: u32) -> Self {
        Self {
            x1: 0,
            y1: 0,
            x2: width as i32,
            y2: height as i32,
            near: NZCLIP_PLANE,
        }
    }
}

/// Off-screen capture slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScreenTexture {
    /// Last 3D frame, for intermission backgrounds and distortion.
    Generic1,
    /// Final composited screen.
    Generic2,
    /// Final screen while palette rendering.
    Generic3,
    WipeStart,
    WipeEnd,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderKind {
    Floor,
    Wall,
    Sprite,
    Model,
    Water,
    Fog,
    Sky,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialState {
    Shaders(bool),
    TextureFilter(FilterMode),
    Anisotropy(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderInfo {
    LevelTime(u32),
}

/// Side of the screen-distortion vertex grid.
pub const SCREEN_VERTS: usize = 10;

/// `[column][row] = (x, y)` in grid units centred on the screen.
pub type DistortionGrid = [[[f32; 2]; SCREEN_VERTS]; SCREEN_VERTS];

/*──────────────────────────── driver ────────────────────────────────*/

/// Everything the scene renderer needs from a graphics API.
///
/// Calls are stateful the way an immediate-mode API is: a texture, shader,
/// transform or clip rectangle stays bound until replaced.
pub trait Driver {
    /// Clear the color buffer to `color` (if any) and/or the depth buffer.
    fn clear_buffer(&mut self, color: Option<[f32; 4]>, depth: bool);

    fn set_clip_rect(&mut self, rect: ClipRect);

    /// `None` returns to the identity (2D) transform.
    fn set_transform(&mut self, transform: Option<&Transform>);

    /// `None` binds no texture.
    fn set_texture(&mut self, tex: Option<TextureId>);

    fn draw_polygon(&mut self, surf: &SurfaceInfo, verts: &[OutVertex], flags: PolyFlags);

    fn draw_indexed_triangles(
        &mut self,
        surf: &SurfaceInfo,
        verts: &[OutVertex],
        indices: &[u32],
        flags: PolyFlags,
    );

    fn set_special_state(&mut self, state: SpecialState);

    /// Compile the built-in shaders; `false` when the API has none.
    fn init_shaders(&mut self) -> bool;

    fn set_shader(&mut self, shader: ShaderKind);

    fn unset_shader(&mut self);

    fn set_shader_info(&mut self, info: ShaderInfo);

    /// Upload a light-level remap table and return its handle (never 0).
    fn create_light_table(&mut self, table: &[u8]) -> u32;

    fn clear_light_tables(&mut self);

    fn make_screen_texture(&mut self, which: ScreenTexture);

    fn draw_screen_texture(&mut self, which: ScreenTexture);

    fn draw_screen_final_texture(&mut self, which: ScreenTexture, width: u32, height: u32);

    /// Cross-fade `from` into `to` through the current fade mask.
    fn do_screen_wipe(&mut self, from: ScreenTexture, to: ScreenTexture);

    /// Redraw the last capture through a warped vertex grid.
    fn post_img_redraw(&mut self, grid: &DistortionGrid);

    /// Bind the named fade mask of `len` bytes for the next wipe.
    fn set_fade_mask(&mut self, name: &str, len: usize);

    /// Bytes of texture memory currently in use.
    fn texture_used(&self) -> usize;

    fn flush_screen_textures(&mut self);

    /// Drop every cached texture so it is re-uploaded on next use.
    fn flush_textures(&mut self);
}

/// Convenience blanket-impl shared by every driver.
pub trait DriverExt: Driver {
    fn draw_quad(&mut self, surf: &SurfaceInfo, quad: &WallQuad, flags: PolyFlags) {
        self.draw_polygon(surf, &quad.0, flags);
    }

    /// Neutral state for whatever draws after the 3D view.
    fn reset_state(&mut self, width: u32, height: u32) {
        self.set_transform(None);
        self.unset_shader();
        self.set_clip_rect(ClipRect::full_screen(width, height));
    }
}
impl<T: Driver + ?Sized> DriverExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec2;

    #[test]
    fn rgba_packs_little_endian() {
        let c = Rgba::from_packed(0x1900_0000);
        assert_eq!(c, Rgba::new(0, 0, 0, 0x19));
        assert_eq!(Rgba::new(0x11, 0x22, 0x33, 0x44).packed(), 0x4433_2211);
    }

    #[test]
    fn quad_on_segment_orders_corners() {
        let mut q = WallQuad::on_segment(vec2(0.0, 0.0), vec2(64.0, 0.0));
        q.set_heights(0.0, 128.0, 8.0, 120.0);
        assert_eq!(q.0[BL].x, 0.0);
        assert_eq!(q.0[BR].x, 64.0);
        assert_eq!(q.0[TR].y, 120.0);
        assert_eq!(q.0[TL].y, 128.0);
        assert!(q.is_upright());
        assert_eq!(q.centroid().x, 32.0);
    }

    #[test]
    fn blended_excludes_masked_and_decal() {
        assert!(!PolyFlags::BLENDED.intersects(PolyFlags::MASKED | PolyFlags::DECAL));
        assert!(PolyFlags::BLENDED.contains(PolyFlags::ENVIRONMENT));
    }
}
