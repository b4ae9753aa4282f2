//! Headless back-end: remembers every call and the state it leaves bound.
//!
//! Used by the tests and by `render_headless` to inspect what a frame
//! would have sent to a real graphics API.

use log::trace;

use crate::{
    renderer::{
        ClipRect, DistortionGrid, Driver, OutVertex, PolyFlags, ScreenTexture, ShaderInfo,
        ShaderKind, SpecialState, SurfaceInfo, Transform,
    },
    world::TextureId,
};

/// Bytes a bound texture is assumed to occupy.
const TEXTURE_COST: usize = 64 * 64 * 4;

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    ClearBuffer { color: bool, depth: bool },
    ClipRect(ClipRect),
    Transform(Option<Transform>),
    Texture(Option<TextureId>),
    Polygon {
        surf: SurfaceInfo,
        verts: Vec<OutVertex>,
        flags: PolyFlags,
        texture: Option<TextureId>,
        shader: Option<ShaderKind>,
    },
    Triangles {
        surf: SurfaceInfo,
        verts: Vec<OutVertex>,
        indices: Vec<u32>,
        flags: PolyFlags,
        texture: Option<TextureId>,
        shader: Option<ShaderKind>,
    },
    Special(SpecialState),
    Shader(Option<ShaderKind>),
    ShaderInfo(ShaderInfo),
    LightTable(u32),
    ClearLightTables,
    MakeScreen(ScreenTexture),
    DrawScreen(ScreenTexture),
    DrawFinal(ScreenTexture, u32, u32),
    Wipe { from: ScreenTexture, to: ScreenTexture },
    PostImg(Box<DistortionGrid>),
    FadeMask(String, usize),
    FlushScreenTextures,
    FlushTextures,
}

#[derive(Debug)]
pub struct Recorder {
    pub calls: Vec<Call>,
    pub transform: Option<Transform>,
    pub shader: Option<ShaderKind>,
    pub clip: Option<ClipRect>,
    pub texture: Option<TextureId>,
    /// What `init_shaders` reports.
    pub shaders_supported: bool,
    next_light_table: u32,
    uploaded: Vec<TextureId>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Recorder {
    pub fn new(shaders_supported: bool) -> Self {
        Self {
            calls: Vec::new(),
            transform: None,
            shader: None,
            clip: None,
            texture: None,
            shaders_supported,
            next_light_table: 1,
            uploaded: Vec::new(),
        }
    }

    /// Forget recorded calls, keep bound state.
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Every drawn polygon (single polygons and batched triangle lists) as
    /// `(flags, surface, vertices)`.
    pub fn polygons(&self) -> impl Iterator<Item = (PolyFlags, &SurfaceInfo, &[OutVertex])> {
        self.calls.iter().filter_map(|c| match c {
            Call::Polygon {
                surf, verts, flags, ..
            }
            | Call::Triangles {
                surf, verts, flags, ..
            } => Some((*flags, surf, verts.as_slice())),
            _ => None,
        })
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    fn push(&mut self, call: Call) {
        trace!("driver {:?}", call);
        self.calls.push(call);
    }
}

impl Driver for Recorder {
    fn clear_buffer(&mut self, color: Option<[f32; 4]>, depth: bool) {
        self.push(Call::ClearBuffer {
            color: color.is_some(),
            depth,
        });
    }

    fn set_clip_rect(&mut self, rect: ClipRect) {
        self.clip = Some(rect);
        self.push(Call::ClipRect(rect));
    }

    fn set_transform(&mut self, transform: Option<&Transform>) {
        self.transform = transform.copied();
        self.push(Call::Transform(self.transform));
    }

    fn set_texture(&mut self, tex: Option<TextureId>) {
        if let Some(id) = tex {
            if !self.uploaded.contains(&id) {
                self.uploaded.push(id);
            }
        }
        self.texture = tex;
        self.push(Call::Texture(tex));
    }

    fn draw_polygon(&mut self, surf: &SurfaceInfo, verts: &[OutVertex], flags: PolyFlags) {
        let call = Call::Polygon {
            surf: *surf,
            verts: verts.to_vec(),
            flags,
            texture: self.texture,
            shader: self.shader,
        };
        self.push(call);
    }

    fn draw_indexed_triangles(
        &mut self,
        surf: &SurfaceInfo,
        verts: &[OutVertex],
        indices: &[u32],
        flags: PolyFlags,
    ) {
        let call = Call::Triangles {
            surf: *surf,
            verts: verts.to_vec(),
            indices: indices.to_vec(),
            flags,
            texture: self.texture,
            shader: self.shader,
        };
        self.push(call);
    }

    fn set_special_state(&mut self, state: SpecialState) {
        self.push(Call::Special(state));
    }

    fn init_shaders(&mut self) -> bool {
        self.shaders_supported
    }

    fn set_shader(&mut self, shader: ShaderKind) {
        self.shader = Some(shader);
        self.push(Call::Shader(Some(shader)));
    }

    fn unset_shader(&mut self) {
        self.shader = None;
        self.push(Call::Shader(None));
    }

    fn set_shader_info(&mut self, info: ShaderInfo) {
        self.push(Call::ShaderInfo(info));
    }

    fn create_light_table(&mut self, _table: &[u8]) -> u32 {
        let id = self.next_light_table;
        self.next_light_table += 1;
        self.push(Call::LightTable(id));
        id
    }

    fn clear_light_tables(&mut self) {
        self.push(Call::ClearLightTables);
    }

    fn make_screen_texture(&mut self, which: ScreenTexture) {
        self.push(Call::MakeScreen(which));
    }

    fn draw_screen_texture(&mut self, which: ScreenTexture) {
        self.push(Call::DrawScreen(which));
    }

    fn draw_screen_final_texture(&mut self, which: ScreenTexture, width: u32, height: u32) {
        self.push(Call::DrawFinal(which, width, height));
    }

    fn do_screen_wipe(&mut self, from: ScreenTexture, to: ScreenTexture) {
        self.push(Call::Wipe { from, to });
    }

    fn post_img_redraw(&mut self, grid: &DistortionGrid) {
        self.push(Call::PostImg(Box::new(*grid)));
    }

    fn set_fade_mask(&mut self, name: &str, len: usize) {
        self.push(Call::FadeMask(name.to_string(), len));
    }

    fn texture_used(&self) -> usize {
        self.uploaded.len() * TEXTURE_COST
    }

    fn flush_screen_textures(&mut self) {
        self.push(Call::FlushScreenTextures);
    }

    fn flush_textures(&mut self) {
        self.uploaded.clear();
        self.push(Call::FlushTextures);
    }
}
