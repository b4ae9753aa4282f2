//! 3D floors ("FOFs") and the stacked light bands they cast.

use bitflags::bitflags;
use glam::Vec2;

use crate::world::{
    colormap::ColormapId,
    geometry::{BlendStyle, LinedefId, SectorId},
    slope::Slope,
    texture::TextureId,
};

bitflags! {
    /// Behaviour / rendering flags of a 3D floor and of the light bands it
    /// casts. Values follow the map format.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct FofFlags: u32 {
        const EXISTS         = 0x0000_0001;
        const BLOCK_PLAYER   = 0x0000_0002;
        const BLOCK_OTHERS   = 0x0000_0004;
        const RENDER_SIDES   = 0x0000_0008;
        const RENDER_PLANES  = 0x0000_0010;
        const SWIMMABLE      = 0x0000_0020;
        const NO_SHADE       = 0x0000_0040;
        const CUT_SOLIDS     = 0x0000_0080;
        const CUT_EXTRA      = 0x0000_0100;
        const CUT_SPRITES    = 0x0000_0200;
        const BOTH_PLANES    = 0x0000_0400;
        const EXTRA          = 0x0000_0800;
        const TRANSLUCENT    = 0x0000_1000;
        const FOG            = 0x0000_2000;
        const INVERT_PLANES  = 0x0000_4000;
        const ALL_SIDES      = 0x0000_8000;
        const INVERT_SIDES   = 0x0001_0000;

        const SOLID          = Self::BLOCK_PLAYER.bits() | Self::BLOCK_OTHERS.bits();
        const RENDER_ALL     = Self::RENDER_SIDES.bits() | Self::RENDER_PLANES.bits();
        const CUT_LEVEL      = Self::CUT_SOLIDS.bits() | Self::CUT_EXTRA.bits() | Self::CUT_SPRITES.bits();
    }
}

/// One extra floor/ceiling slab inside a sector.
#[derive(Clone, Debug, Default)]
pub struct FFloor {
    /// Controlling line; its front side supplies the side texture and its
    /// front sector supplies fog lighting.
    pub master: LinedefId,
    pub top_h: f32,
    pub bottom_h: f32,
    pub top_slope: Option<Slope>,
    pub bottom_slope: Option<Slope>,
    pub top_tex: TextureId,
    pub bottom_tex: TextureId,
    pub flags: FofFlags,
    /// `0..=256`; 256 is fully opaque.
    pub alpha: i32,
    pub blend: BlendStyle,
}

impl FFloor {
    #[inline]
    pub fn top_at(&self, p: Vec2) -> f32 {
        Slope::z_at(self.top_slope.as_ref(), p, self.top_h)
    }

    #[inline]
    pub fn bottom_at(&self, p: Vec2) -> f32 {
        Slope::z_at(self.bottom_slope.as_ref(), p, self.bottom_h)
    }

    pub fn renders_sides(&self) -> bool {
        self.flags
            .contains(FofFlags::EXISTS | FofFlags::RENDER_SIDES)
    }
}

/// Stable handle to an FOF: owning sector plus position in its list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FofRef {
    pub sector: SectorId,
    pub index: u16,
}

/// One entry of a sector's light list, ordered top to bottom.
#[derive(Clone, Debug, Default)]
pub struct LightBand {
    pub height: f32,
    pub slope: Option<Slope>,
    pub light: i32,
    pub colormap: Option<ColormapId>,
    pub flags: FofFlags,
    /// FOF casting this band; its bottom bounds a solid cut.
    pub caster: Option<FofRef>,
}

impl LightBand {
    #[inline]
    pub fn z_at(&self, p: Vec2) -> f32 {
        Slope::z_at(self.slope.as_ref(), p, self.height)
    }
}
