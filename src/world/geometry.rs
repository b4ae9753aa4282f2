use bitflags::bitflags;
use glam::Vec2;
use smallvec::SmallVec;

use crate::world::{
    colormap::{ColormapId, ExtraColormap},
    ffloor::{FFloor, FofRef, LightBand},
    slope::Slope,
    texture::{NO_TEXTURE, TextureId},
};

pub type SubsectorId = u16;
pub type LinedefId = u16;
pub type SegmentId = u16;
pub type VertexId = u16;
pub type SidedefId = u16;
pub type SectorId = u16;
pub type PolyobjId = u16;
pub type ThingId = u16;

/// Runtime snapshot of one map. The renderer never mutates it.
#[derive(Debug, Default)]
pub struct Level {
    pub name: String,
    pub things: Vec<Thing>,
    pub linedefs: Vec<Linedef>,
    pub sidedefs: Vec<Sidedef>,
    pub vertices: Vec<Vertex>,
    pub segs: Vec<Seg>,
    pub subsectors: Vec<Subsector>,
    pub nodes: Vec<Node>,
    pub sectors: Vec<Sector>,
    pub polyobjs: Vec<Polyobj>,
    pub colormaps: Vec<ExtraColormap>,
    /// Flat id that marks a sky ceiling / floor.
    pub sky_flat: TextureId,
    /// Texture drawn behind everything when the sky is visible.
    pub sky_texture: TextureId,
}

/*------------------------- game objects -----------------------------*/

/// A renderable map object, already positioned by the game simulation.
#[derive(Clone, Debug)]
pub struct Thing {
    pub pos: glam::Vec3,
    pub sector: SectorId,
    pub sprite: TextureId,
    /// 0 = opaque, 1..=9 = 10%..90% translucent.
    pub translucency: u8,
    pub flip: bool,
    /// Weather objects are projected like things but never cast shadows.
    pub precip: bool,
}

/*--------------------------- linedefs -------------------------------*/

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct LinedefFlags: u32 {
        const IMPASSABLE       = 0x0001;
        const BLOCK_MONSTERS   = 0x0002;
        const TWO_SIDED        = 0x0004;
        const DONT_PEG_TOP     = 0x0008;
        const DONT_PEG_BOTTOM  = 0x0010;
        const EFFECT1          = 0x0020;
        const NO_CLIMB         = 0x0040;
        const EFFECT2          = 0x0080;
        const EFFECT3          = 0x0100;
        const EFFECT4          = 0x0200;
        const EFFECT5          = 0x0400;
        const BOUNCY           = 0x4000;
        // FOF master lines: take side textures from the control sector's lines.
        const TFER_LINE        = 0x8000;
    }
}

/// Patch alpha style; ordering matters for the "style in range" checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum BlendStyle {
    #[default]
    Copy,
    Translucent,
    Add,
    Subtract,
    ReverseSubtract,
    Modulate,
    Overlay,
    Fog,
}

#[derive(Clone, Debug)]
pub struct Linedef {
    pub v1: VertexId,
    pub v2: VertexId,
    pub flags: LinedefFlags,
    pub special: u16,
    pub right_sidedef: Option<SidedefId>,
    pub left_sidedef: Option<SidedefId>,
    pub front_sector: SectorId,
    pub back_sector: Option<SectorId>,
    pub blend: BlendStyle,
    /// Opacity in `0.0..=1.0`; anything `>= 1.0` is fully opaque.
    pub alpha: f32,
}

/*--------------------------- sidedefs -------------------------------*/

#[derive(Clone, Debug, Default)]
pub struct Sidedef {
    pub x_off: f32,
    pub y_off: f32,
    pub upper: TextureId,
    pub lower: TextureId,
    pub middle: TextureId,
    pub sector: SectorId,
    /// Extra vertical repeats of a two-sided middle texture.
    pub repeat_count: u8,
}

/*----------------------- simple primitives --------------------------*/

#[derive(Clone, Copy, Debug)]
pub struct Vertex {
    pub pos: Vec2,
}

#[derive(Clone, Debug)]
pub struct Seg {
    pub v1: VertexId,
    pub v2: VertexId,
    pub linedef: LinedefId,
    /// 0 = seg runs along the line's right side, 1 = left side.
    pub dir: u16,
    /// Distance of `v1` from the start of the linedef.
    pub offset: f32,
    pub length: f32,
    pub polyobj: Option<PolyobjId>,
}

#[derive(Clone, Debug, Default)]
pub struct Subsector {
    pub seg_count: u16,
    pub first_seg: SegmentId,
    pub sector: SectorId,
    /// Convex floor/ceiling outline, clockwise seen from above.
    pub polygon: Vec<Vec2>,
}

#[derive(Clone, Debug, Default)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub bbox: [Aabb; 2],
    pub child: [u16; 2],
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Polyobj {
    /// 0 = opaque, 1..=9 translucent, `>= NUM_TRANSMAPS` invisible.
    pub translucency: u8,
}

#[derive(Clone, Debug, Default)]
pub struct Sector {
    pub floor_h: f32,
    pub ceil_h: f32,
    pub floor_slope: Option<Slope>,
    pub ceil_slope: Option<Slope>,
    pub floor_tex: TextureId,
    pub ceil_tex: TextureId,
    /// May leave `0..=255` while a light animation overshoots.
    pub light: i32,
    pub colormap: Option<ColormapId>,
    pub ffloors: Vec<FFloor>,
    pub lightlist: Vec<LightBand>,
    pub tags: SmallVec<[u16; 2]>,
    /// Sector whose heights stand in for this one on two-sided middles.
    pub height_sec: Option<SectorId>,
    /// Lines bordering this sector, in map order.
    pub lines: Vec<LinedefId>,
}

impl Sector {
    #[inline]
    pub fn floor_at(&self, p: Vec2) -> f32 {
        Slope::z_at(self.floor_slope.as_ref(), p, self.floor_h)
    }

    #[inline]
    pub fn ceil_at(&self, p: Vec2) -> f32 {
        Slope::z_at(self.ceil_slope.as_ref(), p, self.ceil_h)
    }

    /// Same tag list, order included.
    pub fn same_tags(&self, other: &Sector) -> bool {
        self.tags == other.tags
    }
}

/*----------------------- lookup helpers -----------------------------*/

impl Level {
    /// Front and back sector ids seen from the seg's side of its line.
    pub fn seg_sectors(&self, seg: &Seg) -> (SectorId, Option<SectorId>) {
        let ld = &self.linedefs[seg.linedef as usize];
        let (front_sd, back_sd) = if seg.dir == 0 {
            (ld.right_sidedef, ld.left_sidedef)
        } else {
            (ld.left_sidedef, ld.right_sidedef)
        };
        let front = front_sd
            .and_then(|i| self.sidedefs.get(i as usize))
            .map(|sd| sd.sector)
            .unwrap_or(ld.front_sector);
        let back = back_sd
            .and_then(|i| self.sidedefs.get(i as usize))
            .map(|sd| sd.sector);
        (front, back)
    }

    /// Sidedef on the seg's own side.
    pub fn seg_sidedef(&self, seg: &Seg) -> Option<&Sidedef> {
        let ld = &self.linedefs[seg.linedef as usize];
        let idx = if seg.dir == 0 {
            ld.right_sidedef
        } else {
            ld.left_sidedef
        };
        idx.and_then(|i| self.sidedefs.get(i as usize))
    }

    pub fn ffloor(&self, r: FofRef) -> Option<&FFloor> {
        self.sectors
            .get(r.sector as usize)
            .and_then(|s| s.ffloors.get(r.index as usize))
    }

    pub fn colormap(&self, id: Option<ColormapId>) -> Option<&ExtraColormap> {
        id.and_then(|i| self.colormaps.get(i as usize))
    }

    /// Colormap together with its id, the shape lighting wants.
    pub fn colormap_entry(&self, id: Option<ColormapId>) -> Option<(ColormapId, &ExtraColormap)> {
        id.and_then(|i| self.colormaps.get(i as usize).map(|c| (i, c)))
    }

    #[inline]
    pub fn is_sky(&self, flat: TextureId) -> bool {
        flat != NO_TEXTURE && flat == self.sky_flat
    }

    pub fn segs_of_subsector(&self, ss: SubsectorId) -> std::ops::Range<SegmentId> {
        let ss = &self.subsectors[ss as usize];
        ss.first_seg..ss.first_seg + ss.seg_count
    }
}
