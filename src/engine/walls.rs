//! Wall pieces of one seg.
//!
//! A seg turns into up to a handful of quads: upper and lower strips where
//! the neighbour's ceiling / floor steps, a middle texture, invisible sky
//! occluders and the sides of 3D floors. Each piece carries where it must
//! go next ([`Route`]); the engine does the lighting and the submission.

use std::collections::HashSet;

use glam::Vec2;
use once_cell::sync::Lazy;
use smallvec::SmallVec;

use crate::{
    config::FakeContrast,
    engine::{
        lighting::{
            NUM_TRANSMAPS, blend_flag_for_style, fog_block_alpha, linedef_trans_table,
            surface_blend, transtable_to_alpha, wall_light,
        },
        texture_or_warn,
    },
    renderer::{BL, BR, PolyFlags, SurfaceInfo, TL, TR, WallQuad},
    world::{
        BlendStyle, ColormapId, FFloor, FofFlags, FofRef, Level, Linedef, LinedefFlags, NO_TEXTURE,
        Sector, SectorId, Seg, SegmentId, Sidedef, TextureBank, TextureId,
    },
};

/// Height of the top of map space; sky occluders run up to here.
pub const MAP_TOP: f32 = i32::MAX as f32 / 65536.0;
/// Bottom of map space.
pub const MAP_BOTTOM: f32 = i32::MIN as f32 / 65536.0;

/// Horizon lines draw no middle texture.
pub const HORIZON_SPECIAL: u16 = 41;

/// Old translucent-line specials. Their middles blend even without an
/// explicit alpha.
static LEGACY_TRANSLUCENT: Lazy<HashSet<u16>> = Lazy::new(|| {
    [
        102, 121, 123, 124, 125, 141, 142, 144, 145, 174, 175, 192, 195, 221, 253, 256,
    ]
    .into_iter()
    .collect()
});

/// Where a piece goes after it is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Lit and drawn immediately.
    Direct,
    /// Deferred to the sorted draw-node list.
    Transparent { fog: bool },
    /// Cut along `sector`'s light list first.
    Split {
        sector: SectorId,
        cut: FofFlags,
        fof: Option<FofRef>,
    },
    /// Invisible depth occluder in front of the sky.
    Sky,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WallPiece {
    pub quad: WallQuad,
    /// `None` for untextured pieces (fog, sky).
    pub texture: Option<TextureId>,
    pub alpha: u8,
    pub flags: PolyFlags,
    pub light: i32,
    pub colormap: Option<ColormapId>,
    pub route: Route,
}

pub type WallPieces = SmallVec<[WallPiece; 4]>;

#[derive(Clone, Copy, Debug, Default)]
pub struct WallOptions {
    pub fake_contrast: FakeContrast,
    pub shaders: bool,
}

/// A seg with everything around it resolved.
pub struct SegContext<'a> {
    pub level: &'a Level,
    pub seg: &'a Seg,
    pub line: &'a Linedef,
    pub side: &'a Sidedef,
    pub front_id: SectorId,
    pub front: &'a Sector,
    pub back_id: Option<SectorId>,
    pub back: Option<&'a Sector>,
    pub v1: Vec2,
    pub v2: Vec2,
}

impl<'a> SegContext<'a> {
    /// `None` for segs with dangling references or no sidedef on their side.
    pub fn new(level: &'a Level, seg_id: SegmentId) -> Option<Self> {
        let seg = level.segs.get(seg_id as usize)?;
        let line = level.linedefs.get(seg.linedef as usize)?;
        let side = level.seg_sidedef(seg)?;
        let (front_id, back_id) = level.seg_sectors(seg);
        let front = level.sectors.get(front_id as usize)?;
        let back = back_id.and_then(|b| level.sectors.get(b as usize));
        Some(Self {
            level,
            seg,
            line,
            side,
            front_id,
            front,
            back_id: back.and(back_id),
            back,
            v1: level.vertices.get(seg.v1 as usize)?.pos,
            v2: level.vertices.get(seg.v2 as usize)?.pos,
        })
    }
}

/// Sector heights at both ends of the seg. `*_e` is the `v2` end.
#[derive(Clone, Copy, Debug, Default)]
struct Heights {
    top: f32,
    top_e: f32,
    bottom: f32,
    bottom_e: f32,
    high: f32,
    high_e: f32,
    low: f32,
    low_e: f32,
}

/// FOF alpha is stored one above the byte it draws with; 0 wraps.
pub fn fof_alpha(alpha: i32) -> u8 {
    (alpha - 1) as u8
}

/// Build every wall piece of the seg.
pub fn build_seg_walls(ctx: &SegContext, bank: &TextureBank, opts: WallOptions) -> WallPieces {
    let mut b = WallBuilder::new(ctx, bank, opts);
    match ctx.back {
        Some(back) => {
            b.upper(back);
            b.lower(back);
            b.two_sided_middle(back);
            if ctx.seg.polyobj.is_none() {
                b.two_sided_sky(back);
            }
            if !ctx.front.same_tags(back)
                && (!ctx.front.ffloors.is_empty() || !back.ffloors.is_empty())
            {
                b.fof_sides(back);
            }
        }
        None => {
            b.one_sided_middle();
            if ctx.seg.polyobj.is_none() {
                b.one_sided_sky();
            }
        }
    }
    b.out
}

struct WallBuilder<'c, 'a> {
    ctx: &'c SegContext<'a>,
    bank: &'c TextureBank,
    opts: WallOptions,
    h: Heights,
    cliplow: f32,
    cliphigh: f32,
    light: i32,
    colormap: Option<ColormapId>,
    out: WallPieces,
}

impl<'c, 'a> WallBuilder<'c, 'a> {
    fn new(ctx: &'c SegContext<'a>, bank: &'c TextureBank, opts: WallOptions) -> Self {
        let (v1, v2) = (ctx.v1, ctx.v2);
        let mut h = Heights {
            top: ctx.front.ceil_at(v1),
            top_e: ctx.front.ceil_at(v2),
            bottom: ctx.front.floor_at(v1),
            bottom_e: ctx.front.floor_at(v2),
            ..Default::default()
        };
        if let Some(back) = ctx.back {
            h.high = back.ceil_at(v1);
            h.high_e = back.ceil_at(v2);
            h.low = back.floor_at(v1);
            h.low_e = back.floor_at(v2);
        }

        let cliplow = ctx.side.x_off + ctx.seg.offset;
        let light = if ctx.front.colormap.is_some() {
            ctx.front.light
        } else {
            wall_light(ctx.front.light, v1, v2, opts.fake_contrast)
        };

        Self {
            ctx,
            bank,
            opts,
            h,
            cliplow,
            cliphigh: cliplow + ctx.seg.length,
            light,
            colormap: ctx.front.colormap,
            out: WallPieces::new(),
        }
    }

    fn base_quad(&self) -> WallQuad {
        WallQuad::on_segment(self.ctx.v1, self.ctx.v2)
    }

    fn push(
        &mut self,
        mut quad: WallQuad,
        texture: Option<TextureId>,
        alpha: u8,
        flags: PolyFlags,
        route: Route,
    ) {
        if !quad.make_upright() {
            return;
        }
        self.out.push(WallPiece {
            quad,
            texture,
            alpha,
            flags,
            light: self.light,
            colormap: self.colormap,
            route,
        });
    }

    /// Upper, lower and one-sided middle strips share their routing.
    fn push_strip(&mut self, quad: WallQuad, tex: TextureId, transparent: bool) {
        if !self.ctx.front.lightlist.is_empty() {
            let route = Route::Split {
                sector: self.ctx.front_id,
                cut: FofFlags::CUT_LEVEL,
                fof: None,
            };
            self.push(quad, Some(tex), 255, PolyFlags::empty(), route);
        } else if transparent {
            let route = Route::Transparent { fog: false };
            self.push(quad, Some(tex), 255, PolyFlags::ENVIRONMENT, route);
        } else {
            self.push(quad, Some(tex), 255, PolyFlags::MASKED, Route::Direct);
        }
    }

    fn push_sky(&mut self, bottom: f32, top: f32, end_bottom: f32, end_top: f32) {
        let mut quad = self.base_quad();
        quad.set_heights(bottom, top, end_bottom, end_top);
        quad.clear_st();
        self.out.push(WallPiece {
            quad,
            texture: None,
            alpha: 255,
            flags: PolyFlags::INVISIBLE | PolyFlags::NO_TEXTURE,
            light: 255,
            colormap: None,
            route: Route::Sky,
        });
    }

    /*──────────────────────── two-sided lines ───────────────────────*/

    fn upper(&mut self, back: &Sector) {
        let level = self.ctx.level;
        let front = self.ctx.front;
        let h = self.h;
        let tex_id = if level.is_sky(front.ceil_tex) && level.is_sky(back.ceil_tex) {
            NO_TEXTURE
        } else {
            self.ctx.side.upper
        };
        if !((h.high_e < h.top_e || h.high < h.top) && tex_id != NO_TEXTURE) {
            return;
        }

        let tex = texture_or_warn(self.bank, tex_id);
        let (texh, sx, sy) = (tex.height(), tex.scale_x(), tex.scale_y());
        let fl = self.ctx.line.flags;

        let mut peg = if fl.contains(LinedefFlags::DONT_PEG_TOP) {
            0.0
        } else if fl.contains(LinedefFlags::EFFECT1) {
            h.high + texh - h.top
        } else {
            back.ceil_h + texh - front.ceil_h
        };
        peg += self.ctx.side.y_off;
        peg %= texh;

        let mut q = self.base_quad();
        let v = &mut q.0;
        v[TL].t = peg * sy;
        v[TR].t = peg * sy;
        v[BL].t = (peg + front.ceil_h - back.ceil_h) * sy;
        v[BR].t = v[BL].t;

        if !fl.contains(LinedefFlags::EFFECT1) {
            v[TL].t -= (h.top - front.ceil_h) * sy;
            v[TR].t -= (h.top_e - front.ceil_h) * sy;
            v[BL].t -= (h.high - back.ceil_h) * sy;
            v[BR].t -= (h.high_e - back.ceil_h) * sy;
        } else if fl.contains(LinedefFlags::DONT_PEG_TOP) {
            v[BL].t = (peg + h.top - h.high) * sy;
            v[BR].t = (peg + h.top_e - h.high_e) * sy;
        } else {
            v[BL].t = (peg + h.top - h.high) * sy;
            v[BR].t = v[BL].t;
            v[TL].t = v[BL].t - (h.top - h.high) * sy;
            v[TR].t = v[BR].t - (h.top_e - h.high_e) * sy;
        }

        q.set_s(self.cliplow * sx, self.cliphigh * sx);
        q.set_heights(h.high, h.top, h.high_e, h.top_e);
        self.push_strip(q, tex_id, tex.transparent);
    }

    fn lower(&mut self, back: &Sector) {
        let level = self.ctx.level;
        let front = self.ctx.front;
        let h = self.h;
        let tex_id = if level.is_sky(front.floor_tex) && level.is_sky(back.floor_tex) {
            NO_TEXTURE
        } else {
            self.ctx.side.lower
        };
        if !((h.low_e > h.bottom_e || h.low > h.bottom) && tex_id != NO_TEXTURE) {
            return;
        }

        let tex = texture_or_warn(self.bank, tex_id);
        let (texh, sx, sy) = (tex.height(), tex.scale_x(), tex.scale_y());
        let fl = self.ctx.line.flags;

        let mut peg = if !fl.contains(LinedefFlags::DONT_PEG_BOTTOM) {
            0.0
        } else if fl.contains(LinedefFlags::EFFECT1) {
            h.bottom - h.low
        } else {
            front.floor_h - back.floor_h
        };
        peg += self.ctx.side.y_off;
        peg %= texh;

        let mut q = self.base_quad();
        let v = &mut q.0;
        v[TL].t = peg * sy;
        v[TR].t = peg * sy;
        v[BL].t = (peg + back.floor_h - front.floor_h) * sy;
        v[BR].t = v[BL].t;

        if !fl.contains(LinedefFlags::EFFECT1) {
            v[BL].t -= (h.bottom - front.floor_h) * sy;
            v[BR].t -= (h.bottom_e - front.floor_h) * sy;
            v[TL].t -= (h.low - back.floor_h) * sy;
            v[TR].t -= (h.low_e - back.floor_h) * sy;
        } else if fl.contains(LinedefFlags::DONT_PEG_BOTTOM) {
            v[BL].t = (peg + h.low - h.bottom) * sy;
            v[BR].t = v[BL].t;
            v[TR].t = v[BR].t - (h.low_e - h.bottom_e) * sy;
        } else {
            v[BL].t = (peg + h.low - h.bottom) * sy;
            v[BR].t = (peg + h.low_e - h.bottom_e) * sy;
        }

        q.set_s(self.cliplow * sx, self.cliphigh * sx);
        q.set_heights(h.bottom, h.low, h.bottom_e, h.low_e);
        self.push_strip(q, tex_id, tex.transparent);
    }

    fn two_sided_middle(&mut self, seg_back: &Sector) {
        let ctx = self.ctx;
        let tex_id = ctx.side.middle;
        if tex_id == NO_TEXTURE {
            return;
        }
        let level = ctx.level;
        let h = self.h;
        let fl = ctx.line.flags;

        // heights come from the line's own sides, or their stand-ins
        let stand_in = move |id: SectorId| {
            let s = level.sectors.get(id as usize)?;
            match s.height_sec {
                Some(hs) => level.sectors.get(hs as usize),
                None => Some(s),
            }
        };
        let Some(front) = stand_in(ctx.line.front_sector) else {
            return;
        };
        let back = ctx
            .line
            .back_sector
            .and_then(stand_in)
            .unwrap_or(seg_back);

        let tex = texture_or_warn(self.bank, tex_id);
        let (texh, sx, sy) = (tex.height(), tex.scale_x(), tex.scale_y());

        let repeats = if ctx.side.repeat_count > 0 {
            1.0 + ctx.side.repeat_count as f32
        } else if fl.contains(LinedefFlags::EFFECT5) {
            let span = front.ceil_h.min(back.ceil_h) - front.floor_h.max(back.floor_h);
            let whole = (span / texh).trunc();
            if span % texh != 0.0 { whole + 1.0 } else { whole }
        } else {
            1.0
        };
        let tall = texh * repeats;

        let polyseg = ctx.seg.polyobj.is_some();
        let (open_top, open_bottom) = if polyseg {
            (back.ceil_h, back.floor_h)
        } else {
            (h.top.min(h.high), h.bottom.max(h.low))
        };

        let peg_bottom =
            fl.contains(LinedefFlags::DONT_PEG_BOTTOM) ^ fl.contains(LinedefFlags::EFFECT3);
        let y_off = ctx.side.y_off;

        let (mut poly_top, mut poly_bottom) = if fl.contains(LinedefFlags::EFFECT2) {
            if peg_bottom {
                let b = front.floor_h.max(back.floor_h) + y_off;
                (b + tall, b)
            } else {
                let t = front.ceil_h.min(back.ceil_h) + y_off;
                (t, t - tall)
            }
        } else if peg_bottom {
            let b = open_bottom + y_off;
            (b + tall, b)
        } else {
            let t = open_top + y_off;
            (t, t - tall)
        };

        let (mut low_cut, mut high_cut) = if polyseg {
            (poly_bottom, poly_top)
        } else {
            (open_bottom, open_top)
        };

        let vpeg_of = |hi: f32, poly_top: f32, poly_bottom: f32| {
            if peg_bottom {
                tall - hi + poly_bottom
            } else {
                poly_top - hi
            }
        };

        let mut q = self.base_quad();
        let top = high_cut.min(poly_top);
        let bottom = poly_bottom.max(low_cut);
        let vpeg = vpeg_of(top, poly_top, poly_bottom);
        {
            let v = &mut q.0;
            v[TL].t = vpeg * sy;
            v[TR].t = vpeg * sy;
            v[BL].t = (top - bottom + vpeg) * sy;
            v[BR].t = v[BL].t;
        }
        q.set_s(self.cliplow * sx, self.cliphigh * sx);
        q.set_heights(bottom, top, bottom, top);

        // the v2 end follows the slopes
        let slant = if fl.contains(LinedefFlags::EFFECT2) {
            0.0
        } else if peg_bottom {
            if h.low < h.bottom {
                h.bottom_e - h.bottom
            } else {
                h.low_e - h.low
            }
        } else if h.top < h.high {
            h.top_e - h.top
        } else {
            h.high_e - h.high
        };
        poly_top += slant;
        poly_bottom += slant;
        high_cut += if h.top < h.high {
            h.top_e - h.top
        } else {
            h.high_e - h.high
        };
        low_cut += if h.low < h.bottom {
            h.bottom_e - h.bottom
        } else {
            h.low_e - h.low
        };

        let top = high_cut.min(poly_top);
        let bottom = poly_bottom.max(low_cut);
        let vpeg = vpeg_of(top, poly_top, poly_bottom);
        q.0[TR].t = vpeg * sy;
        q.0[BR].t = (top - bottom + vpeg) * sy;
        q.0[TR].y = top;
        q.0[BR].y = bottom;

        // blend
        let line = ctx.line;
        let mut surf = SurfaceInfo::opaque();
        let styled = line.blend != BlendStyle::Copy && line.blend != BlendStyle::Fog;
        let partial = (0.0..1.0).contains(&line.alpha);
        let mut blend = if LEGACY_TRANSLUCENT.contains(&line.special) {
            if styled {
                surface_blend(line.blend, linedef_trans_table(line.alpha), &mut surf)
            } else {
                PolyFlags::TRANSLUCENT
            }
        } else if styled {
            if partial {
                surface_blend(line.blend, linedef_trans_table(line.alpha), &mut surf)
            } else {
                blend_flag_for_style(line.blend)
            }
        } else if partial {
            transtable_to_alpha(linedef_trans_table(line.alpha), &mut surf)
        } else {
            PolyFlags::MASKED
        };

        if let Some(po) = ctx.seg.polyobj.and_then(|id| level.polyobjs.get(id as usize)) {
            if po.translucency >= NUM_TRANSMAPS {
                return;
            }
            if po.translucency > 0 {
                blend = transtable_to_alpha(po.translucency as i32, &mut surf);
            }
        }
        blend |= PolyFlags::DECAL;

        let route = if !ctx.front.lightlist.is_empty() {
            Route::Split {
                sector: ctx.front_id,
                cut: if blend.contains(PolyFlags::MASKED) {
                    FofFlags::CUT_LEVEL
                } else {
                    FofFlags::TRANSLUCENT
                },
                fof: None,
            }
        } else if !blend.contains(PolyFlags::MASKED) {
            Route::Transparent { fog: false }
        } else {
            Route::Direct
        };
        self.push(q, Some(tex_id), surf.poly.a, blend, route);
    }

    fn two_sided_sky(&mut self, back: &Sector) {
        let level = self.ctx.level;
        let front = self.ctx.front;
        let h = self.h;
        if level.is_sky(front.ceil_tex) && !level.is_sky(back.ceil_tex) {
            self.push_sky(h.top, MAP_TOP, h.top_e, MAP_TOP);
        }
        if level.is_sky(front.floor_tex) && !level.is_sky(back.floor_tex) {
            self.push_sky(MAP_BOTTOM, h.bottom, MAP_BOTTOM, h.bottom_e);
        }
    }

    /*──────────────────────── one-sided lines ───────────────────────*/

    fn one_sided_middle(&mut self) {
        let ctx = self.ctx;
        let tex_id = ctx.side.middle;
        if tex_id == NO_TEXTURE || ctx.line.special == HORIZON_SPECIAL {
            return;
        }
        let front = ctx.front;
        let h = self.h;
        let fl = ctx.line.flags;

        let tex = texture_or_warn(self.bank, tex_id);
        let (texh, sx, sy) = (tex.height(), tex.scale_x(), tex.scale_y());

        let peg = if fl.contains(LinedefFlags::DONT_PEG_BOTTOM | LinedefFlags::EFFECT2) {
            front.floor_h + texh - front.ceil_h + ctx.side.y_off
        } else if fl.contains(LinedefFlags::DONT_PEG_BOTTOM) {
            h.bottom + texh - h.top + ctx.side.y_off
        } else {
            ctx.side.y_off
        };

        let mut q = self.base_quad();
        let v = &mut q.0;
        v[TL].t = peg * sy;
        v[TR].t = peg * sy;
        v[BL].t = (peg + front.ceil_h - front.floor_h) * sy;
        v[BR].t = v[BL].t;

        if fl.contains(LinedefFlags::EFFECT2) {
            v[TL].t += (front.ceil_h - h.top) * sy;
            v[TR].t += (front.ceil_h - h.top_e) * sy;
            v[BL].t += (front.floor_h - h.bottom) * sy;
            v[BR].t += (front.floor_h - h.bottom_e) * sy;
        } else if fl.contains(LinedefFlags::DONT_PEG_BOTTOM) {
            v[TL].t = v[BL].t + (h.bottom - h.top) * sy;
            v[TR].t = v[BR].t + (h.bottom_e - h.top_e) * sy;
        } else {
            v[BL].t = v[TL].t - (h.bottom - h.top) * sy;
            v[BR].t = v[TR].t - (h.bottom_e - h.top_e) * sy;
        }

        q.set_s(self.cliplow * sx, self.cliphigh * sx);
        q.set_heights(h.bottom, h.top, h.bottom_e, h.top_e);
        self.push_strip(q, tex_id, tex.transparent);
    }

    fn one_sided_sky(&mut self) {
        let level = self.ctx.level;
        let front = self.ctx.front;
        let h = self.h;
        if level.is_sky(front.ceil_tex) {
            self.push_sky(h.top, MAP_TOP, h.top_e, MAP_TOP);
        }
        if level.is_sky(front.floor_tex) {
            self.push_sky(MAP_BOTTOM, h.bottom, MAP_BOTTOM, h.bottom_e);
        }
    }

    /*──────────────────────── 3D floor sides ────────────────────────*/

    fn fof_sides(&mut self, back: &Sector) {
        let ctx = self.ctx;
        let (Some(back_id), front) = (ctx.back_id, ctx.front) else {
            return;
        };

        for (index, rover) in back.ffloors.iter().enumerate() {
            if !rover.renders_sides() {
                continue;
            }
            if !rover.flags.contains(FofFlags::ALL_SIDES)
                && rover.flags.contains(FofFlags::INVERT_SIDES)
            {
                continue;
            }
            if front.ffloors.iter().any(|r| r.master == rover.master) {
                continue;
            }
            let fof = FofRef {
                sector: back_id,
                index: index as u16,
            };
            self.fof_side(rover, fof, (ctx.front_id, front), true);
        }

        for (index, rover) in front.ffloors.iter().enumerate() {
            if !rover.renders_sides() {
                continue;
            }
            if !rover
                .flags
                .intersects(FofFlags::ALL_SIDES | FofFlags::INVERT_SIDES)
            {
                continue;
            }
            if back.ffloors.iter().any(|r| r.master == rover.master) {
                continue;
            }
            let fof = FofRef {
                sector: ctx.front_id,
                index: index as u16,
            };
            self.fof_side(rover, fof, (back_id, back), false);
        }
    }

    /// Line in the control sector matching this seg's line, for FOFs that
    /// take their side textures per line. The match is by position in the
    /// back sector's line list, whichever side the FOF is on.
    fn transfer_line(&self, master: &Linedef) -> Option<&'a Linedef> {
        let level = self.ctx.level;
        let ctrl = level.sectors.get(master.front_sector as usize)?;
        let first_ctrl = *ctrl.lines.first()? as i64;
        let first_back = *self.ctx.back?.lines.first()? as i64;
        let id = first_ctrl + (self.ctx.seg.linedef as i64 - first_back);
        level.linedefs.get(usize::try_from(id).ok()?)
    }

    fn fof_side(
        &mut self,
        rover: &FFloor,
        fof: FofRef,
        (split_id, split_sector): (SectorId, &Sector),
        from_back: bool,
    ) {
        let ctx = self.ctx;
        let level = ctx.level;
        let h = self.h;
        let (v1, v2) = (ctx.v1, ctx.v2);

        let low_cut = h.bottom.max(h.low);
        let high_cut = h.top.min(h.high);
        let low_cut_e = h.bottom_e.max(h.low_e);
        let high_cut_e = h.top_e.min(h.high_e);

        let (mut top, mut top_e) = (rover.top_at(v1), rover.top_at(v2));
        let (mut bottom, mut bottom_e) = (rover.bottom_at(v1), rover.bottom_at(v2));
        if (top < low_cut && top_e < low_cut_e) || (bottom > high_cut && bottom_e > high_cut_e) {
            return;
        }

        let Some(master) = level.linedefs.get(rover.master as usize) else {
            return;
        };
        let side_of = move |l: &Linedef| {
            l.right_sidedef
                .and_then(|sd| level.sidedefs.get(sd as usize))
        };
        let Some(master_side) = side_of(master) else {
            return;
        };

        let newline = if master.flags.contains(LinedefFlags::TFER_LINE) {
            self.transfer_line(master)
                .and_then(|nl| side_of(nl).map(|sd| (nl, sd)))
        } else {
            None
        };
        let tex_id = newline.map_or(master_side.middle, |(_, sd)| sd.middle);

        if top >= high_cut && top_e >= high_cut_e {
            top = high_cut;
            top_e = high_cut_e;
        }
        if bottom <= low_cut && bottom_e <= low_cut_e {
            bottom = low_cut;
            bottom_e = low_cut_e;
        }

        let mut q = self.base_quad();
        q.set_heights(bottom, top, bottom_e, top_e);

        let fog = rover.flags.contains(FofFlags::FOG);
        if fog {
            q.clear_st();
        } else {
            let tex = texture_or_warn(self.bank, tex_id);
            let (sx, sy) = (tex.scale_x(), tex.scale_y());
            let v = &mut q.0;
            if from_back {
                let (mut vpeg, attach_bottom, skew) = match newline {
                    Some((nl, sd)) => (
                        sd.y_off,
                        nl.flags.contains(LinedefFlags::DONT_PEG_BOTTOM),
                        nl.flags.contains(LinedefFlags::DONT_PEG_TOP),
                    ),
                    None => (
                        master_side.y_off,
                        ctx.line.flags.contains(LinedefFlags::DONT_PEG_BOTTOM),
                        master.flags.contains(LinedefFlags::DONT_PEG_TOP),
                    ),
                };
                if !skew {
                    if attach_bottom {
                        vpeg -= rover.top_h - rover.bottom_h;
                    }
                    v[TL].t = (rover.top_h - top + vpeg) * sy;
                    v[TR].t = (rover.top_h - top_e + vpeg) * sy;
                    v[BL].t = (rover.top_h - bottom + vpeg) * sy;
                    v[BR].t = (rover.top_h - bottom_e + vpeg) * sy;
                } else if !attach_bottom {
                    v[TL].t = vpeg * sy;
                    v[TR].t = vpeg * sy;
                    v[BL].t = (top - bottom + vpeg) * sy;
                    v[BR].t = (top_e - bottom_e + vpeg) * sy;
                } else {
                    v[BL].t = vpeg * sy;
                    v[BR].t = vpeg * sy;
                    v[TL].t = v[BL].t - (top - bottom) * sy;
                    v[TR].t = v[BR].t - (top_e - bottom_e) * sy;
                }
            } else {
                let y_off = newline.map_or(master_side.y_off, |(_, sd)| sd.y_off);
                let start = rover.top_h - top + y_off;
                v[TL].t = start * sy;
                v[TR].t = start * sy;
                v[BL].t = (top - bottom + start) * sy;
                v[BR].t = v[BL].t;
            }
            q.set_s(self.cliplow * sx, self.cliphigh * sx);
        }

        let splits = !split_sector.lightlist.is_empty();
        let (light, colormap) = (self.light, self.colormap);

        if fog {
            let ctrl = level.sectors.get(master.front_sector as usize);
            let ctrl_light = ctrl.map_or(255, |s| s.light);
            let ctrl_cm = ctrl.and_then(|s| s.colormap);
            self.light = if ctrl_cm.is_some() {
                ctrl_light
            } else {
                wall_light(ctrl_light, v1, v2, self.opts.fake_contrast)
            };
            self.colormap = ctrl_cm;
            let alpha = fog_block_alpha(ctrl_light, level.colormap(ctrl_cm), self.opts.shaders);
            let flags = PolyFlags::FOG | PolyFlags::NO_TEXTURE;
            let route = if splits {
                Route::Split {
                    sector: split_id,
                    cut: rover.flags,
                    fof: Some(fof),
                }
            } else {
                Route::Transparent { fog: true }
            };
            self.push(q, None, alpha, flags, route);
        } else {
            let mut flags = PolyFlags::MASKED;
            let mut alpha = 255;
            if (rover.flags.contains(FofFlags::TRANSLUCENT) && rover.alpha < 256)
                || rover.blend != BlendStyle::Copy
            {
                flags = if rover.blend != BlendStyle::Copy {
                    blend_flag_for_style(rover.blend)
                } else {
                    PolyFlags::TRANSLUCENT
                };
                alpha = fof_alpha(rover.alpha);
            }
            let route = if splits {
                Route::Split {
                    sector: split_id,
                    cut: rover.flags,
                    fof: Some(fof),
                }
            } else if flags != PolyFlags::MASKED {
                Route::Transparent { fog: false }
            } else {
                Route::Direct
            };
            self.push(q, Some(tex_id), alpha, flags, route);
        }

        self.light = light;
        self.colormap = colormap;
    }
}
