//! Cutting a wall along a sector's light list.
//!
//! Every band of the list lights the part of the wall between its own
//! height and the next band's. Bands cast by solid 3D floors also hide
//! the part of the wall inside the floor.

use glam::{Vec2, vec2};

use crate::{
    config::FakeContrast,
    engine::{
        lighting::wall_light,
        walls::{Route, WallPiece, WallPieces},
    },
    renderer::{BL, BR, PolyFlags, TL, TR},
    world::{ColormapId, FofFlags, FofRef, LightBand, Level, Sector, SectorId},
};

/// Split `piece` against the light list of `sector_id`.
///
/// `cut` is the cutting behaviour of the thing being drawn (an FOF's flags
/// for FOF sides, [`FofFlags::CUT_LEVEL`] for ordinary walls) and `fof` the
/// FOF itself when a fog side is split. The returned pieces are routed
/// [`Route::Direct`] or [`Route::Transparent`].
pub fn split_wall(
    level: &Level,
    sector_id: SectorId,
    cut: FofFlags,
    fof: Option<FofRef>,
    piece: &WallPiece,
    fake_contrast: FakeContrast,
) -> WallPieces {
    let mut out = WallPieces::new();
    let Some(sector) = level.sectors.get(sector_id as usize) else {
        return out;
    };

    let q = &piece.quad.0;
    let v1 = vec2(q[BL].x, q[BL].z);
    let v2 = vec2(q[BR].x, q[BR].z);

    let (real_top, end_real_top) = (q[TL].y, q[TR].y);
    let (real_bot, end_real_bot) = (q[BL].y, q[BR].y);
    let (mut top, mut end_top) = (real_top, end_real_top);

    let peg_t = q[TL].t;
    let end_peg_t = q[TR].t;
    let peg_mul = slope_of(q[BL].t - peg_t, real_top - real_bot);
    let end_peg_mul = slope_of(q[BR].t - end_peg_t, end_real_top - end_real_bot);

    // fog sides take their light from the fog's control sector
    let fog_ctrl = fof
        .filter(|_| cut.contains(FofFlags::FOG))
        .and_then(|r| level.ffloor(r))
        .and_then(|f| level.linedefs.get(f.master as usize))
        .and_then(|l| level.sectors.get(l.front_sector as usize));

    let mut light = wall_light(sector.light, v1, v2, fake_contrast);
    let mut colormap: Option<ColormapId> = None;

    let mut emit = |top: f32, end_top: f32, bot: f32, end_bot: f32, light: i32, colormap| {
        let mut p = WallPiece {
            light,
            colormap,
            ..piece.clone()
        };
        let v = &mut p.quad.0;
        v[TL].t = peg_t + (real_top - top) * peg_mul;
        v[TR].t = end_peg_t + (end_real_top - end_top) * end_peg_mul;
        v[BL].t = peg_t + (real_top - bot) * peg_mul;
        v[BR].t = end_peg_t + (end_real_top - end_bot) * end_peg_mul;
        p.quad.set_heights(bot, top, end_bot, end_top);

        if cut.contains(FofFlags::FOG) {
            p.texture = None;
            p.flags |= PolyFlags::FOG | PolyFlags::NO_TEXTURE;
            p.route = Route::Transparent { fog: true };
        } else if p.flags.intersects(PolyFlags::BLENDED) {
            p.route = Route::Transparent { fog: false };
        } else {
            p.flags |= PolyFlags::MASKED;
            p.route = Route::Direct;
        }
        out.push(p);
    };

    let bands = &sector.lightlist;
    for (i, band) in bands.iter().enumerate() {
        if end_top < end_real_bot && top < real_bot {
            return out;
        }

        if !band.flags.contains(FofFlags::NO_SHADE) {
            let (l, cm) = match fog_ctrl {
                Some(ctrl) => (ctrl.light, ctrl.colormap),
                None => (band.light, band.colormap),
            };
            colormap = cm;
            light = if cm.is_some() {
                l
            } else {
                wall_light(l, v1, v2, fake_contrast)
            };
        }

        let (height, end_height) = (band.z_at(v1), band.z_at(v2));
        if height >= top && end_height >= end_top {
            if let Some((b, end_b)) = solid_bottom(level, band, cut, v1, v2) {
                top = top.min(b);
                end_top = end_top.min(end_b);
            }
        }

        let (b_height, end_b_height) = match bands.get(i + 1) {
            Some(next) => (next.z_at(v1), next.z_at(v2)),
            None => (real_bot, end_real_bot),
        };
        if b_height >= top && end_b_height >= end_top {
            continue;
        }

        let bot = b_height.max(real_bot);
        let end_bot = end_b_height.max(end_real_bot);
        emit(top, end_top, bot, end_bot, light, colormap);
        top = bot;
        end_top = end_bot;
    }

    if end_top <= end_real_bot && top <= real_bot {
        return out;
    }
    emit(top, end_top, real_bot, end_real_bot, light, colormap);
    out
}

fn slope_of(dt: f32, dy: f32) -> f32 {
    if dy == 0.0 { 0.0 } else { dt / dy }
}

/// Bottom of the solid FOF casting `band`, if the band cuts what is being
/// drawn.
fn solid_bottom(
    level: &Level,
    band: &LightBand,
    cut: FofFlags,
    v1: Vec2,
    v2: Vec2,
) -> Option<(f32, f32)> {
    let solid = if band.flags.contains(FofFlags::CUT_SOLIDS) && !cut.contains(FofFlags::EXTRA) {
        true
    } else if band.flags.contains(FofFlags::CUT_EXTRA) && cut.contains(FofFlags::EXTRA) {
        let kind = FofFlags::FOG | FofFlags::SWIMMABLE;
        !band.flags.contains(FofFlags::EXTRA) || band.flags & kind == cut & kind
    } else {
        false
    };
    if !solid {
        return None;
    }
    let caster = level.ffloor(band.caster?)?;
    Some((caster.bottom_at(v1), caster.bottom_at(v2)))
}

/// Light of the band covering height `z` at `p`, the way a plane or sprite
/// in the sector is lit.
pub fn band_light_at(sector: &Sector, p: Vec2, z: f32) -> Option<(i32, Option<ColormapId>)> {
    sector
        .lightlist
        .iter()
        .rev()
        .find(|band| band.z_at(p) >= z)
        .or_else(|| sector.lightlist.first())
        .map(|band| (band.light, band.colormap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        renderer::WallQuad,
        world::{FFloor, Slope, builder::single_room_level},
    };
    use glam::vec3;

    fn wall() -> WallPiece {
        let mut quad = WallQuad::on_segment(vec2(0.0, 0.0), vec2(0.0, 128.0));
        quad.set_heights(0.0, 128.0, 0.0, 128.0);
        quad.0[BL].t = 1.0;
        quad.0[BR].t = 1.0;
        WallPiece {
            quad,
            texture: Some(1),
            alpha: 255,
            flags: PolyFlags::empty(),
            light: 0,
            colormap: None,
            route: Route::Split {
                sector: 0,
                cut: FofFlags::CUT_LEVEL,
                fof: None,
            },
        }
    }

    fn band(height: f32, light: i32) -> LightBand {
        LightBand {
            height,
            light,
            ..Default::default()
        }
    }

    fn split(level: &Level, cut: FofFlags) -> WallPieces {
        split_wall(level, 0, cut, None, &wall(), FakeContrast::Off)
    }

    fn spans(pieces: &WallPieces) -> Vec<(f32, f32, i32)> {
        pieces
            .iter()
            .map(|p| (p.quad.0[BL].y, p.quad.0[TL].y, p.light))
            .collect()
    }

    #[test]
    fn bands_cover_the_wall_without_gaps() {
        let mut level = single_room_level();
        level.sectors[0].lightlist = vec![band(128.0, 200), band(64.0, 100)];
        let pieces = split(&level, FofFlags::CUT_LEVEL);
        assert_eq!(spans(&pieces), vec![(64.0, 128.0, 200), (0.0, 64.0, 100)]);

        // texture coordinates re-interpolated at the cut
        assert_eq!(pieces[0].quad.0[BL].t, 0.5);
        assert_eq!(pieces[1].quad.0[TL].t, 0.5);
        assert_eq!(pieces[1].quad.0[BL].t, 1.0);
        for p in &pieces {
            assert_eq!(p.route, Route::Direct);
            assert_eq!(p.flags, PolyFlags::MASKED);
        }
    }

    #[test]
    fn band_above_the_wall_is_skipped() {
        let mut level = single_room_level();
        level.sectors[0].lightlist = vec![band(256.0, 50), band(128.0, 180)];
        let pieces = split(&level, FofFlags::CUT_LEVEL);
        assert_eq!(spans(&pieces), vec![(0.0, 128.0, 180)]);
    }

    #[test]
    fn no_shade_band_keeps_previous_light() {
        let mut level = single_room_level();
        let mut dark = band(64.0, 10);
        dark.flags = FofFlags::NO_SHADE;
        level.sectors[0].lightlist = vec![band(128.0, 200), dark];
        let pieces = split(&level, FofFlags::CUT_LEVEL);
        assert_eq!(spans(&pieces), vec![(64.0, 128.0, 200), (0.0, 64.0, 200)]);
    }

    #[test]
    fn solid_floor_hides_the_wall_inside_it() {
        let mut level = single_room_level();
        level.sectors[0].ffloors.push(FFloor {
            top_h: 96.0,
            bottom_h: 64.0,
            ..Default::default()
        });
        let mut cast = band(96.0, 120);
        cast.flags = FofFlags::CUT_SOLIDS;
        cast.caster = Some(FofRef {
            sector: 0,
            index: 0,
        });
        level.sectors[0].lightlist = vec![band(128.0, 200), cast];

        let pieces = split(&level, FofFlags::CUT_LEVEL);
        assert_eq!(spans(&pieces), vec![(96.0, 128.0, 200), (0.0, 64.0, 120)]);

        // extra cuts only see CUT_EXTRA bands
        let pieces = split(&level, FofFlags::EXTRA);
        assert_eq!(spans(&pieces), vec![(96.0, 128.0, 200), (0.0, 96.0, 120)]);
    }

    #[test]
    fn fog_and_blended_pieces_are_deferred() {
        let mut level = single_room_level();
        level.sectors[0].lightlist = vec![band(128.0, 200)];

        let pieces = split(&level, FofFlags::FOG);
        assert_eq!(pieces[0].route, Route::Transparent { fog: true });
        assert!(pieces[0].flags.contains(PolyFlags::FOG | PolyFlags::NO_TEXTURE));
        assert_eq!(pieces[0].texture, None);

        let mut glass = wall();
        glass.flags = PolyFlags::TRANSLUCENT;
        let pieces = split_wall(&level, 0, FofFlags::CUT_LEVEL, None, &glass, FakeContrast::Off);
        assert_eq!(pieces[0].route, Route::Transparent { fog: false });
        assert_eq!(pieces[0].flags, PolyFlags::TRANSLUCENT);
    }

    #[test]
    fn plane_light_comes_from_the_covering_band() {
        let mut s = Sector::default();
        s.lightlist = vec![band(128.0, 200), band(64.0, 100)];
        assert_eq!(band_light_at(&s, Vec2::ZERO, 100.0), Some((200, None)));
        assert_eq!(band_light_at(&s, Vec2::ZERO, 10.0), Some((100, None)));
        assert_eq!(band_light_at(&s, Vec2::ZERO, 500.0), Some((200, None)));
        assert_eq!(band_light_at(&Sector::default(), Vec2::ZERO, 0.0), None);
    }

    /// Heights and `t` of (v1 bottom, v1 top, v2 bottom, v2 top).
    fn edges(p: &WallPiece) -> [(f32, f32); 4] {
        let v = &p.quad.0;
        [BL, TL, BR, TR].map(|i| (v[i].y, v[i].t))
    }

    #[test]
    fn sloped_band_cuts_meet_exactly() {
        let mut level = single_room_level();
        // 48 at v1 (y = 0), 80 at v2 (y = 128)
        let sloped = LightBand {
            slope: Some(Slope::new(vec3(0.0, 0.0, 48.0), vec2(0.0, 0.25))),
            ..band(48.0, 100)
        };
        level.sectors[0].lightlist = vec![band(128.0, 200), sloped];

        let pieces = split(&level, FofFlags::CUT_LEVEL);
        assert_eq!(pieces.len(), 2);
        let (upper, lower) = (edges(&pieces[0]), edges(&pieces[1]));
        assert_eq!(upper, [(48.0, 0.625), (128.0, 0.0), (80.0, 0.375), (128.0, 0.0)]);
        assert_eq!(lower, [(0.0, 1.0), (48.0, 0.625), (0.0, 1.0), (80.0, 0.375)]);

        // each cut is shared by both pieces at both ends
        assert_eq!(upper[0], lower[1]);
        assert_eq!(upper[2], lower[3]);
        assert_eq!((lower[0].0, upper[1].0), (0.0, 128.0));
        assert_eq!((lower[2].0, upper[3].0), (0.0, 128.0));
    }

    #[test]
    fn skewed_wall_reinterpolates_each_end() {
        let mut level = single_room_level();
        level.sectors[0].lightlist = vec![band(128.0, 200), band(64.0, 100)];

        let mut skewed = wall();
        skewed.quad.set_heights(0.0, 128.0, 32.0, 96.0);
        skewed.quad.0[TR].t = 0.25;
        skewed.quad.0[BR].t = 0.75;
        let pieces =
            split_wall(&level, 0, FofFlags::CUT_LEVEL, None, &skewed, FakeContrast::Off);

        assert_eq!(spans(&pieces), vec![(64.0, 128.0, 200), (0.0, 64.0, 100)]);
        assert_eq!(
            edges(&pieces[0]),
            [(64.0, 0.5), (128.0, 0.0), (64.0, 0.5), (96.0, 0.25)]
        );
        assert_eq!(
            edges(&pieces[1]),
            [(0.0, 1.0), (64.0, 0.5), (32.0, 0.75), (64.0, 0.5)]
        );
    }
}
