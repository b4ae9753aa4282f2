//! Floor, ceiling and 3D-floor plane polygons of a subsector.

use glam::Vec2;
use smallvec::SmallVec;

use crate::{
    engine::{
        lighting::{blend_flag_for_style, fog_block_alpha},
        split::band_light_at,
        texture_or_warn,
        walls::fof_alpha,
    },
    renderer::{OutVertex, PolyFlags},
    world::{
        BlendStyle, ColormapId, FFloor, FofFlags, Level, NO_TEXTURE, Sector, SubsectorId,
        TextureBank, TextureId,
    },
};

pub type PlaneVerts = SmallVec<[OutVertex; 8]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaneRoute {
    Direct,
    Transparent { fog: bool },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlanePiece {
    pub verts: PlaneVerts,
    pub height: f32,
    pub texture: Option<TextureId>,
    pub alpha: u8,
    pub flags: PolyFlags,
    pub light: i32,
    pub colormap: Option<ColormapId>,
    pub route: PlaneRoute,
}

/// Which way a plane faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Facing {
    Up,
    Down,
}

/// Every plane of subsector `ss` visible from eye height `view_z`.
pub fn build_subsector_planes(
    level: &Level,
    ss: SubsectorId,
    view_z: f32,
    bank: &TextureBank,
    shaders: bool,
) -> SmallVec<[PlanePiece; 4]> {
    let mut out = SmallVec::new();
    let Some(sub) = level.subsectors.get(ss as usize) else {
        return out;
    };
    let Some(sector) = level.sectors.get(sub.sector as usize) else {
        return out;
    };
    let outline = &sub.polygon;
    if outline.len() < 3 {
        return out;
    }

    let light_at = |z: f32| {
        band_light_at(sector, outline[0], z).unwrap_or((sector.light, sector.colormap))
    };

    if view_z > sector.floor_h && !level.is_sky(sector.floor_tex) {
        let (light, colormap) = light_at(sector.floor_h);
        out.push(PlanePiece {
            verts: plane_verts(outline, |p| sector.floor_at(p), sector.floor_tex, bank, Facing::Up),
            height: sector.floor_h,
            texture: Some(sector.floor_tex),
            alpha: 255,
            flags: PolyFlags::empty(),
            light,
            colormap,
            route: PlaneRoute::Direct,
        });
    }
    if view_z < sector.ceil_h && !level.is_sky(sector.ceil_tex) {
        let (light, colormap) = light_at(sector.ceil_h);
        out.push(PlanePiece {
            verts: plane_verts(outline, |p| sector.ceil_at(p), sector.ceil_tex, bank, Facing::Down),
            height: sector.ceil_h,
            texture: Some(sector.ceil_tex),
            alpha: 255,
            flags: PolyFlags::empty(),
            light,
            colormap,
            route: PlaneRoute::Direct,
        });
    }

    for rover in &sector.ffloors {
        if !rover
            .flags
            .contains(FofFlags::EXISTS | FofFlags::RENDER_PLANES)
        {
            continue;
        }
        let invert = rover.flags.contains(FofFlags::INVERT_PLANES);
        let both = rover.flags.contains(FofFlags::BOTH_PLANES);
        let inside = |h: f32| h >= sector.floor_h && h <= sector.ceil_h;

        let bottom = rover.bottom_h;
        if inside(bottom)
            && ((view_z < bottom && !invert) || (view_z > bottom && (both || invert)))
        {
            let verts = plane_verts(outline, |p| rover.bottom_at(p), rover.bottom_tex, bank, Facing::Down);
            out.push(fof_plane(level, sector, rover, verts, bottom, rover.bottom_tex, shaders));
        }

        let top = rover.top_h;
        if inside(top) && ((view_z > top && !invert) || (view_z < top && (both || invert))) {
            let verts = plane_verts(outline, |p| rover.top_at(p), rover.top_tex, bank, Facing::Up);
            out.push(fof_plane(level, sector, rover, verts, top, rover.top_tex, shaders));
        }
    }
    out
}

fn fof_plane(
    level: &Level,
    sector: &Sector,
    rover: &FFloor,
    verts: PlaneVerts,
    height: f32,
    texture: TextureId,
    shaders: bool,
) -> PlanePiece {
    let at = verts.first().map_or(Vec2::ZERO, |v| Vec2::new(v.x, v.z));
    let (light, colormap) =
        band_light_at(sector, at, height).unwrap_or((sector.light, sector.colormap));

    if rover.flags.contains(FofFlags::FOG) {
        let ctrl = level
            .linedefs
            .get(rover.master as usize)
            .and_then(|l| level.sectors.get(l.front_sector as usize));
        let ctrl_light = ctrl.map_or(light, |s| s.light);
        let ctrl_cm = ctrl.and_then(|s| s.colormap);
        return PlanePiece {
            verts,
            height,
            texture: None,
            alpha: fog_block_alpha(ctrl_light, level.colormap(ctrl_cm), shaders),
            flags: PolyFlags::FOG | PolyFlags::NO_TEXTURE,
            light: ctrl_light,
            colormap: ctrl_cm,
            route: PlaneRoute::Transparent { fog: true },
        };
    }

    let blended = (rover.flags.contains(FofFlags::TRANSLUCENT) && rover.alpha < 256)
        || rover.blend != BlendStyle::Copy;
    let (alpha, flags, route) = if blended {
        let flags = if rover.blend != BlendStyle::Copy {
            blend_flag_for_style(rover.blend)
        } else {
            PolyFlags::TRANSLUCENT
        };
        (fof_alpha(rover.alpha), flags, PlaneRoute::Transparent { fog: false })
    } else {
        (255, PolyFlags::empty(), PlaneRoute::Direct)
    };

    PlanePiece {
        verts,
        height,
        texture: Some(texture),
        alpha,
        flags,
        light,
        colormap,
        route,
    }
}

/// Outline lifted to `z(p)`, textured in world space. Downward-facing
/// planes are wound the other way round.
fn plane_verts(
    outline: &[Vec2],
    z: impl Fn(Vec2) -> f32,
    flat: TextureId,
    bank: &TextureBank,
    facing: Facing,
) -> PlaneVerts {
    let (sx, sy) = if flat == NO_TEXTURE {
        (0.0, 0.0)
    } else {
        let tex = texture_or_warn(bank, flat);
        (tex.scale_x(), tex.scale_y())
    };
    let lift = |&p: &Vec2| OutVertex {
        x: p.x,
        y: z(p),
        z: p.y,
        s: p.x * sx,
        t: -p.y * sy,
    };
    match facing {
        Facing::Up => outline.iter().map(lift).collect(),
        Facing::Down => outline.iter().rev().map(lift).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{
        Linedef, LinedefFlags,
        builder::{FLAT_TEX, SKY_FLAT, demo_bank, single_room_level},
    };

    fn planes(level: &Level, view_z: f32) -> SmallVec<[PlanePiece; 4]> {
        build_subsector_planes(level, 0, view_z, &demo_bank(), true)
    }

    #[test]
    fn floor_and_ceiling_from_inside() {
        let level = single_room_level();
        let ps = planes(&level, 41.0);
        assert_eq!(ps.len(), 2);
        assert_eq!(ps[0].height, 0.0);
        assert_eq!(ps[1].height, 128.0);
        assert!(ps.iter().all(|p| p.verts.len() == 4));
        assert!(ps.iter().all(|p| p.texture == Some(FLAT_TEX)));
        assert_eq!(ps[0].verts[0].s, ps[1].verts[3].s);
        assert!(ps[1].verts.iter().all(|v| v.y == 128.0));
    }

    #[test]
    fn planes_behind_the_eye_are_skipped() {
        let level = single_room_level();
        assert_eq!(planes(&level, 200.0).len(), 1);
        assert_eq!(planes(&level, -10.0).len(), 1);
    }

    #[test]
    fn sky_ceiling_is_left_to_the_sky() {
        let mut level = single_room_level();
        level.sectors[0].ceil_tex = SKY_FLAT;
        let ps = planes(&level, 41.0);
        assert_eq!(ps.len(), 1);
        assert_eq!(ps[0].height, 0.0);
    }

    fn with_fof(flags: FofFlags, alpha: i32) -> Level {
        let mut level = single_room_level();
        level.sectors.push(Sector {
            light: 80,
            ..Default::default()
        });
        level.linedefs.push(Linedef {
            v1: 0,
            v2: 1,
            flags: LinedefFlags::empty(),
            special: 0,
            right_sidedef: None,
            left_sidedef: None,
            front_sector: 1,
            back_sector: None,
            blend: BlendStyle::Copy,
            alpha: 1.0,
        });
        level.sectors[0].ffloors.push(FFloor {
            master: (level.linedefs.len() - 1) as u16,
            top_h: 64.0,
            bottom_h: 32.0,
            top_tex: FLAT_TEX,
            bottom_tex: FLAT_TEX,
            flags,
            alpha,
            ..Default::default()
        });
        level
    }

    #[test]
    fn solid_fof_shows_the_face_toward_the_eye() {
        let level = with_fof(FofFlags::EXISTS | FofFlags::RENDER_PLANES, 256);
        let above: Vec<_> = planes(&level, 100.0).iter().map(|p| p.height).collect();
        assert_eq!(above, vec![0.0, 128.0, 64.0]);
        let below: Vec<_> = planes(&level, 16.0).iter().map(|p| p.height).collect();
        assert_eq!(below, vec![0.0, 128.0, 32.0]);
    }

    #[test]
    fn fog_and_translucent_fof_planes_are_deferred() {
        let fog = with_fof(
            FofFlags::EXISTS | FofFlags::RENDER_PLANES | FofFlags::FOG | FofFlags::BOTH_PLANES,
            256,
        );
        let ps = planes(&fog, 100.0);
        let fofs: Vec<_> = ps.iter().filter(|p| p.height == 32.0 || p.height == 64.0).collect();
        assert_eq!(fofs.len(), 2);
        for p in fofs {
            assert_eq!(p.route, PlaneRoute::Transparent { fog: true });
            assert_eq!(p.light, 80);
            assert_eq!(p.alpha, 255 - 80);
        }

        let glass = with_fof(
            FofFlags::EXISTS | FofFlags::RENDER_PLANES | FofFlags::TRANSLUCENT,
            128,
        );
        let top = planes(&glass, 100.0).pop().unwrap();
        assert_eq!(top.route, PlaneRoute::Transparent { fog: false });
        assert_eq!(top.alpha, 127);
        assert_eq!(top.flags, PolyFlags::TRANSLUCENT);
    }
}
