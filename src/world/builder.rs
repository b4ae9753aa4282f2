//! Programmatic map construction.
//!
//! Map loading lives outside this crate; `LevelBuilder` is how tests and
//! the headless binary put a `Level` together by hand.

use glam::{Vec2, vec2};

use crate::world::{
    bsp::SUBSECTOR_BIT,
    colormap::{ColormapId, ExtraColormap},
    geometry::{
        Aabb, Level, Linedef, LinedefFlags, LinedefId, Node, Sector, SectorId, Seg, Sidedef,
        SubsectorId, Subsector, Thing, VertexId, Vertex, BlendStyle,
    },
    texture::{Texture, TextureBank, TextureId},
};

pub struct LevelBuilder {
    level: Level,
}

impl LevelBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            level: Level {
                name: name.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn sky(&mut self, sky_flat: TextureId, sky_texture: TextureId) -> &mut Self {
        self.level.sky_flat = sky_flat;
        self.level.sky_texture = sky_texture;
        self
    }

    pub fn sector(&mut self, sector: Sector) -> SectorId {
        self.level.sectors.push(sector);
        (self.level.sectors.len() - 1) as SectorId
    }

    pub fn sector_mut(&mut self, id: SectorId) -> &mut Sector {
        &mut self.level.sectors[id as usize]
    }

    pub fn colormap(&mut self, cm: ExtraColormap) -> ColormapId {
        self.level.colormaps.push(cm);
        (self.level.colormaps.len() - 1) as ColormapId
    }

    /// Shared vertices are de-duplicated by exact position.
    pub fn vertex(&mut self, p: Vec2) -> VertexId {
        if let Some(i) = self.level.vertices.iter().position(|v| v.pos == p) {
            return i as VertexId;
        }
        self.level.vertices.push(Vertex { pos: p });
        (self.level.vertices.len() - 1) as VertexId
    }

    /// Add a line from `a` to `b`. The front side lies to the right of the
    /// direction of travel.
    pub fn line(&mut self, a: Vec2, b: Vec2, front: Sidedef, back: Option<Sidedef>) -> LinedefId {
        let v1 = self.vertex(a);
        let v2 = self.vertex(b);
        let id = self.level.linedefs.len() as LinedefId;

        let front_sector = front.sector;
        let back_sector = back.as_ref().map(|s| s.sector);
        self.level.sidedefs.push(front);
        let right = Some((self.level.sidedefs.len() - 1) as u16);
        let left = back.map(|sd| {
            self.level.sidedefs.push(sd);
            (self.level.sidedefs.len() - 1) as u16
        });

        let mut flags = LinedefFlags::empty();
        if back_sector.is_some() {
            flags |= LinedefFlags::TWO_SIDED;
        }
        self.level.linedefs.push(Linedef {
            v1,
            v2,
            flags,
            special: 0,
            right_sidedef: right,
            left_sidedef: left,
            front_sector,
            back_sector,
            blend: BlendStyle::Copy,
            alpha: 1.0,
        });

        self.level.sectors[front_sector as usize].lines.push(id);
        if let Some(bs) = back_sector {
            if bs != front_sector {
                self.level.sectors[bs as usize].lines.push(id);
            }
        }
        id
    }

    pub fn line_mut(&mut self, id: LinedefId) -> &mut Linedef {
        &mut self.level.linedefs[id as usize]
    }

    /// Close a convex leaf out of `(line, side)` pairs listed clockwise.
    pub fn subsector(&mut self, sector: SectorId, segs: &[(LinedefId, u16)]) -> SubsectorId {
        let first_seg = self.level.segs.len() as u16;
        let mut polygon = Vec::with_capacity(segs.len());
        for &(line, dir) in segs {
            let ld = &self.level.linedefs[line as usize];
            let (v1, v2) = if dir == 0 { (ld.v1, ld.v2) } else { (ld.v2, ld.v1) };
            let a = self.level.vertices[v1 as usize].pos;
            let b = self.level.vertices[v2 as usize].pos;
            polygon.push(a);
            self.level.segs.push(Seg {
                v1,
                v2,
                linedef: line,
                dir,
                offset: 0.0,
                length: a.distance(b),
                polyobj: None,
            });
        }
        self.level.subsectors.push(Subsector {
            seg_count: segs.len() as u16,
            first_seg,
            sector,
            polygon,
        });
        (self.level.subsectors.len() - 1) as SubsectorId
    }

    pub fn node(&mut self, node: Node) -> u16 {
        self.level.nodes.push(node);
        (self.level.nodes.len() - 1) as u16
    }

    pub fn thing(&mut self, thing: Thing) -> &mut Self {
        self.level.things.push(thing);
        self
    }

    pub fn build(self) -> Level {
        self.level
    }
}

/*──────────────────────── ready-made maps ───────────────────────────*/

pub const WALL_TEX: TextureId = 1;
pub const FLAT_TEX: TextureId = 2;
pub const SKY_FLAT: TextureId = 3;
pub const SKY_TEX: TextureId = 4;
pub const GRATE_TEX: TextureId = 5;

/// Bank holding the textures the ready-made maps refer to.
pub fn demo_bank() -> TextureBank {
    let mut bank = TextureBank::default_with_checker();
    let grate = Texture {
        transparent: true,
        ..Texture::solid("GRATE", 64, 64, 0)
    };
    for (name, tex) in [
        ("WALL", Texture::solid("WALL", 64, 128, 96)),
        ("FLAT", Texture::solid("FLAT", 64, 64, 112)),
        ("F_SKY1", Texture::solid("F_SKY1", 64, 64, 200)),
        ("SKY1", Texture::solid("SKY1", 256, 128, 200)),
        ("GRATE", grate),
    ] {
        // names are unique
        let _ = bank.insert(name, tex);
    }
    bank
}

pub fn room_sector(floor_h: f32, ceil_h: f32, light: i32) -> Sector {
    Sector {
        floor_h,
        ceil_h,
        floor_tex: FLAT_TEX,
        ceil_tex: FLAT_TEX,
        light,
        ..Default::default()
    }
}

pub fn wall_side(sector: SectorId) -> Sidedef {
    Sidedef {
        middle: WALL_TEX,
        sector,
        ..Default::default()
    }
}

fn square(b: &mut LevelBuilder, x0: f32, sector: SectorId) -> [LinedefId; 3] {
    let s = 128.0;
    [
        b.line(vec2(x0, 0.0), vec2(x0, s), wall_side(sector), None),
        b.line(vec2(x0, s), vec2(x0 + s, s), wall_side(sector), None),
        b.line(vec2(x0 + s, 0.0), vec2(x0, 0.0), wall_side(sector), None),
    ]
}

/// One closed 128×128 room, floor 0, ceiling 128, full bright.
pub fn single_room_level() -> Level {
    let mut b = LevelBuilder::new("ROOM");
    b.sky(SKY_FLAT, SKY_TEX);
    let s = b.sector(room_sector(0.0, 128.0, 255));
    let [west, north, south] = square(&mut b, 0.0, s);
    let east = b.line(vec2(128.0, 128.0), vec2(128.0, 0.0), wall_side(s), None);
    b.subsector(s, &[(west, 0), (north, 0), (east, 0), (south, 0)]);
    b.build()
}

/// Two 128×128 rooms side by side joined by a two-sided line at x = 128.
/// The east room has a lower ceiling and a raised floor so the shared line
/// shows upper and lower strips from the west.
pub fn two_room_level() -> Level {
    let mut b = LevelBuilder::new("TWOROOM");
    b.sky(SKY_FLAT, SKY_TEX);
    let west = b.sector(room_sector(0.0, 128.0, 200));
    let east = b.sector(room_sector(16.0, 96.0, 160));

    let [w0, w1, w2] = square(&mut b, 0.0, west);
    let shared = b.line(
        vec2(128.0, 128.0),
        vec2(128.0, 0.0),
        Sidedef {
            upper: WALL_TEX,
            lower: WALL_TEX,
            sector: west,
            ..Default::default()
        },
        Some(Sidedef {
            sector: east,
            ..Default::default()
        }),
    );
    let e0 = b.line(vec2(128.0, 128.0), vec2(256.0, 128.0), wall_side(east), None);
    let e1 = b.line(vec2(256.0, 128.0), vec2(256.0, 0.0), wall_side(east), None);
    let e2 = b.line(vec2(256.0, 0.0), vec2(128.0, 0.0), wall_side(east), None);

    let ss_west = b.subsector(west, &[(w0, 0), (w1, 0), (shared, 0), (w2, 0)]);
    let ss_east = b.subsector(east, &[(shared, 1), (e0, 0), (e1, 0), (e2, 0)]);

    b.node(Node {
        x: 128.0,
        y: 0.0,
        dx: 0.0,
        dy: 128.0,
        bbox: [
            Aabb {
                min: vec2(128.0, 0.0),
                max: vec2(256.0, 128.0),
            },
            Aabb {
                min: vec2(0.0, 0.0),
                max: vec2(128.0, 128.0),
            },
        ],
        child: [SUBSECTOR_BIT | ss_east, SUBSECTOR_BIT | ss_west],
    });
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_vertices_are_reused() {
        let lvl = single_room_level();
        assert_eq!(lvl.vertices.len(), 4);
        assert_eq!(lvl.segs.len(), 4);
        assert_eq!(lvl.sectors[0].lines.len(), 4);
    }

    #[test]
    fn back_side_seg_runs_reversed() {
        let lvl = two_room_level();
        let seg = &lvl.segs[lvl.segs_of_subsector(1).start as usize];
        assert_eq!(seg.dir, 1);
        assert_eq!(lvl.vertices[seg.v1 as usize].pos, vec2(128.0, 0.0));
        let (front, back) = lvl.seg_sectors(seg);
        assert_eq!((front, back), (1, Some(0)));
        assert_eq!(seg.length, 128.0);
    }

    #[test]
    fn demo_bank_ids_line_up() {
        let bank = demo_bank();
        assert_eq!(bank.id("WALL"), Some(WALL_TEX));
        assert_eq!(bank.id("GRATE"), Some(GRATE_TEX));
        assert!(bank.texture(GRATE_TEX).unwrap().transparent);
    }
}
