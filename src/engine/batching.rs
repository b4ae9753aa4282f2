//! Polygon batching.
//!
//! While active, polygons are collected instead of drawn. `flush` orders
//! them by render state (shader, texture, blend flags, surface colors) and
//! submits each run of equal state as one indexed triangle list.

use log::trace;

use crate::{
    renderer::{Driver, OutVertex, PolyFlags, ShaderKind, SurfaceInfo},
    world::TextureId,
};

#[derive(Clone, Copy, Debug)]
struct Pending {
    surf: SurfaceInfo,
    flags: PolyFlags,
    texture: Option<TextureId>,
    shader: Option<ShaderKind>,
    first: usize,
    count: usize,
}

type StateKey = (
    Option<ShaderKind>,
    Option<TextureId>,
    PolyFlags,
    [u32; 4],
    [u8; 3],
);

impl Pending {
    fn key(&self) -> StateKey {
        let s = &self.surf;
        (
            self.shader,
            self.texture,
            self.flags,
            [s.poly.packed(), s.tint.packed(), s.fade.packed(), s.light_table],
            [s.light.light_level, s.light.fade_start, s.light.fade_end],
        )
    }
}

/// What one flush submitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub polygons: usize,
    pub draw_calls: usize,
}

#[derive(Debug, Default)]
pub struct Batcher {
    active: bool,
    polys: Vec<Pending>,
    verts: Vec<OutVertex>,
}

impl Batcher {
    pub fn start(&mut self) {
        self.active = true;
        self.polys.clear();
        self.verts.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn len(&self) -> usize {
        self.polys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polys.is_empty()
    }

    pub fn add(
        &mut self,
        surf: &SurfaceInfo,
        verts: &[OutVertex],
        flags: PolyFlags,
        texture: Option<TextureId>,
        shader: Option<ShaderKind>,
    ) {
        if verts.len() < 3 {
            return;
        }
        self.polys.push(Pending {
            surf: *surf,
            flags,
            texture,
            shader,
            first: self.verts.len(),
            count: verts.len(),
        });
        self.verts.extend_from_slice(verts);
    }

    /// Submit everything collected and stop batching.
    pub fn flush<D: Driver + ?Sized>(&mut self, driver: &mut D) -> BatchStats {
        self.active = false;
        let mut stats = BatchStats {
            polygons: self.polys.len(),
            draw_calls: 0,
        };

        // stable, so polygons of one state keep their order
        self.polys.sort_by_key(Pending::key);

        let mut verts = Vec::new();
        let mut indices = Vec::new();
        for run in self.polys.chunk_by(|a, b| a.key() == b.key()) {
            let head = run[0];
            verts.clear();
            indices.clear();
            for p in run {
                let base = verts.len() as u32;
                verts.extend_from_slice(&self.verts[p.first..p.first + p.count]);
                // fan
                for i in 1..p.count as u32 - 1 {
                    indices.extend_from_slice(&[base, base + i, base + i + 1]);
                }
            }

            if let Some(shader) = head.shader {
                driver.set_shader(shader);
            }
            driver.set_texture(head.texture);
            driver.draw_indexed_triangles(&head.surf, &verts, &indices, head.flags);
            stats.draw_calls += 1;
        }
        trace!(
            "batched {} polygons into {} calls",
            stats.polygons, stats.draw_calls
        );

        self.polys.clear();
        self.verts.clear();
        stats
    }
}
