//! Deferred translucent polygons.
//!
//! The BSP walk runs front to back, which is what depth testing wants for
//! opaque geometry and the opposite of what alpha blending wants. Anything
//! that blends is parked here and drawn after the sprites, far to near.
//! Nodes at the same distance keep their submission order; there is no
//! further tie-break.

use glam::Vec3;
use smallvec::SmallVec;

use crate::{
    engine::walls::WallPiece,
    renderer::{OutVertex, PolyFlags, WallQuad},
    world::{ColormapId, TextureId},
};

#[derive(Clone, Debug, PartialEq)]
pub enum NodeShape {
    Wall(WallQuad),
    /// Convex plane outline at `height`.
    Plane {
        verts: SmallVec<[OutVertex; 8]>,
        height: f32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawNode {
    pub shape: NodeShape,
    pub texture: Option<TextureId>,
    /// Alpha the polygon blends with; lighting does not touch it.
    pub alpha: u8,
    pub flags: PolyFlags,
    pub fog: bool,
    pub light: i32,
    pub colormap: Option<ColormapId>,
    centroid: Vec3,
}

impl DrawNode {
    pub fn verts(&self) -> &[OutVertex] {
        match &self.shape {
            NodeShape::Wall(q) => &q.0,
            NodeShape::Plane { verts, .. } => verts,
        }
    }

    pub fn is_wall(&self) -> bool {
        matches!(self.shape, NodeShape::Wall(_))
    }
}

/// Per-eye buffer of deferred polygons.
#[derive(Debug, Default)]
pub struct DrawNodes {
    nodes: Vec<DrawNode>,
}

impl DrawNodes {
    pub fn add_wall(&mut self, piece: &WallPiece, fog: bool) {
        self.nodes.push(DrawNode {
            centroid: piece.quad.centroid(),
            shape: NodeShape::Wall(piece.quad),
            texture: piece.texture,
            alpha: piece.alpha,
            flags: piece.flags,
            fog,
            light: piece.light,
            colormap: piece.colormap,
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_plane(
        &mut self,
        verts: SmallVec<[OutVertex; 8]>,
        height: f32,
        texture: Option<TextureId>,
        alpha: u8,
        flags: PolyFlags,
        fog: bool,
        light: i32,
        colormap: Option<ColormapId>,
    ) {
        if verts.len() < 3 {
            return;
        }
        let sum = verts
            .iter()
            .fold(Vec3::ZERO, |acc, v| acc + Vec3::new(v.x, v.y, v.z));
        self.nodes.push(DrawNode {
            centroid: sum / verts.len() as f32,
            shape: NodeShape::Plane { verts, height },
            texture,
            alpha,
            flags,
            fog,
            light,
            colormap,
        });
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Empty the buffer, returning its nodes far to near from `view`
    /// (x, height, y, the layout of [`OutVertex`]).
    pub fn take_sorted(&mut self, view: Vec3) -> Vec<DrawNode> {
        let mut nodes = std::mem::take(&mut self.nodes);
        // stable: equal distances stay in submission order
        nodes.sort_by(|a, b| {
            let da = a.centroid.distance_squared(view);
            let db = b.centroid.distance_squared(view);
            db.total_cmp(&da)
        });
        nodes
    }
}
