pub mod bsp;
pub mod builder;
mod camera;
pub mod colormap;
pub mod ffloor;
mod geometry;
pub mod slope;
mod texture;

pub use geometry::{
    Aabb, BlendStyle, Level, Linedef, LinedefFlags, LinedefId, Node, Polyobj, PolyobjId, Sector,
    SectorId, Seg, SegmentId, Sidedef, SidedefId, Subsector, SubsectorId, Thing, ThingId, Vertex,
    VertexId,
};

pub use builder::LevelBuilder;
pub use camera::Camera;
pub use colormap::{ColormapId, ExtraColormap};
pub use ffloor::{FFloor, FofFlags, FofRef, LightBand};
pub use slope::Slope;

pub use texture::{
    COLORMAP_ROWS, Colormap, NO_TEXTURE, Texture, TextureBank, TextureError, TextureId,
};
