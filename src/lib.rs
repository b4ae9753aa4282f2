//! Hardware scene renderer for BSP-partitioned 2.5D maps.
//!
//! `world` holds the read-only map, `engine` turns it into lit, sorted
//! polygons and `renderer` is the seam to the graphics API.

pub mod config;
pub mod engine;
pub mod error;
pub mod renderer;
pub mod world;

pub use config::RenderConfig;
pub use engine::Engine;
pub use error::RenderError;
