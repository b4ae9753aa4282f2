//! Scene engine: from map data to lit, sorted driver calls.

pub mod batching;
pub mod drawnodes;
mod engine;
pub mod frame;
pub mod lighting;
pub mod planes;
pub mod postprocess;
pub mod split;
pub mod sprites;
pub mod walls;

use log::warn;

pub use engine::{Engine, FrameStats};
pub use frame::{Flash, FrameInfo, PlayerView, PostImage, ViewWindow};
pub use postprocess::{FADE_MASK_SIZES, ResourceLookup};

use crate::{
    error::RenderError,
    world::{Texture, TextureBank, TextureId},
};

/// Texture `id`, or the checkerboard with a warning when the bank has no
/// such texture.
pub(crate) fn texture_or_warn(bank: &TextureBank, id: TextureId) -> &Texture {
    match bank.texture(id) {
        Ok(tex) => tex,
        Err(_) => {
            warn!("{}", RenderError::UnknownTexture(id));
            bank.texture_or_missing(id)
        }
    }
}
