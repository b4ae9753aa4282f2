use crate::world::TextureId;

/// Things that can go wrong while drawing.
///
/// Only [`UnsupportedPixelDepth`](RenderError::UnsupportedPixelDepth) is
/// fatal; the rest are logged and the dependent effect is skipped.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RenderError {
    /// Fade mask found but its byte size matches no known resolution.
    #[error("fade mask `{name}` has bad size {len}")]
    BadFadeMaskSize { name: String, len: usize },

    /// Wipe and screen numbers are two decimal digits each.
    #[error("wipe {wipe} / screen {screen} out of range")]
    BadWipeNumber { wipe: u8, screen: u8 },

    #[error("fade mask `{0}` not found")]
    MissingFadeMask(String),

    #[error("texture {0} not in bank")]
    UnknownTexture(TextureId),

    #[error("unknown bytes per pixel mode {0}")]
    UnsupportedPixelDepth(u8),
}
