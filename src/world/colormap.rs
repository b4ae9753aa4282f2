/// Index into `Level::colormaps`; doubles as the colormap's identity.
pub type ColormapId = u16;

/// Tint + fade pair applied to a region's lighting.
///
/// Colors are packed little-endian RGBA (`0xAABBGGRR`), the layout the
/// map format stores them in.
#[derive(Clone, Debug, Default)]
pub struct ExtraColormap {
    pub rgba: u32,
    pub fade_rgba: u32,
    pub fade_start: u8,
    pub fade_end: u8,
    /// Palette remap used for palette rendering (32 light levels × 256).
    pub table: Vec<u8>,
}
