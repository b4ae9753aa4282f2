// Format-agnostic repository of textures decoded by the asset loader.
// The renderer and world logic interact through `TextureId` only.

use std::collections::HashMap;

/// Runtime handle for a texture in this bank.
///
/// *Guaranteed* to remain stable for the lifetime of the bank.
pub type TextureId = u16;

/// `TextureId` whose pixels are the checkerboard fallback.
/// Always = 0 because `TextureBank::new()` inserts it first. Map data uses
/// the same id to mean "no texture on this side".
pub const NO_TEXTURE: TextureId = 0;

/// Number of light rows in the base colormap.
pub const COLORMAP_ROWS: usize = 34;

/// CPU-side storage: 8-bit palette indices in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub name: String,
    pub w: usize,
    pub h: usize,
    pub pixels: Vec<u8>,
    /// Some texels are see-through; walls using it must be alpha sorted.
    pub transparent: bool,
}

/// Convenience checkerboard 8×8 (dark/light grey).
impl Default for Texture {
    fn default() -> Self {
        const LIGHT_IDX: u8 = 8;
        const DARK_IDX: u8 = 16;
        let mut pix = vec![0u8; 8 * 8];
        for y in 0..8 {
            for x in 0..8 {
                pix[y * 8 + x] = if (x ^ y) & 1 == 0 {
                    LIGHT_IDX
                } else {
                    DARK_IDX
                };
            }
        }
        Texture {
            name: "CHECKER".to_string(),
            w: 8,
            h: 8,
            pixels: pix,
            transparent: false,
        }
    }
}

impl Texture {
    /// Solid texture of one palette index.
    pub fn solid(name: &str, w: usize, h: usize, color: u8) -> Self {
        Self {
            name: name.to_string(),
            w,
            h,
            pixels: vec![color; w * h],
            transparent: false,
        }
    }

    /// Texture-space units per map unit, horizontally.
    #[inline]
    pub fn scale_x(&self) -> f32 {
        1.0 / self.w.max(1) as f32
    }

    #[inline]
    pub fn scale_y(&self) -> f32 {
        1.0 / self.h.max(1) as f32
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.h as f32
    }
}

/// Things that can go wrong when using the bank.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextureError {
    /// Attempted to insert a second texture with an existing name.
    #[error("texture name `{0}` already present in bank")]
    Duplicate(String),

    /// Requested ID is outside `0 .. bank.len()`.
    #[error("texture id {0} out of range")]
    BadId(TextureId),
}

/// Base light-level remap shared by every sector without an extra colormap.
pub struct Colormap(pub [[u8; 256]; COLORMAP_ROWS]);
impl Default for Colormap {
    /// Identity remap on every row.
    fn default() -> Self {
        let mut rows = [[0u8; 256]; COLORMAP_ROWS];
        for row in rows.iter_mut() {
            for (i, c) in row.iter_mut().enumerate() {
                *c = i as u8;
            }
        }
        Colormap(rows)
    }
}
impl Colormap {
    /// All rows back to back, the layout light tables are built from.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_flattened()
    }
}

/// A palette-agnostic, format-agnostic cache of textures.
///
/// * Does **not** know about archives or graphics APIs; the loader fills it.
/// * Stores exactly one copy of every name.
/// * ID **0** is always the “missing” checkerboard.
pub struct TextureBank {
    by_name: HashMap<String, TextureId>,
    data: Vec<Texture>,
    colormap: Colormap,
}

impl TextureBank {
    // ---------------------------------------------------------------------
    // Constructors
    // ---------------------------------------------------------------------

    /// Create an empty bank with a mandatory *missing* texture used as
    /// fallback.  The texture is inserted under the fixed name `"MISSING"`
    /// and obtains the handle **0**.
    pub fn new(missing_tex: Texture) -> Self {
        let mut by_name = HashMap::new();
        by_name.insert("MISSING".into(), NO_TEXTURE);
        Self {
            by_name,
            data: vec![missing_tex],
            colormap: Colormap::default(),
        }
    }

    pub fn set_colormap(&mut self, colormap: Colormap) {
        self.colormap = colormap;
    }

    pub fn colormap(&self) -> &Colormap {
        &self.colormap
    }

    pub fn default_with_checker() -> Self {
        Self::new(Texture::default())
    }

    // ---------------------------------------------------------------------
    // Query helpers
    // ---------------------------------------------------------------------

    /// Number of textures stored (including the “missing” one).
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.len() == 1
    } // only checker

    /// Obtain the id for a *loaded* texture by name.
    /// Returns `None` if the name is unknown.
    pub fn id(&self, name: &str) -> Option<TextureId> {
        self.by_name.get(name).copied()
    }

    /// Borrow a texture by id, with bounds-checking.
    pub fn texture(&self, id: TextureId) -> Result<&Texture, TextureError> {
        self.data.get(id as usize).ok_or(TextureError::BadId(id))
    }

    /// Like [`texture`](Self::texture) but never fails: bad ids get the
    /// checkerboard.
    pub fn texture_or_missing(&self, id: TextureId) -> &Texture {
        self.data.get(id as usize).unwrap_or(&self.data[0])
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Insert a texture under `name`.
    ///
    /// * Returns the newly assigned `TextureId`.
    /// * Fails if the name already exists (`Duplicate`).
    pub fn insert<S: Into<String>>(
        &mut self,
        name: S,
        tex: Texture,
    ) -> Result<TextureId, TextureError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(TextureError::Duplicate(name));
        }
        let id = self.data.len() as TextureId;
        self.data.push(tex);
        self.by_name.insert(name, id);
        Ok(id)
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_tex(color: u8) -> Texture {
        Texture::solid("Dummy", 2, 2, color)
    }

    #[test]
    fn insert_and_lookup() {
        let mut bank = TextureBank::default_with_checker();
        let red = bank.insert("RED", dummy_tex(0x00)).unwrap();
        let blue = bank.insert("BLUE", dummy_tex(0xFF)).unwrap();

        assert_ne!(red, NO_TEXTURE);
        assert_ne!(blue, red);
        assert_eq!(bank.id("RED"), Some(red));
        assert_eq!(bank.id("BLUE"), Some(blue));
        assert_eq!(bank.id("NOPE"), None);

        assert_eq!(bank.texture(red).unwrap().pixels[0], 0x00);
        assert_eq!(bank.texture(blue).unwrap().pixels[0], 0xFF);
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut bank = TextureBank::default_with_checker();
        bank.insert("WOOD", dummy_tex(1)).unwrap();
        let err = bank.insert("WOOD", dummy_tex(2)).unwrap_err();
        assert_eq!(err, TextureError::Duplicate("WOOD".into()));
        // texture count still 2 (checker + first WOOD)
        assert_eq!(bank.len(), 2);
    }

    #[test]
    fn bad_id_guard() {
        let bank = TextureBank::default_with_checker();
        let bad = TextureId::MAX;
        assert_eq!(bank.texture(bad).unwrap_err(), TextureError::BadId(bad));
        assert_eq!(bank.texture_or_missing(bad).name, "CHECKER");
    }

    #[test]
    fn scales_are_reciprocal_size() {
        let t = Texture::solid("BRICK", 64, 128, 3);
        assert_eq!(t.scale_x(), 1.0 / 64.0);
        assert_eq!(t.scale_y(), 1.0 / 128.0);
    }

    #[test]
    fn base_colormap_flattens_row_major() {
        let cm = Colormap::default();
        let bytes = cm.as_bytes();
        assert_eq!(bytes.len(), 256 * COLORMAP_ROWS);
        assert_eq!(bytes[256 + 7], 7);
    }
}
