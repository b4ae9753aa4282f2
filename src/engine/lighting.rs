//! Surface color, fade and blend resolution.
//!
//! Without shaders the colormap tint and the distance fade are folded into
//! the polygon color here; the curve approximates the software renderer's
//! brightness ramp and is not meant to match it exactly.

use std::collections::HashMap;

use glam::Vec2;

use crate::{
    config::FakeContrast,
    renderer::{Driver, PolyFlags, Rgba, SurfaceInfo},
    world::{BlendStyle, ColormapId, ExtraColormap},
};

/// Tint used when a sector has no colormap.
pub const DEFAULT_MIX: u32 = 0x0000_0000;
/// Fade used when a sector has no colormap.
pub const DEFAULT_FOG: u32 = 0x1900_0000;

/// Number of translucency tables; index 10 and up means invisible.
pub const NUM_TRANSMAPS: u8 = 10;

const TRANSLUCENCY_ALPHA: [u8; NUM_TRANSMAPS as usize] =
    [0xFF, 0xE6, 0xCC, 0xB3, 0x99, 0x80, 0x66, 0x4C, 0x33, 0x19];

const CONTRAST: i32 = 8;

/// Which lighting path is live this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightingMode {
    /// Shaders requested and available.
    pub shaders: bool,
    /// Palette rendering requested and possible (implies `shaders`).
    pub palette: bool,
}

/*──────────────────────── color resolution ──────────────────────────*/

/// Fill `surf` with the color state for `light_level` under `colormap`.
/// Light tables are left untouched; see [`LightTableCache`].
pub fn shade_surface(
    surf: &mut SurfaceInfo,
    light_level: i32,
    colormap: Option<&ExtraColormap>,
    shaders: bool,
) {
    let mut poly = Rgba::WHITE;
    let tint = Rgba::from_packed(colormap.map_or(DEFAULT_MIX, |c| c.rgba));
    let fade = Rgba::from_packed(colormap.map_or(DEFAULT_FOG, |c| c.fade_rgba));

    if !shaders {
        // 48 and 12 are tuned by eye
        let tint_alpha = ((tint.a as f32).sqrt() * 48.0 / 255.0).clamp(0.0, 1.0);
        let fade_alpha =
            (((255 - light_level).max(0) as f32).sqrt() * 12.0 / 255.0).clamp(0.0, 1.0);

        let mix = |base: f32, over: u8, a: f32| over as f32 * a + base * (1.0 - a);
        let shade = |base: u8, tint: u8, fade: u8| {
            mix(mix(base as f32, tint, tint_alpha), fade, fade_alpha) as u8
        };
        poly.r = shade(poly.r, tint.r, fade.r);
        poly.g = shade(poly.g, tint.g, fade.g);
        poly.b = shade(poly.b, tint.b, fade.b);
    }

    surf.poly = poly;
    surf.tint = tint;
    surf.fade = fade;
    surf.light.light_level = light_level.clamp(0, 255) as u8;
    surf.light.fade_start = colormap.map_or(0, |c| c.fade_start);
    surf.light.fade_end = colormap.map_or(31, |c| c.fade_end);
}

/// Full resolution: colors plus the palette-mode light table.
pub fn resolve_lighting<D: Driver + ?Sized>(
    surf: &mut SurfaceInfo,
    light_level: i32,
    colormap: Option<(ColormapId, &ExtraColormap)>,
    mode: LightingMode,
    tables: &mut LightTableCache,
    driver: &mut D,
    base_colormap: &[u8],
) {
    shade_surface(surf, light_level, colormap.map(|(_, c)| c), mode.shaders);
    surf.light_table = if mode.palette {
        tables.table_for(driver, colormap, base_colormap)
    } else {
        0
    };
}

/*──────────────────────── light table cache ─────────────────────────*/

/// Driver light tables, one per colormap, created on first use.
#[derive(Debug, Default)]
pub struct LightTableCache {
    base: Option<u32>,
    by_colormap: HashMap<ColormapId, u32>,
}

impl LightTableCache {
    pub fn table_for<D: Driver + ?Sized>(
        &mut self,
        driver: &mut D,
        colormap: Option<(ColormapId, &ExtraColormap)>,
        base_colormap: &[u8],
    ) -> u32 {
        match colormap {
            // the default case uses the base table, not the colormap's own
            None => *self
                .base
                .get_or_insert_with(|| driver.create_light_table(base_colormap)),
            Some((id, cm)) => *self.by_colormap.entry(id).or_insert_with(|| {
                let table = if cm.table.is_empty() {
                    base_colormap
                } else {
                    &cm.table
                };
                driver.create_light_table(table)
            }),
        }
    }

    /// Forget every handle; palette or texture reloads call this.
    pub fn invalidate<D: Driver + ?Sized>(&mut self, driver: &mut D) {
        self.base = None;
        self.by_colormap.clear();
        driver.clear_light_tables();
    }

    pub fn len(&self) -> usize {
        self.by_colormap.len() + self.base.is_some() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/*──────────────────────── alpha helpers ─────────────────────────────*/

/// Opacity of a fog block seen with light `light`.
pub fn fog_block_alpha(light: i32, colormap: Option<&ExtraColormap>, shaders: bool) -> u8 {
    let light = light.clamp(0, 255);
    if shaders {
        return (255 - light) as u8;
    }
    let tint = Rgba::from_packed(colormap.map_or(DEFAULT_MIX, |c| c.rgba));
    let light = (light - (255 - light)).clamp(0, 255);
    let alpha = tint.a as i32 * 255 / 25;
    // 0..127 at full brightness, 255 in the dark
    (alpha * light / (2 * 256) + 255 - light) as u8
}

/// Alpha of translucency table `idx` (0 opaque .. 9 = 90% translucent).
pub fn translucency_alpha(idx: i32) -> u8 {
    TRANSLUCENCY_ALPHA[idx.clamp(0, NUM_TRANSMAPS as i32 - 1) as usize]
}

pub fn blend_flag_for_style(style: BlendStyle) -> PolyFlags {
    match style {
        BlendStyle::Translucent => PolyFlags::TRANSLUCENT,
        BlendStyle::Add => PolyFlags::ADDITIVE,
        BlendStyle::Subtract => PolyFlags::SUBTRACTIVE,
        BlendStyle::ReverseSubtract => PolyFlags::REVERSE_SUBTRACT,
        BlendStyle::Modulate => PolyFlags::MULTIPLICATIVE,
        _ => PolyFlags::MASKED,
    }
}

/// Blend for an explicit style at translucency `idx`; sets the alpha.
pub fn surface_blend(style: BlendStyle, idx: i32, surf: &mut SurfaceInfo) -> PolyFlags {
    if idx == 0 || style <= BlendStyle::Copy || style >= BlendStyle::Overlay {
        surf.poly.a = 0xFF;
        return PolyFlags::MASKED;
    }
    surf.poly.a = translucency_alpha(idx);
    blend_flag_for_style(style)
}

/// Plain translucency from a table index; index 0 yields a zero alpha.
pub fn transtable_to_alpha(idx: i32, surf: &mut SurfaceInfo) -> PolyFlags {
    if idx == 0 {
        surf.poly.a = 0x00;
        return PolyFlags::MASKED;
    }
    surf.poly.a = translucency_alpha(idx);
    PolyFlags::TRANSLUCENT
}

/// Translucency table index for a line alpha in `0.0..=1.0`.
pub fn linedef_trans_table(alpha: f32) -> i32 {
    let fixed = (alpha.clamp(0.0, 1.0) * 65536.0) as i64;
    ((20 * (65536 - fixed - 1) + 65536) >> 17) as i32
}

/*──────────────────────── fake contrast ─────────────────────────────*/

/// Wall light after fake contrast for a wall from `v1` to `v2`.
pub fn wall_light(light: i32, v1: Vec2, v2: Vec2, mode: FakeContrast) -> i32 {
    let extra = match mode {
        FakeContrast::Off => 0,
        FakeContrast::On => {
            if v1.y == v2.y {
                -CONTRAST
            } else if v1.x == v2.x {
                CONTRAST
            } else {
                0
            }
        }
        FakeContrast::Smooth => {
            let d = (v1 - v2).abs();
            let deg = d.y.atan2(d.x).to_degrees();
            let v = -(CONTRAST as f32) + deg / 90.0 * (CONTRAST * 2) as f32;
            // floor like the fixed-point shift; nudge so 90° is not 7.999
            (v + 1e-3).floor() as i32
        }
    };
    if extra == 0 {
        return light;
    }
    (light + extra).clamp(0, 255)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::Recorder;
    use glam::vec2;

    fn tinted() -> ExtraColormap {
        ExtraColormap {
            rgba: 0x8000_00FF,
            fade_rgba: 0xFF10_2030,
            fade_start: 4,
            fade_end: 20,
            table: vec![7; 256],
        }
    }

    #[test]
    fn translucency_table_endpoints_and_order() {
        assert_eq!(translucency_alpha(0), 255);
        assert_eq!(translucency_alpha(9), 25);
        for i in 0..9 {
            assert!(translucency_alpha(i) > translucency_alpha(i + 1));
        }
        assert_eq!(translucency_alpha(-3), 255);
        assert_eq!(translucency_alpha(42), 25);
    }

    #[test]
    fn light_clamped_and_monotonic_without_colormap() {
        let mut prev = 0u8;
        for level in -40..=300 {
            let mut s = SurfaceInfo::default();
            shade_surface(&mut s, level, None, false);
            assert!(s.light.light_level as i32 == level.clamp(0, 255));
            assert!(s.poly.r >= prev, "brightness dropped at {level}");
            prev = s.poly.r;
        }
    }

    #[test]
    fn defaults_without_colormap() {
        let mut s = SurfaceInfo::default();
        shade_surface(&mut s, 255, None, true);
        assert_eq!(s.poly, Rgba::WHITE);
        assert_eq!(s.tint.packed(), DEFAULT_MIX);
        assert_eq!(s.fade.packed(), DEFAULT_FOG);
        assert_eq!((s.light.fade_start, s.light.fade_end), (0, 31));
    }

    #[test]
    fn colormap_tints_software_path() {
        let cm = tinted();
        let mut s = SurfaceInfo::default();
        shade_surface(&mut s, 255, Some(&cm), false);
        // red tint keeps red, pulls green/blue down
        assert_eq!(s.poly.r, 255);
        assert!(s.poly.g < 255);
        assert_eq!(s.poly.a, 255);
        assert_eq!((s.light.fade_start, s.light.fade_end), (4, 20));
    }

    #[test]
    fn blend_flags_per_style() {
        assert_eq!(blend_flag_for_style(BlendStyle::Add), PolyFlags::ADDITIVE);
        assert_eq!(
            blend_flag_for_style(BlendStyle::Modulate),
            PolyFlags::MULTIPLICATIVE
        );
        assert_eq!(blend_flag_for_style(BlendStyle::Copy), PolyFlags::MASKED);
        assert_eq!(blend_flag_for_style(BlendStyle::Fog), PolyFlags::MASKED);
    }

    #[test]
    fn surface_blend_rules() {
        let mut s = SurfaceInfo::opaque();
        assert_eq!(surface_blend(BlendStyle::Add, 0, &mut s), PolyFlags::MASKED);
        assert_eq!(s.poly.a, 255);
        assert_eq!(
            surface_blend(BlendStyle::Overlay, 5, &mut s),
            PolyFlags::MASKED
        );
        assert_eq!(surface_blend(BlendStyle::Add, 5, &mut s), PolyFlags::ADDITIVE);
        assert_eq!(s.poly.a, 128);
    }

    #[test]
    fn transtable_zero_is_invisible_masked() {
        let mut s = SurfaceInfo::opaque();
        assert_eq!(transtable_to_alpha(0, &mut s), PolyFlags::MASKED);
        assert_eq!(s.poly.a, 0);
        assert_eq!(transtable_to_alpha(3, &mut s), PolyFlags::TRANSLUCENT);
        assert_eq!(s.poly.a, 179);
    }

    #[test]
    fn line_alpha_to_table() {
        assert_eq!(linedef_trans_table(1.0), 0);
        assert_eq!(linedef_trans_table(0.5), 5);
        assert_eq!(linedef_trans_table(0.0), 10);
        assert_eq!(linedef_trans_table(0.9), 1);
    }

    #[test]
    fn fog_alpha_paths() {
        assert_eq!(fog_block_alpha(200, None, true), 55);
        // no tint alpha: plain darkness
        assert_eq!(fog_block_alpha(255, None, false), 0);
        assert_eq!(fog_block_alpha(0, None, false), 255);
        assert_eq!(fog_block_alpha(100, None, false), 255);
    }

    #[test]
    fn fog_alpha_with_overshooting_light() {
        assert_eq!(fog_block_alpha(300, None, true), 0);
        assert_eq!(fog_block_alpha(-20, None, true), 255);
        assert_eq!(fog_block_alpha(300, None, false), 0);
    }

    #[test]
    fn tint_and_fade_blend_without_intermediate_rounding() {
        // faint black tint, then a 64-step fade towards black
        let cm = ExtraColormap {
            rgba: 0x0300_0000,
            fade_rgba: 0x0000_0000,
            fade_start: 0,
            fade_end: 31,
            table: Vec::new(),
        };
        let mut s = SurfaceInfo::default();
        shade_surface(&mut s, 191, Some(&cm), false);
        // 255 -> 171.86 -> 107.16; rounding the tint first gives 106
        assert_eq!((s.poly.r, s.poly.g, s.poly.b), (107, 107, 107));
    }

    #[test]
    fn fake_contrast_modes() {
        let h = (vec2(0.0, 0.0), vec2(64.0, 0.0));
        let v = (vec2(0.0, 0.0), vec2(0.0, 64.0));
        assert_eq!(wall_light(100, h.0, h.1, FakeContrast::On), 92);
        assert_eq!(wall_light(100, v.0, v.1, FakeContrast::On), 108);
        assert_eq!(wall_light(100, h.0, h.1, FakeContrast::Smooth), 92);
        assert_eq!(wall_light(100, v.0, v.1, FakeContrast::Smooth), 108);
        assert_eq!(wall_light(100, h.0, h.1, FakeContrast::Off), 100);
        assert_eq!(wall_light(252, v.0, v.1, FakeContrast::On), 255);
        assert_eq!(wall_light(3, h.0, h.1, FakeContrast::Smooth), 0);
    }

    #[test]
    fn light_tables_cached_per_colormap() {
        let mut drv = Recorder::default();
        let mut cache = LightTableCache::default();
        let cm = tinted();
        let base = [0u8; 256];

        let a = cache.table_for(&mut drv, Some((0, &cm)), &base);
        let b = cache.table_for(&mut drv, Some((0, &cm)), &base);
        let d = cache.table_for(&mut drv, None, &base);
        assert_eq!(a, b);
        assert_ne!(a, d);
        assert_eq!(cache.len(), 2);

        cache.invalidate(&mut drv);
        assert!(cache.is_empty());
        let c = cache.table_for(&mut drv, Some((0, &cm)), &base);
        assert_ne!(a, c);
    }
}
