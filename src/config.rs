//! Renderer settings.
//!
//! [`RenderConfig`] is the read-only flag set the scene code consults;
//! [`Args`] is the command-line surface that produces one.

use clap::{Parser, ValueEnum};

/// Extra light on axis-aligned walls, imitating the software renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum FakeContrast {
    Off,
    /// ±8 on horizontal / vertical walls only.
    On,
    /// Scaled by wall angle.
    #[default]
    Smooth,
}

/// When looking up/down shears the view instead of pitching it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Shearing {
    #[default]
    Off,
    On,
    ThirdPerson,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum FilterMode {
    #[default]
    Nearest,
    Bilinear,
    Trilinear,
    LinearNearest,
    NearestLinear,
    NearestMipmap,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// Use shaders for lighting when the driver has them.
    pub shaders: bool,
    /// Palette-accurate lighting through light tables (needs shaders).
    pub palette_rendering: bool,
    pub batching: bool,
    pub fake_contrast: FakeContrast,
    pub shearing: Shearing,
    pub filter: FilterMode,
    pub anisotropy: u8,
    pub skybox: bool,
    pub splitscreen: bool,
    pub width: u32,
    pub height: u32,
    /// Field of view in degrees.
    pub fov: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            shaders: true,
            palette_rendering: false,
            batching: true,
            fake_contrast: FakeContrast::Smooth,
            shearing: Shearing::Off,
            filter: FilterMode::Nearest,
            anisotropy: 1,
            skybox: true,
            splitscreen: false,
            width: 320,
            height: 200,
            fov: 90.0,
        }
    }
}

/// CLI options handled via `clap` derive.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Render with software-approximated lighting
    #[arg(long)]
    pub no_shaders: bool,

    /// Palette-accurate lighting through light tables
    #[arg(long)]
    pub palette: bool,

    /// Submit every polygon on its own
    #[arg(long)]
    pub no_batching: bool,

    #[arg(long, value_enum, default_value_t = FakeContrast::Smooth)]
    pub fake_contrast: FakeContrast,

    #[arg(long, value_enum, default_value_t = Shearing::Off)]
    pub shearing: Shearing,

    #[arg(long, value_enum, default_value_t = FilterMode::Nearest)]
    pub filter: FilterMode,

    #[arg(long, default_value_t = 1)]
    pub anisotropy: u8,

    /// Two stacked views
    #[arg(long)]
    pub splitscreen: bool,

    #[arg(long, default_value_t = 320)]
    pub width: u32,

    #[arg(long, default_value_t = 200)]
    pub height: u32,

    /// Frames to render before exiting
    #[arg(long, default_value_t = 4)]
    pub frames: u32,
}

impl Args {
    pub fn config(&self) -> RenderConfig {
        RenderConfig {
            shaders: !self.no_shaders,
            palette_rendering: self.palette,
            batching: !self.no_batching,
            fake_contrast: self.fake_contrast,
            shearing: self.shearing,
            filter: self.filter,
            anisotropy: self.anisotropy,
            splitscreen: self.splitscreen,
            width: self.width,
            height: self.height,
            ..RenderConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_config() {
        let args = Args::parse_from([
            "render_headless",
            "--no-shaders",
            "--fake-contrast",
            "off",
            "--shearing",
            "third-person",
            "--splitscreen",
        ]);
        let cfg = args.config();
        assert!(!cfg.shaders);
        assert!(cfg.batching);
        assert!(cfg.splitscreen);
        assert_eq!(cfg.fake_contrast, FakeContrast::Off);
        assert_eq!(cfg.shearing, Shearing::ThirdPerson);
        assert_eq!(args.frames, 4);
    }
}
