//! Screen-space work after the 3D view: flash overlay, captures, water and
//! heat distortion, and the wipe / final-screen helpers the front end
//! calls between frames.

use std::collections::HashMap;

use log::{trace, warn};

use crate::{
    engine::{
        Engine,
        frame::{Flash, FrameInfo, PlayerView, PostImage},
    },
    error::RenderError,
    renderer::{
        DistortionGrid, Driver, OutVertex, PolyFlags, Rgba, SCREEN_VERTS, ScreenTexture,
        SurfaceInfo,
    },
};

/// Byte sizes a fade mask may have, one per supported resolution.
pub const FADE_MASK_SIZES: [usize; 4] = [256_000, 64_000, 16_000, 4_000];

/// Read-only view of the game's resource archive.
pub trait ResourceLookup {
    /// Byte length of the named lump, if present.
    fn lump_len(&self, name: &str) -> Option<usize>;
}

impl ResourceLookup for HashMap<String, usize> {
    fn lump_len(&self, name: &str) -> Option<usize> {
        self.get(name).copied()
    }
}

/// Wave parameters of a distortion: (wavelength, amplitude, frequency).
fn wave_for(post: PostImage) -> Option<(f64, f64, f64)> {
    match post {
        PostImage::Water => Some((20.0, 20.0, 16.0)),
        PostImage::Heat => Some((10.0, 30.0, 4.0)),
        _ => None,
    }
}

/// Grid of a horizontal sine wobble at `phase`; rows shift by row.
pub fn distortion_grid(phase: f64, wavelength: f64, amplitude: f64, frequency: f64) -> DistortionGrid {
    let mut grid = [[[0.0f32; 2]; SCREEN_VERTS]; SCREEN_VERTS];
    let step = (SCREEN_VERTS as f32 - 1.0) / 9.0;
    for (x, column) in grid.iter_mut().enumerate() {
        for (y, cell) in column.iter_mut().enumerate() {
            let wobble = ((phase + y as f64 * wavelength) / frequency).sin() / amplitude;
            cell[0] = x as f32 / step - 4.5 + wobble as f32;
            cell[1] = y as f32 / step - 4.5;
        }
    }
    grid
}

/// `FADEwwss`; both numbers are two decimal digits.
pub fn fade_mask_name(wipe: u8, screen: u8) -> Result<String, RenderError> {
    if wipe > 99 || screen > 99 {
        return Err(RenderError::BadWipeNumber { wipe, screen });
    }
    Ok(format!("FADE{wipe:02}{screen:02}"))
}

/// Name and length of a usable fade mask.
pub fn find_fade_mask<L: ResourceLookup + ?Sized>(
    lookup: &L,
    wipe: u8,
    screen: u8,
) -> Result<(String, usize), RenderError> {
    let name = fade_mask_name(wipe, screen)?;
    let Some(len) = lookup.lump_len(&name) else {
        return Err(RenderError::MissingFadeMask(name));
    };
    if !FADE_MASK_SIZES.contains(&len) {
        return Err(RenderError::BadFadeMaskSize { name, len });
    }
    Ok((name, len))
}

impl<D: Driver> Engine<D> {
    /// Runs after each main view, with the 3D transform already dropped.
    pub(crate) fn post_process(&mut self, eye: usize, view: &PlayerView, frame: &FrameInfo) {
        self.driver.unset_shader();

        if let Some(flash) = view.flash {
            if !self.palette_active {
                self.draw_flash(flash);
            }
        }

        if !frame.intermission {
            self.driver.make_screen_texture(ScreenTexture::Generic1);
        }
        if self.config.splitscreen {
            return;
        }

        if let Some((wavelength, amplitude, frequency)) = wave_for(view.post_image) {
            let grid = distortion_grid(self.wave_phase, wavelength, amplitude, frequency);
            self.driver.post_img_redraw(&grid);
            if !frame.paused {
                self.wave_phase += 1.0;
            }
            if !frame.intermission {
                self.driver.make_screen_texture(ScreenTexture::Generic1);
            }
        }
        trace!("post-processed eye {eye}");
    }

    fn draw_flash(&mut self, flash: Flash) {
        let v = |x: f32, y: f32| OutVertex {
            x,
            y,
            z: 4.0,
            ..Default::default()
        };
        let verts = [v(-4.0, 4.0), v(4.0, 4.0), v(4.0, -4.0), v(-4.0, -4.0)];
        let poly = match flash {
            Flash::Nuke => Rgba::new(0xFF, 0x7F, 0x7F, 0xC0),
            Flash::Normal => Rgba::new(0xFF, 0xFF, 0xFF, 0xC0),
        };
        let surf = SurfaceInfo {
            poly,
            ..Default::default()
        };
        self.driver.draw_polygon(
            &surf,
            &verts,
            PolyFlags::MODULATED
                | PolyFlags::ADDITIVE
                | PolyFlags::NO_TEXTURE
                | PolyFlags::NO_DEPTH_TEST,
        );
    }

    /*──────────────────────── wipes ─────────────────────────────────*/

    pub fn start_screen_wipe(&mut self) {
        self.driver.make_screen_texture(ScreenTexture::WipeStart);
    }

    pub fn end_screen_wipe(&mut self) {
        self.driver.make_screen_texture(ScreenTexture::WipeEnd);
    }

    /// Last captured 3D view as the intermission backdrop.
    pub fn draw_intermission_bg(&mut self) {
        self.driver.draw_screen_texture(ScreenTexture::Generic1);
    }

    /// One step of wipe `wipe` for screen `screen`. Nothing is drawn when
    /// the fade mask is missing or malformed.
    pub fn do_wipe<L: ResourceLookup + ?Sized>(
        &mut self,
        wipe: u8,
        screen: u8,
        lookup: &L,
    ) -> Result<(), RenderError> {
        let (name, len) = find_fade_mask(lookup, wipe, screen).inspect_err(|e| warn!("{e}"))?;
        self.driver.set_fade_mask(&name, len);
        self.driver
            .do_screen_wipe(ScreenTexture::WipeStart, ScreenTexture::WipeEnd);
        Ok(())
    }

    /// Tinted wipes cross-fade the same way; the tint lives in the
    /// captured screens.
    pub fn do_tinted_wipe<L: ResourceLookup + ?Sized>(
        &mut self,
        wipe: u8,
        screen: u8,
        lookup: &L,
    ) -> Result<(), RenderError> {
        self.do_wipe(wipe, screen, lookup)
    }

    fn final_texture(&self) -> ScreenTexture {
        if self.palette_active {
            ScreenTexture::Generic3
        } else {
            ScreenTexture::Generic2
        }
    }

    pub fn make_screen_final_texture(&mut self) {
        let which = self.final_texture();
        self.driver.make_screen_texture(which);
    }

    pub fn draw_screen_final_texture(&mut self, width: u32, height: u32) {
        let which = self.final_texture();
        self.driver.draw_screen_final_texture(which, width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RenderConfig,
        renderer::{Call, Recorder},
        world::{
            Camera,
            builder::{demo_bank, single_room_level},
        },
    };
    use glam::vec3;

    fn engine(config: RenderConfig) -> Engine<Recorder> {
        Engine::new(Recorder::default(), single_room_level(), demo_bank(), config)
    }

    fn view(post: PostImage) -> PlayerView {
        let mut v = PlayerView::new(Camera::new(vec3(64.0, 64.0, 41.0), 0.0, 1.5));
        v.draw_sky = false;
        v.post_image = post;
        v
    }

    fn lumps(entries: &[(&str, usize)]) -> HashMap<String, usize> {
        entries.iter().map(|(n, l)| (n.to_string(), *l)).collect()
    }

    #[test]
    fn grid_centres_on_screen() {
        let g = distortion_grid(0.0, 20.0, 20.0, 16.0);
        assert_eq!(g[0][0][1], -4.5);
        assert_eq!(g[9][9][1], 4.5);
        // row 0 at phase 0 has no wobble
        assert_eq!(g[0][0][0], -4.5);
        let expected = -4.5 + ((20.0f64 / 16.0).sin() / 20.0) as f32;
        assert!((g[0][1][0] - expected).abs() < 1e-6);
    }

    #[test]
    fn every_valid_mask_size_is_accepted() {
        for len in FADE_MASK_SIZES {
            let l = lumps(&[("FADE0102", len)]);
            assert_eq!(find_fade_mask(&l, 1, 2), Ok(("FADE0102".to_string(), len)));
        }
    }

    #[test]
    fn bad_masks_skip_the_wipe() {
        let mut e = engine(RenderConfig::default());
        e.driver.clear();
        let l = lumps(&[("FADE0001", 5000)]);
        assert_eq!(
            e.do_wipe(0, 1, &l),
            Err(RenderError::BadFadeMaskSize {
                name: "FADE0001".into(),
                len: 5000
            })
        );
        assert_eq!(
            e.do_wipe(3, 3, &l),
            Err(RenderError::MissingFadeMask("FADE0303".into()))
        );
        assert_eq!(
            e.do_tinted_wipe(100, 0, &l),
            Err(RenderError::BadWipeNumber { wipe: 100, screen: 0 })
        );
        assert!(e.driver.calls.is_empty());
    }

    #[test]
    fn good_mask_runs_the_wipe() {
        let mut e = engine(RenderConfig::default());
        e.driver.clear();
        e.start_screen_wipe();
        e.end_screen_wipe();
        e.do_wipe(1, 0, &lumps(&[("FADE0100", 64_000)])).unwrap();
        assert_eq!(
            e.driver.calls,
            vec![
                Call::MakeScreen(ScreenTexture::WipeStart),
                Call::MakeScreen(ScreenTexture::WipeEnd),
                Call::FadeMask("FADE0100".into(), 64_000),
                Call::Wipe {
                    from: ScreenTexture::WipeStart,
                    to: ScreenTexture::WipeEnd
                },
            ]
        );
    }

    #[test]
    fn water_advances_unless_paused() {
        let mut e = engine(RenderConfig::default());
        let frame = FrameInfo::default();
        e.render_player_view(0, &view(PostImage::Water), &frame);
        e.render_player_view(0, &view(PostImage::Water), &frame);
        assert_eq!(e.wave_phase, 2.0);
        assert_eq!(e.driver.count(|c| matches!(c, Call::PostImg(_))), 2);

        let paused = FrameInfo {
            paused: true,
            ..frame
        };
        e.render_player_view(0, &view(PostImage::Heat), &paused);
        assert_eq!(e.wave_phase, 2.0);
    }

    #[test]
    fn no_distortion_in_splitscreen() {
        let mut e = engine(RenderConfig {
            splitscreen: true,
            ..RenderConfig::default()
        });
        e.render_player_view(0, &view(PostImage::Heat), &FrameInfo::default());
        assert_eq!(e.driver.count(|c| matches!(c, Call::PostImg(_))), 0);
        assert_eq!(
            e.driver
                .count(|c| matches!(c, Call::MakeScreen(ScreenTexture::Generic1))),
            1
        );
    }

    #[test]
    fn intermission_skips_captures() {
        let mut e = engine(RenderConfig::default());
        let frame = FrameInfo {
            intermission: true,
            ..FrameInfo::default()
        };
        e.render_player_view(0, &view(PostImage::Water), &frame);
        assert_eq!(e.driver.count(|c| matches!(c, Call::MakeScreen(_))), 0);
        e.draw_intermission_bg();
        assert_eq!(
            e.driver.calls.last(),
            Some(&Call::DrawScreen(ScreenTexture::Generic1))
        );
    }

    #[test]
    fn flash_overlay_skipped_in_palette_mode() {
        let flash_polys = |e: &Engine<Recorder>| {
            e.driver
                .polygons()
                .filter(|(f, _, _)| f.contains(PolyFlags::ADDITIVE | PolyFlags::NO_DEPTH_TEST))
                .count()
        };
        let mut v = view(PostImage::None);
        v.flash = Some(Flash::Nuke);

        let mut e = engine(RenderConfig::default());
        e.render_player_view(0, &v, &FrameInfo::default());
        assert_eq!(flash_polys(&e), 1);
        let nuke = e
            .driver
            .polygons()
            .find(|(f, _, _)| f.contains(PolyFlags::ADDITIVE))
            .map(|(_, s, _)| s.poly);
        assert_eq!(nuke, Some(Rgba::new(0xFF, 0x7F, 0x7F, 0xC0)));

        let mut e = engine(RenderConfig {
            palette_rendering: true,
            ..RenderConfig::default()
        });
        e.render_player_view(0, &v, &FrameInfo::default());
        assert_eq!(flash_polys(&e), 0);
    }

    #[test]
    fn final_texture_follows_palette_mode() {
        let mut e = engine(RenderConfig::default());
        e.make_screen_final_texture();
        e.set_palette_rendering(true);
        e.draw_screen_final_texture(640, 400);
        assert!(e.driver.calls.contains(&Call::MakeScreen(ScreenTexture::Generic2)));
        assert_eq!(
            e.driver.calls.last(),
            Some(&Call::DrawFinal(ScreenTexture::Generic3, 640, 400))
        );
    }
}
