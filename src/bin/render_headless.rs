//! Renders a few frames of the built-in two-room map into the recording
//! driver and logs what each frame submitted.
//!
//! ```bash
//! cargo run --release -- --frames 8 --splitscreen
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use glam::vec3;
use log::info;
use simplelog::TermLogger;

use hwr_rs::{
    Engine,
    config::Args,
    engine::{FrameInfo, PlayerView, PostImage, frame::check_pixel_depth},
    renderer::{Call, Recorder},
    world::{
        Camera, Thing,
        builder::{GRATE_TEX, WALL_TEX, demo_bank, two_room_level},
    },
};

fn main() -> Result<()> {
    let args = Args::parse();

    TermLogger::init(
        log::LevelFilter::Info,
        simplelog::ConfigBuilder::default()
            .set_time_level(log::LevelFilter::Trace)
            .build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .context("logger init")?;

    check_pixel_depth(1)?;
    let config = args.config();

    // ─────────── map with something to look at ───────────
    let mut level = two_room_level();
    for (x, y, translucency) in [(200.0, 40.0, 0), (220.0, 90.0, 5), (64.0, 100.0, 0)] {
        let sector = level.subsectors[level.locate_subsector(glam::vec2(x, y)) as usize].sector;
        level.things.push(Thing {
            pos: vec3(x, y, 16.0),
            sector,
            sprite: WALL_TEX,
            translucency,
            flip: false,
            precip: false,
        });
    }
    if let Some(side) = level.linedefs[3].right_sidedef {
        level.sidedefs[side as usize].middle = GRATE_TEX;
        level.linedefs[3].alpha = 0.6;
    }

    let mut engine = Engine::new(Recorder::default(), level, demo_bank(), config);
    engine.switch_renderer();

    let mut p1 = PlayerView::new(Camera::new(vec3(32.0, 64.0, 41.0), 0.0, 1.5));
    let mut p2 = PlayerView::new(Camera::new(vec3(240.0, 64.0, 57.0), std::f32::consts::PI, 1.5));
    p2.post_image = PostImage::Water;

    // ─────────── frames ───────────
    for tic in 0..args.frames {
        engine.driver.clear();
        let frame = FrameInfo {
            level_time: tic,
            ..FrameInfo::default()
        };
        engine.render_frame(&[p1, p2], &frame);

        let r = &engine.driver;
        info!(
            "frame {tic}: {} driver calls, {} polygon submissions, {} screen captures, last eye {:?}",
            r.calls.len(),
            r.polygons().count(),
            r.count(|c| matches!(c, Call::MakeScreen(_))),
            engine.stats,
        );

        p1.camera.turn(0.15);
        p2.camera.step(4.0, 0.0);
    }

    info!("texture memory in use: {} bytes", engine.texture_used());
    Ok(())
}
