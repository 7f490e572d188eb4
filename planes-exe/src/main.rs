//! `planeview` renders a synthetic room through the visplane span renderer
//! and optionally dumps the last frame as an image.

mod cli;
mod config;
mod framebuffer;
mod scene;
mod timestep;

use cli::*;
use log::{debug, info};
use mimalloc::MiMalloc;
use simplelog::TermLogger;
use std::error::Error;
use std::path::Path;

use crate::config::UserConfig;
use crate::framebuffer::Framebuffer;
use crate::scene::{SKY_PICNUM, Scene};
use crate::timestep::TimeStep;
use render_soft::{FrameRenderContext, FrameStats, SoftSpanDrawer};
use render_trait::PixelBuffer;

const BASE_DIR: &str = "planeview/";

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<(), Box<dyn Error>> {
    let mut options: CLIOptions = argh::from_env();

    TermLogger::init(
        options.verbose.unwrap_or(log::LevelFilter::Info),
        simplelog::ConfigBuilder::default()
            .set_time_level(log::LevelFilter::Trace)
            .build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let mut user_config = UserConfig::load()?;
    user_config.sync_cli(&mut options);
    user_config.write()?;

    let options = RenderOptions::from(options);
    info!(
        "Rendering {} frames at {}x{}",
        options.frames, options.width, options.height
    );
    let totals = run(&options)?;
    info!(
        "Totals: {} planes ({} sky, {} sloped), {} spans, {} pixels",
        totals.planes, totals.sky_planes, totals.tilted_planes, totals.spans, totals.pixels
    );

    #[cfg(feature = "hprof")]
    coarse_prof::write(&mut std::io::stdout())?;
    Ok(())
}

fn run(options: &RenderOptions) -> Result<FrameStats, Box<dyn Error>> {
    if options.width == 0 || options.height == 0 {
        return Err(format!("Invalid resolution {}x{}", options.width, options.height).into());
    }
    let scene = Scene::new();
    let mut ctx = FrameRenderContext::new(options.width, options.height, options.fov, SKY_PICNUM);
    ctx.set_encore(options.encore);
    ctx.lights_mut().set_fixed_colourmap(options.fixed_colourmap);
    let mut framebuffer = Framebuffer::new(options.width, options.height);
    let mut timestep = TimeStep::new();
    let mut totals = FrameStats::default();

    for _ in 0..options.frames {
        if options.realtime {
            timestep.run_this(|_| {});
        } else {
            timestep.step_tic();
        }
        let clock = timestep.ripple_clock();

        framebuffer.clear_with_colour(&scene.sky_colour());
        ctx.begin_frame(scene.view_at(clock.leveltime), clock);
        scene.traverse(&mut ctx, clock.leveltime);
        let mut drawer = SoftSpanDrawer::new(&mut framebuffer, scene.colourmaps(), scene.palette());
        let stats = ctx.draw_planes(scene.flats(), &mut drawer);
        ctx.end_frame();

        debug!("Tic {}: {stats:?}", clock.leveltime);
        totals.planes += stats.planes;
        totals.sky_planes += stats.sky_planes;
        totals.tilted_planes += stats.tilted_planes;
        totals.spans += stats.spans;
        totals.pixels += stats.pixels;

        if let Some(fps) = timestep.frame_rate() {
            info!("{fps}");
        }
    }

    if let Some(path) = &options.dump {
        framebuffer.write_ppm(Path::new(path))?;
        info!("Wrote last frame to {path}");
    }
    Ok(totals)
}
