use argh::FromArgs;

/// Render a synthetic scene through the visplane span renderer
#[derive(Debug, Clone, FromArgs)]
pub struct CLIOptions {
    /// verbose level: off, error, warn, info, debug, trace
    #[argh(option)]
    pub verbose: Option<log::LevelFilter>,
    /// resolution width in pixels
    #[argh(option, default = "0")]
    pub width: u32,
    /// resolution height in pixels
    #[argh(option, default = "0")]
    pub height: u32,
    /// horizontal field of view in degrees
    #[argh(option)]
    pub fov: Option<f32>,
    /// number of frames to render before exiting
    #[argh(option)]
    pub frames: Option<u32>,
    /// advance the animation by the wall clock instead of one tic per frame
    #[argh(option, default = "false")]
    pub realtime: bool,
    /// shade surfaces with the alternate palette remap
    #[argh(option)]
    pub encore: Option<bool>,
    /// force a single colourmap (0-31) for every surface, as light
    /// amplification does
    #[argh(option)]
    pub fixed_colourmap: Option<usize>,
    /// write the last frame to this path as a binary PPM
    #[argh(option)]
    pub dump: Option<String>,
}

/// Options for a run, after the CLI and the user config are reconciled
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub width: usize,
    pub height: usize,
    pub fov: f32,
    pub frames: u32,
    pub realtime: bool,
    pub encore: bool,
    pub fixed_colourmap: Option<usize>,
    pub dump: Option<String>,
}

impl From<CLIOptions> for RenderOptions {
    fn from(g: CLIOptions) -> Self {
        RenderOptions {
            width: g.width as usize,
            height: g.height as usize,
            fov: g.fov.unwrap_or(90.0).to_radians(),
            frames: g.frames.unwrap_or(1),
            realtime: g.realtime,
            encore: g.encore.unwrap_or_default(),
            fixed_colourmap: g.fixed_colourmap,
            dump: g.dump,
        }
    }
}
