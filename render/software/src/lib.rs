#[cfg(feature = "hprof")]
use coarse_prof::profile;
use log::{debug, trace};
use render_trait::{FlatSource, SpanDrawer};

mod clip;
mod defs;
mod draw;
mod lighting;
mod mapper;
mod planes;
mod slope;
mod spans;
mod utilities;

pub use clip::{ClipState, FloorClip, MAX_FFLOORS, PortalClip};
pub use defs::{
    ColumnExtent, FloorRef, PlaneId, PlaneKey, PlaneSurface, Polyobj, SENTINEL_BOTTOM,
    SENTINEL_TOP, Viewpoint, Visplane,
};
pub use draw::{Palette, SoftSpanDrawer};
pub use lighting::{ColourmapData, LightTables, PlaneShade};
pub use mapper::{
    PlanarMapper, PlanarSetup, PlaneTables, Ripple, RippleClock, RowMapping, TiltedMapper,
    TiltedSetup, map_planar_row, plane_ripple, prepare_tilted,
};
pub use planes::{PlaneRegistry, PlaneSlot, VISPLANE_HASH};
pub use slope::{Slope, SlopeBasis, SlopeScratch, TiltedCoefficients};
pub use spans::{SpanEmitter, SpanSink};
pub use utilities::{DEFAULT_FOV, build_yslope, projection};

/// Counts for one frame of plane drawing
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub planes: usize,
    pub sky_planes: usize,
    pub tilted_planes: usize,
    pub spans: usize,
    pub pixels: usize,
}

/// Everything the plane renderer keeps between calls in a frame, and from
/// frame to frame. The traversal is handed `clip` and `planes` to fill in,
/// then `draw_planes` turns the planes in to spans.
///
/// A frame runs `begin_frame`, the traversal, `draw_planes`, `end_frame`.
pub struct FrameRenderContext {
    pub clip: ClipState,
    pub planes: PlaneRegistry,
    emitter: SpanEmitter,
    tables: PlaneTables,
    lights: LightTables,
    /// Allocated on the first sloped plane
    slope_scratch: Option<SlopeScratch>,
    view: Viewpoint,
    clock: RippleClock,
    /// Shade with the alternate palette
    encore: bool,
    stats: FrameStats,
    screen_width: usize,
    screen_height: usize,
}

impl FrameRenderContext {
    pub fn new(screen_width: usize, screen_height: usize, fov: f32, sky_picnum: usize) -> Self {
        debug!("Plane renderer {screen_width}x{screen_height}, fov {:.1}", fov.to_degrees());
        Self {
            clip: ClipState::new(screen_width, screen_height),
            planes: PlaneRegistry::new(screen_width, sky_picnum),
            emitter: SpanEmitter::new(screen_width, screen_height),
            tables: PlaneTables::new(screen_width, screen_height, fov),
            lights: LightTables::new(),
            slope_scratch: None,
            view: Viewpoint::default(),
            clock: RippleClock::default(),
            encore: false,
            stats: FrameStats::default(),
            screen_width,
            screen_height,
        }
    }

    /// Change resolution. Must be called between frames.
    pub fn set_view_size(&mut self, screen_width: usize, screen_height: usize) {
        if (screen_width, screen_height) == (self.screen_width, self.screen_height) {
            return;
        }
        debug!("Plane renderer resized to {screen_width}x{screen_height}");
        self.screen_width = screen_width;
        self.screen_height = screen_height;
        self.clip.reset(screen_width, screen_height);
        self.planes.resize(screen_width);
        self.emitter.resize(screen_width, screen_height);
        self.tables.resize(screen_width, screen_height);
        self.slope_scratch = None;
    }

    pub fn screen_width(&self) -> usize {
        self.screen_width
    }

    pub fn screen_height(&self) -> usize {
        self.screen_height
    }

    pub fn view(&self) -> &Viewpoint {
        &self.view
    }

    pub fn tables(&self) -> &PlaneTables {
        &self.tables
    }

    pub fn lights(&self) -> &LightTables {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut LightTables {
        &mut self.lights
    }

    pub fn set_encore(&mut self, encore: bool) {
        self.encore = encore;
    }

    /// Stats of the last `draw_planes`
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn has_slope_scratch(&self) -> bool {
        self.slope_scratch.is_some()
    }

    /// R_ClearPlanes, at the beginning of a frame
    pub fn begin_frame(&mut self, view: Viewpoint, clock: RippleClock) {
        self.view = view;
        self.clock = clock;
        self.clip.reset(self.screen_width, self.screen_height);
        self.tables.invalidate();
        self.stats = FrameStats::default();
    }

    /// Find a plane for a surface seen from the frame's viewpoint
    pub fn find_plane(
        &mut self,
        surface: &PlaneSurface,
        slope: Option<&Slope>,
        polyobj: Option<&Polyobj>,
    ) -> PlaneId {
        let view = self.view;
        self.planes.find_plane(surface, &view, slope, polyobj)
    }

    /// R_DrawPlanes: map and draw every plane found this frame
    pub fn draw_planes<F, D>(&mut self, flats: &F, drawer: &mut D) -> FrameStats
    where
        F: FlatSource + ?Sized,
        D: SpanDrawer + ?Sized,
    {
        #[cfg(feature = "hprof")]
        profile!("draw_planes");
        let sky = self.planes.sky_picnum();

        for id in self.planes.active_planes() {
            let plane = self.planes.plane(id);
            if plane.minx > plane.maxx {
                continue;
            }
            if plane.key.picnum == sky {
                // drawn by the sky renderer
                self.stats.sky_planes += 1;
                continue;
            }

            let flat = flats.flat(plane.key.picnum);
            let shade = self.lights.plane_shade(&plane.key, self.encore);

            if plane.key.slope.is_some() {
                let height = self.screen_height;
                let scratch = self.slope_scratch.get_or_insert_with(|| {
                    debug!("Allocating slope tables for {height} rows");
                    SlopeScratch::new(height)
                });
                let Some(setup) = prepare_tilted(scratch, &self.tables, &plane.key, &self.clock)
                else {
                    continue;
                };
                let mut mapper = TiltedMapper {
                    tables: &self.tables,
                    lights: &self.lights,
                    scratch,
                    setup,
                    shade,
                    flat,
                    drawer: &mut *drawer,
                    stats: &mut self.stats,
                };
                self.emitter.emit(plane, &mut mapper);
                self.stats.tilted_planes += 1;
            } else {
                let mut mapper = PlanarMapper {
                    tables: &mut self.tables,
                    lights: &self.lights,
                    setup: PlanarSetup::new(&plane.key),
                    shade,
                    clock: self.clock,
                    flat,
                    drawer: &mut *drawer,
                    stats: &mut self.stats,
                };
                self.emitter.emit(plane, &mut mapper);
            }
            self.stats.planes += 1;
        }

        trace!(
            "Drew {} planes, {} spans, {} pixels",
            self.stats.planes, self.stats.spans, self.stats.pixels
        );
        self.stats
    }

    /// Recycle every plane for the next frame
    pub fn end_frame(&mut self) {
        self.planes.clear_planes();
    }
}
