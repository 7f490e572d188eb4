//! A small synthetic room for the plane renderer to draw. It stands in for a
//! level's BSP traversal: each bay is a run of screen columns with a floor,
//! a ceiling and a wall at a fixed distance, and the traversal marks the
//! rows above and below the wall in to planes the same way seg rendering
//! would.

use glam::Vec2;
use log::debug;
use math::{Angle, FixedPoint};
use render_soft::{
    ColourmapData, FloorRef, FrameRenderContext, Palette, PlaneId, PlaneSurface, Polyobj, Slope,
    Viewpoint,
};
use render_trait::{COLOURMAP_SIZE, FlatPic, FlatSource, NUMCOLOURMAPS};

pub const SKY_PICNUM: usize = 0;
const FLAT_CHECKER: usize = 1;
const FLAT_TILES: usize = 2;
const FLAT_WATER: usize = 3;
const FLAT_GRASS: usize = 4;
const FLAT_CEILING: usize = 5;

/// Shades per palette ramp
const RAMP: usize = 64;
const RAMP_COLOURS: [[u8; 3]; 4] = [
    [200, 200, 210], // grey
    [190, 120, 60],  // brown
    [70, 120, 230],  // blue
    [80, 190, 70],   // green
];

const VIEW_HEIGHT: f32 = 41.0;
const ORBIT_RADIUS: f32 = 96.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wall {
    Solid,
    /// Two sided, the middle of the column stays open for a portal
    Window,
}

struct Bay {
    /// Fractions of the screen width
    x1: f32,
    x2: f32,
    floor: PlaneSurface,
    ceiling: PlaneSurface,
    slope: Option<Slope>,
    /// A stacked floor above the real one
    water: Option<PlaneSurface>,
    turntable: bool,
    wall_dist: f32,
    wall: Wall,
}

impl Bay {
    fn new(x1: f32, x2: f32, floor: PlaneSurface, ceiling: PlaneSurface, wall_dist: f32) -> Self {
        Self {
            x1,
            x2,
            floor,
            ceiling,
            slope: None,
            water: None,
            turntable: false,
            wall_dist,
            wall: Wall::Solid,
        }
    }

    fn columns(&self, width: i32) -> (i32, i32) {
        let x1 = (self.x1 * width as f32) as i32;
        let x2 = ((self.x2 * width as f32) as i32 - 1).min(width - 1);
        (x1, x2)
    }
}

pub struct SceneFlats(Vec<FlatPic>);

impl FlatSource for SceneFlats {
    fn flat(&self, picnum: usize) -> &FlatPic {
        &self.0[picnum.min(self.0.len() - 1)]
    }
}

pub struct Scene {
    bays: Vec<Bay>,
    /// Seen through the window bay, from `portal_offset` away
    portal: Bay,
    portal_offset: Vec2,
    flats: SceneFlats,
    palette: Palette,
    colourmaps: ColourmapData,
}

fn fixed(v: f32) -> FixedPoint {
    FixedPoint::from_f32(v)
}

/// Palette index of shade `s` (0 dark, 63 bright) in ramp `r`
fn ramp(r: usize, s: usize) -> u8 {
    (r * RAMP + s.min(RAMP - 1)) as u8
}

fn build_palette() -> Palette {
    let mut palette = [[0, 0, 0, 255]; 256];
    for (r, base) in RAMP_COLOURS.iter().enumerate() {
        for s in 0..RAMP {
            let p = &mut palette[r * RAMP + s];
            for c in 0..3 {
                p[c] = (base[c] as usize * (s + 1) / RAMP) as u8;
            }
        }
    }
    palette
}

/// Fade each ramp toward its darkest shade. The alternate half swaps the
/// ramps around so the encore remap is obvious.
fn build_colourmaps() -> Vec<u8> {
    let mut lump = Vec::with_capacity(NUMCOLOURMAPS * COLOURMAP_SIZE * 2);
    for shift in [0, 1] {
        for level in 0..NUMCOLOURMAPS {
            let keep = NUMCOLOURMAPS - level;
            for i in 0..COLOURMAP_SIZE {
                let (r, s) = (i / RAMP, i % RAMP);
                lump.push(ramp((r + shift) % RAMP_COLOURS.len(), s * keep / NUMCOLOURMAPS));
            }
        }
    }
    lump
}

/// Everything to grey, and never fully dark
fn build_fog() -> Vec<u8> {
    let mut table = Vec::with_capacity(NUMCOLOURMAPS * COLOURMAP_SIZE);
    for level in 0..NUMCOLOURMAPS {
        let keep = NUMCOLOURMAPS - level / 2;
        for i in 0..COLOURMAP_SIZE {
            table.push(ramp(0, (i % RAMP) * keep / NUMCOLOURMAPS));
        }
    }
    table
}

fn flat(name: &str, size: usize, texel: impl Fn(usize, usize) -> u8) -> FlatPic {
    let mut data = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            data.push(texel(x, y));
        }
    }
    FlatPic::new(name, data)
}

fn build_flats() -> SceneFlats {
    // cheap hash for grass noise
    let noise = |x: usize, y: usize| ((x * 73 + y * 151) ^ (x * y * 19)) % 17;
    let flats = SceneFlats(vec![
        flat("F_SKY1", 64, |_, _| ramp(2, 63)),
        flat("CHECKER", 64, |x, y| {
            if (x / 8 + y / 8) & 1 == 0 {
                ramp(1, 52)
            } else {
                ramp(1, 28)
            }
        }),
        flat("TILES", 128, |x, y| {
            if x % 32 == 0 || y % 32 == 0 {
                ramp(0, 20)
            } else {
                ramp(0, 48)
            }
        }),
        flat("WATER", 64, |x, y| {
            let a = (x as f32 / 64.0 * std::f32::consts::TAU).sin();
            let b = (y as f32 / 32.0 * std::f32::consts::TAU).cos();
            ramp(2, (40.0 + 10.0 * a * b) as usize)
        }),
        flat("GRASS", 64, |x, y| ramp(3, 30 + noise(x, y))),
        flat("CEIL", 64, |x, y| {
            let d = (x as i32 - 32).pow(2) + (y as i32 - 32).pow(2);
            ramp(0, 24 + (d as usize / 40) % 16)
        }),
    ]);
    for (picnum, flat) in flats.0.iter().enumerate() {
        debug!("Flat {picnum}: {} {:?}", flat.name(), flat.size());
    }
    flats
}

impl Scene {
    pub fn new() -> Self {
        let mut colourmaps = ColourmapData::new(build_colourmaps());
        let fog = colourmaps.add_extra(build_fog());

        let floor = PlaneSurface::new(FixedPoint::ZERO, FLAT_CHECKER, 176);
        let ceiling = PlaneSurface::new(fixed(128.0), FLAT_CEILING, 144);
        let sky = PlaneSurface::new(fixed(160.0), SKY_PICNUM, 255);

        let mut bays = Vec::new();
        bays.push(Bay::new(0.0, 0.2, floor, sky, 512.0));

        let tiles = PlaneSurface::new(FixedPoint::ZERO, FLAT_TILES, 208);
        let mut sloped = Bay::new(0.2, 0.4, tiles, ceiling, 384.0);
        sloped.slope = Some(Slope::new(
            1,
            (FixedPoint::ZERO, FixedPoint::ZERO, FixedPoint::ZERO),
            Angle::from_degrees(90.0),
            fixed(0.125),
        ));
        bays.push(sloped);

        // same floor as the first bay, so they share one plane
        let mut window = Bay::new(0.4, 0.6, floor, ceiling, 256.0);
        window.wall = Wall::Window;
        bays.push(window);

        let mut fogged = ceiling;
        fogged.colourmap = Some(fog);
        let pool_floor = PlaneSurface::new(fixed(-32.0), FLAT_CHECKER, 160);
        let mut pool = Bay::new(0.6, 0.8, pool_floor, fogged, 320.0);
        let mut water = PlaneSurface::new(fixed(-8.0), FLAT_WATER, 192);
        water.floor = Some(FloorRef { id: 1, ripple: true });
        water.no_encore = true;
        pool.water = Some(water);
        bays.push(pool);

        let disc = PlaneSurface::new(fixed(8.0), FLAT_TILES, 192);
        let mut turntable = Bay::new(0.8, 1.0, disc, ceiling, 448.0);
        turntable.turntable = true;
        bays.push(turntable);

        let portal = Bay::new(
            0.4,
            0.6,
            PlaneSurface::new(fixed(-16.0), FLAT_GRASS, 224),
            sky,
            1024.0,
        );

        Self {
            bays,
            portal,
            portal_offset: Vec2::new(4096.0, 0.0),
            flats: build_flats(),
            palette: build_palette(),
            colourmaps,
        }
    }

    pub fn flats(&self) -> &SceneFlats {
        &self.flats
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn colourmaps(&self) -> &ColourmapData {
        &self.colourmaps
    }

    pub fn sky_colour(&self) -> [u8; 4] {
        self.palette[ramp(2, 63) as usize]
    }

    /// The view walks a circle and slowly turns
    pub fn view_at(&self, tic: u32) -> Viewpoint {
        let t = tic as f32 / 35.0;
        let pos = Vec2::from_angle(t * 0.5) * ORBIT_RADIUS;
        Viewpoint::new(
            fixed(pos.x),
            fixed(pos.y),
            fixed(VIEW_HEIGHT),
            Angle::from_degrees(90.0 + tic as f32 * 0.5),
        )
    }

    /// Mark every bay's planes for the frame, then the portal behind the
    /// window bay
    pub fn traverse(&self, ctx: &mut FrameRenderContext, tic: u32) {
        let width = ctx.screen_width() as i32;
        let view = *ctx.view();
        for bay in &self.bays {
            mark_bay(ctx, &view, bay, width, tic);
        }

        let (x1, x2) = self.portal.columns(width);
        if x1 > x2 {
            return;
        }
        let saved = ctx.clip.save_range(x1 as usize, x2 as usize + 1);
        ctx.clip.restore_range(x1 as usize, x2 as usize + 1, &saved);
        let portal_view = Viewpoint::new(
            view.x + fixed(self.portal_offset.x),
            view.y + fixed(self.portal_offset.y),
            view.z,
            view.angle,
        );
        mark_bay(ctx, &portal_view, &self.portal, width, tic);
        debug!("Portal drawn over columns {x1}..={x2}");
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

fn find_checked(
    ctx: &mut FrameRenderContext,
    surface: &PlaneSurface,
    view: &Viewpoint,
    slope: Option<&Slope>,
    polyobj: Option<&Polyobj>,
    x1: i32,
    x2: i32,
) -> PlaneId {
    let id = ctx.planes.find_plane(surface, view, slope, polyobj);
    ctx.planes.check_plane(id, x1, x2)
}

/// Project a height at the bay's wall distance to a screen row
fn wall_row(centery: f32, focal: f32, view_z: f32, height: FixedPoint, dist: f32) -> i32 {
    (centery - (height.to_f32() - view_z) * focal / dist).round() as i32
}

fn mark_bay(ctx: &mut FrameRenderContext, view: &Viewpoint, bay: &Bay, width: i32, tic: u32) {
    let (x1, x2) = bay.columns(width);
    if x1 > x2 {
        return;
    }
    let height = ctx.screen_height() as i32;
    let centery = ctx.tables().centery() as f32;
    let focal = ctx.tables().focal_length().to_f32();
    let view_z = view.z.to_f32();
    let wall_scale = fixed(focal / bay.wall_dist);
    let y_ceil = wall_row(centery, focal, view_z, bay.ceiling.height, bay.wall_dist);
    let y_floor = wall_row(centery, focal, view_z, bay.floor.height, bay.wall_dist);

    let polyobj = bay.turntable.then(|| Polyobj {
        id: 1,
        centre_x: FixedPoint::ZERO,
        centre_y: FixedPoint::ZERO,
        angle: Angle::from_degrees(tic as f32 * 2.0),
    });

    let ceiling = find_checked(ctx, &bay.ceiling, view, None, None, x1, x2);
    let floor = find_checked(ctx, &bay.floor, view, bay.slope.as_ref(), polyobj.as_ref(), x1, x2);
    let water = bay.water.map(|surface| {
        let id = ctx.planes.find_plane(&surface, view, None, None);
        ctx.planes.expand_plane(id, x1, x2);
        (id, wall_row(centery, focal, view_z, surface.height, bay.wall_dist))
    });

    for x in x1..=x2 {
        let Some((top, bottom)) = ctx.clip.open_rows(x as usize) else {
            continue;
        };

        let c_bottom = (y_ceil - 1).min(bottom);
        if top <= c_bottom {
            ctx.planes.plane_mut(ceiling).set_column(x, top, c_bottom);
        }
        let f_top = (y_floor + 1).max(top);
        if f_top <= bottom {
            ctx.planes.plane_mut(floor).set_column(x, f_top, bottom);
        }
        if let Some((id, y_water)) = water {
            let w_top = (y_water + 1).max(top);
            if w_top <= bottom {
                ctx.planes.plane_mut(id).set_column(x, w_top, bottom);
                let water_clip = ctx.clip.floor_clip_mut(0);
                water_clip.clip[x as usize] = w_top;
                water_clip.scale[x as usize] = wall_scale;
            }
        }

        match bay.wall {
            Wall::Solid => {
                ctx.clip.ceilingclip[x as usize] = height;
                ctx.clip.floorclip[x as usize] = -1;
            }
            Wall::Window => {
                let lintel = (y_floor - y_ceil) / 4;
                ctx.clip.ceilingclip[x as usize] = (y_ceil + lintel).clamp(-1, height);
                ctx.clip.floorclip[x as usize] = (y_floor - lintel).clamp(-1, height);
            }
        }
    }
}
