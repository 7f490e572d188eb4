//! Turn a plane's column silhouette in to row spans.
//!
//! Walk the columns left to right comparing each with the one before it.
//! Rows that close at a column end a span that started where the row opened,
//! rows that open record their start. Only the silhouette edges are touched,
//! never the area.

#[cfg(feature = "hprof")]
use coarse_prof::profile;

use crate::defs::Visplane;

/// Receives spans from the emitter: row `y`, columns `x1..=x2`
pub trait SpanSink {
    fn map_span(&mut self, y: i32, x1: i32, x2: i32);
}

impl SpanSink for Vec<(i32, i32, i32)> {
    fn map_span(&mut self, y: i32, x1: i32, x2: i32) {
        self.push((y, x1, x2));
    }
}

pub struct SpanEmitter {
    /// spanstart holds the start of a plane span
    spanstart: Vec<i32>,
    screen_width: i32,
    screen_height: i32,
}

impl SpanEmitter {
    pub fn new(screen_width: usize, screen_height: usize) -> Self {
        Self {
            spanstart: vec![0; screen_height],
            screen_width: screen_width as i32,
            screen_height: screen_height as i32,
        }
    }

    pub fn resize(&mut self, screen_width: usize, screen_height: usize) {
        self.spanstart.clear();
        self.spanstart.resize(screen_height, 0);
        self.screen_width = screen_width as i32;
        self.screen_height = screen_height as i32;
    }

    /// Emit every span of the plane to `sink`. Returns the number emitted.
    pub fn emit(&mut self, plane: &Visplane, sink: &mut impl SpanSink) -> usize {
        #[cfg(feature = "hprof")]
        profile!("emit_spans");
        if plane.minx > plane.maxx {
            return 0;
        }

        // the column past maxx is a guard column, always unclaimed
        let start = plane.minx.max(0);
        let stop = (plane.maxx + 1).min(self.screen_width);
        let mut count = 0;
        for x in start..=stop {
            let (t1, b1) = self.rows(plane, x - 1);
            let (t2, b2) = self.rows(plane, x);
            count += self.make_spans(x, t1, b1, t2, b2, sink);
        }
        count
    }

    /// Visible rows of column `x`, unclaimed columns are an empty range that
    /// starts below the screen
    #[inline]
    fn rows(&self, plane: &Visplane, x: i32) -> (i32, i32) {
        let last = self.screen_height - 1;
        match plane.column(x) {
            Some(c) => ((c.top as i32).min(last), (c.bottom as i32).min(last)),
            None => (self.screen_height, -1),
        }
    }

    #[inline]
    fn make_spans(
        &mut self,
        x: i32,
        mut t1: i32,
        mut b1: i32,
        mut t2: i32,
        mut b2: i32,
        sink: &mut impl SpanSink,
    ) -> usize {
        let mut count = 0;
        while t1 < t2 && t1 <= b1 {
            sink.map_span(t1, self.spanstart[t1 as usize], x - 1);
            t1 += 1;
            count += 1;
        }

        while b1 > b2 && b1 >= t1 {
            sink.map_span(b1, self.spanstart[b1 as usize], x - 1);
            b1 -= 1;
            count += 1;
        }

        while t2 < t1 && t2 <= b2 {
            self.spanstart[t2 as usize] = x;
            t2 += 1;
        }

        while b2 > b1 && b2 >= t2 {
            self.spanstart[b2 as usize] = x;
            b2 -= 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::SpanEmitter;
    use crate::defs::{PlaneKey, Viewpoint, Visplane};
    use math::{Angle, FixedPoint};

    fn plane(width: usize) -> Visplane {
        let key = PlaneKey {
            height: FixedPoint::ZERO,
            picnum: 0,
            light_level: 0,
            x_offset: FixedPoint::ZERO,
            y_offset: FixedPoint::ZERO,
            angle: Angle::ZERO,
            colourmap: None,
            floor: None,
            polyobj: None,
            slope: None,
            view: Viewpoint::default(),
            no_encore: false,
        };
        Visplane::new(key, width)
    }

    fn fill(plane: &mut Visplane, x1: i32, x2: i32, top: i32, bottom: i32) {
        plane.minx = plane.minx.min(x1);
        plane.maxx = plane.maxx.max(x2);
        for x in x1..=x2 {
            plane.set_column(x, top, bottom);
        }
    }

    #[test]
    fn scenario_a() {
        let mut p = plane(4);
        fill(&mut p, 0, 3, 2, 5);
        let mut emitter = SpanEmitter::new(4, 8);
        let mut spans = Vec::new();
        assert_eq!(emitter.emit(&p, &mut spans), 4);
        spans.sort();
        assert_eq!(spans, vec![(2, 0, 3), (3, 0, 3), (4, 0, 3), (5, 0, 3)]);
    }

    #[test]
    fn rectangular_coverage() {
        let mut p = plane(320);
        fill(&mut p, 17, 200, 40, 99);
        let mut emitter = SpanEmitter::new(320, 200);
        let mut spans = Vec::new();
        emitter.emit(&p, &mut spans);
        assert_eq!(spans.len(), 99 - 40 + 1);
        assert!(spans.iter().all(|&(_, x1, x2)| x1 == 17 && x2 == 200));
    }

    #[test]
    fn staircase_covers_every_pixel_once() {
        let mut p = plane(16);
        // a floor rising to the right
        for x in 0..16 {
            fill(&mut p, x, x, 15 - x / 2, 15);
        }
        let mut emitter = SpanEmitter::new(16, 16);
        let mut spans = Vec::new();
        emitter.emit(&p, &mut spans);

        let mut covered = [[0u8; 16]; 16];
        for (y, x1, x2) in spans {
            for x in x1..=x2 {
                covered[y as usize][x as usize] += 1;
            }
        }
        for x in 0..16 {
            for y in 0..16 {
                let inside = y >= 15 - x / 2;
                assert_eq!(covered[y as usize][x as usize], inside as u8, "x {x} y {y}");
            }
        }
    }

    #[test]
    fn gap_splits_spans() {
        let mut p = plane(10);
        fill(&mut p, 0, 2, 3, 3);
        fill(&mut p, 6, 9, 3, 3);
        let mut emitter = SpanEmitter::new(10, 10);
        let mut spans = Vec::new();
        emitter.emit(&p, &mut spans);
        assert_eq!(spans, vec![(3, 0, 2), (3, 6, 9)]);
    }

    #[test]
    fn rows_below_screen_clamped() {
        let mut p = plane(4);
        fill(&mut p, 0, 3, 6, 500);
        let mut emitter = SpanEmitter::new(4, 8);
        let mut spans = Vec::new();
        emitter.emit(&p, &mut spans);
        spans.sort();
        assert_eq!(spans, vec![(6, 0, 3), (7, 0, 3)]);
    }

    #[test]
    fn empty_plane_emits_nothing() {
        let p = plane(8);
        let mut emitter = SpanEmitter::new(8, 8);
        let mut spans = Vec::new();
        assert_eq!(emitter.emit(&p, &mut spans), 0);
        assert!(spans.is_empty());
    }

    #[test]
    fn extent_past_screen_edge_is_clamped() {
        let mut p = plane(4);
        // claims beyond the right edge are dropped, the edge still flushes
        fill(&mut p, 0, 4, 2, 5);
        p.maxx = 9;
        let mut emitter = SpanEmitter::new(4, 8);
        let mut spans = Vec::new();
        assert_eq!(emitter.emit(&p, &mut spans), 4);
        spans.sort();
        assert_eq!(spans, vec![(2, 0, 3), (3, 0, 3), (4, 0, 3), (5, 0, 3)]);
    }
}
