//! Static spatial index for nearest-segment queries on a trace.
//!
//! Given a trace of N points (N-1 segments), [`Proximum`] answers "which
//! segment is closest to (lat, lng), and where on that segment does the
//! projection fall" without scanning all segments. It is used for
//! marker-to-trace snapping and tap-to-trace hit testing.
//!
//! The index is a fixed-depth quadtree over degree space. Segments are
//! short relative to Earth's curvature at the zoom levels involved, so
//! comparing squared distances in raw degrees (ignoring the
//! latitude-dependent longitude scale) is accurate enough for snapping,
//! and the fixed depth bounds build time and memory predictably for traces
//! up to tens of thousands of points.
//!
//! A segment near a split boundary is assigned to every quadrant whose
//! inflated bounds it touches, so boundary hits are never missed. The
//! query still descends a single root-to-leaf path, which makes the result
//! locally optimal within that leaf's candidate list; the nearest segment
//! of all can in rare cases live only in a sibling quadrant. Downstream
//! snapping tolerances absorb this, and the behavior is kept as-is.

use geo::{Coord, Rect};

/// Maximum quadtree depth.
const MAX_DEPTH: u32 = 8;

/// Margin in degrees added to every quadrant side before membership tests.
const QUADRANT_MARGIN: f64 = 0.001;

/// Fraction by which the trace bounding box is expanded on each side.
const BOUNDS_EXPAND_RATIO: f64 = 0.1;

/// A trace segment: start point, unit direction, and degree-space length.
///
/// The length is used only to clamp the projection parameter; it is not a
/// real-world distance.
#[derive(Debug, Clone)]
struct Segment {
    start: Coord,
    dir: Coord,
    len: f64,
    index: usize,
}

impl Segment {
    fn new(index: usize, start: Coord, end: Coord) -> Self {
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let len = (dx * dx + dy * dy).sqrt();
        let dir = if len > 0.0 {
            Coord {
                x: dx / len,
                y: dy / len,
            }
        } else {
            Coord { x: 0.0, y: 0.0 }
        };
        Self {
            start,
            dir,
            len,
            index,
        }
    }

    fn end(&self) -> Coord {
        Coord {
            x: self.start.x + self.dir.x * self.len,
            y: self.start.y + self.dir.y * self.len,
        }
    }
}

/// Quadtree node: a leaf with candidate segments, or a center point with
/// four children ordered NE, NW, SE, SW.
#[derive(Debug)]
enum Node {
    Leaf(Vec<Segment>),
    Branch {
        center: Coord,
        quads: Box<[Node; 4]>,
    },
}

/// Result of projecting a query point onto the nearest trace segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Index of the segment's start point in the trace
    pub index: usize,
    /// Projection parameter along the segment, normalized to [0, 1]
    pub alpha: f64,
    /// Latitude of the snapped point
    pub lat: f64,
    /// Longitude of the snapped point
    pub lng: f64,
}

/// Static nearest-segment index over a trace snapshot.
///
/// Built once per immutable snapshot of the `lat`/`lng` arrays; the owner
/// must rebuild it after any coordinate change.
///
/// # Example
/// ```
/// use trace_engine::Proximum;
///
/// let index = Proximum::new(&[0.0, 1.0], &[0.0, 1.0]);
/// let hit = index.find(0.5, 0.5).unwrap();
/// assert_eq!(hit.index, 0);
/// assert!((hit.alpha - 0.5).abs() < 1e-9);
/// ```
#[derive(Debug)]
pub struct Proximum {
    root: Node,
}

impl Proximum {
    /// Build the index from parallel latitude/longitude arrays.
    ///
    /// Traces with fewer than two points produce an index whose queries
    /// always return `None`.
    pub fn new(lat: &[f64], lng: &[f64]) -> Self {
        let n = lat.len().min(lng.len());
        let segments: Vec<Segment> = (1..n)
            .map(|i| {
                Segment::new(
                    i - 1,
                    Coord {
                        x: lng[i - 1],
                        y: lat[i - 1],
                    },
                    Coord {
                        x: lng[i],
                        y: lat[i],
                    },
                )
            })
            .collect();

        log::debug!("building proximum index over {} segments", segments.len());

        let root = match expanded_bounds(&lat[..n], &lng[..n]) {
            Some(bounds) => build_node(segments, bounds, 0),
            None => Node::Leaf(Vec::new()),
        };
        Self { root }
    }

    /// Find the nearest segment to `(lat, lng)` and the projection onto it.
    ///
    /// Descends a single root-to-leaf path by comparing the query point
    /// against node centers, then scans that leaf's candidates. Returns
    /// `None` when the leaf holds no candidates (degenerate or empty trace).
    pub fn find(&self, lat: f64, lng: f64) -> Option<Projection> {
        let query = Coord { x: lng, y: lat };
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(segments) => return best_projection(query, segments),
                Node::Branch { center, quads } => {
                    node = &quads[quadrant_of(query, *center)];
                }
            }
        }
    }

    /// Index of the trace point nearest to `(lat, lng)`.
    ///
    /// Projects onto the nearest segment and rounds to the nearer of its
    /// two endpoints. Used for snapping markers to the trace.
    pub fn nearest_point_index(&self, lat: f64, lng: f64) -> Option<usize> {
        let hit = self.find(lat, lng)?;
        if hit.alpha >= 0.5 {
            Some(hit.index + 1)
        } else {
            Some(hit.index)
        }
    }
}

/// Trace bounding box expanded by 10% per side.
///
/// The expansion guards against points sitting exactly on a split
/// boundary. Returns `None` for empty input.
fn expanded_bounds(lat: &[f64], lng: &[f64]) -> Option<Rect<f64>> {
    if lat.is_empty() {
        return None;
    }
    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;
    for (&la, &ln) in lat.iter().zip(lng) {
        min_lat = min_lat.min(la);
        max_lat = max_lat.max(la);
        min_lng = min_lng.min(ln);
        max_lng = max_lng.max(ln);
    }
    let lat_margin = (max_lat - min_lat) * BOUNDS_EXPAND_RATIO;
    let lng_margin = (max_lng - min_lng) * BOUNDS_EXPAND_RATIO;
    Some(Rect::new(
        Coord {
            x: min_lng - lng_margin,
            y: min_lat - lat_margin,
        },
        Coord {
            x: max_lng + lng_margin,
            y: max_lat + lat_margin,
        },
    ))
}

fn build_node(segments: Vec<Segment>, bounds: Rect<f64>, depth: u32) -> Node {
    if depth >= MAX_DEPTH || segments.is_empty() {
        return Node::Leaf(segments);
    }

    let center = bounds.center();
    let min = bounds.min();
    let max = bounds.max();

    // NE, NW, SE, SW
    let quadrant_bounds = [
        Rect::new(center, max),
        Rect::new(Coord { x: min.x, y: center.y }, Coord { x: center.x, y: max.y }),
        Rect::new(Coord { x: center.x, y: min.y }, Coord { x: max.x, y: center.y }),
        Rect::new(min, center),
    ];

    let quads = quadrant_bounds.map(|quad| {
        let members: Vec<Segment> = segments
            .iter()
            .filter(|seg| segment_in_bounds(&quad, seg))
            .cloned()
            .collect();
        build_node(members, quad, depth + 1)
    });

    Node::Branch {
        center,
        quads: Box::new(quads),
    }
}

/// Quadrant selector for query descent: NE=0, NW=1, SE=2, SW=3.
fn quadrant_of(query: Coord, center: Coord) -> usize {
    match (query.y >= center.y, query.x >= center.x) {
        (true, true) => 0,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    }
}

/// Membership test for assigning a segment to a quadrant.
///
/// The quadrant is inflated by [`QUADRANT_MARGIN`] on every side, then the
/// segment is tested for intersection with the inflated rect (slab
/// clipping). A segment whose endpoints both lie outside but which crosses
/// the quadrant is therefore still assigned to it, and a segment near a
/// boundary lands in every quadrant within the margin.
fn segment_in_bounds(bounds: &Rect<f64>, seg: &Segment) -> bool {
    let min = Coord {
        x: bounds.min().x - QUADRANT_MARGIN,
        y: bounds.min().y - QUADRANT_MARGIN,
    };
    let max = Coord {
        x: bounds.max().x + QUADRANT_MARGIN,
        y: bounds.max().y + QUADRANT_MARGIN,
    };

    let start = seg.start;
    let end = seg.end();
    let d = Coord {
        x: end.x - start.x,
        y: end.y - start.y,
    };

    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    for (delta, origin, lo, hi) in [
        (d.x, start.x, min.x, max.x),
        (d.y, start.y, min.y, max.y),
    ] {
        if delta == 0.0 {
            if origin < lo || origin > hi {
                return false;
            }
        } else {
            let ta = (lo - origin) / delta;
            let tb = (hi - origin) / delta;
            let (near, far) = if ta <= tb { (ta, tb) } else { (tb, ta) };
            t0 = t0.max(near);
            t1 = t1.min(far);
            if t0 > t1 {
                return false;
            }
        }
    }
    true
}

/// Scan candidates for the minimum squared degree-space distance.
fn best_projection(query: Coord, segments: &[Segment]) -> Option<Projection> {
    let mut best: Option<(f64, Projection)> = None;

    for seg in segments {
        let rel = Coord {
            x: query.x - seg.start.x,
            y: query.y - seg.start.y,
        };
        let t = (rel.x * seg.dir.x + rel.y * seg.dir.y).clamp(0.0, seg.len);
        let proj = Coord {
            x: seg.start.x + seg.dir.x * t,
            y: seg.start.y + seg.dir.y * t,
        };
        let dx = query.x - proj.x;
        let dy = query.y - proj.y;
        let d2 = dx * dx + dy * dy;

        if best.as_ref().map_or(true, |(bd, _)| d2 < *bd) {
            let alpha = if seg.len > 0.0 { t / seg.len } else { 0.0 };
            best = Some((
                d2,
                Projection {
                    index: seg.index,
                    alpha,
                    lat: proj.y,
                    lng: proj.x,
                },
            ));
        }
    }

    best.map(|(_, p)| p)
}
