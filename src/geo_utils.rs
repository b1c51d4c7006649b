//! Geographic computation kernels: distance, cumulative distance arrays,
//! and elevation gain/loss accumulation.
//!
//! All functions in this module are best-effort numeric code: they never
//! return errors. Empty or malformed input produces empty or zero output,
//! because these kernels are called on every render of the map and profile
//! views and a single bad GPS sample must not abort a frame.

use crate::TracePoint;

/// WGS84 equatorial radius in meters.
pub const EQUATORIAL_RADIUS: f64 = 6_378_137.0;

/// WGS84 polar radius in meters.
pub const POLAR_RADIUS: f64 = 6_356_752.3;

/// Default hysteresis threshold for elevation accumulation, in meters.
///
/// Consumer GPS altitude is noisy to roughly +/-10 m; deltas below this
/// threshold are treated as noise and do not contribute to ascent/descent.
pub const DEFAULT_ELEVATION_THRESHOLD: f64 = 15.0;

/// Smallest accepted elevation threshold in meters.
pub const MIN_ELEVATION_THRESHOLD: f64 = 1.0;

/// Distance in meters between two points on an oblate-spheroid Earth.
///
/// Each point is projected to Earth-centered Cartesian coordinates using
/// the equatorial radius for the x/y plane and the polar radius for the
/// z axis, both offset outward by the point's altitude, then the straight
/// Euclidean distance between the two 3-D points is returned.
///
/// This trades ellipsoid precision for branch-free O(1) computation; the
/// error is a few meters over tens of kilometers, which is well inside GPS
/// accuracy for trace rendering and statistics.
///
/// # Example
/// ```
/// use trace_engine::{geo_utils::distance, TracePoint};
///
/// let paris = TracePoint::new_2d(48.8566, 2.3522);
/// let london = TracePoint::new_2d(51.5074, -0.1278);
/// let d = distance(&paris, &london, false);
/// assert!(d > 330_000.0 && d < 360_000.0);
/// ```
pub fn distance(p1: &TracePoint, p2: &TracePoint, with_altitude: bool) -> f64 {
    let a = cartesian(p1, with_altitude);
    let b = cartesian(p2, with_altitude);
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Project a point to the Earth-centered Cartesian approximation.
fn cartesian(p: &TracePoint, with_altitude: bool) -> [f64; 3] {
    let alt = if with_altitude && p.alt.is_finite() {
        p.alt
    } else {
        0.0
    };
    let lat = p.lat.to_radians();
    let lng = p.lng.to_radians();
    let r_xy = EQUATORIAL_RADIUS + alt;
    let r_z = POLAR_RADIUS + alt;
    [
        r_xy * lat.cos() * lng.cos(),
        r_xy * lat.cos() * lng.sin(),
        r_z * lat.sin(),
    ]
}

/// Cumulative distance array for a trace, in meters.
///
/// `dis[0]` is 0 and `dis[i]` is the running sum of consecutive point
/// distances, so the result is monotonically non-decreasing. Altitude is
/// taken into account only when `alt` has the same length as `lat`.
pub fn cumulative_distances(lat: &[f64], lng: &[f64], alt: &[f64]) -> Vec<f64> {
    let n = lat.len().min(lng.len());
    if n == 0 {
        return Vec::new();
    }
    let with_altitude = alt.len() == n;

    let mut dis = Vec::with_capacity(n);
    dis.push(0.0);
    let mut total = 0.0;
    for i in 1..n {
        let p1 = point_at(lat, lng, alt, i - 1, with_altitude);
        let p2 = point_at(lat, lng, alt, i, with_altitude);
        total += distance(&p1, &p2, with_altitude);
        dis.push(total);
    }
    dis
}

fn point_at(lat: &[f64], lng: &[f64], alt: &[f64], i: usize, with_altitude: bool) -> TracePoint {
    if with_altitude {
        TracePoint::new(lat[i], lng[i], alt[i])
    } else {
        TracePoint::new_2d(lat[i], lng[i])
    }
}

/// Per-index cumulative ascent and descent for an altitude sequence.
///
/// Both arrays have the same length as the input and are monotonically
/// non-decreasing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElevationCumuls {
    pub ascent: Vec<f64>,
    pub descent: Vec<f64>,
}

impl ElevationCumuls {
    /// Total accumulated ascent (last element, or 0 when empty).
    pub fn total_ascent(&self) -> f64 {
        self.ascent.last().copied().unwrap_or(0.0)
    }

    /// Total accumulated descent (last element, or 0 when empty).
    pub fn total_descent(&self) -> f64 {
        self.descent.last().copied().unwrap_or(0.0)
    }
}

/// Accumulate ascent and descent over an altitude sequence with hysteresis.
///
/// A sample only moves the accumulators when it differs from the last
/// *confirmed* altitude by more than `threshold` meters; smaller wiggles are
/// treated as GPS noise. When a sample is confirmed, the cumulative values
/// between the previous confirmed index and the new one are linearized
/// (linearly interpolated) so per-index values ramp smoothly instead of
/// jumping in stairs.
///
/// NaN and negative samples are skipped: the accumulators are carried
/// forward unchanged for those indices.
///
/// `threshold` is clamped to at least [`MIN_ELEVATION_THRESHOLD`].
pub fn elevation_cumuls(altitudes: &[f64], threshold: f64) -> ElevationCumuls {
    let threshold = threshold.max(MIN_ELEVATION_THRESHOLD);
    let n = altitudes.len();
    let mut ascent = vec![0.0; n];
    let mut descent = vec![0.0; n];

    let mut confirmed: Option<(usize, f64)> = None;
    let mut asc = 0.0;
    let mut dsc = 0.0;

    for i in 0..n {
        let sample = altitudes[i];
        if !sample.is_finite() || sample < 0.0 {
            ascent[i] = asc;
            descent[i] = dsc;
            continue;
        }

        let Some((confirmed_idx, confirmed_alt)) = confirmed else {
            confirmed = Some((i, sample));
            ascent[i] = asc;
            descent[i] = dsc;
            continue;
        };

        let delta = sample - confirmed_alt;
        if delta >= threshold {
            let prev = asc;
            asc += delta;
            linearize(&mut ascent, confirmed_idx, i, prev, asc);
            descent[i] = dsc;
            confirmed = Some((i, sample));
        } else if delta <= -threshold {
            let prev = dsc;
            dsc -= delta;
            linearize(&mut descent, confirmed_idx, i, prev, dsc);
            ascent[i] = asc;
            confirmed = Some((i, sample));
        } else {
            ascent[i] = asc;
            descent[i] = dsc;
        }
    }

    ElevationCumuls { ascent, descent }
}

/// Replace `values[from..=to]` with a linear ramp from `start` to `end`.
fn linearize(values: &mut [f64], from: usize, to: usize, start: f64, end: f64) {
    if to <= from {
        values[to] = end;
        return;
    }
    let span = (to - from) as f64;
    for i in from..=to {
        values[i] = start + (end - start) * ((i - from) as f64 / span);
    }
}

/// Ascent/descent cumuls over a window of a trace's altitude samples,
/// using the default threshold.
///
/// `from`/`to` are inclusive point indices, clamped to the array bounds.
pub fn trace_elevation_cumuls(trace: &crate::Trace, from: usize, to: usize) -> ElevationCumuls {
    if trace.alt.is_empty() || from > to {
        return ElevationCumuls::default();
    }
    let from = from.min(trace.alt.len() - 1);
    let to = to.min(trace.alt.len() - 1);
    elevation_cumuls(&trace.alt[from..=to], DEFAULT_ELEVATION_THRESHOLD)
}

/// Binary search a monotonic cumulative-distance array for the point index
/// nearest to `meters`.
///
/// Returns the closer of the two bracketing indices, or `None` when
/// `meters` falls outside `[dis[0], dis[last]]` (including empty input).
pub fn find_index_from_distance(dis: &[f64], meters: f64) -> Option<usize> {
    let last = *dis.last()?;
    if meters < dis[0] || meters > last {
        return None;
    }

    // partition_point gives the first index with dis[i] >= meters
    let hi = dis.partition_point(|&d| d < meters);
    if hi == 0 {
        return Some(0);
    }
    let lo = hi - 1;
    if meters - dis[lo] <= dis[hi] - meters {
        Some(lo)
    } else {
        Some(hi)
    }
}
