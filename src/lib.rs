//! # Trace Engine
//!
//! Pure geospatial trace engine: the numeric and structural core behind a
//! GPS trace mapping application.
//!
//! This library provides:
//! - Distance and elevation kernels over parallel lat/lng/alt arrays
//! - Delta compression of coordinate and scalar streams (the wire format)
//! - A static quadtree index for nearest-segment queries ("Proximum")
//! - An undo/redo-capable trace editor with change notification
//! - Wire-format validation, normalization, and legacy marker migration
//!
//! Everything is single-threaded and synchronous: no I/O, no locks, no
//! background work. The surrounding service layer owns networking and
//! persistence and hands decoded wire traces to [`convert::from_wire`].
//!
//! ## Quick Start
//!
//! ```rust
//! use trace_engine::{convert, updater::TraceUpdater, WireTrace};
//!
//! let wire = WireTrace {
//!     lat: Some(vec![45.0, 45.001, 45.002]),
//!     lng: Some(vec![6.0, 6.0, 6.0]),
//!     ..Default::default()
//! };
//!
//! let trace = convert::from_wire(wire).expect("valid wire trace");
//! assert_eq!(trace.len(), 3);
//! assert!(trace.dis[2] > 0.0);
//!
//! let mut updater = TraceUpdater::new(trace);
//! let id = updater.add_marker(Default::default());
//! assert!(updater.has_marker(id));
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TraceError};

// Distance and elevation kernels
pub mod geo_utils;
pub use geo_utils::{
    cumulative_distances, distance, elevation_cumuls, find_index_from_distance,
    trace_elevation_cumuls, ElevationCumuls, DEFAULT_ELEVATION_THRESHOLD,
};

// Delta compression of coordinate/scalar streams
pub mod codec;

// Static spatial index for nearest-segment queries
pub mod proximum;
pub use proximum::{Projection, Proximum};

// Trace data model
pub mod trace;
pub use trace::{ChildRef, Marker, MarkerType, Trace, TraceDataLevel, TracePatch};

// Undo/redo trace state container
pub mod updater;
pub use updater::{ListenerId, TraceUpdater};

// Low-level splice-based point editor
pub mod editor;
pub use editor::{PointEditor, PointSnapshot, Splice};

// Wire-format conversion and normalization
pub mod convert;
pub use convert::{WireMarker, WirePoi, WireStep, WireTrace};

// ============================================================================
// Core Types
// ============================================================================

/// A single trace point: coordinates in WGS84 degrees, altitude in meters.
///
/// # Example
/// ```
/// use trace_engine::TracePoint;
/// let point = TracePoint::new(45.8326, 6.8652, 4808.7); // Mont Blanc
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub lat: f64,
    pub lng: f64,
    /// Altitude in meters; NaN when unknown
    pub alt: f64,
}

impl TracePoint {
    /// Create a point with altitude.
    pub fn new(lat: f64, lng: f64, alt: f64) -> Self {
        Self { lat, lng, alt }
    }

    /// Create a point without altitude.
    pub fn new_2d(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            alt: f64::NAN,
        }
    }

    /// Check that the coordinates are finite and inside WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat >= -90.0
            && self.lat <= 90.0
            && self.lng >= -180.0
            && self.lng <= 180.0
    }

    /// Whether the point carries a usable altitude.
    pub fn has_altitude(&self) -> bool {
        self.alt.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_point_validation() {
        assert!(TracePoint::new_2d(45.0, 6.0).is_valid());
        assert!(!TracePoint::new_2d(91.0, 0.0).is_valid());
        assert!(!TracePoint::new_2d(0.0, 181.0).is_valid());
        assert!(!TracePoint::new_2d(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_trace_point_altitude() {
        assert!(TracePoint::new(45.0, 6.0, 1000.0).has_altitude());
        assert!(!TracePoint::new_2d(45.0, 6.0).has_altitude());
    }
}
