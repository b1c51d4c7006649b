//! In-memory trace model: parallel point arrays, markers, and child trace
//! references, plus the sparse patch type used for updates and undo/redo.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::TracePoint;

/// Marker kind, stored as a small integer code on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MarkerType {
    /// Present in the data but never rendered
    Invisible,
    #[default]
    Primary,
    Secondary,
    /// Passage checkpoint along the trace
    Checkpoint,
    /// Plays an audio message when reached
    Audio,
}

impl MarkerType {
    /// Decode a wire code. Unknown codes fall back to `Primary`.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => MarkerType::Invisible,
            1 => MarkerType::Primary,
            2 => MarkerType::Secondary,
            3 => MarkerType::Checkpoint,
            4 => MarkerType::Audio,
            _ => MarkerType::Primary,
        }
    }

    /// Wire code for this marker type.
    pub fn code(&self) -> u8 {
        match self {
            MarkerType::Invisible => 0,
            MarkerType::Primary => 1,
            MarkerType::Secondary => 2,
            MarkerType::Checkpoint => 3,
            MarkerType::Audio => 4,
        }
    }
}

/// A point of interest attached to a trace.
///
/// `id` is unique within the trace and assigned by the editor; `index` is
/// the nearest trace-point index when the marker sits on the trace, and is
/// recomputed by the spatial index whenever the coordinates change.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Marker {
    pub id: u32,
    pub lat: f64,
    pub lng: f64,
    /// Nearest trace-point index, `None` when off-trace or unsnapped
    pub index: Option<usize>,
    pub marker_type: MarkerType,
    /// Language code -> text
    pub text: HashMap<String, String>,
    /// Indices into the trace's shared icon URL table
    pub icons: Vec<usize>,
    /// Detection radius in meters
    pub radius: Option<f64>,
    /// Pause duration in seconds
    pub pause: Option<f64>,
}

/// Reference to an embedded secondary trace.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChildRef {
    pub id: u32,
    pub trace_id: String,
    pub name: String,
}

/// Richest kind of per-point data a trace carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceDataLevel {
    /// Coordinates only
    Coordinates,
    /// Coordinates and altitude
    Altitude,
    /// Coordinates, altitude, and per-point timestamps
    Time,
}

/// A GPS trace as parallel ordered arrays plus attached metadata.
///
/// Invariant: every non-empty points array has the same length as `lat`,
/// and `dis` is monotonically non-decreasing. The wire-format converter
/// establishes these invariants; the editor preserves them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trace {
    pub lat: Vec<f64>,
    pub lng: Vec<f64>,
    /// Altitude in meters
    pub alt: Vec<f64>,
    /// Cumulative distance from start, meters
    pub dis: Vec<f64>,
    /// Seconds from start
    pub tim: Vec<f64>,
    /// Accuracy in meters
    pub acc: Vec<f64>,
    /// Heart rate
    pub hrt: Vec<f64>,
    pub markers: Vec<Marker>,
    pub children: Vec<ChildRef>,
    /// Shared icon URL table referenced by marker icon indices
    pub icon_urls: Vec<String>,
    /// Total distance in meters (claimed value takes precedence over the
    /// computed one, see the converter)
    pub distance: f64,
    /// Total ascent in meters
    pub ascent: f64,
    /// Total descent in meters
    pub descent: f64,
    /// Whether the altitude data is good enough to render a profile
    pub show_profile: bool,
}

impl Trace {
    /// Number of trace points.
    pub fn len(&self) -> usize {
        self.lat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    /// Point at index `i`, with altitude when available.
    ///
    /// Returns `None` when `i` is out of range.
    pub fn point(&self, i: usize) -> Option<TracePoint> {
        if i >= self.len() {
            return None;
        }
        let alt = self.alt.get(i).copied().unwrap_or(f64::NAN);
        Some(TracePoint::new(self.lat[i], self.lng[i], alt))
    }

    /// The richest per-point data this trace carries.
    pub fn data_level(&self) -> TraceDataLevel {
        if !self.tim.is_empty() {
            TraceDataLevel::Time
        } else if !self.alt.is_empty() {
            TraceDataLevel::Altitude
        } else {
            TraceDataLevel::Coordinates
        }
    }
}

/// Sparse trace patch: one optional slot per replaceable attribute.
///
/// Used as the argument to `TraceUpdater::update`, as both halves of an
/// undo/redo record, and as the change-event payload. Arrays are always
/// replaced whole, never diffed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TracePatch {
    pub lat: Option<Vec<f64>>,
    pub lng: Option<Vec<f64>>,
    pub alt: Option<Vec<f64>>,
    pub dis: Option<Vec<f64>>,
    pub tim: Option<Vec<f64>>,
    pub acc: Option<Vec<f64>>,
    pub hrt: Option<Vec<f64>>,
    pub markers: Option<Vec<Marker>>,
    pub children: Option<Vec<ChildRef>>,
    pub icon_urls: Option<Vec<String>>,
    pub distance: Option<f64>,
    pub ascent: Option<f64>,
    pub descent: Option<f64>,
    pub show_profile: Option<bool>,
}

impl TracePatch {
    /// True when no attribute is present.
    pub fn is_empty(&self) -> bool {
        self.lat.is_none()
            && self.lng.is_none()
            && self.alt.is_none()
            && self.dis.is_none()
            && self.tim.is_none()
            && self.acc.is_none()
            && self.hrt.is_none()
            && self.markers.is_none()
            && self.children.is_none()
            && self.icon_urls.is_none()
            && self.distance.is_none()
            && self.ascent.is_none()
            && self.descent.is_none()
            && self.show_profile.is_none()
    }

    /// True when the patch touches the coordinate arrays.
    pub fn touches_coordinates(&self) -> bool {
        self.lat.is_some() || self.lng.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_type_codes_round_trip() {
        for t in [
            MarkerType::Invisible,
            MarkerType::Primary,
            MarkerType::Secondary,
            MarkerType::Checkpoint,
            MarkerType::Audio,
        ] {
            assert_eq!(MarkerType::from_code(t.code()), t);
        }
        // Unknown codes fall back to Primary
        assert_eq!(MarkerType::from_code(99), MarkerType::Primary);
    }

    #[test]
    fn test_data_level() {
        let mut trace = Trace {
            lat: vec![0.0, 1.0],
            lng: vec![0.0, 1.0],
            ..Default::default()
        };
        assert_eq!(trace.data_level(), TraceDataLevel::Coordinates);

        trace.alt = vec![100.0, 110.0];
        assert_eq!(trace.data_level(), TraceDataLevel::Altitude);

        trace.tim = vec![0.0, 30.0];
        assert_eq!(trace.data_level(), TraceDataLevel::Time);
    }

    #[test]
    fn test_point_accessor() {
        let trace = Trace {
            lat: vec![45.0],
            lng: vec![6.0],
            alt: vec![1200.0],
            ..Default::default()
        };
        let p = trace.point(0).unwrap();
        assert_eq!(p.lat, 45.0);
        assert_eq!(p.alt, 1200.0);
        assert!(trace.point(1).is_none());
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(TracePatch::default().is_empty());
        let patch = TracePatch {
            distance: Some(10.0),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        assert!(!patch.touches_coordinates());
        let patch = TracePatch {
            lat: Some(vec![1.0]),
            ..Default::default()
        };
        assert!(patch.touches_coordinates());
    }
}
