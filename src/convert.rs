//! Wire-format conversion: validation, defaulting, decompression, derived
//! statistics, legacy marker migration, and marker snapping.
//!
//! The wire trace is the decoded JSON object handed over by the service
//! layer: sparse, with many optional fields, optionally delta-compressed
//! (tagged via `zip`), and possibly carrying markers in two legacy shapes.
//! [`from_wire`] turns it into a fully populated [`Trace`]; [`to_wire`]
//! is the inverse for saving.
//!
//! Malformed individual markers are dropped with a warning rather than
//! failing the whole conversion; only a missing `lat`/`lng` array is a
//! hard validation error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{Result, TraceError};
use crate::geo_utils::{self, DEFAULT_ELEVATION_THRESHOLD};
use crate::proximum::Proximum;
use crate::trace::{ChildRef, Marker, MarkerType, Trace};
use crate::TracePoint;

/// Maximum distance in meters for accepting a marker-to-trace snap.
pub const MAX_SNAP_DISTANCE: f64 = 25.0;

/// Profile display is disabled above this fraction of invalid altitude
/// samples.
const INVALID_ALTITUDE_DISABLE_RATIO: f64 = 0.7;

/// Profile display needs at least this many valid altitude samples.
const MIN_VALID_ALTITUDE_SAMPLES: usize = 3;

// ============================================================================
// Wire shapes
// ============================================================================

/// Wire-format trace as decoded from the service layer's JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WireTrace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dis: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tim: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acc: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hrt: Option<Vec<f64>>,
    /// 1 when the arrays are delta-compressed, 0 otherwise
    pub zip: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ascent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markers: Option<Vec<WireMarker>>,
    /// Legacy step markers keyed by trace-point index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<WireStep>>,
    /// Legacy POI markers with direct coordinates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poi: Option<Vec<WirePoi>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<WireChild>>,
}

/// Marker in the unified wire shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WireMarker {
    pub id: Option<u32>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub index: Option<usize>,
    #[serde(rename = "type")]
    pub marker_type: Option<u8>,
    pub text: Option<HashMap<String, String>>,
    pub icons: Option<Vec<usize>>,
    pub radius: Option<f64>,
    pub pause: Option<f64>,
}

/// Legacy step marker: text attached to a trace-point index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WireStep {
    pub index: Option<usize>,
    pub text: Option<HashMap<String, String>>,
    pub icon: Option<String>,
    pub pause: Option<f64>,
}

/// Legacy POI marker with direct coordinates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WirePoi {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub text: Option<HashMap<String, String>>,
    pub icon: Option<String>,
    pub radius: Option<f64>,
}

/// Child trace reference on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WireChild {
    pub id: u32,
    pub trace_id: String,
    pub name: String,
}

// ============================================================================
// Compression tag handling
// ============================================================================

/// Delta-compress the wire arrays in place. A no-op when the `zip` tag is
/// already set.
pub fn zip_trace(wire: &mut WireTrace) {
    if wire.zip == 1 {
        return;
    }
    if let Some(lat) = &mut wire.lat {
        *lat = codec::zip_coordinates(lat);
    }
    if let Some(lng) = &mut wire.lng {
        *lng = codec::zip_coordinates(lng);
    }
    if let Some(alt) = &mut wire.alt {
        *alt = codec::zip_altitudes(alt);
    }
    for scalars in [&mut wire.dis, &mut wire.tim, &mut wire.acc, &mut wire.hrt] {
        if let Some(values) = scalars {
            *values = codec::zip_scalars(values);
        }
    }
    wire.zip = 1;
}

/// Decompress the wire arrays in place. A no-op when the `zip` tag is
/// already clear.
pub fn unzip_trace(wire: &mut WireTrace) {
    if wire.zip == 0 {
        return;
    }
    if let Some(lat) = &mut wire.lat {
        *lat = codec::unzip_coordinates(lat);
    }
    if let Some(lng) = &mut wire.lng {
        *lng = codec::unzip_coordinates(lng);
    }
    for scalars in [
        &mut wire.alt,
        &mut wire.dis,
        &mut wire.tim,
        &mut wire.acc,
        &mut wire.hrt,
    ] {
        if let Some(values) = scalars {
            *values = codec::unzip_scalars(values);
        }
    }
    wire.zip = 0;
}

// ============================================================================
// Wire -> model
// ============================================================================

/// Convert a wire trace into the in-memory model.
///
/// Validates the mandatory arrays, decompresses if tagged, fills every
/// missing array, computes `dis` and elevation totals when absent,
/// repairs isolated bad altitude samples, migrates legacy markers, and
/// snaps unanchored markers to the trace.
pub fn from_wire(mut wire: WireTrace) -> Result<Trace> {
    if wire.lat.is_none() {
        return Err(TraceError::MissingArray { name: "lat" });
    }
    if wire.lng.is_none() {
        return Err(TraceError::MissingArray { name: "lng" });
    }

    unzip_trace(&mut wire);

    let mut lat = wire.lat.take().unwrap_or_default();
    let mut lng = wire.lng.take().unwrap_or_default();
    let n = lat.len().min(lng.len());
    lat.truncate(n);
    lng.truncate(n);

    let alt = take_matching(wire.alt.take(), n);
    let tim = take_matching(wire.tim.take(), n);
    let acc = take_matching(wire.acc.take(), n);
    let hrt = take_matching(wire.hrt.take(), n);

    // Altitude repair wants distance weights before the final `dis` is
    // known; invalid altitude samples would corrupt a 3-D distance pass,
    // so the weights come from horizontal-only distances (or the wire's
    // own `dis` when it is usable).
    let wire_dis = wire.dis.take().filter(|d| d.len() == n);
    let repair_weights = match &wire_dis {
        Some(dis) => dis.clone(),
        None => geo_utils::cumulative_distances(&lat, &lng, &[]),
    };
    let (alt, show_profile) = repair_altitudes(alt, &repair_weights);

    // Cumulative distances: recompute on absence or length mismatch, and
    // rescale the computed values when the wire claims a total distance
    // (user-entered stats win over our approximation).
    let claimed_distance = wire.distance.filter(|d| *d > 0.0);
    let dis = match wire_dis {
        Some(dis) => dis,
        None => {
            let mut computed = geo_utils::cumulative_distances(&lat, &lng, &alt);
            if let Some(claimed) = claimed_distance {
                let last = computed.last().copied().unwrap_or(0.0);
                if last > 0.0 {
                    let factor = claimed / last;
                    for d in &mut computed {
                        *d *= factor;
                    }
                }
            }
            computed
        }
    };
    let distance = claimed_distance
        .or_else(|| dis.last().copied())
        .unwrap_or(0.0);

    let cumuls = geo_utils::elevation_cumuls(&alt, DEFAULT_ELEVATION_THRESHOLD);
    let ascent = wire
        .ascent
        .filter(|a| *a > 0.0)
        .unwrap_or_else(|| cumuls.total_ascent());
    let descent = wire
        .descent
        .filter(|d| *d > 0.0)
        .unwrap_or_else(|| cumuls.total_descent());

    let mut icon_urls = wire.icon_urls.take().unwrap_or_default();
    let markers = collect_markers(&wire, &lat, &lng, &mut icon_urls);

    let children = wire
        .children
        .take()
        .unwrap_or_default()
        .into_iter()
        .map(|c| ChildRef {
            id: c.id,
            trace_id: c.trace_id,
            name: c.name,
        })
        .collect();

    Ok(Trace {
        lat,
        lng,
        alt,
        dis,
        tim,
        acc,
        hrt,
        markers,
        children,
        icon_urls,
        distance,
        ascent,
        descent,
        show_profile,
    })
}

/// Convert the in-memory model back to the wire shape, optionally
/// delta-compressing the arrays.
pub fn to_wire(trace: &Trace, compress: bool) -> WireTrace {
    let array = |values: &[f64]| {
        if values.is_empty() {
            None
        } else {
            Some(values.to_vec())
        }
    };

    let markers: Vec<WireMarker> = trace
        .markers
        .iter()
        .map(|m| WireMarker {
            id: Some(m.id),
            lat: Some(m.lat),
            lng: Some(m.lng),
            index: m.index,
            marker_type: Some(m.marker_type.code()),
            text: if m.text.is_empty() {
                None
            } else {
                Some(m.text.clone())
            },
            icons: if m.icons.is_empty() {
                None
            } else {
                Some(m.icons.clone())
            },
            radius: m.radius,
            pause: m.pause,
        })
        .collect();

    let children: Vec<WireChild> = trace
        .children
        .iter()
        .map(|c| WireChild {
            id: c.id,
            trace_id: c.trace_id.clone(),
            name: c.name.clone(),
        })
        .collect();

    let mut wire = WireTrace {
        lat: array(&trace.lat),
        lng: array(&trace.lng),
        alt: array(&trace.alt),
        dis: array(&trace.dis),
        tim: array(&trace.tim),
        acc: array(&trace.acc),
        hrt: array(&trace.hrt),
        zip: 0,
        distance: Some(trace.distance),
        ascent: Some(trace.ascent),
        descent: Some(trace.descent),
        markers: if markers.is_empty() {
            None
        } else {
            Some(markers)
        },
        text: None,
        poi: None,
        icon_urls: if trace.icon_urls.is_empty() {
            None
        } else {
            Some(trace.icon_urls.clone())
        },
        children: if children.is_empty() {
            None
        } else {
            Some(children)
        },
    };

    if compress {
        zip_trace(&mut wire);
    }
    wire
}

// ============================================================================
// Internals
// ============================================================================

/// Keep an optional array only when it matches the trace length.
fn take_matching(values: Option<Vec<f64>>, n: usize) -> Vec<f64> {
    match values {
        Some(v) if v.len() == n => v,
        _ => Vec::new(),
    }
}

/// Repair isolated invalid altitude samples and decide whether the data
/// is good enough to render an elevation profile.
///
/// Invalid samples (NaN, infinite, negative) are linearly interpolated
/// between the nearest valid neighbors, weighted by distance along the
/// trace rather than by index; runs at the edges copy the nearest valid
/// value. When more than 70% of samples are invalid, or fewer than 3
/// valid samples exist, the data is left untouched and the profile is
/// disabled instead.
fn repair_altitudes(mut alt: Vec<f64>, dis: &[f64]) -> (Vec<f64>, bool) {
    if alt.is_empty() {
        return (alt, false);
    }

    let is_valid = |a: f64| a.is_finite() && a >= 0.0;
    let valid_count = alt.iter().filter(|&&a| is_valid(a)).count();
    let invalid_ratio = 1.0 - valid_count as f64 / alt.len() as f64;
    if valid_count < MIN_VALID_ALTITUDE_SAMPLES || invalid_ratio > INVALID_ALTITUDE_DISABLE_RATIO {
        return (alt, false);
    }

    let n = alt.len();
    let mut i = 0;
    while i < n {
        if is_valid(alt[i]) {
            i += 1;
            continue;
        }
        // Invalid run [i, run_end)
        let mut run_end = i;
        while run_end < n && !is_valid(alt[run_end]) {
            run_end += 1;
        }

        let left = i.checked_sub(1);
        let right = if run_end < n { Some(run_end) } else { None };
        match (left, right) {
            (Some(l), Some(r)) => {
                let span = dis.get(r).copied().unwrap_or(0.0) - dis.get(l).copied().unwrap_or(0.0);
                for j in i..run_end {
                    alt[j] = if span > 0.0 {
                        let w = (dis.get(j).copied().unwrap_or(0.0)
                            - dis.get(l).copied().unwrap_or(0.0))
                            / span;
                        alt[l] + (alt[r] - alt[l]) * w
                    } else {
                        alt[l]
                    };
                }
            }
            (Some(l), None) => {
                for j in i..run_end {
                    alt[j] = alt[l];
                }
            }
            (None, Some(r)) => {
                for j in i..run_end {
                    alt[j] = alt[r];
                }
            }
            (None, None) => {}
        }
        i = run_end;
    }

    (alt, true)
}

/// Index of `url` in the shared icon table, appending it when new.
fn icon_index(icon_urls: &mut Vec<String>, url: &str) -> usize {
    if let Some(pos) = icon_urls.iter().position(|u| u == url) {
        pos
    } else {
        icon_urls.push(url.to_string());
        icon_urls.len() - 1
    }
}

/// Gather markers from the unified list and both legacy encodings, then
/// snap every marker lacking an index to the trace.
fn collect_markers(
    wire: &WireTrace,
    lat: &[f64],
    lng: &[f64],
    icon_urls: &mut Vec<String>,
) -> Vec<Marker> {
    let mut markers: Vec<Marker> = Vec::new();

    // Auto-assigned ids start above every explicit id on the wire, so a
    // marker without an id can never collide with one declared later.
    let mut next_id = wire
        .markers
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|m| m.id)
        .max()
        .unwrap_or(0);
    let mut assign_id = |given: Option<u32>| -> u32 {
        match given {
            Some(id) => id,
            None => {
                next_id += 1;
                next_id
            }
        }
    };

    for wm in wire.markers.as_deref().unwrap_or_default() {
        let (Some(m_lat), Some(m_lng)) = (wm.lat, wm.lng) else {
            log::warn!("dropping marker without coordinates");
            continue;
        };
        if !m_lat.is_finite() || !m_lng.is_finite() {
            log::warn!("dropping marker with non-finite coordinates");
            continue;
        }
        if let Some(id) = wm.id {
            if markers.iter().any(|m| m.id == id) {
                log::warn!("dropping marker with duplicate id {}", id);
                continue;
            }
        }
        let id = assign_id(wm.id);
        markers.push(Marker {
            id,
            lat: m_lat,
            lng: m_lng,
            index: wm.index.filter(|&i| i < lat.len()),
            marker_type: wm.marker_type.map(MarkerType::from_code).unwrap_or_default(),
            text: wm.text.clone().unwrap_or_default(),
            icons: wm.icons.clone().unwrap_or_default(),
            radius: wm.radius,
            pause: wm.pause,
        });
    }

    // Legacy step markers: anchored to a trace-point index
    for step in wire.text.as_deref().unwrap_or_default() {
        let Some(index) = step.index.filter(|&i| i < lat.len()) else {
            log::warn!("dropping legacy step marker with invalid index");
            continue;
        };
        let icons = step
            .icon
            .as_deref()
            .map(|url| vec![icon_index(icon_urls, url)])
            .unwrap_or_default();
        let id = assign_id(None);
        markers.push(Marker {
            id,
            lat: lat[index],
            lng: lng[index],
            index: Some(index),
            marker_type: MarkerType::Checkpoint,
            text: step.text.clone().unwrap_or_default(),
            icons,
            radius: None,
            pause: step.pause,
        });
    }

    // Legacy POI markers: direct coordinates, snapped below
    for poi in wire.poi.as_deref().unwrap_or_default() {
        let (Some(p_lat), Some(p_lng)) = (poi.lat, poi.lng) else {
            log::warn!("dropping legacy POI marker without coordinates");
            continue;
        };
        if !p_lat.is_finite() || !p_lng.is_finite() {
            log::warn!("dropping legacy POI marker with non-finite coordinates");
            continue;
        }
        let icons = poi
            .icon
            .as_deref()
            .map(|url| vec![icon_index(icon_urls, url)])
            .unwrap_or_default();
        let id = assign_id(None);
        markers.push(Marker {
            id,
            lat: p_lat,
            lng: p_lng,
            index: None,
            marker_type: MarkerType::Secondary,
            text: poi.text.clone().unwrap_or_default(),
            icons,
            radius: poi.radius,
            pause: None,
        });
    }

    snap_markers(&mut markers, lat, lng);
    markers
}

/// Snap markers lacking an index to the trace, accepting a snap only when
/// the marker sits within [`MAX_SNAP_DISTANCE`] meters of the trace.
fn snap_markers(markers: &mut [Marker], lat: &[f64], lng: &[f64]) {
    if lat.len() < 2 || markers.iter().all(|m| m.index.is_some()) {
        return;
    }
    let index = Proximum::new(lat, lng);
    for marker in markers.iter_mut().filter(|m| m.index.is_none()) {
        let Some(hit) = index.find(marker.lat, marker.lng) else {
            continue;
        };
        let meters = geo_utils::distance(
            &TracePoint::new_2d(marker.lat, marker.lng),
            &TracePoint::new_2d(hit.lat, hit.lng),
            false,
        );
        if meters < MAX_SNAP_DISTANCE {
            marker.index = Some(if hit.alpha >= 0.5 {
                hit.index + 1
            } else {
                hit.index
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_wire() -> WireTrace {
        WireTrace {
            lat: Some(vec![45.0, 45.001, 45.002, 45.003]),
            lng: Some(vec![6.0, 6.0, 6.0, 6.0]),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_mandatory_arrays() {
        let wire = WireTrace::default();
        assert_eq!(
            from_wire(wire).unwrap_err(),
            TraceError::MissingArray { name: "lat" }
        );

        let wire = WireTrace {
            lat: Some(vec![1.0]),
            ..Default::default()
        };
        assert_eq!(
            from_wire(wire).unwrap_err(),
            TraceError::MissingArray { name: "lng" }
        );
    }

    #[test]
    fn test_zip_tag_idempotence() {
        let mut wire = base_wire();
        let original = wire.lat.clone();

        zip_trace(&mut wire);
        assert_eq!(wire.zip, 1);
        let zipped = wire.lat.clone();
        zip_trace(&mut wire);
        assert_eq!(wire.lat, zipped, "second zip must be a no-op");

        unzip_trace(&mut wire);
        assert_eq!(wire.zip, 0);
        unzip_trace(&mut wire);

        for (a, b) in original
            .unwrap()
            .iter()
            .zip(wire.lat.as_ref().unwrap())
        {
            assert!((a - b).abs() <= 1e-6);
        }
    }

    #[test]
    fn test_from_wire_decompresses_tagged_input() {
        let mut wire = base_wire();
        wire.tim = Some(vec![0.0, 10.0, 20.0, 30.0]);
        let expected_lat = wire.lat.clone().unwrap();
        zip_trace(&mut wire);

        let trace = from_wire(wire).unwrap();
        for (a, b) in expected_lat.iter().zip(&trace.lat) {
            assert!((a - b).abs() <= 1e-6);
        }
        assert_eq!(trace.tim, vec![0.0, 10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_distances_computed_and_monotonic() {
        let trace = from_wire(base_wire()).unwrap();
        assert_eq!(trace.dis.len(), 4);
        assert_eq!(trace.dis[0], 0.0);
        assert!(trace.dis[3] > 0.0);
        assert!((trace.distance - trace.dis[3]).abs() < 1e-9);
    }

    #[test]
    fn test_claimed_distance_rescales_computed() {
        let mut wire = base_wire();
        wire.distance = Some(1000.0);
        let trace = from_wire(wire).unwrap();
        assert!((trace.dis[3] - 1000.0).abs() < 1e-6);
        assert_eq!(trace.distance, 1000.0);
    }

    #[test]
    fn test_wire_distances_kept_when_length_matches() {
        let mut wire = base_wire();
        wire.dis = Some(vec![0.0, 5.0, 10.0, 15.0]);
        let trace = from_wire(wire).unwrap();
        assert_eq!(trace.dis, vec![0.0, 5.0, 10.0, 15.0]);
        assert_eq!(trace.distance, 15.0);
    }

    #[test]
    fn test_mismatched_arrays_are_dropped() {
        let mut wire = base_wire();
        wire.hrt = Some(vec![120.0, 130.0]); // wrong length
        let trace = from_wire(wire).unwrap();
        assert!(trace.hrt.is_empty());
    }

    #[test]
    fn test_isolated_bad_altitude_interpolated_by_distance() {
        let mut wire = base_wire();
        wire.alt = Some(vec![100.0, f64::NAN, 120.0, 130.0]);
        let trace = from_wire(wire).unwrap();
        assert!(trace.show_profile);
        // Near-uniform point spacing: the repaired sample is the midpoint
        assert!((trace.alt[1] - 110.0).abs() < 1e-2, "got {}", trace.alt[1]);
    }

    #[test]
    fn test_profile_disabled_with_too_few_valid_samples() {
        let mut wire = base_wire();
        wire.alt = Some(vec![100.0, f64::NAN, f64::NAN, 130.0]);
        let trace = from_wire(wire).unwrap();
        assert!(!trace.show_profile);
        // Data left untouched when the profile is disabled
        assert!(trace.alt[1].is_nan());
    }

    #[test]
    fn test_profile_disabled_when_mostly_invalid() {
        let mut wire = WireTrace {
            lat: Some((0..20).map(|i| 45.0 + i as f64 * 1e-4).collect()),
            lng: Some(vec![6.0; 20]),
            ..Default::default()
        };
        let mut alt = vec![f64::NAN; 20];
        alt[0] = 100.0;
        alt[1] = 110.0;
        alt[2] = 120.0;
        alt[3] = 130.0;
        wire.alt = Some(alt);
        let trace = from_wire(wire).unwrap();
        assert!(!trace.show_profile, "16/20 invalid must disable the profile");
    }

    #[test]
    fn test_elevation_totals_claimed_precedence() {
        let mut wire = base_wire();
        wire.alt = Some(vec![100.0, 120.0, 140.0, 160.0]);
        wire.ascent = Some(555.0);
        let trace = from_wire(wire).unwrap();
        assert_eq!(trace.ascent, 555.0);
        // Descent falls back to the computed total
        assert_eq!(trace.descent, 0.0);
    }

    #[test]
    fn test_legacy_step_and_poi_migration() {
        let mut wire = base_wire();
        wire.text = Some(vec![
            WireStep {
                index: Some(1),
                text: Some(HashMap::from([("en".into(), "summit".into())])),
                icon: Some("https://icons/summit.png".into()),
                ..Default::default()
            },
            WireStep {
                index: Some(99), // out of range, dropped
                ..Default::default()
            },
        ]);
        wire.poi = Some(vec![WirePoi {
            lat: Some(45.001),
            lng: Some(6.1),
            icon: Some("https://icons/summit.png".into()),
            ..Default::default()
        }]);

        let trace = from_wire(wire).unwrap();
        assert_eq!(trace.markers.len(), 2);

        let step = &trace.markers[0];
        assert_eq!(step.marker_type, MarkerType::Checkpoint);
        assert_eq!(step.index, Some(1));
        assert_eq!(step.lat, 45.001);
        assert_eq!(step.text.get("en").unwrap(), "summit");

        let poi = &trace.markers[1];
        assert_eq!(poi.marker_type, MarkerType::Secondary);
        // Far off-trace: no snap
        assert_eq!(poi.index, None);

        // Both markers share one deduplicated icon entry
        assert_eq!(trace.icon_urls, vec!["https://icons/summit.png"]);
        assert_eq!(step.icons, poi.icons);
    }

    #[test]
    fn test_marker_snapped_within_tolerance() {
        let mut wire = base_wire();
        wire.markers = Some(vec![
            WireMarker {
                lat: Some(45.001),
                lng: Some(6.0000001), // well under a meter off-trace
                ..Default::default()
            },
            WireMarker {
                lat: Some(45.001),
                lng: Some(6.001), // ~80 m off-trace
                ..Default::default()
            },
        ]);
        let trace = from_wire(wire).unwrap();
        assert_eq!(trace.markers[0].index, Some(1));
        assert_eq!(trace.markers[1].index, None);
    }

    #[test]
    fn test_malformed_markers_dropped_individually() {
        let mut wire = base_wire();
        wire.markers = Some(vec![
            WireMarker {
                lat: Some(f64::NAN),
                lng: Some(6.0),
                ..Default::default()
            },
            WireMarker {
                lat: Some(45.0),
                lng: Some(6.0),
                id: Some(7),
                ..Default::default()
            },
        ]);
        let trace = from_wire(wire).unwrap();
        assert_eq!(trace.markers.len(), 1);
        assert_eq!(trace.markers[0].id, 7);
    }

    #[test]
    fn test_auto_ids_skip_later_explicit_ids() {
        let mut wire = base_wire();
        wire.markers = Some(vec![
            WireMarker {
                lat: Some(45.0),
                lng: Some(6.0),
                ..Default::default()
            },
            WireMarker {
                lat: Some(45.001),
                lng: Some(6.0),
                id: Some(1),
                ..Default::default()
            },
        ]);
        let trace = from_wire(wire).unwrap();
        assert_eq!(trace.markers.len(), 2);
        assert_eq!(trace.markers[0].id, 2);
        assert_eq!(trace.markers[1].id, 1);
    }

    #[test]
    fn test_duplicate_explicit_ids_dropped() {
        let mut wire = base_wire();
        wire.markers = Some(vec![
            WireMarker {
                lat: Some(45.0),
                lng: Some(6.0),
                id: Some(4),
                ..Default::default()
            },
            WireMarker {
                lat: Some(45.001),
                lng: Some(6.0),
                id: Some(4),
                ..Default::default()
            },
        ]);
        let trace = from_wire(wire).unwrap();
        assert_eq!(trace.markers.len(), 1);
        assert_eq!(trace.markers[0].lat, 45.0);
    }

    #[test]
    fn test_to_wire_round_trip() {
        let mut wire = base_wire();
        wire.alt = Some(vec![100.0, 110.0, 120.0, 130.0]);
        let trace = from_wire(wire).unwrap();

        let reencoded = to_wire(&trace, true);
        assert_eq!(reencoded.zip, 1);
        let restored = from_wire(reencoded).unwrap();

        for (a, b) in trace.lat.iter().zip(&restored.lat) {
            assert!((a - b).abs() <= 1e-6);
        }
        assert_eq!(restored.alt, trace.alt);
        assert_eq!(restored.markers, trace.markers);
    }
}
