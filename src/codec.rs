//! Delta compression for coordinate and scalar streams.
//!
//! The wire format stores each array as its first value followed by
//! successive deltas: consecutive GPS samples are close together, so the
//! deltas are small integers that serialize far more compactly than raw
//! floating-point values.
//!
//! Two variants exist:
//! - **Coordinates** (`lat`/`lng`) are scaled by 1e6 and rounded before
//!   differencing, so the round trip is exact to 1e-6 degree (~0.1 m).
//! - **Scalars** (distance, time, heart rate, accuracy) are differenced
//!   as-is; altitudes are additionally rounded to whole meters first.
//!
//! All transforms are no-ops on empty input. The `zip` tag that makes the
//! trace-level transforms idempotent lives on the wire struct, not here;
//! see [`crate::convert`].

/// Scale factor applied to coordinates before integer rounding.
pub const COORD_SCALE: f64 = 1e6;

/// Delta-encode a coordinate array (degrees scaled by 1e6).
///
/// # Example
/// ```
/// use trace_engine::codec::zip_coordinates;
///
/// assert_eq!(
///     zip_coordinates(&[4.51, 5.0, 5.12]),
///     vec![4_510_000.0, 490_000.0, 120_000.0],
/// );
/// ```
pub fn zip_coordinates(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev = 0.0;
    for (i, v) in values.iter().enumerate() {
        let scaled = (v * COORD_SCALE).round();
        if i == 0 {
            out.push(scaled);
        } else {
            out.push(scaled - prev);
        }
        prev = scaled;
    }
    out
}

/// Invert [`zip_coordinates`]: running sum, then divide by the scale.
pub fn unzip_coordinates(deltas: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(deltas.len());
    let mut acc = 0.0;
    for d in deltas {
        acc += d;
        out.push(acc / COORD_SCALE);
    }
    out
}

/// Delta-encode a scalar array without scaling.
pub fn zip_scalars(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev = 0.0;
    for (i, v) in values.iter().enumerate() {
        if i == 0 {
            out.push(*v);
        } else {
            out.push(v - prev);
        }
        prev = *v;
    }
    out
}

/// Invert [`zip_scalars`] (or [`zip_altitudes`]): running sum.
pub fn unzip_scalars(deltas: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(deltas.len());
    let mut acc = 0.0;
    for d in deltas {
        acc += d;
        out.push(acc);
    }
    out
}

/// Delta-encode an altitude array, rounding to whole meters first.
///
/// Sub-meter altitude precision is pure GPS noise, so dropping it keeps
/// the deltas integral without losing information anyone can use.
pub fn zip_altitudes(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev = 0.0;
    for (i, v) in values.iter().enumerate() {
        let rounded = v.round();
        if i == 0 {
            out.push(rounded);
        } else {
            out.push(rounded - prev);
        }
        prev = rounded;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_round_trip() {
        let original = vec![45.123456, 45.123789, 45.124001, 45.123999];
        let zipped = zip_coordinates(&original);
        let unzipped = unzip_coordinates(&zipped);
        assert_eq!(unzipped.len(), original.len());
        for (a, b) in original.iter().zip(&unzipped) {
            assert!((a - b).abs() <= 1e-6, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_coordinate_zip_example() {
        assert_eq!(
            zip_coordinates(&[4.51, 5.0, 5.12]),
            vec![4_510_000.0, 490_000.0, 120_000.0],
        );
    }

    #[test]
    fn test_coordinate_negative_values() {
        let original = vec![-0.1278, -0.1290, -0.1300];
        let unzipped = unzip_coordinates(&zip_coordinates(&original));
        for (a, b) in original.iter().zip(&unzipped) {
            assert!((a - b).abs() <= 1e-6);
        }
    }

    #[test]
    fn test_scalar_round_trip_exact_for_integers() {
        let original = vec![0.0, 10.0, 25.0, 25.0, 90.0];
        let unzipped = unzip_scalars(&zip_scalars(&original));
        assert_eq!(unzipped, original);
    }

    #[test]
    fn test_altitude_rounds_to_meters() {
        let zipped = zip_altitudes(&[100.4, 102.6, 101.2]);
        assert_eq!(zipped, vec![100.0, 3.0, -2.0]);
        assert_eq!(unzip_scalars(&zipped), vec![100.0, 103.0, 101.0]);
    }

    #[test]
    fn test_empty_arrays_are_noops() {
        assert!(zip_coordinates(&[]).is_empty());
        assert!(unzip_coordinates(&[]).is_empty());
        assert!(zip_scalars(&[]).is_empty());
        assert!(unzip_scalars(&[]).is_empty());
        assert!(zip_altitudes(&[]).is_empty());
    }

    #[test]
    fn test_single_element() {
        assert_eq!(zip_coordinates(&[1.5]), vec![1_500_000.0]);
        assert_eq!(unzip_coordinates(&[1_500_000.0]), vec![1.5]);
        assert_eq!(zip_scalars(&[42.0]), vec![42.0]);
    }
}
