// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Conformance validation properties.
//!
//! These exercise the full two-stage gate over a realistic winding route:
//! tracks within tolerance and inside the corridor validate, anything
//! outside either gate is rejected with the comparison values attached.

use geo::{Coord, LineString};
use paceline::error::ValidationError;
use paceline::models::{CanonicalTrack, RawTrack};
use paceline::services::validation::{
    self, check_distance, geofence_match_ratio, GEOFENCE_MATCH_THRESHOLD,
};
use serde_json::json;

/// A winding ~7 km route near 45.47°N: north with a sinusoidal east-west
/// meander, the kind of shape a riverside park loop produces.
fn winding_route_coords() -> Vec<(f64, f64)> {
    (0..=60)
        .map(|i| {
            let t = i as f64;
            let lon = 9.18 + 0.0015 * (t / 6.0).sin();
            let lat = 45.47 + 0.001 * t;
            (lon, lat)
        })
        .collect()
}

fn route_line() -> LineString<f64> {
    LineString::from(
        winding_route_coords()
            .into_iter()
            .map(|(x, y)| Coord { x, y })
            .collect::<Vec<_>>(),
    )
}

/// Build a canonical track following the route with a lateral offset in
/// degrees of longitude applied from `from_index` onwards.
fn track_with_offset(offset_lon: f64, from_index: usize) -> CanonicalTrack {
    let pairs: Vec<serde_json::Value> = winding_route_coords()
        .into_iter()
        .enumerate()
        .map(|(i, (lon, lat))| {
            let lon = if i >= from_index { lon + offset_lon } else { lon };
            json!([lon, lat])
        })
        .collect();
    RawTrack::from_value(json!(pairs))
        .unwrap()
        .normalize()
        .unwrap()
}

#[test]
fn test_conforming_track_validates() {
    // ~25 m lateral GPS error at this latitude; inside the 50 m corridor.
    let track = track_with_offset(0.00032, 0);
    let declared_km = track.distance_km();

    assert!(validation::validate(&route_line(), declared_km, &track).is_ok());
}

#[test]
fn test_track_at_declared_distance_bounds_validates() {
    let track = track_with_offset(0.0, 0);
    let actual = track.distance_km();

    // Declared distances 5% above and below the actual length still pass
    // the tolerance gate.
    assert!(validation::validate(&route_line(), actual / 1.049, &track).is_ok());
    assert!(validation::validate(&route_line(), actual / 0.951, &track).is_ok());
}

#[test]
fn test_distance_mismatch_reports_both_values() {
    // Expected 5.00 km, recorded 5.60 km: +12%, outside tolerance.
    let err = check_distance(5.0, 5.6).unwrap_err();
    match err {
        ValidationError::DistanceMismatch {
            expected_km,
            actual_km,
        } => {
            assert_eq!(expected_km, 5.0);
            assert_eq!(actual_km, 5.6);
        }
        other => panic!("expected distance mismatch, got {:?}", other),
    }
}

#[test]
fn test_wrong_route_rejected_by_distance_gate() {
    let track = track_with_offset(0.0, 0);
    let declared_km = track.distance_km() * 1.12;

    let err = validation::validate(&route_line(), declared_km, &track).unwrap_err();
    assert!(matches!(err, ValidationError::DistanceMismatch { .. }));
}

#[test]
fn test_shortcut_rejected_by_geofence_gate() {
    // Last third of the track cuts ~700 m east of the route. The length
    // stays within tolerance of itself, so only the corridor catches it.
    let track = track_with_offset(0.009, 40);
    let declared_km = track.distance_km();

    let err = validation::validate(&route_line(), declared_km, &track).unwrap_err();
    match err {
        ValidationError::GeofenceMismatch { match_ratio } => {
            assert!(match_ratio < GEOFENCE_MATCH_THRESHOLD, "ratio {}", match_ratio);
            assert!(match_ratio > 0.0);
        }
        other => panic!("expected geofence mismatch, got {:?}", other),
    }
}

#[test]
fn test_match_ratio_counts_points_not_distance() {
    // 41 of 61 points on the route: ratio just above 2/3.
    let track = track_with_offset(0.009, 41);
    let ratio = geofence_match_ratio(&route_line(), track.points());
    assert!((ratio - 41.0 / 61.0).abs() < 1e-9, "ratio {}", ratio);
}

#[test]
fn test_reversed_track_still_inside_corridor() {
    // Riding the route backwards stays inside the corridor; direction is
    // not part of conformance.
    let coords: Vec<serde_json::Value> = winding_route_coords()
        .into_iter()
        .rev()
        .map(|(lon, lat)| json!([lon, lat]))
        .collect();
    let track = RawTrack::from_value(json!(coords))
        .unwrap()
        .normalize()
        .unwrap();

    let declared_km = track.distance_km();
    assert!(validation::validate(&route_line(), declared_km, &track).is_ok());
}
