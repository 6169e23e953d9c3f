// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route conformance validation.
//!
//! A submitted track must pass two gates, in order, before an activity may
//! be persisted:
//!
//! 1. distance tolerance: the track length must be within ±5% of the
//!    route's declared distance;
//! 2. geofence containment: at least 80% of the track's points must lie
//!    within a 50 m corridor around the route's reference polyline.
//!
//! The distance gate cheaply rejects tracks from the wrong route; the
//! corridor rejects tracks that match the length but diverge spatially
//! (shortcuts, parallel roads). Containment is evaluated in a local planar
//! frame centered on the route, so the corridor width is correct at any
//! latitude.

use crate::error::ValidationError;
use crate::models::track::EARTH_RADIUS_METERS;
use crate::models::CanonicalTrack;
use geo::{Coord, Distance, Euclidean, LineString, Point};

/// Relative tolerance applied to the declared route distance.
pub const DISTANCE_TOLERANCE: f64 = 0.05;

/// Corridor radius around the reference polyline, in meters.
pub const GEOFENCE_BUFFER_METERS: f64 = 50.0;

/// Minimum fraction of track points that must fall inside the corridor.
pub const GEOFENCE_MATCH_THRESHOLD: f64 = 0.80;

/// Validate a candidate track against its reference route.
///
/// No side effects on failure; the caller persists the activity only on
/// `Ok`.
pub fn validate(
    route_line: &LineString<f64>,
    expected_km: f64,
    track: &CanonicalTrack,
) -> Result<(), ValidationError> {
    check_distance(expected_km, track.distance_km())?;
    check_geofence(route_line, track.points())
}

/// Stage A: ±5% distance tolerance.
///
/// A zero-distance route only accepts a zero-distance track.
pub fn check_distance(expected_km: f64, actual_km: f64) -> Result<(), ValidationError> {
    let valid = if expected_km > 0.0 {
        let lower = expected_km * (1.0 - DISTANCE_TOLERANCE);
        let upper = expected_km * (1.0 + DISTANCE_TOLERANCE);
        lower <= actual_km && actual_km <= upper
    } else {
        actual_km == 0.0
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::DistanceMismatch {
            expected_km,
            actual_km,
        })
    }
}

/// Stage B: corridor containment.
fn check_geofence(
    route_line: &LineString<f64>,
    points: &[Coord<f64>],
) -> Result<(), ValidationError> {
    if points.is_empty() {
        return Err(ValidationError::GeofenceMismatch { match_ratio: 0.0 });
    }

    let match_ratio = geofence_match_ratio(route_line, points);
    if match_ratio >= GEOFENCE_MATCH_THRESHOLD {
        Ok(())
    } else {
        Err(ValidationError::GeofenceMismatch { match_ratio })
    }
}

/// Fraction of `points` within [`GEOFENCE_BUFFER_METERS`] of the route.
///
/// Both the route and the candidate points are projected into a local
/// equirectangular plane (meters east/north of the route's first vertex,
/// longitude scaled by the cosine of its latitude). In that frame the
/// corridor test reduces to a point-to-polyline Euclidean distance.
pub fn geofence_match_ratio(route_line: &LineString<f64>, points: &[Coord<f64>]) -> f64 {
    if points.is_empty() || route_line.0.len() < 2 {
        return 0.0;
    }

    let origin = route_line.0[0];
    let projected_route: LineString<f64> =
        LineString::from(route_line.0.iter().map(|c| project(origin, *c)).collect::<Vec<_>>());

    let inside = points
        .iter()
        .filter(|c| {
            let p = Point::from(project(origin, **c));
            Euclidean.distance(&p, &projected_route) <= GEOFENCE_BUFFER_METERS
        })
        .count();

    inside as f64 / points.len() as f64
}

/// Project a (lon, lat) coordinate into meters relative to `origin`.
fn project(origin: Coord<f64>, c: Coord<f64>) -> Coord<f64> {
    let lat0_cos = origin.y.to_radians().cos();
    Coord {
        x: (c.x - origin.x).to_radians() * lat0_cos * EARTH_RADIUS_METERS,
        y: (c.y - origin.y).to_radians() * EARTH_RADIUS_METERS,
    }
}
