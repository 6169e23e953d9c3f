// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route and leaderboard record models.

use geo::LineString;
use serde::{Deserialize, Serialize};

/// A reference route that activities are validated against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    /// Route id (also the document id)
    pub id: String,
    /// Route name
    pub name: String,
    /// Reference polyline as a GeoJSON LineString (Feature or bare geometry)
    pub geometry: String,
    /// Declared route length in kilometers
    pub distance_km: f64,
    /// Activity type this route is meant for (Run, Ride, ...)
    pub activity_type: String,
    /// User who created the route
    pub created_by: String,
    /// Creation time (RFC3339)
    pub created_at: String,
}

impl Route {
    /// Parse the stored geometry into a geo `LineString`.
    ///
    /// The stored form is produced by route creation and is expected to be
    /// valid; a parse failure here means corrupt data, not bad user input.
    pub fn line_string(&self) -> anyhow::Result<LineString<f64>> {
        parse_line_string(&self.geometry)
    }
}

/// Parse a GeoJSON string (Feature or bare geometry) into a `LineString`.
pub fn parse_line_string(geojson_str: &str) -> anyhow::Result<LineString<f64>> {
    let geojson: geojson::GeoJson = geojson_str
        .parse()
        .map_err(|e: geojson::Error| anyhow::anyhow!("invalid GeoJSON: {}", e))?;

    let value = match geojson {
        geojson::GeoJson::Feature(feature) => {
            feature
                .geometry
                .ok_or_else(|| anyhow::anyhow!("feature has no geometry"))?
                .value
        }
        geojson::GeoJson::Geometry(geometry) => geometry.value,
        geojson::GeoJson::FeatureCollection(_) => {
            anyhow::bail!("expected a LineString, got a FeatureCollection")
        }
    };

    let line: LineString<f64> = value
        .try_into()
        .map_err(|e: geojson::Error| anyhow::anyhow!("expected a LineString: {}", e))?;

    if line.0.len() < 2 {
        anyhow::bail!("route geometry has fewer than two points");
    }

    Ok(line)
}

/// The single best (minimum-duration) activity for a (route, activity type).
///
/// Stored under the deterministic document id `route_id:activity_type`, so
/// at most one record can exist per key and replacement is a plain
/// overwrite of that document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRecord {
    pub route_id: String,
    /// Record holder
    pub user_id: String,
    /// The activity that set this record
    pub activity_id: String,
    pub activity_type: String,
    /// Best duration in seconds
    pub duration_seconds: u32,
    /// When the record was set (RFC3339)
    pub created_at: String,
}

impl RouteRecord {
    /// Whether a new duration takes this record. Ties never do.
    pub fn beaten_by(&self, duration_seconds: u32) -> bool {
        duration_seconds < self.duration_seconds
    }
}
