// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Raw GPS track input and the canonical track it normalizes into.
//!
//! Clients upload tracks in several shapes (mobile apps, map widgets and
//! GPX converters all serialize differently). Everything funnels through
//! [`RawTrack::normalize`] into one canonical ordered sequence of
//! (longitude, latitude) points; downstream geometry only ever sees the
//! canonical form.

use chrono::{DateTime, Utc};
use geo::{Coord, Distance, HaversineMeasure, LineString, Point};
use serde::Deserialize;

/// Earth radius used for great-circle distances, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Errors from track parsing and normalization.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackError {
    #[error("track data does not match any recognized format")]
    Format,

    #[error("track contains fewer than two usable points")]
    Empty,
}

/// A point record as uploaded by dictionary-style clients.
///
/// `lon` and `lng` are accepted interchangeably; `time` is an optional
/// RFC3339 stamp used for duration when both track ends carry one.
#[derive(Debug, Clone, Deserialize)]
pub struct PointRecord {
    pub lat: f64,
    #[serde(alias = "lng")]
    pub lon: f64,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

/// The recognized raw track shapes, as one discriminated union.
///
/// Variant order matters: serde tries them top to bottom, and the GeoJSON
/// shapes are keyed by their `type` field so they never shadow the list
/// forms.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawTrack {
    /// GeoJSON `Feature` wrapping a `LineString` geometry.
    Feature(geojson::Feature),
    /// Bare GeoJSON geometry (must be a `LineString`).
    Geometry(geojson::Geometry),
    /// Ordered list of `{lat, lon|lng}` records.
    Records(Vec<PointRecord>),
    /// Ordered list of `[lon, lat]` pairs.
    Pairs(Vec<Vec<f64>>),
}

impl RawTrack {
    /// Parse an arbitrary JSON value into one of the recognized shapes.
    pub fn from_value(value: serde_json::Value) -> Result<Self, TrackError> {
        serde_json::from_value(value).map_err(|_| TrackError::Format)
    }

    /// Normalize into the canonical ordered (lon, lat) sequence.
    pub fn normalize(self) -> Result<CanonicalTrack, TrackError> {
        match self {
            RawTrack::Feature(feature) => {
                let geometry = feature.geometry.ok_or(TrackError::Format)?;
                Self::from_geometry(geometry)
            }
            RawTrack::Geometry(geometry) => Self::from_geometry(geometry),
            RawTrack::Records(records) => {
                if records.len() < 2 {
                    return Err(TrackError::Empty);
                }
                let timespan = match (records.first(), records.last()) {
                    (Some(first), Some(last)) => first.time.zip(last.time),
                    _ => None,
                };
                let coords = records
                    .into_iter()
                    .map(|p| Coord { x: p.lon, y: p.lat })
                    .collect();
                Ok(CanonicalTrack { coords, timespan })
            }
            RawTrack::Pairs(pairs) => {
                if pairs.len() < 2 {
                    return Err(TrackError::Empty);
                }
                let coords = pairs
                    .into_iter()
                    .map(|p| {
                        // GeoJSON position order: [lon, lat, ...]; extra
                        // elements (altitude) are ignored.
                        if p.len() < 2 {
                            return Err(TrackError::Format);
                        }
                        Ok(Coord { x: p[0], y: p[1] })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CanonicalTrack {
                    coords,
                    timespan: None,
                })
            }
        }
    }

    fn from_geometry(geometry: geojson::Geometry) -> Result<CanonicalTrack, TrackError> {
        let geojson::Value::LineString(positions) = geometry.value else {
            return Err(TrackError::Format);
        };
        if positions.len() < 2 {
            return Err(TrackError::Empty);
        }
        let coords = positions
            .into_iter()
            .map(|p| {
                if p.len() < 2 {
                    return Err(TrackError::Format);
                }
                Ok(Coord { x: p[0], y: p[1] })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CanonicalTrack {
            coords,
            timespan: None,
        })
    }
}

/// Canonical ordered (lon, lat) point sequence, length >= 2.
///
/// Produced only by [`RawTrack::normalize`]; all downstream geometry
/// (metrics, conformance validation, persistence) operates on this.
#[derive(Debug, Clone)]
pub struct CanonicalTrack {
    coords: Vec<Coord<f64>>,
    /// First/last embedded timestamps, when both ends carried one.
    timespan: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl CanonicalTrack {
    pub fn points(&self) -> &[Coord<f64>] {
        &self.coords
    }

    pub fn line_string(&self) -> LineString<f64> {
        LineString::from(self.coords.clone())
    }

    /// Total great-circle length in kilometers.
    pub fn distance_km(&self) -> f64 {
        let sphere = HaversineMeasure::new(EARTH_RADIUS_METERS);
        self.coords
            .windows(2)
            .map(|w| sphere.distance(Point::from(w[0]), Point::from(w[1])))
            .sum::<f64>()
            / 1000.0
    }

    /// Duration from embedded timestamps (last minus first), if present.
    pub fn embedded_duration_seconds(&self) -> Option<u32> {
        self.timespan
            .map(|(first, last)| (last - first).num_seconds().max(0) as u32)
    }

    /// Serialize to the GeoJSON `Feature` string persisted with an activity.
    pub fn to_geojson_string(&self) -> String {
        let positions: Vec<Vec<f64>> = self.coords.iter().map(|c| vec![c.x, c.y]).collect();
        let geometry = geojson::Geometry::new(geojson::Value::LineString(positions));
        geojson::GeoJson::Feature(geojson::Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: None,
            foreign_members: None,
        })
        .to_string()
    }
}

/// Derived metrics for a canonical track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackMetrics {
    pub distance_km: f64,
    pub duration_seconds: u32,
    pub avg_speed_kmh: f64,
}

impl TrackMetrics {
    /// Compute metrics for a track.
    ///
    /// Duration comes from embedded timestamps when the track carries
    /// them, else from `fallback_duration_seconds`, else 0. Average speed
    /// is defined as 0 when the duration is 0.
    pub fn compute(track: &CanonicalTrack, fallback_duration_seconds: Option<u32>) -> Self {
        let distance_km = track.distance_km();
        let duration_seconds = track
            .embedded_duration_seconds()
            .or(fallback_duration_seconds)
            .unwrap_or(0);
        let avg_speed_kmh = if duration_seconds > 0 {
            distance_km / (duration_seconds as f64 / 3600.0)
        } else {
            0.0
        };
        Self {
            distance_km,
            duration_seconds,
            avg_speed_kmh,
        }
    }
}
