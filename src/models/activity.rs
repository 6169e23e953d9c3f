// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Validated activity model.

use serde::{Deserialize, Serialize};

/// A persisted activity.
///
/// Activities exist only after passing conformance validation against
/// their route; nothing in this crate mutates one afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Activity id (also the document id)
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Route the activity was validated against
    pub route_id: String,
    /// Challenge the activity counts toward, if any
    pub challenge_id: Option<String>,
    /// Activity type (Run, Ride, ...)
    pub activity_type: String,
    /// Canonical track as a GeoJSON LineString feature
    pub track: String,
    /// Elapsed time in seconds
    pub duration_seconds: u32,
    /// Track length in kilometers
    pub distance_km: f64,
    /// Average speed in km/h (0 when duration is 0)
    pub avg_speed_kmh: f64,
    /// Creation time (RFC3339)
    pub created_at: String,
}
