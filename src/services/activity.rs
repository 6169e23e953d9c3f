// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity submission pipeline.
//!
//! Handles the core workflow:
//! 1. Normalize the raw track into the canonical point sequence
//! 2. Resolve the target route (directly or through a challenge)
//! 3. Compute distance / duration / average speed
//! 4. Validate conformance against the route
//! 5. Persist the activity and maintain the route leaderboard atomically
//!
//! Nothing is persisted unless every step succeeds.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{
    Activity, CanonicalTrack, Challenge, ChallengeType, InvitationStatus, RawTrack, Route,
    TrackMetrics,
};
use crate::services::validation;
use crate::time_utils::format_utc_rfc3339;

/// An activity submission as received from the request layer.
#[derive(Debug)]
pub struct Submission {
    /// Direct route target; ignored when `challenge_id` is set.
    pub route_id: Option<String>,
    /// Challenge target; wins over `route_id` and implies the route.
    pub challenge_id: Option<String>,
    pub activity_type: String,
    /// Raw track in any of the recognized shapes.
    pub raw_track: serde_json::Value,
    /// Externally measured duration, used when the track carries no
    /// timestamps.
    pub duration_seconds: Option<u32>,
}

/// Result of a successful submission.
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub activity_id: String,
    pub distance_km: f64,
    pub duration_seconds: u32,
    pub avg_speed_kmh: f64,
    /// Whether this activity took the route record.
    pub new_record: bool,
}

/// Validates and persists submitted activities.
pub struct ActivityService {
    db: FirestoreDb,
}

impl ActivityService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Run the full submission pipeline for `user_id`.
    pub async fn submit(&self, user_id: &str, mut submission: Submission) -> Result<SubmissionOutcome> {
        // Track parsing happens before any database work; a malformed
        // upload never costs a read.
        let raw_track = std::mem::take(&mut submission.raw_track);
        let track = RawTrack::from_value(raw_track)?.normalize()?;

        let (route, challenge) = self.resolve_target(user_id, &submission).await?;

        let metrics = TrackMetrics::compute(&track, submission.duration_seconds);

        let route_line = route.line_string().map_err(AppError::Internal)?;
        validation::validate(&route_line, route.distance_km, &track)?;

        let now = chrono::Utc::now();
        let activity = build_activity(
            user_id,
            &route,
            challenge.as_ref(),
            &submission.activity_type,
            &track,
            metrics,
            &format_utc_rfc3339(now),
        );

        let new_record = self.db.submit_activity_atomic(&activity, now).await?;

        tracing::info!(
            activity_id = %activity.id,
            user_id,
            route_id = %route.id,
            distance_km = metrics.distance_km,
            duration_seconds = metrics.duration_seconds,
            new_record,
            "Activity submitted"
        );

        Ok(SubmissionOutcome {
            activity_id: activity.id,
            distance_km: metrics.distance_km,
            duration_seconds: metrics.duration_seconds,
            avg_speed_kmh: metrics.avg_speed_kmh,
            new_record,
        })
    }

    /// Resolve the route (and challenge) a submission targets.
    ///
    /// A challenge reference implies its route. Closed challenges require
    /// the actor to be the creator or hold an accepted invitation, and
    /// submissions against already-closed challenges are rejected: their
    /// wager has been settled and the activity could no longer count.
    async fn resolve_target(
        &self,
        user_id: &str,
        submission: &Submission,
    ) -> Result<(Route, Option<Challenge>)> {
        if let Some(challenge_id) = &submission.challenge_id {
            let challenge = self
                .db
                .get_challenge(challenge_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Challenge {} not found", challenge_id)))?;

            if !challenge.is_active {
                return Err(AppError::BadRequest(
                    "challenge has already ended".to_string(),
                ));
            }

            if challenge.challenge_type == ChallengeType::Closed
                && challenge.created_by != user_id
            {
                let invitation = self.db.get_invitation(challenge_id, user_id).await?;
                let accepted = invitation
                    .map(|i| i.status == InvitationStatus::Accepted)
                    .unwrap_or(false);
                if !accepted {
                    tracing::warn!(
                        user_id,
                        challenge_id = %challenge_id,
                        "Submission to closed challenge without accepted invitation"
                    );
                    return Err(AppError::Forbidden);
                }
            }

            let route = self
                .db
                .get_route(&challenge.route_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Route {} not found", challenge.route_id))
                })?;

            return Ok((route, Some(challenge)));
        }

        if let Some(route_id) = &submission.route_id {
            let route = self
                .db
                .get_route(route_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Route {} not found", route_id)))?;
            return Ok((route, None));
        }

        Err(AppError::BadRequest(
            "submission must reference a route or a challenge".to_string(),
        ))
    }
}

fn build_activity(
    user_id: &str,
    route: &Route,
    challenge: Option<&Challenge>,
    activity_type: &str,
    track: &CanonicalTrack,
    metrics: TrackMetrics,
    created_at: &str,
) -> Activity {
    Activity {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        route_id: route.id.clone(),
        challenge_id: challenge.map(|c| c.id.clone()),
        activity_type: activity_type.to_string(),
        track: track.to_geojson_string(),
        duration_seconds: metrics.duration_seconds,
        distance_km: metrics.distance_km,
        avg_speed_kmh: metrics.avg_speed_kmh,
        created_at: created_at.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_activity_links_challenge_and_route() {
        let route = Route {
            id: "r1".to_string(),
            name: "Lakeside loop".to_string(),
            geometry: r#"{"type":"LineString","coordinates":[[9.0,45.0],[9.0,45.09]]}"#
                .to_string(),
            distance_km: 10.0,
            activity_type: "Run".to_string(),
            created_by: "creator".to_string(),
            created_at: "2026-05-01T00:00:00Z".to_string(),
        };
        let track = RawTrack::from_value(json!([[9.0, 45.0], [9.0, 45.09]]))
            .unwrap()
            .normalize()
            .unwrap();
        let metrics = TrackMetrics::compute(&track, Some(1800));

        let activity = build_activity(
            "alice",
            &route,
            None,
            "Run",
            &track,
            metrics,
            "2026-05-10T09:00:00Z",
        );

        assert_eq!(activity.user_id, "alice");
        assert_eq!(activity.route_id, "r1");
        assert_eq!(activity.challenge_id, None);
        assert_eq!(activity.duration_seconds, 1800);
        assert!(activity.track.contains("LineString"));
        assert!(!activity.id.is_empty());
    }
}
