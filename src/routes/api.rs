// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::db::firestore::bet_doc_id;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::route::parse_line_string;
use crate::models::{
    Activity, Bet, BetStatus, BetType, Challenge, ChallengeInvitation, ChallengeType,
    InvitationStatus, Notification, NotificationAction, Route, RouteRecord,
};
use crate::services::{ActivityService, Submission};
use crate::time_utils::{format_utc_rfc3339, now_rfc3339};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/routes", post(create_route))
        .route("/api/routes/{route_id}/record", get(get_route_record))
        .route("/api/challenges", post(create_challenge))
        .route(
            "/api/challenges/{challenge_id}/invitations/respond",
            post(respond_invitation),
        )
        .route("/api/activities", post(submit_activity))
        .route("/api/activities/{activity_id}", get(get_activity))
        .route("/api/bets", get(list_bets))
        .route("/api/bets/{bet_id}/pay", post(pay_bet))
        .route("/api/notifications", get(list_notifications))
}

// ─── Routes ──────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct CreateRouteRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    /// GeoJSON LineString (Feature or bare geometry)
    geometry: serde_json::Value,
    #[validate(range(min = 0.0))]
    distance_km: f64,
    #[validate(length(min = 1, max = 50))]
    activity_type: String,
}

#[derive(Serialize)]
struct CreatedResponse {
    id: String,
}

/// Create a reference route.
async fn create_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateRouteRequest>,
) -> Result<Json<CreatedResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let geometry = payload.geometry.to_string();
    // Reject geometry the conformance validator could not use later.
    parse_line_string(&geometry)
        .map_err(|e| AppError::BadRequest(format!("invalid route geometry: {}", e)))?;

    let route = Route {
        id: uuid::Uuid::new_v4().to_string(),
        name: payload.name,
        geometry,
        distance_km: payload.distance_km,
        activity_type: payload.activity_type,
        created_by: user.user_id,
        created_at: now_rfc3339(),
    };

    state.db.create_route(&route).await?;

    tracing::info!(route_id = %route.id, "Route created");
    Ok(Json(CreatedResponse { id: route.id }))
}

#[derive(Deserialize)]
struct RecordQuery {
    /// Defaults to the route's own activity type.
    activity_type: Option<String>,
}

/// Current leaderboard record for a route.
async fn get_route_record(
    State(state): State<Arc<AppState>>,
    Path(route_id): Path<String>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<Option<RouteRecord>>> {
    let route = state
        .db
        .get_route(&route_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Route {} not found", route_id)))?;

    let activity_type = query.activity_type.unwrap_or(route.activity_type);
    let record = state.db.get_route_record(&route_id, &activity_type).await?;

    Ok(Json(record))
}

// ─── Challenges ──────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct CreateChallengeRequest {
    route_id: String,
    #[validate(length(min = 1, max = 100))]
    name: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    challenge_type: ChallengeType,
    bet_type: BetType,
    #[validate(length(max = 100))]
    bet_value: Option<String>,
    /// Invitees for closed challenges.
    #[serde(default)]
    invited_user_ids: Vec<String>,
}

/// Create a challenge on a route, fanning out invitations for closed ones.
async fn create_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateChallengeRequest>,
) -> Result<Json<CreatedResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if payload.end_date <= payload.start_date {
        return Err(AppError::BadRequest(
            "end_date must be after start_date".to_string(),
        ));
    }

    state
        .db
        .get_route(&payload.route_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Route {} not found", payload.route_id)))?;

    let now = Utc::now();
    let challenge = Challenge {
        id: uuid::Uuid::new_v4().to_string(),
        route_id: payload.route_id,
        name: payload.name,
        start_date: payload.start_date,
        end_date: payload.end_date,
        created_by: user.user_id.clone(),
        challenge_type: payload.challenge_type,
        bet_type: payload.bet_type,
        bet_value: payload.bet_value,
        is_active: true,
        created_at: format_utc_rfc3339(now),
    };

    let mut invitations = Vec::new();
    let mut facts = Vec::new();
    if payload.challenge_type == ChallengeType::Closed {
        for invitee in payload
            .invited_user_ids
            .iter()
            .filter(|id| **id != user.user_id)
        {
            invitations.push(ChallengeInvitation {
                challenge_id: challenge.id.clone(),
                invited_user_id: invitee.clone(),
                status: InvitationStatus::Pending,
                invited_at: format_utc_rfc3339(now),
                responded_at: None,
            });
            facts.push(Notification {
                id: uuid::Uuid::new_v4().to_string(),
                recipient_id: invitee.clone(),
                actor_id: user.user_id.clone(),
                action: NotificationAction::ChallengeInvitation,
                object_id: challenge.id.clone(),
                object_type: "challenge".to_string(),
                read: false,
                created_at: format_utc_rfc3339(now),
            });
        }
    }

    state
        .db
        .create_challenge_atomic(&challenge, &invitations, &facts)
        .await?;

    tracing::info!(
        challenge_id = %challenge.id,
        invitations = invitations.len(),
        "Challenge created"
    );
    Ok(Json(CreatedResponse { id: challenge.id }))
}

#[derive(Deserialize)]
struct RespondInvitationRequest {
    accept: bool,
}

#[derive(Serialize)]
struct RespondInvitationResponse {
    status: InvitationStatus,
}

/// Accept or decline a pending invitation.
///
/// Only the invitee can respond (the invitation is looked up under their
/// own user id), and only while the invitation is still pending.
async fn respond_invitation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(challenge_id): Path<String>,
    Json(payload): Json<RespondInvitationRequest>,
) -> Result<Json<RespondInvitationResponse>> {
    let invitation = state
        .db
        .get_invitation(&challenge_id, &user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))?;

    if invitation.status != InvitationStatus::Pending {
        return Err(AppError::BadRequest(
            "invitation has already been answered".to_string(),
        ));
    }

    let challenge = state
        .db
        .get_challenge(&challenge_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Challenge {} not found", challenge_id)))?;

    let now = Utc::now();
    let (status, action) = if payload.accept {
        (InvitationStatus::Accepted, NotificationAction::ChallengeAccepted)
    } else {
        (InvitationStatus::Declined, NotificationAction::ChallengeDeclined)
    };

    let updated = ChallengeInvitation {
        status,
        responded_at: Some(format_utc_rfc3339(now)),
        ..invitation
    };
    let fact = Notification {
        id: uuid::Uuid::new_v4().to_string(),
        recipient_id: challenge.created_by.clone(),
        actor_id: user.user_id.clone(),
        action,
        object_id: challenge.id.clone(),
        object_type: "challenge".to_string(),
        read: false,
        created_at: format_utc_rfc3339(now),
    };

    state.db.respond_invitation_atomic(&updated, &fact).await?;

    Ok(Json(RespondInvitationResponse { status }))
}

// ─── Activities ──────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct SubmitActivityRequest {
    route_id: Option<String>,
    challenge_id: Option<String>,
    #[validate(length(min = 1, max = 50))]
    activity_type: String,
    /// Raw track in any recognized shape (GeoJSON, point records, pairs).
    track: serde_json::Value,
    /// Externally measured duration for tracks without timestamps.
    duration_seconds: Option<u32>,
}

#[derive(Serialize)]
struct SubmitActivityResponse {
    activity_id: String,
    distance_km: f64,
    duration_seconds: u32,
    avg_speed_kmh: f64,
    new_record: bool,
}

/// Submit an activity for validation against a route or challenge.
async fn submit_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SubmitActivityRequest>,
) -> Result<Json<SubmitActivityResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let service = ActivityService::new(state.db.clone());
    let outcome = service
        .submit(
            &user.user_id,
            Submission {
                route_id: payload.route_id,
                challenge_id: payload.challenge_id,
                activity_type: payload.activity_type,
                raw_track: payload.track,
                duration_seconds: payload.duration_seconds,
            },
        )
        .await?;

    Ok(Json(SubmitActivityResponse {
        activity_id: outcome.activity_id,
        distance_km: outcome.distance_km,
        duration_seconds: outcome.duration_seconds,
        avg_speed_kmh: outcome.avg_speed_kmh,
        new_record: outcome.new_record,
    }))
}

/// Fetch a single activity with its canonical track.
async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(activity_id): Path<String>,
) -> Result<Json<Activity>> {
    let activity = state
        .db
        .get_activity(&activity_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", activity_id)))?;
    Ok(Json(activity))
}

// ─── Bets ────────────────────────────────────────────────────

/// Bet as returned by the API; `id` is the payment handle.
#[derive(Serialize)]
struct BetResponse {
    id: String,
    challenge_id: String,
    winner_id: String,
    loser_id: String,
    bet_type: BetType,
    bet_value: Option<String>,
    status: BetStatus,
    created_at: String,
    paid_at: Option<String>,
}

impl From<Bet> for BetResponse {
    fn from(bet: Bet) -> Self {
        Self {
            id: bet_doc_id(&bet.challenge_id, &bet.loser_id),
            challenge_id: bet.challenge_id,
            winner_id: bet.winner_id,
            loser_id: bet.loser_id,
            bet_type: bet.bet_type,
            bet_value: bet.bet_value,
            status: bet.status,
            created_at: bet.created_at,
            paid_at: bet.paid_at,
        }
    }
}

/// List the current user's bets, won and lost.
async fn list_bets(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<BetResponse>>> {
    let bets = state.db.list_bets_for_user(&user.user_id).await?;
    Ok(Json(bets.into_iter().map(BetResponse::from).collect()))
}

/// Mark a bet as paid.
///
/// Only the loser can settle their own bet, and only once.
async fn pay_bet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(bet_id): Path<String>,
) -> Result<Json<BetResponse>> {
    let bet = state
        .db
        .get_bet(&bet_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bet {} not found", bet_id)))?;

    if bet.loser_id != user.user_id {
        tracing::warn!(bet_id = %bet_id, user_id = %user.user_id, "Rejected payment by non-loser");
        return Err(AppError::Forbidden);
    }

    if bet.status == BetStatus::Paid {
        return Err(AppError::BadRequest("bet already settled".to_string()));
    }

    let now = Utc::now();
    let paid = Bet {
        status: BetStatus::Paid,
        paid_at: Some(format_utc_rfc3339(now)),
        ..bet
    };
    let fact = Notification {
        id: uuid::Uuid::new_v4().to_string(),
        recipient_id: paid.winner_id.clone(),
        actor_id: user.user_id.clone(),
        action: NotificationAction::BetPaid,
        object_id: bet_id.clone(),
        object_type: "bet".to_string(),
        read: false,
        created_at: format_utc_rfc3339(now),
    };

    state.db.pay_bet_atomic(&paid, &fact).await?;

    tracing::info!(bet_id = %bet_id, "Bet marked paid");
    Ok(Json(BetResponse::from(paid)))
}

// ─── Notifications ───────────────────────────────────────────

#[derive(Deserialize)]
struct NotificationsQuery {
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    50
}

/// The current user's notification facts, newest first.
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Vec<Notification>>> {
    let limit = query.limit.min(200);
    let notifications = state.db.list_notifications(&user.user_id, limit).await?;
    Ok(Json(notifications))
}
