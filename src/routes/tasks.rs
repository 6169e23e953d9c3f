// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Task handler routes for the external scheduler trigger.
//!
//! These endpoints are called by the platform's cron runner, not directly
//! by users; they are guarded by a shared-secret header.

use crate::services::scheduler;
use crate::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Header carrying the trigger shared secret.
const TRIGGER_TOKEN_HEADER: &str = "x-tasks-token";

/// Task handler routes (called by the cron runner).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tasks/close-challenges", post(close_challenges))
}

#[derive(Serialize)]
struct CloseChallengesResponse {
    closed: usize,
}

/// Close all expired challenges.
///
/// Returns the number of challenges closed by this invocation; redundant
/// calls are safe and report 0.
async fn close_challenges(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CloseChallengesResponse>, StatusCode> {
    let token_ok = headers
        .get(TRIGGER_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|token| token == state.config.tasks_trigger_token)
        .unwrap_or(false);

    if !token_ok {
        tracing::warn!("Blocked unauthorized access to close_challenges");
        return Err(StatusCode::FORBIDDEN);
    }

    match scheduler::close_expired_challenges(&state.db, chrono::Utc::now()).await {
        Ok(closed) => {
            tracing::info!(closed, "Close-challenges trigger completed");
            Ok(Json(CloseChallengesResponse { closed }))
        }
        Err(e) => {
            tracing::error!(error = %e, "Close-challenges trigger failed");
            // 500 lets the cron runner retry.
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
