// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Append-only notification facts.
//!
//! This crate only ever creates notifications; formatting and delivery
//! belong to the messaging layer.

use serde::{Deserialize, Serialize};

/// What happened, as consumed by the external rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    ChallengeInvitation,
    ChallengeAccepted,
    ChallengeDeclined,
    NewRecord,
    BetWon,
    BetLost,
    BetPaid,
}

/// A single notification fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Notification id (also the document id)
    pub id: String,
    pub recipient_id: String,
    pub actor_id: String,
    pub action: NotificationAction,
    /// Referenced object id (challenge, bet, route, ...)
    pub object_id: String,
    /// Referenced object kind ("challenge", "bet", "route")
    pub object_type: String,
    pub read: bool,
    /// Creation time (RFC3339)
    pub created_at: String,
}
