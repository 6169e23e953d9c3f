// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Challenge, invitation and bet models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who may participate in a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeType {
    /// Anyone may submit an activity.
    Open,
    /// Invite-only; participation requires an accepted invitation.
    Closed,
}

/// What the participants are wagering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    None,
    Beer,
    Coffee,
    Dinner,
    Custom,
}

impl BetType {
    pub fn is_none(self) -> bool {
        matches!(self, BetType::None)
    }
}

/// A time-boxed competition on a route.
///
/// Lifecycle: active -> expired (terminal). The scheduler performs the
/// expiry transition exactly once per challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    /// Challenge id (also the document id)
    pub id: String,
    pub route_id: String,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_by: String,
    pub challenge_type: ChallengeType,
    pub bet_type: BetType,
    /// Wager description, e.g. "1 beer" (symbolic, never monetary)
    pub bet_value: Option<String>,
    pub is_active: bool,
    /// Creation time (RFC3339)
    pub created_at: String,
}

impl Challenge {
    /// Expiry condition checked by the lifecycle scheduler.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.end_date < now
    }
}

/// Invitation status for closed challenges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    /// Forced by the scheduler when the challenge closes while pending.
    Expired,
}

/// An invitation to a closed challenge.
///
/// Stored under the document id `challenge_id:invited_user_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeInvitation {
    pub challenge_id: String,
    pub invited_user_id: String,
    pub status: InvitationStatus,
    /// When the invitation was issued (RFC3339)
    pub invited_at: String,
    /// When the invitee responded, if they did (RFC3339)
    pub responded_at: Option<String>,
}

/// Bet payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    Pending,
    Paid,
}

/// A symbolic wager created at challenge settlement.
///
/// Stored under the document id `challenge_id:loser_id`, so a challenge
/// can hold at most one bet per loser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub challenge_id: String,
    pub winner_id: String,
    pub loser_id: String,
    pub bet_type: BetType,
    pub bet_value: Option<String>,
    pub status: BetStatus,
    /// Creation time (RFC3339)
    pub created_at: String,
    /// When the loser settled up (RFC3339)
    pub paid_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn challenge(is_active: bool, end: DateTime<Utc>) -> Challenge {
        Challenge {
            id: "c1".to_string(),
            route_id: "r1".to_string(),
            name: "Hill sprint".to_string(),
            start_date: Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap(),
            end_date: end,
            created_by: "u1".to_string(),
            challenge_type: ChallengeType::Open,
            bet_type: BetType::Beer,
            bet_value: Some("1 beer".to_string()),
            is_active,
            created_at: "2026-05-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_expiry_condition() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let past = Utc.with_ymd_and_hms(2026, 5, 31, 0, 0, 0).unwrap();
        let future = Utc.with_ymd_and_hms(2026, 6, 2, 0, 0, 0).unwrap();

        assert!(challenge(true, past).is_expired(now));
        assert!(!challenge(true, future).is_expired(now));
        // Already closed challenges are never eligible again.
        assert!(!challenge(false, past).is_expired(now));
    }

    #[test]
    fn test_status_serialization_matches_storage_strings() {
        assert_eq!(
            serde_json::to_string(&InvitationStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(serde_json::to_string(&BetStatus::Paid).unwrap(), "\"paid\"");
        assert_eq!(
            serde_json::to_string(&ChallengeType::Closed).unwrap(),
            "\"closed\""
        );
        assert_eq!(serde_json::to_string(&BetType::None).unwrap(), "\"none\"");
    }
}
