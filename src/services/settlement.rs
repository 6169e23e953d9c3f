// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bet settlement for expired challenges.
//!
//! Settlement is computed as a pure plan from the challenge and its
//! activities; the database layer applies the plan inside the same
//! transaction that flips the challenge inactive, so a challenge can never
//! be observed closed but unsettled.

use crate::models::{
    Activity, Bet, BetStatus, Challenge, ChallengeType, Notification, NotificationAction,
};
use chrono::{DateTime, Utc};

/// The wager outcome for one expired challenge.
#[derive(Debug, Default)]
pub struct SettlementPlan {
    /// User who won the challenge, when it had any activity.
    pub winner_id: Option<String>,
    /// One bet per distinct loser.
    pub bets: Vec<Bet>,
    /// `bet_won` / `bet_lost` facts accompanying the bets.
    pub notifications: Vec<Notification>,
}

/// Compute the settlement plan for an expired challenge.
///
/// The winner is the owner of the minimum-duration activity. For closed
/// challenges every other participant owes the winner; for open challenges
/// only the creator does, and only if someone else won. Challenges without
/// a wager or without activities settle to an empty plan (the scheduler
/// filters these already; staying defensive keeps the invariant local).
pub fn settle(challenge: &Challenge, activities: &[Activity], now: DateTime<Utc>) -> SettlementPlan {
    if challenge.bet_type.is_none() {
        return SettlementPlan::default();
    }

    let Some(winner_activity) = activities.iter().min_by_key(|a| a.duration_seconds) else {
        return SettlementPlan::default();
    };
    let winner_id = winner_activity.user_id.clone();

    let losers: Vec<String> = match challenge.challenge_type {
        ChallengeType::Closed => {
            // Every distinct participant other than the winner.
            let mut seen = Vec::new();
            for activity in activities {
                if activity.user_id != winner_id && !seen.contains(&activity.user_id) {
                    seen.push(activity.user_id.clone());
                }
            }
            seen
        }
        ChallengeType::Open => {
            if challenge.created_by != winner_id {
                vec![challenge.created_by.clone()]
            } else {
                Vec::new()
            }
        }
    };

    let created_at = now.to_rfc3339();
    let mut plan = SettlementPlan {
        winner_id: Some(winner_id.clone()),
        ..SettlementPlan::default()
    };

    for loser_id in losers {
        plan.bets.push(Bet {
            challenge_id: challenge.id.clone(),
            winner_id: winner_id.clone(),
            loser_id: loser_id.clone(),
            bet_type: challenge.bet_type,
            bet_value: challenge.bet_value.clone(),
            status: BetStatus::Pending,
            created_at: created_at.clone(),
            paid_at: None,
        });

        plan.notifications.push(bet_fact(
            NotificationAction::BetWon,
            &winner_id,
            &loser_id,
            challenge,
            &created_at,
        ));
        plan.notifications.push(bet_fact(
            NotificationAction::BetLost,
            &loser_id,
            &winner_id,
            challenge,
            &created_at,
        ));
    }

    plan
}

fn bet_fact(
    action: NotificationAction,
    recipient_id: &str,
    actor_id: &str,
    challenge: &Challenge,
    created_at: &str,
) -> Notification {
    Notification {
        id: uuid::Uuid::new_v4().to_string(),
        recipient_id: recipient_id.to_string(),
        actor_id: actor_id.to_string(),
        action,
        object_id: challenge.id.clone(),
        object_type: "bet".to_string(),
        read: false,
        created_at: created_at.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BetType;
    use chrono::TimeZone;

    fn challenge(challenge_type: ChallengeType, bet_type: BetType) -> Challenge {
        Challenge {
            id: "ch1".to_string(),
            route_id: "r1".to_string(),
            name: "Lakeside loop showdown".to_string(),
            start_date: Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2026, 5, 31, 0, 0, 0).unwrap(),
            created_by: "creator".to_string(),
            challenge_type,
            bet_type,
            bet_value: Some("1 beer".to_string()),
            is_active: true,
            created_at: "2026-05-01T00:00:00Z".to_string(),
        }
    }

    fn activity(id: &str, user_id: &str, duration_seconds: u32) -> Activity {
        Activity {
            id: id.to_string(),
            user_id: user_id.to_string(),
            route_id: "r1".to_string(),
            challenge_id: Some("ch1".to_string()),
            activity_type: "Run".to_string(),
            track: String::new(),
            duration_seconds,
            distance_km: 5.0,
            avg_speed_kmh: 10.0,
            created_at: "2026-05-10T09:00:00Z".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 3, 0, 0).unwrap()
    }

    #[test]
    fn test_closed_challenge_every_other_participant_loses() {
        let ch = challenge(ChallengeType::Closed, BetType::Beer);
        let activities = vec![
            activity("a1", "alice", 300),
            activity("a2", "bob", 350),
            activity("a3", "carol", 400),
        ];

        let plan = settle(&ch, &activities, now());

        assert_eq!(plan.winner_id.as_deref(), Some("alice"));
        assert_eq!(plan.bets.len(), 2);
        let losers: Vec<&str> = plan.bets.iter().map(|b| b.loser_id.as_str()).collect();
        assert_eq!(losers, vec!["bob", "carol"]);
        assert!(plan.bets.iter().all(|b| b.winner_id == "alice"));
        assert!(plan.bets.iter().all(|b| b.status == BetStatus::Pending));
        assert!(plan.bets.iter().all(|b| b.paid_at.is_none()));

        // Winner gets one bet_won per loser; each loser gets one bet_lost.
        let won: Vec<_> = plan
            .notifications
            .iter()
            .filter(|n| n.action == NotificationAction::BetWon)
            .collect();
        let lost: Vec<_> = plan
            .notifications
            .iter()
            .filter(|n| n.action == NotificationAction::BetLost)
            .collect();
        assert_eq!(won.len(), 2);
        assert!(won.iter().all(|n| n.recipient_id == "alice"));
        assert_eq!(lost.len(), 2);
        let lost_recipients: Vec<&str> = lost.iter().map(|n| n.recipient_id.as_str()).collect();
        assert_eq!(lost_recipients, vec!["bob", "carol"]);
        assert!(plan.notifications.iter().all(|n| n.object_id == "ch1"));
    }

    #[test]
    fn test_closed_challenge_multiple_activities_per_user() {
        let ch = challenge(ChallengeType::Closed, BetType::Coffee);
        let activities = vec![
            activity("a1", "alice", 320),
            activity("a2", "bob", 350),
            activity("a3", "alice", 300),
            activity("a4", "bob", 340),
        ];

        let plan = settle(&ch, &activities, now());

        assert_eq!(plan.winner_id.as_deref(), Some("alice"));
        // Bob loses once, not once per activity.
        assert_eq!(plan.bets.len(), 1);
        assert_eq!(plan.bets[0].loser_id, "bob");
    }

    #[test]
    fn test_open_challenge_creator_pays_when_beaten() {
        let ch = challenge(ChallengeType::Open, BetType::Dinner);
        let activities = vec![
            activity("a1", "creator", 400),
            activity("a2", "dave", 300),
        ];

        let plan = settle(&ch, &activities, now());

        assert_eq!(plan.bets.len(), 1);
        assert_eq!(plan.bets[0].winner_id, "dave");
        assert_eq!(plan.bets[0].loser_id, "creator");
    }

    #[test]
    fn test_open_challenge_no_bet_when_creator_wins() {
        let ch = challenge(ChallengeType::Open, BetType::Beer);
        let activities = vec![activity("a1", "creator", 300)];

        let plan = settle(&ch, &activities, now());

        assert_eq!(plan.winner_id.as_deref(), Some("creator"));
        assert!(plan.bets.is_empty());
        assert!(plan.notifications.is_empty());
    }

    #[test]
    fn test_open_challenge_other_participants_do_not_pay() {
        let ch = challenge(ChallengeType::Open, BetType::Beer);
        let activities = vec![
            activity("a1", "creator", 400),
            activity("a2", "dave", 300),
            activity("a3", "erin", 350),
        ];

        let plan = settle(&ch, &activities, now());

        // Only the creator owes the winner; Erin is off the hook.
        assert_eq!(plan.bets.len(), 1);
        assert_eq!(plan.bets[0].loser_id, "creator");
    }

    #[test]
    fn test_no_activities_is_a_no_op() {
        let ch = challenge(ChallengeType::Closed, BetType::Beer);
        let plan = settle(&ch, &[], now());

        assert!(plan.winner_id.is_none());
        assert!(plan.bets.is_empty());
        assert!(plan.notifications.is_empty());
    }

    #[test]
    fn test_no_wager_is_a_no_op() {
        let ch = challenge(ChallengeType::Closed, BetType::None);
        let activities = vec![activity("a1", "alice", 300), activity("a2", "bob", 350)];

        let plan = settle(&ch, &activities, now());
        assert!(plan.bets.is_empty());
    }

    #[test]
    fn test_tie_goes_to_first_submitted() {
        let ch = challenge(ChallengeType::Closed, BetType::Beer);
        let activities = vec![activity("a1", "alice", 300), activity("a2", "bob", 300)];

        let plan = settle(&ch, &activities, now());
        assert_eq!(plan.winner_id.as_deref(), Some("alice"));
        assert_eq!(plan.bets.len(), 1);
        assert_eq!(plan.bets[0].loser_id, "bob");
    }

    #[test]
    fn test_bet_carries_challenge_wager() {
        let ch = challenge(ChallengeType::Closed, BetType::Custom);
        let activities = vec![activity("a1", "alice", 300), activity("a2", "bob", 350)];

        let plan = settle(&ch, &activities, now());
        assert_eq!(plan.bets[0].bet_type, BetType::Custom);
        assert_eq!(plan.bets[0].bet_value.as_deref(), Some("1 beer"));
    }
}
