// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const ROUTES: &str = "routes";
    pub const ACTIVITIES: &str = "activities";
    pub const CHALLENGES: &str = "challenges";
    pub const CHALLENGE_INVITATIONS: &str = "challenge_invitations";
    /// Leaderboard records (keyed by route_id + activity_type)
    pub const ROUTE_RECORDS: &str = "route_records";
    /// Wagers (keyed by challenge_id + loser_id)
    pub const BETS: &str = "bets";
    pub const NOTIFICATIONS: &str = "notifications";
}
