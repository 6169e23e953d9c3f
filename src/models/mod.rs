// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod activity;
pub mod challenge;
pub mod notification;
pub mod route;
pub mod track;

pub use activity::Activity;
pub use challenge::{Bet, BetStatus, BetType, Challenge, ChallengeInvitation, ChallengeType, InvitationStatus};
pub use notification::{Notification, NotificationAction};
pub use route::{Route, RouteRecord};
pub use track::{CanonicalTrack, RawTrack, TrackError, TrackMetrics};
