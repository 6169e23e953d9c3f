// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod scheduler;
pub mod settlement;
pub mod validation;

pub use activity::{ActivityService, Submission, SubmissionOutcome};
pub use scheduler::ChallengeScheduler;
pub use settlement::SettlementPlan;
