// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Paceline: activity validation and challenge settlement engine
//!
//! This crate provides the backend API that decides whether a submitted
//! GPS track counts as a legitimate completion of a route, maintains the
//! per-route leaderboard, and settles the wagers of expired challenges.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
}
