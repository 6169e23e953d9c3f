// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Challenge lifecycle scheduler.
//!
//! Transitions challenges from active to expired: once at process start,
//! on a fixed interval afterwards, and on demand via the tasks endpoint.
//! Each challenge closes in its own transaction (settlement, invitation
//! expiry and the `is_active` flip together), so one challenge failing to
//! settle is logged and skipped without blocking the rest of the run.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::services::settlement;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Background service with an explicit start/stop lifecycle.
///
/// Owned by the host process; there is no global scheduler state. Calling
/// [`close_expired_challenges`] with zero eligible challenges is a no-op,
/// so redundant invocations (interval tick racing the HTTP trigger) are
/// safe.
pub struct ChallengeScheduler {
    db: FirestoreDb,
    interval: Duration,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl ChallengeScheduler {
    pub fn new(db: FirestoreDb, interval: Duration) -> Self {
        Self {
            db,
            interval,
            shutdown_tx: None,
            handle: None,
        }
    }

    /// Start the background loop.
    ///
    /// The first tick fires immediately, which doubles as the run-at-start
    /// pass over challenges that expired while the process was down.
    pub fn start(&mut self) {
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let db = self.db.clone();
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match close_expired_challenges(&db, Utc::now()).await {
                            Ok(closed) if closed > 0 => {
                                tracing::info!(closed, "Scheduler run closed challenges");
                            }
                            Ok(_) => {
                                tracing::debug!("Scheduler run found no expired challenges");
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Scheduler run failed");
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Challenge scheduler shutdown requested");
                        break;
                    }
                }
            }
        });

        self.handle = Some(handle);
        tracing::info!(interval_secs = period.as_secs(), "Challenge scheduler started");
    }

    /// Stop the background loop and wait for it to finish.
    pub async fn stop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Error waiting for scheduler to stop");
            }
        }

        tracing::info!("Challenge scheduler stopped");
    }
}

/// Close every challenge whose window has ended.
///
/// Returns the number of challenges this run actually closed. Re-entrant:
/// a challenge already flipped inactive (by a concurrent run or a previous
/// pass) is skipped inside its close transaction and not counted.
pub async fn close_expired_challenges(
    db: &FirestoreDb,
    now: DateTime<Utc>,
) -> Result<usize, AppError> {
    let active = db.list_active_challenges().await?;
    let expired: Vec<_> = active.into_iter().filter(|c| c.is_expired(now)).collect();

    if expired.is_empty() {
        return Ok(0);
    }

    tracing::info!(count = expired.len(), "Found expired challenges");

    let mut closed = 0;
    for challenge in expired {
        match close_one(db, &challenge.id, now).await {
            Ok(true) => closed += 1,
            Ok(false) => {}
            Err(e) => {
                // Skip and keep going: this challenge's close rolled back
                // as a unit and the next run will retry it.
                tracing::error!(
                    challenge_id = %challenge.id,
                    error = %e,
                    "Failed to close challenge"
                );
            }
        }
    }

    Ok(closed)
}

/// Close a single challenge in one transaction.
async fn close_one(db: &FirestoreDb, challenge_id: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
    let Some(challenge) = db.get_challenge(challenge_id).await? else {
        return Ok(false);
    };

    let activities = if challenge.bet_type.is_none() {
        Vec::new()
    } else {
        db.list_activities_for_challenge(&challenge.id).await?
    };

    let plan = settlement::settle(&challenge, &activities, now);
    let pending_invitations = db.list_pending_invitations(&challenge.id).await?;

    db.close_challenge_atomic(&challenge.id, &plan, &pending_invitations, now)
        .await
}
