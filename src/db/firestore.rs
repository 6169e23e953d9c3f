// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Routes and route records (leaderboard)
//! - Activities (validated submissions)
//! - Challenges, invitations and bets
//! - Notification facts
//!
//! The three multi-write operations (activity submission, challenge close,
//! bet payment) each run inside a single Firestore transaction so readers
//! never observe a partially applied state.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    Activity, Bet, Challenge, ChallengeInvitation, InvitationStatus, Notification,
    NotificationAction, Route, RouteRecord,
};
use crate::services::settlement::SettlementPlan;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};

/// Build the deterministic document id for a route record.
///
/// Keying by (route, activity type) makes "at most one record per key"
/// structural: replacing a record is an overwrite of one document.
pub fn record_doc_id(route_id: &str, activity_type: &str) -> String {
    format!("{}:{}", route_id, urlencoding::encode(activity_type))
}

/// Document id for an invitation: one per (challenge, invitee).
pub fn invitation_doc_id(challenge_id: &str, invited_user_id: &str) -> String {
    format!("{}:{}", challenge_id, invited_user_id)
}

/// Document id for a bet: one per (challenge, loser).
pub fn bet_doc_id(challenge_id: &str, loser_id: &str) -> String {
    format!("{}:{}", challenge_id, loser_id)
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Route Operations ────────────────────────────────────────

    /// Get a route by id.
    pub async fn get_route(&self, route_id: &str) -> Result<Option<Route>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ROUTES)
            .obj()
            .one(route_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a route.
    pub async fn create_route(&self, route: &Route) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ROUTES)
            .document_id(&route.id)
            .object(route)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get the current leaderboard record for (route, activity type).
    pub async fn get_route_record(
        &self,
        route_id: &str,
        activity_type: &str,
    ) -> Result<Option<RouteRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ROUTE_RECORDS)
            .obj()
            .one(&record_doc_id(route_id, activity_type))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Get an activity by id.
    pub async fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(activity_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all activities submitted against a challenge.
    pub async fn list_activities_for_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<Vec<Activity>, AppError> {
        let challenge_id = challenge_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| q.field("challenge_id").eq(challenge_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically persist a validated activity and maintain the leaderboard.
    ///
    /// Reads the current record for (route, activity type); when the new
    /// activity is strictly faster (or no record exists) the record
    /// document is overwritten and a `new_record` fact is appended, all in
    /// the same transaction as the activity write. Ties leave the old
    /// record untouched.
    ///
    /// Returns `true` when a new record was set.
    pub async fn submit_activity_atomic(
        &self,
        activity: &Activity,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let current_record = self
            .get_route_record(&activity.route_id, &activity.activity_type)
            .await?;

        let sets_record = match &current_record {
            None => true,
            Some(record) => record.beaten_by(activity.duration_seconds),
        };

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(&activity.id)
            .object(activity)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add activity to transaction: {}", e))
            })?;

        if sets_record {
            let record = RouteRecord {
                route_id: activity.route_id.clone(),
                user_id: activity.user_id.clone(),
                activity_id: activity.id.clone(),
                activity_type: activity.activity_type.clone(),
                duration_seconds: activity.duration_seconds,
                created_at: format_utc_rfc3339(now),
            };

            self.get_client()?
                .fluent()
                .update()
                .in_col(collections::ROUTE_RECORDS)
                .document_id(&record_doc_id(&activity.route_id, &activity.activity_type))
                .object(&record)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add record to transaction: {}", e))
                })?;

            // Fact consumed externally for celebratory posts/badges.
            let fact = Notification {
                id: uuid::Uuid::new_v4().to_string(),
                recipient_id: activity.user_id.clone(),
                actor_id: activity.user_id.clone(),
                action: NotificationAction::NewRecord,
                object_id: activity.route_id.clone(),
                object_type: "route".to_string(),
                read: false,
                created_at: format_utc_rfc3339(now),
            };
            self.add_notification_to_transaction(&fact, &mut transaction)?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            activity_id = %activity.id,
            route_id = %activity.route_id,
            sets_record,
            "Activity persisted atomically"
        );

        Ok(sets_record)
    }

    // ─── Challenge Operations ────────────────────────────────────

    /// Get a challenge by id.
    pub async fn get_challenge(&self, challenge_id: &str) -> Result<Option<Challenge>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CHALLENGES)
            .obj()
            .one(challenge_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List all challenges still flagged active.
    ///
    /// Expiry (`end_date < now`) is evaluated by the caller; active
    /// challenges are few and this keeps the query free of cross-type
    /// range comparisons.
    pub async fn list_active_challenges(&self) -> Result<Vec<Challenge>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CHALLENGES)
            .filter(|q| q.field("is_active").eq(true))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically create a challenge with its invitations and the
    /// `challenge_invitation` facts for the invitees.
    pub async fn create_challenge_atomic(
        &self,
        challenge: &Challenge,
        invitations: &[ChallengeInvitation],
        facts: &[Notification],
    ) -> Result<(), AppError> {
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::CHALLENGES)
            .document_id(&challenge.id)
            .object(challenge)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add challenge to transaction: {}", e))
            })?;

        for invitation in invitations {
            self.add_invitation_to_transaction(invitation, &mut transaction)?;
        }
        for fact in facts {
            self.add_notification_to_transaction(fact, &mut transaction)?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(())
    }

    /// Get an invitation for (challenge, invitee).
    pub async fn get_invitation(
        &self,
        challenge_id: &str,
        invited_user_id: &str,
    ) -> Result<Option<ChallengeInvitation>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CHALLENGE_INVITATIONS)
            .obj()
            .one(&invitation_doc_id(challenge_id, invited_user_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List the still-pending invitations of a challenge.
    pub async fn list_pending_invitations(
        &self,
        challenge_id: &str,
    ) -> Result<Vec<ChallengeInvitation>, AppError> {
        let challenge_id = challenge_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CHALLENGE_INVITATIONS)
            .filter(move |q| {
                q.for_all([
                    q.field("challenge_id").eq(challenge_id.clone()),
                    q.field("status").eq("pending"),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically store an invitation response and notify the creator.
    pub async fn respond_invitation_atomic(
        &self,
        invitation: &ChallengeInvitation,
        fact: &Notification,
    ) -> Result<(), AppError> {
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        self.add_invitation_to_transaction(invitation, &mut transaction)?;
        self.add_notification_to_transaction(fact, &mut transaction)?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(())
    }

    /// Atomically close an expired challenge.
    ///
    /// In one transaction: apply the settlement plan (bets + facts), force
    /// pending invitations to `expired`, and flip `is_active` off. The
    /// challenge is re-read first and already-inactive challenges are a
    /// no-op, so redundant scheduler runs close each challenge exactly
    /// once.
    ///
    /// Returns `true` when this call performed the close.
    pub async fn close_challenge_atomic(
        &self,
        challenge_id: &str,
        plan: &SettlementPlan,
        pending_invitations: &[ChallengeInvitation],
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let challenge = self
            .get_challenge(challenge_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Challenge {} not found", challenge_id)))?;

        if !challenge.is_active {
            tracing::debug!(challenge_id, "Challenge already closed (idempotent skip)");
            let _ = transaction.rollback().await;
            return Ok(false);
        }

        // Settlement is staged before the is_active flip; the transaction
        // guarantees either both land or neither.
        for bet in &plan.bets {
            self.get_client()?
                .fluent()
                .update()
                .in_col(collections::BETS)
                .document_id(&bet_doc_id(&bet.challenge_id, &bet.loser_id))
                .object(bet)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add bet to transaction: {}", e))
                })?;
        }
        for fact in &plan.notifications {
            self.add_notification_to_transaction(fact, &mut transaction)?;
        }

        for invitation in pending_invitations {
            let expired = ChallengeInvitation {
                status: InvitationStatus::Expired,
                responded_at: Some(format_utc_rfc3339(now)),
                ..invitation.clone()
            };
            self.add_invitation_to_transaction(&expired, &mut transaction)?;
        }

        let closed = Challenge {
            is_active: false,
            ..challenge
        };
        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::CHALLENGES)
            .document_id(&closed.id)
            .object(&closed)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add challenge to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            challenge_id,
            bets = plan.bets.len(),
            expired_invitations = pending_invitations.len(),
            "Challenge closed"
        );

        Ok(true)
    }

    // ─── Bet Operations ──────────────────────────────────────────

    /// Get a bet by its document id (`challenge_id:loser_id`).
    pub async fn get_bet(&self, bet_id: &str) -> Result<Option<Bet>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::BETS)
            .obj()
            .one(bet_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List bets a user is involved in, won and lost.
    pub async fn list_bets_for_user(&self, user_id: &str) -> Result<Vec<Bet>, AppError> {
        let winner = user_id.to_string();
        let mut won: Vec<Bet> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::BETS)
            .filter(move |q| q.field("winner_id").eq(winner.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let loser = user_id.to_string();
        let lost: Vec<Bet> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::BETS)
            .filter(move |q| q.field("loser_id").eq(loser.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        won.extend(lost);
        Ok(won)
    }

    /// Atomically mark a bet paid and notify the winner.
    ///
    /// The caller has already verified the acting user is the loser and
    /// that the bet is still pending.
    pub async fn pay_bet_atomic(&self, bet: &Bet, fact: &Notification) -> Result<(), AppError> {
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::BETS)
            .document_id(&bet_doc_id(&bet.challenge_id, &bet.loser_id))
            .object(bet)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add bet to transaction: {}", e)))?;
        self.add_notification_to_transaction(fact, &mut transaction)?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(())
    }

    // ─── Notification Operations ─────────────────────────────────

    /// List a user's notification facts, newest first.
    pub async fn list_notifications(
        &self,
        recipient_id: &str,
        limit: u32,
    ) -> Result<Vec<Notification>, AppError> {
        let recipient_id = recipient_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::NOTIFICATIONS)
            .filter(move |q| q.field("recipient_id").eq(recipient_id.clone()))
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Helper Methods ──────────────────────────────────────────

    fn add_invitation_to_transaction(
        &self,
        invitation: &ChallengeInvitation,
        transaction: &mut firestore::FirestoreTransaction,
    ) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::CHALLENGE_INVITATIONS)
            .document_id(&invitation_doc_id(
                &invitation.challenge_id,
                &invitation.invited_user_id,
            ))
            .object(invitation)
            .add_to_transaction(transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add invitation to transaction: {}", e))
            })?;
        Ok(())
    }

    fn add_notification_to_transaction(
        &self,
        fact: &Notification,
        transaction: &mut firestore::FirestoreTransaction,
    ) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::NOTIFICATIONS)
            .document_id(&fact.id)
            .object(fact)
            .add_to_transaction(transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add notification to transaction: {}", e))
            })?;
        Ok(())
    }
}
