//! Token issuance and attendance recording.
//!
//! Two token flavours exist. An event token is shown by staff at the venue and
//! checks in whoever scans it; a personal token is held by one participant and
//! checks in that participant whoever scans it. Either way the target must be
//! `registered` at scan time, and the attendance row is upserted so repeated
//! scans only refresh the timestamp.

use crate::capability::{STAFF_ROLES, require_event_staff, require_role};
use crate::error::{Result, RollcallError};
use crate::participation::ParticipationService;
use crate::providers::{AttendanceStore, EventDirectory, ParticipantStore, UserDirectory};
use crate::token::{CheckInClaim, TokenCodec};
use crate::types::{
    Actor, AttendanceEntry, AttendanceRecord, CheckInMethod, CheckInReceipt, EventId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Event token handed to staff for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTokenGrant {
    /// Opaque signed token.
    pub token: String,
    /// Event the token checks into.
    pub event_id: EventId,
    /// Issuance time embedded in the token.
    pub generated_at: DateTime<Utc>,
}

/// Issues check-in tokens and records attendance.
#[derive(Clone)]
pub struct CheckInService<P, A, E, U> {
    participation: ParticipationService<P, E, U>,
    attendance: A,
    codec: TokenCodec,
}

impl<P, A, E, U> CheckInService<P, A, E, U>
where
    P: ParticipantStore,
    A: AttendanceStore,
    E: EventDirectory,
    U: UserDirectory,
{
    /// Create a check-in service on top of a participation service.
    pub fn new(
        participation: ParticipationService<P, E, U>,
        attendance: A,
        codec: TokenCodec,
    ) -> Self {
        Self {
            participation,
            attendance,
            codec,
        }
    }

    /// Participation service used for eligibility.
    pub const fn participation(&self) -> &ParticipationService<P, E, U> {
        &self.participation
    }

    /// Issue the event-scoped token staff display at the venue.
    ///
    /// # Errors
    ///
    /// - [`RollcallError::Forbidden`] unless the actor is staff for the event
    /// - [`RollcallError::EventNotFound`] if the event does not exist
    pub async fn issue_event_token(&self, event_id: EventId, actor: &Actor) -> Result<EventTokenGrant> {
        require_role(actor, STAFF_ROLES, "issue event token")?;
        let event = self.participation.require_event(event_id).await?;
        require_event_staff(actor, &event, "issue event token")?;

        let generated_at = self.participation.clock().now();
        let token = self
            .codec
            .issue(&CheckInClaim::event(event_id, generated_at.timestamp_millis()))?;

        tracing::info!(event_id = %event_id, by = %actor.user_id, "Event check-in token issued");
        Ok(EventTokenGrant {
            token,
            event_id,
            generated_at,
        })
    }

    /// Issue a token bound to one registered participant.
    ///
    /// # Errors
    ///
    /// Returns [`RollcallError::NotEligible`] unless the user is `registered`.
    pub async fn issue_personal_token(&self, event_id: EventId, user_id: UserId) -> Result<String> {
        self.require_eligible(event_id, user_id).await?;

        let generated_at = self.participation.clock().now().timestamp_millis();
        let token = self
            .codec
            .issue(&CheckInClaim::personal(event_id, user_id, generated_at))?;

        tracing::debug!(event_id = %event_id, user_id = %user_id, "Personal check-in token issued");
        Ok(token)
    }

    /// Redeem a scanned token.
    ///
    /// The scanning actor is checked in for an event token; the embedded user
    /// is checked in for a personal token.
    ///
    /// # Errors
    ///
    /// - [`RollcallError::InvalidSignature`] or [`RollcallError::MalformedToken`]
    ///   if the token does not verify
    /// - [`RollcallError::NotEligible`] unless the target is `registered`
    pub async fn apply_check_in(&self, token: &str, actor: &Actor) -> Result<CheckInReceipt> {
        let claim: CheckInClaim = self.codec.redeem(token).inspect_err(|e| {
            let reason = match e {
                RollcallError::InvalidSignature => "invalid_signature",
                _ => "malformed",
            };
            tracing::warn!(
                scanned_by = %actor.user_id,
                role = %actor.role,
                reason,
                "Check-in token rejected"
            );
            metrics::counter!("rollcall.tokens.rejected", "reason" => reason).increment(1);
        })?;

        let event_id = claim.event_id();
        let user_id = claim.bound_user().unwrap_or(actor.user_id);
        self.require_eligible(event_id, user_id).await?;

        let record = self
            .record(AttendanceRecord {
                event_id,
                user_id,
                method: CheckInMethod::Qr,
                checked_in_at: self.participation.clock().now(),
                checked_in_by: None,
            })
            .await?;

        tracing::info!(
            event_id = %event_id,
            user_id = %user_id,
            scanned_by = %actor.user_id,
            role = %actor.role,
            token_type = claim.type_tag(),
            "Participant checked in by token"
        );
        Ok(CheckInReceipt::from(&record))
    }

    /// Staff check-in without a token.
    ///
    /// # Errors
    ///
    /// - [`RollcallError::Forbidden`] unless the actor is staff for the event
    /// - [`RollcallError::EventNotFound`] if the event does not exist
    /// - [`RollcallError::NotEligible`] unless the user is `registered`
    pub async fn manual_check_in(
        &self,
        event_id: EventId,
        user_id: UserId,
        actor: &Actor,
    ) -> Result<CheckInReceipt> {
        require_role(actor, STAFF_ROLES, "manual check-in")?;
        let event = self.participation.require_event(event_id).await?;
        require_event_staff(actor, &event, "manual check-in")?;
        self.require_eligible(event_id, user_id).await?;

        let record = self
            .record(AttendanceRecord {
                event_id,
                user_id,
                method: CheckInMethod::Manual,
                checked_in_at: self.participation.clock().now(),
                checked_in_by: Some(actor.user_id),
            })
            .await?;

        tracing::info!(
            event_id = %event_id,
            user_id = %user_id,
            by = %actor.user_id,
            "Participant checked in manually"
        );
        Ok(CheckInReceipt::from(&record))
    }

    /// Attendance of an event with participant identity, latest check-in first.
    ///
    /// # Errors
    ///
    /// - [`RollcallError::Forbidden`] unless the actor is staff for the event
    /// - [`RollcallError::EventNotFound`] if the event does not exist
    pub async fn list_attendance(&self, event_id: EventId, actor: &Actor) -> Result<Vec<AttendanceEntry>> {
        require_role(actor, STAFF_ROLES, "list attendance")?;
        let event = self.participation.require_event(event_id).await?;
        require_event_staff(actor, &event, "list attendance")?;

        let records = self.attendance.list_for_event(event_id).await?;
        let user_ids: Vec<UserId> = records.iter().map(|r| r.user_id).collect();
        let mut profiles: HashMap<UserId, _> = self
            .participation
            .users()
            .find_users(&user_ids)
            .await?
            .into_iter()
            .map(|p| (p.user_id, p))
            .collect();

        Ok(records
            .into_iter()
            .map(|record| {
                let (name, email) = profiles
                    .remove(&record.user_id)
                    .map(|p| (p.name, p.email))
                    .unwrap_or_default();
                AttendanceEntry {
                    user_id: record.user_id,
                    name,
                    email,
                    method: record.method,
                    checked_in_at: record.checked_in_at,
                    checked_in_by: record.checked_in_by,
                }
            })
            .collect())
    }

    async fn require_eligible(&self, event_id: EventId, user_id: UserId) -> Result<()> {
        if self
            .participation
            .is_eligible_for_check_in(event_id, user_id)
            .await?
        {
            return Ok(());
        }

        tracing::debug!(event_id = %event_id, user_id = %user_id, "Not eligible for check-in");
        Err(RollcallError::NotEligible { event_id, user_id })
    }

    async fn record(&self, record: AttendanceRecord) -> Result<AttendanceRecord> {
        let stored = self.attendance.upsert(&record).await?;
        metrics::counter!("rollcall.checkins.total", "method" => stored.method.as_str()).increment(1);
        Ok(stored)
    }
}
