//! Participation state machine.
//!
//! Per (event, user) pair:
//!
//! ```text
//!            invite                accept (capacity-checked)
//! ABSENT ───────────► INVITED ───────────────────────────► REGISTERED
//!   │                    │                                      │
//!   └── self-join (capacity-checked) ──────────────────────────►│
//!                        │                                      │
//!                        └──── reject / leave / remove ─────────┴──► ABSENT
//! ```
//!
//! There is no way back from `REGISTERED` to `INVITED` except an explicit admin
//! status override. [`transition`] is the pure decision function; the
//! [`ParticipationService`] reads the current record, asks [`transition`] what
//! to do and applies the answer through the [`ParticipantStore`].

use crate::capability::{STAFF_ROLES, require_event_staff, require_role};
use crate::environment::Clock;
use crate::error::{Result, RollcallError};
use crate::providers::{
    EventDirectory, ParticipantStore, RegistrationOutcome, RegistrationRequest, UserDirectory,
};
use crate::types::{
    Actor, EventId, EventSummary, InvitationResponse, InvitationSummary, Occupancy,
    ParticipantEntry, ParticipationRecord, ParticipationStatus, UserId,
};
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Pure state machine
// ============================================================================

/// Requested change to a participation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipationCommand {
    /// Organizer invitation.
    Invite,
    /// The user registers themself.
    SelfJoin,
    /// The user answers an invitation.
    Respond(InvitationResponse),
    /// The user withdraws.
    Leave,
    /// Admin override of the status.
    SetStatus(ParticipationStatus),
    /// Admin removal.
    Remove,
}

/// What the store has to do for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changes; the command succeeds.
    Unchanged,
    /// Create a record in the given status.
    Insert(ParticipationStatus),
    /// Move into `registered`, subject to capacity. `from` is the status the
    /// record must still have (`None`: must still be absent).
    Register {
        /// Expected current status.
        from: Option<ParticipationStatus>,
    },
    /// Overwrite the status.
    Update(ParticipationStatus),
    /// Delete the record.
    Delete,
}

/// Decide the effect of `command` on a pair whose record is in `current`.
///
/// # Errors
///
/// - [`RollcallError::AlreadyJoined`] for a self-join when any record exists
/// - [`RollcallError::NotInvited`] when responding without a pending invitation
/// - [`RollcallError::NotAParticipant`] for leave or a status override without a record
pub fn transition(
    event_id: EventId,
    user_id: UserId,
    current: Option<ParticipationStatus>,
    command: ParticipationCommand,
) -> Result<Transition> {
    use ParticipationCommand as C;
    use ParticipationStatus as S;

    let not_a_participant = || RollcallError::NotAParticipant { event_id, user_id };
    let not_invited = || RollcallError::NotInvited { event_id, user_id };

    match (command, current) {
        (C::Invite, None) => Ok(Transition::Insert(S::Invited)),
        (C::Invite, Some(_)) => Ok(Transition::Unchanged),

        (C::SelfJoin, None) => Ok(Transition::Register { from: None }),
        (C::SelfJoin, Some(_)) => Err(RollcallError::AlreadyJoined { event_id, user_id }),

        (C::Respond(_), None) => Err(not_invited()),
        (C::Respond(InvitationResponse::Accept), Some(S::Invited)) => Ok(Transition::Register {
            from: Some(S::Invited),
        }),
        (C::Respond(InvitationResponse::Accept), Some(S::Registered)) => Ok(Transition::Unchanged),
        (C::Respond(InvitationResponse::Accept), Some(S::Rejected)) => Err(not_invited()),
        (C::Respond(InvitationResponse::Reject), Some(_)) => Ok(Transition::Delete),

        (C::Leave, None) => Err(not_a_participant()),
        (C::Leave, Some(_)) => Ok(Transition::Delete),

        (C::SetStatus(_), None) => Err(not_a_participant()),
        (C::SetStatus(status), Some(current)) if status == current => Ok(Transition::Unchanged),
        (C::SetStatus(status), Some(_)) => Ok(Transition::Update(status)),

        (C::Remove, None) => Ok(Transition::Unchanged),
        (C::Remove, Some(_)) => Ok(Transition::Delete),
    }
}

// ============================================================================
// Service
// ============================================================================

/// Enforces the participation state machine against a [`ParticipantStore`].
///
/// Holds no lock between calls; anything that must be atomic is delegated to
/// the store.
pub struct ParticipationService<P, E, U> {
    participants: P,
    events: E,
    users: U,
    clock: Arc<dyn Clock>,
}

impl<P: Clone, E: Clone, U: Clone> Clone for ParticipationService<P, E, U> {
    fn clone(&self) -> Self {
        Self {
            participants: self.participants.clone(),
            events: self.events.clone(),
            users: self.users.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<P, E, U> ParticipationService<P, E, U>
where
    P: ParticipantStore,
    E: EventDirectory,
    U: UserDirectory,
{
    /// Create a participation service.
    pub fn new(participants: P, events: E, users: U, clock: Arc<dyn Clock>) -> Self {
        Self {
            participants,
            events,
            users,
            clock,
        }
    }

    /// Account lookup shared with the check-in service.
    pub(crate) const fn users(&self) -> &U {
        &self.users
    }

    /// Clock shared with the check-in service.
    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Load an event or fail with [`RollcallError::EventNotFound`].
    pub(crate) async fn require_event(&self, event_id: EventId) -> Result<EventSummary> {
        self.events
            .find_event(event_id)
            .await?
            .ok_or(RollcallError::EventNotFound(event_id))
    }

    /// Invite one user. Existing records of any status are left alone.
    ///
    /// # Returns
    ///
    /// `true` if a new `invited` record was created.
    ///
    /// # Errors
    ///
    /// - [`RollcallError::Forbidden`] unless the actor is staff for the event
    /// - [`RollcallError::EventNotFound`] if the event does not exist
    pub async fn invite(&self, event_id: EventId, user_id: UserId, actor: &Actor) -> Result<bool> {
        require_role(actor, STAFF_ROLES, "invite participants")?;
        let event = self.require_event(event_id).await?;
        require_event_staff(actor, &event, "invite participants")?;

        self.invite_one(event_id, user_id).await
    }

    /// Invite several users.
    ///
    /// Each user is handled independently and in order. The batch is not
    /// atomic: if a store call fails midway, invitations already written stay.
    ///
    /// # Errors
    ///
    /// - [`RollcallError::Forbidden`] unless the actor is staff for the event
    /// - [`RollcallError::InvalidInput`] if `user_ids` is empty
    /// - [`RollcallError::EventNotFound`] if the event does not exist
    pub async fn invite_many(
        &self,
        event_id: EventId,
        user_ids: &[UserId],
        actor: &Actor,
    ) -> Result<InvitationSummary> {
        require_role(actor, STAFF_ROLES, "invite participants")?;
        if user_ids.is_empty() {
            return Err(RollcallError::InvalidInput(
                "select at least one participant to invite".to_string(),
            ));
        }
        let event = self.require_event(event_id).await?;
        require_event_staff(actor, &event, "invite participants")?;

        let mut summary = InvitationSummary::default();
        for &user_id in user_ids {
            if self.invite_one(event_id, user_id).await? {
                summary.invited.push(user_id);
            } else {
                summary.skipped.push(user_id);
            }
        }

        tracing::info!(
            event_id = %event_id,
            invited = summary.invited.len(),
            skipped = summary.skipped.len(),
            "Invitations sent"
        );
        Ok(summary)
    }

    async fn invite_one(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        let current = self.current_status(event_id, user_id).await?;
        match transition(event_id, user_id, current, ParticipationCommand::Invite)? {
            Transition::Insert(status) => {
                let record = ParticipationRecord {
                    event_id,
                    user_id,
                    status,
                    joined_at: self.clock.now(),
                };
                // A concurrent invite or join may have landed first; either way
                // the pair now has a record and nothing is downgraded.
                let inserted = self.participants.insert_if_absent(&record).await?;
                if inserted {
                    tracing::debug!(event_id = %event_id, user_id = %user_id, "User invited");
                }
                Ok(inserted)
            }
            _ => Ok(false),
        }
    }

    /// Register the user directly, skipping the invitation step.
    ///
    /// # Errors
    ///
    /// - [`RollcallError::EventNotFound`] if the event does not exist
    /// - [`RollcallError::AlreadyJoined`] if the user has a record of any status
    /// - [`RollcallError::EventFull`] if the registered count has reached capacity
    pub async fn self_join(&self, event_id: EventId, user_id: UserId) -> Result<ParticipationRecord> {
        let event = self.require_event(event_id).await?;
        let current = self.current_status(event_id, user_id).await?;

        match transition(event_id, user_id, current, ParticipationCommand::SelfJoin)? {
            Transition::Register { from } => {
                let record = self.register(&event, user_id, from, ParticipationCommand::SelfJoin).await?;
                metrics::counter!("rollcall.participants.joined", "path" => "self_join").increment(1);
                tracing::info!(event_id = %event_id, user_id = %user_id, "User joined event");
                Ok(record)
            }
            other => Err(unexpected(other, ParticipationCommand::SelfJoin)),
        }
    }

    /// Accept or reject an invitation.
    ///
    /// Accepting takes a seat under the same capacity rule as a self-join and
    /// returns the registered record. Rejecting deletes the record whatever its
    /// status and returns `None`.
    ///
    /// # Errors
    ///
    /// - [`RollcallError::NotInvited`] if the user has no record (or, on accept,
    ///   a `rejected` one)
    /// - [`RollcallError::EventFull`] if accepting would exceed capacity
    /// - [`RollcallError::EventNotFound`] if accepting for a deleted event
    pub async fn respond(
        &self,
        event_id: EventId,
        user_id: UserId,
        response: InvitationResponse,
    ) -> Result<Option<ParticipationRecord>> {
        let command = ParticipationCommand::Respond(response);
        let current = self.participants.find(event_id, user_id).await?;

        match transition(event_id, user_id, current.as_ref().map(|r| r.status), command)? {
            Transition::Register { from } => {
                let event = self.require_event(event_id).await?;
                let record = self.register(&event, user_id, from, command).await?;
                metrics::counter!("rollcall.participants.joined", "path" => "invitation").increment(1);
                tracing::info!(event_id = %event_id, user_id = %user_id, "Invitation accepted");
                Ok(Some(record))
            }
            Transition::Unchanged => Ok(current),
            Transition::Delete => {
                if !self.participants.delete(event_id, user_id).await? {
                    return Err(RollcallError::NotInvited { event_id, user_id });
                }
                tracing::info!(event_id = %event_id, user_id = %user_id, "Invitation rejected");
                Ok(None)
            }
            other => Err(unexpected(other, command)),
        }
    }

    /// Withdraw from an event, whatever the current status.
    ///
    /// # Errors
    ///
    /// Returns [`RollcallError::NotAParticipant`] if the user has no record.
    pub async fn leave(&self, event_id: EventId, user_id: UserId) -> Result<()> {
        // Deleting is the whole transition; the row count tells absent from present.
        if self.participants.delete(event_id, user_id).await? {
            tracing::info!(event_id = %event_id, user_id = %user_id, "User left event");
            return Ok(());
        }

        transition(event_id, user_id, None, ParticipationCommand::Leave).map(|_| ())
    }

    /// Admin override of a participant's status.
    ///
    /// The status is overwritten unconditionally; capacity is not consulted.
    ///
    /// # Errors
    ///
    /// - [`RollcallError::Forbidden`] unless the actor is staff for the event
    /// - [`RollcallError::EventNotFound`] if the event does not exist
    /// - [`RollcallError::NotAParticipant`] if the user has no record
    pub async fn set_status(
        &self,
        event_id: EventId,
        user_id: UserId,
        status: ParticipationStatus,
        actor: &Actor,
    ) -> Result<ParticipationRecord> {
        require_role(actor, STAFF_ROLES, "update participant status")?;
        let event = self.require_event(event_id).await?;
        require_event_staff(actor, &event, "update participant status")?;

        let command = ParticipationCommand::SetStatus(status);
        let current = self.participants.find(event_id, user_id).await?;

        match (transition(event_id, user_id, current.as_ref().map(|r| r.status), command)?, current) {
            (Transition::Unchanged, Some(record)) => Ok(record),
            (Transition::Update(status), Some(record)) => {
                if !self.participants.update_status(event_id, user_id, status).await? {
                    return Err(RollcallError::NotAParticipant { event_id, user_id });
                }
                tracing::info!(
                    event_id = %event_id,
                    user_id = %user_id,
                    from = %record.status,
                    to = %status,
                    by = %actor.user_id,
                    "Participant status overridden"
                );
                Ok(ParticipationRecord { status, ..record })
            }
            (other, _) => Err(unexpected(other, command)),
        }
    }

    /// Admin removal. Removing a non-participant is not an error.
    ///
    /// # Returns
    ///
    /// `true` if a record was deleted.
    ///
    /// # Errors
    ///
    /// - [`RollcallError::Forbidden`] unless the actor is staff for the event
    /// - [`RollcallError::EventNotFound`] if the event does not exist
    pub async fn remove(&self, event_id: EventId, user_id: UserId, actor: &Actor) -> Result<bool> {
        require_role(actor, STAFF_ROLES, "remove participant")?;
        let event = self.require_event(event_id).await?;
        require_event_staff(actor, &event, "remove participant")?;

        let current = self.current_status(event_id, user_id).await?;
        let removed = match transition(event_id, user_id, current, ParticipationCommand::Remove)? {
            // A concurrent leave may win; the row count still reports the outcome.
            Transition::Delete => self.participants.delete(event_id, user_id).await?,
            Transition::Unchanged => false,
            other => return Err(unexpected(other, ParticipationCommand::Remove)),
        };
        if removed {
            tracing::info!(
                event_id = %event_id,
                user_id = %user_id,
                by = %actor.user_id,
                "Participant removed"
            );
        }
        Ok(removed)
    }

    /// Whether the user may check in: a record exists and is `registered`.
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    pub async fn is_eligible_for_check_in(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        Ok(self.current_status(event_id, user_id).await? == Some(ParticipationStatus::Registered))
    }

    /// Participants of an event with their identity, newest first.
    ///
    /// # Errors
    ///
    /// - [`RollcallError::Forbidden`] unless the actor is staff for the event
    /// - [`RollcallError::EventNotFound`] if the event does not exist
    pub async fn list_participants(
        &self,
        event_id: EventId,
        actor: &Actor,
    ) -> Result<Vec<ParticipantEntry>> {
        require_role(actor, STAFF_ROLES, "list participants")?;
        let event = self.require_event(event_id).await?;
        require_event_staff(actor, &event, "list participants")?;

        let records = self.participants.list_for_event(event_id).await?;
        let user_ids: Vec<UserId> = records.iter().map(|r| r.user_id).collect();
        let mut profiles: HashMap<UserId, _> = self
            .users
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
                ParticipantEntry {
                    user_id: record.user_id,
                    name,
                    email,
                    status: record.status,
                    joined_at: record.joined_at,
                }
            })
            .collect())
    }

    /// Invitations the user has not answered yet, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    pub async fn pending_invitations(&self, user_id: UserId) -> Result<Vec<ParticipationRecord>> {
        self.participants
            .list_for_user(user_id, ParticipationStatus::Invited)
            .await
    }

    /// Seat usage of an event.
    ///
    /// # Errors
    ///
    /// Returns [`RollcallError::EventNotFound`] if the event does not exist.
    pub async fn occupancy(&self, event_id: EventId) -> Result<Occupancy> {
        let event = self.require_event(event_id).await?;
        let registered = self.participants.count_registered(event_id).await?;

        Ok(Occupancy {
            event_id,
            capacity: event.capacity,
            registered,
        })
    }

    async fn current_status(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<ParticipationStatus>> {
        Ok(self
            .participants
            .find(event_id, user_id)
            .await?
            .map(|record| record.status))
    }

    /// Run a capacity-checked registration and translate the outcome.
    async fn register(
        &self,
        event: &EventSummary,
        user_id: UserId,
        from: Option<ParticipationStatus>,
        command: ParticipationCommand,
    ) -> Result<ParticipationRecord> {
        let request = RegistrationRequest {
            event_id: event.event_id,
            user_id,
            expected: from,
            capacity: event.capacity,
            at: self.clock.now(),
        };

        match self.participants.register_within_capacity(request).await? {
            RegistrationOutcome::Registered(record) => Ok(record),
            RegistrationOutcome::Full { registered } => {
                tracing::info!(
                    event_id = %event.event_id,
                    user_id = %user_id,
                    registered,
                    capacity = event.capacity,
                    "Registration refused, event full"
                );
                metrics::counter!("rollcall.participants.refused_full").increment(1);
                Err(RollcallError::EventFull {
                    event_id: event.event_id,
                    capacity: event.capacity,
                })
            }
            RegistrationOutcome::Conflict(found) => {
                // Lost a race: re-decide against what is actually stored.
                let status = found.as_ref().map(|r| r.status);
                match (transition(event.event_id, user_id, status, command)?, found) {
                    (Transition::Unchanged, Some(record)) => Ok(record),
                    _ => Err(RollcallError::Internal(format!(
                        "participation of user {user_id} in event {} changed concurrently",
                        event.event_id
                    ))),
                }
            }
        }
    }
}

fn unexpected(transition: Transition, command: ParticipationCommand) -> RollcallError {
    RollcallError::Internal(format!("transition {transition:?} is not valid for {command:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::ParticipationCommand as C;
    use crate::types::ParticipationStatus as S;

    const EVENT: EventId = EventId::new(1);
    const USER: UserId = UserId::new(2);

    fn decide(current: Option<S>, command: C) -> Result<Transition> {
        transition(EVENT, USER, current, command)
    }

    #[test]
    fn test_invite_never_downgrades() {
        assert_eq!(decide(None, C::Invite), Ok(Transition::Insert(S::Invited)));
        assert_eq!(decide(Some(S::Registered), C::Invite), Ok(Transition::Unchanged));
        assert_eq!(decide(Some(S::Rejected), C::Invite), Ok(Transition::Unchanged));
    }

    #[test]
    fn test_self_join_requires_absence() {
        assert_eq!(decide(None, C::SelfJoin), Ok(Transition::Register { from: None }));
        for status in [S::Invited, S::Registered, S::Rejected] {
            assert_eq!(
                decide(Some(status), C::SelfJoin),
                Err(RollcallError::AlreadyJoined {
                    event_id: EVENT,
                    user_id: USER
                })
            );
        }
    }

    #[test]
    fn test_accept_only_from_invited() {
        let accept = C::Respond(InvitationResponse::Accept);
        assert_eq!(
            decide(Some(S::Invited), accept),
            Ok(Transition::Register {
                from: Some(S::Invited)
            })
        );
        assert_eq!(decide(Some(S::Registered), accept), Ok(Transition::Unchanged));
        assert!(matches!(
            decide(Some(S::Rejected), accept),
            Err(RollcallError::NotInvited { .. })
        ));
        assert!(matches!(decide(None, accept), Err(RollcallError::NotInvited { .. })));
    }

    #[test]
    fn test_reject_deletes_any_record() {
        let reject = C::Respond(InvitationResponse::Reject);
        for status in [S::Invited, S::Registered, S::Rejected] {
            assert_eq!(decide(Some(status), reject), Ok(Transition::Delete));
        }
        assert!(matches!(decide(None, reject), Err(RollcallError::NotInvited { .. })));
    }

    #[test]
    fn test_leave_and_remove_differ_on_absence() {
        assert!(matches!(
            decide(None, C::Leave),
            Err(RollcallError::NotAParticipant { .. })
        ));
        assert_eq!(decide(None, C::Remove), Ok(Transition::Unchanged));
        assert_eq!(decide(Some(S::Invited), C::Leave), Ok(Transition::Delete));
        assert_eq!(decide(Some(S::Registered), C::Remove), Ok(Transition::Delete));
    }

    #[test]
    fn test_set_status_requires_record() {
        assert!(matches!(
            decide(None, C::SetStatus(S::Registered)),
            Err(RollcallError::NotAParticipant { .. })
        ));
        assert_eq!(
            decide(Some(S::Registered), C::SetStatus(S::Invited)),
            Ok(Transition::Update(S::Invited))
        );
        assert_eq!(
            decide(Some(S::Rejected), C::SetStatus(S::Rejected)),
            Ok(Transition::Unchanged)
        );
    }
}
