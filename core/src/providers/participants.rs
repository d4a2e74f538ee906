//! Participation record storage.

use crate::error::Result;
use crate::types::{EventId, ParticipationRecord, ParticipationStatus, UserId};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Conditional, capacity-bounded registration.
///
/// Covers both entry paths into `registered`: a self-join (`expected: None`,
/// the record must not exist) and accepting an invitation
/// (`expected: Some(Invited)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationRequest {
    /// Event ID.
    pub event_id: EventId,
    /// User ID.
    pub user_id: UserId,
    /// Status the record must currently have; `None` means absent.
    pub expected: Option<ParticipationStatus>,
    /// Seats available in total.
    pub capacity: u32,
    /// `joined_at` for a newly created record.
    pub at: DateTime<Utc>,
}

/// Outcome of [`ParticipantStore::register_within_capacity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The record is now `registered`.
    Registered(ParticipationRecord),
    /// The record did not match `expected`; carries what was found.
    Conflict(Option<ParticipationRecord>),
    /// Every seat was taken at evaluation time.
    Full {
        /// Registered count observed.
        registered: u32,
    },
}

/// Participation record repository.
///
/// At most one record exists per (event, user) pair.
pub trait ParticipantStore: Send + Sync {
    /// Get the record for a pair.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn find(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<ParticipationRecord>>> + Send;

    /// Insert a record unless one already exists for the pair.
    ///
    /// # Returns
    ///
    /// `true` if the record was inserted.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn insert_if_absent(
        &self,
        record: &ParticipationRecord,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Atomically check the expected state and free capacity, then register.
    ///
    /// The state check, the registered count and the write are one unit:
    /// concurrent callers can never push the registered count past
    /// `request.capacity`. An existing record keeps its `joined_at`.
    ///
    /// # Errors
    ///
    /// Returns error if the transaction fails.
    fn register_within_capacity(
        &self,
        request: RegistrationRequest,
    ) -> impl Future<Output = Result<RegistrationOutcome>> + Send;

    /// Overwrite the status of an existing record.
    ///
    /// # Returns
    ///
    /// `false` if no record exists for the pair.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn update_status(
        &self,
        event_id: EventId,
        user_id: UserId,
        status: ParticipationStatus,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Delete the record for a pair.
    ///
    /// # Returns
    ///
    /// `true` if a record was deleted.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn delete(&self, event_id: EventId, user_id: UserId) -> impl Future<Output = Result<bool>> + Send;

    /// Count `registered` records for an event.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn count_registered(&self, event_id: EventId) -> impl Future<Output = Result<u32>> + Send;

    /// All records of an event, newest `joined_at` first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn list_for_event(
        &self,
        event_id: EventId,
    ) -> impl Future<Output = Result<Vec<ParticipationRecord>>> + Send;

    /// A user's records in the given status, oldest `joined_at` first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn list_for_user(
        &self,
        user_id: UserId,
        status: ParticipationStatus,
    ) -> impl Future<Output = Result<Vec<ParticipationRecord>>> + Send;
}
