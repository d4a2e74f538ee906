//! Attendance record storage.

use crate::error::Result;
use crate::types::{AttendanceRecord, EventId, UserId};
use std::future::Future;

/// Attendance record repository.
///
/// Keyed by (event, user); a participant has at most one record per event.
pub trait AttendanceStore: Send + Sync {
    /// Insert the record, or overwrite `method`, `checked_in_at` and
    /// `checked_in_by` of the existing one.
    ///
    /// Must be a single atomic upsert: concurrent check-ins for the same pair
    /// resolve to last-write-wins and never create a second row.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn upsert(
        &self,
        record: &AttendanceRecord,
    ) -> impl Future<Output = Result<AttendanceRecord>> + Send;

    /// Get the record for a pair.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn find(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<AttendanceRecord>>> + Send;

    /// All records of an event, latest `checked_in_at` first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn list_for_event(
        &self,
        event_id: EventId,
    ) -> impl Future<Output = Result<Vec<AttendanceRecord>>> + Send;
}
