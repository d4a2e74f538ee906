//! Read-only lookups into the event and account collaborators.

use crate::error::Result;
use crate::types::{EventId, EventSummary, UserId, UserProfile};
use std::future::Future;

/// Event lookup.
///
/// Event metadata is owned elsewhere; the core only needs existence,
/// capacity and the organizer.
pub trait EventDirectory: Send + Sync {
    /// Get an event summary.
    ///
    /// # Returns
    ///
    /// `None` if the event does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn find_event(
        &self,
        event_id: EventId,
    ) -> impl Future<Output = Result<Option<EventSummary>>> + Send;
}

/// Account lookup.
pub trait UserDirectory: Send + Sync {
    /// Get a user's identity and role.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn find_user(&self, user_id: UserId)
    -> impl Future<Output = Result<Option<UserProfile>>> + Send;

    /// Get several users at once. Unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn find_users(
        &self,
        user_ids: &[UserId],
    ) -> impl Future<Output = Result<Vec<UserProfile>>> + Send;
}
