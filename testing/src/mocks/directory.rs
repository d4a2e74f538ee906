//! In-memory event and account directories.

use super::poisoned;
use rollcall_core::providers::{EventDirectory, UserDirectory};
use rollcall_core::{EventId, EventSummary, Result, UserId, UserProfile};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// In-memory event directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventDirectory {
    events: Arc<Mutex<HashMap<EventId, EventSummary>>>,
}

impl InMemoryEventDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an event.
    pub fn add_event(&self, event: EventSummary) {
        if let Ok(mut events) = self.events.lock() {
            events.insert(event.event_id, event);
        }
    }

    /// Delete an event, as the event-management side would.
    pub fn remove_event(&self, event_id: EventId) {
        if let Ok(mut events) = self.events.lock() {
            events.remove(&event_id);
        }
    }
}

impl EventDirectory for InMemoryEventDirectory {
    fn find_event(
        &self,
        event_id: EventId,
    ) -> impl Future<Output = Result<Option<EventSummary>>> + Send {
        let events = Arc::clone(&self.events);

        async move {
            Ok(events
                .lock()
                .map_err(|_| poisoned("event directory"))?
                .get(&event_id)
                .copied())
        }
    }
}

/// In-memory account directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<Mutex<HashMap<UserId, UserProfile>>>,
}

impl InMemoryUserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user.
    pub fn add_user(&self, profile: UserProfile) {
        if let Ok(mut users) = self.users.lock() {
            users.insert(profile.user_id, profile);
        }
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn find_user(&self, user_id: UserId) -> impl Future<Output = Result<Option<UserProfile>>> + Send {
        let users = Arc::clone(&self.users);

        async move {
            Ok(users
                .lock()
                .map_err(|_| poisoned("user directory"))?
                .get(&user_id)
                .cloned())
        }
    }

    fn find_users(
        &self,
        user_ids: &[UserId],
    ) -> impl Future<Output = Result<Vec<UserProfile>>> + Send {
        let users = Arc::clone(&self.users);
        let user_ids = user_ids.to_vec();

        async move {
            let users = users.lock().map_err(|_| poisoned("user directory"))?;
            Ok(user_ids
                .iter()
                .filter_map(|id| users.get(id).cloned())
                .collect())
        }
    }
}
