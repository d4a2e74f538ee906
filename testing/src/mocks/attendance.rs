//! In-memory attendance store.

use super::poisoned;
use rollcall_core::providers::AttendanceStore;
use rollcall_core::{AttendanceRecord, EventId, Result, UserId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// In-memory attendance store keyed by (event, user).
#[derive(Debug, Clone, Default)]
pub struct InMemoryAttendanceStore {
    records: Arc<Mutex<HashMap<(EventId, UserId), AttendanceRecord>>>,
}

impl InMemoryAttendanceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows across all events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or_default()
    }

    /// Whether the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AttendanceStore for InMemoryAttendanceStore {
    fn upsert(
        &self,
        record: &AttendanceRecord,
    ) -> impl Future<Output = Result<AttendanceRecord>> + Send {
        let records = Arc::clone(&self.records);
        let record = record.clone();

        async move {
            records
                .lock()
                .map_err(|_| poisoned("attendance store"))?
                .insert((record.event_id, record.user_id), record.clone());
            Ok(record)
        }
    }

    fn find(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<AttendanceRecord>>> + Send {
        let records = Arc::clone(&self.records);

        async move {
            Ok(records
                .lock()
                .map_err(|_| poisoned("attendance store"))?
                .get(&(event_id, user_id))
                .cloned())
        }
    }

    fn list_for_event(
        &self,
        event_id: EventId,
    ) -> impl Future<Output = Result<Vec<AttendanceRecord>>> + Send {
        let records = Arc::clone(&self.records);

        async move {
            let mut rows: Vec<AttendanceRecord> = records
                .lock()
                .map_err(|_| poisoned("attendance store"))?
                .values()
                .filter(|r| r.event_id == event_id)
                .cloned()
                .collect();
            rows.sort_by(|a, b| {
                b.checked_in_at
                    .cmp(&a.checked_in_at)
                    .then(a.user_id.cmp(&b.user_id))
            });
            Ok(rows)
        }
    }
}
