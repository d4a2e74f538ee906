//! In-memory participation store.

use super::poisoned;
use rollcall_core::providers::{ParticipantStore, RegistrationOutcome, RegistrationRequest};
use rollcall_core::{EventId, ParticipationRecord, ParticipationStatus, Result, UserId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

type Records = HashMap<(EventId, UserId), ParticipationRecord>;

/// In-memory participation store keyed by (event, user).
///
/// `register_within_capacity` runs its check, count and write under one lock,
/// the same sequence the `PostgreSQL` store runs under a row lock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryParticipantStore {
    records: Arc<Mutex<Records>>,
}

impl InMemoryParticipantStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing the state machine.
    pub fn seed(&self, record: ParticipationRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.insert((record.event_id, record.user_id), record);
        }
    }
}

fn registered_count(records: &Records, event_id: EventId) -> u32 {
    let count = records
        .values()
        .filter(|r| r.event_id == event_id && r.status.counts_toward_capacity())
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

impl ParticipantStore for InMemoryParticipantStore {
    fn find(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<ParticipationRecord>>> + Send {
        let records = Arc::clone(&self.records);

        async move {
            Ok(records
                .lock()
                .map_err(|_| poisoned("participant store"))?
                .get(&(event_id, user_id))
                .cloned())
        }
    }

    fn insert_if_absent(
        &self,
        record: &ParticipationRecord,
    ) -> impl Future<Output = Result<bool>> + Send {
        let records = Arc::clone(&self.records);
        let record = record.clone();

        async move {
            let mut records = records.lock().map_err(|_| poisoned("participant store"))?;
            let key = (record.event_id, record.user_id);
            if records.contains_key(&key) {
                return Ok(false);
            }
            records.insert(key, record);
            Ok(true)
        }
    }

    fn register_within_capacity(
        &self,
        request: RegistrationRequest,
    ) -> impl Future<Output = Result<RegistrationOutcome>> + Send {
        let records = Arc::clone(&self.records);

        async move {
            let mut records = records.lock().map_err(|_| poisoned("participant store"))?;
            let key = (request.event_id, request.user_id);

            let current = records.get(&key).cloned();
            if current.as_ref().map(|r| r.status) != request.expected {
                return Ok(RegistrationOutcome::Conflict(current));
            }

            let registered = registered_count(&records, request.event_id);
            if registered >= request.capacity {
                return Ok(RegistrationOutcome::Full { registered });
            }

            let record = ParticipationRecord {
                event_id: request.event_id,
                user_id: request.user_id,
                status: ParticipationStatus::Registered,
                joined_at: current.map_or(request.at, |r| r.joined_at),
            };
            records.insert(key, record.clone());
            Ok(RegistrationOutcome::Registered(record))
        }
    }

    fn update_status(
        &self,
        event_id: EventId,
        user_id: UserId,
        status: ParticipationStatus,
    ) -> impl Future<Output = Result<bool>> + Send {
        let records = Arc::clone(&self.records);

        async move {
            let mut records = records.lock().map_err(|_| poisoned("participant store"))?;
            let Some(record) = records.get_mut(&(event_id, user_id)) else {
                return Ok(false);
            };
            record.status = status;
            Ok(true)
        }
    }

    fn delete(&self, event_id: EventId, user_id: UserId) -> impl Future<Output = Result<bool>> + Send {
        let records = Arc::clone(&self.records);

        async move {
            Ok(records
                .lock()
                .map_err(|_| poisoned("participant store"))?
                .remove(&(event_id, user_id))
                .is_some())
        }
    }

    fn count_registered(&self, event_id: EventId) -> impl Future<Output = Result<u32>> + Send {
        let records = Arc::clone(&self.records);

        async move {
            let records = records.lock().map_err(|_| poisoned("participant store"))?;
            Ok(registered_count(&records, event_id))
        }
    }

    fn list_for_event(
        &self,
        event_id: EventId,
    ) -> impl Future<Output = Result<Vec<ParticipationRecord>>> + Send {
        let records = Arc::clone(&self.records);

        async move {
            let mut rows: Vec<ParticipationRecord> = records
                .lock()
                .map_err(|_| poisoned("participant store"))?
                .values()
                .filter(|r| r.event_id == event_id)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.joined_at.cmp(&a.joined_at).then(a.user_id.cmp(&b.user_id)));
            Ok(rows)
        }
    }

    fn list_for_user(
        &self,
        user_id: UserId,
        status: ParticipationStatus,
    ) -> impl Future<Output = Result<Vec<ParticipationRecord>>> + Send {
        let records = Arc::clone(&self.records);

        async move {
            let mut rows: Vec<ParticipationRecord> = records
                .lock()
                .map_err(|_| poisoned("participant store"))?
                .values()
                .filter(|r| r.user_id == user_id && r.status == status)
                .cloned()
                .collect();
            rows.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.event_id.cmp(&b.event_id)));
            Ok(rows)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::test_clock;
    use rollcall_core::environment::Clock;

    fn request(user: i64, expected: Option<ParticipationStatus>) -> RegistrationRequest {
        RegistrationRequest {
            event_id: EventId::new(1),
            user_id: UserId::new(user),
            expected,
            capacity: 1,
            at: test_clock().now(),
        }
    }

    #[tokio::test]
    async fn test_register_respects_capacity() {
        let store = InMemoryParticipantStore::new();

        let first = store.register_within_capacity(request(1, None)).await;
        let second = store.register_within_capacity(request(2, None)).await;

        assert!(matches!(first, Ok(RegistrationOutcome::Registered(_))));
        assert_eq!(second, Ok(RegistrationOutcome::Full { registered: 1 }));
    }

    #[tokio::test]
    async fn test_register_reports_conflict_with_current_record() {
        let store = InMemoryParticipantStore::new();
        let _ = store.register_within_capacity(request(1, None)).await;

        let outcome = store
            .register_within_capacity(request(1, Some(ParticipationStatus::Invited)))
            .await;

        assert!(matches!(
            outcome,
            Ok(RegistrationOutcome::Conflict(Some(ParticipationRecord {
                status: ParticipationStatus::Registered,
                ..
            })))
        ));
    }

    #[tokio::test]
    async fn test_accept_keeps_original_joined_at() {
        let store = InMemoryParticipantStore::new();
        let invited_at = test_clock().now() - chrono::Duration::days(1);
        store.seed(ParticipationRecord {
            event_id: EventId::new(1),
            user_id: UserId::new(1),
            status: ParticipationStatus::Invited,
            joined_at: invited_at,
        });

        let outcome = store
            .register_within_capacity(request(1, Some(ParticipationStatus::Invited)))
            .await;

        match outcome {
            Ok(RegistrationOutcome::Registered(record)) => assert_eq!(record.joined_at, invited_at),
            other => unreachable!("expected registration, got {other:?}"),
        }
    }
}
