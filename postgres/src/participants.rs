//! `PostgreSQL` participation store.

use crate::{decode, to_u32};
use chrono::{DateTime, Utc};
use rollcall_core::providers::{ParticipantStore, RegistrationOutcome, RegistrationRequest};
use rollcall_core::{EventId, ParticipationRecord, ParticipationStatus, Result, RollcallError, UserId};
use sqlx::{PgConnection, PgPool};

type ParticipantRow = (i64, i64, String, DateTime<Utc>);

fn into_record((event_id, user_id, status, joined_at): ParticipantRow) -> Result<ParticipationRecord> {
    Ok(ParticipationRecord {
        event_id: EventId::new(event_id),
        user_id: UserId::new(user_id),
        status: decode(&status)?,
        joined_at,
    })
}

/// Participation records in `event_participants`.
#[derive(Clone)]
pub struct PostgresParticipantStore {
    pool: PgPool,
}

impl PostgresParticipantStore {
    /// Create a store over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn find_locked(
    conn: &mut PgConnection,
    event_id: EventId,
    user_id: UserId,
) -> Result<Option<ParticipationRecord>> {
    let row: Option<ParticipantRow> = sqlx::query_as(
        r"
        SELECT event_id, user_id, status, joined_at
        FROM event_participants
        WHERE event_id = $1 AND user_id = $2
        FOR UPDATE
        ",
    )
    .bind(event_id.get())
    .bind(user_id.get())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| RollcallError::Internal(format!("Failed to load participant: {e}")))?;

    row.map(into_record).transpose()
}

impl ParticipantStore for PostgresParticipantStore {
    async fn find(&self, event_id: EventId, user_id: UserId) -> Result<Option<ParticipationRecord>> {
        let row: Option<ParticipantRow> = sqlx::query_as(
            r"
            SELECT event_id, user_id, status, joined_at
            FROM event_participants
            WHERE event_id = $1 AND user_id = $2
            ",
        )
        .bind(event_id.get())
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RollcallError::Internal(format!("Failed to load participant: {e}")))?;

        row.map(into_record).transpose()
    }

    async fn insert_if_absent(&self, record: &ParticipationRecord) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO event_participants (event_id, user_id, status, joined_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_id, user_id) DO NOTHING
            ",
        )
        .bind(record.event_id.get())
        .bind(record.user_id.get())
        .bind(record.status.as_str())
        .bind(record.joined_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RollcallError::Internal(format!("Failed to insert participant: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    async fn register_within_capacity(&self, request: RegistrationRequest) -> Result<RegistrationOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RollcallError::Internal(format!("Failed to begin transaction: {e}")))?;

        // Serializes registrations per event: every capacity check below runs
        // while this row lock is held.
        let event: Option<(i64,)> = sqlx::query_as("SELECT id FROM events WHERE id = $1 FOR UPDATE")
            .bind(request.event_id.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| RollcallError::Internal(format!("Failed to lock event: {e}")))?;
        if event.is_none() {
            return Err(RollcallError::EventNotFound(request.event_id));
        }

        let current = find_locked(&mut tx, request.event_id, request.user_id).await?;
        if current.as_ref().map(|r| r.status) != request.expected {
            return Ok(RegistrationOutcome::Conflict(current));
        }

        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM event_participants WHERE event_id = $1 AND status = 'registered'",
        )
        .bind(request.event_id.get())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RollcallError::Internal(format!("Failed to count participants: {e}")))?;
        let registered = to_u32(count, "registered count")?;
        if registered >= request.capacity {
            return Ok(RegistrationOutcome::Full { registered });
        }

        let joined_at: Option<(DateTime<Utc>,)> = match request.expected {
            None => sqlx::query_as::<_, (DateTime<Utc>,)>(
                r"
                INSERT INTO event_participants (event_id, user_id, status, joined_at)
                VALUES ($1, $2, 'registered', $3)
                ON CONFLICT (event_id, user_id) DO NOTHING
                RETURNING joined_at
                ",
            )
            .bind(request.event_id.get())
            .bind(request.user_id.get())
            .bind(request.at)
            .fetch_optional(&mut *tx)
            .await,
            Some(expected) => sqlx::query_as::<_, (DateTime<Utc>,)>(
                r"
                UPDATE event_participants
                SET status = 'registered'
                WHERE event_id = $1 AND user_id = $2 AND status = $3
                RETURNING joined_at
                ",
            )
            .bind(request.event_id.get())
            .bind(request.user_id.get())
            .bind(expected.as_str())
            .fetch_optional(&mut *tx)
            .await,
        }
        .map_err(|e| RollcallError::Internal(format!("Failed to register participant: {e}")))?;

        let Some((joined_at,)) = joined_at else {
            // An invitation landed between the check and the insert.
            drop(tx);
            let found = self.find(request.event_id, request.user_id).await?;
            return Ok(RegistrationOutcome::Conflict(found));
        };

        tx.commit()
            .await
            .map_err(|e| RollcallError::Internal(format!("Failed to commit registration: {e}")))?;

        Ok(RegistrationOutcome::Registered(ParticipationRecord {
            event_id: request.event_id,
            user_id: request.user_id,
            status: ParticipationStatus::Registered,
            joined_at,
        }))
    }

    async fn update_status(&self, event_id: EventId, user_id: UserId, status: ParticipationStatus) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE event_participants SET status = $3 WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event_id.get())
        .bind(user_id.get())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RollcallError::Internal(format!("Failed to update participant status: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM event_participants WHERE event_id = $1 AND user_id = $2")
            .bind(event_id.get())
            .bind(user_id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| RollcallError::Internal(format!("Failed to delete participant: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    async fn count_registered(&self, event_id: EventId) -> Result<u32> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM event_participants WHERE event_id = $1 AND status = 'registered'",
        )
        .bind(event_id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RollcallError::Internal(format!("Failed to count participants: {e}")))?;

        to_u32(count, "registered count")
    }

    async fn list_for_event(&self, event_id: EventId) -> Result<Vec<ParticipationRecord>> {
        let rows: Vec<ParticipantRow> = sqlx::query_as(
            r"
            SELECT event_id, user_id, status, joined_at
            FROM event_participants
            WHERE event_id = $1
            ORDER BY joined_at DESC, user_id
            ",
        )
        .bind(event_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RollcallError::Internal(format!("Failed to list participants: {e}")))?;

        rows.into_iter().map(into_record).collect()
    }

    async fn list_for_user(&self, user_id: UserId, status: ParticipationStatus) -> Result<Vec<ParticipationRecord>> {
        let rows: Vec<ParticipantRow> = sqlx::query_as(
            r"
            SELECT event_id, user_id, status, joined_at
            FROM event_participants
            WHERE user_id = $1 AND status = $2
            ORDER BY joined_at, event_id
            ",
        )
        .bind(user_id.get())
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RollcallError::Internal(format!("Failed to list invitations: {e}")))?;

        rows.into_iter().map(into_record).collect()
    }
}
