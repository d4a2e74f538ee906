//! `PostgreSQL` attendance store.

use crate::decode;
use chrono::{DateTime, Utc};
use rollcall_core::providers::AttendanceStore;
use rollcall_core::{AttendanceRecord, EventId, Result, RollcallError, UserId};
use sqlx::PgPool;

type AttendanceRow = (i64, i64, String, DateTime<Utc>, Option<i64>);

fn into_record(
    (event_id, user_id, method, checked_in_at, checked_in_by): AttendanceRow,
) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        event_id: EventId::new(event_id),
        user_id: UserId::new(user_id),
        method: decode(&method)?,
        checked_in_at,
        checked_in_by: checked_in_by.map(UserId::new),
    })
}

/// Attendance records in `event_attendance`.
#[derive(Clone)]
pub struct PostgresAttendanceStore {
    pool: PgPool,
}

impl PostgresAttendanceStore {
    /// Create a store over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl AttendanceStore for PostgresAttendanceStore {
    async fn upsert(&self, record: &AttendanceRecord) -> Result<AttendanceRecord> {
        let row: AttendanceRow = sqlx::query_as(
            r"
            INSERT INTO event_attendance (event_id, user_id, method, checked_in_at, checked_in_by)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (event_id, user_id) DO UPDATE
            SET method = EXCLUDED.method,
                checked_in_at = EXCLUDED.checked_in_at,
                checked_in_by = EXCLUDED.checked_in_by
            RETURNING event_id, user_id, method, checked_in_at, checked_in_by
            ",
        )
        .bind(record.event_id.get())
        .bind(record.user_id.get())
        .bind(record.method.as_str())
        .bind(record.checked_in_at)
        .bind(record.checked_in_by.map(UserId::get))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RollcallError::Internal(format!("Failed to upsert attendance: {e}")))?;

        into_record(row)
    }

    async fn find(&self, event_id: EventId, user_id: UserId) -> Result<Option<AttendanceRecord>> {
        let row: Option<AttendanceRow> = sqlx::query_as(
            r"
            SELECT event_id, user_id, method, checked_in_at, checked_in_by
            FROM event_attendance
            WHERE event_id = $1 AND user_id = $2
            ",
        )
        .bind(event_id.get())
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RollcallError::Internal(format!("Failed to load attendance: {e}")))?;

        row.map(into_record).transpose()
    }

    async fn list_for_event(&self, event_id: EventId) -> Result<Vec<AttendanceRecord>> {
        let rows: Vec<AttendanceRow> = sqlx::query_as(
            r"
            SELECT event_id, user_id, method, checked_in_at, checked_in_by
            FROM event_attendance
            WHERE event_id = $1
            ORDER BY checked_in_at DESC, user_id
            ",
        )
        .bind(event_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RollcallError::Internal(format!("Failed to list attendance: {e}")))?;

        rows.into_iter().map(into_record).collect()
    }
}
