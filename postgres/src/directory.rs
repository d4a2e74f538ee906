//! Read-only lookups into the `events` and `users` tables.

use crate::{decode, to_u32};
use rollcall_core::providers::{EventDirectory, UserDirectory};
use rollcall_core::{EventId, EventSummary, Result, RollcallError, UserId, UserProfile};
use sqlx::PgPool;

type UserRow = (i64, String, String, String);

fn into_profile((user_id, name, email, role): UserRow) -> Result<UserProfile> {
    Ok(UserProfile {
        user_id: UserId::new(user_id),
        name,
        email,
        role: decode(&role)?,
    })
}

/// Event lookup over `events`.
#[derive(Clone)]
pub struct PostgresEventDirectory {
    pool: PgPool,
}

impl PostgresEventDirectory {
    /// Create a directory over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl EventDirectory for PostgresEventDirectory {
    async fn find_event(&self, event_id: EventId) -> Result<Option<EventSummary>> {
        let row: Option<(i64, i32, i64)> =
            sqlx::query_as("SELECT id, capacity, organizer_id FROM events WHERE id = $1")
                .bind(event_id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RollcallError::Internal(format!("Failed to load event: {e}")))?;

        row.map(|(id, capacity, organizer_id)| {
            Ok(EventSummary {
                event_id: EventId::new(id),
                capacity: to_u32(i64::from(capacity), "capacity")?,
                organizer_id: UserId::new(organizer_id),
            })
        })
        .transpose()
    }
}

/// Account lookup over `users`.
#[derive(Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    /// Create a directory over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserDirectory for PostgresUserDirectory {
    async fn find_user(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT id, name, email, role FROM users WHERE id = $1")
            .bind(user_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RollcallError::Internal(format!("Failed to load user: {e}")))?;

        row.map(into_profile).transpose()
    }

    async fn find_users(&self, user_ids: &[UserId]) -> Result<Vec<UserProfile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = user_ids.iter().map(|id| id.get()).collect();
        let rows: Vec<UserRow> =
            sqlx::query_as("SELECT id, name, email, role FROM users WHERE id = ANY($1)")
                .bind(&ids)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| RollcallError::Internal(format!("Failed to load users: {e}")))?;

        rows.into_iter().map(into_profile).collect()
    }
}
