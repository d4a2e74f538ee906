//! `PostgreSQL` storage for Rollcall.
//!
//! Implements every trait in `rollcall_core::providers` over one shared
//! [`PgPool`]:
//!
//! - [`PostgresParticipantStore`]: `event_participants`, including the
//!   capacity-checked registration transaction
//! - [`PostgresAttendanceStore`]: `event_attendance` with a single-statement upsert
//! - [`PostgresEventDirectory`] / [`PostgresUserDirectory`]: read-only lookups
//!   into `events` and `users`
//!
//! # Example
//!
//! ```ignore
//! use rollcall_core::config::Config;
//! use rollcall_postgres::{PostgresParticipantStore, connect, migrate};
//!
//! let config = Config::from_env();
//! let pool = connect(&config.postgres).await?;
//! migrate(&pool).await?;
//! let participants = PostgresParticipantStore::new(pool.clone());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod attendance;
mod directory;
mod participants;

pub use attendance::PostgresAttendanceStore;
pub use directory::{PostgresEventDirectory, PostgresUserDirectory};
pub use participants::PostgresParticipantStore;

use rollcall_core::config::PostgresConfig;
use rollcall_core::{Result, RollcallError};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Build a connection pool from configuration.
///
/// # Errors
///
/// Returns [`RollcallError::Internal`] if the database is unreachable.
pub async fn connect(config: &PostgresConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout))
        .idle_timeout(Duration::from_secs(config.idle_timeout))
        .connect(&config.url)
        .await
        .map_err(|e| RollcallError::Internal(format!("Failed to connect: {e}")))?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "PostgreSQL pool ready"
    );
    Ok(pool)
}

/// Create or update the participation and attendance tables.
///
/// # Errors
///
/// Returns [`RollcallError::Internal`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| RollcallError::Internal(format!("Migration failed: {e}")))?;
    Ok(())
}

/// Convert a stored `INTEGER` count or capacity.
fn to_u32(value: i64, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|e| RollcallError::Internal(format!("Invalid {what} {value}: {e}")))
}

fn decode<T: std::str::FromStr<Err = String>>(value: &str) -> Result<T> {
    value.parse().map_err(RollcallError::Internal)
}
