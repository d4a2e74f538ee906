//! # Rollcall Testing
//!
//! Testing utilities for Rollcall.
//!
//! This crate provides:
//! - In-memory implementations of every storage trait in `rollcall_core::providers`
//! - Deterministic clocks
//! - A [`Harness`] that wires both services over the in-memory stores
//!
//! ## Example
//!
//! ```ignore
//! use rollcall_testing::Harness;
//!
//! #[tokio::test]
//! async fn test_self_join() {
//!     let h = Harness::new();
//!     let event = h.add_event(1, 10, 100);
//!     let user = h.add_participant(2);
//!
//!     h.participation.self_join(event.event_id, user.user_id).await?;
//! }
//! ```

pub mod fixtures;
pub mod mocks;

pub use fixtures::{Harness, TEST_TOKEN_SECRET, TestCheckIn, TestParticipation};
pub use mocks::{
    FixedClock, InMemoryAttendanceStore, InMemoryEventDirectory, InMemoryParticipantStore,
    InMemoryUserDirectory, SteppingClock, test_clock,
};

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honours `RUST_LOG`; defaults to `warn`. Safe to call from every test.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
