//! Service wiring over the in-memory stores.

use crate::mocks::{
    InMemoryAttendanceStore, InMemoryEventDirectory, InMemoryParticipantStore,
    InMemoryUserDirectory, SteppingClock,
};
use rollcall_core::config::TokenConfig;
use rollcall_core::environment::Clock;
use rollcall_core::token::TokenCodec;
use rollcall_core::{
    Actor, CheckInService, EventId, EventSummary, ParticipationService, Role, UserId, UserProfile,
};
use std::sync::Arc;

/// Signing secret used by [`Harness`].
pub const TEST_TOKEN_SECRET: &str = "rollcall-test-signing-secret";

/// Participation service over the in-memory stores.
pub type TestParticipation =
    ParticipationService<InMemoryParticipantStore, InMemoryEventDirectory, InMemoryUserDirectory>;

/// Check-in service over the in-memory stores.
pub type TestCheckIn = CheckInService<
    InMemoryParticipantStore,
    InMemoryAttendanceStore,
    InMemoryEventDirectory,
    InMemoryUserDirectory,
>;

/// Both services wired over shared in-memory stores.
///
/// Stores are exposed so tests can seed or inspect state directly.
#[derive(Clone)]
pub struct Harness {
    /// Participation records.
    pub participants: InMemoryParticipantStore,
    /// Attendance records.
    pub attendance: InMemoryAttendanceStore,
    /// Events.
    pub events: InMemoryEventDirectory,
    /// Accounts.
    pub users: InMemoryUserDirectory,
    /// Participation service.
    pub participation: TestParticipation,
    /// Check-in service.
    pub checkin: TestCheckIn,
    /// Token codec keyed with [`TEST_TOKEN_SECRET`].
    pub codec: TokenCodec,
}

impl Harness {
    /// Harness driven by a [`SteppingClock`], one second per reading.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SteppingClock::default()))
    }

    /// Harness driven by the given clock.
    ///
    /// # Panics
    ///
    /// Panics if [`TEST_TOKEN_SECRET`] is rejected by the codec, which would be
    /// a bug in this crate.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let participants = InMemoryParticipantStore::new();
        let attendance = InMemoryAttendanceStore::new();
        let events = InMemoryEventDirectory::new();
        let users = InMemoryUserDirectory::new();
        let codec = TokenCodec::from_config(&TokenConfig::new(TEST_TOKEN_SECRET.to_string()))
            .expect("test secret is long enough");

        let participation =
            ParticipationService::new(participants.clone(), events.clone(), users.clone(), clock);
        let checkin = CheckInService::new(participation.clone(), attendance.clone(), codec.clone());

        Self {
            participants,
            attendance,
            events,
            users,
            participation,
            checkin,
            codec,
        }
    }

    /// Register an event with the given capacity and organizer.
    pub fn add_event(&self, event_id: i64, capacity: u32, organizer_id: i64) -> EventSummary {
        let event = EventSummary {
            event_id: EventId::new(event_id),
            capacity,
            organizer_id: UserId::new(organizer_id),
        };
        self.events.add_event(event);
        event
    }

    /// Register an account and return the actor it authenticates as.
    pub fn add_user(&self, user_id: i64, role: Role) -> Actor {
        let profile = UserProfile {
            user_id: UserId::new(user_id),
            name: format!("User {user_id}"),
            email: format!("user{user_id}@example.com"),
            role,
        };
        let actor = profile.actor();
        self.users.add_user(profile);
        actor
    }

    /// Register a participant account.
    pub fn add_participant(&self, user_id: i64) -> Actor {
        self.add_user(user_id, Role::Participant)
    }

    /// Register an admin account.
    pub fn add_admin(&self, user_id: i64) -> Actor {
        self.add_user(user_id, Role::Admin)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
