//! Persistence and collaborator interfaces.
//!
//! The services depend only on these traits. Production wiring uses the
//! PostgreSQL implementations from `rollcall-postgres`; tests use the in-memory
//! ones from `rollcall-testing`.
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────┐
//! │ ParticipationService │        │ CheckInService       │
//! └──────────┬───────────┘        └──────────┬───────────┘
//!            │                               │
//!   ParticipantStore ◄───── eligibility ─────┤
//!   EventDirectory                           │
//!   UserDirectory                   AttendanceStore
//! ```
//!
//! Store methods that must be atomic say so in their docs; implementations
//! are expected to honour that under concurrent callers without any lock held
//! by the services.

pub mod attendance;
pub mod directory;
pub mod participants;

pub use attendance::AttendanceStore;
pub use directory::{EventDirectory, UserDirectory};
pub use participants::{ParticipantStore, RegistrationOutcome, RegistrationRequest};
