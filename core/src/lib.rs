//! # Rollcall Core
//!
//! Event participation and signed attendance check-in.
//!
//! The crate has two services over a small set of storage traits:
//!
//! - [`ParticipationService`] runs the per-(event, user) state machine
//!   (invite, self-join, accept/reject, leave, admin override and removal)
//!   and enforces event capacity.
//! - [`CheckInService`] issues HMAC-signed check-in tokens and records
//!   attendance, either from a scanned token or manually by staff.
//!
//! Storage lives behind the traits in [`providers`]; `rollcall-postgres`
//! implements them over `PostgreSQL` and `rollcall-testing` in memory.
//!
//! ## Example
//!
//! ```ignore
//! use rollcall_core::*;
//!
//! let participation = ParticipationService::new(participants, events, users, clock);
//! let checkin = CheckInService::new(participation.clone(), attendance, codec);
//!
//! participation.self_join(event_id, user_id).await?;
//! let grant = checkin.issue_event_token(event_id, &organizer).await?;
//! let receipt = checkin.apply_check_in(&grant.token, &participant).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod capability;
pub mod checkin;
pub mod config;
pub mod environment;
pub mod error;
pub mod participation;
pub mod providers;
pub mod token;
pub mod types;

pub use checkin::{CheckInService, EventTokenGrant};
pub use error::{ErrorKind, ErrorResponse, Result, RollcallError};
pub use participation::ParticipationService;
pub use types::{
    Actor, AttendanceEntry, AttendanceRecord, CheckInMethod, CheckInReceipt, EventId,
    EventSummary, InvitationResponse, InvitationSummary, Occupancy, ParticipantEntry,
    ParticipationRecord, ParticipationStatus, Role, UserId, UserProfile,
};
