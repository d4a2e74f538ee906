//! Domain types for event participation and attendance.
//!
//! Identifiers are integer newtypes because the persisted tables and the
//! check-in token payload both carry plain integers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of an event owned by the event-management collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i64);

impl EventId {
    /// Wrap a raw event id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a user account owned by the identity collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw user id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Roles and principals
// ============================================================================

/// Account role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform administrator, staff rights on every event.
    Admin,
    /// Event organizer, staff rights on the events they organize.
    Organizer,
    /// Regular account.
    Participant,
}

impl Role {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Organizer => "organizer",
            Self::Participant => "participant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "organizer" => Ok(Self::Organizer),
            // Accounts created before roles existed are stored as "user".
            "participant" | "user" => Ok(Self::Participant),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// The authenticated principal performing an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// Acting user.
    pub user_id: UserId,
    /// Role resolved by the identity collaborator.
    pub role: Role,
}

impl Actor {
    /// Create an actor.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Shorthand for an administrator.
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }

    /// Shorthand for a regular participant account.
    #[must_use]
    pub const fn participant(user_id: UserId) -> Self {
        Self::new(user_id, Role::Participant)
    }
}

/// Identity details returned by the user directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Account role.
    pub role: Role,
}

impl UserProfile {
    /// The principal this profile acts as.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

/// The slice of an event the participation core reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Event ID.
    pub event_id: EventId,
    /// Maximum number of registered participants.
    pub capacity: u32,
    /// Account that organizes the event.
    pub organizer_id: UserId,
}

// ============================================================================
// Participation
// ============================================================================

/// Status of a participation record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationStatus {
    /// Invited by an organizer, not yet accepted.
    Invited,
    /// Holds a seat; counts toward capacity and may check in.
    Registered,
    /// Marked rejected by an administrator.
    Rejected,
}

impl ParticipationStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invited => "invited",
            Self::Registered => "registered",
            Self::Rejected => "rejected",
        }
    }

    /// Whether a record in this status occupies a seat.
    #[must_use]
    pub const fn counts_toward_capacity(self) -> bool {
        matches!(self, Self::Registered)
    }
}

impl fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invited" => Ok(Self::Invited),
            "registered" => Ok(Self::Registered),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown participation status: {other}")),
        }
    }
}

/// One user's participation in one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    /// Event ID.
    pub event_id: EventId,
    /// User ID.
    pub user_id: UserId,
    /// Current status.
    pub status: ParticipationStatus,
    /// When the record was created. Status changes leave it untouched.
    pub joined_at: DateTime<Utc>,
}

/// Invitation response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationResponse {
    /// Take the seat.
    Accept,
    /// Decline; the record is deleted.
    Reject,
}

/// Participant row for organizer views.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantEntry {
    /// User ID.
    pub user_id: UserId,
    /// Display name (empty when the directory has no profile).
    pub name: String,
    /// Email address (empty when the directory has no profile).
    pub email: String,
    /// Participation status.
    pub status: ParticipationStatus,
    /// When the record was created.
    pub joined_at: DateTime<Utc>,
}

/// Result of a bulk invitation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationSummary {
    /// Users that received a new `invited` record.
    pub invited: Vec<UserId>,
    /// Users that already had a record of any status.
    pub skipped: Vec<UserId>,
}

/// Seat usage of an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    /// Event ID.
    pub event_id: EventId,
    /// Maximum registered participants.
    pub capacity: u32,
    /// Records currently in `registered` status.
    pub registered: u32,
}

impl Occupancy {
    /// Seats still available.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.registered)
    }

    /// Whether no seat is left.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.registered >= self.capacity
    }
}

// ============================================================================
// Attendance
// ============================================================================

/// How a check-in was recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckInMethod {
    /// Signed QR token scan.
    Qr,
    /// Staff override.
    Manual,
}

impl CheckInMethod {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Qr => "QR",
            Self::Manual => "MANUAL",
        }
    }
}

impl fmt::Display for CheckInMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckInMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QR" => Ok(Self::Qr),
            "MANUAL" => Ok(Self::Manual),
            other => Err(format!("unknown check-in method: {other}")),
        }
    }
}

/// Proof that a participant was present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Event ID.
    pub event_id: EventId,
    /// Participant.
    pub user_id: UserId,
    /// Method of the latest check-in.
    pub method: CheckInMethod,
    /// Time of the latest check-in.
    pub checked_in_at: DateTime<Utc>,
    /// Staff member behind a manual check-in; `None` for self-scans.
    pub checked_in_by: Option<UserId>,
}

/// Attendance row joined with participant identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    /// Participant.
    pub user_id: UserId,
    /// Display name (empty when the directory has no profile).
    pub name: String,
    /// Email address (empty when the directory has no profile).
    pub email: String,
    /// Method of the latest check-in.
    pub method: CheckInMethod,
    /// Time of the latest check-in.
    pub checked_in_at: DateTime<Utc>,
    /// Staff member behind a manual check-in.
    pub checked_in_by: Option<UserId>,
}

/// Acknowledgement of a successful check-in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInReceipt {
    /// Event ID.
    pub event_id: EventId,
    /// Participant that was checked in.
    pub user_id: UserId,
    /// Recorded method.
    pub method: CheckInMethod,
    /// Recorded time.
    pub checked_in_at: DateTime<Utc>,
}

impl From<&AttendanceRecord> for CheckInReceipt {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            event_id: record.event_id,
            user_id: record.user_id,
            method: record.method,
            checked_in_at: record.checked_in_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_storage_string() {
        for status in [
            ParticipationStatus::Invited,
            ParticipationStatus::Registered,
            ParticipationStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<ParticipationStatus>(), Ok(status));
        }
        assert!("attended".parse::<ParticipationStatus>().is_err());
    }

    #[test]
    fn test_only_registered_counts_toward_capacity() {
        assert!(ParticipationStatus::Registered.counts_toward_capacity());
        assert!(!ParticipationStatus::Invited.counts_toward_capacity());
        assert!(!ParticipationStatus::Rejected.counts_toward_capacity());
    }

    #[test]
    fn test_legacy_user_role_maps_to_participant() {
        assert_eq!("user".parse::<Role>(), Ok(Role::Participant));
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_check_in_method_serializes_uppercase() {
        let json = serde_json::to_string(&CheckInMethod::Manual).unwrap_or_default();
        assert_eq!(json, "\"MANUAL\"");
        assert_eq!("QR".parse::<CheckInMethod>(), Ok(CheckInMethod::Qr));
    }

    #[test]
    fn test_occupancy_remaining_saturates() {
        let occupancy = Occupancy {
            event_id: EventId::new(1),
            capacity: 2,
            registered: 3,
        };
        assert_eq!(occupancy.remaining(), 0);
        assert!(occupancy.is_full());
    }
}
