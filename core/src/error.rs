//! Error types for participation and check-in operations.

use crate::types::{EventId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Rollcall operations.
pub type Result<T> = std::result::Result<T, RollcallError>;

/// Every failure a participation or check-in operation can report.
///
/// Variants are grouped by [`ErrorKind`] so callers can branch on the category
/// while still getting a specific message (e.g. "already joined" vs "event full").
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RollcallError {
    // ═══════════════════════════════════════════════════════════
    // Not Found
    // ═══════════════════════════════════════════════════════════

    /// The event does not exist.
    #[error("Event {0} not found")]
    EventNotFound(EventId),

    /// The user has no participation record for the event.
    #[error("User {user_id} is not a participant of event {event_id}")]
    NotAParticipant {
        /// Event ID
        event_id: EventId,
        /// User ID
        user_id: UserId,
    },

    /// There is no invitation to respond to.
    #[error("User {user_id} has no invitation for event {event_id}")]
    NotInvited {
        /// Event ID
        event_id: EventId,
        /// User ID
        user_id: UserId,
    },

    // ═══════════════════════════════════════════════════════════
    // Conflict
    // ═══════════════════════════════════════════════════════════

    /// The user already has a participation record.
    #[error("User {user_id} has already joined event {event_id}")]
    AlreadyJoined {
        /// Event ID
        event_id: EventId,
        /// User ID
        user_id: UserId,
    },

    /// Every seat is taken.
    #[error("Event {event_id} is full (capacity {capacity})")]
    EventFull {
        /// Event ID
        event_id: EventId,
        /// Event capacity
        capacity: u32,
    },

    // ═══════════════════════════════════════════════════════════
    // Authorization
    // ═══════════════════════════════════════════════════════════

    /// The actor lacks the capability the operation requires.
    #[error("Forbidden: {action} requires organizer or admin rights")]
    Forbidden {
        /// Operation that was refused
        action: &'static str,
    },

    // ═══════════════════════════════════════════════════════════
    // Token verification
    // ═══════════════════════════════════════════════════════════

    /// The token MAC does not match its payload.
    #[error("Invalid check-in token signature")]
    InvalidSignature,

    /// The token could not be decoded.
    #[error("Malformed check-in token: {0}")]
    MalformedToken(String),

    // ═══════════════════════════════════════════════════════════
    // Check-in eligibility
    // ═══════════════════════════════════════════════════════════

    /// The participant is not in `registered` status.
    #[error("User {user_id} is not registered for event {event_id}")]
    NotEligible {
        /// Event ID
        event_id: EventId,
        /// User ID
        user_id: UserId,
    },

    // ═══════════════════════════════════════════════════════════
    // Input
    // ═══════════════════════════════════════════════════════════

    /// The request itself is unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Persistence or infrastructure failure (never shown to callers verbatim).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error category exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Event or participation record absent.
    NotFound,
    /// Already joined or event full.
    Conflict,
    /// Role check failed.
    Forbidden,
    /// Token MAC mismatch.
    InvalidSignature,
    /// Token could not be decoded.
    MalformedToken,
    /// Participant not registered at check-in time.
    NotEligible,
    /// Request rejected before reaching the state machine.
    InvalidInput,
    /// Persistence or connection failure.
    Internal,
}

/// Caller-visible error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error category.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl RollcallError {
    /// Build an [`RollcallError::Internal`] from any displayable cause.
    pub fn internal(context: &str, cause: impl std::fmt::Display) -> Self {
        Self::Internal(format!("{context}: {cause}"))
    }

    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EventNotFound(_) | Self::NotAParticipant { .. } | Self::NotInvited { .. } => {
                ErrorKind::NotFound
            }
            Self::AlreadyJoined { .. } | Self::EventFull { .. } => ErrorKind::Conflict,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::InvalidSignature => ErrorKind::InvalidSignature,
            Self::MalformedToken(_) => ErrorKind::MalformedToken,
            Self::NotEligible { .. } => ErrorKind::NotEligible,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns `true` if the caller can fix the request and retry.
    ///
    /// # Examples
    ///
    /// ```
    /// # use rollcall_core::RollcallError;
    /// assert!(RollcallError::InvalidSignature.is_user_error());
    /// assert!(!RollcallError::Internal("pool timed out".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }

    /// Returns `true` if the failure came from token verification.
    #[must_use]
    pub const fn is_token_rejection(&self) -> bool {
        matches!(self, Self::InvalidSignature | Self::MalformedToken(_))
    }

    /// Map into the body returned to callers.
    ///
    /// Internal failures are logged with their full cause here and replaced by a
    /// generic message.
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        ErrorResponse {
            kind: self.kind(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicts_share_a_kind_but_keep_their_message() {
        let joined = RollcallError::AlreadyJoined {
            event_id: EventId::new(1),
            user_id: UserId::new(2),
        };
        let full = RollcallError::EventFull {
            event_id: EventId::new(1),
            capacity: 10,
        };

        assert_eq!(joined.kind(), ErrorKind::Conflict);
        assert_eq!(full.kind(), ErrorKind::Conflict);
        assert_ne!(joined.to_response().message, full.to_response().message);
    }

    #[test]
    fn test_internal_detail_is_not_exposed() {
        let error = RollcallError::internal("Failed to upsert attendance", "connection reset by peer");
        let response = error.to_response();

        assert_eq!(response.kind, ErrorKind::Internal);
        assert_eq!(response.message, "Internal error");
        assert!(!response.message.contains("connection reset"));
    }

    #[test]
    fn test_kind_mapping() {
        let event_id = EventId::new(7);
        let user_id = UserId::new(8);

        assert_eq!(RollcallError::EventNotFound(event_id).kind(), ErrorKind::NotFound);
        assert_eq!(RollcallError::NotInvited { event_id, user_id }.kind(), ErrorKind::NotFound);
        assert_eq!(RollcallError::Forbidden { action: "manual check-in" }.kind(), ErrorKind::Forbidden);
        assert_eq!(RollcallError::NotEligible { event_id, user_id }.kind(), ErrorKind::NotEligible);
        assert_eq!(RollcallError::MalformedToken("x".into()).kind(), ErrorKind::MalformedToken);
        assert!(RollcallError::InvalidSignature.is_token_rejection());
    }
}
