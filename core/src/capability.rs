//! Role checks for privileged operations.
//!
//! Every privileged operation runs the same two steps: [`require_role`] before
//! touching any store, then [`require_event_staff`] once the event is loaded.
//! Admins pass both for every event; organizers pass the second only for
//! events they organize.

use crate::error::{Result, RollcallError};
use crate::types::{Actor, EventSummary, Role};

/// Roles allowed to manage an event's participants and attendance.
pub const STAFF_ROLES: &[Role] = &[Role::Admin, Role::Organizer];

/// Fail with [`RollcallError::Forbidden`] unless the actor holds one of `allowed`.
///
/// # Errors
///
/// Returns [`RollcallError::Forbidden`] naming `action`.
pub fn require_role(actor: &Actor, allowed: &[Role], action: &'static str) -> Result<()> {
    if allowed.contains(&actor.role) {
        return Ok(());
    }

    tracing::warn!(
        user_id = %actor.user_id,
        role = %actor.role,
        action,
        "Privileged operation refused"
    );
    Err(RollcallError::Forbidden { action })
}

/// Fail unless the actor is staff for this particular event.
///
/// # Errors
///
/// Returns [`RollcallError::Forbidden`] naming `action`.
pub fn require_event_staff(actor: &Actor, event: &EventSummary, action: &'static str) -> Result<()> {
    require_role(actor, STAFF_ROLES, action)?;

    match actor.role {
        Role::Admin => Ok(()),
        Role::Organizer if event.organizer_id == actor.user_id => Ok(()),
        _ => {
            tracing::warn!(
                user_id = %actor.user_id,
                event_id = %event.event_id,
                action,
                "Organizer does not own event"
            );
            Err(RollcallError::Forbidden { action })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventId, UserId};

    fn event_organized_by(organizer: i64) -> EventSummary {
        EventSummary {
            event_id: EventId::new(1),
            capacity: 10,
            organizer_id: UserId::new(organizer),
        }
    }

    #[test]
    fn test_participant_refused() {
        let actor = Actor::participant(UserId::new(5));
        assert_eq!(
            require_role(&actor, STAFF_ROLES, "issue event token"),
            Err(RollcallError::Forbidden {
                action: "issue event token"
            })
        );
    }

    #[test]
    fn test_admin_is_staff_everywhere() {
        let actor = Actor::admin(UserId::new(99));
        assert!(require_event_staff(&actor, &event_organized_by(1), "manual check-in").is_ok());
    }

    #[test]
    fn test_organizer_limited_to_own_events() {
        let actor = Actor::new(UserId::new(1), Role::Organizer);
        assert!(require_event_staff(&actor, &event_organized_by(1), "invite").is_ok());
        assert!(require_event_staff(&actor, &event_organized_by(2), "invite").is_err());
    }
}
