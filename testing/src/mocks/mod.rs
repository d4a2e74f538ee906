//! In-memory providers and clocks.
//!
//! Every store keeps its state behind `Arc<Mutex<..>>`, so clones share data
//! and a single lock acquisition makes each trait method atomic.

mod attendance;
mod clock;
mod directory;
mod participants;

pub use attendance::InMemoryAttendanceStore;
pub use clock::{FixedClock, SteppingClock, test_clock};
pub use directory::{InMemoryEventDirectory, InMemoryUserDirectory};
pub use participants::InMemoryParticipantStore;

use rollcall_core::RollcallError;

fn poisoned(store: &str) -> RollcallError {
    RollcallError::Internal(format!("{store} lock poisoned"))
}
