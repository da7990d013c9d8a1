//! Live 1v1 battles for Clanforge.
//!
//! A battle moves through four states, one battle per attacking player:
//!
//! ```text
//! IDLE ──(PvpRequest ok)──→ ACTIVE ──(PvpEnd / disconnect)──→ ENDED
//!                             │
//!                      actions appended to history,
//!                      fanned out to defender + spectators
//! ```
//!
//! [`Arena`] owns every live [`PvpSession`] and pushes the battle-status
//! list to all logged-in players whenever a battle starts or ends.

mod arena;
mod error;
mod session;

pub use arena::Arena;
pub use error::ArenaError;
pub use session::PvpSession;
