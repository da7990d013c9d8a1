//! Clan wars for Clanforge.
//!
//! Two clans queue, get paired first-in first-out, and fight over a fixed
//! window. Each side's roster is frozen at war start; every attack
//! appends an [`AttackRecord`] to its target and adds its stars to the
//! attacking clan's running total.
//!
//! ```text
//! add_to_queue ×2 ──→ war started (rosters frozen, members notified)
//!        attack_start ──→ attack_end ──→ state broadcast
//!        ... until ends_at passes or end_war() ──→ ClanWarEnd pushed
//! ```

mod error;
mod room;
mod session;

pub use error::WarError;
pub use room::{ClanWarRoom, DEFAULT_WAR_DURATION};
pub use session::{AttackRecord, ClanWarMember, ClanWarSession, Side, WarBattle};
