//! Clan directory for Clanforge.
//!
//! [`ClanHall`] is the membership source of truth: clan wars read
//! rosters from it, and logins take a player's clan id from it. The
//! table is persisted after every mutation through a [`ClanStore`].

mod error;
mod hall;
mod store;
mod table;

pub use error::{ClanError, StoreError};
pub use hall::ClanHall;
pub use store::{ClanStore, JsonFileStore, MemoryStore};
pub use table::{Clan, ClanTable};
