//! Shared server state handed to every connection task.

use std::sync::Arc;

use clanforge_arena::Arena;
use clanforge_clan::{ClanHall, JsonFileStore};
use clanforge_matchmaking::Matchmaker;
use clanforge_session::{Authenticator, PlayerRegistry};
use clanforge_war::ClanWarRoom;

use crate::{ClanforgeError, ServerConfig};

/// One instance of every subsystem.
///
/// Each subsystem guards itself with its own lock, so this struct needs
/// no lock of its own and is shared behind a plain `Arc`.
pub(crate) struct ServerState<A: Authenticator> {
    pub(crate) auth: A,
    pub(crate) registry: Arc<PlayerRegistry>,
    pub(crate) hall: Arc<ClanHall>,
    pub(crate) matchmaker: Matchmaker,
    pub(crate) arena: Arena,
    pub(crate) war: ClanWarRoom,
}

impl<A: Authenticator> ServerState<A> {
    /// Wires the subsystems together, loading the clan table from
    /// `config.clan_file` when one is set.
    pub(crate) fn new(auth: A, config: &ServerConfig) -> Result<Self, ClanforgeError> {
        let registry = Arc::new(PlayerRegistry::new());
        let hall = match &config.clan_file {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading clan table");
                ClanHall::open(Arc::clone(&registry), JsonFileStore::new(path))?
            }
            None => ClanHall::in_memory(Arc::clone(&registry)),
        };
        let hall = Arc::new(hall);
        Ok(Self {
            auth,
            matchmaker: Matchmaker::new(),
            arena: Arena::new(Arc::clone(&registry)),
            war: ClanWarRoom::new(Arc::clone(&registry), Arc::clone(&hall), config.war_duration()),
            registry,
            hall,
        })
    }
}
