//! The clan directory.

use std::sync::Arc;

use clanforge_protocol::{
    ClanId, ClanInfo, ClanListEntry, ClanMemberEntry, ClanMembers, CreateClanRequest, PlayerId,
};
use clanforge_session::PlayerRegistry;
use tokio::sync::Mutex;

use crate::{Clan, ClanError, ClanStore, ClanTable, MemoryStore, StoreError};

/// Source of truth for clan membership.
///
/// Every mutation is staged on a copy of the table, saved through the
/// [`ClanStore`], and only then swapped in. A failed save leaves the
/// directory exactly as it was.
///
/// Lock order: the clan table lock may be held while calling into the
/// [`PlayerRegistry`], never the other way around.
pub struct ClanHall {
    registry: Arc<PlayerRegistry>,
    store: Arc<dyn ClanStore>,
    table: Mutex<ClanTable>,
}

impl ClanHall {
    /// Opens the directory, loading whatever `store` last saved.
    pub fn open(registry: Arc<PlayerRegistry>, store: impl ClanStore) -> Result<Self, ClanError> {
        let table = store.load()?.unwrap_or_default();
        tracing::info!(clans = table.clans.len(), next_id = table.next_id, "clan table loaded");
        Ok(Self {
            registry,
            store: Arc::new(store),
            table: Mutex::new(table),
        })
    }

    /// A directory that only lives in memory.
    pub fn in_memory(registry: Arc<PlayerRegistry>) -> Self {
        Self {
            registry,
            store: Arc::new(MemoryStore::new()),
            table: Mutex::new(ClanTable::default()),
        }
    }

    /// Saves `staged` on the blocking pool, then swaps it in. The caller
    /// keeps the table lock for the whole save, so saves never reorder.
    async fn commit(&self, live: &mut ClanTable, staged: ClanTable) -> Result<(), ClanError> {
        let store = Arc::clone(&self.store);
        let saved = tokio::task::spawn_blocking(move || store.save(&staged).map(|()| staged))
            .await
            .map_err(StoreError::from)
            .and_then(|result| result);
        match saved {
            Ok(staged) => {
                *live = staged;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist clan table, mutation discarded");
                Err(e.into())
            }
        }
    }

    async fn sync_registry(&self, player_id: &PlayerId, clan_id: Option<ClanId>) {
        if self
            .registry
            .update_by_id(player_id, |ctx| ctx.clan_id = clan_id)
            .await
            .is_err()
        {
            tracing::debug!(%player_id, "player offline, clan id not cached");
        }
    }

    /// Creates a clan led by `player_id`, who becomes its only member.
    pub async fn create_clan(
        &self,
        player_id: &PlayerId,
        request: &CreateClanRequest,
    ) -> Result<ClanId, ClanError> {
        let mut table = self.table.lock().await;
        let player = self
            .registry
            .get_by_id(player_id)
            .await
            .map_err(|_| ClanError::UnknownPlayer(player_id.clone()))?;
        if let Some(current) = table.clan_of(player_id) {
            return Err(ClanError::AlreadyInClan {
                player_id: player_id.clone(),
                clan_id: current.id.clone(),
            });
        }

        let mut staged = table.clone();
        let clan_id = staged.allocate_id();
        staged.clans.insert(
            clan_id.clone(),
            Clan {
                id: clan_id.clone(),
                name: request.name.clone(),
                leader_id: Some(player_id.clone()),
                description: request.description.clone(),
                member_ids: vec![player_id.clone()],
                clan_trophies: player.context.trophies,
                required_trophies: request.required_trophies,
                is_open: request.is_open,
            },
        );
        self.commit(&mut table, staged).await?;
        drop(table);

        self.sync_registry(player_id, Some(clan_id.clone())).await;
        tracing::info!(%player_id, %clan_id, name = %request.name, "clan created");
        Ok(clan_id)
    }

    /// Adds `player_id` to an open clan whose trophy threshold they meet.
    pub async fn join_clan(&self, player_id: &PlayerId, clan_id: &ClanId) -> Result<(), ClanError> {
        let mut table = self.table.lock().await;
        let player = self
            .registry
            .get_by_id(player_id)
            .await
            .map_err(|_| ClanError::UnknownPlayer(player_id.clone()))?;
        if let Some(current) = table.clan_of(player_id) {
            return Err(ClanError::AlreadyInClan {
                player_id: player_id.clone(),
                clan_id: current.id.clone(),
            });
        }
        let clan = table
            .clans
            .get(clan_id)
            .ok_or_else(|| ClanError::ClanNotFound(clan_id.clone()))?;
        if !clan.is_open {
            return Err(ClanError::ClanClosed(clan_id.clone()));
        }
        let trophies = player.context.trophies;
        if trophies < clan.required_trophies {
            return Err(ClanError::TrophiesTooLow {
                required: clan.required_trophies,
                actual: trophies,
            });
        }

        let mut staged = table.clone();
        if let Some(clan) = staged.clans.get_mut(clan_id) {
            clan.member_ids.push(player_id.clone());
            clan.clan_trophies = clan.clan_trophies.saturating_add(trophies);
        }
        self.commit(&mut table, staged).await?;
        drop(table);

        self.sync_registry(player_id, Some(clan_id.clone())).await;
        tracing::info!(%player_id, %clan_id, "player joined clan");
        Ok(())
    }

    /// Removes `player_id` from their clan and returns its id.
    ///
    /// An emptied clan is deleted. When the leader leaves a clan that
    /// still has members, the earliest remaining joiner takes over.
    pub async fn leave_clan(&self, player_id: &PlayerId) -> Result<ClanId, ClanError> {
        let mut table = self.table.lock().await;
        let clan_id = table
            .clan_of(player_id)
            .map(|clan| clan.id.clone())
            .ok_or_else(|| ClanError::NotInClan(player_id.clone()))?;
        let trophies = self.registry.profile(player_id).await.trophies;

        let mut staged = table.clone();
        let mut emptied = false;
        if let Some(clan) = staged.clans.get_mut(&clan_id) {
            clan.member_ids.retain(|m| m != player_id);
            clan.clan_trophies = clan.clan_trophies.saturating_sub(trophies);
            if clan.leader_id.as_ref() == Some(player_id) {
                clan.leader_id = clan.member_ids.first().cloned();
                if let Some(leader) = &clan.leader_id {
                    tracing::info!(%clan_id, new_leader = %leader, "clan leadership passed on");
                }
            }
            emptied = clan.member_ids.is_empty();
        }
        if emptied {
            staged.clans.remove(&clan_id);
        }
        self.commit(&mut table, staged).await?;
        drop(table);

        self.sync_registry(player_id, None).await;
        tracing::info!(%player_id, %clan_id, deleted = emptied, "player left clan");
        Ok(clan_id)
    }

    /// Re-attaches a player to a clan recorded on their client.
    ///
    /// Returns `true` when the player ends up a member of `clan_id`. A
    /// clan that no longer exists is not recreated, and membership in a
    /// different clan wins over the client's record.
    pub async fn ensure_player_in_clan(
        &self,
        player_id: &PlayerId,
        clan_id: &ClanId,
    ) -> Result<bool, ClanError> {
        let mut table = self.table.lock().await;
        if let Some(current) = table.clan_of(player_id) {
            return Ok(&current.id == clan_id);
        }
        if !table.clans.contains_key(clan_id) {
            tracing::debug!(%player_id, %clan_id, "recorded clan no longer exists");
            return Ok(false);
        }

        let trophies = self.registry.profile(player_id).await.trophies;
        let mut staged = table.clone();
        if let Some(clan) = staged.clans.get_mut(clan_id) {
            clan.member_ids.push(player_id.clone());
            clan.clan_trophies = clan.clan_trophies.saturating_add(trophies);
        }
        self.commit(&mut table, staged).await?;
        drop(table);

        self.sync_registry(player_id, Some(clan_id.clone())).await;
        tracing::info!(%player_id, %clan_id, "restored clan membership");
        Ok(true)
    }

    /// The clan `player_id` belongs to.
    pub async fn clan_of(&self, player_id: &PlayerId) -> Option<ClanId> {
        let table = self.table.lock().await;
        table.clan_of(player_id).map(|clan| clan.id.clone())
    }

    pub async fn is_member(&self, player_id: &PlayerId, clan_id: &ClanId) -> bool {
        let table = self.table.lock().await;
        table
            .clans
            .get(clan_id)
            .is_some_and(|clan| clan.is_member(player_id))
    }

    /// Member ids in join order; empty for an unknown clan.
    pub async fn member_ids(&self, clan_id: &ClanId) -> Vec<PlayerId> {
        let table = self.table.lock().await;
        table
            .clans
            .get(clan_id)
            .map(|clan| clan.member_ids.clone())
            .unwrap_or_default()
    }

    pub async fn exists(&self, clan_id: &ClanId) -> bool {
        self.table.lock().await.clans.contains_key(clan_id)
    }

    pub async fn clan_list(&self) -> Vec<ClanListEntry> {
        let table = self.table.lock().await;
        table
            .clans
            .values()
            .map(|clan| ClanListEntry {
                id: clan.id.clone(),
                name: clan.name.clone(),
                members: clan.member_ids.len(),
                trophies: clan.clan_trophies,
                required: clan.required_trophies,
                open: clan.is_open,
            })
            .collect()
    }

    /// Members with their live name, trophies, and online flag.
    pub async fn clan_members(&self, clan_id: &ClanId) -> Result<ClanMembers, ClanError> {
        let table = self.table.lock().await;
        let clan = table
            .clans
            .get(clan_id)
            .ok_or_else(|| ClanError::ClanNotFound(clan_id.clone()))?;

        let mut members = Vec::with_capacity(clan.member_ids.len());
        for member_id in &clan.member_ids {
            let profile = self.registry.profile(member_id).await;
            members.push(ClanMemberEntry {
                id: member_id.clone(),
                name: profile.name,
                trophies: profile.trophies,
                online: profile.online,
            });
        }
        Ok(ClanMembers {
            clan_id: clan.id.clone(),
            name: clan.name.clone(),
            leader: clan.leader_id.clone(),
            members,
        })
    }

    pub async fn clan_info(&self, clan_id: &ClanId) -> Result<ClanInfo, ClanError> {
        let table = self.table.lock().await;
        let clan = table
            .clans
            .get(clan_id)
            .ok_or_else(|| ClanError::ClanNotFound(clan_id.clone()))?;
        Ok(ClanInfo {
            id: clan.id.clone(),
            name: clan.name.clone(),
            leader: clan.leader_id.clone(),
            description: clan.description.clone(),
            members: clan.member_ids.len(),
            trophies: clan.clan_trophies,
            required: clan.required_trophies,
            open: clan.is_open,
        })
    }
}
