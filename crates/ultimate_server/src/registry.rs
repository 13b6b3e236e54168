//! Registry of live game sessions.

use crate::session::{GameSession, PlayerId, SessionId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use derive_more::{Display, Error};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Registry failures.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum RegistryError {
    /// A session with this id is already registered.
    #[display("Session {} already exists", session_id)]
    DuplicateSession {
        /// The clashing id.
        session_id: SessionId,
    },
}

/// Sessions by id, plus an index from player id to session id.
///
/// Sessions stay registered until removed; finished games are not
/// collected.
#[derive(Debug, Default)]
pub struct GameRegistry {
    sessions: DashMap<SessionId, Arc<GameSession>>,
    players: DashMap<PlayerId, SessionId>,
}

impl GameRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session and indexes its seated players.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateSession`] if the id is taken.
    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    pub fn register(&self, session: Arc<GameSession>) -> Result<(), RegistryError> {
        let id = session.id().to_string();
        match self.sessions.entry(id.clone()) {
            Entry::Occupied(_) => {
                warn!("Duplicate session id");
                return Err(RegistryError::DuplicateSession { session_id: id });
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&session));
            }
        }
        for player in session.players() {
            self.players.insert(player.id, id.clone());
        }
        info!(total = self.sessions.len(), "Session registered");
        Ok(())
    }

    /// Looks up a session by id.
    pub fn get(&self, session_id: &str) -> Option<Arc<GameSession>> {
        self.sessions.get(session_id).map(|s| Arc::clone(s.value()))
    }

    /// Finds the session a player was seated in.
    pub fn session_for_player(&self, player_id: &str) -> Option<Arc<GameSession>> {
        let session_id = self.players.get(player_id)?.value().clone();
        self.get(&session_id)
    }

    /// Drops a player's index entry, leaving the session in place.
    pub fn forget_player(&self, player_id: &str) {
        self.players.remove(player_id);
    }

    /// Removes a session and its index entries.
    #[instrument(skip(self))]
    pub fn remove(&self, session_id: &str) -> Option<Arc<GameSession>> {
        let (_, session) = self.sessions.remove(session_id)?;
        self.players.retain(|_, sid| sid != session_id);
        info!("Session removed");
        Some(session)
    }

    /// Ids of all registered sessions.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
