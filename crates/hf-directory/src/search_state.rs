use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{LoadError, SaveError},
    filter::Filters,
    services::ServiceWithDistance,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchState {
    pub services: Vec<ServiceWithDistance>,
    pub scroll_position: u32,
    pub filters: Filters,
    pub search_params: BTreeMap<String, String>,
}

/// Identifies one browsing session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigationSession(String);

impl NavigationSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NavigationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Saved results views, one per navigation session. Saving overwrites
/// whatever was there; restoring replays it without a re-fetch.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SearchStateStore {
    slots: BTreeMap<NavigationSession, SearchState>,
    #[serde(skip)]
    restoring: HashSet<NavigationSession>,
}

impl SearchStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `state` as the session's saved search, replacing any earlier one.
    pub fn save(&mut self, session: &NavigationSession, state: SearchState) {
        debug!(%session, services = state.services.len(), "saving search state");
        self.slots.insert(session.clone(), state);
    }

    pub fn peek(&self, session: &NavigationSession) -> Option<&SearchState> {
        self.slots.get(session)
    }

    /// Start replaying the session's saved search.
    ///
    /// Returns `None` when nothing is saved, or when a restore for this session
    /// is already under way and [`finish_restore`](Self::finish_restore) has
    /// not been called yet.
    pub fn restore(&mut self, session: &NavigationSession) -> Option<SearchState> {
        if self.restoring.contains(session) {
            debug!(%session, "restore already in progress");
            return None;
        }
        let state = self.slots.get(session)?.clone();
        self.restoring.insert(session.clone());
        Some(state)
    }

    pub fn finish_restore(&mut self, session: &NavigationSession) {
        self.restoring.remove(session);
    }

    pub fn is_restoring(&self, session: &NavigationSession) -> bool {
        self.restoring.contains(session)
    }

    /// Remove and return the saved search.
    pub fn take(&mut self, session: &NavigationSession) -> Option<SearchState> {
        self.slots.remove(session)
    }

    pub fn clear(&mut self, session: &NavigationSession) {
        self.slots.remove(session);
        self.restoring.remove(session);
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let file_contents = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&file_contents)?)
    }

    /// Like [`load`](Self::load), but a missing file is an empty store.
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        match tokio::fs::read_to_string(path).await {
            Ok(file_contents) => Ok(serde_json::from_str(&file_contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), SaveError> {
        let serialized = serde_json::to_string(self)?;
        tokio::fs::write(path, serialized).await?;
        Ok(())
    }
}
