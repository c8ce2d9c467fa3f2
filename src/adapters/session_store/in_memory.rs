//! In-memory session store for testing and single-process deployments.
//!
//! Entries carry their own deadline and are evicted lazily on access.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::domain::foundation::WizardSessionId;
use crate::domain::wizard::WizardSession;
use crate::ports::{SessionStoreError, WizardSessionStore};

#[derive(Debug, Clone)]
struct Entry {
    session: WizardSession,
    evict_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.evict_at
    }
}

/// Session store backed by a `HashMap` behind a tokio `RwLock`.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    entries: Arc<RwLock<HashMap<WizardSessionId, Entry>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions (for test assertions).
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn entry(session: &WizardSession, ttl_secs: u64) -> Entry {
        Entry {
            session: session.clone(),
            evict_at: Instant::now() + Duration::from_secs(ttl_secs),
        }
    }
}

#[async_trait]
impl WizardSessionStore for InMemorySessionStore {
    async fn get(&self, id: WizardSessionId) -> Result<Option<WizardSession>, SessionStoreError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(&id) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.session.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Lapsed entry: drop it unless a writer refreshed it meanwhile.
        let mut entries = self.entries.write().await;
        if entries.get(&id).is_some_and(|e| !e.is_live(now)) {
            entries.remove(&id);
        }
        Ok(None)
    }

    async fn set(&self, session: &WizardSession, ttl_secs: u64) -> Result<(), SessionStoreError> {
        self.entries
            .write()
            .await
            .insert(session.id(), Self::entry(session, ttl_secs));
        Ok(())
    }

    async fn set_if_revision(
        &self,
        session: &WizardSession,
        expected: u64,
        ttl_secs: u64,
    ) -> Result<(), SessionStoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let matches = entries
            .get(&session.id())
            .is_some_and(|e| e.is_live(now) && e.session.revision() == expected);
        if !matches {
            return Err(SessionStoreError::RevisionMismatch {
                session_id: session.id(),
                expected,
            });
        }

        entries.insert(session.id(), Self::entry(session, ttl_secs));
        Ok(())
    }

    async fn delete(&self, id: WizardSessionId) -> Result<(), SessionStoreError> {
        self.entries.write().await.remove(&id);
        Ok(())
    }
}
