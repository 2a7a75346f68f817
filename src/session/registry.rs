use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use super::events::SessionStats;
use super::mediator::StreamingMediator;
use crate::error::SpeechError;

/// A live duplex session and the mediator it owns
pub struct Session {
    pub id: String,
    pub mediator: StreamingMediator,
    pub attached_at: DateTime<Utc>,
}

impl Session {
    pub fn stats(&self) -> SessionStats {
        self.mediator.stats()
    }
}

/// Concurrent map from session id to its mediator
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mediator under `session_id`.
    ///
    /// An id already in use is rejected and the new mediator is dropped,
    /// which half-closes its recognizer call.
    pub fn attach(
        &self,
        session_id: impl Into<String>,
        mediator: StreamingMediator,
    ) -> Result<Arc<Session>, SpeechError> {
        let session_id = session_id.into();

        let session = match self.sessions.entry(session_id.clone()) {
            Entry::Occupied(_) => return Err(SpeechError::DuplicateSession(session_id)),
            Entry::Vacant(entry) => {
                let session = Arc::new(Session {
                    id: session_id.clone(),
                    mediator,
                    attached_at: Utc::now(),
                });
                entry.insert(Arc::clone(&session));
                session
            }
        };

        // Shard lock released above; len() takes every shard
        info!(
            "[{}] Session attached ({} active)",
            session_id,
            self.sessions.len()
        );
        Ok(session)
    }

    /// Remove a session. Only the first call for an id returns it.
    pub fn detach(&self, session_id: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.remove(session_id).map(|(_, session)| session);
        match &removed {
            Some(_) => info!(
                "[{}] Session detached ({} active)",
                session_id,
                self.sessions.len()
            ),
            None => debug!("[{}] Detach of unknown session ignored", session_id),
        }
        removed
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Stats of every live session, oldest first
    pub fn snapshot(&self) -> Vec<SessionStats> {
        let mut stats: Vec<SessionStats> = self
            .sessions
            .iter()
            .map(|entry| entry.value().stats())
            .collect();
        stats.sort_by_key(|s| s.created_at);
        stats
    }

    /// Detach a session and half-close its mediator
    pub async fn close_session(&self, session_id: &str) -> bool {
        match self.detach(session_id) {
            Some(session) => {
                session.mediator.close().await;
                true
            }
            None => false,
        }
    }
}
