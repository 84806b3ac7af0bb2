//! Live MCP sessions keyed by their settled identifier.

use super::transport::{McpTransport, TransportState};
use chrono::{DateTime, Utc};
use rand::Rng;
use rmcp::transport::common::server_side_http::SessionId;
use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 6;

/// Fresh session identifier: `inkmatch-<epoch millis>-<6 base36 chars>`.
pub fn generate_session_id() -> SessionId {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    SessionId::from(format!(
        "inkmatch-{}-{}",
        Utc::now().timestamp_millis(),
        suffix
    ))
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Transport has no settled session id")]
    Unsettled,
    #[error("Session id '{0}' is already registered")]
    Collision(String),
}

#[derive(Clone)]
pub struct Session {
    pub transport: Arc<McpTransport>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an initialized transport under its settled id.
    ///
    /// The entry removes itself when the transport closes, unless it has
    /// been replaced or removed in the meantime.
    pub async fn create(&self, transport: Arc<McpTransport>) -> Result<SessionId, RegistryError> {
        let id = transport
            .session_id()
            .cloned()
            .ok_or(RegistryError::Unsettled)?;

        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&id) {
                return Err(RegistryError::Collision(id.to_string()));
            }
            sessions.insert(
                id.clone(),
                Session {
                    transport: transport.clone(),
                    created_at: Utc::now(),
                },
            );
        }

        self.evict_on_close(id.clone(), &transport);
        info!(session_id = %id, "Session registered");
        Ok(id)
    }

    fn evict_on_close(&self, id: SessionId, transport: &Arc<McpTransport>) {
        let mut state = transport.subscribe();
        // Weak so the watcher never keeps a removed transport alive.
        let watched = Arc::downgrade(transport);
        let registry = self.clone();

        tokio::spawn(async move {
            if state.wait_for(|s| *s == TransportState::Closed).await.is_err() {
                debug!(session_id = %id, "Transport state channel dropped");
            }
            registry.evict_if_same(&id, &watched).await;
        });
    }

    async fn evict_if_same(&self, id: &SessionId, watched: &Weak<McpTransport>) {
        let mut sessions = self.sessions.write().await;
        let same = sessions
            .get(id)
            .is_some_and(|s| std::ptr::eq(Arc::as_ptr(&s.transport), watched.as_ptr()));
        if same {
            sessions.remove(id);
            info!(session_id = %id, "Session evicted after transport closed");
        }
    }

    pub async fn get(&self, id: &str) -> Option<Arc<McpTransport>> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|s| s.transport.clone())
    }

    /// Removes a session. Removing an unknown id is a no-op.
    pub async fn remove(&self, id: &str) -> Option<Session> {
        let removed = self.sessions.write().await.remove(id);
        match &removed {
            Some(session) => info!(
                session_id = %id,
                age_secs = (Utc::now() - session.created_at).num_seconds(),
                "Session removed"
            ),
            None => warn!(session_id = %id, "Tried to remove an unknown session"),
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
