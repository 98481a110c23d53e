// Tracks the WebSocket sessions that are currently connected, by role.
// A session is in the registry exactly while it is CONNECTED.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tokio::sync::mpsc::error::SendTimeoutError;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{BridgeError, BridgeResult};

/// Serialized message text shared between all recipients of a broadcast.
pub type Frame = Arc<str>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    /// The external image editor; receives render batches.
    Editor,
    /// Any other client, such as the generation UI.
    #[default]
    Pipeline,
}

impl std::fmt::Display for SessionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionRole::Editor => write!(f, "editor"),
            SessionRole::Pipeline => write!(f, "pipeline"),
        }
    }
}

/// One live connection. Outbound frames go through a bounded queue that the
/// connection's writer task drains into the socket.
#[derive(Debug)]
pub struct SessionHandle {
    id: Uuid,
    role: SessionRole,
    client_id: Option<String>,
    tx: mpsc::Sender<Frame>,
}

impl SessionHandle {
    /// Creates a handle with a fresh id and the receiving end of its queue.
    pub fn new(
        role: SessionRole,
        client_id: Option<String>,
        queue_capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let handle = Self {
            id: Uuid::new_v4(),
            role,
            client_id,
            tx,
        };
        (Arc::new(handle), rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Queues a frame, waiting at most `timeout` for room.
    pub async fn send(&self, frame: Frame, timeout: Duration) -> BridgeResult<()> {
        self.tx.send_timeout(frame, timeout).await.map_err(|e| match e {
            SendTimeoutError::Closed(_) => {
                BridgeError::SendFailed(format!("session {} is closed", self.id))
            }
            SendTimeoutError::Timeout(_) => BridgeError::SendFailed(format!(
                "session {} did not accept the message within {:?}",
                self.id, timeout
            )),
        })
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<SessionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, session: Arc<SessionHandle>) {
        let mut sessions = self.sessions.write().await;
        info!(
            session_id = %session.id,
            role = %session.role,
            client_id = session.client_id.as_deref().unwrap_or("-"),
            "Session connected"
        );
        sessions.insert(session.id, session);
    }

    /// Removes a session; returns false if it was not registered.
    pub async fn unregister(&self, session_id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&session_id);
        match removed {
            Some(session) => {
                info!(session_id = %session_id, role = %session.role, "Session disconnected");
                true
            }
            None => {
                debug!(session_id = %session_id, "Session already unregistered");
                false
            }
        }
    }

    /// Snapshot of the sessions with `role`, in no particular order.
    pub async fn sessions_with_role(&self, role: SessionRole) -> Vec<Arc<SessionHandle>> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.role == role)
            .cloned()
            .collect()
    }

    pub async fn count_with_role(&self, role: SessionRole) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.role == role)
            .count()
    }

    pub async fn contains(&self, session_id: Uuid) -> bool {
        self.sessions.read().await.contains_key(&session_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
