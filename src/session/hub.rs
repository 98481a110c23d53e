// Fan-out of server messages to connected sessions.
//
// A message is serialized once and the same frame is queued for every
// recipient. Delivery is best effort and at most once per recipient; a
// recipient whose queue is closed or stays full past the send timeout is
// treated as disconnected and dropped from the registry.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::registry::{ConnectionRegistry, Frame, SessionHandle, SessionRole};
use crate::batch::Batch;
use crate::error::BridgeResult;

/// Every message sent to a client, tagged by `type` with its payload in `data`.
#[derive(Serialize, Debug)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage<'a> {
    Connected {
        session_id: Uuid,
        role: SessionRole,
    },
    RenderBatch(&'a Batch),
}

impl ServerMessage<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Connected { .. } => "connected",
            ServerMessage::RenderBatch(_) => "render_batch",
        }
    }

    pub fn to_frame(&self) -> BridgeResult<Frame> {
        Ok(Arc::from(serde_json::to_string(self)?))
    }
}

/// Outcome of one broadcast.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    pub recipients: usize,
    pub delivered: usize,
}

pub struct BroadcastHub {
    registry: Arc<ConnectionRegistry>,
    send_timeout: Duration,
}

impl BroadcastHub {
    pub fn new(registry: Arc<ConnectionRegistry>, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Sends `batch` to each of `recipients` and returns how many accepted it.
    /// No recipients means no work at all, not even serialization.
    pub async fn broadcast(
        &self,
        batch: &Batch,
        recipients: &[Arc<SessionHandle>],
    ) -> BridgeResult<usize> {
        if recipients.is_empty() {
            debug!(cm_uid = %batch.cm_uid, "No recipients for batch");
            return Ok(0);
        }

        let message = ServerMessage::RenderBatch(batch);
        let frame = message.to_frame()?;
        let delivered = self.fan_out(message.kind(), frame, recipients).await;

        info!(
            cm_uid = %batch.cm_uid,
            items = batch.len(),
            recipients = recipients.len(),
            delivered,
            "Broadcast batch"
        );
        Ok(delivered)
    }

    /// Looks up the current sessions with `role` and broadcasts to them.
    pub async fn broadcast_to_role(
        &self,
        batch: &Batch,
        role: SessionRole,
    ) -> BridgeResult<DeliveryReport> {
        let recipients = self.registry.sessions_with_role(role).await;
        let delivered = self.broadcast(batch, &recipients).await?;
        Ok(DeliveryReport {
            recipients: recipients.len(),
            delivered,
        })
    }

    async fn fan_out(&self, kind: &str, frame: Frame, recipients: &[Arc<SessionHandle>]) -> usize {
        let sends = recipients.iter().map(|session| {
            let frame = Arc::clone(&frame);
            async move {
                let result = session.send(frame, self.send_timeout).await;
                (session, result)
            }
        });

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (session, result) in join_all(sends).await {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(session_id = %session.id(), kind, error = %e, "Failed to deliver message");
                    failed.push(session.id());
                }
            }
        }

        for session_id in failed {
            self.registry.unregister(session_id).await;
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::test_support::item;
    use tokio::sync::mpsc;

    fn batch(cm_uid: &str) -> Batch {
        Batch {
            cm_uid: cm_uid.to_string(),
            items: vec![item("a.png", vec![137, 80], 4, 4), item("b.png", vec![1], 2, 3)],
        }
    }

    async fn connect(
        registry: &ConnectionRegistry,
        role: SessionRole,
    ) -> (Arc<SessionHandle>, mpsc::Receiver<Frame>) {
        let (session, rx) = SessionHandle::new(role, None, 8);
        registry.register(session.clone()).await;
        (session, rx)
    }

    fn hub(registry: &Arc<ConnectionRegistry>) -> BroadcastHub {
        BroadcastHub::new(registry.clone(), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_no_recipients_is_a_no_op() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (_pipeline, mut rx) = connect(&registry, SessionRole::Pipeline).await;
        let hub = hub(&registry);

        assert_eq!(hub.broadcast(&batch("X"), &[]).await.unwrap(), 0);
        let report = hub.broadcast_to_role(&batch("X"), SessionRole::Editor).await.unwrap();
        assert_eq!(report, DeliveryReport::default());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_one_failing_recipient_does_not_block_others() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (ok, mut ok_rx) = connect(&registry, SessionRole::Editor).await;
        let (broken, broken_rx) = connect(&registry, SessionRole::Editor).await;
        drop(broken_rx);

        let delivered = hub(&registry)
            .broadcast(&batch("X2"), &[broken.clone(), ok.clone()])
            .await
            .unwrap();

        assert_eq!(delivered, 1);
        let frame = ok_rx.try_recv().unwrap();
        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["type"], "render_batch");
        assert_eq!(json["data"]["cm_uid"], "X2");

        // The failed recipient counts as disconnected.
        assert!(!registry.contains(broken.id()).await);
        assert!(registry.contains(ok.id()).await);
    }

    #[tokio::test]
    async fn test_every_recipient_gets_the_same_single_message() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (_e1, mut rx1) = connect(&registry, SessionRole::Editor).await;
        let (_e2, mut rx2) = connect(&registry, SessionRole::Editor).await;
        let (_p, mut rx3) = connect(&registry, SessionRole::Pipeline).await;

        let report = hub(&registry)
            .broadcast_to_role(&batch("X3"), SessionRole::Editor)
            .await
            .unwrap();

        assert_eq!(report, DeliveryReport { recipients: 2, delivered: 2 });
        let f1 = rx1.try_recv().unwrap();
        let f2 = rx2.try_recv().unwrap();
        assert_eq!(f1, f2);
        assert!(rx1.try_recv().is_err());
        assert!(rx3.try_recv().is_err());
    }

    #[test]
    fn test_envelope_shape() {
        let b = batch("X4");
        let value: serde_json::Value =
            serde_json::from_str(&ServerMessage::RenderBatch(&b).to_frame().unwrap()).unwrap();

        assert_eq!(value["type"], "render_batch");
        let items = value["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["filename"], "a.png");
        assert_eq!(items[0]["image"], serde_json::json!([137, 80]));
        assert_eq!(items[1]["size"], serde_json::json!({"width": 2, "height": 3}));

        let id = Uuid::new_v4();
        let value: serde_json::Value = serde_json::from_str(
            &ServerMessage::Connected {
                session_id: id,
                role: SessionRole::Editor,
            }
            .to_frame()
            .unwrap(),
        )
        .unwrap();
        assert_eq!(value["type"], "connected");
        assert_eq!(value["data"]["role"], "editor");
        assert_eq!(value["data"]["session_id"], id.to_string());
    }
}
