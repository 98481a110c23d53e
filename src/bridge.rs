// The service behind every route: assembles and broadcasts render batches,
// stores masks and uploads, and owns the session registry.

use image::ImageFormat;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::batch::{AssembledBatch, BatchAssembler, FileReport};
use crate::config::BridgeDirs;
use crate::error::{BridgeError, BridgeResult, validate_filename};
use crate::imaging::{MaskRequest, codec::sniff_format, save_mask};
use crate::session::{BroadcastHub, ConnectionRegistry, DeliveryReport, SessionRole};

pub type SharedBridge = Arc<BridgeService>;

/// What happened to one render batch request.
#[derive(Debug, Clone)]
pub struct BatchDelivery {
    pub cm_uid: String,
    pub requested: usize,
    pub files: Vec<FileReport>,
    /// Whether a message went out at all; empty batches are not broadcast.
    pub sent: bool,
    pub delivery: DeliveryReport,
}

impl BatchDelivery {
    pub fn item_count(&self) -> usize {
        self.files.iter().filter(|f| f.skipped.is_none()).count()
    }
}

pub struct BridgeService {
    dirs: BridgeDirs,
    assembler: BatchAssembler,
    registry: Arc<ConnectionRegistry>,
    hub: BroadcastHub,
    session_queue: usize,
}

impl BridgeService {
    pub fn new(
        dirs: BridgeDirs,
        read_timeout: Duration,
        send_timeout: Duration,
        session_queue: usize,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            assembler: BatchAssembler::new(dirs.temp.clone(), read_timeout),
            hub: BroadcastHub::new(registry.clone(), send_timeout),
            registry,
            dirs,
            session_queue,
        }
    }

    pub fn dirs(&self) -> &BridgeDirs {
        &self.dirs
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn session_queue(&self) -> usize {
        self.session_queue
    }

    /// Reads `filenames` from the temp directory and sends whatever could be
    /// processed to every connected editor as one message.
    pub async fn deliver_batch(&self, filenames: &[String], cm_uid: &str) -> BridgeResult<BatchDelivery> {
        let AssembledBatch { batch, reports } = self.assembler.assemble(filenames, cm_uid).await;

        let mut delivery = BatchDelivery {
            cm_uid: cm_uid.to_string(),
            requested: filenames.len(),
            files: reports,
            sent: false,
            delivery: DeliveryReport::default(),
        };

        if batch.is_empty() {
            warn!(cm_uid, "No images were successfully processed to be sent");
            return Ok(delivery);
        }

        delivery.delivery = self.hub.broadcast_to_role(&batch, SessionRole::Editor).await?;
        delivery.sent = delivery.delivery.recipients > 0;
        if delivery.sent {
            info!(
                cm_uid,
                items = batch.len(),
                delivered = delivery.delivery.delivered,
                "Sent batch to editor client(s)"
            );
        } else {
            warn!(cm_uid, "No editor clients are connected to receive the batch");
        }
        Ok(delivery)
    }

    pub async fn save_mask(&self, request: MaskRequest) -> BridgeResult<PathBuf> {
        save_mask(request, &self.dirs.inputs).await
    }

    /// Stores an encoded image verbatim in the inputs directory. When the
    /// client declared a format, the bytes have to actually be in it.
    pub async fn save_input(
        &self,
        filename: &str,
        data: Vec<u8>,
        declared: Option<ImageFormat>,
    ) -> BridgeResult<PathBuf> {
        let path = self.dirs.inputs.join(validate_filename(filename)?);
        let format = sniff_format(&data)?;
        if let Some(declared) = declared.filter(|d| *d != format) {
            return Err(BridgeError::Decode(format!(
                "declared {:?} but the data is {:?}",
                declared, format
            )));
        }
        let len = data.len();
        tokio::fs::write(&path, data).await?;
        info!(path = %path.display(), ?format, bytes = len, "Saved input image");
        Ok(path)
    }
}
