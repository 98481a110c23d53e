// Assembles generated images into one batch for the editor clients.
// Each file is read, decoded once for its metadata, and shipped with its
// original encoded bytes.

use futures::{StreamExt, stream};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, BridgeResult, validate_filename};
use crate::imaging::{ImageBounds, codec::decode_rgba, extract_bounds};

// Files read and decoded at the same time while assembling one batch.
pub const DEFAULT_FILE_CONCURRENCY: usize = 8;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// One image of a batch, as it travels to the editor.
#[derive(Serialize, Debug, Clone)]
pub struct BatchItem {
    filename: String,
    // Original file contents, serialized as an array of byte values.
    #[serde(rename = "image")]
    raw_bytes: Vec<u8>,
    size: ImageSize,
    #[serde(rename = "sourceBounds")]
    bounds: ImageBounds,
}

impl BatchItem {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn bounds(&self) -> ImageBounds {
        self.bounds
    }
}

/// Ordered items plus the caller's correlation id, passed through untouched.
#[derive(Serialize, Debug, Clone, Default)]
pub struct Batch {
    pub cm_uid: String,
    pub items: Vec<BatchItem>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
    Failed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotFound => write!(f, "file not found"),
            SkipReason::Failed(cause) => write!(f, "{}", cause),
        }
    }
}

/// Result of processing a single filename.
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Ready(BatchItem),
    Skipped { filename: String, reason: SkipReason },
}

/// Per-file status kept next to the batch for the acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub filename: String,
    pub skipped: Option<SkipReason>,
}

#[derive(Debug, Clone, Default)]
pub struct AssembledBatch {
    pub batch: Batch,
    pub reports: Vec<FileReport>,
}

impl AssembledBatch {
    /// Folds per-file outcomes, in input order, into a batch and its report.
    pub fn from_outcomes(cm_uid: &str, outcomes: Vec<ItemOutcome>) -> Self {
        let mut assembled = AssembledBatch {
            batch: Batch {
                cm_uid: cm_uid.to_string(),
                items: Vec::with_capacity(outcomes.len()),
            },
            reports: Vec::with_capacity(outcomes.len()),
        };

        for outcome in outcomes {
            match outcome {
                ItemOutcome::Ready(item) => {
                    assembled.reports.push(FileReport {
                        filename: item.filename.clone(),
                        skipped: None,
                    });
                    assembled.batch.items.push(item);
                }
                ItemOutcome::Skipped { filename, reason } => {
                    assembled.reports.push(FileReport {
                        filename,
                        skipped: Some(reason),
                    });
                }
            }
        }

        assembled
    }

    pub fn skipped_count(&self) -> usize {
        self.reports.iter().filter(|r| r.skipped.is_some()).count()
    }
}

/// Reads generated images out of one directory.
#[derive(Debug, Clone)]
pub struct BatchAssembler {
    dir: PathBuf,
    read_timeout: Duration,
    concurrency: usize,
}

impl BatchAssembler {
    pub fn new(dir: impl Into<PathBuf>, read_timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            read_timeout,
            concurrency: DEFAULT_FILE_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Processes every filename (duplicates included), at most `concurrency`
    /// at a time, and keeps the input order in the result. Failures only ever
    /// skip their own file.
    pub async fn assemble(&self, filenames: &[String], cm_uid: &str) -> AssembledBatch {
        let outcomes = stream::iter(filenames.iter().cloned())
            .map(|name| async move { self.process_file(&name).await })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;
        let assembled = AssembledBatch::from_outcomes(cm_uid, outcomes);

        info!(
            cm_uid,
            requested = filenames.len(),
            ready = assembled.batch.len(),
            skipped = assembled.skipped_count(),
            "Assembled batch"
        );
        assembled
    }

    async fn process_file(&self, filename: &str) -> ItemOutcome {
        match self.load_item(filename).await {
            Ok(item) => {
                debug!(filename, "Processed file");
                ItemOutcome::Ready(item)
            }
            Err(BridgeError::FileNotFound(_)) => {
                warn!(filename, "File not found");
                ItemOutcome::Skipped {
                    filename: filename.to_string(),
                    reason: SkipReason::NotFound,
                }
            }
            Err(e) => {
                warn!(filename, error = %e, "Error processing file");
                ItemOutcome::Skipped {
                    filename: filename.to_string(),
                    reason: SkipReason::Failed(e.to_string()),
                }
            }
        }
    }

    async fn load_item(&self, filename: &str) -> BridgeResult<BatchItem> {
        let path = self.dir.join(validate_filename(filename)?);
        debug!(path = %path.display(), "Checking for file");

        if !tokio::fs::try_exists(&path).await? {
            return Err(BridgeError::FileNotFound(filename.to_string()));
        }

        let raw_bytes = tokio::time::timeout(self.read_timeout, tokio::fs::read(&path))
            .await
            .map_err(|_| BridgeError::ReadTimeout {
                filename: filename.to_string(),
                after: self.read_timeout,
            })??;

        let (raw_bytes, size, bounds) = tokio::task::spawn_blocking(move || {
            let image = decode_rgba(&raw_bytes)?;
            let (width, height) = image.dimensions();
            let bounds = extract_bounds(&image);
            Ok::<_, BridgeError>((raw_bytes, ImageSize { width, height }, bounds))
        })
        .await??;

        Ok(BatchItem {
            filename: filename.to_string(),
            raw_bytes,
            size,
            bounds,
        })
    }
}
