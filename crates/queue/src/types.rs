//! Data types for the upload queue.

use std::panic::{AssertUnwindSafe, catch_unwind};

use chunkwise_protocol::{UploadProgress, UploadStatus};
use chunkwise_transfer::{AcceptList, DEFAULT_CHUNK_SIZE, UploadFile};
use serde::{Deserialize, Serialize};

use crate::error::{Rejection, panic_message};

/// Default cap on items held by one coordinator.
pub const DEFAULT_MAX_FILES: usize = 10;

/// Default per-file size limit: 100 MiB.
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Coordinator configuration, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    /// Comma-separated media types / suffixes (`image/*,.pdf`); `None` accepts all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,
    /// Maximum items (any status) held at once.
    pub max_files: usize,
    /// Largest admissible file.
    pub max_size_bytes: u64,
    /// Bytes per chunk; 0 means [`DEFAULT_CHUNK_SIZE`].
    pub chunk_size_bytes: usize,
    /// When `false`, each `submit` admits at most one file.
    pub multiple: bool,
    /// When `true`, `submit` rejects everything.
    pub disabled: bool,
    /// Retry continues after the last acknowledged chunk instead of chunk 0.
    pub resume_failed_uploads: bool,
    /// Send a SHA-256 digest with every chunk.
    pub chunk_checksums: bool,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            accept: None,
            max_files: DEFAULT_MAX_FILES,
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            multiple: true,
            disabled: false,
            resume_failed_uploads: false,
            chunk_checksums: false,
        }
    }
}

impl UploaderConfig {
    /// Parsed accept list, or `None` when unset or blank.
    pub fn accept_list(&self) -> Option<AcceptList> {
        self.accept
            .as_deref()
            .map(AcceptList::parse)
            .filter(|list| !list.is_empty())
    }
}

/// A finished upload handed to the completion callback.
#[derive(Debug, Clone)]
pub struct CompletedUpload {
    pub url: String,
    pub file: UploadFile,
}

/// Progress callback: item id and its latest progress.
pub type ProgressCallback = Box<dyn Fn(&str, &UploadProgress) + Send + Sync>;

/// Completion callback: the uploads that just finished.
pub type CompleteCallback = Box<dyn Fn(&[CompletedUpload]) + Send + Sync>;

/// Error callback: a human-readable cause and the affected file, if one.
pub type ErrorCallback = Box<dyn Fn(&str, Option<&UploadFile>) + Send + Sync>;

/// Caller-supplied notifications. Every callback is optional.
///
/// A callback that panics is logged and otherwise ignored; the queue keeps
/// running.
#[derive(Default)]
pub struct UploadCallbacks {
    progress: Option<ProgressCallback>,
    complete: Option<CompleteCallback>,
    error: Option<ErrorCallback>,
}

impl UploadCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the progress callback.
    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &UploadProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(f));
        self
    }

    /// Registers the completion callback.
    pub fn on_upload_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(&[CompletedUpload]) + Send + Sync + 'static,
    {
        self.complete = Some(Box::new(f));
        self
    }

    /// Registers the error callback.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Option<&UploadFile>) + Send + Sync + 'static,
    {
        self.error = Some(Box::new(f));
        self
    }

    pub(crate) fn progress(&self, id: &str, progress: &UploadProgress) {
        if let Some(cb) = &self.progress {
            guarded("progress", || cb(id, progress));
        }
    }

    pub(crate) fn complete(&self, uploads: &[CompletedUpload]) {
        if let Some(cb) = &self.complete {
            guarded("complete", || cb(uploads));
        }
    }

    pub(crate) fn error(&self, message: &str, file: Option<&UploadFile>) {
        if let Some(cb) = &self.error {
            guarded("error", || cb(message, file));
        }
    }
}

fn guarded(callback: &str, f: impl FnOnce()) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(f)) {
        tracing::error!(callback, panic = %panic_message(&*panic), "upload callback panicked");
    }
}

impl std::fmt::Debug for UploadCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCallbacks")
            .field("progress", &self.progress.is_some())
            .field("complete", &self.complete.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

/// Outcome of one `submit` call.
#[derive(Debug, Clone, Default)]
pub struct SubmitReport {
    /// Ids of the admitted items, in submission order.
    pub admitted: Vec<String>,
    pub rejected: Vec<Rejection>,
}

/// Read-only snapshot of one item, for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadItemView {
    pub id: String,
    pub file_name: String,
    pub file_size: u64,
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    pub progress: UploadProgress,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
}
