//! Per-item upload state and the ordered item store.

use chunkwise_protocol::{UploadProgress, UploadStatus};
use chunkwise_transfer::UploadFile;
use tokio_util::sync::CancellationToken;

use crate::preview::PreviewHandle;
use crate::transport::ResumePoint;
use crate::types::UploadItemView;

/// One tracked file and its upload lifecycle.
#[derive(Debug)]
pub(crate) struct UploadItem {
    id: String,
    file: UploadFile,
    preview: Option<PreviewHandle>,
    progress: UploadProgress,
    status: UploadStatus,
    error: Option<String>,
    remote_url: Option<String>,
    /// Set while the item is uploading.
    cancel: Option<CancellationToken>,
    /// Last acknowledged position of the current `uploadId`.
    resume: Option<ResumePoint>,
}

impl UploadItem {
    /// Creates a pending item.
    pub fn new(id: String, file: UploadFile, preview: Option<PreviewHandle>) -> Self {
        let progress = UploadProgress::new(0, file.size());
        Self {
            id,
            file,
            preview,
            progress,
            status: UploadStatus::Pending,
            error: None,
            remote_url: None,
            cancel: None,
            resume: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file(&self) -> &UploadFile {
        &self.file
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn resume_point(&self) -> Option<&ResumePoint> {
        self.resume.as_ref()
    }

    /// Moves a pending item to `uploading` with a progress baseline.
    pub fn start(&mut self, cancel: CancellationToken, baseline: UploadProgress) {
        self.status = UploadStatus::Uploading;
        self.cancel = Some(cancel);
        self.progress = baseline;
    }

    /// Records an acknowledged chunk. Returns `false` when the update was
    /// ignored because the item is no longer uploading or would regress.
    pub fn record_progress(&mut self, progress: UploadProgress, resume: ResumePoint) -> bool {
        if self.status != UploadStatus::Uploading {
            return false;
        }
        if progress.bytes_sent < self.progress.bytes_sent {
            return false;
        }
        self.resume = Some(resume);
        self.progress = progress;
        true
    }

    pub fn complete(&mut self, url: String) {
        self.status = UploadStatus::Completed;
        self.progress = UploadProgress::complete(self.file.size());
        self.remote_url = Some(url);
        self.error = None;
        self.cancel = None;
        self.resume = None;
    }

    pub fn fail(&mut self, message: String) {
        self.status = UploadStatus::Error;
        self.error = Some(message);
        self.cancel = None;
    }

    /// Puts a failed item back to `pending`.
    ///
    /// The resume point survives only when `keep_resume` is set; otherwise
    /// the next attempt starts from chunk 0 under a new `uploadId`.
    pub fn reset_for_retry(&mut self, keep_resume: bool) {
        self.status = UploadStatus::Pending;
        self.error = None;
        if !keep_resume {
            self.resume = None;
            self.progress = UploadProgress::new(0, self.file.size());
        }
    }

    /// Cancels an in-flight transfer, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }

    pub fn view(&self) -> UploadItemView {
        UploadItemView {
            id: self.id.clone(),
            file_name: self.file.name().to_string(),
            file_size: self.file.size(),
            media_type: self.file.media_type().to_string(),
            preview_url: self
                .preview
                .as_ref()
                .filter(|p| !p.is_released())
                .map(|p| p.url().to_string()),
            progress: self.progress,
            status: self.status,
            error: self.error.clone(),
            remote_url: self.remote_url.clone(),
        }
    }
}

impl Drop for UploadItem {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Items in admission order.
#[derive(Debug, Default)]
pub(crate) struct ItemStore {
    items: Vec<UploadItem>,
}

impl ItemStore {
    /// Appends an item. Returns `false` if the id is already present.
    pub fn insert(&mut self, item: UploadItem) -> bool {
        if self.get(item.id()).is_some() {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn get(&self, id: &str) -> Option<&UploadItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut UploadItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Removes and returns an item; dropping it releases its preview and
    /// cancels any in-flight transfer.
    pub fn remove(&mut self, id: &str) -> Option<UploadItem> {
        let pos = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(pos))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Marks every uploading item as failed with `message`.
    pub fn fail_uploading(&mut self, message: &str) {
        for item in self
            .items
            .iter_mut()
            .filter(|item| item.status == UploadStatus::Uploading)
        {
            item.fail(message.to_string());
        }
    }

    pub fn views(&self) -> Vec<UploadItemView> {
        self.items.iter().map(UploadItem::view).collect()
    }

    /// Empties the store, returning the removed items.
    pub fn drain(&mut self) -> Vec<UploadItem> {
        std::mem::take(&mut self.items)
    }
}
