//! Caller-facing upload coordinator.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chunkwise_protocol::UploadStatus;
use chunkwise_transfer::{AcceptList, UploadFile, validate_file};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::endpoint::UploadEndpoint;
use crate::error::{QueueError, Rejection};
use crate::preview::PreviewRegistry;
use crate::processor;
use crate::store::{ItemStore, UploadItem};
use crate::types::{SubmitReport, UploadCallbacks, UploadItemView, UploaderConfig};

/// Mutable queue state, guarded by [`Shared::state`].
#[derive(Debug, Default)]
pub(crate) struct QueueState {
    pub store: ItemStore,
    /// Ids waiting for the worker, oldest first.
    pub queue: VecDeque<String>,
    /// A worker task is running.
    pub processing: bool,
    pub shut_down: bool,
}

/// State shared between the coordinator and its worker task.
pub(crate) struct Shared {
    pub config: UploaderConfig,
    pub accept: Option<AcceptList>,
    pub endpoint: Arc<dyn UploadEndpoint>,
    pub callbacks: UploadCallbacks,
    pub previews: PreviewRegistry,
    pub idle: watch::Sender<bool>,
    state: Mutex<QueueState>,
}

impl Shared {
    pub fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the worker slot if items are queued and no worker is running.
    fn claim_worker(&self, state: &mut QueueState) -> bool {
        if state.processing || state.queue.is_empty() {
            return false;
        }
        state.processing = true;
        self.idle.send_replace(false);
        true
    }
}

/// Accepts files, uploads them one at a time and tracks every item until
/// the caller removes it.
///
/// Each coordinator owns its queue and worker; two coordinators never
/// share state. Dropping the coordinator shuts it down.
pub struct UploadCoordinator {
    shared: Arc<Shared>,
}

impl UploadCoordinator {
    pub fn new(
        config: UploaderConfig,
        endpoint: Arc<dyn UploadEndpoint>,
        callbacks: UploadCallbacks,
    ) -> Self {
        let (idle, _) = watch::channel(true);
        Self {
            shared: Arc::new(Shared {
                accept: config.accept_list(),
                config,
                endpoint,
                callbacks,
                previews: PreviewRegistry::new(),
                idle,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.shared.config
    }

    /// Registry of the previews held by this coordinator's items.
    pub fn previews(&self) -> &PreviewRegistry {
        &self.shared.previews
    }

    /// Validates and enqueues `files`, starting the worker if it is idle.
    ///
    /// Files failing validation are rejected one by one; the rest are
    /// admitted up to `max_files` (counting items already held), and any
    /// overflow is rejected as one capacity error. Every rejection is also
    /// reported through the error callback. Never waits on the network.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime while the worker needs
    /// to be started.
    pub fn submit(&self, files: impl IntoIterator<Item = UploadFile>) -> SubmitReport {
        let files: Vec<UploadFile> = files.into_iter().collect();
        let mut report = SubmitReport::default();
        if files.is_empty() {
            return report;
        }

        let config = &self.shared.config;
        if config.disabled {
            self.reject(&mut report, Rejection::Disabled { file_names: names(&files) });
            return report;
        }
        if self.shared.state().shut_down {
            self.reject(&mut report, Rejection::ShutDown { file_names: names(&files) });
            return report;
        }

        let mut valid = Vec::with_capacity(files.len());
        for file in files {
            match validate_file(&file, config.max_size_bytes, self.shared.accept.as_ref()) {
                Ok(()) => valid.push(file),
                Err(err) => {
                    warn!(file = %file.name(), error = %err, "file rejected");
                    self.shared.callbacks.error(&err.to_string(), Some(&file));
                    report.rejected.push(Rejection::Invalid(err));
                }
            }
        }

        if !config.multiple && valid.len() > 1 {
            let extra = valid.split_off(1);
            self.reject(&mut report, Rejection::SingleFileOnly { file_names: names(&extra) });
        }

        let (overflow, start_worker) = {
            let mut state = self.shared.state();
            // A concurrent `shutdown` may have drained the store since the
            // check above.
            if state.shut_down {
                drop(state);
                if !valid.is_empty() {
                    self.reject(&mut report, Rejection::ShutDown { file_names: names(&valid) });
                }
                return report;
            }
            let room = config.max_files.saturating_sub(state.store.len());
            let overflow = if valid.len() > room {
                valid.split_off(room)
            } else {
                Vec::new()
            };

            for file in valid {
                let id = Uuid::new_v4().to_string();
                let preview = self.shared.previews.allocate(&file);
                info!(id = %id, file = %file.name(), size = file.size(), "file admitted");
                state.store.insert(UploadItem::new(id.clone(), file, preview));
                state.queue.push_back(id.clone());
                report.admitted.push(id);
            }

            let start = self.shared.claim_worker(&mut state);
            (overflow, start)
        };

        if !overflow.is_empty() {
            self.reject(
                &mut report,
                Rejection::Capacity {
                    max_files: config.max_files,
                    file_names: names(&overflow),
                },
            );
        }
        if start_worker {
            self.spawn_worker();
        }
        report
    }

    /// Re-queues a failed item at the tail of the queue.
    pub fn retry(&self, id: &str) -> Result<(), QueueError> {
        let start_worker = {
            let mut state = self.shared.state();
            let keep_resume = self.shared.config.resume_failed_uploads;
            let item = state
                .store
                .get_mut(id)
                .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
            if item.status() != UploadStatus::Error {
                return Err(QueueError::NotRetryable(id.to_string()));
            }
            item.reset_for_retry(keep_resume);
            state.queue.push_back(id.to_string());
            self.shared.claim_worker(&mut state)
        };

        info!(id = %id, "upload retry queued");
        if start_worker {
            self.spawn_worker();
        }
        Ok(())
    }

    /// Deletes an item and releases its preview.
    ///
    /// An item that is uploading has its transfer cancelled; no callbacks
    /// fire for it afterwards.
    pub fn remove(&self, id: &str) -> Result<(), QueueError> {
        let removed = {
            let mut state = self.shared.state();
            let removed = state.store.remove(id);
            if removed.is_some() {
                state.queue.retain(|queued| queued != id);
            }
            removed
        };
        let item = removed.ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        info!(id = %id, status = ?item.status(), "item removed");
        drop(item);
        Ok(())
    }

    /// Snapshot of every item in admission order.
    pub fn items(&self) -> Vec<UploadItemView> {
        self.shared.state().store.views()
    }

    pub fn item(&self, id: &str) -> Option<UploadItemView> {
        self.shared.state().store.get(id).map(UploadItem::view)
    }

    /// Returns `true` when no item is queued or uploading.
    pub fn is_idle(&self) -> bool {
        *self.shared.idle.borrow()
    }

    /// Resolves once the queue is drained and nothing is in flight.
    pub async fn wait_idle(&self) {
        let mut idle = self.shared.idle.subscribe();
        // The sender lives in `shared`, so this cannot observe a closed channel.
        let _ = idle.wait_for(|idle| *idle).await;
    }

    /// Cancels the in-flight transfer, drops every item and releases
    /// every preview. Later submissions are rejected.
    pub fn shutdown(&self) {
        let items = {
            let mut state = self.shared.state();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.queue.clear();
            state.store.drain()
        };
        info!(items = items.len(), "upload coordinator shut down");
        drop(items);
    }

    fn spawn_worker(&self) {
        debug!("starting upload worker");
        tokio::spawn(processor::run(Arc::clone(&self.shared)));
    }

    fn reject(&self, report: &mut SubmitReport, rejection: Rejection) {
        warn!(error = %rejection, "files rejected");
        self.shared.callbacks.error(&rejection.to_string(), None);
        report.rejected.push(rejection);
    }
}

impl Drop for UploadCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for UploadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state();
        f.debug_struct("UploadCoordinator")
            .field("items", &state.store.len())
            .field("queued", &state.queue.len())
            .field("processing", &state.processing)
            .finish()
    }
}

fn names(files: &[UploadFile]) -> Vec<String> {
    files.iter().map(|f| f.name().to_string()).collect()
}
