//! The single-flight worker that drains a coordinator's queue.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chunkwise_protocol::{UploadProgress, UploadStatus};
use chunkwise_transfer::{ChunkPlan, UploadFile, resume_progress};
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::coordinator::Shared;
use crate::error::{TransportError, panic_message};
use crate::transport::{ChunkAck, TransferOptions, upload_in_chunks};
use crate::types::CompletedUpload;

/// One dequeued item, detached from the store for the duration of its transfer.
struct Job {
    id: String,
    file: UploadFile,
    options: TransferOptions,
}

/// Processes queued items one at a time until the queue is empty or the
/// coordinator shuts down.
///
/// A panic inside the endpoint fails only the item being transferred.
pub(crate) async fn run(shared: Arc<Shared>) {
    let mut slot = WorkerSlot {
        shared: &shared,
        armed: true,
    };
    debug!("upload worker started");
    while let Some(job) = next_job(&shared) {
        let transfer = upload_in_chunks(
            shared.endpoint.as_ref(),
            &job.file,
            &job.options,
            |ack| record_ack(&shared, &job.id, ack),
        );
        let result = match AssertUnwindSafe(transfer).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(TransportError::Aborted(panic_message(&*panic))),
        };
        settle(&shared, job, result);
    }
    // `next_job` already handed the slot back.
    slot.armed = false;
    debug!("upload worker idle");
}

/// Gives the worker slot back if the worker task ends without draining the
/// queue (a panic, or the runtime dropping the task), so later submissions
/// start a fresh worker and `wait_idle` does not hang.
struct WorkerSlot<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl Drop for WorkerSlot<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        error!("upload worker stopped early, releasing worker slot");
        let mut state = self.shared.state();
        state.store.fail_uploading("upload worker stopped unexpectedly");
        state.processing = false;
        self.shared.idle.send_replace(true);
    }
}

/// Pops the next pending item and marks it uploading. Returns `None` and
/// releases the worker slot when nothing is left.
fn next_job(shared: &Shared) -> Option<Job> {
    let mut state = shared.state();

    while !state.shut_down {
        let Some(id) = state.queue.pop_front() else {
            break;
        };
        let Some(item) = state.store.get_mut(&id) else {
            debug!(id = %id, "skipping removed item");
            continue;
        };
        if item.status() != UploadStatus::Pending {
            continue;
        }

        let chunk_size = shared.config.chunk_size_bytes;
        let resume = if shared.config.resume_failed_uploads {
            item.resume_point().cloned()
        } else {
            None
        };
        let size = item.file().size();
        let baseline = match &resume {
            Some(point) => resume_progress(&ChunkPlan::new(size, chunk_size), point.next_chunk),
            None => UploadProgress::new(0, size),
        };

        let cancel = CancellationToken::new();
        item.start(cancel.clone(), baseline);
        info!(
            id = %id,
            file = %item.file().name(),
            size,
            resume_from = resume.as_ref().map(|r| r.next_chunk),
            "upload started"
        );

        return Some(Job {
            file: item.file().clone(),
            id,
            options: TransferOptions {
                chunk_size,
                checksums: shared.config.chunk_checksums,
                resume,
                cancel,
            },
        });
    }

    state.processing = false;
    shared.idle.send_replace(true);
    None
}

fn record_ack(shared: &Shared, id: &str, ack: &ChunkAck) {
    let accepted = {
        let mut state = shared.state();
        match state.store.get_mut(id) {
            Some(item) => item.record_progress(ack.progress, ack.resume_point()),
            None => false,
        }
    };
    if accepted {
        shared.callbacks.progress(id, &ack.progress);
    }
}

fn settle(shared: &Shared, job: Job, result: Result<String, TransportError>) {
    let mut state = shared.state();
    let Some(item) = state
        .store
        .get_mut(&job.id)
        .filter(|item| item.status() == UploadStatus::Uploading)
    else {
        debug!(id = %job.id, "item removed during upload, dropping outcome");
        return;
    };

    match result {
        Ok(url) => {
            item.complete(url.clone());
            drop(state);
            info!(id = %job.id, file = %job.file.name(), url = %url, "upload completed");
            shared.callbacks.complete(&[CompletedUpload {
                url,
                file: job.file,
            }]);
        }
        Err(err) => {
            let message = err.to_string();
            item.fail(message.clone());
            drop(state);
            warn!(id = %job.id, file = %job.file.name(), error = %message, "upload failed");
            shared.callbacks.error(&message, Some(&job.file));
        }
    }
}
