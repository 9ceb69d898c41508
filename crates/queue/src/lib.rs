//! Resumable, chunked upload coordinator.
//!
//! Files submitted to an [`UploadCoordinator`] are validated, recorded as
//! `pending` items, and drained one at a time by a single worker task.
//! Each transfer splits the file into fixed-size chunks, posts them in
//! order through an [`UploadEndpoint`], and finalizes the upload. A
//! failed item stays visible in `error` until the caller retries or
//! removes it; it never blocks the rest of the queue.
//!
//! # Pipeline
//!
//! 1. **Admit**: validate name/size/type, enforce `max_files`
//! 2. **Queue**: record the item as `pending`, enqueue its id (FIFO)
//! 3. **Transfer**: post chunks `0..total_chunks`, reporting progress
//! 4. **Finalize**: exchange the `uploadId` for a durable URL
//! 5. **Settle**: `completed` with the URL, or `error` with the cause

pub mod coordinator;
pub mod endpoint;
pub mod error;
pub mod preview;
pub mod transport;
pub mod types;

mod processor;
mod store;

#[cfg(test)]
mod testing;

// Re-export primary types for convenience.
pub use coordinator::UploadCoordinator;
pub use endpoint::{ChunkRequest, UploadEndpoint};
pub use error::{QueueError, Rejection, TransportError};
pub use preview::{PreviewHandle, PreviewRegistry};
pub use transport::{ChunkAck, ResumePoint, TransferOptions, upload_in_chunks};
pub use types::{CompletedUpload, SubmitReport, UploadCallbacks, UploadItemView, UploaderConfig};

pub use chunkwise_protocol::{UploadProgress, UploadStatus};
pub use chunkwise_transfer::UploadFile;
