//! Wire types shared by the chunked upload client and the upload queue.
//!
//! Two endpoints are consumed: a multipart chunk endpoint that accepts one
//! byte-range slice per call, and a JSON finalize endpoint that assembles
//! the chunks of one `uploadId` into a durable object.

pub mod constants;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use messages::{ChunkMetadata, FinalizeRequest, FinalizeResponse};
pub use types::{UploadProgress, UploadStatus};
