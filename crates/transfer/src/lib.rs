//! Chunk planning, progress math and admission validation.
//!
//! Everything here is synchronous and side-effect free; the network lives
//! in `chunkwise-client` and the work queue in `chunkwise-queue`.

mod chunked;
mod progress;
mod types;
mod validation;

pub use chunked::{ChunkPlan, ChunkReader, checksum_bytes};
pub use progress::{SpeedCalculator, chunk_progress, format_size, resume_progress};
pub use types::{Chunk, UploadFile, media_type_for_name};
pub use validation::{AcceptList, ValidationError, validate_file, validate_file_name};

pub use chunkwise_protocol::constants::DEFAULT_CHUNK_SIZE;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("chunk {index} out of range (file has {total} chunks)")]
    ChunkOutOfRange { index: u64, total: u64 },
}
