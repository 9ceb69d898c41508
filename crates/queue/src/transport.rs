//! Chunk transport: one file, strictly sequential chunks, then finalize.

use chunkwise_protocol::{ChunkMetadata, FinalizeRequest, UploadProgress};
use chunkwise_transfer::{ChunkReader, UploadFile, chunk_progress};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::endpoint::{ChunkRequest, UploadEndpoint};
use crate::error::TransportError;

/// Where a previous attempt of the same file left off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    pub upload_id: String,
    /// First chunk the endpoint has not acknowledged.
    pub next_chunk: u64,
}

/// Acknowledgement of one chunk, passed to the progress hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkAck {
    pub upload_id: String,
    pub chunk_index: u64,
    pub total_chunks: u64,
    pub progress: UploadProgress,
}

impl ChunkAck {
    /// The point a later attempt would resume from.
    pub fn resume_point(&self) -> ResumePoint {
        ResumePoint {
            upload_id: self.upload_id.clone(),
            next_chunk: self.chunk_index + 1,
        }
    }
}

/// Per-transfer settings.
#[derive(Debug, Clone, Default)]
pub struct TransferOptions {
    /// Bytes per chunk; 0 means the default chunk size.
    pub chunk_size: usize,
    /// Attach a SHA-256 digest to every chunk.
    pub checksums: bool,
    /// Continue an earlier transfer instead of starting a new `uploadId`.
    pub resume: Option<ResumePoint>,
    /// Aborts the transfer, including a request already in flight.
    pub cancel: CancellationToken,
}

impl TransferOptions {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            ..Self::default()
        }
    }
}

/// Uploads `file` in chunks and returns the URL from the finalize call.
///
/// Chunks are posted in index order under one `uploadId`; the first
/// failure aborts the transfer. `on_progress` runs after every accepted
/// chunk with strictly increasing byte counts, the last reaching 100%.
/// An empty file sends no chunks but is still finalized.
pub async fn upload_in_chunks<F>(
    endpoint: &dyn UploadEndpoint,
    file: &UploadFile,
    options: &TransferOptions,
    mut on_progress: F,
) -> Result<String, TransportError>
where
    F: FnMut(&ChunkAck) + Send,
{
    let mut reader = ChunkReader::new(file.data().clone(), options.chunk_size, options.checksums);
    let total_chunks = reader.plan().total_chunks();

    let upload_id = match &options.resume {
        Some(resume) => {
            reader.seek_to_chunk(resume.next_chunk)?;
            resume.upload_id.clone()
        }
        None => Uuid::new_v4().to_string(),
    };

    debug!(
        upload_id = %upload_id,
        file = %file.name(),
        size = file.size(),
        total_chunks,
        start_chunk = reader.position(),
        "starting chunked transfer"
    );

    while let Some(chunk) = reader.next_chunk() {
        check_cancelled(&options.cancel)?;

        let chunk_index = chunk.index;
        let request = ChunkRequest {
            metadata: ChunkMetadata {
                chunk_index,
                total_chunks,
                upload_id: upload_id.clone(),
                file_name: file.name().to_string(),
                file_size: file.size(),
            },
            data: chunk.data,
            checksum: chunk.checksum,
        };

        let sent = tokio::select! {
            biased;
            _ = options.cancel.cancelled() => Err(TransportError::Cancelled),
            result = endpoint.send_chunk(request) => result,
        };
        sent?;

        let ack = ChunkAck {
            upload_id: upload_id.clone(),
            chunk_index,
            total_chunks,
            progress: chunk_progress(reader.plan(), chunk_index),
        };
        debug!(
            upload_id = %upload_id,
            chunk_index,
            total_chunks,
            percent = ack.progress.percent,
            "chunk acknowledged"
        );
        on_progress(&ack);
    }

    check_cancelled(&options.cancel)?;

    let finalize = FinalizeRequest {
        upload_id: upload_id.clone(),
        file_name: file.name().to_string(),
    };
    let finalized = tokio::select! {
        biased;
        _ = options.cancel.cancelled() => Err(TransportError::Cancelled),
        result = endpoint.finalize(finalize) => result,
    };
    let response = finalized.map_err(TransportError::finalize)?;

    if response.url.is_empty() {
        return Err(TransportError::finalize(TransportError::InvalidResponse(
            "finalize response has an empty url".into(),
        )));
    }

    info!(upload_id = %upload_id, file = %file.name(), url = %response.url, "upload finalized");
    Ok(response.url)
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), TransportError> {
    if cancel.is_cancelled() {
        Err(TransportError::Cancelled)
    } else {
        Ok(())
    }
}
