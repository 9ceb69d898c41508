//! Upload endpoint trait.
//!
//! `UploadEndpoint` is implemented by the application on top of an HTTP
//! client. Using a trait keeps queue logic decoupled from transport and
//! testable with mocks.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use chunkwise_protocol::{ChunkMetadata, FinalizeRequest, FinalizeResponse};

use crate::error::TransportError;

/// One chunk submission: form fields plus the byte slice.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub metadata: ChunkMetadata,
    pub data: Bytes,
    /// SHA-256 hex digest of `data`, when checksums are enabled.
    pub checksum: Option<String>,
}

/// Abstract remote upload endpoint.
pub trait UploadEndpoint: Send + Sync {
    /// Submits one chunk. Any non-success response is an error.
    fn send_chunk(
        &self,
        request: ChunkRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>>;

    /// Finalizes the transfer identified by `request.upload_id`.
    fn finalize(
        &self,
        request: FinalizeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<FinalizeResponse, TransportError>> + Send + '_>>;
}
