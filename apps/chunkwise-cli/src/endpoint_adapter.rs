//! Bridges the HTTP `Client` to the queue's `UploadEndpoint` trait.

use std::future::Future;
use std::pin::Pin;

use chunkwise_client::{Client, Error as ClientError};
use chunkwise_protocol::{FinalizeRequest, FinalizeResponse};
use chunkwise_queue::{ChunkRequest, TransportError, UploadEndpoint};

/// Implements `UploadEndpoint` by delegating to `chunkwise_client::Client`.
pub struct HttpEndpoint {
    client: Client,
}

impl HttpEndpoint {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl UploadEndpoint for HttpEndpoint {
    fn send_chunk(
        &self,
        request: ChunkRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>> {
        Box::pin(async move {
            self.client
                .send_chunk(&request.metadata, request.data, request.checksum.as_deref())
                .await
                .map_err(map_error)
        })
    }

    fn finalize(
        &self,
        request: FinalizeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<FinalizeResponse, TransportError>> + Send + '_>> {
        Box::pin(async move { self.client.finalize(&request).await.map_err(map_error) })
    }
}

fn map_error(err: ClientError) -> TransportError {
    match err {
        ClientError::Api { status, body } => TransportError::Status { status, body },
        ClientError::Json(e) => TransportError::InvalidResponse(e.to_string()),
        ClientError::Http(e) => TransportError::Http(e.to_string()),
        ClientError::InvalidToken => TransportError::Http("invalid bearer token".into()),
    }
}
