//! Upload endpoint client.
//!
//! Async HTTP client using `reqwest`, with optional Bearer token
//! authentication supplied by the caller.

use std::time::Duration;

use bytes::Bytes;
use chunkwise_protocol::constants::{
    FIELD_CHUNK, FIELD_CHUNK_CHECKSUM, FIELD_CHUNK_INDEX, FIELD_FILE_NAME, FIELD_FILE_SIZE,
    FIELD_TOTAL_CHUNKS, FIELD_UPLOAD_ID, FINALIZE_PATH,
};
use chunkwise_protocol::{ChunkMetadata, FinalizeRequest, FinalizeResponse};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use tracing::debug;

/// Errors from the upload client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid bearer token")]
    InvalidToken,
}

/// Connection options for [`Client`].
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Sent as `Authorization: Bearer <token>` on every request.
    pub bearer_token: Option<String>,
    /// Per-request timeout; `None` leaves reqwest's default (no timeout).
    pub timeout: Option<Duration>,
}

/// Client for one upload endpoint and its finalize companion.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    upload_url: String,
    finalize_url: String,
}

impl Client {
    /// Creates a client for `upload_url` (e.g. `https://host/api/upload`).
    pub fn new(upload_url: &str, options: ClientOptions) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        if let Some(token) = options.bearer_token.as_deref() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| Error::InvalidToken)?,
            );
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        let upload_url = upload_url.trim_end_matches('/').to_string();
        let finalize_url = format!("{upload_url}/{FINALIZE_PATH}");
        Ok(Self {
            http,
            upload_url,
            finalize_url,
        })
    }

    /// The chunk endpoint URL.
    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// The finalize endpoint URL.
    pub fn finalize_url(&self) -> &str {
        &self.finalize_url
    }

    /// Sends one chunk as a multipart form. Any 2xx is success.
    pub async fn send_chunk(
        &self,
        meta: &ChunkMetadata,
        data: Bytes,
        checksum: Option<&str>,
    ) -> Result<(), Error> {
        let len = data.len() as u64;
        let chunk = Part::stream_with_length(data, len)
            .file_name(meta.file_name.clone())
            .mime_str("application/octet-stream")?;

        let mut form = Form::new()
            .part(FIELD_CHUNK, chunk)
            .text(FIELD_CHUNK_INDEX, meta.chunk_index.to_string())
            .text(FIELD_TOTAL_CHUNKS, meta.total_chunks.to_string())
            .text(FIELD_UPLOAD_ID, meta.upload_id.clone())
            .text(FIELD_FILE_NAME, meta.file_name.clone())
            .text(FIELD_FILE_SIZE, meta.file_size.to_string());
        if let Some(checksum) = checksum {
            form = form.text(FIELD_CHUNK_CHECKSUM, checksum.to_string());
        }

        let resp = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        debug!(
            upload_id = %meta.upload_id,
            chunk_index = meta.chunk_index,
            total_chunks = meta.total_chunks,
            bytes = len,
            "chunk accepted"
        );
        Ok(())
    }

    /// Finalizes an upload and returns the durable locator.
    pub async fn finalize(&self, req: &FinalizeRequest) -> Result<FinalizeResponse, Error> {
        let resp = self.http.post(&self.finalize_url).json(req).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn meta(index: u64) -> ChunkMetadata {
        ChunkMetadata {
            chunk_index: index,
            total_chunks: 3,
            upload_id: "upload-1".into(),
            file_name: "notes.txt".into(),
            file_size: 10,
        }
    }

    #[test]
    fn finalize_url_derived_from_upload_url() {
        let client = Client::new("http://localhost:9000/api/upload/", ClientOptions::default())
            .unwrap();
        assert_eq!(client.upload_url(), "http://localhost:9000/api/upload");
        assert_eq!(
            client.finalize_url(),
            "http://localhost:9000/api/upload/finalize"
        );
    }

    #[test]
    fn rejects_token_with_newline() {
        let options = ClientOptions {
            bearer_token: Some("bad\ntoken".into()),
            timeout: None,
        };
        assert!(matches!(
            Client::new("http://localhost", options),
            Err(Error::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn send_chunk_posts_multipart_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".into()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="chunkIndex"\s+1\s"#.into()),
                Matcher::Regex(r#"name="totalChunks"\s+3\s"#.into()),
                Matcher::Regex(r#"name="uploadId"\s+upload-1\s"#.into()),
                Matcher::Regex(r#"name="fileName"\s+notes\.txt\s"#.into()),
                Matcher::Regex(r#"name="fileSize"\s+10\s"#.into()),
                Matcher::Regex(r#"name="chunk"; filename="notes\.txt""#.into()),
                Matcher::Regex("EFGH".into()),
            ]))
            .with_status(200)
            .create_async()
            .await;

        let client = Client::new(&format!("{}/upload", server.url()), ClientOptions::default())
            .unwrap();
        client
            .send_chunk(&meta(1), Bytes::from_static(b"EFGH"), None)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn send_chunk_includes_checksum_when_given() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_body(Matcher::Regex(r#"name="chunkChecksum"\s+abc123\s"#.into()))
            .with_status(204)
            .create_async()
            .await;

        let client = Client::new(&format!("{}/upload", server.url()), ClientOptions::default())
            .unwrap();
        client
            .send_chunk(&meta(0), Bytes::from_static(b"ABCD"), Some("abc123"))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn send_chunk_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_header("authorization", "Bearer s3cret")
            .with_status(200)
            .create_async()
            .await;

        let options = ClientOptions {
            bearer_token: Some("s3cret".into()),
            timeout: Some(Duration::from_secs(5)),
        };
        let client = Client::new(&format!("{}/upload", server.url()), options).unwrap();
        client
            .send_chunk(&meta(0), Bytes::from_static(b"ABCD"), None)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn send_chunk_non_2xx_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/upload")
            .with_status(503)
            .with_body("storage unavailable")
            .create_async()
            .await;

        let client = Client::new(&format!("{}/upload", server.url()), ClientOptions::default())
            .unwrap();
        let err = client
            .send_chunk(&meta(0), Bytes::from_static(b"ABCD"), None)
            .await
            .unwrap_err();

        match err {
            Error::Api { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "storage unavailable");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn finalize_returns_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/finalize")
            .match_body(Matcher::Json(serde_json::json!({
                "uploadId": "upload-1",
                "fileName": "notes.txt",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"url":"https://cdn.example/notes.txt"}"#)
            .create_async()
            .await;

        let client = Client::new(&format!("{}/upload", server.url()), ClientOptions::default())
            .unwrap();
        let resp = client
            .finalize(&FinalizeRequest {
                upload_id: "upload-1".into(),
                file_name: "notes.txt".into(),
            })
            .await
            .unwrap();

        assert_eq!(resp.url, "https://cdn.example/notes.txt");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn finalize_undecodable_body_is_json_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/upload/finalize")
            .with_status(200)
            .with_body("assembled")
            .create_async()
            .await;

        let client = Client::new(&format!("{}/upload", server.url()), ClientOptions::default())
            .unwrap();
        let err = client
            .finalize(&FinalizeRequest {
                upload_id: "u".into(),
                file_name: "f".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[tokio::test]
    async fn finalize_non_2xx_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/upload/finalize")
            .with_status(409)
            .with_body("missing chunks")
            .create_async()
            .await;

        let client = Client::new(&format!("{}/upload", server.url()), ClientOptions::default())
            .unwrap();
        let err = client
            .finalize(&FinalizeRequest {
                upload_id: "u".into(),
                file_name: "f".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 409, .. }));
    }
}
