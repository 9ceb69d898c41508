use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Chunk endpoint
// ---------------------------------------------------------------------------

/// Form fields sent alongside every chunk body.
///
/// Serialized names match the multipart field names in
/// [`constants`](crate::constants).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub chunk_index: u64,
    pub total_chunks: u64,
    pub upload_id: String,
    pub file_name: String,
    pub file_size: u64,
}

// ---------------------------------------------------------------------------
// Finalize endpoint
// ---------------------------------------------------------------------------

/// JSON body of the finalize call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub upload_id: String,
    pub file_name: String,
}

/// Successful finalize response: the durable locator of the assembled file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeResponse {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_metadata_uses_camel_case_fields() {
        let meta = ChunkMetadata {
            chunk_index: 2,
            total_chunks: 3,
            upload_id: "u1".into(),
            file_name: "photo.png".into(),
            file_size: 2048,
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["chunkIndex"], 2);
        assert_eq!(json["totalChunks"], 3);
        assert_eq!(json["uploadId"], "u1");
        assert_eq!(json["fileName"], "photo.png");
        assert_eq!(json["fileSize"], 2048);
    }

    #[test]
    fn finalize_request_shape() {
        let req = FinalizeRequest {
            upload_id: "u1".into(),
            file_name: "a.txt".into(),
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"uploadId":"u1","fileName":"a.txt"}"#
        );
    }

    #[test]
    fn finalize_response_ignores_extra_fields() {
        let resp: FinalizeResponse =
            serde_json::from_str(r#"{"url":"https://cdn.example/a.txt","size":3}"#).unwrap();
        assert_eq!(resp.url, "https://cdn.example/a.txt");
    }

    #[test]
    fn finalize_response_requires_url() {
        assert!(serde_json::from_str::<FinalizeResponse>(r#"{"ok":true}"#).is_err());
    }
}
