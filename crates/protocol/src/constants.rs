/// Size for chunks when the caller does not configure one (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Path segment appended to the upload endpoint for the finalize call.
pub const FINALIZE_PATH: &str = "finalize";

/// Multipart field carrying the raw chunk bytes.
pub const FIELD_CHUNK: &str = "chunk";
/// Multipart field carrying the 0-based chunk index.
pub const FIELD_CHUNK_INDEX: &str = "chunkIndex";
/// Multipart field carrying the total chunk count for the file.
pub const FIELD_TOTAL_CHUNKS: &str = "totalChunks";
/// Multipart field carrying the transfer-scoped upload identifier.
pub const FIELD_UPLOAD_ID: &str = "uploadId";
/// Multipart field carrying the original file name.
pub const FIELD_FILE_NAME: &str = "fileName";
/// Multipart field carrying the full file size in bytes.
pub const FIELD_FILE_SIZE: &str = "fileSize";
/// Optional multipart field carrying the SHA-256 hex digest of the chunk.
pub const FIELD_CHUNK_CHECKSUM: &str = "chunkChecksum";
