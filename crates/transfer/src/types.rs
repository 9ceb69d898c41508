use std::path::Path;

use bytes::Bytes;

/// Media type used when a file declares none and its extension is unknown.
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// An immutable file payload with its declared name and media type.
///
/// Cloning is cheap: the bytes are reference-counted and never copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    name: String,
    media_type: String,
    data: Bytes,
}

impl UploadFile {
    /// Creates a file with an explicit media type.
    ///
    /// An empty `media_type` is replaced by one guessed from the name.
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        let mut media_type = media_type.into();
        if media_type.is_empty() {
            media_type = media_type_for_name(&name).to_string();
        }
        Self {
            name,
            media_type,
            data: data.into(),
        }
    }

    /// Creates a file whose media type is guessed from its extension.
    pub fn from_name(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::new(name, String::new(), data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns `true` for `image/*` media types.
    pub fn is_image(&self) -> bool {
        self.media_type
            .get(..6)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
    }
}

/// A contiguous byte-range slice of a file, the unit of one network call.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 0-based position of this chunk within the file.
    pub index: u64,
    /// Byte offset within the file.
    pub offset: u64,
    /// Raw chunk data (a view into the file's bytes).
    pub data: Bytes,
    /// SHA-256 hex checksum of `data`, when requested.
    pub checksum: Option<String>,
}

/// Guesses a media type from a file name's extension.
pub fn media_type_for_name(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("pdf") => "application/pdf",
        Some("json") => "application/json",
        Some("zip") => "application/zip",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        _ => FALLBACK_MEDIA_TYPE,
    }
}
