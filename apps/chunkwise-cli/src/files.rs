//! Loading files from disk.

use std::path::Path;

use anyhow::Context;
use chunkwise_queue::UploadFile;

/// Reads `path` into an [`UploadFile`] named after its final component.
pub async fn load_upload_file(path: &Path) -> anyhow::Result<UploadFile> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .with_context(|| format!("{} has no usable file name", path.display()))?
        .to_string();
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(UploadFile::from_name(name, data))
}
