use serde::{Deserialize, Serialize};

/// Lifecycle state of one upload item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "uploading")]
    Uploading,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "error")]
    Error,
}

/// Transfer progress of one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
    pub percent: u8,
}

impl UploadProgress {
    /// Builds a progress value, clamping `bytes_sent` to `total_bytes`.
    ///
    /// `percent` is `round(bytes_sent / total_bytes * 100)`; an empty file
    /// reports 0 until it is marked [`complete`](Self::complete).
    pub fn new(bytes_sent: u64, total_bytes: u64) -> Self {
        let bytes_sent = bytes_sent.min(total_bytes);
        let percent = if total_bytes == 0 {
            0
        } else {
            (bytes_sent as f64 / total_bytes as f64 * 100.0).round() as u8
        };
        Self {
            bytes_sent,
            total_bytes,
            percent,
        }
    }

    /// Progress of a fully transferred file of `total_bytes`.
    pub fn complete(total_bytes: u64) -> Self {
        Self {
            bytes_sent: total_bytes,
            total_bytes,
            percent: 100,
        }
    }

    /// Bytes still to be sent.
    pub fn remaining(&self) -> u64 {
        self.total_bytes - self.bytes_sent
    }
}
