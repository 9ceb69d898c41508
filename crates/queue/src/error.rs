//! Queue error types.

use std::any::Any;

use chunkwise_transfer::{TransferError, ValidationError};

/// Failure of one chunk or finalize round-trip.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("upload endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Http(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("finalize failed: {0}")]
    Finalize(Box<TransportError>),

    #[error("transfer error: {0}")]
    Transfer(String),

    #[error("cancelled")]
    Cancelled,

    /// The endpoint panicked mid-transfer.
    #[error("upload aborted: {0}")]
    Aborted(String),
}

impl TransportError {
    /// Wraps an error from the finalize call.
    ///
    /// Cancellation is passed through unchanged.
    pub fn finalize(err: TransportError) -> Self {
        match err {
            TransportError::Cancelled | TransportError::Finalize(_) => err,
            other => TransportError::Finalize(Box::new(other)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }
}

impl From<TransferError> for TransportError {
    fn from(err: TransferError) -> Self {
        TransportError::Transfer(err.to_string())
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Errors from caller-facing queue operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("upload item not found: {0}")]
    NotFound(String),

    #[error("upload item {0} is not in the error state")]
    NotRetryable(String),
}

/// A file (or group of files) refused by `submit`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("{0}")]
    Invalid(ValidationError),

    #[error("too many files: at most {max_files} allowed, {} not added", .file_names.len())]
    Capacity {
        max_files: usize,
        file_names: Vec<String>,
    },

    #[error("only one file can be uploaded at a time, {} not added", .file_names.len())]
    SingleFileOnly { file_names: Vec<String> },

    #[error("uploads are disabled, {} not added", .file_names.len())]
    Disabled { file_names: Vec<String> },

    #[error("uploader has been shut down, {} not added", .file_names.len())]
    ShutDown { file_names: Vec<String> },
}

impl Rejection {
    /// Names of the files covered by this rejection.
    pub fn file_names(&self) -> Vec<&str> {
        match self {
            Rejection::Invalid(err) => vec![validation_file_name(err)],
            Rejection::Capacity { file_names, .. }
            | Rejection::SingleFileOnly { file_names }
            | Rejection::Disabled { file_names }
            | Rejection::ShutDown { file_names } => {
                file_names.iter().map(String::as_str).collect()
            }
        }
    }
}

fn validation_file_name(err: &ValidationError) -> &str {
    match err {
        ValidationError::InvalidName(name)
        | ValidationError::TooLarge { name, .. }
        | ValidationError::TypeNotAccepted { name, .. } => name,
    }
}
