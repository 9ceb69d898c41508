use std::fmt;

use crate::progress::format_size;
use crate::types::UploadFile;

/// Why a file was refused at admission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error("{name} is too large ({}); the limit is {}", human(.size), human(.max))]
    TooLarge { name: String, size: u64, max: u64 },

    #[error("{name} has type {media_type}, which is not accepted (allowed: {accept})")]
    TypeNotAccepted {
        name: String,
        media_type: String,
        accept: String,
    },
}

fn human(bytes: &u64) -> String {
    format_size(*bytes)
}

// ---------------------------------------------------------------------------
// Accept list
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum AcceptEntry {
    /// `.png`: matched against the end of the file name.
    Suffix(String),
    /// `image/*`: stored as `image/`.
    MediaTypePrefix(String),
    /// `application/pdf`.
    MediaType(String),
}

/// A parsed comma-separated accept pattern such as `image/*,.pdf`.
///
/// Matching is ASCII case-insensitive; blank entries are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptList {
    entries: Vec<AcceptEntry>,
    source: String,
}

impl AcceptList {
    pub fn parse(pattern: &str) -> Self {
        let entries = pattern
            .split(',')
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .map(|e| {
                if e.starts_with('.') {
                    AcceptEntry::Suffix(e)
                } else if let Some(prefix) = e.strip_suffix('*') {
                    AcceptEntry::MediaTypePrefix(prefix.to_string())
                } else {
                    AcceptEntry::MediaType(e)
                }
            })
            .collect();
        Self {
            entries,
            source: pattern.trim().to_string(),
        }
    }

    /// Returns `true` if the list has no usable entries (accepts everything).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if either the media type or the name suffix matches.
    pub fn matches(&self, name: &str, media_type: &str) -> bool {
        if self.entries.is_empty() {
            return true;
        }
        let name = name.to_ascii_lowercase();
        let media_type = media_type.to_ascii_lowercase();

        self.entries.iter().any(|entry| match entry {
            AcceptEntry::Suffix(suffix) => name.ends_with(suffix.as_str()),
            AcceptEntry::MediaTypePrefix(prefix) => media_type.starts_with(prefix.as_str()),
            AcceptEntry::MediaType(exact) => media_type == *exact,
        })
    }
}

impl fmt::Display for AcceptList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// ---------------------------------------------------------------------------
// Admission checks
// ---------------------------------------------------------------------------

/// Validates that a file name is a single, non-empty path component.
///
/// The name is sent verbatim as the `fileName` field, so separators and
/// `..` are refused before anything reaches the network.
pub fn validate_file_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0')
    {
        return Err(ValidationError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Checks a candidate file against the admission constraints.
///
/// Returns the first violated constraint: name, then size, then type.
pub fn validate_file(
    file: &UploadFile,
    max_size_bytes: u64,
    accept: Option<&AcceptList>,
) -> Result<(), ValidationError> {
    validate_file_name(file.name())?;

    if file.size() > max_size_bytes {
        return Err(ValidationError::TooLarge {
            name: file.name().to_string(),
            size: file.size(),
            max: max_size_bytes,
        });
    }

    if let Some(accept) = accept
        && !accept.matches(file.name(), file.media_type())
    {
        return Err(ValidationError::TypeNotAccepted {
            name: file.name().to_string(),
            media_type: file.media_type().to_string(),
            accept: accept.to_string(),
        });
    }

    Ok(())
}
