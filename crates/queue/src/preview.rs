//! Local previews for image items.
//!
//! A [`PreviewHandle`] owns one preview locator and releases it exactly
//! once, either explicitly or when dropped. The [`PreviewRegistry`] tracks
//! which locators are live so leaks are observable.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use chunkwise_transfer::UploadFile;
use tracing::debug;
use uuid::Uuid;

const PREVIEW_SCHEME: &str = "preview:";

/// Allocates preview handles and tracks which are still live.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    live: Arc<Mutex<HashSet<String>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a preview for `file` if it is an image.
    pub fn allocate(&self, file: &UploadFile) -> Option<PreviewHandle> {
        if !file.is_image() {
            return None;
        }
        let url = format!("{PREVIEW_SCHEME}{}", Uuid::new_v4());
        self.live().insert(url.clone());
        debug!(url = %url, file = %file.name(), "preview allocated");
        Some(PreviewHandle {
            url,
            data: Some(file.data().clone()),
            registry: self.clone(),
        })
    }

    /// Number of previews allocated and not yet released.
    pub fn live_count(&self) -> usize {
        self.live().len()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live().contains(url)
    }

    fn live(&self) -> MutexGuard<'_, HashSet<String>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, url: &str) {
        if self.live().remove(url) {
            debug!(url = %url, "preview released");
        }
    }
}

/// An owned preview locator, released on drop.
#[derive(Debug)]
pub struct PreviewHandle {
    url: String,
    data: Option<Bytes>,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Image bytes backing the preview, until released.
    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.data.is_none()
    }

    /// Releases the preview. Safe to call more than once.
    pub fn release(&mut self) {
        if self.data.take().is_some() {
            self.registry.release(&self.url);
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_images_get_previews() {
        let registry = PreviewRegistry::new();
        assert!(registry.allocate(&UploadFile::from_name("notes.txt", "hi")).is_none());

        let handle = registry
            .allocate(&UploadFile::from_name("cat.png", vec![1u8, 2, 3]))
            .unwrap();
        assert!(handle.url().starts_with("preview:"));
        assert_eq!(&handle.data().unwrap()[..], &[1u8, 2, 3]);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn drop_releases() {
        let registry = PreviewRegistry::new();
        let handle = registry.allocate(&UploadFile::from_name("a.jpg", "x")).unwrap();
        let url = handle.url().to_string();
        assert!(registry.is_live(&url));

        drop(handle);
        assert!(!registry.is_live(&url));
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn release_is_idempotent() {
        let registry = PreviewRegistry::new();
        let mut first = registry.allocate(&UploadFile::from_name("a.gif", "x")).unwrap();
        let _second = registry.allocate(&UploadFile::from_name("b.gif", "y")).unwrap();

        first.release();
        first.release();
        assert!(first.is_released());
        assert!(first.data().is_none());
        assert_eq!(registry.live_count(), 1);

        drop(first);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn previews_have_distinct_urls() {
        let registry = PreviewRegistry::new();
        let file = UploadFile::from_name("a.webp", "x");
        let a = registry.allocate(&file).unwrap();
        let b = registry.allocate(&file).unwrap();
        assert_ne!(a.url(), b.url());
    }
}
