//! Driving-out port for the external image host.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use super::define_port_error;

define_port_error! {
    /// Failures reported by image host adapters.
    pub enum ImageStoreError {
        /// The host refused the upload.
        Rejected { message: String } => "image host rejected the upload: {message}",
        /// The host could not be reached.
        Unavailable { message: String } => "image host unavailable: {message}",
    }
}

/// Driving-out port wrapping the host's upload endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload image bytes, returning the hosted secure URL.
    async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ImageStoreError>;
}

/// In-memory image store used when no real host is configured and by
/// handler tests. Remembers what was uploaded so tests can assert on it.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    uploads: Mutex<Vec<String>>,
}

impl MemoryImageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filenames uploaded so far, in order.
    pub fn uploaded(&self) -> Vec<String> {
        self.guard().clone()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<String>> {
        self.uploads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn upload(
        &self,
        filename: &str,
        _content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ImageStoreError> {
        if bytes.is_empty() {
            return Err(ImageStoreError::rejected("empty upload"));
        }
        self.guard().push(filename.to_owned());
        Ok(format!(
            "https://images.newsecho.invalid/{}/{filename}",
            Uuid::new_v4().simple()
        ))
    }
}
