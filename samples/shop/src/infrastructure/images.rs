//! Image storage port and an in-memory adapter.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use storefront::prelude::*;
use thiserror::Error;
use tracing::debug;

/// Failures reported by an image store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageStoreError {
    /// The upload body was empty.
    #[error("image '{0}' is empty")]
    Empty(String),
    /// The store could not be reached.
    #[error("image store is unavailable")]
    Unavailable,
}

impl From<ImageStoreError> for ErrorInfo {
    fn from(error: ImageStoreError) -> Self {
        Self::bad_gateway(format!("Image upload failed: {error}."))
    }
}

/// Uploads image bytes and returns their public URL.
pub trait ImageStore: Send + Sync + fmt::Debug {
    /// Stores `bytes` under `key`.
    fn upload(&self, key: String, bytes: Vec<u8>) -> Effect<Fin<String>>;
}

/// Keeps uploaded objects in memory. Can be switched offline for tests.
#[derive(Clone, Debug)]
pub struct InMemoryImageStore {
    base_url: Arc<str>,
    objects: Arc<Mutex<BTreeMap<String, usize>>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryImageStore {
    /// A store serving objects under `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Arc::from(base_url.into().trim_end_matches('/')),
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes every later upload fail with [`ImageStoreError::Unavailable`].
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    /// Keys of the stored objects, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }
}

impl Default for InMemoryImageStore {
    fn default() -> Self {
        Self::new("memory://images")
    }
}

impl ImageStore for InMemoryImageStore {
    fn upload(&self, key: String, bytes: Vec<u8>) -> Effect<Fin<String>> {
        let store = self.clone();
        Effect::lift_async(move |token| async move {
            ensure_active(&token)?;
            if store.offline.load(Ordering::SeqCst) {
                return Err(ImageStoreError::Unavailable.into());
            }
            if bytes.is_empty() {
                return Err(ImageStoreError::Empty(key).into());
            }
            debug!(%key, size = bytes.len(), "image stored");
            store.objects.lock().insert(key.clone(), bytes.len());
            Ok(format!("{}/{key}", store.base_url))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn upload_returns_public_url() {
        let store = InMemoryImageStore::new("https://cdn.example/");
        let url = store
            .upload("products/1/cover".to_owned(), vec![1, 2, 3])
            .run(CancellationToken::new())
            .await;

        assert_eq!(url, Ok("https://cdn.example/products/1/cover".to_owned()));
        assert_eq!(store.keys(), vec!["products/1/cover".to_owned()]);
    }

    #[rstest]
    #[tokio::test]
    async fn offline_store_is_a_bad_gateway() {
        let store = InMemoryImageStore::default();
        store.go_offline();
        let error = store
            .upload("k".to_owned(), vec![1])
            .run(CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::BadGateway);
        assert_eq!(error.message(), "Image upload failed: image store is unavailable.");
        assert!(store.keys().is_empty());
    }
}
