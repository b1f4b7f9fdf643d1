//! Temporary object URLs for in-memory audio blobs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::trace;

/// Platform facility turning a blob into an addressable URI
pub trait ObjectUrlFactory: Send + Sync {
    /// Materialize a temporary URI for the given bytes
    fn create_object_url(&self, data: Arc<[u8]>, mime_type: Option<&str>) -> String;

    /// Invalidate a URI created by `create_object_url`
    fn revoke_object_url(&self, url: &str);
}

/// In-memory object URL registry
///
/// URLs look like `blob:cycle/<n>` and resolve back to their bytes until revoked.
#[derive(Default)]
pub struct MemoryObjectUrls {
    live: Mutex<HashMap<String, Arc<[u8]>>>,
    next_id: AtomicU64,
    created_total: AtomicU64,
    revoked_total: AtomicU64,
}

impl MemoryObjectUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes behind a live URL
    pub fn get(&self, url: &str) -> Option<Arc<[u8]>> {
        self.lock().get(url).cloned()
    }

    /// Number of URLs created and not yet revoked
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    pub fn created_total(&self) -> u64 {
        self.created_total.load(Ordering::Relaxed)
    }

    pub fn revoked_total(&self) -> u64 {
        self.revoked_total.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<[u8]>>> {
        self.live.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ObjectUrlFactory for MemoryObjectUrls {
    fn create_object_url(&self, data: Arc<[u8]>, _mime_type: Option<&str>) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let url = format!("blob:cycle/{}", id);
        self.lock().insert(url.clone(), data);
        self.created_total.fetch_add(1, Ordering::Relaxed);
        trace!("Created object URL {}", url);
        url
    }

    fn revoke_object_url(&self, url: &str) {
        if self.lock().remove(url).is_some() {
            self.revoked_total.fetch_add(1, Ordering::Relaxed);
            trace!("Revoked object URL {}", url);
        }
    }
}
