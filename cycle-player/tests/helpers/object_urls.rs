//! Object URL factory that records how many URLs were live at once

use cycle_player::audio::ObjectUrlFactory;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct CountingObjectUrls {
    live: Mutex<HashSet<String>>,
    created: AtomicUsize,
    revoked: AtomicUsize,
    peak_live: AtomicUsize,
    /// Revocations of URLs that were not live
    bad_revokes: AtomicUsize,
}

impl CountingObjectUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn revoked(&self) -> usize {
        self.revoked.load(Ordering::SeqCst)
    }

    pub fn peak_live(&self) -> usize {
        self.peak_live.load(Ordering::SeqCst)
    }

    pub fn bad_revokes(&self) -> usize {
        self.bad_revokes.load(Ordering::SeqCst)
    }
}

impl ObjectUrlFactory for CountingObjectUrls {
    fn create_object_url(&self, _data: Arc<[u8]>, _mime_type: Option<&str>) -> String {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        let url = format!("blob:test/{}", n);
        let mut live = self.live.lock().unwrap();
        live.insert(url.clone());
        self.peak_live.fetch_max(live.len(), Ordering::SeqCst);
        url
    }

    fn revoke_object_url(&self, url: &str) {
        if self.live.lock().unwrap().remove(url) {
            self.revoked.fetch_add(1, Ordering::SeqCst);
        } else {
            self.bad_revokes.fetch_add(1, Ordering::SeqCst);
        }
    }
}
