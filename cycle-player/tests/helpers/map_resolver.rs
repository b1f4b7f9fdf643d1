//! Map-backed audio resolver

use async_trait::async_trait;
use cycle_common::{AudioSource, Cycle};
use cycle_player::content::AudioResolver;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Resolves audio ids from an in-memory map
#[derive(Default)]
pub struct MapResolver {
    sources: Mutex<HashMap<String, AudioSource>>,
    latency: Option<Duration>,
    lookups: AtomicUsize,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blob sources for every audio id of every cycle
    pub fn with_blobs_for(cycles: &[Cycle]) -> Self {
        let resolver = Self::new();
        for cycle in cycles {
            for audio_id in cycle.audio_ids() {
                resolver.insert(audio_id, AudioSource::blob(audio_id.as_bytes().to_vec()));
            }
        }
        resolver
    }

    /// Every resolution waits this long first
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, audio_id: &str, source: AudioSource) {
        self.sources
            .lock()
            .unwrap()
            .insert(audio_id.to_string(), source);
    }

    pub fn remove(&self, audio_id: &str) {
        self.sources.lock().unwrap().remove(audio_id);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioResolver for MapResolver {
    async fn resolve_audio(&self, audio_id: &str) -> Option<AudioSource> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.sources.lock().unwrap().get(audio_id).cloned()
    }
}
