//! Cache-first audio resolution from a local directory

use super::AudioResolver;
use async_trait::async_trait;
use cycle_common::AudioSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves `<cache_dir>/<audio_id>.<ext>` as a blob, else a remote URI
///
/// With no remote base configured, uncached audio resolves to nothing.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    cache_dir: PathBuf,
    extension: String,
    remote_base: Option<String>,
}

impl DirectoryResolver {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            extension: "mp3".to_string(),
            remote_base: None,
        }
    }

    /// Stream uncached audio from `<remote_base>/<audio_id>.<ext>`
    pub fn with_remote_base(mut self, remote_base: impl Into<String>) -> Self {
        self.remote_base = Some(remote_base.into().trim_end_matches('/').to_string());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Local path an audio id is cached at
    pub fn cached_path(&self, audio_id: &str) -> PathBuf {
        audio_path(&self.cache_dir, audio_id, &self.extension)
    }

    fn mime_type(&self) -> Option<String> {
        match self.extension.as_str() {
            "mp3" => Some("audio/mpeg".to_string()),
            "ogg" | "opus" => Some("audio/ogg".to_string()),
            "wav" => Some("audio/wav".to_string()),
            "m4a" | "aac" => Some("audio/mp4".to_string()),
            _ => None,
        }
    }
}

/// `<dir>/<audio_id>.<ext>`
pub(crate) fn audio_path(dir: &Path, audio_id: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}.{}", audio_id, extension))
}

#[async_trait]
impl AudioResolver for DirectoryResolver {
    async fn resolve_audio(&self, audio_id: &str) -> Option<AudioSource> {
        let path = self.cached_path(audio_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!("Resolved {} from cache ({} bytes)", audio_id, bytes.len());
                return Some(AudioSource::Blob {
                    data: Arc::from(bytes),
                    mime_type: self.mime_type(),
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to read cached audio {}: {}", path.display(), e),
        }

        let base = self.remote_base.as_ref()?;
        let uri = format!("{}/{}.{}", base, audio_id, self.extension);
        debug!("Resolved {} to remote {}", audio_id, uri);
        Some(AudioSource::Remote { uri })
    }
}
