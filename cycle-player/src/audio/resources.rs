//! Audio resource ownership
//!
//! Owns the single reusable output handle and the single temporary object URL
//! slot. Acquiring a new temporary URL always revokes the previous one first,
//! so rapid skipping can never accumulate live URLs.

use super::object_url::ObjectUrlFactory;
use super::output::AudioOutput;
use cycle_common::AudioSource;
use std::sync::Arc;
use tracing::debug;

/// A source made addressable by the output device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSource {
    pub uri: String,
    /// True when `uri` is a temporary object URL that must be released
    pub temporary: bool,
}

/// Owner of the output handle and the temporary URL slot
pub struct AudioResourceManager {
    /// Created once, reused for every segment
    output: Arc<dyn AudioOutput>,
    object_urls: Arc<dyn ObjectUrlFactory>,
    /// At most one live temporary URL
    temp_uri: Option<String>,
}

impl AudioResourceManager {
    pub fn new(output: Arc<dyn AudioOutput>, object_urls: Arc<dyn ObjectUrlFactory>) -> Self {
        Self {
            output,
            object_urls,
            temp_uri: None,
        }
    }

    /// The shared output handle
    pub fn output(&self) -> Arc<dyn AudioOutput> {
        Arc::clone(&self.output)
    }

    /// Make a resolved source addressable
    ///
    /// Blobs get a fresh temporary URL; the previous one (if any) is revoked
    /// before the new one is created. Remote URIs pass through untouched.
    pub fn prepare(&mut self, source: &AudioSource) -> PreparedSource {
        match source {
            AudioSource::Blob { data, mime_type } => {
                self.revoke_temp_uri();
                let uri = self
                    .object_urls
                    .create_object_url(Arc::clone(data), mime_type.as_deref());
                debug!("Temporary URL {} created ({} bytes)", uri, data.len());
                self.temp_uri = Some(uri.clone());
                PreparedSource {
                    uri,
                    temporary: true,
                }
            }
            AudioSource::Remote { uri } => PreparedSource {
                uri: uri.clone(),
                temporary: false,
            },
        }
    }

    /// Release a temporary URL after its segment settled
    ///
    /// Only revokes if `uri` still occupies the slot; a newer acquisition has
    /// already revoked it otherwise. Returns true if a revoke happened.
    pub fn release(&mut self, uri: &str) -> bool {
        if self.temp_uri.as_deref() == Some(uri) {
            self.revoke_temp_uri();
            true
        } else {
            false
        }
    }

    /// Revoke the live temporary URL, if any
    pub fn revoke_temp_uri(&mut self) {
        if let Some(uri) = self.temp_uri.take() {
            self.object_urls.revoke_object_url(&uri);
            debug!("Temporary URL {} revoked", uri);
        }
    }

    /// Currently live temporary URL
    pub fn temp_uri(&self) -> Option<&str> {
        self.temp_uri.as_deref()
    }
}

impl Drop for AudioResourceManager {
    fn drop(&mut self) {
        self.revoke_temp_uri();
    }
}
