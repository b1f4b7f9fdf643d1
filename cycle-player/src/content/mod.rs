//! Content collaborators
//!
//! Interfaces the engine consumes but does not own: audio resolution, the
//! local cache view of the cycle catalog, and the optional mastered-content
//! pool. Directory- and memory-backed implementations are provided.

pub mod catalog;
pub mod resolver;

pub use catalog::{CatalogFile, DirectoryCatalog, StaticCatalog};
pub use resolver::DirectoryResolver;

use async_trait::async_trait;
use cycle_common::{AudioSource, Cycle};

/// Resolves an audio reference to playable audio
///
/// Resolution is asynchronous with no latency guarantee. `None` means the
/// audio is not available from any source.
#[async_trait]
pub trait AudioResolver: Send + Sync {
    async fn resolve_audio(&self, audio_id: &str) -> Option<AudioSource>;
}

/// Local cache view of the cycle catalog
pub trait CycleCache: Send + Sync {
    /// True when every audio reference of the cycle is available offline
    fn is_cycle_cached(&self, cycle: &Cycle) -> bool;

    /// The full universe of known cycles the cached pool is filtered from
    fn cached_cycles(&self) -> Vec<Cycle>;
}

/// Already-mastered content, feeding the `use-phrases` degradation level
pub trait MasteredPool: Send + Sync {
    fn mastered_cycles(&self) -> Vec<Cycle>;
}
