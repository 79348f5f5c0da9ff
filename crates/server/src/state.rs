//! Application state shared across handlers.

use drover_core::config::AppConfig;
use drover_metadata::MetadataStore;
use drover_storage::BlobStore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex};

/// Shared application state. No coordination state lives here: everything a
/// request needs beyond its own scope is in the metadata store.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Coordination control plane.
    pub metadata: Arc<dyn MetadataStore>,
    /// Archive bucket gateway.
    pub blobs: Arc<dyn BlobStore>,
    /// Dispatch lottery RNG. Seedable so tests can pin the draw sequence;
    /// never held across an await.
    pub lottery: Arc<Mutex<StdRng>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Panics
    ///
    /// Panics if configuration validation fails; a server with a bad verify
    /// threshold must not come up.
    pub fn new(
        config: AppConfig,
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        if let Err(error) = config.validate() {
            panic!("Invalid configuration: {}", error);
        }

        Self {
            config: Arc::new(config),
            metadata,
            blobs,
            lottery: Arc::new(Mutex::new(StdRng::from_os_rng())),
        }
    }

    /// Replace the dispatch lottery with a deterministically seeded RNG.
    /// For tests of the dispatch probability law.
    pub fn seed_lottery(&self, seed: u64) {
        *self.lottery.lock().expect("lottery lock poisoned") = StdRng::seed_from_u64(seed);
    }
}
