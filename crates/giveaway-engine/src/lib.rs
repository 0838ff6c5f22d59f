pub mod admin;
pub mod debounce;
pub mod draw;
pub mod error;
pub mod gate;
pub mod platform;
pub mod scheduler;
pub mod submit;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use giveaway_crypto::TokenCodec;
use giveaway_db::Database;

pub use error::{EngineError, EngineResult};
pub use platform::{ChannelRef, PlatformClient, PlatformError};

use debounce::RequestDebouncer;
use platform::Platform;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Channels every participant must belong to before entering anything.
    pub mandatory_channels: Vec<ChannelRef>,
    pub debounce_window: Duration,
    /// Upper bound on a single platform query.
    pub query_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            mandatory_channels: Vec::new(),
            debounce_window: Duration::from_secs(2),
            query_timeout: Duration::from_secs(10),
        }
    }
}

/// Entry intake, eligibility, draws and the scheduled passes over them.
/// Cheap to clone; clones share the store, codec and debounce state.
pub struct Engine<P> {
    inner: Arc<Inner<P>>,
}

struct Inner<P> {
    db: Arc<Database>,
    codec: TokenCodec,
    platform: Platform<P>,
    debouncer: RequestDebouncer,
    mandatory_channels: Vec<ChannelRef>,
}

impl<P> Clone for Engine<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: PlatformClient> Engine<P> {
    pub fn new(db: Arc<Database>, codec: TokenCodec, platform: Arc<P>, settings: EngineSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                db,
                codec,
                platform: Platform::new(platform, settings.query_timeout),
                debouncer: RequestDebouncer::new(settings.debounce_window),
                mandatory_channels: settings.mandatory_channels,
            }),
        }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.inner.db
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.inner.codec
    }

    /// Run a store call on the blocking pool.
    pub(crate) async fn store<F, T>(&self, f: F) -> EngineResult<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.inner.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await?
            .map_err(EngineError::Store)
    }
}
