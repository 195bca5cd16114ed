use std::sync::Arc;

use crate::api::{ContentApi, HttpContentApi};
use crate::config::Config;
use crate::error::ClientResult;
use crate::feed::{FeedFilters, FeedSession};
use crate::gateway::ContentGateway;
use crate::identity::IdentityProvider;
use crate::models::ContentType;
use crate::storage::{FileStorage, KeyValueStorage, TtlCache};
use crate::stores::{TagsStore, WatchlistStore};

/// Composition root wiring storage, identity, gateway and stores together
///
/// All dependencies flow in through constructors; nothing reaches for process
/// globals. One context is built at startup and shared by `Arc`.
pub struct AppContext {
    config: Config,
    gateway: Arc<ContentGateway>,
    watchlist: WatchlistStore,
    tags: TagsStore,
}

impl AppContext {
    /// Builds the production wiring: file-backed storage under
    /// `config.data_dir` and an HTTP client against `config.api_base_url`.
    pub fn from_config(config: Config) -> ClientResult<Self> {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::open(&config.data_dir)?);
        let api: Arc<dyn ContentApi> = Arc::new(HttpContentApi::new(&config.api_base_url));
        Ok(Self::with_parts(config, api, storage))
    }

    /// Builds a context from pre-constructed parts; the seam tests use to
    /// substitute in-memory storage and mock transports.
    pub fn with_parts(
        config: Config,
        api: Arc<dyn ContentApi>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self {
        let identity = Arc::new(IdentityProvider::new(Arc::clone(&api), Arc::clone(&storage)));
        let gateway = Arc::new(ContentGateway::new(api, identity));
        let cache = TtlCache::new(storage);

        let watchlist = WatchlistStore::new(Arc::clone(&gateway), cache.clone());
        let tags = TagsStore::new(Arc::clone(&gateway), cache);

        Self {
            config,
            gateway,
            watchlist,
            tags,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<ContentGateway> {
        &self.gateway
    }

    pub fn identity(&self) -> &Arc<IdentityProvider> {
        self.gateway.identity()
    }

    pub fn watchlist(&self) -> &WatchlistStore {
        &self.watchlist
    }

    pub fn tags(&self) -> &TagsStore {
        &self.tags
    }

    /// Opens a new discovery feed session for the given content type,
    /// carrying the configured country code.
    pub fn feed(&self, content_type: ContentType, filters: FeedFilters) -> FeedSession {
        FeedSession::new(
            Arc::clone(&self.gateway),
            content_type,
            filters,
            Some(self.config.country.clone()),
        )
    }
}
