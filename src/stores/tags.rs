use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::gateway::ContentGateway;
use crate::models::Tag;
use crate::storage::{CacheKey, TtlCache};

/// Tags change far less often than a watchlist
pub const TAGS_TTL_MINUTES: i64 = 60;

/// Observable tags state
#[derive(Debug, Clone, Default)]
pub struct TagsState {
    pub tags: Vec<Tag>,
    pub is_loading: bool,
    pub is_stale: bool,
    pub last_fetched: Option<i64>,
    pub error: Option<String>,
}

/// Read-mostly store for the taxonomy tag list
///
/// Same hydrate/fetch/refresh shape as the watchlist store, minus mutations.
pub struct TagsStore {
    gateway: Arc<ContentGateway>,
    cache: TtlCache,
    state: Arc<RwLock<TagsState>>,
    cancel: CancellationToken,
}

impl TagsStore {
    pub fn new(gateway: Arc<ContentGateway>, cache: TtlCache) -> Self {
        Self {
            gateway,
            cache,
            state: Arc::new(RwLock::new(TagsState::default())),
            cancel: CancellationToken::new(),
        }
    }

    fn read(state: &RwLock<TagsState>) -> RwLockReadGuard<'_, TagsState> {
        state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(state: &RwLock<TagsState>) -> RwLockWriteGuard<'_, TagsState> {
        state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the current state
    pub fn state(&self) -> TagsState {
        Self::read(&self.state).clone()
    }

    /// Adopts the cached tag list if present, refreshing in the background
    /// when stale; with no cache, falls through to a foreground `fetch`.
    pub async fn hydrate(&self) {
        let cached = self.cache.peek::<Vec<Tag>>(&CacheKey::AvailableTags).await;

        let Some(cached) = cached else {
            self.fetch().await;
            return;
        };

        let is_stale = cached.is_stale;
        {
            let mut state = Self::write(&self.state);
            state.tags = cached.data;
            state.is_stale = is_stale;
            state.last_fetched = Some(Utc::now().timestamp_millis());
        }

        if is_stale {
            self.spawn_background_refresh();
        }
    }

    /// Foreground fetch with loading indicator
    pub async fn fetch(&self) {
        {
            let mut state = Self::write(&self.state);
            state.is_loading = true;
            state.error = None;
        }

        match self.gateway.list_tags().await {
            Ok(tags) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                {
                    let mut state = Self::write(&self.state);
                    state.tags = tags.clone();
                    state.is_loading = false;
                    state.is_stale = false;
                    state.last_fetched = Some(Utc::now().timestamp_millis());
                    state.error = None;
                }
                self.cache
                    .set(&CacheKey::AvailableTags, &tags, TAGS_TTL_MINUTES)
                    .await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Error fetching tags");
                let mut state = Self::write(&self.state);
                state.is_loading = false;
                state.error = Some("Network error loading tags".to_string());
            }
        }
    }

    /// Background refresh: never toggles `is_loading`, failures only logged
    pub async fn refresh(&self) {
        Self::refresh_inner(
            Arc::clone(&self.gateway),
            self.cache.clone(),
            Arc::clone(&self.state),
            self.cancel.clone(),
        )
        .await;
    }

    fn spawn_background_refresh(&self) {
        let gateway = Arc::clone(&self.gateway);
        let cache = self.cache.clone();
        let state = Arc::clone(&self.state);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            Self::refresh_inner(gateway, cache, state, cancel).await;
        });
    }

    async fn refresh_inner(
        gateway: Arc<ContentGateway>,
        cache: TtlCache,
        state: Arc<RwLock<TagsState>>,
        cancel: CancellationToken,
    ) {
        match gateway.list_tags().await {
            Ok(tags) => {
                if cancel.is_cancelled() {
                    tracing::debug!("Tags store torn down, discarding refresh result");
                    return;
                }
                {
                    let mut state = Self::write(&state);
                    state.tags = tags.clone();
                    state.is_stale = false;
                    state.last_fetched = Some(Utc::now().timestamp_millis());
                    state.error = None;
                }
                cache
                    .set(&CacheKey::AvailableTags, &tags, TAGS_TTL_MINUTES)
                    .await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Background tags refresh failed");
            }
        }
    }

    /// Clears in-memory state and the cache entry
    pub async fn reset(&self) {
        {
            let mut state = Self::write(&self.state);
            *state = TagsState::default();
        }
        self.cache.remove(&CacheKey::AvailableTags).await;
    }
}

impl Drop for TagsStore {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
