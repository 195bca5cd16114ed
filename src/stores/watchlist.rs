use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, ClientResult};
use crate::gateway::ContentGateway;
use crate::models::{ContentItem, ContentType, Movie, TvShow};
use crate::storage::{CacheKey, TtlCache};

/// Watchlist collections go stale quickly; five minutes keeps returning
/// users fast without showing long-deleted items for long.
pub const WATCHLIST_TTL_MINUTES: i64 = 5;

/// How concurrent optimistic mutations are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationPolicy {
    /// Snapshot the affected collection before mutating and restore it
    /// wholesale if the network call fails. Known gap: when an add and a
    /// remove overlap, the earlier call's rollback can restore a snapshot
    /// taken before the later call ran, resurrecting an item the later call
    /// removed.
    #[default]
    Snapshot,
    /// Hold a per-store lock for the whole mutation, so add/remove pairs
    /// never interleave and rollbacks only ever see their own changes.
    Serialized,
}

/// Observable watchlist state
#[derive(Debug, Clone, Default)]
pub struct WatchlistState {
    pub movies: Vec<Movie>,
    pub tv_shows: Vec<TvShow>,
    pub is_loading: bool,
    pub is_stale: bool,
    /// Epoch milliseconds of the last successful fetch or cache adoption
    pub last_fetched: Option<i64>,
    pub error: Option<String>,
}

enum CollectionSnapshot {
    Movies(Vec<Movie>),
    TvShows(Vec<TvShow>),
}

/// Optimistic-update manager for the user's saved movies and TV shows
///
/// The remote server is the source of truth; this store keeps an optimistic
/// in-memory mirror, writes snapshots through to the durable cache, and
/// serves membership queries synchronously. State lock scopes never span an
/// await, which is what keeps `contains` and `state` synchronous.
pub struct WatchlistStore {
    gateway: Arc<ContentGateway>,
    cache: TtlCache,
    state: Arc<RwLock<WatchlistState>>,
    mutation_policy: MutationPolicy,
    mutation_lock: tokio::sync::Mutex<()>,
    cancel: CancellationToken,
}

impl WatchlistStore {
    pub fn new(gateway: Arc<ContentGateway>, cache: TtlCache) -> Self {
        Self::with_mutation_policy(gateway, cache, MutationPolicy::default())
    }

    pub fn with_mutation_policy(
        gateway: Arc<ContentGateway>,
        cache: TtlCache,
        mutation_policy: MutationPolicy,
    ) -> Self {
        Self {
            gateway,
            cache,
            state: Arc::new(RwLock::new(WatchlistState::default())),
            mutation_policy,
            mutation_lock: tokio::sync::Mutex::new(()),
            cancel: CancellationToken::new(),
        }
    }

    fn read(state: &RwLock<WatchlistState>) -> RwLockReadGuard<'_, WatchlistState> {
        state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(state: &RwLock<WatchlistState>) -> RwLockWriteGuard<'_, WatchlistState> {
        state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the current state
    pub fn state(&self) -> WatchlistState {
        Self::read(&self.state).clone()
    }

    /// Synchronous membership test by `(type, id)`; touches neither network
    /// nor cache, so it reflects optimistic mutations immediately.
    pub fn contains(&self, item: &ContentItem) -> bool {
        let state = Self::read(&self.state);
        match item.content_type() {
            ContentType::Movie => state.movies.iter().any(|m| m.id == item.id()),
            ContentType::TvShow => state.tv_shows.iter().any(|t| t.id == item.id()),
        }
    }

    /// Adopts cached collections if any exist, scheduling a background
    /// refresh when they are stale; with no cache at all, falls through to a
    /// foreground `fetch`.
    pub async fn hydrate(&self) {
        let (movies_cached, tv_cached) = tokio::join!(
            self.cache.peek::<Vec<Movie>>(&CacheKey::WatchlistMovies),
            self.cache.peek::<Vec<TvShow>>(&CacheKey::WatchlistTvShows),
        );

        if movies_cached.is_none() && tv_cached.is_none() {
            self.fetch().await;
            return;
        }

        // A missing half counts as stale: a crash between the two cache
        // writes heals on the refresh this triggers.
        let is_stale = movies_cached.as_ref().map_or(true, |c| c.is_stale)
            || tv_cached.as_ref().map_or(true, |c| c.is_stale);

        {
            let mut state = Self::write(&self.state);
            state.movies = movies_cached.map(|c| c.data).unwrap_or_default();
            state.tv_shows = tv_cached.map(|c| c.data).unwrap_or_default();
            state.is_stale = is_stale;
            state.last_fetched = Some(Utc::now().timestamp_millis());
        }

        tracing::debug!(stale = is_stale, "Watchlist hydrated from cache");

        if is_stale {
            self.spawn_background_refresh();
        }
    }

    /// Foreground fetch: toggles `is_loading`, surfaces failures in the
    /// `error` field, and never throws.
    pub async fn fetch(&self) {
        {
            let mut state = Self::write(&self.state);
            state.is_loading = true;
            state.error = None;
        }

        let (movies_res, tv_shows_res) =
            tokio::join!(self.gateway.saved_movies(), self.gateway.saved_tv_shows());

        if self.cancel.is_cancelled() {
            return;
        }

        match (movies_res, tv_shows_res) {
            (Ok(movies), Ok(tv_shows)) => {
                {
                    let mut state = Self::write(&self.state);
                    state.movies = movies.clone();
                    state.tv_shows = tv_shows.clone();
                    state.is_loading = false;
                    state.is_stale = false;
                    state.last_fetched = Some(Utc::now().timestamp_millis());
                    state.error = None;
                }

                tracing::info!(
                    movies = movies.len(),
                    tv_shows = tv_shows.len(),
                    "Watchlist fetched"
                );

                tokio::join!(
                    self.cache
                        .set(&CacheKey::WatchlistMovies, &movies, WATCHLIST_TTL_MINUTES),
                    self.cache
                        .set(&CacheKey::WatchlistTvShows, &tv_shows, WATCHLIST_TTL_MINUTES),
                );
            }
            (movies_res, tv_shows_res) => {
                if let Some(e) = movies_res.err().or_else(|| tv_shows_res.err()) {
                    tracing::error!(error = %e, "Error fetching watchlist");
                    let message = match e {
                        ClientError::AuthenticationRequired => "Authentication required",
                        _ => "Failed to load watchlist",
                    };
                    let mut state = Self::write(&self.state);
                    state.is_loading = false;
                    state.error = Some(message.to_string());
                }
            }
        }
    }

    /// Background refresh: same data fetch as `fetch` but invisible — it
    /// never toggles `is_loading` and failures are only logged, because it
    /// runs behind already-displayed data.
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
        state: Arc<RwLock<WatchlistState>>,
        cancel: CancellationToken,
    ) {
        let (movies_res, tv_shows_res) =
            tokio::join!(gateway.saved_movies(), gateway.saved_tv_shows());

        match (movies_res, tv_shows_res) {
            (Ok(movies), Ok(tv_shows)) => {
                // The owning store may have been dropped while the request
                // was in flight; adopt nothing in that case.
                if cancel.is_cancelled() {
                    tracing::debug!("Watchlist store torn down, discarding refresh result");
                    return;
                }

                {
                    let mut state = Self::write(&state);
                    state.movies = movies.clone();
                    state.tv_shows = tv_shows.clone();
                    state.is_stale = false;
                    state.last_fetched = Some(Utc::now().timestamp_millis());
                    state.error = None;
                }

                tokio::join!(
                    cache.set(&CacheKey::WatchlistMovies, &movies, WATCHLIST_TTL_MINUTES),
                    cache.set(&CacheKey::WatchlistTvShows, &tv_shows, WATCHLIST_TTL_MINUTES),
                );
            }
            (movies_res, tv_shows_res) => {
                if let Some(e) = movies_res.err().or_else(|| tv_shows_res.err()) {
                    tracing::warn!(error = %e, "Background watchlist refresh failed");
                }
            }
        }
    }

    /// Optimistically appends `item`, then saves it remotely. On failure the
    /// collection is restored from the pre-mutation snapshot and the error
    /// re-thrown so the caller can surface it.
    pub async fn add(&self, item: ContentItem) -> ClientResult<()> {
        let _guard = match self.mutation_policy {
            MutationPolicy::Serialized => Some(self.mutation_lock.lock().await),
            MutationPolicy::Snapshot => None,
        };

        let snapshot = {
            let mut state = Self::write(&self.state);
            match &item {
                ContentItem::Movie(m) => {
                    let snapshot = CollectionSnapshot::Movies(state.movies.clone());
                    state.movies.push(m.clone());
                    snapshot
                }
                ContentItem::TvShow(t) => {
                    let snapshot = CollectionSnapshot::TvShows(state.tv_shows.clone());
                    state.tv_shows.push(t.clone());
                    snapshot
                }
            }
        };

        match self.gateway.save_item(&item).await {
            Ok(()) => {
                self.persist_collections().await;
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, title = %item.title(), "Failed to add to watchlist, rolling back");
                self.restore(snapshot);
                Err(e)
            }
        }
    }

    /// Optimistically removes `item` by id, then deletes it remotely, with
    /// the same rollback shape as `add`.
    pub async fn remove(&self, item: ContentItem) -> ClientResult<()> {
        let _guard = match self.mutation_policy {
            MutationPolicy::Serialized => Some(self.mutation_lock.lock().await),
            MutationPolicy::Snapshot => None,
        };

        let snapshot = {
            let mut state = Self::write(&self.state);
            match &item {
                ContentItem::Movie(m) => {
                    let snapshot = CollectionSnapshot::Movies(state.movies.clone());
                    let id = m.id;
                    state.movies.retain(|movie| movie.id != id);
                    snapshot
                }
                ContentItem::TvShow(t) => {
                    let snapshot = CollectionSnapshot::TvShows(state.tv_shows.clone());
                    let id = t.id;
                    state.tv_shows.retain(|tv_show| tv_show.id != id);
                    snapshot
                }
            }
        };

        match self.gateway.remove_item(&item).await {
            Ok(()) => {
                self.persist_collections().await;
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, title = %item.title(), "Failed to remove from watchlist, rolling back");
                self.restore(snapshot);
                Err(e)
            }
        }
    }

    /// Clears in-memory state and deletes both cache entries; used on
    /// sign-out.
    pub async fn reset(&self) {
        {
            let mut state = Self::write(&self.state);
            *state = WatchlistState::default();
        }
        tokio::join!(
            self.cache.remove(&CacheKey::WatchlistMovies),
            self.cache.remove(&CacheKey::WatchlistTvShows),
        );
    }

    fn restore(&self, snapshot: CollectionSnapshot) {
        let mut state = Self::write(&self.state);
        match snapshot {
            CollectionSnapshot::Movies(movies) => state.movies = movies,
            CollectionSnapshot::TvShows(tv_shows) => state.tv_shows = tv_shows,
        }
    }

    async fn persist_collections(&self) {
        let (movies, tv_shows) = {
            let state = Self::read(&self.state);
            (state.movies.clone(), state.tv_shows.clone())
        };
        tokio::join!(
            self.cache
                .set(&CacheKey::WatchlistMovies, &movies, WATCHLIST_TTL_MINUTES),
            self.cache
                .set(&CacheKey::WatchlistTvShows, &tv_shows, WATCHLIST_TTL_MINUTES),
        );
    }
}

impl Drop for WatchlistStore {
    fn drop(&mut self) {
        // Detached refresh tasks check this token before touching state
        self.cancel.cancel();
    }
}
