use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ClientResult;
use crate::gateway::ContentGateway;
use crate::models::{ContentItem, ContentType, RandomContentQuery};

/// Items requested when a discovery list first loads
pub const INITIAL_PAGE_SIZE: u32 = 20;
/// Items requested per load-more batch
pub const LOAD_MORE_BATCH_SIZE: u32 = 5;
/// Load-more fires when the visible position is within this many items of
/// the end of the loaded sequence
pub const LOAD_MORE_THRESHOLD: usize = 2;

/// One slot in a discovery list
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEntry {
    Item(ContentItem),
    /// Terminal sentinel, appended exactly once when the feed is exhausted,
    /// to drive an "end of results" UI state
    EndOfResults,
}

/// Active filter dimensions for a discovery session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedFilters {
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub stream_providers: Vec<String>,
}

/// Pagination and dedup state for one infinite-scroll discovery list
///
/// The server is asked to exclude already-seen identifiers, but responses
/// are still filtered against the session's own seen-set: exclusion lists
/// grow without bound and some servers cap their length, and truncation must
/// not reintroduce duplicates.
///
/// A session is owned by the screen displaying it; dropping it (or changing
/// filters) discards any in-flight result with it.
pub struct FeedSession {
    gateway: Arc<ContentGateway>,
    content_type: ContentType,
    filters: FeedFilters,
    country: Option<String>,
    initial_limit: u32,
    batch_limit: u32,
    entries: Vec<FeedEntry>,
    seen: HashSet<String>,
    has_more: bool,
    loading: bool,
    loading_more: bool,
}

impl FeedSession {
    pub fn new(
        gateway: Arc<ContentGateway>,
        content_type: ContentType,
        filters: FeedFilters,
        country: Option<String>,
    ) -> Self {
        Self {
            gateway,
            content_type,
            filters,
            country,
            initial_limit: INITIAL_PAGE_SIZE,
            batch_limit: LOAD_MORE_BATCH_SIZE,
            entries: Vec::new(),
            seen: HashSet::new(),
            has_more: true,
            loading: false,
            loading_more: false,
        }
    }

    /// Overrides the default page sizes
    pub fn with_page_sizes(mut self, initial_limit: u32, batch_limit: u32) -> Self {
        self.initial_limit = initial_limit;
        self.batch_limit = batch_limit;
        self
    }

    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    /// Loaded items, excluding the sentinel
    pub fn items(&self) -> impl Iterator<Item = &ContentItem> {
        self.entries.iter().filter_map(|entry| match entry {
            FeedEntry::Item(item) => Some(item),
            FeedEntry::EndOfResults => None,
        })
    }

    pub fn item_count(&self) -> usize {
        self.items().count()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading || self.loading_more
    }

    /// Whether the terminal sentinel has been appended
    pub fn is_exhausted(&self) -> bool {
        self.entries.last() == Some(&FeedEntry::EndOfResults)
    }

    /// Whether the UI at `visible_index` should trigger a load-more
    pub fn should_load_more(&self, visible_index: usize) -> bool {
        visible_index + LOAD_MORE_THRESHOLD >= self.item_count()
            && self.has_more
            && !self.loading_more
            && !self.is_exhausted()
    }

    /// Replaces the whole session with a fresh first page
    pub async fn initial_load(&mut self) -> ClientResult<()> {
        if self.loading {
            return Ok(());
        }
        self.loading = true;
        let result = self.initial_load_inner().await;
        self.loading = false;
        result
    }

    async fn initial_load_inner(&mut self) -> ClientResult<()> {
        let batch = self.fetch_batch(self.initial_limit, Vec::new()).await?;
        let returned = batch.len();

        self.seen = batch.iter().map(|item| item.imdbid().to_string()).collect();
        self.entries = batch.into_iter().map(FeedEntry::Item).collect();
        // The server returning a short page is a (non-authoritative) signal
        // of exhaustion.
        self.has_more = returned == self.initial_limit as usize;

        tracing::debug!(
            content_type = %self.content_type,
            returned,
            has_more = self.has_more,
            "Feed initial load complete"
        );
        Ok(())
    }

    /// Fetches one more batch, excluding everything already in the session.
    /// A batch that nets zero new items after dedup marks the session
    /// exhausted and appends the terminal sentinel; later calls are no-ops.
    pub async fn load_more(&mut self) -> ClientResult<()> {
        if self.loading_more || !self.has_more || self.is_exhausted() {
            return Ok(());
        }
        self.loading_more = true;
        let result = self.load_more_inner().await;
        self.loading_more = false;
        result
    }

    async fn load_more_inner(&mut self) -> ClientResult<()> {
        let exclude: Vec<String> = self
            .items()
            .map(|item| item.imdbid().to_string())
            .collect();

        let batch = self.fetch_batch(self.batch_limit, exclude).await?;

        let mut appended = 0usize;
        for item in batch {
            // Safety net on top of server-side exclusion
            if self.seen.insert(item.imdbid().to_string()) {
                self.entries.push(FeedEntry::Item(item));
                appended += 1;
            }
        }

        if appended == 0 {
            self.has_more = false;
            self.entries.push(FeedEntry::EndOfResults);
            tracing::debug!(content_type = %self.content_type, "Feed exhausted");
        }

        tracing::debug!(
            content_type = %self.content_type,
            appended,
            total = self.item_count(),
            "Feed load-more complete"
        );
        Ok(())
    }

    /// Applying a different filter set discards the session and restarts
    /// from an initial load; an identical set is a no-op.
    pub async fn set_filters(&mut self, filters: FeedFilters) -> ClientResult<()> {
        if filters == self.filters {
            return Ok(());
        }
        self.filters = filters;
        self.entries.clear();
        self.seen.clear();
        self.has_more = true;
        self.initial_load().await
    }

    async fn fetch_batch(
        &self,
        limit: u32,
        exclude_ids: Vec<String>,
    ) -> ClientResult<Vec<ContentItem>> {
        let query = RandomContentQuery {
            limit,
            genres: self.filters.genres.clone(),
            tags: self.filters.tags.clone(),
            stream_providers: self.filters.stream_providers.clone(),
            exclude_ids,
            country: self.country.clone(),
        };

        match self.content_type {
            ContentType::Movie => {
                let page = self.gateway.random_movies(&query).await?;
                if !page.success {
                    return Ok(Vec::new());
                }
                Ok(page.data.into_iter().map(ContentItem::Movie).collect())
            }
            ContentType::TvShow => {
                let page = self.gateway.random_tv_shows(&query).await?;
                if !page.success {
                    return Ok(Vec::new());
                }
                Ok(page.data.into_iter().map(ContentItem::TvShow).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ContentApi, MockContentApi};
    use crate::identity::IdentityProvider;
    use crate::models::test_fixtures::movie;
    use crate::models::{ContentPage, Movie};
    use crate::storage::{KeyValueStorage, MemoryStorage};

    fn session_with(api: MockContentApi) -> FeedSession {
        let storage = Arc::new(MemoryStorage::new());
        let api: Arc<dyn ContentApi> = Arc::new(api);
        let identity = Arc::new(IdentityProvider::new(
            Arc::clone(&api),
            storage as Arc<dyn KeyValueStorage>,
        ));
        let gateway = Arc::new(ContentGateway::new(api, identity));
        FeedSession::new(gateway, ContentType::Movie, FeedFilters::default(), None)
    }

    fn page(movies: Vec<Movie>) -> ClientResult<ContentPage<Movie>> {
        Ok(ContentPage {
            success: true,
            data: movies,
            meta: None,
        })
    }

    #[tokio::test]
    async fn test_initial_load_fills_session_and_has_more() {
        let mut api = MockContentApi::new();
        api.expect_random_movies()
            .times(1)
            .withf(|query, _| query.limit == 3 && query.exclude_ids.is_empty())
            .returning(|_, _| page(vec![movie(1, "ttA"), movie(2, "ttB"), movie(3, "ttC")]));

        let mut session = session_with(api).with_page_sizes(3, 2);
        session.initial_load().await.unwrap();

        assert_eq!(session.item_count(), 3);
        assert!(session.has_more());
        assert!(!session.is_exhausted());
    }

    #[tokio::test]
    async fn test_short_initial_page_clears_has_more() {
        let mut api = MockContentApi::new();
        api.expect_random_movies()
            .times(1)
            .returning(|_, _| page(vec![movie(1, "ttA")]));

        let mut session = session_with(api).with_page_sizes(3, 2);
        session.initial_load().await.unwrap();

        assert_eq!(session.item_count(), 1);
        assert!(!session.has_more());
    }

    #[tokio::test]
    async fn test_load_more_excludes_seen_and_dedups_response() {
        let mut api = MockContentApi::new();
        api.expect_random_movies()
            .times(1)
            .withf(|query, _| query.exclude_ids.is_empty())
            .returning(|_, _| page(vec![movie(1, "ttA"), movie(2, "ttB"), movie(3, "ttC")]));
        // Server ignores part of the exclusion list and resends B
        api.expect_random_movies()
            .times(1)
            .withf(|query, _| {
                query.exclude_ids == vec!["ttA", "ttB", "ttC"]
            })
            .returning(|_, _| page(vec![movie(2, "ttB"), movie(4, "ttD")]));

        let mut session = session_with(api).with_page_sizes(3, 2);
        session.initial_load().await.unwrap();
        session.load_more().await.unwrap();

        let ids: Vec<&str> = session.items().map(|i| i.imdbid()).collect();
        assert_eq!(ids, vec!["ttA", "ttB", "ttC", "ttD"]);
        assert!(session.has_more());
    }

    #[tokio::test]
    async fn test_exhaustion_appends_sentinel_once_and_stops() {
        let mut api = MockContentApi::new();
        api.expect_random_movies()
            .times(1)
            .returning(|_, _| page(vec![movie(1, "ttA"), movie(2, "ttB"), movie(3, "ttC")]));
        // Everything in the load-more response is already seen
        api.expect_random_movies()
            .times(1)
            .returning(|_, _| page(vec![movie(1, "ttA")]));

        let mut session = session_with(api).with_page_sizes(3, 2);
        session.initial_load().await.unwrap();
        session.load_more().await.unwrap();

        assert!(!session.has_more());
        assert!(session.is_exhausted());
        assert_eq!(session.entries().last(), Some(&FeedEntry::EndOfResults));
        assert_eq!(
            session
                .entries()
                .iter()
                .filter(|e| **e == FeedEntry::EndOfResults)
                .count(),
            1
        );

        // Further load-more attempts are no-ops: the mock would panic on an
        // unexpected third call.
        session.load_more().await.unwrap();
        assert_eq!(session.item_count(), 3);
    }

    #[tokio::test]
    async fn test_should_load_more_near_end_only() {
        let mut api = MockContentApi::new();
        api.expect_random_movies().times(1).returning(|_, _| {
            page(vec![
                movie(1, "ttA"),
                movie(2, "ttB"),
                movie(3, "ttC"),
                movie(4, "ttD"),
                movie(5, "ttE"),
            ])
        });

        let mut session = session_with(api).with_page_sizes(5, 2);
        session.initial_load().await.unwrap();

        assert!(!session.should_load_more(0));
        assert!(!session.should_load_more(2));
        assert!(session.should_load_more(3));
        assert!(session.should_load_more(4));
    }

    #[tokio::test]
    async fn test_filter_change_resets_session() {
        let mut api = MockContentApi::new();
        api.expect_random_movies()
            .times(1)
            .withf(|query, _| query.genres.is_empty())
            .returning(|_, _| page(vec![movie(1, "ttA"), movie(2, "ttB")]));
        api.expect_random_movies()
            .times(1)
            .withf(|query, _| {
                query.genres == vec!["Drama"] && query.exclude_ids.is_empty()
            })
            .returning(|_, _| page(vec![movie(3, "ttC"), movie(4, "ttD")]));

        let mut session = session_with(api).with_page_sizes(2, 2);
        session.initial_load().await.unwrap();

        session
            .set_filters(FeedFilters {
                genres: vec!["Drama".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();

        let ids: Vec<&str> = session.items().map(|i| i.imdbid()).collect();
        assert_eq!(ids, vec!["ttC", "ttD"]);
        assert!(session.has_more());
    }

    #[tokio::test]
    async fn test_identical_filters_are_a_noop() {
        let mut api = MockContentApi::new();
        api.expect_random_movies()
            .times(1)
            .returning(|_, _| page(vec![movie(1, "ttA"), movie(2, "ttB")]));

        let mut session = session_with(api).with_page_sizes(2, 2);
        session.initial_load().await.unwrap();

        session.set_filters(FeedFilters::default()).await.unwrap();
        assert_eq!(session.item_count(), 2);
    }
}
