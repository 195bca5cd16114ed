use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::api::ContentApi;
use crate::error::{ClientError, ClientResult};
use crate::identity::IdentityProvider;
use crate::models::{
    ContentItem, ContentPage, ContentType, Movie, RandomContentQuery, SaveItemRequest, Tag, TvShow,
};

type OpFuture<T> = Pin<Box<dyn Future<Output = ClientResult<T>> + Send>>;

/// Typed façade over the content API
///
/// Authenticated operations are wrapped in a retry-after-reauthentication
/// policy: on a 401 the credential is cleared, a fresh one obtained, and the
/// call retried exactly once. The server can invalidate credentials at any
/// time (e.g. a data reset), so the client self-heals once without user
/// friction but never loops.
pub struct ContentGateway {
    api: Arc<dyn ContentApi>,
    identity: Arc<IdentityProvider>,
}

impl ContentGateway {
    pub fn new(api: Arc<dyn ContentApi>, identity: Arc<IdentityProvider>) -> Self {
        Self { api, identity }
    }

    pub fn identity(&self) -> &Arc<IdentityProvider> {
        &self.identity
    }

    /// Runs `op` with the current credential, reauthenticating and retrying
    /// exactly once if the server answers 401. A 401 on the retry escalates
    /// to `RequestFailed`; any other error propagates untouched.
    async fn with_reauth<T>(&self, op: impl Fn(String) -> OpFuture<T>) -> ClientResult<T> {
        let key = match self.identity.access_key().await {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, "Could not obtain access credential");
                return Err(ClientError::AuthenticationRequired);
            }
        };

        match op(key).await {
            Err(ClientError::AuthorizationExpired) => {
                tracing::info!("Access key rejected, reauthenticating and retrying once");
                self.identity.clear_user().await?;

                let fresh = match self.identity.initialize_user().await {
                    Ok(key) => key,
                    Err(e) => {
                        tracing::warn!(error = %e, "Reauthentication failed");
                        return Err(ClientError::AuthenticationRequired);
                    }
                };

                op(fresh).await.map_err(|e| match e {
                    ClientError::AuthorizationExpired => ClientError::RequestFailed(
                        "request rejected as unauthorized after reauthentication".to_string(),
                    ),
                    other => other,
                })
            }
            result => result,
        }
    }

    /// Saves a movie or TV show to the user's watchlist
    pub async fn save_item(&self, item: &ContentItem) -> ClientResult<()> {
        let request = SaveItemRequest::from(item);
        let api = Arc::clone(&self.api);
        let content_type = item.content_type();

        self.with_reauth(move |key| -> OpFuture<()> {
            let api = Arc::clone(&api);
            let request = request.clone();
            Box::pin(async move {
                match content_type {
                    ContentType::Movie => api.save_movie(&request, &key).await,
                    ContentType::TvShow => api.save_tv_show(&request, &key).await,
                }
            })
        })
        .await
    }

    /// Removes a saved item from the user's watchlist
    pub async fn remove_item(&self, item: &ContentItem) -> ClientResult<()> {
        let api = Arc::clone(&self.api);
        let content_type = item.content_type();
        let id = item.id();

        self.with_reauth(move |key| -> OpFuture<()> {
            let api = Arc::clone(&api);
            Box::pin(async move {
                match content_type {
                    ContentType::Movie => api.delete_saved_movie(id, &key).await,
                    ContentType::TvShow => api.delete_saved_tv_show(id, &key).await,
                }
            })
        })
        .await
    }

    /// Lists the user's saved movies
    pub async fn saved_movies(&self) -> ClientResult<Vec<Movie>> {
        let api = Arc::clone(&self.api);
        let page = self
            .with_reauth(move |key| -> OpFuture<ContentPage<Movie>> {
                let api = Arc::clone(&api);
                Box::pin(async move { api.saved_movies(&key).await })
            })
            .await?;

        Ok(if page.success { page.data } else { Vec::new() })
    }

    /// Lists the user's saved TV shows
    pub async fn saved_tv_shows(&self) -> ClientResult<Vec<TvShow>> {
        let api = Arc::clone(&self.api);
        let page = self
            .with_reauth(move |key| -> OpFuture<ContentPage<TvShow>> {
                let api = Arc::clone(&api);
                Box::pin(async move { api.saved_tv_shows(&key).await })
            })
            .await?;

        Ok(if page.success { page.data } else { Vec::new() })
    }

    /// Fetches the taxonomy tag list (no credential required)
    pub async fn list_tags(&self) -> ClientResult<Vec<Tag>> {
        Ok(self.api.list_tags().await?.tags)
    }

    /// Fetches a random movie batch. The credential is optional here: it only
    /// lets the server mark items the user already saved, so a persisted key
    /// is passed along when present but never created for this call.
    pub async fn random_movies(
        &self,
        query: &RandomContentQuery,
    ) -> ClientResult<ContentPage<Movie>> {
        let access_key = self.identity.peek_access_key().await;
        self.api.random_movies(query, access_key.as_deref()).await
    }

    /// Fetches a random TV show batch; credential handling as for movies
    pub async fn random_tv_shows(
        &self,
        query: &RandomContentQuery,
    ) -> ClientResult<ContentPage<TvShow>> {
        let access_key = self.identity.peek_access_key().await;
        self.api.random_tv_shows(query, access_key.as_deref()).await
    }
}
