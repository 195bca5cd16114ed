use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};

use crate::error::{ClientError, ClientResult};
use crate::models::{
    ContentPage, CreateUserResponse, Movie, RandomContentQuery, SaveItemRequest, TagsResponse,
    TvShow,
};

/// Raw, single-attempt operations against the content API
///
/// Each method performs exactly one HTTP round trip and maps a 401 to
/// `ClientError::AuthorizationExpired`. The reauthentication retry policy
/// lives one layer up, in the gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ContentApi: Send + Sync {
    /// POST /users
    async fn create_user(&self) -> ClientResult<CreateUserResponse>;

    /// GET /tags
    async fn list_tags(&self) -> ClientResult<TagsResponse>;

    /// GET /movies/random
    async fn random_movies<'a>(
        &self,
        query: &RandomContentQuery,
        access_key: Option<&'a str>,
    ) -> ClientResult<ContentPage<Movie>>;

    /// GET /tv_shows/random
    async fn random_tv_shows<'a>(
        &self,
        query: &RandomContentQuery,
        access_key: Option<&'a str>,
    ) -> ClientResult<ContentPage<TvShow>>;

    /// POST /user_movies
    async fn save_movie(&self, request: &SaveItemRequest, access_key: &str) -> ClientResult<()>;

    /// GET /user_movies
    async fn saved_movies(&self, access_key: &str) -> ClientResult<ContentPage<Movie>>;

    /// DELETE /user_movies/{id}
    async fn delete_saved_movie(&self, movie_id: u64, access_key: &str) -> ClientResult<()>;

    /// POST /user_tv_shows
    async fn save_tv_show(&self, request: &SaveItemRequest, access_key: &str) -> ClientResult<()>;

    /// GET /user_tv_shows
    async fn saved_tv_shows(&self, access_key: &str) -> ClientResult<ContentPage<TvShow>>;

    /// DELETE /user_tv_shows/{id}
    async fn delete_saved_tv_show(&self, tv_show_id: u64, access_key: &str) -> ClientResult<()>;
}

/// reqwest-backed `ContentApi` implementation
#[derive(Clone)]
pub struct HttpContentApi {
    http_client: HttpClient,
    base_url: String,
}

impl HttpContentApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(builder: RequestBuilder, access_key: Option<&str>) -> RequestBuilder {
        match access_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Maps a non-success status to the typed error taxonomy: 401 becomes
    /// `AuthorizationExpired`, everything else `RequestFailed` with the body
    /// attached for diagnostics.
    async fn check_status(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            tracing::debug!(status = %status, "Request rejected as unauthorized");
            return Err(ClientError::AuthorizationExpired);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %body, "Content API request failed");
        Err(ClientError::RequestFailed(format!(
            "API returned status {}: {}",
            status, body
        )))
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> ClientResult<T> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(error = %e, body = %text, "Failed to deserialize API response");
            ClientError::InvalidServerResponse(format!("malformed response body: {}", e))
        })
    }
}

#[async_trait::async_trait]
impl ContentApi for HttpContentApi {
    async fn create_user(&self) -> ClientResult<CreateUserResponse> {
        let response = self
            .http_client
            .post(self.url("/users"))
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        Self::json_body(response).await
    }

    async fn list_tags(&self) -> ClientResult<TagsResponse> {
        let response = self.http_client.get(self.url("/tags")).send().await?;
        let response = Self::check_status(response).await?;
        Self::json_body(response).await
    }

    async fn random_movies<'a>(
        &self,
        query: &RandomContentQuery,
        access_key: Option<&'a str>,
    ) -> ClientResult<ContentPage<Movie>> {
        let builder = self
            .http_client
            .get(self.url("/movies/random"))
            .query(&query.to_query_params());

        let response = Self::bearer(builder, access_key).send().await?;
        let response = Self::check_status(response).await?;
        Self::json_body(response).await
    }

    async fn random_tv_shows<'a>(
        &self,
        query: &RandomContentQuery,
        access_key: Option<&'a str>,
    ) -> ClientResult<ContentPage<TvShow>> {
        let builder = self
            .http_client
            .get(self.url("/tv_shows/random"))
            .query(&query.to_query_params());

        let response = Self::bearer(builder, access_key).send().await?;
        let response = Self::check_status(response).await?;
        Self::json_body(response).await
    }

    async fn save_movie(&self, request: &SaveItemRequest, access_key: &str) -> ClientResult<()> {
        let response = self
            .http_client
            .post(self.url("/user_movies"))
            .bearer_auth(access_key)
            .json(request)
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }

    async fn saved_movies(&self, access_key: &str) -> ClientResult<ContentPage<Movie>> {
        let response = self
            .http_client
            .get(self.url("/user_movies"))
            .bearer_auth(access_key)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        Self::json_body(response).await
    }

    async fn delete_saved_movie(&self, movie_id: u64, access_key: &str) -> ClientResult<()> {
        let response = self
            .http_client
            .delete(self.url(&format!("/user_movies/{}", movie_id)))
            .bearer_auth(access_key)
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }

    async fn save_tv_show(&self, request: &SaveItemRequest, access_key: &str) -> ClientResult<()> {
        let response = self
            .http_client
            .post(self.url("/user_tv_shows"))
            .bearer_auth(access_key)
            .json(request)
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }

    async fn saved_tv_shows(&self, access_key: &str) -> ClientResult<ContentPage<TvShow>> {
        let response = self
            .http_client
            .get(self.url("/user_tv_shows"))
            .bearer_auth(access_key)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        Self::json_body(response).await
    }

    async fn delete_saved_tv_show(&self, tv_show_id: u64, access_key: &str) -> ClientResult<()> {
        let response = self
            .http_client
            .delete(self.url(&format!("/user_tv_shows/{}", tv_show_id)))
            .bearer_auth(access_key)
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_path() {
        let api = HttpContentApi::new("https://example.test/api/v1");
        assert_eq!(api.url("/tags"), "https://example.test/api/v1/tags");
        assert_eq!(
            api.url("/user_movies/42"),
            "https://example.test/api/v1/user_movies/42"
        );
    }
}
