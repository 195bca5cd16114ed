use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type of content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Movie,
    TvShow,
}

impl Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Movie => write!(f, "movie"),
            ContentType::TvShow => write!(f, "tv_show"),
        }
    }
}

/// Membership key for the watchlist: an item is present or absent by
/// `(type, id)`, never by any descriptive field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentKey {
    pub content_type: ContentType,
    pub id: u64,
}

/// Streaming availability per country as reported by the content API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WatchProviders {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub stream: Vec<String>,
    #[serde(default)]
    pub rent: Vec<String>,
    #[serde(default)]
    pub buy: Vec<String>,
}

/// A movie as returned by the content API
///
/// Descriptive fields are immutable from the client's perspective; the client
/// only ever changes an item's watchlist membership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: u64,
    pub imdbid: String,
    pub title: String,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub imdb_rating: Option<f32>,
    #[serde(default)]
    pub rotten_tomatoes_rating: Option<f32>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    /// Server-side hint that the requesting user already saved this item.
    /// Membership truth lives in the watchlist store, not here.
    #[serde(default)]
    pub is_saved: bool,
    #[serde(default)]
    pub watch_providers: Option<WatchProviders>,
}

/// A TV show as returned by the content API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TvShow {
    pub id: u64,
    pub imdbid: String,
    pub title: String,
    #[serde(default)]
    pub first_air_year: Option<i32>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub creators: Vec<String>,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub imdb_rating: Option<f32>,
    #[serde(default)]
    pub rotten_tomatoes_rating: Option<f32>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub is_saved: bool,
    #[serde(default)]
    pub watch_providers: Option<WatchProviders>,
}

/// A movie or TV show, discriminated by the wire-level `type` field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Movie(Movie),
    TvShow(TvShow),
}

impl ContentItem {
    pub fn content_type(&self) -> ContentType {
        match self {
            ContentItem::Movie(_) => ContentType::Movie,
            ContentItem::TvShow(_) => ContentType::TvShow,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            ContentItem::Movie(m) => m.id,
            ContentItem::TvShow(t) => t.id,
        }
    }

    /// Stable external identifier used for cross-request deduplication
    pub fn imdbid(&self) -> &str {
        match self {
            ContentItem::Movie(m) => &m.imdbid,
            ContentItem::TvShow(t) => &t.imdbid,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ContentItem::Movie(m) => &m.title,
            ContentItem::TvShow(t) => &t.title,
        }
    }

    pub fn key(&self) -> ContentKey {
        ContentKey {
            content_type: self.content_type(),
            id: self.id(),
        }
    }
}

/// A taxonomy tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: u64,
    pub name: String,
}

// ============================================================================
// Content API wire types
// ============================================================================

/// Response from POST /users
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserResponse {
    pub success: bool,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub message: String,
}

/// Response from GET /tags
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Envelope for list endpoints (`/movies/random`, `/user_movies`, ...)
#[derive(Debug, Clone, Deserialize)]
pub struct ContentPage<T> {
    pub success: bool,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PageMeta {
    #[serde(default)]
    pub total_returned: Option<u32>,
    #[serde(default)]
    pub total_count: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Body for POST /user_movies and /user_tv_shows
#[derive(Debug, Clone, Serialize)]
pub struct SaveItemRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tv_show_id: Option<u64>,
    pub imdbid: String,
}

impl From<&ContentItem> for SaveItemRequest {
    fn from(item: &ContentItem) -> Self {
        match item {
            ContentItem::Movie(m) => SaveItemRequest {
                movie_id: Some(m.id),
                tv_show_id: None,
                imdbid: m.imdbid.clone(),
            },
            ContentItem::TvShow(t) => SaveItemRequest {
                movie_id: None,
                tv_show_id: Some(t.id),
                imdbid: t.imdbid.clone(),
            },
        }
    }
}

/// Query parameters for the random-content endpoints
///
/// Multi-valued dimensions are rendered as comma-joined strings; empty
/// dimensions are omitted from the query string entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RandomContentQuery {
    pub limit: u32,
    pub genres: Vec<String>,
    pub tags: Vec<String>,
    pub stream_providers: Vec<String>,
    pub exclude_ids: Vec<String>,
    pub country: Option<String>,
}

impl RandomContentQuery {
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.to_string())];
        if !self.genres.is_empty() {
            params.push(("genres", self.genres.join(",")));
        }
        if !self.tags.is_empty() {
            params.push(("tags", self.tags.join(",")));
        }
        if !self.stream_providers.is_empty() {
            params.push(("stream_providers", self.stream_providers.join(",")));
        }
        if !self.exclude_ids.is_empty() {
            params.push(("exclude_ids", self.exclude_ids.join(",")));
        }
        if let Some(country) = &self.country {
            params.push(("country", country.clone()));
        }
        params
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    pub fn movie(id: u64, imdbid: &str) -> Movie {
        Movie {
            id,
            imdbid: imdbid.to_string(),
            title: format!("Movie {}", id),
            release_year: Some(2010),
            runtime: Some(120),
            directors: vec!["Director".to_string()],
            cast: vec![],
            genres: vec!["Drama".to_string()],
            tags: vec![],
            imdb_rating: Some(7.5),
            rotten_tomatoes_rating: Some(80.0),
            overview: None,
            poster_url: None,
            is_saved: false,
            watch_providers: None,
        }
    }

    pub fn tv_show(id: u64, imdbid: &str) -> TvShow {
        TvShow {
            id,
            imdbid: imdbid.to_string(),
            title: format!("Show {}", id),
            first_air_year: Some(2015),
            runtime: Some(45),
            creators: vec!["Creator".to_string()],
            cast: vec![],
            genres: vec!["Comedy".to_string()],
            tags: vec![],
            imdb_rating: Some(8.0),
            rotten_tomatoes_rating: None,
            overview: None,
            poster_url: None,
            is_saved: false,
            watch_providers: None,
        }
    }
}
