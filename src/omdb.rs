use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Movie;

pub const OMDB_BASE: &str = "https://www.omdbapi.com/";
const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup request timed out")]
    Timeout,
    #[error("lookup request failed: {0}")]
    Transport(String),
    #[error("lookup service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not parse lookup response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LookupError::Timeout
        } else {
            LookupError::Transport(err.without_url().to_string())
        }
    }
}

#[async_trait]
pub trait OmdbApi: Send + Sync {
    /// `Ok(vec![])` means the service answered with no match.
    async fn search_by_title(&self, query: &str) -> Result<Vec<Movie>, LookupError>;
    /// `Ok(None)` means the service does not know the id.
    async fn get_details(&self, id: &str) -> Result<Option<Movie>, LookupError>;
}

#[derive(Debug, Clone)]
pub struct OmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OmdbClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let user_agent = format!("reelhub/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5).min(timeout))
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build OMDb HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, LookupError> {
        let mut url = format!("{}?apikey={}", self.base_url, urlencoding::encode(&self.api_key));
        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }

        let res = self.client.get(&url).send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| LookupError::Parse(e.to_string()))
    }
}

#[async_trait]
impl OmdbApi for OmdbClient {
    async fn search_by_title(&self, query: &str) -> Result<Vec<Movie>, LookupError> {
        let data: SearchResponse = self.get_json(&[("s", query)]).await?;
        if !data.is_true() {
            debug!(
                "No OMDb match for '{}': {}",
                query,
                data.error.as_deref().unwrap_or("no reason given")
            );
            return Ok(Vec::new());
        }
        Ok(data.search.into_iter().filter_map(SearchItem::into_movie).collect())
    }

    async fn get_details(&self, id: &str) -> Result<Option<Movie>, LookupError> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(None);
        }
        let data: DetailResponse = self.get_json(&[("i", id), ("plot", "full")]).await?;
        if data.response != "True" {
            debug!(
                "No OMDb details for '{}': {}",
                id,
                data.error.as_deref().unwrap_or("no reason given")
            );
            return Ok(None);
        }
        Ok(data.into_movie())
    }
}

/// Search that collapses failures into an empty list, logging the cause.
pub async fn degrade_search(api: &dyn OmdbApi, query: &str) -> Vec<Movie> {
    match api.search_by_title(query).await {
        Ok(movies) => movies,
        Err(e) => {
            warn!("OMDb search for '{}' failed: {}", query, e);
            Vec::new()
        }
    }
}

/// Detail lookup that collapses failures into `None`, logging the cause.
pub async fn degrade_details(api: &dyn OmdbApi, id: &str) -> Option<Movie> {
    match api.get_details(id).await {
        Ok(movie) => movie,
        Err(e) => {
            warn!("OMDb details for '{}' failed: {}", id, e);
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "Response", default)]
    response: String,
    #[serde(rename = "Search", default)]
    search: Vec<SearchItem>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

impl SearchResponse {
    fn is_true(&self) -> bool {
        self.response == "True"
    }
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(rename = "imdbID", default)]
    imdb_id: String,
    #[serde(rename = "Title", default)]
    title: String,
    #[serde(rename = "Year", default)]
    year: String,
    #[serde(rename = "Poster", default)]
    poster: String,
    #[serde(rename = "Type", default)]
    media_type: String,
}

impl SearchItem {
    fn into_movie(self) -> Option<Movie> {
        let id = self.imdb_id.trim().to_string();
        if id.is_empty() {
            debug!("Dropping OMDb search hit without an id: '{}'", self.title);
            return None;
        }
        Some(Movie {
            id,
            title: self.title,
            year: self.year,
            poster_url: self.poster,
            media_type: self.media_type,
            plot: None,
            rated: None,
            runtime: None,
            genre: None,
            actors: None,
            director: None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    #[serde(rename = "Response", default)]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
    #[serde(rename = "Type")]
    media_type: Option<String>,
    #[serde(rename = "Plot")]
    plot: Option<String>,
    #[serde(rename = "Rated")]
    rated: Option<String>,
    #[serde(rename = "Runtime")]
    runtime: Option<String>,
    #[serde(rename = "Genre")]
    genre: Option<String>,
    #[serde(rename = "Actors")]
    actors: Option<String>,
    #[serde(rename = "Director")]
    director: Option<String>,
}

impl DetailResponse {
    fn into_movie(self) -> Option<Movie> {
        let id = self.imdb_id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())?;
        Some(Movie {
            id,
            title: self.title.unwrap_or_default(),
            year: self.year.unwrap_or_default(),
            poster_url: self.poster.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            media_type: self.media_type.unwrap_or_default(),
            plot: available(self.plot),
            rated: available(self.rated),
            runtime: available(self.runtime),
            genre: available(self.genre),
            actors: available(self.actors),
            director: available(self.director),
        })
    }
}

fn available(value: Option<String>) -> Option<String> {
    value.filter(|v| {
        let v = v.trim();
        !v.is_empty() && v != NOT_AVAILABLE
    })
}
