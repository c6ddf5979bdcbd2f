use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::{dedupe_by_id, Movie};
use crate::omdb::{LookupError, OmdbApi};

pub const NO_RESULTS_MESSAGE: &str = "No movies found. Try another title!";
pub const LOOKUP_FAILED_MESSAGE: &str = "Could not reach the movie service. Try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    Idle,
    Searching,
    Results,
    NoResults,
    Failed,
}

/// Identifies one submission; only the most recent ticket may land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

#[derive(Debug, Clone, Serialize)]
pub struct SearchFlow {
    query: String,
    phase: SearchPhase,
    results: Vec<Movie>,
    has_searched: bool,
    error: Option<String>,
    #[serde(skip)]
    latest: u64,
}

impl Default for SearchFlow {
    fn default() -> Self {
        Self {
            query: String::new(),
            phase: SearchPhase::Idle,
            results: Vec::new(),
            has_searched: false,
            error: None,
            latest: 0,
        }
    }
}

impl SearchFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn results(&self) -> &[Movie] {
        &self.results
    }

    pub fn has_searched(&self) -> bool {
        self.has_searched
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.phase == SearchPhase::Searching
    }

    /// Starts a submission. Blank queries leave the state untouched.
    pub fn begin(&mut self, query: &str) -> Option<SearchTicket> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }
        self.latest += 1;
        self.query = trimmed.to_string();
        self.results.clear();
        self.error = None;
        self.has_searched = true;
        self.phase = SearchPhase::Searching;
        Some(SearchTicket(self.latest))
    }

    /// Applies a response. Returns false when a newer submission (or a reset) superseded it.
    pub fn complete(
        &mut self,
        ticket: SearchTicket,
        outcome: Result<Vec<Movie>, LookupError>,
    ) -> bool {
        if ticket.0 != self.latest || self.phase != SearchPhase::Searching {
            debug!("Discarding stale search response (ticket {})", ticket.0);
            return false;
        }
        match outcome {
            Ok(movies) if movies.is_empty() => {
                self.results.clear();
                self.error = Some(NO_RESULTS_MESSAGE.to_string());
                self.phase = SearchPhase::NoResults;
            }
            Ok(movies) => {
                self.results = dedupe_by_id(movies);
                self.error = None;
                self.phase = SearchPhase::Results;
            }
            Err(e) => {
                warn!("Search for '{}' failed: {}", self.query, e);
                self.results.clear();
                self.error = Some(LOOKUP_FAILED_MESSAGE.to_string());
                self.phase = SearchPhase::Failed;
            }
        }
        true
    }

    /// Back to the first-load state; in-flight responses become stale.
    pub fn go_home(&mut self) {
        let latest = self.latest + 1;
        *self = Self {
            latest,
            ..Self::default()
        };
    }
}

/// Runs one submission against the shared flow without holding the lock across the request.
pub async fn run_search(flow: &Mutex<SearchFlow>, api: &dyn OmdbApi, query: &str) -> bool {
    let (ticket, query) = {
        let mut guard = flow.lock().await;
        match guard.begin(query) {
            Some(ticket) => (ticket, guard.query().to_string()),
            None => return false,
        }
    };

    let outcome = api.search_by_title(&query).await;
    let mut guard = flow.lock().await;
    let applied = guard.complete(ticket, outcome);
    if applied {
        info!(
            "Search for '{}' finished with {} result(s)",
            query,
            guard.results().len()
        );
    }
    applied
}
