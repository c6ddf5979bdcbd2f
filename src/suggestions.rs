use futures::future::join_all;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::models::{dedupe_by_id, Movie};
use crate::omdb::OmdbApi;

pub const DEFAULT_SEEDS: [&str; 6] = [
    "Batman",
    "Harry Potter",
    "Avengers",
    "Star Wars",
    "Spider-Man",
    "Frozen",
];
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;
pub const SUGGESTIONS_FAILED: &str = "Could not load suggestions";

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SuggestionState {
    pub loading: bool,
    pub movies: Vec<Movie>,
    pub error: Option<String>,
}

/// Flattens per-seed batches in seed order, keeps the first sighting of each id, and caps the length.
pub fn merge_suggestions(batches: Vec<Vec<Movie>>, limit: usize) -> Vec<Movie> {
    let mut merged = dedupe_by_id(batches.into_iter().flatten());
    merged.truncate(limit);
    merged
}

pub struct SuggestionAggregator {
    seeds: Vec<String>,
    limit: usize,
    loaded: OnceCell<()>,
    state: Mutex<SuggestionState>,
}

impl SuggestionAggregator {
    pub fn new<I, S>(seeds: I, limit: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            seeds: seeds.into_iter().map(Into::into).collect(),
            limit,
            loaded: OnceCell::new(),
            state: Mutex::new(SuggestionState::default()),
        }
    }

    pub fn with_defaults(limit: usize) -> Self {
        Self::new(DEFAULT_SEEDS, limit)
    }

    /// Builds the list on first call; later and concurrent callers share that one run.
    pub async fn load(&self, api: &dyn OmdbApi) -> SuggestionState {
        self.loaded.get_or_init(|| self.run(api)).await;
        self.snapshot()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Runs the load on its own task so a dropped request cannot abandon it halfway.
    pub async fn ensure_loaded(self: &Arc<Self>, api: Arc<dyn OmdbApi>) -> SuggestionState {
        if self.is_loaded() {
            return self.snapshot();
        }
        let aggregator = Arc::clone(self);
        let task = tokio::spawn(async move {
            aggregator.load(api.as_ref()).await;
        });
        if let Err(e) = task.await {
            error!("Suggestion load task failed: {}", e);
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> SuggestionState {
        self.lock_state().clone()
    }

    async fn run(&self, api: &dyn OmdbApi) {
        {
            let mut state = self.lock_state();
            state.loading = true;
            state.error = None;
        }
        let mut in_flight = LoadingFlag {
            state: &self.state,
            settled: false,
        };
        info!("Loading suggestions from {} seed(s)", self.seeds.len());

        let outcomes = join_all(self.seeds.iter().map(|seed| api.search_by_title(seed))).await;

        let mut failed = 0usize;
        let batches = outcomes
            .into_iter()
            .zip(&self.seeds)
            .map(|(outcome, seed)| match outcome {
                Ok(movies) => movies,
                Err(e) => {
                    warn!("Suggestion seed '{}' failed: {}", seed, e);
                    failed += 1;
                    Vec::new()
                }
            })
            .collect::<Vec<_>>();

        let movies = merge_suggestions(batches, self.limit);
        let error = if !self.seeds.is_empty() && failed == self.seeds.len() {
            Some(SUGGESTIONS_FAILED.to_string())
        } else {
            None
        };
        info!("Loaded {} suggestion(s)", movies.len());

        in_flight.settled = true;
        let mut state = self.lock_state();
        state.movies = movies;
        state.error = error;
        state.loading = false;
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SuggestionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clears `loading` if a run is dropped before it settles; the next load starts over.
struct LoadingFlag<'a> {
    state: &'a Mutex<SuggestionState>,
    settled: bool,
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Suggestion load abandoned before settling");
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            state.loading = false;
        }
    }
}
