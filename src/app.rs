use crate::config::Config;
use crate::favorites::{FavoritesStore, FileStorage};
use crate::models::Movie;
use crate::omdb::{self, OmdbApi, OmdbClient};
use crate::search::{self, SearchFlow, SearchPhase};
use crate::selection::ActiveSelection;
use crate::suggestions::SuggestionAggregator;
use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024;
const WATCH_PLACEHOLDER: &str = "Your movie would start here...";
const NO_FAVORITES_MESSAGE: &str = "You have not added any movies to your favorites yet.";

#[derive(Clone)]
pub struct AppState {
    pub omdb: Arc<dyn OmdbApi>,
    pub favorites: Arc<Mutex<FavoritesStore>>,
    pub suggestions: Arc<SuggestionAggregator>,
    pub search: Arc<Mutex<SearchFlow>>,
    pub selection: Arc<Mutex<ActiveSelection>>,
}

impl AppState {
    pub fn new(
        omdb: Arc<dyn OmdbApi>,
        favorites: FavoritesStore,
        suggestions: SuggestionAggregator,
    ) -> Self {
        Self {
            omdb,
            favorites: Arc::new(Mutex::new(favorites)),
            suggestions: Arc::new(suggestions),
            search: Arc::new(Mutex::new(SearchFlow::new())),
            selection: Arc::new(Mutex::new(ActiveSelection::default())),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MovieCard {
    #[serde(flatten)]
    pub movie: Movie,
    pub poster: String,
    pub is_favorite: bool,
}

impl MovieCard {
    fn new(movie: &Movie, favorites: &FavoritesStore) -> Self {
        Self {
            poster: movie.poster_or_placeholder().to_string(),
            is_favorite: favorites.is_favorite(&movie.id),
            movie: movie.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ActiveView {
    card: MovieCard,
    details_loaded: bool,
}

#[derive(Debug, Serialize)]
struct HomeView {
    query: String,
    phase: SearchPhase,
    loading: bool,
    has_searched: bool,
    error: Option<String>,
    suggestions: Vec<MovieCard>,
    results: Vec<MovieCard>,
    active: Option<ActiveView>,
}

#[derive(Debug, Serialize)]
struct DetailView {
    movie: Option<MovieCard>,
    loading: bool,
}

#[derive(Debug, Serialize)]
struct WatchView {
    title: Option<String>,
    loading: bool,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct FavoritesView {
    favorites: Vec<MovieCard>,
    message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct ToggleView {
    favorite: bool,
    favorites: Vec<MovieCard>,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
}

pub async fn run_server(config: Config) -> Result<()> {
    let omdb: Arc<dyn OmdbApi> = Arc::new(OmdbClient::new(
        config.omdb_api_key.clone(),
        config.omdb_base_url.clone(),
        config.request_timeout,
    )?);
    let storage = FileStorage::new(&config.favorites_path);
    info!("Favorites stored at {:?}", storage.path());
    let favorites = FavoritesStore::load(Box::new(storage));
    let suggestions = SuggestionAggregator::with_defaults(config.suggestion_limit);

    let app = build_router(AppState::new(omdb, favorites, suggestions));

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/search", post(submit_search))
        .route("/home", post(go_home))
        .route("/select", delete(clear_selection))
        .route("/select/:id", post(select_movie))
        .route("/movie", get(detail_without_id))
        .route("/movie/:id", get(movie_detail))
        .route("/watch", get(watch_without_id))
        .route("/watch/:id", get(watch))
        .route("/favorites", get(list_favorites))
        .route("/favorites/toggle", post(toggle_favorite))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn home(State(state): State<AppState>) -> Json<HomeView> {
    state.suggestions.ensure_loaded(state.omdb.clone()).await;
    Json(render_home(&state).await)
}

async fn submit_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Json<HomeView> {
    if !search::run_search(&state.search, state.omdb.as_ref(), &req.query).await {
        debug!("Search submission '{}' produced no state change", req.query);
    }
    Json(render_home(&state).await)
}

async fn go_home(State(state): State<AppState>) -> Json<HomeView> {
    state.search.lock().await.go_home();
    state.suggestions.ensure_loaded(state.omdb.clone()).await;
    Json(render_home(&state).await)
}

async fn select_movie(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let visible = {
        let flow = state.search.lock().await;
        flow.results().iter().find(|m| m.id == id).cloned()
    }
    .or_else(|| {
        state
            .suggestions
            .snapshot()
            .movies
            .into_iter()
            .find(|m| m.id == id)
    });
    let Some(movie) = visible else {
        warn!("Cannot preview '{}': not among visible movies", id);
        return StatusCode::NOT_FOUND.into_response();
    };

    state.selection.lock().await.select(movie);
    let detail = omdb::degrade_details(state.omdb.as_ref(), &id).await;
    state.selection.lock().await.attach_details(&id, detail);

    Json(render_home(&state).await).into_response()
}

async fn clear_selection(State(state): State<AppState>) -> Json<HomeView> {
    state.selection.lock().await.clear();
    Json(render_home(&state).await)
}

async fn movie_detail(State(state): State<AppState>, Path(id): Path<String>) -> Json<DetailView> {
    let movie = omdb::degrade_details(state.omdb.as_ref(), &id).await;
    let favorites = state.favorites.lock().await;
    Json(DetailView {
        loading: movie.is_none(),
        movie: movie.as_ref().map(|m| MovieCard::new(m, &favorites)),
    })
}

async fn detail_without_id() -> Json<DetailView> {
    Json(DetailView {
        movie: None,
        loading: true,
    })
}

async fn watch(State(state): State<AppState>, Path(id): Path<String>) -> Json<WatchView> {
    let movie = omdb::degrade_details(state.omdb.as_ref(), &id).await;
    Json(WatchView {
        title: movie.map(|m| m.title),
        loading: false,
        message: WATCH_PLACEHOLDER,
    })
}

async fn watch_without_id() -> Json<WatchView> {
    Json(WatchView {
        title: None,
        loading: true,
        message: WATCH_PLACEHOLDER,
    })
}

async fn list_favorites(State(state): State<AppState>) -> Json<FavoritesView> {
    let favorites = state.favorites.lock().await;
    Json(FavoritesView {
        favorites: cards(favorites.movies(), &favorites),
        message: favorites.is_empty().then_some(NO_FAVORITES_MESSAGE),
    })
}

async fn toggle_favorite(State(state): State<AppState>, Json(movie): Json<Movie>) -> Response {
    if movie.id.trim().is_empty() {
        warn!("Rejecting favorite toggle without a movie id");
        return StatusCode::BAD_REQUEST.into_response();
    }
    let id = movie.id.clone();
    let mut favorites = state.favorites.lock().await;
    favorites.toggle(movie).await;
    Json(ToggleView {
        favorite: favorites.is_favorite(&id),
        favorites: cards(favorites.movies(), &favorites),
    })
    .into_response()
}

fn cards(movies: &[Movie], favorites: &FavoritesStore) -> Vec<MovieCard> {
    movies.iter().map(|m| MovieCard::new(m, favorites)).collect()
}

async fn render_home(state: &AppState) -> HomeView {
    let flow = state.search.lock().await.clone();
    let selection = state.selection.lock().await.clone();
    let suggestions = state.suggestions.snapshot();
    let favorites = state.favorites.lock().await;

    let error = if flow.has_searched() {
        flow.error().map(str::to_string)
    } else {
        suggestions.error.clone()
    };
    let shown_suggestions = if flow.has_searched() {
        Vec::new()
    } else {
        cards(&suggestions.movies, &favorites)
    };
    let active = selection.best().map(|m| ActiveView {
        card: MovieCard::new(m, &favorites),
        details_loaded: selection.detail().is_some(),
    });

    HomeView {
        query: flow.query().to_string(),
        phase: flow.phase(),
        loading: suggestions.loading || flow.is_loading(),
        has_searched: flow.has_searched(),
        error,
        suggestions: shown_suggestions,
        results: cards(flow.results(), &favorites),
        active,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
