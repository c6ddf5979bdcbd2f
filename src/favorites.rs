//! Durable favorites list, mirrored in full to storage after every toggle.
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use crate::models::{dedupe_by_id, Movie};

pub const DEFAULT_FAVORITES_FILE: &str = "favoriteMovies.json";

/// Holds the single serialized favorites document.
pub trait FavoritesStorage: Send + Sync {
    fn read(&self) -> Option<String>;
    fn write(&self, document: &str) -> Result<()>;
}

impl<T: FavoritesStorage + ?Sized> FavoritesStorage for Arc<T> {
    fn read(&self) -> Option<String> {
        (**self).read()
    }

    fn write(&self, document: &str) -> Result<()> {
        (**self).write(document)
    }
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FavoritesStorage for FileStorage {
    fn read(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read favorites from {:?}: {}", self.path, e);
                None
            }
        }
    }

    fn write(&self, document: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        // Replace in one rename so a crash never leaves a half-written list.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, document).with_context(|| format!("Failed to write {:?}", tmp))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {:?}", self.path))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    document: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(document.into())),
        }
    }
}

impl FavoritesStorage for MemoryStorage {
    fn read(&self) -> Option<String> {
        self.document.lock().ok().and_then(|d| d.clone())
    }

    fn write(&self, document: &str) -> Result<()> {
        let mut guard = self
            .document
            .lock()
            .map_err(|_| anyhow::anyhow!("favorites memory storage poisoned"))?;
        *guard = Some(document.to_string());
        Ok(())
    }
}

pub struct FavoritesStore {
    storage: Arc<dyn FavoritesStorage>,
    movies: Vec<Movie>,
}

impl FavoritesStore {
    /// Missing or malformed documents start an empty list.
    pub fn load(storage: Box<dyn FavoritesStorage>) -> Self {
        let movies = match storage.read() {
            None => {
                debug!("No saved favorites found");
                Vec::new()
            }
            Some(text) => match serde_json::from_str::<Vec<Movie>>(&text) {
                Ok(saved) => dedupe_by_id(saved),
                Err(e) => {
                    warn!("Discarding unreadable favorites document: {}", e);
                    Vec::new()
                }
            },
        };
        info!("Loaded {} favorite(s)", movies.len());
        Self {
            storage: Arc::from(storage),
            movies,
        }
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.movies.iter().any(|m| m.id == id)
    }

    /// Removes the movie if present, appends it otherwise, then persists the whole list.
    pub async fn toggle(&mut self, movie: Movie) -> &[Movie] {
        if let Some(pos) = self.movies.iter().position(|m| m.id == movie.id) {
            let removed = self.movies.remove(pos);
            info!("Removed '{}' ({}) from favorites", removed.title, removed.id);
        } else {
            info!("Added '{}' ({}) to favorites", movie.title, movie.id);
            self.movies.push(movie);
        }
        self.persist().await;
        &self.movies
    }

    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.movies.iter().map(|m| m.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    /// Storage writes touch the disk, so they run on the blocking pool.
    async fn persist(&self) {
        let document = match serde_json::to_string(&self.movies) {
            Ok(d) => d,
            Err(e) => {
                error!("Failed to serialize favorites: {}", e);
                return;
            }
        };
        let storage = Arc::clone(&self.storage);
        match tokio::task::spawn_blocking(move || storage.write(&document)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Failed to persist favorites: {:?}", e),
            Err(e) => error!("Favorites write task failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::movie;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    struct BrokenStorage;

    impl FavoritesStorage for BrokenStorage {
        fn read(&self) -> Option<String> {
            None
        }
        fn write(&self, _document: &str) -> Result<()> {
            Err(anyhow::anyhow!("disk full"))
        }
    }

    fn ids(store: &FavoritesStore) -> Vec<String> {
        store.ids().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn toggle_appends_then_removes() {
        let mut store = FavoritesStore::load(Box::new(MemoryStorage::default()));
        store.toggle(movie("tt1", "Batman")).await;
        store.toggle(movie("tt2", "Frozen")).await;
        let before = ids(&store);

        store.toggle(movie("tt3", "Avengers")).await;
        assert_eq!(ids(&store), vec!["tt1", "tt2", "tt3"]);
        assert!(store.is_favorite("tt3"));

        store.toggle(movie("tt3", "Avengers")).await;
        assert_eq!(ids(&store), before);
        assert!(!store.is_favorite("tt3"));
    }

    #[tokio::test]
    async fn removing_middle_entry_keeps_order_of_the_rest() {
        let mut store = FavoritesStore::load(Box::new(MemoryStorage::default()));
        for (id, title) in [("tt1", "A"), ("tt2", "B"), ("tt3", "C")] {
            store.toggle(movie(id, title)).await;
        }
        store.toggle(movie("tt2", "B")).await;
        assert_eq!(ids(&store), vec!["tt1", "tt3"]);
        store.toggle(movie("tt2", "B")).await;
        assert_eq!(ids(&store), vec!["tt1", "tt3", "tt2"]);
    }

    #[tokio::test]
    async fn every_toggle_round_trips_through_storage() {
        let backing = Arc::new(MemoryStorage::default());
        let mut store = FavoritesStore::load(Box::new(backing.clone()));
        let sequence = ["tt1", "tt2", "tt1", "tt3", "tt4", "tt2", "tt1"];
        for id in sequence {
            store.toggle(movie(id, id)).await;
            let reloaded = FavoritesStore::load(Box::new(backing.clone()));
            assert_eq!(reloaded.movies(), store.movies());
        }
        assert_eq!(ids(&store), vec!["tt3", "tt4", "tt1"]);
    }

    #[test]
    fn invalid_json_loads_as_empty() {
        let store = FavoritesStore::load(Box::new(MemoryStorage::with_document("{not json")));
        assert!(store.is_empty());
    }

    #[test]
    fn duplicate_ids_in_saved_document_are_collapsed() {
        let doc = serde_json::to_string(&vec![
            movie("tt1", "First"),
            movie("tt1", "Second"),
            movie("tt2", "Other"),
        ])
        .unwrap();
        let store = FavoritesStore::load(Box::new(MemoryStorage::with_document(doc)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.movies()[0].title, "First");
    }

    #[tokio::test]
    async fn write_failure_does_not_undo_toggle() {
        let mut store = FavoritesStore::load(Box::new(BrokenStorage));
        store.toggle(movie("tt1", "Batman")).await;
        assert!(store.is_favorite("tt1"));
    }

    #[tokio::test]
    async fn file_storage_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DEFAULT_FAVORITES_FILE);

        let mut store = FavoritesStore::load(Box::new(FileStorage::new(&path)));
        assert!(store.is_empty());
        store.toggle(movie("tt1", "Batman")).await;
        store.toggle(movie("tt2", "Frozen")).await;

        let reloaded = FavoritesStore::load(Box::new(FileStorage::new(&path)));
        assert_eq!(reloaded.movies(), store.movies());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FAVORITES_FILE);
        std::fs::write(&path, "[{\"id\": 42").unwrap();
        let store = FavoritesStore::load(Box::new(FileStorage::new(&path)));
        assert!(store.is_empty());
    }

    struct SlowStorage {
        written: Arc<AtomicBool>,
    }

    impl FavoritesStorage for SlowStorage {
        fn read(&self) -> Option<String> {
            None
        }
        fn write(&self, _document: &str) -> Result<()> {
            std::thread::sleep(Duration::from_millis(80));
            self.written.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn slow_write_does_not_stall_the_runtime() {
        let written = Arc::new(AtomicBool::new(false));
        let mut store = FavoritesStore::load(Box::new(SlowStorage {
            written: written.clone(),
        }));
        let ticker = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            written.load(Ordering::SeqCst)
        };
        let (_, written_when_ticked) = tokio::join!(store.toggle(movie("tt1", "Batman")), ticker);
        assert!(!written_when_ticked);
        assert!(written.load(Ordering::SeqCst));
        assert!(store.is_favorite("tt1"));
    }
}
