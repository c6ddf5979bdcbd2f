use serde::Serialize;
use tracing::debug;

use crate::models::Movie;

/// The one movie expanded for quick preview, plus its detail record once fetched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActiveSelection {
    movie: Option<Movie>,
    detail: Option<Movie>,
}

impl ActiveSelection {
    pub fn select(&mut self, movie: Movie) {
        self.movie = Some(movie);
        self.detail = None;
    }

    /// Ignored unless `id` is still the selected movie.
    pub fn attach_details(&mut self, id: &str, detail: Option<Movie>) -> bool {
        match &self.movie {
            Some(selected) if selected.id == id => {
                self.detail = detail;
                true
            }
            _ => {
                debug!("Dropping details for '{}', selection moved on", id);
                false
            }
        }
    }

    pub fn clear(&mut self) {
        self.movie = None;
        self.detail = None;
    }

    pub fn detail(&self) -> Option<&Movie> {
        self.detail.as_ref()
    }

    /// The richest record available for display.
    pub fn best(&self) -> Option<&Movie> {
        self.detail.as_ref().or(self.movie.as_ref())
    }
}
