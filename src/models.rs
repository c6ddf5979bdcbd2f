use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Sentinel the lookup service uses when it has no poster for a title.
pub const POSTER_UNAVAILABLE: &str = "N/A";
pub const POSTER_PLACEHOLDER: &str = "https://via.placeholder.com/200x300?text=No+Image";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub year: String,
    pub poster_url: String,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
}

impl Movie {
    pub fn poster_or_placeholder(&self) -> &str {
        let poster = self.poster_url.trim();
        if poster.is_empty() || poster == POSTER_UNAVAILABLE {
            POSTER_PLACEHOLDER
        } else {
            poster
        }
    }
}

/// Drops every movie whose id was already seen; the first occurrence keeps its position.
pub fn dedupe_by_id<I>(movies: I) -> Vec<Movie>
where
    I: IntoIterator<Item = Movie>,
{
    let mut seen = HashSet::new();
    movies
        .into_iter()
        .filter(|m| seen.insert(m.id.clone()))
        .collect()
}

#[cfg(test)]
pub(crate) fn movie(id: &str, title: &str) -> Movie {
    Movie {
        id: id.to_string(),
        title: title.to_string(),
        year: "2005".to_string(),
        poster_url: format!("https://img.example/{id}.jpg"),
        media_type: "movie".to_string(),
        plot: None,
        rated: None,
        runtime: None,
        genre: None,
        actors: None,
        director: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_occurrence_in_order() {
        let list = vec![
            movie("tt1", "Batman Begins"),
            movie("tt2", "The Dark Knight"),
            movie("tt1", "Batman Begins (again)"),
            movie("tt3", "Batman Returns"),
        ];
        let deduped = dedupe_by_id(list);
        let ids: Vec<_> = deduped.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["tt1", "tt2", "tt3"]);
        assert_eq!(deduped[0].title, "Batman Begins");
    }

    #[test]
    fn poster_sentinel_falls_back_to_placeholder() {
        let mut m = movie("tt1", "Frozen");
        assert_eq!(m.poster_or_placeholder(), "https://img.example/tt1.jpg");
        m.poster_url = "N/A".to_string();
        assert_eq!(m.poster_or_placeholder(), POSTER_PLACEHOLDER);
        m.poster_url = String::new();
        assert_eq!(m.poster_or_placeholder(), POSTER_PLACEHOLDER);
    }

    #[test]
    fn optional_fields_are_omitted_and_tolerated() {
        let m = movie("tt9", "Avengers");
        let value = serde_json::to_value(&m).expect("serialize");
        assert!(value.get("plot").is_none());
        let back: Movie = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, m);
    }
}
