//! Query modules for the web service
//!
//! Schema creation and row types live in `suzuani_common::db`; this module
//! holds the queries the handlers run.

pub mod banners;
pub mod categories;
pub mod comments;
pub mod likes;
pub mod music;
pub mod pages;
pub mod sessions;
pub mod titles;
pub mod users;

use serde::Serialize;

/// The two commentable, likeable title shelves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Anime,
    Manga,
}

impl MediaKind {
    /// Table holding the titles
    pub fn table(&self) -> &'static str {
        match self {
            MediaKind::Anime => "animes",
            MediaKind::Manga => "mangas",
        }
    }

    /// Foreign key column in `comments`, `banners` and the like tables
    pub fn id_column(&self) -> &'static str {
        match self {
            MediaKind::Anime => "anime_id",
            MediaKind::Manga => "manga_id",
        }
    }

    pub fn likes_table(&self) -> &'static str {
        match self {
            MediaKind::Anime => "anime_likes",
            MediaKind::Manga => "manga_likes",
        }
    }

    /// Singular noun for messages and URLs
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Anime => "anime",
            MediaKind::Manga => "manga",
        }
    }
}

/// Escape `%`, `_` and `\` so user text matches literally inside
/// `LIKE ... ESCAPE '\'`
pub fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `%query%` pattern for substring search
pub fn contains_pattern(query: &str) -> String {
    format!("%{}%", escape_like(query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("naruto"), "naruto");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
        assert_eq!(contains_pattern("50%"), "%50\\%%");
    }
}
