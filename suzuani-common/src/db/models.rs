//! Database models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account row. Carries credential material, so it is never serialized directly.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub profile_image: String,
    pub is_admin: bool,
    pub is_verified: bool,
    pub otp: Option<String>,
    pub created_at: NaiveDateTime,
}

/// User as exposed over HTTP
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub profile_image: String,
    pub is_admin: bool,
    pub is_verified: bool,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            profile_image: user.profile_image.clone(),
            is_admin: user.is_admin,
            is_verified: user.is_verified,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct MusicCategory {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Anime {
    pub id: i64,
    pub title: String,
    pub poster_url: String,
    pub description: String,
    pub rating: f64,
    pub release_year: i64,
    pub views: i64,
    pub category_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Episode {
    pub id: i64,
    pub title: String,
    pub thumbnail_url: String,
    pub watch_link: String,
    pub anime_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Manga {
    pub id: i64,
    pub title: String,
    pub poster_url: String,
    pub description: String,
    pub rating: f64,
    pub release_year: i64,
    pub views: i64,
    pub category_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct MangaChapter {
    pub id: i64,
    pub title: String,
    pub manga_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct MangaPage {
    pub id: i64,
    pub page_number: i64,
    pub image_url: String,
    pub chapter_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Banner {
    pub id: i64,
    pub image_url: String,
    pub banner_type: String,
    pub anime_id: Option<i64>,
    pub manga_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub user_id: i64,
    pub anime_id: Option<i64>,
    pub manga_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub cover_url: String,
    pub song_url: String,
    pub music_category_id: i64,
}

/// Which home page a banner is shown on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerType {
    Anime,
    Manga,
    Music,
}

impl BannerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BannerType::Anime => "anime",
            BannerType::Manga => "manga",
            BannerType::Music => "music",
        }
    }
}

impl fmt::Display for BannerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BannerType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anime" => Ok(BannerType::Anime),
            "manga" => Ok(BannerType::Manga),
            "music" => Ok(BannerType::Music),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown banner type '{}' (expected anime, manga or music)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_type_parse() {
        assert_eq!("anime".parse::<BannerType>().unwrap(), BannerType::Anime);
        assert_eq!(" Music ".parse::<BannerType>().unwrap(), BannerType::Music);
        assert!("video".parse::<BannerType>().is_err());
        assert_eq!(BannerType::Manga.to_string(), "manga");
    }
}
