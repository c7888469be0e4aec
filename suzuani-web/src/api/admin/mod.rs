//! Administrative catalog management
//!
//! Every route is mounted under `/admin` behind [`crate::session::require_admin`]:
//! anonymous callers get 401 with a login URL, non-admins 403.

pub mod banners;
pub mod categories;
pub mod chapters;
pub mod comments;
pub mod episodes;
pub mod songs;
pub mod titles;
pub mod users;

use axum::{
    extract::State,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use suzuani_common::db::{Anime, Category, Manga, MusicCategory};

use crate::db::{self, music::SongFilter, titles::TitleFilter};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::AppState;

/// GET /admin: row counts per table
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({
        "users": db::users::count_users(&state.db, None).await?,
        "categories": db::categories::count::<Category>(&state.db, None).await?,
        "music_categories": db::categories::count::<MusicCategory>(&state.db, None).await?,
        "animes": db::titles::count::<Anime>(&state.db, &TitleFilter::default()).await?,
        "mangas": db::titles::count::<Manga>(&state.db, &TitleFilter::default()).await?,
        "episodes": db::titles::count_episodes(&state.db, None).await?,
        "chapters": db::pages::count_chapters(&state.db, None).await?,
        "banners": db::banners::count(&state.db, None).await?,
        "comments": db::comments::count(&state.db).await?,
        "songs": db::music::count(&state.db, &SongFilter::default()).await?,
    })))
}

/// Record "required" for a blank text field
pub(crate) fn require_text(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.insert(field.to_string(), "This field is required.".to_string());
    }
}

pub(crate) fn not_found(what: &str, id: i64) -> ApiError {
    ApiError::NotFound(format!("{} {}", what, id))
}

/// Routes relative to `/admin`
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        // Users
        .route("/users", get(users::list_users))
        .route(
            "/users/:id",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route("/users/:id/profile_image", post(users::upload_profile_image))
        // Categories
        .route(
            "/categories",
            get(categories::list_categories::<Category>).post(categories::create_category::<Category>),
        )
        .route(
            "/categories/:id",
            get(categories::get_category::<Category>)
                .put(categories::update_category::<Category>)
                .delete(categories::delete_category::<Category>),
        )
        .route(
            "/music_categories",
            get(categories::list_categories::<MusicCategory>)
                .post(categories::create_category::<MusicCategory>),
        )
        .route(
            "/music_categories/:id",
            get(categories::get_category::<MusicCategory>)
                .put(categories::update_category::<MusicCategory>)
                .delete(categories::delete_category::<MusicCategory>),
        )
        // Animes and mangas
        .route(
            "/animes",
            get(titles::list_titles::<Anime>).post(titles::create_title::<Anime>),
        )
        .route(
            "/animes/:id",
            get(titles::get_title::<Anime>)
                .put(titles::update_title::<Anime>)
                .delete(titles::delete_title::<Anime>),
        )
        .route("/animes/:id/poster", post(titles::upload_poster::<Anime>))
        .route(
            "/mangas",
            get(titles::list_titles::<Manga>).post(titles::create_title::<Manga>),
        )
        .route(
            "/mangas/:id",
            get(titles::get_title::<Manga>)
                .put(titles::update_title::<Manga>)
                .delete(titles::delete_title::<Manga>),
        )
        .route("/mangas/:id/poster", post(titles::upload_poster::<Manga>))
        // Episodes
        .route(
            "/episodes",
            get(episodes::list_episodes).post(episodes::create_episode),
        )
        .route(
            "/episodes/:id",
            get(episodes::get_episode)
                .put(episodes::update_episode)
                .delete(episodes::delete_episode),
        )
        .route("/episodes/:id/thumbnail", post(episodes::upload_thumbnail))
        // Manga chapters and pages
        .route(
            "/chapters",
            get(chapters::list_chapters).post(chapters::create_chapter),
        )
        .route(
            "/chapters/:id",
            get(chapters::get_chapter)
                .put(chapters::update_chapter)
                .delete(chapters::delete_chapter),
        )
        .route("/pages", get(chapters::list_pages).post(chapters::create_page))
        .route("/pages/:id", delete(chapters::delete_page))
        // Banners
        .route("/banners", get(banners::list_banners).post(banners::create_banner))
        .route("/banners/:id", delete(banners::delete_banner))
        // Comments
        .route("/comments", get(comments::list_comments))
        .route("/comments/:id", delete(comments::delete_comment))
        // Songs
        .route("/songs", get(songs::list_songs).post(songs::create_song))
        .route("/songs/:id", get(songs::get_song).delete(songs::delete_song))
}
