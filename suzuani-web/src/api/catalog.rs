//! Catalog browsing: home pages, search, title details, comments,
//! the manga reader and the music playlist
//!
//! Every route here sits behind the login guard.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use suzuani_common::db::{Anime, BannerType, Category, Episode, Manga, MusicCategory, Song};
use suzuani_common::embed::embed_url;
use suzuani_common::Error;
use tracing::{info, warn};

use crate::db::banners::{self, BANNERS_PER_PAGE};
use crate::db::titles::{self, TitleRow};
use crate::db::{categories, comments, likes, music, pages, MediaKind};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, MAX_PAGE_SIZE};
use crate::session::CurrentUser;
use crate::AppState;

/// Titles per category on the anime and manga home pages
pub const TITLES_PER_CATEGORY: i64 = 10;

/// Songs per category on the music home page
pub const SONGS_PER_CATEGORY: i64 = 15;

/// Manga pages per reader request when `per_page` is absent
pub const READER_PAGE_SIZE: i64 = 50;

#[derive(Debug, Serialize)]
pub struct Shelf<C, T> {
    pub category: C,
    pub items: Vec<T>,
}

async fn title_shelves<T: TitleRow>(pool: &SqlitePool) -> ApiResult<Vec<Shelf<Category, T>>> {
    let mut shelves = Vec::new();
    for category in categories::list_all::<Category>(pool).await? {
        let items = titles::list_by_category::<T>(pool, category.id, TITLES_PER_CATEGORY).await?;
        shelves.push(Shelf { category, items });
    }
    Ok(shelves)
}

/// GET /
pub async fn anime_home(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let banners = banners::list_by_type(&state.db, BannerType::Anime, BANNERS_PER_PAGE).await?;
    let shelves = title_shelves::<Anime>(&state.db).await?;
    Ok(Json(json!({ "banners": banners, "categories": shelves })))
}

/// GET /mangas
pub async fn manga_home(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let banners = banners::list_by_type(&state.db, BannerType::Manga, BANNERS_PER_PAGE).await?;
    let shelves = title_shelves::<Manga>(&state.db).await?;
    Ok(Json(json!({ "banners": banners, "categories": shelves })))
}

/// GET /music
pub async fn music_home(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let banners = banners::list_by_type(&state.db, BannerType::Music, BANNERS_PER_PAGE).await?;

    let mut shelves: Vec<Shelf<MusicCategory, Song>> = Vec::new();
    for category in categories::list_all::<MusicCategory>(&state.db).await? {
        let items = music::list_by_category(&state.db, category.id, SONGS_PER_CATEGORY).await?;
        shelves.push(Shelf { category, items });
    }

    Ok(Json(json!({ "banners": banners, "categories": shelves })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// GET /search?q=
pub async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> ApiResult<Json<Value>> {
    let q = query.q.as_deref().unwrap_or_default().trim().to_string();

    let (animes, mangas, songs) = if q.is_empty() {
        (Vec::new(), Vec::new(), Vec::new())
    } else {
        (
            titles::search::<Anime>(&state.db, &q).await?,
            titles::search::<Manga>(&state.db, &q).await?,
            music::search(&state.db, &q).await?,
        )
    };

    Ok(Json(json!({
        "query": q,
        "animes": animes,
        "mangas": mangas,
        "songs": songs,
    })))
}

/// Episode plus the URL to embed its player
#[derive(Debug, Serialize)]
pub struct EpisodeView {
    #[serde(flatten)]
    pub episode: Episode,
    pub embed_url: String,
}

/// GET /anime/:id
pub async fn anime_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let mut anime: Anime = titles::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Anime {}", id)))?;

    titles::increment_views(&state.db, MediaKind::Anime, id).await?;
    anime.views += 1;

    let category = categories::find::<Category>(&state.db, anime.category_id).await?;
    let episodes: Vec<EpisodeView> = titles::episodes_for_anime(&state.db, id)
        .await?
        .into_iter()
        .map(|episode| EpisodeView {
            embed_url: embed_url(&episode.watch_link),
            episode,
        })
        .collect();

    let detail = social_context(&state, MediaKind::Anime, current.user.id, id).await?;

    Ok(Json(json!({
        "anime": anime,
        "category": category,
        "episodes": episodes,
        "comments": detail.comments,
        "like_count": detail.like_count,
        "liked": detail.liked,
        "has_commented": detail.has_commented,
    })))
}

/// GET /manga/:id
pub async fn manga_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let mut manga: Manga = titles::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Manga {}", id)))?;

    titles::increment_views(&state.db, MediaKind::Manga, id).await?;
    manga.views += 1;

    let category = categories::find::<Category>(&state.db, manga.category_id).await?;
    let chapters = pages::chapters_for_manga(&state.db, id).await?;
    let detail = social_context(&state, MediaKind::Manga, current.user.id, id).await?;

    Ok(Json(json!({
        "manga": manga,
        "category": category,
        "chapters": chapters,
        "comments": detail.comments,
        "like_count": detail.like_count,
        "liked": detail.liked,
        "has_commented": detail.has_commented,
    })))
}

struct SocialContext {
    comments: Vec<comments::CommentView>,
    like_count: i64,
    liked: bool,
    has_commented: bool,
}

async fn social_context(state: &AppState, kind: MediaKind, user_id: i64, title_id: i64) -> ApiResult<SocialContext> {
    Ok(SocialContext {
        comments: comments::list_for(&state.db, kind, title_id).await?,
        like_count: likes::count(&state.db, kind, title_id).await?,
        liked: likes::is_liked(&state.db, kind, user_id, title_id).await?,
        has_commented: comments::has_commented(&state.db, kind, user_id, title_id).await?,
    })
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub text: String,
}

async fn post_comment(
    state: &AppState,
    kind: MediaKind,
    user_id: i64,
    title_id: i64,
    text: &str,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if !titles::exists(&state.db, kind, title_id).await? {
        return Err(ApiError::NotFound(format!("{} {}", kind.label(), title_id)));
    }

    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::invalid_field("text", "This field is required."));
    }

    let already_commented = || ApiError::Conflict(format!("You have already commented on this {}.", kind.label()));
    if comments::has_commented(&state.db, kind, user_id, title_id).await? {
        return Err(already_commented());
    }

    // The unique index settles requests that raced past the check above
    let comment_id = match comments::create(&state.db, kind, user_id, title_id, text).await {
        Ok(id) => id,
        Err(Error::Conflict(_)) => return Err(already_commented()),
        Err(e) => return Err(e.into()),
    };
    info!("User {} commented on {} {}", user_id, kind.label(), title_id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "comment_id": comment_id,
            "message": "Your comment has been posted!",
            "redirect": format!("/{}/{}", kind.label(), title_id),
        })),
    ))
}

/// POST /anime/:id/comments (and POST /anime/:id)
pub async fn comment_on_anime(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(form): Json<CommentForm>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    post_comment(&state, MediaKind::Anime, current.user.id, id, &form.text).await
}

/// POST /manga/:id/comments
pub async fn comment_on_manga(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(form): Json<CommentForm>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    post_comment(&state, MediaKind::Manga, current.user.id, id, &form.text).await
}

#[derive(Debug, Deserialize)]
pub struct ReaderQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// GET /manga/:manga_id/read/:chapter_id?page=
pub async fn read_chapter(
    State(state): State<AppState>,
    Path((manga_id, chapter_id)): Path<(i64, i64)>,
    Query(query): Query<ReaderQuery>,
) -> ApiResult<Json<Value>> {
    let chapter = pages::find_chapter(&state.db, chapter_id)
        .await?
        .filter(|chapter| chapter.manga_id == manga_id)
        .ok_or_else(|| ApiError::NotFound(format!("Chapter {} of manga {}", chapter_id, manga_id)))?;

    let page_size = query.per_page.unwrap_or(READER_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let total = pages::count_pages(&state.db, Some(chapter_id)).await?;
    let pagination = calculate_pagination(total, query.page.unwrap_or(1), page_size);
    let page_rows = pages::list_pages(&state.db, Some(chapter_id), pagination.offset, pagination.page_size).await?;
    let (prev_chapter_id, next_chapter_id) = pages::neighbor_chapters(&state.db, manga_id, chapter_id).await?;

    Ok(Json(json!({
        "chapter": chapter,
        "pages": page_rows,
        "page": pagination.page,
        "per_page": pagination.page_size,
        "total_pages": pagination.total_pages,
        "total_images": total,
        "prev_chapter_id": prev_chapter_id,
        "next_chapter_id": next_chapter_id,
    })))
}

/// One song as the player consumes it
#[derive(Debug, Serialize)]
pub struct PlaylistEntry {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub cover_url: String,
    pub song_url: String,
}

impl From<Song> for PlaylistEntry {
    fn from(song: Song) -> Self {
        Self {
            id: song.id,
            title: song.title,
            artist: song.artist,
            cover_url: format!("/static/{}", song.cover_url),
            song_url: format!("/static/{}", song.song_url),
        }
    }
}

/// GET /api/playlist
///
/// A failing query yields an empty playlist rather than an error.
pub async fn playlist(State(state): State<AppState>) -> Json<Vec<PlaylistEntry>> {
    match music::list_all(&state.db).await {
        Ok(songs) => Json(songs.into_iter().map(PlaylistEntry::from).collect()),
        Err(e) => {
            warn!("Playlist query failed: {}", e);
            Json(Vec::new())
        }
    }
}

/// Catalog routes; mounted behind the login guard
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(anime_home))
        .route("/mangas", get(manga_home))
        .route("/music", get(music_home))
        .route("/search", get(search))
        .route("/anime/:id", get(anime_detail).post(comment_on_anime))
        .route("/anime/:id/comments", post(comment_on_anime))
        .route("/manga/:id", get(manga_detail))
        .route("/manga/:id/comments", post(comment_on_manga))
        .route("/manga/:manga_id/read/:chapter_id", get(read_chapter))
        .route("/api/playlist", get(playlist))
}
