//! Admin banner management

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use suzuani_common::db::{Banner, BannerType};
use tracing::info;

use super::not_found;
use crate::db::banners::{self, NewBanner};
use crate::db::{titles, MediaKind};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::pagination::{Page, PageParams};
use crate::uploads::{MultipartForm, UploadKind};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BannerFilter {
    pub banner_type: Option<BannerType>,
}

/// GET /admin/banners?banner_type=
pub async fn list_banners(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(filter): Query<BannerFilter>,
) -> ApiResult<Json<Page<Banner>>> {
    let total = banners::count(&state.db, filter.banner_type).await?;
    let pagination = page.paginate(total);
    let items = banners::list(&state.db, filter.banner_type, pagination.offset, pagination.page_size).await?;
    Ok(Json(Page::new(items, pagination, total)))
}

/// POST /admin/banners (multipart: `banner_type`, optional `anime_id` /
/// `manga_id`, file `image`)
///
/// A linked anime is only accepted on anime banners, a linked manga only on
/// manga banners.
pub async fn create_banner(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Banner>)> {
    let form = MultipartForm::read(multipart).await?;

    let banner_type: BannerType = form
        .required_text("banner_type")?
        .parse()
        .map_err(|_| ApiError::invalid_field("banner_type", "Choose anime, manga or music."))?;
    let anime_id = form.int("anime_id")?;
    let manga_id = form.int("manga_id")?;
    let image = form.required_file("image")?;

    let mut errors = FieldErrors::new();
    if let Some(id) = anime_id {
        if banner_type != BannerType::Anime {
            errors.insert("anime_id".to_string(), "Only anime banners link an anime.".to_string());
        } else if !titles::exists(&state.db, MediaKind::Anime, id).await? {
            errors.insert("anime_id".to_string(), "Unknown anime.".to_string());
        }
    }
    if let Some(id) = manga_id {
        if banner_type != BannerType::Manga {
            errors.insert("manga_id".to_string(), "Only manga banners link a manga.".to_string());
        } else if !titles::exists(&state.db, MediaKind::Manga, id).await? {
            errors.insert("manga_id".to_string(), "Unknown manga.".to_string());
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let image_url = state.uploads.save(UploadKind::Banner, &image.file_name, &image.bytes).await?;
    let new_banner = NewBanner {
        image_url,
        banner_type,
        anime_id,
        manga_id,
    };
    let id = match banners::create(&state.db, &new_banner).await {
        Ok(id) => id,
        Err(e) => {
            state.uploads.remove(&new_banner.image_url).await;
            return Err(e.into());
        }
    };
    info!("Created {} banner {}", banner_type, id);

    Ok((
        StatusCode::CREATED,
        Json(Banner {
            id,
            image_url: new_banner.image_url,
            banner_type: banner_type.to_string(),
            anime_id,
            manga_id,
        }),
    ))
}

pub async fn delete_banner(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let banner = banners::find(&state.db, id)
        .await?
        .ok_or_else(|| not_found("Banner", id))?;

    if !banners::delete(&state.db, id).await? {
        return Err(not_found("Banner", id));
    }
    state.uploads.remove(&banner.image_url).await;
    Ok(StatusCode::NO_CONTENT)
}
