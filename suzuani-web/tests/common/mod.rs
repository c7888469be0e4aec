//! Shared helpers for the suzuani-web integration suites

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use suzuani_common::auth::hash_password;
use suzuani_common::config::MailConfig;
use suzuani_common::db::{connect_in_memory, Anime, BannerType, Category, Manga, MusicCategory};
use suzuani_common::mail::{Mailer, MemoryMailer};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

use suzuani_web::db::banners::{self, NewBanner};
use suzuani_web::db::music::{self, NewSong};
use suzuani_web::db::pages::{self, ChapterInput};
use suzuani_web::db::titles::{self, EpisodeInput, TitleInput};
use suzuani_web::db::{categories, users};
use suzuani_web::uploads::UploadStore;
use suzuani_web::{build_router, AppState};

pub const PASSWORD: &str = "secret123";
pub const TEST_SECRET: &str = "test-secret-key";
pub const TEST_MAX_UPLOAD: usize = 64 * 1024;

const BOUNDARY: &str = "suzuani-test-boundary";

/// App wired to an in-memory database, a temp static root and a capturing mailer
pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<MemoryMailer>,
    pub root: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_mailer(MemoryMailer::new()).await
    }

    pub async fn with_mailer(mailer: MemoryMailer) -> Self {
        let db = connect_in_memory().await.expect("Should create in-memory database");
        let root = TempDir::new().expect("Should create temp dir");
        let uploads = UploadStore::new(root.path().join("static"), TEST_MAX_UPLOAD);
        uploads.ensure_folders().expect("Should create upload folders");

        let mailer = Arc::new(mailer);
        let state = AppState::new(
            db,
            TEST_SECRET,
            mailer.clone() as Arc<dyn Mailer>,
            MailConfig::default(),
            uploads,
        );

        Self { state, mailer, root }
    }

    pub fn db(&self) -> &SqlitePool {
        &self.state.db
    }

    /// Files currently stored under `static/uploads/<folder>`.
    pub fn stored_uploads(&self, folder: &str) -> usize {
        match std::fs::read_dir(self.root.path().join("static/uploads").join(folder)) {
            Ok(entries) => entries.filter_map(|e| e.ok()).filter(|e| e.path().is_file()).count(),
            Err(_) => 0,
        }
    }

    pub fn static_path(&self, relative: &str) -> std::path::PathBuf {
        self.root.path().join("static").join(relative)
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };

        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request("GET", uri, token, Body::empty())).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request("DELETE", uri, token, Body::empty())).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(json_request("POST", uri, token, body)).await
    }

    pub async fn put_json(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(json_request("PUT", uri, token, body)).await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        token: Option<&str>,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> TestResponse {
        self.send(multipart_request(uri, token, fields, files)).await
    }

    /// Verified account; returns its id
    pub async fn create_user(&self, username: &str, email: &str, is_admin: bool) -> i64 {
        let id = users::create_user(self.db(), username, email, &hash_password(PASSWORD), "123456")
            .await
            .expect("Should create user");
        users::mark_verified(self.db(), id).await.unwrap();
        if is_admin {
            sqlx::query("UPDATE users SET is_admin = 1 WHERE id = ?")
                .bind(id)
                .execute(self.db())
                .await
                .unwrap();
        }
        id
    }

    /// Log in through the HTTP endpoint; returns the session token
    pub async fn login(&self, email: &str) -> String {
        let response = self
            .post_json("/login", None, json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        response.body["token"].as_str().expect("token").to_string()
    }

    /// Verified regular user, logged in
    pub async fn user_session(&self, username: &str) -> (i64, String) {
        let email = format!("{}@example.com", username);
        let id = self.create_user(username, &email, false).await;
        (id, self.login(&email).await)
    }

    /// Verified admin, logged in
    pub async fn admin_session(&self) -> (i64, String) {
        let id = self.create_user("boss", "boss@example.com", true).await;
        (id, self.login("boss@example.com").await)
    }

    pub async fn seed_category(&self, name: &str) -> i64 {
        categories::create::<Category>(self.db(), name).await.unwrap()
    }

    pub async fn seed_music_category(&self, name: &str) -> i64 {
        categories::create::<MusicCategory>(self.db(), name).await.unwrap()
    }

    pub async fn seed_anime(&self, category_id: i64, title: &str) -> i64 {
        titles::create::<Anime>(self.db(), &title_input(category_id, title), None)
            .await
            .unwrap()
    }

    pub async fn seed_manga(&self, category_id: i64, title: &str) -> i64 {
        titles::create::<Manga>(self.db(), &title_input(category_id, title), None)
            .await
            .unwrap()
    }

    pub async fn seed_episode(&self, anime_id: i64, title: &str, watch_link: &str) -> i64 {
        let input = EpisodeInput {
            title: title.to_string(),
            watch_link: watch_link.to_string(),
            anime_id,
        };
        titles::create_episode(self.db(), &input, None).await.unwrap()
    }

    pub async fn seed_chapter(&self, manga_id: i64, title: &str) -> i64 {
        let input = ChapterInput {
            title: title.to_string(),
            manga_id,
        };
        pages::create_chapter(self.db(), &input).await.unwrap()
    }

    pub async fn seed_page(&self, chapter_id: i64, page_number: i64) -> i64 {
        let url = format!("uploads/manga_pages/p{}-{}.png", chapter_id, page_number);
        pages::create_page(self.db(), chapter_id, page_number, &url).await.unwrap()
    }

    pub async fn seed_song(&self, music_category_id: i64, title: &str, artist: &str) -> i64 {
        let song = NewSong {
            title: title.to_string(),
            artist: artist.to_string(),
            cover_url: "uploads/covers/c.png".to_string(),
            song_url: "uploads/songs/s.mp3".to_string(),
            music_category_id,
        };
        music::create(self.db(), &song).await.unwrap()
    }

    pub async fn seed_banner(&self, banner_type: BannerType) -> i64 {
        let banner = NewBanner {
            image_url: "uploads/banners/b.png".to_string(),
            banner_type,
            anime_id: None,
            manga_id: None,
        };
        banners::create(self.db(), &banner).await.unwrap()
    }
}

pub fn title_input(category_id: i64, title: &str) -> TitleInput {
    TitleInput {
        title: title.to_string(),
        description: format!("About {}", title),
        rating: 8.0,
        release_year: 2020,
        category_id,
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(body).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn multipart_request(
    uri: &str,
    token: Option<&str>,
    fields: &[(&str, &str)],
    files: &[(&str, &str, &[u8])],
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes());
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                name, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY));
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}
