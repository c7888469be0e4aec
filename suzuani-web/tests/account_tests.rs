//! Integration tests for accounts: registration, OTP verification, login,
//! logout, password reset, profile and history

mod common;

use axum::http::{header, StatusCode};
use serde_json::json;
use suzuani_common::auth::reset_token;
use suzuani_common::db::set_setting;
use suzuani_common::mail::MemoryMailer;
use suzuani_web::db::{likes, users, MediaKind};
use suzuani_web::session::unix_now;

use common::{TestApp, PASSWORD, TEST_SECRET};

fn registration(username: &str, email: &str) -> serde_json::Value {
    json!({
        "username": username,
        "email": email,
        "password": PASSWORD,
        "confirm_password": PASSWORD,
    })
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let app = TestApp::new().await;

    let response = app.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["module"], "suzuani-web");
    assert!(response.body["version"].is_string());
}

// =============================================================================
// Registration and OTP verification
// =============================================================================

#[tokio::test]
async fn test_register_verify_login_flow() {
    let app = TestApp::new().await;

    let response = app
        .post_json("/register", None, registration("sakura", "sakura@example.com"))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["mail_sent"], true);
    let user_id = response.body["user_id"].as_i64().unwrap();
    assert_eq!(response.body["verify_url"], format!("/verify_otp/{}", user_id));

    let user = users::find_by_id(app.db(), user_id).await.unwrap().unwrap();
    assert!(!user.is_verified);
    let otp = user.otp.clone().expect("OTP stored");
    assert_eq!(otp.len(), 6);

    let mail = app.mailer.last_to("sakura@example.com").expect("OTP mail sent");
    assert_eq!(mail.subject, "SuzuAni - Verify Your Email Address");
    assert!(mail.body.contains(&otp));

    // Not verified yet
    let response = app
        .post_json("/login", None, json!({ "email": "sakura@example.com", "password": PASSWORD }))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["error"]["code"], "NOT_VERIFIED");
    assert_eq!(response.body["error"]["verify_url"], format!("/verify_otp/{}", user_id));

    let wrong = if otp == "000000" { "111111" } else { "000000" };
    let response = app
        .post_json(&format!("/verify_otp/{}", user_id), None, json!({ "otp": wrong }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"]["message"], "Invalid OTP. Please try again.");

    let response = app
        .post_json(&format!("/verify_otp/{}", user_id), None, json!({ "otp": otp }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "verified");

    let user = users::find_by_id(app.db(), user_id).await.unwrap().unwrap();
    assert!(user.is_verified);
    assert!(user.otp.is_none());

    // A second verification is a no-op
    let response = app
        .post_json(&format!("/verify_otp/{}", user_id), None, json!({ "otp": otp }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "already_verified");

    let token = app.login("sakura@example.com").await;
    let response = app.get("/profile", Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["username"], "sakura");
    assert!(response.body.get("password_hash").is_none());
    assert!(response.body.get("otp").is_none());
}

#[tokio::test]
async fn test_verify_unknown_user_is_404() {
    let app = TestApp::new().await;

    let response = app.post_json("/verify_otp/999", None, json!({ "otp": "123456" })).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_resend_otp_replaces_code() {
    let app = TestApp::new().await;
    let response = app
        .post_json("/register", None, registration("kenji", "kenji@example.com"))
        .await;
    let user_id = response.body["user_id"].as_i64().unwrap();

    let response = app
        .post_json(&format!("/verify_otp/{}/resend", user_id), None, json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let user = users::find_by_id(app.db(), user_id).await.unwrap().unwrap();
    let otp = user.otp.expect("OTP stored");
    let mail = app.mailer.last_to("kenji@example.com").unwrap();
    assert!(mail.body.contains(&otp));
    assert_eq!(app.mailer.sent().len(), 2);
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = TestApp::new().await;

    let response = app
        .post_json(
            "/register",
            None,
            json!({
                "username": "a",
                "email": "not-an-email",
                "password": "abc",
                "confirm_password": "abd",
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"]["code"], "VALIDATION_ERROR");
    let fields = &response.body["error"]["fields"];
    assert!(fields["username"].is_string());
    assert!(fields["email"].is_string());
    assert!(fields["password"].is_string() || fields["confirm_password"].is_string());
}

#[tokio::test]
async fn test_register_duplicate_identity_rejected() {
    let app = TestApp::new().await;
    app.create_user("hana", "hana@example.com", false).await;

    let response = app
        .post_json("/register", None, registration("hana", "HANA@example.com"))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields = &response.body["error"]["fields"];
    assert!(fields["username"].is_string());
    assert!(fields["email"].is_string());
}

#[tokio::test]
async fn test_register_while_logged_in_is_conflict() {
    let app = TestApp::new().await;
    let (_, token) = app.user_session("yuki").await;

    let response = app
        .post_json("/register", Some(&token), registration("other", "other@example.com"))
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_survives_mail_failure() {
    let app = TestApp::with_mailer(MemoryMailer::failing()).await;

    let response = app
        .post_json("/register", None, registration("taro", "taro@example.com"))
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["mail_sent"], false);
    assert!(response.body["message"]
        .as_str()
        .unwrap()
        .contains("could not send OTP email"));
}

// =============================================================================
// Login and logout
// =============================================================================

#[tokio::test]
async fn test_login_bad_credentials() {
    let app = TestApp::new().await;
    app.create_user("mio", "mio@example.com", false).await;

    for body in [
        json!({ "email": "mio@example.com", "password": "wrong-password" }),
        json!({ "email": "nobody@example.com", "password": PASSWORD }),
    ] {
        let response = app.post_json("/login", None, body).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.body["error"]["message"],
            "Login Unsuccessful. Please check email and password."
        );
    }
}

#[tokio::test]
async fn test_login_sets_cookie_and_honours_local_next() {
    let app = TestApp::new().await;
    app.create_user("ren", "ren@example.com", false).await;

    let response = app
        .post_json(
            "/login?next=%2Fanime%2F3",
            None,
            json!({ "email": "ren@example.com", "password": PASSWORD, "remember": true }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["next"], "/anime/3");

    let cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("suzuani_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age="));

    let response = app
        .post_json(
            "/login?next=https%3A%2F%2Fevil.example%2F",
            None,
            json!({ "email": "ren@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(response.body["next"], "/");
}

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let app = TestApp::new().await;
    app.create_user("aoi", "aoi@example.com", false).await;
    let token = app.login("aoi@example.com").await;

    let request = axum::http::Request::builder()
        .uri("/profile")
        .header(header::COOKIE, format!("theme=dark; suzuani_session={}", token))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["username"], "aoi");
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::new().await;
    let (_, token) = app.user_session("sora").await;

    let response = app.post_json("/logout", Some(&token), json!({})).await;
    assert_eq!(response.status, StatusCode::OK);
    let cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("Max-Age=0"));

    let response = app.get("/profile", Some(&token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_reports_login_url() {
    let app = TestApp::new().await;

    let response = app.get("/profile", None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"]["login_url"], "/login?next=%2Fprofile");
}

// =============================================================================
// Password reset
// =============================================================================

#[tokio::test]
async fn test_reset_request_same_message_for_unknown_email() {
    let app = TestApp::new().await;
    app.create_user("nao", "nao@example.com", false).await;

    let known = app
        .post_json("/reset_password", None, json!({ "email": "nao@example.com" }))
        .await;
    let unknown = app
        .post_json("/reset_password", None, json!({ "email": "ghost@example.com" }))
        .await;

    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(unknown.status, StatusCode::OK);
    assert_eq!(known.body["message"], unknown.body["message"]);

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "nao@example.com");
    assert_eq!(sent[0].subject, "SuzuAni - Password Reset Request");
    assert!(sent[0].body.contains("expires in 30 minutes"));
}

#[tokio::test]
async fn test_reset_email_states_configured_lifetime() {
    let app = TestApp::new().await;
    app.create_user("nao", "nao@example.com", false).await;
    set_setting(app.db(), "reset_token_max_age_seconds", "3600").await.unwrap();

    let response = app
        .post_json("/reset_password", None, json!({ "email": "nao@example.com" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let mail = app.mailer.last_to("nao@example.com").expect("reset mail sent");
    assert!(mail.body.contains("expires in 1 hour"));
    assert!(!mail.body.contains("30 minutes"));
}

#[tokio::test]
async fn test_reset_password_with_token() {
    let app = TestApp::new().await;
    let (user_id, old_session) = app.user_session("emi").await;
    let token = reset_token::issue(user_id, TEST_SECRET, unix_now());

    let response = app.get(&format!("/reset_password/{}", token), None).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .post_json(
            &format!("/reset_password/{}", token),
            None,
            json!({ "password": "brand-new-pw", "confirm_password": "brand-new-pw" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    // Existing sessions are gone
    let response = app.get("/profile", Some(&old_session)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .post_json("/login", None, json!({ "email": "emi@example.com", "password": "brand-new-pw" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_reset_password_rejects_bad_tokens() {
    let app = TestApp::new().await;
    let user_id = app.create_user("rin", "rin@example.com", false).await;

    let forged = reset_token::issue(user_id, "some-other-secret", unix_now());
    let expired = reset_token::issue(user_id, TEST_SECRET, unix_now() - 24 * 3600);

    for token in ["garbage", forged.as_str(), expired.as_str()] {
        let response = app.get(&format!("/reset_password/{}", token), None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "token {}", token);
        assert_eq!(response.body["error"]["message"], "That is an invalid or expired token.");
    }
}

#[tokio::test]
async fn test_reset_password_validates_confirmation() {
    let app = TestApp::new().await;
    let user_id = app.create_user("kai", "kai@example.com", false).await;
    let token = reset_token::issue(user_id, TEST_SECRET, unix_now());

    let response = app
        .post_json(
            &format!("/reset_password/{}", token),
            None,
            json!({ "password": "abcdef", "confirm_password": "abcdeg" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Profile and history
// =============================================================================

#[tokio::test]
async fn test_update_profile_checks_uniqueness_excluding_self() {
    let app = TestApp::new().await;
    app.create_user("taken", "taken@example.com", false).await;
    let (user_id, token) = app.user_session("momo").await;

    // Keeping your own name is fine
    let response = app
        .post_json(
            "/profile",
            Some(&token),
            json!({ "username": "momo", "email": "momo2@example.com" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["email"], "momo2@example.com");

    let response = app
        .post_json(
            "/profile",
            Some(&token),
            json!({ "username": "taken", "email": "momo2@example.com" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["error"]["fields"]["username"].is_string());

    let user = users::find_by_id(app.db(), user_id).await.unwrap().unwrap();
    assert_eq!(user.username, "momo");
}

#[tokio::test]
async fn test_profile_picture_upload() {
    let app = TestApp::new().await;
    let (user_id, token) = app.user_session("nana").await;

    let response = app
        .post_multipart("/profile/picture", Some(&token), &[], &[("picture", "me.PNG", b"fake-png")])
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let path = response.body["profile_image"].as_str().unwrap().to_string();
    assert!(path.starts_with("uploads/profiles/"));
    assert!(path.ends_with(".png"));
    assert!(app.root.path().join("static").join(&path).exists());

    let user = users::find_by_id(app.db(), user_id).await.unwrap().unwrap();
    assert_eq!(user.profile_image, path);

    let response = app
        .post_multipart("/profile/picture", Some(&token), &[], &[("picture", "notes.txt", b"text")])
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_lists_liked_titles() {
    let app = TestApp::new().await;
    let (user_id, token) = app.user_session("riko").await;
    let category = app.seed_category("Action").await;
    let anime = app.seed_anime(category, "Blade Dance").await;
    let manga = app.seed_manga(category, "Iron Pages").await;
    app.seed_anime(category, "Unliked").await;

    likes::toggle(app.db(), MediaKind::Anime, user_id, anime).await.unwrap();
    likes::toggle(app.db(), MediaKind::Manga, user_id, manga).await.unwrap();

    let response = app.get("/history", Some(&token)).await;

    assert_eq!(response.status, StatusCode::OK);
    let animes = response.body["animes"].as_array().unwrap();
    let mangas = response.body["mangas"].as_array().unwrap();
    assert_eq!(animes.len(), 1);
    assert_eq!(animes[0]["title"], "Blade Dance");
    assert_eq!(mangas.len(), 1);
    assert_eq!(mangas[0]["title"], "Iron Pages");
}
