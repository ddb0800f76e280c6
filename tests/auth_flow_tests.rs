//! Registration, approval and session flows over HTTP

mod common;

use axum::http::{header, Method, StatusCode};
use common::{TestApp, EDITOR_PASSWORD, OWNER_PASSWORD};
use mediahouse::config::ServerConfig;
use serde_json::json;

#[tokio::test]
async fn test_register_approve_and_login() {
    let app = TestApp::new();

    let registered = app.register("Editor_One", "Editor@Example.com").await;
    assert_eq!(registered.status, StatusCode::CREATED);
    assert_eq!(registered.body["success"], true);
    assert_eq!(registered.body["data"]["username"], "editor_one");
    assert_eq!(registered.body["data"]["email"], "editor@example.com");
    assert_eq!(registered.body["data"]["status"], "pending");

    let mail = app.ctx.mailer.sent();
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].to, "owner@example.com");

    // Pending accounts cannot log in yet
    let pending = app.login("editor_one", EDITOR_PASSWORD).await;
    assert_eq!(pending.status, StatusCode::FORBIDDEN);
    assert_eq!(pending.error_type(), "ACCOUNT_PENDING");

    let status = app
        .get("/api/auth/admin/registration-status/editor_one", None)
        .await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.body["data"]["status"], "pending");

    let token = app.last_approval_token();
    let approved = app
        .get(&format!("/api/auth/admin/approve-token/{}", token), None)
        .await;
    assert_eq!(approved.status, StatusCode::OK);
    assert_eq!(approved.body["data"]["role"], "admin");

    // Tokens are single use
    let reused = app
        .get(&format!("/api/auth/admin/approve-token/{}", token), None)
        .await;
    assert_eq!(reused.status, StatusCode::NOT_FOUND);
    assert_eq!(reused.error_type(), "INVALID_TOKEN");

    let login = app.login("editor_one", EDITOR_PASSWORD).await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["data"]["expiresIn"], 900);
    let set_cookie = login.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("admin_token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));

    let cookie = login.session_cookie().unwrap();
    let check = app.get("/api/auth/admin/check-status", Some(&cookie)).await;
    assert_eq!(check.status, StatusCode::OK);
    assert_eq!(check.body["data"]["authenticated"], true);
    assert_eq!(check.body["data"]["admin"]["username"], "editor_one");
    assert!(check.body["data"]["admin"].get("passwordHash").is_none());

    let logout = app
        .post("/api/auth/admin/logout", json!({}), Some(&cookie))
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    let cleared = logout.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_check_status_requires_session() {
    let app = TestApp::new();

    let anonymous = app.get("/api/auth/admin/check-status", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["success"], false);

    let garbage = app
        .get("/api/auth/admin/check-status", Some("admin_token=not-a-jwt"))
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_repeated_registration_is_blocked() {
    let app = TestApp::new();

    assert_eq!(
        app.register("repeat", "repeat@example.com").await.status,
        StatusCode::CREATED
    );

    let second = app.register("repeat", "repeat@example.com").await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["data"]["status"], "pending");

    // Third attempt reaches the ceiling and starts the block
    assert_eq!(
        app.register("repeat", "repeat@example.com").await.status,
        StatusCode::OK
    );
    assert_eq!(app.ctx.mailer.sent().len(), 3);

    let blocked = app.register("repeat", "repeat@example.com").await;
    assert_eq!(blocked.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(blocked.error_type(), "REGISTRATION_BLOCKED");
    assert!(blocked.headers.contains_key(header::RETRY_AFTER));

    let status = app
        .get("/api/auth/admin/registration-status/repeat", None)
        .await;
    assert!(status.body["data"]["blockedUntil"].is_string());
}

#[tokio::test]
async fn test_only_latest_approval_token_is_valid() {
    let app = TestApp::new();

    app.register("rotate", "rotate@example.com").await;
    let first = app.last_approval_token();
    app.register("rotate", "rotate@example.com").await;
    let second = app.last_approval_token();
    assert_ne!(first, second);

    let stale = app
        .get(&format!("/api/auth/admin/approve-token/{}", first), None)
        .await;
    assert_eq!(stale.status, StatusCode::NOT_FOUND);

    let fresh = app
        .get(&format!("/api/auth/admin/approve-token/{}", second), None)
        .await;
    assert_eq!(fresh.status, StatusCode::OK);
}

#[tokio::test]
async fn test_registration_conflicts_and_validation() {
    let app = TestApp::new();

    app.register("taken", "taken@example.com").await;
    let clash = app.register("someone", "taken@example.com").await;
    assert_eq!(clash.status, StatusCode::CONFLICT);
    assert_eq!(clash.error_type(), "CONFLICT");

    let other_email = app.register("taken", "elsewhere@example.com").await;
    assert_eq!(other_email.status, StatusCode::CONFLICT);

    let weak = app
        .post(
            "/api/auth/admin/register",
            json!({ "username": "weakling", "email": "weak@example.com", "password": "password" }),
            None,
        )
        .await;
    assert_eq!(weak.status, StatusCode::BAD_REQUEST);
    assert_eq!(weak.error_type(), "VALIDATION_ERROR");

    let bad_name = app
        .post(
            "/api/auth/admin/register",
            json!({
                "username": "no spaces!",
                "email": "x@example.com",
                "password": EDITOR_PASSWORD,
            }),
            None,
        )
        .await;
    assert_eq!(bad_name.status, StatusCode::BAD_REQUEST);

    let malformed = app
        .request(Method::POST, "/api/auth/admin/register", Some(json!("nope")), None)
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert_eq!(malformed.error_type(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_closed_registration() {
    let app = TestApp::new();
    let owner = app.owner_session().await;

    let update = app
        .put("/api/settings", json!({ "allowRegistration": false }), Some(&owner))
        .await;
    assert_eq!(update.status, StatusCode::OK);

    let response = app.register("latecomer", "late@example.com").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_type(), "REGISTRATION_CLOSED");
}

#[tokio::test]
async fn test_fifth_failure_locks_username() {
    let app = TestApp::new();
    app.owner_session().await;

    // Distinct agents keep the anomaly detector quiet
    for attempt in 1..=4 {
        let response = app
            .login_as("owner", "WrongPass123", &format!("agent-{}", attempt))
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.error_type(), "INVALID_CREDENTIALS");
    }

    let locked = app.login_as("owner", "WrongPass123", "agent-5").await;
    assert_eq!(locked.status, StatusCode::LOCKED);
    assert_eq!(locked.error_type(), "ACCOUNT_LOCKED");
    assert!(locked.headers.contains_key(header::RETRY_AFTER));

    // Correct password is refused while locked
    let still_locked = app.login_as("owner", OWNER_PASSWORD, "agent-6").await;
    assert_eq!(still_locked.status, StatusCode::LOCKED);
}

#[tokio::test]
async fn test_rapid_attempts_require_captcha() {
    let app = TestApp::new();
    app.owner_session().await;

    for _ in 0..3 {
        let response = app.login_as("owner", "WrongPass123", "burst-agent").await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    let challenged = app.login_as("owner", OWNER_PASSWORD, "burst-agent").await;
    assert_eq!(challenged.status, StatusCode::BAD_REQUEST);
    assert_eq!(challenged.error_type(), "CAPTCHA_REQUIRED");
    let captcha_id = challenged.body["captcha"]["id"].as_str().unwrap().to_string();
    let question = challenged.body["captcha"]["question"].as_str().unwrap().to_string();

    let wrong = app
        .request_as(
            Method::POST,
            "/api/auth/admin/login",
            Some(json!({
                "username": "owner",
                "password": OWNER_PASSWORD,
                "captchaId": captcha_id,
                "captchaAnswer": solve(&question) + 1,
            })),
            None,
            "burst-agent",
        )
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong.error_type(), "INVALID_CAPTCHA");

    let retry_id = wrong.body["captcha"]["id"].as_str().unwrap().to_string();
    let retry_question = wrong.body["captcha"]["question"].as_str().unwrap().to_string();
    let solved = app
        .request_as(
            Method::POST,
            "/api/auth/admin/login",
            Some(json!({
                "username": "owner",
                "password": OWNER_PASSWORD,
                "captchaId": retry_id,
                "captchaAnswer": solve(&retry_question).to_string(),
            })),
            None,
            "burst-agent",
        )
        .await;
    assert_eq!(solved.status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_rate_limit_headers() {
    let app = TestApp::new();

    let response = app.login_as("nobody", "WrongPass123", "header-agent").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers["x-ratelimit-limit"], "10");
    assert_eq!(response.headers["x-ratelimit-remaining"], "9");
}

#[tokio::test]
async fn test_forwarded_for_does_not_reset_login_window() {
    let app = TestApp::new();

    // Fresh usernames and agents keep lockout and captcha out of the way
    for attempt in 1..=10 {
        let response = app
            .login_forwarded(
                &format!("user{}", attempt),
                "WrongPass123",
                &format!("agent-{}", attempt),
                &format!("198.51.100.{}", attempt),
            )
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    let limited = app
        .login_forwarded("user11", "WrongPass123", "agent-11", "198.51.100.11")
        .await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.error_type(), "RATE_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn test_forwarded_for_honoured_behind_trusted_proxy() {
    let mut config = ServerConfig::for_tests();
    config.security.trust_proxy = true;
    let app = TestApp::with_config(config);

    for attempt in 1..=10 {
        let agent = format!("agent-{}", attempt);
        app.login_forwarded("someone", "WrongPass123", &agent, "198.51.100.1")
            .await;
    }

    let other_client = app
        .login_forwarded("other", "WrongPass123", "agent-x", "198.51.100.2")
        .await;
    assert_eq!(other_client.status, StatusCode::UNAUTHORIZED);
    assert_eq!(other_client.headers["x-ratelimit-remaining"], "9");
}

#[tokio::test]
async fn test_panel_approval_and_rejection() {
    let app = TestApp::new();
    let owner = app.owner_session().await;

    let first = app.register("approve_me", "approve@example.com").await;
    assert_eq!(first.status, StatusCode::CREATED);
    app.register("reject_me", "reject@example.com").await;

    let pending = app.get("/api/auth/admin/pending", Some(&owner)).await;
    assert_eq!(pending.status, StatusCode::OK);
    assert_eq!(pending.body["pagination"]["total"], 2);
    let ids: Vec<(String, String)> = pending.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| {
            (
                a["username"].as_str().unwrap().to_string(),
                a["id"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    let id_of = |name: &str| ids.iter().find(|(u, _)| u == name).unwrap().1.clone();

    let approved = app
        .post(
            &format!("/api/auth/admin/approve/{}", id_of("approve_me")),
            json!({}),
            Some(&owner),
        )
        .await;
    assert_eq!(approved.status, StatusCode::OK);
    assert_eq!(approved.body["data"]["role"], "admin");

    let rejected = app
        .delete(
            &format!("/api/auth/admin/reject/{}", id_of("reject_me")),
            Some(&owner),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::OK);

    let gone = app
        .get("/api/auth/admin/registration-status/reject_me", None)
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    // Regular admins cannot manage registrations
    let editor = app.login_as("approve_me", EDITOR_PASSWORD, "approved-agent").await;
    let cookie = editor.session_cookie().unwrap();
    let forbidden = app.get("/api/auth/admin/pending", Some(&cookie)).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_refresh_and_captcha_endpoints() {
    let app = TestApp::new();
    let owner = app.owner_session().await;

    let refreshed = app
        .post("/api/auth/admin/refresh", json!({}), Some(&owner))
        .await;
    assert_eq!(refreshed.status, StatusCode::OK);
    assert!(refreshed.session_cookie().is_some());

    let captcha = app.get("/api/auth/admin/captcha", None).await;
    assert_eq!(captcha.status, StatusCode::OK);
    assert!(captcha.body["data"]["question"]
        .as_str()
        .unwrap()
        .starts_with("What is "));
}

fn solve(question: &str) -> i64 {
    let expr = question.trim_start_matches("What is ").trim_end_matches('?');
    let parts: Vec<&str> = expr.split(' ').collect();
    let a: i64 = parts[0].parse().unwrap();
    let b: i64 = parts[2].parse().unwrap();
    match parts[1] {
        "+" => a + b,
        "-" => a - b,
        _ => a * b,
    }
}
