//! Shared harness for the HTTP integration tests
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use mediahouse::{
    config::{BootstrapAdmin, ServerConfig},
    db::Store,
    mailer::Mailer,
    server::build_router,
    AppContext,
};
use serde_json::Value;
use tower::ServiceExt;

pub const OWNER_PASSWORD: &str = "OwnerPass123";
pub const EDITOR_PASSWORD: &str = "EditorPass123";

pub struct TestApp {
    pub ctx: AppContext,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `name=value` pair of the first Set-Cookie header
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)?
            .to_str()
            .ok()?
            .split(';')
            .next()
            .map(str::to_string)
    }

    pub fn error_type(&self) -> &str {
        self.body["type"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::for_tests())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let ctx = AppContext::with_store(config, Store::in_memory(), Mailer::with_outbox());
        let router = build_router(ctx.clone());
        Self { ctx, router }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> TestResponse {
        self.request_as(method, uri, body, cookie, "integration-tests").await
    }

    pub async fn request_as(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
        user_agent: &str,
    ) -> TestResponse {
        self.send(method, uri, body, cookie, user_agent, None).await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
        user_agent: &str,
        forwarded_for: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::USER_AGENT, user_agent);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(forwarded_for) = forwarded_for {
            builder = builder.header("x-forwarded-for", forwarded_for);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, None, cookie).await
    }

    pub async fn post(&self, uri: &str, body: Value, cookie: Option<&str>) -> TestResponse {
        self.request(Method::POST, uri, Some(body), cookie).await
    }

    pub async fn put(&self, uri: &str, body: Value, cookie: Option<&str>) -> TestResponse {
        self.request(Method::PUT, uri, Some(body), cookie).await
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, None, cookie).await
    }

    pub async fn register(&self, username: &str, email: &str) -> TestResponse {
        self.post(
            "/api/auth/admin/register",
            serde_json::json!({
                "username": username,
                "email": email,
                "password": EDITOR_PASSWORD,
            }),
            None,
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.login_as(username, password, "integration-tests").await
    }

    pub async fn login_as(&self, username: &str, password: &str, user_agent: &str) -> TestResponse {
        self.request_as(
            Method::POST,
            "/api/auth/admin/login",
            Some(serde_json::json!({ "username": username, "password": password })),
            None,
            user_agent,
        )
        .await
    }

    /// Login attempt claiming to come from `forwarded_for`
    pub async fn login_forwarded(
        &self,
        username: &str,
        password: &str,
        user_agent: &str,
        forwarded_for: &str,
    ) -> TestResponse {
        self.send(
            Method::POST,
            "/api/auth/admin/login",
            Some(serde_json::json!({ "username": username, "password": password })),
            None,
            user_agent,
            Some(forwarded_for),
        )
        .await
    }

    /// Raw approval token from the most recent approval email
    pub fn last_approval_token(&self) -> String {
        let sent = self.ctx.mailer.sent();
        let body = &sent.last().expect("approval mail").body;
        let start = body.find("/approve-token/").expect("approval link") + "/approve-token/".len();
        body[start..start + 64].to_string()
    }

    /// Create the superadmin and return its session cookie
    pub async fn owner_session(&self) -> String {
        self.ctx
            .account_manager
            .bootstrap_superadmin(&BootstrapAdmin {
                username: "owner".to_string(),
                email: "owner@example.com".to_string(),
                password: OWNER_PASSWORD.to_string(),
            })
            .await
            .unwrap();

        let response = self.login_as("owner", OWNER_PASSWORD, "owner-agent").await;
        assert_eq!(response.status, StatusCode::OK);
        response.session_cookie().expect("session cookie")
    }

    /// Id of the admin behind a session cookie
    pub async fn admin_id(&self, cookie: &str) -> String {
        let status = self.get("/api/auth/admin/check-status", Some(cookie)).await;
        status.body["data"]["admin"]["id"]
            .as_str()
            .expect("admin id")
            .to_string()
    }

    /// Register, approve by email link and log in a regular admin
    pub async fn editor_session(&self, username: &str) -> (String, String) {
        let email = format!("{}@example.com", username);
        assert_eq!(self.register(username, &email).await.status, StatusCode::CREATED);

        let token = self.last_approval_token();
        let approved = self
            .get(&format!("/api/auth/admin/approve-token/{}", token), None)
            .await;
        assert_eq!(approved.status, StatusCode::OK);
        let id = approved.body["data"]["id"].as_str().unwrap().to_string();

        let response = self
            .login_as(username, EDITOR_PASSWORD, &format!("{}-agent", username))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        (id, response.session_cookie().expect("session cookie"))
    }
}
