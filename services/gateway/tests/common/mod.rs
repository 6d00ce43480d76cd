//! Shared harness: the full router driven with `oneshot`

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use gateway::auth::Claims;
use gateway::config::Config;
use gateway::{AppState, app};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use types::auth::Role;
use types::ids::{TenantId, UserId};

pub const JWT_SECRET: &str = "integration-test-secret";

pub fn config() -> Config {
    Config {
        jwt_secret: JWT_SECRET.to_string(),
        rate_limit_capacity: 1000,
        rate_limit_refill_per_sec: 1000.0,
        ..Config::default()
    }
}

pub fn tenant(slug: &str) -> TenantId {
    TenantId::try_new(slug).unwrap()
}

pub fn token(user: UserId, tenant_slug: &str, role: Role, kyc_level: u8) -> String {
    Claims {
        sub: user,
        tenant_id: tenant(tenant_slug),
        role,
        kyc_level,
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    }
    .sign(JWT_SECRET)
    .unwrap()
}

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: Config) -> Self {
        let state = AppState::new(config).unwrap();
        Self {
            router: app(state.clone()),
            state,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Response { status, headers, body }
    }

    pub async fn get(&self, uri: &str, bearer: &str) -> Response {
        self.send(
            Request::get(uri)
                .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post(&self, uri: &str, bearer: &str, body: Value) -> Response {
        self.send(json_request("POST", uri, bearer, &body.to_string(), &[])).await
    }
}

pub fn json_request(method: &str, uri: &str, bearer: &str, body: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
