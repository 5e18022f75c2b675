//! Integration test harness for PG Delivery.
//!
//! Both routers run in-process against the same [`MemoryStore`], with
//! in-memory sessions and image storage. Requests go through
//! `tower::ServiceExt::oneshot`, so no ports are bound.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pg-delivery-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use pg_delivery_admin::config::{AdminConfig, ObjectStorageConfig};
use pg_delivery_core::PRODUCTS;
use pg_delivery_docstore::{MemoryObjectStorage, MemoryStore};
use pg_delivery_storefront::config::StorefrontConfig;
use secrecy::SecretString;
use serde_json::json;
use tower::ServiceExt;

/// Operator password accepted by [`admin_app`].
pub const OPERATOR_PASSWORD: &str = "tea-and-biscuits";

/// Peer address every request arrives from, keys the login rate limiter.
const CLIENT_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7)), 40000);

/// Seed a product document under a known id.
pub async fn seed_product(store: &MemoryStore, id: &str, name: &str, price: u32, stock: u32) {
    let fields = json!({
        "name": name,
        "price": price,
        "stock": stock,
        "category": "Snacks",
        "imageUrl": format!("https://objects.test/products/{id}.png"),
    });
    let serde_json::Value::Object(fields) = fields else {
        unreachable!("json! object literal");
    };
    store.insert(PRODUCTS, id, fields).await;
}

/// Storefront router over `store`.
#[must_use]
pub fn storefront_app(store: &MemoryStore) -> Router {
    let config = StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        messaging: pg_delivery_core::MessagingLink::new("https://wa.me", "+91 98765 43210")
            .unwrap(),
        uploads_dir: None,
        json_logs: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    };
    let state = pg_delivery_storefront::state::AppState::new(config, Arc::new(store.clone()));
    pg_delivery_storefront::app(state, tower_sessions::MemoryStore::default())
}

/// Admin router over `store` and `objects`, accepting [`OPERATOR_PASSWORD`].
#[must_use]
pub fn admin_app(store: &MemoryStore, objects: &MemoryObjectStorage) -> Router {
    let password_hash = pg_delivery_admin::services::hash_password(OPERATOR_PASSWORD).unwrap();
    let config = AdminConfig {
        database_url: SecretString::from("postgres://localhost/test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3001,
        base_url: "http://localhost:3001".to_string(),
        password_hash: SecretString::from(password_hash),
        object_storage: ObjectStorageConfig::Filesystem {
            dir: PathBuf::from("/tmp/pg-delivery-test-uploads"),
            public_url: "https://objects.test".to_string(),
        },
        trusted_proxies: Vec::new(),
        json_logs: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    };
    let state = pg_delivery_admin::state::AppState::new(
        config,
        Arc::new(store.clone()),
        Arc::new(objects.clone()),
    );
    pg_delivery_admin::app(state, tower_sessions::MemoryStore::default())
}

/// A fully read response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// One browser: a router plus the session cookie it was last given.
#[derive(Clone)]
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

impl TestClient {
    #[must_use]
    pub const fn new(router: Router) -> Self {
        Self {
            router,
            cookie: None,
        }
    }

    /// A second browser on the same app, without this one's cookie.
    #[must_use]
    pub fn fresh(&self) -> Self {
        Self::new(self.router.clone())
    }

    fn request(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .extension(ConnectInfo(CLIENT_ADDR));
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
    }

    fn remember_cookie(&mut self, headers: &HeaderMap) {
        let Some(set_cookie) = headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        else {
            return;
        };
        let pair = set_cookie.split(';').next().unwrap_or_default().trim();
        let removed = pair.ends_with('=') || set_cookie.contains("Max-Age=0");
        self.cookie = (!removed).then(|| pair.to_string());
    }

    /// Send a request and return the raw response, body unread.
    pub async fn send(&mut self, request: Request<Body>) -> Response<Body> {
        let response = self.router.clone().oneshot(request).await.unwrap();
        self.remember_cookie(response.headers());
        response
    }

    async fn read(&mut self, request: Request<Body>) -> TestResponse {
        let response = self.send(request).await;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = self.request("GET", path).body(Body::empty()).unwrap();
        self.read(request).await
    }

    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        self.post_form_with_headers(path, fields, &[]).await
    }

    /// Post a form with extra request headers.
    pub async fn post_form_with_headers(
        &mut self,
        path: &str,
        fields: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let mut builder = self
            .request("POST", path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::from(body)).unwrap();
        self.read(request).await
    }

    pub async fn post_multipart(&mut self, path: &str, body: Vec<u8>, boundary: &str) -> TestResponse {
        let request = self
            .request("POST", path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.read(request).await
    }

    /// Open a streaming GET, body left unread.
    pub async fn open(&mut self, path: &str) -> Response<Body> {
        let request = self.request("GET", path).body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// Log in as the operator and keep the session cookie.
    pub async fn login(&mut self) {
        let response = self
            .post_form("/admin/login", &[("password", OPERATOR_PASSWORD)])
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);
        assert!(self.cookie.is_some());
    }
}

/// Build a multipart body from text fields plus an optional file part.
#[must_use]
pub fn multipart_body(
    boundary: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

/// Read server-sent events until one named `event` arrives, returning its data.
///
/// Returns `None` if the stream ends first.
pub async fn next_event(body: &mut Body, event: &str) -> Option<String> {
    let mut buffer = String::new();
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("timed out waiting for an event")?
            .unwrap();
        let Ok(data) = frame.into_data() else {
            continue;
        };
        buffer.push_str(&String::from_utf8_lossy(&data));

        while let Some(end) = buffer.find("\n\n") {
            let block: String = buffer.drain(..end + 2).collect();
            let mut name = None;
            let mut lines = Vec::new();
            for line in block.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    name = Some(value.trim().to_string());
                } else if let Some(value) = line.strip_prefix("data:") {
                    lines.push(value.strip_prefix(' ').unwrap_or(value).to_string());
                }
            }
            if name.as_deref() == Some(event) {
                return Some(lines.join("\n"));
            }
        }
    }
}

/// Whether the stream ends within a few seconds.
pub async fn stream_ends(body: &mut Body) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        match tokio::time::timeout_at(deadline, body.frame()).await {
            Ok(None) => return true,
            Ok(Some(_)) => {}
            Err(_) => return false,
        }
    }
}
