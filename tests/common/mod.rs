#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use memolink::config::ServerConfig;
use memolink::error::Result;
use memolink::mail::Mailer;
use memolink::server::{AppState, create_router};
use memolink::store::{SqliteStore, Store};

/// Captures reset links so tests can follow them.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn last_token(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let (_, link) = sent.last()?;
        link.split_once("token=").map(|(_, token)| token.to_string())
    }

    /// Reset mail goes out in the background; poll until it lands.
    pub async fn wait_for_token(&self) -> Option<String> {
        for _ in 0..100 {
            if let Some(token) = self.last_token() {
                return Some(token);
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        None
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_password_reset(&self, to: &str, reset_link: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), reset_link.to_string()));
        Ok(())
    }
}

pub enum Payload {
    Empty,
    Json(Value),
    Form(String),
    Raw(Vec<u8>),
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub bytes: Vec<u8>,
}

pub struct TestApp {
    pub temp_dir: TempDir,
    pub router: Router,
    pub mailer: Arc<RecordingMailer>,
    pub store: Arc<dyn Store>,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            public_base_url: "http://memolink.test".to_string(),
            frontend_url: "http://frontend.test".to_string(),
            ..ServerConfig::default()
        };

        let store = SqliteStore::new(config.db_path()).expect("open store");
        store.initialize().expect("initialize store");
        let store: Arc<dyn Store> = Arc::new(store);

        let mailer = Arc::new(RecordingMailer::default());
        let state = Arc::new(AppState::new(
            store.clone(),
            config,
            mailer.clone(),
            b"integration-secret",
        ));

        Self {
            temp_dir,
            router: create_router(state),
            mailer,
            store,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        payload: Payload,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let body = match payload {
            Payload::Empty => Body::empty(),
            Payload::Json(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            Payload::Form(form) => {
                builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
                Body::from(form)
            }
            Payload::Raw(bytes) => Body::from(bytes),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            bytes,
        }
    }

    pub async fn signup(&self, email: &str, password: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/users/create_user",
            None,
            Payload::Json(serde_json::json!({
                "first_name": "Ada",
                "surname": "Lovelace",
                "email": email,
                "password": password,
            })),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/users/get_access_token",
            None,
            Payload::Form(format!(
                "username={}&password={}",
                urlencoding::encode(email),
                urlencoding::encode(password)
            )),
        )
        .await
    }

    /// Signs up and logs in, returning a bearer token.
    pub async fn user_token(&self, email: &str) -> String {
        let signup = self.signup(email, "secret").await;
        assert_eq!(signup.status, StatusCode::OK, "signup failed: {:?}", signup.body);

        let login = self.login(email, "secret").await;
        assert_eq!(login.status, StatusCode::OK, "login failed: {:?}", login.body);
        login.body["access_token"]
            .as_str()
            .expect("access_token not a string")
            .to_string()
    }
}
