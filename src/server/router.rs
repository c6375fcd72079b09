use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{HeaderValue, Method, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::api::api_router;
use super::storage::storage_router;
use crate::auth::CredentialService;
use crate::blob::{ImageStorage, UrlSigner};
use crate::config::ServerConfig;
use crate::mail::Mailer;
use crate::service::{AccountService, ImageService, LinkService, NodeService};
use crate::store::Store;

/// Shared, read-only handles built once at startup.
pub struct AppState {
    pub credentials: Arc<CredentialService>,
    pub accounts: AccountService,
    pub nodes: NodeService,
    pub images: ImageService,
    pub links: LinkService,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        config: ServerConfig,
        mailer: Arc<dyn Mailer>,
        secret: &[u8],
    ) -> Self {
        let credentials = Arc::new(CredentialService::new(
            store.clone(),
            secret,
            config.access_token_ttl(),
            config.reset_token_ttl(),
        ));
        let storage = Arc::new(ImageStorage::new(
            &config.data_dir,
            config.upstream_timeout(),
        ));
        let signer = Arc::new(UrlSigner::new(
            secret,
            &config.public_base_url,
            config.signed_url_ttl(),
        ));

        Self {
            accounts: AccountService::new(
                store.clone(),
                credentials.clone(),
                mailer,
                &config.frontend_url,
            ),
            nodes: NodeService::new(
                store.clone(),
                storage.clone(),
                signer.clone(),
                config.max_inline_image_bytes,
            ),
            images: ImageService::new(store.clone(), storage, signer),
            links: LinkService::new(store),
            credentials,
            config,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .merge(api_router())
        .nest("/storage", storage_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
