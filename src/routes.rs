use crate::analytics::{self, AnalyticsState};
use crate::auth::bearer::{self, AdminSecret};
use crate::config::AppConfig;
use crate::content::handler::{self as content_handler, ContentState};
use crate::content::loader::ContentLoader;
use crate::error::{AppError, AppResult};
use crate::newsletter::handler::{self as newsletter_handler, NewsletterState};
use crate::newsletter::store::SubscriberStore;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Stores and shared state, built once from the configuration at startup.
pub struct Services {
    pub analytics: Arc<AnalyticsState>,
    pub newsletter: Arc<NewsletterState>,
    pub content: Arc<ContentState>,
    pub admin_secret: AdminSecret,
}

impl Services {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            analytics: Arc::new(AnalyticsState::new(
                config.storage.analytics_path(),
                config.analytics.clone(),
            )),
            newsletter: Arc::new(NewsletterState {
                store: SubscriberStore::new(config.storage.newsletter_path()),
            }),
            content: Arc::new(ContentState {
                loader: ContentLoader::new(config.content.clone()),
            }),
            admin_secret: AdminSecret::new(config.auth.admin_secret.as_str()),
        }
    }
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Assemble the full application router.
pub fn build_router(services: &Services, config: &AppConfig) -> AppResult<Router> {
    let governor_conf = || {
        GovernorConfigBuilder::default()
            .key_extractor(SmartIpKeyExtractor)
            .per_second(config.rate_limit.per_second)
            .burst_size(config.rate_limit.burst_size)
            .finish()
            .ok_or_else(|| AppError::Internal("invalid rate limiter config".to_string()))
    };

    // Only the public write endpoints are rate limited
    let mut track = post(analytics::handler::track_event);
    let mut subscribe = post(newsletter_handler::subscribe);
    if config.rate_limit.enabled {
        track = track.layer(GovernorLayer::new(governor_conf()?));
        subscribe = subscribe.layer(GovernorLayer::new(governor_conf()?));
    }

    // ── Analytics (ingest is public, the report needs the admin token) ──
    let analytics_routes = Router::new()
        .route(
            "/api/analytics",
            track.merge(
                get(analytics::handler::stats)
                    .route_layer(middleware::from_fn(bearer::require_admin)),
            ),
        )
        .route(
            "/api/analytics/visitors",
            get(analytics::handler::visitor_count),
        )
        .layer(DefaultBodyLimit::max(config.ingest.max_payload_bytes))
        .layer(axum::Extension(services.admin_secret.clone()))
        .with_state(services.analytics.clone());

    // ── Newsletter (subscribe is public, the full list needs the admin token) ──
    let newsletter_routes = Router::new()
        .route(
            "/api/newsletter",
            subscribe.get(newsletter_handler::list_subscribers),
        )
        .layer(DefaultBodyLimit::max(config.ingest.max_payload_bytes))
        .layer(axum::Extension(services.admin_secret.clone()))
        .with_state(services.newsletter.clone());

    // ── Devblog (public, read-only) ──
    let content_routes = Router::new()
        .route("/api/posts", get(content_handler::list_posts))
        .route("/api/posts/recent", get(content_handler::recent_posts))
        .route("/api/posts/featured", get(content_handler::featured_post))
        .route("/api/posts/categories", get(content_handler::categories))
        .route("/api/posts/tags", get(content_handler::tags))
        .route("/api/posts/archive", get(content_handler::archive))
        .route("/api/posts/{slug}", get(content_handler::get_post))
        .with_state(services.content.clone());

    // The tracker and signup form call in from the site's pages
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ]);

    Ok(Router::new()
        .route("/health", get(health))
        .merge(analytics_routes)
        .merge(newsletter_routes)
        .merge(content_routes)
        .layer(cors))
}
