use crate::content::loader::ContentLoader;
use crate::content::types::{ArchiveMonth, Post, PostListParams, PostMeta, RecentParams};
use crate::error::{AppError, AppResult};
use axum::extract::{Path, Query, State};
use axum::Json;
use std::sync::Arc;

pub struct ContentState {
    pub loader: ContentLoader,
}

/// GET /api/posts - Posts newest first, optionally filtered by category, tag or search text.
pub async fn list_posts(
    State(state): State<Arc<ContentState>>,
    Query(params): Query<PostListParams>,
) -> Json<Vec<PostMeta>> {
    let loader = &state.loader;
    let mut posts = match (params.category(), params.tag(), params.query()) {
        (Some(category), _, _) => loader.posts_by_category(category).await,
        (None, Some(tag), _) => loader.posts_by_tag(tag).await,
        (None, None, Some(query)) => loader.search(query).await,
        (None, None, None) => loader.all_posts().await,
    };

    // Narrow further when several filters are combined
    if let Some(tag) = params.tag() {
        posts.retain(|p| p.has_tag(tag));
    }
    if let Some(query) = params.query() {
        posts.retain(|p| p.matches_query(query));
    }

    Json(posts)
}

/// GET /api/posts/recent
pub async fn recent_posts(
    State(state): State<Arc<ContentState>>,
    Query(params): Query<RecentParams>,
) -> Json<Vec<PostMeta>> {
    Json(state.loader.recent_posts(params.limit()).await)
}

/// GET /api/posts/featured - The most recent post, or null.
pub async fn featured_post(State(state): State<Arc<ContentState>>) -> Json<Option<PostMeta>> {
    Json(state.loader.featured_post().await)
}

/// GET /api/posts/categories
pub async fn categories(State(state): State<Arc<ContentState>>) -> Json<Vec<String>> {
    Json(state.loader.categories().await)
}

/// GET /api/posts/tags
pub async fn tags(State(state): State<Arc<ContentState>>) -> Json<Vec<String>> {
    Json(state.loader.tags().await)
}

/// GET /api/posts/archive
pub async fn archive(State(state): State<Arc<ContentState>>) -> Json<Vec<ArchiveMonth>> {
    Json(state.loader.archive().await)
}

/// GET /api/posts/{slug}
pub async fn get_post(
    State(state): State<Arc<ContentState>>,
    Path(slug): Path<String>,
) -> AppResult<Json<Post>> {
    state
        .loader
        .post_by_slug(&slug)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("post '{slug}' not found")))
}
