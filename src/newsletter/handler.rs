use crate::auth::bearer::AdminAccess;
use crate::error::{AppError, AppResult, LoggedJson};
use crate::newsletter::store::SubscriberStore;
use crate::newsletter::types::{
    SubscribeOutcome, SubscribeRequest, SubscribeResponse, SubscriberListResponse,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

pub struct NewsletterState {
    pub store: SubscriberStore,
}

/// POST /api/newsletter - Subscribe an email address.
pub async fn subscribe(
    State(state): State<Arc<NewsletterState>>,
    LoggedJson(req): LoggedJson<SubscribeRequest>,
) -> AppResult<(StatusCode, Json<SubscribeResponse>)> {
    let email = req.email.ok_or(AppError::InvalidEmail)?;

    match state
        .store
        .subscribe(&email, req.source, chrono::Utc::now())
        .await?
    {
        SubscribeOutcome::Subscribed(sub) => {
            tracing::info!(source = ?sub.source, "new newsletter subscriber");
            Ok((
                StatusCode::CREATED,
                Json(SubscribeResponse {
                    message: "Successfully subscribed! Check your inbox for confirmation.",
                    success: Some(true),
                    already_subscribed: None,
                }),
            ))
        }
        SubscribeOutcome::AlreadySubscribed => Ok((
            StatusCode::OK,
            Json(SubscribeResponse {
                message: "You're already subscribed!",
                success: None,
                already_subscribed: Some(true),
            }),
        )),
    }
}

/// GET /api/newsletter - Subscriber count, plus the full list for the admin.
pub async fn list_subscribers(
    State(state): State<Arc<NewsletterState>>,
    AdminAccess(is_admin): AdminAccess,
) -> AppResult<Json<SubscriberListResponse>> {
    let subscribers = state.store.subscribers().await?;

    Ok(Json(SubscriberListResponse {
        total: subscribers.len(),
        subscribers: is_admin.then_some(subscribers),
    }))
}
