use crate::error::{AppError, AppResult};
use crate::newsletter::types::{NewsletterDocument, SubscribeOutcome, Subscriber};
use crate::storage::{JsonDocument, Update};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Source recorded when the signup form does not say where it lives.
pub const DEFAULT_SOURCE: &str = "website";

/// Trim and lowercase an address; subscribers are keyed on this form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `local@domain.tld` shape check. No deliverability check.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// File-backed, deduplicated list of newsletter subscribers.
pub struct SubscriberStore {
    doc: JsonDocument<NewsletterDocument>,
}

impl SubscriberStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            doc: JsonDocument::new(path),
        }
    }

    /// Add a subscriber unless the normalized address is already on the list.
    ///
    /// No confirmation mail is sent; entries are stored with `confirmed = false`.
    pub async fn subscribe(
        &self,
        email: &str,
        source: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<SubscribeOutcome> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AppError::InvalidEmail);
        }

        let source = source
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

        self.doc
            .update(move |doc| {
                if doc.subscribers.iter().any(|s| s.email == email) {
                    return Update::Skip(SubscribeOutcome::AlreadySubscribed);
                }
                let subscriber = Subscriber {
                    email,
                    subscribed_at: now,
                    source: Some(source),
                    confirmed: false,
                };
                doc.subscribers.push(subscriber.clone());
                Update::Write(SubscribeOutcome::Subscribed(subscriber))
            })
            .await
    }

    pub async fn subscribers(&self) -> AppResult<Vec<Subscriber>> {
        Ok(self.doc.load_or_init().await?.subscribers)
    }
}
