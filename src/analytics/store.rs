use crate::analytics::types::{ClickEvent, EventDocument, PageView, SectionView, TrackedEvent};
use crate::error::AppResult;
use crate::storage::{JsonDocument, Update};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::path::PathBuf;

const SESSION_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a session id of the form `<unix millis>-<9 base36 chars>`.
/// Not cryptographic; it only has to keep browsing sessions apart.
pub fn generate_session_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| SESSION_ALPHABET[rng.gen_range(0..SESSION_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", now.timestamp_millis(), suffix)
}

/// Drop the oldest entries so at most `max` remain.
fn truncate_front<T>(items: &mut Vec<T>, max: usize) {
    if items.len() > max {
        items.drain(..items.len() - max);
    }
}

/// Apply one event to the document. Returns the session id the event was recorded under.
pub fn apply_event(
    doc: &mut EventDocument,
    event: TrackedEvent,
    session_id: String,
    now: DateTime<Utc>,
    max_entries: usize,
) -> String {
    match event {
        TrackedEvent::Pageview(data) => {
            doc.page_views.push(PageView {
                timestamp: now,
                path: data.path.unwrap_or_else(|| "/".to_string()),
                referrer: data.referrer,
                user_agent: data.user_agent,
                session_id: session_id.clone(),
            });
            // Only pageviews count towards visitors
            if doc.unique_visitors.insert(session_id.clone()) {
                doc.total_visitors += 1;
            }
        }
        TrackedEvent::Section(data) => doc.section_views.push(SectionView {
            section: data.section,
            timestamp: now,
            session_id: session_id.clone(),
            duration: data.duration,
        }),
        TrackedEvent::Click(data) => doc.click_events.push(ClickEvent {
            element: data.element,
            timestamp: now,
            session_id: session_id.clone(),
        }),
    }

    truncate_front(&mut doc.page_views, max_entries);
    truncate_front(&mut doc.section_views, max_entries);
    truncate_front(&mut doc.click_events, max_entries);

    session_id
}

/// File-backed store of pageview, section and click events.
pub struct EventStore {
    doc: JsonDocument<EventDocument>,
    max_entries: usize,
}

impl EventStore {
    pub fn new(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            doc: JsonDocument::new(path),
            max_entries,
        }
    }

    /// Append an event and persist the document. Returns the session id used.
    pub async fn record(
        &self,
        event: TrackedEvent,
        session_id: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        let session_id = session_id.unwrap_or_else(|| generate_session_id(now));
        let kind = event.kind();
        let max_entries = self.max_entries;

        let session = self
            .doc
            .update(move |doc| Update::Write(apply_event(doc, event, session_id, now, max_entries)))
            .await?;

        tracing::debug!(kind, session = %session, "recorded analytics event");
        Ok(session)
    }

    /// Current document, created empty if absent or unreadable.
    pub async fn snapshot(&self) -> AppResult<EventDocument> {
        self.doc.load_or_init().await
    }

    /// Total visitors, or 0 when the store cannot be read. Never fails.
    pub async fn visitor_count(&self) -> u64 {
        self.doc
            .read()
            .await
            .map(|doc| doc.total_visitors)
            .unwrap_or(0)
    }
}
