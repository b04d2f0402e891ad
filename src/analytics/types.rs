use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};

// ── Persisted document ──

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub timestamp: DateTime<Utc>,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectionView {
    #[serde(default)]
    pub section: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    #[serde(default)]
    pub element: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
}

/// The whole analytics document as it lives on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EventDocument {
    pub page_views: Vec<PageView>,
    pub section_views: Vec<SectionView>,
    pub click_events: Vec<ClickEvent>,
    pub unique_visitors: BTreeSet<String>,
    pub total_visitors: u64,
}

// ── Ingestion ──

/// Wire shape of `POST /api/analytics`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageviewData {
    pub path: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SectionData {
    pub section: String,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClickData {
    pub element: String,
}

/// A validated tracking event.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackedEvent {
    Pageview(PageviewData),
    Section(SectionData),
    Click(ClickData),
}

impl TrackedEvent {
    /// Build an event from its wire `type` and `data` payload.
    pub fn from_parts(kind: &str, data: serde_json::Value) -> AppResult<Self> {
        let data = if data.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            data
        };
        let invalid = |e: serde_json::Error| AppError::Validation(format!("invalid {kind} data: {e}"));

        match kind {
            "pageview" => Ok(Self::Pageview(serde_json::from_value(data).map_err(invalid)?)),
            "section" => Ok(Self::Section(serde_json::from_value(data).map_err(invalid)?)),
            "click" => Ok(Self::Click(serde_json::from_value(data).map_err(invalid)?)),
            other => Err(AppError::UnknownEventKind(other.to_string())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pageview(_) => "pageview",
            Self::Section(_) => "section",
            Self::Click(_) => "click",
        }
    }
}

impl TrackRequest {
    /// Validate the request, returning the event and the caller's session id (if any).
    pub fn into_event(self) -> AppResult<(TrackedEvent, Option<String>)> {
        let event = TrackedEvent::from_parts(&self.kind, self.data)?;
        let session = self.session_id.filter(|s| !s.is_empty());
        Ok((event, session))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    pub success: bool,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorCountResponse {
    pub total_visitors: u64,
}

// ── Stats report ──

/// Occurrence counts keyed by name, kept in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl Tally {
    pub fn add(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), 1));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.index.get(key).map(|&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest count; ties go to the key seen first.
    pub fn top(&self) -> Option<(&str, u64)> {
        let mut best: Option<(&str, u64)> = None;
        for (key, count) in &self.entries {
            if best.map_or(true, |(_, c)| *count > c) {
                best = Some((key.as_str(), *count));
            }
        }
        best
    }
}

impl<'a> FromIterator<&'a str> for Tally {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut tally = Tally::default();
        for key in iter {
            tally.add(key);
        }
        tally
    }
}

impl Serialize for Tally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageViewCounts {
    pub total: u64,
    #[serde(rename = "last24h")]
    pub last_24h: u64,
    #[serde(rename = "last7d")]
    pub last_7d: u64,
    #[serde(rename = "last30d")]
    pub last_30d: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CharacterClicks {
    pub name: String,
    pub clicks: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeakHour {
    pub hour: u32,
    pub views: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunStats {
    pub most_popular_character: Option<CharacterClicks>,
    pub peak_hour: Option<PeakHour>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub total_visitors: u64,
    pub unique_visitors_count: u64,
    pub page_views: PageViewCounts,
    pub section_engagement: Tally,
    pub click_rates: Tally,
    pub character_popularity: Tally,
    pub fun_stats: FunStats,
    pub recent_page_views: Vec<PageView>,
    pub recent_clicks: Vec<ClickEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_kind_rejected() {
        let err = TrackedEvent::from_parts("hover", json!({})).unwrap_err();
        assert!(matches!(err, AppError::UnknownEventKind(k) if k == "hover"));
    }

    #[test]
    fn test_pageview_without_data_is_accepted() {
        let event = TrackedEvent::from_parts("pageview", serde_json::Value::Null).unwrap();
        assert_eq!(event, TrackedEvent::Pageview(PageviewData::default()));
    }

    #[test]
    fn test_pageview_fields_are_camel_case() {
        let event = TrackedEvent::from_parts(
            "pageview",
            json!({ "path": "/characters", "userAgent": "Mozilla/5.0" }),
        )
        .unwrap();
        let TrackedEvent::Pageview(data) = event else {
            panic!("expected pageview");
        };
        assert_eq!(data.path.as_deref(), Some("/characters"));
        assert_eq!(data.user_agent.as_deref(), Some("Mozilla/5.0"));
    }

    #[test]
    fn test_click_without_element_is_validation_error() {
        let err = TrackedEvent::from_parts("click", json!({ "target": "x" })).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_empty_session_id_treated_as_absent() {
        let req: TrackRequest = serde_json::from_value(json!({
            "type": "section",
            "data": { "section": "hero" },
            "sessionId": ""
        }))
        .unwrap();
        let (event, session) = req.into_event().unwrap();
        assert_eq!(event.kind(), "section");
        assert!(session.is_none());
    }

    #[test]
    fn test_tally_preserves_first_seen_order_and_ties() {
        let tally: Tally = ["b", "a", "a", "b", "c"].into_iter().collect();
        assert_eq!(tally.top(), Some(("b", 2)));
        assert_eq!(tally.get("c"), Some(1));
        assert_eq!(
            serde_json::to_string(&tally).unwrap(),
            r#"{"b":2,"a":2,"c":1}"#
        );
    }

    #[test]
    fn test_stored_events_without_name_still_load() {
        let doc: EventDocument = serde_json::from_value(json!({
            "clickEvents": [
                { "timestamp": "2025-03-01T12:00:00Z", "sessionId": "s1" },
                { "element": "character-mira", "timestamp": "2025-03-01T12:01:00Z", "sessionId": "s1" }
            ],
            "sectionViews": [
                { "timestamp": "2025-03-01T12:00:00Z", "sessionId": "s1", "duration": 3.0 }
            ],
            "totalVisitors": 1
        }))
        .unwrap();
        assert_eq!(doc.click_events.len(), 2);
        assert_eq!(doc.click_events[0].element, "");
        assert_eq!(doc.click_events[1].element, "character-mira");
        assert_eq!(doc.section_views[0].section, "");
    }

    #[test]
    fn test_document_tolerates_missing_fields() {
        let doc: EventDocument = serde_json::from_str(r#"{"totalVisitors": 4}"#).unwrap();
        assert_eq!(doc.total_visitors, 4);
        assert!(doc.page_views.is_empty());
    }
}
