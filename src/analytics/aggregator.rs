use crate::analytics::types::{
    CharacterClicks, EventDocument, FunStats, PageViewCounts, PeakHour, StatsReport, Tally,
};
use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};

/// Click elements with this prefix name a character card.
pub const CHARACTER_PREFIX: &str = "character-";

/// Compute the analytics report from the full event document.
///
/// Pure and uncached: every call rescans all sequences. Hours of day are taken in `tz`
/// (the HTTP handler passes the server's local zone).
pub fn compute_stats<Tz: TimeZone>(
    doc: &EventDocument,
    now: DateTime<Utc>,
    tz: &Tz,
    recent_limit: usize,
) -> StatsReport {
    let page_views = PageViewCounts {
        total: doc.page_views.len() as u64,
        last_24h: count_since(doc, now - Duration::hours(24)),
        last_7d: count_since(doc, now - Duration::days(7)),
        last_30d: count_since(doc, now - Duration::days(30)),
    };

    let section_engagement: Tally = doc.section_views.iter().map(|sv| sv.section.as_str()).collect();
    let click_rates: Tally = doc.click_events.iter().map(|ce| ce.element.as_str()).collect();
    let character_popularity: Tally = doc
        .click_events
        .iter()
        .filter_map(|ce| ce.element.strip_prefix(CHARACTER_PREFIX))
        .collect();

    let most_popular_character = character_popularity
        .top()
        .map(|(name, clicks)| CharacterClicks {
            name: name.to_string(),
            clicks,
        });

    StatsReport {
        total_visitors: doc.total_visitors,
        unique_visitors_count: doc.unique_visitors.len() as u64,
        page_views,
        section_engagement,
        click_rates,
        character_popularity,
        fun_stats: FunStats {
            most_popular_character,
            peak_hour: peak_hour(doc, tz),
        },
        recent_page_views: tail(&doc.page_views, recent_limit).to_vec(),
        recent_clicks: tail(&doc.click_events, recent_limit).to_vec(),
    }
}

fn count_since(doc: &EventDocument, cutoff: DateTime<Utc>) -> u64 {
    doc.page_views
        .iter()
        .filter(|pv| pv.timestamp > cutoff)
        .count() as u64
}

/// Busiest hour of day by pageviews; ties go to the earliest hour.
fn peak_hour<Tz: TimeZone>(doc: &EventDocument, tz: &Tz) -> Option<PeakHour> {
    let mut buckets = [0u64; 24];
    for pv in &doc.page_views {
        buckets[pv.timestamp.with_timezone(tz).hour() as usize] += 1;
    }

    let mut peak: Option<PeakHour> = None;
    for (hour, &views) in buckets.iter().enumerate() {
        if views > 0 && peak.as_ref().map_or(true, |p| views > p.views) {
            peak = Some(PeakHour {
                hour: hour as u32,
                views,
            });
        }
    }
    peak
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::types::{ClickEvent, PageView, SectionView};

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    fn page_view(ts: DateTime<Utc>, session: &str) -> PageView {
        PageView {
            timestamp: ts,
            path: "/".into(),
            referrer: None,
            user_agent: None,
            session_id: session.into(),
        }
    }

    fn click(element: &str) -> ClickEvent {
        ClickEvent {
            element: element.into(),
            timestamp: at("2025-03-01T12:00:00Z"),
            session_id: "s1".into(),
        }
    }

    #[test]
    fn test_empty_store_yields_nulls_and_zero_counts() {
        let report = compute_stats(&EventDocument::default(), Utc::now(), &Utc, 100);
        assert_eq!(
            report.page_views,
            PageViewCounts {
                total: 0,
                last_24h: 0,
                last_7d: 0,
                last_30d: 0
            }
        );
        assert!(report.fun_stats.most_popular_character.is_none());
        assert!(report.fun_stats.peak_hour.is_none());
        assert!(report.recent_page_views.is_empty());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["funStats"]["mostPopularCharacter"].is_null());
        assert!(json["funStats"]["peakHour"].is_null());
    }

    #[test]
    fn test_most_popular_character() {
        let mut doc = EventDocument::default();
        for _ in 0..3 {
            doc.click_events.push(click("character-liliana"));
        }
        for _ in 0..5 {
            doc.click_events.push(click("character-maxine"));
        }
        doc.click_events.push(click("play-trailer"));

        let report = compute_stats(&doc, Utc::now(), &Utc, 100);
        assert_eq!(
            report.fun_stats.most_popular_character,
            Some(CharacterClicks {
                name: "maxine".into(),
                clicks: 5
            })
        );
        assert_eq!(report.character_popularity.len(), 2);
        assert_eq!(report.character_popularity.get("liliana"), Some(3));
        assert_eq!(report.click_rates.get("play-trailer"), Some(1));
        assert_eq!(report.click_rates.get("character-maxine"), Some(5));
    }

    #[test]
    fn test_character_tie_goes_to_first_seen() {
        let mut doc = EventDocument::default();
        doc.click_events.push(click("character-mira"));
        doc.click_events.push(click("character-liliana"));
        doc.click_events.push(click("character-liliana"));
        doc.click_events.push(click("character-mira"));

        let report = compute_stats(&doc, Utc::now(), &Utc, 100);
        assert_eq!(report.fun_stats.most_popular_character.unwrap().name, "mira");
    }

    #[test]
    fn test_windowed_counts_are_strict() {
        let now = at("2025-03-10T12:00:00Z");
        let doc = EventDocument {
            page_views: vec![
                page_view(now - Duration::days(40), "a"),
                page_view(now - Duration::days(30), "a"), // exactly on the boundary
                page_view(now - Duration::days(10), "b"),
                page_view(now - Duration::days(3), "b"),
                page_view(now - Duration::hours(2), "c"),
            ],
            ..Default::default()
        };

        let report = compute_stats(&doc, now, &Utc, 100);
        assert_eq!(report.page_views.total, 5);
        assert_eq!(report.page_views.last_24h, 1);
        assert_eq!(report.page_views.last_7d, 2);
        assert_eq!(report.page_views.last_30d, 3);
    }

    #[test]
    fn test_peak_hour_uses_given_timezone() {
        let doc = EventDocument {
            page_views: vec![
                page_view(at("2025-03-01T09:10:00Z"), "a"),
                page_view(at("2025-03-02T09:50:00Z"), "b"),
                page_view(at("2025-03-02T17:00:00Z"), "c"),
            ],
            ..Default::default()
        };

        let utc = compute_stats(&doc, Utc::now(), &Utc, 100);
        assert_eq!(utc.fun_stats.peak_hour, Some(PeakHour { hour: 9, views: 2 }));

        let plus_two = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        let shifted = compute_stats(&doc, Utc::now(), &plus_two, 100);
        assert_eq!(shifted.fun_stats.peak_hour, Some(PeakHour { hour: 11, views: 2 }));
    }

    #[test]
    fn test_peak_hour_tie_goes_to_earliest_hour() {
        let doc = EventDocument {
            page_views: vec![
                page_view(at("2025-03-01T20:00:00Z"), "a"),
                page_view(at("2025-03-01T04:00:00Z"), "b"),
            ],
            ..Default::default()
        };
        let report = compute_stats(&doc, Utc::now(), &Utc, 100);
        assert_eq!(report.fun_stats.peak_hour, Some(PeakHour { hour: 4, views: 1 }));
    }

    #[test]
    fn test_section_engagement_and_recent_tail() {
        let now = at("2025-03-10T12:00:00Z");
        let mut doc = EventDocument::default();
        for (i, section) in ["hero", "characters", "hero", "timeline", "hero"].iter().enumerate() {
            doc.section_views.push(SectionView {
                section: section.to_string(),
                timestamp: now,
                session_id: format!("s{i}"),
                duration: None,
            });
        }
        for i in 0..150 {
            doc.page_views.push(page_view(now, &format!("s{i}")));
        }

        let report = compute_stats(&doc, now, &Utc, 100);
        assert_eq!(report.section_engagement.get("hero"), Some(3));
        assert_eq!(report.section_engagement.get("timeline"), Some(1));
        assert_eq!(report.recent_page_views.len(), 100);
        assert_eq!(report.recent_page_views[0].session_id, "s50");
        assert_eq!(report.recent_page_views[99].session_id, "s149");
    }
}
