//! Event feed derivation.
//!
//! Derived views over the cached event collection: date-ascending ordering
//! (events without a date sort last, stable otherwise) and the filter
//! predicates the discovery surfaces use.

use chrono::{DateTime, Utc};

use crate::models::Event;

/// Filter predicates for derived feed views. Empty filter passes every
/// listed event; drafts are excluded unless explicitly included.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub city: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub from_date: Option<DateTime<Utc>>,
    pub include_drafts: bool,
}

/// Sorts events by date ascending; events lacking a date go last. The sort
/// is stable, so equal dates keep their incoming order.
pub fn sort_by_date(events: &mut [Event]) {
    events.sort_by(|a, b| match (a.date, b.date) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Applies `filter` over a snapshot of events.
pub fn apply(events: &[Event], filter: &EventFilter) -> Vec<Event> {
    events
        .iter()
        .filter(|event| matches(event, filter))
        .cloned()
        .collect()
}

fn matches(event: &Event, filter: &EventFilter) -> bool {
    if !filter.include_drafts && !event.is_listed() {
        return false;
    }
    if let Some(city) = &filter.city {
        if !event.city.eq_ignore_ascii_case(city) {
            return false;
        }
    }
    if let Some(category) = &filter.category {
        if event.category.as_deref() != Some(category.as_str()) {
            return false;
        }
    }
    if let Some(tag) = &filter.tag {
        if !event.tags.iter().any(|t| t == tag) {
            return false;
        }
    }
    if let Some(from) = filter.from_date {
        match event.date {
            Some(date) if date >= from => {}
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RawDocument;
    use serde_json::json;

    fn event(id: &str, entries: &[(&str, serde_json::Value)]) -> Event {
        let doc: RawDocument = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Event::from_document(id, &doc)
    }

    #[test]
    fn test_sort_puts_dateless_events_last() {
        let mut events = vec![
            event("ev-none", &[]),
            event("ev-late", &[("date", json!("2026-09-01T10:00:00Z"))]),
            event("ev-early", &[("date", json!("2026-08-01T10:00:00Z"))]),
        ];
        sort_by_date(&mut events);
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["ev-early", "ev-late", "ev-none"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_dates() {
        let mut events = vec![
            event("ev-first", &[("date", json!("2026-08-01T10:00:00Z"))]),
            event("ev-second", &[("date", json!("2026-08-01T10:00:00Z"))]),
        ];
        sort_by_date(&mut events);
        assert_eq!(events[0].id, "ev-first");
        assert_eq!(events[1].id, "ev-second");
    }

    #[test]
    fn test_filter_by_city_is_case_insensitive() {
        let events = vec![
            event("ev-1", &[("city", json!("Lisbon"))]),
            event("ev-2", &[("city", json!("Porto"))]),
        ];
        let filter = EventFilter {
            city: Some("lisbon".to_string()),
            ..EventFilter::default()
        };
        let matched = apply(&events, &filter);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "ev-1");
    }

    #[test]
    fn test_filter_excludes_drafts_by_default() {
        let events = vec![
            event("ev-draft", &[("isDraft", json!(true))]),
            event("ev-live", &[]),
        ];
        assert_eq!(apply(&events, &EventFilter::default()).len(), 1);

        let filter = EventFilter {
            include_drafts: true,
            ..EventFilter::default()
        };
        assert_eq!(apply(&events, &filter).len(), 2);
    }

    #[test]
    fn test_filter_by_tag_and_date() {
        let events = vec![
            event(
                "ev-1",
                &[
                    ("tags", json!(["music"])),
                    ("date", json!("2026-08-20T20:00:00Z")),
                ],
            ),
            event("ev-2", &[("tags", json!(["food"]))]),
        ];
        let filter = EventFilter {
            tag: Some("music".to_string()),
            from_date: Some("2026-08-10T00:00:00Z".parse().unwrap()),
            ..EventFilter::default()
        };
        let matched = apply(&events, &filter);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "ev-1");
    }
}
