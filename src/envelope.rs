use serde::Deserialize;
use serde_json::{Map, Value};

use crate::query::total_pages;

/// The three response shapes the marketplace backend answers listing
/// requests with. Display code never sees these; everything funnels through
/// [`ListEnvelope::normalize`].
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope {
    /// Preferred shape: `{"data": [...], "total": 7, "totalPages": 1}`.
    Paged {
        data: Vec<Value>,
        total: u64,
        #[serde(rename = "totalPages")]
        total_pages: u64,
    },
    /// Named-plural wrapper, e.g. `{"users": [...]}`, optionally carrying
    /// its own totals.
    Named(Map<String, Value>),
    /// Bare array fallback; totals are computed client-side.
    Bare(Vec<Value>),
}

/// The orchestrator's unified result shape regardless of envelope variant.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedPage {
    pub items: Vec<Value>,
    pub total: u64,
    pub total_pages: u64,
}

impl NormalizedPage {
    pub fn from_items(items: Vec<Value>, limit: u64) -> Self {
        let total = items.len() as u64;
        Self {
            items,
            total,
            total_pages: total_pages(total, limit),
        }
    }
}

impl ListEnvelope {
    pub fn normalize(self, limit: u64) -> NormalizedPage {
        match self {
            ListEnvelope::Paged {
                data,
                total,
                total_pages,
            } => NormalizedPage {
                items: data,
                total,
                total_pages,
            },
            ListEnvelope::Named(map) => normalize_named(map, limit),
            ListEnvelope::Bare(items) => NormalizedPage::from_items(items, limit),
        }
    }
}

fn normalize_named(mut map: Map<String, Value>, limit: u64) -> NormalizedPage {
    let total = map.get("total").and_then(Value::as_u64);
    let pages = map.get("totalPages").and_then(Value::as_u64);

    let array_key = map
        .iter()
        .find(|(_, value)| value.is_array())
        .map(|(key, _)| key.clone());
    let items = match array_key.and_then(|key| map.remove(&key)) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };

    let total = total.unwrap_or(items.len() as u64);
    NormalizedPage {
        total_pages: pages.unwrap_or_else(|| total_pages(total, limit)),
        total,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Value> {
        vec![json!({"id": "u-1"}), json!({"id": "u-2"})]
    }

    fn parse(raw: Value) -> ListEnvelope {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn three_envelopes_normalize_to_the_same_page() {
        let paged = parse(json!({"data": rows(), "total": 2, "totalPages": 1}));
        let named = parse(json!({"users": rows()}));
        let bare = parse(json!(rows()));

        let expected = NormalizedPage {
            items: rows(),
            total: 2,
            total_pages: 1,
        };
        assert_eq!(paged.normalize(10), expected);
        assert_eq!(named.normalize(10), expected);
        assert_eq!(bare.normalize(10), expected);
    }

    #[test]
    fn paged_shape_wins_deserialization() {
        let envelope = parse(json!({"data": rows(), "total": 7, "totalPages": 1}));
        assert!(matches!(envelope, ListEnvelope::Paged { total: 7, .. }));
    }

    #[test]
    fn named_wrapper_honors_embedded_totals() {
        let page = parse(json!({"users": rows(), "total": 40, "totalPages": 4})).normalize(10);
        assert_eq!(page.total, 40);
        assert_eq!(page.total_pages, 4);
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn bare_array_computes_totals_client_side() {
        let page = parse(json!([{"id": "c-1"}, {"id": "c-2"}, {"id": "c-3"}])).normalize(2);
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn named_wrapper_without_rows_yields_empty_page() {
        let page = parse(json!({"message": "ok"})).normalize(10);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
    }
}
