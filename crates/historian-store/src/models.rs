//! Data models for stored historian data.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Structured metadata attached to a topic.
pub type TopicMetadata = serde_json::Map<String, serde_json::Value>;

/// One stored point, as returned by the query engine.
///
/// Timestamps are always UTC; they serialize as RFC 3339 text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSample {
    /// When the point was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// The recorded value. JSON-decoded for raw points; numeric as stored
    /// for rollup tables.
    pub value: serde_json::Value,
}

impl PointSample {
    /// Create a sample.
    pub fn new(timestamp: OffsetDateTime, value: serde_json::Value) -> Self {
        Self { timestamp, value }
    }
}

/// The topic registry, loaded in full.
///
/// Both maps are keyed by lowercased topic name so lookups are
/// case-insensitive while the canonical casing stays available for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicMap {
    /// Lowercased name to stable topic id.
    pub ids: HashMap<String, i64>,
    /// Lowercased name to canonical (case-preserved) name.
    pub names: HashMap<String, String>,
}

impl TopicMap {
    /// Look up a topic id, case-insensitively.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<i64> {
        self.ids.get(&name.to_lowercase()).copied()
    }

    /// Look up the canonical casing of a name, case-insensitively.
    #[must_use]
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.names.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Number of registered topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_point_sample_serializes_rfc3339() {
        let sample = PointSample::new(
            datetime!(2024-01-01 00:05:00 UTC),
            serde_json::json!(21.5),
        );
        let json = serde_json::to_string(&sample).unwrap();
        assert!(json.contains("2024-01-01T00:05:00Z"));
        assert!(json.contains("21.5"));

        let decoded: PointSample = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, sample);
    }

    #[test]
    fn test_topic_map_case_insensitive_lookup() {
        let mut map = TopicMap::default();
        map.ids.insert("campus/building/temp".to_string(), 3);
        map.names
            .insert("campus/building/temp".to_string(), "Campus/Building/Temp".to_string());

        assert_eq!(map.id_of("CAMPUS/Building/temp"), Some(3));
        assert_eq!(map.canonical_name("campus/BUILDING/TEMP"), Some("Campus/Building/Temp"));
        assert_eq!(map.id_of("unknown"), None);
        assert_eq!(map.len(), 1);
        assert!(!map.is_empty());
    }
}
