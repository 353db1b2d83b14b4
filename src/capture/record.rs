//! Normalized log records produced by an ingestion event.

use std::fmt;
use std::str::FromStr;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Display body for a unit classified as an image.
pub const IMAGE_BODY: &str = "Image File";

/// Display body for a unit classified as opaque binary.
pub const BINARY_BODY: &str = "Binary file";

/// Capture time format (second resolution, sorts lexicographically).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Semantic kind assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Text,
    Image,
    Binary,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Text => "text",
            PayloadKind::Image => "image",
            PayloadKind::Binary => "binary",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(PayloadKind::Text),
            "image" => Ok(PayloadKind::Image),
            "binary" => Ok(PayloadKind::Binary),
            other => Err(format!("unknown payload kind: {}", other)),
        }
    }
}

/// Flat string-to-string mapping that keeps insertion order.
///
/// Serialized as a JSON object. Repeated keys are collapsed by either
/// [`FlatMap::insert_first`] or [`FlatMap::insert_last`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatMap(Vec<(String, String)>);

impl FlatMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert, replacing the value of an existing key (last value wins).
    pub fn insert_last(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Insert only if the key is not present yet (first value wins).
    pub fn insert_first(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if !self.0.iter().any(|(k, _)| *k == key) {
            self.0.push((key, value.into()));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlatMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FlatMap::new();
        for (k, v) in iter {
            map.insert_last(k, v);
        }
        map
    }
}

impl Serialize for FlatMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct FlatMapVisitor;

impl<'de> Visitor<'de> for FlatMapVisitor {
    type Value = FlatMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of string keys to string values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = FlatMap::new();
        while let Some((k, v)) = access.next_entry::<String, String>()? {
            map.insert_last(k, v);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for FlatMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FlatMapVisitor)
    }
}

/// One classified unit of an HTTP request, before it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub timestamp: String,
    pub method: String,
    pub path: String,
    pub headers: FlatMap,
    pub query_params: FlatMap,
    /// Literal text, a sentinel, `"key = value"`, or an error marker.
    pub body: String,
    /// `None` for form fields.
    pub kind: Option<PayloadKind>,
    pub mime_type: Option<String>,
    /// Set only when the bytes were written to the content store.
    pub stored_file_name: Option<String>,
    pub original_file_name: Option<String>,
    /// Set only for text-classified units.
    pub file_content_preview: Option<String>,
    /// Lossy UTF-8 rendering of a raw request body.
    pub raw_post_data: Option<String>,
}

/// A record as returned by the repository, with its assigned identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,
    #[serde(flatten)]
    pub record: LogRecord,
}

/// Request metadata shared by every record of one ingestion event.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub timestamp: String,
    pub method: String,
    pub path: String,
    pub headers: FlatMap,
    pub query_params: FlatMap,
}

impl RequestMeta {
    /// Start a record carrying this request's metadata and the given body.
    pub fn record(&self, body: impl Into<String>) -> LogRecord {
        LogRecord {
            timestamp: self.timestamp.clone(),
            method: self.method.clone(),
            path: self.path.clone(),
            headers: self.headers.clone(),
            query_params: self.query_params.clone(),
            body: body.into(),
            kind: None,
            mime_type: None,
            stored_file_name: None,
            original_file_name: None,
            file_content_preview: None,
            raw_post_data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_map_last_value_wins() {
        let mut map = FlatMap::new();
        map.insert_last("accept", "text/html");
        map.insert_last("host", "example.com");
        map.insert_last("accept", "*/*");

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("accept"), Some("*/*"));
        let keys: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["accept", "host"]);
    }

    #[test]
    fn flat_map_first_value_wins() {
        let mut map = FlatMap::new();
        map.insert_first("x", "1");
        map.insert_first("x", "2");
        assert_eq!(map.get("x"), Some("1"));
    }

    #[test]
    fn flat_map_serializes_as_ordered_object() {
        let map: FlatMap = vec![("zeta", "1"), ("alpha", "2")].into_iter().collect();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"zeta":"1","alpha":"2"}"#);

        let back: FlatMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn stored_record_flattens_fields() {
        let meta = RequestMeta {
            timestamp: "2024-01-01 00:00:00".into(),
            method: "POST".into(),
            path: "/anything".into(),
            headers: FlatMap::new(),
            query_params: vec![("x", "1")].into_iter().collect(),
        };
        let stored = StoredRecord {
            id: 7,
            record: meta.record("name = curl"),
        };

        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["body"], "name = curl");
        assert_eq!(value["queryParams"]["x"], "1");
        assert!(value["storedFileName"].is_null());
    }

    #[test]
    fn payload_kind_parses_its_own_names() {
        for kind in [PayloadKind::Text, PayloadKind::Image, PayloadKind::Binary] {
            assert_eq!(kind.as_str().parse::<PayloadKind>().unwrap(), kind);
        }
        assert!("form".parse::<PayloadKind>().is_err());
    }
}
