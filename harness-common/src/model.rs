//! Shared data model for captured API traffic.
//!
//! These types are the canonical, crate-independent representation of what the
//! browser tap observes. `capture-core` produces them from a live page;
//! `diff-engine` consumes them from stored baselines and fresh replays alike.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a captured call originated in the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Initiator {
    Fetch,
    Xhr,
}

/// One field of a captured `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultipartField {
    Value { name: String, value: String },
    File { name: String, size: u64, #[serde(rename = "mimeType")] mime_type: String },
}

/// The `type: "File"` descriptor synthesized for a multipart file part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// A normalized request or response body.
///
/// This is the Rust-side mirror of the JS tap's body normalization: a parsed
/// JSON value, a raw string, a URL-encoded form, a multipart form, or one of
/// two sentinels (size-limited, or a stream that was never consumed).
#[derive(Debug, Clone, PartialEq)]
pub enum BodyValue {
    Json(Value),
    Text(String),
    UrlEncoded(Vec<(String, String)>),
    Multipart(Vec<MultipartField>),
    /// Body exceeded the configured `max_body_size`; carries the observed byte count.
    TooLarge(usize),
    /// Body was a streaming source (`ReadableStream`) and was never read.
    Stream,
}

const TOO_LARGE_PREFIX: &str = "[Body too large: ";
const TOO_LARGE_SUFFIX: &str = " bytes]";
const STREAM_SENTINEL: &str = "[ReadableStream - body not captured]";

impl BodyValue {
    pub fn too_large_sentinel(size: usize) -> String {
        format!("{TOO_LARGE_PREFIX}{size}{TOO_LARGE_SUFFIX}")
    }

    /// Parse a sentinel string back into its typed form, if it is one.
    fn from_sentinel(s: &str) -> Option<Self> {
        if s == STREAM_SENTINEL {
            return Some(BodyValue::Stream);
        }
        let rest = s.strip_prefix(TOO_LARGE_PREFIX)?.strip_suffix(TOO_LARGE_SUFFIX)?;
        rest.parse::<usize>().ok().map(BodyValue::TooLarge)
    }
}

impl Serialize for BodyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BodyValue::Json(v) => v.serialize(serializer),
            BodyValue::Text(s) => s.serialize(serializer),
            BodyValue::TooLarge(size) => Self::too_large_sentinel(*size).serialize(serializer),
            BodyValue::Stream => STREAM_SENTINEL.serialize(serializer),
            BodyValue::UrlEncoded(pairs) => {
                let map: HashMap<&str, &str> =
                    pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                map.serialize(serializer)
            }
            BodyValue::Multipart(fields) => fields.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for BodyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BodyVisitor;

        impl<'de> Visitor<'de> for BodyVisitor {
            type Value = BodyValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a captured request/response body")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(BodyValue::from_sentinel(v).unwrap_or_else(|| BodyValue::Text(v.to_string())))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                self.visit_str(&v)
            }

            fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let value = Value::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(BodyValue::Json(value))
            }

            fn visit_seq<A>(self, seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let value = Value::deserialize(de::value::SeqAccessDeserializer::new(seq))?;
                Ok(BodyValue::Json(value))
            }
        }

        deserializer.deserialize_any(BodyVisitor)
    }
}

/// A captured outbound HTTP(S) request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedRequest {
    pub id: String,
    pub url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyValue>,
    pub timestamp: i64,
    pub initiator: Initiator,
}

/// A captured response, or the network-failure stand-in for one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedResponse {
    pub status: u16,
    #[serde(rename = "statusText")]
    pub status_text: String,
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyValue>,
    #[serde(rename = "responseTime")]
    pub response_time: u64,
    #[serde(rename = "bodySize", skip_serializing_if = "Option::is_none")]
    pub body_size: Option<u64>,
}

impl CapturedResponse {
    /// Build the `status=0` stand-in recorded when the underlying call throws.
    pub fn network_error(response_time: u64) -> Self {
        Self {
            status: 0,
            status_text: "Network Error".to_string(),
            headers: HashMap::new(),
            body: None,
            response_time,
            body_size: None,
        }
    }
}

/// One full request/response (or request/error) pair as observed by a tap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedApiCall {
    pub request: CapturedRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<CapturedResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub pending: bool,
}

impl CapturedApiCall {
    pub fn new_pending(request: CapturedRequest) -> Self {
        Self { request, response: None, error: None, pending: true }
    }

    /// Invariant from Section 8.1: `pending <=> response == None && error == None`.
    pub fn invariant_holds(&self) -> bool {
        self.pending == (self.response.is_none() && self.error.is_none())
    }
}

/// Severity of a single API diff entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// The kind of change a `DiffChange` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Deleted,
    Modified,
    Moved,
}

/// A single structural difference, located by its object path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffChange {
    pub kind: DiffKind,
    pub path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lhs: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rhs: Option<Value>,
    pub description: String,
}

impl DiffChange {
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

/// A serialized DOM node, recursively describing an element subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SerializedNode {
    Element {
        #[serde(rename = "tagName")]
        tag_name: String,
        attributes: HashMap<String, String>,
        #[serde(rename = "computedStyle", skip_serializing_if = "Option::is_none")]
        computed_style: Option<HashMap<String, String>>,
        children: Vec<SerializedNode>,
    },
    Text {
        content: String,
    },
    Comment {
        content: String,
    },
}

impl SerializedNode {
    pub fn children(&self) -> &[SerializedNode] {
        match self {
            SerializedNode::Element { children, .. } => children,
            _ => &[],
        }
    }
}

/// A full captured DOM subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomSnapshot {
    pub root: SerializedNode,
}

/// A captured screenshot. Carries decoded dimensions plus the raw PNG bytes so
/// callers that only need metadata never have to re-decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotImage {
    pub width: u32,
    pub height: u32,
    /// Raw PNG bytes. Serialized as a base64 data URI at the JSON boundary.
    #[serde(with = "base64_png")]
    pub bytes: Vec<u8>,
}

mod base64_png {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = format!("data:image/png;base64,{}", STANDARD.encode(bytes));
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = s.split(',').last().unwrap_or(&s);
        STANDARD.decode(raw).map_err(serde::de::Error::custom)
    }
}

/// A captured point-in-time artifact bundle, one per labelled snapshot step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelledSnapshot {
    pub label: String,
    pub snapshot: DomSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<ScreenshotImage>,
}

/// The artifact triple produced by one scenario run, baseline or replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineArtifact {
    pub scenario_id: String,
    pub captured_at: chrono::DateTime<chrono::Utc>,
    pub api_calls: Vec<CapturedApiCall>,
    pub snapshots: Vec<LabelledSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_screenshot: Option<ScreenshotImage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captured_api_call_invariant() {
        let req = CapturedRequest {
            id: "1".into(),
            url: "https://example.com".into(),
            method: "GET".into(),
            headers: HashMap::new(),
            body: None,
            timestamp: 0,
            initiator: Initiator::Fetch,
        };
        let pending = CapturedApiCall::new_pending(req.clone());
        assert!(pending.invariant_holds());

        let mut completed = pending.clone();
        completed.pending = false;
        completed.response = Some(CapturedResponse::network_error(5));
        assert!(completed.invariant_holds());

        let mut broken = pending;
        broken.pending = false;
        assert!(!broken.invariant_holds());
    }

    #[test]
    fn body_value_sentinel_roundtrip() {
        let v = BodyValue::TooLarge(2048);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json, Value::String("[Body too large: 2048 bytes]".into()));
        let back: BodyValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, v);

        let stream = BodyValue::Stream;
        let json = serde_json::to_value(&stream).unwrap();
        let back: BodyValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, stream);
    }

    #[test]
    fn body_value_json_roundtrip() {
        let v = BodyValue::Json(serde_json::json!({"a": 1, "b": [1,2,3]}));
        let json = serde_json::to_value(&v).unwrap();
        let back: BodyValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, v);
    }
}
