//! Component A: header/body normalization.
//!
//! The injected JS tap performs the actual introspection of `Request`,
//! `Response`, `FormData`, and `ReadableStream` objects, since only it runs
//! in the page's realm. These functions are the Rust-side mirror: given the
//! JSON a drained tap call carries, or a raw byte body read from a stored
//! baseline, produce the same canonical [`BodyValue`] the JS side would have
//! produced. Keeping this logic in Rust as well makes it independently
//! testable and lets baselines be re-normalized without a live page.

use std::collections::HashMap;

use harness_common::model::{BodyValue, MultipartField};
use uuid::Uuid;

/// Generate a request id, unique within the process. Matches the JS tap's
/// own `crypto.randomUUID()`-style allocation in shape (a v4 UUID string).
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Normalize a header collection to a lowercase-keyed map, last-wins on
/// duplicate keys (mirrors `Headers` iteration order in the tap).
pub fn serialize_headers<I, K, V>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = HashMap::new();
    for (k, v) in pairs {
        out.insert(k.as_ref().to_ascii_lowercase(), v.as_ref().to_string());
    }
    out
}

/// Whether a string looks like self-contained JSON (cheap pre-check before
/// attempting a real parse - mirrors the tap's `text.trim()` bracket check).
fn looks_like_json(trimmed: &str) -> bool {
    let opens_object = trimmed.starts_with('{') && trimmed.ends_with('}');
    let opens_array = trimmed.starts_with('[') && trimmed.ends_with(']');
    opens_object || opens_array
}

fn should_attempt_json(content_type: Option<&str>, trimmed: &str) -> bool {
    if let Some(ct) = content_type {
        if ct.to_ascii_lowercase().contains("application/json") {
            return true;
        }
    }
    looks_like_json(trimmed)
}

/// Parse a textual body, applying the JSON-parse heuristic from Section 4.A.
/// Falls back to the raw string on any parse failure - parsing is a
/// best-effort convenience, never a hard requirement.
fn parse_textual_body(text: &str, content_type: Option<&str>) -> BodyValue {
    let trimmed = text.trim();
    if should_attempt_json(content_type, trimmed) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            return BodyValue::Json(value);
        }
    }
    BodyValue::Text(text.to_string())
}

/// Parse a raw byte body (request or response side share this heuristic).
/// `max_size` of `None` disables the size guard.
pub fn parse_body(bytes: &[u8], content_type: Option<&str>, max_size: Option<usize>) -> BodyValue {
    if let Some(limit) = max_size {
        if bytes.len() > limit {
            return BodyValue::TooLarge(bytes.len());
        }
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => parse_textual_body(text, content_type),
        Err(_) => BodyValue::Text(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Response-side body parsing: identical heuristic, kept as a distinct
/// function per the spec's component boundary (`parseResponseBody` is named
/// separately because response framing - `content-length` pre-check - can
/// differ from the request side in the JS tap).
pub fn parse_response_body(
    bytes: &[u8],
    content_type: Option<&str>,
    content_length: Option<usize>,
    max_size: Option<usize>,
) -> BodyValue {
    if let (Some(limit), Some(len)) = (max_size, content_length) {
        if len > limit {
            return BodyValue::TooLarge(len);
        }
    }
    parse_body(bytes, content_type, max_size)
}

/// Decode a `application/x-www-form-urlencoded` body into ordered pairs.
pub fn parse_url_encoded(body: &str) -> BodyValue {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(body.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    BodyValue::UrlEncoded(pairs)
}

/// Build the multipart representation from already-extracted fields. File
/// parts never carry content, only the descriptor (name/size/mimeType) - the
/// tap never reads file bytes.
pub fn build_multipart(fields: Vec<MultipartField>) -> BodyValue {
    BodyValue::Multipart(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique() {
        let a = generate_request_id();
        let b = generate_request_id();
        assert_ne!(a, b);
    }

    #[test]
    fn headers_normalize_to_lowercase_last_wins() {
        let headers = serialize_headers(vec![
            ("Content-Type", "application/json"),
            ("content-type", "text/plain"),
        ]);
        assert_eq!(headers.get("content-type"), Some(&"text/plain".to_string()));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn parse_body_json_by_content_type() {
        let body = parse_body(br#"{"a":1}"#, Some("application/json; charset=utf-8"), None);
        assert_eq!(body, BodyValue::Json(serde_json::json!({"a": 1})));
    }

    #[test]
    fn parse_body_json_by_sniffing_brackets() {
        let body = parse_body(br#"[1,2,3]"#, None, None);
        assert_eq!(body, BodyValue::Json(serde_json::json!([1, 2, 3])));
    }

    #[test]
    fn parse_body_falls_back_to_text_on_malformed_json() {
        let body = parse_body(b"{not json", Some("application/json"), None);
        assert_eq!(body, BodyValue::Text("{not json".to_string()));
    }

    #[test]
    fn parse_body_size_limit_exact_boundary_included() {
        let bytes = vec![b'a'; 10];
        let body = parse_body(&bytes, None, Some(10));
        assert!(matches!(body, BodyValue::Text(_)));
    }

    #[test]
    fn parse_body_size_limit_exceeded() {
        let bytes = vec![b'a'; 11];
        let body = parse_body(&bytes, None, Some(10));
        assert_eq!(body, BodyValue::TooLarge(11));
    }

    #[test]
    fn parse_url_encoded_body() {
        let body = parse_url_encoded("a=1&b=two%20words");
        assert_eq!(
            body,
            BodyValue::UrlEncoded(vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two words".to_string()),
            ])
        );
    }
}
