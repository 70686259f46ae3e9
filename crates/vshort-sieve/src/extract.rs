//! Asset URL extraction from job status payloads.
//!
//! The backend has returned finished outputs in several shapes over time:
//! a typed list of file objects, a map keyed `output_0..n`, nested objects
//! with loose string fields, and occasionally only a URL buried in text.
//! Extraction classifies the `outputs` field and then runs an ordered list of
//! matchers. Structured matchers always run before text scraping, and the
//! first match wins.
//!
//! Everything here is pure: no I/O, no panics, same input gives same output.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

/// Type tag of file outputs in the list shape.
pub const FILE_OUTPUT_TYPE: &str = "sieve.File";

/// Extensions that mark a string as a media asset.
pub const MEDIA_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".webm", ".m4v"];

/// Hosts and buckets the backend serves finished assets from.
pub const STORAGE_MARKERS: &[&str] = &[
    "storage.googleapis.com",
    "sieve-prod-us-central1-persistent-bucket",
    "sieve-prod-us-central1-public-file-upload-bucket",
];

static MP4_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"\\]+\.mp4[^\s"\\]*"#).unwrap());

static STORAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https://[^"'\s\\]*storage\.googleapis\.com[^"'\s\\]+"#).unwrap()
});

/// Classified shape of the `outputs` field.
#[derive(Debug, Clone, Copy)]
pub enum OutputsShape<'a> {
    /// `outputs: [ {type, data: {url}}, ... ]`
    List(&'a [Value]),
    /// `outputs: { output_0: {...}, ... }`
    Keyed(&'a Map<String, Value>),
    /// No usable `outputs` field
    Absent,
}

impl<'a> OutputsShape<'a> {
    pub fn classify(payload: Option<&'a Value>) -> Self {
        match payload.and_then(|p| p.get("outputs")) {
            Some(Value::Array(items)) => OutputsShape::List(items),
            Some(Value::Object(map)) => OutputsShape::Keyed(map),
            _ => OutputsShape::Absent,
        }
    }

    /// `output_0`, else the first map entry or array element.
    fn primary(&self) -> Option<&'a Value> {
        match self {
            OutputsShape::List(items) => items.first(),
            OutputsShape::Keyed(map) => map.get("output_0").or_else(|| map.values().next()),
            OutputsShape::Absent => None,
        }
    }
}

type StructuredMatcher = fn(&Value, &OutputsShape<'_>) -> Option<String>;
type TextMatcher = fn(&str) -> Option<String>;

/// Structured matchers in precedence order.
const STRUCTURED_MATCHERS: &[(&str, StructuredMatcher)] = &[
    ("typed_file_output", typed_file_output),
    ("list_data_url", list_data_url),
    ("keyed_output_fields", keyed_output_fields),
    ("nested_media_string", nested_media_string),
    ("root_url", root_url),
];

/// Text matchers in precedence order.
const TEXT_MATCHERS: &[(&str, TextMatcher)] = &[
    ("mp4_url", mp4_url),
    ("storage_url", storage_url),
];

/// Extract an asset URL from a raw status body.
pub fn extract(raw: &str) -> Option<String> {
    let parsed = serde_json::from_str::<Value>(raw).ok();
    extract_parsed(parsed.as_ref(), raw)
}

/// Extract an asset URL from an already parsed payload, falling back to the
/// raw text when no structured matcher applies.
pub fn extract_parsed(parsed: Option<&Value>, raw: &str) -> Option<String> {
    if let Some(url) = parsed.and_then(extract_from_value) {
        return Some(url);
    }
    extract_from_text(raw)
}

/// Run the structured matchers only.
pub fn extract_from_value(payload: &Value) -> Option<String> {
    let shape = OutputsShape::classify(Some(payload));
    STRUCTURED_MATCHERS.iter().find_map(|(name, matcher)| {
        let url = matcher(payload, &shape)?;
        debug!(matcher = *name, "Extracted asset URL");
        Some(url)
    })
}

/// Run the text matchers only.
pub fn extract_from_text(raw: &str) -> Option<String> {
    TEXT_MATCHERS.iter().find_map(|(name, matcher)| {
        let url = matcher(raw)?;
        debug!(matcher = *name, "Extracted asset URL from raw text");
        Some(url)
    })
}

/// True for an http(s) string that names a media file or a storage host.
pub fn looks_like_media_url(candidate: &str) -> bool {
    if !candidate.starts_with("http") {
        return false;
    }
    let lower = candidate.to_ascii_lowercase();
    MEDIA_EXTENSIONS.iter().any(|ext| lower.contains(ext))
        || STORAGE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// A trimmed string field that is an http(s) URL.
fn http_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| s.starts_with("http"))
        .map(str::to_string)
}

/// `data.url` where `data` is an object, or a JSON string encoding one.
fn data_url(item: &Value) -> Option<String> {
    match item.get("data")? {
        Value::Object(data) => http_str(data.get("url")),
        Value::String(encoded) => {
            let decoded = serde_json::from_str::<Value>(encoded).ok()?;
            http_str(decoded.get("url"))
        }
        _ => None,
    }
}

fn typed_file_output(_: &Value, shape: &OutputsShape<'_>) -> Option<String> {
    let OutputsShape::List(items) = shape else {
        return None;
    };
    items
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some(FILE_OUTPUT_TYPE))
        .find_map(|item| http_str(item.get("data").and_then(|d| d.get("url"))))
}

fn list_data_url(_: &Value, shape: &OutputsShape<'_>) -> Option<String> {
    let OutputsShape::List(items) = shape else {
        return None;
    };
    items
        .iter()
        .find_map(|item| http_str(item.get("data").and_then(|d| d.get("url"))))
}

fn keyed_output_fields(_: &Value, shape: &OutputsShape<'_>) -> Option<String> {
    let OutputsShape::Keyed(map) = shape else {
        return None;
    };
    map.values().find_map(|output| {
        http_str(output.get("url"))
            .or_else(|| http_str(output.get("video_url")))
            .or_else(|| data_url(output))
            .or_else(|| {
                output
                    .get("data")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| looks_like_media_url(s))
                    .map(str::to_string)
            })
    })
}

fn nested_media_string(_: &Value, shape: &OutputsShape<'_>) -> Option<String> {
    let Value::Object(primary) = shape.primary()? else {
        return None;
    };
    let direct = primary.values();
    let nested = primary
        .values()
        .filter_map(Value::as_object)
        .flat_map(|child| child.values());
    direct
        .chain(nested)
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| looks_like_media_url(s))
        .map(str::to_string)
}

fn root_url(payload: &Value, _: &OutputsShape<'_>) -> Option<String> {
    ["url", "video_url"]
        .iter()
        .find_map(|key| http_str(payload.get(*key)))
}

fn mp4_url(raw: &str) -> Option<String> {
    let matches: Vec<&str> = MP4_URL.find_iter(raw).map(|m| m.as_str()).collect();
    matches
        .iter()
        .find(|m| STORAGE_MARKERS.iter().any(|marker| m.contains(marker)))
        .or_else(|| matches.first())
        .map(|m| m.to_string())
}

fn storage_url(raw: &str) -> Option<String> {
    STORAGE_URL.find(raw).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BUCKET_URL: &str =
        "https://storage.googleapis.com/sieve-prod-us-central1-persistent-bucket/abc/clip.mp4";

    #[test]
    fn test_typed_file_list() {
        let raw = json!({
            "status": "finished",
            "outputs": [
                {"type": "sieve.Metadata", "data": {"url": "https://other.example/meta.json"}},
                {"type": "sieve.File", "data": {"url": BUCKET_URL}}
            ]
        })
        .to_string();
        assert_eq!(extract(&raw).as_deref(), Some(BUCKET_URL));
    }

    #[test]
    fn test_untyped_list_falls_back_to_any_data_url() {
        let raw = json!({"outputs": [{"data": {"url": "https://cdn.example/a.mp4"}}]}).to_string();
        assert_eq!(extract(&raw).as_deref(), Some("https://cdn.example/a.mp4"));
    }

    #[test]
    fn test_keyed_outputs() {
        let by_url = json!({"outputs": {"output_0": {"url": "https://cdn.example/u.mp4"}}});
        let by_video_url =
            json!({"outputs": {"output_0": {"video_url": "https://cdn.example/v.mp4"}}});
        let by_data = json!({"outputs": {"output_0": {"data": {"url": "https://cdn.example/d.mp4"}}}});
        let by_encoded_data = json!({
            "outputs": {"output_0": {"data": "{\"url\": \"https://cdn.example/e.mp4\"}"}}
        });
        let by_data_string = json!({"outputs": {"output_0": {"data": BUCKET_URL}}});

        assert_eq!(
            extract_from_value(&by_url).as_deref(),
            Some("https://cdn.example/u.mp4")
        );
        assert_eq!(
            extract_from_value(&by_video_url).as_deref(),
            Some("https://cdn.example/v.mp4")
        );
        assert_eq!(
            extract_from_value(&by_data).as_deref(),
            Some("https://cdn.example/d.mp4")
        );
        assert_eq!(
            extract_from_value(&by_encoded_data).as_deref(),
            Some("https://cdn.example/e.mp4")
        );
        assert_eq!(extract_from_value(&by_data_string).as_deref(), Some(BUCKET_URL));
    }

    #[test]
    fn test_nested_media_string() {
        let payload = json!({
            "outputs": {
                "output_0": {
                    "name": "clip",
                    "file": {"path": "/tmp/x", "download": "https://cdn.example/nested.webm"}
                }
            }
        });
        assert_eq!(
            extract_from_value(&payload).as_deref(),
            Some("https://cdn.example/nested.webm")
        );
    }

    #[test]
    fn test_raw_text_prefers_storage_bucket() {
        let raw = format!(
            "job done, preview at https://cdn.example/preview.mp4 and final at {}",
            BUCKET_URL
        );
        assert_eq!(extract(&raw).as_deref(), Some(BUCKET_URL));
    }

    #[test]
    fn test_loose_storage_url() {
        let raw = "see 'https://storage.googleapis.com/bucket/object?sig=1' for output";
        assert_eq!(
            extract(raw).as_deref(),
            Some("https://storage.googleapis.com/bucket/object?sig=1")
        );
    }

    #[test]
    fn test_structured_beats_text() {
        let raw = json!({
            "outputs": [{"type": "sieve.File", "data": {"url": "https://cdn.example/structured.mp4"}}],
            "log": format!("uploaded {}", BUCKET_URL)
        })
        .to_string();
        assert_eq!(
            extract(&raw).as_deref(),
            Some("https://cdn.example/structured.mp4")
        );
    }

    #[test]
    fn test_no_url_yields_none() {
        assert_eq!(extract(r#"{"status": "finished", "outputs": []}"#), None);
        assert_eq!(extract(r#"{"outputs": {"output_0": {"url": ""}}}"#), None);
        assert_eq!(extract("<html>502 Bad Gateway</html>"), None);
        assert_eq!(extract(""), None);
        assert_eq!(extract("\u{0}\u{1}{{{not json"), None);
    }

    #[test]
    fn test_structured_fields_must_be_http_urls() {
        assert_eq!(extract(r#"{"outputs": {"output_0": {"url": "pending"}}}"#), None);
        assert_eq!(
            extract(r#"{"outputs": [{"type": "sieve.File", "data": {"url": "/tmp/clip.mp4"}}]}"#),
            None
        );
        let later = json!({"outputs": {
            "output_0": {"video_url": "queued"},
            "output_1": {"url": "https://cdn.example/late.mp4"}
        }});
        assert_eq!(
            extract_from_value(&later).as_deref(),
            Some("https://cdn.example/late.mp4")
        );
    }

    #[test]
    fn test_text_match_stops_at_escaped_quote() {
        let raw = r#"{"status":"finished","outputs":{"output_0":{"log":"saved to \"https://cdn.example/a.mp4\" ok"}}}"#;
        assert_eq!(extract(raw).as_deref(), Some("https://cdn.example/a.mp4"));

        let encoded = r#"{"result":"{\"link\":\"https://storage.googleapis.com/b/obj?sig=1\"}"}"#;
        assert_eq!(
            extract(encoded).as_deref(),
            Some("https://storage.googleapis.com/b/obj?sig=1")
        );
    }

    #[test]
    fn test_extract_is_idempotent() {
        let raw = json!({"outputs": {"output_0": {"url": "https://cdn.example/u.mp4"}}}).to_string();
        assert_eq!(extract(&raw), extract(&raw));
    }

    #[test]
    fn test_classify_shapes() {
        assert!(matches!(
            OutputsShape::classify(Some(&json!({"outputs": []}))),
            OutputsShape::List(_)
        ));
        assert!(matches!(
            OutputsShape::classify(Some(&json!({"outputs": {}}))),
            OutputsShape::Keyed(_)
        ));
        assert!(matches!(
            OutputsShape::classify(Some(&json!({"outputs": "x"}))),
            OutputsShape::Absent
        ));
        assert!(matches!(OutputsShape::classify(None), OutputsShape::Absent));
    }
}
