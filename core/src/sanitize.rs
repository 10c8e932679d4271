//! Free-text hygiene and id validation.
//!
//! RULE: every string typed by the user passes through `sanitize_input`
//! before it reaches the store.

use regex::Regex;
use std::sync::LazyLock;

static BLOCK_TAGS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["script", "iframe", "object", "embed"]
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b.*?</{tag}>"))
                .expect("block tag pattern is valid")
        })
        .collect()
});

static JS_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:").expect("scheme pattern is valid"));

static EVENT_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)on\w+\s*=").expect("handler pattern is valid"));

static UUID_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("uuid pattern is valid")
});

/// Strip embedded markup that could execute in a browser, then trim.
pub fn sanitize_input(input: &str) -> String {
    let mut out = input.to_string();
    for re in BLOCK_TAGS.iter() {
        out = re.replace_all(&out, "").into_owned();
    }
    out = JS_SCHEME.replace_all(&out, "").into_owned();
    out = EVENT_HANDLER.replace_all(&out, "").into_owned();
    out.trim().to_string()
}

/// Canonical hyphenated UUID, versions 1-5, RFC 4122 variant.
pub fn validate_uuid(id: &str) -> bool {
    UUID_SHAPE.is_match(id)
}
