//! Rich-text normalization for tool output.
//!
//! Azure DevOps stores work item descriptions, acceptance criteria, repro
//! steps, and comments as HTML. Agents read them far better as plain text, so
//! tools pass those fields through [`html_to_text`] before returning them.
//!
//! The HTML path is a fixed sequence of textual rewrites, not a parser.
//! Structure-bearing tags become newlines or markers first, then every other
//! tag is dropped, then entities are decoded, then whitespace is tidied.
//! Entities are decoded after tag stripping so that entity text inside
//! attributes never surfaces as content.
//!
//! # Example
//!
//! ```
//! use azdo_text::html_to_text;
//!
//! assert_eq!(
//!     html_to_text(Some("<p>First</p><p>Second</p>")),
//!     Some("First\n\nSecond".to_string())
//! );
//! assert_eq!(html_to_text(Some("   ")), None);
//! ```

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Anything shaped like a tag. Used both to sniff HTML and to strip tags.
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static PARAGRAPH_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(?:p|h[1-6])\s*>").unwrap());
static LINE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(?:div|li|tr)\s*>").unwrap());
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?\s*>").unwrap());
static LIST_ITEM_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<li(?:\s[^>]*)?>").unwrap());
static HORIZONTAL_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<hr(?:\s[^>]*)?/?>").unwrap());

static NAMED_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"&(nbsp|amp|lt|gt|quot|#39|apos|#[xX]27|#[xX]2[fF]|ndash|mdash|hellip|copy|reg|trade);",
    )
    .unwrap()
});
static DECIMAL_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#(\d{1,7});").unwrap());
static HEX_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#[xX]([0-9a-fA-F]{1,6});").unwrap());

static HORIZONTAL_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Whether the input contains any `<...>` substring.
///
/// This is a heuristic: `a < b > c` counts as HTML too.
pub fn looks_like_html(input: &str) -> bool {
    TAG.is_match(input)
}

/// Convert a rich-text field value to plain text.
///
/// Returns `None` for absent, empty, or whitespace-only input, and for HTML
/// that has no text left once tags are removed. Input without anything
/// tag-shaped is trimmed and only has its numeric character references
/// (`&#65;`, `&#x41;`) decoded; named entities and whitespace stay as written.
pub fn html_to_text(input: Option<&str>) -> Option<String> {
    let input = input?;
    if input.trim().is_empty() {
        return None;
    }

    if !looks_like_html(input) {
        let text = decode_numeric_entities(input);
        let text = text.trim();
        return (!text.is_empty()).then(|| text.to_string());
    }

    let text = PARAGRAPH_CLOSE.replace_all(input, "\n\n");
    let text = LINE_CLOSE.replace_all(&text, "\n");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = LIST_ITEM_OPEN.replace_all(&text, "• ");
    let text = HORIZONTAL_RULE.replace_all(&text, "\n---\n");
    let text = TAG.replace_all(&text, "");

    let text = NAMED_ENTITY.replace_all(&text, |caps: &Captures| named_entity(&caps[1]).to_string());
    let text = decode_numeric_entities(&text);

    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");

    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Convenience for owned optional fields.
pub fn normalize_field(value: Option<String>) -> Option<String> {
    html_to_text(value.as_deref())
}

fn named_entity(name: &str) -> &'static str {
    match name {
        "nbsp" => " ",
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "#39" | "apos" | "#x27" | "#X27" => "'",
        "ndash" => "–",
        "mdash" => "—",
        "hellip" => "…",
        "copy" => "©",
        "reg" => "®",
        "trade" => "™",
        // &#x2F; in any case combination
        _ => "/",
    }
}

fn decode_numeric_entities(text: &str) -> String {
    let text = DECIMAL_ENTITY.replace_all(text, |caps: &Captures| {
        decode_code_point(&caps[0], caps[1].parse::<u32>().ok())
    });
    let text = HEX_ENTITY.replace_all(&text, |caps: &Captures| {
        decode_code_point(&caps[0], u32::from_str_radix(&caps[1], 16).ok())
    });
    text.into_owned()
}

fn decode_code_point(original: &str, code: Option<u32>) -> String {
    code.and_then(char::from_u32)
        .map(String::from)
        .unwrap_or_else(|| original.to_string())
}
