//! Minimal HTML extraction for the legacy portal forms.
//!
//! The pages are server-generated ASP.NET markup (sometimes wrapped in async
//! postback deltas), so tag-level regexes over `<select>`/`<option>`/`<input>`
//! are enough; no DOM is built.
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static TAG_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("attribute regex")
});
static SELECT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<select\b([^>]*)>").expect("select regex"));
static SELECT_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</select\s*>").expect("select close regex"));
static OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<option\b([^>]*)>(.*?)(?:</option\s*>|$)").expect("option regex")
});
static INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b([^>]*)>").expect("input regex"));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9A-Fa-f]+|[0-9]+);").expect("entity regex"));

/// An `<option>` as `(visible text, value)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub text: String,
    pub value: String,
}

/// Attributes of a tag's inner text (`name="x" value='y'`), lower-cased keys.
pub fn attributes(tag_inner: &str) -> BTreeMap<String, String> {
    TAG_ATTR
        .captures_iter(tag_inner)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or("");
            (caps[1].to_ascii_lowercase(), decode_entities(value))
        })
        .collect()
}

/// Options of the `<select>` with the given id, in document order.
pub fn select_options(html: &str, select_id: &str) -> Vec<SelectOption> {
    let Some(open) = SELECT_OPEN
        .captures_iter(html)
        .find(|caps| attributes(&caps[1]).get("id").map(String::as_str) == Some(select_id))
    else {
        return Vec::new();
    };
    let body_start = open.get(0).map(|m| m.end()).unwrap_or(0);
    let body_end = SELECT_CLOSE
        .find_at(html, body_start)
        .map(|m| m.start())
        .unwrap_or(html.len());
    let body = &html[body_start..body_end];

    OPTION
        .captures_iter(body)
        .map(|caps| {
            let attrs = attributes(&caps[1]);
            let text = text_content(&caps[2]);
            let value = attrs.get("value").cloned().unwrap_or_else(|| text.clone());
            SelectOption { text, value }
        })
        .collect()
}

/// The `value` of the `<input>` with the given id.
pub fn input_value(html: &str, input_id: &str) -> Option<String> {
    INPUT.captures_iter(html).find_map(|caps| {
        let mut attrs = attributes(&caps[1]);
        if attrs.get("id").map(String::as_str) == Some(input_id) {
            Some(attrs.remove("value").unwrap_or_default())
        } else {
            None
        }
    })
}

/// Visible text: tags stripped, entities decoded, whitespace collapsed.
pub fn text_content(fragment: &str) -> String {
    let stripped = ANY_TAG.replace_all(fragment, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode the named entities ASP.NET emits plus numeric references.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let numeric = NUMERIC_ENTITY.replace_all(raw, |caps: &regex::Captures| {
        let code = &caps[1];
        let parsed = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        parsed
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    numeric
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Escape text for inclusion in generated HTML.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
