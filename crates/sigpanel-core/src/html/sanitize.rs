//! HTML sanitizing
//!
//! Removes active content from a signature body: scripting elements,
//! event handler attributes and script URLs. Images may only point at
//! inline data, remote http(s) resources or message parts.

use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

/// Elements removed together with their content
const BLOCK_ELEMENTS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "applet", "form", "frameset", "frame",
    "noscript", "template", "title", "textarea", "select", "button",
];

/// Attributes carrying URLs
const URL_ATTRIBUTES: &[&str] = &[
    "href",
    "src",
    "action",
    "formaction",
    "background",
    "xlink:href",
    "lowsrc",
    "dynsrc",
    "poster",
    "srcset",
];

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));

static BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    BLOCK_ELEMENTS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"))
                .expect("block element pattern is valid")
        })
        .collect()
});

static STRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)</?(?:{}|link|meta|base|input)\b[^>]*>",
        BLOCK_ELEMENTS.join("|")
    ))
    .expect("stray element pattern is valid")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<([a-zA-Z][a-zA-Z0-9]*)((?:[\s/][^>]*)?)>").expect("tag pattern is valid")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*("[^"]*"|'[^']*'|[^\s"'>]+))?"#)
        .expect("attribute pattern is valid")
});

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)&(?:#x([0-9a-f]+)|#([0-9]+)|(colon|tab|newline));?")
        .expect("entity pattern is valid")
});

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("markup pattern is valid"));

/// Sanitize an HTML signature body
pub fn sanitize_html(html: &str) -> String {
    // Removing an element can join the text around it into a new tag,
    // so strip until nothing changes. Every change shortens the text.
    let mut out = html.to_string();
    loop {
        let stripped = strip_active_elements(&out);
        if stripped == out {
            break;
        }
        out = stripped;
    }

    let cleaned = TAG
        .replace_all(&out, |caps: &Captures<'_>| clean_tag(&caps[1], &caps[2]))
        .into_owned();

    if cleaned != html {
        debug!("Sanitized HTML signature ({} -> {} bytes)", html.len(), cleaned.len());
    }

    cleaned
}

fn strip_active_elements(html: &str) -> String {
    let mut out = COMMENT.replace_all(html, "").into_owned();

    for block in BLOCKS.iter() {
        out = block.replace_all(&out, "").into_owned();
    }

    STRAY.replace_all(&out, "").into_owned()
}

fn clean_tag(name: &str, attributes: &str) -> String {
    let tag = name.to_ascii_lowercase();
    let mut out = format!("<{}", name);

    for attr in ATTRIBUTE.captures_iter(attributes) {
        let attr_name = attr[1].to_ascii_lowercase();
        let value = attr.get(2).map(|v| unquote(v.as_str())).unwrap_or("");

        if is_allowed(&tag, &attr_name, value) {
            out.push(' ');
            out.push_str(&attr[0]);
        }
    }

    if attributes.trim_end().ends_with('/') {
        out.push_str(" /");
    }
    out.push('>');
    out
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}

fn is_allowed(tag: &str, attr: &str, value: &str) -> bool {
    if attr.starts_with("on") {
        return false;
    }

    // Browsers decode entities and ignore whitespace inside schemes.
    let normalized: String = decode_entities(value)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    if attr == "style" {
        return !["expression(", "javascript:", "vbscript:", "behavior:", "-moz-binding"]
            .iter()
            .any(|needle| normalized.contains(needle));
    }

    if !URL_ATTRIBUTES.contains(&attr) {
        return true;
    }

    if attr == "srcset" {
        return false;
    }

    if ["javascript:", "vbscript:", "livescript:"]
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
    {
        return false;
    }

    if tag == "img" && attr == "src" {
        return ["data:image/", "http://", "https://", "cid:"]
            .iter()
            .any(|prefix| normalized.starts_with(prefix));
    }

    !normalized.starts_with("data:") || normalized.starts_with("data:image/")
}

fn decode_entities(value: &str) -> String {
    ENTITY
        .replace_all(value, |caps: &Captures<'_>| {
            let code = if let Some(hex) = caps.get(1) {
                u32::from_str_radix(hex.as_str(), 16).ok()
            } else if let Some(dec) = caps.get(2) {
                dec.as_str().parse().ok()
            } else {
                match caps[3].to_ascii_lowercase().as_str() {
                    "colon" => Some(u32::from(b':')),
                    "tab" => Some(u32::from(b'\t')),
                    _ => Some(u32::from(b'\n')),
                }
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        })
        .into_owned()
}

/// Remove all markup from a text and trim it
pub fn strip_tags(text: &str) -> String {
    MARKUP.replace_all(text, "").trim().to_string()
}
