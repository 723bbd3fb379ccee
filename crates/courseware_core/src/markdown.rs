//! crates/courseware_core/src/markdown.rs
//!
//! Finds the inline image directives `![caption](ai-generated:prompt)` embedded
//! in generated markdown.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageDirective {
    pub caption: String,
    pub prompt: String,
}

fn directive_regex() -> &'static Regex {
    static DIRECTIVE: OnceLock<Regex> = OnceLock::new();
    DIRECTIVE.get_or_init(|| {
        Regex::new(r"!\[([^\]]*)\]\(ai-generated(?::|%3A|%3a)([^)]*)\)").expect("static directive pattern")
    })
}

/// All image directives in document order. Prompts are URL-decoded where the
/// renderer may have encoded them.
pub fn image_directives(markdown: &str) -> Vec<ImageDirective> {
    directive_regex()
        .captures_iter(markdown)
        .filter_map(|c| {
            let prompt = decode_prompt(c.get(2)?.as_str());
            if prompt.trim().is_empty() {
                return None;
            }
            Some(ImageDirective {
                caption: c.get(1)?.as_str().trim().to_string(),
                prompt,
            })
        })
        .collect()
}

fn decode_prompt(raw: &str) -> String {
    if !raw.contains('%') {
        return raw.trim().to_string();
    }
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).trim().to_string()
}
