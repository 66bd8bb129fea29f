use regex::Regex;
use std::sync::OnceLock;

/// Strips executable content from a raw user value before it can reach a payload.
pub trait Sanitizer {
    fn sanitize(&self, raw: &str) -> String;
}

/// Regex-based markup stripper: script/style blocks, whole tags (with any
/// inline event handlers they carry) and `javascript:` URLs. Text outside
/// tags is kept as typed.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkupSanitizer;

struct Patterns {
    blocks: Regex,
    tags: Regex,
    js_urls: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        blocks: Regex::new(r"(?is)<\s*(script|style)\b[^>]*>.*?<\s*/\s*(script|style)\s*>")
            .expect("static regex"),
        // quoted attribute values may contain '>'
        tags: Regex::new(r#"(?s)<(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("static regex"),
        js_urls: Regex::new(r"(?i)javascript\s*:").expect("static regex"),
    })
}

impl Sanitizer for MarkupSanitizer {
    fn sanitize(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }
        let p = patterns();
        let s = p.blocks.replace_all(raw, "");
        let s = p.tags.replace_all(&s, "");
        let s = p.js_urls.replace_all(&s, "");
        // a dangling '<' could still open a tag once concatenated downstream
        s.replace('<', "&lt;").replace('>', "&gt;")
    }
}
