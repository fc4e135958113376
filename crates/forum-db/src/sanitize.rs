//! Content hygiene (§4.3 "Content hygiene"): title fields are reduced to
//! plain text, content fields pass an allow-list HTML sanitizer, both after
//! Unicode NFC normalization and stripping of bidirectional override code
//! points (used historically to disguise malicious filenames/text —
//! "trojan source"-style attacks).

use unicode_normalization::UnicodeNormalization as _;

/// Bidirectional control characters that can reorder visual text; see
/// Unicode TR9. None of these are legitimate in forum titles or content.
const BIDI_OVERRIDES: &[char] = &[
    '\u{202A}', // LRE
    '\u{202B}', // RLE
    '\u{202C}', // PDF
    '\u{202D}', // LRO
    '\u{202E}', // RLO
    '\u{2066}', // LRI
    '\u{2067}', // RLI
    '\u{2068}', // FSI
    '\u{2069}', // PDI
];

fn strip_bidi_overrides(s: &str) -> String {
    s.chars().filter(|c| !BIDI_OVERRIDES.contains(c)).collect()
}

fn nfc_normalize(s: &str) -> String {
    s.nfc().collect()
}

/// Reduce a title field to plain text: NFC-normalize, strip bidi overrides,
/// then strip all markup (titles never carry HTML).
pub fn sanitize_title(raw: &str) -> String {
    let normalized = nfc_normalize(&strip_bidi_overrides(raw));
    ammonia::Builder::new()
        .tags(std::collections::HashSet::new())
        .clean(&normalized)
        .to_string()
}

/// Sanitize a content field: NFC-normalize, strip bidi overrides, then run
/// through an allow-list tag/attribute sanitizer.
pub fn normalize_and_sanitize_content(raw: &str) -> String {
    let normalized = nfc_normalize(&strip_bidi_overrides(raw));
    ammonia::Builder::new()
        .add_tags(["p", "br", "strong", "em", "code", "pre", "blockquote", "ul", "ol", "li", "a"])
        .add_tag_attributes("a", ["href"])
        .link_rel(Some("nofollow noopener noreferrer"))
        .clean(&normalized)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bidi_override_characters() {
        let evil = "safe\u{202E}txt.exe";
        assert_eq!(sanitize_title(evil), "safetxt.exe");
    }

    #[test]
    fn title_strips_all_markup() {
        assert_eq!(sanitize_title("<b>Hello</b> world"), "Hello world");
    }

    #[test]
    fn content_keeps_allow_listed_tags() {
        let out = normalize_and_sanitize_content("<p>hi <strong>there</strong></p>");
        assert!(out.contains("<strong>there</strong>"));
    }

    #[test]
    fn content_strips_script_tags() {
        let out = normalize_and_sanitize_content("<script>alert(1)</script>hello");
        assert!(!out.contains("script"));
        assert!(out.contains("hello"));
    }

    #[test]
    fn nfc_normalizes_combining_characters() {
        let decomposed = "e\u{0301}"; // e + combining acute
        let composed = "\u{00E9}"; // é precomposed
        assert_eq!(sanitize_title(decomposed), composed);
    }
}
