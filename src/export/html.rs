//! HTML-to-plain-text stripping for Markdown export bodies.
//!
//! A documented, fixed rule set, not a general HTML-to-text renderer,
//! since a generic renderer would not reproduce this exact transformation
//! (see DESIGN.md).

use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</\1>").unwrap());
static BR_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static CLOSE_P_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</p\s*>").unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strips `html` down to plain text per a fixed rule set:
/// drop `<script>`/`<style>` blocks, decode common entities, turn
/// `<br>`/`</p>` into newlines, strip remaining tags, collapse 3+
/// consecutive newlines to 2.
pub fn strip_html(html: &str) -> String {
    let without_script_style = SCRIPT_STYLE.replace_all(html, "");
    let with_breaks = CLOSE_P_TAG.replace_all(&without_script_style, "\n");
    let with_breaks = BR_TAG.replace_all(&with_breaks, "\n");
    let without_tags = ANY_TAG.replace_all(&with_breaks, "");
    let decoded = decode_entities(&without_tags);
    let collapsed = EXCESS_NEWLINES.replace_all(&decoded, "\n\n");
    collapsed.trim().to_string()
}

fn decode_entities(input: &str) -> String {
    input
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_script_and_style() {
        let html = "<style>.a{color:red}</style><p>hi</p><script>alert(1)</script>";
        let out = strip_html(html);
        assert_eq!(out, "hi");
    }

    #[test]
    fn test_br_and_closing_p_become_newlines() {
        let html = "<p>line one<br>line two</p><p>line three</p>";
        let out = strip_html(html);
        assert_eq!(out, "line one\nline two\nline three");
    }

    #[test]
    fn test_decodes_entities() {
        let html = "Tom &amp; Jerry &lt;tom@example.com&gt; said &quot;hi&quot; &#39;ok&#39;&nbsp;done";
        let out = strip_html(html);
        assert_eq!(out, "Tom & Jerry <tom@example.com> said \"hi\" 'ok' done");
    }

    #[test]
    fn test_collapses_excess_newlines() {
        let html = "a<br><br><br><br>b";
        let out = strip_html(html);
        assert_eq!(out, "a\n\nb");
    }

    #[test]
    fn test_strips_remaining_tags() {
        let html = "<div class=\"x\"><b>bold</b> and <i>italic</i></div>";
        let out = strip_html(html);
        assert_eq!(out, "bold and italic");
    }
}
