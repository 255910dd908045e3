//! HTML fragments handed to the templating layer. Output is final: callers
//! must not escape it again.

/// Escapes angle brackets and turns newlines into `<br />`.
///
/// Only `<` and `>` are replaced. Ampersands and quotes pass through so that
/// stored text renders exactly as it did in the directory pages.
pub fn escape_multiline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' => out.push_str("<br />"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders `url` as an anchor whose target and text are both the URL.
///
/// Characters that could close the attribute or the element are entity
/// encoded; ordinary URLs come out unchanged.
pub fn render_link(url: &str) -> String {
    let safe = html_escape::encode_double_quoted_attribute(url);
    format!("<a href=\"{safe}\">{safe}</a>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_angle_brackets() {
        assert_eq!(
            escape_multiline("<script>alert(1)</script>"),
            "&lt;script&gt;alert(1)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_newlines_become_breaks() {
        assert_eq!(escape_multiline("a\nb\n"), "a<br />b<br />");
    }

    #[test]
    fn test_ampersand_untouched_in_text() {
        assert_eq!(escape_multiline("R&D"), "R&D");
    }

    #[test]
    fn test_plain_url_link() {
        assert_eq!(
            render_link("http://example.org"),
            "<a href=\"http://example.org\">http://example.org</a>"
        );
    }

    #[test]
    fn test_link_cannot_break_out_of_attribute() {
        let out = render_link("http://x\"><script>");
        assert_eq!(
            out,
            "<a href=\"http://x&quot;&gt;&lt;script&gt;\">http://x&quot;&gt;&lt;script&gt;</a>"
        );
    }

    #[test]
    fn test_query_string_ampersand_encoded_in_link() {
        assert_eq!(
            render_link("https://a.org/?x=1&y=2"),
            "<a href=\"https://a.org/?x=1&amp;y=2\">https://a.org/?x=1&amp;y=2</a>"
        );
    }
}
