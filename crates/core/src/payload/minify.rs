//! Page compression.

use regex_lite::Regex;

use super::PayloadError;

/// Shrinks a rendered page before it is embedded in a payload.
pub trait Minifier: Send + Sync {
    fn minify(&self, html: &str) -> Result<String, PayloadError>;
}

/// Strips HTML comments, indentation and blank lines.
///
/// Line breaks are kept so inline scripts with `//` comments stay valid.
pub struct WhitespaceMinifier {
    comments: Regex,
}

impl Default for WhitespaceMinifier {
    fn default() -> Self {
        Self::new()
    }
}

impl WhitespaceMinifier {
    pub fn new() -> Self {
        Self {
            comments: Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"),
        }
    }
}

impl Minifier for WhitespaceMinifier {
    fn minify(&self, html: &str) -> Result<String, PayloadError> {
        let without_comments = self.comments.replace_all(html, "");
        let lines: Vec<&str> = without_comments
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_strips_comments_and_indentation() {
        let html = "<html>\n  <!-- note\n spanning -->\n  <body>\n\n    <p>Hi</p>\n  </body>\n</html>\n";
        let out = WhitespaceMinifier::new().minify(html).unwrap();
        assert_eq!(out, "<html>\n<body>\n<p>Hi</p>\n</body>\n</html>");
    }

    #[test]
    fn test_minify_keeps_script_line_comments_on_their_line() {
        let html = "<script>\n  const a = 1; // one\n  const b = 2;\n</script>";
        let out = WhitespaceMinifier::new().minify(html).unwrap();
        assert_eq!(out, "<script>\nconst a = 1; // one\nconst b = 2;\n</script>");
    }
}
