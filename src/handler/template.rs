//! Marker substitution for served content
//!
//! Two literal markers are recognized: [`DATE_MARKER`] becomes the current
//! date and [`SERVER_MARKER`] becomes the server description, both wrapped
//! in an `<h3>` heading. Replacement text is never rescanned.

use chrono::{Local, NaiveDate};

use crate::config::TemplateConfig;

pub const DATE_MARKER: &str = "<cs371date>";
pub const SERVER_MARKER: &str = "<cs371server>";

/// month/day/two-digit-year
const DATE_FORMAT: &str = "%m/%d/%y";

#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    server_description: String,
}

impl TemplateRenderer {
    pub fn new(server_description: impl Into<String>) -> Self {
        Self {
            server_description: server_description.into(),
        }
    }

    pub fn from_config(template: &TemplateConfig) -> Self {
        Self::new(template.server_description.clone())
    }

    /// Render with today's local date
    pub fn render_now(&self, payload: &[u8]) -> Vec<u8> {
        self.render(payload, Local::now().date_naive())
    }

    /// Substitute every marker occurrence in a single forward scan
    ///
    /// Works on raw bytes: markers are ASCII, so a match can never start
    /// inside a multi-byte UTF-8 sequence, and non-UTF-8 content passes
    /// through untouched.
    pub fn render(&self, payload: &[u8], today: NaiveDate) -> Vec<u8> {
        let date = emphasize(&today.format(DATE_FORMAT).to_string());
        let server = emphasize(&self.server_description);
        let substitutions: [(&[u8], &[u8]); 2] = [
            (DATE_MARKER.as_bytes(), date.as_bytes()),
            (SERVER_MARKER.as_bytes(), server.as_bytes()),
        ];

        let mut out = Vec::with_capacity(payload.len());
        // Bytes before `copied` are already in `out`; `pos` is the scan cursor
        let mut copied = 0;
        let mut pos = 0;

        while let Some(offset) = payload[pos..].iter().position(|&b| b == b'<') {
            let at = pos + offset;
            let rest = &payload[at..];
            match substitutions.iter().find(|(marker, _)| rest.starts_with(marker)) {
                Some((marker, replacement)) => {
                    out.extend_from_slice(&payload[copied..at]);
                    out.extend_from_slice(replacement);
                    pos = at + marker.len();
                    copied = pos;
                }
                None => pos = at + 1,
            }
        }
        out.extend_from_slice(&payload[copied..]);
        out
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::from_config(&TemplateConfig::default())
    }
}

fn emphasize(text: &str) -> String {
    format!("<h3>{text}</h3>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SERVER_DESCRIPTION;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
    }

    fn render(renderer: &TemplateRenderer, input: &str) -> String {
        String::from_utf8(renderer.render(input.as_bytes(), day())).unwrap()
    }

    #[test]
    fn test_no_markers_unchanged() {
        let r = TemplateRenderer::default();
        for input in ["", "<", "plain text", "<html><body>x</body></html>", "<cs371dat>"] {
            assert_eq!(render(&r, input), input);
        }
        let binary = [0u8, 0xff, b'<', 0xfe];
        assert_eq!(r.render(&binary, day()), binary);
    }

    #[test]
    fn test_date_marker() {
        let r = TemplateRenderer::default();
        assert_eq!(render(&r, "Today: <cs371date>!"), "Today: <h3>03/07/26</h3>!");
    }

    #[test]
    fn test_server_marker() {
        let r = TemplateRenderer::default();
        assert_eq!(
            render(&r, "<cs371server>"),
            format!("<h3>{DEFAULT_SERVER_DESCRIPTION}</h3>")
        );
    }

    #[test]
    fn test_repeated_and_adjacent_markers() {
        let r = TemplateRenderer::new("srv");
        let out = render(&r, "<cs371date>a<cs371date><cs371server><cs371server>b<cs371date>");
        assert_eq!(
            out,
            "<h3>03/07/26</h3>a<h3>03/07/26</h3><h3>srv</h3><h3>srv</h3>b<h3>03/07/26</h3>"
        );
        assert!(!out.contains(DATE_MARKER));
        assert!(!out.contains(SERVER_MARKER));
    }

    #[test]
    fn test_replacement_not_rescanned() {
        let r = TemplateRenderer::new("<cs371date>");
        assert_eq!(render(&r, "<cs371server>"), "<h3><cs371date></h3>");
    }

    #[test]
    fn test_multibyte_content_preserved() {
        let r = TemplateRenderer::new("ünïcødé");
        assert_eq!(
            render(&r, "héllo <cs371date> wörld <cs371server> ✓"),
            "héllo <h3>03/07/26</h3> wörld <h3>ünïcødé</h3> ✓"
        );
    }

    #[test]
    fn test_nested_angle_brackets() {
        let r = TemplateRenderer::new("s");
        assert_eq!(render(&r, "<<cs371date>>"), "<<h3>03/07/26</h3>>");
        assert_eq!(render(&r, "<cs371<cs371server>"), "<cs371<h3>s</h3>");
    }
}
