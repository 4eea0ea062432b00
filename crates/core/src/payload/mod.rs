//! Question payloads for externally hosted task pages.
//!
//! The task page skeleton is filled in (experiment name, task URL, datastore
//! URL, title and description sections), compressed, and wrapped in the
//! `HTMLQuestion` envelope the MTurk API expects.

mod description;
mod html;
mod minify;
mod template;

pub use description::description_html;
pub use minify::{Minifier, WhitespaceMinifier};
pub use template::{BundledLayouts, DirectoryLayouts, LayoutKind, TemplateSource};

use std::sync::Arc;

use regex_lite::{Captures, Regex};
use thiserror::Error;
use tracing::debug;

use crate::config::DescriptionSections;

use html::{escape_text, find_element};

const ENVELOPE_OPEN: &str = "<HTMLQuestion xmlns=\"http://mechanicalturk.amazonaws.com/AWSMechanicalTurkDataSchemas/2011-11-11/HTMLQuestion.xsd\"> <HTMLContent><![CDATA[";
const ENVELOPE_CLOSE: &str = "]]> </HTMLContent> <FrameHeight>0</FrameHeight> </HTMLQuestion>";

/// Largest question payload the API accepts, in bytes.
pub const MAX_QUESTION_BYTES: usize = 131_072;

/// Errors building a question payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Layout template unavailable at {path}: {reason}")]
    TemplateUnavailable { path: String, reason: String },

    #[error("Layout template is missing the '{0}' marker")]
    MissingMarker(String),

    #[error("Page content cannot be embedded: {0}")]
    InvalidContent(String),

    #[error("Question payload is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// Values substituted into the study page.
#[derive(Debug, Clone)]
pub struct TaskPage<'a> {
    pub experiment: &'a str,
    pub task_url: &'a str,
    pub database_url: &'a str,
    pub title: &'a str,
    pub description: &'a DescriptionSections,
    /// Appended as a comment to each substituted line.
    pub stamp: &'a str,
}

/// A named content section of the page.
struct Section<'a> {
    id: &'static str,
    list_tag: &'static str,
    items: &'a [String],
    paras: &'a [String],
}

/// Builds `HTMLQuestion` payloads.
pub struct QuestionPayloadBuilder {
    templates: Arc<dyn TemplateSource>,
    minifier: Arc<dyn Minifier>,
}

impl QuestionPayloadBuilder {
    pub fn new(templates: Arc<dyn TemplateSource>, minifier: Arc<dyn Minifier>) -> Self {
        Self {
            templates,
            minifier,
        }
    }

    /// Builder using the bundled layouts and whitespace minifier.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(BundledLayouts), Arc::new(WhitespaceMinifier::new()))
    }

    /// Full payload for a study page.
    pub async fn build(&self, page: &TaskPage<'_>) -> Result<String, PayloadError> {
        let template = self.templates.load(LayoutKind::Study).await?;
        let rendered = render(&template, page)?;
        self.finish(&rendered)
    }

    /// Full payload for a compensation task. No substitution or section
    /// injection takes place.
    pub async fn build_compensation(&self) -> Result<String, PayloadError> {
        let template = self.templates.load(LayoutKind::Compensation).await?;
        self.finish(&template)
    }

    fn finish(&self, html: &str) -> Result<String, PayloadError> {
        let minified = self.minifier.minify(html)?;
        debug!("Minified page from {} to {} bytes", html.len(), minified.len());
        wrap(&minified)
    }
}

/// Substitute variables and inject description sections.
pub fn render(template: &str, page: &TaskPage<'_>) -> Result<String, PayloadError> {
    let mut html = template.to_string();

    for (name, value) in [
        ("expName", page.experiment),
        ("taskURL", page.task_url),
        ("databaseURL", page.database_url),
    ] {
        html = substitute_variable(&html, name, value, page.stamp)?;
    }

    let title = find_element(&html, "title-text")
        .ok_or_else(|| PayloadError::MissingMarker("title-text".to_string()))?;
    html.replace_range(title.inner_start..title.inner_end, &escape_text(page.title));

    let sections = [
        Section {
            id: "requirements",
            list_tag: "ul",
            items: &page.description.requirements_list,
            paras: &page.description.requirements_para,
        },
        Section {
            id: "summary",
            list_tag: "ul",
            items: &[],
            paras: &page.description.summary_para,
        },
        Section {
            id: "instructions",
            list_tag: "ol",
            items: &page.description.instructions_list,
            paras: &page.description.instructions_para,
        },
    ];
    for section in &sections {
        html = inject_section(&html, section)?;
    }

    Ok(html)
}

/// Replace the whole line declaring `name` with a fresh declaration.
fn substitute_variable(
    html: &str,
    name: &str,
    value: &str,
    stamp: &str,
) -> Result<String, PayloadError> {
    let pattern = Regex::new(&format!(r"(?m)^.*{} = .*$", name))
        .map_err(|e| PayloadError::InvalidContent(e.to_string()))?;
    if !pattern.is_match(html) {
        return Err(PayloadError::MissingMarker(name.to_string()));
    }

    let line = format!(
        "        const {} = '{}'; // {}",
        name,
        escape_js_string(value),
        stamp
    );
    Ok(pattern
        .replace(html, |_: &Captures| line.clone())
        .into_owned())
}

fn escape_js_string(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace("</", "<\\/")
}

/// Append list-then-paragraph content to a section, or remove the section
/// when there is nothing to show.
fn inject_section(html: &str, section: &Section<'_>) -> Result<String, PayloadError> {
    let span = find_element(html, section.id)
        .ok_or_else(|| PayloadError::MissingMarker(section.id.to_string()))?;

    let mut out = String::with_capacity(html.len());
    if section.items.is_empty() && section.paras.is_empty() {
        out.push_str(&html[..span.start]);
        out.push_str(&html[span.end..]);
        return Ok(out);
    }

    let mut content = String::new();
    if !section.items.is_empty() {
        content.push_str(&format!("<{} style=\"padding-left: 1em\">", section.list_tag));
        for item in section.items {
            content.push_str(&format!("<li>{}</li>", escape_text(item)));
        }
        content.push_str(&format!("</{}>", section.list_tag));
    }
    for para in section.paras {
        content.push_str(&format!("<p>{}</p>", escape_text(para)));
    }

    out.push_str(&html[..span.inner_end]);
    out.push_str(&content);
    out.push_str(&html[span.inner_end..]);
    Ok(out)
}

/// Wrap page HTML in the `HTMLQuestion` envelope.
pub fn wrap(html: &str) -> Result<String, PayloadError> {
    if html.contains("]]>") {
        return Err(PayloadError::InvalidContent(
            "page contains a CDATA terminator".to_string(),
        ));
    }

    let payload = format!("{}{}{}", ENVELOPE_OPEN, html, ENVELOPE_CLOSE);
    if payload.len() > MAX_QUESTION_BYTES {
        return Err(PayloadError::TooLarge {
            size: payload.len(),
            limit: MAX_QUESTION_BYTES,
        });
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"<html><body>
<h1 id="title-text">x</h1>
<div id="requirements"><h2>Requirements</h2></div>
<div id="summary"><h2>Summary</h2></div>
<div id="instructions"><h2>Instructions</h2></div>
<script>
    const expName = 'old';
    const taskURL = 'old';
    const databaseURL = 'old';
</script>
</body></html>"#;

    fn page<'a>(description: &'a DescriptionSections) -> TaskPage<'a> {
        TaskPage {
            experiment: "reach",
            task_url: "https://reach.web.app",
            database_url: "https://db.example.com",
            title: "Reach & grasp",
            description,
            stamp: "2024-01-01T12:00:00Z",
        }
    }

    #[test]
    fn test_render_substitutes_variables() {
        let desc = DescriptionSections::default();
        let html = render(TEMPLATE, &page(&desc)).unwrap();
        assert!(html.contains("        const expName = 'reach'; // 2024-01-01T12:00:00Z"));
        assert!(html.contains("const taskURL = 'https://reach.web.app';"));
        assert!(html.contains("const databaseURL = 'https://db.example.com';"));
        assert!(!html.contains("'old'"));
        assert!(html.contains("<h1 id=\"title-text\">Reach &amp; grasp</h1>"));
    }

    #[test]
    fn test_render_missing_marker() {
        let desc = DescriptionSections::default();
        let template = TEMPLATE.replace("const taskURL = 'old';", "");
        match render(&template, &page(&desc)) {
            Err(PayloadError::MissingMarker(name)) => assert_eq!(name, "taskURL"),
            other => panic!("expected missing marker, got {:?}", other),
        }

        let template = TEMPLATE.replace("id=\"summary\"", "id=\"other\"");
        assert!(matches!(
            render(&template, &page(&desc)),
            Err(PayloadError::MissingMarker(_))
        ));
    }

    #[test]
    fn test_empty_requirements_section_is_removed() {
        let desc = DescriptionSections {
            summary_para: vec!["Short task.".to_string()],
            ..DescriptionSections::default()
        };
        let html = render(TEMPLATE, &page(&desc)).unwrap();
        assert!(!html.contains("id=\"requirements\""));
        assert!(!html.contains("id=\"instructions\""));
        assert!(html.contains("<h2>Summary</h2><p>Short task.</p></div>"));
    }

    #[test]
    fn test_requirements_list_precedes_paragraphs() {
        let desc = DescriptionSections {
            requirements_list: vec!["Desktop".to_string()],
            requirements_para: vec!["Allow 20 minutes.".to_string()],
            ..DescriptionSections::default()
        };
        let html = render(TEMPLATE, &page(&desc)).unwrap();
        assert!(html.contains(
            "<h2>Requirements</h2><ul style=\"padding-left: 1em\"><li>Desktop</li></ul><p>Allow 20 minutes.</p></div>"
        ));
    }

    #[test]
    fn test_requirements_paragraph_alone_keeps_section() {
        let desc = DescriptionSections {
            requirements_para: vec!["Headphones".to_string()],
            ..DescriptionSections::default()
        };
        let html = render(TEMPLATE, &page(&desc)).unwrap();
        assert!(html.contains("id=\"requirements\""));
        assert!(!html.contains("<ul"));
    }

    #[test]
    fn test_instructions_use_ordered_list() {
        let desc = DescriptionSections {
            instructions_list: vec!["One".to_string(), "Two".to_string()],
            ..DescriptionSections::default()
        };
        let html = render(TEMPLATE, &page(&desc)).unwrap();
        assert!(html.contains("<ol style=\"padding-left: 1em\"><li>One</li><li>Two</li></ol>"));
    }

    #[test]
    fn test_js_values_are_escaped() {
        let desc = DescriptionSections::default();
        let mut p = page(&desc);
        p.experiment = "it's";
        let html = render(TEMPLATE, &p).unwrap();
        assert!(html.contains(r"const expName = 'it\'s';"));
    }

    #[test]
    fn test_wrap_envelope() {
        let wrapped = wrap("<p>hi</p>").unwrap();
        assert!(wrapped.starts_with("<HTMLQuestion xmlns="));
        assert!(wrapped.contains("<HTMLContent><![CDATA[<p>hi</p>]]>"));
        assert!(wrapped.ends_with("<FrameHeight>0</FrameHeight> </HTMLQuestion>"));
    }

    #[test]
    fn test_wrap_rejects_cdata_terminator_and_oversize() {
        assert!(matches!(wrap("a]]>b"), Err(PayloadError::InvalidContent(_))));
        let big = "x".repeat(MAX_QUESTION_BYTES);
        assert!(matches!(wrap(&big), Err(PayloadError::TooLarge { .. })));
    }

    #[tokio::test]
    async fn test_build_with_bundled_layout() {
        let desc = DescriptionSections {
            summary_para: vec!["Reach to targets.".to_string()],
            ..DescriptionSections::default()
        };
        let payload = QuestionPayloadBuilder::with_defaults()
            .build(&page(&desc))
            .await
            .unwrap();
        assert!(payload.starts_with("<HTMLQuestion"));
        assert!(payload.contains("const expName = 'reach';"));
        assert!(payload.contains("<p>Reach to targets.</p>"));
        assert!(!payload.contains("<!--"));
        assert!(!payload.contains("id=\"requirements\""));
    }

    #[tokio::test]
    async fn test_build_compensation_skips_substitution() {
        let payload = QuestionPayloadBuilder::with_defaults()
            .build_compensation()
            .await
            .unwrap();
        assert!(payload.contains("<h1>Compensation</h1>"));
        assert!(!payload.contains("expName"));
    }
}
