use pulldown_cmark::{html, Event, Options, Parser};
use std::fmt;

/// Turns the agent's markdown report into HTML for the page
pub trait ReportRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> Result<String, fmt::Error>;
}

/// CommonMark renderer with tables, strikethrough and newline-to-break
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl ReportRenderer for MarkdownRenderer {
    fn render(&self, markdown: &str) -> Result<String, fmt::Error> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        // Single newlines inside a paragraph are line breaks in agent reports
        let parser = Parser::new_ext(markdown, options).map(|event| match event {
            Event::SoftBreak => Event::HardBreak,
            other => other,
        });

        let mut html_output = String::new();
        html::write_html_fmt(&mut html_output, parser)?;
        Ok(html_output)
    }
}

/// Render `markdown`, falling back to the raw text in a `<pre>` block
pub fn render_or_preformatted(renderer: &dyn ReportRenderer, markdown: &str) -> String {
    match renderer.render(markdown) {
        Ok(rendered) => rendered,
        Err(e) => {
            tracing::warn!(error = %e, "Markdown conversion failed, using preformatted text");
            format!("<pre>{}</pre>", markdown)
        }
    }
}
