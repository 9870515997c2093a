use crate::model::VisionModel;
use askama::Template;
use pulldown_cmark::{Event, Options, Parser, html};

/// Form value selecting the local OCR engine instead of a hosted model.
pub const LOCAL_ENGINE: &str = "local";

const LOCAL_ENGINE_LABEL: &str = "Local OCR (tesseract)";

/// Banner shown above the upload form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Warning(String),
    Error(String),
}

impl Notice {
    pub fn class(&self) -> &'static str {
        match self {
            Notice::Warning(_) => "warning",
            Notice::Error(_) => "error",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Notice::Warning(text) | Notice::Error(text) => text,
        }
    }
}

/// One entry of the engine dropdown.
pub struct EngineOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn engine_options(selected: &str) -> Vec<EngineOption> {
    VisionModel::ALL
        .iter()
        .map(|model| (model.as_str(), model.as_str()))
        .chain(std::iter::once((LOCAL_ENGINE, LOCAL_ENGINE_LABEL)))
        .map(|(value, label)| EngineOption {
            value,
            label,
            selected: value == selected,
        })
        .collect()
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub notice: Option<&'a Notice>,
    pub options: Vec<EngineOption>,
}

#[derive(Template)]
#[template(path = "result.html")]
pub struct ResultTemplate<'a> {
    pub preview_url: &'a str,
    /// Already rendered from markdown, inserted unescaped.
    pub markdown_html: String,
    /// Replaces the markdown column when the transcription failed.
    pub notice: Option<&'a Notice>,
    pub options: Vec<EngineOption>,
}

/// Renders model output to HTML. Raw HTML in the output is shown as text.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

/// The upload page, optionally with a banner.
pub fn render_index(notice: Option<&Notice>, selected: &str) -> askama::Result<String> {
    IndexTemplate {
        notice,
        options: engine_options(selected),
    }
    .render()
}

/// Two columns: the uploaded image and the extracted markdown.
pub fn render_result(preview_url: &str, markdown: &str, selected: &str) -> askama::Result<String> {
    ResultTemplate {
        preview_url,
        markdown_html: markdown_to_html(markdown),
        notice: None,
        options: engine_options(selected),
    }
    .render()
}

/// Two columns where the right one carries the error banner.
pub fn render_failure(preview_url: &str, notice: &Notice, selected: &str) -> askama::Result<String> {
    ResultTemplate {
        preview_url,
        markdown_html: String::new(),
        notice: Some(notice),
        options: engine_options(selected),
    }
    .render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_and_tables() {
        let html = markdown_to_html("# Invoice\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<h1>Invoice</h1>"));
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn raw_html_is_not_injected() {
        let html = markdown_to_html("<script>alert(1)</script>\n");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn index_lists_every_engine() {
        let page = render_index(None, LOCAL_ENGINE).unwrap();
        for model in VisionModel::ALL {
            assert!(page.contains(&format!(r#"value="{}""#, model.as_str())));
        }
        assert!(page.contains(r#"<option value="local" selected>"#));
        assert!(!page.contains(r#"class="banner"#));
    }

    #[test]
    fn warning_banner() {
        let notice = Notice::Warning("Please enter your API key to proceed.".into());
        let page = render_index(Some(&notice), "free").unwrap();
        assert!(page.contains(
            r#"<div class="banner warning">Please enter your API key to proceed.</div>"#
        ));
    }

    #[test]
    fn banner_text_is_escaped() {
        let notice = Notice::Error("bad <b>input</b>".into());
        let page = render_index(Some(&notice), "free").unwrap();
        assert!(page.contains("bad &lt;b&gt;input"));
        assert!(!page.contains("<b>input"));
    }

    #[test]
    fn result_has_two_columns() {
        let page = render_result("data:image/png;base64,AA==", "**bold**", "free").unwrap();
        assert!(page.contains("png;base64,AA=="));
        assert!(page.contains(r#"alt="Uploaded Image""#));
        assert!(page.contains("Extracted Markdown:"));
        assert!(page.contains("<strong>bold</strong>"));
    }

    #[test]
    fn failure_shows_error_banner() {
        let notice = Notice::Error("An error occurred: boom".into());
        let page = render_failure("data:image/png;base64,AA==", &notice, "free").unwrap();
        assert!(page.contains(r#"class="banner error""#));
        assert!(page.contains("boom"));
        assert!(!page.contains("Extracted Markdown:"));
    }
}
