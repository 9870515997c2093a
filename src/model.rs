use crate::error::ScribeError;
use std::str::FromStr;

/// Instructions sent alongside every image.
pub const MARKDOWN_PROMPT: &str = "Convert the provided image into Markdown format. \
Ensure that all content from the page is included, such as headers, footers, subtexts, \
images (with alt text if possible), tables, and any other elements.
Requirements:
- Output Only Markdown: Return solely the Markdown content without any additional explanations or comments.
- No Delimiters: Do not use code fences or delimiters like ```markdown.
- Complete Content: Do not omit any part of the page, including headers, footers, and subtext.
";

/// Hosted vision models that can transcribe a page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VisionModel {
    #[default]
    Llama90B,
    Llama11B,
    Free,
}

impl VisionModel {
    pub const ALL: [VisionModel; 3] = [
        VisionModel::Llama90B,
        VisionModel::Llama11B,
        VisionModel::Free,
    ];

    /// Short name shown to users.
    pub fn as_str(&self) -> &'static str {
        match self {
            VisionModel::Llama90B => "Llama-3.2-90B-Vision",
            VisionModel::Llama11B => "Llama-3.2-11B-Vision",
            VisionModel::Free => "free",
        }
    }

    /// Identifier expected by the chat-completions endpoint.
    pub fn model_id(&self) -> String {
        match self {
            VisionModel::Free => "meta-llama/Llama-Vision-Free".to_string(),
            other => format!("meta-llama/{}-Instruct-Turbo", other.as_str()),
        }
    }
}

impl FromStr for VisionModel {
    type Err = ScribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VisionModel::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| ScribeError::UnknownModel(s.to_string()))
    }
}

impl std::fmt::Display for VisionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
