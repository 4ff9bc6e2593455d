//! Builds the ordered model input for one request.

use crate::models::{ContentPart, NO_ACTION_ITEMS, NO_NEXT_STEPS};

/// Used as the image's accompanying text when the user gave none.
pub const DEFAULT_IMAGE_INSTRUCTION: &str =
    "Describe this image and extract any actionable information it contains.";

/// Default instruction prepended to every request.
pub fn default_instruction() -> String {
    format!(
        "You are an assistant that analyzes content. Read the provided content and respond \
         with a single valid JSON object and nothing else: no Markdown, no code fences, no \
         commentary. The object must have exactly these fields:\n\
         1. \"summary\": a concise summary of three to five sentences.\n\
         2. \"actionItems\": an array of clear, actionable tasks. If there are none, \
         return [\"{NO_ACTION_ITEMS}\"].\n\
         3. \"nextSteps\": an array of suggested next steps. If there are none, \
         return [\"{NO_NEXT_STEPS}\"]."
    )
}

/// Content produced by the extractor, ready to be wrapped in a prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedContent {
    /// Text from raw input, a scraped page or a parsed document.
    Text(String),
    /// Image bytes passed through untouched.
    Image {
        mime_type: String,
        data: Vec<u8>,
        caption: Option<String>,
    },
}

/// Wraps extracted content with the fixed instruction.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    instruction: String,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(default_instruction())
    }
}

impl PromptAssembler {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
        }
    }

    /// Use `template` when set and non-blank, else the default instruction.
    pub fn from_template(template: Option<&str>) -> Self {
        match template.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => Self::new(t),
            None => Self::default(),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Instruction first, then the content parts.
    pub fn assemble(&self, content: ExtractedContent) -> Vec<ContentPart> {
        let mut parts = vec![ContentPart::text(self.instruction.clone())];

        match content {
            ExtractedContent::Text(text) => parts.push(ContentPart::Text(text)),
            ExtractedContent::Image {
                mime_type,
                data,
                caption,
            } => {
                parts.push(ContentPart::Binary { mime_type, data });
                let caption = caption
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_IMAGE_INSTRUCTION.to_string());
                parts.push(ContentPart::Text(caption));
            }
        }

        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_instruction_names_fields_and_sentinels() {
        let instruction = default_instruction();
        for needle in [
            "\"summary\"",
            "\"actionItems\"",
            "\"nextSteps\"",
            "None identified.",
            "No further suggestions.",
            "JSON",
        ] {
            assert!(instruction.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn test_text_prompt() {
        let parts = PromptAssembler::default().assemble(ExtractedContent::Text("Buy milk.".into()));
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].as_text(), Some(default_instruction().as_str()));
        assert_eq!(parts[1], ContentPart::text("Buy milk."));
    }

    #[test]
    fn test_image_prompt_with_and_without_caption() {
        let assembler = PromptAssembler::new("INSTR");
        let parts = assembler.assemble(ExtractedContent::Image {
            mime_type: "image/png".into(),
            data: vec![1, 2, 3],
            caption: Some("What does the sign say?".into()),
        });
        assert_eq!(
            parts,
            vec![
                ContentPart::text("INSTR"),
                ContentPart::Binary {
                    mime_type: "image/png".into(),
                    data: vec![1, 2, 3]
                },
                ContentPart::text("What does the sign say?"),
            ]
        );

        let parts = assembler.assemble(ExtractedContent::Image {
            mime_type: "image/png".into(),
            data: vec![1],
            caption: None,
        });
        assert_eq!(parts[2], ContentPart::text(DEFAULT_IMAGE_INSTRUCTION));
    }

    #[test]
    fn test_template_override() {
        assert_eq!(PromptAssembler::from_template(Some("custom")).instruction(), "custom");
        assert_eq!(
            PromptAssembler::from_template(Some("  ")).instruction(),
            default_instruction()
        );
    }
}
