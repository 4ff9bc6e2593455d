//! Inbound request envelope and its resolution into a single content source.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::AnalysisError;
use crate::utils::{decode_base64_payload, is_image_mime, split_data_url};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;
const MAX_OUTPUT_TOKENS_RANGE: std::ops::RangeInclusive<u32> = 1..=8192;

/// Request body for `POST /generate-content`.
///
/// Exactly one content field is expected; see [`AnalysisRequest::resolve`]
/// for how extra fields are handled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image: Option<ImagePayload>,
    #[serde(default)]
    pub document: Option<DocumentPayload>,
    /// Number or numeric string.
    #[serde(default)]
    pub temperature: Option<Value>,
    /// Number or numeric string.
    #[serde(default)]
    pub max_output_tokens: Option<Value>,
}

/// An image, either as an explicit object or as a browser data URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImagePayload {
    Inline {
        #[serde(rename = "mimeType")]
        mime_type: String,
        base64: String,
    },
    DataUrl(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPayload {
    #[serde(default)]
    pub name: String,
    pub mime_type: String,
    pub base64: String,
}

/// The single content source a request resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentSource {
    Text(String),
    Url(String),
    Image {
        mime_type: String,
        data: Vec<u8>,
        caption: Option<String>,
    },
    /// Still encoded; the document parser decodes after checking the type.
    Document {
        name: String,
        mime_type: String,
        base64: String,
    },
}

impl ContentSource {
    /// Short description recorded in history.
    pub fn descriptor(&self) -> String {
        match self {
            ContentSource::Text(text) => text.clone(),
            ContentSource::Url(url) => url.clone(),
            ContentSource::Image { .. } => "Image Input".to_string(),
            ContentSource::Document { name, .. } => format!("Document: {}", name),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ContentSource::Text(_) => "text",
            ContentSource::Url(_) => "url",
            ContentSource::Image { .. } => "image",
            ContentSource::Document { .. } => "document",
        }
    }
}

/// Sampling parameters passed to the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

impl GenerationParams {
    /// Build from loosely typed request values, falling back to defaults
    /// for anything absent, unparseable or out of range.
    pub fn from_raw(temperature: Option<&Value>, max_output_tokens: Option<&Value>) -> Self {
        let temperature = temperature
            .and_then(as_f64)
            .map(|t| t as f32)
            .filter(|t| t.is_finite() && TEMPERATURE_RANGE.contains(t))
            .unwrap_or(DEFAULT_TEMPERATURE);

        let max_output_tokens = max_output_tokens
            .and_then(as_f64)
            .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64)
            .map(|n| n as u32)
            .filter(|n| MAX_OUTPUT_TOKENS_RANGE.contains(n))
            .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS);

        Self {
            temperature,
            max_output_tokens,
        }
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A validated request: one content source plus generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisInput {
    pub source: ContentSource,
    pub params: GenerationParams,
}

impl AnalysisInput {
    pub fn new(source: ContentSource) -> Self {
        Self {
            source,
            params: GenerationParams::default(),
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

impl AnalysisRequest {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Resolve the envelope into exactly one content source.
    ///
    /// Blank strings count as absent. When several sources are present the
    /// most specific one wins: document, then image, then url, then text.
    /// A text alongside an image becomes the image's caption.
    pub fn resolve(self) -> Result<AnalysisInput, AnalysisError> {
        let params =
            GenerationParams::from_raw(self.temperature.as_ref(), self.max_output_tokens.as_ref());
        let text = non_blank(self.text);
        let url = non_blank(self.url);

        let source = if let Some(doc) = self.document {
            if text.is_some() || url.is_some() || self.image.is_some() {
                debug!("Document input takes precedence; ignoring other fields");
            }
            resolve_document(doc)?
        } else if let Some(image) = self.image {
            if url.is_some() {
                debug!("Image input takes precedence; ignoring url");
            }
            resolve_image(image, text)?
        } else if let Some(url) = url {
            if text.is_some() {
                debug!("URL input takes precedence; ignoring text");
            }
            ContentSource::Url(validate_url(&url)?)
        } else if let Some(text) = text {
            ContentSource::Text(text)
        } else {
            return Err(AnalysisError::NoInputProvided);
        };

        Ok(AnalysisInput { source, params })
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

fn resolve_document(doc: DocumentPayload) -> Result<ContentSource, AnalysisError> {
    if doc.base64.trim().is_empty() {
        return Err(AnalysisError::InvalidPayload(
            "document has no content".to_string(),
        ));
    }
    let name = match doc.name.trim() {
        "" => "document".to_string(),
        name => name.to_string(),
    };
    Ok(ContentSource::Document {
        name,
        mime_type: doc.mime_type.trim().to_string(),
        base64: doc.base64,
    })
}

fn resolve_image(
    image: ImagePayload,
    caption: Option<String>,
) -> Result<ContentSource, AnalysisError> {
    let (mime_type, payload) = match &image {
        ImagePayload::Inline { mime_type, base64 } => (mime_type.trim(), base64.as_str()),
        ImagePayload::DataUrl(url) => split_data_url(url).ok_or_else(|| {
            AnalysisError::InvalidPayload("image is not a valid data URL".to_string())
        })?,
    };

    if !is_image_mime(mime_type) {
        return Err(AnalysisError::InvalidPayload(format!(
            "expected an image type, got {}",
            mime_type
        )));
    }

    let data = decode_base64_payload(payload)
        .map_err(|e| AnalysisError::InvalidPayload(format!("image data: {}", e)))?;
    if data.is_empty() {
        return Err(AnalysisError::InvalidPayload("image is empty".to_string()));
    }

    Ok(ContentSource::Image {
        mime_type: mime_type.to_lowercase(),
        data,
        caption,
    })
}

fn validate_url(raw: &str) -> Result<String, AnalysisError> {
    let trimmed = raw.trim();
    match url::Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {
            Ok(trimmed.to_string())
        }
        _ => Err(AnalysisError::InvalidUrl(trimmed.to_string())),
    }
}
