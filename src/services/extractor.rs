//! Turns a resolved content source into model-ready content.

use tracing::info;

use crate::documents::DocumentParser;
use crate::error::AnalysisError;
use crate::models::ContentSource;
use crate::prompt::ExtractedContent;
use crate::scrapers::HybridScraper;

/// Branches on the content source: text passes through, URLs are scraped,
/// documents are parsed and images are handed on as bytes.
#[derive(Clone)]
pub struct Extractor {
    scraper: HybridScraper,
    documents: DocumentParser,
}

impl Extractor {
    pub fn new(scraper: HybridScraper, documents: DocumentParser) -> Self {
        Self { scraper, documents }
    }

    pub fn scraper(&self) -> &HybridScraper {
        &self.scraper
    }

    pub async fn extract(&self, source: ContentSource) -> Result<ExtractedContent, AnalysisError> {
        match source {
            ContentSource::Text(text) => Ok(ExtractedContent::Text(text)),
            ContentSource::Url(url) => {
                let text = self.scraper.scrape(&url).await?;
                info!("Scraped {} chars from {}", text.chars().count(), url);
                Ok(ExtractedContent::Text(text))
            }
            ContentSource::Image {
                mime_type,
                data,
                caption,
            } => {
                info!("Passing through {} image ({} bytes)", mime_type, data.len());
                Ok(ExtractedContent::Image {
                    mime_type,
                    data,
                    caption,
                })
            }
            ContentSource::Document {
                name,
                mime_type,
                base64,
            } => {
                let text = self.documents.parse(&mime_type, &base64).await?;
                info!(
                    "Extracted {} chars from document {:?} ({})",
                    text.chars().count(),
                    name,
                    mime_type
                );
                Ok(ExtractedContent::Text(text))
            }
        }
    }
}
