//! Local analysis command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use console::style;
use tokio::sync::mpsc;

use crate::config::Settings;
use crate::models::{AnalysisRequest, DocumentPayload, ImagePayload, OwnerId};
use crate::services::{AnalysisService, RelayOutcome, EVENT_BUFFER};
use crate::utils::{is_image_mime, DOCX_MIME, PDF_MIME};

/// Content arguments as given on the command line.
pub struct AnalyzeInput {
    pub text: Option<String>,
    pub url: Option<String>,
    pub file: Option<PathBuf>,
    pub mime: Option<String>,
}

/// Run the full pipeline for one input and print every event as a JSON line.
pub async fn cmd_analyze(
    settings: &Settings,
    input: AnalyzeInput,
    owner: Option<&str>,
) -> anyhow::Result<()> {
    let request = build_request(input).await?;
    let owner = owner.and_then(OwnerId::new);
    let service = Arc::new(AnalysisService::from_settings(settings)?);

    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("{}", serde_json::to_string(&event)?);
        }
        Ok::<_, serde_json::Error>(())
    });

    // Awaited in place so the history write finishes before we exit.
    let outcome = service.process(request, owner, tx).await;
    printer.await??;

    match outcome {
        RelayOutcome::Completed(result) => {
            eprintln!(
                "{} {} action items, {} next steps",
                style("✓").green(),
                result.action_items.len(),
                result.next_steps.len()
            );
            Ok(())
        }
        RelayOutcome::Failed(e) => {
            eprintln!("{} {}", style("✗").red(), e);
            Err(e.into())
        }
        RelayOutcome::Disconnected => anyhow::bail!("output closed before the analysis finished"),
    }
}

async fn build_request(input: AnalyzeInput) -> anyhow::Result<AnalysisRequest> {
    let mut request = AnalysisRequest {
        text: input.text,
        url: input.url,
        ..Default::default()
    };

    if let Some(path) = input.file {
        let mime = match input.mime {
            Some(mime) => mime,
            None => guess_mime(&path).ok_or_else(|| {
                anyhow::anyhow!(
                    "Cannot tell the type of {}; pass --mime",
                    path.display()
                )
            })?,
        };
        let bytes = tokio::fs::read(&path).await?;
        let encoded = STANDARD.encode(&bytes);

        if is_image_mime(&mime) {
            request.image = Some(ImagePayload::Inline {
                mime_type: mime,
                base64: encoded,
            });
        } else {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            request.document = Some(DocumentPayload {
                name,
                mime_type: mime,
                base64: encoded,
            });
        }
    }

    Ok(request)
}

fn guess_mime(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => PDF_MIME,
        "docx" => DOCX_MIME,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(mime.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime(Path::new("a/report.PDF")).as_deref(), Some(PDF_MIME));
        assert_eq!(guess_mime(Path::new("notes.docx")).as_deref(), Some(DOCX_MIME));
        assert_eq!(guess_mime(Path::new("photo.jpeg")).as_deref(), Some("image/jpeg"));
        assert_eq!(guess_mime(Path::new("archive.tar")), None);
        assert_eq!(guess_mime(Path::new("README")), None);
    }

    #[tokio::test]
    async fn test_file_becomes_document_or_image() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("memo.pdf");
        std::fs::write(&doc, b"%PDF-1.4").unwrap();

        let request = build_request(AnalyzeInput {
            text: None,
            url: None,
            file: Some(doc),
            mime: None,
        })
        .await
        .unwrap();
        let document = request.document.unwrap();
        assert_eq!(document.name, "memo.pdf");
        assert_eq!(document.mime_type, PDF_MIME);
        assert_eq!(STANDARD.decode(document.base64).unwrap(), b"%PDF-1.4");

        let img = dir.path().join("shot.bin");
        std::fs::write(&img, [0u8, 1, 2]).unwrap();
        let request = build_request(AnalyzeInput {
            text: Some("what is this?".into()),
            url: None,
            file: Some(img),
            mime: Some("image/png".into()),
        })
        .await
        .unwrap();
        assert!(matches!(request.image, Some(ImagePayload::Inline { .. })));
        assert_eq!(request.text.as_deref(), Some("what is this?"));
    }

    #[tokio::test]
    async fn test_unknown_extension_needs_mime() {
        let err = build_request(AnalyzeInput {
            text: None,
            url: None,
            file: Some(PathBuf::from("data.xyz")),
            mime: None,
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("--mime"));
    }
}
