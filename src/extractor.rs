//! Plain-text extraction from downloaded filing documents.

use lopdf::Document;
use std::path::Path;
use tracing::debug;

use crate::errors::ExtractionError;

/// Extract the full text of a PDF in page order.
///
/// The result is derived deterministically from the file bytes and is cheap
/// enough to recompute on demand, so it is never cached separately.
pub fn extract(path: &Path) -> Result<String, ExtractionError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => {}
        other => return Err(ExtractionError::Unsupported(other.unwrap_or("").to_string())),
    }

    let doc = Document::load(path).map_err(classify_load_error)?;
    if doc.trailer.has(b"Encrypt") {
        return Err(ExtractionError::Encrypted);
    }

    // get_pages is keyed by page number, so iteration follows document order
    let mut pages_text = Vec::new();
    for (page_number, _) in doc.get_pages() {
        match doc.extract_text(&[page_number]) {
            Ok(text) => pages_text.push(text),
            Err(e) => debug!("no text on page {} of {}: {}", page_number, path.display(), e),
        }
    }

    let text = pages_text.join("\n");
    if text.chars().all(char::is_whitespace) {
        // Typical for scanned, image-only documents
        return Err(ExtractionError::Empty);
    }

    Ok(text)
}

fn classify_load_error(error: lopdf::Error) -> ExtractionError {
    let message = error.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("encrypt") || lowered.contains("decrypt") {
        ExtractionError::Encrypted
    } else {
        ExtractionError::Corrupt(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use std::io::Write;
    use tempfile::TempDir;

    fn build_pdf(text: &str) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn write_pdf(path: &Path, text: &str) {
        build_pdf(text).save(path).unwrap();
    }

    #[test]
    fn test_extracts_text_in_page_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.pdf");
        write_pdf(&path, "risk appetite and risk capacity");

        let text = extract(&path).unwrap();
        assert!(text.contains("risk appetite"));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.docx");
        std::fs::write(&path, b"not a pdf").unwrap();

        assert!(matches!(extract(&path), Err(ExtractionError::Unsupported(_))));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"%PDF-1.5 garbage with no structure").unwrap();

        assert!(matches!(extract(&path), Err(ExtractionError::Corrupt(_))));
    }

    #[test]
    fn test_encrypted_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locked.pdf");
        let mut doc = build_pdf("hidden");
        doc.trailer.set(
            "Encrypt",
            dictionary! {
                "Filter" => "Standard",
                "V" => 1,
                "R" => 2,
            },
        );
        doc.save(&path).unwrap();

        assert!(matches!(extract(&path), Err(ExtractionError::Encrypted)));
    }

    #[test]
    fn test_empty_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blank.pdf");
        write_pdf(&path, "   ");

        assert!(matches!(extract(&path), Err(ExtractionError::Empty)));
    }
}
