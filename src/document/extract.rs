use std::path::Path;

use lopdf::Document as PdfDocument;
use tracing::debug;

use crate::types::AppResult;

/// Read a PDF file and return the text of every page, in page order.
///
/// Parse failures are returned as `AppError::Pdf` without further
/// interpretation.
pub fn extract_pdf_text(path: &Path) -> AppResult<String> {
    let pdf = PdfDocument::load(path)?;
    let pages = pdf.get_pages();

    let mut text = String::new();
    // get_pages is keyed by 1-based page number, so iteration is in order
    for page_number in pages.keys() {
        text.push_str(&pdf.extract_text(&[*page_number])?);
    }

    debug!(
        path = %path.display(),
        pages = pages.len(),
        chars = text.len(),
        "Extracted PDF text"
    );
    Ok(text)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::AppError;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use tempfile::TempDir;

    /// Write a minimal PDF with one line of text per page.
    pub(crate) fn write_test_pdf(path: &Path, pages: &[&str]) {
        let mut doc = PdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn test_extracts_pages_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.pdf");
        write_test_pdf(&path, &["Revenue 2023", "Revenue 2024"]);

        let text = extract_pdf_text(&path).unwrap();

        let first = text.find("Revenue 2023").expect("first page text");
        let second = text.find("Revenue 2024").expect("second page text");
        assert!(first < second);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        assert!(matches!(extract_pdf_text(&path), Err(AppError::Pdf(_))));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(extract_pdf_text(&temp_dir.path().join("nope.pdf")).is_err());
    }
}
