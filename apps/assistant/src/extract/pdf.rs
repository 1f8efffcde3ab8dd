use std::panic::{self, AssertUnwindSafe};

use super::ExtractError;

/// Extracts the text of every page, in page order, one page after another
/// separated by a newline.
///
/// `pdf-extract` panics on some malformed inputs; the panic is contained and
/// reported like any other decoding failure.
pub(super) fn extract_text(content: &[u8]) -> Result<String, ExtractError> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(content)
    }))
    .map_err(|_| ExtractError::PdfPanicked)?;

    let pages = result.map_err(|e| ExtractError::Pdf(e.to_string()))?;

    Ok(pages
        .iter()
        .map(|page| page.trim_matches(|c: char| c == '\x0c' || c == '\n'))
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal PDF with one Helvetica text run per page and a correct xref table.
    fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let page_ids: Vec<usize> = (0..pages.len()).map(|i| 4 + i * 2).collect();
        let kids = page_ids
            .iter()
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");

        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];
        for (page_id, text) in page_ids.iter().zip(pages) {
            let stream = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                page_id + 1
            ));
            objects.push(format!(
                "<< /Length {} >>\nstream\n{stream}\nendstream",
                stream.len()
            ));
        }

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
        }

        let xref_start = pdf.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_start}\n%%EOF\n",
            objects.len() + 1
        ));
        pdf.extend_from_slice(xref.as_bytes());
        pdf
    }

    #[test]
    fn test_extracts_single_page_text() {
        let text = extract_text(&pdf_with_pages(&["Experienced"])).unwrap();
        assert!(text.contains("Experienced"), "got {text:?}");
    }

    #[test]
    fn test_pages_are_in_order_and_separated() {
        let text = extract_text(&pdf_with_pages(&["Summary", "Experience"])).unwrap();

        let first = text.find("Summary").unwrap();
        let second = text.find("Experience").unwrap();
        assert!(first < second, "got {text:?}");
        assert!(text[first..second].contains('\n'), "got {text:?}");
        assert!(!text.contains('\x0c'));
    }

    #[test]
    fn test_garbage_is_an_error_not_a_panic() {
        let result = extract_text(b"%PDF-1.4 truncated");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(extract_text(&[]).is_err());
    }
}
