use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ExtractError;

const DOCUMENT_XML: &str = "word/document.xml";

/// Extracts paragraph text from a DOCX archive, one line per `w:p`.
pub(super) fn extract_text(content: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(content))?;

    let mut doc_xml = String::new();
    {
        let mut entry = archive
            .by_name(DOCUMENT_XML)
            .map_err(|_| ExtractError::MissingDocumentXml)?;
        entry.read_to_string(&mut doc_xml)?;
    }

    paragraphs_from_xml(&doc_xml).map(|paragraphs| paragraphs.join("\n"))
}

/// Walks `document.xml` collecting the text of each paragraph.
/// Empty paragraphs are kept so vertical spacing in the resume survives.
fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" if in_paragraph => current.push('\t'),
                b"br" | b"cr" if in_paragraph => current.push('\n'),
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"p" => {
                    if in_paragraph {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                    in_paragraph = false;
                }
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(ref e) if in_text => {
                current.push_str(&e.unescape()?);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}
