use std::io::{Cursor, Read};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    Unsupported(String),
    #[error("file is not valid UTF-8 text")]
    NotUtf8,
    #[error("failed to read PDF text: {0}")]
    Pdf(String),
    #[error("failed to read DOCX text: {0}")]
    Docx(String),
}

/// Text extraction for uploaded contracts, dispatched on the original
/// filename's extension.
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    let lower = filename.to_lowercase();
    if lower.ends_with(".pdf") {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
    } else if lower.ends_with(".docx") {
        extract_docx(bytes)
    } else if lower.ends_with(".txt") {
        String::from_utf8(bytes.to_vec()).map_err(|_| ExtractError::NotUtf8)
    } else {
        Err(ExtractError::Unsupported(filename.to_string()))
    }
}

// A .docx is a zip; the paragraph text lives in word/document.xml.
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    Ok(document_xml_text(&xml))
}

/// Pulls readable text out of WordprocessingML: markup is dropped,
/// paragraph and line-break ends become newlines, tabs stay tabs.
fn document_xml_text(xml: &str) -> String {
    let mut out = String::new();
    let mut remaining = xml;
    while let Some(open) = remaining.find('<') {
        push_decoded(&mut out, &remaining[..open]);
        let Some(close) = remaining[open..].find('>') else {
            break;
        };
        let tag = &remaining[open + 1..open + close];
        if tag == "/w:p" || tag.starts_with("w:br") {
            out.push('\n');
        } else if tag.starts_with("w:tab") {
            out.push('\t');
        }
        remaining = &remaining[open + close + 1..];
    }
    push_decoded(&mut out, remaining);
    out
}

fn push_decoded(out: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    let decoded = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    out.push_str(&decoded);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn txt_passes_through() {
        let text = extract_text("contract.txt", "Payment due in 30 days.".as_bytes()).unwrap();
        assert_eq!(text, "Payment due in 30 days.");
    }

    #[test]
    fn txt_rejects_non_utf8() {
        let err = extract_text("contract.txt", &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, ExtractError::NotUtf8));
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let err = extract_text("contract.rtf", b"{\\rtf1}").unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported(_)));
        assert_eq!(err.to_string(), "Unsupported file type: contract.rtf");
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let text = extract_text("CONTRACT.TXT", b"ok").unwrap();
        assert_eq!(text, "ok");
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let document = concat!(
            r#"<?xml version="1.0"?><w:document><w:body>"#,
            r#"<w:p><w:r><w:t>Term &amp; Conditions</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t>Payment due</w:t><w:tab/><w:t>net 30</w:t></w:r></w:p>"#,
            r#"</w:body></w:document>"#
        );

        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
            writer
                .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(document.as_bytes()).unwrap();
            writer.finish().unwrap();
        }

        let text = extract_text("contract.docx", &buf).unwrap();
        assert_eq!(text, "Term & Conditions\nPayment due\tnet 30\n");
    }

    #[test]
    fn docx_without_document_xml_is_an_error() {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
            writer
                .start_file("unrelated.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"nope").unwrap();
            writer.finish().unwrap();
        }

        let err = extract_text("contract.docx", &buf).unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
    }
}
