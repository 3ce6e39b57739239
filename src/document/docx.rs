use std::io::{Cursor, Read};

use async_trait::async_trait;
use quick_xml::{Reader, events::Event};

use crate::{document::parser::DocxTextExtractor, error::GenerationError};

const BODY_ENTRY: &str = "word/document.xml";

/// Raw text of a `.docx` package: the text runs of `word/document.xml`, one
/// blank line between paragraphs. Formatting is discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipDocxExtractor;

#[async_trait]
impl DocxTextExtractor for ZipDocxExtractor {
    async fn raw_text(&self, bytes: &[u8]) -> Result<String, GenerationError> {
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || read_body(&bytes))
            .await
            .map_err(|e| docx_error(e.to_string()))?
    }
}

fn read_body(bytes: &[u8]) -> Result<String, GenerationError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| docx_error(e.to_string()))?;
    let mut entry = archive
        .by_name(BODY_ENTRY)
        .map_err(|_| docx_error(format!("missing {BODY_ENTRY}")))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| docx_error(e.to_string()))?;
    body_text(&xml)
}

fn docx_error(reason: String) -> GenerationError {
    GenerationError::DocumentParse {
        name: "docx".into(),
        reason,
    }
}

fn body_text(xml: &str) -> Result<String, GenerationError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut run_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(|e| docx_error(e.to_string()))? {
            Event::Start(tag) => match tag.name().as_ref() {
                b"w:r" => run_depth += 1,
                b"w:t" => in_text = run_depth > 0,
                _ => {}
            },
            Event::End(tag) => match tag.name().as_ref() {
                b"w:r" => run_depth = run_depth.saturating_sub(1),
                b"w:t" => in_text = false,
                b"w:p" => out.push_str("\n\n"),
                _ => {}
            },
            // tab stops in paragraph properties are also `w:tab`
            Event::Empty(tag) if run_depth > 0 => match tag.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Event::Text(text) if in_text => {
                out.push_str(&text.unescape().map_err(|e| docx_error(e.to_string()))?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out.trim_end().to_string())
}
