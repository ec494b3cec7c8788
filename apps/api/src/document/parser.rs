//! Uploaded document → plain text, and plain text → resume sections.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Sections every parsed document is bucketed into, in reading order.
pub const SECTION_ORDER: [&str; 6] = [
    "contact",
    "summary",
    "experience",
    "education",
    "skills",
    "projects",
];

/// Heading keywords in match priority order. A matching line moves the
/// cursor and is not copied into any section.
const SECTION_HEADINGS: &[(&str, &[&str])] = &[
    ("experience", &["experience", "work history", "employment"]),
    ("education", &["education", "academic"]),
    ("skills", &["skills", "technical skills"]),
    ("projects", &["projects", "portfolio"]),
    ("contact", &["contact", "email", "phone"]),
];

pub const INITIAL_SECTION: &str = "summary";

const DOCX_BODY: &str = "word/document.xml";

static DOCX_TEXT_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|</w:p>|<w:tab/>|<w:br/>")
        .expect("docx run pattern is valid")
});

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unsupported document format '{0}' (only .pdf and .docx are supported)")]
    UnsupportedFormat(String),

    #[error("could not read PDF: {0}")]
    Pdf(String),

    #[error("could not read DOCX: {0}")]
    Docx(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Format from a file name or bare extension, case-insensitive.
    pub fn from_name(name: &str) -> Result<Self, ParseError> {
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or(name)
            .to_lowercase();
        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            _ => Err(ParseError::UnsupportedFormat(extension)),
        }
    }
}

pub fn parse(bytes: &[u8], extension: &str) -> Result<String, ParseError> {
    match DocumentFormat::from_name(extension)? {
        DocumentFormat::Pdf => parse_pdf(bytes),
        DocumentFormat::Docx => parse_docx(bytes),
    }
}

fn parse_pdf(bytes: &[u8]) -> Result<String, ParseError> {
    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| ParseError::Pdf(e.to_string()))?;
    Ok(text.trim().to_string())
}

fn parse_docx(bytes: &[u8]) -> Result<String, ParseError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ParseError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|e| ParseError::Docx(format!("{DOCX_BODY}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ParseError::Docx(e.to_string()))?;

    let mut text = String::new();
    for caps in DOCX_TEXT_RUN.captures_iter(&xml) {
        match caps.get(1) {
            Some(run) => text.push_str(&unescape_xml(run.as_str())),
            None => match &caps[0] {
                "<w:tab/>" => text.push('\t'),
                _ => text.push('\n'),
            },
        }
    }
    Ok(text.trim().to_string())
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// The section a line opens, if it reads as a heading.
pub fn heading_section(line: &str) -> Option<&'static str> {
    let lower = line.trim().to_lowercase();
    SECTION_HEADINGS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(section, _)| *section)
}

/// Buckets lines into the six standard sections. Every section is present
/// in the result, possibly empty.
pub fn extract_sections(text: &str) -> BTreeMap<String, String> {
    let mut sections: BTreeMap<String, String> = SECTION_ORDER
        .iter()
        .map(|name| (name.to_string(), String::new()))
        .collect();
    let mut current = INITIAL_SECTION;

    for line in text.lines() {
        match heading_section(line) {
            Some(section) => current = section,
            None => {
                if let Some(body) = sections.get_mut(current) {
                    body.push_str(line);
                    body.push('\n');
                }
            }
        }
    }
    sections
}
