//! Stored file naming: `{notice}_{hash8}{ext}`

use sha2::{Digest, Sha256};
use std::fmt::Write;

const DEFAULT_EXTENSION: &str = ".pdf";
const MAX_NOTICE_LEN: usize = 100;
const MAX_EXTENSION_LEN: usize = 10;
/// Bytes scanned for OOXML part names inside a zip
const ZIP_SNIFF_WINDOW: usize = 2000;

/// Build the stored filename for a downloaded document
pub fn stored_filename(notice_id: &str, url: &str, extension: &str) -> String {
    format!("{}_{}{}", sanitize_notice_id(notice_id), short_hash(url), extension)
}

/// First 8 hex chars of the URL's sha256
pub fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

fn sanitize_notice_id(notice_id: &str) -> String {
    let cleaned: String = notice_id
        .chars()
        .take(MAX_NOTICE_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_matches(&['_', '.'][..]);
    if cleaned.is_empty() {
        "contract".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Pick a file extension for a downloaded body.
///
/// Order: Content-Disposition filename, magic bytes, Content-Type, URL path,
/// then `.pdf`.
pub fn detect_extension(
    body: &[u8],
    content_type: Option<&str>,
    content_disposition: Option<&str>,
    url: &str,
) -> String {
    if let Some(ext) = content_disposition.and_then(disposition_extension) {
        return ext;
    }

    let essence = content_type
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .map(|m| m.essence_str().to_ascii_lowercase())
        .unwrap_or_default();

    if let Some(ext) = sniff_extension(body, &essence) {
        return ext.to_string();
    }

    if let Some(ext) = content_type_extension(&essence) {
        return ext.to_string();
    }

    if let Some(ext) = url_extension(url) {
        return ext;
    }

    DEFAULT_EXTENSION.to_string()
}

fn normalize_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

fn disposition_extension(header: &str) -> Option<String> {
    let (_, rest) = header.split_once("filename=")?;
    let filename = rest
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(&['"', '\''][..]);
    normalize_extension(filename)
}

fn sniff_extension(body: &[u8], essence: &str) -> Option<&'static str> {
    if body.starts_with(b"%PDF") {
        return Some(".pdf");
    }

    if body.starts_with(b"PK\x03\x04") {
        let window = &body[..body.len().min(ZIP_SNIFF_WINDOW)];
        let ext = if contains(window, b"word/") {
            ".docx"
        } else if contains(window, b"xl/") {
            ".xlsx"
        } else if contains(window, b"ppt/") {
            ".pptx"
        } else {
            ".zip"
        };
        return Some(ext);
    }

    if body.starts_with(b"\xd0\xcf\x11\xe0") {
        // Legacy OLE container; only the content type tells Word from Excel
        let ext = if essence.contains("excel") || essence.contains("sheet") {
            ".xls"
        } else {
            ".doc"
        };
        return Some(ext);
    }

    None
}

fn content_type_extension(essence: &str) -> Option<&'static str> {
    if essence.is_empty() {
        return None;
    }

    if essence.contains("pdf") {
        Some(".pdf")
    } else if essence.contains("word") {
        Some(".docx")
    } else if essence.contains("excel") || essence.contains("spreadsheetml") {
        Some(".xlsx")
    } else if essence.contains("powerpoint") || essence.contains("presentationml") {
        Some(".pptx")
    } else if essence == "text/plain" {
        Some(".txt")
    } else {
        None
    }
}

fn url_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let last = path.rsplit('/').next().unwrap_or_default();
    normalize_extension(last)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hash_is_stable() {
        let a = short_hash("https://sam.gov/a.pdf");
        assert_eq!(a.len(), 8);
        assert_eq!(a, short_hash("https://sam.gov/a.pdf"));
        assert_ne!(a, short_hash("https://sam.gov/b.pdf"));
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_stored_filename_sanitizes_notice() {
        let name = stored_filename("W912/DY 24", "https://sam.gov/a.pdf", ".pdf");
        let hash = short_hash("https://sam.gov/a.pdf");
        assert_eq!(name, format!("W912_DY_24_{}.pdf", hash));

        let name = stored_filename("///", "https://sam.gov/a.pdf", ".pdf");
        assert!(name.starts_with("contract_"));
    }

    #[test]
    fn test_disposition_wins() {
        let ext = detect_extension(
            b"%PDF-1.4",
            Some("application/pdf"),
            Some("attachment; filename=\"Scope.DOCX\""),
            "https://sam.gov/x",
        );
        assert_eq!(ext, ".docx");
    }

    #[test]
    fn test_magic_bytes() {
        assert_eq!(detect_extension(b"%PDF-1.7", None, None, "https://x/y"), ".pdf");

        let mut docx = b"PK\x03\x04".to_vec();
        docx.extend_from_slice(b"....[Content_Types].xml....word/document.xml");
        assert_eq!(detect_extension(&docx, None, None, "https://x/y"), ".docx");

        let mut xlsx = b"PK\x03\x04".to_vec();
        xlsx.extend_from_slice(b"....xl/workbook.xml");
        assert_eq!(detect_extension(&xlsx, None, None, "https://x/y"), ".xlsx");

        assert_eq!(
            detect_extension(b"PK\x03\x04plainzip", None, None, "https://x/y"),
            ".zip"
        );
    }

    #[test]
    fn test_ole_uses_content_type() {
        let ole = b"\xd0\xcf\x11\xe0\xa1\xb1\x1a\xe1";
        assert_eq!(
            detect_extension(ole, Some("application/vnd.ms-excel"), None, "https://x/y"),
            ".xls"
        );
        assert_eq!(
            detect_extension(ole, Some("application/octet-stream"), None, "https://x/y"),
            ".doc"
        );
    }

    #[test]
    fn test_content_type_then_url_then_default() {
        assert_eq!(
            detect_extension(b"hello", Some("text/plain; charset=utf-8"), None, "https://x/a.bin"),
            ".txt"
        );
        assert_eq!(
            detect_extension(b"hello", Some("application/octet-stream"), None, "https://x/a.RTF?dl=1"),
            ".rtf"
        );
        assert_eq!(
            detect_extension(b"hello", None, None, "https://x/download"),
            ".pdf"
        );
    }
}
