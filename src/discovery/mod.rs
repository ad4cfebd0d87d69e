//! Resource discovery: contract record -> downloadable document candidates
//!
//! Discovery is a pure derivation. A contract with no usable links yields an
//! empty list rather than an error.

use std::collections::HashSet;

use reqwest::Url;
use serde::Serialize;

use crate::catalog::ContractRecord;

const FALLBACK_FILENAME: &str = "document";

/// A document reference ready to be downloaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentCandidate {
    pub url: String,
    pub filename: String,
    /// Lowercased, with leading dot (`.pdf`); empty when the name has none
    pub extension: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub contract_notice_id: String,
}

/// Enumerate the distinct http(s) document links of a contract.
///
/// Links are trimmed; empty and non-http(s) links are skipped; the first
/// occurrence of a URL wins.
pub fn discover(contract: &ContractRecord) -> Vec<DocumentCandidate> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for link in &contract.resource_links {
        let raw = link.url().trim();
        if raw.is_empty() {
            continue;
        }

        let Some(parsed) = parse_http_url(raw) else {
            tracing::debug!(
                notice_id = %contract.notice_id,
                url = raw,
                "Skipping unusable document link"
            );
            continue;
        };

        if !seen.insert(raw.to_string()) {
            continue;
        }

        let filename = filename_from_url(&parsed);
        let extension = extension_of(&filename);

        candidates.push(DocumentCandidate {
            url: raw.to_string(),
            filename,
            extension,
            description: link.description().map(str::to_string),
            contract_notice_id: contract.notice_id.clone(),
        });
    }

    candidates
}

fn parse_http_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url),
        _ => None,
    }
}

/// Last non-empty path segment, or `document`
fn filename_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

pub(crate) fn extension_of(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!(".{}", ext.to_ascii_lowercase())
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ResourceLink;
    use chrono::Utc;

    fn contract(links: Vec<ResourceLink>) -> ContractRecord {
        ContractRecord {
            notice_id: "N-77".to_string(),
            title: "Hangar lighting".to_string(),
            agency: Some("USAF".to_string()),
            resource_links: links,
            updated_at: Utc::now(),
        }
    }

    fn url(s: &str) -> ResourceLink {
        ResourceLink::Url(s.to_string())
    }

    #[test]
    fn test_no_links_yields_empty() {
        assert!(discover(&contract(vec![])).is_empty());
    }

    #[test]
    fn test_filename_and_extension() {
        let found = discover(&contract(vec![url(
            "https://sam.gov/api/files/Statement_Of_Work.PDF?token=abc#page=2",
        )]));

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].filename, "Statement_Of_Work.PDF");
        assert_eq!(found[0].extension, ".pdf");
        assert_eq!(found[0].contract_notice_id, "N-77");
    }

    #[test]
    fn test_fallback_filename() {
        let found = discover(&contract(vec![url("https://sam.gov/")]));
        assert_eq!(found[0].filename, "document");
        assert_eq!(found[0].extension, "");
    }

    #[test]
    fn test_trailing_slash_uses_last_segment() {
        let found = discover(&contract(vec![url("https://sam.gov/files/abc123/download/")]));
        assert_eq!(found[0].filename, "download");
    }

    #[test]
    fn test_skips_blank_and_non_http() {
        let found = discover(&contract(vec![
            url("   "),
            url("ftp://files.example.com/a.pdf"),
            url("not a url"),
            url("mailto:officer@example.gov"),
            url(" https://sam.gov/b.docx "),
        ]));

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://sam.gov/b.docx");
    }

    #[test]
    fn test_dedupes_by_url_first_wins() {
        let found = discover(&contract(vec![
            ResourceLink::Described {
                url: "https://sam.gov/a.pdf".to_string(),
                description: Some("Solicitation".to_string()),
            },
            url("https://sam.gov/a.pdf"),
            url("https://sam.gov/c.xlsx"),
        ]));

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].description.as_deref(), Some("Solicitation"));
        assert_eq!(found[1].extension, ".xlsx");
    }

    #[test]
    fn test_extension_of_hidden_style_names() {
        assert_eq!(extension_of(".bashrc"), "");
        assert_eq!(extension_of("archive.tar.GZ"), ".gz");
        assert_eq!(extension_of("README"), "");
    }
}
