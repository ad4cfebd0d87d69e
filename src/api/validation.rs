use std::collections::HashSet;
use std::path::{Component, Path};
use thiserror::Error;

use crate::catalog::ContractRecord;

pub const MAX_CONTRACTS_PER_IMPORT: usize = 1000;
pub const MAX_LINKS_PER_CONTRACT: usize = 200;
pub const MAX_NOTICE_ID_LEN: usize = 100;
pub const MAX_BATCH_LIMIT: usize = 1000;
pub const MAX_DOWNLOAD_CONCURRENCY: usize = 32;
pub const MAX_ITEMS_LIMIT: usize = 1000;

#[derive(Debug, Error)]
pub enum RequestValidationError {
    #[error("contracts must contain between 1 and {MAX_CONTRACTS_PER_IMPORT} entries")]
    InvalidContractCount,
    #[error("notice_id must not be empty")]
    EmptyNoticeId,
    #[error("notice_id '{0}' exceeds {MAX_NOTICE_ID_LEN} characters")]
    NoticeIdTooLong(String),
    #[error("notice_id '{0}' appears more than once")]
    DuplicateNoticeId(String),
    #[error("contract '{0}' has more than {MAX_LINKS_PER_CONTRACT} resource links")]
    TooManyLinks(String),
    #[error("{field} must be between 1 and {max}")]
    OutOfRange { field: &'static str, max: usize },
    #[error("download_folder must be a non-empty path without '..'")]
    InvalidFolder,
    #[error("at least one of clear_completed, clear_failed, clear_all must be true")]
    NothingToClear,
}

pub fn validate_contracts(contracts: &[ContractRecord]) -> Result<(), RequestValidationError> {
    if !(1..=MAX_CONTRACTS_PER_IMPORT).contains(&contracts.len()) {
        return Err(RequestValidationError::InvalidContractCount);
    }

    let mut seen = HashSet::new();
    for contract in contracts {
        let notice_id = contract.notice_id.trim();
        if notice_id.is_empty() {
            return Err(RequestValidationError::EmptyNoticeId);
        }

        if notice_id.chars().count() > MAX_NOTICE_ID_LEN {
            return Err(RequestValidationError::NoticeIdTooLong(notice_id.to_string()));
        }

        if !seen.insert(notice_id) {
            return Err(RequestValidationError::DuplicateNoticeId(notice_id.to_string()));
        }

        if contract.resource_links.len() > MAX_LINKS_PER_CONTRACT {
            return Err(RequestValidationError::TooManyLinks(notice_id.to_string()));
        }
    }

    Ok(())
}

/// Bounds check for optional numeric request fields
pub fn validate_range(
    value: Option<usize>,
    field: &'static str,
    max: usize,
) -> Result<(), RequestValidationError> {
    match value {
        Some(v) if v == 0 || v > max => Err(RequestValidationError::OutOfRange { field, max }),
        _ => Ok(()),
    }
}

pub fn validate_folder(folder: &str) -> Result<(), RequestValidationError> {
    let trimmed = folder.trim();
    if trimmed.is_empty()
        || Path::new(trimmed)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(RequestValidationError::InvalidFolder);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn contract(notice_id: &str) -> ContractRecord {
        ContractRecord {
            notice_id: notice_id.to_string(),
            title: "t".to_string(),
            agency: None,
            resource_links: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn validate_contracts_accepts_valid_payload() {
        assert!(validate_contracts(&[contract("N-1"), contract("N-2")]).is_ok());
    }

    #[test]
    fn validate_contracts_rejects_empty_and_duplicates() {
        assert!(matches!(
            validate_contracts(&[]),
            Err(RequestValidationError::InvalidContractCount)
        ));
        assert!(matches!(
            validate_contracts(&[contract("  ")]),
            Err(RequestValidationError::EmptyNoticeId)
        ));
        assert!(matches!(
            validate_contracts(&[contract("N-1"), contract("N-1")]),
            Err(RequestValidationError::DuplicateNoticeId(_))
        ));
        assert!(matches!(
            validate_contracts(&[contract(&"x".repeat(101))]),
            Err(RequestValidationError::NoticeIdTooLong(_))
        ));
    }

    #[test]
    fn validate_range_bounds() {
        assert!(validate_range(None, "limit", 10).is_ok());
        assert!(validate_range(Some(10), "limit", 10).is_ok());
        assert!(validate_range(Some(0), "limit", 10).is_err());
        assert!(validate_range(Some(11), "limit", 10).is_err());
    }

    #[test]
    fn validate_folder_rejects_traversal() {
        assert!(validate_folder("queue_documents").is_ok());
        assert!(validate_folder("/srv/docs/batch-1").is_ok());
        assert!(validate_folder("").is_err());
        assert!(validate_folder("../etc").is_err());
        assert!(validate_folder("docs/../../x").is_err());
    }
}
