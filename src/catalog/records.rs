use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A contract notice and the document links attached to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractRecord {
    pub notice_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency: Option<String>,
    #[serde(default)]
    pub resource_links: Vec<ResourceLink>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// A document reference as published with a notice: either a bare URL or
/// an object carrying a description
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ResourceLink {
    Url(String),
    Described {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl ResourceLink {
    pub fn url(&self) -> &str {
        match self {
            ResourceLink::Url(url) => url,
            ResourceLink::Described { url, .. } => url,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            ResourceLink::Url(_) => None,
            ResourceLink::Described { description, .. } => description.as_deref(),
        }
    }
}

/// A document that landed in artifact storage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadRecord {
    pub document_url: String,
    pub contract_notice_id: String,
    pub filename: String,
    pub extension: String,
    pub size_bytes: u64,
    pub local_path: PathBuf,
    pub modified_at: DateTime<Utc>,
    pub downloaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
