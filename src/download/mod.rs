//! Document acquisition
//!
//! - [`HttpClient`] fetches one URL with timeouts, retries and a size cap
//! - [`Downloader`] runs batches of fetches into artifact storage and records
//!   each success in the catalog

mod downloader;
mod error;
pub mod http;
pub mod naming;

pub use downloader::{DownloadOptions, DownloadSummary, Downloader, FailedDownload};
pub use error::{DownloadError, Result};
pub use http::{FetchError, FetchedDocument, HttpClient, HttpConfig};
