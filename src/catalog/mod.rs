/// Fjall-based catalog of contracts and downloaded documents
///
/// The catalog holds the inputs and outputs of document acquisition:
///
/// - Contract records (notice id, title, attached document links)
/// - Download records (which URL landed where, with size and mtime)
///
/// It lives in its own keyspace next to the queue store so that queue
/// purges never touch acquisition history.
///
/// ## Usage
///
/// ```rust,ignore
/// use docqueue::catalog::CatalogStore;
///
/// let catalog = CatalogStore::open("data/catalog")?;
/// catalog.upsert_contract(&contract)?;
/// let downloads = catalog.downloads_for("W912DY-24-R-0001")?;
/// ```

pub mod error;
pub mod partitions;
pub mod records;
pub mod store;

pub use error::{CatalogError, Result};
pub use records::{ContractRecord, DownloadRecord, ResourceLink};
pub use store::{CatalogStats, CatalogStore};
