pub mod enqueuer;
pub mod item;
pub mod status;
pub mod store;

pub use enqueuer::{EnqueueError, EnqueueMode, EnqueueReport, Enqueuer};
pub use item::{ItemStatus, NewItem, QueueItem};
pub use status::{PoolView, QueueStatus, RecentDocument};
pub use store::{FailOutcome, QueueError, QueueStore};
