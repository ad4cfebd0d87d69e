//! Pull-based queue status, computed from one store scan per call

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::item::{ItemStatus, QueueItem};
use crate::observability::CountersSnapshot;

/// Pool fields folded into a status report
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolView {
    pub is_running: bool,
    pub is_paused: bool,
    pub concurrency: usize,
    pub counters: CountersSnapshot,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecentDocument {
    pub id: u64,
    pub filename: String,
    pub completed_at: DateTime<Utc>,
    pub contract_notice_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
    pub is_processing: bool,
    pub is_paused: bool,
    pub concurrency: usize,
    /// completed / total, 0 when the queue is empty
    pub completion_rate: f64,
    /// completed / (completed + failed), 0 before anything finished
    pub success_rate: f64,
    pub counters: CountersSnapshot,
    pub recent_documents: Vec<RecentDocument>,
}

impl QueueStatus {
    pub fn from_items(items: &[QueueItem], recent_limit: usize, pool: PoolView) -> Self {
        let (mut queued, mut processing, mut completed, mut failed) = (0, 0, 0, 0);
        let mut recent = Vec::new();

        for item in items {
            match item.status {
                ItemStatus::Queued => queued += 1,
                ItemStatus::Processing => processing += 1,
                ItemStatus::Completed => {
                    completed += 1;
                    if let Some(completed_at) = item.completed_at {
                        recent.push(RecentDocument {
                            id: item.id,
                            filename: item.filename.clone(),
                            completed_at,
                            contract_notice_id: item.contract_notice_id.clone(),
                        });
                    }
                }
                ItemStatus::Failed => failed += 1,
            }
        }

        // Newest first; ties broken by id so the order is stable
        recent.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(b.id.cmp(&a.id)));
        recent.truncate(recent_limit);

        let total = items.len();

        Self {
            queued,
            processing,
            completed,
            failed,
            total,
            is_processing: pool.is_running,
            is_paused: pool.is_paused,
            concurrency: pool.concurrency,
            completion_rate: ratio(completed, total),
            success_rate: ratio(completed, completed + failed),
            counters: pool.counters,
            recent_documents: recent,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
