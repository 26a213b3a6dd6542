//! Daemon health state.
//!
//! One explicit struct owned by the scheduler, fed through an accumulator
//! and read through a snapshot accessor. Logged after every pass so an
//! operator can see totals without a metrics stack.

use chrono::{DateTime, Utc};
use mirror_core::{SourceKind, SyncReport};
use serde::Serialize;
use std::collections::HashMap;

/// Outcome of the most recent pass for one source.
#[derive(Debug, Clone, Serialize)]
pub struct LastPass {
    pub at: DateTime<Utc>,
    pub success: bool,
    pub errors: usize,
}

/// Accumulated daemon health since startup.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    pub started_at: DateTime<Utc>,
    pub passes_completed: u64,
    pub passes_failed: u64,
    pub items_created: u64,
    pub items_updated: u64,
    pub items_deleted: u64,
    pub last_pass: HashMap<SourceKind, LastPass>,
}

impl DaemonHealth {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            passes_completed: 0,
            passes_failed: 0,
            items_created: 0,
            items_updated: 0,
            items_deleted: 0,
            last_pass: HashMap::new(),
        }
    }

    /// Fold one pass's report into the running totals.
    pub fn record_pass(&mut self, source: SourceKind, report: &SyncReport) {
        self.passes_completed += 1;
        if !report.success {
            self.passes_failed += 1;
        }
        self.items_created += u64::from(report.created + report.created_in_source);
        self.items_updated +=
            u64::from(report.updated + report.updated_in_source + report.tags_updated);
        self.items_deleted += u64::from(report.deleted + report.deleted_from_source);
        self.last_pass.insert(
            source,
            LastPass { at: Utc::now(), success: report.success, errors: report.errors.len() },
        );
    }

    /// Point-in-time copy for logging or status endpoints.
    pub fn snapshot(&self) -> DaemonHealth {
        self.clone()
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

impl Default for DaemonHealth {
    fn default() -> Self {
        Self::new()
    }
}
