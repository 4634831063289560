use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::discovery::discover::Strategy;

/// Why a sync pass ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncReason {
    Startup,
    Mutation,
    Manual,
    ModeChange,
}

/// One JSONL line per sync pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTraceEvent {
    pub timestamp_ms: u128,
    pub pass: u64,
    pub reason: SyncReason,
    pub include_non_user: bool,

    pub strategy: Option<Strategy>,
    pub entries: usize,

    /// Candidates dropped because their text was empty after normalization
    pub skipped_empty: usize,
}

impl SyncTraceEvent {
    pub fn now(pass: u64, reason: SyncReason, include_non_user: bool) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            pass,
            reason,
            include_non_user,
            strategy: None,
            entries: 0,
            skipped_empty: 0,
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_counts(mut self, entries: usize, skipped_empty: usize) -> Self {
        self.entries = entries;
        self.skipped_empty = skipped_empty;
        self
    }
}
