//! Run tracking — unique run ids and immutable run metadata records.
//!
//! Every ingestion attempt is described by a [`RunRecord`]. Records are never
//! mutated: a status transition constructs a new record, so the history of
//! attempts survives. Each construction draws a fresh run id.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Generate a unique, time-sortable run id: `run_<YYYYMMDD_HHMMSS>_<8-hex>`.
///
/// The timestamp prefix makes ids sort by creation time; the 32-bit random
/// suffix makes collisions within one second negligible. Never fails.
pub fn generate_run_id() -> String {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let suffix: u32 = rand::random();
    format!("run_{stamp}_{suffix:08x}")
}

/// Status of an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Started,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Started => "started",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for one ingestion attempt of one dataset.
///
/// Immutable once constructed. `records_loaded` is only meaningful when
/// `status` is [`RunStatus::Completed`]; `error_message` is only present when
/// `status` is [`RunStatus::Failed`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub dataset_name: String,
    pub run_timestamp: NaiveDateTime,
    pub status: RunStatus,
    pub records_loaded: u64,
    pub error_message: Option<String>,
}

impl RunRecord {
    fn new(
        dataset_name: &str,
        status: RunStatus,
        records_loaded: u64,
        error_message: Option<String>,
    ) -> Self {
        Self {
            run_id: generate_run_id(),
            dataset_name: dataset_name.to_string(),
            run_timestamp: Local::now().naive_local(),
            status,
            records_loaded,
            error_message,
        }
    }

    /// Record for an attempt that has just begun.
    pub fn started(dataset_name: &str) -> Self {
        Self::new(dataset_name, RunStatus::Started, 0, None)
    }

    /// Terminal record for an attempt whose load succeeded.
    pub fn completed(dataset_name: &str, records_loaded: u64) -> Self {
        Self::new(dataset_name, RunStatus::Completed, records_loaded, None)
    }

    /// Terminal record for an attempt that failed at extract or load.
    pub fn failed(dataset_name: &str, error: impl fmt::Display) -> Self {
        Self::new(dataset_name, RunStatus::Failed, 0, Some(error.to_string()))
    }

    /// True when this record is terminal (completed or failed).
    pub fn is_terminal(&self) -> bool {
        self.status != RunStatus::Started
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn run_ids_are_distinct_in_rapid_succession() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_run_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn run_id_format() {
        let id = generate_run_id();
        // run_YYYYMMDD_HHMMSS_xxxxxxxx
        assert!(id.starts_with("run_"));
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[3].len(), 8);
        assert!(parts[3].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn started_record_defaults() {
        let record = RunRecord::started("stock_prices_daily");
        assert_eq!(record.dataset_name, "stock_prices_daily");
        assert_eq!(record.status, RunStatus::Started);
        assert_eq!(record.records_loaded, 0);
        assert!(record.error_message.is_none());
        assert!(!record.is_terminal());
    }

    #[test]
    fn transitions_construct_new_records() {
        let started = RunRecord::started("company_info");
        let completed = RunRecord::completed("company_info", 42);
        let failed = RunRecord::failed("company_info", "connection refused");

        assert_ne!(started.run_id, completed.run_id);
        assert_ne!(completed.run_id, failed.run_id);
        assert_eq!(completed.records_loaded, 42);
        assert!(completed.is_terminal());
        assert_eq!(
            failed.error_message.as_deref(),
            Some("connection refused")
        );
    }

    #[test]
    fn status_round_trips_through_serde() {
        let json = serde_json::to_string(&RunStatus::Failed).unwrap();
        assert_eq!(json, "\"failed\"");
        let back: RunStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RunStatus::Failed);
    }

    proptest! {
        /// Any two generations, even seeded from the same instant, differ.
        #[test]
        fn generated_ids_never_collide(_n in 0..100u32) {
            let a = generate_run_id();
            let b = generate_run_id();
            prop_assert_ne!(a, b);
        }
    }
}
