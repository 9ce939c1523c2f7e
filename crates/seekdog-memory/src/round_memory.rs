//! Shared, append-only memory of completed rounds.
//!
//! Both the autonomous loop and the feedback path append to the same
//! [`RoundMemory`]. Appends are serialised by a mutex, so round numbers are
//! assigned in commit order and the attached [`RoundLog`] sees records in the
//! same order.
//!
//! # Example
//!
//! ```rust
//! use seekdog_memory::RoundMemory;
//! use seekdog_types::{DecisionSummary, Observation, Pose, RoundRecord, RoundSource};
//!
//! let memory = RoundMemory::new();
//! let n = memory.append(RoundRecord::new(
//!     RoundSource::Autonomous,
//!     Observation::empty(),
//!     None,
//!     DecisionSummary {
//!         initial_pose: Pose::default(),
//!         actions: vec![],
//!         new_pose: Pose::default(),
//!         rationale: "looking around".to_string(),
//!     },
//! ));
//! assert_eq!(n, 1);
//! assert!(memory.memory_text().contains("Round 1:"));
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use seekdog_types::RoundRecord;
use tracing::{info, warn};

use crate::round_log::{RoundLog, render_record};

#[derive(Debug, Default)]
struct Inner {
    records: Vec<RoundRecord>,
    log: Option<RoundLog>,
}

/// Cloneable handle to the round history.
#[derive(Debug, Clone, Default)]
pub struct RoundMemory {
    inner: Arc<Mutex<Inner>>,
}

impl RoundMemory {
    /// An empty memory with no log file attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty memory that mirrors every append into `log`.
    pub fn with_log(log: RoundLog) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                records: Vec::new(),
                log: Some(log),
            })),
        }
    }

    // Poisoning is ignored: records are only ever pushed.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `record`, assigning it the next round number, and return that
    /// number.
    ///
    /// Log-file failures are reported with `warn!` and do not prevent the
    /// record from entering memory.
    pub fn append(&self, mut record: RoundRecord) -> u32 {
        let mut inner = self.lock();
        let round = u32::try_from(inner.records.len() + 1).unwrap_or(u32::MAX);
        record.round = round;

        if let Some(log) = inner.log.as_mut() {
            if let Err(e) = log.write_record(&record) {
                warn!(round, error = %e, "failed to write round log");
            }
        }
        info!(
            round,
            source = ?record.source,
            from = %record.decision.initial_pose,
            to = %record.decision.new_pose,
            actions = %record.action_text(),
            "round recorded"
        );
        inner.records.push(record);
        round
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Copy of every record in append order.
    pub fn records(&self) -> Vec<RoundRecord> {
        self.lock().records.clone()
    }

    pub fn last(&self) -> Option<RoundRecord> {
        self.lock().records.last().cloned()
    }

    /// History text for the decision collaborator: every record rendered as
    /// a log block, or `"None."` when nothing has happened yet.
    pub fn memory_text(&self) -> String {
        self.render(usize::MAX)
    }

    /// Like [`memory_text`](Self::memory_text) but limited to the most
    /// recent `window` records.
    pub fn recent_text(&self, window: usize) -> String {
        self.render(window)
    }

    fn render(&self, window: usize) -> String {
        let inner = self.lock();
        let skip = inner.records.len().saturating_sub(window);
        let blocks: Vec<String> = inner.records.iter().skip(skip).map(render_record).collect();
        if blocks.is_empty() {
            "None.".to_string()
        } else {
            blocks.join("\n\n")
        }
    }
}
