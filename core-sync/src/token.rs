//! Run generations.
//!
//! Every sync invocation bumps a shared counter and keeps the value it saw.
//! A run stays valid only while nobody has bumped the counter since, so a
//! newer invocation silently supersedes older ones at their next checkpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Shared generation counter. Clones observe the same counter.
#[derive(Debug, Clone, Default)]
pub struct SyncGeneration(Arc<AtomicU64>);

impl SyncGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, invalidating every outstanding token.
    pub fn begin(&self) -> SyncToken {
        let generation = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        SyncToken {
            generation,
            run_id: Uuid::new_v4().to_string(),
            shared: Arc::clone(&self.0),
        }
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Identity of one sync run.
#[derive(Debug, Clone)]
pub struct SyncToken {
    generation: u64,
    run_id: String,
    shared: Arc<AtomicU64>,
}

impl SyncToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Random id used to correlate logs and events
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn is_current(&self) -> bool {
        self.shared.load(Ordering::SeqCst) == self.generation
    }
}
