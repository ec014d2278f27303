//! Run record store - in-memory registry of runs
//!
//! The store owns every [`RunRecord`] for the lifetime of the process.
//! Readers get clones; only the orchestrator writes. Records are never
//! evicted, so memory grows with the number of runs.
//!
//! Locks are `std::sync` rather than async: every critical section is a
//! single map operation, and the run finalizer needs to write from `Drop`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use uuid::Uuid;

use crate::record::{RunFlags, RunRecord, RunStatus};

/// Default page size for [`RunStore::list`]
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Filter and ordering for listing finished runs
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub status: Option<RunStatus>,
    pub limit: usize,
    pub newest_first: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            status: None,
            limit: DEFAULT_LIST_LIMIT,
            newest_first: true,
        }
    }
}

struct Entry {
    /// Creation order, breaks `started_at` ties
    seq: u64,
    record: RunRecord,
}

#[derive(Default)]
struct StoreInner {
    next_seq: u64,
    runs: HashMap<String, Entry>,
}

/// Shared handle to the run registry
#[derive(Clone, Default)]
pub struct RunStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new run in the `running` state with a fresh id
    pub fn create(
        &self,
        command: Vec<String>,
        input_path: &Path,
        output_path: &Path,
        flags: RunFlags,
    ) -> RunRecord {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let run_id = loop {
            let candidate = short_id();
            if !inner.runs.contains_key(&candidate) {
                break candidate;
            }
        };

        let record = RunRecord::new(run_id.clone(), command, input_path, output_path, flags);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.runs.insert(
            run_id,
            Entry {
                seq,
                record: record.clone(),
            },
        );

        record
    }

    /// Replace the stored record with the same `run_id`
    pub fn update(&self, record: RunRecord) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match inner.runs.get_mut(&record.run_id) {
            Some(entry) => entry.record = record,
            None => {
                tracing::warn!(run_id = %record.run_id, "update for unknown run, inserting");
                let seq = inner.next_seq;
                inner.next_seq += 1;
                inner.runs.insert(record.run_id.clone(), Entry { seq, record });
            }
        }
    }

    pub fn get(&self, run_id: &str) -> Option<RunRecord> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.runs.get(run_id).map(|entry| entry.record.clone())
    }

    /// Snapshot of finished runs, ordered by start time.
    ///
    /// Running records are never listed.
    pub fn list(&self, query: &ListQuery) -> Vec<RunRecord> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);

        let mut entries: Vec<&Entry> = inner
            .runs
            .values()
            .filter(|entry| entry.record.status.is_terminal())
            .filter(|entry| query.status.map_or(true, |s| entry.record.status == s))
            .collect();

        entries.sort_by_key(|entry| (entry.record.started_at, entry.seq));
        if query.newest_first {
            entries.reverse();
        }

        entries
            .into_iter()
            .take(query.limit)
            .map(|entry| entry.record.clone())
            .collect()
    }

    /// Number of records, running or not
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .runs
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Short opaque run identifier
pub fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
