//! Bounded history of dataset summaries.
//!
//! ```text
//!   insert(summary)
//!        │
//!        ▼
//!   ┌──────────────────────────────┐
//!   │ BTreeMap<(uploaded_at, id)>  │  ordered oldest → newest
//!   └──────────────────────────────┘
//!        │ len > capacity
//!        ▼
//!   pop_first()  → evicted summary handed back to the caller
//! ```
//!
//! Insert and eviction happen under one write guard, so no reader ever sees
//! more than `capacity` records. Each store also remembers the highest id it
//! has ever accepted, evicted or not, so ids are never handed out twice.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::model::{DatasetSummary, SummaryId};
use crate::error::StoreError;

/// Number of summaries retained when nothing else is configured.
pub const DEFAULT_CAPACITY: usize = 5;

// ---------------------------------------------------------------------------
// Store abstraction
// ---------------------------------------------------------------------------

/// Persistence boundary for retained summaries.
///
/// Implementations keep at most [`capacity`](SummaryStore::capacity) records.
/// An insert that overflows evicts exactly one record, the one with the
/// smallest `(uploaded_at, id)`, and returns it.
pub trait SummaryStore: Send + Sync {
    fn insert(&self, summary: DatasetSummary) -> Result<Option<DatasetSummary>, StoreError>;

    /// Up to `n` summaries, newest first. `n` is clamped to the capacity.
    fn list_recent(&self, n: usize) -> Vec<DatasetSummary>;

    fn capacity(&self) -> usize;

    fn len(&self) -> usize;

    /// Highest id ever inserted, including records since evicted.
    fn last_issued(&self) -> Option<SummaryId>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, id: SummaryId) -> Option<DatasetSummary> {
        self.list_recent(self.capacity())
            .into_iter()
            .find(|s| s.id() == id)
    }
}

// ---------------------------------------------------------------------------
// BoundedHistory – the unsynchronised container both stores share
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct BoundedHistory {
    capacity: usize,
    entries: BTreeMap<(DateTime<Utc>, SummaryId), DatasetSummary>,
    last_issued: Option<SummaryId>,
}

impl BoundedHistory {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: BTreeMap::new(),
            last_issued: None,
        }
    }

    fn insert(&mut self, summary: DatasetSummary) -> Option<DatasetSummary> {
        self.last_issued = self.last_issued.max(Some(summary.id()));
        self.entries.insert(summary.history_key(), summary);
        if self.entries.len() > self.capacity {
            self.entries.pop_first().map(|(_, evicted)| evicted)
        } else {
            None
        }
    }

    fn recent(&self, n: usize) -> Vec<DatasetSummary> {
        self.entries
            .values()
            .rev()
            .take(n.min(self.capacity))
            .cloned()
            .collect()
    }

    fn oldest_first(&self) -> Vec<&DatasetSummary> {
        self.entries.values().collect()
    }
}

// ---------------------------------------------------------------------------
// MemoryHistory
// ---------------------------------------------------------------------------

/// In-process history, empty at start.
#[derive(Debug)]
pub struct MemoryHistory {
    inner: RwLock<BoundedHistory>,
}

impl MemoryHistory {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(BoundedHistory::new(capacity)),
        }
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SummaryStore for MemoryHistory {
    fn insert(&self, summary: DatasetSummary) -> Result<Option<DatasetSummary>, StoreError> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.insert(summary))
    }

    fn list_recent(&self, n: usize) -> Vec<DatasetSummary> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.recent(n)
    }

    fn capacity(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .capacity
    }

    fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    fn last_issued(&self) -> Option<SummaryId> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_issued
    }
}

// ---------------------------------------------------------------------------
// JsonFileHistory
// ---------------------------------------------------------------------------

/// History persisted as a single JSON file:
///
/// ```text
/// { "next_id": 9, "summaries": [ /* oldest first */ ] }
/// ```
///
/// Every insert rewrites the file through a temporary sibling and a rename.
/// If the write fails the in-memory state is left as it was.
#[derive(Debug)]
pub struct JsonFileHistory {
    path: PathBuf,
    inner: RwLock<BoundedHistory>,
}

impl JsonFileHistory {
    /// Open the history at `path`, starting empty when the file does not exist.
    ///
    /// Records beyond `capacity` in an existing file are evicted oldest first
    /// and the trimmed state is written back.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Result<Self, StoreError> {
        let path = path.into();
        let mut history = BoundedHistory::new(capacity);

        if path.exists() {
            let text = fs::read_to_string(&path)?;
            let stored: Snapshot<DatasetSummary> = serde_json::from_str(&text)?;
            let stored_len = stored.summaries.len();
            for summary in stored.summaries {
                history.insert(summary);
            }
            let recorded = stored.next_id.checked_sub(1).filter(|&id| id > 0);
            history.last_issued = history.last_issued.max(recorded.map(SummaryId));
            if stored_len > history.entries.len() {
                write_snapshot(&path, &history)?;
            }
        }

        Ok(Self {
            path,
            inner: RwLock::new(history),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SummaryStore for JsonFileHistory {
    fn insert(&self, summary: DatasetSummary) -> Result<Option<DatasetSummary>, StoreError> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        let evicted = next.insert(summary);
        write_snapshot(&self.path, &next)?;
        *guard = next;
        Ok(evicted)
    }

    fn list_recent(&self, n: usize) -> Vec<DatasetSummary> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.recent(n)
    }

    fn capacity(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .capacity
    }

    fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    fn last_issued(&self) -> Option<SummaryId> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_issued
    }
}

/// On-disk layout of [`JsonFileHistory`].
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot<S> {
    /// Id the next summary will receive; survives eviction of the newest id.
    next_id: u64,
    summaries: Vec<S>,
}

fn write_snapshot(path: &Path, history: &BoundedHistory) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let snapshot = Snapshot {
        next_id: history.last_issued.map_or(1, |id| id.0 + 1),
        summaries: history.oldest_first(),
    };
    let json = serde_json::to_string_pretty(&snapshot)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, json)?;
    if let Err(e) = fs::rename(&tmp, path) {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            log::warn!("could not remove {}: {cleanup}", tmp.display());
        }
        return Err(e.into());
    }
    Ok(())
}
