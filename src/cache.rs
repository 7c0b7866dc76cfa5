use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::formats::Book;
use crate::store;

pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub disk_loads: u64,
    pub evictions: u64,
}

/// Bounded, least-recently-used cache of parsed books keyed by folder name.
///
/// Misses load `book.json` from the store root. Absent or unreadable
/// artifacts are never cached, so a later fix on disk is picked up by the
/// next request.
#[derive(Debug)]
pub struct BookCache {
    root: PathBuf,
    capacity: usize,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
    disk_loads: AtomicU64,
    evictions: AtomicU64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Arc<Book>>,
    // front = least recently used
    order: VecDeque<String>,
}

impl CacheState {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key)
            && let Some(k) = self.order.remove(pos)
        {
            self.order.push_back(k);
        }
    }
}

impl BookCache {
    pub fn new(root: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            root: root.into(),
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            disk_loads: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // The state stays consistent even if a holder panicked mid-request.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn get(&self, identity: &str) -> Option<Arc<Book>> {
        let key = store::sanitize_component(identity)?;

        if let Some(book) = self.lookup(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(book);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let path = store::artifact_path(&self.root, key)?;
        self.disk_loads.fetch_add(1, Ordering::Relaxed);
        match store::read_artifact(&path).await {
            Ok(Some(book)) => {
                let book = Arc::new(book);
                self.insert(key, Arc::clone(&book));
                tracing::debug!(book_id = key, "loaded book into cache");
                Some(book)
            }
            Ok(None) => {
                tracing::debug!(book_id = key, path = %path.display(), "book artifact not found");
                None
            }
            Err(err) => {
                tracing::warn!(
                    book_id = key,
                    path = %path.display(),
                    ?err,
                    "failed to load book artifact"
                );
                None
            }
        }
    }

    fn lookup(&self, key: &str) -> Option<Arc<Book>> {
        let mut state = self.lock();
        let book = state.entries.get(key).cloned()?;
        state.touch(key);
        Some(book)
    }

    fn insert(&self, key: &str, book: Arc<Book>) {
        let mut state = self.lock();
        if state.entries.insert(key.to_owned(), book).is_some() {
            // A concurrent load got here first; last writer wins.
            state.touch(key);
            return;
        }
        state.order.push_back(key.to_owned());

        while state.entries.len() > self.capacity {
            let Some(evicted) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&evicted);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(book_id = %evicted, "evicted book from cache");
        }
    }

    pub fn contains(&self, identity: &str) -> bool {
        let Some(key) = store::sanitize_component(identity) else {
            return false;
        };
        self.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached book in one step.
    pub fn invalidate_all(&self) {
        let before = self.stats();
        let dropped = {
            let mut state = self.lock();
            let dropped = state.entries.len();
            state.entries.clear();
            state.order.clear();
            dropped
        };
        tracing::info!(
            dropped,
            hits = before.hits,
            misses = before.misses,
            disk_loads = before.disk_loads,
            evictions = before.evictions,
            "book cache invalidated"
        );
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            disk_loads: self.disk_loads.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
