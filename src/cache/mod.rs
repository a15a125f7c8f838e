//! Page cache with stale-while-revalidate regeneration
//!
//! Rendered pages are kept per key (the post slug) together with the time
//! they were generated. A page older than the freshness window is still
//! served, and the first request that sees it stale starts one background
//! regeneration. Readers never wait on a regeneration; only a key with no
//! entry at all is rendered inline, once, with concurrent readers of that key
//! waiting for the same render.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// A cached page
struct Entry<V> {
    content: Arc<V>,
    generated_at: Instant,
    /// A background regeneration for this key is in flight
    regenerating: bool,
}

/// Snapshot of one entry, for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStatus {
    pub age: Duration,
    pub stale: bool,
    pub regenerating: bool,
}

/// Per-key gate held while a missing page renders inline
type MissGate = Arc<tokio::sync::Mutex<()>>;

/// Stale-while-revalidate cache keyed by slug
pub struct PageCache<V> {
    entries: Arc<Mutex<HashMap<String, Entry<V>>>>,
    misses: Arc<Mutex<HashMap<String, MissGate>>>,
    freshness: Duration,
}

impl<V> Clone for PageCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            misses: Arc::clone(&self.misses),
            freshness: self.freshness,
        }
    }
}

impl<V: Send + Sync + 'static> PageCache<V> {
    /// Create a cache whose entries stay fresh for `freshness`
    pub fn new(freshness: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            misses: Arc::new(Mutex::new(HashMap::new())),
            freshness,
        }
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Store a freshly rendered page
    pub fn insert(&self, key: &str, content: V) -> Arc<V> {
        let content = Arc::new(content);
        self.lock().insert(
            key.to_string(),
            Entry {
                content: Arc::clone(&content),
                generated_at: Instant::now(),
                regenerating: false,
            },
        );
        content
    }

    /// Cached page without triggering regeneration
    pub fn peek(&self, key: &str) -> Option<Arc<V>> {
        self.lock().get(key).map(|e| Arc::clone(&e.content))
    }

    pub fn status(&self, key: &str) -> Option<EntryStatus> {
        self.lock().get(key).map(|e| {
            let age = e.generated_at.elapsed();
            EntryStatus {
                age,
                stale: age >= self.freshness,
                regenerating: e.regenerating,
            }
        })
    }

    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Serve a page, rendering or regenerating it as needed.
    ///
    /// * no entry: `render` runs inline; `Ok(None)` means the page does not
    ///   exist and nothing is cached. Concurrent misses for one key wait for
    ///   the first render and reuse its page;
    /// * fresh entry: returned as is;
    /// * stale entry: returned as is, and if no regeneration is running for
    ///   this key `render` is spawned in the background. Its result replaces
    ///   the entry, `Ok(None)` drops it, an error keeps the old page.
    pub async fn get_or_render<F, Fut, E>(&self, key: &str, render: F) -> Result<Option<Arc<V>>, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Option<V>, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let cached = {
            let mut entries = self.lock();
            match entries.get_mut(key) {
                Some(entry) => {
                    let stale = entry.generated_at.elapsed() >= self.freshness;
                    let start = stale && !entry.regenerating;
                    if start {
                        entry.regenerating = true;
                    }
                    Some((Arc::clone(&entry.content), start))
                }
                None => None,
            }
        };

        match cached {
            Some((content, start_regeneration)) => {
                if start_regeneration {
                    tracing::debug!("Regenerating stale page: {}", key);
                    self.spawn_regeneration(key.to_string(), render(key.to_string()));
                }
                Ok(Some(content))
            }
            None => self.render_miss(key, render).await,
        }
    }

    async fn render_miss<F, Fut, E>(&self, key: &str, render: F) -> Result<Option<Arc<V>>, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        let gate = Arc::clone(
            self.lock_misses()
                .entry(key.to_string())
                .or_insert_with(MissGate::default),
        );
        let _held = gate.lock().await;

        // Rendered while we waited
        if let Some(content) = self.peek(key) {
            return Ok(Some(content));
        }

        tracing::debug!("Rendering uncached page: {}", key);
        let rendered = render(key.to_string())
            .await
            .map(|page| page.map(|content| self.insert(key, content)));
        self.release_gate(key, &gate);
        rendered
    }

    fn release_gate(&self, key: &str, gate: &MissGate) {
        let mut misses = self.lock_misses();
        if misses.get(key).is_some_and(|g| Arc::ptr_eq(g, gate)) {
            misses.remove(key);
        }
    }

    fn spawn_regeneration<Fut, E>(&self, key: String, job: Fut)
    where
        Fut: Future<Output = Result<Option<V>, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let cache = self.clone();
        tokio::spawn(async move {
            // A panicking render comes back as a JoinError
            let outcome = tokio::spawn(job).await;
            let mut entries = cache.lock();
            match outcome {
                Err(e) => {
                    if let Some(entry) = entries.get_mut(&key) {
                        entry.regenerating = false;
                    }
                    tracing::error!("Regeneration of {} aborted, keeping stale page: {}", key, e);
                }
                Ok(Ok(Some(content))) => {
                    entries.insert(
                        key.clone(),
                        Entry {
                            content: Arc::new(content),
                            generated_at: Instant::now(),
                            regenerating: false,
                        },
                    );
                    tracing::debug!("Regenerated page: {}", key);
                }
                Ok(Ok(None)) => {
                    entries.remove(&key);
                    tracing::info!("Page no longer exists, dropped from cache: {}", key);
                }
                Ok(Err(e)) => {
                    if let Some(entry) = entries.get_mut(&key) {
                        entry.regenerating = false;
                    }
                    tracing::warn!("Regeneration of {} failed, keeping stale page: {}", key, e);
                }
            }
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_misses(&self) -> std::sync::MutexGuard<'_, HashMap<String, MissGate>> {
        self.misses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
