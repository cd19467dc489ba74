//! Per-domain response cache.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;
use medflow_client::{RequestDescriptor, RequestExecutor};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace};

use crate::bus::{InvalidationBus, InvalidationEvent, PublishReport};
use crate::config::StoreConfig;
use crate::error::Result;
use crate::tag::Tag;

/// Entry stored in the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Decoded response body.
    pub value: Value,

    /// Tags this entry can be invalidated by.
    pub tags: Vec<Tag>,

    /// Cleared when one of the tags is invalidated.
    pub fresh: bool,

    /// When this entry was fetched.
    pub cached_at: Instant,
}

impl CacheEntry {
    fn is_hit_by(&self, invalidated: &Tag) -> bool {
        self.tags.iter().any(|t| t.is_hit_by(invalidated))
    }
}

/// A fetch that has not completed yet.
#[derive(Debug)]
struct InFlight {
    tags: Vec<Tag>,
    /// Set when one of `tags` was invalidated while the fetch was running.
    poisoned: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    hits: u64,
    misses: u64,
    fetches: u64,
    invalidated: u64,
}

/// Inner state protected by a mutex that is never held across an await.
struct StoreState {
    entries: LruCache<String, CacheEntry>,
    in_flight: HashMap<u64, InFlight>,
    next_ticket: u64,
    counters: Counters,
}

impl StoreState {
    fn invalidate(&mut self, tag: &Tag) -> usize {
        let mut count = 0;
        for (_, entry) in self.entries.iter_mut() {
            if entry.fresh && entry.is_hit_by(tag) {
                entry.fresh = false;
                count += 1;
            }
        }
        for fetch in self.in_flight.values_mut() {
            if fetch.tags.iter().any(|t| t.is_hit_by(tag)) {
                fetch.poisoned = true;
            }
        }
        self.counters.invalidated += count as u64;
        count
    }
}

/// State shared by all handles of one mounted store.
pub(crate) struct StoreShared {
    domain: String,
    executor: RequestExecutor,
    bus: InvalidationBus,
    config: StoreConfig,
    state: Mutex<StoreState>,
}

impl StoreShared {
    /// Mark every fresh entry carrying a tag hit by `tag` as stale.
    pub(crate) fn invalidate(&self, tag: &Tag) -> usize {
        let count = self.state.lock().invalidate(tag);
        debug!(domain = %self.domain, tag = %tag, count, "Invalidated cache entries");
        count
    }

    pub(crate) fn domain(&self) -> &str {
        &self.domain
    }
}

/// Removes the in-flight record if the fetch is abandoned.
struct FetchTicket<'a> {
    shared: &'a StoreShared,
    ticket: u64,
    armed: bool,
}

impl FetchTicket<'_> {
    /// Store the fetched value; fresh unless invalidated mid-flight.
    fn complete(mut self, key: String, value: Value, tags: Vec<Tag>) -> bool {
        let mut state = self.shared.state.lock();
        self.armed = false;
        let poisoned = state
            .in_flight
            .remove(&self.ticket)
            .is_some_and(|f| f.poisoned);
        state.counters.fetches += 1;
        state.entries.put(
            key,
            CacheEntry {
                value,
                tags,
                fresh: !poisoned,
                cached_at: Instant::now(),
            },
        );
        !poisoned
    }
}

impl Drop for FetchTicket<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.state.lock().in_flight.remove(&self.ticket);
        }
    }
}

/// In-memory cache of one domain's responses.
///
/// Handles are cheap clones of the same store. The store stays mounted on
/// its [`InvalidationBus`] until the last handle is dropped.
#[derive(Clone)]
pub struct CacheStore {
    shared: Arc<StoreShared>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("domain", &self.shared.domain)
            .field("config", &self.shared.config)
            .finish()
    }
}

impl CacheStore {
    pub(crate) fn new(
        domain: String,
        executor: RequestExecutor,
        bus: InvalidationBus,
        config: StoreConfig,
    ) -> Self {
        let cap = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        let state = StoreState {
            entries: LruCache::new(cap),
            in_flight: HashMap::new(),
            next_ticket: 0,
            counters: Counters::default(),
        };
        Self {
            shared: Arc::new(StoreShared {
                domain,
                executor,
                bus,
                config,
                state: Mutex::new(state),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<StoreShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn shared(&self) -> &Arc<StoreShared> {
        &self.shared
    }

    /// Domain this store belongs to.
    pub fn domain(&self) -> &str {
        &self.shared.domain
    }

    /// Executor used on cache misses and writes.
    pub fn executor(&self) -> &RequestExecutor {
        &self.shared.executor
    }

    /// Read through the cache.
    ///
    /// A fresh entry for the request's key is returned without a network
    /// call. Otherwise the request is executed, the decoded body stored under
    /// the key with `tags`, and returned.
    pub async fn read(&self, request: &RequestDescriptor, tags: &[Tag]) -> Result<Value> {
        let key = request.cache_key();

        let ticket = {
            let mut state = self.shared.state.lock();
            let cached = state
                .entries
                .get(&key)
                .filter(|e| e.fresh)
                .map(|e| e.value.clone());
            if let Some(value) = cached {
                state.counters.hits += 1;
                trace!(domain = %self.shared.domain, key = %key, "Cache hit");
                return Ok(value);
            }

            state.counters.misses += 1;
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            state.in_flight.insert(
                ticket,
                InFlight {
                    tags: tags.to_vec(),
                    poisoned: false,
                },
            );
            FetchTicket {
                shared: &self.shared,
                ticket,
                armed: true,
            }
        };

        debug!(domain = %self.shared.domain, key = %key, "Cache miss, fetching");
        let value: Value = self
            .shared
            .executor
            .execute(request)
            .await?
            .error_for_status()?
            .json()?;

        let fresh = ticket.complete(key.clone(), value.clone(), tags.to_vec());
        if !fresh {
            debug!(
                domain = %self.shared.domain,
                key = %key,
                "Tag invalidated during fetch, entry stored stale"
            );
        }
        Ok(value)
    }

    /// Perform a write.
    ///
    /// Always hits the network. On success every entry hit by `invalidates`
    /// is marked stale and an [`InvalidationEvent`] for `action` is published
    /// on the bus. A failed write changes nothing and publishes nothing.
    pub async fn write(
        &self,
        request: &RequestDescriptor,
        action: &str,
        invalidates: &[Tag],
    ) -> Result<Value> {
        let response = self
            .shared
            .executor
            .execute(request)
            .await?
            .error_for_status()?;

        for tag in invalidates {
            self.invalidate(tag);
        }
        let report = self.publish(action);
        debug!(
            domain = %self.shared.domain,
            action,
            rules_matched = report.rules_matched,
            "Write completed"
        );

        Ok(response.json()?)
    }

    /// Announce a completed action on the bus.
    fn publish(&self, action: &str) -> PublishReport {
        self.shared
            .bus
            .publish(&InvalidationEvent::new(self.shared.domain.clone(), action))
    }

    /// Mark every entry hit by `tag` as stale. Returns how many changed.
    pub fn invalidate(&self, tag: &Tag) -> usize {
        self.shared.invalidate(tag)
    }

    /// Cached entry for `request`, fresh or stale, without touching LRU order.
    pub fn peek(&self, request: &RequestDescriptor) -> Option<CacheEntry> {
        self.shared
            .state
            .lock()
            .entries
            .peek(&request.cache_key())
            .cloned()
    }

    /// Whether `request` would be served from the cache.
    pub fn contains_fresh(&self, request: &RequestDescriptor) -> bool {
        self.peek(request).is_some_and(|e| e.fresh)
    }

    /// Number of entries, fresh or stale.
    pub fn len(&self) -> usize {
        self.shared.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.shared.state.lock().entries.clear();
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.shared.state.lock();
        CacheStats {
            size: state.entries.len(),
            capacity: self.shared.config.max_entries,
            hits: state.counters.hits,
            misses: state.counters.misses,
            fetches: state.counters.fetches,
            invalidated: state.counters.invalidated,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries.
    pub size: usize,

    /// Maximum capacity.
    pub capacity: usize,

    /// Reads served from the cache.
    pub hits: u64,

    /// Reads that went to the network.
    pub misses: u64,

    /// Completed network fetches stored in the cache.
    pub fetches: u64,

    /// Entries marked stale by invalidation.
    pub invalidated: u64,
}
