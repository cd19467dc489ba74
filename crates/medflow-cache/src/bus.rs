//! Cross-domain invalidation bus.
//!
//! Domains never touch each other's stores. A successful write publishes an
//! [`InvalidationEvent`]; the bus looks up the static rule table and
//! invalidates the target tags in the target domains' *mounted* stores,
//! synchronously, before [`InvalidationBus::publish`] returns. A target that
//! is not mounted is skipped: it starts empty on its next mount anyway.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use medflow_client::RequestExecutor;
use parking_lot::RwLock;
use tracing::{debug, info, trace};

use crate::config::StoreConfig;
use crate::error::{CacheError, Result};
use crate::store::{CacheStore, StoreShared};
use crate::tag::Tag;

// ============================================================================
// Rules and events
// ============================================================================

/// "When `source_domain` completes `source_action`, invalidate `target_tag`
/// in `target_domain`."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationRule {
    pub source_domain: String,
    pub source_action: String,
    pub target_domain: String,
    pub target_tag: Tag,
}

impl InvalidationRule {
    pub fn new(
        source_domain: impl Into<String>,
        source_action: impl Into<String>,
        target_domain: impl Into<String>,
        target_tag: Tag,
    ) -> Self {
        Self {
            source_domain: source_domain.into(),
            source_action: source_action.into(),
            target_domain: target_domain.into(),
            target_tag,
        }
    }

    /// Build a rule whose tag is given as `kind` or `kind:id`.
    pub fn parse(
        source_domain: impl Into<String>,
        source_action: impl Into<String>,
        target_domain: impl Into<String>,
        target_tag: &str,
    ) -> Result<Self> {
        let rule = Self::new(
            source_domain,
            source_action,
            target_domain,
            target_tag.parse()?,
        );
        rule.validate()?;
        Ok(rule)
    }

    pub fn matches(&self, event: &InvalidationEvent) -> bool {
        self.source_domain == event.source_domain && self.source_action == event.action
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("source_domain", &self.source_domain),
            ("source_action", &self.source_action),
            ("target_domain", &self.target_domain),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(CacheError::InvalidRule(format!(
                    "{} must not be empty ({} -> {})",
                    field, self.source_action, self.target_tag
                )));
            }
        }
        Ok(())
    }
}

/// A completed write, published once and then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationEvent {
    pub source_domain: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

impl InvalidationEvent {
    pub fn new(source_domain: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            source_domain: source_domain.into(),
            action: action.into(),
            timestamp: Utc::now(),
        }
    }
}

/// What one `publish` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Rules whose source matched the event.
    pub rules_matched: usize,
    /// Matched rules whose target domain was mounted.
    pub targets_reached: usize,
    /// Entries marked stale across all targets.
    pub entries_invalidated: usize,
}

/// Bus-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusStats {
    pub events_published: u64,
    pub rules_matched: u64,
    pub targets_reached: u64,
    pub entries_invalidated: u64,
}

// ============================================================================
// Bus
// ============================================================================

#[derive(Debug, Default)]
struct Counters {
    events_published: AtomicU64,
    rules_matched: AtomicU64,
    targets_reached: AtomicU64,
    entries_invalidated: AtomicU64,
}

struct BusInner {
    rules: Vec<InvalidationRule>,
    stores: RwLock<HashMap<String, Weak<StoreShared>>>,
    counters: Counters,
}

/// Registry of mounted domain stores plus the static rule table.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct InvalidationBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for InvalidationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationBus")
            .field("rules", &self.inner.rules.len())
            .field("mounted", &self.mounted_domains())
            .finish()
    }
}

impl InvalidationBus {
    /// Create a bus with a fixed rule table.
    pub fn new(rules: Vec<InvalidationRule>) -> Result<Self> {
        for rule in &rules {
            rule.validate()?;
        }
        Ok(Self::with_rules(rules))
    }

    /// Create a bus without rules; writes only invalidate their own domain.
    pub fn empty() -> Self {
        Self::with_rules(Vec::new())
    }

    fn with_rules(rules: Vec<InvalidationRule>) -> Self {
        info!(rules = rules.len(), "Invalidation bus ready");
        Self {
            inner: Arc::new(BusInner {
                rules,
                stores: RwLock::new(HashMap::new()),
                counters: Counters::default(),
            }),
        }
    }

    /// The rule table.
    pub fn rules(&self) -> &[InvalidationRule] {
        &self.inner.rules
    }

    /// Mount an empty store for `domain`.
    ///
    /// The store is registered weakly: once every handle is dropped the
    /// domain counts as unmounted and may be mounted again.
    pub fn mount(
        &self,
        domain: impl Into<String>,
        executor: RequestExecutor,
        config: StoreConfig,
    ) -> Result<CacheStore> {
        let domain = domain.into();
        let mut stores = self.inner.stores.write();

        if stores
            .get(&domain)
            .is_some_and(|existing| existing.strong_count() > 0)
        {
            return Err(CacheError::DomainAlreadyMounted(domain));
        }

        let store = CacheStore::new(domain.clone(), executor, self.clone(), config);
        stores.insert(domain.clone(), Arc::downgrade(store.shared()));
        debug!(domain = %domain, "Domain store mounted");
        Ok(store)
    }

    /// Handle to the live store for `domain`, mounting one if there is none.
    pub fn attach(
        &self,
        domain: impl Into<String>,
        executor: RequestExecutor,
        config: StoreConfig,
    ) -> CacheStore {
        let domain = domain.into();
        let mut stores = self.inner.stores.write();

        if let Some(existing) = stores.get(&domain).and_then(Weak::upgrade) {
            return CacheStore::from_shared(existing);
        }

        let store = CacheStore::new(domain.clone(), executor, self.clone(), config);
        stores.insert(domain.clone(), Arc::downgrade(store.shared()));
        debug!(domain = %domain, "Domain store mounted");
        store
    }

    /// Whether a live store is mounted for `domain`.
    pub fn is_mounted(&self, domain: &str) -> bool {
        self.active_store(domain).is_some()
    }

    /// Domains with a live store, sorted.
    pub fn mounted_domains(&self) -> Vec<String> {
        let stores = self.inner.stores.read();
        let mut domains: Vec<String> = stores
            .iter()
            .filter(|(_, store)| store.strong_count() > 0)
            .map(|(domain, _)| domain.clone())
            .collect();
        domains.sort();
        domains
    }

    fn active_store(&self, domain: &str) -> Option<Arc<StoreShared>> {
        self.inner.stores.read().get(domain).and_then(Weak::upgrade)
    }

    /// Apply every rule matching `event`.
    ///
    /// All invalidations have happened when this returns, so a read issued
    /// after the publishing write completes observes them.
    pub fn publish(&self, event: &InvalidationEvent) -> PublishReport {
        let counters = &self.inner.counters;
        counters.events_published.fetch_add(1, Ordering::Relaxed);

        let mut report = PublishReport::default();
        for rule in self.inner.rules.iter().filter(|r| r.matches(event)) {
            report.rules_matched += 1;

            let Some(target) = self.active_store(&rule.target_domain) else {
                trace!(
                    target_domain = %rule.target_domain,
                    "Rule target not mounted, skipping"
                );
                continue;
            };

            report.targets_reached += 1;
            report.entries_invalidated += target.invalidate(&rule.target_tag);
            debug!(
                source = %event.source_domain,
                action = %event.action,
                target = target.domain(),
                tag = %rule.target_tag,
                "Applied invalidation rule"
            );
        }

        counters
            .rules_matched
            .fetch_add(report.rules_matched as u64, Ordering::Relaxed);
        counters
            .targets_reached
            .fetch_add(report.targets_reached as u64, Ordering::Relaxed);
        counters
            .entries_invalidated
            .fetch_add(report.entries_invalidated as u64, Ordering::Relaxed);

        report
    }

    /// Get bus statistics.
    pub fn stats(&self) -> BusStats {
        let c = &self.inner.counters;
        BusStats {
            events_published: c.events_published.load(Ordering::Relaxed),
            rules_matched: c.rules_matched.load(Ordering::Relaxed),
            targets_reached: c.targets_reached.load(Ordering::Relaxed),
            entries_invalidated: c.entries_invalidated.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use medflow_client::{
        Method, MockTransport, NoopNavigator, RequestDescriptor, SessionContext,
    };
    use serde_json::json;

    fn executor(mock: &Arc<MockTransport>) -> RequestExecutor {
        let session = Arc::new(SessionContext::in_memory(Arc::new(NoopNavigator), "/login"));
        RequestExecutor::new(mock.clone(), session, "auth/refresh")
    }

    fn approve_rule() -> InvalidationRule {
        InvalidationRule::new(
            "doctor",
            "approve_recommendation",
            "nurse",
            Tag::kind("Recommendation"),
        )
    }

    #[test]
    fn test_rule_validation() {
        assert!(InvalidationBus::new(vec![approve_rule()]).is_ok());

        let bad = InvalidationRule::new("", "approve", "nurse", Tag::kind("Recommendation"));
        assert!(matches!(
            InvalidationBus::new(vec![bad]),
            Err(CacheError::InvalidRule(_))
        ));

        let parsed =
            InvalidationRule::parse("doctor", "approve", "nurse", "Recommendation:R1").unwrap();
        assert_eq!(parsed.target_tag, Tag::id("Recommendation", "R1"));
        assert!(InvalidationRule::parse("doctor", "approve", "nurse", "").is_err());
    }

    #[test]
    fn test_mount_registers_and_drop_unmounts() {
        let mock = Arc::new(MockTransport::new());
        let bus = InvalidationBus::empty();

        let store = bus
            .mount("nurse", executor(&mock), StoreConfig::default())
            .unwrap();
        assert!(bus.is_mounted("nurse"));
        assert!(matches!(
            bus.mount("nurse", executor(&mock), StoreConfig::default()),
            Err(CacheError::DomainAlreadyMounted(_))
        ));

        let clone = store.clone();
        drop(store);
        assert!(bus.is_mounted("nurse"));
        drop(clone);
        assert!(!bus.is_mounted("nurse"));

        let attached = bus.attach("nurse", executor(&mock), StoreConfig::default());
        let again = bus.attach("nurse", executor(&mock), StoreConfig::default());
        assert_eq!(bus.mounted_domains(), vec!["nurse".to_string()]);
        assert_eq!(attached.stats().capacity, again.stats().capacity);
        drop(attached);
        drop(again);

        let remounted = bus
            .mount("nurse", executor(&mock), StoreConfig::default())
            .unwrap();
        assert!(remounted.is_empty());
        assert_eq!(bus.mounted_domains(), vec!["nurse".to_string()]);
    }

    #[test]
    fn test_empty_bus_matches_nothing() {
        let bus = InvalidationBus::empty();
        assert!(bus.rules().is_empty());

        let report = bus.publish(&InvalidationEvent::new("doctor", "approve_recommendation"));
        assert_eq!(report, PublishReport::default());
        assert_eq!(bus.stats().events_published, 1);
    }

    #[test]
    fn test_publish_to_unmounted_target_is_noop() {
        let bus = InvalidationBus::new(vec![approve_rule()]).unwrap();
        let report = bus.publish(&InvalidationEvent::new("doctor", "approve_recommendation"));

        assert_eq!(report.rules_matched, 1);
        assert_eq!(report.targets_reached, 0);
        assert_eq!(report.entries_invalidated, 0);
    }

    #[tokio::test]
    async fn test_publish_invalidates_target_domain_only() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(Method::Get, "nurse/recommendations/pending", 200, json!([]));
        mock.respond(Method::Get, "doctor/recommendations", 200, json!([]));

        let bus = InvalidationBus::new(vec![approve_rule()]).unwrap();
        let nurse = bus
            .mount("nurse", executor(&mock), StoreConfig::default())
            .unwrap();
        let doctor = bus
            .mount("doctor", executor(&mock), StoreConfig::default())
            .unwrap();

        let pending = RequestDescriptor::get("nurse/recommendations/pending");
        let doctor_list = RequestDescriptor::get("doctor/recommendations");
        let tags = [Tag::kind("Recommendation")];
        nurse.read(&pending, &tags).await.unwrap();
        doctor.read(&doctor_list, &tags).await.unwrap();

        let report = bus.publish(&InvalidationEvent::new("doctor", "approve_recommendation"));

        assert_eq!(
            report,
            PublishReport {
                rules_matched: 1,
                targets_reached: 1,
                entries_invalidated: 1,
            }
        );
        assert!(!nurse.contains_fresh(&pending));
        // The rule targets the nurse domain; the doctor's own entry is untouched.
        assert!(doctor.contains_fresh(&doctor_list));
    }

    #[tokio::test]
    async fn test_unmatched_event_changes_nothing() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(Method::Get, "nurse/recommendations/pending", 200, json!([]));

        let bus = InvalidationBus::new(vec![approve_rule()]).unwrap();
        let nurse = bus
            .mount("nurse", executor(&mock), StoreConfig::default())
            .unwrap();
        let pending = RequestDescriptor::get("nurse/recommendations/pending");
        nurse
            .read(&pending, &[Tag::kind("Recommendation")])
            .await
            .unwrap();

        let report = bus.publish(&InvalidationEvent::new("doctor", "update_profile"));
        assert_eq!(report, PublishReport::default());
        assert!(nurse.contains_fresh(&pending));

        let stats = bus.stats();
        assert_eq!(stats.events_published, 1);
        assert_eq!(stats.rules_matched, 0);
    }
}
