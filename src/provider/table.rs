//! Collector Table
//!
//! Concurrent map from [`CollectorId`] to live collectors. Entries keep their
//! insertion order so listings are stable. Mutations take a single write lock
//! and never hold it across a backend call: an entry is detached first, then
//! closed. Once drained by [`CollectorTable::remove_all`] the table is closed
//! and refuses further inserts.

use crate::domain::ports::{CollectorId, CollectorInstanceRef};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use prometheus::IntGauge;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

// =============================================================================
// Collector
// =============================================================================

/// A registered collector
pub struct Collector {
    /// Table key
    pub id: CollectorId,
    /// Name of the backend that created the instance
    pub backend: String,
    /// Backend instance, exclusively owned by this entry
    pub instance: CollectorInstanceRef,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

impl Collector {
    pub fn new(id: CollectorId, backend: impl Into<String>, instance: CollectorInstanceRef) -> Self {
        Self {
            id,
            backend: backend.into(),
            instance,
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("id", &self.id)
            .field("backend", &self.backend)
            .field("created_at", &self.created_at)
            .finish()
    }
}

// =============================================================================
// Table Statistics
// =============================================================================

/// Lifetime counters of a table
#[derive(Debug, Default)]
pub struct TableStats {
    pub inserted: AtomicU64,
    pub removed: AtomicU64,
    pub close_failures: AtomicU64,
}

/// Snapshot of [`TableStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStatsSnapshot {
    pub live: u64,
    pub inserted: u64,
    pub removed: u64,
    pub close_failures: u64,
}

// =============================================================================
// Collector Table
// =============================================================================

/// Insertion-ordered, lock-protected collector registry
#[derive(Default)]
pub struct CollectorTable {
    entries: RwLock<IndexMap<CollectorId, Arc<Collector>>>,
    /// Only written while holding the `entries` write lock
    closed: AtomicBool,
    /// Tracks the live count, updated under the write lock
    live_gauge: Option<IntGauge>,
    stats: TableStats,
}

impl CollectorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table publishing its size to `gauge` on every mutation
    pub fn with_gauge(gauge: Option<IntGauge>) -> Self {
        if let Some(gauge) = &gauge {
            gauge.set(0);
        }
        Self {
            live_gauge: gauge,
            ..Self::default()
        }
    }

    fn publish(&self, live: usize) {
        if let Some(gauge) = &self.live_gauge {
            gauge.set(live as i64);
        }
    }

    /// Insert a collector unless its id is already present or the table
    /// has been closed
    pub fn insert(&self, collector: Collector) -> Result<Arc<Collector>> {
        let mut entries = self.entries.write();
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::TableClosed);
        }
        if entries.contains_key(&collector.id) {
            return Err(Error::CollectorExists {
                id: collector.id.to_string(),
            });
        }
        let collector = Arc::new(collector);
        entries.insert(collector.id, collector.clone());
        self.publish(entries.len());
        self.stats.inserted.fetch_add(1, Ordering::Relaxed);
        Ok(collector)
    }

    /// Look up a collector
    pub fn get(&self, id: &CollectorId) -> Option<Arc<Collector>> {
        self.entries.read().get(id).cloned()
    }

    pub fn contains(&self, id: &CollectorId) -> bool {
        self.entries.read().contains_key(id)
    }

    /// Detach a collector without closing it
    pub fn take(&self, id: &CollectorId) -> Option<Arc<Collector>> {
        let mut entries = self.entries.write();
        let removed = entries.shift_remove(id);
        if removed.is_some() {
            self.publish(entries.len());
            self.stats.removed.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Detach a collector and optionally close its instance.
    ///
    /// The entry is gone once this returns, whatever `close` reports; the
    /// close result is what gets returned.
    pub async fn remove(&self, id: &CollectorId, run_close: bool) -> Result<()> {
        let collector = self.take(id).ok_or_else(|| Error::CollectorNotFound {
            id: id.to_string(),
        })?;
        if !run_close {
            return Ok(());
        }
        collector.instance.close().await.map_err(|e| {
            self.stats.close_failures.fetch_add(1, Ordering::Relaxed);
            e
        })
    }

    /// Close the table, then detach and close every collector, returning how
    /// many were removed. Close failures are logged and skipped.
    pub async fn remove_all(&self) -> usize {
        let drained: Vec<Arc<Collector>> = {
            let mut entries = self.entries.write();
            self.closed.store(true, Ordering::Release);
            let drained = entries.drain(..).map(|(_, c)| c).collect();
            self.publish(0);
            drained
        };
        self.stats
            .removed
            .fetch_add(drained.len() as u64, Ordering::Relaxed);

        for collector in &drained {
            if let Err(e) = collector.instance.close().await {
                self.stats.close_failures.fetch_add(1, Ordering::Relaxed);
                warn!(collector = %collector.id, error = %e, "Failed to close collector during teardown");
            }
        }
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`remove_all`](Self::remove_all) has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Up to `limit` ids, oldest first
    pub fn list(&self, limit: usize) -> Vec<CollectorId> {
        self.entries.read().keys().take(limit).copied().collect()
    }

    pub fn stats(&self) -> TableStatsSnapshot {
        TableStatsSnapshot {
            live: self.len() as u64,
            inserted: self.stats.inserted.load(Ordering::Relaxed),
            removed: self.stats.removed.load(Ordering::Relaxed),
            close_failures: self.stats.close_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::CollectorInstance;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Probe {
        closes: AtomicUsize,
        fail_close: bool,
    }

    #[async_trait]
    impl CollectorInstance for Probe {
        async fn close(&self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                return Err(Error::Internal("close failed".into()));
            }
            Ok(())
        }

        async fn destroy(&self) -> Result<()> {
            Ok(())
        }

        async fn hello(&self) {}

        async fn sum(&self, x: i32, y: i32) -> Result<i32> {
            Ok(x + y)
        }
    }

    fn probe_collector(fail_close: bool) -> (Collector, Arc<Probe>) {
        let probe = Arc::new(Probe {
            fail_close,
            ..Default::default()
        });
        let collector = Collector::new(CollectorId::generate(), "probe", probe.clone());
        (collector, probe)
    }

    #[test]
    fn test_insert_and_get() {
        let table = CollectorTable::new();
        let (collector, _) = probe_collector(false);
        let id = collector.id;

        table.insert(collector).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&id).unwrap().backend, "probe");
        assert!(table.get(&CollectorId::generate()).is_none());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let table = CollectorTable::new();
        let (first, probe) = probe_collector(false);
        let id = first.id;
        table.insert(first).unwrap();

        let dup = Collector::new(id, "probe", probe);
        assert_matches!(table.insert(dup), Err(Error::CollectorExists { .. }));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_runs_close_only_when_asked() {
        let table = CollectorTable::new();

        let (a, probe_a) = probe_collector(false);
        let (b, probe_b) = probe_collector(false);
        let (id_a, id_b) = (a.id, b.id);
        table.insert(a).unwrap();
        table.insert(b).unwrap();

        table.remove(&id_a, true).await.unwrap();
        table.remove(&id_b, false).await.unwrap();
        assert_eq!(probe_a.closes.load(Ordering::SeqCst), 1);
        assert_eq!(probe_b.closes.load(Ordering::SeqCst), 0);
        assert!(table.is_empty());

        assert_matches!(
            table.remove(&id_a, true).await,
            Err(Error::CollectorNotFound { .. })
        );
    }

    #[tokio::test]
    async fn test_failed_close_still_removes() {
        let table = CollectorTable::new();
        let (collector, _) = probe_collector(true);
        let id = collector.id;
        table.insert(collector).unwrap();

        assert!(table.remove(&id, true).await.is_err());
        assert!(!table.contains(&id));
        assert_eq!(table.stats().close_failures, 1);
    }

    #[tokio::test]
    async fn test_remove_all_closes_everything() {
        let table = CollectorTable::new();
        let mut probes = Vec::new();
        for i in 0..5 {
            let (collector, probe) = probe_collector(i == 2);
            table.insert(collector).unwrap();
            probes.push(probe);
        }

        assert_eq!(table.remove_all().await, 5);
        assert!(table.is_empty());
        for probe in probes {
            assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
        }
        let stats = table.stats();
        assert_eq!(stats.inserted, 5);
        assert_eq!(stats.removed, 5);
        assert_eq!(stats.close_failures, 1);
    }

    #[tokio::test]
    async fn test_closed_table_refuses_inserts() {
        let table = CollectorTable::new();
        let (collector, _) = probe_collector(false);
        table.insert(collector).unwrap();

        assert_eq!(table.remove_all().await, 1);
        assert!(table.is_closed());

        let (late, probe) = probe_collector(false);
        assert_matches!(table.insert(late), Err(Error::TableClosed));
        assert!(table.is_empty());
        assert_eq!(probe.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_gauge_follows_mutations() {
        let gauge = IntGauge::new("test_live_collectors", "live collectors").unwrap();
        let table = CollectorTable::with_gauge(Some(gauge.clone()));

        let mut ids = Vec::new();
        for _ in 0..3 {
            let (collector, _) = probe_collector(false);
            ids.push(collector.id);
            table.insert(collector).unwrap();
        }
        assert_eq!(gauge.get(), 3);

        table.take(&ids[0]);
        assert_eq!(gauge.get(), 2);
        table.remove(&ids[1], true).await.unwrap();
        assert_eq!(gauge.get(), 1);
        table.remove_all().await;
        assert_eq!(gauge.get(), 0);
    }

    #[test]
    fn test_gauge_consistent_under_concurrency() {
        let gauge = IntGauge::new("test_live_concurrent", "live collectors").unwrap();
        let table = Arc::new(CollectorTable::with_gauge(Some(gauge.clone())));
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let table = table.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let (collector, _) = probe_collector(false);
                        let id = collector.id;
                        table.insert(collector).unwrap();
                        if i % 2 == 0 {
                            table.take(&id);
                        }
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(table.len(), 400);
        assert_eq!(gauge.get(), 400);
    }

    #[test]
    fn test_list_keeps_insertion_order_and_limit() {
        let table = CollectorTable::new();
        let mut ids = Vec::new();
        for _ in 0..4 {
            let (collector, _) = probe_collector(false);
            ids.push(collector.id);
            table.insert(collector).unwrap();
        }

        assert_eq!(table.list(10), ids);
        assert_eq!(table.list(2), ids[..2].to_vec());
        assert!(table.list(0).is_empty());

        table.take(&ids[1]);
        assert_eq!(table.list(10), vec![ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn test_concurrent_inserts() {
        let table = Arc::new(CollectorTable::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let table = table.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let (collector, _) = probe_collector(false);
                        table.insert(collector).unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(table.len(), 800);
        assert_eq!(table.list(usize::MAX).len(), 800);
    }
}
