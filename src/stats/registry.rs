//! Process-wide registry of live traffic counters.
//!
//! # Responsibilities
//! - Hand out counters to the connection layer, grouped by upstream public name
//! - Aggregate a group over a trailing window on demand
//! - Age out closed counters once no window can see them any more
//!
//! # Design Decisions
//! - No running sums: every query scans the group, so retiring a counter
//!   mid-window never needs a matching decrement
//! - A scan works on a snapshot of group membership; counters opened after
//!   the snapshot are simply not seen by that scan
//! - Groups are keyed by public name, not proxy id, so every instance of a
//!   shared identity (public pools, multi-connection SSH) adds up together

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use crate::observability::metrics;
use crate::stats::aggregate::{AggregateStat, Direction, TrafficStat};
use crate::stats::counter::{Counter, CounterGuard};

#[derive(Debug)]
pub struct CounterRegistry {
    groups: DashMap<String, Vec<Arc<Counter>>>,
    next_id: AtomicU64,
    retention: Duration,
}

impl CounterRegistry {
    /// `retention` is the longest window this registry will be asked about.
    pub fn new(retention: Duration) -> Self {
        Self {
            groups: DashMap::new(),
            next_id: AtomicU64::new(1),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Start accounting a new connection to `public_name`.
    pub fn open(&self, public_name: &str) -> CounterGuard {
        self.open_at(public_name, Instant::now())
    }

    pub fn open_at(&self, public_name: &str, opened_at: Instant) -> CounterGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let counter = Arc::new(Counter::new(id, public_name, opened_at));
        self.groups
            .entry(public_name.to_string())
            .or_default()
            .push(counter.clone());
        metrics::record_counter_opened();
        tracing::trace!(counter_id = id, public_name, "Counter opened");
        CounterGuard::new(counter)
    }

    fn members(&self, public_name: &str) -> Vec<Arc<Counter>> {
        self.groups
            .get(public_name)
            .map(|g| g.value().clone())
            .unwrap_or_default()
    }

    /// Traffic of `public_name` over the trailing `window` ending now.
    pub fn aggregate(&self, public_name: &str, window: Duration, direction: Direction) -> AggregateStat {
        self.aggregate_at(public_name, window, direction, Instant::now())
    }

    pub fn aggregate_at(
        &self,
        public_name: &str,
        window: Duration,
        direction: Direction,
        now: Instant,
    ) -> AggregateStat {
        self.aggregate_between(public_name, now.checked_sub(window), now, direction)
    }

    /// Traffic of `public_name` in `(start, end]`.
    pub fn aggregate_between(
        &self,
        public_name: &str,
        start: Option<Instant>,
        end: Instant,
        direction: Direction,
    ) -> AggregateStat {
        self.members(public_name)
            .iter()
            .map(|c| c.total(direction, start, end))
            .sum()
    }

    /// Both directions for every known group, keyed and sorted by public name.
    pub fn aggregate_groups(&self, window: Duration, now: Instant) -> BTreeMap<String, TrafficStat> {
        let snapshot: Vec<(String, Vec<Arc<Counter>>)> = self
            .groups
            .iter()
            .map(|g| (g.key().clone(), g.value().clone()))
            .collect();

        let start = now.checked_sub(window);
        snapshot
            .into_iter()
            .map(|(name, counters)| {
                let mut stat = TrafficStat::default();
                for c in &counters {
                    stat.rx.merge(c.total(Direction::Rx, start, now));
                    stat.tx.merge(c.total(Direction::Tx, start, now));
                }
                (name, stat)
            })
            .collect()
    }

    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.iter().map(|g| g.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of registered counters across all groups.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every counter. Guards still held by connections keep working
    /// but no longer contribute to any aggregate.
    pub fn clear(&self) {
        self.groups.clear();
    }

    /// Trim old samples and drop aged-out counters. Returns how many were dropped.
    pub fn prune_at(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.groups.retain(|_, counters| {
            let before = counters.len();
            counters.retain(|c| !c.expire(now, self.retention));
            removed += before - counters.len();
            !counters.is_empty()
        });
        if removed > 0 {
            metrics::record_counters_pruned(removed);
            tracing::debug!(removed, "Pruned expired counters");
        }
        removed
    }

    /// Prune periodically until shutdown.
    pub async fn run_pruner(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.prune_at(Instant::now());
                }
                _ = shutdown.recv() => {
                    tracing::info!("Counter pruner received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_two_connections_same_upstream() {
        let t0 = Instant::now();
        let registry = CounterRegistry::new(secs(600));

        let a1 = registry.open_at("A", t0 + secs(1));
        let a2 = registry.open_at("A", t0 + secs(2));
        a1.record_at(Direction::Rx, 1024, t0 + secs(6));
        a2.record_at(Direction::Rx, 1024, t0 + secs(7));

        let stat = registry.aggregate_at("A", secs(600), Direction::Rx, t0 + secs(10));
        assert_eq!(stat.bytes, 2048);
        assert!((stat.active_secs - 10.0).abs() < 1e-9);
        assert_eq!(registry.aggregate_at("A", secs(600), Direction::Tx, t0 + secs(10)).bytes, 0);
    }

    #[test]
    fn test_unknown_group_is_zero() {
        let registry = CounterRegistry::new(secs(600));
        let stat = registry.aggregate("nobody", secs(600), Direction::Rx);
        assert_eq!(stat, AggregateStat::default());
        assert_eq!(stat.rate(1000.0), 0.0);
    }

    #[test]
    fn test_order_independent() {
        let t0 = Instant::now();
        let samples = [(1u64, 300u64), (3, 700), (4, 50), (8, 9000)];

        let forward = CounterRegistry::new(secs(600));
        let reverse = CounterRegistry::new(secs(600));
        let mut guards = Vec::new();
        for (at, bytes) in samples {
            let g = forward.open_at("A", t0);
            g.record_at(Direction::Tx, bytes, t0 + secs(at));
            guards.push(g);
        }
        for (at, bytes) in samples.into_iter().rev() {
            let g = reverse.open_at("A", t0);
            g.record_at(Direction::Tx, bytes, t0 + secs(at));
            guards.push(g);
        }

        let now = t0 + secs(20);
        let f = forward.aggregate_at("A", secs(600), Direction::Tx, now);
        let r = reverse.aggregate_at("A", secs(600), Direction::Tx, now);
        assert_eq!(f.bytes, r.bytes);
        assert!((f.active_secs - r.active_secs).abs() < 1e-9);
    }

    #[test]
    fn test_partitioned_window_is_additive() {
        let t0 = Instant::now() + secs(1000);
        let registry = CounterRegistry::new(secs(600));
        let c = registry.open_at("A", t0);
        for i in 1..=20u64 {
            c.record_at(Direction::Rx, i * 10, t0 + secs(i * 3));
        }

        let start = t0 + secs(5);
        let mid = t0 + secs(31);
        let end = t0 + secs(50);
        let whole = registry.aggregate_between("A", Some(start), end, Direction::Rx);
        let left = registry.aggregate_between("A", Some(start), mid, Direction::Rx);
        let right = registry.aggregate_between("A", Some(mid), end, Direction::Rx);

        assert_eq!(whole.bytes, left.bytes + right.bytes);
        assert!((whole.active_secs - (left.active_secs + right.active_secs)).abs() < 1e-9);
    }

    #[test]
    fn test_closed_counter_still_counts_until_pruned() {
        let t0 = Instant::now();
        let registry = CounterRegistry::new(secs(60));
        {
            let g = registry.open_at("A", t0);
            g.record_at(Direction::Rx, 500, t0 + secs(2));
            g.close_at(t0 + secs(3));
        }
        assert_eq!(registry.aggregate_at("A", secs(60), Direction::Rx, t0 + secs(30)).bytes, 500);

        assert_eq!(registry.prune_at(t0 + secs(30)), 0);
        assert_eq!(registry.len(), 1);

        let late = t0 + secs(120);
        assert_eq!(registry.prune_at(late), 1);
        assert!(registry.is_empty());
        assert!(registry.group_names().is_empty());
    }

    #[test]
    fn test_aggregate_groups_and_clear() {
        let t0 = Instant::now();
        let registry = CounterRegistry::new(secs(600));
        let b = registry.open_at("B", t0);
        let a = registry.open_at("A", t0);
        a.record_at(Direction::Rx, 10, t0 + secs(1));
        b.record_at(Direction::Tx, 20, t0 + secs(1));

        let groups = registry.aggregate_groups(secs(600), t0 + secs(5));
        let names: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(groups["A"].rx.bytes, 10);
        assert_eq!(groups["B"].tx.bytes, 20);

        registry.clear();
        assert!(registry.is_empty());
        // a guard that outlived the clear keeps recording without effect
        a.record_at(Direction::Rx, 10, t0 + secs(2));
        assert_eq!(registry.aggregate_at("A", secs(600), Direction::Rx, t0 + secs(5)).bytes, 0);
    }
}
