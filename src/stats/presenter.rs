//! Operator view of per-upstream traffic.
//!
//! # Responsibilities
//! - Aggregate the registry over the display window
//! - Merge with the live proxy list by public name
//! - Attach human-readable labels
//!
//! # Design Decisions
//! - Recomputed on every call, never cached
//! - Traffic outlives the proxy: a name with counters but no live instance
//!   still shows up until its traffic leaves the window
//! - `died` is OR-combined, one failed instance marks the whole name

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::pool::live::LiveProxy;
use crate::stats::aggregate::{AggregateStat, TrafficStat};
use crate::stats::format::{human_readable_size, speed_label};
use crate::stats::registry::CounterRegistry;

/// One line of the proxies page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewRow {
    pub proxy_id: Option<String>,
    pub died: bool,
    pub rx_speed_value: f64,
    pub rx_speed_label: String,
    pub rx_bytes_value: u64,
    pub rx_bytes_label: String,
    pub tx_speed_value: f64,
    pub tx_speed_label: String,
    pub tx_bytes_value: u64,
    pub tx_bytes_label: String,
}

impl ViewRow {
    fn from_traffic(stat: &TrafficStat, unit_scale: f64) -> Self {
        let rx_speed = stat.rx.rate(unit_scale);
        let tx_speed = stat.tx.rate(unit_scale);
        Self {
            proxy_id: None,
            died: false,
            rx_speed_value: rx_speed,
            rx_speed_label: speed_label(rx_speed),
            rx_bytes_value: stat.rx.bytes,
            rx_bytes_label: human_readable_size(stat.rx.bytes),
            tx_speed_value: tx_speed,
            tx_speed_label: speed_label(tx_speed),
            tx_bytes_value: stat.tx.bytes,
            tx_bytes_label: human_readable_size(stat.tx.bytes),
        }
    }

    fn idle(unit_scale: f64) -> Self {
        Self::from_traffic(
            &TrafficStat {
                rx: AggregateStat::default(),
                tx: AggregateStat::default(),
            },
            unit_scale,
        )
    }
}

/// Rows keyed by public name; iteration order is name order.
pub type ProxyStatsView = BTreeMap<String, ViewRow>;

#[derive(Debug, Clone)]
pub struct StatsPresenter {
    window: Duration,
    unit_scale: f64,
}

impl StatsPresenter {
    pub fn new(window: Duration, unit_scale: f64) -> Self {
        Self { window, unit_scale }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn present(&self, registry: &CounterRegistry, live: &[Arc<LiveProxy>]) -> ProxyStatsView {
        self.present_at(registry, live, Instant::now())
    }

    pub fn present_at(
        &self,
        registry: &CounterRegistry,
        live: &[Arc<LiveProxy>],
        now: Instant,
    ) -> ProxyStatsView {
        let mut view: ProxyStatsView = registry
            .aggregate_groups(self.window, now)
            .iter()
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, stat)| (name.clone(), ViewRow::from_traffic(stat, self.unit_scale)))
            .collect();

        for proxy in live {
            if proxy.public_name.is_empty() {
                continue;
            }
            let died = proxy.died();
            match view.get_mut(&proxy.public_name) {
                Some(row) => {
                    row.died = row.died || died;
                    if proxy.proxy_id.is_some() {
                        row.proxy_id = proxy.proxy_id.clone();
                    }
                }
                None => {
                    let mut row = ViewRow::idle(self.unit_scale);
                    row.proxy_id = proxy.proxy_id.clone();
                    row.died = died;
                    view.insert(proxy.public_name.clone(), row);
                }
            }
        }

        view
    }
}
