//! Aggregated traffic figures.

use serde::Serialize;

/// Default divisor turning bytes/second into the displayed KB/s.
pub const DEFAULT_RATE_UNIT_SCALE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Rx,
    Tx,
}

/// Bytes moved and seconds spent moving them, summed over some counters.
///
/// An empty window is not an error; it is simply the zero value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateStat {
    pub bytes: u64,
    pub active_secs: f64,
}

impl AggregateStat {
    /// `bytes / (active_secs * unit_scale)`, or 0 when nothing was active.
    pub fn rate(&self, unit_scale: f64) -> f64 {
        if self.active_secs <= 0.0 || unit_scale <= 0.0 {
            return 0.0;
        }
        self.bytes as f64 / (self.active_secs * unit_scale)
    }

    pub fn merge(&mut self, other: AggregateStat) {
        self.bytes += other.bytes;
        self.active_secs += other.active_secs;
    }
}

impl std::iter::Sum for AggregateStat {
    fn sum<I: Iterator<Item = AggregateStat>>(iter: I) -> Self {
        iter.fold(AggregateStat::default(), |mut acc, s| {
            acc.merge(s);
            acc
        })
    }
}

/// Both directions for one upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TrafficStat {
    pub rx: AggregateStat,
    pub tx: AggregateStat,
}
