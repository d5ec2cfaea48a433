//! Per-connection traffic counter.
//!
//! # Responsibilities
//! - Record timestamped byte samples for both directions
//! - Answer "how many bytes, over how many active seconds" for a time range
//! - Track open/closed state of the underlying connection
//!
//! # Design Decisions
//! - Each sample remembers when the previous sample of its direction landed;
//!   that span is the time the connection spent producing those bytes
//! - Timestamps never go backwards; an older stamp is clamped to the last one
//! - Ranges are half-open `(start, end]`, so adjacent ranges never double count

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::stats::aggregate::{AggregateStat, Direction};

#[derive(Debug, Clone, Copy)]
struct Sample {
    since: Instant,
    at: Instant,
    bytes: u64,
}

#[derive(Debug)]
struct Series {
    samples: VecDeque<Sample>,
    last_at: Instant,
}

impl Series {
    fn new(opened_at: Instant) -> Self {
        Self {
            samples: VecDeque::new(),
            last_at: opened_at,
        }
    }

    fn record(&mut self, bytes: u64, at: Instant) {
        let at = at.max(self.last_at);
        self.samples.push_back(Sample {
            since: self.last_at,
            at,
            bytes,
        });
        self.last_at = at;
    }

    fn total(&self, start: Option<Instant>, end: Instant) -> AggregateStat {
        let mut stat = AggregateStat::default();
        for s in &self.samples {
            let in_range = s.at <= end && start.map_or(true, |start| s.at > start);
            if in_range {
                stat.bytes += s.bytes;
            }
            let from = start.map_or(s.since, |start| s.since.max(start));
            let to = s.at.min(end);
            if to > from {
                stat.active_secs += (to - from).as_secs_f64();
            }
        }
        stat
    }

    fn trim_before(&mut self, cutoff: Instant) {
        while self.samples.front().is_some_and(|s| s.at <= cutoff) {
            self.samples.pop_front();
        }
    }
}

#[derive(Debug)]
struct CounterState {
    rx: Series,
    tx: Series,
    closed_at: Option<Instant>,
}

/// Traffic accounting for one connection to one upstream.
#[derive(Debug)]
pub struct Counter {
    id: u64,
    public_name: String,
    opened_at: Instant,
    state: Mutex<CounterState>,
}

impl Counter {
    pub fn new(id: u64, public_name: impl Into<String>, opened_at: Instant) -> Self {
        Self {
            id,
            public_name: public_name.into(),
            opened_at,
            state: Mutex::new(CounterState {
                rx: Series::new(opened_at),
                tx: Series::new(opened_at),
                closed_at: None,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn public_name(&self) -> &str {
        &self.public_name
    }

    pub fn opened_at(&self) -> Instant {
        self.opened_at
    }

    fn state(&self) -> MutexGuard<'_, CounterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_rx(&self, bytes: u64) {
        self.record_at(Direction::Rx, bytes, Instant::now());
    }

    pub fn record_tx(&self, bytes: u64) {
        self.record_at(Direction::Tx, bytes, Instant::now());
    }

    pub fn record_at(&self, direction: Direction, bytes: u64, at: Instant) {
        let mut state = self.state();
        match direction {
            Direction::Rx => state.rx.record(bytes, at),
            Direction::Tx => state.tx.record(bytes, at),
        }
    }

    /// Bytes and active seconds in `(start, end]`; `None` start means unbounded.
    pub fn total(&self, direction: Direction, start: Option<Instant>, end: Instant) -> AggregateStat {
        let state = self.state();
        match direction {
            Direction::Rx => state.rx.total(start, end),
            Direction::Tx => state.tx.total(start, end),
        }
    }

    pub fn close_at(&self, at: Instant) {
        let mut state = self.state();
        if state.closed_at.is_none() {
            state.closed_at = Some(at.max(self.opened_at));
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed_at.is_some()
    }

    /// Most recent instant anything happened on this counter.
    pub fn last_activity(&self) -> Instant {
        let state = self.state();
        let mut last = state.rx.last_at.max(state.tx.last_at);
        if let Some(closed) = state.closed_at {
            last = last.max(closed);
        }
        last
    }

    /// Drop samples that can no longer fall inside a window of `retention`.
    ///
    /// Returns true when the counter is closed and fully aged out.
    pub(crate) fn expire(&self, now: Instant, retention: Duration) -> bool {
        let Some(cutoff) = now.checked_sub(retention) else {
            return false;
        };
        let mut state = self.state();
        state.rx.trim_before(cutoff);
        state.tx.trim_before(cutoff);
        match state.closed_at {
            Some(closed) => {
                let last = state.rx.last_at.max(state.tx.last_at).max(closed);
                last <= cutoff
            }
            None => false,
        }
    }
}

/// Handle held by the connection layer; closes the counter when dropped.
#[derive(Debug)]
pub struct CounterGuard {
    counter: Arc<Counter>,
}

impl CounterGuard {
    pub(crate) fn new(counter: Arc<Counter>) -> Self {
        Self { counter }
    }

    pub fn counter(&self) -> &Arc<Counter> {
        &self.counter
    }
}

impl Deref for CounterGuard {
    type Target = Counter;
    fn deref(&self) -> &Self::Target {
        &self.counter
    }
}

impl Drop for CounterGuard {
    fn drop(&mut self) {
        self.counter.close_at(Instant::now());
    }
}
