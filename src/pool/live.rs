//! Runtime proxy identity.
//!
//! # Responsibilities
//! - Carry the identity the routing subsystem and the stats page need
//!   (proxy id, public name)
//! - Track whether this instance has been marked dead
//!
//! The connection machinery behind an instance lives outside this crate.

use std::sync::atomic::{AtomicBool, Ordering};

/// One constructed member of the live proxy pool.
#[derive(Debug)]
pub struct LiveProxy {
    /// Config id of the private server this was built from; `None` for public pool members.
    pub proxy_id: Option<String>,
    /// Operator-facing name, shared by all instances of one upstream.
    pub public_name: String,
    died: AtomicBool,
}

impl LiveProxy {
    pub fn new(proxy_id: Option<String>, public_name: impl Into<String>) -> Self {
        Self {
            proxy_id,
            public_name: public_name.into(),
            died: AtomicBool::new(false),
        }
    }

    pub fn died(&self) -> bool {
        self.died.load(Ordering::Relaxed)
    }

    /// Report this instance as failed. Returns true on the alive → dead transition.
    pub fn mark_died(&self) -> bool {
        let was_dead = self.died.swap(true, Ordering::Relaxed);
        if !was_dead {
            tracing::warn!(public_name = %self.public_name, proxy_id = ?self.proxy_id, "Proxy marked died");
        }
        !was_dead
    }

    /// Give the instance another chance.
    pub fn revive(&self) {
        self.died.store(false, Ordering::Relaxed);
    }
}
