//! Feature flags shared with the routing subsystem.
//!
//! # Design Decisions
//! - One explicit `FeatureFlags` value, passed by `Arc`, instead of module globals
//! - Flags change only after the persisted config accepted the same change

pub mod flags;

pub use flags::{FeatureFlag, FeatureFlags, FlagSnapshot};
