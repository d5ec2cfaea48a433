//! Configuration management subsystem.
//!
//! Two kinds of configuration live here:
//! - daemon [`Settings`], TOML, read once at startup
//! - the persisted proxy [`ConfigTree`], JSON, edited at runtime
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Settings (immutable)
//!
//! Operator edit:
//!     transforms.rs (pure tree → tree)
//!     → store.rs (serialize, atomic write, commit hook under the lock)
//!
//! External edit:
//!     watcher.rs detects change
//!     → store.rs reload_and (skips the store's own writes)
//!     → admin service reapplies flags and restarts the pool
//! ```

pub mod loader;
pub mod schema;
pub mod store;
pub mod transforms;
pub mod tree;
pub mod validation;
pub mod watcher;

pub use loader::{load_settings, ConfigError};
pub use schema::Settings;
pub use store::{ConfigStore, StoreError};
pub use tree::ConfigTree;
pub use watcher::ConfigWatcher;
