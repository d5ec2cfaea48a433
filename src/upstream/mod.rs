//! Upstream proxy definitions.
//!
//! # Data Flow
//! ```text
//! form fields (untyped key/value)
//!     → validator.rs (presence, defaults, coercion)
//!     → definition.rs (ProxyDefinition, one case per proxy type)
//!     → config tree `private_servers[proxy_id]`
//!
//! Rejections:
//!     → ValidationError → i18n.rs (English / Chinese message)
//! ```

pub mod definition;
pub mod i18n;
pub mod validator;

pub use definition::{ProxyDefinition, ProxyType};
pub use i18n::{Lang, LocalizedMessage};
pub use validator::{validate, Field, RawFields, ValidationError};
