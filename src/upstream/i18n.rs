//! Language-tagged operator messages.

use axum::http::{header, HeaderMap};

/// Language an operator-facing message is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    #[default]
    En,
    Zh,
}

impl Lang {
    /// Pick the language from an `Accept-Language` header.
    ///
    /// A header whose first (preferred) tag is Chinese, e.g. `zh-CN,en;q=0.8`,
    /// selects `Zh`. Anything else, including Chinese only as a lower-priority
    /// alternative, falls back to English.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                if v.to_ascii_lowercase().trim_start().starts_with("zh") {
                    Lang::Zh
                } else {
                    Lang::En
                }
            })
            .unwrap_or_default()
    }
}

/// A message carried in both supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalizedMessage {
    pub en: &'static str,
    pub zh: &'static str,
}

impl LocalizedMessage {
    pub const fn new(en: &'static str, zh: &'static str) -> Self {
        Self { en, zh }
    }

    pub fn select(&self, lang: Lang) -> &'static str {
        match lang {
            Lang::En => self.en,
            Lang::Zh => self.zh,
        }
    }
}
