//! Persisted relay configuration tree.
//!
//! This is the document the admin operations mutate. Keys this crate does not
//! know about are carried through untouched, since other parts of the relay
//! share the same file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::upstream::ProxyDefinition;

/// Root of the persisted configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigTree {
    /// Operator-defined proxies keyed by proxy id.
    pub private_servers: BTreeMap<String, ProxyDefinition>,

    /// Shared public proxy pools.
    pub public_servers: PublicServers,

    pub tcp_scrambler_enabled: bool,
    pub google_scrambler_enabled: bool,
    pub china_shortcut_enabled: bool,
    pub direct_access_enabled: bool,

    /// Newline-delimited host names resolved without the DNS scrambler.
    pub dns_bypass_hosts: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for ConfigTree {
    fn default() -> Self {
        Self {
            private_servers: BTreeMap::new(),
            public_servers: PublicServers::default(),
            tcp_scrambler_enabled: true,
            google_scrambler_enabled: true,
            china_shortcut_enabled: true,
            direct_access_enabled: true,
            dns_bypass_hosts: String::new(),
            extra: serde_json::Map::new(),
        }
    }
}

impl ConfigTree {
    /// Bypass hosts as a list, blank lines dropped.
    pub fn dns_bypass_host_list(&self) -> Vec<String> {
        parse_host_list(&self.dns_bypass_hosts)
    }
}

/// Public pool switches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PublicServers {
    pub goagent_enabled: bool,
    pub ss_enabled: bool,
}

impl Default for PublicServers {
    fn default() -> Self {
        Self {
            goagent_enabled: true,
            ss_enabled: true,
        }
    }
}

pub fn parse_host_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_from_empty_document() {
        let tree: ConfigTree = serde_json::from_value(json!({})).unwrap();
        assert_eq!(tree, ConfigTree::default());
        assert!(tree.public_servers.goagent_enabled);
        assert!(tree.tcp_scrambler_enabled);
    }

    #[test]
    fn test_unknown_keys_preserved() {
        let tree: ConfigTree = serde_json::from_value(json!({
            "http_manager": { "port": 2515 },
            "tcp_scrambler_enabled": false,
            "public_servers": { "ss_enabled": false }
        }))
        .unwrap();
        assert!(!tree.tcp_scrambler_enabled);
        assert!(tree.public_servers.goagent_enabled);
        assert!(!tree.public_servers.ss_enabled);

        let value = serde_json::to_value(&tree).unwrap();
        assert_eq!(value["http_manager"]["port"], 2515);
    }

    #[test]
    fn test_host_list() {
        let tree = ConfigTree {
            dns_bypass_hosts: "a.com\n\n  b.com \r\n".into(),
            ..ConfigTree::default()
        };
        assert_eq!(tree.dns_bypass_host_list(), vec!["a.com", "b.com"]);
    }
}
