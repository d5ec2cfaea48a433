//! In-memory feature flags read by the routing subsystem.

use arc_swap::ArcSwap;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::tree::{parse_host_list, ConfigTree};

/// A persisted boolean controlling an optional routing behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFlag {
    TcpScrambler,
    GoogleScrambler,
    ChinaShortcut,
    DirectAccess,
    GoagentPublicServers,
    ShadowsocksPublicServers,
}

impl FeatureFlag {
    pub const ALL: [FeatureFlag; 6] = [
        FeatureFlag::TcpScrambler,
        FeatureFlag::GoogleScrambler,
        FeatureFlag::ChinaShortcut,
        FeatureFlag::DirectAccess,
        FeatureFlag::GoagentPublicServers,
        FeatureFlag::ShadowsocksPublicServers,
    ];

    /// URL path segment used by the admin API.
    pub fn slug(&self) -> &'static str {
        match self {
            FeatureFlag::TcpScrambler => "tcp-scrambler",
            FeatureFlag::GoogleScrambler => "google-scrambler",
            FeatureFlag::ChinaShortcut => "china-shortcut",
            FeatureFlag::DirectAccess => "direct-access",
            FeatureFlag::GoagentPublicServers => "goagent-public-servers",
            FeatureFlag::ShadowsocksPublicServers => "ss-public-servers",
        }
    }

    /// Public pool switches change which proxies exist, so the pool is rebuilt.
    pub fn requires_restart(&self) -> bool {
        matches!(
            self,
            FeatureFlag::GoagentPublicServers | FeatureFlag::ShadowsocksPublicServers
        )
    }

    /// Value of this flag in a persisted tree.
    pub fn get_in(&self, tree: &ConfigTree) -> bool {
        match self {
            FeatureFlag::TcpScrambler => tree.tcp_scrambler_enabled,
            FeatureFlag::GoogleScrambler => tree.google_scrambler_enabled,
            FeatureFlag::ChinaShortcut => tree.china_shortcut_enabled,
            FeatureFlag::DirectAccess => tree.direct_access_enabled,
            FeatureFlag::GoagentPublicServers => tree.public_servers.goagent_enabled,
            FeatureFlag::ShadowsocksPublicServers => tree.public_servers.ss_enabled,
        }
    }

    pub(crate) fn slot_in<'a>(&self, tree: &'a mut ConfigTree) -> &'a mut bool {
        match self {
            FeatureFlag::TcpScrambler => &mut tree.tcp_scrambler_enabled,
            FeatureFlag::GoogleScrambler => &mut tree.google_scrambler_enabled,
            FeatureFlag::ChinaShortcut => &mut tree.china_shortcut_enabled,
            FeatureFlag::DirectAccess => &mut tree.direct_access_enabled,
            FeatureFlag::GoagentPublicServers => &mut tree.public_servers.goagent_enabled,
            FeatureFlag::ShadowsocksPublicServers => &mut tree.public_servers.ss_enabled,
        }
    }

    fn index(&self) -> usize {
        match self {
            FeatureFlag::TcpScrambler => 0,
            FeatureFlag::GoogleScrambler => 1,
            FeatureFlag::ChinaShortcut => 2,
            FeatureFlag::DirectAccess => 3,
            FeatureFlag::GoagentPublicServers => 4,
            FeatureFlag::ShadowsocksPublicServers => 5,
        }
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown feature flag: {0}")]
pub struct UnknownFeatureFlag(pub String);

impl FromStr for FeatureFlag {
    type Err = UnknownFeatureFlag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureFlag::ALL
            .into_iter()
            .find(|f| f.slug() == s)
            .ok_or_else(|| UnknownFeatureFlag(s.to_string()))
    }
}

/// Process-wide flag state, shared by `Arc` with whoever routes traffic.
///
/// Writers go through the admin service, which updates these values only
/// after the persisted config has been written.
#[derive(Debug)]
pub struct FeatureFlags {
    values: [AtomicBool; 6],
    dns_bypass_hosts: ArcSwap<Vec<String>>,
}

impl FeatureFlags {
    pub fn from_tree(tree: &ConfigTree) -> Self {
        let flags = Self {
            values: Default::default(),
            dns_bypass_hosts: ArcSwap::from_pointee(Vec::new()),
        };
        flags.load_from(tree);
        flags
    }

    pub fn is_enabled(&self, flag: FeatureFlag) -> bool {
        self.values[flag.index()].load(Ordering::Acquire)
    }

    pub fn set(&self, flag: FeatureFlag, enabled: bool) {
        let previous = self.values[flag.index()].swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            tracing::info!(flag = %flag, enabled, "Feature flag changed");
        }
    }

    /// Current bypass list; cheap to call on the resolve path.
    pub fn dns_bypass_hosts(&self) -> Arc<Vec<String>> {
        self.dns_bypass_hosts.load_full()
    }

    pub fn set_dns_bypass_hosts(&self, text: &str) {
        let hosts = parse_host_list(text);
        tracing::info!(count = hosts.len(), "DNS bypass hosts updated");
        self.dns_bypass_hosts.store(Arc::new(hosts));
    }

    /// Overwrite every value from a persisted tree.
    pub fn load_from(&self, tree: &ConfigTree) {
        for flag in FeatureFlag::ALL {
            self.values[flag.index()].store(flag.get_in(tree), Ordering::Release);
        }
        self.dns_bypass_hosts
            .store(Arc::new(tree.dns_bypass_host_list()));
    }

    pub fn snapshot(&self) -> FlagSnapshot {
        FlagSnapshot {
            tcp_scrambler: self.is_enabled(FeatureFlag::TcpScrambler),
            google_scrambler: self.is_enabled(FeatureFlag::GoogleScrambler),
            china_shortcut: self.is_enabled(FeatureFlag::ChinaShortcut),
            direct_access: self.is_enabled(FeatureFlag::DirectAccess),
            goagent_public_servers: self.is_enabled(FeatureFlag::GoagentPublicServers),
            shadowsocks_public_servers: self.is_enabled(FeatureFlag::ShadowsocksPublicServers),
            dns_bypass_hosts: self.dns_bypass_hosts().len(),
        }
    }
}

/// Plain copy of the flag values for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagSnapshot {
    pub tcp_scrambler: bool,
    pub google_scrambler: bool,
    pub china_shortcut: bool,
    pub direct_access: bool,
    pub goagent_public_servers: bool,
    pub shadowsocks_public_servers: bool,
    pub dns_bypass_hosts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_round_trip() {
        for flag in FeatureFlag::ALL {
            assert_eq!(flag.slug().parse::<FeatureFlag>().unwrap(), flag);
        }
        assert!("dns-bypass".parse::<FeatureFlag>().is_err());
    }

    #[test]
    fn test_load_and_set() {
        let mut tree = ConfigTree::default();
        tree.china_shortcut_enabled = false;
        tree.public_servers.ss_enabled = false;
        tree.dns_bypass_hosts = "a.com\nb.com".into();

        let flags = FeatureFlags::from_tree(&tree);
        assert!(flags.is_enabled(FeatureFlag::TcpScrambler));
        assert!(!flags.is_enabled(FeatureFlag::ChinaShortcut));
        assert!(!flags.is_enabled(FeatureFlag::ShadowsocksPublicServers));
        assert_eq!(flags.dns_bypass_hosts().as_slice(), ["a.com", "b.com"]);

        flags.set(FeatureFlag::TcpScrambler, false);
        assert!(!flags.is_enabled(FeatureFlag::TcpScrambler));
        assert!(!flags.snapshot().tcp_scrambler);
    }

    #[test]
    fn test_restart_policy() {
        let restarting: Vec<_> = FeatureFlag::ALL
            .into_iter()
            .filter(FeatureFlag::requires_restart)
            .collect();
        assert_eq!(
            restarting,
            vec![FeatureFlag::GoagentPublicServers, FeatureFlag::ShadowsocksPublicServers]
        );
    }
}
