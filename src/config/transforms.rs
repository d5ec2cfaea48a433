//! Pure config-tree transformations.
//!
//! Each admin mutation is one function from the current tree to the next one.
//! Nothing here touches disk, flags or the proxy pool; [`ConfigStore`] wraps
//! these in its locked read-apply-write cycle.
//!
//! [`ConfigStore`]: crate::config::store::ConfigStore

use crate::config::tree::ConfigTree;
use crate::features::FeatureFlag;
use crate::upstream::ProxyDefinition;

/// Insert a new private server under a caller-chosen id. An id that is
/// already taken keeps its existing definition; use [`put_proxy`] to replace.
pub fn add_proxy(mut tree: ConfigTree, proxy_id: &str, definition: ProxyDefinition) -> ConfigTree {
    tree.private_servers
        .entry(proxy_id.to_string())
        .or_insert(definition);
    tree
}

/// Insert or replace the private server stored under `proxy_id`.
pub fn put_proxy(mut tree: ConfigTree, proxy_id: &str, definition: ProxyDefinition) -> ConfigTree {
    tree.private_servers.insert(proxy_id.to_string(), definition);
    tree
}

/// Remove a private server; unknown ids leave the tree as it was.
pub fn delete_proxy(mut tree: ConfigTree, proxy_id: &str) -> ConfigTree {
    tree.private_servers.remove(proxy_id);
    tree
}

pub fn set_feature_flag(mut tree: ConfigTree, flag: FeatureFlag, enabled: bool) -> ConfigTree {
    *flag.slot_in(&mut tree) = enabled;
    tree
}

/// Replace the DNS bypass host list with operator-supplied text.
pub fn set_dns_bypass_hosts(mut tree: ConfigTree, content: &str) -> ConfigTree {
    tree.dns_bypass_hosts = content.trim().to_string();
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::definition::GoAgentServer;

    fn goagent(appid: &str) -> ProxyDefinition {
        ProxyDefinition::GoAgent(GoAgentServer {
            appid: appid.into(),
            path: "/2".into(),
            goagent_password: None,
        })
    }

    #[test]
    fn test_add_update_delete() {
        let tree = add_proxy(ConfigTree::default(), "p1", goagent("a"));
        assert_eq!(tree.private_servers.get("p1"), Some(&goagent("a")));

        let tree = add_proxy(tree, "p1", goagent("b"));
        assert_eq!(tree.private_servers.get("p1"), Some(&goagent("a")));

        let tree = put_proxy(tree, "p1", goagent("b"));
        assert_eq!(tree.private_servers.len(), 1);
        assert_eq!(tree.private_servers.get("p1"), Some(&goagent("b")));

        let tree = delete_proxy(tree, "missing");
        assert_eq!(tree.private_servers.len(), 1);

        let tree = delete_proxy(tree, "p1");
        assert!(tree.private_servers.is_empty());
    }

    #[test]
    fn test_flags_touch_only_their_slot() {
        let before = ConfigTree::default();
        let after = set_feature_flag(before.clone(), FeatureFlag::GoagentPublicServers, false);
        assert!(!after.public_servers.goagent_enabled);
        assert_eq!(
            ConfigTree {
                public_servers: before.public_servers.clone(),
                ..after.clone()
            },
            before
        );

        let after = set_feature_flag(after, FeatureFlag::DirectAccess, false);
        assert!(!after.direct_access_enabled);
        assert!(after.tcp_scrambler_enabled);
    }

    #[test]
    fn test_dns_bypass_trimmed() {
        let tree = set_dns_bypass_hosts(ConfigTree::default(), "\n a.com\nb.com \n\n");
        assert_eq!(tree.dns_bypass_hosts, "a.com\nb.com");
    }
}
