//! Persisted upstream proxy definitions.
//!
//! One struct per proxy type; [`ProxyDefinition`] is the closed sum over them and
//! serializes as a flat JSON object tagged by `proxy_type`, which is the shape
//! stored under `private_servers` in the config tree.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_GOAGENT_PATH: &str = "/2";
pub const DEFAULT_CONNECTIONS_COUNT: u32 = 4;
/// Upper bound on parallel connections per SSH/SPDY server.
pub const MAX_CONNECTIONS_COUNT: u32 = 64;
pub const DEFAULT_TRAFFIC_TYPE: &str = "HTTP/HTTPS";
pub const DEFAULT_TRANSPORT_TYPE: &str = "HTTP";

/// Discriminant of a proxy definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProxyType {
    GoAgent,
    #[serde(rename = "SSH")]
    Ssh,
    Shadowsocks,
    #[serde(rename = "HTTP")]
    Http,
    #[serde(rename = "SPDY")]
    Spdy,
}

impl ProxyType {
    pub const ALL: [ProxyType; 5] = [
        ProxyType::GoAgent,
        ProxyType::Ssh,
        ProxyType::Shadowsocks,
        ProxyType::Http,
        ProxyType::Spdy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::GoAgent => "GoAgent",
            ProxyType::Ssh => "SSH",
            ProxyType::Shadowsocks => "Shadowsocks",
            ProxyType::Http => "HTTP",
            ProxyType::Spdy => "SPDY",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a `proxy_type` string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown proxy type: {0}")]
pub struct UnknownProxyType(pub String);

impl FromStr for ProxyType {
    type Err = UnknownProxyType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProxyType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownProxyType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoAgentServer {
    pub appid: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goagent_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshServer {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub connections_count: u32,
}

/// Shadowsocks keeps its port exactly as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowsocksServer {
    pub host: String,
    pub port: String,
    pub password: String,
    pub encrypt_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpServer {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub traffic_type: String,
    pub transport_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpdyServer {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub traffic_type: String,
    pub connections_count: u32,
}

/// A validated, normalized private server definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "proxy_type")]
pub enum ProxyDefinition {
    GoAgent(GoAgentServer),
    #[serde(rename = "SSH")]
    Ssh(SshServer),
    Shadowsocks(ShadowsocksServer),
    #[serde(rename = "HTTP")]
    Http(HttpServer),
    #[serde(rename = "SPDY")]
    Spdy(SpdyServer),
}

impl ProxyDefinition {
    pub fn proxy_type(&self) -> ProxyType {
        match self {
            ProxyDefinition::GoAgent(_) => ProxyType::GoAgent,
            ProxyDefinition::Ssh(_) => ProxyType::Ssh,
            ProxyDefinition::Shadowsocks(_) => ProxyType::Shadowsocks,
            ProxyDefinition::Http(_) => ProxyType::Http,
            ProxyDefinition::Spdy(_) => ProxyType::Spdy,
        }
    }

    /// Operator-facing identity shared by every live instance built from this definition.
    pub fn public_name(&self) -> String {
        match self {
            ProxyDefinition::GoAgent(s) => format!("GoAgent {}", s.appid),
            ProxyDefinition::Ssh(s) => format!("SSH {}:{}", s.host, s.port),
            ProxyDefinition::Shadowsocks(s) => format!("Shadowsocks {}:{}", s.host, s.port),
            ProxyDefinition::Http(s) => format!("HTTP {}:{}", s.host, s.port),
            ProxyDefinition::Spdy(s) => format!("SPDY {}:{}", s.host, s.port),
        }
    }

    /// Number of live instances the pool builds for this definition.
    pub fn connections_count(&self) -> u32 {
        match self {
            ProxyDefinition::Ssh(s) => s.connections_count,
            ProxyDefinition::Spdy(s) => s.connections_count,
            _ => 1,
        }
    }

    /// The definition's fields without the `proxy_type` tag.
    pub fn properties(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(mut map)) => {
                map.remove("proxy_type");
                map
            }
            _ => serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_proxy_type_parse() {
        assert_eq!("SSH".parse::<ProxyType>().unwrap(), ProxyType::Ssh);
        assert_eq!("Shadowsocks".parse::<ProxyType>().unwrap(), ProxyType::Shadowsocks);
        assert!("ssh".parse::<ProxyType>().is_err());
        assert!("SOCKS5".parse::<ProxyType>().is_err());
    }

    #[test]
    fn test_persisted_shape() {
        let def = ProxyDefinition::Ssh(SshServer {
            host: "example.com".into(),
            port: 22,
            username: "root".into(),
            password: None,
            connections_count: 4,
        });

        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(
            value,
            json!({
                "proxy_type": "SSH",
                "host": "example.com",
                "port": 22,
                "username": "root",
                "connections_count": 4
            })
        );

        let back: ProxyDefinition = serde_json::from_value(value).unwrap();
        assert_eq!(back, def);
    }

    #[test]
    fn test_properties_drop_tag() {
        let def = ProxyDefinition::GoAgent(GoAgentServer {
            appid: "my-app".into(),
            path: DEFAULT_GOAGENT_PATH.into(),
            goagent_password: Some("secret".into()),
        });
        let props = def.properties();
        assert!(!props.contains_key("proxy_type"));
        assert_eq!(props["appid"], "my-app");
        assert_eq!(props["goagent_password"], "secret");
        assert_eq!(def.public_name(), "GoAgent my-app");
    }
}
