//! Per-type validation of operator-submitted proxy fields.
//!
//! # Responsibilities
//! - Check required fields in a fixed order, presence before coercion
//! - Fill defaults for optional fields
//! - Coerce numeric fields (port, connections_count)
//!
//! # Design Decisions
//! - Pure function: same input, same output; no I/O
//! - First failing field wins, so the operator sees one message at a time
//! - Adding and editing a proxy both go through [`validate`] in full

use std::collections::HashMap;
use std::fmt;

use crate::upstream::definition::{
    GoAgentServer, HttpServer, ProxyDefinition, ProxyType, ShadowsocksServer, SpdyServer,
    SshServer, DEFAULT_CONNECTIONS_COUNT, DEFAULT_GOAGENT_PATH, DEFAULT_TRAFFIC_TYPE,
    DEFAULT_TRANSPORT_TYPE, MAX_CONNECTIONS_COUNT,
};
use crate::upstream::i18n::{Lang, LocalizedMessage};

/// Untyped key/value input as delivered by a form post.
pub type RawFields = HashMap<String, String>;

/// Fields the validator can complain about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    AppId,
    Host,
    Port,
    Username,
    Password,
    EncryptMethod,
    ConnectionsCount,
}

impl Field {
    pub fn key(&self) -> &'static str {
        match self {
            Field::AppId => "appid",
            Field::Host => "host",
            Field::Port => "port",
            Field::Username => "username",
            Field::Password => "password",
            Field::EncryptMethod => "encrypt_method",
            Field::ConnectionsCount => "connections_count",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

pub(crate) const INTERNAL_ERROR: LocalizedMessage = LocalizedMessage::new("Internal Error", "内部错误");

/// Why a proxy submission was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing field: {0}")]
    MissingField(Field),
    #[error("invalid value for field: {0}")]
    InvalidType(Field),
    #[error("unknown proxy type: {0}")]
    UnknownVariant(String),
}

impl ValidationError {
    pub fn localized(&self) -> LocalizedMessage {
        match self {
            ValidationError::MissingField(field) => match field {
                Field::AppId => LocalizedMessage::new("App Id must not be empty", "App Id 必填"),
                Field::Host => LocalizedMessage::new("Host must not be empty", "主机必填"),
                Field::Port => LocalizedMessage::new("Port must not be empty", "端口必填"),
                Field::Username => LocalizedMessage::new("User name must not be empty", "用户名必填"),
                Field::Password => LocalizedMessage::new("Password must not be empty", "密码必填"),
                Field::EncryptMethod => {
                    LocalizedMessage::new("Encrypt method must not be empty", "加密方式必填")
                }
                Field::ConnectionsCount => {
                    LocalizedMessage::new("Connections count must not be empty", "连接数必填")
                }
            },
            ValidationError::InvalidType(field) => match field {
                Field::Port => LocalizedMessage::new("Port must be number", "端口必须是数字"),
                Field::ConnectionsCount => {
                    LocalizedMessage::new("Connections count must be number", "连接数必须是数字")
                }
                _ => INTERNAL_ERROR,
            },
            ValidationError::UnknownVariant(_) => INTERNAL_ERROR,
        }
    }

    pub fn message(&self, lang: Lang) -> &'static str {
        self.localized().select(lang)
    }
}

/// Validate `fields` as a definition of type `proxy_type`.
pub fn validate(proxy_type: &str, fields: &RawFields) -> Result<ProxyDefinition, ValidationError> {
    let proxy_type: ProxyType = proxy_type
        .parse()
        .map_err(|_| ValidationError::UnknownVariant(proxy_type.to_string()))?;
    let form = Form(fields);

    let def = match proxy_type {
        ProxyType::GoAgent => ProxyDefinition::GoAgent(GoAgentServer {
            appid: form.required(Field::AppId)?,
            path: form.or_default("path", DEFAULT_GOAGENT_PATH),
            goagent_password: form.optional("goagent_password"),
        }),
        ProxyType::Ssh => {
            let host = form.required(Field::Host)?;
            let port = form.required_port()?;
            let username = form.required(Field::Username)?;
            ProxyDefinition::Ssh(SshServer {
                host,
                port,
                username,
                password: form.optional("password"),
                connections_count: form.connections_count()?,
            })
        }
        ProxyType::Shadowsocks => ProxyDefinition::Shadowsocks(ShadowsocksServer {
            host: form.required(Field::Host)?,
            port: form.required(Field::Port)?,
            password: form.required(Field::Password)?,
            encrypt_method: form.required(Field::EncryptMethod)?,
        }),
        ProxyType::Http => {
            let host = form.required(Field::Host)?;
            let port = form.required_port()?;
            let username = form.required(Field::Username)?;
            let password = form.required(Field::Password)?;
            ProxyDefinition::Http(HttpServer {
                host,
                port,
                username,
                password,
                traffic_type: form.or_default("traffic_type", DEFAULT_TRAFFIC_TYPE),
                transport_type: form.or_default("transport_type", DEFAULT_TRANSPORT_TYPE),
            })
        }
        ProxyType::Spdy => {
            let host = form.required(Field::Host)?;
            let port = form.required_port()?;
            let username = form.required(Field::Username)?;
            let password = form.required(Field::Password)?;
            ProxyDefinition::Spdy(SpdyServer {
                host,
                port,
                username,
                password,
                traffic_type: form.or_default("traffic_type", DEFAULT_TRAFFIC_TYPE),
                connections_count: form.connections_count()?,
            })
        }
    };

    Ok(def)
}

struct Form<'a>(&'a RawFields);

impl Form<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    fn required(&self, field: Field) -> Result<String, ValidationError> {
        self.get(field.key())
            .map(str::to_string)
            .ok_or(ValidationError::MissingField(field))
    }

    fn required_port(&self) -> Result<u16, ValidationError> {
        let raw = self.get(Field::Port.key()).ok_or(ValidationError::MissingField(Field::Port))?;
        raw.trim()
            .parse()
            .map_err(|_| ValidationError::InvalidType(Field::Port))
    }

    fn connections_count(&self) -> Result<u32, ValidationError> {
        match self.get(Field::ConnectionsCount.key()) {
            None => Ok(DEFAULT_CONNECTIONS_COUNT),
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=MAX_CONNECTIONS_COUNT).contains(n))
                .ok_or(ValidationError::InvalidType(Field::ConnectionsCount)),
        }
    }

    fn optional(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }
}
