//! Origin allow-list for WebSocket upgrades.
//!
//! Browsers always send `Origin` on a WebSocket handshake, so a missing or
//! foreign origin is treated as a cross-site attempt. Entries are configured
//! as `scheme://host[:port]`; a leading `*.` on the host admits any
//! subdomain but not the bare domain.

use actix_web::http::header::{HeaderMap, ORIGIN};
use tracing::warn;
use url::Url;

use crate::domain::Error;

/// Reasons a configured origin entry cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OriginConfigError {
    #[error("origin `{value}` is not a valid URL: {message}")]
    InvalidUrl { value: String, message: String },
    #[error("origin `{value}` must use http or https")]
    UnsupportedScheme { value: String },
    #[error("origin `{value}` must not carry a path, query or fragment")]
    NotAnOrigin { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostPattern {
    Exact(String),
    Subdomain(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OriginRule {
    scheme: String,
    host: HostPattern,
    port: Option<u16>,
}

impl OriginRule {
    fn parse(raw: &str) -> Result<Self, OriginConfigError> {
        let trimmed = raw.trim().trim_end_matches('/');
        let (wildcard, parseable) = match trimmed.split_once("://*.") {
            Some((scheme, rest)) => (true, format!("{scheme}://{rest}")),
            None => (false, trimmed.to_owned()),
        };
        let url = Url::parse(&parseable).map_err(|err| OriginConfigError::InvalidUrl {
            value: raw.to_owned(),
            message: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(OriginConfigError::UnsupportedScheme {
                value: raw.to_owned(),
            });
        }
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(OriginConfigError::NotAnOrigin {
                value: raw.to_owned(),
            });
        }
        let host = url
            .host_str()
            .ok_or_else(|| OriginConfigError::NotAnOrigin {
                value: raw.to_owned(),
            })?
            .to_ascii_lowercase();

        Ok(Self {
            scheme: url.scheme().to_owned(),
            host: if wildcard {
                HostPattern::Subdomain(format!(".{host}"))
            } else {
                HostPattern::Exact(host)
            },
            port: url.port_or_known_default(),
        })
    }

    fn matches(&self, origin: &Url) -> bool {
        let Some(host) = origin.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let host_matches = match &self.host {
            HostPattern::Exact(expected) => host == *expected,
            HostPattern::Subdomain(suffix) => host
                .strip_suffix(suffix.as_str())
                .is_some_and(|label| !label.is_empty()),
        };
        origin.scheme() == self.scheme && host_matches && origin.port_or_known_default() == self.port
    }
}

/// Origins permitted to open a group channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedOrigins {
    rules: Vec<OriginRule>,
}

impl AllowedOrigins {
    /// Parse every configured entry, failing on the first invalid one.
    pub fn parse<I, S>(entries: I) -> Result<Self, OriginConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = entries
            .into_iter()
            .map(|entry| OriginRule::parse(entry.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_allowed(&self, origin: &Url) -> bool {
        self.rules.iter().any(|rule| rule.matches(origin))
    }

    /// Check the handshake's `Origin` header.
    ///
    /// Missing or foreign origins are `Forbidden`; an unreadable header or
    /// more than one `Origin` is `InvalidRequest`.
    pub fn validate(&self, headers: &HeaderMap) -> Result<(), Error> {
        let mut values = headers.get_all(ORIGIN);
        let Some(header) = values.next() else {
            warn!("missing Origin header on WebSocket upgrade");
            return Err(Error::forbidden("origin not allowed"));
        };
        if values.next().is_some() {
            warn!("multiple Origin headers on WebSocket upgrade");
            return Err(Error::invalid_request("invalid Origin header"));
        }

        let raw = header.to_str().map_err(|err| {
            warn!(error = %err, "Origin header is not visible ASCII");
            Error::invalid_request("invalid Origin header")
        })?;
        let origin = Url::parse(raw).map_err(|err| {
            warn!(error = %err, origin = raw, "Origin header is not a URL");
            Error::invalid_request("invalid Origin header")
        })?;

        if self.is_allowed(&origin) {
            Ok(())
        } else {
            warn!(origin = raw, "rejected WebSocket upgrade from disallowed Origin");
            Err(Error::forbidden("origin not allowed"))
        }
    }
}
