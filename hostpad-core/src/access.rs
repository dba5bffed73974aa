//! Network-origin authorization.
//!
//! Every request is checked against a fixed list of network prefixes before
//! anything else happens. The check is a pure function of the peer address.

use std::{fmt, net::IpAddr, sync::Arc};

use ipnetwork::IpNetwork;
use thiserror::Error;

/// Prefixes allowed when nothing is configured: loopback plus the RFC 1918
/// private ranges.
pub const DEFAULT_ALLOWED_NETWORKS: &[&str] = &[
    "127.0.0.0/8",
    "::1/128",
    "192.168.0.0/16",
    "10.0.0.0/8",
    "172.16.0.0/12",
];

/// Failure to parse an allow-list entry.
#[derive(Debug, Error)]
pub enum AllowedOriginsError {
    /// The entry is neither an address nor a CIDR prefix.
    #[error("invalid network prefix `{entry}`")]
    InvalidPrefix {
        /// Offending entry as written.
        entry: String,
        #[source]
        source: ipnetwork::IpNetworkError,
    },
}

/// Immutable set of network prefixes whose members may use the endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AllowedOrigins {
    networks: Arc<[IpNetwork]>,
}

impl AllowedOrigins {
    /// Build from already-parsed prefixes.
    pub fn new(networks: Vec<IpNetwork>) -> Self {
        Self {
            networks: networks.into(),
        }
    }

    /// Parse entries such as `192.168.1.0/24` or a bare `10.0.0.7`.
    pub fn parse<I, S>(entries: I) -> Result<Self, AllowedOriginsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let networks = entries
            .into_iter()
            .map(|entry| {
                let entry = entry.as_ref().trim();
                entry.parse::<IpNetwork>().map_err(|source| {
                    AllowedOriginsError::InvalidPrefix {
                        entry: entry.to_string(),
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(networks))
    }

    /// Loopback and private LAN ranges.
    pub fn lan_defaults() -> Self {
        Self::parse(DEFAULT_ALLOWED_NETWORKS)
            .unwrap_or_else(|_| Self::new(Vec::new()))
    }

    /// Whether `ip` falls inside any configured prefix.
    ///
    /// IPv4-mapped IPv6 peers (as seen on dual-stack listeners) are matched
    /// as their IPv4 form.
    pub fn contains(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        self.networks.iter().any(|network| network.contains(ip))
    }

    /// True when a `/0` prefix admits every address of its family.
    pub fn is_catch_all(&self) -> bool {
        self.networks.iter().any(|network| network.prefix() == 0)
    }

    /// Configured prefixes in declaration order.
    pub fn networks(&self) -> &[IpNetwork] {
        &self.networks
    }

    /// Number of configured prefixes.
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    /// True when nothing would ever be allowed.
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

impl Default for AllowedOrigins {
    fn default() -> Self {
        Self::lan_defaults()
    }
}

impl fmt::Debug for AllowedOrigins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.networks.iter().map(|n| n.to_string()))
            .finish()
    }
}

impl fmt::Display for AllowedOrigins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .networks
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&joined)
    }
}

/// Result of an origin check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Request may proceed.
    Allowed,
    /// Request must be answered with 403 and nothing else.
    Denied,
}

impl AccessDecision {
    /// Convenience for call sites that only branch on the outcome.
    pub fn is_allowed(self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }
}

/// Origin gate consulted for every inbound request.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    origins: AllowedOrigins,
}

impl AccessGate {
    /// Gate over a fixed allow-list.
    pub fn new(origins: AllowedOrigins) -> Self {
        Self { origins }
    }

    /// Decide for a peer address. A request whose peer is unknown is denied.
    pub fn evaluate(&self, peer: Option<IpAddr>) -> AccessDecision {
        match peer {
            Some(ip) if self.origins.contains(ip) => AccessDecision::Allowed,
            _ => AccessDecision::Denied,
        }
    }

    /// Allow-list the gate was built with.
    pub fn origins(&self) -> &AllowedOrigins {
        &self.origins
    }
}
