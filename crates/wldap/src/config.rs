//! Connection configuration.

use std::time::Duration;
use wldap_sys::LDAP_PORT;

/// Configuration for opening a connection with [`crate::Ldap::open`].
///
/// Options left at `None` are not sent, so the library default applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapConfig {
    /// Server host name, `None` for the default server.
    pub host: Option<String>,

    /// Server port.
    pub port: u32,

    /// LDAP protocol version (`LDAP_OPT_PROTOCOL_VERSION`).
    pub protocol_version: Option<u32>,

    /// Timeout for `ldap_connect`; `None` uses the library default.
    pub connect_timeout: Option<Duration>,

    /// Maximum entries a search returns (`LDAP_OPT_SIZELIMIT`).
    pub size_limit: Option<u32>,

    /// Server-side search time limit in seconds (`LDAP_OPT_TIMELIMIT`).
    pub time_limit: Option<u32>,

    /// Whether referrals are chased (`LDAP_OPT_REFERRALS`).
    pub referrals: Option<bool>,
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: LDAP_PORT,
            protocol_version: Some(3),
            connect_timeout: None,
            size_limit: None,
            time_limit: None,
            referrals: None,
        }
    }
}

impl LdapConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the server port.
    #[must_use]
    pub const fn port(mut self, port: u32) -> Self {
        self.port = port;
        self
    }

    /// Sets the protocol version, `None` to keep the library default.
    #[must_use]
    pub const fn protocol_version(mut self, version: Option<u32>) -> Self {
        self.protocol_version = version;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the search size limit.
    #[must_use]
    pub const fn size_limit(mut self, limit: u32) -> Self {
        self.size_limit = Some(limit);
        self
    }

    /// Sets the search time limit, in seconds.
    #[must_use]
    pub const fn time_limit(mut self, seconds: u32) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Sets whether referrals are chased.
    #[must_use]
    pub const fn referrals(mut self, chase: bool) -> Self {
        self.referrals = Some(chase);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = LdapConfig::default();
        assert_eq!(config.host, None);
        assert_eq!(config.port, 389);
        assert_eq!(config.protocol_version, Some(3));
        assert!(config.connect_timeout.is_none());
        assert!(config.referrals.is_none());
    }

    #[test]
    fn builder_pattern() {
        let config = LdapConfig::new()
            .host("dc01.example.com")
            .port(3268)
            .connect_timeout(Duration::from_secs(5))
            .size_limit(500)
            .referrals(false);

        assert_eq!(config.host.as_deref(), Some("dc01.example.com"));
        assert_eq!(config.port, 3268);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.size_limit, Some(500));
        assert_eq!(config.referrals, Some(false));
        assert_eq!(config.time_limit, None);
    }
}
