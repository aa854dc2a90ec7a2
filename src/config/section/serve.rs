//! `[serve]` section configuration.
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"   # Bind address; "0.0.0.0" exposes the site on the LAN
//! port = 5277               # First port tried; the next free one is used if taken
//! threads = 4               # Requests handled at once
//! ```

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub interface: IpAddr,
    pub port: u16,
    pub threads: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5277,
            threads: 4,
        }
    }
}

impl ServeConfig {
    pub const PORT: FieldPath = FieldPath::new("serve.port");
    pub const THREADS: FieldPath = FieldPath::new("serve.threads");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.port == 0 {
            diag.error_with_hint(Self::PORT, "must not be 0", "the default is 5277");
        }
        if self.threads == 0 {
            diag.error(Self::THREADS, "must be at least 1");
        } else if self.threads > 64 {
            diag.warn(Self::THREADS, format!("{} request threads is unusually many", self.threads));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    use crate::config::{ConfigDiagnostics, test_parse_config};

    #[test]
    fn test_serve_section() {
        let config = test_parse_config("[serve]\ninterface = \"0.0.0.0\"\nport = 8080\nthreads = 2");

        assert_eq!(config.serve.interface, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.serve.port, 8080);
        assert_eq!(config.serve.threads, 2);
    }

    #[test]
    fn test_serve_ipv6_keeps_other_defaults() {
        let config = test_parse_config("[serve]\ninterface = \"::1\"");

        assert_eq!(config.serve.interface, IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(config.serve.port, 5277);
        assert_eq!(config.serve.threads, 4);
    }

    #[test]
    fn test_serve_rejects_zero_port_and_threads() {
        let config = test_parse_config("[serve]\nport = 0\nthreads = 0");
        let mut diag = ConfigDiagnostics::new();
        config.serve.validate(&mut diag);
        assert_eq!(diag.len(), 2);
    }
}
