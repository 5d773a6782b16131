//! Target address parsing for datagram producers.
//!
//! Addresses take the form `{scheme}://{host}:{port}`. The scheme is kept for
//! display and logging only; it never selects the transport.

use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

/// Scheme assumed when an address is given as bare `host:port`.
pub const DEFAULT_SCHEME: &str = "udp";

/// Parsed `{scheme}://{host}:{port}` address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    scheme: String,
    host: String,
    port: u16,
}

impl Endpoint {
    /// Parse an endpoint from a string.
    ///
    /// Supported formats:
    /// - `udp://127.0.0.1:5555`
    /// - `udp://localhost:5555`
    /// - `udp://[::1]:5555` (IPv6)
    /// - `127.0.0.1:5555` (scheme defaults to `udp`)
    ///
    /// # Examples
    ///
    /// ```
    /// use u2a_core::endpoint::Endpoint;
    ///
    /// let endpoint = Endpoint::parse("udp://127.0.0.1:5555").unwrap();
    /// assert_eq!(endpoint.host(), "127.0.0.1");
    /// assert_eq!(endpoint.port(), 5555);
    ///
    /// assert!(Endpoint::parse("udp://127.0.0.1").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, EndpointError> {
        s.parse()
    }

    /// Scheme as written in the address (`udp` if omitted).
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host name or literal IP address, without IPv6 brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Destination port. Never zero.
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Resolve the host to a socket address.
    ///
    /// Literal IPs never hit the resolver. For names, the first address
    /// returned by the system resolver wins.
    pub fn resolve(&self) -> Result<SocketAddr, EndpointError> {
        let mut addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| EndpointError::Unresolvable {
                host: self.host.clone(),
                source,
            })?;

        addrs.next().ok_or_else(|| EndpointError::Unresolvable {
            host: self.host.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses returned"),
        })
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = match s.split_once("://") {
            Some((scheme, rest)) => {
                if scheme.is_empty() {
                    return Err(EndpointError::EmptyScheme(s.to_string()));
                }
                (scheme.to_ascii_lowercase(), rest)
            }
            None => (DEFAULT_SCHEME.to_string(), s),
        };

        // A bare trailing slash is tolerated, anything past it is not.
        let authority = rest.strip_suffix('/').unwrap_or(rest);
        if authority.contains(['/', '?', '#']) {
            return Err(EndpointError::UnexpectedPath(s.to_string()));
        }

        // Credentials are irrelevant for a datagram target.
        let authority = authority
            .rsplit_once('@')
            .map_or(authority, |(_, host_port)| host_port);

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let (host, after) = bracketed
                .split_once(']')
                .ok_or_else(|| EndpointError::InvalidHost(s.to_string()))?;
            let port = after
                .strip_prefix(':')
                .ok_or_else(|| EndpointError::MissingPort(s.to_string()))?;
            (host, port)
        } else {
            let (host, port) = authority
                .rsplit_once(':')
                .ok_or_else(|| EndpointError::MissingPort(s.to_string()))?;
            if host.contains(':') {
                return Err(EndpointError::InvalidHost(s.to_string()));
            }
            (host, port)
        };

        if host.is_empty() {
            return Err(EndpointError::MissingHost(s.to_string()));
        }
        if port.is_empty() {
            return Err(EndpointError::MissingPort(s.to_string()));
        }

        let port = match port.parse::<u16>() {
            Ok(0) | Err(_) => return Err(EndpointError::InvalidPort(s.to_string())),
            Ok(port) => port,
        };

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

/// Errors that can occur when parsing or resolving endpoints.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("Empty scheme in address: {0}")]
    EmptyScheme(String),

    #[error("Missing host in address: {0}")]
    MissingHost(String),

    #[error("Invalid host in address: {0}")]
    InvalidHost(String),

    #[error("Missing port in address: {0}")]
    MissingPort(String),

    #[error("Invalid port in address: {0} (expected 1-65535)")]
    InvalidPort(String),

    #[error("Unexpected path in address: {0} (expected scheme://host:port)")]
    UnexpectedPath(String),

    #[error("Unable to resolve host {host}: {source}")]
    Unresolvable {
        host: String,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_udp_ipv4() {
        let endpoint = Endpoint::parse("udp://127.0.0.1:5555").unwrap();
        assert_eq!(endpoint.scheme(), "udp");
        assert_eq!(endpoint.host(), "127.0.0.1");
        assert_eq!(endpoint.port(), 5555);
        assert_eq!(endpoint.to_string(), "udp://127.0.0.1:5555");
    }

    #[test]
    fn test_parse_ipv6() {
        let endpoint = Endpoint::parse("udp://[::1]:5555").unwrap();
        assert_eq!(endpoint.host(), "::1");
        assert_eq!(endpoint.to_string(), "udp://[::1]:5555");
    }

    #[test]
    fn test_default_scheme() {
        let endpoint = Endpoint::parse("localhost:9000").unwrap();
        assert_eq!(endpoint.scheme(), DEFAULT_SCHEME);
        assert_eq!(endpoint.host(), "localhost");
    }

    #[test]
    fn test_other_scheme_is_kept() {
        let endpoint = Endpoint::parse("tcp://10.0.0.1:80/").unwrap();
        assert_eq!(endpoint.scheme(), "tcp");
        assert_eq!(endpoint.port(), 80);
    }

    #[test]
    fn test_missing_port() {
        assert!(matches!(
            Endpoint::parse("udp://127.0.0.1"),
            Err(EndpointError::MissingPort(_))
        ));
        assert!(matches!(
            Endpoint::parse("udp://127.0.0.1:"),
            Err(EndpointError::MissingPort(_))
        ));
    }

    #[test]
    fn test_missing_host() {
        assert!(matches!(
            Endpoint::parse("udp://:5555"),
            Err(EndpointError::MissingHost(_))
        ));
    }

    #[test]
    fn test_invalid_port() {
        assert!(matches!(
            Endpoint::parse("udp://localhost:port"),
            Err(EndpointError::InvalidPort(_))
        ));
        assert!(matches!(
            Endpoint::parse("udp://localhost:70000"),
            Err(EndpointError::InvalidPort(_))
        ));
        assert!(matches!(
            Endpoint::parse("udp://localhost:0"),
            Err(EndpointError::InvalidPort(_))
        ));
    }

    #[test]
    fn test_rejects_path_and_empty_scheme() {
        assert!(matches!(
            Endpoint::parse("udp://localhost:5555/topic"),
            Err(EndpointError::UnexpectedPath(_))
        ));
        assert!(matches!(
            Endpoint::parse("://localhost:5555"),
            Err(EndpointError::EmptyScheme(_))
        ));
    }

    #[test]
    fn test_unbracketed_ipv6_rejected() {
        assert!(matches!(
            Endpoint::parse("udp://::1:5555"),
            Err(EndpointError::InvalidHost(_))
        ));
    }

    #[test]
    fn test_resolve_literal() {
        let endpoint = Endpoint::parse("udp://127.0.0.1:4000").unwrap();
        let addr = endpoint.resolve().unwrap();
        assert_eq!(addr, "127.0.0.1:4000".parse().unwrap());
    }
}
