//! DNS resolution for load test clients
//!
//! The HTTP client resolves host names through [`LoadResolver`] instead of
//! the platform's blocking `getaddrinfo`. Resolution failures surface as
//! [`ResolveError`] values in the request error's source chain, which is
//! what lets the executor bucket them as `dns-error` without inspecting
//! message text.

use crate::error::{AppError, Result};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::net::{IpAddr, SocketAddr};
use trust_dns_resolver::{
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    error::ResolveError,
    system_conf, TokioAsyncResolver,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Async resolver plugged into `reqwest::ClientBuilder::dns_resolver`
#[derive(Clone)]
pub struct LoadResolver {
    resolver: TokioAsyncResolver,
    description: String,
}

impl LoadResolver {
    /// Resolver for the given servers, or the system configuration when empty
    pub fn new(servers: &[IpAddr]) -> Result<Self> {
        if servers.is_empty() {
            Ok(Self::system())
        } else {
            Self::custom(servers)
        }
    }

    /// Resolver backed by the system configuration
    ///
    /// Falls back to the resolver library defaults when the system
    /// configuration cannot be read (minimal containers without
    /// `/etc/resolv.conf`).
    pub fn system() -> Self {
        let (config, opts, description) = match system_conf::read_system_conf() {
            Ok((config, opts)) => (config, opts, "system".to_string()),
            Err(_) => (ResolverConfig::default(), ResolverOpts::default(), "default".to_string()),
        };

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            description,
        }
    }

    /// Resolver that queries only the given servers over UDP/TCP port 53
    pub fn custom(servers: &[IpAddr]) -> Result<Self> {
        if servers.is_empty() {
            return Err(AppError::validation("No DNS servers provided"));
        }

        let group = NameServerConfigGroup::from_ips_clear(servers, 53, true);
        let config = ResolverConfig::from_parts(None, vec![], group);
        let description = servers
            .iter()
            .map(|ip| ip.to_string())
            .collect::<Vec<_>>()
            .join(",");

        Ok(Self {
            resolver: TokioAsyncResolver::tokio(config, ResolverOpts::default()),
            description: format!("custom({})", description),
        })
    }

    /// Short label for logs
    pub fn description(&self) -> &str {
        &self.description
    }
}

async fn resolve_addrs(resolver: TokioAsyncResolver, name: Name) -> std::result::Result<Addrs, BoxError> {
    let lookup = resolver.lookup_ip(name.as_str()).await?;
    // Port 0 is replaced with the URL's port by the connector.
    let addrs: Vec<SocketAddr> = lookup.iter().map(|ip| SocketAddr::new(ip, 0)).collect();
    Ok(Box::new(addrs.into_iter()))
}

impl Resolve for LoadResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_addrs(self.resolver.clone(), name))
    }
}

/// True when `error` or anything in its source chain is a resolver failure
pub fn is_resolve_error(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if err.downcast_ref::<ResolveError>().is_some() {
            return true;
        }
        current = err.source();
    }
    false
}

/// Parse a comma-separated list of DNS server addresses
pub fn parse_dns_servers(input: &str) -> Result<Vec<IpAddr>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpAddr>()
                .map_err(|e| AppError::config(format!("Invalid DNS server '{}': {}", s, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_parse_dns_servers() {
        let servers = parse_dns_servers("8.8.8.8, 1.1.1.1").unwrap();
        assert_eq!(
            servers,
            vec![IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1))]
        );
        assert!(parse_dns_servers("").unwrap().is_empty());
        assert!(parse_dns_servers("8.8.8.8,nope").is_err());
    }

    #[tokio::test]
    async fn test_custom_resolver_requires_servers() {
        assert!(LoadResolver::custom(&[]).is_err());
        let resolver = LoadResolver::custom(&[IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9))]).unwrap();
        assert_eq!(resolver.description(), "custom(9.9.9.9)");
    }

    #[tokio::test]
    async fn test_new_uses_system_when_empty() {
        let resolver = LoadResolver::new(&[]).unwrap();
        assert!(matches!(resolver.description(), "system" | "default"));
    }

    #[tokio::test]
    async fn test_ip_literal_resolves_without_network() {
        let resolver = LoadResolver::system();
        let name: Name = "127.0.0.1".parse().unwrap();
        let addrs: Vec<SocketAddr> = resolver.resolve(name).await.unwrap().collect();
        assert_eq!(addrs, vec![SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)]);
    }

    #[test]
    fn test_is_resolve_error_walks_chain() {
        #[derive(Debug)]
        struct Wrapper(ResolveError);
        impl std::fmt::Display for Wrapper {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "wrapped")
            }
        }
        impl std::error::Error for Wrapper {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let inner = ResolveError::from("no records");
        let wrapped = Wrapper(inner);
        assert!(is_resolve_error(&wrapped));

        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(!is_resolve_error(&io));
    }
}
