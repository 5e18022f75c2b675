//! Rate limiting for the login form using governor and `tower_governor`.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Key extractor that keys on the peer address of the connection.
///
/// `X-Forwarded-For` is only read when the peer is a configured proxy. The
/// chain is walked from the right, skipping trusted hops, so the key is the
/// address the outermost trusted proxy saw. Hops further left are supplied
/// by the client and never used.
#[derive(Clone)]
pub struct ClientIpKeyExtractor {
    trusted_proxies: Arc<[IpAddr]>,
}

impl ClientIpKeyExtractor {
    /// Create an extractor honouring forwarded headers from `trusted_proxies`.
    #[must_use]
    pub fn new(trusted_proxies: &[IpAddr]) -> Self {
        Self {
            trusted_proxies: trusted_proxies.into(),
        }
    }

    fn is_trusted(&self, ip: IpAddr) -> bool {
        self.trusted_proxies.contains(&ip)
    }

    fn forwarded_client<T>(&self, req: &Request<T>, peer: IpAddr) -> IpAddr {
        let hops: Vec<&str> = req
            .headers()
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|s| s.split(','))
            .map(str::trim)
            .collect();

        for hop in hops.into_iter().rev() {
            match hop.parse::<IpAddr>() {
                Ok(ip) if self.is_trusted(ip) => {}
                Ok(ip) => return ip,
                Err(_) => break,
            }
        }
        peer
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)?;

        if self.is_trusted(peer) {
            Ok(self.forwarded_client(req, peer))
        } else {
            Ok(peer)
        }
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for the login form: ~10 attempts per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(6)` and `burst_size(5)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn login_rate_limiter(trusted_proxies: &[IpAddr]) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor::new(trusted_proxies))
        .per_second(6) // Replenish 1 token every 6 seconds (~10/minute)
        .burst_size(5) // Allow burst of 5 requests
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    const PROXY: &str = "10.1.0.5";

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn request(peer: &str, forwarded_for: Option<&str>) -> Request<()> {
        let mut builder = Request::builder();
        if let Some(value) = forwarded_for {
            builder = builder.header("x-forwarded-for", value);
        }
        let mut req = builder.body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(ip(peer), 40000)));
        req
    }

    #[test]
    fn test_keys_on_peer_address() {
        let extractor = ClientIpKeyExtractor::new(&[]);
        let req = request("198.51.100.2", None);
        assert_eq!(extractor.extract(&req).unwrap(), ip("198.51.100.2"));
    }

    #[test]
    fn test_forwarded_for_ignored_from_untrusted_peer() {
        let extractor = ClientIpKeyExtractor::new(&[ip(PROXY)]);
        for i in 0..3 {
            let req = request("198.51.100.2", Some(&format!("10.0.0.{i}, 203.0.113.9")));
            assert_eq!(extractor.extract(&req).unwrap(), ip("198.51.100.2"));
        }
    }

    #[test]
    fn test_trusted_proxy_takes_rightmost_untrusted_hop() {
        let extractor = ClientIpKeyExtractor::new(&[ip(PROXY), ip("10.1.0.6")]);
        let req = request(PROXY, Some("10.0.0.1, 203.0.113.9, 10.1.0.6"));
        assert_eq!(extractor.extract(&req).unwrap(), ip("203.0.113.9"));
    }

    #[test]
    fn test_trusted_proxy_reads_repeated_headers_in_order() {
        let extractor = ClientIpKeyExtractor::new(&[ip(PROXY)]);
        let mut req = Request::builder()
            .header("x-forwarded-for", "10.0.0.1")
            .header("x-forwarded-for", "203.0.113.9")
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(ip(PROXY), 40000)));
        assert_eq!(extractor.extract(&req).unwrap(), ip("203.0.113.9"));
    }

    #[test]
    fn test_trusted_proxy_without_usable_hop_keys_on_peer() {
        let extractor = ClientIpKeyExtractor::new(&[ip(PROXY)]);
        assert_eq!(extractor.extract(&request(PROXY, None)).unwrap(), ip(PROXY));
        assert_eq!(
            extractor
                .extract(&request(PROXY, Some("203.0.113.9, not-an-ip")))
                .unwrap(),
            ip(PROXY)
        );
    }

    #[test]
    fn test_no_peer_address_is_an_error() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7")
            .body(())
            .unwrap();
        assert!(ClientIpKeyExtractor::new(&[]).extract(&req).is_err());
    }
}
