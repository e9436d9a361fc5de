//! Caller identity for rate limiting.

use std::net::SocketAddr;

use hyper::HeaderMap;

pub const FORWARDED_FOR: &str = "x-forwarded-for";
pub const REAL_IP: &str = "x-real-ip";

/// The rate-limit key for one HTTP request.
///
/// Without proxy trust the key is the socket's IP (port dropped, since every
/// new connection gets a new one). With it, the first `x-forwarded-for`
/// entry wins, then `x-real-ip`, then the socket.
pub fn client_key(headers: &HeaderMap, remote: SocketAddr, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };
        if let Some(ip) = header(FORWARDED_FOR).or_else(|| header(REAL_IP)) {
            return ip.to_string();
        }
    }
    remote.ip().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn remote() -> SocketAddr {
        "10.0.0.7:51234".parse().unwrap()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn socket_ip_without_port() {
        assert_eq!(client_key(&HeaderMap::new(), remote(), false), "10.0.0.7");
        let other_port: SocketAddr = "10.0.0.7:40000".parse().unwrap();
        assert_eq!(client_key(&HeaderMap::new(), other_port, false), "10.0.0.7");
    }

    #[test]
    fn proxy_headers_ignored_unless_trusted() {
        let h = headers(&[(FORWARDED_FOR, "203.0.113.9")]);
        assert_eq!(client_key(&h, remote(), false), "10.0.0.7");
        assert_eq!(client_key(&h, remote(), true), "203.0.113.9");
    }

    #[test]
    fn first_forwarded_hop_then_real_ip() {
        let h = headers(&[
            (FORWARDED_FOR, " 198.51.100.1 , 10.0.0.2"),
            (REAL_IP, "192.0.2.5"),
        ]);
        assert_eq!(client_key(&h, remote(), true), "198.51.100.1");

        let h = headers(&[(REAL_IP, "192.0.2.5")]);
        assert_eq!(client_key(&h, remote(), true), "192.0.2.5");

        let h = headers(&[(FORWARDED_FOR, "")]);
        assert_eq!(client_key(&h, remote(), true), "10.0.0.7");
    }
}
