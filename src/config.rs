//! Configuration utilities (ports, Redis URL, env vars).

use std::{env, net::{Ipv4Addr, SocketAddr}};

/// Socket address to bind the server to.
///
/// Reads the `PORT` env var or defaults to 8080, binds to 0.0.0.0.
pub fn server_addr() -> SocketAddr {
    let port = env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(8080);
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}

/// Connection string for the key-value store.
///
/// Reads `REDIS_URL` or defaults to a local instance on the standard port.
pub fn redis_url() -> String {
    env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379/0".to_string())
}
