//! TCP listener binding.

use std::net::SocketAddr;

use tokio::net::TcpListener;

/// Address used when none is configured and TLS is off.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:80";

/// Address used when none is configured and TLS is on.
pub const DEFAULT_HTTPS_ADDR: &str = "0.0.0.0:443";

/// Resolve the address to bind, applying the per-scheme default port.
pub fn listen_address(addr: &str, tls: bool) -> String {
    match (addr.is_empty(), tls) {
        (false, _) => addr.to_string(),
        (true, false) => DEFAULT_HTTP_ADDR.to_string(),
        (true, true) => DEFAULT_HTTPS_ADDR.to_string(),
    }
}

/// Bind `addr` and return a non-blocking std listener with its local address.
///
/// Host names are resolved by the runtime.
pub async fn bind(addr: &str) -> std::io::Result<(std::net::TcpListener, SocketAddr)> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::debug!(address = %local_addr, "Listener bound");

    Ok((listener.into_std()?, local_addr))
}
