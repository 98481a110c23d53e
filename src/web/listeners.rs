use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Binds `host:port`. A host of `*` listens on every interface, dual-stack
/// where the system allows it.
pub async fn create_listener(host: &str, port: u16) -> std::io::Result<(String, TcpListener)> {
    if host == "*" {
        return create_wildcard_listener(port);
    }

    let addr = format!("{}:{}", host, port);
    info!("Attempting to bind server to {}...", addr);
    let listener = TcpListener::bind(&addr).await?;
    let bound = listener.local_addr().map(|a| a.to_string()).unwrap_or(addr);
    Ok((bound, listener))
}

fn create_wildcard_listener(port: u16) -> std::io::Result<(String, TcpListener)> {
    let ipv6 = SocketAddr::from((Ipv6Addr::UNSPECIFIED, port));
    info!("Attempting to bind server to {}... (IPv6 + IPv4 dual-stack)", ipv6);
    match bind_socket(Domain::IPV6, ipv6) {
        Ok(listener) => return Ok((ipv6.to_string(), listener)),
        Err(e) => warn!("Failed to bind IPv6 listener: {}. Attempting IPv4 only.", e),
    }

    let ipv4 = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    info!("Attempting to bind server to {}... (IPv4)", ipv4);
    Ok((ipv4.to_string(), bind_socket(Domain::IPV4, ipv4)?))
}

fn bind_socket(domain: Domain, addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    if domain == Domain::IPV6 {
        // Some systems refuse dual-stack; IPv6 alone still works there.
        if let Err(e) = socket.set_only_v6(false) {
            warn!("Failed to set dual-stack mode for IPv6 socket: {}. Continuing anyway.", e);
        }
    }

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;

    TcpListener::from_std(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_binds_ephemeral_port_on_localhost() {
        let (addr, listener) = create_listener("127.0.0.1", 0).await.unwrap();
        let local = listener.local_addr().unwrap();
        assert_ne!(local.port(), 0);
        assert_eq!(addr, local.to_string());
    }
}
