//! Datagram transport.
//!
//! One UDP socket, bound to the discovery port with broadcast enabled,
//! carries all traffic: outgoing presence broadcasts, outgoing unicast
//! chat datagrams, and everything received. The `Datagram` trait is the
//! seam between the node and the network so tests can substitute a
//! recording socket.

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

use crate::chat::error::ChatError;

/// Trait for connectionless datagram sockets.
#[async_trait]
pub trait Datagram: Send + Sync {
    /// Send one datagram to the given address.
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// Receive one datagram, returning its length and source address.
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Local address the socket is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl Datagram for UdpSocket {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, target).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }
}

/// Binds the shared discovery/chat socket and enables broadcast.
///
/// Bind failure is fatal to startup: without this socket the node can
/// neither announce nor hear anyone.
pub async fn bind_shared_socket(port: u16) -> Result<UdpSocket, ChatError> {
    let socket = UdpSocket::bind(("0.0.0.0", port))
        .await
        .map_err(|e| ChatError::BindFailed {
            port,
            reason: e.to_string(),
        })?;

    socket.set_broadcast(true).map_err(|e| ChatError::BindFailed {
        port,
        reason: e.to_string(),
    })?;

    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_shared_socket_ephemeral() {
        let socket = bind_shared_socket(0).await.unwrap();
        let addr = socket.local_addr().unwrap();

        assert_ne!(addr.port(), 0);
        assert!(socket.broadcast().unwrap());
    }

    #[tokio::test]
    async fn test_trait_object_send_and_receive() {
        let receiver = bind_shared_socket(0).await.unwrap();
        let port = receiver.local_addr().unwrap().port();
        let receiver_addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();

        let sender = bind_shared_socket(0).await.unwrap();
        let sender: &dyn Datagram = &sender;
        sender.send_to(b"ping", receiver_addr).await.unwrap();

        let mut buf = [0u8; 64];
        let (len, _from) = receiver.recv_from(&mut buf).await.unwrap();

        assert_eq!(&buf[..len], b"ping");
    }

    #[tokio::test]
    async fn test_bind_conflict_reports_port() {
        let first = bind_shared_socket(0).await.unwrap();
        let taken = first.local_addr().unwrap().port();

        match bind_shared_socket(taken).await {
            Err(ChatError::BindFailed { port, .. }) => assert_eq!(port, taken),
            other => panic!("expected bind failure, got {:?}", other.map(|_| ())),
        }
    }
}
