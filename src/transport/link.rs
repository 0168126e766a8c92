//! Network links and the connector seam

use async_trait::async_trait;
use bytes::BytesMut;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::net::{TcpStream, UdpSocket};
use tokio_util::codec::{Decoder, FramedRead};
use tracing::{debug, info};

use super::codec::{CodecStats, UnitCodec, WireProtocol};
use crate::types::{RawFrame, TransportKind};
use crate::{Result, TelemetryError};

const MAX_DATAGRAM: usize = 65_535;

/// Socket type of an endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum LinkKind {
    #[default]
    Tcp,
    /// Bind `host:port` and receive datagrams
    Udp,
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub transport: LinkKind,
    #[serde(default)]
    pub protocol: WireProtocol,
}

impl Endpoint {
    pub fn tcp(host: impl Into<String>, port: u16, protocol: WireProtocol) -> Self {
        Self { host: host.into(), port, transport: LinkKind::Tcp, protocol }
    }

    pub fn udp(host: impl Into<String>, port: u16, protocol: WireProtocol) -> Self {
        Self { host: host.into(), port, transport: LinkKind::Udp, protocol }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(TelemetryError::config("endpoint host is empty"));
        }
        if self.port == 0 && self.transport == LinkKind::Tcp {
            return Err(TelemetryError::config("endpoint port must be non-zero for tcp"));
        }
        Ok(())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.transport {
            LinkKind::Tcp => "tcp",
            LinkKind::Udp => "udp",
        };
        write!(f, "{scheme}://{}:{}", self.host, self.port)
    }
}

/// An open connection yielding complete protocol units.
///
/// Dropping the link closes the underlying socket.
#[async_trait]
pub trait Link: Send + 'static {
    /// Next unit, in arrival order.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` - A complete unit arrived
    /// - `Ok(None)` - The peer closed the connection
    /// - `Err(e)` - Socket failure
    async fn next_unit(&mut self) -> Result<Option<RawFrame>>;

    /// Reassembly counters for this link.
    fn stats(&self) -> CodecStats;
}

/// Opens links to endpoints.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Link>>;
}

/// Opens real TCP and UDP sockets.
#[derive(Debug, Clone, Copy)]
pub struct NetConnector {
    max_buffer: usize,
}

impl NetConnector {
    pub fn new(max_buffer: usize) -> Self {
        Self { max_buffer }
    }
}

#[async_trait]
impl Connector for NetConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Link>> {
        let address = endpoint.address();
        match endpoint.transport {
            LinkKind::Tcp => {
                let stream = TcpStream::connect(&address).await.map_err(|e| {
                    TelemetryError::transport_failed_with_source(
                        format!("connect to {endpoint}"),
                        Box::new(e),
                    )
                })?;
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(error = %e, "Could not disable Nagle");
                }
                info!(%endpoint, "TCP link open");
                let codec = UnitCodec::new(endpoint.protocol, TransportKind::Stream, self.max_buffer);
                Ok(Box::new(TcpLink { framed: FramedRead::new(stream, codec) }))
            }
            LinkKind::Udp => {
                let socket = UdpSocket::bind(&address).await.map_err(|e| {
                    TelemetryError::transport_failed_with_source(
                        format!("bind {endpoint}"),
                        Box::new(e),
                    )
                })?;
                info!(%endpoint, "UDP link bound");
                let codec =
                    UnitCodec::new(endpoint.protocol, TransportKind::Datagram, self.max_buffer);
                Ok(Box::new(UdpLink::new(socket, codec)))
            }
        }
    }
}

struct TcpLink {
    framed: FramedRead<TcpStream, UnitCodec>,
}

#[async_trait]
impl Link for TcpLink {
    async fn next_unit(&mut self) -> Result<Option<RawFrame>> {
        self.framed.next().await.transpose()
    }

    fn stats(&self) -> CodecStats {
        self.framed.decoder().stats()
    }
}

/// Each datagram is decoded in full; units never span datagrams.
struct UdpLink {
    socket: UdpSocket,
    codec: UnitCodec,
    pending: BytesMut,
    scratch: Vec<u8>,
}

impl UdpLink {
    fn new(socket: UdpSocket, codec: UnitCodec) -> Self {
        Self { socket, codec, pending: BytesMut::new(), scratch: vec![0; MAX_DATAGRAM] }
    }
}

#[async_trait]
impl Link for UdpLink {
    async fn next_unit(&mut self) -> Result<Option<RawFrame>> {
        loop {
            if let Some(unit) = self.codec.decode_eof(&mut self.pending)? {
                return Ok(Some(unit));
            }
            let (len, peer) = self.socket.recv_from(&mut self.scratch).await.map_err(|e| {
                TelemetryError::transport_failed_with_source("datagram receive", Box::new(e))
            })?;
            tracing::trace!(len, %peer, "Datagram received");
            self.pending.extend_from_slice(&self.scratch[..len]);
        }
    }

    fn stats(&self) -> CodecStats {
        self.codec.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProtocolKind;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[test]
    fn endpoint_display_and_validation() {
        let endpoint = Endpoint::tcp("192.168.4.1", 10110, WireProtocol::Sentence);
        assert_eq!(endpoint.to_string(), "tcp://192.168.4.1:10110");
        assert!(endpoint.validate().is_ok());
        assert!(Endpoint::tcp(" ", 10110, WireProtocol::Auto).validate().is_err());
        assert!(Endpoint::tcp("host", 0, WireProtocol::Auto).validate().is_err());
    }

    #[test]
    fn endpoint_from_yaml_defaults() {
        let endpoint: Endpoint = serde_yaml_ng::from_str("host: gateway.local\nport: 2000\n").unwrap();
        assert_eq!(endpoint.transport, LinkKind::Tcp);
        assert_eq!(endpoint.protocol, WireProtocol::Sentence);
    }

    #[tokio::test]
    async fn tcp_link_reads_units_until_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"$GPHDT,1,T\r\n$GPH").await.unwrap();
            socket.write_all(b"DM,2,M\r\n").await.unwrap();
        });

        let connector = NetConnector::new(1_024);
        let mut link = connector
            .connect(&Endpoint::tcp("127.0.0.1", port, WireProtocol::Sentence))
            .await
            .unwrap();

        let first = link.next_unit().await.unwrap().unwrap();
        assert_eq!(first.as_bytes(), b"$GPHDT,1,T");
        let second = link.next_unit().await.unwrap().unwrap();
        assert_eq!(second.as_bytes(), b"$GPHDM,2,M");
        assert_eq!(second.protocol, ProtocolKind::Sentence);

        server.await.unwrap();
        assert!(link.next_unit().await.unwrap().is_none());
        assert_eq!(link.stats().units, 2);
    }

    #[tokio::test]
    async fn udp_link_splits_datagrams() {
        let connector = NetConnector::new(1_024);
        let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let mut link = connector
            .connect(&Endpoint::udp("127.0.0.1", port, WireProtocol::Sentence))
            .await
            .unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"$GPHDT,1,T\r\n$GPHDM,2,M", ("127.0.0.1", port)).await.unwrap();

        let first = link.next_unit().await.unwrap().unwrap();
        let second = link.next_unit().await.unwrap().unwrap();
        assert_eq!(first.as_bytes(), b"$GPHDT,1,T");
        assert_eq!(second.as_bytes(), b"$GPHDM,2,M");
        assert_eq!(second.transport, TransportKind::Datagram);
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = NetConnector::new(64)
            .connect(&Endpoint::tcp("127.0.0.1", port, WireProtocol::Sentence))
            .await;
        match result {
            Err(error) => assert!(error.is_retryable()),
            Ok(_) => panic!("connection to a closed port succeeded"),
        }
    }
}
