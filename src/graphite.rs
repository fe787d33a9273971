//! Graphite plaintext transport over TCP or UDP
//!
//! The adapter opens one socket per dispatch, writes the batch and closes
//! the socket again. Over TCP the batch is one buffered write; over UDP it is
//! split at line boundaries into datagrams of at most [`MAX_DATAGRAM_BYTES`].

use super::*;
use crate::config::Protocol;
use crate::errors::{close_error, connection_error, send_error};
use crate::port::CollectorTarget;
use crate::utils::format_lines;
use async_trait::async_trait;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};

/// Connect timeout of the transport, in seconds
pub const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Largest UDP payload that fits in one IPv4 datagram
pub const MAX_DATAGRAM_BYTES: usize = 65_507;

enum Connection {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

/// Transport adapter writing to a Graphite/Carbon plaintext listener
///
/// ## Example Usage
/// ```rust,no_run
/// use tyl_graphite_handler::{
///     CollectorTarget, GraphiteRecord, GraphiteTransport, MetricsTransport, Protocol,
/// };
///
/// # tokio_test::block_on(async {
/// let target = CollectorTarget::new("127.0.0.1", 2003, Protocol::Tcp);
/// let mut transport = GraphiteTransport::connect(target).await.unwrap();
/// transport
///     .send_batch(&[GraphiteRecord::new("sensu.root", "87.500000", 1000)])
///     .await
///     .unwrap();
/// transport.close().await.unwrap();
/// # });
/// ```
pub struct GraphiteTransport {
    target: CollectorTarget,
    connection: Connection,
}

impl GraphiteTransport {
    /// The collector this transport is connected to
    pub fn target(&self) -> &CollectorTarget {
        &self.target
    }

    async fn connect_tcp(target: &CollectorTarget) -> std::io::Result<Connection> {
        let stream = TcpStream::connect(target.address()).await?;
        stream.set_nodelay(true)?;
        Ok(Connection::Tcp(stream))
    }

    async fn connect_udp(target: &CollectorTarget) -> std::io::Result<Connection> {
        let remote = tokio::net::lookup_host(target.address())
            .await?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no address found for {}", target.host),
                )
            })?;

        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(remote).await?;
        Ok(Connection::Udp(socket))
    }
}

/// Pack protocol lines into payloads no larger than `max_bytes`
///
/// Lines are never split; a single line longer than `max_bytes` gets a
/// payload of its own.
pub fn datagram_payloads(records: &[GraphiteRecord], max_bytes: usize) -> Vec<String> {
    let mut payloads = Vec::new();
    let mut current = String::new();

    for record in records {
        let line = record.to_line();
        if !current.is_empty() && current.len() + line.len() > max_bytes {
            payloads.push(std::mem::take(&mut current));
        }
        current.push_str(&line);
    }

    if !current.is_empty() {
        payloads.push(current);
    }
    payloads
}

#[async_trait]
impl MetricsTransport for GraphiteTransport {
    type Config = CollectorTarget;

    async fn connect(config: Self::Config) -> Result<Self> {
        let endpoint = config.to_string();
        let connecting = async {
            match config.protocol {
                Protocol::Tcp => Self::connect_tcp(&config).await,
                Protocol::Udp => Self::connect_udp(&config).await,
            }
        };

        let connection =
            match tokio::time::timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS), connecting).await
            {
                Ok(Ok(connection)) => connection,
                Ok(Err(e)) => return Err(connection_error(&endpoint, e.to_string())),
                Err(_) => {
                    return Err(connection_error(
                        &endpoint,
                        format!("timed out after {CONNECT_TIMEOUT_SECS}s"),
                    ))
                }
            };

        tracing::debug!(endpoint = endpoint.as_str(), "connected to collector");
        Ok(Self {
            target: config,
            connection,
        })
    }

    async fn send_batch(&mut self, records: &[GraphiteRecord]) -> Result<()> {
        let payload = format_lines(records);
        let endpoint = self.target.to_string();

        match &mut self.connection {
            Connection::Tcp(stream) => {
                stream
                    .write_all(payload.as_bytes())
                    .await
                    .map_err(|e| send_error(&endpoint, e.to_string()))?;
                stream
                    .flush()
                    .await
                    .map_err(|e| send_error(&endpoint, e.to_string()))?;
            }
            Connection::Udp(socket) => {
                for datagram in datagram_payloads(records, MAX_DATAGRAM_BYTES) {
                    let written = socket
                        .send(datagram.as_bytes())
                        .await
                        .map_err(|e| send_error(&endpoint, e.to_string()))?;
                    if written != datagram.len() {
                        return Err(send_error(
                            &endpoint,
                            format!("short datagram write ({written} of {} bytes)", datagram.len()),
                        ));
                    }
                }
            }
        }

        tracing::debug!(
            endpoint = endpoint.as_str(),
            records = records.len(),
            bytes = payload.len(),
            "sent batch"
        );
        Ok(())
    }

    async fn close(self) -> Result<()> {
        let endpoint = self.target.to_string();
        match self.connection {
            Connection::Tcp(mut stream) => stream
                .shutdown()
                .await
                .map_err(|e| close_error(&endpoint, e.to_string())),
            Connection::Udp(_) => Ok(()),
        }
    }

    fn describe(&self) -> String {
        self.target.to_string()
    }
}
