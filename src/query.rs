//! Single-shot DNS exchange with one nameserver: UDP first, with a TCP retry
//! when the response comes back truncated.

use crate::error::{DnsError, Result};
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name, RecordType};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::debug;

/// EDNS(0) advertised payload size (RFC 4035 recommends >= 4096 for DNSSEC)
const MAX_PAYLOAD: u16 = 4096;

#[derive(Debug, Clone)]
pub struct QueryClient {
    exchange_timeout: Duration,
    port: u16,
}

impl QueryClient {
    pub fn new(exchange_timeout: Duration, port: u16) -> Self {
        Self {
            exchange_timeout,
            port,
        }
    }

    /// Send `(name, rtype)` to `nameserver` and return the parsed response.
    ///
    /// The question carries EDNS(0) with the DO bit set. If the UDP response
    /// has the TC flag, the same query is retried over TCP and that response
    /// is returned instead. Transport and parse failures surface to the
    /// caller, which decides whether to try another nameserver.
    pub async fn query(&self, name: &Name, rtype: RecordType, nameserver: &str) -> Result<Message> {
        let request = build_query(name, rtype);
        let wire = request.to_vec()?;
        let addr = format!("{}:{}", nameserver.trim_end_matches('.'), self.port);

        let response = self.exchange_udp(&wire, &addr, request.id()).await?;
        if response.truncated() {
            debug!(
                "truncated response for {} {:?} from {}, retrying over TCP",
                name, rtype, addr
            );
            return self.exchange_tcp(&wire, &addr, request.id()).await;
        }

        Ok(response)
    }

    async fn exchange_udp(&self, wire: &[u8], addr: &str, id: u16) -> Result<Message> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(addr).await?;
        socket.send(wire).await?;

        let mut buf = vec![0u8; MAX_PAYLOAD as usize];
        let len = timeout(self.exchange_timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| DnsError::Timeout)??;

        let response = Message::from_vec(&buf[..len])?;
        if response.id() != id {
            return Err(DnsError::Proto(format!(
                "response id {} does not match query id {}",
                response.id(),
                id
            )));
        }
        Ok(response)
    }

    async fn exchange_tcp(&self, wire: &[u8], addr: &str, id: u16) -> Result<Message> {
        let mut stream = timeout(self.exchange_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| DnsError::Timeout)??;

        stream.write_all(&(wire.len() as u16).to_be_bytes()).await?;
        stream.write_all(wire).await?;
        stream.flush().await?;

        let mut length_buf = [0u8; 2];
        timeout(self.exchange_timeout, stream.read_exact(&mut length_buf))
            .await
            .map_err(|_| DnsError::Timeout)??;
        let message_length = u16::from_be_bytes(length_buf) as usize;

        let mut message_buf = vec![0u8; message_length];
        timeout(self.exchange_timeout, stream.read_exact(&mut message_buf))
            .await
            .map_err(|_| DnsError::Timeout)??;

        let response = Message::from_vec(&message_buf)?;
        if response.id() != id {
            return Err(DnsError::Proto(format!(
                "response id {} does not match query id {}",
                response.id(),
                id
            )));
        }
        Ok(response)
    }
}

pub(crate) fn build_query(name: &Name, rtype: RecordType) -> Message {
    let mut query = Query::new();
    query.set_name(name.clone());
    query.set_query_type(rtype);
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new();
    message.set_id(fastrand::u16(..));
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.add_query(query);
    message.set_edns(default_edns());
    message
}

fn default_edns() -> Edns {
    let mut edns = Edns::new();
    edns.set_max_payload(MAX_PAYLOAD);
    edns.set_dnssec_ok(true);
    edns.set_version(0);
    edns
}
