use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use url::Url;

use super::{Face, TransportError};
use crate::{
    definitions::{Packet, Reply, Request, Response},
    name::Name,
    tlv::{decode_packet, encode_packet},
};

pub(crate) const SCHEME: &str = "tcp";

/// A face speaking length-delimited TLV packets over a TCP connection
pub struct TcpFace {
    peer: String,
    framed: Framed<TcpStream, LengthDelimitedCodec>,
    // requests that arrived while waiting for something else
    pending: VecDeque<Request>,
}

impl TcpFace {
    pub async fn connect(url: &Url) -> Result<Self, TransportError> {
        let addresses = url
            .socket_addrs(|| None)
            .map_err(|_| TransportError::InvalidTransportAddress(url.to_string()))?;

        let Some(address) = addresses.first() else {
            return Err(TransportError::InvalidTransportAddress(url.to_string()));
        };

        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| TransportError::Connection(address.to_string(), e))?;

        tracing::debug!("connected to forwarder at {address}");

        Ok(Self {
            peer: address.to_string(),
            framed: Framed::new(stream, LengthDelimitedCodec::new()),
            pending: VecDeque::new(),
        })
    }

    async fn send(&mut self, packet: &Packet) -> Result<(), TransportError> {
        let wire = Bytes::from(encode_packet(packet));

        self.framed
            .send(wire)
            .await
            .map_err(|e| TransportError::Connection(self.peer.clone(), e))
    }

    async fn receive(&mut self) -> Result<Packet, TransportError> {
        match self.framed.next().await {
            Some(Ok(frame)) => Ok(decode_packet(&frame)?),
            Some(Err(e)) => Err(TransportError::Connection(self.peer.clone(), e)),
            None => Err(TransportError::Closed),
        }
    }
}

#[async_trait]
impl Face for TcpFace {
    async fn express_request(&mut self, request: &Request) -> Result<Reply, TransportError> {
        self.send(&Packet::Request(request.clone())).await?;

        loop {
            match self.receive().await? {
                Packet::Response(response) if request.matches_name(&response.name) => {
                    return Ok(Reply::Response(response));
                }
                Packet::Nack(nack) if nack.request.nonce == request.nonce => {
                    return Ok(Reply::Nack(nack));
                }
                Packet::Request(incoming) => self.pending.push_back(incoming),
                other => tracing::trace!("ignoring unrelated packet {other:?}"),
            }
        }
    }

    async fn put(&mut self, response: &Response) -> Result<(), TransportError> {
        self.send(&Packet::Response(response.clone())).await
    }

    async fn register_prefix(&mut self, prefix: &Name) -> Result<(), TransportError> {
        self.send(&Packet::Register(prefix.clone())).await?;

        loop {
            match self.receive().await? {
                Packet::RegisterResult(result) if result.is_ok() => {
                    tracing::debug!("registered prefix {prefix}");
                    return Ok(());
                }
                Packet::RegisterResult(result) => {
                    return Err(TransportError::Registration(format!(
                        "{prefix}: {} {}",
                        result.status_code, result.status_text
                    )));
                }
                Packet::Request(incoming) => self.pending.push_back(incoming),
                other => tracing::trace!("ignoring packet before registration result {other:?}"),
            }
        }
    }

    async fn next_request(&mut self) -> Result<Request, TransportError> {
        if let Some(request) = self.pending.pop_front() {
            return Ok(request);
        }

        loop {
            match self.receive().await? {
                Packet::Request(request) => return Ok(request),
                other => tracing::trace!("ignoring packet while waiting for a request {other:?}"),
            }
        }
    }
}
