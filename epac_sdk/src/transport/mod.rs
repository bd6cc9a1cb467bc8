use async_trait::async_trait;
use url::Url;

use crate::{
    definitions::{Reply, Request, Response},
    name::Name,
};

pub mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::TcpFace;

/// Forwarder address used when none is configured
pub const DEFAULT_FORWARDER: &str = "tcp://127.0.0.1:6363";

/// A connection to the name-addressed network
#[async_trait]
pub trait Face: Send {
    /// Send `request` and wait for the matching response or nack.
    /// Waiting is unbounded; callers enforce their own deadline.
    async fn express_request(&mut self, request: &Request) -> Result<Reply, TransportError>;

    /// Publish a response, solicited or not
    async fn put(&mut self, response: &Response) -> Result<(), TransportError>;

    /// Ask the forwarder to route requests under `prefix` to this face
    async fn register_prefix(&mut self, prefix: &Name) -> Result<(), TransportError>;

    /// Wait for the next request routed to this face
    async fn next_request(&mut self) -> Result<Request, TransportError>;
}

/// Open a face to the forwarder at `transport`
pub async fn connect(transport: &Url) -> Result<Box<dyn Face>, TransportError> {
    match transport.scheme() {
        tcp::SCHEME => Ok(Box::new(TcpFace::connect(transport).await?)),
        _ => Err(TransportError::InvalidTransportScheme(
            transport.scheme().to_string(),
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn unknown_scheme() {
        let url = Url::parse("quic://localhost:6363").unwrap();

        assert!(matches!(
            connect(&url).await,
            Err(TransportError::InvalidTransportScheme(scheme)) if scheme == "quic"
        ));
    }
}
