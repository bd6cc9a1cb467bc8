use crate::tlv::DecodeError;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("connection to '{0}' failed: {1}")]
    Connection(String, std::io::Error),
    #[error("invalid address '{0}'")]
    InvalidTransportAddress(String),
    #[error("invalid transport scheme '{0}'")]
    InvalidTransportScheme(String),
    #[error("invalid packet received: {0}")]
    Decode(#[from] DecodeError),
    #[error("prefix registration failure: {0}")]
    Registration(String),
    #[error("connection closed by the forwarder")]
    Closed,
}
