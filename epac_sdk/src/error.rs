/// Error originating from the EPAC library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error: invalid configuration: {0}")]
    Config(String),
    #[cfg(feature = "async")]
    #[error("Error: {0}")]
    Transport(#[from] crate::transport::TransportError),
    #[error("Error: {0}")]
    Crypto(#[from] crate::crypto::CryptoError),
    #[error("Error: {0}")]
    Sign(#[from] crate::crypto::SignError),
    #[error("Error: {0}")]
    Decode(#[from] crate::tlv::DecodeError),
    #[error("Error: {0}")]
    Name(#[from] crate::name::NameError),
    #[error("Error: {0}")]
    Io(#[from] std::io::Error),
}
