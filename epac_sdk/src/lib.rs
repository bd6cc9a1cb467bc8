#![deny(rustdoc::broken_intra_doc_links)]

//! # EPAC
//!
//! Encrypted publish and fetch of a single named item over a
//! name-addressed request/response network.
//!
//! A [Provider] reads a payload, encrypts it with RSA-OAEP for the holder
//! of its keypair and publishes it as a signed [Response], either right
//! away or as the answer to one request. A [Consumer] expresses one
//! [Request] and ends with exactly one [ExchangeOutcome]: a response, a
//! negative acknowledgment or a timeout.
//!
//! ## Core
//!
//! Names, the packet codec, key material and signing do not need an async
//! runtime. The `async` feature (enabled by default) adds the transport
//! layer, the forwarder and the two exchange roles, built on tokio.
//!
//! ## Example
//!
//! ```rust
//! # #[cfg(feature = "async")]
//! # mod example {
//! use epac_sdk::{
//!     Consumer, Error, ExchangeOutcome, Forwarder, KeyChain, KeyPair, Provider,
//!     ProviderOptions, RequestOptions, transport,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let forwarder = Forwarder::bind("127.0.0.1:0").await?;
//!     let url = forwarder.url()?;
//!     tokio::spawn(forwarder.serve());
//!
//!     let name: epac_sdk::Name = "/demo/item".parse()?;
//!     let mut provider = Provider::new(ProviderOptions::new(name.clone()), KeyPair::generate()?);
//!     let response = provider.build_response(&b"hello"[..], &KeyChain::new())?;
//!
//!     // the consumer shares the provider's private key
//!     let shared = KeyPair::from_private_key(provider.keys().private_key().clone());
//!     let mut options = RequestOptions::new(name);
//!     options.payload_only = true;
//!     let mut consumer = Consumer::new(options, shared);
//!
//!     let mut provider_face = transport::connect(&url).await?;
//!     let serve = tokio::spawn(async move {
//!         provider.run(provider_face.as_mut(), &response).await
//!     });
//!
//!     // give the provider time to register its prefix
//!     tokio::time::sleep(std::time::Duration::from_millis(100)).await;
//!
//!     let mut consumer_face = transport::connect(&url).await?;
//!     let outcome = consumer.start(consumer_face.as_mut()).await?;
//!     assert!(matches!(outcome, ExchangeOutcome::Response(_)));
//!
//!     let mut out = Vec::new();
//!     consumer.write_output(&mut out)?;
//!     assert_eq!(out, b"hello\n");
//!
//!     # let _ = serve.await;
//!     Ok(())
//! }
//! # }
//! ```

/// Hierarchical names and their text form
pub mod name;

/// NDN-style TLV encoding and decoding of packets
pub mod tlv;

/// Key material and the cryptographic envelope:
///   - 1024-bit RSA keypairs, persisted as DER files
///   - RSAES-OAEP (SHA-1) encryption of payloads
///   - a key chain signing responses with SHA-256 digests or Ed25519
pub mod crypto;

/// Packet data structures shared by all layers
pub mod definitions;
mod error;
mod registry;

/// Faces: connections (built using [tokio](https://tokio.rs/)) from an
/// application to the forwarder.
#[cfg(feature = "async")]
pub mod transport;

#[cfg(feature = "async")]
mod consumer;
#[cfg(feature = "async")]
mod forwarder;
#[cfg(feature = "async")]
mod provider;


#[cfg(feature = "async")]
pub use consumer::{Consumer, ConsumerState, ExchangeOutcome, OutcomeKind, RequestOptions};
#[cfg(feature = "async")]
pub use forwarder::{CONTENT_STORE_CAPACITY, Forwarder};
#[cfg(feature = "async")]
pub use provider::{DEFAULT_PROVIDER_TIMEOUT, Provider, ProviderOptions, ProviderState, RunMode};

pub use crypto::{KeyChain, KeyPair, SigningInfo};
pub use definitions::{
    DEFAULT_REQUEST_LIFETIME, Delegation, Nack, NackReason, Reply, Request, Response,
};
pub use error::Error;
pub use name::{Component, Name};
pub use registry::UserKeyRegistry;
