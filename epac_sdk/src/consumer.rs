use std::{
    io::Write,
    time::{Duration, Instant},
};
use zeroize::Zeroizing;

use crate::{
    Error,
    crypto::{KeyPair, decrypt},
    definitions::{
        CHILD_SELECTOR_RIGHTMOST, DEFAULT_REQUEST_LIFETIME, Delegation, Nack, Reply, Request,
        Response, Selectors,
    },
    name::Name,
    transport::Face,
};

/// Everything needed to build and run one outbound request
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub name: Name,
    pub min_suffix_components: Option<u32>,
    pub max_suffix_components: Option<u32>,
    pub lifetime: Option<Duration>,
    pub must_be_fresh: bool,
    pub want_rightmost: bool,
    pub forwarding_hint: Option<Vec<Delegation>>,
    pub verbose: bool,
    pub payload_only: bool,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumerState {
    Idle,
    Awaiting,
    Done,
}

/// The terminal result of one exchange
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Response(Response),
    NegativeAck(Nack),
    Timeout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeKind {
    Response,
    NegativeAck,
    Timeout,
}

impl ExchangeOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            ExchangeOutcome::Response(_) => OutcomeKind::Response,
            ExchangeOutcome::NegativeAck(_) => OutcomeKind::NegativeAck,
            ExchangeOutcome::Timeout => OutcomeKind::Timeout,
        }
    }
}

impl OutcomeKind {
    /// Process exit code reported by the peek tool for this outcome
    pub fn exit_code(self) -> i32 {
        match self {
            OutcomeKind::Response => 0,
            OutcomeKind::Timeout => 3,
            OutcomeKind::NegativeAck => 4,
        }
    }
}

/// Fetches one named item and classifies the result
pub struct Consumer {
    options: RequestOptions,
    keys: KeyPair,
    timeout: Duration,
    state: ConsumerState,
    outcome: Option<ExchangeOutcome>,
}

impl Consumer {
    /// The effective timeout is the explicit timeout, else the request
    /// lifetime, else [DEFAULT_REQUEST_LIFETIME]
    pub fn new(options: RequestOptions, keys: KeyPair) -> Self {
        let timeout = options
            .timeout
            .or(options.lifetime)
            .unwrap_or(DEFAULT_REQUEST_LIFETIME);

        Self {
            options,
            keys,
            timeout,
            state: ConsumerState::Idle,
            outcome: None,
        }
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn outcome(&self) -> Option<&ExchangeOutcome> {
        self.outcome.as_ref()
    }

    /// Build the request described by the options, with a fresh nonce
    pub fn create_request(&self) -> Request {
        let options = &self.options;
        let mut request = Request::new(options.name.clone());

        request.selectors = Selectors {
            min_suffix_components: options.min_suffix_components.map(u64::from),
            max_suffix_components: options.max_suffix_components.map(u64::from),
            child_selector: options.want_rightmost.then_some(CHILD_SELECTOR_RIGHTMOST),
            must_be_fresh: options.must_be_fresh,
        };
        request.lifetime = options.lifetime;

        if let Some(hint) = &options.forwarding_hint {
            request.forwarding_hint = hint.clone();
        }

        request
    }

    /// Send one request and wait for the first of response, nack or timeout
    pub async fn start<F: Face + ?Sized>(&mut self, face: &mut F) -> Result<&ExchangeOutcome, Error> {
        if self.state != ConsumerState::Idle {
            return Err(Error::Config("exchange already started".to_string()));
        }

        let request = self.create_request();
        if self.options.verbose {
            tracing::info!("REQUEST: {request}");
        }

        let sent = Instant::now();
        self.state = ConsumerState::Awaiting;

        let reply = tokio::time::timeout(self.timeout, face.express_request(&request)).await;
        self.state = ConsumerState::Done;

        let outcome = match reply {
            Ok(Ok(Reply::Response(response))) => {
                if self.options.verbose {
                    tracing::info!("DATA, RTT: {}ms", sent.elapsed().as_millis());
                }
                ExchangeOutcome::Response(response)
            }
            Ok(Ok(Reply::Nack(nack))) => {
                if self.options.verbose {
                    tracing::info!("NACK, RTT: {}ms", sent.elapsed().as_millis());
                }
                ExchangeOutcome::NegativeAck(nack)
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                if self.options.verbose {
                    tracing::info!("TIMEOUT");
                }
                ExchangeOutcome::Timeout
            }
        };

        Ok(&*self.outcome.insert(outcome))
    }

    /// Decrypt the content of a received response with this consumer's private key
    pub fn decrypt_payload(&self, response: &Response) -> Result<Zeroizing<Vec<u8>>, Error> {
        Ok(Zeroizing::new(decrypt(
            self.keys.private_key(),
            &response.content,
        )?))
    }

    /// Write the outcome: the plaintext (payload-only) or the raw packet.
    /// A timeout writes nothing.
    pub fn write_output(&self, out: &mut impl Write) -> Result<(), Error> {
        match &self.outcome {
            Some(ExchangeOutcome::Response(response)) if self.options.payload_only => {
                let plaintext = self.decrypt_payload(response)?;
                out.write_all(&plaintext)?;
                out.write_all(b"\n")?;
            }
            Some(ExchangeOutcome::Response(response)) => out.write_all(&response.wire_encode())?,
            Some(ExchangeOutcome::NegativeAck(nack)) if self.options.payload_only => {
                writeln!(out, "{}", nack.reason)?
            }
            Some(ExchangeOutcome::NegativeAck(nack)) => out.write_all(&nack.wire_encode())?,
            Some(ExchangeOutcome::Timeout) | None => {}
        }

        out.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{crypto::encrypt, definitions::NackReason, transport::TransportError};
    use async_trait::async_trait;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    /// Face that answers every request with a canned reply, or never
    struct CannedFace {
        reply: Option<Reply>,
        expressed: Vec<Request>,
    }

    #[async_trait]
    impl Face for CannedFace {
        async fn express_request(&mut self, request: &Request) -> Result<Reply, TransportError> {
            self.expressed.push(request.clone());
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => futures::future::pending().await,
            }
        }

        async fn put(&mut self, _: &Response) -> Result<(), TransportError> {
            Ok(())
        }

        async fn register_prefix(&mut self, _: &Name) -> Result<(), TransportError> {
            Ok(())
        }

        async fn next_request(&mut self) -> Result<Request, TransportError> {
            futures::future::pending().await
        }
    }

    #[test]
    fn effective_timeout() {
        let keys = || KeyPair::generate().unwrap();
        let mut options = RequestOptions::new(name("/a"));

        assert_eq!(
            Consumer::new(options.clone(), keys()).timeout(),
            DEFAULT_REQUEST_LIFETIME
        );

        options.lifetime = Some(Duration::from_millis(1500));
        assert_eq!(
            Consumer::new(options.clone(), keys()).timeout(),
            Duration::from_millis(1500)
        );

        options.timeout = Some(Duration::from_millis(200));
        assert_eq!(
            Consumer::new(options, keys()).timeout(),
            Duration::from_millis(200)
        );
    }

    #[test]
    fn request_from_options() {
        let mut options = RequestOptions::new(name("/a/b"));
        let consumer = Consumer::new(options.clone(), KeyPair::generate().unwrap());

        let request = consumer.create_request();
        assert_eq!(request.name, name("/a/b"));
        assert!(request.selectors.is_empty());
        assert_eq!(request.lifetime, None);
        assert!(request.forwarding_hint.is_empty());

        options.min_suffix_components = Some(1);
        options.max_suffix_components = Some(3);
        options.must_be_fresh = true;
        options.want_rightmost = true;
        options.lifetime = Some(Duration::from_secs(2));
        options.forwarding_hint = Some(vec![Delegation {
            preference: 10,
            name: name("/hub"),
        }]);
        let consumer = Consumer::new(options, KeyPair::generate().unwrap());

        let request = consumer.create_request();
        assert_eq!(request.selectors.min_suffix_components, Some(1));
        assert_eq!(request.selectors.max_suffix_components, Some(3));
        assert_eq!(request.selectors.child_selector, Some(CHILD_SELECTOR_RIGHTMOST));
        assert!(request.selectors.must_be_fresh);
        assert_eq!(request.lifetime, Some(Duration::from_secs(2)));
        assert_eq!(request.forwarding_hint.len(), 1);

        // nonces are fresh per request
        assert_ne!(consumer.create_request().nonce, consumer.create_request().nonce);
    }

    #[tokio::test]
    async fn response_is_decrypted() {
        let keys = KeyPair::generate().unwrap();
        let mut response = Response::new(name("/a/b"));
        response.content = encrypt(keys.public_key(), b"hello").unwrap();

        let mut face = CannedFace {
            reply: Some(Reply::Response(response)),
            expressed: Vec::new(),
        };

        let mut options = RequestOptions::new(name("/a/b"));
        options.payload_only = true;
        let mut consumer = Consumer::new(options, keys);
        assert_eq!(consumer.state(), ConsumerState::Idle);

        let outcome = consumer.start(&mut face).await.unwrap();
        assert_eq!(outcome.kind(), OutcomeKind::Response);
        assert_eq!(consumer.state(), ConsumerState::Done);
        assert_eq!(face.expressed.len(), 1);

        let mut out = Vec::new();
        consumer.write_output(&mut out).unwrap();
        assert_eq!(out, b"hello\n");

        // a second start is refused, the outcome is final
        assert!(matches!(
            consumer.start(&mut face).await,
            Err(Error::Config(_))
        ));
        assert_eq!(face.expressed.len(), 1);
    }

    #[tokio::test]
    async fn foreign_ciphertext_is_reported() {
        let provider = KeyPair::generate().unwrap();
        let mut response = Response::new(name("/a"));
        response.content = encrypt(provider.public_key(), b"secret").unwrap();

        let mut face = CannedFace {
            reply: Some(Reply::Response(response)),
            expressed: Vec::new(),
        };

        let mut options = RequestOptions::new(name("/a"));
        options.payload_only = true;
        let mut consumer = Consumer::new(options, KeyPair::generate().unwrap());
        consumer.start(&mut face).await.unwrap();

        let mut out = Vec::new();
        assert!(matches!(
            consumer.write_output(&mut out),
            Err(Error::Crypto(_))
        ));
        assert!(out.is_empty());
        assert_eq!(consumer.outcome().map(ExchangeOutcome::kind), Some(OutcomeKind::Response));
    }

    #[tokio::test]
    async fn nack_outcome() {
        let request = Request::new(name("/a"));
        let mut face = CannedFace {
            reply: Some(Reply::Nack(Nack::new(request, NackReason::NoRoute))),
            expressed: Vec::new(),
        };

        let mut options = RequestOptions::new(name("/a"));
        options.payload_only = true;
        let mut consumer = Consumer::new(options, KeyPair::generate().unwrap());

        let outcome = consumer.start(&mut face).await.unwrap();
        assert_eq!(outcome.kind(), OutcomeKind::NegativeAck);
        assert_eq!(outcome.kind().exit_code(), 4);

        let mut out = Vec::new();
        consumer.write_output(&mut out).unwrap();
        assert_eq!(out, b"NoRoute\n");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_outcome() {
        let mut face = CannedFace {
            reply: None,
            expressed: Vec::new(),
        };

        let mut options = RequestOptions::new(name("/a"));
        options.timeout = Some(Duration::from_millis(200));
        let mut consumer = Consumer::new(options, KeyPair::generate().unwrap());

        let outcome = consumer.start(&mut face).await.unwrap();
        assert_eq!(outcome, &ExchangeOutcome::Timeout);
        assert_eq!(outcome.kind().exit_code(), 3);

        let mut out = Vec::new();
        consumer.write_output(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
