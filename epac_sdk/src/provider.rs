use rsa::RsaPublicKey;
use std::{io::Read, time::Duration};
use zeroize::Zeroizing;

use crate::{
    Error,
    crypto::{KeyChain, KeyPair, SigningInfo, encrypt},
    definitions::Response,
    name::Name,
    registry::UserKeyRegistry,
    transport::Face,
};

/// How long a provider waits for a request when no timeout is given
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderOptions {
    pub name: Name,
    pub freshness_period: Option<Duration>,
    pub set_final_block_id: bool,
    pub signing: SigningInfo,
    /// Publish right away instead of waiting for a request
    pub force: bool,
    pub timeout: Option<Duration>,
}

impl ProviderOptions {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    ImmediatePublish,
    AwaitOneRequest { timeout: Duration },
}

impl From<&ProviderOptions> for RunMode {
    fn from(options: &ProviderOptions) -> Self {
        if options.force {
            RunMode::ImmediatePublish
        } else {
            RunMode::AwaitOneRequest {
                timeout: options.timeout.unwrap_or(DEFAULT_PROVIDER_TIMEOUT),
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderState {
    Ready,
    WaitingForRequest,
    Sent,
}

/// Publishes one encrypted item, pushed or on request
pub struct Provider {
    options: ProviderOptions,
    keys: KeyPair,
    mode: RunMode,
    state: ProviderState,
    registry: UserKeyRegistry,
}

impl Provider {
    pub fn new(options: ProviderOptions, keys: KeyPair) -> Self {
        let mode = RunMode::from(&options);

        Self {
            options,
            keys,
            mode,
            state: ProviderState::Ready,
            registry: UserKeyRegistry::new(),
        }
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn state(&self) -> ProviderState {
        self.state
    }

    pub fn is_data_sent(&self) -> bool {
        self.state == ProviderState::Sent
    }

    pub fn register_user(
        &mut self,
        user_id: impl Into<String>,
        public_key: RsaPublicKey,
    ) -> Option<RsaPublicKey> {
        self.registry.register(user_id, public_key)
    }

    pub fn lookup_user(&self, user_id: &str) -> Option<&RsaPublicKey> {
        self.registry.lookup(user_id)
    }

    /// Read the whole payload, encrypt it with the provider's public key
    /// and produce the signed response
    pub fn build_response(
        &self,
        mut payload: impl Read,
        key_chain: &KeyChain,
    ) -> Result<Response, Error> {
        let options = &self.options;

        let final_block_id = match (options.set_final_block_id, options.name.last()) {
            (false, _) => None,
            (true, Some(last)) => Some(last.clone()),
            (true, None) => {
                return Err(Error::Config(
                    "cannot set a final block id on an empty name".to_string(),
                ));
            }
        };

        let mut plaintext = Zeroizing::new(Vec::new());
        payload.read_to_end(&mut plaintext)?;

        let mut response = Response::new(options.name.clone());
        response.content = encrypt(self.keys.public_key(), &plaintext)?;
        response.meta_info.freshness_period = options.freshness_period;
        response.meta_info.final_block_id = final_block_id;

        key_chain.sign(&mut response, &options.signing)?;

        tracing::debug!("built response {response}");

        Ok(response)
    }

    /// Publish `response` according to the run mode. Without `force` the
    /// response is only sent once a request arrives before the timeout;
    /// check [Provider::is_data_sent] afterwards.
    pub async fn run<F: Face + ?Sized>(
        &mut self,
        face: &mut F,
        response: &Response,
    ) -> Result<(), Error> {
        let timeout = match self.mode {
            RunMode::ImmediatePublish => {
                face.put(response).await?;
                self.state = ProviderState::Sent;
                tracing::info!("published {}", response.name);

                return Ok(());
            }
            RunMode::AwaitOneRequest { timeout } => timeout,
        };

        // one bound covers both the registration and the wait for a request
        let deadline = tokio::time::Instant::now() + timeout;

        match tokio::time::timeout_at(deadline, face.register_prefix(&self.options.name)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("prefix registration failure: {e}");
                return Ok(());
            }
            Err(_) => {
                tracing::error!(
                    "prefix registration failure: no answer for {} within {}ms",
                    self.options.name,
                    timeout.as_millis()
                );
                return Ok(());
            }
        }

        self.state = ProviderState::WaitingForRequest;

        match tokio::time::timeout_at(deadline, face.next_request()).await {
            Ok(request) => {
                let request = request?;
                tracing::info!("received request {request}");

                face.put(response).await?;
                self.state = ProviderState::Sent;
                tracing::info!("answered with {}", response.name);
            }
            Err(_) => tracing::warn!(
                "no request for {} within {}ms",
                self.options.name,
                timeout.as_millis()
            ),
        }

        Ok(())
    }
}
