use core::fmt;
use std::time::Duration;

use crate::name::{Component, Name};

/// Lifetime assumed for a request that does not carry one
pub const DEFAULT_REQUEST_LIFETIME: Duration = Duration::from_secs(4);

/// Child selector value asking for the rightmost (canonically largest) match
pub const CHILD_SELECTOR_RIGHTMOST: u8 = 1;

/// An alternate routing hint: a preference and a name to forward towards
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delegation {
    pub preference: u64,
    pub name: Name,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selectors {
    pub min_suffix_components: Option<u64>,
    pub max_suffix_components: Option<u64>,
    pub child_selector: Option<u8>,
    pub must_be_fresh: bool,
}

impl Selectors {
    pub fn is_empty(&self) -> bool {
        self.min_suffix_components.is_none()
            && self.max_suffix_components.is_none()
            && self.child_selector.is_none()
            && !self.must_be_fresh
    }
}

/// A request (query) for a named response
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub name: Name,
    pub selectors: Selectors,
    pub nonce: u32,
    pub lifetime: Option<Duration>,
    pub forwarding_hint: Vec<Delegation>,
}

impl Request {
    /// Create a request for `name` with a fresh random nonce
    pub fn new(name: Name) -> Self {
        Self {
            name,
            selectors: Selectors::default(),
            nonce: rand::random(),
            lifetime: None,
            forwarding_hint: Vec::new(),
        }
    }

    pub fn lifetime_or_default(&self) -> Duration {
        self.lifetime.unwrap_or(DEFAULT_REQUEST_LIFETIME)
    }

    /// Check whether a response name satisfies the name and suffix
    /// selectors of this request. The suffix count includes the implicit
    /// digest component of the response.
    pub fn matches_name(&self, name: &Name) -> bool {
        if !self.name.is_prefix_of(name) {
            return false;
        }

        let suffix = (name.len() + 1 - self.name.len()) as u64;

        if let Some(min) = self.selectors.min_suffix_components {
            if suffix < min {
                return false;
            }
        }

        if let Some(max) = self.selectors.max_suffix_components {
            if suffix > max {
                return false;
            }
        }

        true
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut params = Vec::new();

        if let Some(min) = self.selectors.min_suffix_components {
            params.push(format!("ndn.MinSuffixComponents={min}"));
        }
        if let Some(max) = self.selectors.max_suffix_components {
            params.push(format!("ndn.MaxSuffixComponents={max}"));
        }
        if let Some(child) = self.selectors.child_selector {
            params.push(format!("ndn.ChildSelector={child}"));
        }
        if self.selectors.must_be_fresh {
            params.push("ndn.MustBeFresh=1".to_string());
        }
        if let Some(lifetime) = self.lifetime {
            params.push(format!("ndn.InterestLifetime={}", lifetime.as_millis()));
        }
        params.push(format!("ndn.Nonce={}", self.nonce));

        for delegation in &self.forwarding_hint {
            params.push(format!(
                "ndn.ForwardingHint={},{}",
                delegation.preference, delegation.name
            ));
        }

        write!(f, "{}?{}", self.name, params.join("&"))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContentType {
    #[default]
    Blob,
    Link,
    Key,
    Nack,
    Other(u64),
}

impl From<u64> for ContentType {
    fn from(value: u64) -> Self {
        match value {
            0 => ContentType::Blob,
            1 => ContentType::Link,
            2 => ContentType::Key,
            3 => ContentType::Nack,
            other => ContentType::Other(other),
        }
    }
}

impl From<ContentType> for u64 {
    fn from(value: ContentType) -> Self {
        match value {
            ContentType::Blob => 0,
            ContentType::Link => 1,
            ContentType::Key => 2,
            ContentType::Nack => 3,
            ContentType::Other(other) => other,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetaInfo {
    pub content_type: ContentType,
    pub freshness_period: Option<Duration>,
    pub final_block_id: Option<Component>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignatureType {
    #[default]
    DigestSha256,
    Sha256WithRsa,
    Sha256WithEcdsa,
    HmacWithSha256,
    Ed25519,
    Other(u64),
}

impl From<u64> for SignatureType {
    fn from(value: u64) -> Self {
        match value {
            0 => SignatureType::DigestSha256,
            1 => SignatureType::Sha256WithRsa,
            3 => SignatureType::Sha256WithEcdsa,
            4 => SignatureType::HmacWithSha256,
            5 => SignatureType::Ed25519,
            other => SignatureType::Other(other),
        }
    }
}

impl From<SignatureType> for u64 {
    fn from(value: SignatureType) -> Self {
        match value {
            SignatureType::DigestSha256 => 0,
            SignatureType::Sha256WithRsa => 1,
            SignatureType::Sha256WithEcdsa => 3,
            SignatureType::HmacWithSha256 => 4,
            SignatureType::Ed25519 => 5,
            SignatureType::Other(other) => other,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignatureInfo {
    pub signature_type: SignatureType,
    pub key_locator: Option<Name>,
}

/// A named response carrying (encrypted) content
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub name: Name,
    pub meta_info: MetaInfo,
    pub content: Vec<u8>,
    pub signature_info: SignatureInfo,
    pub signature_value: Vec<u8>,
}

impl Response {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            meta_info: MetaInfo::default(),
            content: Vec::new(),
            signature_info: SignatureInfo::default(),
            signature_value: Vec::new(),
        }
    }

    /// A response satisfies a request when the name matches and, for
    /// must-be-fresh requests, the response is still within its freshness period
    pub fn satisfies(&self, request: &Request, age: Duration) -> bool {
        if !request.matches_name(&self.name) {
            return false;
        }

        if request.selectors.must_be_fresh {
            match self.meta_info.freshness_period {
                Some(period) => age < period,
                None => false,
            }
        } else {
            true
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.name, self.content.len())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NackReason {
    #[default]
    None,
    Congestion,
    Duplicate,
    NoRoute,
}

impl From<u64> for NackReason {
    fn from(value: u64) -> Self {
        match value {
            50 => NackReason::Congestion,
            100 => NackReason::Duplicate,
            150 => NackReason::NoRoute,
            _ => NackReason::None,
        }
    }
}

impl From<NackReason> for u64 {
    fn from(value: NackReason) -> Self {
        match value {
            NackReason::None => 0,
            NackReason::Congestion => 50,
            NackReason::Duplicate => 100,
            NackReason::NoRoute => 150,
        }
    }
}

impl fmt::Display for NackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NackReason::None => write!(f, "None"),
            NackReason::Congestion => write!(f, "Congestion"),
            NackReason::Duplicate => write!(f, "Duplicate"),
            NackReason::NoRoute => write!(f, "NoRoute"),
        }
    }
}

/// Explicit "no data available" signal for a specific request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nack {
    pub reason: NackReason,
    pub request: Request,
}

impl Nack {
    pub fn new(request: Request, reason: NackReason) -> Self {
        Self { reason, request }
    }
}

/// What a face hands back for an expressed request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Response(Response),
    Nack(Nack),
}

/// Forwarder answer to a prefix registration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlResponse {
    pub status_code: u64,
    pub status_text: String,
}

impl ControlResponse {
    pub const OK: u64 = 200;

    pub fn is_ok(&self) -> bool {
        self.status_code == Self::OK
    }
}

/// Everything that travels between a face and the forwarder
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Packet {
    Request(Request),
    Response(Response),
    Nack(Nack),
    Register(Name),
    RegisterResult(ControlResponse),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn suffix_selectors() {
        let mut request = Request::new(name("/a"));
        assert!(request.matches_name(&name("/a/b")));

        // "/a/b" plus the implicit digest is 2 components past "/a"
        request.selectors.max_suffix_components = Some(1);
        assert!(!request.matches_name(&name("/a/b")));
        assert!(request.matches_name(&name("/a")));

        request.selectors.max_suffix_components = None;
        request.selectors.min_suffix_components = Some(3);
        assert!(!request.matches_name(&name("/a/b")));
        assert!(request.matches_name(&name("/a/b/c")));
        assert!(!request.matches_name(&name("/x/b/c")));
    }

    #[test]
    fn must_be_fresh() {
        let mut request = Request::new(name("/a"));
        request.selectors.must_be_fresh = true;

        let mut response = Response::new(name("/a/b"));
        assert!(!response.satisfies(&request, Duration::ZERO));

        response.meta_info.freshness_period = Some(Duration::from_millis(100));
        assert!(response.satisfies(&request, Duration::from_millis(10)));
        assert!(!response.satisfies(&request, Duration::from_millis(200)));
    }

    #[test]
    fn request_display() {
        let mut request = Request::new(name("/a/b"));
        request.nonce = 7;
        request.selectors.must_be_fresh = true;
        request.lifetime = Some(Duration::from_millis(1000));

        assert_eq!(
            request.to_string(),
            "/a/b?ndn.MustBeFresh=1&ndn.InterestLifetime=1000&ndn.Nonce=7"
        );
    }
}
