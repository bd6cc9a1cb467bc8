use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    net::{TcpListener, TcpStream, ToSocketAddrs},
    sync::{Mutex, mpsc},
};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use url::Url;

use crate::{
    definitions::{
        CHILD_SELECTOR_RIGHTMOST, ControlResponse, Nack, NackReason, Packet, Request, Response,
    },
    name::Name,
    tlv::{decode_packet, encode_packet},
    transport::TransportError,
};

/// Number of responses kept in the content store
pub const CONTENT_STORE_CAPACITY: usize = 64;

type FaceId = u64;

struct PendingRequest {
    request: Request,
    downstream: FaceId,
    expires: Instant,
}

struct CachedResponse {
    response: Response,
    arrived: Instant,
}

#[derive(Default)]
struct Tables {
    next_face: FaceId,
    faces: HashMap<FaceId, mpsc::UnboundedSender<Packet>>,
    fib: Vec<(Name, FaceId)>,
    pit: Vec<PendingRequest>,
    content_store: VecDeque<CachedResponse>,
}

impl Tables {
    fn add_face(&mut self, sender: mpsc::UnboundedSender<Packet>) -> FaceId {
        self.next_face += 1;
        self.faces.insert(self.next_face, sender);

        self.next_face
    }

    fn remove_face(&mut self, face: FaceId) {
        self.faces.remove(&face);
        self.fib.retain(|(_, id)| *id != face);
        self.pit.retain(|entry| entry.downstream != face);
    }

    fn send(&self, face: FaceId, packet: Packet) {
        match self.faces.get(&face) {
            Some(sender) => {
                if sender.send(packet).is_err() {
                    tracing::debug!("face {face} is gone, dropping packet");
                }
            }
            None => tracing::debug!("no face {face}, dropping packet"),
        }
    }

    /// Longest registered prefix of `name`, not pointing back at `downstream`
    fn next_hop(&self, name: &Name, downstream: FaceId) -> Option<FaceId> {
        self.fib
            .iter()
            .filter(|(prefix, face)| *face != downstream && prefix.is_prefix_of(name))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, face)| *face)
    }

    fn lookup_content(&self, request: &Request, now: Instant) -> Option<&Response> {
        let mut matches = self
            .content_store
            .iter()
            .filter(|cached| cached.response.satisfies(request, now - cached.arrived))
            .map(|cached| &cached.response);

        if request.selectors.child_selector == Some(CHILD_SELECTOR_RIGHTMOST) {
            matches.max_by(|a, b| a.name.cmp(&b.name))
        } else {
            matches.min_by(|a, b| a.name.cmp(&b.name))
        }
    }

    fn cache(&mut self, response: Response, now: Instant) {
        self.content_store.retain(|cached| cached.response.name != response.name);

        if self.content_store.len() == CONTENT_STORE_CAPACITY {
            self.content_store.pop_front();
        }

        self.content_store.push_back(CachedResponse {
            response,
            arrived: now,
        });
    }

    fn on_request(&mut self, face: FaceId, request: Request) {
        let now = Instant::now();
        self.pit.retain(|entry| entry.expires > now);

        if self.pit.iter().any(|entry| entry.request.nonce == request.nonce) {
            tracing::debug!("duplicate nonce {} from face {face}", request.nonce);
            self.send(face, Packet::Nack(Nack::new(request, NackReason::Duplicate)));
            return;
        }

        if let Some(response) = self.lookup_content(&request, now) {
            tracing::debug!("answering {} from the content store", request.name);
            self.send(face, Packet::Response(response.clone()));
            return;
        }

        let Some(upstream) = self.next_hop(&request.name, face) else {
            tracing::debug!("no route for {}", request.name);
            self.send(face, Packet::Nack(Nack::new(request, NackReason::NoRoute)));
            return;
        };

        tracing::debug!("forwarding {} from face {face} to face {upstream}", request.name);

        self.pit.push(PendingRequest {
            expires: now + request.lifetime_or_default(),
            request: request.clone(),
            downstream: face,
        });
        self.send(upstream, Packet::Request(request));
    }

    fn on_response(&mut self, face: FaceId, response: Response) {
        let now = Instant::now();
        self.pit.retain(|entry| entry.expires > now);

        let (satisfied, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pit)
            .into_iter()
            .partition(|entry| response.satisfies(&entry.request, Duration::ZERO));
        self.pit = pending;

        if satisfied.is_empty() {
            tracing::debug!("unsolicited response {} from face {face}", response.name);
        }

        for entry in satisfied {
            self.send(entry.downstream, Packet::Response(response.clone()));
        }

        self.cache(response, now);
    }

    fn on_nack(&mut self, face: FaceId, nack: Nack) {
        let Some(index) = self
            .pit
            .iter()
            .position(|entry| entry.request.nonce == nack.request.nonce)
        else {
            tracing::debug!("dropping nack from face {face} without pending request");
            return;
        };

        let entry = self.pit.remove(index);
        self.send(
            entry.downstream,
            Packet::Nack(Nack::new(entry.request, nack.reason)),
        );
    }

    fn on_register(&mut self, face: FaceId, prefix: Name) {
        tracing::info!("face {face} registered prefix {prefix}");

        if !self.fib.iter().any(|(p, f)| *f == face && *p == prefix) {
            self.fib.push((prefix, face));
        }

        self.send(
            face,
            Packet::RegisterResult(ControlResponse {
                status_code: ControlResponse::OK,
                status_text: "OK".to_string(),
            }),
        );
    }

    fn dispatch(&mut self, face: FaceId, packet: Packet) {
        match packet {
            Packet::Request(request) => self.on_request(face, request),
            Packet::Response(response) => self.on_response(face, response),
            Packet::Nack(nack) => self.on_nack(face, nack),
            Packet::Register(prefix) => self.on_register(face, prefix),
            Packet::RegisterResult(_) => {
                tracing::debug!("ignoring registration result from face {face}")
            }
        }
    }
}

/// A minimal forwarder: routes requests by longest registered prefix,
/// keeps pending requests and caches recent responses
pub struct Forwarder {
    listener: TcpListener,
    tables: Arc<Mutex<Tables>>,
}

impl Forwarder {
    pub async fn bind(address: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| TransportError::Connection("listener".to_string(), e))?;

        Ok(Self {
            listener,
            tables: Default::default(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(|e| TransportError::Connection("listener".to_string(), e))
    }

    /// The url faces use to connect to this forwarder
    pub fn url(&self) -> Result<Url, TransportError> {
        let address = self.local_addr()?;

        Url::parse(&format!("tcp://{address}"))
            .map_err(|_| TransportError::InvalidTransportAddress(address.to_string()))
    }

    /// Accept faces until the listener fails
    pub async fn serve(self) -> Result<(), TransportError> {
        tracing::info!("forwarder listening on {}", self.local_addr()?);

        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .map_err(|e| TransportError::Connection("listener".to_string(), e))?;

            let tables = self.tables.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_face(stream, peer, tables).await {
                    tracing::warn!("face {peer} failed: {e}");
                }
            });
        }
    }
}

async fn handle_face(
    stream: TcpStream,
    peer: SocketAddr,
    tables: Arc<Mutex<Tables>>,
) -> Result<(), TransportError> {
    let (sender, mut outgoing) = mpsc::unbounded_channel();
    let face = tables.lock().await.add_face(sender);
    tracing::info!("face {face} connected from {peer}");

    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    let result = loop {
        tokio::select! {
            frame = framed.next() => {
                let packet = match frame {
                    Some(Ok(frame)) => decode_packet(&frame),
                    Some(Err(e)) => break Err(TransportError::Connection(peer.to_string(), e)),
                    None => break Ok(()),
                };

                match packet {
                    Ok(packet) => tables.lock().await.dispatch(face, packet),
                    Err(e) => tracing::warn!("dropping malformed packet from face {face}: {e}"),
                }
            }
            Some(packet) = outgoing.recv() => {
                let wire = Bytes::from(encode_packet(&packet));
                if let Err(e) = framed.send(wire).await {
                    break Err(TransportError::Connection(peer.to_string(), e));
                }
            }
        }
    };

    tables.lock().await.remove_face(face);
    tracing::info!("face {face} closed");

    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        definitions::Reply,
        transport::{Face, TcpFace},
    };

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    async fn start() -> Url {
        let forwarder = Forwarder::bind("127.0.0.1:0").await.unwrap();
        let url = forwarder.url().unwrap();
        tokio::spawn(forwarder.serve());

        url
    }

    #[tokio::test]
    async fn nack_without_route() {
        let url = start().await;
        let mut face = TcpFace::connect(&url).await.unwrap();

        let request = Request::new(name("/nobody/home"));
        let Reply::Nack(nack) = face.express_request(&request).await.unwrap() else {
            panic!("expected a nack");
        };

        assert_eq!(nack.reason, NackReason::NoRoute);
        assert_eq!(nack.request.nonce, request.nonce);
    }

    #[tokio::test]
    async fn routes_by_longest_prefix() {
        let url = start().await;
        let mut short = TcpFace::connect(&url).await.unwrap();
        let mut long = TcpFace::connect(&url).await.unwrap();
        let mut consumer = TcpFace::connect(&url).await.unwrap();

        short.register_prefix(&name("/a")).await.unwrap();
        long.register_prefix(&name("/a/b")).await.unwrap();

        let request = Request::new(name("/a/b/c"));
        let producer = tokio::spawn(async move {
            let received = long.next_request().await.unwrap();
            let mut response = Response::new(received.name.clone());
            response.content = b"from long".to_vec();
            long.put(&response).await.unwrap();
            received
        });

        let Reply::Response(response) = consumer.express_request(&request).await.unwrap() else {
            panic!("expected a response");
        };

        assert_eq!(response.content, b"from long");
        assert_eq!(producer.await.unwrap().nonce, request.nonce);
    }

    #[tokio::test]
    async fn answers_from_content_store() {
        let url = start().await;
        let mut producer = TcpFace::connect(&url).await.unwrap();
        let mut consumer = TcpFace::connect(&url).await.unwrap();

        let mut response = Response::new(name("/cached/item"));
        response.content = b"early".to_vec();
        producer.put(&response).await.unwrap();

        // no route exists, so a reply can only come from the store
        let request = Request::new(name("/cached"));
        let mut reply = consumer.express_request(&request).await.unwrap();
        for _ in 0..10 {
            if matches!(reply, Reply::Response(_)) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            reply = consumer
                .express_request(&Request::new(name("/cached")))
                .await
                .unwrap();
        }

        let Reply::Response(received) = reply else {
            panic!("expected a cached response");
        };
        assert_eq!(received.content, b"early");

        let mut fresh = Request::new(name("/cached"));
        fresh.selectors.must_be_fresh = true;
        let Reply::Nack(nack) = consumer.express_request(&fresh).await.unwrap() else {
            panic!("a response without freshness period is never fresh");
        };
        assert_eq!(nack.reason, NackReason::NoRoute);
    }

    #[test]
    fn content_store_selection() {
        let mut tables = Tables::default();
        let now = Instant::now();

        for item in ["/s/1", "/s/3", "/s/2"] {
            tables.cache(Response::new(name(item)), now);
        }

        let mut request = Request::new(name("/s"));
        assert_eq!(
            tables.lookup_content(&request, now).unwrap().name,
            name("/s/1")
        );

        request.selectors.child_selector = Some(CHILD_SELECTOR_RIGHTMOST);
        assert_eq!(
            tables.lookup_content(&request, now).unwrap().name,
            name("/s/3")
        );

        for i in 0..CONTENT_STORE_CAPACITY {
            tables.cache(Response::new(name(&format!("/t/{i}"))), now);
        }
        assert_eq!(tables.content_store.len(), CONTENT_STORE_CAPACITY);
        assert!(tables.lookup_content(&Request::new(name("/s")), now).is_none());
    }

    #[test]
    fn duplicate_nonce() {
        let mut tables = Tables::default();
        let (producer_tx, mut producer_rx) = mpsc::unbounded_channel();
        let (consumer_tx, mut consumer_rx) = mpsc::unbounded_channel();
        let producer = tables.add_face(producer_tx);
        let consumer = tables.add_face(consumer_tx);

        tables.on_register(producer, name("/p"));
        assert!(matches!(
            producer_rx.try_recv(),
            Ok(Packet::RegisterResult(result)) if result.is_ok()
        ));

        let request = Request::new(name("/p/x"));
        tables.on_request(consumer, request.clone());
        assert!(matches!(producer_rx.try_recv(), Ok(Packet::Request(_))));

        tables.on_request(consumer, request);
        assert!(matches!(
            consumer_rx.try_recv(),
            Ok(Packet::Nack(nack)) if nack.reason == NackReason::Duplicate
        ));

        tables.remove_face(producer);
        assert!(tables.fib.is_empty());
    }
}
