//! The request pipeline.
//!
//! Operations travel down an ordered chain of [`Link`] middleware into a
//! terminal [`Transport`]; results travel back up as a stream the links
//! may map. Middleware runs as synchronous transformation steps at the
//! edges of the transport's asynchronous boundary: once before send,
//! once per received result.
//!
//! Several operations may be in flight at once (interleaved, not
//! parallel); per-request middleware state lives in the closures built
//! for each `request` call, never on the link itself.

use std::sync::Arc;

use crate::error::TransportError;
use crate::operation::{Operation, QueryResponse};

/// A single pipeline result: a response, or a transport failure passed
/// through untouched.
pub type TransportResult = Result<QueryResponse, TransportError>;

/// The stream of results produced for one operation.
///
/// Most operations yield exactly one result; subscriptions and deferred
/// deliveries may yield several.
pub type ResponseStream = Box<dyn Iterator<Item = TransportResult>>;

/// The continuation into the rest of the chain, consumed at most once.
pub type Forward<'a> = Box<dyn FnOnce(Operation) -> ResponseStream + 'a>;

/// A middleware step in the request pipeline.
///
/// A link may transform the outgoing operation before handing it to
/// `forward`, and may map each result of the returned stream before it
/// continues upstream.
pub trait Link: Send + Sync {
    /// Processes one operation.
    fn request(&self, operation: Operation, forward: Forward<'_>) -> ResponseStream;
}

/// The terminal step: hands an operation to the wire (or a test double)
/// and produces its results.
pub trait Transport: Send + Sync {
    /// Executes one operation.
    fn execute(&self, operation: Operation) -> ResponseStream;
}

/// An ordered chain of links in front of a transport.
pub struct Pipeline {
    links: Vec<Arc<dyn Link>>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    /// Creates a pipeline with no middleware.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            links: Vec::new(),
            transport,
        }
    }

    /// Appends a link. Links run in insertion order on the way out and
    /// in reverse order over results.
    #[must_use]
    pub fn with_link(mut self, link: Arc<dyn Link>) -> Self {
        self.links.push(link);
        self
    }

    /// Sends one operation through the chain.
    pub fn execute(&self, operation: Operation) -> ResponseStream {
        dispatch(self.links.clone(), Arc::clone(&self.transport), operation)
    }
}

fn dispatch(
    links: Vec<Arc<dyn Link>>,
    transport: Arc<dyn Transport>,
    operation: Operation,
) -> ResponseStream {
    let mut remaining = links.into_iter();
    match remaining.next() {
        None => transport.execute(operation),
        Some(link) => {
            let rest: Vec<Arc<dyn Link>> = remaining.collect();
            link.request(
                operation,
                Box::new(move |operation| dispatch(rest, transport, operation)),
            )
        }
    }
}

/// Sending half of a [`response_channel`].
#[derive(Debug, Clone)]
pub struct ResponseSender {
    tx: crossbeam_channel::Sender<TransportResult>,
}

impl ResponseSender {
    /// Delivers one result. Returns false if the stream was dropped.
    pub fn send(&self, result: TransportResult) -> bool {
        self.tx.send(result).is_ok()
    }

    /// Delivers one successful response.
    pub fn send_response(&self, response: QueryResponse) -> bool {
        self.send(Ok(response))
    }
}

/// Creates a channel-backed response stream.
///
/// Transports that complete out of band hold the sender and return the
/// stream from `execute`; the stream ends when the last sender is
/// dropped. This is what lets several operations stay in flight while
/// their responses arrive in any order.
#[must_use]
pub fn response_channel() -> (ResponseSender, ResponseStream) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (ResponseSender { tx }, Box::new(rx.into_iter()))
}
