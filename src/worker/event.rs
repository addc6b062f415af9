//! Lifecycle events and the single-use fetch responder.

use tokio::sync::oneshot;

use crate::Result;
use crate::types::{Request, Response};

/// The three phases a worker reacts to.
#[derive(Debug)]
pub enum LifecycleEvent {
    /// A new version was detected: seed the static store.
    Install,
    /// The new version takes over: prune stale stores, claim clients.
    Activate,
    /// A controlled page issued a request.
    Fetch(FetchEvent),
}

/// One intercepted request plus the slot its response goes into.
///
/// [`respond_with`](Self::respond_with) consumes the event, so a handler
/// can answer at most once. Dropping the event without responding leaves
/// the request unhandled: the waiter sees [`FetchOutcome::Unhandled`] and
/// the request proceeds to the network uncontrolled.
#[derive(Debug)]
pub struct FetchEvent {
    request: Request,
    responder: oneshot::Sender<Result<Response>>,
}

impl FetchEvent {
    /// Create an event and the handle its response arrives on.
    pub fn new(request: Request) -> (Self, ResponseHandle) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                request,
                responder: tx,
            },
            ResponseHandle { rx },
        )
    }

    /// The intercepted request. Read-only for the lifetime of the event.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Provide the response (or the failure the page should see).
    pub fn respond_with(self, response: Result<Response>) {
        // The page may have gone away; nothing to deliver to then.
        let _ = self.responder.send(response);
    }
}

/// What happened to a dispatched [`FetchEvent`].
#[derive(Debug)]
pub enum FetchOutcome {
    /// The worker answered; an `Err` is a failed request as seen by the page.
    Responded(Result<Response>),
    /// The worker never answered; the request was not intercepted.
    Unhandled,
}

/// Receiving side of a [`FetchEvent`].
#[derive(Debug)]
pub struct ResponseHandle {
    rx: oneshot::Receiver<Result<Response>>,
}

impl ResponseHandle {
    /// Wait for the worker's answer.
    pub async fn outcome(self) -> FetchOutcome {
        match self.rx.await {
            Ok(response) => FetchOutcome::Responded(response),
            Err(_) => FetchOutcome::Unhandled,
        }
    }
}
