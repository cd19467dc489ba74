//! Scripted transport for tests.
//!
//! Replies are queued per `(method, endpoint)` and consumed in order; the
//! last queued reply repeats. Unscripted routes answer `404`.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{ClientError, Result};
use crate::request::{Method, RequestDescriptor, Response};
use crate::transport::Transport;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with a response, optionally after a delay.
    Respond {
        response: Response,
        delay: Option<Duration>,
    },
    /// Fail as if no response arrived.
    NetworkError(String),
}

impl MockReply {
    pub fn status(status: u16) -> Self {
        MockReply::Respond {
            response: Response::new(status, Vec::new()),
            delay: None,
        }
    }

    pub fn json(status: u16, body: serde_json::Value) -> Self {
        MockReply::Respond {
            response: Response::json_body(status, &body),
            delay: None,
        }
    }

    /// Delay an existing reply.
    pub fn after(self, delay: Duration) -> Self {
        match self {
            MockReply::Respond { response, .. } => MockReply::Respond {
                response,
                delay: Some(delay),
            },
            other => other,
        }
    }
}

type Route = (Method, String);

fn route(method: Method, endpoint: &str) -> Route {
    (method, endpoint.trim_start_matches('/').to_string())
}

/// In-memory [`Transport`] that replays scripted replies and records calls.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<Route, VecDeque<MockReply>>>,
    calls: Mutex<Vec<RequestDescriptor>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `method endpoint`.
    pub fn push(&self, method: Method, endpoint: &str, reply: MockReply) -> &Self {
        self.routes
            .lock()
            .entry(route(method, endpoint))
            .or_default()
            .push_back(reply);
        self
    }

    /// Queue a JSON reply.
    pub fn respond(
        &self,
        method: Method,
        endpoint: &str,
        status: u16,
        body: serde_json::Value,
    ) -> &Self {
        self.push(method, endpoint, MockReply::json(status, body))
    }

    /// Queue a network failure.
    pub fn fail(&self, method: Method, endpoint: &str, message: &str) -> &Self {
        self.push(
            method,
            endpoint,
            MockReply::NetworkError(message.to_string()),
        )
    }

    /// Every request sent so far, in order.
    pub fn calls(&self) -> Vec<RequestDescriptor> {
        self.calls.lock().clone()
    }

    /// Number of requests sent to `method endpoint`.
    pub fn call_count(&self, method: Method, endpoint: &str) -> usize {
        let wanted = route(method, endpoint);
        self.calls
            .lock()
            .iter()
            .filter(|c| route(c.method(), c.endpoint()) == wanted)
            .count()
    }

    fn next_reply(&self, request: &RequestDescriptor) -> Option<MockReply> {
        let mut routes = self.routes.lock();
        let queue = routes.get_mut(&route(request.method(), request.endpoint()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response> {
        self.calls.lock().push(request.clone());

        match self.next_reply(request) {
            Some(MockReply::Respond { response, delay }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(response)
            }
            Some(MockReply::NetworkError(message)) => Err(ClientError::Network(message)),
            None => Ok(Response::new(404, Vec::new())),
        }
    }
}
