//! The retry-on-401 protocol.
//!
//! ```text
//! send ──► non-401 ─────────────────────────────► return as-is
//!   │
//!   └──► 401 ──► renew (single-flight) ──► Renewed ──► replay once ──► non-401 ─► return
//!                       │                                    └──► 401 ──► terminate
//!                       └──► Terminated ──────────────────────────────► SessionTerminated
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::request::{RequestDescriptor, Response};
use crate::session::{Renewal, SessionContext};
use crate::transport::SharedTransport;

/// Executes request descriptors, transparently renewing an expired session.
///
/// Cheap to clone; clones share the transport and the session context.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    transport: SharedTransport,
    session: Arc<SessionContext>,
    refresh: Arc<RequestDescriptor>,
}

impl RequestExecutor {
    /// Create an executor. `refresh_path` is POSTed to renew the session.
    pub fn new(
        transport: SharedTransport,
        session: Arc<SessionContext>,
        refresh_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            session,
            refresh: Arc::new(RequestDescriptor::post(refresh_path)),
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn refresh_endpoint(&self) -> &str {
        self.refresh.endpoint()
    }

    /// Execute one request.
    ///
    /// Returns the server's response for any status other than 401. On 401
    /// the session is renewed once and the request replayed; the caller
    /// never sees the intermediate 401. Network failures are not retried.
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<Response> {
        request.validate()?;

        let observed = self.session.generation();
        let response = self.transport.send(request).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        debug!(
            method = %request.method(),
            endpoint = request.endpoint(),
            "Unauthorized, renewing session"
        );

        match self.session.renew(observed, || self.refresh()).await {
            Renewal::Renewed => {}
            Renewal::Terminated => {
                warn!(
                    endpoint = request.endpoint(),
                    "Session could not be renewed, request abandoned"
                );
                return Err(ClientError::SessionTerminated);
            }
        }

        let retried = self.transport.send(request).await?;
        if retried.is_unauthorized() {
            warn!(
                endpoint = request.endpoint(),
                "Still unauthorized after refresh, terminating session"
            );
            self.session.terminate();
            return Err(ClientError::SessionTerminated);
        }

        Ok(retried)
    }

    /// Execute, require a success status, and decode the JSON body.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: &RequestDescriptor) -> Result<T> {
        self.execute(request).await?.error_for_status()?.json()
    }

    /// One refresh round trip. Network failure counts as denial.
    async fn refresh(&self) -> bool {
        match self.transport.send(&self.refresh).await {
            Ok(response) if response.is_success() => true,
            Ok(response) => {
                warn!(status = response.status(), "Session refresh denied");
                false
            }
            Err(e) => {
                warn!(error = %e, "Session refresh failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;

    use crate::mock::{MockReply, MockTransport};
    use crate::request::Method;
    use crate::session::{RecordingNavigator, Role, SessionMarkers};

    const REFRESH: &str = "auth/refresh";

    struct Harness {
        mock: Arc<MockTransport>,
        navigator: Arc<RecordingNavigator>,
        executor: RequestExecutor,
    }

    fn harness() -> Harness {
        let mock = Arc::new(MockTransport::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let session = Arc::new(SessionContext::in_memory(navigator.clone(), "/login"));
        session
            .login(SessionMarkers::new(Role::Nurse, "Ana").with_first_login(true))
            .unwrap();
        let executor = RequestExecutor::new(mock.clone(), session, REFRESH);
        Harness {
            mock,
            navigator,
            executor,
        }
    }

    #[tokio::test]
    async fn test_passes_through_success() {
        let h = harness();
        h.mock
            .respond(Method::Get, "nurse/patients", 200, json!([{"id": "P1"}]));

        let response = h
            .executor
            .execute(&RequestDescriptor::get("nurse/patients"))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(h.mock.call_count(Method::Post, REFRESH), 0);
    }

    #[tokio::test]
    async fn test_passes_through_other_errors() {
        let h = harness();
        h.mock.push(Method::Get, "nurse/patients", MockReply::status(403));

        let response = h
            .executor
            .execute(&RequestDescriptor::get("nurse/patients"))
            .await
            .unwrap();
        assert_eq!(response.status(), 403);
        assert_eq!(h.mock.call_count(Method::Post, REFRESH), 0);
        assert!(!h.executor.session().is_terminated());
    }

    #[tokio::test]
    async fn test_refresh_then_retry_returns_retried_response() {
        let h = harness();
        h.mock
            .push(Method::Get, "nurse/patients", MockReply::status(401))
            .respond(Method::Get, "nurse/patients", 200, json!(["retried"]));
        h.mock.push(Method::Post, REFRESH, MockReply::status(204));

        let body: serde_json::Value = h
            .executor
            .execute_json(&RequestDescriptor::get("nurse/patients"))
            .await
            .unwrap();

        assert_eq!(body, json!(["retried"]));
        assert_eq!(h.mock.call_count(Method::Get, "nurse/patients"), 2);
        assert_eq!(h.mock.call_count(Method::Post, REFRESH), 1);
        assert_eq!(h.navigator.count(), 0);
    }

    #[tokio::test]
    async fn test_retry_replays_identical_request() {
        let h = harness();
        h.mock
            .push(Method::Post, "nurse/vas", MockReply::status(401))
            .respond(Method::Post, "nurse/vas", 201, json!({"id": "V1"}));
        h.mock.push(Method::Post, REFRESH, MockReply::status(200));

        let request = RequestDescriptor::post("nurse/vas")
            .with_query("ward", "3B")
            .with_json(&json!({"patient_id": "P1", "score": 6}))
            .unwrap();
        h.executor.execute(&request).await.unwrap();

        let replays: Vec<_> = h
            .mock
            .calls()
            .into_iter()
            .filter(|c| c.endpoint() == "nurse/vas")
            .collect();
        assert_eq!(replays.len(), 2);
        assert_eq!(replays[0], request);
        assert_eq!(replays[1], request);
    }

    #[tokio::test]
    async fn test_refresh_denied_terminates_session() {
        let h = harness();
        h.mock.push(Method::Get, "nurse/patients", MockReply::status(401));
        h.mock.push(Method::Post, REFRESH, MockReply::status(401));

        let err = h
            .executor
            .execute(&RequestDescriptor::get("nurse/patients"))
            .await
            .unwrap_err();

        assert!(err.is_session_terminated());
        assert_eq!(h.executor.session().markers().unwrap(), None);
        assert_eq!(h.navigator.visits(), vec!["/login".to_string()]);
        // The original request is abandoned, not retried.
        assert_eq!(h.mock.call_count(Method::Get, "nurse/patients"), 1);
    }

    #[tokio::test]
    async fn test_refresh_network_failure_is_denial() {
        let h = harness();
        h.mock.push(Method::Get, "nurse/patients", MockReply::status(401));
        h.mock.fail(Method::Post, REFRESH, "connection refused");

        let err = h
            .executor
            .execute(&RequestDescriptor::get("nurse/patients"))
            .await
            .unwrap_err();

        assert!(err.is_session_terminated());
        assert_eq!(h.navigator.count(), 1);
        assert_eq!(h.executor.session().markers().unwrap(), None);
    }

    #[tokio::test]
    async fn test_second_unauthorized_is_terminal() {
        let h = harness();
        h.mock.push(Method::Get, "nurse/patients", MockReply::status(401));
        h.mock.push(Method::Post, REFRESH, MockReply::status(200));

        let err = h
            .executor
            .execute(&RequestDescriptor::get("nurse/patients"))
            .await
            .unwrap_err();

        assert!(err.is_session_terminated());
        assert_eq!(h.mock.call_count(Method::Get, "nurse/patients"), 2);
        assert_eq!(h.mock.call_count(Method::Post, REFRESH), 1);
        assert_eq!(h.navigator.count(), 1);
    }

    #[tokio::test]
    async fn test_network_failure_is_not_retried() {
        let h = harness();
        h.mock.fail(Method::Get, "nurse/patients", "timed out");

        let err = h
            .executor
            .execute(&RequestDescriptor::get("nurse/patients"))
            .await
            .unwrap_err();

        assert!(err.is_network());
        assert_eq!(h.mock.calls().len(), 1);
        assert!(!h.executor.session().is_terminated());
    }

    #[tokio::test]
    async fn test_invalid_descriptor_is_rejected_before_sending() {
        let h = harness();
        let err = h
            .executor
            .execute(&RequestDescriptor::get(""))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
        assert!(h.mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_unauthorized_share_one_refresh() {
        let h = harness();
        for endpoint in ["nurse/patients", "nurse/recommendations"] {
            h.mock
                .push(Method::Get, endpoint, MockReply::status(401))
                .respond(Method::Get, endpoint, 200, json!({"from": endpoint}));
        }
        h.mock.push(
            Method::Post,
            REFRESH,
            MockReply::status(200).after(Duration::from_millis(50)),
        );

        let a = RequestDescriptor::get("nurse/patients");
        let b = RequestDescriptor::get("nurse/recommendations");
        let (ra, rb) = tokio::join!(h.executor.execute(&a), h.executor.execute(&b));

        assert_eq!(ra.unwrap().status(), 200);
        assert_eq!(rb.unwrap().status(), 200);
        assert_eq!(h.mock.call_count(Method::Post, REFRESH), 1);
        assert_eq!(h.executor.session().refresh_attempts(), 1);
        assert_eq!(h.mock.call_count(Method::Get, "nurse/patients"), 2);
        assert_eq!(h.mock.call_count(Method::Get, "nurse/recommendations"), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_observe_termination() {
        let h = harness();
        for endpoint in ["nurse/patients", "nurse/recommendations"] {
            h.mock.push(Method::Get, endpoint, MockReply::status(401));
        }
        h.mock.push(
            Method::Post,
            REFRESH,
            MockReply::status(401).after(Duration::from_millis(50)),
        );

        let a = RequestDescriptor::get("nurse/patients");
        let b = RequestDescriptor::get("nurse/recommendations");
        let (ra, rb) = tokio::join!(h.executor.execute(&a), h.executor.execute(&b));

        assert!(ra.unwrap_err().is_session_terminated());
        assert!(rb.unwrap_err().is_session_terminated());
        assert_eq!(h.mock.call_count(Method::Post, REFRESH), 1);
        assert_eq!(h.navigator.count(), 1);
    }
}
