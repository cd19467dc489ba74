//! Re-authenticating request executor for the medflow backends.
//!
//! Every outbound call goes through a [`RequestExecutor`]. When a call comes
//! back `401 Unauthorized` the executor renews the cookie session once through
//! the refresh endpoint and replays the original request. If renewal fails the
//! shared [`SessionContext`] is terminated: session markers are wiped and the
//! UI is sent to the login entry point.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use medflow_client::{
//!     HttpTransport, RecordingNavigator, RequestDescriptor, RequestExecutor, SessionContext,
//! };
//!
//! # async fn example() -> medflow_client::Result<()> {
//! let transport = HttpTransport::builder()
//!     .base_url("http://localhost:8080/api/")
//!     .build()?;
//! let session = Arc::new(SessionContext::in_memory(
//!     Arc::new(RecordingNavigator::new()),
//!     "/login",
//! ));
//! let executor = RequestExecutor::new(Arc::new(transport), session, "auth/refresh");
//!
//! let response = executor
//!     .execute(&RequestDescriptor::get("nurse/recommendations/pending"))
//!     .await?
//!     .error_for_status()?;
//! let pending: serde_json::Value = response.json()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`request`]: request descriptors and raw responses
//! - [`transport`]: the raw HTTP seam and its `reqwest` implementation
//! - [`session`]: session markers, login navigation, single-flight refresh gate
//! - [`executor`]: the retry-on-401 protocol
//! - [`mock`]: scripted transport for tests

pub mod error;
pub mod executor;
pub mod mock;
pub mod request;
pub mod session;
pub mod transport;

pub use error::{ClientError, Result};
pub use executor::RequestExecutor;
pub use mock::{MockReply, MockTransport};
pub use request::{Method, RequestDescriptor, Response};
pub use session::{
    FileMarkerStore, InMemoryMarkerStore, MarkerStore, Navigator, NoopNavigator,
    RecordingNavigator, Renewal, Role, SessionContext, SessionMarkers, SharedMarkerStore,
};
pub use transport::{HttpTransport, HttpTransportBuilder, SharedTransport, Transport};
