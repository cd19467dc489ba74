//! Hospital-workflow client core.
//!
//! Four role domains (admin, doctor, nurse, anesthesiologist) sit on top of
//! per-domain caches. Every call goes through one re-authenticating
//! [`RequestExecutor`](medflow_client::RequestExecutor); every successful
//! write is announced on one [`InvalidationBus`](medflow_cache::InvalidationBus)
//! so that, for example, a doctor approving a recommendation refreshes the
//! nurse's pending list.
//!
//! ```no_run
//! use medflow::{Medflow, MedflowConfig};
//! use medflow::client::{Role, SessionMarkers};
//!
//! # async fn example() -> medflow::Result<()> {
//! let app = Medflow::builder(MedflowConfig::new()).build()?;
//! app.login(SessionMarkers::new(Role::Doctor, "Dr. Ruiz"))?;
//!
//! let doctor = app.doctor();
//! for rec in doctor.recommendations().await? {
//!     println!("{} {:?}", rec.id, rec.status);
//! }
//! doctor.approve_recommendation("R123").await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod domains;
pub mod error;
pub mod rules;
pub mod telemetry;
pub mod types;

pub use app::{Medflow, MedflowBuilder};
pub use domains::{AdminApi, AnesthesiologistApi, DoctorApi, NurseApi};
pub use error::{MedflowError, Result};
pub use medflow_config::MedflowConfig;
pub use types::*;

/// Re-export of the request layer.
pub use medflow_client as client;

/// Re-export of the cache layer.
pub use medflow_cache as cache;
