//! Role domains.
//!
//! Each role's dashboard talks to the server through one domain API over its
//! own [`CacheStore`](medflow_cache::CacheStore). Reads are tagged so writes
//! in this or another domain can mark them stale.

mod admin;
mod anesthesiologist;
mod doctor;
mod nurse;

pub use admin::AdminApi;
pub use anesthesiologist::AnesthesiologistApi;
pub use doctor::DoctorApi;
pub use nurse::NurseApi;

use medflow_client::Role;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{MedflowError, Result};

pub const ADMIN: &str = "admin";
pub const DOCTOR: &str = "doctor";
pub const NURSE: &str = "nurse";
pub const ANESTHESIOLOGIST: &str = "anesthesiologist";

/// Tag kinds used by the domain APIs.
pub mod kinds {
    pub const RECOMMENDATION: &str = "Recommendation";
    pub const PATIENT: &str = "Patient";
    pub const VAS_SCORE: &str = "VasScore";
    pub const USER: &str = "User";
    pub const BACKUP: &str = "Backup";
}

/// Action names published on the invalidation bus.
pub mod actions {
    pub const APPROVE_RECOMMENDATION: &str = "approve_recommendation";
    pub const REJECT_RECOMMENDATION: &str = "reject_recommendation";
    pub const CREATE_RECOMMENDATION: &str = "create_recommendation";
    pub const SUBMIT_VAS_SCORE: &str = "submit_vas_score";
    pub const CREATE_USER: &str = "create_user";
    pub const CREATE_BACKUP: &str = "create_backup";
}

/// Domain owned by a role's dashboard.
pub fn domain_for(role: Role) -> &'static str {
    match role {
        Role::Admin => ADMIN,
        Role::Doctor => DOCTOR,
        Role::Nurse => NURSE,
        Role::Anesthesiologist => ANESTHESIOLOGIST,
    }
}

fn decode<T: DeserializeOwned>(what: &'static str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| MedflowError::Decode { what, source })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use medflow_cache::{InvalidationBus, StoreConfig};
    use medflow_client::{MockTransport, NoopNavigator, RequestExecutor, SessionContext};

    use super::*;
    use crate::rules::default_rules;

    pub(crate) struct Fixture {
        pub mock: Arc<MockTransport>,
        pub bus: InvalidationBus,
        pub executor: RequestExecutor,
    }

    impl Fixture {
        pub(crate) fn new() -> Self {
            let mock = Arc::new(MockTransport::new());
            let session = Arc::new(SessionContext::in_memory(Arc::new(NoopNavigator), "/login"));
            Self {
                executor: RequestExecutor::new(mock.clone(), session, "auth/refresh"),
                bus: InvalidationBus::new(default_rules()).unwrap(),
                mock,
            }
        }

        pub(crate) fn store(&self, domain: &str) -> medflow_cache::CacheStore {
            self.bus
                .attach(domain, self.executor.clone(), StoreConfig::default())
        }
    }
}
