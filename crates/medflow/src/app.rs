//! Application wiring.
//!
//! One [`Medflow`] per running client: one transport, one session context,
//! one executor, one invalidation bus. Role APIs are handed out on demand and
//! share the domain store for as long as any handle to it is alive.

use std::path::Path;
use std::sync::Arc;

use medflow_cache::{InvalidationBus, InvalidationRule, StoreConfig};
use medflow_client::{
    FileMarkerStore, HttpTransport, InMemoryMarkerStore, Navigator, NoopNavigator,
    RequestExecutor, SessionContext, SessionMarkers, SharedMarkerStore, SharedTransport,
};
use medflow_config::{MedflowConfig, load_config};
use tracing::{info, warn};

use crate::domains::{
    ADMIN, ANESTHESIOLOGIST, AdminApi, AnesthesiologistApi, DOCTOR, DoctorApi, NURSE, NurseApi,
    domain_for,
};
use crate::error::Result;
use crate::rules;

/// The wired client core.
#[derive(Debug, Clone)]
pub struct Medflow {
    executor: RequestExecutor,
    bus: InvalidationBus,
    store_config: StoreConfig,
}

impl Medflow {
    /// Start building from a configuration.
    pub fn builder(config: MedflowConfig) -> MedflowBuilder {
        MedflowBuilder::new(config)
    }

    /// Discover layered config files and build over HTTP.
    pub fn discover(project_dir: Option<&Path>) -> Result<Self> {
        let loaded = load_config(project_dir)?;
        for warning in &loaded.warnings {
            warn!("{}", warning);
        }
        info!(sources = ?loaded.loaded_from(), "Configuration loaded");
        Self::builder(loaded.config).build()
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        self.executor.session()
    }

    pub fn bus(&self) -> &InvalidationBus {
        &self.bus
    }

    /// Record a successful login.
    pub fn login(&self, markers: SessionMarkers) -> Result<()> {
        Ok(self.session().login(markers)?)
    }

    /// End the session and navigate to login.
    pub fn logout(&self) {
        self.session().logout();
    }

    /// Domain of the logged-in user's dashboard, if a session is active.
    pub fn dashboard_domain(&self) -> Result<Option<&'static str>> {
        Ok(self.session().markers()?.map(|m| domain_for(m.role)))
    }

    pub fn doctor(&self) -> DoctorApi {
        DoctorApi::new(self.attach(DOCTOR))
    }

    pub fn nurse(&self) -> NurseApi {
        NurseApi::new(self.attach(NURSE))
    }

    pub fn anesthesiologist(&self) -> AnesthesiologistApi {
        AnesthesiologistApi::new(self.attach(ANESTHESIOLOGIST))
    }

    pub fn admin(&self) -> AdminApi {
        AdminApi::new(self.attach(ADMIN))
    }

    fn attach(&self, domain: &str) -> medflow_cache::CacheStore {
        self.bus
            .attach(domain, self.executor.clone(), self.store_config.clone())
    }
}

/// Builder for [`Medflow`].
///
/// Defaults: HTTP transport from `[api]`, file markers when
/// `[session].markers_path` is set (memory otherwise), a navigator that does
/// nothing, the built-in rule table plus configured rules.
pub struct MedflowBuilder {
    config: MedflowConfig,
    transport: Option<SharedTransport>,
    markers: Option<SharedMarkerStore>,
    navigator: Arc<dyn Navigator>,
    default_rules: bool,
    extra_rules: Vec<InvalidationRule>,
}

impl MedflowBuilder {
    pub fn new(config: MedflowConfig) -> Self {
        Self {
            config,
            transport: None,
            markers: None,
            navigator: Arc::new(NoopNavigator),
            default_rules: true,
            extra_rules: Vec::new(),
        }
    }

    /// Use a custom transport instead of HTTP.
    pub fn transport(mut self, transport: SharedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom marker store.
    pub fn marker_store(mut self, markers: SharedMarkerStore) -> Self {
        self.markers = Some(markers);
        self
    }

    /// Navigator invoked when the session ends.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    /// Start from an empty rule table instead of the built-in one.
    pub fn without_default_rules(mut self) -> Self {
        self.default_rules = false;
        self
    }

    /// Add a rule after the configured ones.
    pub fn rule(mut self, rule: InvalidationRule) -> Self {
        self.extra_rules.push(rule);
        self
    }

    /// Wire everything up.
    pub fn build(self) -> Result<Medflow> {
        self.config.validate()?;
        let api = self.config.api();

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let mut builder = HttpTransport::builder()
                    .base_url(api.base_url.as_str())
                    .timeout(api.timeout());
                if let Some(agent) = &api.user_agent {
                    builder = builder.user_agent(agent.as_str());
                }
                Arc::new(builder.build()?) as SharedTransport
            }
        };

        let markers = match self.markers {
            Some(markers) => markers,
            None => match self.config.session().markers_path {
                Some(path) => Arc::new(FileMarkerStore::new(path)) as SharedMarkerStore,
                None => Arc::new(InMemoryMarkerStore::new()),
            },
        };

        let session = Arc::new(SessionContext::new(
            markers,
            self.navigator,
            api.login_path.as_str(),
        ));
        let executor = RequestExecutor::new(transport, session, api.refresh_path.as_str());

        let mut table = if self.default_rules {
            rules::default_rules()
        } else {
            Vec::new()
        };
        table.extend(rules::from_config(self.config.rules())?);
        table.extend(self.extra_rules);
        let bus = InvalidationBus::new(table)?;

        let store_config = StoreConfig::new().with_max_entries(self.config.cache().max_entries);

        info!(
            refresh = executor.refresh_endpoint(),
            rules = bus.rules().len(),
            max_entries = store_config.max_entries,
            "Medflow client ready"
        );

        Ok(Medflow {
            executor,
            bus,
            store_config,
        })
    }
}
