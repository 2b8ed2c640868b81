use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::CimResult;
use crate::logic::{MethodRegistry, PullSessionManager};
use crate::model::{CimName, RepoMode};
use crate::store::{ClassStore, InMemoryRepository, NamespaceData};

/// The operation engine of the mock WBEM server.
///
/// One `WbemServer` owns a repository, a method dispatch registry and the
/// pull sessions opened against it. It is `Send + Sync`; connections share it
/// behind an `Arc` and pass their own [`RequestContext`](crate::model::RequestContext)
/// with every call. Operations are implemented per family in sibling modules
/// (`classes`, `qualifiers`, `instances`, `associations`, `methods`, `pull`,
/// `ingest`).
#[derive(Debug)]
pub struct WbemServer {
    pub(crate) repository: Arc<InMemoryRepository>,
    pub(crate) methods: MethodRegistry,
    pub(crate) sessions: PullSessionManager,
    pub(crate) config: EngineConfig,
}

impl Default for WbemServer {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl WbemServer {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_repository(Arc::new(InMemoryRepository::new()), config)
    }

    pub fn with_repository(repository: Arc<InMemoryRepository>, config: EngineConfig) -> Self {
        Self {
            repository,
            methods: MethodRegistry::new(),
            sessions: PullSessionManager::new(),
            config,
        }
    }

    pub fn repository(&self) -> &Arc<InMemoryRepository> {
        &self.repository
    }

    pub fn methods(&self) -> &MethodRegistry {
        &self.methods
    }

    pub fn sessions(&self) -> &PullSessionManager {
        &self.sessions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn add_namespace(&self, namespace: &str) -> CimResult<CimName> {
        self.repository.add_namespace(namespace)
    }

    pub fn ensure_namespace(&self, namespace: &str) -> CimName {
        self.repository.ensure_namespace(namespace)
    }

    pub fn remove_namespace(&self, namespace: &str) -> CimResult<()> {
        self.repository.remove_namespace(namespace)
    }

    pub fn namespaces(&self) -> Vec<CimName> {
        self.repository.namespaces()
    }
}

/// Whether a read of `classname` consults class definitions.
pub(crate) fn reads_with_classes(mode: RepoMode, data: &NamespaceData, classname: &str) -> bool {
    match mode {
        RepoMode::Full => true,
        RepoMode::Lite => false,
        RepoMode::Auto => data.class_exists(classname),
    }
}

/// Writes only skip class definitions in `Lite` mode.
pub(crate) fn writes_with_classes(mode: RepoMode) -> bool {
    mode != RepoMode::Lite
}
