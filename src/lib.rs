//! In-memory CIM repository and WBEM operation engine.
//!
//! A [`WbemServer`] answers the class, qualifier, instance, association,
//! query, method and pull operations of a WBEM server against an
//! [`InMemoryRepository`], so WBEM clients can be exercised without a real
//! CIMOM behind them.

pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

pub use config::{AppConfig, EngineConfig};
pub use error::{CimError, CimResult, CimStatusCode};

// Export logic types
pub use logic::{
    ClassResolver, IngestSummary, MethodCallback, MethodContext, MethodRegistry,
    MutationValidator, OpenKind, PullKind, PullSessionManager, QueryParser, WbemServer,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{ClassStore, InMemoryRepository, InstanceStore, NamespaceData, QualifierStore};
