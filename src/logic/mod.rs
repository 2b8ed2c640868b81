pub mod associations;
pub mod classes;
pub mod engine;
pub mod ingest;
pub mod instances;
pub mod methods;
pub mod projection;
pub mod pull;
pub mod qualifiers;
pub mod query;
pub mod resolve;
pub mod sessions;
pub mod validate;

pub use engine::WbemServer;
pub use ingest::IngestSummary;
pub use methods::{MethodCallback, MethodContext, MethodRegistry};
pub use projection::Projector;
pub use query::{ParsedQuery, QueryParser, FILTER_QUERY_LANGUAGE, QUERY_LANGUAGES};
pub use resolve::ClassResolver;
pub use sessions::{OpenKind, PullKind, PullSessionManager, SessionItems, SessionPage};
pub use validate::MutationValidator;
