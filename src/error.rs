//! Error taxonomy shared by every repository operation.
//!
//! Each variant carries the offending namespace, class, path or name so the
//! connection facade can render a standard CIM status message, and maps onto
//! a DMTF status code via [`CimError::status_code`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// DMTF CIM status codes (DSP0200).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CimStatusCode {
    Failed = 1,
    AccessDenied = 2,
    InvalidNamespace = 3,
    InvalidParameter = 4,
    InvalidClass = 5,
    NotFound = 6,
    NotSupported = 7,
    ClassHasChildren = 8,
    ClassHasInstances = 9,
    InvalidSuperclass = 10,
    AlreadyExists = 11,
    NoSuchProperty = 12,
    TypeMismatch = 13,
    QueryLanguageNotSupported = 14,
    InvalidQuery = 15,
    MethodNotAvailable = 16,
    MethodNotFound = 17,
    NamespaceNotEmpty = 20,
    InvalidEnumerationContext = 21,
    InvalidOperationTimeout = 22,
}

impl CimStatusCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Symbolic name as used in CIM-XML error responses.
    pub fn name(self) -> &'static str {
        match self {
            Self::Failed => "CIM_ERR_FAILED",
            Self::AccessDenied => "CIM_ERR_ACCESS_DENIED",
            Self::InvalidNamespace => "CIM_ERR_INVALID_NAMESPACE",
            Self::InvalidParameter => "CIM_ERR_INVALID_PARAMETER",
            Self::InvalidClass => "CIM_ERR_INVALID_CLASS",
            Self::NotFound => "CIM_ERR_NOT_FOUND",
            Self::NotSupported => "CIM_ERR_NOT_SUPPORTED",
            Self::ClassHasChildren => "CIM_ERR_CLASS_HAS_CHILDREN",
            Self::ClassHasInstances => "CIM_ERR_CLASS_HAS_INSTANCES",
            Self::InvalidSuperclass => "CIM_ERR_INVALID_SUPERCLASS",
            Self::AlreadyExists => "CIM_ERR_ALREADY_EXISTS",
            Self::NoSuchProperty => "CIM_ERR_NO_SUCH_PROPERTY",
            Self::TypeMismatch => "CIM_ERR_TYPE_MISMATCH",
            Self::QueryLanguageNotSupported => "CIM_ERR_QUERY_LANGUAGE_NOT_SUPPORTED",
            Self::InvalidQuery => "CIM_ERR_INVALID_QUERY",
            Self::MethodNotAvailable => "CIM_ERR_METHOD_NOT_AVAILABLE",
            Self::MethodNotFound => "CIM_ERR_METHOD_NOT_FOUND",
            Self::NamespaceNotEmpty => "CIM_ERR_NAMESPACE_NOT_EMPTY",
            Self::InvalidEnumerationContext => "CIM_ERR_INVALID_ENUMERATION_CONTEXT",
            Self::InvalidOperationTimeout => "CIM_ERR_INVALID_OPERATION_TIMEOUT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CimError {
    #[error("Namespace not found: {namespace}")]
    NamespaceNotFound { namespace: String },

    #[error("Namespace already exists: {namespace}")]
    NamespaceAlreadyExists { namespace: String },

    #[error("Namespace '{namespace}' is not empty")]
    NamespaceNotEmpty { namespace: String },

    #[error("Class '{classname}' not found in namespace '{namespace}'")]
    ClassNotFound { namespace: String, classname: String },

    #[error("Class '{classname}' already exists in namespace '{namespace}'")]
    ClassAlreadyExists { namespace: String, classname: String },

    #[error("Instance not found: {path}")]
    InstanceNotFound { path: String },

    #[error("Qualifier declaration '{name}' not found in namespace '{namespace}'")]
    QualifierNotFound { namespace: String, name: String },

    #[error("Superclass '{superclass}' of class '{classname}' does not exist")]
    InvalidSuperclass { classname: String, superclass: String },

    #[error("Qualifier '{qualifier}' used in class '{classname}' has no declaration")]
    InvalidQualifier { classname: String, qualifier: String },

    #[error("Creation class '{classname}' of instance does not exist in namespace '{namespace}'")]
    InvalidClass { namespace: String, classname: String },

    #[error("Key property '{property}' of class '{classname}' has no value")]
    MissingKeyProperty { classname: String, property: String },

    #[error("Instance already exists: {path}")]
    DuplicateInstance { path: String },

    #[error("{operation} is not supported: {reason}")]
    NotSupported { operation: String, reason: String },

    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error("Query language '{language}' is not supported")]
    InvalidQueryLanguage { language: String },

    #[error("Invalid query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },

    #[error("Method '{method}' not found for class '{classname}'")]
    MethodNotFound { classname: String, method: String },

    #[error("Invalid enumeration context: {handle}")]
    InvalidSessionHandle { handle: String },

    #[error("Enumeration context {handle} has expired")]
    SessionExpired { handle: String },

    #[error("Operation timeout {requested}s is invalid (server maximum {max}s)")]
    InvalidOperationTimeout { requested: u32, max: u32 },

    #[error("Operation failed: {message}")]
    Failed { message: String },
}

impl CimError {
    pub fn namespace_not_found(namespace: impl ToString) -> Self {
        Self::NamespaceNotFound {
            namespace: namespace.to_string(),
        }
    }

    pub fn class_not_found(namespace: impl ToString, classname: impl ToString) -> Self {
        Self::ClassNotFound {
            namespace: namespace.to_string(),
            classname: classname.to_string(),
        }
    }

    pub fn instance_not_found(path: impl ToString) -> Self {
        Self::InstanceNotFound {
            path: path.to_string(),
        }
    }

    pub fn not_supported(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> CimStatusCode {
        match self {
            Self::NamespaceNotFound { .. } => CimStatusCode::InvalidNamespace,
            Self::NamespaceAlreadyExists { .. } => CimStatusCode::AlreadyExists,
            Self::NamespaceNotEmpty { .. } => CimStatusCode::NamespaceNotEmpty,
            Self::ClassNotFound { .. } => CimStatusCode::NotFound,
            Self::ClassAlreadyExists { .. } => CimStatusCode::AlreadyExists,
            Self::InstanceNotFound { .. } => CimStatusCode::NotFound,
            Self::QualifierNotFound { .. } => CimStatusCode::NotFound,
            Self::InvalidSuperclass { .. } => CimStatusCode::InvalidSuperclass,
            Self::InvalidQualifier { .. } => CimStatusCode::InvalidParameter,
            Self::InvalidClass { .. } => CimStatusCode::InvalidClass,
            Self::MissingKeyProperty { .. } => CimStatusCode::InvalidParameter,
            Self::DuplicateInstance { .. } => CimStatusCode::AlreadyExists,
            Self::NotSupported { .. } => CimStatusCode::NotSupported,
            Self::InvalidParameter { .. } => CimStatusCode::InvalidParameter,
            Self::InvalidQueryLanguage { .. } => CimStatusCode::QueryLanguageNotSupported,
            Self::InvalidQuery { .. } => CimStatusCode::InvalidQuery,
            Self::MethodNotFound { .. } => CimStatusCode::MethodNotFound,
            Self::InvalidSessionHandle { .. } => CimStatusCode::InvalidEnumerationContext,
            Self::SessionExpired { .. } => CimStatusCode::InvalidEnumerationContext,
            Self::InvalidOperationTimeout { .. } => CimStatusCode::InvalidOperationTimeout,
            Self::Failed { .. } => CimStatusCode::Failed,
        }
    }

    /// True for the "does not exist" family of failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NamespaceNotFound { .. }
                | Self::ClassNotFound { .. }
                | Self::InstanceNotFound { .. }
                | Self::QualifierNotFound { .. }
        )
    }
}

/// Result type alias for repository operations.
pub type CimResult<T> = Result<T, CimError>;
