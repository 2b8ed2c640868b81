use serde::{Deserialize, Serialize};

use crate::model::{
    normalize_namespace, CimClass, CimInstance, CimInstanceName, CimName, CimValue, Named,
    NamedList, QualifierDeclaration,
};

/// How much the engine relies on class definitions for instance operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoMode {
    /// Class definitions are required and consulted for every instance operation.
    #[default]
    Full,
    /// Class definitions are neither required nor consulted; instance writes
    /// are not supported.
    Lite,
    /// Reads use class definitions when the class exists and fall back to
    /// `Lite` behavior otherwise. Writes follow `Full`.
    Auto,
}

/// Per-request context supplied by the connection facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub namespace: CimName,
    pub mode: RepoMode,
}

impl RequestContext {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: normalize_namespace(namespace),
            mode: RepoMode::Full,
        }
    }

    pub fn with_mode(mut self, mode: RepoMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn lite(self) -> Self {
        self.with_mode(RepoMode::Lite)
    }

    /// Same context targeting another namespace, e.g. one carried by a path.
    pub fn for_namespace(&self, namespace: Option<&CimName>) -> Self {
        match namespace {
            Some(ns) => Self {
                namespace: normalize_namespace(ns.as_str()),
                mode: self.mode,
            },
            None => self.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetClassOptions {
    pub local_only: bool,
    pub include_qualifiers: bool,
    pub include_class_origin: bool,
    pub property_list: Option<Vec<String>>,
}

impl Default for GetClassOptions {
    fn default() -> Self {
        Self {
            local_only: true,
            include_qualifiers: true,
            include_class_origin: false,
            property_list: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumerateClassesOptions {
    pub deep_inheritance: bool,
    pub local_only: bool,
    pub include_qualifiers: bool,
    pub include_class_origin: bool,
}

impl Default for EnumerateClassesOptions {
    fn default() -> Self {
        Self {
            deep_inheritance: false,
            local_only: true,
            include_qualifiers: true,
            include_class_origin: false,
        }
    }
}

impl EnumerateClassesOptions {
    pub(crate) fn as_get_options(&self) -> GetClassOptions {
        GetClassOptions {
            local_only: self.local_only,
            include_qualifiers: self.include_qualifiers,
            include_class_origin: self.include_class_origin,
            property_list: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetInstanceOptions {
    pub local_only: bool,
    pub include_qualifiers: bool,
    pub include_class_origin: bool,
    pub property_list: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumerateInstancesOptions {
    pub deep_inheritance: bool,
    pub local_only: bool,
    pub include_qualifiers: bool,
    pub include_class_origin: bool,
    pub property_list: Option<Vec<String>>,
}

impl Default for EnumerateInstancesOptions {
    fn default() -> Self {
        Self {
            deep_inheritance: true,
            local_only: false,
            include_qualifiers: false,
            include_class_origin: false,
            property_list: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifyInstanceOptions {
    /// Replace the stored instance qualifiers with the modified instance's.
    pub include_qualifiers: bool,
    /// Restricts which properties are modified; `None` means all supplied.
    pub property_list: Option<Vec<String>>,
}

/// Filters for Associators / AssociatorNames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociatorFilter {
    pub assoc_class: Option<String>,
    pub result_class: Option<String>,
    pub role: Option<String>,
    pub result_role: Option<String>,
}

/// Filters for References / ReferenceNames. `result_class` constrains the
/// association class being returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceFilter {
    pub result_class: Option<String>,
    pub role: Option<String>,
}

/// Projection flags for association results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultOptions {
    pub include_qualifiers: bool,
    pub include_class_origin: bool,
    pub property_list: Option<Vec<String>>,
}

impl ResultOptions {
    pub(crate) fn as_instance_options(&self) -> GetInstanceOptions {
        GetInstanceOptions {
            local_only: false,
            include_qualifiers: self.include_qualifiers,
            include_class_origin: self.include_class_origin,
            property_list: self.property_list.clone(),
        }
    }

    pub(crate) fn as_class_options(&self) -> GetClassOptions {
        GetClassOptions {
            local_only: false,
            include_qualifiers: self.include_qualifiers,
            include_class_origin: self.include_class_origin,
            property_list: self.property_list.clone(),
        }
    }
}

/// Result element of class- or instance-level association traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociatedObject {
    Class(CimClass),
    Instance(CimInstance),
}

/// An object fed through batch ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CimObject {
    QualifierDeclaration(QualifierDeclaration),
    Class(CimClass),
    Instance(CimInstance),
}

impl From<QualifierDeclaration> for CimObject {
    fn from(value: QualifierDeclaration) -> Self {
        Self::QualifierDeclaration(value)
    }
}

impl From<CimClass> for CimObject {
    fn from(value: CimClass) -> Self {
        Self::Class(value)
    }
}

impl From<CimInstance> for CimObject {
    fn from(value: CimInstance) -> Self {
        Self::Instance(value)
    }
}

/// A named method parameter value (input or output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamValue {
    pub name: CimName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<CimValue>,
}

impl ParamValue {
    pub fn new(name: impl Into<CimName>, value: impl Into<CimValue>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn null(name: impl Into<CimName>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

impl Named for ParamValue {
    fn name(&self) -> &CimName {
        &self.name
    }
}

/// Outcome of InvokeMethod, forwarded verbatim from the callback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodResult {
    pub return_value: Option<CimValue>,
    pub out_params: NamedList<ParamValue>,
}

impl MethodResult {
    pub fn returning(value: impl Into<CimValue>) -> Self {
        Self {
            return_value: Some(value.into()),
            out_params: NamedList::new(),
        }
    }

    pub fn with_out_param(mut self, param: ParamValue) -> Self {
        self.out_params.insert(param);
        self
    }
}

/// Parameters common to every Open* operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    pub filter_query_language: Option<String>,
    /// Accepted but never evaluated.
    pub filter_query: Option<String>,
    /// Seconds; `None` selects the configured default.
    pub operation_timeout: Option<u32>,
    /// Accepted; mid-stream errors are not modeled.
    pub continue_on_error: bool,
    pub max_object_count: u32,
}

impl OpenOptions {
    pub fn with_max_object_count(max_object_count: u32) -> Self {
        Self {
            max_object_count,
            ..Self::default()
        }
    }
}

/// Handle of an open enumeration session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumerationContext {
    pub handle: String,
    pub namespace: CimName,
}

/// One page of an Open*/Pull* exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullResult<T> {
    pub items: Vec<T>,
    pub end_of_sequence: bool,
    /// Present while more items remain.
    pub context: Option<EnumerationContext>,
}

pub type InstancePage = PullResult<CimInstance>;
pub type PathPage = PullResult<CimInstanceName>;
