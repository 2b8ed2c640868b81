use serde::{Deserialize, Serialize};

use crate::model::{CimName, CimType, CimValue, Named, NamedList};

/// Element kinds a qualifier declaration may be applied to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scopes {
    pub class: bool,
    pub association: bool,
    pub indication: bool,
    pub property: bool,
    pub reference: bool,
    pub method: bool,
    pub parameter: bool,
    pub any: bool,
}

impl Scopes {
    pub fn any() -> Self {
        Self {
            any: true,
            ..Self::default()
        }
    }
}

/// Qualifier flavors, using the DMTF defaults (EnableOverride, ToSubclass,
/// no ToInstance, not Translatable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flavors {
    pub overridable: bool,
    pub tosubclass: bool,
    pub toinstance: bool,
    pub translatable: bool,
}

impl Default for Flavors {
    fn default() -> Self {
        Self {
            overridable: true,
            tosubclass: true,
            toinstance: false,
            translatable: false,
        }
    }
}

/// A qualifier type declaration, stored per namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifierDeclaration {
    pub name: CimName,
    #[serde(rename = "type")]
    pub cim_type: CimType,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_size: Option<u32>,
    /// Default value applied when a qualifier of this type is used without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<CimValue>,
    #[serde(default)]
    pub scopes: Scopes,
    #[serde(default)]
    pub flavors: Flavors,
}

impl QualifierDeclaration {
    pub fn new(name: impl Into<CimName>, cim_type: CimType) -> Self {
        Self {
            name: name.into(),
            cim_type,
            is_array: false,
            array_size: None,
            value: None,
            scopes: Scopes::any(),
            flavors: Flavors::default(),
        }
    }

    pub fn with_default(mut self, value: impl Into<CimValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_scopes(mut self, scopes: Scopes) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_flavors(mut self, flavors: Flavors) -> Self {
        self.flavors = flavors;
        self
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }
}

impl Named for QualifierDeclaration {
    fn name(&self) -> &CimName {
        &self.name
    }
}

/// A qualifier applied to a class, property, method or parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qualifier {
    pub name: CimName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<CimValue>,
    /// Set when the qualifier was inherited rather than declared locally.
    #[serde(default)]
    pub propagated: bool,
}

impl Qualifier {
    pub fn new(name: impl Into<CimName>, value: impl Into<CimValue>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            propagated: false,
        }
    }

    /// Boolean qualifier set to true, e.g. `Key` or `Association`.
    pub fn flag(name: impl Into<CimName>) -> Self {
        Self::new(name, true)
    }
}

impl Named for Qualifier {
    fn name(&self) -> &CimName {
        &self.name
    }
}

/// True when the boolean qualifier `name` is present with value true.
pub fn has_flag(qualifiers: &NamedList<Qualifier>, name: &str) -> bool {
    qualifiers
        .get(name)
        .and_then(|q| q.value.as_ref())
        .and_then(CimValue::as_bool)
        .unwrap_or(false)
}
