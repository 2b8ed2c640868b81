use serde::{Deserialize, Serialize};

use crate::model::{CimInstanceName, CimName, CimProperty, CimValue, NamedList, Qualifier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CimInstance {
    /// Creation class name.
    pub classname: CimName,
    #[serde(default)]
    pub properties: NamedList<CimProperty>,
    #[serde(default)]
    pub qualifiers: NamedList<Qualifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<CimInstanceName>,
}

impl CimInstance {
    pub fn new(classname: impl Into<CimName>) -> Self {
        Self {
            classname: classname.into(),
            properties: NamedList::new(),
            qualifiers: NamedList::new(),
            path: None,
        }
    }

    /// Adds (or replaces) a property value, inferring its type from the value.
    pub fn with_property(mut self, name: impl Into<CimName>, value: impl Into<CimValue>) -> Self {
        self.properties.insert(CimProperty::with_value(name, value));
        self
    }

    pub fn with_path(mut self, path: CimInstanceName) -> Self {
        self.path = Some(path);
        self
    }

    pub fn value(&self, name: &str) -> Option<&CimValue> {
        self.properties.get(name).and_then(|p| p.value.as_ref())
    }

    /// Property values that are references, with their property names.
    pub fn references(&self) -> impl Iterator<Item = (&CimName, &CimInstanceName)> {
        self.properties
            .iter()
            .filter_map(|p| p.value.as_ref().and_then(CimValue::as_reference).map(|r| (&p.name, r)))
    }
}
