use serde::{Deserialize, Serialize};

use crate::model::{has_flag, CimClassName, CimName, CimType, CimValue, Named, NamedList, Qualifier};

/// Property declaration (in a class) or property value (in an instance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CimProperty {
    pub name: CimName,
    #[serde(rename = "type")]
    pub cim_type: CimType,
    #[serde(default)]
    pub is_array: bool,
    /// Value in an instance, default value in a class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<CimValue>,
    /// Target class of a reference property. Not required to exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_class: Option<CimName>,
    #[serde(default)]
    pub qualifiers: NamedList<Qualifier>,
    /// Class in the hierarchy that introduced (or last overrode) the property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_origin: Option<CimName>,
    #[serde(default)]
    pub propagated: bool,
}

impl CimProperty {
    pub fn new(name: impl Into<CimName>, cim_type: CimType) -> Self {
        Self {
            name: name.into(),
            cim_type,
            is_array: false,
            value: None,
            reference_class: None,
            qualifiers: NamedList::new(),
            class_origin: None,
            propagated: false,
        }
    }

    /// Property carrying a value; the type is taken from the value.
    pub fn with_value(name: impl Into<CimName>, value: impl Into<CimValue>) -> Self {
        let value = value.into();
        let cim_type = value.cim_type().unwrap_or(CimType::String);
        let mut prop = Self::new(name, cim_type);
        prop.is_array = value.is_array();
        prop.value = Some(value);
        prop
    }

    pub fn reference(name: impl Into<CimName>, reference_class: impl Into<CimName>) -> Self {
        let mut prop = Self::new(name, CimType::Reference);
        prop.reference_class = Some(reference_class.into());
        prop
    }

    pub fn key(mut self) -> Self {
        self.qualifiers.insert(Qualifier::flag("Key"));
        self
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.insert(qualifier);
        self
    }

    pub fn default_value(mut self, value: impl Into<CimValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn is_key(&self) -> bool {
        has_flag(&self.qualifiers, "Key")
    }

    pub fn is_reference(&self) -> bool {
        self.cim_type == CimType::Reference
    }
}

impl Named for CimProperty {
    fn name(&self) -> &CimName {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CimParameter {
    pub name: CimName,
    #[serde(rename = "type")]
    pub cim_type: CimType,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_class: Option<CimName>,
    #[serde(default)]
    pub qualifiers: NamedList<Qualifier>,
}

impl CimParameter {
    pub fn new(name: impl Into<CimName>, cim_type: CimType) -> Self {
        Self {
            name: name.into(),
            cim_type,
            is_array: false,
            reference_class: None,
            qualifiers: NamedList::new(),
        }
    }

    pub fn qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.insert(qualifier);
        self
    }

    /// Parameters are input unless explicitly qualified `In(false)`.
    pub fn is_input(&self) -> bool {
        match self.qualifiers.get("In").and_then(|q| q.value.as_ref()) {
            Some(value) => value.as_bool().unwrap_or(true),
            None => true,
        }
    }

    pub fn is_output(&self) -> bool {
        has_flag(&self.qualifiers, "Out")
    }
}

impl Named for CimParameter {
    fn name(&self) -> &CimName {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CimMethod {
    pub name: CimName,
    pub return_type: CimType,
    #[serde(default)]
    pub parameters: NamedList<CimParameter>,
    #[serde(default)]
    pub qualifiers: NamedList<Qualifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_origin: Option<CimName>,
    #[serde(default)]
    pub propagated: bool,
}

impl CimMethod {
    pub fn new(name: impl Into<CimName>, return_type: CimType) -> Self {
        Self {
            name: name.into(),
            return_type,
            parameters: NamedList::new(),
            qualifiers: NamedList::new(),
            class_origin: None,
            propagated: false,
        }
    }

    pub fn parameter(mut self, parameter: CimParameter) -> Self {
        self.parameters.insert(parameter);
        self
    }

    pub fn qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.insert(qualifier);
        self
    }
}

impl Named for CimMethod {
    fn name(&self) -> &CimName {
        &self.name
    }
}

/// A CIM class definition.
///
/// The superclass is referenced by name only. Once stored, a class holds its
/// resolved member set: inherited properties and methods are present with
/// `propagated = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CimClass {
    pub classname: CimName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superclass: Option<CimName>,
    #[serde(default)]
    pub qualifiers: NamedList<Qualifier>,
    #[serde(default)]
    pub properties: NamedList<CimProperty>,
    #[serde(default)]
    pub methods: NamedList<CimMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<CimClassName>,
}

impl CimClass {
    pub fn new(classname: impl Into<CimName>) -> Self {
        Self {
            classname: classname.into(),
            superclass: None,
            qualifiers: NamedList::new(),
            properties: NamedList::new(),
            methods: NamedList::new(),
            path: None,
        }
    }

    pub fn with_superclass(mut self, superclass: impl Into<CimName>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.insert(qualifier);
        self
    }

    pub fn property(mut self, property: CimProperty) -> Self {
        self.properties.insert(property);
        self
    }

    pub fn method(mut self, method: CimMethod) -> Self {
        self.methods.insert(method);
        self
    }

    /// Key properties in declaration order.
    pub fn key_properties(&self) -> impl Iterator<Item = &CimProperty> {
        self.properties.iter().filter(|p| p.is_key())
    }

    pub fn reference_properties(&self) -> impl Iterator<Item = &CimProperty> {
        self.properties.iter().filter(|p| p.is_reference())
    }

    /// `Association` declared on this class itself. Inherited association
    /// status is resolved against the superclass chain by the store.
    pub fn is_local_association(&self) -> bool {
        has_flag(&self.qualifiers, "Association")
    }

    /// Every qualifier name used on the class or any of its members.
    pub fn qualifier_names(&self) -> Vec<&CimName> {
        let mut names: Vec<&CimName> = self.qualifiers.names().collect();
        for prop in &self.properties {
            names.extend(prop.qualifiers.names());
        }
        for method in &self.methods {
            names.extend(method.qualifiers.names());
            for param in &method.parameters {
                names.extend(param.qualifiers.names());
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_properties_in_order() {
        let class = CimClass::new("CIM_Foo")
            .property(CimProperty::new("B", CimType::String).key())
            .property(CimProperty::new("Data", CimType::Uint32))
            .property(CimProperty::new("A", CimType::String).key());
        let keys: Vec<_> = class.key_properties().map(|p| p.name.as_str()).collect();
        assert_eq!(keys, vec!["B", "A"]);
    }

    #[test]
    fn test_qualifier_names_cover_members() {
        let class = CimClass::new("CIM_Foo")
            .qualifier(Qualifier::new("Description", "foo"))
            .property(CimProperty::new("Id", CimType::String).key())
            .method(
                CimMethod::new("Run", CimType::Uint32).parameter(
                    CimParameter::new("Arg", CimType::String).qualifier(Qualifier::flag("In")),
                ),
            );
        let names: Vec<_> = class.qualifier_names().iter().map(|n| n.key().to_string()).collect();
        assert_eq!(names, vec!["description", "key", "in"]);
    }

    #[test]
    fn test_parameter_direction() {
        let input = CimParameter::new("A", CimType::String);
        assert!(input.is_input());
        assert!(!input.is_output());

        let output = CimParameter::new("B", CimType::String)
            .qualifier(Qualifier::new("In", false))
            .qualifier(Qualifier::flag("Out"));
        assert!(!output.is_input());
        assert!(output.is_output());
    }
}
