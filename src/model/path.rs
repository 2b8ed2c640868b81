use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::model::{CimName, CimValue, Named, NamedList};

/// One key binding of an instance path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyBinding {
    pub name: CimName,
    pub value: CimValue,
}

impl KeyBinding {
    pub fn new(name: impl Into<CimName>, value: impl Into<CimValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Named for KeyBinding {
    fn name(&self) -> &CimName {
        &self.name
    }
}

/// Path to a class: namespace plus class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CimClassName {
    pub classname: CimName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<CimName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<CimName>,
}

impl CimClassName {
    pub fn new(classname: impl Into<CimName>) -> Self {
        Self {
            classname: classname.into(),
            namespace: None,
            host: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<CimName>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

impl fmt::Display for CimClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            write!(f, "//{host}/")?;
        }
        if let Some(ns) = &self.namespace {
            write!(f, "{ns}:")?;
        }
        write!(f, "{}", self.classname)
    }
}

/// Path to an instance: namespace, class name and key bindings.
///
/// Equality and hashing ignore key binding order and the case of every name;
/// key values compare exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CimInstanceName {
    pub classname: CimName,
    #[serde(default)]
    pub keybindings: NamedList<KeyBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<CimName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<CimName>,
}

impl CimInstanceName {
    pub fn new(classname: impl Into<CimName>) -> Self {
        Self {
            classname: classname.into(),
            keybindings: NamedList::new(),
            namespace: None,
            host: None,
        }
    }

    pub fn with_key(mut self, name: impl Into<CimName>, value: impl Into<CimValue>) -> Self {
        self.keybindings.insert(KeyBinding::new(name, value));
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<CimName>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn key(&self, name: &str) -> Option<&CimValue> {
        self.keybindings.get(name).map(|kb| &kb.value)
    }

    /// Copy without namespace and host, the form used as a store key.
    pub fn local(&self) -> Self {
        Self {
            classname: self.classname.clone(),
            keybindings: self.keybindings.clone(),
            namespace: None,
            host: None,
        }
    }

    /// Whether a reference value designates `target` when resolved in
    /// `namespace`. Host is ignored and a missing namespace means "same
    /// namespace".
    pub fn refers_to(&self, target: &CimInstanceName, namespace: &CimName) -> bool {
        let ns_ok = match &self.namespace {
            None => true,
            Some(ns) => ns == namespace,
        };
        ns_ok && self.classname == target.classname && keys_equal(&self.keybindings, &target.keybindings)
    }

    pub fn class_path(&self) -> CimClassName {
        CimClassName {
            classname: self.classname.clone(),
            namespace: self.namespace.clone(),
            host: self.host.clone(),
        }
    }
}

fn keys_equal(a: &NamedList<KeyBinding>, b: &NamedList<KeyBinding>) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|kb| b.get(kb.name.as_str()).is_some_and(|other| other.value == kb.value))
}

impl PartialEq for CimInstanceName {
    fn eq(&self, other: &Self) -> bool {
        self.classname == other.classname
            && self.namespace == other.namespace
            && self.host == other.host
            && keys_equal(&self.keybindings, &other.keybindings)
    }
}

impl Eq for CimInstanceName {}

impl Hash for CimInstanceName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.classname.hash(state);
        self.namespace.hash(state);
        self.host.hash(state);
        let mut keys: Vec<&KeyBinding> = self.keybindings.iter().collect();
        keys.sort_by(|a, b| a.name.cmp(&b.name));
        for kb in keys {
            kb.name.hash(state);
            kb.value.hash(state);
        }
    }
}

/// WBEM URI form, e.g. `root/cimv2:CIM_Foo.InstanceID="I1"`.
impl fmt::Display for CimInstanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            write!(f, "//{host}/")?;
        }
        if let Some(ns) = &self.namespace {
            write!(f, "{ns}:")?;
        }
        write!(f, "{}", self.classname)?;
        for (idx, kb) in self.keybindings.iter().enumerate() {
            let sep = if idx == 0 { '.' } else { ',' };
            write!(f, "{sep}{}={}", kb.name, kb.value)?;
        }
        Ok(())
    }
}

/// Source or target of association traversal and method invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectName {
    Class(CimClassName),
    Instance(CimInstanceName),
}

impl ObjectName {
    pub fn classname(&self) -> &CimName {
        match self {
            Self::Class(path) => &path.classname,
            Self::Instance(path) => &path.classname,
        }
    }

    pub fn namespace(&self) -> Option<&CimName> {
        match self {
            Self::Class(path) => path.namespace.as_ref(),
            Self::Instance(path) => path.namespace.as_ref(),
        }
    }
}

impl From<CimClassName> for ObjectName {
    fn from(value: CimClassName) -> Self {
        Self::Class(value)
    }
}

impl From<CimInstanceName> for ObjectName {
    fn from(value: CimInstanceName) -> Self {
        Self::Instance(value)
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(path) => path.fmt(f),
            Self::Instance(path) => path.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_instance_path_equality_ignores_order_and_case() {
        let a = CimInstanceName::new("CIM_Foo")
            .with_key("A", "x")
            .with_key("B", 1u32)
            .with_namespace("root/cimv2");
        let b = CimInstanceName::new("cim_foo")
            .with_key("b", 1u32)
            .with_key("a", "x")
            .with_namespace("ROOT/CIMV2");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_instance_path_values_compare_exactly() {
        let a = CimInstanceName::new("CIM_Foo").with_key("InstanceID", "I1");
        let b = CimInstanceName::new("CIM_Foo").with_key("InstanceID", "i1");
        assert_ne!(a, b);
    }

    #[test]
    fn test_refers_to_ignores_missing_namespace() {
        let ns = CimName::new("root/cimv2");
        let target = CimInstanceName::new("CIM_Foo").with_key("InstanceID", "I1");
        let reference = target.clone();
        assert!(reference.refers_to(&target, &ns));

        let other_ns = target.clone().with_namespace("root/other");
        assert!(!other_ns.refers_to(&target, &ns));
    }

    #[test]
    fn test_display_uri() {
        let path = CimInstanceName::new("CIM_Foo")
            .with_key("InstanceID", "I1")
            .with_namespace("root/cimv2");
        assert_eq!(path.to_string(), "root/cimv2:CIM_Foo.InstanceID=\"I1\"");
    }
}
