use std::collections::HashSet;

use crate::model::{CimClass, CimInstance, CimInstanceName, CimName, QualifierDeclaration};
use crate::store::{ClassStore, InstanceStore, OrderedMap, QualifierStore};

/// Contents of one namespace: qualifier declarations, classes and instances.
#[derive(Debug, Clone, Default)]
pub struct NamespaceData {
    qualifiers: OrderedMap<CimName, QualifierDeclaration>,
    classes: OrderedMap<CimName, CimClass>,
    instances: OrderedMap<CimInstanceName, CimInstance>,
}

impl NamespaceData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.qualifiers.is_empty() && self.classes.is_empty() && self.instances.is_empty()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn qualifier_count(&self) -> usize {
        self.qualifiers.len()
    }

    /// Instances whose creation class is one of `classnames`, in insertion order.
    pub fn instances_of(&self, classnames: &HashSet<CimName>) -> Vec<&CimInstance> {
        self.instances
            .values()
            .filter(|inst| classnames.contains(&inst.classname))
            .collect()
    }

    /// Remove a class, every transitive subclass and every instance of any of
    /// them in one pass. Returns the removed class names and instance count,
    /// or `None` when the class is not stored.
    pub fn cascade_delete_class(&mut self, classname: &str) -> Option<(Vec<CimName>, usize)> {
        let root = self.get_class(classname)?.classname.clone();
        let mut doomed = vec![root];
        doomed.extend(self.subclass_names(classname, true));
        let doomed_set: HashSet<CimName> = doomed.iter().cloned().collect();

        let removed_instances = self
            .instances
            .retain(|_, inst| !doomed_set.contains(&inst.classname));
        self.classes.retain(|name, _| !doomed_set.contains(name));
        Some((doomed, removed_instances))
    }
}

impl QualifierStore for NamespaceData {
    fn get_qualifier(&self, name: &str) -> Option<&QualifierDeclaration> {
        self.qualifiers.get(&CimName::new(name))
    }

    fn put_qualifier(&mut self, declaration: QualifierDeclaration) {
        self.qualifiers.insert(declaration.name.clone(), declaration);
    }

    fn delete_qualifier(&mut self, name: &str) -> Option<QualifierDeclaration> {
        self.qualifiers.remove(&CimName::new(name))
    }

    fn list_qualifiers(&self) -> Vec<&QualifierDeclaration> {
        self.qualifiers.values().collect()
    }
}

impl ClassStore for NamespaceData {
    fn get_class(&self, classname: &str) -> Option<&CimClass> {
        self.classes.get(&CimName::new(classname))
    }

    fn put_class(&mut self, class: CimClass) {
        self.classes.insert(class.classname.clone(), class);
    }

    fn delete_class(&mut self, classname: &str) -> Option<CimClass> {
        self.classes.remove(&CimName::new(classname))
    }

    fn list_classes(&self, predicate: Option<&dyn Fn(&CimClass) -> bool>) -> Vec<&CimClass> {
        match predicate {
            Some(pred) => self.classes.values().filter(|c| pred(c)).collect(),
            None => self.classes.values().collect(),
        }
    }
}

impl InstanceStore for NamespaceData {
    fn get_instance(&self, path: &CimInstanceName) -> Option<&CimInstance> {
        self.instances.get(&path.local())
    }

    fn put_instance(&mut self, path: CimInstanceName, mut instance: CimInstance) {
        let key = path.local();
        instance.path = Some(key.clone());
        self.instances.insert(key, instance);
    }

    fn delete_instance(&mut self, path: &CimInstanceName) -> Option<CimInstance> {
        self.instances.remove(&path.local())
    }

    fn list_instances(&self, predicate: Option<&dyn Fn(&CimInstance) -> bool>) -> Vec<&CimInstance> {
        match predicate {
            Some(pred) => self.instances.values().filter(|i| pred(i)).collect(),
            None => self.instances.values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CimProperty, CimType};

    fn class(name: &str, superclass: Option<&str>) -> CimClass {
        let mut class = CimClass::new(name).property(CimProperty::new("Id", CimType::String).key());
        class.superclass = superclass.map(CimName::new);
        class
    }

    fn instance(classname: &str, id: &str) -> (CimInstanceName, CimInstance) {
        let path = CimInstanceName::new(classname).with_key("Id", id);
        (path, CimInstance::new(classname).with_property("Id", id))
    }

    fn sample() -> NamespaceData {
        let mut ns = NamespaceData::new();
        ns.put_class(class("A", None));
        ns.put_class(class("B", Some("A")));
        ns.put_class(class("C", Some("B")));
        ns.put_class(class("D", None));
        for (cls, id) in [("A", "a1"), ("B", "b1"), ("C", "c1"), ("D", "d1")] {
            let (path, inst) = instance(cls, id);
            ns.put_instance(path, inst);
        }
        ns
    }

    #[test]
    fn test_hierarchy_queries() {
        let ns = sample();
        let chain: Vec<_> = ns.superclass_chain("c").iter().map(|n| n.as_str().to_string()).collect();
        assert_eq!(chain, vec!["C", "B", "A"]);
        assert!(ns.is_subclass_of("C", "a"));
        assert!(!ns.is_subclass_of("D", "A"));

        let direct: Vec<_> = ns.subclass_names("A", false).iter().map(|n| n.to_string()).collect();
        assert_eq!(direct, vec!["B"]);
        let deep: Vec<_> = ns.subclass_names("A", true).iter().map(|n| n.to_string()).collect();
        assert_eq!(deep, vec!["B", "C"]);
    }

    #[test]
    fn test_cascade_delete_removes_subtree_and_instances() {
        let mut ns = sample();
        let (removed, instances) = ns.cascade_delete_class("b").unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(instances, 2);
        assert!(ns.class_exists("A"));
        assert!(!ns.class_exists("C"));
        assert_eq!(ns.instance_count(), 2);
        assert!(ns.cascade_delete_class("B").is_none());
    }

    #[test]
    fn test_instance_lookup_ignores_namespace() {
        let ns = sample();
        let path = CimInstanceName::new("a").with_key("id", "a1").with_namespace("root/cimv2");
        let found = ns.get_instance(&path).unwrap();
        assert_eq!(found.classname.as_str(), "A");
        assert!(found.path.as_ref().unwrap().namespace.is_none());
    }
}
