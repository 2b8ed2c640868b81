use crate::model::{CimClass, CimInstance, CimInstanceName, CimName, QualifierDeclaration};

/// Qualifier declarations of one namespace.
pub trait QualifierStore {
    /// Get a declaration by name (case-insensitive).
    fn get_qualifier(&self, name: &str) -> Option<&QualifierDeclaration>;
    /// Insert or overwrite a declaration.
    fn put_qualifier(&mut self, declaration: QualifierDeclaration);
    fn delete_qualifier(&mut self, name: &str) -> Option<QualifierDeclaration>;
    fn list_qualifiers(&self) -> Vec<&QualifierDeclaration>;
}

/// Class definitions of one namespace.
pub trait ClassStore {
    fn get_class(&self, classname: &str) -> Option<&CimClass>;
    fn put_class(&mut self, class: CimClass);
    fn delete_class(&mut self, classname: &str) -> Option<CimClass>;
    /// Classes in insertion order, optionally filtered.
    fn list_classes(&self, predicate: Option<&dyn Fn(&CimClass) -> bool>) -> Vec<&CimClass>;

    fn class_exists(&self, classname: &str) -> bool {
        self.get_class(classname).is_some()
    }

    /// Names of `classname` and all its ancestors, nearest first. Stops at the
    /// first superclass that is not stored.
    fn superclass_chain(&self, classname: &str) -> Vec<CimName> {
        let mut chain = Vec::new();
        let mut current = self.get_class(classname);
        while let Some(class) = current {
            if chain.contains(&class.classname) {
                break;
            }
            chain.push(class.classname.clone());
            current = class.superclass.as_ref().and_then(|s| self.get_class(s.as_str()));
        }
        chain
    }

    /// True when `classname` is `ancestor` or derives from it.
    fn is_subclass_of(&self, classname: &str, ancestor: &str) -> bool {
        if CimName::new(classname) == CimName::new(ancestor) {
            return true;
        }
        self.superclass_chain(classname).iter().any(|c| c.matches(ancestor))
    }

    /// Subclass names of `classname` (direct only unless `deep`), in insertion order.
    fn subclass_names(&self, classname: &str, deep: bool) -> Vec<CimName> {
        let target = CimName::new(classname);
        let mut found: Vec<CimName> = Vec::new();
        let mut frontier = vec![target];
        while let Some(parent) = frontier.pop() {
            for class in self.list_classes(None) {
                if class.superclass.as_ref() == Some(&parent) && !found.contains(&class.classname) {
                    found.push(class.classname.clone());
                    if deep {
                        frontier.push(class.classname.clone());
                    }
                }
            }
        }
        let order: Vec<CimName> = self
            .list_classes(None)
            .into_iter()
            .map(|c| c.classname.clone())
            .collect();
        found.sort_by_key(|name| order.iter().position(|o| o == name));
        found
    }

    /// Association status is resolved at use time through the superclass chain.
    fn is_association(&self, classname: &str) -> bool {
        self.superclass_chain(classname)
            .iter()
            .filter_map(|name| self.get_class(name.as_str()))
            .any(CimClass::is_local_association)
    }
}

/// Instances of one namespace, keyed by their namespace-less path.
pub trait InstanceStore {
    fn get_instance(&self, path: &CimInstanceName) -> Option<&CimInstance>;
    /// Insert or overwrite the instance stored under `path`.
    fn put_instance(&mut self, path: CimInstanceName, instance: CimInstance);
    fn delete_instance(&mut self, path: &CimInstanceName) -> Option<CimInstance>;
    /// Instances in insertion order, optionally filtered.
    fn list_instances(&self, predicate: Option<&dyn Fn(&CimInstance) -> bool>) -> Vec<&CimInstance>;

    fn instance_exists(&self, path: &CimInstanceName) -> bool {
        self.get_instance(path).is_some()
    }
}
