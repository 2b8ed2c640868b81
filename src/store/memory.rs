use log::info;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::{CimError, CimResult};
use crate::model::{
    normalize_namespace, CimClass, CimInstance, CimInstanceName, CimName, QualifierDeclaration,
};
use crate::store::{ClassStore, InstanceStore, NamespaceData, OrderedMap, QualifierStore};

/// In-memory CIM repository owning every namespace.
///
/// Each namespace sits behind its own lock: readers of a namespace proceed in
/// parallel, and a writer holds the namespace exclusively for the whole
/// validate-then-mutate step passed to [`InMemoryRepository::write`].
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    namespaces: RwLock<OrderedMap<CimName, Arc<RwLock<NamespaceData>>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-populated with the given (empty) namespaces.
    pub fn with_namespaces<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let repo = Self::new();
        for name in names {
            repo.ensure_namespace(name);
        }
        repo
    }

    /// Create the namespace if absent; idempotent. Returns the normalized name.
    pub fn ensure_namespace(&self, namespace: &str) -> CimName {
        let name = normalize_namespace(namespace);
        let mut namespaces = self.namespaces.write();
        if !namespaces.contains_key(&name) {
            info!("Creating namespace '{}'", name);
            namespaces.insert(name.clone(), Arc::new(RwLock::new(NamespaceData::new())));
        }
        name
    }

    pub fn add_namespace(&self, namespace: &str) -> CimResult<CimName> {
        let name = normalize_namespace(namespace);
        let mut namespaces = self.namespaces.write();
        if namespaces.contains_key(&name) {
            return Err(CimError::NamespaceAlreadyExists {
                namespace: name.to_string(),
            });
        }
        info!("Creating namespace '{}'", name);
        namespaces.insert(name.clone(), Arc::new(RwLock::new(NamespaceData::new())));
        Ok(name)
    }

    /// Remove an empty namespace.
    pub fn remove_namespace(&self, namespace: &str) -> CimResult<()> {
        let name = normalize_namespace(namespace);
        let mut namespaces = self.namespaces.write();
        let data = namespaces
            .get(&name)
            .ok_or_else(|| CimError::namespace_not_found(&name))?;
        if !data.read().is_empty() {
            return Err(CimError::NamespaceNotEmpty {
                namespace: name.to_string(),
            });
        }
        namespaces.remove(&name);
        info!("Removed namespace '{}'", name);
        Ok(())
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces
            .read()
            .contains_key(&normalize_namespace(namespace))
    }

    pub fn namespaces(&self) -> Vec<CimName> {
        self.namespaces.read().keys().cloned().collect()
    }

    fn namespace(&self, namespace: &str) -> CimResult<Arc<RwLock<NamespaceData>>> {
        let name = normalize_namespace(namespace);
        self.namespaces
            .read()
            .get(&name)
            .cloned()
            .ok_or_else(|| CimError::namespace_not_found(name))
    }

    /// Run `f` with shared access to one namespace.
    pub fn read<R>(
        &self,
        namespace: &str,
        f: impl FnOnce(&NamespaceData) -> CimResult<R>,
    ) -> CimResult<R> {
        let ns = self.namespace(namespace)?;
        let guard = ns.read();
        f(&guard)
    }

    /// Run `f` with exclusive access to one namespace. Validation and
    /// mutation performed inside `f` are atomic with respect to other writers.
    pub fn write<R>(
        &self,
        namespace: &str,
        f: impl FnOnce(&mut NamespaceData) -> CimResult<R>,
    ) -> CimResult<R> {
        let ns = self.namespace(namespace)?;
        let mut guard = ns.write();
        f(&mut guard)
    }

    /// Like [`write`](Self::write) but `f` works on a copy that replaces the
    /// namespace only when `f` succeeds. The namespace is created on success
    /// when it did not exist.
    ///
    /// Only the target namespace is locked while `f` runs; the namespace map
    /// is write-locked just long enough to publish a new namespace.
    pub fn write_staged<R>(
        &self,
        namespace: &str,
        f: impl FnOnce(&mut NamespaceData) -> CimResult<R>,
    ) -> CimResult<R> {
        let name = normalize_namespace(namespace);
        let existing = self.namespaces.read().get(&name).cloned();
        if let Some(existing) = existing {
            let mut guard = existing.write();
            let mut staged = guard.clone();
            let result = f(&mut staged)?;
            *guard = staged;
            return Ok(result);
        }

        let mut staged = NamespaceData::new();
        let result = f(&mut staged)?;
        let mut namespaces = self.namespaces.write();
        match namespaces.get(&name) {
            None => {
                info!("Creating namespace '{}'", name);
                namespaces.insert(name, Arc::new(RwLock::new(staged)));
            }
            // Created by another caller meanwhile; adopt it while still empty.
            Some(created) => {
                let mut guard = created.write();
                if !guard.is_empty() {
                    return Err(CimError::failed(format!(
                        "namespace '{}' was populated concurrently",
                        name
                    )));
                }
                *guard = staged;
            }
        }
        Ok(result)
    }

    pub fn get_qualifier(&self, namespace: &str, name: &str) -> CimResult<Option<QualifierDeclaration>> {
        self.read(namespace, |ns| Ok(ns.get_qualifier(name).cloned()))
    }

    pub fn get_class(&self, namespace: &str, classname: &str) -> CimResult<Option<CimClass>> {
        self.read(namespace, |ns| Ok(ns.get_class(classname).cloned()))
    }

    pub fn get_instance(
        &self,
        namespace: &str,
        path: &CimInstanceName,
    ) -> CimResult<Option<CimInstance>> {
        self.read(namespace, |ns| Ok(ns.get_instance(path).cloned()))
    }

    pub fn list_qualifiers(&self, namespace: &str) -> CimResult<Vec<QualifierDeclaration>> {
        self.read(namespace, |ns| Ok(ns.list_qualifiers().into_iter().cloned().collect()))
    }

    pub fn list_classes(
        &self,
        namespace: &str,
        predicate: Option<&dyn Fn(&CimClass) -> bool>,
    ) -> CimResult<Vec<CimClass>> {
        self.read(namespace, |ns| {
            Ok(ns.list_classes(predicate).into_iter().cloned().collect())
        })
    }

    pub fn list_instances(
        &self,
        namespace: &str,
        predicate: Option<&dyn Fn(&CimInstance) -> bool>,
    ) -> CimResult<Vec<CimInstance>> {
        self.read(namespace, |ns| {
            Ok(ns.list_instances(predicate).into_iter().cloned().collect())
        })
    }

    /// Unchecked insert; callers are expected to have validated the object.
    pub fn put_qualifier(&self, namespace: &str, declaration: QualifierDeclaration) -> CimResult<()> {
        self.write(namespace, |ns| {
            ns.put_qualifier(declaration);
            Ok(())
        })
    }

    pub fn delete_qualifier(&self, namespace: &str, name: &str) -> CimResult<bool> {
        self.write(namespace, |ns| Ok(ns.delete_qualifier(name).is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CimType;

    #[test]
    fn test_ensure_namespace_is_idempotent() {
        let repo = InMemoryRepository::new();
        let a = repo.ensure_namespace("root/cimv2");
        let b = repo.ensure_namespace("/ROOT/cimv2/");
        assert_eq!(a, b);
        assert_eq!(repo.namespaces().len(), 1);
        assert!(repo.add_namespace("root/CIMV2").is_err());
    }

    #[test]
    fn test_missing_namespace_is_distinct_from_missing_object() {
        let repo = InMemoryRepository::with_namespaces(["root/cimv2"]);
        assert_eq!(repo.get_class("root/cimv2", "CIM_Foo").unwrap(), None);
        let err = repo.get_class("root/nothere", "CIM_Foo").unwrap_err();
        assert!(matches!(err, CimError::NamespaceNotFound { .. }));
    }

    #[test]
    fn test_remove_namespace_requires_empty() {
        let repo = InMemoryRepository::with_namespaces(["root/cimv2", "interop"]);
        repo.put_qualifier("root/cimv2", QualifierDeclaration::new("Key", CimType::Boolean))
            .unwrap();
        assert!(matches!(
            repo.remove_namespace("root/cimv2"),
            Err(CimError::NamespaceNotEmpty { .. })
        ));
        repo.remove_namespace("interop").unwrap();
        assert!(!repo.has_namespace("interop"));
        assert!(repo.remove_namespace("interop").is_err());
    }

    #[test]
    fn test_staged_write_discards_on_failure() {
        let repo = InMemoryRepository::with_namespaces(["root/cimv2"]);
        let result: CimResult<()> = repo.write_staged("root/cimv2", |ns| {
            ns.put_qualifier(QualifierDeclaration::new("Key", CimType::Boolean));
            Err(CimError::failed("abort"))
        });
        assert!(result.is_err());
        assert!(repo.list_qualifiers("root/cimv2").unwrap().is_empty());

        let result: CimResult<()> = repo.write_staged("root/new", |_| Err(CimError::failed("abort")));
        assert!(result.is_err());
        assert!(!repo.has_namespace("root/new"));
    }

    #[test]
    fn test_staged_write_leaves_other_namespaces_available() {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let repo = Arc::new(InMemoryRepository::with_namespaces(["root/a", "root/b"]));
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let writer = {
            let repo = Arc::clone(&repo);
            thread::spawn(move || {
                repo.write_staged("root/a", |ns| {
                    ns.put_qualifier(QualifierDeclaration::new("Key", CimType::Boolean));
                    started_tx.send(()).unwrap();
                    release_rx.recv_timeout(Duration::from_secs(5)).unwrap();
                    Ok(())
                })
            })
        };
        started_rx.recv().unwrap();

        let (read_tx, read_rx) = mpsc::channel();
        let reader = {
            let repo = Arc::clone(&repo);
            thread::spawn(move || {
                let b = repo.list_qualifiers("root/b").map(|q| q.len());
                repo.ensure_namespace("root/c");
                read_tx.send(b).unwrap();
            })
        };
        let read = read_rx.recv_timeout(Duration::from_secs(2));
        release_tx.send(()).unwrap();

        assert_eq!(read.unwrap().unwrap(), 0);
        reader.join().unwrap();
        writer.join().unwrap().unwrap();
        assert_eq!(repo.list_qualifiers("root/a").unwrap().len(), 1);
        assert!(repo.has_namespace("root/c"));
    }
}
