//! Associators / References traversal.
//!
//! Instance-level traversal scans stored association instances for reference
//! values pointing at the source path. Class-level traversal walks class
//! definitions, or, without them, the reference values present in stored
//! instances.

use log::debug;

use crate::error::{CimError, CimResult};
use crate::logic::engine::reads_with_classes;
use crate::logic::instances::qualified;
use crate::logic::{Projector, WbemServer};
use crate::model::{
    AssociatedObject, AssociatorFilter, CimClassName, CimInstance, CimInstanceName, CimName,
    ObjectName, ReferenceFilter, RequestContext, ResultOptions,
};
use crate::store::{ClassStore, InstanceStore, NamespaceData};

/// Per-request view used while traversing one namespace.
struct Traversal<'a> {
    data: &'a NamespaceData,
    namespace: &'a CimName,
    with_classes: bool,
}

fn role_matches(role: &Option<String>, property: &CimName) -> bool {
    role.as_deref().map_or(true, |r| property.matches(r))
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

impl<'a> Traversal<'a> {
    fn new(ctx: &'a RequestContext, data: &'a NamespaceData, source_class: &CimName) -> Self {
        Self {
            data,
            namespace: &ctx.namespace,
            with_classes: reads_with_classes(ctx.mode, data, source_class.as_str()),
        }
    }

    /// Class filter match: subclass-aware with class definitions, plain name
    /// equality without them.
    fn class_matches(&self, classname: &CimName, filter: &Option<String>) -> bool {
        match filter.as_deref() {
            None => true,
            Some(wanted) if self.with_classes => self.data.is_subclass_of(classname.as_str(), wanted),
            Some(wanted) => classname.matches(wanted),
        }
    }

    fn is_association_instance(&self, instance: &CimInstance) -> bool {
        !self.with_classes || self.data.is_association(instance.classname.as_str())
    }

    fn check_source_instance(&self, source: &CimInstanceName) -> CimResult<()> {
        if !self.with_classes {
            return Ok(());
        }
        if !self.data.class_exists(source.classname.as_str()) {
            return Err(CimError::class_not_found(self.namespace, &source.classname));
        }
        if !self.data.instance_exists(source) {
            return Err(CimError::instance_not_found(source));
        }
        Ok(())
    }

    /// Reference property names of `assoc` that point at `source`.
    fn source_roles<'i>(&self, assoc: &'i CimInstance, source: &CimInstanceName) -> Vec<&'i CimName> {
        assoc
            .references()
            .filter(|(_, target)| target.refers_to(source, self.namespace))
            .map(|(name, _)| name)
            .collect()
    }

    fn reference_instances(
        &self,
        source: &CimInstanceName,
        filter: &ReferenceFilter,
    ) -> Vec<&'a CimInstance> {
        self.data
            .list_instances(None)
            .into_iter()
            .filter(|assoc| self.is_association_instance(assoc))
            .filter(|assoc| self.class_matches(&assoc.classname, &filter.result_class))
            .filter(|assoc| {
                self.source_roles(assoc, source)
                    .into_iter()
                    .any(|role| role_matches(&filter.role, role))
            })
            .collect()
    }

    fn associator_instances(
        &self,
        source: &CimInstanceName,
        filter: &AssociatorFilter,
    ) -> Vec<&'a CimInstance> {
        let mut found: Vec<&'a CimInstance> = Vec::new();
        for assoc in self.data.list_instances(None) {
            if !self.is_association_instance(assoc)
                || !self.class_matches(&assoc.classname, &filter.assoc_class)
            {
                continue;
            }
            for role in self.source_roles(assoc, source) {
                if !role_matches(&filter.role, role) {
                    continue;
                }
                for (result_role, target) in assoc.references() {
                    if result_role == role || !role_matches(&filter.result_role, result_role) {
                        continue;
                    }
                    if target.namespace.as_ref().is_some_and(|ns| ns != self.namespace) {
                        continue;
                    }
                    // Dangling references have no other end to report.
                    let Some(other) = self.data.get_instance(target) else {
                        continue;
                    };
                    if self.class_matches(&other.classname, &filter.result_class)
                        && !found.iter().any(|f| f.path == other.path)
                    {
                        found.push(other);
                    }
                }
            }
        }
        found
    }

    /// Association class names whose reference properties can point at
    /// `source`, with the matching role names.
    fn class_references(&self, source: &CimName, filter: &ReferenceFilter) -> Vec<CimName> {
        let mut found = Vec::new();
        for (assoc, role, _) in self.class_links(source) {
            if role_matches(&filter.role, &role) && self.class_matches(&assoc, &filter.result_class) {
                push_unique(&mut found, assoc);
            }
        }
        found
    }

    fn class_associators(&self, source: &CimName, filter: &AssociatorFilter) -> Vec<CimName> {
        let mut found = Vec::new();
        for (assoc, role, others) in self.class_links(source) {
            if !role_matches(&filter.role, &role) || !self.class_matches(&assoc, &filter.assoc_class) {
                continue;
            }
            for (result_role, target) in others {
                if role_matches(&filter.result_role, &result_role)
                    && self.class_matches(&target, &filter.result_class)
                {
                    push_unique(&mut found, target);
                }
            }
        }
        found
    }

    /// (association class, source role, [(other role, other class)]) for
    /// every way `source` takes part in an association.
    #[allow(clippy::type_complexity)]
    fn class_links(&self, source: &CimName) -> Vec<(CimName, CimName, Vec<(CimName, CimName)>)> {
        let mut links = Vec::new();
        if self.with_classes {
            for class in self.data.list_classes(None) {
                if !self.data.is_association(class.classname.as_str()) {
                    continue;
                }
                let refs: Vec<(CimName, CimName)> = class
                    .reference_properties()
                    .filter_map(|p| p.reference_class.clone().map(|rc| (p.name.clone(), rc)))
                    .collect();
                for (role, target) in &refs {
                    if !self.data.is_subclass_of(source.as_str(), target.as_str()) {
                        continue;
                    }
                    let others = refs
                        .iter()
                        .filter(|(other, _)| other != role)
                        // Forward references to classes that never appeared match nothing.
                        .filter(|(_, other_class)| self.data.class_exists(other_class.as_str()))
                        .cloned()
                        .collect();
                    links.push((class.classname.clone(), role.clone(), others));
                }
            }
        } else {
            for assoc in self.data.list_instances(None) {
                let refs: Vec<(&CimName, &CimInstanceName)> = assoc.references().collect();
                for (role, target) in &refs {
                    if !target.classname.matches(source.as_str()) {
                        continue;
                    }
                    let others = refs
                        .iter()
                        .filter(|(other, _)| other != role)
                        .map(|(other, path)| ((*other).clone(), path.classname.clone()))
                        .collect();
                    links.push((assoc.classname.clone(), (*role).clone(), others));
                }
            }
        }
        links
    }

    fn class_object(&self, classname: &CimName, options: &ResultOptions) -> Option<AssociatedObject> {
        self.data
            .get_class(classname.as_str())
            .map(|class| AssociatedObject::Class(Projector::class(class.clone(), &options.as_class_options())))
    }

    fn class_path(&self, classname: CimName) -> ObjectName {
        ObjectName::Class(CimClassName::new(classname).with_namespace(self.namespace.clone()))
    }

    fn result_instance(&self, instance: &CimInstance, options: &ResultOptions) -> CimInstance {
        let mut instance = instance.clone();
        if self.with_classes {
            instance = Projector::with_class_origins(self.data, instance);
        }
        qualified(
            Projector::instance(instance, &options.as_instance_options()),
            self.namespace,
        )
    }

    fn result_path(&self, instance: &CimInstance) -> Option<CimInstanceName> {
        instance
            .path
            .as_ref()
            .map(|p| p.clone().with_namespace(self.namespace.clone()))
    }
}

impl WbemServer {
    pub fn associators(
        &self,
        ctx: &RequestContext,
        source: &ObjectName,
        filter: &AssociatorFilter,
        options: &ResultOptions,
    ) -> CimResult<Vec<AssociatedObject>> {
        let ctx = ctx.for_namespace(source.namespace());
        debug!("Associators {} in {}", source, ctx.namespace);
        self.repository.read(ctx.namespace.as_str(), |data| {
            let traversal = Traversal::new(&ctx, data, source.classname());
            match source {
                ObjectName::Instance(path) => {
                    traversal.check_source_instance(path)?;
                    Ok(traversal
                        .associator_instances(path, filter)
                        .into_iter()
                        .map(|i| AssociatedObject::Instance(traversal.result_instance(i, options)))
                        .collect())
                }
                ObjectName::Class(path) => {
                    check_source_class(&traversal, &path.classname)?;
                    Ok(traversal
                        .class_associators(&path.classname, filter)
                        .iter()
                        .filter_map(|c| traversal.class_object(c, options))
                        .collect())
                }
            }
        })
    }

    pub fn associator_names(
        &self,
        ctx: &RequestContext,
        source: &ObjectName,
        filter: &AssociatorFilter,
    ) -> CimResult<Vec<ObjectName>> {
        let ctx = ctx.for_namespace(source.namespace());
        debug!("AssociatorNames {} in {}", source, ctx.namespace);
        self.repository.read(ctx.namespace.as_str(), |data| {
            let traversal = Traversal::new(&ctx, data, source.classname());
            match source {
                ObjectName::Instance(path) => {
                    traversal.check_source_instance(path)?;
                    Ok(traversal
                        .associator_instances(path, filter)
                        .into_iter()
                        .filter_map(|i| traversal.result_path(i))
                        .map(ObjectName::Instance)
                        .collect())
                }
                ObjectName::Class(path) => {
                    check_source_class(&traversal, &path.classname)?;
                    Ok(traversal
                        .class_associators(&path.classname, filter)
                        .into_iter()
                        .map(|c| traversal.class_path(c))
                        .collect())
                }
            }
        })
    }

    pub fn references(
        &self,
        ctx: &RequestContext,
        source: &ObjectName,
        filter: &ReferenceFilter,
        options: &ResultOptions,
    ) -> CimResult<Vec<AssociatedObject>> {
        let ctx = ctx.for_namespace(source.namespace());
        debug!("References {} in {}", source, ctx.namespace);
        self.repository.read(ctx.namespace.as_str(), |data| {
            let traversal = Traversal::new(&ctx, data, source.classname());
            match source {
                ObjectName::Instance(path) => {
                    traversal.check_source_instance(path)?;
                    Ok(traversal
                        .reference_instances(path, filter)
                        .into_iter()
                        .map(|i| AssociatedObject::Instance(traversal.result_instance(i, options)))
                        .collect())
                }
                ObjectName::Class(path) => {
                    check_source_class(&traversal, &path.classname)?;
                    Ok(traversal
                        .class_references(&path.classname, filter)
                        .iter()
                        .filter_map(|c| traversal.class_object(c, options))
                        .collect())
                }
            }
        })
    }

    pub fn reference_names(
        &self,
        ctx: &RequestContext,
        source: &ObjectName,
        filter: &ReferenceFilter,
    ) -> CimResult<Vec<ObjectName>> {
        let ctx = ctx.for_namespace(source.namespace());
        debug!("ReferenceNames {} in {}", source, ctx.namespace);
        self.repository.read(ctx.namespace.as_str(), |data| {
            let traversal = Traversal::new(&ctx, data, source.classname());
            match source {
                ObjectName::Instance(path) => {
                    traversal.check_source_instance(path)?;
                    Ok(traversal
                        .reference_instances(path, filter)
                        .into_iter()
                        .filter_map(|i| traversal.result_path(i))
                        .map(ObjectName::Instance)
                        .collect())
                }
                ObjectName::Class(path) => {
                    check_source_class(&traversal, &path.classname)?;
                    Ok(traversal
                        .class_references(&path.classname, filter)
                        .into_iter()
                        .map(|c| traversal.class_path(c))
                        .collect())
                }
            }
        })
    }

    /// Instance-level References used by the pull operations.
    pub(crate) fn collect_references(
        &self,
        ctx: &RequestContext,
        source: &CimInstanceName,
        filter: &ReferenceFilter,
        options: &ResultOptions,
    ) -> CimResult<(Vec<CimInstance>, Vec<CimInstanceName>)> {
        self.repository.read(ctx.namespace.as_str(), |data| {
            let traversal = Traversal::new(ctx, data, &source.classname);
            traversal.check_source_instance(source)?;
            let found = traversal.reference_instances(source, filter);
            Ok((
                found.iter().map(|i| traversal.result_instance(i, options)).collect(),
                found.iter().filter_map(|i| traversal.result_path(i)).collect(),
            ))
        })
    }

    /// Instance-level Associators used by the pull operations.
    pub(crate) fn collect_associators(
        &self,
        ctx: &RequestContext,
        source: &CimInstanceName,
        filter: &AssociatorFilter,
        options: &ResultOptions,
    ) -> CimResult<(Vec<CimInstance>, Vec<CimInstanceName>)> {
        self.repository.read(ctx.namespace.as_str(), |data| {
            let traversal = Traversal::new(ctx, data, &source.classname);
            traversal.check_source_instance(source)?;
            let found = traversal.associator_instances(source, filter);
            Ok((
                found.iter().map(|i| traversal.result_instance(i, options)).collect(),
                found.iter().filter_map(|i| traversal.result_path(i)).collect(),
            ))
        })
    }
}

fn check_source_class(traversal: &Traversal<'_>, classname: &CimName) -> CimResult<()> {
    if traversal.with_classes && !traversal.data.class_exists(classname.as_str()) {
        return Err(CimError::class_not_found(traversal.namespace, classname));
    }
    Ok(())
}
