use log::{debug, info};

use crate::error::{CimError, CimResult};
use crate::logic::{ClassResolver, MutationValidator, Projector, WbemServer};
use crate::model::{
    CimClass, CimName, EnumerateClassesOptions, GetClassOptions, RequestContext,
};
use crate::store::{ClassStore, NamespaceData};

/// Class names selected by EnumerateClasses / EnumerateClassNames, in
/// insertion order.
fn selected_class_names(
    data: &NamespaceData,
    namespace: &CimName,
    classname: Option<&str>,
    deep_inheritance: bool,
) -> CimResult<Vec<CimName>> {
    match classname {
        None if deep_inheritance => Ok(data
            .list_classes(None)
            .into_iter()
            .map(|c| c.classname.clone())
            .collect()),
        None => {
            let top_level = |c: &CimClass| c.superclass.is_none();
            Ok(data
                .list_classes(Some(&top_level as &dyn Fn(&CimClass) -> bool))
                .into_iter()
                .map(|c| c.classname.clone())
                .collect())
        }
        Some(name) => {
            if !data.class_exists(name) {
                return Err(CimError::class_not_found(namespace, name));
            }
            Ok(data.subclass_names(name, deep_inheritance))
        }
    }
}

impl WbemServer {
    pub fn get_class(
        &self,
        ctx: &RequestContext,
        classname: &str,
        options: &GetClassOptions,
    ) -> CimResult<CimClass> {
        debug!("GetClass {} in {}", classname, ctx.namespace);
        let class = self
            .repository
            .get_class(ctx.namespace.as_str(), classname)?
            .ok_or_else(|| CimError::class_not_found(&ctx.namespace, classname))?;
        Ok(Projector::class(class, options))
    }

    pub fn enumerate_classes(
        &self,
        ctx: &RequestContext,
        classname: Option<&str>,
        options: &EnumerateClassesOptions,
    ) -> CimResult<Vec<CimClass>> {
        debug!(
            "EnumerateClasses {:?} in {} (deep={})",
            classname, ctx.namespace, options.deep_inheritance
        );
        let projection = options.as_get_options();
        self.repository.read(ctx.namespace.as_str(), |data| {
            let names =
                selected_class_names(data, &ctx.namespace, classname, options.deep_inheritance)?;
            Ok(names
                .iter()
                .filter_map(|name| data.get_class(name.as_str()))
                .map(|class| Projector::class(class.clone(), &projection))
                .collect())
        })
    }

    pub fn enumerate_class_names(
        &self,
        ctx: &RequestContext,
        classname: Option<&str>,
        deep_inheritance: bool,
    ) -> CimResult<Vec<CimName>> {
        debug!("EnumerateClassNames {:?} in {}", classname, ctx.namespace);
        self.repository.read(ctx.namespace.as_str(), |data| {
            selected_class_names(data, &ctx.namespace, classname, deep_inheritance)
        })
    }

    /// Validate, resolve against the superclass and store a new class.
    pub fn create_class(&self, ctx: &RequestContext, class: CimClass) -> CimResult<()> {
        debug!("CreateClass {} in {}", class.classname, ctx.namespace);
        let namespace = ctx.namespace.clone();
        self.repository.write(namespace.as_str(), |data| {
            if data.class_exists(class.classname.as_str()) {
                return Err(CimError::ClassAlreadyExists {
                    namespace: namespace.to_string(),
                    classname: class.classname.to_string(),
                });
            }
            MutationValidator::validate_class(&namespace, data, &class)?;
            let resolved = ClassResolver::resolve_class(&namespace, data, class);
            data.put_class(resolved);
            Ok(())
        })
    }

    pub fn modify_class(&self, ctx: &RequestContext, class: CimClass) -> CimResult<()> {
        debug!("ModifyClass {} in {}", class.classname, ctx.namespace);
        Err(CimError::not_supported(
            "ModifyClass",
            "class modification is not implemented by the mock repository",
        ))
    }

    /// Delete a class together with all its subclasses and their instances.
    pub fn delete_class(&self, ctx: &RequestContext, classname: &str) -> CimResult<()> {
        debug!("DeleteClass {} in {}", classname, ctx.namespace);
        let (classes, instances) = self.repository.write(ctx.namespace.as_str(), |data| {
            data.cascade_delete_class(classname)
                .ok_or_else(|| CimError::class_not_found(&ctx.namespace, classname))
        })?;
        info!(
            "Deleted {} class(es) and {} instance(s) under '{}' in '{}'",
            classes.len(),
            instances,
            classname,
            ctx.namespace
        );
        Ok(())
    }
}
