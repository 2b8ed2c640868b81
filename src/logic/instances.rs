use log::debug;
use std::collections::HashSet;

use crate::error::{CimError, CimResult};
use crate::logic::engine::{reads_with_classes, writes_with_classes};
use crate::logic::{ClassResolver, MutationValidator, Projector, QueryParser, WbemServer};
use crate::model::{
    CimInstance, CimInstanceName, CimName, CimProperty, EnumerateInstancesOptions,
    GetInstanceOptions, ModifyInstanceOptions, RequestContext,
};
use crate::store::{ClassStore, InstanceStore, NamespaceData};

/// Validate an instance against its class and compute its path from the
/// class keys. Shared by CreateInstance and batch ingestion.
pub(crate) fn prepare_instance(
    namespace: &CimName,
    data: &NamespaceData,
    mut instance: CimInstance,
) -> CimResult<(CimInstanceName, CimInstance)> {
    MutationValidator::validate_instance(namespace, data, &instance)?;
    let class = data
        .get_class(instance.classname.as_str())
        .ok_or_else(|| CimError::class_not_found(namespace, &instance.classname))?;

    if let Some(undeclared) = instance
        .properties
        .names()
        .find(|name| !class.properties.contains(name.as_str()))
    {
        return Err(CimError::invalid_parameter(format!(
            "property '{}' is not declared in class '{}'",
            undeclared, class.classname
        )));
    }

    let path = ClassResolver::instance_path(class, &instance)?;
    if data.instance_exists(&path) {
        return Err(CimError::DuplicateInstance {
            path: path.with_namespace(namespace.clone()).to_string(),
        });
    }
    instance.classname = class.classname.clone();
    Ok((path, instance))
}

/// Names of `classname` and its subclasses when classes are consulted, or
/// just `classname` itself otherwise.
pub(crate) fn enumeration_targets(
    data: &NamespaceData,
    classname: &str,
    with_classes: bool,
) -> HashSet<CimName> {
    let mut targets: HashSet<CimName> = HashSet::new();
    targets.insert(CimName::new(classname));
    if with_classes {
        targets.extend(data.subclass_names(classname, true));
    }
    targets
}

pub(crate) fn qualified(instance: CimInstance, namespace: &CimName) -> CimInstance {
    let mut instance = instance;
    instance.path = instance.path.map(|p| p.with_namespace(namespace.clone()));
    instance
}

impl WbemServer {
    pub fn get_instance(
        &self,
        ctx: &RequestContext,
        path: &CimInstanceName,
        options: &GetInstanceOptions,
    ) -> CimResult<CimInstance> {
        let ctx = ctx.for_namespace(path.namespace.as_ref());
        debug!("GetInstance {} in {}", path, ctx.namespace);
        self.repository.read(ctx.namespace.as_str(), |data| {
            let with_classes = reads_with_classes(ctx.mode, data, path.classname.as_str());
            if with_classes && !data.class_exists(path.classname.as_str()) {
                return Err(CimError::class_not_found(&ctx.namespace, &path.classname));
            }
            let mut instance = data
                .get_instance(path)
                .cloned()
                .ok_or_else(|| CimError::instance_not_found(path))?;
            if with_classes {
                instance = Projector::with_class_origins(data, instance);
                if options.local_only {
                    instance = Projector::local_to_creation_class(data, instance);
                }
            }
            Ok(qualified(Projector::instance(instance, options), &ctx.namespace))
        })
    }

    pub fn enumerate_instances(
        &self,
        ctx: &RequestContext,
        classname: &str,
        options: &EnumerateInstancesOptions,
    ) -> CimResult<Vec<CimInstance>> {
        debug!("EnumerateInstances {} in {}", classname, ctx.namespace);
        self.repository.read(ctx.namespace.as_str(), |data| {
            self.collect_instances(ctx, data, classname, options)
        })
    }

    pub(crate) fn collect_instances(
        &self,
        ctx: &RequestContext,
        data: &NamespaceData,
        classname: &str,
        options: &EnumerateInstancesOptions,
    ) -> CimResult<Vec<CimInstance>> {
        let with_classes = reads_with_classes(ctx.mode, data, classname);
        let projection = GetInstanceOptions {
            local_only: false,
            include_qualifiers: options.include_qualifiers,
            include_class_origin: options.include_class_origin,
            property_list: options.property_list.clone(),
        };

        let requested = if with_classes {
            Some(
                data.get_class(classname)
                    .ok_or_else(|| CimError::class_not_found(&ctx.namespace, classname))?,
            )
        } else {
            None
        };

        let targets = enumeration_targets(data, classname, with_classes);
        Ok(data
            .instances_of(&targets)
            .into_iter()
            .map(|instance| {
                let mut instance = instance.clone();
                if let Some(requested) = requested {
                    instance = Projector::with_class_origins(data, instance);
                    instance = Projector::for_enumeration(
                        data,
                        requested,
                        options.deep_inheritance,
                        options.local_only,
                        instance,
                    );
                }
                qualified(Projector::instance(instance, &projection), &ctx.namespace)
            })
            .collect())
    }

    pub fn enumerate_instance_names(
        &self,
        ctx: &RequestContext,
        classname: &str,
    ) -> CimResult<Vec<CimInstanceName>> {
        debug!("EnumerateInstanceNames {} in {}", classname, ctx.namespace);
        self.repository.read(ctx.namespace.as_str(), |data| {
            self.collect_instance_names(ctx, data, classname)
        })
    }

    pub(crate) fn collect_instance_names(
        &self,
        ctx: &RequestContext,
        data: &NamespaceData,
        classname: &str,
    ) -> CimResult<Vec<CimInstanceName>> {
        let with_classes = reads_with_classes(ctx.mode, data, classname);
        if with_classes && !data.class_exists(classname) {
            return Err(CimError::class_not_found(&ctx.namespace, classname));
        }
        let targets = enumeration_targets(data, classname, with_classes);
        Ok(data
            .instances_of(&targets)
            .into_iter()
            .filter_map(|instance| instance.path.clone())
            .map(|path| path.with_namespace(ctx.namespace.clone()))
            .collect())
    }

    /// Store a new instance and return its namespace-qualified path.
    pub fn create_instance(
        &self,
        ctx: &RequestContext,
        instance: CimInstance,
    ) -> CimResult<CimInstanceName> {
        debug!("CreateInstance {} in {}", instance.classname, ctx.namespace);
        if !writes_with_classes(ctx.mode) {
            return Err(CimError::not_supported(
                "CreateInstance",
                "the repository runs without class definitions",
            ));
        }
        let namespace = ctx.namespace.clone();
        self.repository.write(namespace.as_str(), |data| {
            let (path, instance) = prepare_instance(&namespace, data, instance)?;
            data.put_instance(path.clone(), instance);
            Ok(path.with_namespace(namespace.clone()))
        })
    }

    /// Apply the properties of `modified` to the stored instance at
    /// `modified.path`.
    pub fn modify_instance(
        &self,
        ctx: &RequestContext,
        modified: CimInstance,
        options: &ModifyInstanceOptions,
    ) -> CimResult<()> {
        if !writes_with_classes(ctx.mode) {
            return Err(CimError::not_supported(
                "ModifyInstance",
                "the repository runs without class definitions",
            ));
        }
        let path = modified
            .path
            .clone()
            .ok_or_else(|| CimError::invalid_parameter("modified instance has no path"))?;
        let ctx = ctx.for_namespace(path.namespace.as_ref());
        debug!("ModifyInstance {} in {}", path, ctx.namespace);

        self.repository.write(ctx.namespace.as_str(), |data| {
            let class = data
                .get_class(path.classname.as_str())
                .cloned()
                .ok_or_else(|| CimError::class_not_found(&ctx.namespace, &path.classname))?;
            let mut stored = data
                .get_instance(&path)
                .cloned()
                .ok_or_else(|| CimError::instance_not_found(&path))?;

            let selected: Vec<CimName> = match &options.property_list {
                Some(list) => list.iter().map(|n| CimName::new(n.as_str())).collect(),
                None => modified.properties.names().cloned().collect(),
            };

            for name in selected {
                let declared = class.properties.get(name.as_str()).ok_or_else(|| {
                    CimError::invalid_parameter(format!(
                        "property '{}' is not declared in class '{}'",
                        name, class.classname
                    ))
                })?;
                let new_value = modified.value(name.as_str()).cloned();
                if declared.is_key() && stored.value(name.as_str()) != new_value.as_ref() {
                    return Err(CimError::invalid_parameter(format!(
                        "key property '{}' cannot be modified",
                        declared.name
                    )));
                }
                match stored.properties.get_mut(name.as_str()) {
                    Some(prop) => prop.value = new_value,
                    None => {
                        let mut prop = match modified.properties.get(name.as_str()) {
                            Some(supplied) => supplied.clone(),
                            None => CimProperty::new(declared.name.clone(), declared.cim_type),
                        };
                        prop.value = new_value;
                        prop.class_origin = None;
                        prop.propagated = false;
                        stored.properties.insert(prop);
                    }
                }
            }

            if options.include_qualifiers {
                stored.qualifiers = modified.qualifiers.clone();
            }
            data.put_instance(path.clone(), stored);
            Ok(())
        })
    }

    pub fn delete_instance(&self, ctx: &RequestContext, path: &CimInstanceName) -> CimResult<()> {
        let ctx = ctx.for_namespace(path.namespace.as_ref());
        debug!("DeleteInstance {} in {}", path, ctx.namespace);
        self.repository.write(ctx.namespace.as_str(), |data| {
            if writes_with_classes(ctx.mode) && !data.class_exists(path.classname.as_str()) {
                return Err(CimError::class_not_found(&ctx.namespace, &path.classname));
            }
            data.delete_instance(path)
                .map(|_| ())
                .ok_or_else(|| CimError::instance_not_found(path))
        })
    }

    /// Instances of the FROM class, projected to the SELECT list. Any WHERE
    /// clause is ignored.
    pub fn exec_query(
        &self,
        ctx: &RequestContext,
        query_language: &str,
        query: &str,
    ) -> CimResult<Vec<CimInstance>> {
        debug!("ExecQuery [{}] {} in {}", query_language, query, ctx.namespace);
        let parsed = QueryParser::parse(query_language, query)?;
        let options = EnumerateInstancesOptions {
            property_list: parsed.properties,
            ..EnumerateInstancesOptions::default()
        };
        self.enumerate_instances(ctx, parsed.classname.as_str(), &options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CimClass, CimType, CimValue, QualifierDeclaration, RepoMode};

    fn server() -> (WbemServer, RequestContext) {
        let server = WbemServer::default();
        server.ensure_namespace("root/cimv2");
        let ctx = RequestContext::new("root/cimv2");
        server
            .set_qualifier(&ctx, QualifierDeclaration::new("Key", CimType::Boolean))
            .unwrap();
        server
            .create_class(
                &ctx,
                CimClass::new("CIM_Foo")
                    .property(CimProperty::new("InstanceID", CimType::String).key())
                    .property(CimProperty::new("Caption", CimType::String)),
            )
            .unwrap();
        server
            .create_class(
                &ctx,
                CimClass::new("CIM_FooSub")
                    .with_superclass("CIM_Foo")
                    .property(CimProperty::new("Extra", CimType::Uint32)),
            )
            .unwrap();
        (server, ctx)
    }

    fn foo(id: &str) -> CimInstance {
        CimInstance::new("CIM_Foo")
            .with_property("InstanceID", id)
            .with_property("Caption", format!("caption {id}"))
    }

    #[test]
    fn test_create_then_get_round_trip() {
        let (server, ctx) = server();
        let path = server.create_instance(&ctx, foo("I1")).unwrap();
        assert_eq!(path.namespace.as_ref().unwrap().as_str(), "root/cimv2");

        let got = server
            .get_instance(&ctx, &path, &GetInstanceOptions::default())
            .unwrap();
        assert_eq!(got.properties, foo("I1").properties);
        assert_eq!(got.path, Some(path.clone()));

        assert!(matches!(
            server.create_instance(&ctx, foo("I1")),
            Err(CimError::DuplicateInstance { .. })
        ));
    }

    #[test]
    fn test_create_rejects_bad_instances() {
        let (server, ctx) = server();
        assert!(matches!(
            server.create_instance(&ctx, CimInstance::new("CIM_Missing")),
            Err(CimError::InvalidClass { .. })
        ));
        assert!(matches!(
            server.create_instance(&ctx, CimInstance::new("CIM_Foo").with_property("Caption", "c")),
            Err(CimError::MissingKeyProperty { .. })
        ));
        assert!(matches!(
            server.create_instance(&ctx, foo("I2").with_property("Bogus", 1u32)),
            Err(CimError::InvalidParameter { .. })
        ));
        assert!(matches!(
            server.create_instance(&ctx.clone().lite(), foo("I3")),
            Err(CimError::NotSupported { .. })
        ));
    }

    #[test]
    fn test_enumerate_expands_subclasses_and_trims_properties() {
        let (server, ctx) = server();
        server.create_instance(&ctx, foo("I1")).unwrap();
        let sub = CimInstance::new("CIM_FooSub")
            .with_property("InstanceID", "S1")
            .with_property("Extra", 7u32);
        server.create_instance(&ctx, sub).unwrap();

        let deep = server
            .enumerate_instances(&ctx, "CIM_Foo", &EnumerateInstancesOptions::default())
            .unwrap();
        assert_eq!(deep.len(), 2);
        assert!(deep[1].properties.contains("Extra"));

        let shallow = server
            .enumerate_instances(
                &ctx,
                "CIM_Foo",
                &EnumerateInstancesOptions {
                    deep_inheritance: false,
                    ..EnumerateInstancesOptions::default()
                },
            )
            .unwrap();
        assert_eq!(shallow.len(), 2);
        assert!(!shallow[1].properties.contains("Extra"));

        let names = server.enumerate_instance_names(&ctx, "CIM_FooSub").unwrap();
        assert_eq!(names.len(), 1);

        let lite = server
            .enumerate_instance_names(&ctx.clone().lite(), "CIM_Foo")
            .unwrap();
        assert_eq!(lite.len(), 1);
    }

    #[test]
    fn test_modify_reflects_only_modified_properties() {
        let (server, ctx) = server();
        let path = server.create_instance(&ctx, foo("I1")).unwrap();

        let modified = CimInstance::new("CIM_Foo")
            .with_property("InstanceID", "I1")
            .with_property("Caption", "changed")
            .with_path(path.clone());
        server
            .modify_instance(&ctx, modified, &ModifyInstanceOptions::default())
            .unwrap();
        let got = server
            .get_instance(&ctx, &path, &GetInstanceOptions::default())
            .unwrap();
        assert_eq!(got.value("Caption"), Some(&CimValue::from("changed")));
        assert_eq!(got.value("InstanceID"), Some(&CimValue::from("I1")));

        let cleared = CimInstance::new("CIM_Foo").with_path(path.clone());
        server
            .modify_instance(
                &ctx,
                cleared,
                &ModifyInstanceOptions {
                    include_qualifiers: false,
                    property_list: Some(vec!["Caption".to_string()]),
                },
            )
            .unwrap();
        let got = server
            .get_instance(&ctx, &path, &GetInstanceOptions::default())
            .unwrap();
        assert_eq!(got.value("Caption"), None);
        assert!(got.properties.contains("Caption"));
    }

    #[test]
    fn test_modify_rejects_key_change_and_missing_path() {
        let (server, ctx) = server();
        let path = server.create_instance(&ctx, foo("I1")).unwrap();
        let rekeyed = foo("I9").with_path(path);
        assert!(matches!(
            server.modify_instance(&ctx, rekeyed, &ModifyInstanceOptions::default()),
            Err(CimError::InvalidParameter { .. })
        ));
        assert!(matches!(
            server.modify_instance(&ctx, foo("I1"), &ModifyInstanceOptions::default()),
            Err(CimError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_delete_instance_modes() {
        let (server, ctx) = server();
        let path = server.create_instance(&ctx, foo("I1")).unwrap();
        server.delete_instance(&ctx, &path).unwrap();
        assert!(matches!(
            server.delete_instance(&ctx, &path),
            Err(CimError::InstanceNotFound { .. })
        ));
        let orphan = CimInstanceName::new("CIM_Gone").with_key("InstanceID", "x");
        assert!(matches!(
            server.delete_instance(&ctx, &orphan),
            Err(CimError::ClassNotFound { .. })
        ));
        assert!(matches!(
            server.delete_instance(&ctx.clone().lite(), &orphan),
            Err(CimError::InstanceNotFound { .. })
        ));
    }

    #[test]
    fn test_exec_query_projects_select_list() {
        let (server, ctx) = server();
        server.create_instance(&ctx, foo("I1")).unwrap();
        let rows = server
            .exec_query(&ctx, "WQL", "SELECT Caption FROM CIM_Foo WHERE InstanceID = 'nope'")
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].properties.len(), 1);
        assert!(matches!(
            server.exec_query(&ctx, "XPath", "SELECT * FROM CIM_Foo"),
            Err(CimError::InvalidQueryLanguage { .. })
        ));
    }

    #[test]
    fn test_auto_mode_uses_classes_only_when_present() {
        let (server, ctx) = server();
        let auto = ctx.clone().with_mode(RepoMode::Auto);
        let loose = CimInstanceName::new("CIM_Loose").with_key("Id", "L1");
        server
            .add_cim_objects(
                &ctx.clone().lite(),
                vec![CimInstance::new("CIM_Loose")
                    .with_property("Id", "L1")
                    .with_path(loose.clone())
                    .into()],
            )
            .unwrap();

        let names = server.enumerate_instance_names(&auto, "CIM_Loose").unwrap();
        assert_eq!(names, vec![loose.with_namespace("root/cimv2")]);
        assert!(matches!(
            server.enumerate_instance_names(&ctx, "CIM_Loose"),
            Err(CimError::ClassNotFound { .. })
        ));

        // Writes follow Full rules
        assert!(matches!(
            server.create_instance(&auto, CimInstance::new("CIM_Loose").with_property("Id", "L2")),
            Err(CimError::InvalidClass { .. })
        ));

        let sub = CimInstance::new("CIM_FooSub")
            .with_property("InstanceID", "S1")
            .with_property("Caption", "inherited")
            .with_property("Extra", 7u32);
        let path = server.create_instance(&auto, sub).unwrap();
        let local = server
            .get_instance(
                &auto,
                &path,
                &GetInstanceOptions {
                    local_only: true,
                    ..GetInstanceOptions::default()
                },
            )
            .unwrap();
        let kept: Vec<&str> = local.properties.names().map(|n| n.as_str()).collect();
        assert_eq!(kept, vec!["Extra"]);
        assert_eq!(server.enumerate_instance_names(&auto, "CIM_Foo").unwrap().len(), 1);
    }
}
