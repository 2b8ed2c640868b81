use log::info;

use crate::error::{CimError, CimResult};
use crate::logic::engine::writes_with_classes;
use crate::logic::instances::prepare_instance;
use crate::logic::{ClassResolver, MutationValidator, WbemServer};
use crate::model::{CimObject, RequestContext};
use crate::store::{ClassStore, InstanceStore, QualifierStore};

/// Counts of objects committed by one ingestion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub qualifiers: usize,
    pub classes: usize,
    pub instances: usize,
}

impl WbemServer {
    /// Add an ordered batch of qualifier declarations, classes and instances
    /// to one namespace. Every object is validated in order against the
    /// objects before it; the first failure discards the whole batch. The
    /// namespace is created when the batch commits.
    pub fn add_cim_objects(
        &self,
        ctx: &RequestContext,
        objects: impl IntoIterator<Item = CimObject>,
    ) -> CimResult<IngestSummary> {
        let namespace = ctx.namespace.clone();
        let with_classes = writes_with_classes(ctx.mode);

        let summary = self.repository.write_staged(namespace.as_str(), |data| {
            let mut summary = IngestSummary::default();
            for object in objects {
                match object {
                    CimObject::QualifierDeclaration(declaration) => {
                        data.put_qualifier(declaration);
                        summary.qualifiers += 1;
                    }
                    CimObject::Class(class) => {
                        if data.class_exists(class.classname.as_str()) {
                            return Err(CimError::ClassAlreadyExists {
                                namespace: namespace.to_string(),
                                classname: class.classname.to_string(),
                            });
                        }
                        MutationValidator::validate_class(&namespace, data, &class)?;
                        let resolved = ClassResolver::resolve_class(&namespace, data, class);
                        data.put_class(resolved);
                        summary.classes += 1;
                    }
                    CimObject::Instance(instance) if with_classes => {
                        let (path, instance) = prepare_instance(&namespace, data, instance)?;
                        data.put_instance(path, instance);
                        summary.instances += 1;
                    }
                    CimObject::Instance(instance) => {
                        let path = instance.path.clone().ok_or_else(|| {
                            CimError::invalid_parameter(format!(
                                "instance of '{}' needs a path when added without class definitions",
                                instance.classname
                            ))
                        })?;
                        if data.instance_exists(&path) {
                            return Err(CimError::DuplicateInstance {
                                path: path.with_namespace(namespace.clone()).to_string(),
                            });
                        }
                        data.put_instance(path, instance);
                        summary.instances += 1;
                    }
                }
            }
            Ok(summary)
        })?;

        info!(
            "Added {} qualifier declaration(s), {} class(es) and {} instance(s) to '{}'",
            summary.qualifiers, summary.classes, summary.instances, namespace
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CimClass, CimInstance, CimInstanceName, CimProperty, CimType, GetInstanceOptions,
        QualifierDeclaration,
    };

    fn schema() -> Vec<CimObject> {
        vec![
            QualifierDeclaration::new("Key", CimType::Boolean).into(),
            CimClass::new("CIM_Foo")
                .property(CimProperty::new("InstanceID", CimType::String).key())
                .into(),
            CimInstance::new("CIM_Foo").with_property("InstanceID", "I1").into(),
        ]
    }

    #[test]
    fn test_batch_creates_namespace_on_success() {
        let server = WbemServer::default();
        let ctx = RequestContext::new("root/new");
        let summary = server.add_cim_objects(&ctx, schema()).unwrap();
        assert_eq!(
            summary,
            IngestSummary {
                qualifiers: 1,
                classes: 1,
                instances: 1
            }
        );
        assert_eq!(server.enumerate_instance_names(&ctx, "CIM_Foo").unwrap().len(), 1);
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let server = WbemServer::default();
        server.ensure_namespace("root/cimv2");
        let ctx = RequestContext::new("root/cimv2");
        let mut objects = schema();
        objects.push(CimClass::new("CIM_Sub").with_superclass("CIM_Missing").into());
        assert!(matches!(
            server.add_cim_objects(&ctx, objects),
            Err(CimError::InvalidSuperclass { .. })
        ));
        assert!(server.enumerate_qualifiers(&ctx).unwrap().is_empty());

        let fresh = RequestContext::new("root/other");
        let broken = vec![CimObject::from(CimInstance::new("CIM_Foo"))];
        assert!(server.add_cim_objects(&fresh, broken).is_err());
        assert!(!server.repository().has_namespace("root/other"));
    }

    #[test]
    fn test_lite_ingestion_requires_path() {
        let server = WbemServer::default();
        let ctx = RequestContext::new("root/cimv2").lite();
        let bare = CimInstance::new("CIM_Bar").with_property("Id", "B1");
        assert!(matches!(
            server.add_cim_objects(&ctx, vec![bare.clone().into()]),
            Err(CimError::InvalidParameter { .. })
        ));

        let path = CimInstanceName::new("CIM_Bar").with_key("Id", "B1");
        server
            .add_cim_objects(&ctx, vec![bare.with_path(path.clone()).into()])
            .unwrap();
        let got = server
            .get_instance(&ctx, &path, &GetInstanceOptions::default())
            .unwrap();
        assert_eq!(got.classname.as_str(), "CIM_Bar");
    }
}
