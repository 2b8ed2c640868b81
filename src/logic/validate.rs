use crate::error::{CimError, CimResult};
use crate::model::{CimClass, CimInstance, CimName};
use crate::store::{ClassStore, QualifierStore};

/// Read-only precondition checks run before a class or instance is committed.
///
/// Every write path (CreateClass, CreateInstance, batch ingestion) calls into
/// this type while holding the namespace write lock, then performs the store
/// mutation itself.
pub struct MutationValidator;

impl MutationValidator {
    /// Superclass must already exist and every qualifier used on the class or
    /// its members must be declared. Reference targets are not checked.
    pub fn validate_class<S>(namespace: &CimName, store: &S, class: &CimClass) -> CimResult<()>
    where
        S: ClassStore + QualifierStore + ?Sized,
    {
        if let Some(superclass) = &class.superclass {
            if !store.class_exists(superclass.as_str()) {
                return Err(CimError::InvalidSuperclass {
                    classname: class.classname.to_string(),
                    superclass: superclass.to_string(),
                });
            }
        }

        for qualifier in class.qualifier_names() {
            if store.get_qualifier(qualifier.as_str()).is_none() {
                log::debug!(
                    "Rejecting class '{}' in '{}': undeclared qualifier '{}'",
                    class.classname,
                    namespace,
                    qualifier
                );
                return Err(CimError::InvalidQualifier {
                    classname: class.classname.to_string(),
                    qualifier: qualifier.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Creation class must exist and every key property of the resolved class
    /// must have a non-null value in the instance.
    pub fn validate_instance<S>(
        namespace: &CimName,
        store: &S,
        instance: &CimInstance,
    ) -> CimResult<()>
    where
        S: ClassStore + ?Sized,
    {
        let class = store
            .get_class(instance.classname.as_str())
            .ok_or_else(|| CimError::InvalidClass {
                namespace: namespace.to_string(),
                classname: instance.classname.to_string(),
            })?;

        for key in class.key_properties() {
            if instance.value(key.name.as_str()).is_none() {
                return Err(CimError::MissingKeyProperty {
                    classname: class.classname.to_string(),
                    property: key.name.to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CimProperty, CimType, Qualifier, QualifierDeclaration};
    use crate::store::NamespaceData;

    fn ns() -> CimName {
        CimName::new("root/cimv2")
    }

    fn store_with_key_decl() -> NamespaceData {
        let mut store = NamespaceData::new();
        store.put_qualifier(QualifierDeclaration::new("Key", CimType::Boolean));
        store
    }

    #[test]
    fn test_missing_superclass_is_rejected() {
        let store = store_with_key_decl();
        let class = CimClass::new("CIM_Sub").with_superclass("CIM_Base");
        let err = MutationValidator::validate_class(&ns(), &store, &class).unwrap_err();
        assert!(matches!(err, CimError::InvalidSuperclass { .. }));
    }

    #[test]
    fn test_undeclared_member_qualifier_is_rejected() {
        let store = store_with_key_decl();
        let class = CimClass::new("CIM_Foo").property(
            CimProperty::new("Name", CimType::String).qualifier(Qualifier::new("Description", "x")),
        );
        match MutationValidator::validate_class(&ns(), &store, &class) {
            Err(CimError::InvalidQualifier { qualifier, .. }) => assert_eq!(qualifier, "Description"),
            other => panic!("expected InvalidQualifier, got {:?}", other),
        }
    }

    #[test]
    fn test_forward_reference_is_accepted() {
        let store = store_with_key_decl();
        let class = CimClass::new("CIM_Link").property(CimProperty::reference("Target", "CIM_NotYet"));
        assert!(MutationValidator::validate_class(&ns(), &store, &class).is_ok());
    }

    #[test]
    fn test_instance_checks() {
        let mut store = store_with_key_decl();
        let orphan = CimInstance::new("CIM_Foo").with_property("InstanceID", "I1");
        assert!(matches!(
            MutationValidator::validate_instance(&ns(), &store, &orphan),
            Err(CimError::InvalidClass { .. })
        ));

        store.put_class(
            CimClass::new("CIM_Foo").property(CimProperty::new("InstanceID", CimType::String).key()),
        );
        let keyless = CimInstance::new("CIM_Foo");
        assert!(matches!(
            MutationValidator::validate_instance(&ns(), &store, &keyless),
            Err(CimError::MissingKeyProperty { .. })
        ));
        assert!(MutationValidator::validate_instance(&ns(), &store, &orphan).is_ok());
    }
}
