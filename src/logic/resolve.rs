use crate::error::{CimError, CimResult};
use crate::model::{
    CimClass, CimClassName, CimInstance, CimInstanceName, CimMethod, CimName, CimProperty,
    KeyBinding, NamedList,
};
use crate::store::ClassStore;

pub struct ClassResolver;

impl ClassResolver {
    /// Resolve a validated class against its (already stored) superclass.
    ///
    /// Local members get `class_origin = <class>`; members inherited from the
    /// superclass and not overridden are copied in front of the local ones
    /// with `propagated = true`, their qualifiers marked propagated as well.
    pub fn resolve_class<S>(namespace: &CimName, store: &S, class: CimClass) -> CimClass
    where
        S: ClassStore + ?Sized,
    {
        let mut resolved = class;
        let own_name = resolved.classname.clone();

        for prop in resolved.properties.iter_mut() {
            prop.class_origin = Some(own_name.clone());
            prop.propagated = false;
        }
        for method in resolved.methods.iter_mut() {
            method.class_origin = Some(own_name.clone());
            method.propagated = false;
        }

        let superclass = resolved
            .superclass
            .as_ref()
            .and_then(|s| store.get_class(s.as_str()));

        if let Some(superclass) = superclass {
            let mut properties: NamedList<CimProperty> = NamedList::new();
            for inherited in &superclass.properties {
                match resolved.properties.get(inherited.name.as_str()) {
                    // An override keeps the superclass position in declaration order.
                    Some(local) => {
                        properties.insert(local.clone());
                    }
                    None => {
                        properties.insert(Self::propagate_property(inherited));
                    }
                }
            }
            for local in &resolved.properties {
                if !properties.contains(local.name.as_str()) {
                    properties.insert(local.clone());
                }
            }
            resolved.properties = properties;

            let mut methods: NamedList<CimMethod> = NamedList::new();
            for inherited in &superclass.methods {
                match resolved.methods.get(inherited.name.as_str()) {
                    Some(local) => {
                        methods.insert(local.clone());
                    }
                    None => {
                        methods.insert(Self::propagate_method(inherited));
                    }
                }
            }
            for local in &resolved.methods {
                if !methods.contains(local.name.as_str()) {
                    methods.insert(local.clone());
                }
            }
            resolved.methods = methods;
        }

        resolved.path = Some(CimClassName::new(own_name).with_namespace(namespace.clone()));
        resolved
    }

    fn propagate_property(inherited: &CimProperty) -> CimProperty {
        let mut prop = inherited.clone();
        prop.propagated = true;
        for q in prop.qualifiers.iter_mut() {
            q.propagated = true;
        }
        prop
    }

    fn propagate_method(inherited: &CimMethod) -> CimMethod {
        let mut method = inherited.clone();
        method.propagated = true;
        for q in method.qualifiers.iter_mut() {
            q.propagated = true;
        }
        method
    }

    /// Build the namespace-less path of `instance` from the key properties
    /// of `class`, in class declaration order.
    pub fn instance_path(class: &CimClass, instance: &CimInstance) -> CimResult<CimInstanceName> {
        let mut path = CimInstanceName::new(class.classname.clone());
        for key in class.key_properties() {
            let value = instance.value(key.name.as_str()).ok_or_else(|| {
                CimError::MissingKeyProperty {
                    classname: class.classname.to_string(),
                    property: key.name.to_string(),
                }
            })?;
            path.keybindings
                .insert(KeyBinding::new(key.name.clone(), value.clone()));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CimType, CimValue, Qualifier};
    use crate::store::NamespaceData;

    fn base() -> CimClass {
        CimClass::new("CIM_Base")
            .property(CimProperty::new("InstanceID", CimType::String).key())
            .property(CimProperty::new("Caption", CimType::String))
            .method(CimMethod::new("Reset", CimType::Uint32))
    }

    #[test]
    fn test_inherited_members_are_propagated() {
        let ns = CimName::new("root/cimv2");
        let mut store = NamespaceData::new();
        let base = ClassResolver::resolve_class(&ns, &store, base());
        store.put_class(base);

        let sub = CimClass::new("CIM_Sub")
            .with_superclass("CIM_Base")
            .property(CimProperty::new("Caption", CimType::String).qualifier(Qualifier::new("Description", "x")))
            .property(CimProperty::new("Extra", CimType::Uint32));
        let resolved = ClassResolver::resolve_class(&ns, &store, sub);

        let names: Vec<_> = resolved.properties.names().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["InstanceID", "Caption", "Extra"]);

        let id = resolved.properties.get("InstanceID").unwrap();
        assert!(id.propagated);
        assert!(id.is_key());
        assert_eq!(id.class_origin.as_ref().unwrap().as_str(), "CIM_Base");
        assert!(id.qualifiers.get("Key").unwrap().propagated);

        let caption = resolved.properties.get("Caption").unwrap();
        assert!(!caption.propagated);
        assert_eq!(caption.class_origin.as_ref().unwrap().as_str(), "CIM_Sub");

        let reset = resolved.methods.get("reset").unwrap();
        assert!(reset.propagated);
        assert_eq!(resolved.path.unwrap().to_string(), "root/cimv2:CIM_Sub");
    }

    #[test]
    fn test_instance_path_from_keys() {
        let class = base();
        let inst = CimInstance::new("CIM_Base")
            .with_property("Caption", "c")
            .with_property("InstanceID", "I1");
        let path = ClassResolver::instance_path(&class, &inst).unwrap();
        assert_eq!(path.keybindings.len(), 1);
        assert_eq!(path.key("instanceid"), Some(&CimValue::from("I1")));

        let keyless = CimInstance::new("CIM_Base");
        assert!(ClassResolver::instance_path(&class, &keyless).is_err());
    }
}
