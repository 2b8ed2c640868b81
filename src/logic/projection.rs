use std::collections::HashSet;

use crate::model::{CimClass, CimInstance, CimName, GetClassOptions, GetInstanceOptions};
use crate::store::ClassStore;

/// Response-time shaping of classes and instances. Stored objects are never
/// modified; every function works on an owned copy.
pub struct Projector;

fn property_filter(property_list: &Option<Vec<String>>) -> Option<HashSet<CimName>> {
    property_list
        .as_ref()
        .map(|names| names.iter().map(|n| CimName::new(n.as_str())).collect())
}

impl Projector {
    pub fn class(mut class: CimClass, options: &GetClassOptions) -> CimClass {
        if options.local_only {
            class.properties.retain(|p| !p.propagated);
            class.methods.retain(|m| !m.propagated);
        }
        if let Some(allowed) = property_filter(&options.property_list) {
            class.properties.retain(|p| allowed.contains(&p.name));
        }
        if !options.include_qualifiers {
            class.qualifiers.clear();
            for prop in class.properties.iter_mut() {
                prop.qualifiers.clear();
            }
            for method in class.methods.iter_mut() {
                method.qualifiers.clear();
                for param in method.parameters.iter_mut() {
                    param.qualifiers.clear();
                }
            }
        }
        if !options.include_class_origin {
            for prop in class.properties.iter_mut() {
                prop.class_origin = None;
            }
            for method in class.methods.iter_mut() {
                method.class_origin = None;
            }
        }
        class
    }

    /// Flags shared by every instance-returning operation. `LocalOnly` and
    /// inheritance trimming are applied separately because they need the
    /// class hierarchy.
    pub fn instance(mut instance: CimInstance, options: &GetInstanceOptions) -> CimInstance {
        if let Some(allowed) = property_filter(&options.property_list) {
            instance.properties.retain(|p| allowed.contains(&p.name));
        }
        if !options.include_qualifiers {
            instance.qualifiers.clear();
            for prop in instance.properties.iter_mut() {
                prop.qualifiers.clear();
            }
        }
        if !options.include_class_origin {
            for prop in instance.properties.iter_mut() {
                prop.class_origin = None;
            }
        }
        instance
    }

    /// Fill in class origins of instance properties from the creation class.
    pub fn with_class_origins<S>(store: &S, mut instance: CimInstance) -> CimInstance
    where
        S: ClassStore + ?Sized,
    {
        if let Some(class) = store.get_class(instance.classname.as_str()) {
            for prop in instance.properties.iter_mut() {
                if let Some(decl) = class.properties.get(prop.name.as_str()) {
                    prop.class_origin = decl.class_origin.clone();
                }
            }
        }
        instance
    }

    /// GetInstance `LocalOnly`: keep properties introduced or overridden by
    /// the creation class itself.
    pub fn local_to_creation_class<S>(store: &S, mut instance: CimInstance) -> CimInstance
    where
        S: ClassStore + ?Sized,
    {
        if let Some(class) = store.get_class(instance.classname.as_str()) {
            let own = class.classname.clone();
            instance.properties.retain(|p| {
                class
                    .properties
                    .get(p.name.as_str())
                    .map_or(true, |decl| decl.class_origin.as_ref() == Some(&own))
            });
        }
        instance
    }

    /// EnumerateInstances trimming of an instance found through `requested`.
    ///
    /// Without deep inheritance only properties declared in the requested
    /// class survive. With local-only, properties whose origin is a strict
    /// ancestor of the requested class are dropped.
    pub fn for_enumeration<S>(
        store: &S,
        requested: &CimClass,
        deep_inheritance: bool,
        local_only: bool,
        mut instance: CimInstance,
    ) -> CimInstance
    where
        S: ClassStore + ?Sized,
    {
        let creation = store.get_class(instance.classname.as_str());
        let ancestors: HashSet<CimName> = store
            .superclass_chain(requested.classname.as_str())
            .into_iter()
            .skip(1)
            .collect();

        instance.properties.retain(|p| {
            if !deep_inheritance && !requested.properties.contains(p.name.as_str()) {
                return false;
            }
            if local_only {
                let origin = creation
                    .and_then(|c| c.properties.get(p.name.as_str()))
                    .and_then(|decl| decl.class_origin.as_ref());
                if let Some(origin) = origin {
                    return !ancestors.contains(origin);
                }
            }
            true
        });
        instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::ClassResolver;
    use crate::model::{CimProperty, CimType, Qualifier};
    use crate::store::NamespaceData;

    fn hierarchy() -> NamespaceData {
        let ns = CimName::new("root/cimv2");
        let mut store = NamespaceData::new();
        let base = CimClass::new("CIM_Base")
            .property(CimProperty::new("InstanceID", CimType::String).key())
            .property(CimProperty::new("Caption", CimType::String));
        let base = ClassResolver::resolve_class(&ns, &store, base);
        store.put_class(base);
        let sub = CimClass::new("CIM_Sub")
            .with_superclass("CIM_Base")
            .property(CimProperty::new("Extra", CimType::Uint32));
        let sub = ClassResolver::resolve_class(&ns, &store, sub);
        store.put_class(sub);
        store
    }

    fn sub_instance() -> CimInstance {
        CimInstance::new("CIM_Sub")
            .with_property("InstanceID", "S1")
            .with_property("Caption", "cap")
            .with_property("Extra", 5u32)
    }

    fn names(inst: &CimInstance) -> Vec<String> {
        inst.properties.names().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_class_local_only_and_qualifiers() {
        let store = hierarchy();
        let sub = store.get_class("CIM_Sub").unwrap().clone();
        let projected = Projector::class(sub.clone(), &GetClassOptions::default());
        let props: Vec<_> = projected.properties.names().map(|n| n.to_string()).collect();
        assert_eq!(props, vec!["Extra"]);

        let full = Projector::class(
            sub,
            &GetClassOptions {
                local_only: false,
                include_qualifiers: false,
                include_class_origin: true,
                property_list: None,
            },
        );
        assert_eq!(full.properties.len(), 3);
        assert!(full.properties.get("InstanceID").unwrap().qualifiers.is_empty());
        assert!(full.properties.get("Extra").unwrap().class_origin.is_some());
    }

    #[test]
    fn test_instance_property_list_and_qualifiers() {
        let mut inst = sub_instance();
        inst.qualifiers.insert(Qualifier::new("Description", "d"));
        let projected = Projector::instance(
            inst,
            &GetInstanceOptions {
                property_list: Some(vec!["caption".to_string()]),
                ..GetInstanceOptions::default()
            },
        );
        assert_eq!(names(&projected), vec!["Caption"]);
        assert!(projected.qualifiers.is_empty());
    }

    #[test]
    fn test_enumeration_trimming() {
        let store = hierarchy();
        let base = store.get_class("CIM_Base").unwrap().clone();
        let sub = store.get_class("CIM_Sub").unwrap().clone();

        let shallow = Projector::for_enumeration(&store, &base, false, false, sub_instance());
        assert_eq!(names(&shallow), vec!["InstanceID", "Caption"]);

        let deep = Projector::for_enumeration(&store, &base, true, false, sub_instance());
        assert_eq!(deep.properties.len(), 3);

        let local = Projector::for_enumeration(&store, &sub, true, true, sub_instance());
        assert_eq!(names(&local), vec!["Extra"]);
    }

    #[test]
    fn test_local_to_creation_class() {
        let store = hierarchy();
        let local = Projector::local_to_creation_class(&store, sub_instance());
        assert_eq!(names(&local), vec!["Extra"]);
    }
}
