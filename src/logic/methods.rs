use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{CimError, CimResult};
use crate::logic::engine::reads_with_classes;
use crate::logic::WbemServer;
use crate::model::{
    normalize_namespace, CimClass, CimInstance, CimInstanceName, CimName, MethodResult,
    NamedList, ObjectName, ParamValue, RequestContext,
};
use crate::store::{ClassStore, InMemoryRepository, InstanceStore};

/// User-supplied handler for one (namespace, class, method) triple.
pub type MethodCallback = Arc<
    dyn Fn(&MethodContext<'_>, &ObjectName, &NamedList<ParamValue>) -> CimResult<MethodResult>
        + Send
        + Sync,
>;

type RegistryKey = (CimName, CimName, CimName);

/// Maps (namespace, class, method) to a callback. Lookup is exact: a
/// registration on a superclass does not serve its subclasses.
#[derive(Default)]
pub struct MethodRegistry {
    callbacks: RwLock<HashMap<RegistryKey, MethodCallback>>,
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("registered", &self.len())
            .finish()
    }
}

fn registry_key(namespace: &str, classname: &str, method: &str) -> RegistryKey {
    (
        normalize_namespace(namespace),
        CimName::new(classname),
        CimName::new(method),
    )
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`, replacing any earlier registration for the same key.
    pub fn register<F>(&self, namespace: &str, classname: &str, method: &str, callback: F)
    where
        F: Fn(&MethodContext<'_>, &ObjectName, &NamedList<ParamValue>) -> CimResult<MethodResult>
            + Send
            + Sync
            + 'static,
    {
        debug!("Registering method {}.{} in {}", classname, method, namespace);
        self.callbacks
            .write()
            .insert(registry_key(namespace, classname, method), Arc::new(callback));
    }

    pub fn unregister(&self, namespace: &str, classname: &str, method: &str) -> bool {
        self.callbacks
            .write()
            .remove(&registry_key(namespace, classname, method))
            .is_some()
    }

    pub fn resolve(&self, namespace: &str, classname: &str, method: &str) -> Option<MethodCallback> {
        self.callbacks
            .read()
            .get(&registry_key(namespace, classname, method))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a method callback sees of the server: the request it serves and
/// read-only access to the repository.
pub struct MethodContext<'a> {
    pub namespace: CimName,
    pub method: CimName,
    repository: &'a InMemoryRepository,
}

impl MethodContext<'_> {
    pub fn get_class(&self, classname: &str) -> CimResult<Option<CimClass>> {
        self.repository.get_class(self.namespace.as_str(), classname)
    }

    pub fn get_instance(&self, path: &CimInstanceName) -> CimResult<Option<CimInstance>> {
        let namespace = path.namespace.as_ref().unwrap_or(&self.namespace);
        self.repository.get_instance(namespace.as_str(), path)
    }

    /// Instances stored under exactly `classname`.
    pub fn instances_of(&self, classname: &str) -> CimResult<Vec<CimInstance>> {
        let wanted = CimName::new(classname);
        let same_class = move |i: &CimInstance| i.classname == wanted;
        self.repository.list_instances(
            self.namespace.as_str(),
            Some(&same_class as &dyn Fn(&CimInstance) -> bool),
        )
    }

    pub fn namespaces(&self) -> Vec<CimName> {
        self.repository.namespaces()
    }
}

impl WbemServer {
    /// Dispatch an extrinsic method call to its registered callback. The
    /// callback runs without any repository lock held.
    pub fn invoke_method(
        &self,
        ctx: &RequestContext,
        target: &ObjectName,
        method: &str,
        params: &NamedList<ParamValue>,
    ) -> CimResult<MethodResult> {
        let ctx = ctx.for_namespace(target.namespace());
        let classname = target.classname().clone();
        debug!("InvokeMethod {}.{} on {}", classname, method, target);

        // Declared input parameters bound to the supplied values; the raw
        // list when the class is not consulted.
        let bound = self.repository.read(ctx.namespace.as_str(), |data| {
            if !reads_with_classes(ctx.mode, data, classname.as_str()) {
                return Ok(params.clone());
            }
            let class = data
                .get_class(classname.as_str())
                .ok_or_else(|| CimError::class_not_found(&ctx.namespace, &classname))?;
            let declared = class.methods.get(method).ok_or_else(|| CimError::MethodNotFound {
                classname: classname.to_string(),
                method: method.to_string(),
            })?;
            if let ObjectName::Instance(path) = target {
                if !data.instance_exists(path) {
                    return Err(CimError::instance_not_found(path));
                }
            }
            for param in params {
                match declared.parameters.get(param.name.as_str()) {
                    Some(p) if p.is_input() => {}
                    _ => {
                        return Err(CimError::invalid_parameter(format!(
                            "'{}' is not an input parameter of {}.{}",
                            param.name, classname, declared.name
                        )))
                    }
                }
            }
            Ok(declared
                .parameters
                .iter()
                .filter(|p| p.is_input())
                .map(|p| ParamValue {
                    name: p.name.clone(),
                    value: params.get(p.name.as_str()).and_then(|v| v.value.clone()),
                })
                .collect())
        })?;

        let callback = self
            .methods
            .resolve(ctx.namespace.as_str(), classname.as_str(), method)
            .ok_or_else(|| CimError::MethodNotFound {
                classname: classname.to_string(),
                method: method.to_string(),
            })?;

        let method_ctx = MethodContext {
            namespace: ctx.namespace.clone(),
            method: CimName::new(method),
            repository: &self.repository,
        };
        callback(&method_ctx, target, &bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CimClassName, CimMethod, CimParameter, CimProperty, CimType, CimValue, Qualifier,
        QualifierDeclaration,
    };

    fn server() -> (WbemServer, RequestContext) {
        let server = WbemServer::default();
        server.ensure_namespace("root/cimv2");
        let ctx = RequestContext::new("root/cimv2");
        for (name, ty) in [("Key", CimType::Boolean), ("In", CimType::Boolean), ("Out", CimType::Boolean)] {
            server.set_qualifier(&ctx, QualifierDeclaration::new(name, ty)).unwrap();
        }
        server
            .create_class(
                &ctx,
                CimClass::new("CIM_Foo")
                    .property(CimProperty::new("InstanceID", CimType::String).key())
                    .method(
                        CimMethod::new("Ping", CimType::Uint32)
                            .parameter(CimParameter::new("Count", CimType::Uint32))
                            .parameter(
                                CimParameter::new("Echo", CimType::String)
                                    .qualifier(Qualifier::new("In", false))
                                    .qualifier(Qualifier::flag("Out")),
                            ),
                    ),
            )
            .unwrap();
        (server, ctx)
    }

    #[test]
    fn test_registry_replaces_and_unregisters() {
        let registry = MethodRegistry::new();
        registry.register("root/cimv2", "CIM_Foo", "Ping", |_, _, _| Ok(MethodResult::returning(1u32)));
        registry.register("/root/cimv2", "cim_foo", "PING", |_, _, _| Ok(MethodResult::returning(2u32)));
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("root/cimv2", "CIM_FooSub", "Ping").is_none());
        assert!(registry.unregister("root/cimv2", "CIM_Foo", "Ping"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invoke_static_method() {
        let (server, ctx) = server();
        server.methods().register("root/cimv2", "CIM_Foo", "Ping", |mctx, _, params| {
            let count = mctx.instances_of("CIM_Foo")?.len() as u32;
            let echo = params.get("Count").and_then(|p| p.value.clone());
            let mut result = MethodResult::returning(count);
            if let Some(value) = echo {
                result = result.with_out_param(ParamValue::new("Echo", value));
            }
            Ok(result)
        });

        let target = ObjectName::Class(CimClassName::new("CIM_Foo"));
        let params: NamedList<ParamValue> = [ParamValue::new("Count", 3u32)].into_iter().collect();
        let result = server.invoke_method(&ctx, &target, "Ping", &params).unwrap();
        assert_eq!(result.return_value, Some(CimValue::from(0u32)));
        assert_eq!(
            result.out_params.get("echo").and_then(|p| p.value.clone()),
            Some(CimValue::from(3u32))
        );
    }

    #[test]
    fn test_invoke_checks() {
        let (server, ctx) = server();
        let target = ObjectName::Class(CimClassName::new("CIM_Foo"));
        let none = NamedList::new();
        assert!(matches!(
            server.invoke_method(&ctx, &target, "Ping", &none),
            Err(CimError::MethodNotFound { .. })
        ));
        assert!(matches!(
            server.invoke_method(&ctx, &target, "Undeclared", &none),
            Err(CimError::MethodNotFound { .. })
        ));

        server
            .methods()
            .register("root/cimv2", "CIM_Foo", "Ping", |_, _, _| Err(CimError::failed("boom")));
        let out_only: NamedList<ParamValue> = [ParamValue::new("Echo", "x")].into_iter().collect();
        assert!(matches!(
            server.invoke_method(&ctx, &target, "Ping", &out_only),
            Err(CimError::InvalidParameter { .. })
        ));
        assert!(matches!(
            server.invoke_method(&ctx, &target, "Ping", &none),
            Err(CimError::Failed { .. })
        ));

        let missing = ObjectName::Instance(CimInstanceName::new("CIM_Foo").with_key("InstanceID", "nope"));
        assert!(matches!(
            server.invoke_method(&ctx, &missing, "Ping", &none),
            Err(CimError::InstanceNotFound { .. })
        ));
    }

    #[test]
    fn test_callback_sees_declared_inputs() {
        let (server, ctx) = server();
        // Echo back whatever the callback received
        server.methods().register("root/cimv2", "CIM_Foo", "Ping", |_, _, params| {
            Ok(params
                .iter()
                .cloned()
                .fold(MethodResult::returning(params.len() as u32), |r, p| r.with_out_param(p)))
        });
        let target = ObjectName::Class(CimClassName::new("CIM_Foo"));

        let lower: NamedList<ParamValue> = [ParamValue::new("count", 4u32)].into_iter().collect();
        let result = server.invoke_method(&ctx, &target, "Ping", &lower).unwrap();
        let names: Vec<&str> = result.out_params.names().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["Count"]);
        assert_eq!(
            result.out_params.get("Count").and_then(|p| p.value.clone()),
            Some(CimValue::from(4u32))
        );

        let omitted = server.invoke_method(&ctx, &target, "Ping", &NamedList::new()).unwrap();
        assert_eq!(omitted.return_value, Some(CimValue::from(1u32)));
        assert_eq!(omitted.out_params.get("Count").map(|p| p.value.is_none()), Some(true));
    }
}
