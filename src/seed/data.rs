use crate::logic::{IngestSummary, WbemServer};
use crate::model::{
    CimClass, CimInstance, CimInstanceName, CimMethod, CimObject, CimParameter, CimProperty,
    CimType, Flavors, Qualifier, QualifierDeclaration, RequestContext, Scopes,
};
use anyhow::Result;

/// Qualifier declarations every demo class relies on.
pub fn standard_qualifiers() -> Vec<QualifierDeclaration> {
    let restricted = Flavors {
        overridable: false,
        tosubclass: true,
        toinstance: false,
        translatable: false,
    };
    vec![
        QualifierDeclaration::new("Key", CimType::Boolean)
            .with_default(false)
            .with_scopes(Scopes {
                property: true,
                reference: true,
                ..Scopes::default()
            })
            .with_flavors(restricted.clone()),
        QualifierDeclaration::new("Association", CimType::Boolean)
            .with_default(false)
            .with_scopes(Scopes {
                association: true,
                ..Scopes::default()
            })
            .with_flavors(restricted),
        QualifierDeclaration::new("Description", CimType::String).with_flavors(Flavors {
            translatable: true,
            ..Flavors::default()
        }),
        QualifierDeclaration::new("In", CimType::Boolean)
            .with_default(true)
            .with_scopes(Scopes {
                parameter: true,
                ..Scopes::default()
            }),
        QualifierDeclaration::new("Out", CimType::Boolean)
            .with_default(false)
            .with_scopes(Scopes {
                parameter: true,
                ..Scopes::default()
            }),
        QualifierDeclaration::new("Static", CimType::Boolean)
            .with_default(false)
            .with_scopes(Scopes {
                method: true,
                property: true,
                ..Scopes::default()
            }),
    ]
}

fn foo_path(id: &str) -> CimInstanceName {
    CimInstanceName::new("CIM_Foo").with_key("InstanceID", id)
}

fn bar_path(id: &str) -> CimInstanceName {
    CimInstanceName::new("CIM_Bar").with_key("InstanceID", id)
}

/// Small schema with a class hierarchy, an association and a method, plus
/// instances of each. Instances carry explicit paths so the batch also loads
/// into a repository running without class definitions.
pub fn demo_schema() -> Vec<CimObject> {
    let mut objects: Vec<CimObject> = standard_qualifiers().into_iter().map(Into::into).collect();

    objects.push(
        CimClass::new("CIM_Foo")
            .qualifier(Qualifier::new("Description", "Demo base class"))
            .property(CimProperty::new("InstanceID", CimType::String).key())
            .property(CimProperty::new("Caption", CimType::String))
            .method(
                CimMethod::new("Reset", CimType::Uint32)
                    .qualifier(Qualifier::new("Description", "Reset the element"))
                    .parameter(CimParameter::new("Force", CimType::Boolean))
                    .parameter(
                        CimParameter::new("Message", CimType::String)
                            .qualifier(Qualifier::new("In", false))
                            .qualifier(Qualifier::flag("Out")),
                    ),
            )
            .into(),
    );
    objects.push(
        CimClass::new("CIM_FooSub")
            .with_superclass("CIM_Foo")
            .property(CimProperty::new("SubProperty", CimType::Uint32))
            .into(),
    );
    objects.push(
        CimClass::new("CIM_Bar")
            .property(CimProperty::new("InstanceID", CimType::String).key())
            .property(CimProperty::new("Name", CimType::String))
            .into(),
    );
    objects.push(
        CimClass::new("CIM_FooBar")
            .qualifier(Qualifier::flag("Association"))
            .property(CimProperty::reference("TheFoo", "CIM_Foo").key())
            .property(CimProperty::reference("TheBar", "CIM_Bar").key())
            .into(),
    );

    for id in ["F1", "F2", "F3"] {
        objects.push(
            CimInstance::new("CIM_Foo")
                .with_property("InstanceID", id)
                .with_property("Caption", format!("Foo {id}"))
                .with_path(foo_path(id))
                .into(),
        );
    }
    objects.push(
        CimInstance::new("CIM_FooSub")
            .with_property("InstanceID", "S1")
            .with_property("Caption", "Foo subclass")
            .with_property("SubProperty", 42u32)
            .with_path(CimInstanceName::new("CIM_FooSub").with_key("InstanceID", "S1"))
            .into(),
    );
    for id in ["B1", "B2"] {
        objects.push(
            CimInstance::new("CIM_Bar")
                .with_property("InstanceID", id)
                .with_property("Name", format!("Bar {id}"))
                .with_path(bar_path(id))
                .into(),
        );
    }
    for (foo, bar) in [("F1", "B1"), ("F1", "B2"), ("F2", "B1")] {
        let path = CimInstanceName::new("CIM_FooBar")
            .with_key("TheFoo", foo_path(foo))
            .with_key("TheBar", bar_path(bar));
        objects.push(
            CimInstance::new("CIM_FooBar")
                .with_property("TheFoo", foo_path(foo))
                .with_property("TheBar", bar_path(bar))
                .with_path(path)
                .into(),
        );
    }

    objects
}

pub fn load_seed_data(server: &WbemServer, ctx: &RequestContext) -> Result<IngestSummary> {
    Ok(server.add_cim_objects(ctx, demo_schema())?)
}
