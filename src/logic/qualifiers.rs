use log::debug;

use crate::error::{CimError, CimResult};
use crate::logic::WbemServer;
use crate::model::{QualifierDeclaration, RequestContext};
use crate::store::QualifierStore;

fn qualifier_not_found(ctx: &RequestContext, name: &str) -> CimError {
    CimError::QualifierNotFound {
        namespace: ctx.namespace.to_string(),
        name: name.to_string(),
    }
}

impl WbemServer {
    pub fn get_qualifier(&self, ctx: &RequestContext, name: &str) -> CimResult<QualifierDeclaration> {
        debug!("GetQualifier {} in {}", name, ctx.namespace);
        self.repository
            .get_qualifier(ctx.namespace.as_str(), name)?
            .ok_or_else(|| qualifier_not_found(ctx, name))
    }

    pub fn enumerate_qualifiers(&self, ctx: &RequestContext) -> CimResult<Vec<QualifierDeclaration>> {
        debug!("EnumerateQualifiers in {}", ctx.namespace);
        self.repository.list_qualifiers(ctx.namespace.as_str())
    }

    /// Create or replace a qualifier declaration.
    pub fn set_qualifier(&self, ctx: &RequestContext, declaration: QualifierDeclaration) -> CimResult<()> {
        debug!("SetQualifier {} in {}", declaration.name, ctx.namespace);
        self.repository.put_qualifier(ctx.namespace.as_str(), declaration)
    }

    pub fn delete_qualifier(&self, ctx: &RequestContext, name: &str) -> CimResult<()> {
        debug!("DeleteQualifier {} in {}", name, ctx.namespace);
        self.repository.write(ctx.namespace.as_str(), |data| {
            data.delete_qualifier(name)
                .map(|_| ())
                .ok_or_else(|| qualifier_not_found(ctx, name))
        })
    }
}
