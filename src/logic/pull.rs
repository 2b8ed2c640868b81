use chrono::Utc;
use log::debug;

use crate::error::{CimError, CimResult};
use crate::logic::sessions::{OpenKind, PullKind, SessionItems, SessionPage};
use crate::logic::{QueryParser, WbemServer};
use crate::model::{
    AssociatorFilter, CimInstanceName, EnumerateInstancesOptions, EnumerationContext,
    InstancePage, OpenOptions, PathPage, PullResult, ReferenceFilter, RequestContext,
    ResultOptions,
};

fn instance_page(page: SessionPage) -> CimResult<InstancePage> {
    match page.items {
        SessionItems::Instances(items) => Ok(PullResult {
            items,
            end_of_sequence: page.context.is_none(),
            context: page.context,
        }),
        SessionItems::Paths(_) => Err(CimError::failed("session holds paths, not instances")),
    }
}

fn path_page(page: SessionPage) -> CimResult<PathPage> {
    match page.items {
        SessionItems::Paths(items) => Ok(PullResult {
            items,
            end_of_sequence: page.context.is_none(),
            context: page.context,
        }),
        SessionItems::Instances(_) => Err(CimError::failed("session holds instances, not paths")),
    }
}

impl WbemServer {
    /// Check the Open* request parameters and resolve the effective timeout.
    fn open_timeout(&self, options: &OpenOptions) -> CimResult<u32> {
        QueryParser::check_filter(
            options.filter_query_language.as_deref(),
            options.filter_query.as_deref(),
        )?;
        let requested = options
            .operation_timeout
            .unwrap_or(self.config.default_operation_timeout);
        if requested == 0 || requested > self.config.max_operation_timeout {
            return Err(CimError::InvalidOperationTimeout {
                requested,
                max: self.config.max_operation_timeout,
            });
        }
        Ok(requested)
    }

    fn open_session(
        &self,
        ctx: &RequestContext,
        kind: OpenKind,
        items: SessionItems,
        options: &OpenOptions,
        timeout: u32,
    ) -> SessionPage {
        debug!("{:?} in {} yielded {} item(s)", kind, ctx.namespace, items.len());
        let now = Utc::now();
        // Abandoned sessions are reclaimed as new ones open.
        self.sessions.reap_expired(now);
        self.sessions.open(
            kind,
            ctx.namespace.clone(),
            items,
            options.max_object_count,
            timeout,
            now,
        )
    }

    pub fn open_enumerate_instances(
        &self,
        ctx: &RequestContext,
        classname: &str,
        enumerate: &EnumerateInstancesOptions,
        options: &OpenOptions,
    ) -> CimResult<InstancePage> {
        let timeout = self.open_timeout(options)?;
        let items = self.repository.read(ctx.namespace.as_str(), |data| {
            self.collect_instances(ctx, data, classname, enumerate)
        })?;
        instance_page(self.open_session(
            ctx,
            OpenKind::EnumerateInstances,
            SessionItems::Instances(items),
            options,
            timeout,
        ))
    }

    pub fn open_enumerate_instance_paths(
        &self,
        ctx: &RequestContext,
        classname: &str,
        options: &OpenOptions,
    ) -> CimResult<PathPage> {
        let timeout = self.open_timeout(options)?;
        let items = self.repository.read(ctx.namespace.as_str(), |data| {
            self.collect_instance_names(ctx, data, classname)
        })?;
        path_page(self.open_session(
            ctx,
            OpenKind::EnumerateInstancePaths,
            SessionItems::Paths(items),
            options,
            timeout,
        ))
    }

    pub fn open_reference_instances(
        &self,
        ctx: &RequestContext,
        source: &CimInstanceName,
        filter: &ReferenceFilter,
        result: &ResultOptions,
        options: &OpenOptions,
    ) -> CimResult<InstancePage> {
        let timeout = self.open_timeout(options)?;
        let ctx = ctx.for_namespace(source.namespace.as_ref());
        let (items, _) = self.collect_references(&ctx, source, filter, result)?;
        instance_page(self.open_session(
            &ctx,
            OpenKind::ReferenceInstances,
            SessionItems::Instances(items),
            options,
            timeout,
        ))
    }

    pub fn open_reference_instance_paths(
        &self,
        ctx: &RequestContext,
        source: &CimInstanceName,
        filter: &ReferenceFilter,
        options: &OpenOptions,
    ) -> CimResult<PathPage> {
        let timeout = self.open_timeout(options)?;
        let ctx = ctx.for_namespace(source.namespace.as_ref());
        let (_, paths) = self.collect_references(&ctx, source, filter, &ResultOptions::default())?;
        path_page(self.open_session(
            &ctx,
            OpenKind::ReferenceInstancePaths,
            SessionItems::Paths(paths),
            options,
            timeout,
        ))
    }

    pub fn open_associator_instances(
        &self,
        ctx: &RequestContext,
        source: &CimInstanceName,
        filter: &AssociatorFilter,
        result: &ResultOptions,
        options: &OpenOptions,
    ) -> CimResult<InstancePage> {
        let timeout = self.open_timeout(options)?;
        let ctx = ctx.for_namespace(source.namespace.as_ref());
        let (items, _) = self.collect_associators(&ctx, source, filter, result)?;
        instance_page(self.open_session(
            &ctx,
            OpenKind::AssociatorInstances,
            SessionItems::Instances(items),
            options,
            timeout,
        ))
    }

    pub fn open_associator_instance_paths(
        &self,
        ctx: &RequestContext,
        source: &CimInstanceName,
        filter: &AssociatorFilter,
        options: &OpenOptions,
    ) -> CimResult<PathPage> {
        let timeout = self.open_timeout(options)?;
        let ctx = ctx.for_namespace(source.namespace.as_ref());
        let (_, paths) = self.collect_associators(&ctx, source, filter, &ResultOptions::default())?;
        path_page(self.open_session(
            &ctx,
            OpenKind::AssociatorInstancePaths,
            SessionItems::Paths(paths),
            options,
            timeout,
        ))
    }

    /// Open a query enumeration. The query itself is extracted and run like
    /// ExecQuery; results are continued with [`pull_instances`](Self::pull_instances).
    pub fn open_query_instances(
        &self,
        ctx: &RequestContext,
        query_language: &str,
        query: &str,
        options: &OpenOptions,
    ) -> CimResult<InstancePage> {
        let timeout = self.open_timeout(options)?;
        let items = self.exec_query(ctx, query_language, query)?;
        instance_page(self.open_session(
            ctx,
            OpenKind::QueryInstances,
            SessionItems::Instances(items),
            options,
            timeout,
        ))
    }

    pub fn pull_instances_with_path(
        &self,
        context: &EnumerationContext,
        max_object_count: u32,
    ) -> CimResult<InstancePage> {
        debug!("PullInstancesWithPath {}", context.handle);
        let page = self.sessions.pull(
            context,
            PullKind::InstancesWithPath,
            max_object_count,
            Utc::now(),
        )?;
        instance_page(page)
    }

    pub fn pull_instance_paths(
        &self,
        context: &EnumerationContext,
        max_object_count: u32,
    ) -> CimResult<PathPage> {
        debug!("PullInstancePaths {}", context.handle);
        let page = self
            .sessions
            .pull(context, PullKind::InstancePaths, max_object_count, Utc::now())?;
        path_page(page)
    }

    pub fn pull_instances(
        &self,
        context: &EnumerationContext,
        max_object_count: u32,
    ) -> CimResult<InstancePage> {
        debug!("PullInstances {}", context.handle);
        let page = self
            .sessions
            .pull(context, PullKind::Instances, max_object_count, Utc::now())?;
        instance_page(page)
    }

    pub fn close_enumeration(&self, context: &EnumerationContext) -> CimResult<()> {
        debug!("CloseEnumeration {}", context.handle);
        self.sessions.close(context)
    }

    /// Drop sessions whose deadline has passed.
    pub fn reap_expired_sessions(&self) -> usize {
        self.sessions.reap_expired(Utc::now())
    }
}
