use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::{CimError, CimResult};
use crate::model::{generate_id, CimInstance, CimInstanceName, CimName, EnumerationContext};

/// The Open* operation a session was created by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenKind {
    EnumerateInstances,
    EnumerateInstancePaths,
    ReferenceInstances,
    ReferenceInstancePaths,
    AssociatorInstances,
    AssociatorInstancePaths,
    QueryInstances,
}

/// The Pull* operation used to continue a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullKind {
    InstancesWithPath,
    InstancePaths,
    Instances,
}

impl OpenKind {
    pub fn pull_kind(self) -> PullKind {
        match self {
            Self::EnumerateInstances | Self::ReferenceInstances | Self::AssociatorInstances => {
                PullKind::InstancesWithPath
            }
            Self::EnumerateInstancePaths
            | Self::ReferenceInstancePaths
            | Self::AssociatorInstancePaths => PullKind::InstancePaths,
            Self::QueryInstances => PullKind::Instances,
        }
    }
}

/// Materialized result sequence of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionItems {
    Instances(Vec<CimInstance>),
    Paths(Vec<CimInstanceName>),
}

impl SessionItems {
    pub fn len(&self) -> usize {
        match self {
            Self::Instances(items) => items.len(),
            Self::Paths(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slice(&self, start: usize, end: usize) -> Self {
        match self {
            Self::Instances(items) => Self::Instances(items[start..end].to_vec()),
            Self::Paths(items) => Self::Paths(items[start..end].to_vec()),
        }
    }
}

/// One page handed back by [`PullSessionManager::open`] or
/// [`PullSessionManager::pull`]. `context` is `None` once the sequence is
/// exhausted.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPage {
    pub items: SessionItems,
    pub context: Option<EnumerationContext>,
}

#[derive(Debug)]
struct PullSession {
    kind: OpenKind,
    namespace: CimName,
    items: SessionItems,
    offset: usize,
    timeout: Duration,
    expires_at: DateTime<Utc>,
}

/// Open enumeration sessions keyed by their opaque handle.
///
/// Expiry is evaluated lazily when a session is pulled; `reap_expired`
/// drops stale sessions proactively.
#[derive(Debug, Default)]
pub struct PullSessionManager {
    sessions: Mutex<HashMap<String, PullSession>>,
}

impl PullSessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session over `items` and return the first page. No session is
    /// kept when the first page drains the sequence.
    pub fn open(
        &self,
        kind: OpenKind,
        namespace: CimName,
        items: SessionItems,
        max_object_count: u32,
        timeout_secs: u32,
        now: DateTime<Utc>,
    ) -> SessionPage {
        let total = items.len();
        let first = (max_object_count as usize).min(total);
        let page = items.slice(0, first);
        if first == total {
            return SessionPage {
                items: page,
                context: None,
            };
        }

        let handle = generate_id();
        let timeout = Duration::seconds(i64::from(timeout_secs));
        debug!(
            "Opened {:?} session {} in {} ({} of {} items returned)",
            kind, handle, namespace, first, total
        );
        let context = EnumerationContext {
            handle: handle.clone(),
            namespace: namespace.clone(),
        };
        self.sessions.lock().insert(
            handle,
            PullSession {
                kind,
                namespace,
                items,
                offset: first,
                timeout,
                expires_at: now + timeout,
            },
        );
        SessionPage {
            items: page,
            context: Some(context),
        }
    }

    /// Return the next page of an open session. An expired session is
    /// discarded; a kind mismatch leaves the session untouched.
    pub fn pull(
        &self,
        context: &EnumerationContext,
        kind: PullKind,
        max_object_count: u32,
        now: DateTime<Utc>,
    ) -> CimResult<SessionPage> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(&context.handle)
            .filter(|s| s.namespace == context.namespace)
            .ok_or_else(|| CimError::InvalidSessionHandle {
                handle: context.handle.clone(),
            })?;

        if now > session.expires_at {
            sessions.remove(&context.handle);
            warn!("Enumeration context {} expired", context.handle);
            return Err(CimError::SessionExpired {
                handle: context.handle.clone(),
            });
        }
        if session.kind.pull_kind() != kind {
            return Err(CimError::invalid_parameter(format!(
                "{:?} cannot continue a {:?} enumeration",
                kind, session.kind
            )));
        }

        let start = session.offset;
        let end = (start + max_object_count as usize).min(session.items.len());
        let items = session.items.slice(start, end);
        session.offset = end;

        if end == session.items.len() {
            sessions.remove(&context.handle);
            debug!("Enumeration context {} exhausted", context.handle);
            return Ok(SessionPage {
                items,
                context: None,
            });
        }
        session.expires_at = now + session.timeout;
        Ok(SessionPage {
            items,
            context: Some(context.clone()),
        })
    }

    pub fn close(&self, context: &EnumerationContext) -> CimResult<()> {
        let mut sessions = self.sessions.lock();
        match sessions.get(&context.handle) {
            Some(session) if session.namespace == context.namespace => {
                sessions.remove(&context.handle);
                debug!("Closed enumeration context {}", context.handle);
                Ok(())
            }
            _ => Err(CimError::InvalidSessionHandle {
                handle: context.handle.clone(),
            }),
        }
    }

    /// Remove every session whose deadline has passed; returns how many.
    pub fn reap_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|handle, session| {
            let live = now <= session.expires_at;
            if !live {
                warn!("Reaping expired enumeration context {}", handle);
            }
            live
        });
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(n: usize) -> SessionItems {
        SessionItems::Paths(
            (0..n)
                .map(|i| CimInstanceName::new("CIM_Foo").with_key("InstanceID", format!("I{i}")))
                .collect(),
        )
    }

    fn ns() -> CimName {
        CimName::new("root/cimv2")
    }

    #[test]
    fn test_open_then_drain() {
        let manager = PullSessionManager::new();
        let now = Utc::now();
        let first = manager.open(OpenKind::EnumerateInstancePaths, ns(), paths(5), 2, 30, now);
        assert_eq!(first.items.len(), 2);
        let context = first.context.unwrap();

        let second = manager.pull(&context, PullKind::InstancePaths, 2, now).unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(second.context.is_some());

        let last = manager.pull(&context, PullKind::InstancePaths, 10, now).unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(last.context.is_none());
        assert!(manager.is_empty());
        assert!(matches!(
            manager.pull(&context, PullKind::InstancePaths, 1, now),
            Err(CimError::InvalidSessionHandle { .. })
        ));
    }

    #[test]
    fn test_small_result_needs_no_session() {
        let manager = PullSessionManager::new();
        let page = manager.open(OpenKind::EnumerateInstancePaths, ns(), paths(3), 3, 30, Utc::now());
        assert!(page.context.is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_zero_max_object_count_keeps_session_open() {
        let manager = PullSessionManager::new();
        let now = Utc::now();
        let page = manager.open(OpenKind::EnumerateInstancePaths, ns(), paths(1), 0, 30, now);
        assert!(page.items.is_empty());
        let context = page.context.unwrap();
        let empty = manager.pull(&context, PullKind::InstancePaths, 0, now).unwrap();
        assert!(empty.items.is_empty());
        assert!(empty.context.is_some());
    }

    #[test]
    fn test_expiry_and_rearm() {
        let manager = PullSessionManager::new();
        let start = Utc::now();
        let page = manager.open(OpenKind::EnumerateInstancePaths, ns(), paths(4), 1, 10, start);
        let context = page.context.unwrap();

        // Each pull pushes the deadline out again.
        let later = start + Duration::seconds(8);
        manager.pull(&context, PullKind::InstancePaths, 1, later).unwrap();
        let still_ok = later + Duration::seconds(8);
        manager.pull(&context, PullKind::InstancePaths, 1, still_ok).unwrap();

        let too_late = still_ok + Duration::seconds(11);
        assert!(matches!(
            manager.pull(&context, PullKind::InstancePaths, 1, too_late),
            Err(CimError::SessionExpired { .. })
        ));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_kind_mismatch_and_close() {
        let manager = PullSessionManager::new();
        let now = Utc::now();
        let page = manager.open(OpenKind::QueryInstances, ns(), SessionItems::Instances(vec![
            CimInstance::new("CIM_Foo"),
            CimInstance::new("CIM_Foo"),
        ]), 1, 30, now);
        let context = page.context.unwrap();
        assert!(matches!(
            manager.pull(&context, PullKind::InstancesWithPath, 1, now),
            Err(CimError::InvalidParameter { .. })
        ));
        manager.close(&context).unwrap();
        assert!(matches!(
            manager.close(&context),
            Err(CimError::InvalidSessionHandle { .. })
        ));
    }

    #[test]
    fn test_reap_expired() {
        let manager = PullSessionManager::new();
        let now = Utc::now();
        manager.open(OpenKind::EnumerateInstancePaths, ns(), paths(3), 1, 5, now);
        manager.open(OpenKind::EnumerateInstancePaths, ns(), paths(3), 1, 60, now);
        assert_eq!(manager.reap_expired(now + Duration::seconds(30)), 1);
        assert_eq!(manager.len(), 1);
    }
}
