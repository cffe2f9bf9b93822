//! Request correlation ids
//!
//! The preferred way to tag lines with a request id is an explicit
//! [`RequestContext`] passed to [`Logger::for_context`](crate::Logger::for_context).
//!
//! For call sites that cannot thread a context through, the ambient store
//! keeps one id per execution unit: the current tokio task when running
//! inside [`scope`], the current thread otherwise. A tokio task spawned
//! without [`scope`] has no slot of its own: setting is ignored there and
//! reads return an empty string, since the worker thread's slot is shared by
//! every task it polls. Encoders read the store through [`ambient_fetcher`].
//! This ambient layer is a compatibility shim; ids set on one thread or task
//! are never visible from another.

use super::encoder::ContextFetcher;
use rand::Rng;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

/// Key under which the JSON format writes the correlation id
pub const REQUEST_ID: &str = "rid";

type Slot = RefCell<Option<String>>;

thread_local! {
    static THREAD_SLOT: Slot = const { RefCell::new(None) };
}

#[cfg(feature = "tokio-context")]
tokio::task_local! {
    static TASK_SLOT: Slot;
}

#[cfg(feature = "tokio-context")]
fn in_task_scope() -> bool {
    TASK_SLOT.try_with(|_| ()).is_ok()
}

#[cfg(not(feature = "tokio-context"))]
fn in_task_scope() -> bool {
    false
}

/// Inside a tokio task that was not started through [`scope`]
#[cfg(feature = "tokio-context")]
fn in_unscoped_task() -> bool {
    tokio::task::try_id().is_some()
}

#[cfg(not(feature = "tokio-context"))]
fn in_unscoped_task() -> bool {
    false
}

#[cfg(feature = "tokio-context")]
fn with_task_slot<R>(f: impl FnOnce(&Slot) -> R) -> Option<R> {
    TASK_SLOT.try_with(f).ok()
}

#[cfg(not(feature = "tokio-context"))]
fn with_task_slot<R>(_f: impl FnOnce(&Slot) -> R) -> Option<R> {
    None
}

/// Run `f` against the slot of the current execution unit. `None` when the
/// unit cannot be identified: an unscoped tokio task, or thread-local
/// storage already torn down.
fn with_slot<R>(f: impl FnOnce(&Slot) -> R) -> Option<R> {
    if in_task_scope() {
        with_task_slot(f)
    } else if in_unscoped_task() {
        None
    } else {
        THREAD_SLOT.try_with(f).ok()
    }
}

/// Bind `id` to the current execution unit, replacing any previous id.
pub fn set_correlation_id(id: impl Into<String>) {
    let id = id.into();
    with_slot(|slot| {
        if let Ok(mut current) = slot.try_borrow_mut() {
            *current = Some(id);
        }
    });
}

/// The id bound to the current execution unit, or an empty string.
pub fn get_correlation_id() -> String {
    with_slot(|slot| {
        slot.try_borrow()
            .ok()
            .and_then(|current| current.clone())
    })
    .flatten()
    .unwrap_or_default()
}

/// Remove the id bound to the current execution unit.
pub fn clear_correlation_id() {
    take_correlation_id();
}

fn take_correlation_id() -> Option<String> {
    with_slot(|slot| slot.try_borrow_mut().ok().and_then(|mut current| current.take())).flatten()
}

fn restore_correlation_id(previous: Option<String>) {
    with_slot(|slot| {
        if let Ok(mut current) = slot.try_borrow_mut() {
            *current = previous;
        }
    });
}

/// Bind `id` until the returned guard drops, then restore whatever was
/// bound before.
///
/// ```
/// use rust_field_logger::core::correlation::{bind, get_correlation_id};
///
/// {
///     let _guard = bind("req-1");
///     assert_eq!(get_correlation_id(), "req-1");
/// }
/// assert_eq!(get_correlation_id(), "");
/// ```
pub fn bind(id: impl Into<String>) -> CorrelationGuard {
    let previous = take_correlation_id();
    set_correlation_id(id);
    CorrelationGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// Restores the previous ambient id on drop. Tied to the thread that created it.
#[must_use = "the id is unbound as soon as the guard is dropped"]
pub struct CorrelationGuard {
    previous: Option<String>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for CorrelationGuard {
    fn drop(&mut self) {
        restore_correlation_id(self.previous.take());
    }
}

/// Run `future` with `id` as the ambient id of the current task.
///
/// Ids set with [`set_correlation_id`] inside the future stay in the task
/// scope and are gone once it completes.
#[cfg(feature = "tokio-context")]
pub async fn scope<F>(id: impl Into<String>, future: F) -> F::Output
where
    F: std::future::Future,
{
    TASK_SLOT.scope(RefCell::new(Some(id.into())), future).await
}

/// Fetcher installed on encoders by default; reads the ambient store.
pub fn ambient_fetcher() -> ContextFetcher {
    Arc::new(get_correlation_id)
}

/// Explicit carrier for a request's correlation id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    correlation_id: Option<Arc<str>>,
}

impl RequestContext {
    /// Context without an id
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_correlation_id(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self {
            correlation_id: if id.is_empty() { None } else { Some(id.into()) },
        }
    }

    /// Context with a fresh random id (`req-` plus 16 hex digits)
    pub fn generate() -> Self {
        let value: u64 = rand::thread_rng().gen();
        Self::with_correlation_id(format!("req-{value:016x}"))
    }

    /// Capture the current ambient id, if any
    pub fn from_ambient() -> Self {
        Self::with_correlation_id(get_correlation_id())
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Make this context's id the ambient one until the guard drops
    pub fn enter(&self) -> CorrelationGuard {
        bind(self.correlation_id().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_clear() {
        clear_correlation_id();
        assert_eq!(get_correlation_id(), "");
        set_correlation_id("req-a");
        assert_eq!(get_correlation_id(), "req-a");
        set_correlation_id("req-b");
        assert_eq!(get_correlation_id(), "req-b");
        clear_correlation_id();
        assert_eq!(get_correlation_id(), "");
    }

    #[test]
    fn test_guard_restores_previous() {
        set_correlation_id("outer");
        {
            let _guard = bind("inner");
            assert_eq!(get_correlation_id(), "inner");
        }
        assert_eq!(get_correlation_id(), "outer");
        clear_correlation_id();
    }

    #[test]
    fn test_threads_are_isolated() {
        set_correlation_id("main");
        let seen = std::thread::spawn(|| {
            let before = get_correlation_id();
            set_correlation_id("worker");
            (before, get_correlation_id())
        })
        .join()
        .unwrap();
        assert_eq!(seen, (String::new(), "worker".to_string()));
        assert_eq!(get_correlation_id(), "main");
        clear_correlation_id();
    }

    #[test]
    fn test_request_context() {
        assert_eq!(RequestContext::new().correlation_id(), None);
        assert_eq!(RequestContext::with_correlation_id("").correlation_id(), None);

        let ctx = RequestContext::generate();
        let id = ctx.correlation_id().unwrap();
        assert!(id.starts_with("req-"));
        assert_eq!(id.len(), 20);
        assert_ne!(RequestContext::generate(), ctx);

        {
            let _guard = ctx.enter();
            assert_eq!(RequestContext::from_ambient(), ctx);
        }
        assert_eq!(get_correlation_id(), "");
    }

    #[cfg(feature = "tokio-context")]
    #[tokio::test]
    async fn test_task_scope_isolated_from_thread_slot() {
        let inside = scope("task-1", async {
            let first = get_correlation_id();
            set_correlation_id("task-1b");
            (first, get_correlation_id())
        })
        .await;
        assert_eq!(inside, ("task-1".to_string(), "task-1b".to_string()));
        assert_eq!(get_correlation_id(), "");
    }

    #[cfg(feature = "tokio-context")]
    #[tokio::test]
    async fn test_unscoped_task_has_no_slot() {
        let seen = tokio::spawn(async {
            set_correlation_id("lost");
            let _guard = bind("also-lost");
            get_correlation_id()
        })
        .await
        .unwrap();
        assert_eq!(seen, "");
        assert_eq!(get_correlation_id(), "");
    }
}
