//! Error dispatcher - fans classified errors out to registered observers.
//!
//! # Ownership
//!
//! There is no global instance. The host constructs one dispatcher at startup
//! and hands clones of it to every component that reports or observes
//! failures. Clones share one observer list, so the process still has a
//! single logical dispatcher.
//!
//! # Dispatch Semantics
//!
//! - `handle` classifies, then calls every registered observer synchronously,
//!   in registration order, with the same value it returns
//! - Notification runs over a snapshot: observers may register or dispose
//!   listeners while being notified without deadlocking
//! - A panicking observer is caught and logged; later observers still run
//! - The same callback may be registered twice and is then called twice
//!
//! # Example
//!
//! ```rust
//! use carefront_errors::{ClassifiedError, ErrorDispatcher};
//! use std::sync::{Arc, Mutex};
//!
//! let dispatcher = ErrorDispatcher::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! let listener = dispatcher.add_listener(move |err| {
//!     sink.lock().unwrap().push(err.code());
//! });
//!
//! dispatcher.handle(ClassifiedError::not_found("Specialist not found"));
//! listener.dispose();
//! dispatcher.handle(ClassifiedError::conflict("Slot taken"));
//!
//! assert_eq!(*seen.lock().unwrap(), vec!["NOT_FOUND_ERROR"]);
//! ```

use crate::{ClassifiedError, Failure, classify};
use smallvec::SmallVec;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// Callback notified with every handled error.
pub type Observer = Arc<dyn Fn(&ClassifiedError) + Send + Sync + 'static>;

/// Identity of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Registry {
    observers: Vec<(ListenerId, Observer)>,
    next_id: u64,
}

impl Registry {
    fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(registered, _)| *registered != id);
        self.observers.len() != before
    }
}

struct Shared {
    registry: RwLock<Registry>,
    handled: AtomicU64,
    observer_panics: AtomicU64,
}

impl Shared {
    #[inline]
    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        match self.registry.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[inline]
    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        match self.registry.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Shared handle fanning classified errors out to observers.
///
/// Cloning is cheap and every clone sees the same observers.
#[derive(Clone)]
pub struct ErrorDispatcher {
    shared: Arc<Shared>,
}

impl ErrorDispatcher {
    /// Create a dispatcher with no observers.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: RwLock::new(Registry {
                    observers: Vec::new(),
                    next_id: 0,
                }),
                handled: AtomicU64::new(0),
                observer_panics: AtomicU64::new(0),
            }),
        }
    }

    /// Classify `failure`, notify every observer in registration order, and
    /// return the classified error.
    pub fn handle(&self, failure: impl Into<Failure>) -> ClassifiedError {
        let err = classify(failure);
        self.notify(&err);
        err
    }

    fn notify(&self, err: &ClassifiedError) {
        self.shared.handled.fetch_add(1, Ordering::Relaxed);

        let snapshot: SmallVec<[(ListenerId, Observer); 8]> = self
            .shared
            .read()
            .observers
            .iter()
            .map(|(id, observer)| (*id, Arc::clone(observer)))
            .collect();

        for (id, observer) in snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| observer(err)));
            if let Err(payload) = outcome {
                self.shared.observer_panics.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    listener = id.0,
                    code = err.code(),
                    panic = %panic_message(payload.as_ref()),
                    "error observer panicked; continuing dispatch"
                );
            }
        }
    }

    /// Register an observer.
    ///
    /// The returned [`Disposer`] removes exactly this registration. Dropping
    /// the disposer without calling it keeps the observer registered.
    pub fn add_listener<F>(&self, observer: F) -> Disposer
    where
        F: Fn(&ClassifiedError) + Send + Sync + 'static,
    {
        self.add_shared_listener(Arc::new(observer))
    }

    /// Register an already shared observer. Registering the same `Arc` twice
    /// yields two independent registrations.
    pub fn add_shared_listener(&self, observer: Observer) -> Disposer {
        let id = {
            let mut registry = self.shared.write();
            let id = ListenerId(registry.next_id);
            registry.next_id += 1;
            registry.observers.push((id, observer));
            id
        };
        tracing::trace!(listener = id.0, "error observer registered");

        Disposer {
            id,
            shared: Arc::downgrade(&self.shared),
            disposed: AtomicBool::new(false),
        }
    }

    /// Number of current registrations.
    pub fn listener_count(&self) -> usize {
        self.shared.read().observers.len()
    }

    /// Total number of `handle` calls across all clones.
    #[inline]
    pub fn handled_count(&self) -> u64 {
        self.shared.handled.load(Ordering::Relaxed)
    }

    /// Number of observer calls that panicked.
    #[inline]
    pub fn observer_panic_count(&self) -> u64 {
        self.shared.observer_panics.load(Ordering::Relaxed)
    }
}

impl Default for ErrorDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ErrorDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorDispatcher")
            .field("listeners", &self.listener_count())
            .field("handled", &self.handled_count())
            .finish()
    }
}

/// Removes one observer registration.
///
/// Holds only a weak reference, so it never keeps a dispatcher alive.
#[must_use = "dropping a Disposer leaves the observer registered for good"]
pub struct Disposer {
    id: ListenerId,
    shared: Weak<Shared>,
    disposed: AtomicBool,
}

impl Disposer {
    /// Remove the registration. Calls after the first are no-ops.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            if shared.write().remove(self.id) {
                tracing::trace!(listener = self.id.0, "error observer removed");
            }
        }
    }

    /// Identity of the registration this disposer removes.
    #[inline]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Whether `dispose` has been called.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Observer) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |tag: &str| -> Observer {
            let sink = Arc::clone(&sink);
            let tag = tag.to_owned();
            Arc::new(move |err: &ClassifiedError| {
                sink.lock().unwrap().push(format!("{}:{}", tag, err.message()));
            })
        };
        (log, make)
    }

    #[test]
    fn observers_run_in_registration_order() {
        let dispatcher = ErrorDispatcher::new();
        let (log, make) = recorder();
        let _a = dispatcher.add_shared_listener(make("a"));
        let _b = dispatcher.add_shared_listener(make("b"));
        let _c = dispatcher.add_shared_listener(make("c"));

        dispatcher.handle(ClassifiedError::not_found("x"));

        assert_eq!(*log.lock().unwrap(), vec!["a:x", "b:x", "c:x"]);
    }

    #[test]
    fn handle_returns_classified_value_given_to_observers() {
        let dispatcher = ErrorDispatcher::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let _l = dispatcher.add_listener(move |err| {
            *sink.lock().unwrap() = Some(err.clone());
        });

        let returned = dispatcher.handle(std::io::Error::other("gateway timeout"));

        assert_eq!(returned.kind(), ErrorKind::Unknown);
        assert_eq!(seen.lock().unwrap().as_ref(), Some(&returned));
    }

    #[test]
    fn duplicate_registration_is_called_twice() {
        let dispatcher = ErrorDispatcher::new();
        let (log, make) = recorder();
        let observer = make("dup");
        let first = dispatcher.add_shared_listener(Arc::clone(&observer));
        let _second = dispatcher.add_shared_listener(observer);

        dispatcher.handle(ClassifiedError::conflict("c"));
        assert_eq!(log.lock().unwrap().len(), 2);

        first.dispose();
        dispatcher.handle(ClassifiedError::conflict("c"));
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[test]
    fn dispose_is_idempotent_and_targeted() {
        let dispatcher = ErrorDispatcher::new();
        let (log, make) = recorder();
        let a = dispatcher.add_shared_listener(make("a"));
        let _b = dispatcher.add_shared_listener(make("b"));

        a.dispose();
        a.dispose();
        assert!(a.is_disposed());
        assert_eq!(dispatcher.listener_count(), 1);

        dispatcher.handle(ClassifiedError::unknown("u"));
        assert_eq!(*log.lock().unwrap(), vec!["b:u"]);
    }

    #[test]
    fn panicking_observer_does_not_block_others() {
        let dispatcher = ErrorDispatcher::new();
        let (log, make) = recorder();
        let _a = dispatcher.add_shared_listener(make("a"));
        let _boom = dispatcher.add_listener(|_| panic!("observer failure"));
        let _c = dispatcher.add_shared_listener(make("c"));

        dispatcher.handle(ClassifiedError::validation("v", None));

        assert_eq!(*log.lock().unwrap(), vec!["a:v", "c:v"]);
        assert_eq!(dispatcher.observer_panic_count(), 1);
    }

    #[test]
    fn observer_may_dispose_itself_during_dispatch() {
        let dispatcher = ErrorDispatcher::new();
        let slot: Arc<Mutex<Option<Disposer>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicU64::new(0));

        let own = Arc::clone(&slot);
        let counter = Arc::clone(&calls);
        let disposer = dispatcher.add_listener(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
            if let Some(d) = own.lock().unwrap().as_ref() {
                d.dispose();
            }
        });
        *slot.lock().unwrap() = Some(disposer);

        dispatcher.handle(ClassifiedError::unknown("first"));
        dispatcher.handle(ClassifiedError::unknown("second"));

        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(dispatcher.listener_count(), 0);
    }

    #[test]
    fn clones_share_observers() {
        let dispatcher = ErrorDispatcher::new();
        let clone = dispatcher.clone();
        let (log, make) = recorder();
        let _l = dispatcher.add_shared_listener(make("a"));

        clone.handle(ClassifiedError::authorization("z"));

        assert_eq!(*log.lock().unwrap(), vec!["a:z"]);
        assert_eq!(dispatcher.handled_count(), 1);
    }

    #[test]
    fn disposer_outliving_dispatcher_is_harmless() {
        let disposer = {
            let dispatcher = ErrorDispatcher::new();
            dispatcher.add_listener(|_| {})
        };
        disposer.dispose();
        assert!(disposer.is_disposed());
    }
}
