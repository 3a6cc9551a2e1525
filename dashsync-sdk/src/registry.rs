//! Observer registry with synchronous, isolated fan-out.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashsync_types::Snapshot;
use parking_lot::Mutex;
use tracing::error;

type Callback = Arc<dyn Fn(Arc<Snapshot>) + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    next_id: AtomicU64,
    entries: Mutex<BTreeMap<u64, Callback>>,
}

/// The set of observers that receive every delivered snapshot.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use dashsync_sdk::SubscriberRegistry;
/// use dashsync_types::Snapshot;
///
/// let registry = SubscriberRegistry::new();
/// let subscription = registry.subscribe(|snapshot| {
///     println!("{} snapshot", snapshot.freshness.as_str());
/// });
///
/// registry.notify(&Arc::new(Snapshot::builder().build()));
///
/// subscription.unsubscribe();
/// subscription.unsubscribe(); // no-op
/// assert!(registry.is_empty());
/// ```
#[derive(Default, Clone)]
pub struct SubscriberRegistry {
    callbacks: Arc<Callbacks>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Keep the returned [`Subscription`] to remove it.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Arc<Snapshot>) + Send + Sync + 'static,
    {
        let id = self.callbacks.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks.entries.lock().insert(id, Arc::new(callback));

        Subscription {
            id,
            callbacks: Arc::downgrade(&self.callbacks),
            active: AtomicBool::new(true),
        }
    }

    /// Deliver `snapshot` to every callback registered before this call.
    ///
    /// Callbacks run synchronously on the caller's thread, each with the same
    /// `Arc`. A panicking callback is logged and skipped; the rest still run.
    /// Returns how many callbacks completed normally.
    pub fn notify(&self, snapshot: &Arc<Snapshot>) -> usize {
        // Run without holding the lock so callbacks may (un)subscribe.
        let targets: Vec<(u64, Callback)> = self
            .callbacks
            .entries
            .lock()
            .iter()
            .map(|(id, cb)| (*id, cb.clone()))
            .collect();

        let mut delivered = 0;
        for (id, callback) in targets {
            let snapshot = snapshot.clone();
            match catch_unwind(AssertUnwindSafe(|| callback(snapshot))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    error!(
                        subscriber = id,
                        reason = %panic_message(&panic),
                        "Subscriber panicked during notify"
                    );
                }
            }
        }
        delivered
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every callback. Outstanding subscriptions become no-ops.
    pub fn clear(&self) {
        self.callbacks.entries.lock().clear();
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .finish()
    }
}

/// Handle returned by [`SubscriberRegistry::subscribe`].
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription {
    id: u64,
    callbacks: Weak<Callbacks>,
    active: AtomicBool,
}

impl Subscription {
    /// Remove exactly this callback.
    ///
    /// Returns `true` on the first call if the callback was still registered;
    /// later calls do nothing and return `false`.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        match self.callbacks.upgrade() {
            Some(callbacks) => callbacks.entries.lock().remove(&self.id).is_some(),
            None => false,
        }
    }

    /// Whether `unsubscribe` has not been called yet.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Turn the handle into a plain closure, for callers that store
    /// unsubscribe functions.
    pub fn into_fn(self) -> impl Fn() + Send + Sync {
        move || {
            self.unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Run a hook with the same isolation as subscriber callbacks.
pub(crate) fn isolate<F: FnOnce()>(what: &str, f: F) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(f)) {
        error!(hook = what, reason = %panic_message(&panic), "Hook panicked");
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn snapshot() -> Arc<Snapshot> {
        Arc::new(Snapshot::builder().timestamp_ms(1).build())
    }

    fn counter(registry: &SubscriberRegistry) -> (Arc<AtomicUsize>, Subscription) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let sub = registry.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, sub)
    }

    #[test]
    fn every_subscriber_receives_each_notify_once() {
        let registry = SubscriberRegistry::new();
        let (a, _sa) = counter(&registry);
        let (b, _sb) = counter(&registry);

        registry.notify(&snapshot());
        registry.notify(&snapshot());

        assert_eq!(a.load(Ordering::SeqCst), 2);
        assert_eq!(b.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn late_subscriber_only_sees_later_notifies() {
        let registry = SubscriberRegistry::new();
        let (early, _se) = counter(&registry);
        registry.notify(&snapshot());

        let (late, _sl) = counter(&registry);
        registry.notify(&snapshot());

        assert_eq!(early.load(Ordering::SeqCst), 2);
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscribers_share_the_same_instance() {
        let registry = SubscriberRegistry::new();
        let seen: Arc<Mutex<Vec<Arc<Snapshot>>>> = Arc::default();
        let mut subs = Vec::new();
        for _ in 0..3 {
            let seen = seen.clone();
            subs.push(registry.subscribe(move |s| seen.lock().push(s)));
        }

        let sent = snapshot();
        registry.notify(&sent);

        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|s| Arc::ptr_eq(s, &sent)));
    }

    #[test]
    fn unsubscribe_removes_only_that_callback() {
        let registry = SubscriberRegistry::new();
        let (a, sa) = counter(&registry);
        let (b, _sb) = counter(&registry);

        assert!(sa.unsubscribe());
        registry.notify(&snapshot());

        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unsubscribe_twice_is_noop() {
        let registry = SubscriberRegistry::new();
        let (_a, sa) = counter(&registry);
        let (_b, _sb) = counter(&registry);

        assert!(sa.unsubscribe());
        assert!(!sa.unsubscribe());
        assert!(!sa.is_active());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn into_fn_unsubscribes() {
        let registry = SubscriberRegistry::new();
        let (a, sa) = counter(&registry);

        let unsubscribe = sa.into_fn();
        unsubscribe();
        unsubscribe();
        registry.notify(&snapshot());

        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let registry = SubscriberRegistry::new();
        let (before, _s1) = counter(&registry);
        let _bad = registry.subscribe(|_| panic!("render failed"));
        let (after, _s2) = counter(&registry);

        let delivered = registry.notify(&snapshot());

        assert_eq!(delivered, 2);
        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 1);

        // The panicking callback stays registered and others keep working.
        assert_eq!(registry.notify(&snapshot()), 2);
        assert_eq!(after.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let registry = SubscriberRegistry::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let s = slot.clone();
        let c = calls.clone();
        let sub = registry.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = s.lock().as_ref() {
                sub.unsubscribe();
            }
        });
        *slot.lock() = Some(sub);

        registry.notify(&snapshot());
        registry.notify(&snapshot());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_makes_subscriptions_noops() {
        let registry = SubscriberRegistry::new();
        let (_a, sa) = counter(&registry);

        registry.clear();

        assert!(registry.is_empty());
        assert!(!sa.unsubscribe());
    }

    #[test]
    fn isolate_swallows_panics() {
        let ran = AtomicBool::new(false);
        isolate("test", || {
            ran.store(true, Ordering::SeqCst);
            panic!("boom");
        });
        assert!(ran.load(Ordering::SeqCst));
    }
}
