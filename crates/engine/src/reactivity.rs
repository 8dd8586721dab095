//! Bounds-based change notification
//!
//! A subscription is a range plus a callback. On every commit the tracker
//! filters the committed writes against each registered range and hands each
//! matching subscriber exactly its slice: sets whose key is in range and
//! removes whose tuple is in range. Subscribers with no matching entry are
//! not called.
//!
//! Callback failures (errors and panics) are logged and swallowed; they never
//! reach the committer or other subscribers.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::{debug, error};

use tupledb_core::{NormalizedBounds, TxId, WriteOps};

/// Error type a subscriber callback may return
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a subscriber callback
pub type CallbackResult = std::result::Result<(), CallbackError>;

/// Synchronous subscriber callback
pub type Callback = Arc<dyn Fn(&WriteOps, TxId) -> CallbackResult + Send + Sync>;

/// Wrap a closure as a [`Callback`]
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&WriteOps, TxId) -> CallbackResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Opaque handle identifying a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Listener<C> {
    bounds: NormalizedBounds,
    callback: C,
}

type Listeners<C> = DashMap<SubscriptionId, Listener<C>>;

/// One subscriber's share of a commit
pub struct Emit<C> {
    /// Matched subscription
    pub subscription: SubscriptionId,
    /// Its callback
    pub callback: C,
    /// The writes that fell inside its bounds
    pub writes: WriteOps,
}

impl<C> fmt::Debug for Emit<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emit")
            .field("subscription", &self.subscription)
            .field("writes", &self.writes)
            .finish()
    }
}

/// Registry of subscriptions keyed by handle
///
/// Generic over the callback type so the async engine shares the matching
/// logic and only supplies its own `emit`.
pub struct ReactivityTracker<C = Callback> {
    listeners: Arc<Listeners<C>>,
    next_id: AtomicU64,
}

impl<C> Default for ReactivityTracker<C> {
    fn default() -> Self {
        Self {
            listeners: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<C> fmt::Debug for ReactivityTracker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactivityTracker")
            .field("subscriptions", &self.listeners.len())
            .finish()
    }
}

impl<C: Clone + Send + Sync + 'static> ReactivityTracker<C> {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for writes inside `bounds`
    ///
    /// The bounds are stored verbatim; subscribing again registers a second,
    /// independent subscription.
    pub fn subscribe(&self, bounds: NormalizedBounds, callback: C) -> Unsubscribe {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(id, Listener { bounds, callback });
        debug!(target: "tupledb::reactivity", subscription = %id, "Subscribed");

        let listeners = Arc::downgrade(&self.listeners);
        Unsubscribe {
            id,
            remove: Box::new(move || {
                if let Some(listeners) = Weak::upgrade(&listeners) {
                    listeners.remove(&id);
                }
            }),
            done: AtomicBool::new(false),
        }
    }

    /// Match `writes` against every subscription
    ///
    /// Each set and remove is tested independently; the write set need not be
    /// sorted. Only subscriptions with at least one match are returned, in
    /// subscription order.
    pub fn compute_emits(&self, writes: &WriteOps) -> Vec<Emit<C>> {
        let mut matched = BTreeMap::new();
        for entry in self.listeners.iter() {
            let bounds = &entry.value().bounds;
            let slice = WriteOps {
                set: writes
                    .set
                    .iter()
                    .filter(|kv| bounds.contains(&kv.key))
                    .cloned()
                    .collect(),
                remove: writes
                    .remove
                    .iter()
                    .filter(|tuple| bounds.contains(tuple))
                    .cloned()
                    .collect(),
            };
            if !slice.is_empty() {
                matched.insert(*entry.key(), (entry.value().callback.clone(), slice));
            }
        }
        matched
            .into_iter()
            .map(|(subscription, (callback, writes))| Emit {
                subscription,
                callback,
                writes,
            })
            .collect()
    }

    /// Number of live subscriptions
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Check if there are no subscriptions
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl ReactivityTracker<Callback> {
    /// Invoke every matched callback with its slice of the commit
    ///
    /// Errors and panics are logged, never propagated.
    pub fn emit(&self, emits: Vec<Emit<Callback>>, tx_id: TxId) {
        for emit in emits {
            let outcome = catch_unwind(AssertUnwindSafe(|| (emit.callback)(&emit.writes, tx_id)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(
                    target: "tupledb::reactivity",
                    subscription = %emit.subscription,
                    %tx_id,
                    error = %e,
                    "Subscriber callback failed"
                ),
                Err(panic) => error!(
                    target: "tupledb::reactivity",
                    subscription = %emit.subscription,
                    %tx_id,
                    panic = panic_message(panic.as_ref()),
                    "Subscriber callback panicked"
                ),
            }
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Handle that removes a subscription
///
/// Dropping the handle does not unsubscribe; call [`Unsubscribe::unsubscribe`].
#[must_use = "the subscription stays registered until `unsubscribe` is called"]
pub struct Unsubscribe {
    id: SubscriptionId,
    remove: Box<dyn Fn() + Send + Sync>,
    done: AtomicBool,
}

impl Unsubscribe {
    /// The subscription this handle removes
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the subscription; later calls do nothing
    pub fn unsubscribe(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            (self.remove)();
            debug!(target: "tupledb::reactivity", subscription = %self.id, "Unsubscribed");
        }
    }

    /// Whether `unsubscribe` has been called
    pub fn is_unsubscribed(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("id", &self.id)
            .field("done", &self.is_unsubscribed())
            .finish()
    }
}
