use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::batch::{self, DeferKey};
use crate::error::{self, RxError};

new_key_type! {
    /// Subscription token returned by [`ChangeNotifier::subscribe`].
    pub struct SubId;
}

/// Process-unique identity of a notifier, used for dependency bookkeeping
/// (per-pass read dedup, batch coalescing keys).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SourceId(u64);

fn next_source_id() -> SourceId {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    SourceId(NEXT.fetch_add(1, Ordering::Relaxed))
}

/// Anything that can participate in dependency tracking: it is backed by a
/// [`ChangeNotifier`] and marks itself read via the tracker.
pub trait Observable {
    fn notifier(&self) -> &ChangeNotifier;
}

#[derive(Clone, Copy)]
enum SubKind {
    /// Internal dirtying hooks (computed invalidation). Delivered
    /// synchronously even inside a batch, so all dirtying precedes any
    /// effect re-run.
    Invalidate,
    /// External callbacks and observer re-runs. Deferred and coalesced by
    /// key while a batch is open.
    Effect(DeferKey),
}

struct Subscriber {
    f: Rc<dyn Fn()>,
    kind: SubKind,
}

struct NotifierInner {
    source: SourceId,
    subs: SlotMap<SubId, Subscriber>,
    /// Registration order; `SlotMap` iteration order is not insertion order.
    order: Vec<SubId>,
    version: u64,
    disposed: bool,
}

/// Minimal observable primitive: an ordered set of callbacks with
/// register/unregister/notify-all. Owned by every reactive container and
/// computed value.
#[derive(Clone)]
pub struct ChangeNotifier(Rc<RefCell<NotifierInner>>);

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(NotifierInner {
            source: next_source_id(),
            subs: SlotMap::with_key(),
            order: Vec::new(),
            version: 0,
            disposed: false,
        })))
    }

    pub fn source_id(&self) -> SourceId {
        self.0.borrow().source
    }

    /// Bumped once per delivered `notify`, for debugging/ordering.
    pub fn version(&self) -> u64 {
        self.0.borrow().version
    }

    pub fn is_disposed(&self) -> bool {
        self.0.borrow().disposed
    }

    /// Register an external callback. Deferred/coalesced under a batch.
    pub fn try_subscribe(&self, f: impl Fn() + 'static) -> Result<SubId, RxError> {
        let mut inner = self.0.borrow_mut();
        if inner.disposed {
            return Err(RxError::Disposed);
        }
        let source = inner.source;
        let id = inner.subs.insert_with_key(|k| Subscriber {
            f: Rc::new(f),
            kind: SubKind::Effect(DeferKey::Sub(source, k)),
        });
        inner.order.push(id);
        Ok(id)
    }

    pub fn subscribe(&self, f: impl Fn() + 'static) -> SubId {
        match self.try_subscribe(f) {
            Ok(id) => id,
            Err(e) => panic!("subscribe: {e}"),
        }
    }

    /// Internal hook used by computeds to dirty themselves. Always delivered
    /// synchronously.
    pub(crate) fn subscribe_invalidate(&self, f: impl Fn() + 'static) -> Result<SubId, RxError> {
        let mut inner = self.0.borrow_mut();
        if inner.disposed {
            return Err(RxError::Disposed);
        }
        let id = inner.subs.insert(Subscriber {
            f: Rc::new(f),
            kind: SubKind::Invalidate,
        });
        inner.order.push(id);
        Ok(id)
    }

    /// Effect subscription with a caller-chosen coalescing key. Observers use
    /// their reader id here so one observer watching N sources still re-runs
    /// once per batch.
    pub(crate) fn subscribe_keyed(
        &self,
        key: DeferKey,
        f: impl Fn() + 'static,
    ) -> Result<SubId, RxError> {
        let mut inner = self.0.borrow_mut();
        if inner.disposed {
            return Err(RxError::Disposed);
        }
        let id = inner.subs.insert(Subscriber {
            f: Rc::new(f),
            kind: SubKind::Effect(key),
        });
        inner.order.push(id);
        Ok(id)
    }

    /// Idempotent: unknown or already-removed tokens are a no-op.
    pub fn unsubscribe(&self, id: SubId) {
        let mut inner = self.0.borrow_mut();
        if inner.subs.remove(id).is_some() {
            inner.order.retain(|&s| s != id);
        }
    }

    /// Deliver to every currently-registered callback in registration order.
    /// A panicking callback does not stop delivery; panics are aggregated.
    pub fn try_notify(&self) -> Result<(), RxError> {
        // Snapshot under the borrow, run outside it: callbacks are free to
        // read values, subscribe, or unsubscribe re-entrantly.
        let snapshot: SmallVec<[(SubId, SubKind); 8]> = {
            let mut inner = self.0.borrow_mut();
            if inner.disposed {
                return Err(RxError::Disposed);
            }
            inner.version += 1;
            inner.order.iter().filter_map(|&id| inner.subs.get(id).map(|s| (id, s.kind))).collect()
        };

        // Two-phase delivery: every invalidate hook runs before any effect,
        // so an effect that reads a downstream computed never sees a value
        // cached before this change. Each phase keeps registration order.
        let mut errors = Vec::new();
        for &(id, kind) in &snapshot {
            if matches!(kind, SubKind::Invalidate) {
                error::run_guarded(&*self.deliverer(id), &mut errors);
            }
        }
        for &(id, kind) in &snapshot {
            if let SubKind::Effect(key) = kind {
                let deliver = self.deliverer(id);
                if !batch::defer(key, deliver.clone()) {
                    error::run_guarded(&*deliver, &mut errors);
                }
            }
        }
        error::dispatch(errors)
    }

    pub fn notify(&self) {
        if let Err(e) = self.try_notify() {
            log::error!("notify: {e}");
        }
    }

    /// Closure that re-checks membership at invocation time, so callbacks
    /// unsubscribed (or a notifier disposed) between enqueue and flush are
    /// skipped rather than invoked stale.
    fn deliverer(&self, id: SubId) -> Rc<dyn Fn()> {
        let weak = Rc::downgrade(&self.0);
        Rc::new(move || {
            let Some(cell) = weak.upgrade() else { return };
            let f = {
                let inner = cell.borrow();
                if inner.disposed {
                    return;
                }
                let Some(sub) = inner.subs.get(id) else { return };
                sub.f.clone()
            };
            f();
        })
    }

    /// Clears all callbacks. Idempotent; subsequent `try_subscribe` fails
    /// with [`RxError::Disposed`].
    pub fn dispose(&self) {
        let mut inner = self.0.borrow_mut();
        inner.disposed = true;
        inner.subs.clear();
        inner.order.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.borrow().order.len()
    }
}

impl Observable for ChangeNotifier {
    fn notifier(&self) -> &ChangeNotifier {
        self
    }
}
