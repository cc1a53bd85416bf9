use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::rc::{Rc, Weak};

use web_time::{Duration, Instant};

use crate::clock;
use crate::observer::Observer;
use crate::runtime::{self, Runtime, TimerId};

/// Coalesces a burst of calls into one execution after a quiet period.
/// Every `call` cancels the pending timer and starts the delay over; `f`
/// runs on the owning thread's [`runtime::pump`] once the calls stop.
pub struct DebouncedEffect {
    inner: Rc<DebounceInner>,
}

struct DebounceInner {
    delay: Duration,
    f: Rc<dyn Fn()>,
    pending: Cell<Option<TimerId>>,
    rt: Rc<Runtime>,
}

impl DebouncedEffect {
    pub fn new(delay: Duration, f: impl Fn() + 'static) -> Self {
        Self {
            inner: Rc::new(DebounceInner {
                delay,
                f: Rc::new(f),
                pending: Cell::new(None),
                rt: runtime::current(),
            }),
        }
    }

    pub fn call(&self) {
        if let Some(id) = self.inner.pending.take() {
            self.inner.rt.cancel(id);
        }
        let weak: Weak<DebounceInner> = Rc::downgrade(&self.inner);
        let id = self.inner.rt.schedule_after(self.inner.delay, move || {
            if let Some(inner) = weak.upgrade() {
                inner.pending.set(None);
                (inner.f)();
            }
        });
        self.inner.pending.set(Some(id));
    }

    /// Drop the pending execution, if any.
    pub fn cancel(&self) {
        if let Some(id) = self.inner.pending.take() {
            self.inner.rt.cancel(id);
        }
    }

    /// Run immediately, cancelling the pending timer.
    pub fn flush(&self) {
        self.cancel();
        (self.inner.f)();
    }

    pub fn is_pending(&self) -> bool {
        self.inner.pending.get().is_some()
    }
}

/// Rate-limits calls to at most one execution per interval: the first call
/// of a window runs immediately (leading edge), intervening calls collapse
/// into one trailing execution at the end of the window.
pub struct ThrottledEffect {
    inner: Rc<ThrottleInner>,
}

struct ThrottleInner {
    interval: Duration,
    f: Rc<dyn Fn()>,
    last_run: Cell<Option<Instant>>,
    trailing: Cell<Option<TimerId>>,
    rt: Rc<Runtime>,
}

impl ThrottledEffect {
    pub fn new(interval: Duration, f: impl Fn() + 'static) -> Self {
        Self {
            inner: Rc::new(ThrottleInner {
                interval,
                f: Rc::new(f),
                last_run: Cell::new(None),
                trailing: Cell::new(None),
                rt: runtime::current(),
            }),
        }
    }

    pub fn call(&self) {
        let inner = &self.inner;
        let now = clock::now();
        let open = match inner.last_run.get() {
            None => true,
            Some(last) => now.duration_since(last) >= inner.interval,
        };
        if open {
            inner.last_run.set(Some(now));
            (inner.f)();
            return;
        }
        if inner.trailing.get().is_some() {
            // Already one trailing execution queued; drop this call.
            return;
        }
        let last = inner.last_run.get().unwrap_or(now);
        let wait = (last + inner.interval).saturating_duration_since(now);
        let weak: Weak<ThrottleInner> = Rc::downgrade(inner);
        let id = inner.rt.schedule_after(wait, move || {
            if let Some(inner) = weak.upgrade() {
                inner.trailing.set(None);
                inner.last_run.set(Some(clock::now()));
                (inner.f)();
            }
        });
        inner.trailing.set(Some(id));
    }

    pub fn cancel(&self) {
        if let Some(id) = self.inner.trailing.take() {
            self.inner.rt.cancel(id);
        }
    }
}

/// Bounded least-recently-used cache over a keyed computation.
pub struct MemoizedComputation<K, V> {
    capacity: usize,
    compute: Box<dyn Fn(&K) -> V>,
    cache: RefCell<HashMap<K, V>>,
    order: RefCell<VecDeque<K>>,
}

impl<K: Eq + Hash + Clone, V: Clone> MemoizedComputation<K, V> {
    pub fn new(capacity: usize, compute: impl Fn(&K) -> V + 'static) -> Self {
        Self {
            capacity: capacity.max(1),
            compute: Box::new(compute),
            cache: RefCell::new(HashMap::new()),
            order: RefCell::new(VecDeque::new()),
        }
    }

    pub fn get(&self, key: K) -> V {
        if let Some(v) = self.cache.borrow().get(&key).cloned() {
            self.touch(&key);
            return v;
        }
        let v = (self.compute)(&key);
        {
            let mut cache = self.cache.borrow_mut();
            let mut order = self.order.borrow_mut();
            cache.insert(key.clone(), v.clone());
            order.push_back(key);
            while cache.len() > self.capacity {
                if let Some(evicted) = order.pop_front() {
                    cache.remove(&evicted);
                }
            }
        }
        v
    }

    fn touch(&self, key: &K) {
        let mut order = self.order.borrow_mut();
        if let Some(pos) = order.iter().position(|k| k == key) {
            let k = order.remove(pos);
            if let Some(k) = k {
                order.push_back(k);
            }
        }
    }

    pub fn invalidate(&self, key: &K) -> bool {
        let removed = self.cache.borrow_mut().remove(key).is_some();
        if removed {
            let mut order = self.order.borrow_mut();
            if let Some(pos) = order.iter().position(|k| k == key) {
                order.remove(pos);
            }
        }
        removed
    }

    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
        self.order.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }
}

/// Observer that runs its effect only while a reactive predicate holds.
///
/// The predicate is evaluated under tracking on every dependency change;
/// while it returns `false` the effect body is skipped, and sources read
/// only by the body stop being dependencies until it runs again.
pub struct ConditionalEffect {
    observer: Observer,
}

impl ConditionalEffect {
    pub fn new(pred: impl Fn() -> bool + 'static, f: impl Fn() + 'static) -> Self {
        Self {
            observer: Observer::bind(move || {
                if pred() {
                    f();
                }
            }),
        }
    }

    pub fn dispose(&self) {
        self.observer.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.observer.is_disposed()
    }
}
