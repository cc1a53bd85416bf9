use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::error::RxError;
use crate::notifier::{ChangeNotifier, Observable, SubId};
use crate::tracker::{self, ReaderId, Reads};

/// Derived, cached reactive value.
///
/// Evaluation is lazy-on-read with eager dirty notification: when an upstream
/// dependency changes, the cached value is only marked stale and downstream
/// readers are told immediately; the evaluator does not run again until the
/// next `get`. A dependency that changes many times between reads therefore
/// costs one re-evaluation, not many.
///
/// The evaluator must be free of reactive writes; the engine does not enforce
/// purity, but a mutating evaluator yields non-deterministic dependency sets.
pub struct Computed<T: Clone + 'static> {
    inner: Rc<ComputedInner<T>>,
}

impl<T: Clone + 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct ComputedInner<T: 'static> {
    reader: ReaderId,
    eval: Box<dyn Fn() -> T>,
    cached: RefCell<Option<T>>,
    dirty: Cell<bool>,
    /// Downstream notifier: fires when this value transitions clean -> dirty.
    notifier: ChangeNotifier,
    upstream: RefCell<Vec<(ChangeNotifier, SubId)>>,
    /// Explicit dependency list supplied at construction; skips auto-tracking.
    explicit: bool,
    disposed: Cell<bool>,
}

impl<T: 'static> ComputedInner<T> {
    fn drop_upstream(&self) {
        for (notifier, sub) in self.upstream.borrow_mut().drain(..) {
            notifier.unsubscribe(sub);
        }
    }

    /// Upstream change hook: dirty once, propagate once. Further upstream
    /// changes while already dirty are absorbed (downstream already knows).
    fn on_upstream_change(inner: &Rc<Self>) {
        if inner.disposed.get() || inner.dirty.get() {
            return;
        }
        inner.dirty.set(true);
        inner.notifier.notify();
    }
}

impl<T: 'static> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        for (notifier, sub) in self.upstream.borrow_mut().drain(..) {
            notifier.unsubscribe(sub);
        }
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Dependencies are discovered dynamically on every evaluation.
    pub fn new(eval: impl Fn() -> T + 'static) -> Self {
        Self {
            inner: Rc::new(ComputedInner {
                reader: tracker::next_reader_id(),
                eval: Box::new(eval),
                cached: RefCell::new(None),
                dirty: Cell::new(true),
                notifier: ChangeNotifier::new(),
                upstream: RefCell::new(Vec::new()),
                explicit: false,
                disposed: Cell::new(false),
            }),
        }
    }

    /// Explicit dependency list; reads inside the evaluator are not tracked.
    pub fn with_deps(eval: impl Fn() -> T + 'static, deps: &[&dyn Observable]) -> Self {
        let computed = Self {
            inner: Rc::new(ComputedInner {
                reader: tracker::next_reader_id(),
                eval: Box::new(eval),
                cached: RefCell::new(None),
                dirty: Cell::new(true),
                notifier: ChangeNotifier::new(),
                upstream: RefCell::new(Vec::new()),
                explicit: true,
                disposed: Cell::new(false),
            }),
        };
        let mut reads: Reads = Reads::new();
        for dep in deps {
            reads.push(dep.notifier().clone());
        }
        computed.swap_upstream(reads);
        computed
    }

    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(v) => v,
            Err(e) => panic!("get: {e}"),
        }
    }

    pub fn try_get(&self) -> Result<T, RxError> {
        if self.inner.disposed.get() {
            return Err(RxError::Disposed);
        }
        // Register this computed with whoever is reading it before anything
        // else, so even a cache hit builds the downstream edge.
        tracker::record_read(&self.inner.notifier);

        if !self.inner.dirty.get()
            && let Some(v) = self.inner.cached.borrow().as_ref()
        {
            return Ok(v.clone());
        }

        let value = if self.inner.explicit {
            // Reads inside the evaluator must not attribute to an outer
            // reader either; the explicit list is the whole dependency set.
            tracker::untracked(|| (self.inner.eval)())
        } else {
            // If the evaluator unwinds, the tracker pops the frame and the
            // dirty flag stays set, so a later read retries.
            let (value, reads) = tracker::track(self.inner.reader, || (self.inner.eval)())?;
            self.swap_upstream(reads);
            value
        };

        *self.inner.cached.borrow_mut() = Some(value.clone());
        self.inner.dirty.set(false);
        Ok(value)
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    pub fn subscribe(&self, f: impl Fn() + 'static) -> SubId {
        self.inner.notifier.subscribe(f)
    }

    pub fn unsubscribe(&self, id: SubId) {
        self.inner.notifier.unsubscribe(id);
    }

    /// Unregisters from every upstream source and tears down the downstream
    /// notifier. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        self.inner.drop_upstream();
        self.inner.notifier.dispose();
        self.inner.cached.borrow_mut().take();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Replace the whole upstream subscription set with the sources recorded
    /// by the latest evaluation pass.
    fn swap_upstream(&self, reads: Reads) {
        self.inner.drop_upstream();
        let own = self.inner.notifier.source_id();
        let mut upstream = self.inner.upstream.borrow_mut();
        for notifier in reads {
            // A failed cyclic read records this computed's own notifier;
            // subscribing to yourself is never useful.
            if notifier.source_id() == own {
                continue;
            }
            let weak: Weak<ComputedInner<T>> = Rc::downgrade(&self.inner);
            let hook = move || {
                if let Some(inner) = weak.upgrade() {
                    ComputedInner::on_upstream_change(&inner);
                }
            };
            match notifier.subscribe_invalidate(hook) {
                Ok(sub) => upstream.push((notifier, sub)),
                // A dependency disposed mid-flight simply stops notifying.
                Err(RxError::Disposed) => {}
                Err(e) => log::warn!("computed: upstream subscribe failed: {e}"),
            }
        }
    }
}

impl<T: Clone + 'static> Observable for Computed<T> {
    fn notifier(&self) -> &ChangeNotifier {
        &self.inner.notifier
    }
}

/// Shorthand constructor, `computed(move || a.get() + b.get())` style.
pub fn computed<T: Clone + 'static>(eval: impl Fn() -> T + 'static) -> Computed<T> {
    Computed::new(eval)
}
