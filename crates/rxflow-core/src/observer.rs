use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::batch::DeferKey;
use crate::error::RxError;
use crate::notifier::{ChangeNotifier, SubId};
use crate::scope::{Scope, current_scope};
use crate::tracker::{self, ReaderId, Reads};

/// Re-runnable effect binding: executes `f` once at bind time under
/// dependency tracking, then again whenever any value it read last time
/// changes. Each re-run is a fresh tracked pass, so conditionally-read
/// sources are picked up and dropped run by run.
///
/// The binding stays alive while a handle (or an owning [`Scope`]) holds it;
/// dropping the last handle disposes it.
pub struct Observer {
    inner: Rc<ObserverInner>,
}

impl Clone for Observer {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct ObserverInner {
    reader: ReaderId,
    run_fn: RefCell<Box<dyn FnMut()>>,
    deps: RefCell<Vec<(ChangeNotifier, SubId)>>,
    disposed: Cell<bool>,
    /// Guards against an effect re-triggering itself synchronously by
    /// writing to one of its own dependencies.
    running: Cell<bool>,
}

impl ObserverInner {
    fn drop_deps(&self) {
        for (notifier, sub) in self.deps.borrow_mut().drain(..) {
            notifier.unsubscribe(sub);
        }
    }

    fn rerun(inner: &Rc<Self>) {
        if inner.disposed.get() || inner.running.get() {
            return;
        }
        inner.running.set(true);
        struct Running<'a>(&'a Cell<bool>);
        impl Drop for Running<'_> {
            fn drop(&mut self) {
                self.0.set(false);
            }
        }
        let _running = Running(&inner.running);

        let result = tracker::track(inner.reader, || {
            let mut f = inner.run_fn.borrow_mut();
            (*f)()
        });
        match result {
            Ok(((), reads)) => Self::swap_deps(inner, reads),
            // Only reachable if the effect is somehow re-entered through a
            // computed chain; leave the old subscriptions in place.
            Err(e) => log::warn!("observer: tracked run failed: {e}"),
        }
    }

    /// The new dependency set fully replaces the old one.
    fn swap_deps(inner: &Rc<Self>, reads: Reads) {
        inner.drop_deps();
        let mut deps = inner.deps.borrow_mut();
        for notifier in reads {
            let weak: Weak<ObserverInner> = Rc::downgrade(inner);
            let deliver = move || {
                if let Some(inner) = weak.upgrade() {
                    ObserverInner::rerun(&inner);
                }
            };
            match notifier.subscribe_keyed(DeferKey::Reader(inner.reader), deliver) {
                Ok(sub) => deps.push((notifier, sub)),
                Err(RxError::Disposed) => {}
                Err(e) => log::warn!("observer: subscribe failed: {e}"),
            }
        }
    }
}

impl Drop for ObserverInner {
    fn drop(&mut self) {
        for (notifier, sub) in self.deps.borrow_mut().drain(..) {
            notifier.unsubscribe(sub);
        }
    }
}

impl Observer {
    /// Run `f` now under tracking and re-run it on every dependency change.
    /// If a scope is current, disposal is attached to it automatically.
    pub fn bind(f: impl FnMut() + 'static) -> Observer {
        let observer = Observer {
            inner: Rc::new(ObserverInner {
                reader: tracker::next_reader_id(),
                run_fn: RefCell::new(Box::new(f)),
                deps: RefCell::new(Vec::new()),
                disposed: Cell::new(false),
                running: Cell::new(false),
            }),
        };
        ObserverInner::rerun(&observer.inner);
        if let Some(scope) = current_scope() {
            let handle = observer.clone();
            scope.add_disposer(move || handle.dispose());
        }
        observer
    }

    /// Like [`Observer::bind`] but owned by an explicit scope.
    pub fn bind_in(scope: &Scope, f: impl FnMut() + 'static) -> Observer {
        scope.run(|| Observer::bind(f))
    }

    /// Force a re-run now (fresh tracked pass). No-op when disposed.
    pub fn invalidate(&self) {
        ObserverInner::rerun(&self.inner);
    }

    /// Unsubscribes from every tracked source. Idempotent; a disposed
    /// observer queued in an in-flight batch flush is skipped.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        self.inner.drop_deps();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Number of sources currently subscribed to, mostly for diagnostics.
    pub fn dep_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }
}
