use std::any::Any;
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};
use web_time::{Duration, Instant};

use crate::clock;
use crate::error::RxError;
use crate::reactive::Rx;

new_key_type! {
    /// Key of a container registered for cross-thread mutation.
    pub struct CellKey;
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TimerId(u64);

type Job = Box<dyn FnOnce(&Runtime) + Send>;

struct Timer {
    id: TimerId,
    deadline: Instant,
    f: Box<dyn FnOnce()>,
}

/// Per-thread reactive runtime: the mailbox that marshals mutations from
/// background threads onto the owning thread, and the timer queue behind the
/// debounce/throttle decorators.
///
/// Thread-confined by construction: it lives in a thread-local and is reached
/// via [`current`]. Foreign threads interact only through a [`RuntimeHandle`]
/// and never invoke observer callbacks directly; the owning thread applies
/// posted mutations (and the notifications they trigger) from [`pump`].
pub struct Runtime {
    jobs: Receiver<Job>,
    tx: Sender<Job>,
    cells: RefCell<SlotMap<CellKey, Box<dyn Any>>>,
    timers: RefCell<Vec<Timer>>,
    next_timer: Cell<u64>,
}

thread_local! {
    static RUNTIME: RefCell<Option<Rc<Runtime>>> = const { RefCell::new(None) };
}

/// The calling thread's runtime, created on first use. [`shutdown`] drops it
/// (tests; or a thread winding down a reactive universe).
pub fn current() -> Rc<Runtime> {
    RUNTIME.with(|rt| {
        rt.borrow_mut()
            .get_or_insert_with(|| Rc::new(Runtime::new()))
            .clone()
    })
}

pub fn shutdown() {
    RUNTIME.with(|rt| rt.borrow_mut().take());
}

/// Drain due timers and posted jobs on the calling thread's runtime. Hosts
/// call this once per event-loop turn.
pub fn pump() {
    current().pump();
}

impl Runtime {
    fn new() -> Self {
        let (tx, jobs) = channel();
        Self {
            jobs,
            tx,
            cells: RefCell::new(SlotMap::with_key()),
            timers: RefCell::new(Vec::new()),
            next_timer: Cell::new(1),
        }
    }

    /// Cloneable, `Send + Sync` entry point for background threads.
    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            tx: Arc::new(Mutex::new(self.tx.clone())),
        }
    }

    /// Expose a container for cross-thread mutation. The returned
    /// [`RemoteCell`] is `Send`; its writes are posted home as messages.
    pub fn register<T: 'static>(&self, rx: &Rx<T>) -> RemoteCell<T> {
        let key = self.cells.borrow_mut().insert(Box::new(rx.clone()));
        RemoteCell {
            key,
            handle: self.handle(),
            _marker: PhantomData,
        }
    }

    pub fn unregister(&self, key: CellKey) {
        self.cells.borrow_mut().remove(key);
    }

    fn with_cell<T: 'static>(&self, key: CellKey, f: impl FnOnce(&Rx<T>)) {
        let rx = {
            let cells = self.cells.borrow();
            let Some(slot) = cells.get(key) else {
                log::warn!("runtime: mutation for an unregistered cell dropped");
                return;
            };
            match slot.downcast_ref::<Rx<T>>() {
                Some(rx) => rx.clone(),
                None => {
                    log::warn!(
                        "runtime: {}",
                        RxError::TypeMismatch {
                            expected: std::any::type_name::<Rx<T>>(),
                            found: "differently-typed registered cell",
                        }
                    );
                    return;
                }
            }
        };
        f(&rx);
    }

    /// Schedule `f` to run on this thread once `delay` has elapsed (as
    /// measured by the installed [`crate::clock::Clock`]).
    pub fn schedule_after(&self, delay: Duration, f: impl FnOnce() + 'static) -> TimerId {
        let id = TimerId(self.next_timer.get());
        self.next_timer.set(id.0 + 1);
        self.timers.borrow_mut().push(Timer {
            id,
            deadline: clock::now() + delay,
            f: Box::new(f),
        });
        id
    }

    /// Idempotent; returns whether the timer was still pending.
    pub fn cancel(&self, id: TimerId) -> bool {
        let mut timers = self.timers.borrow_mut();
        let before = timers.len();
        timers.retain(|t| t.id != id);
        timers.len() != before
    }

    /// Run every timer whose deadline has passed, in deadline order.
    pub fn run_due(&self) {
        let now = clock::now();
        let mut due: Vec<Timer> = {
            let mut timers = self.timers.borrow_mut();
            let mut due = Vec::new();
            let mut i = 0;
            while i < timers.len() {
                if timers[i].deadline <= now {
                    due.push(timers.swap_remove(i));
                } else {
                    i += 1;
                }
            }
            due
        };
        due.sort_by_key(|t| t.deadline);
        for timer in due {
            (timer.f)();
        }
    }

    /// One event-loop turn: due timers first, then the mailbox.
    pub fn pump(&self) {
        self.run_due();
        while let Ok(job) = self.jobs.try_recv() {
            job(self);
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }
}

/// `Send + Sync` handle onto a runtime's mailbox.
#[derive(Clone)]
pub struct RuntimeHandle {
    // `mpsc::Sender` is `Send` but not `Sync`; the mutex lets one handle be
    // shared by reference across threads.
    tx: Arc<Mutex<Sender<Job>>>,
}

impl RuntimeHandle {
    /// Post a job to run on the owning thread's next [`pump`]. Returns
    /// `false` if the runtime was shut down.
    pub fn post(&self, job: impl FnOnce(&Runtime) + Send + 'static) -> bool {
        self.tx.lock().send(Box::new(job)).is_ok()
    }
}

/// Cross-thread writer for a registered [`Rx`]. Mutations are applied (and
/// their notifications delivered) on the owning thread, never on the caller.
pub struct RemoteCell<T> {
    key: CellKey,
    handle: RuntimeHandle,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for RemoteCell<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            handle: self.handle.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: PartialEq + Send + 'static> RemoteCell<T> {
    pub fn set(&self, value: T) -> bool {
        let key = self.key;
        self.handle.post(move |rt| {
            rt.with_cell::<T>(key, |rx| rx.set(value));
        })
    }
}

impl<T: Clone + PartialEq + 'static> RemoteCell<T> {
    pub fn update(&self, f: impl FnOnce(&mut T) + Send + 'static) -> bool {
        let key = self.key;
        self.handle.post(move |rt| {
            rt.with_cell::<T>(key, |rx| rx.update(f));
        })
    }
}

impl<T> RemoteCell<T> {
    pub fn key(&self) -> CellKey {
        self.key
    }
}
