use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::error;
use crate::notifier::{SourceId, SubId};
use crate::tracker::ReaderId;

/// Coalescing key for deferred effect delivery. Observers dedup by reader
/// identity across every source they watch; direct subscriptions dedup per
/// (source, token).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum DeferKey {
    Reader(ReaderId),
    Sub(SourceId, SubId),
}

#[derive(Default)]
struct BatchState {
    depth: usize,
    pending: Vec<(DeferKey, Rc<dyn Fn()>)>,
    seen: HashSet<DeferKey>,
}

thread_local! {
    static BATCH: RefCell<BatchState> = RefCell::new(BatchState::default());
}

/// True while a batch scope is open on this thread.
pub fn in_batch() -> bool {
    BATCH.with(|b| b.borrow().depth > 0)
}

/// Queue an effect delivery if a batch is open. Returns `false` when no batch
/// is active (caller delivers immediately). Duplicate keys coalesce to one
/// entry; first-notified order is kept for the flush.
pub(crate) fn defer(key: DeferKey, f: Rc<dyn Fn()>) -> bool {
    BATCH.with(|b| {
        let mut b = b.borrow_mut();
        if b.depth == 0 {
            return false;
        }
        if b.seen.insert(key) {
            b.pending.push((key, f));
        }
        true
    })
}

struct BatchGuard;

impl BatchGuard {
    fn enter() -> Self {
        BATCH.with(|b| b.borrow_mut().depth += 1);
        BatchGuard
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let pending = BATCH.with(|b| {
            let mut b = b.borrow_mut();
            b.depth -= 1;
            if b.depth == 0 {
                b.seen.clear();
                Some(std::mem::take(&mut b.pending))
            } else {
                None
            }
        });
        // Flush outside the borrow and outside the batch: mutations made by
        // a flushed effect deliver immediately (or open their own batch).
        if let Some(pending) = pending {
            let mut errors = Vec::new();
            for (_key, f) in pending {
                // Each entry re-checks its own disposed/unsubscribed state.
                error::run_guarded(&*f, &mut errors);
            }
            error::dispatch_or_log(errors);
        }
    }
}

/// Run `f` under a batch scope: every change notification raised inside is
/// deferred and each distinct observer is delivered exactly once when the
/// outermost scope exits. Nests arbitrarily; the flush runs even if `f`
/// unwinds.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let _guard = BatchGuard::enter();
    f()
}
