use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use crate::error::RxError;
use crate::notifier::{ChangeNotifier, SourceId};

/// Identity of an active reader (a computed or an observer binding).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ReaderId(u64);

pub(crate) fn next_reader_id() -> ReaderId {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    ReaderId(NEXT.fetch_add(1, Ordering::Relaxed))
}

pub(crate) type Reads = SmallVec<[ChangeNotifier; 8]>;

struct Frame {
    reader: ReaderId,
    /// Per-pass visited set: re-reading the same source in one evaluation
    /// registers exactly one edge.
    seen: HashSet<SourceId>,
    reads: Reads,
}

// Dependency attribution is only meaningful within one logical call stack,
// so the reader stack is thread-local and never shared.
thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
    static SUSPENDED: Cell<u32> = const { Cell::new(0) };
}

/// Called by every container/computed read. Attributes the read to the
/// innermost active reader; a bare read outside any evaluation is a no-op.
pub(crate) fn record_read(n: &ChangeNotifier) {
    if SUSPENDED.with(|s| s.get()) > 0 {
        return;
    }
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        if let Some(top) = frames.last_mut()
            && top.seen.insert(n.source_id())
        {
            top.reads.push(n.clone());
        }
    });
}

struct FrameGuard {
    saved_suspension: u32,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        FRAMES.with(|frames| {
            frames.borrow_mut().pop();
        });
        SUSPENDED.with(|s| s.set(self.saved_suspension));
    }
}

/// Bracket one evaluation pass for `reader`, returning the evaluation result
/// together with the deduplicated sources it read. Fails fast with
/// [`RxError::CyclicDependency`] if `reader` is already on the stack.
pub(crate) fn track<R>(reader: ReaderId, f: impl FnOnce() -> R) -> Result<(R, Reads), RxError> {
    let cyclic = FRAMES.with(|frames| frames.borrow().iter().any(|fr| fr.reader == reader));
    if cyclic {
        return Err(RxError::CyclicDependency);
    }
    // Suspension belongs to the frames that were active when it began; this
    // frame is new, so its reads record normally even when an outer
    // `untracked` is in effect (a dirty computed re-evaluated under
    // suspension must still rebuild its upstream set).
    let saved_suspension = SUSPENDED.with(|s| s.replace(0));
    FRAMES.with(|frames| {
        frames.borrow_mut().push(Frame {
            reader,
            seen: HashSet::new(),
            reads: SmallVec::new(),
        });
    });
    // The guard pops the frame if `f` unwinds; on success we pop by hand to
    // recover the recorded reads.
    let guard = FrameGuard { saved_suspension };
    let out = f();
    std::mem::forget(guard);
    SUSPENDED.with(|s| s.set(saved_suspension));
    let reads = FRAMES
        .with(|frames| frames.borrow_mut().pop())
        .map(|fr| fr.reads)
        .unwrap_or_default();
    Ok((out, reads))
}

/// True while any reader frame is active on this thread.
pub fn is_tracking() -> bool {
    FRAMES.with(|frames| !frames.borrow().is_empty())
        && SUSPENDED.with(|s| s.get()) == 0
}

/// Run `f` with dependency tracking suspended: reads inside do not register
/// edges for the surrounding reader.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    SUSPENDED.with(|s| s.set(s.get() + 1));
    struct Resume;
    impl Drop for Resume {
        fn drop(&mut self) {
            SUSPENDED.with(|s| s.set(s.get() - 1));
        }
    }
    let _resume = Resume;
    f()
}
