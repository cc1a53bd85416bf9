use parking_lot::RwLock;
use web_time::Instant;

/// Time source for the timer queue (debounce/throttle). Swappable so tests
/// can drive deadlines deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Fixed clock for tests. Re-install with a new `t` to advance time.
pub struct TestClock {
    pub t: Instant,
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.t
    }
}

static CLOCK: RwLock<Option<Box<dyn Clock>>> = RwLock::new(None);

pub fn set_clock(c: Box<dyn Clock>) {
    *CLOCK.write() = Some(c);
}

pub(crate) fn now() -> Instant {
    CLOCK.read().as_ref().map(|c| c.now()).unwrap_or_else(Instant::now)
}
