use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RxError;
use crate::notifier::{ChangeNotifier, Observable, SubId};
use crate::tracker;

/// Observable, mutable value cell. Cloning the handle shares the cell.
///
/// Reads made inside a computed or observer evaluation register the cell as
/// a dependency automatically; writes compare under `PartialEq` and notify
/// only on an actual change.
pub struct Rx<T> {
    value: Rc<RefCell<T>>,
    notifier: ChangeNotifier,
}

impl<T> Clone for Rx<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<T: Default> Default for Rx<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Rx<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Rc::new(RefCell::new(value)),
            notifier: ChangeNotifier::new(),
        }
    }

    /// Read a projection of the value without cloning it. Records the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        match self.try_with(f) {
            Ok(r) => r,
            Err(e) => panic!("with: {e}"),
        }
    }

    pub fn try_with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, RxError> {
        if self.notifier.is_disposed() {
            return Err(RxError::Disposed);
        }
        tracker::record_read(&self.notifier);
        Ok(f(&self.value.borrow()))
    }

    /// Swap in a new value unconditionally (no equality check), returning the
    /// old one. The escape hatch when `T` has no useful `PartialEq` or when a
    /// notification must fire regardless.
    pub fn replace(&self, value: T) -> T {
        match self.try_replace(value) {
            Ok(old) => old,
            Err(e) => panic!("replace: {e}"),
        }
    }

    pub fn try_replace(&self, value: T) -> Result<T, RxError> {
        if self.notifier.is_disposed() {
            return Err(RxError::Disposed);
        }
        let old = std::mem::replace(&mut *self.value.borrow_mut(), value);
        self.notifier.notify();
        Ok(old)
    }

    /// Register a change callback. The callback takes no argument; read the
    /// cell from inside it. Deferred/coalesced under a batch.
    pub fn subscribe(&self, f: impl Fn() + 'static) -> SubId {
        self.notifier.subscribe(f)
    }

    pub fn unsubscribe(&self, id: SubId) {
        self.notifier.unsubscribe(id);
    }

    /// Tear down: clears all subscriptions. Idempotent; subsequent reads and
    /// writes fail with [`RxError::Disposed`].
    pub fn dispose(&self) {
        self.notifier.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.notifier.is_disposed()
    }
}

impl<T: Clone> Rx<T> {
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(v) => v,
            Err(e) => panic!("get: {e}"),
        }
    }

    pub fn try_get(&self) -> Result<T, RxError> {
        self.try_with(T::clone)
    }
}

impl<T: PartialEq> Rx<T> {
    /// No-op (and no notification) when the new value equals the current one.
    pub fn set(&self, value: T) {
        if let Err(e) = self.try_set(value) {
            panic!("set: {e}");
        }
    }

    pub fn try_set(&self, value: T) -> Result<(), RxError> {
        if self.notifier.is_disposed() {
            return Err(RxError::Disposed);
        }
        {
            let mut cur = self.value.borrow_mut();
            if *cur == value {
                return Ok(());
            }
            *cur = value;
        }
        self.notifier.notify();
        Ok(())
    }
}

impl<T: Clone + PartialEq> Rx<T> {
    /// Read-modify-write with a single notification, skipped when the result
    /// equals the starting value.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        if let Err(e) = self.try_update(f) {
            panic!("update: {e}");
        }
    }

    pub fn try_update(&self, f: impl FnOnce(&mut T)) -> Result<(), RxError> {
        if self.notifier.is_disposed() {
            return Err(RxError::Disposed);
        }
        let changed = {
            let mut cur = self.value.borrow_mut();
            let before = cur.clone();
            f(&mut cur);
            *cur != before
        };
        if changed {
            self.notifier.notify();
        }
        Ok(())
    }
}

impl<T> Observable for Rx<T> {
    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

/// Scalar aliases matching the common primitive cells.
pub type RxInt = Rx<i64>;
pub type RxFloat = Rx<f64>;
pub type RxBool = Rx<bool>;
pub type RxStr = Rx<String>;

impl Rx<i64> {
    pub fn increment(&self) -> i64 {
        self.add(1)
    }

    pub fn decrement(&self) -> i64 {
        self.add(-1)
    }

    /// Returns the value after the addition.
    pub fn add(&self, delta: i64) -> i64 {
        let mut out = 0;
        self.update(|v| {
            *v += delta;
            out = *v;
        });
        out
    }
}

impl Rx<bool> {
    pub fn toggle(&self) -> bool {
        let mut out = false;
        self.update(|v| {
            *v = !*v;
            out = *v;
        });
        out
    }
}

impl Rx<String> {
    pub fn push_str(&self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.update(|v| v.push_str(s));
    }

    pub fn clear(&self) {
        self.update(|v| v.clear());
    }

    pub fn is_empty(&self) -> bool {
        self.with(|v| v.is_empty())
    }
}

/// Shorthand constructor, `rx(0)` style.
pub fn rx<T>(value: T) -> Rx<T> {
    Rx::new(value)
}

struct DynSlot {
    value: Box<dyn Any>,
    tname: &'static str,
}

/// Dynamically-typed reactive slot. Typed access is checked at runtime and
/// fails with [`RxError::TypeMismatch`] instead of panicking.
pub struct RxDyn {
    slot: Rc<RefCell<DynSlot>>,
    notifier: ChangeNotifier,
}

impl Clone for RxDyn {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl RxDyn {
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(DynSlot {
                value: Box::new(value),
                tname: std::any::type_name::<T>(),
            })),
            notifier: ChangeNotifier::new(),
        }
    }

    /// Name of the currently stored type.
    pub fn type_name(&self) -> &'static str {
        self.slot.borrow().tname
    }

    pub fn get_as<T: Clone + 'static>(&self) -> Result<T, RxError> {
        if self.notifier.is_disposed() {
            return Err(RxError::Disposed);
        }
        tracker::record_read(&self.notifier);
        let slot = self.slot.borrow();
        match slot.value.downcast_ref::<T>() {
            Some(v) => Ok(v.clone()),
            None => Err(RxError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found: slot.tname,
            }),
        }
    }

    /// Same-type equal values are a no-op. Storing a different type replaces
    /// the slot (with a warning), mirroring how remembered UI slots behave on
    /// type change.
    pub fn set_as<T: PartialEq + 'static>(&self, value: T) -> Result<(), RxError> {
        if self.notifier.is_disposed() {
            return Err(RxError::Disposed);
        }
        {
            let mut slot = self.slot.borrow_mut();
            match slot.value.downcast_ref::<T>() {
                Some(cur) if *cur == value => return Ok(()),
                Some(_) => {}
                None => {
                    log::warn!(
                        "RxDyn: replacing stored {} with {}",
                        slot.tname,
                        std::any::type_name::<T>()
                    );
                }
            }
            slot.value = Box::new(value);
            slot.tname = std::any::type_name::<T>();
        }
        self.notifier.notify();
        Ok(())
    }

    pub fn subscribe(&self, f: impl Fn() + 'static) -> SubId {
        self.notifier.subscribe(f)
    }

    pub fn unsubscribe(&self, id: SubId) {
        self.notifier.unsubscribe(id);
    }

    pub fn dispose(&self) {
        self.notifier.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.notifier.is_disposed()
    }
}

impl Observable for RxDyn {
    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for Rx<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.borrow().serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, T: serde::Deserialize<'de>> serde::Deserialize<'de> for Rx<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Rx::new)
    }
}
