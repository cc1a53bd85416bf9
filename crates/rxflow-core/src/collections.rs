use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use crate::error::RxError;
use crate::notifier::{ChangeNotifier, Observable, SubId};
use crate::tracker;

/// Observable list. Mutators change the backing `Vec` in place and emit one
/// synthetic notification per call, no matter how many elements were touched.
pub struct RxList<T> {
    items: Rc<RefCell<Vec<T>>>,
    notifier: ChangeNotifier,
}

impl<T> Clone for RxList<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<T> Default for RxList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for RxList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T> RxList<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
            notifier: ChangeNotifier::new(),
        }
    }

    /// Borrow-free read of the whole list. Records the read.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        match self.try_with(f) {
            Ok(r) => r,
            Err(e) => panic!("with: {e}"),
        }
    }

    pub fn try_with<R>(&self, f: impl FnOnce(&[T]) -> R) -> Result<R, RxError> {
        if self.notifier.is_disposed() {
            return Err(RxError::Disposed);
        }
        tracker::record_read(&self.notifier);
        Ok(f(&self.items.borrow()))
    }

    pub fn len(&self) -> usize {
        self.with(|v| v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.with(|v| v.is_empty())
    }

    /// Arbitrary structural edit with exactly one notification. The flag
    /// returned by `f` says whether anything changed; `false` suppresses the
    /// notification.
    pub fn try_mutate<R>(&self, f: impl FnOnce(&mut Vec<T>) -> (R, bool)) -> Result<R, RxError> {
        if self.notifier.is_disposed() {
            return Err(RxError::Disposed);
        }
        let (out, changed) = f(&mut self.items.borrow_mut());
        if changed {
            self.notifier.notify();
        }
        Ok(out)
    }

    fn mutate<R>(&self, op: &str, f: impl FnOnce(&mut Vec<T>) -> (R, bool)) -> R {
        match self.try_mutate(f) {
            Ok(r) => r,
            Err(e) => panic!("{op}: {e}"),
        }
    }

    pub fn push(&self, item: T) {
        self.mutate("push", |v| {
            v.push(item);
            ((), true)
        });
    }

    /// One notification for the whole chunk; an empty chunk is a no-op.
    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.mutate("extend", |v| {
            let before = v.len();
            v.extend(items);
            ((), v.len() != before)
        });
    }

    pub fn insert(&self, index: usize, item: T) {
        self.mutate("insert", |v| {
            v.insert(index, item);
            ((), true)
        });
    }

    /// Out-of-range is a silent no-op (and no notification).
    pub fn remove(&self, index: usize) -> Option<T> {
        self.mutate("remove", |v| {
            if index < v.len() {
                (Some(v.remove(index)), true)
            } else {
                (None, false)
            }
        })
    }

    pub fn pop(&self) -> Option<T> {
        self.mutate("pop", |v| {
            let out = v.pop();
            let changed = out.is_some();
            (out, changed)
        })
    }

    pub fn retain(&self, pred: impl FnMut(&T) -> bool) {
        self.mutate("retain", |v| {
            let before = v.len();
            v.retain(pred);
            ((), v.len() != before)
        });
    }

    pub fn clear(&self) {
        self.mutate("clear", |v| {
            let changed = !v.is_empty();
            v.clear();
            ((), changed)
        });
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

impl<T: Clone> RxList<T> {
    pub fn get(&self, index: usize) -> Option<T> {
        self.with(|v| v.get(index).cloned())
    }

    /// Snapshot of the whole list. Records the read.
    pub fn to_vec(&self) -> Vec<T> {
        self.with(|v| v.to_vec())
    }
}

impl<T: PartialEq> RxList<T> {
    pub fn contains(&self, item: &T) -> bool {
        self.with(|v| v.contains(item))
    }

    /// Index assignment; equal values are a no-op. Panics when out of range,
    /// like `Vec` indexing.
    pub fn set(&self, index: usize, item: T) {
        self.mutate("set", |v| {
            if v[index] == item {
                ((), false)
            } else {
                v[index] = item;
                ((), true)
            }
        });
    }
}

impl<T> Observable for RxList<T> {
    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

pub fn rx_list<T>(items: impl IntoIterator<Item = T>) -> RxList<T> {
    items.into_iter().collect()
}

/// Observable map. Same notification discipline as [`RxList`]: in-place
/// mutation, one synthetic notification per mutating call.
pub struct RxDict<K, V> {
    entries: Rc<RefCell<HashMap<K, V>>>,
    notifier: ChangeNotifier,
}

impl<K, V> Clone for RxDict<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<K, V> Default for RxDict<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RxDict<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(HashMap::new())),
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&HashMap<K, V>) -> R) -> R {
        match self.try_with(f) {
            Ok(r) => r,
            Err(e) => panic!("with: {e}"),
        }
    }

    pub fn try_with<R>(&self, f: impl FnOnce(&HashMap<K, V>) -> R) -> Result<R, RxError> {
        if self.notifier.is_disposed() {
            return Err(RxError::Disposed);
        }
        tracker::record_read(&self.notifier);
        Ok(f(&self.entries.borrow()))
    }

    pub fn len(&self) -> usize {
        self.with(|m| m.len())
    }

    pub fn is_empty(&self) -> bool {
        self.with(|m| m.is_empty())
    }

    pub fn try_mutate<R>(
        &self,
        f: impl FnOnce(&mut HashMap<K, V>) -> (R, bool),
    ) -> Result<R, RxError> {
        if self.notifier.is_disposed() {
            return Err(RxError::Disposed);
        }
        let (out, changed) = f(&mut self.entries.borrow_mut());
        if changed {
            self.notifier.notify();
        }
        Ok(out)
    }

    fn mutate<R>(&self, op: &str, f: impl FnOnce(&mut HashMap<K, V>) -> (R, bool)) -> R {
        match self.try_mutate(f) {
            Ok(r) => r,
            Err(e) => panic!("{op}: {e}"),
        }
    }

    pub fn clear(&self) {
        self.mutate("clear", |m| {
            let changed = !m.is_empty();
            m.clear();
            ((), changed)
        });
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

impl<K: Eq + Hash, V> RxDict<K, V> {
    pub fn remove(&self, key: &K) -> Option<V> {
        self.mutate("remove", |m| {
            let out = m.remove(key);
            let changed = out.is_some();
            (out, changed)
        })
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.with(|m| m.contains_key(key))
    }

    /// Modify an existing entry in place; returns whether the key was
    /// present. One notification.
    pub fn update(&self, key: &K, f: impl FnOnce(&mut V)) -> bool {
        self.mutate("update", |m| match m.get_mut(key) {
            Some(v) => {
                f(v);
                (true, true)
            }
            None => (false, false),
        })
    }
}

impl<K: Eq + Hash, V: PartialEq> RxDict<K, V> {
    /// Inserting an equal value over an existing key is a no-op.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.mutate("insert", |m| {
            if m.get(&key) == Some(&value) {
                (None, false)
            } else {
                (m.insert(key, value), true)
            }
        })
    }
}

impl<K: Eq + Hash, V: Clone> RxDict<K, V> {
    pub fn get(&self, key: &K) -> Option<V> {
        self.with(|m| m.get(key).cloned())
    }
}

impl<K: Clone, V> RxDict<K, V> {
    pub fn keys(&self) -> Vec<K> {
        self.with(|m| m.keys().cloned().collect())
    }
}

impl<K: Eq + Hash + Clone + 'static, V: Clone + PartialEq + 'static> RxDict<K, V> {
    /// Dependency-filtered subscription: `f` runs only when one of `keys`
    /// actually changed value (or appeared/disappeared), not on every dict
    /// mutation. Compared against a snapshot taken at subscription time.
    pub fn watch_keys(&self, keys: impl IntoIterator<Item = K>, f: impl Fn() + 'static) -> SubId {
        let keys: Vec<K> = keys.into_iter().collect();
        let snapshot = |entries: &HashMap<K, V>, keys: &[K]| -> Vec<Option<V>> {
            keys.iter().map(|k| entries.get(k).cloned()).collect()
        };
        let last = RefCell::new(snapshot(&self.entries.borrow(), &keys));
        let entries = self.entries.clone();
        self.notifier.subscribe(move || {
            let cur = snapshot(&entries.borrow(), &keys);
            if cur != *last.borrow() {
                *last.borrow_mut() = cur;
                f();
            }
        })
    }
}

impl<K, V> Observable for RxDict<K, V> {
    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

pub fn rx_dict<K: Eq + Hash, V>(entries: impl IntoIterator<Item = (K, V)>) -> RxDict<K, V> {
    let dict = RxDict::new();
    *dict.entries.borrow_mut() = entries.into_iter().collect();
    dict
}
