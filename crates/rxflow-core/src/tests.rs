#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::rc::Rc;

    use parking_lot::Mutex;
    use web_time::{Duration, Instant};

    use crate::batch::batch;
    use crate::clock::{TestClock, set_clock};
    use crate::collections::{RxDict, RxList, rx_dict, rx_list};
    use crate::computed::{Computed, computed};
    use crate::decorators::*;
    use crate::error::RxError;
    use crate::notifier::{ChangeNotifier, Observable};
    use crate::observer::Observer;
    use crate::reactive::{RxDyn, rx};
    use crate::runtime;
    use crate::scope::Scope;
    use crate::tracker::untracked;

    // The clock and the error hook are process-wide; tests that touch them
    // serialize here so parallel test threads don't interfere.
    static CLOCK_LOCK: Mutex<()> = Mutex::new(());
    static HOOK_LOCK: Mutex<()> = Mutex::new(());

    fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
        let c = Rc::new(Cell::new(0));
        let c2 = c.clone();
        (c, move || c2.set(c2.get() + 1))
    }

    #[test]
    fn rx_basic() {
        let sig = rx(42);
        assert_eq!(sig.get(), 42);

        sig.set(100);
        assert_eq!(sig.get(), 100);

        sig.update(|v| *v += 1);
        assert_eq!(sig.get(), 101);
    }

    #[test]
    fn rx_set_equal_value_is_silent() {
        let sig = rx(0);
        let (hits, bump) = counter();
        sig.subscribe(bump);

        sig.set(5);
        assert_eq!(hits.get(), 1);
        sig.set(5);
        assert_eq!(hits.get(), 1);
        sig.update(|v| *v = 5);
        assert_eq!(hits.get(), 1);
        sig.set(6);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn rx_replace_always_notifies() {
        let sig = rx(1);
        let (hits, bump) = counter();
        sig.subscribe(bump);

        let old = sig.replace(1);
        assert_eq!(old, 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn rx_typed_variants() {
        let n = rx(0i64);
        assert_eq!(n.increment(), 1);
        assert_eq!(n.increment(), 2);
        assert_eq!(n.decrement(), 1);
        assert_eq!(n.add(10), 11);

        let flag = rx(false);
        assert!(flag.toggle());
        assert!(!flag.toggle());

        let s = rx(String::new());
        s.push_str("ab");
        s.push_str("c");
        assert_eq!(s.get(), "abc");
        s.clear();
        assert!(s.is_empty());
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let sig = rx(0);
        let (hits, bump) = counter();
        let id = sig.subscribe(bump);

        sig.set(1);
        assert_eq!(hits.get(), 1);

        sig.unsubscribe(id);
        sig.unsubscribe(id);
        sig.set(2);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn notifier_delivers_in_registration_order() {
        let n = ChangeNotifier::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let order = order.clone();
            n.subscribe(move || order.borrow_mut().push(tag));
        }
        n.notify();
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
        assert_eq!(n.version(), 1);
    }

    #[test]
    fn notifier_panic_does_not_stop_delivery() {
        let _guard = HOOK_LOCK.lock();
        let n = ChangeNotifier::new();
        let (hits, bump) = counter();
        n.subscribe(|| panic!("broken listener"));
        n.subscribe(bump);

        let err = n.try_notify();
        assert_eq!(hits.get(), 1);
        match err {
            Err(RxError::Callbacks(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].message.contains("broken listener"));
            }
            other => panic!("expected callback aggregate, got {other:?}"),
        }
    }

    #[test]
    fn error_hook_receives_callback_panics() {
        let _guard = HOOK_LOCK.lock();
        let n = ChangeNotifier::new();
        n.subscribe(|| panic!("routed"));

        let seen = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let seen2 = seen.clone();
        crate::error::set_error_hook(move |_e| {
            seen2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        let out = n.try_notify();
        crate::error::clear_error_hook();

        assert!(out.is_ok());
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn disposed_rx_rejects_access() {
        let sig = rx(0);
        sig.dispose();
        sig.dispose();
        assert!(matches!(sig.try_get(), Err(RxError::Disposed)));
        assert!(matches!(sig.try_set(1), Err(RxError::Disposed)));
        assert!(matches!(
            sig.notifier().try_subscribe(|| {}),
            Err(RxError::Disposed)
        ));
    }

    #[test]
    fn computed_is_lazy() {
        let dep = rx(0);
        let evals = Rc::new(Cell::new(0u32));
        let c = computed({
            let dep = dep.clone();
            let evals = evals.clone();
            move || {
                evals.set(evals.get() + 1);
                dep.get() * 2
            }
        });

        assert_eq!(c.get(), 0);
        assert_eq!(evals.get(), 1);

        for i in 1..=5 {
            dep.set(i);
        }
        assert_eq!(evals.get(), 1);
        assert!(c.is_dirty());

        assert_eq!(c.get(), 10);
        assert_eq!(evals.get(), 2);
        assert_eq!(c.get(), 10);
        assert_eq!(evals.get(), 2);
    }

    #[test]
    fn computed_chain_propagates() {
        let base = rx(1);
        let double = computed({
            let base = base.clone();
            move || base.get() * 2
        });
        let quad = computed({
            let double = double.clone();
            move || double.get() * 2
        });

        assert_eq!(quad.get(), 4);
        base.set(3);
        assert!(double.is_dirty());
        assert!(quad.is_dirty());
        assert_eq!(quad.get(), 12);
    }

    #[test]
    fn computed_with_explicit_deps_skips_tracking() {
        let a = rx(1);
        let b = rx(10);
        let c = Computed::with_deps(
            {
                let (a, b) = (a.clone(), b.clone());
                move || a.get() + b.get()
            },
            &[&a],
        );

        assert_eq!(c.get(), 11);
        b.set(20);
        assert!(!c.is_dirty());
        assert_eq!(c.get(), 11); // stale by design: b is not a declared dep
        a.set(2);
        assert!(c.is_dirty());
        assert_eq!(c.get(), 22);
    }

    #[test]
    fn subscribers_see_fresh_computed_values() {
        let a = rx(0);
        let total = computed({
            let a = a.clone();
            move || a.get() * 2
        });
        // Registered before the computed's invalidate hook exists; delivery
        // must still dirty the computed before this callback reads it.
        let seen = Rc::new(RefCell::new(Vec::new()));
        a.subscribe({
            let (total, seen) = (total.clone(), seen.clone());
            move || seen.borrow_mut().push(total.get())
        });
        assert_eq!(total.get(), 0);

        a.set(5);
        assert_eq!(*seen.borrow(), vec![10]);
    }

    #[test]
    fn computed_detects_direct_cycle() {
        let slot: Rc<RefCell<Option<Computed<i64>>>> = Rc::new(RefCell::new(None));
        let seen: Rc<RefCell<Option<RxError>>> = Rc::new(RefCell::new(None));
        let c = computed({
            let slot = slot.clone();
            let seen = seen.clone();
            move || match slot.borrow().as_ref() {
                Some(me) => me.try_get().unwrap_or_else(|e| {
                    *seen.borrow_mut() = Some(e);
                    0
                }),
                None => 0,
            }
        });
        *slot.borrow_mut() = Some(c.clone());

        assert_eq!(c.get(), 0);
        assert!(matches!(
            seen.borrow_mut().take(),
            Some(RxError::CyclicDependency)
        ));
    }

    #[test]
    fn cyclic_read_leaves_no_self_subscription() {
        let slot: Rc<RefCell<Option<Computed<i64>>>> = Rc::new(RefCell::new(None));
        let c = computed({
            let slot = slot.clone();
            move || match slot.borrow().as_ref() {
                Some(me) => me.try_get().unwrap_or(0),
                None => 0,
            }
        });
        *slot.borrow_mut() = Some(c.clone());

        assert_eq!(c.get(), 0);
        assert_eq!(c.notifier().subscriber_count(), 0);
    }

    #[test]
    fn computed_detects_transitive_cycle() {
        let xslot: Rc<RefCell<Option<Computed<i64>>>> = Rc::new(RefCell::new(None));
        let seen: Rc<RefCell<Option<RxError>>> = Rc::new(RefCell::new(None));
        let y = computed({
            let xslot = xslot.clone();
            let seen = seen.clone();
            move || match xslot.borrow().as_ref() {
                Some(x) => x.try_get().unwrap_or_else(|e| {
                    *seen.borrow_mut() = Some(e);
                    -1
                }),
                None => 0,
            }
        });
        let x = computed({
            let y = y.clone();
            move || y.get() + 1
        });
        *xslot.borrow_mut() = Some(x.clone());

        assert_eq!(x.get(), 0);
        assert!(matches!(
            seen.borrow_mut().take(),
            Some(RxError::CyclicDependency)
        ));
    }

    #[test]
    fn computed_evaluator_panic_keeps_it_dirty() {
        let broken = rx(true);
        let c = computed({
            let broken = broken.clone();
            move || {
                if broken.get() {
                    panic!("evaluator blew up");
                }
                7
            }
        });

        let out = catch_unwind(AssertUnwindSafe(|| c.get()));
        assert!(out.is_err());
        assert!(c.is_dirty());

        broken.set(false);
        assert_eq!(c.get(), 7);
        assert!(!c.is_dirty());
    }

    #[test]
    fn computed_dispose_releases_upstream() {
        let dep = rx(0);
        let c = computed({
            let dep = dep.clone();
            move || dep.get() + 1
        });
        assert_eq!(c.get(), 1);
        assert_eq!(dep.notifier().subscriber_count(), 1);

        c.dispose();
        c.dispose();
        assert_eq!(dep.notifier().subscriber_count(), 0);
        assert!(matches!(c.try_get(), Err(RxError::Disposed)));
    }

    #[test]
    fn observer_reruns_on_change() {
        let sig = rx(0);
        let runs = Rc::new(Cell::new(0u32));
        let obs = Observer::bind({
            let (sig, runs) = (sig.clone(), runs.clone());
            move || {
                let _ = sig.get();
                runs.set(runs.get() + 1);
            }
        });

        assert_eq!(runs.get(), 1);
        sig.set(1);
        assert_eq!(runs.get(), 2);
        sig.set(1); // equal: no notification
        assert_eq!(runs.get(), 2);
        assert_eq!(obs.dep_count(), 1);
    }

    #[test]
    fn observer_registration_is_deduplicated_per_pass() {
        let sig = rx(0);
        let runs = Rc::new(Cell::new(0u32));
        let obs = Observer::bind({
            let (sig, runs) = (sig.clone(), runs.clone());
            move || {
                let _ = sig.get() + sig.get();
                runs.set(runs.get() + 1);
            }
        });

        assert_eq!(obs.dep_count(), 1);
        sig.set(9);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn observer_retracks_conditional_reads() {
        let flag = rx(true);
        let a = rx(0);
        let b = rx(0);
        let runs = Rc::new(Cell::new(0u32));
        let _obs = Observer::bind({
            let (flag, a, b, runs) = (flag.clone(), a.clone(), b.clone(), runs.clone());
            move || {
                if flag.get() {
                    let _ = a.get();
                } else {
                    let _ = b.get();
                }
                runs.set(runs.get() + 1);
            }
        });

        assert_eq!(runs.get(), 1);
        b.set(1); // not read yet
        assert_eq!(runs.get(), 1);

        flag.set(false);
        assert_eq!(runs.get(), 2);

        a.set(1); // stale branch, edge dropped
        assert_eq!(runs.get(), 2);
        b.set(2); // live branch
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn batch_coalesces_observer_runs() {
        let a = rx(0);
        let b = rx(0);
        let evals = Rc::new(Cell::new(0u32));
        let total = computed({
            let (a, b) = (a.clone(), b.clone());
            let evals = evals.clone();
            move || {
                evals.set(evals.get() + 1);
                a.get() + b.get()
            }
        });
        let runs = Rc::new(Cell::new(0u32));
        let _obs = Observer::bind({
            let (total, runs) = (total.clone(), runs.clone());
            move || {
                let _ = total.get();
                runs.set(runs.get() + 1);
            }
        });
        assert_eq!((evals.get(), runs.get()), (1, 1));

        batch(|| {
            a.set(1);
            b.set(2);
        });

        assert_eq!(runs.get(), 2);
        assert_eq!(evals.get(), 2);
        assert_eq!(total.get(), 3);
        assert_eq!(evals.get(), 2);
    }

    #[test]
    fn nested_batches_flush_once_at_outermost_exit() {
        let sig = rx(0);
        let runs = Rc::new(Cell::new(0u32));
        let _obs = Observer::bind({
            let (sig, runs) = (sig.clone(), runs.clone());
            move || {
                let _ = sig.get();
                runs.set(runs.get() + 1);
            }
        });

        batch(|| {
            sig.set(1);
            batch(|| {
                sig.set(2);
                sig.set(3);
            });
            assert_eq!(runs.get(), 1); // inner exit does not flush
            sig.set(4);
        });
        assert_eq!(runs.get(), 2);
        assert_eq!(sig.get(), 4);
    }

    #[test]
    fn batch_flushes_even_on_unwind() {
        let sig = rx(0);
        let runs = Rc::new(Cell::new(0u32));
        let _obs = Observer::bind({
            let (sig, runs) = (sig.clone(), runs.clone());
            move || {
                let _ = sig.get();
                runs.set(runs.get() + 1);
            }
        });

        let out = catch_unwind(AssertUnwindSafe(|| {
            batch(|| {
                sig.set(1);
                panic!("mid-batch");
            })
        }));
        assert!(out.is_err());
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn observer_disposed_mid_batch_is_skipped_at_flush() {
        let sig = rx(0);
        let (runs_a, runs_b) = (Rc::new(Cell::new(0u32)), Rc::new(Cell::new(0u32)));
        let _obs_a = Observer::bind({
            let (sig, runs) = (sig.clone(), runs_a.clone());
            move || {
                let _ = sig.get();
                runs.set(runs.get() + 1);
            }
        });
        let obs_b = Observer::bind({
            let (sig, runs) = (sig.clone(), runs_b.clone());
            move || {
                let _ = sig.get();
                runs.set(runs.get() + 1);
            }
        });

        batch(|| {
            sig.set(1); // queues both
            obs_b.dispose();
        });
        assert_eq!(runs_a.get(), 2);
        assert_eq!(runs_b.get(), 1);
    }

    #[test]
    fn observer_write_to_own_dep_does_not_loop() {
        let sig = rx(0);
        let runs = Rc::new(Cell::new(0u32));
        let _obs = Observer::bind({
            let (sig, runs) = (sig.clone(), runs.clone());
            move || {
                let v = sig.get();
                runs.set(runs.get() + 1);
                if v < 3 {
                    sig.set(v + 1); // self-trigger is suppressed while running
                }
            }
        });
        assert_eq!(sig.get(), 1);
        assert!(runs.get() < 10);
    }

    #[test]
    fn observer_dispose_is_idempotent_and_final() {
        let sig = rx(0);
        let runs = Rc::new(Cell::new(0u32));
        let obs = Observer::bind({
            let (sig, runs) = (sig.clone(), runs.clone());
            move || {
                let _ = sig.get();
                runs.set(runs.get() + 1);
            }
        });

        obs.dispose();
        obs.dispose();
        assert!(obs.is_disposed());
        sig.set(5);
        assert_eq!(runs.get(), 1);
        assert_eq!(sig.notifier().subscriber_count(), 0);
    }

    #[test]
    fn untracked_reads_register_no_edge() {
        let a = rx(0);
        let b = rx(0);
        let runs = Rc::new(Cell::new(0u32));
        let _obs = Observer::bind({
            let (a, b, runs) = (a.clone(), b.clone(), runs.clone());
            move || {
                let _ = a.get();
                let _ = untracked(|| b.get());
                runs.set(runs.get() + 1);
            }
        });

        b.set(1);
        assert_eq!(runs.get(), 1);
        a.set(1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn untracked_reeval_rebuilds_computed_deps() {
        let a = rx(1);
        let c = computed({
            let a = a.clone();
            move || a.get() * 2
        });
        assert_eq!(c.get(), 2);

        a.set(2);
        // Re-evaluating under suspension must still rebuild c's upstream set.
        assert_eq!(untracked(|| c.get()), 4);

        a.set(3);
        assert!(c.is_dirty());
        assert_eq!(c.get(), 6);
    }

    #[test]
    fn explicit_deps_evaluator_keeps_inner_computed_live() {
        let a = rx(1);
        let inner = computed({
            let a = a.clone();
            move || a.get() + 1
        });
        let trigger = rx(0);
        let outer = Computed::with_deps(
            {
                let inner = inner.clone();
                move || inner.get() * 10
            },
            &[&trigger],
        );

        assert_eq!(outer.get(), 20);
        a.set(5);
        assert!(inner.is_dirty());
        trigger.set(1);
        assert_eq!(outer.get(), 60);
    }

    #[test]
    fn scope_disposal_tears_down_bindings() {
        let sig = rx(0);
        let runs = Rc::new(Cell::new(0u32));
        let scope = Scope::new();
        let obs = Observer::bind_in(&scope, {
            let (sig, runs) = (sig.clone(), runs.clone());
            move || {
                let _ = sig.get();
                runs.set(runs.get() + 1);
            }
        });

        sig.set(1);
        assert_eq!(runs.get(), 2);

        scope.dispose();
        assert!(obs.is_disposed());
        sig.set(2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn list_mutators_notify_exactly_once() {
        let list: RxList<i32> = rx_list([1, 2, 3]);
        let (hits, bump) = counter();
        list.subscribe(bump);

        list.push(4);
        assert_eq!(hits.get(), 1);

        list.extend([5, 6, 7]);
        assert_eq!(hits.get(), 2);
        assert_eq!(list.len(), 7);

        list.extend(std::iter::empty());
        assert_eq!(hits.get(), 2);

        assert_eq!(list.remove(0), Some(1));
        assert_eq!(hits.get(), 3);
        assert_eq!(list.remove(99), None);
        assert_eq!(hits.get(), 3);

        list.set(0, 2); // equal value
        assert_eq!(hits.get(), 3);
        list.set(0, 20);
        assert_eq!(hits.get(), 4);

        list.clear();
        assert_eq!(hits.get(), 5);
        list.clear(); // already empty
        assert_eq!(hits.get(), 5);
    }

    #[test]
    fn list_observers_never_see_partial_state() {
        let list: RxList<i32> = RxList::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        list.subscribe({
            let (list, seen) = (list.clone(), seen.clone());
            move || seen.borrow_mut().push(list.to_vec())
        });

        list.extend([1, 2, 3]);
        assert_eq!(*seen.borrow(), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn dict_mutators_notify_exactly_once() {
        let dict: RxDict<&str, i32> = rx_dict([("a", 1)]);
        let (hits, bump) = counter();
        dict.subscribe(bump);

        assert_eq!(dict.insert("b", 2), None);
        assert_eq!(hits.get(), 1);

        dict.insert("b", 2); // equal value
        assert_eq!(hits.get(), 1);

        assert!(dict.update(&"b", |v| *v += 1));
        assert_eq!(hits.get(), 2);
        assert!(!dict.update(&"missing", |v| *v += 1));
        assert_eq!(hits.get(), 2);

        assert_eq!(dict.remove(&"a"), Some(1));
        assert_eq!(hits.get(), 3);
        assert_eq!(dict.remove(&"a"), None);
        assert_eq!(hits.get(), 3);

        dict.clear();
        assert_eq!(hits.get(), 4);
        assert!(dict.is_empty());
    }

    #[test]
    fn dict_watch_keys_filters_changes() {
        let dict: RxDict<&str, i32> = rx_dict([("watched", 0), ("other", 0)]);
        let (hits, bump) = counter();
        dict.watch_keys(["watched"], bump);

        dict.insert("other", 1);
        assert_eq!(hits.get(), 0);

        dict.insert("watched", 1);
        assert_eq!(hits.get(), 1);

        dict.remove(&"watched");
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn dict_watch_keys_with_owned_keys() {
        let dict: RxDict<String, String> = rx_dict([("name".to_string(), "a".to_string())]);
        let (hits, bump) = counter();
        dict.watch_keys(["name".to_string()], bump);

        dict.insert("other".to_string(), "x".to_string());
        assert_eq!(hits.get(), 0);
        dict.insert("name".to_string(), "b".to_string());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn rx_dyn_typed_access() {
        let slot = RxDyn::new(41i32);
        let (hits, bump) = counter();
        slot.subscribe(bump);

        assert_eq!(slot.get_as::<i32>().unwrap(), 41);
        assert!(matches!(
            slot.get_as::<String>(),
            Err(RxError::TypeMismatch { .. })
        ));

        slot.set_as(41i32).unwrap(); // equal: silent
        assert_eq!(hits.get(), 0);
        slot.set_as(42i32).unwrap();
        assert_eq!(hits.get(), 1);

        // Different type replaces the slot.
        slot.set_as("hello".to_string()).unwrap();
        assert_eq!(hits.get(), 2);
        assert_eq!(slot.get_as::<String>().unwrap(), "hello");
    }

    #[test]
    fn computeds_work_over_collections() {
        let items: RxList<i64> = rx_list([1, 2, 3]);
        let sum = computed({
            let items = items.clone();
            move || items.with(|v| v.iter().sum::<i64>())
        });

        assert_eq!(sum.get(), 6);
        items.push(4);
        assert!(sum.is_dirty());
        assert_eq!(sum.get(), 10);
    }

    #[test]
    fn memoized_computation_caches_and_evicts() {
        let evals = Rc::new(Cell::new(0u32));
        let memo = MemoizedComputation::new(2, {
            let evals = evals.clone();
            move |k: &i32| {
                evals.set(evals.get() + 1);
                k * 10
            }
        });

        assert_eq!(memo.get(1), 10);
        assert_eq!(memo.get(2), 20);
        assert_eq!(memo.get(1), 10); // hit, refreshes recency
        assert_eq!(evals.get(), 2);

        assert_eq!(memo.get(3), 30); // evicts 2, the least recently used
        assert_eq!(memo.len(), 2);
        assert_eq!(memo.get(1), 10); // still cached
        assert_eq!(evals.get(), 3);
        assert_eq!(memo.get(2), 20); // recomputed
        assert_eq!(evals.get(), 4);
    }

    #[test]
    fn conditional_effect_gates_on_predicate() {
        let enabled = rx(false);
        let value = rx(0);
        let (hits, bump) = counter();
        let fx = ConditionalEffect::new(
            {
                let enabled = enabled.clone();
                move || enabled.get()
            },
            {
                let value = value.clone();
                move || {
                    let _ = value.get();
                    bump();
                }
            },
        );

        assert_eq!(hits.get(), 0);
        enabled.set(true);
        assert_eq!(hits.get(), 1);
        value.set(1);
        assert_eq!(hits.get(), 2);

        enabled.set(false);
        assert_eq!(hits.get(), 2);
        // The body did not run, so its sources are no longer dependencies.
        value.set(2);
        assert_eq!(hits.get(), 2);

        fx.dispose();
        enabled.set(true);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn debounce_collapses_a_burst() {
        let _guard = CLOCK_LOCK.lock();
        let t0 = Instant::now();
        set_clock(Box::new(TestClock { t: t0 }));

        let rt = runtime::current();
        let (hits, bump) = counter();
        let debounced = DebouncedEffect::new(Duration::from_millis(100), bump);

        debounced.call();
        debounced.call();
        debounced.call();
        assert!(debounced.is_pending());

        rt.run_due();
        assert_eq!(hits.get(), 0);

        set_clock(Box::new(TestClock {
            t: t0 + Duration::from_millis(150),
        }));
        rt.run_due();
        assert_eq!(hits.get(), 1);
        assert!(!debounced.is_pending());

        debounced.call();
        debounced.cancel();
        set_clock(Box::new(TestClock {
            t: t0 + Duration::from_millis(500),
        }));
        rt.run_due();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn throttle_leading_edge_plus_one_trailing() {
        let _guard = CLOCK_LOCK.lock();
        let t0 = Instant::now();
        set_clock(Box::new(TestClock { t: t0 }));

        let rt = runtime::current();
        let (hits, bump) = counter();
        let throttled = ThrottledEffect::new(Duration::from_millis(100), bump);

        throttled.call();
        assert_eq!(hits.get(), 1); // leading edge

        set_clock(Box::new(TestClock {
            t: t0 + Duration::from_millis(10),
        }));
        throttled.call();
        throttled.call(); // coalesced into the single trailing slot
        rt.run_due();
        assert_eq!(hits.get(), 1);

        set_clock(Box::new(TestClock {
            t: t0 + Duration::from_millis(120),
        }));
        rt.run_due();
        assert_eq!(hits.get(), 2);

        set_clock(Box::new(TestClock {
            t: t0 + Duration::from_millis(300),
        }));
        throttled.call(); // window reopened
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn remote_cell_marshals_writes_to_owner_thread() {
        let rt = runtime::current();
        let sig = rx(0);
        let runs = Rc::new(Cell::new(0u32));
        let _obs = Observer::bind({
            let (sig, runs) = (sig.clone(), runs.clone());
            move || {
                let _ = sig.get();
                runs.set(runs.get() + 1);
            }
        });

        let cell = rt.register(&sig);
        let worker = std::thread::spawn(move || {
            assert!(cell.set(42));
        });
        worker.join().unwrap();

        // Nothing applied until the owner thread pumps.
        assert_eq!(sig.get(), 0);
        assert_eq!(runs.get(), 1);

        runtime::pump();
        assert_eq!(sig.get(), 42);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn remote_cell_update_round_trip() {
        let rt = runtime::current();
        let sig = rx(10);
        let cell = rt.register(&sig);

        let worker = std::thread::spawn(move || {
            cell.update(|v| *v *= 3);
        });
        worker.join().unwrap();

        rt.pump();
        assert_eq!(sig.get(), 30);
    }
}
