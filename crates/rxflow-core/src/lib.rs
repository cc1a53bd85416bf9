//! # Reactive containers, computed values, and effects
//!
//! rxflow is a small dependency-tracking engine: mutable values propagate
//! changes to derived computations and render callbacks without manual
//! subscription wiring. Four main pieces:
//!
//! - [`Rx<T>`] / [`RxList`] / [`RxDict`] — observable, mutable state.
//! - [`Computed<T>`] — cached derived value, recomputed lazily on read.
//! - [`Observer`] — re-runnable effect bound to whatever it reads.
//! - [`batch`] — coalesce many mutations into one delivery pass.
//!
//! ## Containers
//!
//! `Rx<T>` is a cloneable handle to a piece of state:
//!
//! ```rust
//! use rxflow_core::prelude::*;
//!
//! let count = rx(0);
//! count.set(1);
//! count.update(|v| *v += 1);
//! assert_eq!(count.get(), 2);
//! ```
//!
//! Writing an equal value is a no-op: no notification, no re-renders.
//! Reads participate in dependency tracking; `get()` inside a computed or
//! observer registers the cell, and future writes re-run the reader.
//!
//! ## Computed values
//!
//! ```rust
//! use rxflow_core::prelude::*;
//!
//! let first = rx("Jane".to_string());
//! let last = rx("Doe".to_string());
//!
//! let full = computed({
//!     let first = first.clone();
//!     let last = last.clone();
//!     move || format!("{} {}", first.get(), last.get())
//! });
//!
//! assert_eq!(full.get(), "Jane Doe");
//! first.set("Joan".into());
//! assert_eq!(full.get(), "Joan Doe");
//! ```
//!
//! A dependency change only marks the computed dirty and informs downstream
//! readers; the evaluator runs again on the next `get`. Chains of computeds
//! propagate the same way, and a computed that ends up reading itself fails
//! fast with `RxError::CyclicDependency`.
//!
//! ## Observers and batching
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use rxflow_core::prelude::*;
//!
//! let a = rx(1);
//! let b = rx(2);
//! let runs = Rc::new(Cell::new(0));
//!
//! let _obs = Observer::bind({
//!     let (a, b, runs) = (a.clone(), b.clone(), runs.clone());
//!     move || {
//!         let _ = a.get() + b.get();
//!         runs.set(runs.get() + 1);
//!     }
//! });
//!
//! batch(|| {
//!     a.set(10);
//!     b.set(20);
//! });
//! // Initial run at bind time, then exactly one coalesced re-run.
//! assert_eq!(runs.get(), 2);
//! ```
//!
//! Every observer re-run is a fresh tracked pass: sources behind a branch
//! that is no longer taken stop triggering it, and newly-read sources start.
//!
//! ## Cross-thread mutation
//!
//! Containers are thread-confined. Background work goes through the
//! [`runtime`] mailbox: register a cell, hand the `Send` [`RemoteCell`] to
//! the worker, and apply its writes from `runtime::pump()` on the owning
//! thread. Observer callbacks never run on a foreign thread.
//!
//! ## Timed effects
//!
//! [`DebouncedEffect`] and [`ThrottledEffect`] sit on the runtime's timer
//! queue and fire from `pump()`; install a [`TestClock`] with [`set_clock`]
//! to drive them deterministically in tests.

pub mod batch;
pub mod clock;
pub mod collections;
pub mod computed;
pub mod decorators;
pub mod error;
pub mod notifier;
pub mod observer;
pub mod prelude;
pub mod reactive;
pub mod runtime;
pub mod scope;
pub mod tests;
pub mod tracker;

pub use batch::{batch, in_batch};
pub use clock::{Clock, SystemClock, TestClock, set_clock};
pub use collections::{RxDict, RxList, rx_dict, rx_list};
pub use computed::{Computed, computed};
pub use decorators::{ConditionalEffect, DebouncedEffect, MemoizedComputation, ThrottledEffect};
pub use error::{CallbackError, RxError, clear_error_hook, set_error_hook};
pub use notifier::{ChangeNotifier, Observable, SourceId, SubId};
pub use observer::Observer;
pub use reactive::{Rx, RxBool, RxDyn, RxFloat, RxInt, RxStr, rx};
pub use runtime::{CellKey, RemoteCell, Runtime, RuntimeHandle, TimerId};
pub use scope::{Scope, current_scope};
pub use tracker::{ReaderId, is_tracking, untracked};
