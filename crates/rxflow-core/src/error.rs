use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

/// Errors surfaced by the reactive core.
///
/// The plain API (`get`, `set`, `subscribe`, ...) panics on these; every
/// fallible operation also has a `try_*` form returning `Result<_, RxError>`.
#[derive(Debug, Error)]
pub enum RxError {
    #[error("operation on a disposed reactive object")]
    Disposed,

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("cyclic dependency: a computed value reads itself during evaluation")]
    CyclicDependency,

    /// One or more observer callbacks panicked during a notification flush.
    /// Delivery to the remaining observers still happened.
    #[error("{} observer callback(s) panicked during notification", .0.len())]
    Callbacks(Vec<CallbackError>),
}

/// A single captured callback panic.
#[derive(Debug, Error)]
#[error("observer callback panicked: {message}")]
pub struct CallbackError {
    pub message: String,
}

type ErrorHook = Arc<dyn Fn(&CallbackError) + Send + Sync>;

static HOOK: RwLock<Option<ErrorHook>> = RwLock::new(None);

/// Install a process-wide hook that receives callback panics instead of
/// having them surface as [`RxError::Callbacks`]. UI layers typically route
/// these to a toast/log so one broken listener doesn't take the app down.
pub fn set_error_hook(hook: impl Fn(&CallbackError) + Send + Sync + 'static) {
    *HOOK.write() = Some(Arc::new(hook));
}

pub fn clear_error_hook() {
    *HOOK.write() = None;
}

/// Run one observer callback, capturing a panic instead of unwinding through
/// the rest of the delivery loop.
pub(crate) fn run_guarded(f: &dyn Fn(), out: &mut Vec<CallbackError>) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        out.push(CallbackError { message });
    }
}

/// Route collected callback panics: to the installed hook if any, otherwise
/// back to the caller as an aggregate error.
pub(crate) fn dispatch(errors: Vec<CallbackError>) -> Result<(), RxError> {
    if errors.is_empty() {
        return Ok(());
    }
    let hook = HOOK.read().clone();
    match hook {
        Some(hook) => {
            for e in &errors {
                hook(e);
            }
            Ok(())
        }
        None => Err(RxError::Callbacks(errors)),
    }
}

/// Like [`dispatch`] but for paths with nobody to return an error to
/// (batch flush, runtime pump). Falls back to `log::error!`.
pub(crate) fn dispatch_or_log(errors: Vec<CallbackError>) {
    if let Err(e) = dispatch(errors) {
        log::error!("{e}");
    }
}
