// Single-pass wrappers that reject calls instead of running them.
//
// Each guard returns `Result<_, DecoratorError>`; wrap it in `Logged` to get
// the log-and-drop behavior instead.

mod boundary;
mod logged;
mod role;
mod types;

pub use boundary::{Bounded, ErrorBoundary};
pub use logged::Logged;
pub use role::{RoleGuard, RoleGuarded};
pub use types::{Arg, Param, Signature, TypeChecked, TypeValidator};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::DecoratorError;

// Run the wrapped function, turning a panic into CallFailed
pub(crate) fn catch_panic<T>(function: &str, run: impl FnOnce() -> T) -> Result<T, DecoratorError> {
    panic::catch_unwind(AssertUnwindSafe(run)).map_err(|payload| DecoratorError::CallFailed {
        function: function.to_string(),
        message: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
