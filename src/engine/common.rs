// src/engine/common.rs
//
// Common utilities shared across engine modules.
// Provides the panic policy applied around codec calls.

use crate::error::DatumError;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

pub type EngineResult<T> = std::result::Result<T, DatumError>;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run a codec stage and turn any panic inside it into an `InternalPanic` error.
///
/// Third-party decoders and resizers are fed untrusted bytes; a panic there must
/// not cross the crate boundary.
pub fn run_with_panic_policy<T, F>(stage: &'static str, f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(target: "image_datum::panic", %stage, %message, "codec stage panicked");
            Err(DatumError::internal_panic(format!("{stage}: {message}")))
        }
    }
}
