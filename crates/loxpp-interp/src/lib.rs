// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Tree-walking interpreter for Lox++.
//!
//! Executes programs whose name references were annotated by
//! `loxpp-resolve`. Async functions and network natives run on a shared
//! worker pool; everything else runs on the calling thread.

mod builtins;
pub mod env;
mod interp;
pub mod natives;
pub mod pool;
mod stack;
pub mod value;

pub use env::Env;
pub use interp::{Flow, Interpreter, RuntimeDiagnostic, RuntimeError, DEFAULT_MAX_CALL_DEPTH};
pub use value::Value;
