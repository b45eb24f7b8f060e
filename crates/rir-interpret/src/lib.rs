//! Reference execution context and a direct interpreter for IR bodies.

pub mod error;
mod frame;
mod interpreter;

pub use frame::Frame;
pub use interpreter::{Interpreter, NativeFn, NativeRegistry};
