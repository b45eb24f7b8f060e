//! Core intermediate representation: operands, instructions, labels and the
//! boundary traits that front-ends, inliners and code generators plug into.

#[macro_use]
pub mod macros;

pub mod body;
pub mod codegen;
pub mod config;
pub mod context;
pub mod error;
pub mod ident;
pub mod instr;
pub mod operand;
pub mod pretty;
pub mod rename;
pub mod utils;
pub mod value;

// Re-export commonly used items for convenience
pub use tracing;

pub use body::{BasicBlock, Body, BodyBuilder, LabelDecl, Program};
pub use codegen::{Address, CodegenContext};
pub use context::{ExecutionContext, ScopeChain};
pub use ident::{Label, ScopeId, Symbol, TempId, Variable};
pub use instr::{BranchInstr, BranchKind, Instr, Operation};
pub use operand::{Literal, Operand, ScopeHandle};
pub use rename::RenameContext;
pub use value::Value;

// Alias for error types
pub type Error = crate::error::Error;
pub type Result<T> = crate::error::Result<T>;
