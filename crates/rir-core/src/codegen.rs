//! Code-generation boundary.
//!
//! Instructions and operands lower themselves by calling the primitives below;
//! the target (stack bytecode, a recorder in tests, ...) implements them.

use crate::error::Result;
use crate::ident::{Label, Symbol, Variable};
use crate::operand::{Literal, Operand, ScopeHandle};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// A resolved jump destination in the generated code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("@{_0}")]
pub struct Address(pub u32);

pub trait CodegenContext {
    /// Address of a label registered before emission started.
    ///
    /// Unknown labels must fail with `ConfigurationError::UnregisteredLabel`.
    fn resolve_label(&self, label: Label) -> Result<Address>;

    fn push_literal(&mut self, literal: &Literal) -> Result<()>;
    fn load_variable(&mut self, var: &Variable) -> Result<()>;
    fn load_scope(&mut self, handle: ScopeHandle) -> Result<()>;
    /// Pop `len` values and push an array built from them.
    fn build_array(&mut self, len: u32) -> Result<()>;
    /// Pop the top value into `var`.
    fn store_variable(&mut self, var: &Variable) -> Result<()>;
    fn receive_arg(&mut self, index: u32) -> Result<()>;
    /// Pop the receiver and `argc` arguments, push the call result.
    fn invoke(&mut self, method: &Symbol, argc: u32) -> Result<()>;
    fn discard(&mut self) -> Result<()>;

    /// Replace the top value with its truthiness as a boolean.
    fn truthiness_test(&mut self) -> Result<()>;
    /// Pop two values, push whether they are equal.
    fn equality_test(&mut self) -> Result<()>;

    fn emit_jump(&mut self, address: Address) -> Result<()>;
    fn emit_jump_if_true(&mut self, address: Address) -> Result<()>;
    fn emit_jump_if_false(&mut self, address: Address) -> Result<()>;
    fn emit_return(&mut self) -> Result<()>;

    /// Push the value of `operand`.
    fn emit(&mut self, operand: &Operand) -> Result<()> {
        operand.compile(self)
    }
}
