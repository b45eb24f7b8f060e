//! Runtime collaborators consumed by operand evaluation.
//!
//! The IR layer only calls these traits; activations, bindings and scope
//! objects are owned by the runtime.

use crate::ident::{ScopeId, Variable};
use crate::value::Value;

/// Resolves the scopes associated with the current activation.
pub trait ScopeChain {
    /// The static (lexical) scope the running code was compiled in.
    fn static_scope(&self) -> ScopeId;
    /// The dynamic scope of the running activation.
    fn dynamic_scope(&self) -> ScopeId;
}

/// Variable storage for one activation.
pub trait ExecutionContext {
    fn lookup(&self, var: &Variable) -> Option<Value>;
    fn store(&mut self, var: &Variable, value: Value);
    fn scope_chain(&self) -> &dyn ScopeChain;
}
