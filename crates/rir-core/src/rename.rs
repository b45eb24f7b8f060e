use crate::error::Result;
use crate::ident::{Label, Variable};

/// Maps callee-local identifiers to fresh caller identifiers during inlining.
///
/// Implementations must be total over the subtree being cloned; a missing
/// entry is a configuration error.
pub trait RenameContext {
    fn renamed_variable(&self, var: &Variable) -> Result<Variable>;
    fn renamed_label(&self, label: Label) -> Result<Label>;
}
