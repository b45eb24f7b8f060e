use std::collections::HashMap;

use rir_core::error::{EvaluationError, Result};
use rir_core::{ExecutionContext, ScopeChain, ScopeId, Value, Variable};

/// One activation: receiver, positional arguments, variable bindings and the
/// scopes it runs in.
#[derive(Debug, Clone)]
pub struct Frame {
    receiver: Value,
    args: Vec<Value>,
    bindings: HashMap<Variable, Value>,
    static_scope: ScopeId,
    dynamic_scope: ScopeId,
}

impl Frame {
    pub fn new(receiver: Value, args: Vec<Value>) -> Self {
        Self {
            receiver,
            args,
            bindings: HashMap::new(),
            static_scope: ScopeId(0),
            dynamic_scope: ScopeId(0),
        }
    }

    pub fn with_scopes(mut self, static_scope: ScopeId, dynamic_scope: ScopeId) -> Self {
        self.static_scope = static_scope;
        self.dynamic_scope = dynamic_scope;
        self
    }

    pub fn receiver(&self) -> &Value {
        &self.receiver
    }

    pub fn arg(&self, index: u32) -> Result<Value> {
        self.args.get(index as usize).cloned().ok_or_else(|| {
            EvaluationError::MissingArgument {
                index,
                count: self.args.len(),
            }
            .into()
        })
    }

    pub fn binding(&self, var: &Variable) -> Option<&Value> {
        self.bindings.get(var)
    }
}

impl ScopeChain for Frame {
    fn static_scope(&self) -> ScopeId {
        self.static_scope
    }

    fn dynamic_scope(&self) -> ScopeId {
        self.dynamic_scope
    }
}

impl ExecutionContext for Frame {
    fn lookup(&self, var: &Variable) -> Option<Value> {
        match var {
            Variable::SelfRef => Some(self.receiver.clone()),
            _ => self.bindings.get(var).cloned(),
        }
    }

    fn store(&mut self, var: &Variable, value: Value) {
        match var {
            Variable::SelfRef => self.receiver = value,
            _ => {
                self.bindings.insert(var.clone(), value);
            }
        }
    }

    fn scope_chain(&self) -> &dyn ScopeChain {
        self
    }
}
