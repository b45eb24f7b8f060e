//! Value-producing operands consumed by instructions.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::codegen::CodegenContext;
use crate::context::ExecutionContext;
use crate::error::{EvaluationError, Result};
use crate::ident::{Symbol, Variable};
use crate::rename::RenameContext;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Nil,
    Bool(bool),
    Fixnum(i64),
    Float(f64),
    Str(String),
    Symbol(Symbol),
}

impl Literal {
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Nil => Value::Nil,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Fixnum(n) => Value::Fixnum(*n),
            Literal::Float(n) => Value::Float(*n),
            Literal::Str(s) => Value::Str(s.clone()),
            Literal::Symbol(s) => Value::Symbol(s.clone()),
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Nil => write!(f, "nil"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Fixnum(n) => write!(f, "{}", n),
            Literal::Float(n) => write!(f, "{:?}", n),
            Literal::Str(s) => write!(f, "{:?}", s),
            Literal::Symbol(s) => write!(f, ":{}", s),
        }
    }
}

/// Operands that stand for a scope of the running activation rather than a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeHandle {
    /// The static (lexical) scope.
    CurrentScope,
    /// The dynamic scope of the activation.
    CurrentDynamicScope,
}

impl Display for ScopeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScopeHandle::CurrentScope => write!(f, "<current-scope>"),
            ScopeHandle::CurrentDynamicScope => write!(f, "<current-dynamic-scope>"),
        }
    }
}

/// Immutable value source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Constant(Literal),
    Variable(Variable),
    ScopeHandle(ScopeHandle),
    /// Builds a fresh array from the element operands on every evaluation.
    Array(Vec<Operand>),
}

impl Operand {
    pub fn nil() -> Self {
        Operand::Constant(Literal::Nil)
    }

    pub fn bool(value: bool) -> Self {
        Operand::Constant(Literal::Bool(value))
    }

    pub fn fixnum(value: i64) -> Self {
        Operand::Constant(Literal::Fixnum(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Operand::Constant(Literal::Str(value.into()))
    }

    pub fn symbol(name: impl Into<Symbol>) -> Self {
        Operand::Constant(Literal::Symbol(name.into()))
    }

    pub fn current_scope() -> Self {
        Operand::ScopeHandle(ScopeHandle::CurrentScope)
    }

    pub fn current_dynamic_scope() -> Self {
        Operand::ScopeHandle(ScopeHandle::CurrentDynamicScope)
    }

    pub fn array(items: Vec<Operand>) -> Self {
        Operand::Array(items)
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Operand::Variable(var) => Some(var),
            _ => None,
        }
    }

    /// Add every variable read by this operand to `out`.
    pub fn collect_used_variables(&self, out: &mut BTreeSet<Variable>) {
        match self {
            Operand::Variable(var) => {
                out.insert(var.clone());
            }
            Operand::Array(items) => {
                for item in items {
                    item.collect_used_variables(out);
                }
            }
            Operand::Constant(_) | Operand::ScopeHandle(_) => {}
        }
    }

    pub fn used_variables(&self) -> BTreeSet<Variable> {
        let mut vars = BTreeSet::new();
        self.collect_used_variables(&mut vars);
        vars
    }

    /// Whether every use of this operand may be replaced by the operand itself.
    ///
    /// Locals can be reassigned between uses, so only single-assignment
    /// variables qualify. Arrays allocate a new object on each evaluation.
    pub fn is_copy_propagatable(&self) -> bool {
        match self {
            Operand::Constant(_) | Operand::ScopeHandle(_) => true,
            Operand::Variable(Variable::Temporary(_) | Variable::SelfRef) => true,
            Operand::Variable(Variable::Local(_)) => false,
            Operand::Array(_) => false,
        }
    }

    pub fn evaluate<C: ExecutionContext + ?Sized>(&self, ctx: &C) -> Result<Value> {
        match self {
            Operand::Constant(literal) => Ok(literal.to_value()),
            Operand::Variable(var) => ctx
                .lookup(var)
                .ok_or_else(|| EvaluationError::UnboundVariable(var.clone()).into()),
            Operand::ScopeHandle(ScopeHandle::CurrentScope) => {
                Ok(Value::Scope(ctx.scope_chain().static_scope()))
            }
            Operand::ScopeHandle(ScopeHandle::CurrentDynamicScope) => {
                Ok(Value::Scope(ctx.scope_chain().dynamic_scope()))
            }
            Operand::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| item.evaluate(ctx))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Array(values))
            }
        }
    }

    pub fn clone_for_inlining<R: RenameContext + ?Sized>(&self, ctx: &R) -> Result<Operand> {
        Ok(match self {
            Operand::Variable(var) => Operand::Variable(ctx.renamed_variable(var)?),
            Operand::Array(items) => Operand::Array(
                items
                    .iter()
                    .map(|item| item.clone_for_inlining(ctx))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Operand::Constant(_) | Operand::ScopeHandle(_) => self.clone(),
        })
    }

    /// Replace variable uses with the operands they were copied from.
    pub fn substitute(&self, values: &HashMap<Variable, Operand>) -> Operand {
        match self {
            Operand::Variable(var) => values.get(var).cloned().unwrap_or_else(|| self.clone()),
            Operand::Array(items) => {
                Operand::Array(items.iter().map(|item| item.substitute(values)).collect())
            }
            Operand::Constant(_) | Operand::ScopeHandle(_) => self.clone(),
        }
    }

    pub fn compile<C: CodegenContext + ?Sized>(&self, ctx: &mut C) -> Result<()> {
        match self {
            Operand::Constant(literal) => ctx.push_literal(literal),
            Operand::Variable(var) => ctx.load_variable(var),
            Operand::ScopeHandle(handle) => ctx.load_scope(*handle),
            Operand::Array(items) => {
                for item in items {
                    ctx.emit(item)?;
                }
                ctx.build_array(items.len() as u32)
            }
        }
    }
}

impl From<Variable> for Operand {
    fn from(var: Variable) -> Self {
        Operand::Variable(var)
    }
}

impl From<Literal> for Operand {
    fn from(literal: Literal) -> Self {
        Operand::Constant(literal)
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Constant(literal) => write!(f, "{}", literal),
            Operand::Variable(var) => write!(f, "{}", var),
            Operand::ScopeHandle(handle) => write!(f, "{}", handle),
            Operand::Array(items) => write!(f, "[{}]", items.iter().join(", ")),
        }
    }
}
