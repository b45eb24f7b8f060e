use crate::ident::{ScopeId, Symbol};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Runtime value produced by operand evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Nil,
    Bool(bool),
    Fixnum(i64),
    Float(f64),
    Str(String),
    Symbol(Symbol),
    Array(Vec<Value>),
    /// A scope object handed out by the scope chain.
    Scope(ScopeId),
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn as_fixnum(&self) -> Option<i64> {
        match self {
            Value::Fixnum(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Fixnum(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Symbol(s) => write!(f, ":{}", s),
            Value::Array(items) => write!(f, "[{}]", items.iter().join(", ")),
            Value::Scope(id) => write!(f, "<{}>", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_only_rejects_nil_and_false() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Fixnum(0).is_truthy());
        assert!(Value::Str(String::new()).is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
    }

    #[test]
    fn arrays_display_their_elements() {
        let value = Value::Array(vec![Value::Fixnum(1), Value::Nil]);
        assert_eq!(value.to_string(), "[1, nil]");
    }
}
