//! Identifier types shared by operands and instructions.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::fmt::{Display as FmtDisplay, Formatter};

/// An interned-by-value identifier: method names, local names, symbol literals.
#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Symbol {
    pub name: String,
}

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn as_str(&self) -> &str {
        self.name.as_str()
    }
}

impl FmtDisplay for Symbol {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Symbol::new(name)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Index of a compiler temporary within its body.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd, Display, From,
)]
#[display("%v_{_0}")]
pub struct TempId(pub u32);

/// Basic-block entry marker.
///
/// A label is an index into the label arena of the body that declared it. Many
/// branches may point at the same label; none of them owns it.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd, Display,
)]
#[display("_LBL_{_0}")]
pub struct Label(u32);

impl Label {
    pub const fn new(index: u32) -> Self {
        Label(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Opaque handle to a runtime scope object handed out by the scope chain.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd, Display, From,
)]
#[display("scope#{_0}")]
pub struct ScopeId(pub u32);

/// A storage location read by operands and written by value-producing instructions.
#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Variable {
    /// Source-level local variable.
    Local(Symbol),
    /// Compiler temporary; assigned exactly once.
    Temporary(TempId),
    /// The receiver of the current activation.
    SelfRef,
}

impl Variable {
    pub fn local(name: impl Into<Symbol>) -> Self {
        Variable::Local(name.into())
    }

    pub fn temp(index: u32) -> Self {
        Variable::Temporary(TempId(index))
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Variable::Temporary(_))
    }
}

impl FmtDisplay for Variable {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Variable::Local(name) => write!(f, "{}", name),
            Variable::Temporary(id) => write!(f, "{}", id),
            Variable::SelfRef => write!(f, "%self"),
        }
    }
}
