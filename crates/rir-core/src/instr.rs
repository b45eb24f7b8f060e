//! The closed instruction family.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::codegen::CodegenContext;
use crate::error::Result;
use crate::ident::{Label, Symbol, Variable};
use crate::operand::Operand;
use crate::rename::RenameContext;

/// Operation tag used for dispatch by analyses and code generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Copy,
    ReceiveArg,
    Call,
    Return,
    Jump,
    BTrue,
    BFalse,
    BEq,
    BNe,
    Label,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Copy => "copy",
            Operation::ReceiveArg => "recv_arg",
            Operation::Call => "call",
            Operation::Return => "return",
            Operation::Jump => "jump",
            Operation::BTrue => "b_true",
            Operation::BFalse => "b_false",
            Operation::BEq => "beq",
            Operation::BNe => "bne",
            Operation::Label => "label",
        }
    }

    /// Conditional control transfer.
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Operation::BTrue | Operation::BFalse | Operation::BEq | Operation::BNe
        )
    }

    /// Ends a basic block.
    pub fn transfers_control(self) -> bool {
        self.is_branch() || matches!(self, Operation::Jump | Operation::Return)
    }

    pub fn has_side_effects(self) -> bool {
        matches!(self, Operation::Call | Operation::Return) || self.transfers_control()
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polarity of a conditional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchKind {
    /// Jump when the condition is truthy.
    True,
    /// Jump when the condition is falsy.
    False,
    /// Jump when both operands are equal.
    Eq,
    /// Jump when the operands differ.
    Ne,
}

impl BranchKind {
    pub fn operation(self) -> Operation {
        match self {
            BranchKind::True => Operation::BTrue,
            BranchKind::False => Operation::BFalse,
            BranchKind::Eq => Operation::BEq,
            BranchKind::Ne => Operation::BNe,
        }
    }

    fn compares_operands(self) -> bool {
        matches!(self, BranchKind::Eq | BranchKind::Ne)
    }
}

/// Conditional branch: one condition operand, an optional second operand for
/// the comparing kinds, and a single jump target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchInstr {
    kind: BranchKind,
    arg1: Operand,
    arg2: Option<Operand>,
    target: Label,
}

impl BranchInstr {
    pub fn if_true(condition: Operand, target: Label) -> Self {
        Self {
            kind: BranchKind::True,
            arg1: condition,
            arg2: None,
            target,
        }
    }

    pub fn if_false(condition: Operand, target: Label) -> Self {
        Self {
            kind: BranchKind::False,
            arg1: condition,
            arg2: None,
            target,
        }
    }

    pub fn if_eq(lhs: Operand, rhs: Operand, target: Label) -> Self {
        Self {
            kind: BranchKind::Eq,
            arg1: lhs,
            arg2: Some(rhs),
            target,
        }
    }

    pub fn if_ne(lhs: Operand, rhs: Operand, target: Label) -> Self {
        Self {
            kind: BranchKind::Ne,
            arg1: lhs,
            arg2: Some(rhs),
            target,
        }
    }

    pub fn kind(&self) -> BranchKind {
        self.kind
    }

    pub fn condition(&self) -> &Operand {
        &self.arg1
    }

    pub fn compared(&self) -> Option<&Operand> {
        self.arg2.as_ref()
    }

    pub fn target(&self) -> Label {
        self.target
    }

    pub fn operands(&self) -> Vec<&Operand> {
        std::iter::once(&self.arg1).chain(self.arg2.as_ref()).collect()
    }

    fn rebuild(&self, arg1: Operand, arg2: Option<Operand>, target: Label) -> Self {
        debug_assert_eq!(arg2.is_some(), self.kind.compares_operands());
        Self {
            kind: self.kind,
            arg1,
            arg2,
            target,
        }
    }

    pub fn clone_for_inlining<R: RenameContext + ?Sized>(&self, ctx: &R) -> Result<Self> {
        let arg2 = match &self.arg2 {
            Some(arg) => Some(arg.clone_for_inlining(ctx)?),
            None => None,
        };
        Ok(self.rebuild(
            self.arg1.clone_for_inlining(ctx)?,
            arg2,
            ctx.renamed_label(self.target)?,
        ))
    }

    pub fn compile<C: CodegenContext + ?Sized>(&self, ctx: &mut C) -> Result<()> {
        // Resolve first so an unknown target leaves nothing half-emitted.
        let address = ctx.resolve_label(self.target)?;
        match self.kind {
            BranchKind::True => {
                ctx.emit(&self.arg1)?;
                ctx.truthiness_test()?;
                ctx.emit_jump_if_true(address)
            }
            BranchKind::False => {
                ctx.emit(&self.arg1)?;
                ctx.truthiness_test()?;
                ctx.emit_jump_if_false(address)
            }
            BranchKind::Eq | BranchKind::Ne => {
                let Some(rhs) = &self.arg2 else {
                    bail!("{} branch without a second operand", self.kind.operation());
                };
                ctx.emit(&self.arg1)?;
                ctx.emit(rhs)?;
                ctx.equality_test()?;
                if self.kind == BranchKind::Eq {
                    ctx.emit_jump_if_true(address)
                } else {
                    ctx.emit_jump_if_false(address)
                }
            }
        }
    }
}

impl Display for BranchInstr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.kind.operation(), self.arg1)?;
        if let Some(rhs) = &self.arg2 {
            write!(f, ", {}", rhs)?;
        }
        write!(f, ", {})", self.target)
    }
}

/// One unit of a basic block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instr {
    Copy {
        result: Variable,
        source: Operand,
    },
    ReceiveArg {
        result: Variable,
        index: u32,
    },
    Call {
        result: Option<Variable>,
        receiver: Operand,
        method: Symbol,
        args: Vec<Operand>,
    },
    Return {
        value: Operand,
    },
    Jump {
        target: Label,
    },
    Branch(BranchInstr),
    /// Block-entry marker in a linear instruction stream.
    Label(Label),
}

impl Instr {
    pub fn copy(result: Variable, source: impl Into<Operand>) -> Self {
        Instr::Copy {
            result,
            source: source.into(),
        }
    }

    pub fn receive_arg(result: Variable, index: u32) -> Self {
        Instr::ReceiveArg { result, index }
    }

    pub fn call(
        result: Option<Variable>,
        receiver: impl Into<Operand>,
        method: impl Into<Symbol>,
        args: Vec<Operand>,
    ) -> Self {
        Instr::Call {
            result,
            receiver: receiver.into(),
            method: method.into(),
            args,
        }
    }

    pub fn ret(value: impl Into<Operand>) -> Self {
        Instr::Return {
            value: value.into(),
        }
    }

    pub fn jump(target: Label) -> Self {
        Instr::Jump { target }
    }

    pub fn b_true(condition: impl Into<Operand>, target: Label) -> Self {
        Instr::Branch(BranchInstr::if_true(condition.into(), target))
    }

    pub fn b_false(condition: impl Into<Operand>, target: Label) -> Self {
        Instr::Branch(BranchInstr::if_false(condition.into(), target))
    }

    pub fn beq(lhs: impl Into<Operand>, rhs: impl Into<Operand>, target: Label) -> Self {
        Instr::Branch(BranchInstr::if_eq(lhs.into(), rhs.into(), target))
    }

    pub fn bne(lhs: impl Into<Operand>, rhs: impl Into<Operand>, target: Label) -> Self {
        Instr::Branch(BranchInstr::if_ne(lhs.into(), rhs.into(), target))
    }

    pub fn label(label: Label) -> Self {
        Instr::Label(label)
    }

    pub fn operation(&self) -> Operation {
        match self {
            Instr::Copy { .. } => Operation::Copy,
            Instr::ReceiveArg { .. } => Operation::ReceiveArg,
            Instr::Call { .. } => Operation::Call,
            Instr::Return { .. } => Operation::Return,
            Instr::Jump { .. } => Operation::Jump,
            Instr::Branch(branch) => branch.kind().operation(),
            Instr::Label(_) => Operation::Label,
        }
    }

    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Instr::Copy { source, .. } => vec![source],
            Instr::Call { receiver, args, .. } => std::iter::once(receiver).chain(args).collect(),
            Instr::Return { value } => vec![value],
            Instr::Branch(branch) => branch.operands(),
            Instr::ReceiveArg { .. } | Instr::Jump { .. } | Instr::Label(_) => Vec::new(),
        }
    }

    /// Variable written by this instruction, if any.
    pub fn result(&self) -> Option<&Variable> {
        match self {
            Instr::Copy { result, .. } | Instr::ReceiveArg { result, .. } => Some(result),
            Instr::Call { result, .. } => result.as_ref(),
            _ => None,
        }
    }

    pub fn jump_target(&self) -> Option<Label> {
        match self {
            Instr::Jump { target } => Some(*target),
            Instr::Branch(branch) => Some(branch.target()),
            _ => None,
        }
    }

    pub fn collect_used_variables(&self, out: &mut BTreeSet<Variable>) {
        for operand in self.operands() {
            operand.collect_used_variables(out);
        }
    }

    pub fn used_variables(&self) -> BTreeSet<Variable> {
        let mut vars = BTreeSet::new();
        self.collect_used_variables(&mut vars);
        vars
    }

    /// Copy of this instruction with every variable and label renamed through `ctx`.
    ///
    /// The operation and operand count are preserved and `self` is left untouched.
    pub fn clone_for_inlining<R: RenameContext + ?Sized>(&self, ctx: &R) -> Result<Instr> {
        Ok(match self {
            Instr::Copy { result, source } => Instr::Copy {
                result: ctx.renamed_variable(result)?,
                source: source.clone_for_inlining(ctx)?,
            },
            Instr::ReceiveArg { result, index } => Instr::ReceiveArg {
                result: ctx.renamed_variable(result)?,
                index: *index,
            },
            Instr::Call {
                result,
                receiver,
                method,
                args,
            } => Instr::Call {
                result: match result {
                    Some(var) => Some(ctx.renamed_variable(var)?),
                    None => None,
                },
                receiver: receiver.clone_for_inlining(ctx)?,
                method: method.clone(),
                args: args
                    .iter()
                    .map(|arg| arg.clone_for_inlining(ctx))
                    .collect::<Result<Vec<_>>>()?,
            },
            Instr::Return { value } => Instr::Return {
                value: value.clone_for_inlining(ctx)?,
            },
            Instr::Jump { target } => Instr::Jump {
                target: ctx.renamed_label(*target)?,
            },
            Instr::Branch(branch) => Instr::Branch(branch.clone_for_inlining(ctx)?),
            Instr::Label(label) => Instr::Label(ctx.renamed_label(*label)?),
        })
    }

    /// Copy-propagation hook: rewrite operand uses, leaving results and targets alone.
    pub fn substitute_operands(&self, values: &HashMap<Variable, Operand>) -> Instr {
        match self {
            Instr::Copy { result, source } => Instr::Copy {
                result: result.clone(),
                source: source.substitute(values),
            },
            Instr::Call {
                result,
                receiver,
                method,
                args,
            } => Instr::Call {
                result: result.clone(),
                receiver: receiver.substitute(values),
                method: method.clone(),
                args: args.iter().map(|arg| arg.substitute(values)).collect(),
            },
            Instr::Return { value } => Instr::Return {
                value: value.substitute(values),
            },
            Instr::Branch(branch) => Instr::Branch(branch.rebuild(
                branch.arg1.substitute(values),
                branch.arg2.as_ref().map(|arg| arg.substitute(values)),
                branch.target,
            )),
            Instr::ReceiveArg { .. } | Instr::Jump { .. } | Instr::Label(_) => self.clone(),
        }
    }

    pub fn compile<C: CodegenContext + ?Sized>(&self, ctx: &mut C) -> Result<()> {
        match self {
            Instr::Copy { result, source } => {
                ctx.emit(source)?;
                ctx.store_variable(result)
            }
            Instr::ReceiveArg { result, index } => {
                ctx.receive_arg(*index)?;
                ctx.store_variable(result)
            }
            Instr::Call {
                result,
                receiver,
                method,
                args,
            } => {
                ctx.emit(receiver)?;
                for arg in args {
                    ctx.emit(arg)?;
                }
                ctx.invoke(method, args.len() as u32)?;
                match result {
                    Some(var) => ctx.store_variable(var),
                    None => ctx.discard(),
                }
            }
            Instr::Return { value } => {
                ctx.emit(value)?;
                ctx.emit_return()
            }
            Instr::Jump { target } => {
                let address = ctx.resolve_label(*target)?;
                ctx.emit_jump(address)
            }
            Instr::Branch(branch) => branch.compile(ctx),
            // block placement is the code generator's business
            Instr::Label(_) => Ok(()),
        }
    }
}

impl Display for Instr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Copy { result, source } => write!(f, "{} = copy({})", result, source),
            Instr::ReceiveArg { result, index } => write!(f, "{} = recv_arg({})", result, index),
            Instr::Call {
                result,
                receiver,
                method,
                args,
            } => {
                if let Some(result) = result {
                    write!(f, "{} = ", result)?;
                }
                write!(
                    f,
                    "call({}, {}, [{}])",
                    method,
                    receiver,
                    args.iter().join(", ")
                )
            }
            Instr::Return { value } => write!(f, "return({})", value),
            Instr::Jump { target } => write!(f, "jump({})", target),
            Instr::Branch(branch) => write!(f, "{}", branch),
            Instr::Label(label) => write!(f, "{}:", label),
        }
    }
}
