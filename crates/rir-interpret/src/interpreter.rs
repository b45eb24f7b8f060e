use std::collections::HashMap;

use itertools::Itertools;
use rir_core::error::{ConfigurationError, EvaluationError, Result};
use rir_core::{
    Body, BranchInstr, BranchKind, ExecutionContext, Instr, Label, Program, Symbol, Value,
    Variable,
};
use tracing::{debug, trace};

use crate::frame::Frame;
use crate::{interp_bail, interp_ensure};

const MAX_CALL_DEPTH: usize = 256;

pub type NativeFn = Box<dyn Fn(&Value, &[Value]) -> Result<Value>>;

/// Methods implemented by the host rather than by an IR body.
#[derive(Default)]
pub struct NativeRegistry {
    methods: HashMap<Symbol, NativeFn>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixnum arithmetic and comparisons plus `==`.
    pub fn with_core_methods() -> Self {
        let mut registry = Self::new();
        registry.register_fixnum_op("+", |a, b| Value::Fixnum(a.wrapping_add(b)));
        registry.register_fixnum_op("-", |a, b| Value::Fixnum(a.wrapping_sub(b)));
        registry.register_fixnum_op("*", |a, b| Value::Fixnum(a.wrapping_mul(b)));
        registry.register_fixnum_op("<", |a, b| Value::Bool(a < b));
        registry.register_fixnum_op(">", |a, b| Value::Bool(a > b));
        registry.register("==", |recv, args| match args {
            [other] => Ok(Value::Bool(recv == other)),
            _ => interp_bail!(format!("== expects 1 argument, got {}", args.len())),
        });
        registry.register("-@", |recv, _| match recv.as_fixnum() {
            Some(n) => Ok(Value::Fixnum(n.wrapping_neg())),
            None => interp_bail!(format!("cannot negate {}", recv)),
        });
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<Symbol>, method: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + 'static,
    {
        self.methods.insert(name.into(), Box::new(method));
    }

    fn register_fixnum_op(&mut self, name: &'static str, op: fn(i64, i64) -> Value) {
        self.register(name, move |recv, args| {
            interp_ensure!(args.len() == 1, format!("{} expects 1 argument", name));
            match (recv.as_fixnum(), args[0].as_fixnum()) {
                (Some(a), Some(b)) => Ok(op(a, b)),
                _ => interp_bail!(format!("{} {} {} is not fixnum arithmetic", recv, name, args[0])),
            }
        });
    }

    pub fn get(&self, name: &Symbol) -> Option<&NativeFn> {
        self.methods.get(name)
    }
}

enum Flow {
    Next,
    Jump(Label),
    Return(Value),
}

/// Direct IR interpreter.
///
/// Calls dispatch to a body of the attached program first, then to natives.
pub struct Interpreter<'a> {
    natives: &'a NativeRegistry,
    program: Option<&'a Program>,
}

impl<'a> Interpreter<'a> {
    pub fn new(natives: &'a NativeRegistry) -> Self {
        Self {
            natives,
            program: None,
        }
    }

    pub fn with_program(mut self, program: &'a Program) -> Self {
        self.program = Some(program);
        self
    }

    /// Execute `body` from its first block. Falling off the last block yields `nil`.
    pub fn run(&self, body: &Body, frame: &mut Frame) -> Result<Value> {
        self.run_at(body, frame, 0)
    }

    fn run_at(&self, body: &Body, frame: &mut Frame, depth: usize) -> Result<Value> {
        interp_ensure!(
            depth < MAX_CALL_DEPTH,
            format!("call depth exceeded in {}", body.name),
            "stack"
        );
        debug!("running {} at depth {}", body.name, depth);

        let mut index = 0;
        while let Some(block) = body.basic_blocks.get(index) {
            let mut next = index + 1;
            for instr in &block.instrs {
                match self.step(instr, frame, depth)? {
                    Flow::Next => {}
                    Flow::Jump(label) => {
                        next = body.block_index(label).ok_or_else(|| {
                            ConfigurationError::UndeclaredLabel {
                                label,
                                body: body.name.clone(),
                            }
                        })?;
                        break;
                    }
                    Flow::Return(value) => return Ok(value),
                }
            }
            index = next;
        }
        Ok(Value::Nil)
    }

    fn step(&self, instr: &Instr, frame: &mut Frame, depth: usize) -> Result<Flow> {
        trace!("exec {}", instr);
        match instr {
            Instr::Copy { result, source } => {
                let value = source.evaluate(&*frame)?;
                assign(frame, result, value)?;
            }
            Instr::ReceiveArg { result, index } => {
                let value = frame.arg(*index)?;
                assign(frame, result, value)?;
            }
            Instr::Call {
                result,
                receiver,
                method,
                args,
            } => {
                let receiver = receiver.evaluate(&*frame)?;
                let args = args
                    .iter()
                    .map(|arg| arg.evaluate(&*frame))
                    .collect::<Result<Vec<_>>>()?;
                let value = self.invoke(method, receiver, args, depth)?;
                if let Some(result) = result {
                    assign(frame, result, value)?;
                }
            }
            Instr::Return { value } => return Ok(Flow::Return(value.evaluate(&*frame)?)),
            Instr::Jump { target } => return Ok(Flow::Jump(*target)),
            Instr::Branch(branch) => {
                if branch_taken(branch, &*frame)? {
                    return Ok(Flow::Jump(branch.target()));
                }
            }
            Instr::Label(_) => {}
        }
        Ok(Flow::Next)
    }

    fn invoke(
        &self,
        method: &Symbol,
        receiver: Value,
        args: Vec<Value>,
        depth: usize,
    ) -> Result<Value> {
        if let Some(callee) = self.program.and_then(|program| program.get_body(method.as_str())) {
            trace!("call {}({}) -> body", method, args.iter().join(", "));
            let mut callee_frame = Frame::new(receiver, args);
            return self.run_at(callee, &mut callee_frame, depth + 1);
        }
        match self.natives.get(method) {
            Some(native) => {
                trace!("call {}({}) -> native", method, args.iter().join(", "));
                native(&receiver, args.as_slice())
            }
            None => Err(EvaluationError::UnknownMethod(method.clone()).into()),
        }
    }
}

fn assign(frame: &mut Frame, var: &Variable, value: Value) -> Result<()> {
    if *var == Variable::SelfRef {
        interp_bail!("cannot assign to %self");
    }
    frame.store(var, value);
    Ok(())
}

/// Evaluates each branch operand exactly once.
fn branch_taken(branch: &BranchInstr, frame: &Frame) -> Result<bool> {
    let lhs = branch.condition().evaluate(frame)?;
    match branch.kind() {
        BranchKind::True => Ok(lhs.is_truthy()),
        BranchKind::False => Ok(!lhs.is_truthy()),
        BranchKind::Eq | BranchKind::Ne => {
            let Some(rhs) = branch.compared() else {
                interp_bail!(format!("{} without a second operand", branch.kind().operation()));
            };
            let equal = lhs == rhs.evaluate(frame)?;
            Ok(equal == (branch.kind() == BranchKind::Eq))
        }
    }
}
