//! Block-structured stack bytecode produced from IR bodies.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod labels;
mod lower;

pub use labels::{LabelTable, LabelTableBuilder};
pub use lower::{lower_body, lower_program, FunctionEmitter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BytecodeProgram {
    pub const_pool: Vec<BytecodeConst>,
    pub functions: Vec<BytecodeFunction>,
    pub entry: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BytecodeFunction {
    pub name: String,
    pub params: u32,
    pub locals: u32,
    pub blocks: Vec<BytecodeBlock>,
}

/// Blocks without a trailing transfer fall through to the next block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BytecodeBlock {
    pub id: u32,
    pub code: Vec<BytecodeInstr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BytecodeInstr {
    LoadConst(u32),
    LoadLocal(u32),
    StoreLocal(u32),
    LoadSelf,
    LoadArg(u32),
    LoadStaticScope,
    LoadDynamicScope,
    MakeArray(u32),
    /// Pops the receiver and `argc` arguments, pushes the result.
    Call { method: String, argc: u32 },
    Pop,
    IsTrue,
    Equal,
    Jump(u32),
    JumpIfTrue(u32),
    JumpIfFalse(u32),
    Return,
}

impl BytecodeInstr {
    pub fn jump_target(&self) -> Option<u32> {
        match self {
            BytecodeInstr::Jump(target)
            | BytecodeInstr::JumpIfTrue(target)
            | BytecodeInstr::JumpIfFalse(target) => Some(*target),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BytecodeConst {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Symbol(String),
}

#[derive(Debug, Error)]
pub enum BytecodeError {
    #[error(transparent)]
    Ir(#[from] rir_core::Error),
    #[error("bytecode lowering failed: {message}")]
    Lowering { message: String },
    #[error("bytecode format error: {message}")]
    Format { message: String },
}

fn format_error(message: impl Into<String>) -> BytecodeError {
    BytecodeError::Format {
        message: message.into(),
    }
}

/// Check pool ids, local slots, argument indexes and jump targets against their tables.
pub fn validate_program(program: &BytecodeProgram) -> Result<(), BytecodeError> {
    if let Some(entry) = &program.entry {
        if !program.functions.iter().any(|func| &func.name == entry) {
            return Err(format_error(format!("entry function {} not found", entry)));
        }
    }
    for function in &program.functions {
        validate_function(function, program.const_pool.len())?;
    }
    Ok(())
}

fn validate_function(
    function: &BytecodeFunction,
    const_pool_len: usize,
) -> Result<(), BytecodeError> {
    if function.blocks.is_empty() {
        return Err(format_error(format!(
            "function {} has no blocks",
            function.name
        )));
    }
    for (expected, block) in function.blocks.iter().enumerate() {
        if block.id != expected as u32 {
            return Err(format_error(format!(
                "function {} has block id {} at position {}",
                function.name, block.id, expected
            )));
        }
    }
    let block_count = function.blocks.len() as u32;
    for block in &function.blocks {
        for instr in &block.code {
            validate_instr(function, instr, const_pool_len, block_count)?;
        }
    }
    Ok(())
}

fn validate_instr(
    function: &BytecodeFunction,
    instr: &BytecodeInstr,
    const_pool_len: usize,
    block_count: u32,
) -> Result<(), BytecodeError> {
    match instr {
        BytecodeInstr::LoadConst(id) if (*id as usize) >= const_pool_len => {
            Err(format_error(format!("const id {} out of bounds", id)))
        }
        BytecodeInstr::LoadLocal(local) | BytecodeInstr::StoreLocal(local)
            if *local >= function.locals =>
        {
            Err(format_error(format!(
                "local {} out of bounds in {}",
                local, function.name
            )))
        }
        BytecodeInstr::LoadArg(index) if *index >= function.params => Err(format_error(format!(
            "argument {} out of bounds in {}",
            index, function.name
        ))),
        _ => match instr.jump_target() {
            Some(target) if target >= block_count => Err(format_error(format!(
                "jump target bb{} missing in {}",
                target, function.name
            ))),
            _ => Ok(()),
        },
    }
}

pub fn format_program(program: &BytecodeProgram) -> String {
    let mut output = String::new();
    output.push_str("rir-bytecode {\n");
    output.push_str("  const_pool:\n");
    for (index, constant) in program.const_pool.iter().enumerate() {
        output.push_str(&format!("    [{}] {}\n", index, format_const(constant)));
    }
    output.push_str("  functions:\n");
    for function in &program.functions {
        output.push_str(&format!(
            "    fn {}(params: {}, locals: {})\n",
            function.name, function.params, function.locals
        ));
        for block in &function.blocks {
            output.push_str(&format!("      bb{}:\n", block.id));
            for instr in &block.code {
                output.push_str(&format!("        {}\n", format_instr(instr)));
            }
        }
    }
    if let Some(entry) = &program.entry {
        output.push_str(&format!("  entry: {}\n", entry));
    }
    output.push_str("}\n");
    output
}

fn format_const(value: &BytecodeConst) -> String {
    match value {
        BytecodeConst::Nil => "nil".to_string(),
        BytecodeConst::Bool(value) => value.to_string(),
        BytecodeConst::Int(value) => value.to_string(),
        BytecodeConst::Float(value) => format!("{:?}", value),
        BytecodeConst::Str(value) => format!("{:?}", value),
        BytecodeConst::Symbol(name) => format!(":{}", name),
    }
}

fn format_instr(instr: &BytecodeInstr) -> String {
    match instr {
        BytecodeInstr::LoadConst(id) => format!("load.const {}", id),
        BytecodeInstr::LoadLocal(id) => format!("load.local {}", id),
        BytecodeInstr::StoreLocal(id) => format!("store.local {}", id),
        BytecodeInstr::LoadSelf => "load.self".to_string(),
        BytecodeInstr::LoadArg(index) => format!("load.arg {}", index),
        BytecodeInstr::LoadStaticScope => "load.scope static".to_string(),
        BytecodeInstr::LoadDynamicScope => "load.scope dynamic".to_string(),
        BytecodeInstr::MakeArray(count) => format!("make.array {}", count),
        BytecodeInstr::Call { method, argc } => format!("call {} {}", method, argc),
        BytecodeInstr::Pop => "pop".to_string(),
        BytecodeInstr::IsTrue => "is_true".to_string(),
        BytecodeInstr::Equal => "equal".to_string(),
        BytecodeInstr::Jump(target) => format!("jump bb{}", target),
        BytecodeInstr::JumpIfTrue(target) => format!("jump_if_true bb{}", target),
        BytecodeInstr::JumpIfFalse(target) => format!("jump_if_false bb{}", target),
        BytecodeInstr::Return => "return".to_string(),
    }
}

/// One-line summary of a function's block layout, used in lowering logs.
pub fn block_summary(function: &BytecodeFunction) -> String {
    function
        .blocks
        .iter()
        .map(|block| format!("bb{}[{}]", block.id, block.code.len()))
        .join(" ")
}
