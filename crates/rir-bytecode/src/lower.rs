use std::collections::HashMap;

use rir_core::config;
use rir_core::error::Result as IrResult;
use rir_core::pretty::{pretty, PrettyOptions};
use rir_core::{
    bail, Address, Body, CodegenContext, Label, Literal, Program, ScopeHandle, Symbol, Variable,
};
use tracing::debug;

use crate::labels::LabelTable;
use crate::{
    block_summary, BytecodeBlock, BytecodeConst, BytecodeError, BytecodeFunction, BytecodeInstr,
    BytecodeProgram,
};

/// Lower every body of `program` into one bytecode program sharing a constant pool.
pub fn lower_program(program: &Program) -> Result<BytecodeProgram, BytecodeError> {
    let mut const_pool = Vec::new();
    let mut functions = Vec::with_capacity(program.bodies.len());
    for body in &program.bodies {
        functions.push(lower_body(body, &mut const_pool)?);
    }

    let entry = match &program.entry {
        Some(name) if program.get_body(name.as_str()).is_none() => {
            return Err(BytecodeError::Lowering {
                message: format!("entry body {} not found", name),
            });
        }
        Some(name) => Some(name.to_string()),
        None => None,
    };

    Ok(BytecodeProgram {
        const_pool,
        functions,
        entry,
    })
}

pub fn lower_body(
    body: &Body,
    const_pool: &mut Vec<BytecodeConst>,
) -> Result<BytecodeFunction, BytecodeError> {
    if config::dump_ir() {
        debug!("lowering\n{}", pretty(body, PrettyOptions::default()));
    }
    if config::verify_mode() {
        body.verify()?;
    }

    // every label gets its address before the first instruction is emitted
    let labels = LabelTable::collect(body)?;
    let mut emitter = FunctionEmitter::new(&labels, const_pool);

    let last = body.basic_blocks.len().saturating_sub(1);
    for (ordinal, block) in body.basic_blocks.iter().enumerate() {
        for instr in &block.instrs {
            instr.compile(&mut emitter)?;
        }
        if ordinal == last && block.falls_through() {
            emitter.push_literal(&Literal::Nil)?;
            emitter.emit_return()?;
        }
        emitter.finish_block(ordinal as u32);
    }

    let function = emitter.into_function(body);
    debug!(
        "lowered {} with {} locals: {}",
        function.name,
        function.locals,
        block_summary(&function)
    );
    Ok(function)
}

/// Stack-bytecode target for [`CodegenContext`].
///
/// Locals and temporaries share one slot space, numbered in order of first use.
pub struct FunctionEmitter<'a> {
    labels: &'a LabelTable,
    const_pool: &'a mut Vec<BytecodeConst>,
    slots: HashMap<Variable, u32>,
    blocks: Vec<BytecodeBlock>,
    code: Vec<BytecodeInstr>,
}

impl<'a> FunctionEmitter<'a> {
    pub fn new(labels: &'a LabelTable, const_pool: &'a mut Vec<BytecodeConst>) -> Self {
        Self {
            labels,
            const_pool,
            slots: HashMap::new(),
            blocks: Vec::new(),
            code: Vec::new(),
        }
    }

    pub fn code(&self) -> &[BytecodeInstr] {
        &self.code
    }

    /// Close the block under construction.
    pub fn finish_block(&mut self, id: u32) {
        let code = std::mem::take(&mut self.code);
        self.blocks.push(BytecodeBlock { id, code });
    }

    fn into_function(self, body: &Body) -> BytecodeFunction {
        BytecodeFunction {
            name: body.name.to_string(),
            params: body.arg_count,
            locals: self.slots.len() as u32,
            blocks: self.blocks,
        }
    }

    fn slot(&mut self, var: &Variable) -> u32 {
        let next = self.slots.len() as u32;
        *self.slots.entry(var.clone()).or_insert(next)
    }

    fn intern(&mut self, constant: BytecodeConst) -> u32 {
        match self
            .const_pool
            .iter()
            .position(|existing| same_constant(existing, &constant))
        {
            Some(index) => index as u32,
            None => {
                self.const_pool.push(constant);
                (self.const_pool.len() - 1) as u32
            }
        }
    }

    fn push(&mut self, instr: BytecodeInstr) -> IrResult<()> {
        self.code.push(instr);
        Ok(())
    }
}

impl CodegenContext for FunctionEmitter<'_> {
    fn resolve_label(&self, label: Label) -> IrResult<Address> {
        self.labels.resolve(label)
    }

    fn push_literal(&mut self, literal: &Literal) -> IrResult<()> {
        let id = self.intern(lower_literal(literal));
        self.push(BytecodeInstr::LoadConst(id))
    }

    fn load_variable(&mut self, var: &Variable) -> IrResult<()> {
        match var {
            Variable::SelfRef => self.push(BytecodeInstr::LoadSelf),
            _ => {
                let slot = self.slot(var);
                self.push(BytecodeInstr::LoadLocal(slot))
            }
        }
    }

    fn load_scope(&mut self, handle: ScopeHandle) -> IrResult<()> {
        match handle {
            ScopeHandle::CurrentScope => self.push(BytecodeInstr::LoadStaticScope),
            ScopeHandle::CurrentDynamicScope => self.push(BytecodeInstr::LoadDynamicScope),
        }
    }

    fn build_array(&mut self, len: u32) -> IrResult<()> {
        self.push(BytecodeInstr::MakeArray(len))
    }

    fn store_variable(&mut self, var: &Variable) -> IrResult<()> {
        if *var == Variable::SelfRef {
            bail!("cannot assign to {}", var);
        }
        let slot = self.slot(var);
        self.push(BytecodeInstr::StoreLocal(slot))
    }

    fn receive_arg(&mut self, index: u32) -> IrResult<()> {
        self.push(BytecodeInstr::LoadArg(index))
    }

    fn invoke(&mut self, method: &Symbol, argc: u32) -> IrResult<()> {
        self.push(BytecodeInstr::Call {
            method: method.to_string(),
            argc,
        })
    }

    fn discard(&mut self) -> IrResult<()> {
        self.push(BytecodeInstr::Pop)
    }

    fn truthiness_test(&mut self) -> IrResult<()> {
        self.push(BytecodeInstr::IsTrue)
    }

    fn equality_test(&mut self) -> IrResult<()> {
        self.push(BytecodeInstr::Equal)
    }

    fn emit_jump(&mut self, address: Address) -> IrResult<()> {
        self.push(BytecodeInstr::Jump(address.0))
    }

    fn emit_jump_if_true(&mut self, address: Address) -> IrResult<()> {
        self.push(BytecodeInstr::JumpIfTrue(address.0))
    }

    fn emit_jump_if_false(&mut self, address: Address) -> IrResult<()> {
        self.push(BytecodeInstr::JumpIfFalse(address.0))
    }

    fn emit_return(&mut self) -> IrResult<()> {
        self.push(BytecodeInstr::Return)
    }
}

/// Pool identity: floats match bitwise so `-0.0` stays apart from `0.0` and NaN dedups.
fn same_constant(a: &BytecodeConst, b: &BytecodeConst) -> bool {
    match (a, b) {
        (BytecodeConst::Float(a), BytecodeConst::Float(b)) => a.to_bits() == b.to_bits(),
        _ => a == b,
    }
}

fn lower_literal(literal: &Literal) -> BytecodeConst {
    match literal {
        Literal::Nil => BytecodeConst::Nil,
        Literal::Bool(value) => BytecodeConst::Bool(*value),
        Literal::Fixnum(value) => BytecodeConst::Int(*value),
        Literal::Float(value) => BytecodeConst::Float(*value),
        Literal::Str(value) => BytecodeConst::Str(value.clone()),
        Literal::Symbol(name) => BytecodeConst::Symbol(name.to_string()),
    }
}
