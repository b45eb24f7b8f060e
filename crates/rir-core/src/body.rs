//! Method bodies: the label arena, basic blocks and the linear-stream builder.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{ConfigurationError, Result};
use crate::ident::{Label, Symbol, TempId, Variable};
use crate::instr::Instr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelDecl {
    pub id: Label,
    pub name: String,
}

/// Straight-line run of instructions entered only through `label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub label: Label,
    pub instrs: Vec<Instr>,
}

impl BasicBlock {
    pub fn new(label: Label) -> Self {
        Self {
            label,
            instrs: Vec::new(),
        }
    }

    pub fn add_instruction(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    /// Labels this block can transfer control to explicitly.
    pub fn jump_targets(&self) -> impl Iterator<Item = Label> + '_ {
        self.instrs.iter().filter_map(Instr::jump_target)
    }

    /// Whether control can run past the last instruction into the next block.
    pub fn falls_through(&self) -> bool {
        !matches!(
            self.instrs.last(),
            Some(Instr::Jump { .. } | Instr::Return { .. })
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub name: Symbol,
    pub arg_count: u32,
    pub basic_blocks: Vec<BasicBlock>,
    labels: Vec<LabelDecl>,
    next_temporary: u32,
    next_inline_id: u32,
}

impl Body {
    pub fn new(name: impl Into<Symbol>, arg_count: u32) -> Self {
        Self {
            name: name.into(),
            arg_count,
            basic_blocks: Vec::new(),
            labels: Vec::new(),
            next_temporary: 0,
            next_inline_id: 0,
        }
    }

    pub fn new_label(&mut self) -> Label {
        let name = format!("_LBL_{}", self.labels.len());
        self.new_named_label(name)
    }

    pub fn new_named_label(&mut self, name: impl Into<String>) -> Label {
        let id = Label::new(self.labels.len() as u32);
        self.labels.push(LabelDecl {
            id,
            name: name.into(),
        });
        id
    }

    pub fn labels(&self) -> &[LabelDecl] {
        &self.labels
    }

    pub fn label_name(&self, label: Label) -> Option<&str> {
        self.labels
            .get(label.index() as usize)
            .map(|decl| decl.name.as_str())
    }

    pub fn new_temporary(&mut self) -> Variable {
        let id = TempId(self.next_temporary);
        self.next_temporary += 1;
        Variable::Temporary(id)
    }

    pub fn temporary_count(&self) -> u32 {
        self.next_temporary
    }

    /// Fresh id distinguishing the identifiers of one inlined call site.
    pub fn new_inline_id(&mut self) -> u32 {
        let id = self.next_inline_id;
        self.next_inline_id += 1;
        id
    }

    pub fn add_basic_block(&mut self, block: BasicBlock) {
        self.basic_blocks.push(block);
    }

    pub fn block_index(&self, label: Label) -> Option<usize> {
        self.basic_blocks.iter().position(|bb| bb.label == label)
    }

    pub fn get_basic_block(&self, label: Label) -> Option<&BasicBlock> {
        self.basic_blocks.iter().find(|bb| bb.label == label)
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instr> {
        self.basic_blocks.iter().flat_map(|bb| bb.instrs.iter())
    }

    /// Raise the temporary counter past every temporary this body already uses,
    /// so later `new_temporary` calls never collide with hand-numbered ones.
    pub fn sync_temporaries(&mut self) {
        let highest = self
            .instructions()
            .flat_map(|instr| {
                let mut vars = instr.used_variables();
                vars.extend(instr.result().cloned());
                vars
            })
            .filter_map(|var| match var {
                Variable::Temporary(TempId(id)) => Some(id),
                _ => None,
            })
            .max();
        if let Some(id) = highest {
            self.next_temporary = self.next_temporary.max(id + 1);
        }
    }

    /// Check that block labels are unique, every jump target starts a block of
    /// this body and control transfers only end blocks.
    pub fn verify(&self) -> Result<()> {
        let mut starts = HashSet::new();
        for block in &self.basic_blocks {
            ensure_config!(
                starts.insert(block.label),
                ConfigurationError::DuplicateLabel(block.label)
            );
        }
        for block in &self.basic_blocks {
            let len = block.instrs.len();
            for (index, instr) in block.instrs.iter().enumerate() {
                ensure_config!(
                    index + 1 == len || !instr.operation().transfers_control(),
                    ConfigurationError::MisplacedTransfer {
                        label: block.label,
                        body: self.name.clone(),
                    }
                );
            }
            for target in block.jump_targets() {
                ensure_config!(
                    starts.contains(&target),
                    ConfigurationError::UndeclaredLabel {
                        label: target,
                        body: self.name.clone(),
                    }
                );
            }
        }
        Ok(())
    }
}

/// Front-end facing builder that turns a linear instruction stream into blocks.
pub struct BodyBuilder {
    body: Body,
    stream: Vec<Instr>,
}

impl BodyBuilder {
    pub fn new(name: impl Into<Symbol>, arg_count: u32) -> Self {
        Self {
            body: Body::new(name, arg_count),
            stream: Vec::new(),
        }
    }

    pub fn new_label(&mut self) -> Label {
        self.body.new_label()
    }

    pub fn new_temporary(&mut self) -> Variable {
        self.body.new_temporary()
    }

    pub fn emit(&mut self, instr: Instr) -> &mut Self {
        self.stream.push(instr);
        self
    }

    /// Place `label` at the current position of the stream.
    pub fn place(&mut self, label: Label) -> &mut Self {
        self.emit(Instr::Label(label))
    }

    /// Split the stream into basic blocks and verify the targets.
    ///
    /// A block starts at every `Label` marker and after every control
    /// transfer; fall-through blocks without a marker get a fresh label.
    pub fn finish(self) -> Result<Body> {
        let BodyBuilder { mut body, stream } = self;
        let mut current: Option<BasicBlock> = None;

        for instr in stream {
            match instr {
                Instr::Label(label) => {
                    if let Some(block) = current.take() {
                        body.add_basic_block(block);
                    }
                    current = Some(BasicBlock::new(label));
                }
                instr => {
                    let ends_block = instr.operation().transfers_control();
                    let block = current.get_or_insert_with(|| {
                        let label = body.new_label();
                        trace!("{}: opening implicit block {}", body.name, label);
                        BasicBlock::new(label)
                    });
                    block.add_instruction(instr);
                    if ends_block {
                        if let Some(block) = current.take() {
                            body.add_basic_block(block);
                        }
                    }
                }
            }
        }
        if let Some(block) = current.take() {
            body.add_basic_block(block);
        }
        if body.basic_blocks.is_empty() {
            let label = body.new_label();
            body.add_basic_block(BasicBlock::new(label));
        }

        debug!(
            "built body {} with {} blocks and {} labels",
            body.name,
            body.basic_blocks.len(),
            body.labels.len()
        );
        body.sync_temporaries();
        body.verify()?;
        Ok(body)
    }
}

/// A compilation unit: the bodies handed to the code generator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub bodies: Vec<Body>,
    pub entry: Option<Symbol>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_body(&mut self, body: Body) {
        self.bodies.push(body);
    }

    pub fn get_body(&self, name: &str) -> Option<&Body> {
        self.bodies.iter().find(|body| body.name == name)
    }
}
