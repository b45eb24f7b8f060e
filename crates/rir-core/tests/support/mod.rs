#![allow(dead_code)]

use std::collections::HashMap;

use rir_core::error::{ConfigurationError, Result};
use rir_core::{Address, CodegenContext, Label, Literal, RenameContext, ScopeHandle, Symbol, Variable};

/// One primitive call observed by the recorder.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Push(Literal),
    Load(Variable),
    Scope(ScopeHandle),
    BuildArray(u32),
    Store(Variable),
    ReceiveArg(u32),
    Invoke(Symbol, u32),
    Discard,
    TruthinessTest,
    EqualityTest,
    Jump(Address),
    JumpIfTrue(Address),
    JumpIfFalse(Address),
    Return,
}

/// Code generation context that records primitives instead of encoding them.
#[derive(Default)]
pub struct Recorder {
    labels: HashMap<Label, Address>,
    pub events: Vec<Event>,
}

impl Recorder {
    pub fn with_label(mut self, label: Label, address: u32) -> Self {
        self.labels.insert(label, Address(address));
        self
    }
}

impl CodegenContext for Recorder {
    fn resolve_label(&self, label: Label) -> Result<Address> {
        self.labels
            .get(&label)
            .copied()
            .ok_or_else(|| ConfigurationError::UnregisteredLabel(label).into())
    }

    fn push_literal(&mut self, literal: &Literal) -> Result<()> {
        self.events.push(Event::Push(literal.clone()));
        Ok(())
    }

    fn load_variable(&mut self, var: &Variable) -> Result<()> {
        self.events.push(Event::Load(var.clone()));
        Ok(())
    }

    fn load_scope(&mut self, handle: ScopeHandle) -> Result<()> {
        self.events.push(Event::Scope(handle));
        Ok(())
    }

    fn build_array(&mut self, len: u32) -> Result<()> {
        self.events.push(Event::BuildArray(len));
        Ok(())
    }

    fn store_variable(&mut self, var: &Variable) -> Result<()> {
        self.events.push(Event::Store(var.clone()));
        Ok(())
    }

    fn receive_arg(&mut self, index: u32) -> Result<()> {
        self.events.push(Event::ReceiveArg(index));
        Ok(())
    }

    fn invoke(&mut self, method: &Symbol, argc: u32) -> Result<()> {
        self.events.push(Event::Invoke(method.clone(), argc));
        Ok(())
    }

    fn discard(&mut self) -> Result<()> {
        self.events.push(Event::Discard);
        Ok(())
    }

    fn truthiness_test(&mut self) -> Result<()> {
        self.events.push(Event::TruthinessTest);
        Ok(())
    }

    fn equality_test(&mut self) -> Result<()> {
        self.events.push(Event::EqualityTest);
        Ok(())
    }

    fn emit_jump(&mut self, address: Address) -> Result<()> {
        self.events.push(Event::Jump(address));
        Ok(())
    }

    fn emit_jump_if_true(&mut self, address: Address) -> Result<()> {
        self.events.push(Event::JumpIfTrue(address));
        Ok(())
    }

    fn emit_jump_if_false(&mut self, address: Address) -> Result<()> {
        self.events.push(Event::JumpIfFalse(address));
        Ok(())
    }

    fn emit_return(&mut self) -> Result<()> {
        self.events.push(Event::Return);
        Ok(())
    }
}

/// Rename context backed by two explicit maps.
#[derive(Default)]
pub struct MapRename {
    vars: HashMap<Variable, Variable>,
    labels: HashMap<Label, Label>,
}

impl MapRename {
    pub fn var(mut self, from: Variable, to: Variable) -> Self {
        self.vars.insert(from, to);
        self
    }

    pub fn label(mut self, from: Label, to: Label) -> Self {
        self.labels.insert(from, to);
        self
    }
}

impl RenameContext for MapRename {
    fn renamed_variable(&self, var: &Variable) -> Result<Variable> {
        self.vars
            .get(var)
            .cloned()
            .ok_or_else(|| ConfigurationError::MissingVariableRename(var.clone()).into())
    }

    fn renamed_label(&self, label: Label) -> Result<Label> {
        self.labels
            .get(&label)
            .copied()
            .ok_or_else(|| ConfigurationError::MissingLabelRename(label).into())
    }
}
