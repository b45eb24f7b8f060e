//! Label-to-address table built in a pre-pass before any instruction is emitted.

use std::collections::HashMap;

use rir_core::error::{ConfigurationError, Result};
use tracing::trace;
use rir_core::{Address, Body, Label};

/// Single writer for a [`LabelTable`]. Consumed by [`LabelTableBuilder::build`],
/// so nothing can register a label once resolution has started.
#[derive(Debug, Default)]
pub struct LabelTableBuilder {
    entries: HashMap<Label, Address>,
}

impl LabelTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, label: Label, address: Address) -> Result<()> {
        if self.entries.insert(label, address).is_some() {
            return Err(ConfigurationError::DuplicateLabel(label).into());
        }
        trace!("registered {} at {}", label, address);
        Ok(())
    }

    pub fn build(self) -> LabelTable {
        LabelTable {
            entries: self.entries,
        }
    }
}

/// Read-only view of every label of a body and the address it starts at.
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    entries: HashMap<Label, Address>,
}

impl LabelTable {
    /// Assign each block's label its ordinal within `body`.
    pub fn collect(body: &Body) -> Result<Self> {
        let mut builder = LabelTableBuilder::new();
        for (ordinal, block) in body.basic_blocks.iter().enumerate() {
            builder.register(block.label, Address(ordinal as u32))?;
        }
        Ok(builder.build())
    }

    pub fn resolve(&self, label: Label) -> Result<Address> {
        self.entries
            .get(&label)
            .copied()
            .ok_or_else(|| ConfigurationError::UnregisteredLabel(label).into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
