use rir_core::config;
use rir_core::error::Result;
use rir_core::pretty::{pretty, PrettyOptions};
use rir_core::Program;
use tracing::debug;

use crate::utils::OptimizePass;

/// Runs passes over a program in registration order.
#[derive(Default)]
pub struct Optimizer {
    passes: Vec<Box<dyn OptimizePass>>,
}

impl Optimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pass(&mut self, pass: impl OptimizePass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    pub fn optimize(&self, mut program: Program) -> Result<Program> {
        for pass in &self.passes {
            debug!("running pass {}", pass.name());
            program = pass.optimize_program(program)?;
            if config::dump_ir() {
                debug!(
                    "after {}:\n{}",
                    pass.name(),
                    pretty(&program, PrettyOptions::default())
                );
            }
            if config::verify_mode() {
                for body in &program.bodies {
                    body.verify()?;
                }
            }
        }
        Ok(program)
    }
}
