// OptimizePass trait - interface for optimization passes

use rir_core::error::Result;
use rir_core::{Body, Program};

#[allow(unused_variables)]
pub trait OptimizePass {
    fn name(&self) -> &str;

    /// `program` is the unit as it was before this pass touched any body.
    fn optimize_body(&self, body: Body, program: &Program) -> Result<Body> {
        Ok(body)
    }

    fn optimize_program(&self, program: Program) -> Result<Program> {
        let snapshot = program.clone();
        let Program { bodies, entry } = program;
        let bodies = bodies
            .into_iter()
            .map(|body| self.optimize_body(body, &snapshot))
            .collect::<Result<Vec<_>>>()?;
        Ok(Program { bodies, entry })
    }
}

pub struct NoopPass;

impl OptimizePass for NoopPass {
    fn name(&self) -> &str {
        "noop"
    }
}
