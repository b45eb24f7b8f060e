//! Procedure inlining.
//!
//! [`InlinerInfo`] is the rename context: it maps every callee variable and
//! label to a fresh caller identifier. [`Inliner`] clones the callee through it
//! and splices the copy over a call site. Which call sites get inlined is
//! decided by an [`InlinePolicy`].

use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;
use rir_core::config;
use rir_core::error::{ConfigurationError, Result};
use rir_core::{BasicBlock, Body, Instr, Label, Operand, Program, RenameContext, Variable};
use tracing::{debug, trace};

use crate::utils::OptimizePass;
use crate::{opt_bail, opt_ensure};

#[derive(Debug, Clone, Default)]
pub struct InlinerInfo {
    variables: HashMap<Variable, Variable>,
    labels: HashMap<Label, Label>,
}

impl InlinerInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_variable(&mut self, callee: Variable, caller: Variable) -> &mut Self {
        self.variables.insert(callee, caller);
        self
    }

    pub fn insert_label(&mut self, callee: Label, caller: Label) -> &mut Self {
        self.labels.insert(callee, caller);
        self
    }

    /// Total rename map for `callee`, allocating fresh identifiers in `caller`.
    ///
    /// Locals become `%in<id>_<name>`, temporaries and `self` become fresh
    /// caller temporaries, labels become fresh caller labels.
    pub fn for_callee(callee: &Body, caller: &mut Body) -> Self {
        caller.sync_temporaries();
        let inline_id = caller.new_inline_id();
        let mut info = Self::new();

        let mut vars = BTreeSet::from([Variable::SelfRef]);
        for instr in callee.instructions() {
            instr.collect_used_variables(&mut vars);
            vars.extend(instr.result().cloned());
        }
        for var in vars {
            let renamed = match &var {
                Variable::Local(name) => Variable::local(format!("%in{}_{}", inline_id, name)),
                Variable::Temporary(_) | Variable::SelfRef => caller.new_temporary(),
            };
            info.insert_variable(var, renamed);
        }
        for decl in callee.labels() {
            let renamed = caller.new_label();
            info.insert_label(decl.id, renamed);
        }

        trace!(
            "rename map for {} in {}: {}",
            callee.name,
            caller.name,
            info.variables
                .iter()
                .map(|(from, to)| format!("{} -> {}", from, to))
                .sorted()
                .join(", ")
        );
        info
    }

    /// Caller temporary standing for the callee's `self`.
    pub fn receiver(&self) -> Result<Variable> {
        self.renamed_variable(&Variable::SelfRef)
    }
}

impl RenameContext for InlinerInfo {
    fn renamed_variable(&self, var: &Variable) -> Result<Variable> {
        self.variables
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

pub struct Inliner;

impl Inliner {
    /// Structurally identical copy of `callee`'s blocks with every variable
    /// and label renamed through `ctx`. `callee` is not modified.
    pub fn clone_body<R: RenameContext + ?Sized>(
        callee: &Body,
        ctx: &R,
    ) -> Result<Vec<BasicBlock>> {
        callee
            .basic_blocks
            .iter()
            .map(|block| {
                let instrs = block
                    .instrs
                    .iter()
                    .map(|instr| instr.clone_for_inlining(ctx))
                    .collect::<Result<Vec<_>>>()?;
                Ok(BasicBlock {
                    label: ctx.renamed_label(block.label)?,
                    instrs,
                })
            })
            .collect()
    }

    /// Replace the call at `caller.basic_blocks[block].instrs[index]` with a
    /// renamed copy of `callee`.
    ///
    /// The call block keeps everything before the call plus the bindings of
    /// the receiver and arguments; the callee blocks follow it and every
    /// return copies into the call result and jumps to a fresh continuation
    /// block holding the rest of the original block. Returns the index of that
    /// continuation block.
    pub fn inline_call(
        caller: &mut Body,
        block: usize,
        index: usize,
        callee: &Body,
    ) -> Result<usize> {
        let Some(call) = caller
            .basic_blocks
            .get(block)
            .and_then(|bb| bb.instrs.get(index))
            .cloned()
        else {
            opt_bail!(format!(
                "no instruction at {}:{} in {}",
                block, index, caller.name
            ));
        };
        let (result, receiver, method, args) = match call {
            Instr::Call {
                result,
                receiver,
                method,
                args,
            } => (result, receiver, method, args),
            other => opt_bail!(format!("cannot inline {} (not a call)", other)),
        };
        opt_ensure!(
            args.len() as u32 == callee.arg_count,
            format!(
                "{} takes {} arguments but the call passes {}",
                callee.name,
                callee.arg_count,
                args.len()
            ),
            "arity"
        );

        let info = InlinerInfo::for_callee(callee, caller);
        let cloned = Inliner::clone_body(callee, &info)?;
        let continuation = caller.new_label();

        // arguments are evaluated once, at the call, like a real invocation
        let mut prologue = vec![Instr::copy(info.receiver()?, receiver)];
        let mut arg_vars = Vec::with_capacity(args.len());
        for arg in args {
            let var = caller.new_temporary();
            prologue.push(Instr::copy(var.clone(), arg));
            arg_vars.push(var);
        }

        let mut inlined = Vec::with_capacity(cloned.len() + 2);
        let falls_off = cloned.last().map_or(true, BasicBlock::falls_through);
        for bb in cloned {
            let mut out = BasicBlock::new(bb.label);
            for instr in bb.instrs {
                lower_inlined(instr, &arg_vars, result.as_ref(), continuation, &mut out)?;
            }
            inlined.push(out);
        }
        if falls_off {
            // implicit `return nil` in its own block so a trailing branch still ends its block
            let mut implicit = BasicBlock::new(caller.new_label());
            lower_inlined(
                Instr::ret(Operand::nil()),
                &arg_vars,
                result.as_ref(),
                continuation,
                &mut implicit,
            )?;
            inlined.push(implicit);
        }

        let call_block = &mut caller.basic_blocks[block];
        let tail = call_block.instrs.split_off(index + 1);
        call_block.instrs.pop();
        call_block.instrs.extend(prologue);

        let mut continuation_block = BasicBlock::new(continuation);
        continuation_block.instrs = tail;
        inlined.push(continuation_block);

        let inserted = inlined.len();
        let rest = caller.basic_blocks.split_off(block + 1);
        caller.basic_blocks.extend(inlined);
        caller.basic_blocks.extend(rest);

        debug!(
            "inlined {} ({} blocks) into {} at {}:{}",
            method,
            inserted - 1,
            caller.name,
            block,
            index
        );
        if config::verify_mode() {
            caller.verify()?;
        }
        Ok(block + inserted)
    }
}

/// Rewrite the callee's entry and exit instructions for their new position.
fn lower_inlined(
    instr: Instr,
    args: &[Variable],
    result: Option<&Variable>,
    continuation: Label,
    out: &mut BasicBlock,
) -> Result<()> {
    match instr {
        Instr::ReceiveArg { result: var, index } => {
            let Some(arg) = args.get(index as usize) else {
                opt_bail!(format!("argument {} is not passed by the call", index));
            };
            out.add_instruction(Instr::copy(var, arg.clone()));
        }
        Instr::Return { value } => {
            if let Some(result) = result {
                out.add_instruction(Instr::copy(result.clone(), value));
            }
            out.add_instruction(Instr::jump(continuation));
        }
        instr => out.add_instruction(instr),
    }
    Ok(())
}

/// Decides which call sites get inlined.
pub trait InlinePolicy {
    fn should_inline(&self, caller: &Body, call: &Instr, callee: &Body) -> bool;
}

impl<F> InlinePolicy for F
where
    F: Fn(&Body, &Instr, &Body) -> bool,
{
    fn should_inline(&self, caller: &Body, call: &Instr, callee: &Body) -> bool {
        self(caller, call, callee)
    }
}

/// Inline callees with at most `max_instructions` instructions.
#[derive(Debug, Clone, Copy)]
pub struct SmallBodies {
    pub max_instructions: usize,
}

impl InlinePolicy for SmallBodies {
    fn should_inline(&self, _caller: &Body, _call: &Instr, callee: &Body) -> bool {
        callee.instructions().count() <= self.max_instructions
    }
}

pub struct InlinePass {
    policy: Box<dyn InlinePolicy>,
}

impl InlinePass {
    pub fn new(policy: impl InlinePolicy + 'static) -> Self {
        Self {
            policy: Box::new(policy),
        }
    }

    /// Inline eligible calls of `body` against callees from `program`.
    ///
    /// Code spliced in by this pass is not scanned again, so recursion
    /// through other bodies stays bounded.
    pub fn inline_body(&self, body: &mut Body, program: &Program) -> Result<usize> {
        let mut inlined = 0;
        let mut block = 0;
        'blocks: while block < body.basic_blocks.len() {
            for index in 0..body.basic_blocks[block].instrs.len() {
                let instr = &body.basic_blocks[block].instrs[index];
                let Instr::Call { method, .. } = instr else {
                    continue;
                };
                let Some(callee) = program.get_body(method.as_str()) else {
                    continue;
                };
                if callee.name == body.name {
                    trace!("{}: not inlining recursive call", body.name);
                    continue;
                }
                if !self.policy.should_inline(body, instr, callee) {
                    trace!("{}: policy declined {}", body.name, method);
                    continue;
                }
                block = Inliner::inline_call(body, block, index, callee)?;
                inlined += 1;
                continue 'blocks;
            }
            block += 1;
        }
        Ok(inlined)
    }
}

impl OptimizePass for InlinePass {
    fn name(&self) -> &str {
        "inline"
    }

    fn optimize_body(&self, mut body: Body, program: &Program) -> Result<Body> {
        let count = self.inline_body(&mut body, program)?;
        if count > 0 {
            debug!("{}: inlined {} call sites", body.name, count);
        }
        Ok(body)
    }
}
