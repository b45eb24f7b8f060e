use pretty_assertions::assert_eq;
use rir_core::error::{ConfigurationError, Result};
use rir_core::{
    BasicBlock, Body, BodyBuilder, Error, Instr, Label, Operand, Program, RenameContext, Value,
    Variable,
};
use rir_interpret::{Frame, Interpreter, NativeRegistry};
use rir_optimize::{
    InlinePass, Inliner, InlinerInfo, NoopPass, OptimizePass, Optimizer, SmallBodies,
};

/// `def abs(x); x < 0 ? -x : x; end`
fn abs_body() -> Result<Body> {
    let mut builder = BodyBuilder::new("abs", 1);
    let x = Variable::local("x");
    let negative = builder.new_label();
    let cond = builder.new_temporary();
    builder
        .emit(Instr::receive_arg(x.clone(), 0))
        .emit(Instr::call(Some(cond.clone()), x.clone(), "<", vec![Operand::fixnum(0)]))
        .emit(Instr::b_true(cond, negative))
        .emit(Instr::ret(x.clone()))
        .place(negative)
        .emit(Instr::call(Some(x.clone()), x.clone(), "-@", vec![]))
        .emit(Instr::ret(x));
    builder.finish()
}

/// `def main(a); x = abs(a); y = abs(x - 10); x + y; end`
fn main_body() -> Result<Body> {
    let mut builder = BodyBuilder::new("main", 1);
    let (a, x, y) = (Variable::local("a"), Variable::local("x"), Variable::local("y"));
    let t0 = builder.new_temporary();
    let t1 = builder.new_temporary();
    builder
        .emit(Instr::receive_arg(a.clone(), 0))
        .emit(Instr::call(Some(x.clone()), Variable::SelfRef, "abs", vec![a.into()]))
        .emit(Instr::call(Some(t0.clone()), x.clone(), "-", vec![Operand::fixnum(10)]))
        .emit(Instr::call(Some(y.clone()), Variable::SelfRef, "abs", vec![t0.into()]))
        .emit(Instr::call(Some(t1.clone()), x, "+", vec![y.into()]))
        .emit(Instr::ret(t1));
    builder.finish()
}

fn program() -> Result<Program> {
    let mut program = Program::new();
    program.add_body(abs_body()?);
    program.add_body(main_body()?);
    program.entry = Some("main".into());
    Ok(program)
}

fn run_body(program: &Program, name: &str, args: Vec<Value>) -> Result<Value> {
    let natives = NativeRegistry::with_core_methods();
    let body = program.get_body(name).expect("body exists");
    let mut frame = Frame::new(Value::Nil, args);
    Interpreter::new(&natives)
        .with_program(program)
        .run(body, &mut frame)
}

fn run_main(program: &Program, arg: i64) -> Result<Value> {
    run_body(program, "main", vec![Value::Fixnum(arg)])
}

fn inline_everything(program: &Program) -> Result<Program> {
    InlinePass::new(|_: &Body, _: &Instr, _: &Body| true).optimize_program(program.clone())
}

fn assert_transfers_end_blocks(body: &Body) {
    for block in &body.basic_blocks {
        let last = block.instrs.len().saturating_sub(1);
        for (index, instr) in block.instrs.iter().enumerate() {
            assert!(
                index == last || !instr.operation().transfers_control(),
                "{} before the end of {}",
                instr,
                block.label
            );
        }
    }
}

/// `def sum_to(n); acc = 0; while n > 0; acc += n; n -= 1; end; acc; end`
fn sum_to_body() -> Result<Body> {
    let mut builder = BodyBuilder::new("sum_to", 1);
    let (n, acc) = (Variable::local("n"), Variable::local("acc"));
    let head = builder.new_label();
    let done = builder.new_label();
    let positive = builder.new_temporary();
    builder
        .emit(Instr::receive_arg(n.clone(), 0))
        .emit(Instr::copy(acc.clone(), Operand::fixnum(0)))
        .place(head)
        .emit(Instr::call(Some(positive.clone()), n.clone(), ">", vec![Operand::fixnum(0)]))
        .emit(Instr::b_false(positive, done))
        .emit(Instr::call(Some(acc.clone()), acc.clone(), "+", vec![n.clone().into()]))
        .emit(Instr::call(Some(n.clone()), n, "-", vec![Operand::fixnum(1)]))
        .emit(Instr::jump(head))
        .place(done)
        .emit(Instr::ret(acc));
    builder.finish()
}

/// Falls off its end after a branch: `1` for positives, `100` below -5, nil otherwise.
fn classify_body() -> Result<Body> {
    let mut builder = BodyBuilder::new("classify", 1);
    let x = Variable::local("x");
    let big = builder.new_label();
    let not_positive = builder.new_label();
    let positive = builder.new_temporary();
    let very_negative = builder.new_temporary();
    builder
        .emit(Instr::receive_arg(x.clone(), 0))
        .emit(Instr::call(Some(positive.clone()), x.clone(), ">", vec![Operand::fixnum(0)]))
        .emit(Instr::b_false(positive, not_positive))
        .emit(Instr::ret(Operand::fixnum(1)))
        .place(big)
        .emit(Instr::ret(Operand::fixnum(100)))
        .place(not_positive)
        .emit(Instr::call(Some(very_negative.clone()), x, "<", vec![Operand::fixnum(-5)]))
        .emit(Instr::b_true(very_negative, big));
    builder.finish()
}

/// `def main(a); callee(a); end`
fn calling_main(callee: &str) -> Result<Body> {
    let mut builder = BodyBuilder::new("main", 1);
    let (a, r) = (Variable::local("a"), Variable::local("r"));
    builder
        .emit(Instr::receive_arg(a.clone(), 0))
        .emit(Instr::call(Some(r.clone()), Variable::SelfRef, callee, vec![a.into()]))
        .emit(Instr::ret(r));
    builder.finish()
}

fn calls_to(body: &Body, method: &str) -> usize {
    body.instructions()
        .filter(|instr| matches!(instr, Instr::Call { method: m, .. } if *m == method))
        .count()
}

#[test]
fn generated_rename_map_is_total_and_fresh() -> Result<()> {
    let callee = abs_body()?;
    let mut caller = main_body()?;
    let caller_temps = caller.temporary_count();

    let info = InlinerInfo::for_callee(&callee, &mut caller);
    let blocks = Inliner::clone_body(&callee, &info)?;

    assert_eq!(blocks.len(), callee.basic_blocks.len());
    for (cloned, original) in blocks.iter().zip(&callee.basic_blocks) {
        assert_ne!(cloned.label, original.label);
        assert_eq!(cloned.instrs.len(), original.instrs.len());
        for (c, o) in cloned.instrs.iter().zip(&original.instrs) {
            assert_eq!(c.operation(), o.operation());
        }
    }
    assert_eq!(
        info.renamed_variable(&Variable::local("x"))?,
        Variable::local("%in0_x")
    );
    // self plus one callee temporary
    assert_eq!(caller.temporary_count(), caller_temps + 2);
    assert_eq!(callee, abs_body()?);
    Ok(())
}

#[test]
fn hand_built_contexts_must_cover_every_label() {
    let callee = abs_body().expect("abs");
    let mut info = InlinerInfo::new();
    info.insert_variable(Variable::local("x"), Variable::local("x2"))
        .insert_variable(Variable::temp(0), Variable::temp(9));

    let err = Inliner::clone_body(&callee, &info).unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::MissingLabelRename(_))
    ));
}

#[test]
fn inlining_preserves_behaviour() -> Result<()> {
    let original = program()?;
    let inlined = InlinePass::new(SmallBodies {
        max_instructions: 16,
    })
    .optimize_program(original.clone())?;

    let main = inlined.get_body("main").expect("main body");
    assert_eq!(calls_to(main, "abs"), 0);
    assert_eq!(calls_to(main, "-@"), 2);
    main.verify()?;

    for arg in [-7, 0, 3, 25] {
        assert_eq!(run_main(&inlined, arg)?, run_main(&original, arg)?, "arg {}", arg);
    }
    Ok(())
}

#[test]
fn each_site_gets_its_own_identifiers() -> Result<()> {
    let original = program()?;
    let inlined = inline_everything(&original)?;
    let main = inlined.get_body("main").expect("main body");

    let labels: Vec<Label> = main.basic_blocks.iter().map(|bb| bb.label).collect();
    let mut unique = labels.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), labels.len());

    let used = main
        .instructions()
        .flat_map(|instr| instr.used_variables())
        .collect::<std::collections::BTreeSet<_>>();
    assert!(used.contains(&Variable::local("%in0_x")));
    assert!(used.contains(&Variable::local("%in1_x")));
    Ok(())
}

#[test]
fn declined_sites_are_left_alone() -> Result<()> {
    let original = program()?;
    let result = InlinePass::new(SmallBodies { max_instructions: 2 })
        .optimize_program(original.clone())?;
    assert_eq!(result, original);
    Ok(())
}

#[test]
fn recursive_calls_are_not_inlined() -> Result<()> {
    let mut builder = BodyBuilder::new("loop", 0);
    builder.emit(Instr::call(None, Variable::SelfRef, "loop", vec![]));
    let mut program = Program::new();
    program.add_body(builder.finish()?);

    let result = InlinePass::new(|_: &Body, _: &Instr, _: &Body| true)
        .optimize_program(program.clone())?;
    assert_eq!(result, program);
    Ok(())
}

#[test]
fn arity_mismatch_is_rejected() -> Result<()> {
    let callee = abs_body()?;
    let mut builder = BodyBuilder::new("main", 0);
    builder.emit(Instr::call(None, Variable::SelfRef, "abs", vec![]));
    let mut caller = builder.finish()?;

    let err = Inliner::inline_call(&mut caller, 0, 0, &callee).unwrap_err();
    assert!(err.to_string().contains("arity"));
    Ok(())
}

#[test]
fn only_calls_can_be_inlined() -> Result<()> {
    let callee = abs_body()?;
    let mut caller = abs_body()?;
    assert!(Inliner::inline_call(&mut caller, 0, 0, &callee).is_err());
    assert!(Inliner::inline_call(&mut caller, 42, 0, &callee).is_err());
    Ok(())
}

#[test]
fn optimizer_runs_passes_in_order() -> Result<()> {
    let mut optimizer = Optimizer::new();
    optimizer
        .add_pass(NoopPass)
        .add_pass(InlinePass::new(SmallBodies {
            max_instructions: 16,
        }));
    assert_eq!(optimizer.pass_names(), vec!["noop", "inline"]);

    let original = program()?;
    let optimized = optimizer.optimize(original.clone())?;
    assert_eq!(run_main(&optimized, -4)?, run_main(&original, -4)?);
    Ok(())
}

#[test]
fn inlined_temporaries_avoid_hand_numbered_caller_temporaries() -> Result<()> {
    // %v_0 = copy(41); r = call(ident, 7, []); return(%v_0)
    let mut main = Body::new("main", 1);
    let entry = main.new_label();
    let mut block = BasicBlock::new(entry);
    block.add_instruction(Instr::copy(Variable::temp(0), Operand::fixnum(41)));
    block.add_instruction(Instr::call(
        Some(Variable::local("r")),
        Operand::fixnum(7),
        "ident",
        vec![],
    ));
    block.add_instruction(Instr::ret(Variable::temp(0)));
    main.add_basic_block(block);

    let mut ident = BodyBuilder::new("ident", 0);
    ident.emit(Instr::ret(Variable::SelfRef));

    let mut program = Program::new();
    program.add_body(main);
    program.add_body(ident.finish()?);
    let inlined = inline_everything(&program)?;

    let main = inlined.get_body("main").expect("main body");
    assert_eq!(calls_to(main, "ident"), 0);
    assert_eq!(run_main(&inlined, 0)?, Value::Fixnum(41));
    assert_eq!(run_main(&inlined, 0)?, run_main(&program, 0)?);
    Ok(())
}

#[test]
fn inlining_a_looping_callee_preserves_behaviour() -> Result<()> {
    let mut program = Program::new();
    program.add_body(sum_to_body()?);
    program.add_body(calling_main("sum_to")?);
    let inlined = inline_everything(&program)?;

    let main = inlined.get_body("main").expect("main body");
    assert_eq!(calls_to(main, "sum_to"), 0);
    assert_transfers_end_blocks(main);
    main.verify()?;
    for arg in [0, 1, 4, 10] {
        assert_eq!(run_main(&inlined, arg)?, run_main(&program, arg)?, "arg {}", arg);
    }
    assert_eq!(run_main(&inlined, 4)?, Value::Fixnum(10));
    Ok(())
}

#[test]
fn callee_ending_in_a_branch_keeps_transfers_at_block_ends() -> Result<()> {
    let mut program = Program::new();
    program.add_body(classify_body()?);
    program.add_body(calling_main("classify")?);
    let inlined = inline_everything(&program)?;

    let main = inlined.get_body("main").expect("main body");
    assert_eq!(calls_to(main, "classify"), 0);
    assert_transfers_end_blocks(main);
    main.verify()?;
    for (arg, expected) in [(3, Value::Fixnum(1)), (-10, Value::Fixnum(100)), (-1, Value::Nil)] {
        assert_eq!(run_main(&program, arg)?, expected, "arg {}", arg);
        assert_eq!(run_main(&inlined, arg)?, expected, "arg {}", arg);
    }
    Ok(())
}
