use pretty_assertions::assert_eq;
use rir_core::error::{ConfigurationError, Result};
use rir_core::{Address, Error, Instr, Label, Literal, Operand, ScopeHandle, Variable};

mod support;
use support::{Event, Recorder};

#[test]
fn true_branch_on_constant_emits_test_and_conditional_jump() -> Result<()> {
    let target = Label::new(0);
    let mut ctx = Recorder::default().with_label(target, 100);

    Instr::b_true(Operand::bool(true), target).compile(&mut ctx)?;

    assert_eq!(
        ctx.events,
        vec![
            Event::Push(Literal::Bool(true)),
            Event::TruthinessTest,
            Event::JumpIfTrue(Address(100)),
        ]
    );
    Ok(())
}

#[test]
fn true_branch_evaluates_its_condition_once() -> Result<()> {
    let target = Label::new(3);
    let cond = Variable::temp(0);
    let mut ctx = Recorder::default().with_label(target, 7);

    Instr::b_true(cond.clone(), target).compile(&mut ctx)?;

    let loads = ctx
        .events
        .iter()
        .filter(|event| **event == Event::Load(cond.clone()))
        .count();
    let jumps = ctx
        .events
        .iter()
        .filter(|event| matches!(event, Event::JumpIfTrue(_) | Event::JumpIfFalse(_)))
        .count();
    assert_eq!(loads, 1);
    assert_eq!(jumps, 1);
    Ok(())
}

#[test]
fn false_branch_uses_the_mirror_jump_without_negation() -> Result<()> {
    let target = Label::new(1);
    let mut ctx = Recorder::default().with_label(target, 4);

    Instr::b_false(Variable::local("done"), target).compile(&mut ctx)?;

    assert_eq!(
        ctx.events,
        vec![
            Event::Load(Variable::local("done")),
            Event::TruthinessTest,
            Event::JumpIfFalse(Address(4)),
        ]
    );
    Ok(())
}

#[test]
fn equality_branches_compare_both_operands() -> Result<()> {
    let target = Label::new(2);
    let mut ctx = Recorder::default().with_label(target, 9);

    Instr::bne(Variable::local("a"), Operand::fixnum(0), target).compile(&mut ctx)?;

    assert_eq!(
        ctx.events,
        vec![
            Event::Load(Variable::local("a")),
            Event::Push(Literal::Fixnum(0)),
            Event::EqualityTest,
            Event::JumpIfFalse(Address(9)),
        ]
    );
    Ok(())
}

#[test]
fn unregistered_target_fails_before_emitting_anything() {
    let mut ctx = Recorder::default();

    let err = Instr::b_true(Operand::bool(true), Label::new(8))
        .compile(&mut ctx)
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::UnregisteredLabel(label)) if label == Label::new(8)
    ));
    assert!(ctx.events.is_empty());
}

#[test]
fn calls_store_or_discard_their_result() -> Result<()> {
    let mut ctx = Recorder::default();

    Instr::call(
        Some(Variable::temp(1)),
        Variable::SelfRef,
        "scope_of",
        vec![Operand::current_scope()],
    )
    .compile(&mut ctx)?;
    Instr::call(None, Variable::SelfRef, "puts", vec![Operand::array(vec![])]).compile(&mut ctx)?;

    assert_eq!(
        ctx.events,
        vec![
            Event::Load(Variable::SelfRef),
            Event::Scope(ScopeHandle::CurrentScope),
            Event::Invoke("scope_of".into(), 1),
            Event::Store(Variable::temp(1)),
            Event::Load(Variable::SelfRef),
            Event::BuildArray(0),
            Event::Invoke("puts".into(), 1),
            Event::Discard,
        ]
    );
    Ok(())
}

#[test]
fn copies_receives_and_returns() -> Result<()> {
    let exit = Label::new(0);
    let mut ctx = Recorder::default().with_label(exit, 2);

    for instr in [
        Instr::receive_arg(Variable::local("n"), 0),
        Instr::copy(Variable::temp(0), Variable::local("n")),
        Instr::label(exit),
        Instr::jump(exit),
        Instr::ret(Variable::temp(0)),
    ] {
        instr.compile(&mut ctx)?;
    }

    assert_eq!(
        ctx.events,
        vec![
            Event::ReceiveArg(0),
            Event::Store(Variable::local("n")),
            Event::Load(Variable::local("n")),
            Event::Store(Variable::temp(0)),
            Event::Jump(Address(2)),
            Event::Load(Variable::temp(0)),
            Event::Return,
        ]
    );
    Ok(())
}
