//! Traversal semantics of operation sequences across the three modes.

use spire::command::{CommandSpec, ParameterSchema};
use spire::error::{fail, OpsError};
use spire::sequence::{ExecutionMode, OperationSequence};
use std::cell::RefCell;
use std::rc::Rc;

type Trace = Rc<RefCell<Vec<String>>>;

fn tracing_op(trace: &Trace, label: &str) -> impl FnOnce() -> Result<(), OpsError> + 'static {
    let trace = Rc::clone(trace);
    let label = label.to_string();
    move || {
        trace.borrow_mut().push(label);
        Ok(())
    }
}

fn three_step_sequence(trace: &Trace) -> OperationSequence {
    let mut ops = OperationSequence::new();
    ops.add_operation("first", tracing_op(trace, "first"));
    ops.add_operation("second", tracing_op(trace, "second"));
    ops.add_operation("third", tracing_op(trace, "third"));
    ops
}

#[test]
fn live_runs_every_leaf_exactly_once_in_declaration_order() {
    let trace: Trace = Rc::default();
    let report = three_step_sequence(&trace)
        .run(ExecutionMode::Live)
        .unwrap();
    assert_eq!(*trace.borrow(), vec!["first", "second", "third"]);
    assert_eq!(report.steps, 3);
}

#[test]
fn dry_run_invokes_nothing_and_prints_as_many_headers_as_live() {
    let trace: Trace = Rc::default();
    let live = three_step_sequence(&trace).run(ExecutionMode::Live).unwrap();

    let dry_trace: Trace = Rc::default();
    let dry = three_step_sequence(&dry_trace)
        .run(ExecutionMode::DryRun)
        .unwrap();

    assert!(dry_trace.borrow().is_empty());
    assert_eq!(dry.steps, live.steps);
}

#[test]
fn failing_leaf_aborts_the_rest_and_surfaces_unchanged() {
    let trace: Trace = Rc::default();
    let mut ops = OperationSequence::new();
    ops.add_operation("a", tracing_op(&trace, "a"));
    ops.add_operation("b", || fail("boom"));
    ops.add_operation("c", tracing_op(&trace, "c"));

    let err = ops.run(ExecutionMode::Live).unwrap_err();
    assert!(matches!(err, OpsError::Failed { ref message, .. } if message == "boom"));
    assert_eq!(*trace.borrow(), vec!["a"]);
}

#[test]
fn show_commands_prints_one_line_per_step_and_runs_nothing() {
    // The boom callback would fail the run if it were ever invoked.
    let trace: Trace = Rc::default();
    let mut ops = OperationSequence::new();
    ops.add_operation("a", tracing_op(&trace, "a"));
    ops.add_operation("b", || fail("boom"));

    let report = ops.run(ExecutionMode::ShowCommands).unwrap();
    assert_eq!(report.steps, 2);
    assert!(trace.borrow().is_empty());
}

#[test]
fn nested_sequences_run_depth_first_in_declaration_order() {
    let trace: Trace = Rc::default();
    let inner = CommandSpec::sequence("inner block", ParameterSchema::empty(), {
        let trace = Rc::clone(&trace);
        move |ops, _args| {
            ops.add_operation("inner-1", tracing_op(&trace, "inner-1"));
            ops.add_operation("inner-2", tracing_op(&trace, "inner-2"));
            Ok(())
        }
    });

    let mut ops = OperationSequence::new();
    ops.add_operation("before", tracing_op(&trace, "before"));
    ops.add_subcommand(&inner, &[]).unwrap();
    ops.add_operation("after", tracing_op(&trace, "after"));

    let report = ops.run(ExecutionMode::Live).unwrap();
    assert_eq!(
        *trace.borrow(),
        vec!["before", "inner-1", "inner-2", "after"]
    );
    // Header for the nested block plus its two leaves and the two outer leaves.
    assert_eq!(report.steps, 5);
}

#[test]
fn dry_run_matches_live_headers_for_nested_structure() {
    let build = |trace: &Trace| {
        let inner = CommandSpec::sequence("inner block", ParameterSchema::empty(), {
            let trace = Rc::clone(trace);
            move |ops, _args| {
                ops.add_operation("inner-1", tracing_op(&trace, "inner-1"));
                Ok(())
            }
        });
        let mut ops = OperationSequence::new();
        ops.add_operation("before", tracing_op(trace, "before"));
        ops.add_subcommand(&inner, &[]).unwrap();
        ops
    };

    let live_trace: Trace = Rc::default();
    let live = build(&live_trace).run(ExecutionMode::Live).unwrap();

    let dry_trace: Trace = Rc::default();
    let dry = build(&dry_trace).run(ExecutionMode::DryRun).unwrap();

    assert_eq!(live.steps, dry.steps);
    assert!(dry_trace.borrow().is_empty());
    assert_eq!(*live_trace.borrow(), vec!["before", "inner-1"]);
}

#[test]
fn add_command_rejects_sequence_specs() {
    let seq = CommandSpec::sequence("a block", ParameterSchema::empty(), |_ops, _args| Ok(()));
    let mut ops = OperationSequence::new();
    let err = ops.add_command(&seq, &[]).unwrap_err();
    assert!(matches!(err, OpsError::Internal(_)));
}

#[test]
fn add_subcommand_rejects_simple_specs() {
    let simple = CommandSpec::simple("a leaf", ParameterSchema::empty(), |_args| Ok(()));
    let mut ops = OperationSequence::new();
    let err = ops.add_subcommand(&simple, &[]).unwrap_err();
    assert!(matches!(err, OpsError::Internal(_)));
}
