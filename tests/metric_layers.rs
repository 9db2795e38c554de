//! Structural tests for the metric layers: which ops they append and how
//! the variables are bound.

use asg_metrics::asg::{Attribute, DType};
use asg_metrics::metrics::{accuracy, auc, AccuracyOptions, AucCurve, AucOptions};
use asg_metrics::nn::data;
use asg_metrics::tensor::{GraphContext, Variable};
use std::cell::RefCell;
use std::rc::Rc;

fn inputs(ctx: &Rc<RefCell<GraphContext>>) -> (Variable, Variable) {
    let predict = data(ctx, "predict", vec![8, 5], DType::F32).unwrap();
    let label = data(ctx, "label", vec![8, 1], DType::I64).unwrap();
    (predict, label)
}

fn names(vars: &[&Variable]) -> Vec<String> {
    vars.iter().map(|v| v.name().to_string()).collect()
}

#[test]
fn accuracy_appends_topk_then_accuracy() {
    let ctx = GraphContext::shared();
    let (predict, label) = inputs(&ctx);
    let out = accuracy(&predict, &label, AccuracyOptions::default().with_k(5)).unwrap();

    let ctx = ctx.borrow();
    let graph = ctx.main_graph();
    let types: Vec<&str> = graph.ops.iter().map(|op| op.op_type.as_str()).collect();
    assert_eq!(types, ["top_k", "accuracy"]);

    let topk = &graph.ops[0];
    let acc = &graph.ops[1];
    assert_eq!(topk.input("X"), names(&[&predict]).as_slice());
    assert_eq!(topk.attr("k"), Some(&Attribute::Int(5)));
    assert_eq!(acc.input("Out"), topk.output("Out"));
    assert_eq!(acc.input("Indices"), topk.output("Indices"));
    assert_eq!(acc.input("Label"), names(&[&label]).as_slice());
    assert_eq!(acc.output("Accuracy"), names(&[&out.accuracy]).as_slice());
    assert_eq!(acc.output("Correct"), names(&[&out.correct]).as_slice());
    assert_eq!(acc.output("Total"), names(&[&out.total]).as_slice());
    assert!(acc.attrs.is_empty());

    // nothing to initialize
    assert!(ctx.startup_graph().ops.is_empty());
}

#[test]
fn accuracy_creates_fresh_int64_counters() {
    let ctx = GraphContext::shared();
    let (predict, label) = inputs(&ctx);
    let first = accuracy(&predict, &label, AccuracyOptions::default()).unwrap();
    let second = accuracy(&predict, &label, AccuracyOptions::default()).unwrap();

    for out in [&first, &second] {
        assert_eq!(out.accuracy.dtype(), DType::F32);
        assert_eq!(out.correct.dtype(), DType::I64);
        assert_eq!(out.total.dtype(), DType::I64);
        assert!(!out.correct.persistable());
        assert!(!out.total.persistable());
    }
    assert_ne!(first.correct.name(), second.correct.name());
    assert_ne!(first.total.name(), second.total.name());
    assert_ne!(first.correct.name(), first.total.name());
    assert_eq!(ctx.borrow().main_graph().ops.len(), 4);
}

#[test]
fn auc_wires_counters_as_inputs_and_outputs() {
    let ctx = GraphContext::shared();
    let (predict, label) = inputs(&ctx);
    let out = auc(&predict, &label, AucOptions::default()).unwrap();
    let [tp, tn, fp, fn_] = &out.states;

    let ctx = ctx.borrow();
    let graph = ctx.main_graph();
    assert_eq!(graph.ops.len(), 1);
    let op = &graph.ops[0];
    assert_eq!(op.op_type, "auc");
    assert_eq!(op.input("Predict"), names(&[&predict]).as_slice());
    assert_eq!(op.input("Label"), names(&[&label]).as_slice());
    for (slot_in, slot_out, var) in [("TP", "TPOut", tp), ("TN", "TNOut", tn), ("FP", "FPOut", fp), ("FN", "FNOut", fn_)] {
        assert_eq!(op.input(slot_in), names(&[var]).as_slice());
        assert_eq!(op.output(slot_out), names(&[var]).as_slice());
    }
    assert_eq!(op.output("AUC"), names(&[&out.auc]).as_slice());
    assert_eq!(op.attr("curve"), Some(&Attribute::Str("ROC".into())));
    assert_eq!(op.attr("num_thresholds"), Some(&Attribute::Int(200)));
    assert_eq!(out.auc.dtype(), DType::F64);
    assert_eq!(out.true_positives(), tp);
    assert_eq!(out.false_negatives(), fn_);
}

#[test]
fn auc_counters_are_persistable_and_zero_initialized() {
    let ctx = GraphContext::shared();
    let (predict, label) = inputs(&ctx);
    let out = auc(&predict, &label, AucOptions::default().with_num_thresholds(16)).unwrap();

    let ctx = ctx.borrow();
    let startup = ctx.startup_graph();
    assert_eq!(startup.ops.len(), 4);
    for (var, op) in out.states.iter().zip(startup.ops.iter()) {
        assert_eq!(var.dtype(), DType::I64);
        assert!(var.persistable());
        assert_eq!(var.shape(), Some(vec![16]));
        assert!(startup.var(var.name()).unwrap().persistable);

        assert_eq!(op.op_type, "fill_constant");
        assert_eq!(op.output("Out"), names(&[var]).as_slice());
        assert_eq!(op.attr("value"), Some(&Attribute::Float(0.0)));
        assert_eq!(op.attr("force_cpu"), Some(&Attribute::Bool(true)));
        assert_eq!(op.attr("shape"), Some(&Attribute::Ints(vec![16])));
    }
}

#[test]
fn every_auc_call_creates_new_counters() {
    let ctx = GraphContext::shared();
    let (predict, label) = inputs(&ctx);
    let roc = auc(&predict, &label, AucOptions::default()).unwrap();
    let pr = auc(&predict, &label, AucOptions::default().with_curve(AucCurve::Pr)).unwrap();

    for a in &roc.states {
        for b in &pr.states {
            assert_ne!(a.name(), b.name());
        }
    }
    let ctx = ctx.borrow();
    assert_eq!(ctx.startup_graph().ops.len(), 8);
    assert_eq!(ctx.main_graph().persistable_vars().count(), 8);
    assert_eq!(ctx.main_graph().ops[1].attr("curve"), Some(&Attribute::Str("PR".into())));
}

#[test]
fn builders_do_not_validate_shapes() {
    // rank and dtype mismatches only surface at execution
    let ctx = GraphContext::shared();
    let predict = data(&ctx, "predict", vec![3], DType::I32).unwrap();
    let label = data(&ctx, "label", vec![7, 2, 2], DType::F32).unwrap();
    assert!(accuracy(&predict, &label, AccuracyOptions::default().with_k(100)).is_ok());
    assert!(auc(&predict, &label, AucOptions::default().with_num_thresholds(0)).is_ok());
}

#[test]
fn variables_from_another_context_are_rejected() {
    let ctx = GraphContext::shared();
    let (predict, _) = inputs(&ctx);
    let other = GraphContext::shared();
    let foreign = data(&other, "foreign_label", vec![8, 1], DType::I64).unwrap();
    assert!(accuracy(&predict, &foreign, AccuracyOptions::default()).is_err());
}
