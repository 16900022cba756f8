//! Unit tests for CFG construction from block terminators

#[path = "utils.rs"]
mod utils;

use rjit_core::{CfgError, EdgeKind, FunctionBuilder, Opcode};
use utils::*;

#[test]
fn trivial_function_is_one_fallthrough() {
    let mut func = FunctionBuilder::new().unwrap();
    func.build_cfg().unwrap();

    assert_eq!(succ_edges(&func, func.entry()), vec![(EdgeKind::Fallthru, func.exit())]);
    assert_eq!(func.stats().edges_in_use, 1);
    assert_cfg_invariants(&func);
}

#[test]
fn return_terminator_edges_to_exit() {
    let mut func = FunctionBuilder::new().unwrap();
    let b0 = new_block(&mut func);
    push_op(&mut func, b0, Opcode::ReturnInt);
    func.build_cfg().unwrap();

    assert_eq!(succ_edges(&func, b0), vec![(EdgeKind::Return, func.exit())]);
    assert_cfg_invariants(&func);
}

#[test]
fn unconditional_branch_has_no_fallthrough() {
    let mut func = FunctionBuilder::new().unwrap();
    let b0 = new_block(&mut func);
    let b1 = new_labeled_block(&mut func, 0);
    push_branch(&mut func, b0, Opcode::Br, 0);
    push_op(&mut func, b1, Opcode::Return);
    func.build_cfg().unwrap();

    assert_eq!(succ_edges(&func, b0), vec![(EdgeKind::Branch, b1)]);
    assert_cfg_invariants(&func);
}

#[test]
fn conditional_branch_adds_both_arms() {
    let mut func = FunctionBuilder::new().unwrap();
    let b0 = new_block(&mut func);
    let b1 = new_block(&mut func);
    let b2 = new_labeled_block(&mut func, 0);
    push_branch(&mut func, b0, Opcode::BrEq, 0);
    push_op(&mut func, b1, Opcode::Return);
    push_op(&mut func, b2, Opcode::Return);
    func.build_cfg().unwrap();

    // The branch edge comes first, then the fall-through.
    assert_eq!(
        succ_edges(&func, b0),
        vec![(EdgeKind::Branch, b2), (EdgeKind::Fallthru, b1)]
    );
    assert_cfg_invariants(&func);
}

#[test]
fn throw_without_catcher_edges_to_exit() {
    let mut func = FunctionBuilder::new().unwrap();
    let b0 = new_block(&mut func);
    push_op(&mut func, b0, Opcode::Throw);
    func.build_cfg().unwrap();

    assert_eq!(succ_edges(&func, b0), vec![(EdgeKind::Except, func.exit())]);
    assert_cfg_invariants(&func);
}

#[test]
fn throw_with_catcher_edges_to_handler() {
    let mut func = FunctionBuilder::new().unwrap();
    let b0 = new_block(&mut func);
    let handler = new_labeled_block(&mut func, 7);
    push_op(&mut func, b0, Opcode::Throw);
    push_op(&mut func, handler, Opcode::Return);
    func.set_catcher_label(7);
    func.build_cfg().unwrap();

    assert_eq!(succ_edges(&func, b0), vec![(EdgeKind::Except, handler)]);
    assert_cfg_invariants(&func);
}

#[test]
fn calls_carry_an_exception_edge_and_fall_through() {
    let mut func = FunctionBuilder::new().unwrap();
    let b0 = new_block(&mut func);
    let b1 = new_block(&mut func);
    push_op(&mut func, b0, Opcode::Call);
    push_op(&mut func, b1, Opcode::Return);
    func.build_cfg().unwrap();

    assert_eq!(
        succ_edges(&func, b0),
        vec![(EdgeKind::Except, func.exit()), (EdgeKind::Fallthru, b1)]
    );
    assert_cfg_invariants(&func);
}

#[test]
fn call_finally_targets_the_handler_label() {
    let mut func = FunctionBuilder::new().unwrap();
    let b0 = new_block(&mut func);
    let handler = new_labeled_block(&mut func, 3);
    push_branch(&mut func, b0, Opcode::CallFinally, 3);
    push_op(&mut func, handler, Opcode::Return);
    func.build_cfg().unwrap();

    let edges = succ_edges(&func, b0);
    assert_eq!(edges[0], (EdgeKind::Except, handler));
    assert_cfg_invariants(&func);
}

#[test]
fn jump_table_fans_out_one_edge_per_target() {
    let mut func = FunctionBuilder::new().unwrap();
    let b0 = new_block(&mut func);
    let b1 = new_labeled_block(&mut func, 1);
    let b2 = new_labeled_block(&mut func, 2);
    push_jump_table(&mut func, b0, &[1, 1, 2]);
    push_op(&mut func, b1, Opcode::Return);
    push_op(&mut func, b2, Opcode::Return);
    func.build_cfg().unwrap();

    // Three branch edges, duplicates included, then the fall-through.
    assert_eq!(
        succ_edges(&func, b0),
        vec![
            (EdgeKind::Branch, b1),
            (EdgeKind::Branch, b1),
            (EdgeKind::Branch, b2),
            (EdgeKind::Fallthru, b1),
        ]
    );
    let branch_preds = |b| {
        pred_edges(&func, b).iter().filter(|(k, _)| *k == EdgeKind::Branch).count()
    };
    assert_eq!(branch_preds(b1), 2);
    assert_eq!(branch_preds(b2), 1);
    assert_cfg_invariants(&func);
}

#[test]
fn empty_jump_table_leaves_only_the_fallthrough() {
    let mut func = FunctionBuilder::new().unwrap();
    let b0 = new_block(&mut func);
    let b1 = new_block(&mut func);
    push_jump_table(&mut func, b0, &[]);
    push_op(&mut func, b1, Opcode::Return);
    func.build_cfg().unwrap();

    assert_eq!(succ_edges(&func, b0), vec![(EdgeKind::Fallthru, b1)]);
    assert_cfg_invariants(&func);
}

#[test]
fn branch_to_unbound_label_fails_the_build() {
    let mut func = FunctionBuilder::new().unwrap();
    let b0 = new_block(&mut func);
    push_branch(&mut func, b0, Opcode::Br, 99);

    assert_eq!(func.build_cfg(), Err(CfgError::UndefinedLabel(99)));
}

#[test]
fn jump_table_to_unbound_label_fails_the_build() {
    let mut func = FunctionBuilder::new().unwrap();
    let b0 = new_block(&mut func);
    push_jump_table(&mut func, b0, &[7]);

    assert_eq!(func.build_cfg(), Err(CfgError::UndefinedLabel(7)));
}

#[test]
fn postorder_emits_each_reachable_block_once_entry_last() {
    let mut func = FunctionBuilder::new().unwrap();
    let b0 = new_block(&mut func);
    let b1 = new_block(&mut func);
    let b2 = new_labeled_block(&mut func, 0);
    let b3 = new_labeled_block(&mut func, 1);
    push_branch(&mut func, b0, Opcode::BrNe, 0);
    push_branch(&mut func, b1, Opcode::Br, 1);
    push_branch(&mut func, b2, Opcode::Br, 1);
    push_op(&mut func, b3, Opcode::Return);
    func.build_cfg().unwrap();
    func.compute_postorder().unwrap();

    let order = func.postorder().to_vec();
    assert_eq!(order.len(), 6);
    assert_eq!(*order.last().unwrap(), func.entry());
    for &block in &[func.entry(), func.exit(), b0, b1, b2, b3] {
        assert_eq!(order.iter().filter(|&&b| b == block).count(), 1);
    }
}

#[test]
fn postorder_skips_unreachable_blocks() {
    let mut func = FunctionBuilder::new().unwrap();
    let b0 = new_block(&mut func);
    let b1 = new_block(&mut func);
    push_op(&mut func, b0, Opcode::Return);
    push_op(&mut func, b1, Opcode::Return);
    func.build_cfg().unwrap();
    func.compute_postorder().unwrap();

    assert!(!func.postorder().contains(&b1));
    assert_eq!(func.postorder().len(), 3);
}
