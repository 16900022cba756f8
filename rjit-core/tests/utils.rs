//! Test Utilities
//!
//! Helpers for assembling function bodies and checking graph invariants in
//! the CFG tests.

#![allow(dead_code)]

use rjit_core::{BlockId, EdgeKind, FunctionBuilder, Label, Opcode, UNDEFINED_LABEL};

/// Append a block at the end of the live list.
pub fn new_block(func: &mut FunctionBuilder) -> BlockId {
    func.append_block().expect("block allocation")
}

/// Append a block carrying a label.
pub fn new_labeled_block(func: &mut FunctionBuilder, label: Label) -> BlockId {
    let block = new_block(func);
    func.record_label(block, label).expect("label binding");
    block
}

/// Emit a plain instruction, maintaining the dead-end flag the way a front
/// end would.
pub fn push_op(func: &mut FunctionBuilder, block: BlockId, opcode: Opcode) {
    let insn = func.add_insn(block).expect("instruction slot");
    insn.opcode = opcode;
    if opcode.kills_fallthrough() {
        func.set_ends_in_dead(block, true);
    }
}

/// Emit a branch or handler-transfer instruction targeting `label`.
pub fn push_branch(func: &mut FunctionBuilder, block: BlockId, opcode: Opcode, label: Label) {
    let insn = func.add_insn(block).expect("instruction slot");
    insn.opcode = opcode;
    insn.dest = label;
    if opcode.kills_fallthrough() {
        func.set_ends_in_dead(block, true);
    }
}

/// Emit a jump table over `targets`.
pub fn push_jump_table(func: &mut FunctionBuilder, block: BlockId, targets: &[Label]) {
    let insn = func.add_insn(block).expect("instruction slot");
    insn.opcode = Opcode::JumpTable;
    insn.targets = targets.to_vec();
}

/// Blocks on the live list, front to back.
pub fn live_blocks(func: &FunctionBuilder) -> Vec<BlockId> {
    let mut blocks = Vec::new();
    let mut cursor = func.next_block(None);
    while let Some(block) = cursor {
        blocks.push(block);
        cursor = func.next_block(Some(block));
    }
    blocks
}

/// Successor edges of `block` as `(kind, destination)` pairs.
pub fn succ_edges(func: &FunctionBuilder, block: BlockId) -> Vec<(EdgeKind, BlockId)> {
    func.block(block)
        .succs()
        .iter()
        .map(|&e| (func.edge(e).kind, func.edge(e).dst))
        .collect()
}

/// Predecessor edges of `block` as `(kind, source)` pairs.
pub fn pred_edges(func: &FunctionBuilder, block: BlockId) -> Vec<(EdgeKind, BlockId)> {
    func.block(block)
        .preds()
        .iter()
        .map(|&e| (func.edge(e).kind, func.edge(e).src))
        .collect()
}

/// Every label bound to `block`, in chain order.
pub fn labels_of(func: &FunctionBuilder, block: BlockId) -> Vec<Label> {
    let mut labels = Vec::new();
    let mut label = func.next_label(block, UNDEFINED_LABEL);
    while label != UNDEFINED_LABEL {
        assert!(labels.len() <= 1024, "label chain does not terminate");
        labels.push(label);
        label = func.next_label(block, label);
    }
    labels
}

/// Check the structural invariants of the graph: edge symmetry, fall-through
/// uniqueness, dead-end consistency, and label soundness.
pub fn assert_cfg_invariants(func: &FunctionBuilder) {
    for &block in &live_blocks(func) {
        let mut fallthru_out = 0;
        for &e in func.block(block).succs() {
            let edge = func.edge(e);
            assert_eq!(edge.src, block, "edge source matches the block listing it");
            let on_dst = func.block(edge.dst).preds().iter().filter(|&&p| p == e).count();
            assert_eq!(on_dst, 1, "edge appears in its destination's preds exactly once");
            let on_src = func.block(block).succs().iter().filter(|&&s| s == e).count();
            assert_eq!(on_src, 1, "edge appears in its source's succs exactly once");
            if edge.kind == EdgeKind::Fallthru {
                fallthru_out += 1;
            }
        }
        assert!(fallthru_out <= 1, "at most one outgoing fall-through edge");
        if func.ends_in_dead(block) {
            assert_eq!(fallthru_out, 0, "dead-ended block has no fall-through edge");
        }

        let mut fallthru_in = 0;
        for &e in func.block(block).preds() {
            let edge = func.edge(e);
            assert_eq!(edge.dst, block, "edge destination matches the block listing it");
            let on_src = func.block(edge.src).succs().iter().filter(|&&s| s == e).count();
            assert_eq!(on_src, 1, "edge appears in its source's succs exactly once");
            if edge.kind == EdgeKind::Fallthru {
                fallthru_in += 1;
            }
        }
        assert!(fallthru_in <= 1, "at most one incoming fall-through edge");
    }

    // Every bound label must appear exactly once on its block's chain.
    let capacity = func.stats().label_capacity;
    for label in 0..capacity as Label {
        if let Some(block) = func.block_from_label(label) {
            let chain = labels_of(func, block);
            let hits = chain.iter().filter(|&&l| l == label).count();
            assert_eq!(hits, 1, "label {label} appears once on its block's chain");
        }
    }
}
