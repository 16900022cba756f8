//! Basic Blocks
//!
//! This module defines the per-block state: the instruction buffer, the label
//! chain head, the predecessor/successor edge lists, and the intrusive links
//! that thread live blocks into the function's block list.
//!
//! # Memory Optimizations
//! - Blocks are addressed by `BlockId` (a `u32` index into the builder-owned
//!   arena) instead of pointers
//! - `succs` and `preds` use `SmallVec<[EdgeId; 2]>` (most blocks have ≤2)
//! - The instruction buffer grows by doubling from a capacity of 4
//!
//! # Basic Block Properties
//! A basic block is a maximal sequence of instructions with:
//! - Single entry point (first instruction)
//! - Single exit point (last instruction is the terminator)
//! - No internal control flow (linear execution)

use crate::edge::EdgeId;
use crate::error::CfgError;
use crate::insn::Insn;
use crate::label::{Label, UNDEFINED_LABEL};
use crate::meta::MetaMap;
use smallvec::SmallVec;

/// Basic block identifier.
///
/// A stable index into the owning `FunctionBuilder`'s block arena. Ids stay
/// valid after a block leaves the control flow graph; deleted blocks keep
/// their slot until the builder is torn down, so outside references never
/// dangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Basic block in a function under construction.
#[derive(Debug)]
pub struct Block {
    /// Head of the alias chain of labels bound to this block.
    pub(crate) label: Label,
    /// Instructions in execution order.
    pub(crate) insns: Vec<Insn>,
    /// Outgoing edges.
    /// Uses SmallVec with inline capacity for 2 successors (most blocks have ≤2).
    pub(crate) succs: SmallVec<[EdgeId; 2]>,
    /// Incoming edges.
    /// Uses SmallVec with inline capacity for 2 predecessors (most blocks have ≤2).
    pub(crate) preds: SmallVec<[EdgeId; 2]>,
    /// Outgoing edge count accumulated by the CFG builder's counting pass.
    pub(crate) num_succs: u32,
    /// Incoming edge count accumulated by the CFG builder's counting pass.
    pub(crate) num_preds: u32,
    /// The terminator guarantees control never falls out the bottom.
    pub(crate) ends_in_dead: bool,
    /// Transient DFS flag; owned by the traversal that set it.
    pub(crate) visited: bool,
    /// Next block in the live list.
    pub(crate) next: Option<BlockId>,
    /// Previous block in the live list.
    pub(crate) prev: Option<BlockId>,
    /// Type-tagged metadata.
    pub(crate) meta: MetaMap,
}

impl Block {
    pub(crate) fn new() -> Self {
        Self {
            label: UNDEFINED_LABEL,
            insns: Vec::new(),
            succs: SmallVec::new(),
            preds: SmallVec::new(),
            num_succs: 0,
            num_preds: 0,
            ends_in_dead: false,
            visited: false,
            next: None,
            prev: None,
            meta: MetaMap::default(),
        }
    }

    /// Append a zero-initialized instruction slot and return it for filling.
    ///
    /// The buffer doubles from a starting capacity of 4, with every growth
    /// checked so exhaustion surfaces as `CfgError::OutOfMemory`.
    pub(crate) fn add_insn(&mut self) -> Result<&mut Insn, CfgError> {
        if self.insns.len() == self.insns.capacity() {
            let grow = if self.insns.capacity() == 0 { 4 } else { self.insns.capacity() };
            self.insns.try_reserve_exact(grow)?;
        }
        let index = self.insns.len();
        self.insns.push(Insn::default());
        Ok(&mut self.insns[index])
    }

    /// Head of this block's label alias chain, or `UNDEFINED_LABEL`.
    #[inline]
    pub fn label(&self) -> Label {
        self.label
    }

    /// Instructions in execution order.
    #[inline]
    pub fn insns(&self) -> &[Insn] {
        &self.insns
    }

    /// Last instruction of the block, or `None` when the block is empty.
    #[inline]
    pub fn last_insn(&self) -> Option<&Insn> {
        self.insns.last()
    }

    /// Outgoing edge handles.
    #[inline]
    pub fn succs(&self) -> &[EdgeId] {
        &self.succs
    }

    /// Incoming edge handles.
    #[inline]
    pub fn preds(&self) -> &[EdgeId] {
        &self.preds
    }

    /// True when control never falls out the bottom of this block.
    #[inline]
    pub fn ends_in_dead(&self) -> bool {
        self.ends_in_dead
    }

    /// The block contains nothing apart from an unconditional branch.
    ///
    /// `Nop` and `MarkOffset` instructions are ignored, so a block holding
    /// only markers and a trailing `Br` still counts as empty.
    pub fn is_empty_block(&self) -> bool {
        self.insns.iter().all(|insn| insn.opcode.is_filler())
    }
}
