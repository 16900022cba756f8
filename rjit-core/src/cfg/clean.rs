//! CFG Cleanup
//!
//! Conservative normalization of the control flow graph, after the Clean
//! algorithm of Cooper & Torczon ("Engineering a Compiler", section 10.3.1;
//! originally presented by Shillner and Lu). Per pass:
//!
//! 1. Unreachable blocks are removed from the live list.
//! 2. The interior of the post-order is scanned for local rewrites:
//!    - a branch to the next list block is replaced with fall-through,
//!    - a conditional branch over an empty block whose branch target matches
//!      is replaced with an unconditional branch,
//!    - an empty block with a single successor is merged into it.
//!
//! The pass repeats with a fresh post-order until a scan changes nothing.
//! The "combine blocks" and "hoist branch" parts of the Clean algorithm are
//! not implemented.
//!
//! Removed blocks land on the deleted list rather than being freed: a block
//! may still be referenced from elsewhere in the compiler, for instance from
//! a value holding its id.

use crate::block::BlockId;
use crate::edge::{EdgeId, EdgeKind};
use crate::error::CfgError;
use crate::function::FunctionBuilder;
use crate::insn::Opcode;
use crate::label::UNDEFINED_LABEL;
use log::{debug, trace};
use smallvec::SmallVec;

impl FunctionBuilder {
    /// Normalize the control flow graph.
    ///
    /// Requires `build_cfg` to have run. On return no unreachable block
    /// remains on the live list and none of the local rewrites applies;
    /// running the pass again changes nothing.
    pub fn clean_cfg(&mut self) -> Result<(), CfgError> {
        self.compute_postorder()?;
        self.eliminate_unreachable()?;

        let mut passes = 0;
        loop {
            passes += 1;
            let mut changed = false;

            // Scan the interior of the post-order. The first and last entries
            // are the deepest DFS leaf and the entry block; neither has a
            // rewrite that applies to it.
            let len = self.block_order.len();
            for index in 1..len.saturating_sub(1) {
                let block = self.block_order[index];
                if self.block(block).succs.is_empty() {
                    continue;
                }
                changed |= self.rewrite_branches(block);
                changed |= self.try_merge_empty(block)?;
            }

            if !changed {
                break;
            }
            self.compute_postorder()?;
            self.eliminate_unreachable()?;
        }

        debug!("clean_cfg: normal form after {} passes, {:?}", passes, self.stats());
        Ok(())
    }

    /// Useless-branch elimination and branch-over-empty collapsing.
    /// Returns true when a rewrite fired.
    fn rewrite_branches(&mut self, block: BlockId) -> bool {
        let first = self.block(block).succs[0];
        if self.edge(first).kind != EdgeKind::Branch {
            return false;
        }
        let Some(next) = self.block(block).next else {
            return false;
        };

        // A conditional branch carries exactly one extra edge, the
        // fall-through, in the second slot. A jump table carries further
        // branch edges instead; rewriting one of its arms would drop the
        // terminator for the rest.
        let nsuccs = self.block(block).succs.len();
        let second_is_fallthru = nsuccs == 2
            && self.edge(self.block(block).succs[1]).kind == EdgeKind::Fallthru;

        if self.edge(first).dst == next {
            if nsuccs > 1 && !second_is_fallthru {
                return false;
            }
            // The branch goes where fall-through would anyway.
            trace!("clean_cfg: useless branch in {:?}", block);
            if let Some(insn) = self.block_mut(block).insns.last_mut() {
                insn.opcode = Opcode::Nop;
            }
            if nsuccs == 1 {
                // Unconditional: the branch edge becomes the fall-through.
                self.block_mut(block).ends_in_dead = false;
                self.edges.get_mut(first).kind = EdgeKind::Fallthru;
            } else {
                // Conditional: drop the branch edge, keep the fall-through.
                self.delete_edge(first);
            }
            return true;
        }

        // Conditional branch over an empty block, both arms reaching the
        // same target: the fall-through arm is dead weight.
        if second_is_fallthru && self.block(next).succs.len() == 1 {
            let next_edge = self.block(next).succs[0];
            if self.edge(next_edge).kind == EdgeKind::Branch
                && self.edge(next_edge).dst == self.edge(first).dst
                && self.block(next).is_empty_block()
            {
                trace!("clean_cfg: branch over empty {:?}", next);
                if let Some(insn) = self.block_mut(block).insns.last_mut() {
                    insn.opcode = Opcode::Br;
                }
                self.block_mut(block).ends_in_dead = true;
                let fallthru = self.block(block).succs[1];
                self.delete_edge(fallthru);
                return true;
            }
        }

        false
    }

    /// Merge `block` into its single successor when the block is empty.
    /// Returns true when the graph changed.
    fn try_merge_empty(&mut self, block: BlockId) -> Result<bool, CfgError> {
        if self.block(block).succs.len() != 1 {
            return Ok(false);
        }
        let succ_edge = self.block(block).succs[0];
        let kind = self.edge(succ_edge).kind;
        if kind != EdgeKind::Branch && kind != EdgeKind::Fallthru {
            return Ok(false);
        }
        if !self.block(block).is_empty_block() {
            return Ok(false);
        }
        let succ_block = self.edge(succ_edge).dst;
        if succ_block == block {
            // Single-block cycle; there is no successor to merge into.
            return Ok(false);
        }

        trace!("clean_cfg: merging empty {:?} into {:?}", block, succ_block);
        let mut changed = false;

        // Labels bound to the dying block retarget to the successor.
        let chain = self.block(block).label;
        self.merge_labels(succ_block, chain);
        self.block_mut(block).label = UNDEFINED_LABEL;

        // Retarget every incoming edge except a fall-through one. A block
        // has at most a single incoming fall-through edge.
        let preds: SmallVec<[EdgeId; 2]> = self.block(block).preds.clone();
        let mut fallthru_edge: Option<EdgeId> = None;
        for &pred in &preds {
            if self.edge(pred).kind == EdgeKind::Fallthru {
                fallthru_edge = Some(pred);
            } else {
                changed = true;
                self.attach_edge_dst(pred, succ_block)?;
            }
        }

        // An incoming fall-through edge can follow the merge only when the
        // outgoing edge falls through as well; the successor is then the
        // next list block and adjacency is preserved. Otherwise the block
        // stays behind as a trampoline holding just that edge.
        if let Some(ft) = fallthru_edge {
            if self.edge(succ_edge).kind == EdgeKind::Fallthru {
                changed = true;
                self.attach_edge_dst(ft, succ_block)?;
                fallthru_edge = None;
            } else if preds.len() > 1 {
                let block_preds = &mut self.block_mut(block).preds;
                block_preds.clear();
                block_preds.push(ft);
            }
        }

        // No incoming edge left: unlink the block and retire it.
        if fallthru_edge.is_none() {
            self.detach_edge_dst(succ_edge);
            self.edges.free(succ_edge);
            self.detach_blocks(block, block);
            self.delete_block(block)?;
            changed = true;
        }

        Ok(changed)
    }

    /// Remove every live block the last traversal did not reach, clearing
    /// the `visited` flags of the survivors.
    pub(crate) fn eliminate_unreachable(&mut self) -> Result<(), CfgError> {
        let mut block = self.entry;
        while block != self.exit {
            let Some(next) = self.block(block).next else { break };
            if self.block(block).visited {
                self.block_mut(block).visited = false;
            } else {
                trace!("clean_cfg: unreachable {:?}", block);
                self.eliminate_block(block)?;
            }
            block = next;
        }
        self.block_mut(self.exit).visited = false;
        Ok(())
    }

    /// Delete `block` along with every edge touching it.
    pub(crate) fn eliminate_block(&mut self, block: BlockId) -> Result<(), CfgError> {
        self.detach_blocks(block, block);

        let succs = std::mem::take(&mut self.block_mut(block).succs);
        for &edge in &succs {
            self.detach_edge_dst(edge);
            self.edges.free(edge);
        }
        let preds = std::mem::take(&mut self.block_mut(block).preds);
        for &edge in &preds {
            self.detach_edge_src(edge);
            self.edges.free(edge);
        }

        self.delete_block(block)
    }

    /// Move `block` to the deleted list, releasing its buffers but keeping
    /// the slot alive for outside references.
    pub(crate) fn delete_block(&mut self, block: BlockId) -> Result<(), CfgError> {
        self.deleted.try_reserve(1)?;
        let b = self.block_mut(block);
        b.insns = Vec::new();
        b.succs = SmallVec::new();
        b.preds = SmallVec::new();
        self.deleted.push(block);
        Ok(())
    }
}
