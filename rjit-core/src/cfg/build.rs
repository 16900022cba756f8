//! CFG Construction
//!
//! Derives the edges of the control flow graph from each block's terminator.
//! Construction runs the classification twice: a counting pass first, so the
//! predecessor/successor vectors can be sized exactly, then a second pass
//! that allocates and installs the edges.
//!
//! # Terminator Classification
//! - Return variants produce a `Return` edge to `exit`
//! - Unconditional and conditional branches produce a `Branch` edge to the
//!   block bound to the instruction's target label
//! - Throws and calls produce an `Except` edge to the current catcher block,
//!   or to `exit` when no catcher is set
//! - `CallFinally`/`CallFilter` produce an `Except` edge to the handler label
//! - `JumpTable` produces one `Branch` edge per table entry
//! - Unless the block ends dead, a `Fallthru` edge to the next list block is
//!   added after the explicit edge
//!
//! Any unbound label encountered here fails the build with `UndefinedLabel`.

use crate::block::BlockId;
use crate::edge::EdgeKind;
use crate::error::CfgError;
use crate::function::FunctionBuilder;
use crate::insn::Opcode;
use crate::label::{Label, UNDEFINED_LABEL};
use log::debug;
use smallvec::SmallVec;

impl FunctionBuilder {
    /// Build the control flow graph edges for the whole function.
    ///
    /// # Errors
    /// `UndefinedLabel` if a terminator names a label with no bound block,
    /// `OutOfMemory` if edge or vector allocation fails. Either error leaves
    /// the builder in a partially counted state; the caller abandons the
    /// function build.
    pub fn build_cfg(&mut self) -> Result<(), CfgError> {
        // TODO: handle catch, finally and filter regions with a scope stack.
        self.build_edges(false)?;
        self.alloc_edges()?;
        self.build_edges(true)?;
        debug!(
            "build_cfg: {} blocks, {} edges",
            self.num_blocks(),
            self.stats().edges_in_use
        );
        Ok(())
    }

    /// Classify every non-exit block's terminator, either counting edges
    /// (`create == false`) or allocating and installing them.
    fn build_edges(&mut self, create: bool) -> Result<(), CfgError> {
        let mut src = self.entry;
        while src != self.exit {
            let Some(next) = self.block(src).next else { break };

            let (opcode, dest, targets) = match self.last_insn(src) {
                Some(insn) => (
                    insn.opcode,
                    insn.dest,
                    if insn.opcode == Opcode::JumpTable { insn.targets.clone() } else { Vec::new() },
                ),
                None => (Opcode::Nop, UNDEFINED_LABEL, Vec::new()),
            };

            let explicit = if opcode.is_return() {
                Some((self.exit, EdgeKind::Return))
            } else if opcode.is_branch() || opcode.is_cond_branch() {
                Some((self.target_block(dest)?, EdgeKind::Branch))
            } else if opcode.is_throw() {
                Some((self.catcher_block(), EdgeKind::Except))
            } else if opcode.is_region_transfer() {
                Some((self.target_block(dest)?, EdgeKind::Except))
            } else if opcode.is_call() {
                Some((self.catcher_block(), EdgeKind::Except))
            } else if opcode == Opcode::JumpTable {
                for &target in &targets {
                    let dst = self.target_block(target)?;
                    self.add_cfg_edge(src, dst, EdgeKind::Branch, create)?;
                }
                None
            } else {
                None
            };

            if let Some((dst, kind)) = explicit {
                self.add_cfg_edge(src, dst, kind, create)?;
            }
            if !self.block(src).ends_in_dead {
                self.add_cfg_edge(src, next, EdgeKind::Fallthru, create)?;
            }

            src = next;
        }
        Ok(())
    }

    /// Block bound to a terminator's target label.
    fn target_block(&self, label: Label) -> Result<BlockId, CfgError> {
        self.block_from_label(label).ok_or(CfgError::UndefinedLabel(label))
    }

    /// Block that receives exception edges: the current catcher if one is
    /// bound, otherwise `exit`.
    fn catcher_block(&self) -> BlockId {
        self.block_from_label(self.catcher_label).unwrap_or(self.exit)
    }

    /// Count an edge or install it, depending on the pass.
    fn add_cfg_edge(
        &mut self,
        src: BlockId,
        dst: BlockId,
        kind: EdgeKind,
        create: bool,
    ) -> Result<(), CfgError> {
        if create {
            let edge = self.edges.alloc(src, dst, kind)?;
            self.block_mut(src).succs.push(edge);
            self.block_mut(dst).preds.push(edge);
        } else {
            self.block_mut(src).num_succs += 1;
            self.block_mut(dst).num_preds += 1;
        }
        Ok(())
    }

    /// Size every block's edge vectors from the counting pass, then reset
    /// the counters for the creation pass.
    fn alloc_edges(&mut self) -> Result<(), CfgError> {
        let mut cursor = Some(self.entry);
        while let Some(id) = cursor {
            let block = self.block_mut(id);
            block.succs = SmallVec::new();
            block.succs.try_reserve(block.num_succs as usize)?;
            block.num_succs = 0;
            block.preds = SmallVec::new();
            block.preds.try_reserve(block.num_preds as usize)?;
            block.num_preds = 0;
            cursor = block.next;
        }
        Ok(())
    }
}
