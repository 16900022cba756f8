//! Function Builder
//!
//! Owner of everything a function body is made of while it is being compiled:
//! the block arena, the live block list (`entry` to `exit`), the deleted-block
//! list, the edge pool, the label registry, and the computed post-order.
//!
//! # Ownership
//! Blocks and edges are addressed by id and never by reference, so handles
//! held by other parts of the compiler (values, optimizer side tables) stay
//! valid even after cleanup removes a block from the control flow graph.
//! A removed block moves to the deleted list with its instruction buffer and
//! edge vectors released; the slot itself lives until the builder is dropped.
//!
//! # Concurrency
//! Single-threaded per function. The builder is the sole owner of all state;
//! callers serialize access externally.

use crate::block::{Block, BlockId};
use crate::edge::{Edge, EdgeId, EdgePool};
use crate::error::CfgError;
use crate::insn::Insn;
use crate::label::{Label, LabelRegistry, UNDEFINED_LABEL};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Snapshot of builder occupancy, for diagnostics and tooling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfgStats {
    /// Blocks currently on the live list.
    pub live_blocks: usize,
    /// Blocks moved to the deleted list by cleanup.
    pub deleted_blocks: usize,
    /// Edges attached to the graph.
    pub edges_in_use: usize,
    /// Labels bound to some block.
    pub labels_bound: usize,
    /// Capacity of the label table in entries.
    pub label_capacity: usize,
}

/// Per-function builder state for basic blocks and the control flow graph.
#[derive(Debug)]
pub struct FunctionBuilder {
    /// Block arena; holds live and deleted blocks alike.
    pub(crate) blocks: Vec<Block>,
    /// Ids of blocks removed from the graph, kept for outside references.
    pub(crate) deleted: Vec<BlockId>,
    /// First block of the live list. Always present, never removed.
    pub(crate) entry: BlockId,
    /// Last block of the live list. No instructions, no successors.
    pub(crate) exit: BlockId,
    /// Edge pool shared by the whole graph.
    pub(crate) edges: EdgePool,
    /// Label id to block mapping.
    pub(crate) labels: LabelRegistry,
    /// Label of the active catch handler, or `UNDEFINED_LABEL`.
    pub(crate) catcher_label: Label,
    /// Reverse DFS finish order of the reachable blocks.
    pub(crate) block_order: Vec<BlockId>,
}

impl FunctionBuilder {
    /// Create a builder holding the initial `entry` -> `exit` list.
    pub fn new() -> Result<Self, CfgError> {
        let mut func = Self {
            blocks: Vec::new(),
            deleted: Vec::new(),
            entry: BlockId(0),
            exit: BlockId(0),
            edges: EdgePool::default(),
            labels: LabelRegistry::default(),
            catcher_label: UNDEFINED_LABEL,
            block_order: Vec::new(),
        };
        let entry = func.create_block()?;
        let exit = func.create_block()?;
        func.blocks[entry.index()].next = Some(exit);
        func.blocks[exit.index()].prev = Some(entry);
        func.entry = entry;
        func.exit = exit;
        Ok(func)
    }

    /// Entry block id.
    #[inline]
    pub fn entry(&self) -> BlockId {
        self.entry
    }

    /// Exit block id.
    #[inline]
    pub fn exit(&self) -> BlockId {
        self.exit
    }

    /// Read access to a block. The id may name a live or a deleted block.
    #[inline]
    pub fn block(&self, block: BlockId) -> &Block {
        &self.blocks[block.index()]
    }

    #[inline]
    pub(crate) fn block_mut(&mut self, block: BlockId) -> &mut Block {
        &mut self.blocks[block.index()]
    }

    /// Read access to an edge.
    #[inline]
    pub fn edge(&self, edge: EdgeId) -> &Edge {
        self.edges.get(edge)
    }

    /// Allocate a fresh block, detached from the live list.
    pub fn create_block(&mut self) -> Result<BlockId, CfgError> {
        self.blocks.try_reserve(1)?;
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::new());
        Ok(id)
    }

    /// Allocate a fresh block and attach it at the end of the live list,
    /// immediately before `exit`. This is the shape front ends want while
    /// emitting a function top to bottom.
    pub fn append_block(&mut self) -> Result<BlockId, CfgError> {
        let id = self.create_block()?;
        self.attach_blocks_before(self.exit, id, id);
        Ok(id)
    }

    /// Unlink the `[first, last]` range from the live list.
    ///
    /// The range keeps its internal links so it can be reattached elsewhere.
    pub fn detach_blocks(&mut self, first: BlockId, last: BlockId) {
        let before = self.blocks[first.index()].prev;
        let after = self.blocks[last.index()].next;
        if let Some(b) = before {
            self.blocks[b.index()].next = after;
        }
        if let Some(a) = after {
            self.blocks[a.index()].prev = before;
        }
        self.blocks[first.index()].prev = None;
        self.blocks[last.index()].next = None;
    }

    /// Splice the `[first, last]` range into the live list after `block`.
    pub fn attach_blocks_after(&mut self, block: BlockId, first: BlockId, last: BlockId) {
        let after = self.blocks[block.index()].next;
        self.blocks[first.index()].prev = Some(block);
        self.blocks[last.index()].next = after;
        if let Some(a) = after {
            self.blocks[a.index()].prev = Some(last);
        }
        self.blocks[block.index()].next = Some(first);
    }

    /// Splice the `[first, last]` range into the live list before `block`.
    pub fn attach_blocks_before(&mut self, block: BlockId, first: BlockId, last: BlockId) {
        let before = self.blocks[block.index()].prev;
        self.blocks[first.index()].prev = before;
        self.blocks[last.index()].next = Some(block);
        if let Some(b) = before {
            self.blocks[b.index()].next = Some(first);
        }
        self.blocks[block.index()].prev = Some(last);
    }

    /// Iterate the live list front to back; a `None` seed returns `entry`.
    #[inline]
    pub fn next_block(&self, previous: Option<BlockId>) -> Option<BlockId> {
        match previous {
            Some(block) => self.blocks[block.index()].next,
            None => Some(self.entry),
        }
    }

    /// Iterate the live list back to front; a `None` seed returns `exit`.
    #[inline]
    pub fn prev_block(&self, previous: Option<BlockId>) -> Option<BlockId> {
        match previous {
            Some(block) => self.blocks[block.index()].prev,
            None => Some(self.exit),
        }
    }

    /// Number of blocks on the live list.
    pub fn num_blocks(&self) -> usize {
        let mut count = 0;
        let mut block = self.next_block(None);
        while let Some(id) = block {
            count += 1;
            block = self.next_block(Some(id));
        }
        count
    }

    /// True when `block` has been removed from the graph by cleanup.
    pub fn is_deleted(&self, block: BlockId) -> bool {
        self.deleted.contains(&block)
    }

    /// Append a zero-initialized instruction slot to `block` and return it.
    pub fn add_insn(&mut self, block: BlockId) -> Result<&mut Insn, CfgError> {
        self.blocks[block.index()].add_insn()
    }

    /// Last instruction of `block`, or `None` when the block is empty.
    #[inline]
    pub fn last_insn(&self, block: BlockId) -> Option<&Insn> {
        self.blocks[block.index()].last_insn()
    }

    /// True when no block after `block` on the live list has instructions.
    pub fn is_final(&self, block: BlockId) -> bool {
        let mut cursor = self.blocks[block.index()].next;
        while let Some(id) = cursor {
            if !self.blocks[id.index()].insns.is_empty() {
                return false;
            }
            cursor = self.blocks[id.index()].next;
        }
        true
    }

    /// Bind `label` to `block`, prepending it to the block's alias chain.
    pub fn record_label(&mut self, block: BlockId, label: Label) -> Result<(), CfgError> {
        self.labels.grow_for(label)?;
        let head = self.blocks[block.index()].label;
        self.labels.bind(label, block, head);
        self.blocks[block.index()].label = label;
        Ok(())
    }

    /// Block bound to `label`, or `None`.
    #[inline]
    pub fn block_from_label(&self, label: Label) -> Option<BlockId> {
        self.labels.block_of(label)
    }

    /// Head of `block`'s label chain, or `UNDEFINED_LABEL`.
    #[inline]
    pub fn block_label(&self, block: BlockId) -> Label {
        self.blocks[block.index()].label
    }

    /// Walk the labels bound to `block`.
    ///
    /// Seeding with `UNDEFINED_LABEL` yields the chain head; seeding with a
    /// label yields its alias, provided the label is in fact bound to
    /// `block`. The chain terminates with `UNDEFINED_LABEL`.
    pub fn next_label(&self, block: BlockId, label: Label) -> Label {
        if label == UNDEFINED_LABEL {
            return self.blocks[block.index()].label;
        }
        self.labels.alias_of(label, block)
    }

    /// Re-point every label on the chain headed by `label` to `block`,
    /// splicing the chain onto the block's own.
    pub(crate) fn merge_labels(&mut self, block: BlockId, label: Label) {
        let mut label = label;
        while label != UNDEFINED_LABEL {
            let head = self.blocks[block.index()].label;
            let info = self.labels.entry_mut(label);
            let alias = info.alias;
            info.block = Some(block);
            info.alias = head;
            self.blocks[block.index()].label = label;
            label = alias;
        }
    }

    /// Label of the active catch handler used for exception edges.
    #[inline]
    pub fn catcher_label(&self) -> Label {
        self.catcher_label
    }

    /// Set the active catch handler label; `UNDEFINED_LABEL` routes
    /// exception edges to `exit`.
    #[inline]
    pub fn set_catcher_label(&mut self, label: Label) {
        self.catcher_label = label;
    }

    /// True when control never falls out the bottom of `block`.
    #[inline]
    pub fn ends_in_dead(&self, block: BlockId) -> bool {
        self.blocks[block.index()].ends_in_dead
    }

    /// Record whether `block`'s terminator ends the fall-through path.
    /// Maintained by the front end as it emits terminators, and rewritten by
    /// CFG cleanup when it rewrites terminators.
    #[inline]
    pub fn set_ends_in_dead(&mut self, block: BlockId, value: bool) {
        self.blocks[block.index()].ends_in_dead = value;
    }

    /// Conservative reachability test over fall-through control flow only.
    ///
    /// Walks backwards from `block` while blocks are unlabeled; the block is
    /// reachable when the walk stops at `entry` or at a labeled block, and
    /// unreachable when it stops because some predecessor never falls
    /// through. When in doubt this errs toward "reachable"; cleanup uses the
    /// full DFS instead.
    pub fn is_reachable(&self, block: BlockId) -> bool {
        let mut cursor = block;
        while cursor != self.entry && self.blocks[cursor.index()].label == UNDEFINED_LABEL {
            match self.blocks[cursor.index()].prev {
                Some(prev) => {
                    if self.blocks[prev.index()].ends_in_dead {
                        return false;
                    }
                    cursor = prev;
                }
                // Detached from the live list; nothing falls through to it.
                None => return false,
            }
        }
        true
    }

    /// True when the current emission point of the function is dead: the
    /// last block either ends dead or cannot be reached at all.
    pub fn current_is_dead(&self) -> bool {
        match self.prev_block(None) {
            Some(block) => self.ends_in_dead(block) || !self.is_reachable(block),
            None => true,
        }
    }

    /// Tag `block` with metadata under `tag`, dropping any previous value.
    ///
    /// Tag values of 10000 or greater are reserved for internal use.
    pub fn set_meta<T: Any>(&mut self, block: BlockId, tag: i32, value: T) {
        self.blocks[block.index()].meta.set(tag, value);
    }

    /// Metadata stored on `block` under `tag`, if present with type `T`.
    pub fn get_meta<T: Any>(&self, block: BlockId, tag: i32) -> Option<&T> {
        self.blocks[block.index()].meta.get::<T>(tag)
    }

    /// Drop the metadata stored on `block` under `tag`.
    pub fn free_meta(&mut self, block: BlockId, tag: i32) {
        self.blocks[block.index()].meta.free(tag);
    }

    /// Post-order computed by the last `compute_postorder` call.
    #[inline]
    pub fn postorder(&self) -> &[BlockId] {
        &self.block_order
    }

    /// Current occupancy snapshot.
    pub fn stats(&self) -> CfgStats {
        CfgStats {
            live_blocks: self.num_blocks(),
            deleted_blocks: self.deleted.len(),
            edges_in_use: self.edges.in_use(),
            labels_bound: self.labels.bound_count(),
            label_capacity: self.labels.capacity(),
        }
    }
}
