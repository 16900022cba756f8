//! Post-Order Traversal
//!
//! Iterative depth-first search over the successor edges, emitting each block
//! after all of its successors. A recursive formulation would be simpler but
//! overflows the thread stack on long block chains, so the traversal keeps an
//! explicit stack of `(block, child index)` frames instead.

use crate::block::BlockId;
use crate::error::CfgError;
use crate::function::FunctionBuilder;
use log::debug;

/// One in-progress DFS frame.
#[derive(Debug, Clone, Copy)]
struct StackEntry {
    block: BlockId,
    index: usize,
}

impl FunctionBuilder {
    /// Compute the post-order of the blocks reachable from `entry`.
    ///
    /// The order is stored on the builder and read back with `postorder`.
    /// Every reachable block appears exactly once and `entry` is last. The
    /// traversal leaves `visited` set on each reachable block; cleanup
    /// consumes the flags, and the next `compute_postorder` call resets them.
    pub fn compute_postorder(&mut self) -> Result<(), CfgError> {
        let mut num_blocks = 0;
        let mut cursor = Some(self.entry);
        while let Some(id) = cursor {
            let block = self.block_mut(id);
            block.visited = false;
            num_blocks += 1;
            cursor = block.next;
        }

        // Worst case every live block lands on the stack and in the order,
        // so one exact reservation each keeps the hot loop allocation-free.
        let mut order: Vec<BlockId> = Vec::new();
        order.try_reserve_exact(num_blocks)?;
        let mut stack: Vec<StackEntry> = Vec::new();
        stack.try_reserve_exact(num_blocks)?;

        self.block_mut(self.entry).visited = true;
        stack.push(StackEntry { block: self.entry, index: 0 });

        while !stack.is_empty() {
            let top = stack.len() - 1;
            let block = stack[top].block;
            let index = stack[top].index;
            if index == self.block(block).succs.len() {
                stack.pop();
                order.push(block);
            } else {
                stack[top].index = index + 1;
                let edge = self.block(block).succs[index];
                let succ = self.edge(edge).dst;
                if !self.block(succ).visited {
                    self.block_mut(succ).visited = true;
                    stack.push(StackEntry { block: succ, index: 0 });
                }
            }
        }

        debug!("compute_postorder: {} of {} blocks reachable", order.len(), num_blocks);
        self.block_order = order;
        Ok(())
    }
}
