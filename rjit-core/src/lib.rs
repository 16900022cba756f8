//! rjit-core
//!
//! Basic-block and control-flow-graph core of the rjit back end. The crate
//! owns the per-function representation of basic blocks and the directed
//! edges between them, builds the CFG from the linear block list, and
//! normalizes it with a conservative cleanup pass (unreachable-block
//! elimination, useless-branch rewriting, empty-block merging).
//!
//! # Usage
//! A front end creates a [`FunctionBuilder`], appends blocks and
//! instructions, and binds labels to blocks as it lowers a function. Once
//! emission is done, [`FunctionBuilder::build_cfg`] derives the edges from
//! the block terminators and [`FunctionBuilder::clean_cfg`] brings the graph
//! into normal form for the passes that follow.
//!
//! ```no_run
//! use rjit_core::{FunctionBuilder, Opcode};
//!
//! # fn main() -> Result<(), rjit_core::CfgError> {
//! let mut func = FunctionBuilder::new()?;
//! let body = func.append_block()?;
//! func.record_label(body, 0)?;
//! func.add_insn(body)?.opcode = Opcode::Return;
//! func.set_ends_in_dead(body, true);
//! func.build_cfg()?;
//! func.clean_cfg()?;
//! # Ok(())
//! # }
//! ```
//!
//! Blocks and edges are addressed through `u32`-backed ids into
//! builder-owned arenas, so handles held elsewhere in the compiler survive
//! cleanup; removed blocks linger on a deleted list until the builder is
//! dropped.

pub mod block;
pub mod cfg;
pub mod edge;
pub mod error;
pub mod function;
pub mod insn;
pub mod label;
pub mod meta;

pub use block::{Block, BlockId};
pub use edge::{Edge, EdgeId, EdgeKind};
pub use error::CfgError;
pub use function::{CfgStats, FunctionBuilder};
pub use insn::{Insn, Opcode};
pub use label::{Label, UNDEFINED_LABEL};
pub use meta::{MetaMap, META_RESERVED_BASE};
