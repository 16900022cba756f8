//! Instruction IR
//!
//! This module defines the instruction representation that block bodies are
//! made of, and the opcode classification the CFG builder depends on.
//!
//! # Memory Optimizations
//! - `Opcode` uses `#[repr(u8)]` to save 3-7 bytes per instruction slot
//! - Instruction slots are zero-initialized via `Default` and filled in place
//!
//! # Opcode Ordering
//! The discriminant values are part of the contract: the CFG builder
//! classifies terminators with ordered range checks (conditional branches sit
//! in `(Br, BrNfgeInv]`, returns in `[Return, ReturnSmallStruct]`, calls in
//! `[Call, CallExternalTail]`). Inserting a new opcode inside one of these
//! ranges extends the corresponding class; inserting outside leaves the
//! classification untouched.

use crate::label::{Label, UNDEFINED_LABEL};

/// Instruction opcode.
///
/// # Memory Optimization
/// Uses `#[repr(u8)]` to reduce size from default enum size (4-8 bytes)
/// to 1 byte for the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)] // Save 3-7 bytes per enum (default size -> 1 byte)
pub enum Opcode {
    /// No operation; ignored by the empty-block test.
    Nop = 0,
    /// Bytecode-offset marker for debuggers; ignored by the empty-block test.
    MarkOffset = 1,

    // Straight-line operations. None of these affect control flow; the CFG
    // builder treats a block ending in any of them as plain fall-through.
    Add = 2,
    Sub = 3,
    Mul = 4,
    Div = 5,
    Load = 6,
    Store = 7,
    Move = 8,
    Compare = 9,

    /// Unconditional branch to the label in `dest`.
    Br = 10,

    // Conditional branches, `(Br, BrNfgeInv]`. Each branches to `dest` when
    // its condition holds and falls through otherwise.
    BrIfTrue = 11,
    BrIfFalse = 12,
    BrEq = 13,
    BrNe = 14,
    BrLt = 15,
    BrLe = 16,
    BrGt = 17,
    BrGe = 18,
    /// Inverted not-greater-or-equal float compare-and-branch; the last
    /// conditional branch opcode.
    BrNfgeInv = 19,

    // Return variants, `[Return, ReturnSmallStruct]`.
    Return = 20,
    ReturnInt = 21,
    ReturnFloat = 22,
    ReturnSmallStruct = 23,

    /// Raise an exception.
    Throw = 24,
    /// Re-raise the in-flight exception.
    Rethrow = 25,

    /// Transfer into a `finally` handler bound to `dest`.
    CallFinally = 26,
    /// Transfer into a `filter` handler bound to `dest`.
    CallFilter = 27,

    // Calls that may raise, `[Call, CallExternalTail]`.
    Call = 28,
    CallIndirect = 29,
    CallVtable = 30,
    CallExternal = 31,
    CallExternalTail = 32,

    /// N-way branch; targets are carried in the instruction's `targets` list.
    JumpTable = 33,
}

impl Opcode {
    /// Unconditional branch test.
    #[inline] // Hot path - called for every terminator
    pub fn is_branch(self) -> bool {
        self == Opcode::Br
    }

    /// Conditional branch test, the `(Br, BrNfgeInv]` range.
    #[inline] // Hot path - called for every terminator
    pub fn is_cond_branch(self) -> bool {
        (self as u8) > (Opcode::Br as u8) && (self as u8) <= (Opcode::BrNfgeInv as u8)
    }

    /// Return-variant test, the `[Return, ReturnSmallStruct]` range.
    #[inline] // Hot path - called for every terminator
    pub fn is_return(self) -> bool {
        (self as u8) >= (Opcode::Return as u8) && (self as u8) <= (Opcode::ReturnSmallStruct as u8)
    }

    /// Exception-raise test.
    #[inline]
    pub fn is_throw(self) -> bool {
        matches!(self, Opcode::Throw | Opcode::Rethrow)
    }

    /// Exception-region transfer test.
    #[inline]
    pub fn is_region_transfer(self) -> bool {
        matches!(self, Opcode::CallFinally | Opcode::CallFilter)
    }

    /// Call test, the `[Call, CallExternalTail]` range. Any of these may
    /// raise, so they carry an exception edge.
    #[inline] // Hot path - called for every terminator
    pub fn is_call(self) -> bool {
        (self as u8) >= (Opcode::Call as u8) && (self as u8) <= (Opcode::CallExternalTail as u8)
    }

    /// True when control cannot fall out of a block ending in this opcode.
    ///
    /// Front ends use this to maintain the block's `ends_in_dead` flag while
    /// emitting instructions.
    #[inline]
    pub fn kills_fallthrough(self) -> bool {
        self == Opcode::Br || self.is_return() || self.is_throw()
    }

    /// True for opcodes the empty-block test ignores.
    ///
    /// A block whose every instruction satisfies this predicate contains
    /// nothing apart from an unconditional branch and can be merged away.
    #[inline]
    pub fn is_filler(self) -> bool {
        matches!(self, Opcode::Nop | Opcode::MarkOffset | Opcode::Br)
    }
}

/// A single instruction slot.
///
/// Slots are handed out zero-initialized by `FunctionBuilder::add_insn` and
/// filled in by the front end. Only the fields the CFG builder reads are
/// modeled: the opcode, the branch/handler target label, a pair of opaque
/// operand words, and the jump-table target list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insn {
    /// Operation this slot performs.
    pub opcode: Opcode,
    /// Target label of branch and handler-transfer opcodes.
    pub dest: Label,
    /// First opaque operand word.
    pub value1: u32,
    /// Second opaque operand word.
    pub value2: u32,
    /// Jump-table targets; empty for every other opcode.
    pub targets: Vec<Label>,
}

impl Default for Insn {
    fn default() -> Self {
        Self {
            opcode: Opcode::Nop,
            dest: UNDEFINED_LABEL,
            value1: 0,
            value2: 0,
            targets: Vec::new(),
        }
    }
}
