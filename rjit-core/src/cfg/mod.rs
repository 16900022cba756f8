//! Control Flow Graph Services
//!
//! Everything that turns a linear block list into a graph and back into a
//! normal form: edge derivation from terminators, iterative post-order
//! traversal, and the cleanup pass based on the Clean algorithm from
//! "Engineering a Compiler" (Cooper & Torczon, section 10.3.1, originally by
//! Shillner and Lu).

pub mod build;
pub mod clean;
pub mod postorder;
