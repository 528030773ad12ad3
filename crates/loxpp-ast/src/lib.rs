// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Abstract syntax tree for Lox++.
//!
//! Shared by the lexer, parser, resolver, and interpreter. The tree is
//! immutable after parsing except for the [`expr::Binding`] slots the
//! resolver fills in.

pub mod expr;
pub mod span;
pub mod stmt;
pub mod token;

pub use span::{LineMap, Location, Span};

/// Unique identifier for AST nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    pub const DUMMY: NodeId = NodeId(u32::MAX);
}
