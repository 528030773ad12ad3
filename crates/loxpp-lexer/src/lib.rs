// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Lexer for Lox++.
//!
//! Turns source text into the token stream the parser consumes.

mod lexer;

pub use lexer::{LexError, LexResult, Lexer};
