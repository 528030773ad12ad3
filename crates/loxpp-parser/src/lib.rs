// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Parser for Lox++.
//!
//! Transforms a token stream into statements. A few surface forms are
//! desugared here: C-style `for`, arrow bodies, `+=`/`-=`, and data-class
//! initializers.

mod hints;
mod parser;

pub use parser::{ParseError, ParseResult, Parser};
