// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Error hints - suggestions for fixing common mistakes.

use loxpp_ast::token::TokenKind;

/// Get a hint for an "expected X" error based on what was found instead.
pub fn for_expected(expected: &str, found: &TokenKind) -> Option<&'static str> {
    match (expected, found) {
        ("';'", TokenKind::RBrace) => Some("the last statement in a block still needs ';'"),
        ("';'", _) => Some("end statements with ';'"),

        ("'{'", _) => Some("blocks start with '{'"),
        ("'}'", TokenKind::Eof) => Some("every '{' needs a matching '}'"),
        ("'}'", _) => None,

        ("')'", TokenKind::Eof) => Some("add ')' to close the parenthesis"),
        ("']'", TokenKind::Eof) => Some("add ']' to close the bracket"),

        ("':'", TokenKind::Eq) => Some("dictionary entries are written 'key: value'"),
        ("':'", _) => Some("a ternary needs both branches: cond ? a : b"),

        ("'->'", TokenKind::LBrace) => Some("match cases are written 'case pattern -> statement'"),
        ("'in'", _) => Some("for-in loops are written 'for item in items { ... }'"),
        ("'from'", _) => Some("write 'using {a, b} from namespace;'"),

        ("expression", TokenKind::Semi) => Some("statement is incomplete"),
        ("expression", TokenKind::Eq) => Some("put the value after '='"),
        ("expression", TokenKind::RParen) => Some("remove the trailing ','"),
        ("expression", _) => Some("try a value, variable, or function call"),

        ("a name", TokenKind::Number(_)) => Some("names can't start with a number"),
        ("a name", TokenKind::String(_)) => Some("names are written without quotes"),
        ("a name", _) => Some("names start with a letter or '_'"),

        ("property name", _) => Some("properties are names or tuple positions like '.0'"),
        ("dictionary key", _) => Some("keys are names or strings: { name: value }"),

        ("'case'", _) => Some("each arm of a match starts with 'case'"),
        ("'catch'", _) => Some("every 'try' block needs a 'catch name { ... }'"),
        ("'fn'", TokenKind::Ident(_)) => Some("methods are declared with 'fn name(...)'"),

        _ => None,
    }
}
