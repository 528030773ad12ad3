// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The lexer implementation using logos.

use logos::Logos;
use loxpp_ast::token::{Token, TokenKind};
use loxpp_ast::Span;

/// Raw token type for logos; literal values are parsed in a second pass.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum RawToken {
    // === Keywords ===
    #[token("class")]
    Class,
    #[token("extends")]
    Extends,
    #[token("with")]
    With,
    #[token("trait")]
    Trait,
    #[token("abstract")]
    Abstract,
    #[token("static")]
    Static,
    #[token("enum")]
    Enum,
    #[token("namespace")]
    Namespace,
    #[token("using")]
    Using,
    #[token("from")]
    From,
    #[token("fn")]
    Fn,
    #[token("async")]
    Async,
    #[token("await")]
    Await,
    #[token("let")]
    Let,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("match")]
    Match,
    #[token("case")]
    Case,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("throw")]
    Throw,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("is")]
    Is,
    #[token("typeof")]
    Typeof,
    #[token("lazy")]
    Lazy,
    #[token("self")]
    SelfKw,
    #[token("super")]
    Super,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // === Operators ===
    #[token("+")]
    Plus,
    #[token("++")]
    PlusPlus,
    #[token("+=")]
    PlusEq,
    #[token("-")]
    Minus,
    #[token("--")]
    MinusMinus,
    #[token("-=")]
    MinusEq,
    #[token("->")]
    Arrow,
    #[token("*")]
    Star,
    #[token("**")]
    StarStar,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("!=")]
    BangEq,
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("?")]
    Question,
    #[token("??")]
    QuestionQuestion,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,
    #[token("...")]
    Ellipsis,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,

    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    // === Literals ===
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,

    // Strings may span lines
    #[regex(r#""([^"\\]|\\.)*""#)]
    String,

    // Runs to end of input; only wins when there is no closing quote
    #[regex(r#""([^"\\]|\\.)*"#)]
    UnterminatedString,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

/// Maximum number of errors to collect before stopping.
const MAX_ERRORS: usize = 20;

/// The lexer for Lox++ source code.
pub struct Lexer<'a> {
    source: &'a str,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source, collecting up to [`MAX_ERRORS`] errors.
    pub fn tokenize(&mut self) -> LexResult {
        let mut tokens = Vec::new();
        let mut raw_lexer = RawToken::lexer(self.source);

        while let Some(result) = raw_lexer.next() {
            if self.errors.len() >= MAX_ERRORS {
                break;
            }

            let span = raw_lexer.span();
            let kind = match result {
                Ok(raw) => match self.convert_token(raw, raw_lexer.slice(), span.start, span.end) {
                    Ok(kind) => kind,
                    Err(e) => {
                        self.errors.push(e);
                        continue;
                    }
                },
                Err(()) => {
                    let ch = self.source[span.start..].chars().next().unwrap_or('?');
                    self.errors.push(LexError::unexpected_char(ch, span.start));
                    continue;
                }
            };

            tokens.push(Token {
                kind,
                span: Span::new(span.start, span.end),
            });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(self.source.len(), self.source.len()),
        });

        tracing::debug!(
            tokens = tokens.len(),
            errors = self.errors.len(),
            "lexed source"
        );

        LexResult {
            tokens,
            errors: std::mem::take(&mut self.errors),
        }
    }

    fn convert_token(
        &self,
        raw: RawToken,
        slice: &str,
        start: usize,
        end: usize,
    ) -> Result<TokenKind, LexError> {
        Ok(match raw {
            RawToken::Class => TokenKind::Class,
            RawToken::Extends => TokenKind::Extends,
            RawToken::With => TokenKind::With,
            RawToken::Trait => TokenKind::Trait,
            RawToken::Abstract => TokenKind::Abstract,
            RawToken::Static => TokenKind::Static,
            RawToken::Enum => TokenKind::Enum,
            RawToken::Namespace => TokenKind::Namespace,
            RawToken::Using => TokenKind::Using,
            RawToken::From => TokenKind::From,
            RawToken::Fn => TokenKind::Fn,
            RawToken::Async => TokenKind::Async,
            RawToken::Await => TokenKind::Await,
            RawToken::Let => TokenKind::Let,
            RawToken::If => TokenKind::If,
            RawToken::Else => TokenKind::Else,
            RawToken::While => TokenKind::While,
            RawToken::For => TokenKind::For,
            RawToken::In => TokenKind::In,
            RawToken::Match => TokenKind::Match,
            RawToken::Case => TokenKind::Case,
            RawToken::Return => TokenKind::Return,
            RawToken::Break => TokenKind::Break,
            RawToken::Continue => TokenKind::Continue,
            RawToken::Throw => TokenKind::Throw,
            RawToken::Try => TokenKind::Try,
            RawToken::Catch => TokenKind::Catch,
            RawToken::Is => TokenKind::Is,
            RawToken::Typeof => TokenKind::Typeof,
            RawToken::Lazy => TokenKind::Lazy,
            RawToken::SelfKw => TokenKind::SelfKw,
            RawToken::Super => TokenKind::Super,
            RawToken::True => TokenKind::True,
            RawToken::False => TokenKind::False,
            RawToken::Null => TokenKind::Null,

            RawToken::Plus => TokenKind::Plus,
            RawToken::PlusPlus => TokenKind::PlusPlus,
            RawToken::PlusEq => TokenKind::PlusEq,
            RawToken::Minus => TokenKind::Minus,
            RawToken::MinusMinus => TokenKind::MinusMinus,
            RawToken::MinusEq => TokenKind::MinusEq,
            RawToken::Arrow => TokenKind::Arrow,
            RawToken::Star => TokenKind::Star,
            RawToken::StarStar => TokenKind::StarStar,
            RawToken::Slash => TokenKind::Slash,
            RawToken::Percent => TokenKind::Percent,
            RawToken::Bang => TokenKind::Bang,
            RawToken::BangEq => TokenKind::BangEq,
            RawToken::Eq => TokenKind::Eq,
            RawToken::EqEq => TokenKind::EqEq,
            RawToken::Lt => TokenKind::Lt,
            RawToken::LtEq => TokenKind::LtEq,
            RawToken::Gt => TokenKind::Gt,
            RawToken::GtEq => TokenKind::GtEq,
            RawToken::AmpAmp => TokenKind::AmpAmp,
            RawToken::PipePipe => TokenKind::PipePipe,
            RawToken::Question => TokenKind::Question,
            RawToken::QuestionQuestion => TokenKind::QuestionQuestion,
            RawToken::Dot => TokenKind::Dot,
            RawToken::DotDot => TokenKind::DotDot,
            RawToken::Ellipsis => TokenKind::Ellipsis,

            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::LBrace => TokenKind::LBrace,
            RawToken::RBrace => TokenKind::RBrace,
            RawToken::LBracket => TokenKind::LBracket,
            RawToken::RBracket => TokenKind::RBracket,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Semi => TokenKind::Semi,

            RawToken::Number => {
                let value = slice
                    .parse::<f64>()
                    .map_err(|_| LexError::invalid_number(start, end))?;
                TokenKind::Number(value)
            }
            RawToken::String => TokenKind::String(unescape(&slice[1..slice.len() - 1])),
            RawToken::UnterminatedString => {
                return Err(LexError::unterminated_string(start, end));
            }
            RawToken::Ident => TokenKind::Ident(slice.to_string()),

            RawToken::LineComment => unreachable!("comments are skipped by logos"),
        })
    }
}

/// Resolve backslash escapes. Unknown escapes yield the escaped character itself.
fn unescape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('b') => result.push('\u{8}'),
            Some('f') => result.push('\u{c}'),
            Some('0') => result.push('\0'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }

    result
}

/// Result of lexing: tokens plus any errors found.
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

impl LexResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A lexer error with location and friendly message.
#[derive(Debug, Clone)]
pub struct LexError {
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LexError {}

impl LexError {
    fn unexpected_char(ch: char, pos: usize) -> Self {
        let hint = match ch {
            '&' => Some("Lox++ only has the logical operator '&&'"),
            '|' => Some("Lox++ only has the logical operator '||'"),
            '\'' => Some("Strings use double quotes"),
            _ => None,
        };
        Self {
            span: Span::new(pos, pos + ch.len_utf8()),
            message: format!("Unexpected character '{}'.", ch),
            hint: hint.map(String::from),
        }
    }

    fn unterminated_string(start: usize, end: usize) -> Self {
        Self {
            span: Span::new(start, end),
            message: "Unterminated string.".to_string(),
            hint: Some("Add a closing '\"'".to_string()),
        }
    }

    fn invalid_number(start: usize, end: usize) -> Self {
        Self {
            span: Span::new(start, end),
            message: "Invalid number.".to_string(),
            hint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let result = Lexer::new(src).tokenize();
        assert!(result.is_ok(), "lex errors: {:?}", result.errors);
        result.tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("class Point extends Base with Printable"),
            vec![
                TokenKind::Class,
                TokenKind::Ident("Point".into()),
                TokenKind::Extends,
                TokenKind::Ident("Base".into()),
                TokenKind::With,
                TokenKind::Ident("Printable".into()),
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("Self")[0], TokenKind::Ident("Self".into()));
        assert_eq!(kinds("self")[0], TokenKind::SelfKw);
        assert_eq!(kinds("classy")[0], TokenKind::Ident("classy".into()));
    }

    #[test]
    fn longest_operator_wins() {
        assert_eq!(
            kinds("a ?? b ... c .. d ** e -> f"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::QuestionQuestion,
                TokenKind::Ident("b".into()),
                TokenKind::Ellipsis,
                TokenKind::Ident("c".into()),
                TokenKind::DotDot,
                TokenKind::Ident("d".into()),
                TokenKind::StarStar,
                TokenKind::Ident("e".into()),
                TokenKind::Arrow,
                TokenKind::Ident("f".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn numbers_and_ranges() {
        assert_eq!(
            kinds("1.5 0..10"),
            vec![
                TokenKind::Number(1.5),
                TokenKind::Number(0.0),
                TokenKind::DotDot,
                TokenKind::Number(10.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes_and_newlines() {
        assert_eq!(
            kinds("\"a\\tb\\\"c\\q\""),
            vec![TokenKind::String("a\tb\"cq".into()), TokenKind::Eof]
        );
        assert_eq!(
            kinds("\"two\nlines\""),
            vec![TokenKind::String("two\nlines".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("let x; // trailing\nx"),
            vec![
                TokenKind::Let,
                TokenKind::Ident("x".into()),
                TokenKind::Semi,
                TokenKind::Ident("x".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_reported() {
        let result = Lexer::new("let s = \"oops;").tokenize();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "Unterminated string.");
        assert_eq!(result.errors[0].span.start, 8);
    }

    #[test]
    fn unexpected_characters_are_collected() {
        let result = Lexer::new("a & b # c").tokenize();
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].hint.is_some());
        assert_eq!(result.errors[1].message, "Unexpected character '#'.");
        // lexing continues past the errors
        assert_eq!(result.tokens.len(), 4);
    }
}
