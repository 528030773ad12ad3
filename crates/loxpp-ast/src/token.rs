// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Tokens produced by the lexer.

use crate::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(String),
    Ident(String),

    // Keywords
    Class,
    Extends,
    With,
    Trait,
    Abstract,
    Static,
    Enum,
    Namespace,
    Using,
    From,
    Fn,
    Async,
    Await,
    Let,
    If,
    Else,
    While,
    For,
    In,
    Match,
    Case,
    Return,
    Break,
    Continue,
    Throw,
    Try,
    Catch,
    Is,
    Typeof,
    Lazy,
    SelfKw,
    Super,
    True,
    False,
    Null,

    // Operators
    Plus,
    PlusPlus,
    PlusEq,
    Minus,
    MinusMinus,
    MinusEq,
    Arrow,
    Star,
    StarStar,
    Slash,
    Percent,
    Bang,
    BangEq,
    Eq,
    EqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AmpAmp,
    PipePipe,
    Question,
    QuestionQuestion,
    Dot,
    DotDot,
    Ellipsis,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Semi,

    Eof,
}

impl TokenKind {
    /// Human-readable name used in "expected X, found Y" messages.
    pub fn display_name(&self) -> &'static str {
        use TokenKind::*;
        match self {
            Number(_) => "a number",
            String(_) => "a string",
            Ident(_) => "a name",

            Class => "'class'",
            Extends => "'extends'",
            With => "'with'",
            Trait => "'trait'",
            Abstract => "'abstract'",
            Static => "'static'",
            Enum => "'enum'",
            Namespace => "'namespace'",
            Using => "'using'",
            From => "'from'",
            Fn => "'fn'",
            Async => "'async'",
            Await => "'await'",
            Let => "'let'",
            If => "'if'",
            Else => "'else'",
            While => "'while'",
            For => "'for'",
            In => "'in'",
            Match => "'match'",
            Case => "'case'",
            Return => "'return'",
            Break => "'break'",
            Continue => "'continue'",
            Throw => "'throw'",
            Try => "'try'",
            Catch => "'catch'",
            Is => "'is'",
            Typeof => "'typeof'",
            Lazy => "'lazy'",
            SelfKw => "'self'",
            Super => "'super'",
            True => "'true'",
            False => "'false'",
            Null => "'null'",

            Plus => "'+'",
            PlusPlus => "'++'",
            PlusEq => "'+='",
            Minus => "'-'",
            MinusMinus => "'--'",
            MinusEq => "'-='",
            Arrow => "'->'",
            Star => "'*'",
            StarStar => "'**'",
            Slash => "'/'",
            Percent => "'%'",
            Bang => "'!'",
            BangEq => "'!='",
            Eq => "'='",
            EqEq => "'=='",
            Lt => "'<'",
            LtEq => "'<='",
            Gt => "'>'",
            GtEq => "'>='",
            AmpAmp => "'&&'",
            PipePipe => "'||'",
            Question => "'?'",
            QuestionQuestion => "'??'",
            Dot => "'.'",
            DotDot => "'..'",
            Ellipsis => "'...'",

            LParen => "'('",
            RParen => "')'",
            LBrace => "'{'",
            RBrace => "'}'",
            LBracket => "'['",
            RBracket => "']'",
            Colon => "':'",
            Comma => "','",
            Semi => "';'",

            Eof => "end of file",
        }
    }

    /// True for tokens that begin a declaration or statement; used for recovery.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::Class
                | TokenKind::Trait
                | TokenKind::Enum
                | TokenKind::Namespace
                | TokenKind::Using
                | TokenKind::Fn
                | TokenKind::Let
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Match
                | TokenKind::Return
                | TokenKind::Throw
                | TokenKind::Try
        )
    }
}
