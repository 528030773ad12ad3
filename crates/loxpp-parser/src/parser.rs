// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The parser implementation: recursive descent for statements, Pratt
//! parsing for expressions.

use std::sync::Arc;

use loxpp_ast::expr::{BinOp, Binding, DictEntry, Expr, ExprKind, Literal, LogicalOp, UnaryOp};
use loxpp_ast::stmt::{
    ClassDecl, DestructureKind, EnumDecl, FnDecl, MatchCase, Param, Pattern, Stmt, StmtKind,
    TraitDecl, VariantDecl, DISCARD,
};
use loxpp_ast::token::{Token, TokenKind};
use loxpp_ast::{NodeId, Span};

/// Maximum number of errors to collect before stopping.
const MAX_ERRORS: usize = 20;

/// Maximum number of parameters or call arguments.
const MAX_ARGS: usize = 255;

/// The parser for Lox++ source code.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
    next_node_id: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_id_base(tokens, 0)
    }

    /// Start node numbering at `base`, so trees from separate parses (the
    /// prelude, REPL lines) never share node ids.
    pub fn with_id_base(tokens: Vec<Token>, base: u32) -> Self {
        let mut tokens = tokens;
        if !matches!(tokens.last(), Some(Token { kind: TokenKind::Eof, .. })) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: Span::new(end, end),
            });
        }
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            next_node_id: base,
        }
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    /// Record error, return if should continue.
    fn record_error(&mut self, error: ParseError) -> bool {
        self.errors.push(error);
        self.errors.len() < MAX_ERRORS
    }

    /// Skip to the next statement boundary after an error.
    fn synchronize(&mut self) {
        let mut brace_depth = 0usize;

        while !self.at_end() {
            match self.current_kind() {
                TokenKind::Semi if brace_depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::LBrace => {
                    brace_depth += 1;
                    self.advance();
                }
                TokenKind::RBrace => {
                    if brace_depth == 0 {
                        return;
                    }
                    brace_depth -= 1;
                    self.advance();
                    if brace_depth == 0 {
                        return;
                    }
                }
                kind if brace_depth == 0 && kind.starts_statement() => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // =========================================================================
    // Token Navigation
    // =========================================================================

    fn current(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> &Token {
        if !self.at_end() {
            self.pos += 1;
        }
        &self.tokens[self.pos.saturating_sub(1)]
    }

    /// End offset of the most recently consumed token.
    fn prev_end(&self) -> usize {
        self.tokens[self.pos.saturating_sub(1)].span.end
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<&Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::expected(
                kind.display_name(),
                self.current_kind(),
                self.current().span,
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        self.expect_named("a name")
    }

    fn expect_named(&mut self, what: &str) -> Result<String, ParseError> {
        match self.current_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(ParseError::expected(what, &other, self.current().span)),
        }
    }

    fn expect_semi(&mut self) -> Result<(), ParseError> {
        if self.check(&TokenKind::Semi) {
            self.advance();
            return Ok(());
        }
        // Point just past the statement rather than at the next token.
        let end = self.prev_end();
        Err(ParseError::expected("';'", self.current_kind(), Span::new(end, end)))
    }

    fn make_expr(&mut self, kind: ExprKind, start: usize) -> Expr {
        let end = self.prev_end();
        Expr::new(self.next_id(), kind, Span::new(start, end))
    }

    fn make_stmt(&mut self, kind: StmtKind, start: usize) -> Stmt {
        let end = self.prev_end();
        Stmt::new(self.next_id(), kind, Span::new(start, end))
    }

    // =========================================================================
    // Top-Level Parsing
    // =========================================================================

    pub fn parse(&mut self) -> ParseResult {
        let mut stmts = Vec::new();

        while !self.at_end() {
            match self.parse_declaration() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => {
                    if !self.record_error(e) {
                        break;
                    }
                    self.synchronize();
                    // A stray '}' at top level would otherwise stall recovery.
                    if self.check(&TokenKind::RBrace) {
                        self.advance();
                    }
                }
            }
        }

        tracing::debug!(
            stmts = stmts.len(),
            errors = self.errors.len(),
            "parsed program"
        );

        ParseResult {
            stmts,
            errors: std::mem::take(&mut self.errors),
            next_node_id: self.next_node_id,
        }
    }

    fn parse_declaration(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current().span.start;
        let kind = match self.current_kind() {
            TokenKind::Class => {
                self.advance();
                StmtKind::Class(self.parse_class()?)
            }
            TokenKind::Trait => {
                self.advance();
                StmtKind::Trait(self.parse_trait()?)
            }
            TokenKind::Enum => {
                self.advance();
                StmtKind::Enum(self.parse_enum()?)
            }
            TokenKind::Namespace => {
                self.advance();
                self.parse_namespace()?
            }
            TokenKind::Using => {
                self.advance();
                self.parse_using()?
            }
            TokenKind::Let => {
                self.advance();
                self.parse_let()?
            }
            TokenKind::Fn if self.is_named_function() => {
                self.advance();
                let is_async = self.match_token(&TokenKind::Async);
                StmtKind::Function(Arc::new(self.parse_function(is_async, false)?))
            }
            _ => return self.parse_statement(),
        };
        Ok(self.make_stmt(kind, start))
    }

    /// `fn name(` or `fn async name(`, as opposed to a lambda expression.
    fn is_named_function(&self) -> bool {
        match self.peek(1) {
            TokenKind::Ident(_) => true,
            TokenKind::Async => matches!(self.peek(2), TokenKind::Ident(_)),
            _ => false,
        }
    }

    /// Parse `name(params) body`, where body is a block or `-> expr;`.
    fn parse_function(&mut self, is_async: bool, is_abstract: bool) -> Result<FnDecl, ParseError> {
        let start = self.current().span.start;
        let name = self.expect_ident()?;
        let params = self.parse_params()?;

        let body = if is_abstract {
            self.expect_semi()?;
            Vec::new()
        } else if self.check(&TokenKind::Arrow) {
            let body = self.parse_arrow_body()?;
            self.expect_semi()?;
            body
        } else {
            self.parse_block_body()?
        };

        Ok(FnDecl {
            name: Some(name),
            params,
            body,
            is_async,
            is_abstract,
            span: Span::new(start, self.prev_end()),
        })
    }

    /// `-> expr`, desugared to `{ return expr; }`.
    fn parse_arrow_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let start = self.expect(&TokenKind::Arrow)?.span.start;
        let value = self.parse_expr()?;
        Ok(vec![self.make_stmt(StmtKind::Return(Some(value)), start)])
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();

        if !self.check(&TokenKind::RParen) {
            loop {
                let span = self.current().span;
                if params.len() >= MAX_ARGS {
                    return Err(ParseError::new(
                        "Can't have more than 255 parameters.",
                        span,
                    ));
                }
                let name = self.expect_ident()?;
                params.push(Param { name, span });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(&TokenKind::RParen)?;
        Ok(params)
    }

    /// `A`, `ns.A`, `ns.inner.A`: a name with optional dotted access.
    fn parse_dotted_name(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span.start;
        let name = self.expect_ident()?;
        let mut expr = self.make_expr(
            ExprKind::Variable {
                name,
                binding: Binding::new(),
            },
            start,
        );
        while self.match_token(&TokenKind::Dot) {
            let name = self.expect_ident()?;
            expr = self.make_expr(
                ExprKind::Get {
                    object: Box::new(expr),
                    name,
                },
                start,
            );
        }
        Ok(expr)
    }

    fn parse_trait_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut traits = Vec::new();
        if self.match_token(&TokenKind::With) {
            loop {
                traits.push(self.parse_dotted_name()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(traits)
    }

    fn parse_class(&mut self) -> Result<ClassDecl, ParseError> {
        let name_span = self.current().span;
        let name = self.expect_ident()?;

        let mut fields = Vec::new();
        let is_data = self.check(&TokenKind::LParen);
        if is_data {
            fields = self
                .parse_params()?
                .into_iter()
                .map(|p| p.name)
                .collect();
        }

        let superclass = if self.match_token(&TokenKind::Extends) {
            Some(self.parse_dotted_name()?)
        } else {
            None
        };
        let traits = self.parse_trait_list()?;

        let mut methods = Vec::new();
        let mut static_methods = Vec::new();

        if is_data && self.match_token(&TokenKind::Semi) {
            // body-less data class
        } else {
            self.expect(&TokenKind::LBrace)?;
            while !self.check(&TokenKind::RBrace) && !self.at_end() {
                let is_static = self.match_token(&TokenKind::Static);
                self.expect(&TokenKind::Fn)?;
                let is_async = self.match_token(&TokenKind::Async);
                let method = self.parse_function(is_async, false)?;

                if is_data && !is_static && method.name.as_deref() == Some("init") {
                    return Err(ParseError::new(
                        "A data class can't declare an 'init' method.",
                        method.span,
                    )
                    .with_hint("the field list already defines the initializer"));
                }

                if is_static {
                    static_methods.push(Arc::new(method));
                } else {
                    methods.push(Arc::new(method));
                }
            }
            self.expect(&TokenKind::RBrace)?;
        }

        if is_data {
            methods.insert(0, Arc::new(self.data_class_init(&fields, name_span)));
        }

        Ok(ClassDecl {
            name,
            superclass,
            traits,
            methods,
            static_methods,
            fields,
        })
    }

    /// `init(a, b) { self.a = a; self.b = b; }`
    fn data_class_init(&mut self, fields: &[String], span: Span) -> FnDecl {
        let mut body = Vec::with_capacity(fields.len());
        for field in fields {
            let object = Expr::new(
                self.next_id(),
                ExprKind::SelfRef {
                    binding: Binding::new(),
                },
                span,
            );
            let value = Expr::new(
                self.next_id(),
                ExprKind::Variable {
                    name: field.clone(),
                    binding: Binding::new(),
                },
                span,
            );
            let set = Expr::new(
                self.next_id(),
                ExprKind::Set {
                    object: Box::new(object),
                    name: field.clone(),
                    value: Box::new(value),
                },
                span,
            );
            body.push(Stmt::new(self.next_id(), StmtKind::Expression(set), span));
        }

        FnDecl {
            name: Some("init".to_string()),
            params: fields
                .iter()
                .map(|f| Param {
                    name: f.clone(),
                    span,
                })
                .collect(),
            body,
            is_async: false,
            is_abstract: false,
            span,
        }
    }

    fn parse_trait(&mut self) -> Result<TraitDecl, ParseError> {
        let name = self.expect_ident()?;
        let traits = self.parse_trait_list()?;

        self.expect(&TokenKind::LBrace)?;
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            let is_abstract = self.match_token(&TokenKind::Abstract);
            self.expect(&TokenKind::Fn)?;
            let is_async = self.match_token(&TokenKind::Async);
            methods.push(Arc::new(self.parse_function(is_async, is_abstract)?));
        }
        self.expect(&TokenKind::RBrace)?;

        Ok(TraitDecl {
            name,
            traits,
            methods,
        })
    }

    fn parse_enum(&mut self) -> Result<EnumDecl, ParseError> {
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LBrace)?;

        let mut variants = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            let span = self.current().span;
            let variant = self.expect_ident()?;
            let params = if self.check(&TokenKind::LParen) {
                self.parse_params()?.into_iter().map(|p| p.name).collect()
            } else {
                Vec::new()
            };
            variants.push(VariantDecl {
                name: variant,
                params,
                span: Span::new(span.start, self.prev_end()),
            });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;

        Ok(EnumDecl { name, variants })
    }

    fn parse_namespace(&mut self) -> Result<StmtKind, ParseError> {
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LBrace)?;

        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            body.push(self.parse_declaration()?);
        }
        self.expect(&TokenKind::RBrace)?;

        Ok(StmtKind::Namespace { name, body })
    }

    fn parse_using(&mut self) -> Result<StmtKind, ParseError> {
        let mut names = Vec::new();
        if self.match_token(&TokenKind::LBrace) {
            loop {
                names.push(self.expect_ident()?);
                if !self.match_token(&TokenKind::Comma) || self.check(&TokenKind::RBrace) {
                    break;
                }
            }
            self.expect(&TokenKind::RBrace)?;
        } else {
            names.push(self.expect_ident()?);
        }

        self.expect(&TokenKind::From)?;
        let source = self.parse_expr()?;
        self.expect_semi()?;

        Ok(StmtKind::Using { names, source })
    }

    fn parse_let(&mut self) -> Result<StmtKind, ParseError> {
        let pattern = match self.current_kind() {
            TokenKind::LBrace => Some((DestructureKind::Object, TokenKind::RBrace)),
            TokenKind::LBracket => Some((DestructureKind::Array, TokenKind::RBracket)),
            _ => None,
        };

        if let Some((pattern, close)) = pattern {
            self.advance();
            let mut names = Vec::new();
            while !self.check(&close) && !self.at_end() {
                names.push(self.expect_ident()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&close)?;
            self.expect(&TokenKind::Eq)?;
            let init = self.parse_expr()?;
            self.expect_semi()?;
            return Ok(StmtKind::Destructure {
                pattern,
                names,
                init,
            });
        }

        let name = self.expect_ident()?;
        let init = if self.match_token(&TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect_semi()?;

        Ok(StmtKind::Var { name, init })
    }

    // =========================================================================
    // Statement Parsing
    // =========================================================================

    /// Parse a block body (statements inside braces), with error recovery.
    fn parse_block_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::LBrace)?;

        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            match self.parse_declaration() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => {
                    if !self.record_error(e) {
                        self.skip_to_closing_brace();
                        break;
                    }
                    self.synchronize_in_block();
                }
            }
        }

        self.expect(&TokenKind::RBrace)?;
        Ok(stmts)
    }

    /// Skip to the next statement boundary without leaving the block.
    fn synchronize_in_block(&mut self) {
        let mut depth = 0usize;
        while !self.at_end() {
            match self.current_kind() {
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::RBrace => depth -= 1,
                TokenKind::LBrace => depth += 1,
                TokenKind::Semi if depth == 0 => {
                    self.advance();
                    return;
                }
                kind if depth == 0 && kind.starts_statement() => return,
                _ => {}
            }
            self.advance();
        }
    }

    fn skip_to_closing_brace(&mut self) {
        let mut depth = 1;
        while !self.at_end() && depth > 0 {
            match self.current_kind() {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth -= 1,
                _ => {}
            }
            if depth > 0 {
                self.advance();
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current().span.start;
        let kind = match self.current_kind() {
            TokenKind::LBrace => StmtKind::Block(self.parse_block_body()?),
            TokenKind::If => {
                self.advance();
                self.parse_if()?
            }
            TokenKind::While => {
                self.advance();
                let cond = self.parse_expr()?;
                let body = Box::new(self.parse_statement()?);
                StmtKind::While {
                    cond,
                    body,
                    increment: None,
                }
            }
            TokenKind::For => {
                self.advance();
                return self.parse_for(start);
            }
            TokenKind::Match => {
                self.advance();
                self.parse_match()?
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect_semi()?;
                StmtKind::Return(value)
            }
            TokenKind::Break => {
                self.advance();
                self.expect_semi()?;
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                self.expect_semi()?;
                StmtKind::Continue
            }
            TokenKind::Throw => {
                self.advance();
                let value = self.parse_expr()?;
                self.expect_semi()?;
                StmtKind::Throw(value)
            }
            TokenKind::Try => {
                self.advance();
                let body = self.parse_block_body()?;
                self.expect(&TokenKind::Catch)?;
                let binding = self.expect_ident()?;
                let handler = self.parse_block_body()?;
                StmtKind::TryCatch {
                    body,
                    binding,
                    handler,
                }
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect_semi()?;
                StmtKind::Expression(expr)
            }
        };
        Ok(self.make_stmt(kind, start))
    }

    fn parse_if(&mut self) -> Result<StmtKind, ParseError> {
        let cond = self.parse_expr()?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_token(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtKind::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn parse_for(&mut self, start: usize) -> Result<Stmt, ParseError> {
        if self.match_token(&TokenKind::LParen) {
            return self.parse_c_style_for(start);
        }

        let key = self.expect_ident().map_err(|e| {
            e.with_hint("write 'for item in items { ... }' or 'for (init; cond; step) ...'")
        })?;
        let value = if self.match_token(&TokenKind::Comma) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect(&TokenKind::In)?;
        let iterable = self.parse_expr()?;
        let body = self.parse_block_body()?;

        let kind = StmtKind::ForIn {
            key,
            value,
            iterable,
            body,
        };
        Ok(self.make_stmt(kind, start))
    }

    /// `for (init; cond; incr) body` becomes `{ init; while cond body }` with
    /// the increment attached to the loop.
    fn parse_c_style_for(&mut self, start: usize) -> Result<Stmt, ParseError> {
        let init_start = self.current().span.start;
        let init = if self.match_token(&TokenKind::Semi) {
            None
        } else if self.match_token(&TokenKind::Let) {
            let kind = self.parse_let()?;
            Some(self.make_stmt(kind, init_start))
        } else {
            let expr = self.parse_expr()?;
            self.expect_semi()?;
            Some(self.make_stmt(StmtKind::Expression(expr), init_start))
        };

        let cond = if self.check(&TokenKind::Semi) {
            let span = self.current().span;
            Expr::new(self.next_id(), ExprKind::Literal(Literal::Bool(true)), span)
        } else {
            self.parse_expr()?
        };
        self.expect_semi()?;

        let increment = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&TokenKind::RParen)?;

        let body = Box::new(self.parse_statement()?);
        let looped = self.make_stmt(
            StmtKind::While {
                cond,
                body,
                increment,
            },
            start,
        );

        Ok(match init {
            Some(init) => self.make_stmt(StmtKind::Block(vec![init, looped]), start),
            None => looped,
        })
    }

    fn parse_match(&mut self) -> Result<StmtKind, ParseError> {
        let subject = self.parse_expr()?;
        self.expect(&TokenKind::LBrace)?;

        let mut cases = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            self.expect(&TokenKind::Case)?;
            let is_wildcard = matches!(self.current_kind(), TokenKind::Ident(name) if name == DISCARD)
                && matches!(self.peek(1), TokenKind::Arrow);
            let pattern = if is_wildcard {
                self.advance();
                Pattern::Wildcard
            } else {
                Pattern::Expr(self.parse_expr()?)
            };
            self.expect(&TokenKind::Arrow)?;
            let body = self.parse_statement()?;
            cases.push(MatchCase { pattern, body });
        }
        self.expect(&TokenKind::RBrace)?;

        Ok(StmtKind::Match { subject, cases })
    }

    // =========================================================================
    // Expression Parsing (Pratt)
    // =========================================================================

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let start = self.current().span.start;
        let mut lhs = self.parse_prefix()?;

        loop {
            if let Some(bp) = self.postfix_bp() {
                if bp < min_bp {
                    break;
                }
                lhs = self.parse_postfix(lhs, start)?;
                continue;
            }

            let Some((l_bp, r_bp)) = self.infix_bp() else {
                break;
            };
            if l_bp < min_bp {
                break;
            }

            let op_token = self.advance().clone();
            lhs = match op_token.kind {
                TokenKind::Eq => {
                    let value = self.parse_expr_bp(r_bp)?;
                    self.assignment(lhs, value, op_token.span, start)?
                }
                TokenKind::PlusEq | TokenKind::MinusEq => {
                    let op = if op_token.kind == TokenKind::PlusEq {
                        BinOp::Add
                    } else {
                        BinOp::Sub
                    };
                    let rhs = self.parse_expr_bp(r_bp)?;
                    self.compound_assignment(lhs, op, rhs, op_token.span, start)?
                }
                TokenKind::Question => {
                    let then = self.parse_expr()?;
                    self.expect(&TokenKind::Colon)?;
                    let otherwise = self.parse_expr_bp(r_bp)?;
                    self.make_expr(
                        ExprKind::Ternary {
                            cond: Box::new(lhs),
                            then: Box::new(then),
                            otherwise: Box::new(otherwise),
                        },
                        start,
                    )
                }
                TokenKind::AmpAmp | TokenKind::PipePipe | TokenKind::QuestionQuestion => {
                    let op = match op_token.kind {
                        TokenKind::AmpAmp => LogicalOp::And,
                        TokenKind::PipePipe => LogicalOp::Or,
                        _ => LogicalOp::Coalesce,
                    };
                    let rhs = self.parse_expr_bp(r_bp)?;
                    self.make_expr(
                        ExprKind::Logical {
                            op,
                            left: Box::new(lhs),
                            right: Box::new(rhs),
                        },
                        start,
                    )
                }
                kind => {
                    let op = binop_for(&kind).ok_or_else(|| {
                        ParseError::expected("an operator", &kind, op_token.span)
                    })?;
                    let rhs = self.parse_expr_bp(r_bp)?;
                    self.make_expr(
                        ExprKind::Binary {
                            op,
                            left: Box::new(lhs),
                            right: Box::new(rhs),
                        },
                        start,
                    )
                }
            };
        }

        Ok(lhs)
    }

    fn assignment(&mut self, target: Expr, value: Expr, eq: Span, start: usize) -> Result<Expr, ParseError> {
        let kind = match target.kind {
            ExprKind::Variable { name, .. } => ExprKind::Assign {
                name,
                value: Box::new(value),
                binding: Binding::new(),
            },
            ExprKind::Get { object, name } => ExprKind::Set {
                object,
                name,
                value: Box::new(value),
            },
            ExprKind::Index { object, index } => ExprKind::IndexSet {
                object,
                index,
                value: Box::new(value),
            },
            _ => {
                return Err(ParseError::new("Invalid assignment target.", eq)
                    .with_hint("only variables, properties, and subscripts can be assigned"))
            }
        };
        Ok(self.make_expr(kind, start))
    }

    /// `x += e` becomes `x = x + e`.
    fn compound_assignment(
        &mut self,
        target: Expr,
        op: BinOp,
        rhs: Expr,
        op_span: Span,
        start: usize,
    ) -> Result<Expr, ParseError> {
        let ExprKind::Variable { name, .. } = target.kind else {
            return Err(ParseError::new("Invalid compound assignment target.", op_span)
                .with_hint("'+=' and '-=' only apply to variables"));
        };
        let read = Expr::new(
            self.next_id(),
            ExprKind::Variable {
                name: name.clone(),
                binding: Binding::new(),
            },
            target.span,
        );
        let sum = self.make_expr(
            ExprKind::Binary {
                op,
                left: Box::new(read),
                right: Box::new(rhs),
            },
            start,
        );
        Ok(self.make_expr(
            ExprKind::Assign {
                name,
                value: Box::new(sum),
                binding: Binding::new(),
            },
            start,
        ))
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span.start;
        let token = self.current().clone();

        let kind = match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                ExprKind::Literal(Literal::Number(n))
            }
            TokenKind::String(s) => {
                self.advance();
                ExprKind::Literal(Literal::String(s))
            }
            TokenKind::True => {
                self.advance();
                ExprKind::Literal(Literal::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                ExprKind::Literal(Literal::Bool(false))
            }
            TokenKind::Null => {
                self.advance();
                ExprKind::Literal(Literal::Null)
            }
            TokenKind::Ident(name) => {
                self.advance();
                ExprKind::Variable {
                    name,
                    binding: Binding::new(),
                }
            }
            TokenKind::SelfKw => {
                self.advance();
                ExprKind::SelfRef {
                    binding: Binding::new(),
                }
            }
            TokenKind::Super => {
                self.advance();
                self.expect(&TokenKind::Dot)
                    .map_err(|e| e.with_hint("'super' is only used as 'super.method'"))?;
                let method = self.expect_ident()?;
                ExprKind::Super {
                    method,
                    binding: Binding::new(),
                }
            }
            TokenKind::Bang | TokenKind::Minus | TokenKind::PlusPlus | TokenKind::MinusMinus => {
                self.advance();
                let op = match token.kind {
                    TokenKind::Bang => UnaryOp::Not,
                    TokenKind::Minus => UnaryOp::Neg,
                    TokenKind::PlusPlus => UnaryOp::Incr,
                    _ => UnaryOp::Decr,
                };
                let operand = self.parse_expr_bp(Self::PREFIX_BP)?;
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                }
            }
            TokenKind::Typeof => {
                self.advance();
                ExprKind::Typeof(Box::new(self.parse_expr_bp(Self::PREFIX_BP)?))
            }
            TokenKind::Await => {
                self.advance();
                ExprKind::Await(Box::new(self.parse_expr_bp(Self::PREFIX_BP)?))
            }
            TokenKind::Lazy => {
                self.advance();
                ExprKind::Lazy(Arc::new(self.parse_expr_bp(Self::LAZY_BP)?))
            }
            TokenKind::LParen => {
                self.advance();
                self.parse_paren_or_tuple()?
            }
            TokenKind::LBracket => {
                self.advance();
                self.parse_array_literal()?
            }
            TokenKind::LBrace => {
                self.advance();
                self.parse_dict_literal()?
            }
            TokenKind::Fn => {
                self.advance();
                self.parse_lambda(start)?
            }
            TokenKind::Ellipsis => {
                return Err(ParseError::new(
                    "Spread is only allowed inside array and dictionary literals.",
                    token.span,
                ))
            }
            other => return Err(ParseError::expected("expression", &other, token.span)),
        };

        Ok(self.make_expr(kind, start))
    }

    /// After `(`: `()` and `(a, b)` are tuples, `(a)` is grouping.
    fn parse_paren_or_tuple(&mut self) -> Result<ExprKind, ParseError> {
        if self.match_token(&TokenKind::RParen) {
            return Ok(ExprKind::Tuple(Vec::new()));
        }

        let first = self.parse_expr()?;
        if self.match_token(&TokenKind::RParen) {
            return Ok(ExprKind::Grouping(Box::new(first)));
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RParen) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        self.expect(&TokenKind::RParen)?;
        Ok(ExprKind::Tuple(items))
    }

    fn parse_spread_or_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span.start;
        if self.match_token(&TokenKind::Ellipsis) {
            let inner = self.parse_expr()?;
            return Ok(self.make_expr(ExprKind::Spread(Box::new(inner)), start));
        }
        self.parse_expr()
    }

    fn parse_array_literal(&mut self) -> Result<ExprKind, ParseError> {
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBracket) && !self.at_end() {
            items.push(self.parse_spread_or_expr()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(ExprKind::Array(items))
    }

    fn parse_dict_literal(&mut self) -> Result<ExprKind, ParseError> {
        let mut entries = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            if self.match_token(&TokenKind::Ellipsis) {
                entries.push(DictEntry::Spread(self.parse_expr()?));
            } else {
                let key = match self.current_kind().clone() {
                    TokenKind::Ident(k) | TokenKind::String(k) => {
                        self.advance();
                        k
                    }
                    other => {
                        return Err(ParseError::expected(
                            "dictionary key",
                            &other,
                            self.current().span,
                        ))
                    }
                };
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_expr()?;
                entries.push(DictEntry::Pair { key, value });
            }
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(ExprKind::Dict(entries))
    }

    /// After `fn`: `async? (params) { body }` or `async? (params) -> expr`.
    fn parse_lambda(&mut self, start: usize) -> Result<ExprKind, ParseError> {
        let is_async = self.match_token(&TokenKind::Async);
        let params = self.parse_params()?;
        let body = if self.check(&TokenKind::Arrow) {
            self.parse_arrow_body()?
        } else {
            self.parse_block_body()?
        };
        Ok(ExprKind::Lambda(Arc::new(FnDecl {
            name: None,
            params,
            body,
            is_async,
            is_abstract: false,
            span: Span::new(start, self.prev_end()),
        })))
    }

    fn parse_postfix(&mut self, lhs: Expr, start: usize) -> Result<Expr, ParseError> {
        let token = self.advance().clone();
        let kind = match token.kind {
            TokenKind::LParen => ExprKind::Call {
                callee: Box::new(lhs),
                args: self.parse_args()?,
            },
            TokenKind::Dot => {
                let name = match self.current_kind().clone() {
                    TokenKind::Ident(name) => name,
                    TokenKind::Number(n) if n.fract() == 0.0 => format!("{}", n as u64),
                    other => {
                        return Err(ParseError::expected(
                            "property name",
                            &other,
                            self.current().span,
                        ))
                    }
                };
                self.advance();
                ExprKind::Get {
                    object: Box::new(lhs),
                    name,
                }
            }
            TokenKind::LBracket => {
                let index = self.parse_expr()?;
                self.expect(&TokenKind::RBracket)?;
                ExprKind::Index {
                    object: Box::new(lhs),
                    index: Box::new(index),
                }
            }
            other => return Err(ParseError::expected("'(', '.' or '['", &other, token.span)),
        };
        Ok(self.make_expr(kind, start))
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                if args.len() >= MAX_ARGS {
                    return Err(ParseError::new(
                        "Can't have more than 255 arguments.",
                        self.current().span,
                    ));
                }
                args.push(self.parse_expr()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    // =========================================================================
    // Binding Powers
    // =========================================================================

    const PREFIX_BP: u8 = 21;
    const LAZY_BP: u8 = 3;

    fn postfix_bp(&self) -> Option<u8> {
        match self.current_kind() {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::Dot => Some(23),
            _ => None,
        }
    }

    fn infix_bp(&self) -> Option<(u8, u8)> {
        match self.current_kind() {
            TokenKind::Eq | TokenKind::PlusEq | TokenKind::MinusEq => Some((2, 1)),
            TokenKind::Question => Some((4, 3)),
            TokenKind::QuestionQuestion => Some((5, 6)),
            TokenKind::PipePipe => Some((7, 8)),
            TokenKind::AmpAmp => Some((9, 10)),
            TokenKind::EqEq | TokenKind::BangEq => Some((11, 12)),
            TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq | TokenKind::DotDot => {
                Some((13, 14))
            }
            TokenKind::Is => Some((15, 16)),
            TokenKind::Plus | TokenKind::Minus => Some((17, 18)),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent | TokenKind::StarStar => {
                Some((19, 20))
            }
            _ => None,
        }
    }
}

fn binop_for(kind: &TokenKind) -> Option<BinOp> {
    Some(match kind {
        TokenKind::Plus => BinOp::Add,
        TokenKind::Minus => BinOp::Sub,
        TokenKind::Star => BinOp::Mul,
        TokenKind::Slash => BinOp::Div,
        TokenKind::Percent => BinOp::Mod,
        TokenKind::StarStar => BinOp::Pow,
        TokenKind::EqEq => BinOp::Eq,
        TokenKind::BangEq => BinOp::Ne,
        TokenKind::Lt => BinOp::Lt,
        TokenKind::Gt => BinOp::Gt,
        TokenKind::LtEq => BinOp::Le,
        TokenKind::GtEq => BinOp::Ge,
        TokenKind::Is => BinOp::Is,
        TokenKind::DotDot => BinOp::Range,
        _ => return None,
    })
}

/// Result of parsing: statements plus any errors found.
#[derive(Debug)]
pub struct ParseResult {
    pub stmts: Vec<Stmt>,
    pub errors: Vec<ParseError>,
    /// First node id not used by this parse.
    pub next_node_id: u32,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A parser error with location and friendly message.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            span,
            message: message.into(),
            hint: None,
        }
    }

    fn expected(expected: &str, found: &TokenKind, span: Span) -> Self {
        let message = format_expected_message(expected, found);
        let hint = crate::hints::for_expected(expected, found).map(String::from);
        Self {
            span,
            message,
            hint,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Format a user-friendly "expected X, found Y" message.
fn format_expected_message(expected: &str, found: &TokenKind) -> String {
    let found = found.display_name();
    match expected {
        "';'" => format!("Expected ';' after statement, found {}", found),
        "'{'" => format!("Expected '{{' to start block, found {}", found),
        "'}'" => format!("Expected '}}' to close block, found {}", found),
        "')'" if found == "end of file" => "Unclosed '(' - missing ')'".to_string(),
        "']'" if found == "end of file" => "Unclosed '[' - missing ']'".to_string(),
        "a name" => format!("Expected name, found {}", found),
        _ => format!("Expected {}, found {}", expected, found),
    }
}
