//! Recursive-descent parser with precedence climbing for expressions.

use crate::compiler::ast::*;
use crate::compiler::tokens::{Span, Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ParseError {
    #[error("unexpected {found} at {span}; expected {expected}")]
    Unexpected {
        found: String,
        expected: String,
        span: Span,
    },
    #[error("unexpected end of input")]
    UnexpectedEof { span: Span },
    #[error("'{keyword}' is not supported in this core")]
    UnsupportedControlFlow { keyword: String, span: Span },
    #[error("functions cannot be declared '{keyword}'")]
    VariabilityOnFunction { keyword: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Unexpected { span, .. } => *span,
            ParseError::UnexpectedEof { span } => *span,
            ParseError::UnsupportedControlFlow { span, .. } => *span,
            ParseError::VariabilityOnFunction { span, .. } => *span,
        }
    }
}

/// Caps the number of syntax errors collected before a declaration is
/// abandoned, so one malformed construct doesn't cascade into spam.
const MAX_PARSE_ERRORS: usize = 10;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    fn at_error_limit(&self) -> bool {
        self.errors.len() >= MAX_PARSE_ERRORS
    }

    fn record(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ()> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            let found = self.peek().kind.to_string();
            let span = self.peek().span;
            self.record(ParseError::Unexpected {
                found,
                expected: expected.to_string(),
                span,
            });
            Err(())
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), ()> {
        if let TokenKind::Ident(name) = self.peek_kind().clone() {
            let span = self.peek().span;
            self.advance();
            Ok((name, span))
        } else {
            let found = self.peek().kind.to_string();
            let span = self.peek().span;
            self.record(ParseError::Unexpected {
                found,
                expected: "identifier".to_string(),
                span,
            });
            Err(())
        }
    }

    /// Skips tokens until the statement following a `;` or `}`, so a single
    /// malformed statement doesn't poison the rest of the block.
    fn synchronize_stmt(&mut self) {
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return,
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Skips tokens until past the next top-level declaration boundary.
    fn synchronize_decl(&mut self) {
        let mut depth: i32 = 0;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return,
                TokenKind::LBrace => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RBrace => {
                    self.advance();
                    if depth <= 1 {
                        return;
                    }
                    depth -= 1;
                }
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn type_id_at_current(&self) -> Option<TypeId> {
        type_id_from_keyword(self.peek_kind())
    }

    fn parse_type(&mut self) -> Result<(TypeId, Span), ()> {
        let span = self.peek().span;
        match type_id_from_keyword(self.peek_kind()) {
            Some(id) => {
                self.advance();
                Ok((id, span))
            }
            None => {
                let found = self.peek().kind.to_string();
                self.record(ParseError::Unexpected {
                    found,
                    expected: "type".to_string(),
                    span,
                });
                Err(())
            }
        }
    }

    fn parse_dotted_name(&mut self) -> Result<(Vec<String>, Span), ()> {
        let (first, mut span) = self.expect_ident()?;
        let mut parts = vec![first];
        while self.check(&TokenKind::Dot) {
            self.advance();
            let (part, part_span) = self.expect_ident()?;
            span = span.merge(part_span);
            parts.push(part);
        }
        Ok((parts, span))
    }

    /// Parses a complete module: any number of export/import declarations,
    /// global variables, and functions. Never fails outright — a malformed
    /// top-level item is skipped and parsing continues with the next one,
    /// so the caller always gets a (possibly partial) module back.
    pub fn parse_module(mut self) -> (Module, Vec<ParseError>) {
        let mut module = Module::new();
        while !self.check(&TokenKind::Eof) {
            if self.at_error_limit() {
                break;
            }
            if self.parse_top_level_item(&mut module).is_err() {
                self.synchronize_decl();
            }
        }
        (module, self.errors)
    }

    fn parse_top_level_item(&mut self, module: &mut Module) -> Result<(), ()> {
        match self.peek_kind() {
            TokenKind::Module => self.parse_export_decl(module),
            TokenKind::Import => self.parse_import_decl(module),
            TokenKind::Uniform | TokenKind::Varying => self.parse_global_var(module, true),
            _ if self.type_id_at_current().is_some() => self.parse_decl_starting_with_type(module),
            TokenKind::Eof => Ok(()),
            _ => {
                let found = self.peek().kind.to_string();
                let span = self.peek().span;
                self.record(ParseError::Unexpected {
                    found,
                    expected: "declaration".to_string(),
                    span,
                });
                Err(())
            }
        }
    }

    fn parse_export_decl(&mut self, module: &mut Module) -> Result<(), ()> {
        let start = self.peek().span;
        self.advance();
        let (path, name_span) = self.parse_dotted_name()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        module.decls.push(TopDecl::Export(ModuleExportDecl {
            path,
            span: start.merge(name_span),
        }));
        Ok(())
    }

    fn parse_import_decl(&mut self, module: &mut Module) -> Result<(), ()> {
        let start = self.peek().span;
        self.advance();
        let (path, name_span) = self.parse_dotted_name()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        module.decls.push(TopDecl::Import(ModuleImportDecl {
            path,
            span: start.merge(name_span),
        }));
        Ok(())
    }

    /// A bare type keyword at the top level is ambiguous between a global
    /// variable and a function until the identifier and what follows it are
    /// seen, so both share this entry point.
    fn parse_decl_starting_with_type(&mut self, module: &mut Module) -> Result<(), ()> {
        self.parse_global_var(module, false)
    }

    fn parse_global_var(&mut self, module: &mut Module, has_variability_prefix: bool) -> Result<(), ()> {
        let start = self.peek().span;
        let mut variability_keyword = String::new();
        let variability = if has_variability_prefix {
            variability_keyword = self.peek().kind.to_string();
            let v = if self.check(&TokenKind::Uniform) {
                Variability::Uniform
            } else {
                Variability::Varying
            };
            self.advance();
            v
        } else {
            Variability::Unbound
        };

        let (type_id, _) = self.parse_type()?;
        let (name, name_span) = self.expect_ident()?;

        if self.check(&TokenKind::LParen) {
            if has_variability_prefix {
                // `uniform`/`varying` qualify global variables only; a
                // function never carries variability (spec.md:55,93 keep
                // the two grammars distinct).
                self.record(ParseError::VariabilityOnFunction {
                    keyword: variability_keyword,
                    span: start,
                });
                return Err(());
            }
            return self.parse_func_decl(module, type_id, name, name_span, start);
        }

        let init = if self.eat(&TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let end_span = self.peek().span;
        self.expect(TokenKind::Semicolon, "';'")?;

        let var = VarDecl {
            ty: Type::new(type_id, variability),
            name,
            init,
            is_global: true,
            span: start.merge(end_span),
            name_span,
        };
        let id = module.push_var(var);
        module.decls.push(TopDecl::Var(id));
        Ok(())
    }

    fn parse_func_decl(
        &mut self,
        module: &mut Module,
        return_type: TypeId,
        name: String,
        name_span: Span,
        start: Span,
    ) -> Result<(), ()> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let (param_type, param_type_span) = self.parse_type()?;
                let (param_name, param_name_span) = self.expect_ident()?;
                let param = VarDecl {
                    ty: Type::unbound(param_type),
                    name: param_name,
                    init: None,
                    is_global: false,
                    span: param_type_span.merge(param_name_span),
                    name_span: param_name_span,
                };
                params.push(module.push_var(param));
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_compound_stmt(module)?;
        let end_span = body.span;

        let func = FuncDecl {
            return_type: Type::unbound(return_type),
            name,
            params,
            body,
            span: start.merge(end_span),
            name_span,
        };
        let id = module.push_func(func);
        module.decls.push(TopDecl::Func(id));
        Ok(())
    }

    fn parse_compound_stmt(&mut self, module: &mut Module) -> Result<Stmt, ()> {
        let start = self.expect(TokenKind::LBrace, "'{'")?.span;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            if self.at_error_limit() {
                break;
            }
            match self.parse_stmt(module) {
                Ok(stmt) => stmts.push(stmt),
                Err(()) => self.synchronize_stmt(),
            }
        }
        let end = self.peek().span;
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Stmt::new(StmtKind::Compound(stmts), start.merge(end)))
    }

    fn parse_stmt(&mut self, module: &mut Module) -> Result<Stmt, ()> {
        match self.peek_kind() {
            TokenKind::LBrace => self.parse_compound_stmt(module),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::If | TokenKind::For | TokenKind::While | TokenKind::Break | TokenKind::Continue => {
                let keyword = self.peek().kind.to_string();
                let span = self.peek().span;
                self.record(ParseError::UnsupportedControlFlow { keyword, span });
                Err(())
            }
            _ if self.type_id_at_current().is_some() => self.parse_local_decl_stmt(module),
            _ => self.parse_assignment_stmt(),
        }
    }

    fn parse_return_stmt(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span;
        let expr = self.parse_expr()?;
        let end = self.peek().span;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::new(StmtKind::Return(expr), start.merge(end)))
    }

    fn parse_local_decl_stmt(&mut self, module: &mut Module) -> Result<Stmt, ()> {
        let start = self.peek().span;
        let (type_id, _) = self.parse_type()?;
        let (name, name_span) = self.expect_ident()?;
        let init = if self.eat(&TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let end = self.peek().span;
        self.expect(TokenKind::Semicolon, "';'")?;

        let var = VarDecl {
            ty: Type::unbound(type_id),
            name,
            init,
            is_global: false,
            span: start.merge(end),
            name_span,
        };
        let id = module.push_var(var);
        Ok(Stmt::new(StmtKind::Decl(id), start.merge(end)))
    }

    fn parse_assignment_stmt(&mut self) -> Result<Stmt, ()> {
        let lvalue = self.parse_expr()?;
        let start = lvalue.span;
        self.expect(TokenKind::Assign, "'='")?;
        let rvalue = self.parse_expr()?;
        let end = self.peek().span;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(Stmt::new(
            StmtKind::Assignment { lvalue, rvalue },
            start.merge(end),
        ))
    }

    // --- expressions -----------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, ()> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, ()> {
        let mut left = self.parse_unary()?;
        loop {
            let Some((op, precedence)) = binary_op_at(self.peek_kind()) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(precedence + 1)?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::BinaryExpr {
                    left: Box::new(left),
                    right: Box::new(right),
                    op,
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ()> {
        let start = self.peek().span;
        let op = match self.peek_kind() {
            TokenKind::Bang => Some(UnaryOp::LogicalNot),
            TokenKind::Tilde => Some(UnaryOp::BitwiseNot),
            TokenKind::Minus => Some(UnaryOp::Negate),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let inner = self.parse_unary()?;
            let span = start.merge(inner.span);
            return Ok(Expr::new(
                ExprKind::UnaryExpr {
                    op,
                    inner: Box::new(inner),
                },
                span,
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ()> {
        let mut expr = self.parse_primary()?;
        while self.check(&TokenKind::Dot) {
            self.advance();
            let (member, member_span) = self.expect_ident()?;
            let span = expr.span.merge(member_span);
            expr = Expr::new(
                ExprKind::MemberExpr {
                    base: Box::new(expr),
                    member,
                },
                span,
            );
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ()> {
        let span = self.peek().span;
        match self.peek_kind().clone() {
            TokenKind::IntLit(v) => {
                self.advance();
                Ok(Expr::new(ExprKind::IntLiteral(v), span))
            }
            TokenKind::FloatLit(v) => {
                self.advance();
                Ok(Expr::new(ExprKind::FloatLiteral(v), span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::BoolLiteral(true), span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(ExprKind::BoolLiteral(false), span))
            }
            TokenKind::Pi => {
                self.advance();
                Ok(Expr::new(ExprKind::PiLiteral, span))
            }
            TokenKind::Infinity => {
                self.advance();
                Ok(Expr::new(ExprKind::InfinityLiteral, span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                let end = self.peek().span;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Expr::new(
                    ExprKind::GroupExpr(Box::new(inner)),
                    span.merge(end),
                ))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.check(&TokenKind::LParen) {
                    let (args, end) = self.parse_arg_list()?;
                    Ok(Expr::new(
                        ExprKind::FuncCall(FuncCallExpr {
                            name,
                            args,
                            candidates: Vec::new(),
                        }),
                        span.merge(end),
                    ))
                } else {
                    Ok(Expr::new(
                        ExprKind::VarRef(VarRefExpr {
                            name,
                            resolved: None,
                        }),
                        span,
                    ))
                }
            }
            ref kind if type_id_from_keyword(kind).is_some() => {
                let type_id = type_id_from_keyword(kind).unwrap();
                self.advance();
                let (args, end) = self.parse_arg_list()?;
                Ok(Expr::new(
                    ExprKind::TypeConstructor {
                        ty: Type::unbound(type_id),
                        args,
                    },
                    span.merge(end),
                ))
            }
            other => {
                self.record(ParseError::Unexpected {
                    found: other.to_string(),
                    expected: "expression".to_string(),
                    span,
                });
                Err(())
            }
        }
    }

    fn parse_arg_list(&mut self) -> Result<(Vec<Expr>, Span), ()> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect(TokenKind::RParen, "')'")?.span;
        Ok((args, end))
    }
}

fn type_id_from_keyword(kind: &TokenKind) -> Option<TypeId> {
    match kind {
        TokenKind::Void => Some(TypeId::Void),
        TokenKind::Bool => Some(TypeId::Bool),
        TokenKind::Int => Some(TypeId::Int),
        TokenKind::Float => Some(TypeId::Float),
        TokenKind::Vec2 => Some(TypeId::Vec2),
        TokenKind::Vec3 => Some(TypeId::Vec3),
        TokenKind::Vec4 => Some(TypeId::Vec4),
        TokenKind::Vec2i => Some(TypeId::Vec2i),
        TokenKind::Vec3i => Some(TypeId::Vec3i),
        TokenKind::Vec4i => Some(TypeId::Vec4i),
        TokenKind::Mat2 => Some(TypeId::Mat2),
        TokenKind::Mat3 => Some(TypeId::Mat3),
        TokenKind::Mat4 => Some(TypeId::Mat4),
        _ => None,
    }
}

fn binary_op_at(kind: &TokenKind) -> Option<(BinaryOp, u8)> {
    match kind {
        TokenKind::Plus => Some((BinaryOp::Add, 1)),
        TokenKind::Minus => Some((BinaryOp::Sub, 1)),
        TokenKind::Star => Some((BinaryOp::Mul, 2)),
        TokenKind::Slash => Some((BinaryOp::Div, 2)),
        TokenKind::Percent => Some((BinaryOp::Mod, 2)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::Lexer;

    fn parse(src: &str) -> (Module, Vec<ParseError>) {
        let (tokens, lex_errors) = Lexer::new(src).tokenize();
        assert!(lex_errors.is_empty(), "lex errors: {lex_errors:?}");
        Parser::new(tokens).parse_module()
    }

    #[test]
    fn parses_global_and_entry_points() {
        let (module, errors) = parse(
            "module demo;\n\
             uniform float g_time;\n\
             varying vec3 position;\n\
             void sample_pixel(vec2 uv_min, vec2 uv_max) { position = uv_min; }\n\
             vec4 encode_pixel() { return vec4(1.0, 1.0, 1.0, 1.0); }\n",
        );
        assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
        assert_eq!(module.export().unwrap().path, vec!["demo".to_string()]);
        assert_eq!(module.vars.iter().filter(|v| v.is_global).count(), 2);
        assert_eq!(module.funcs.len(), 2);
    }

    #[test]
    fn operator_precedence_groups_multiplication_first() {
        let (module, errors) = parse("int x = 1 + 2 * 3;");
        assert!(errors.is_empty());
        let init = module.vars[0].init.as_ref().unwrap();
        match &init.kind {
            ExprKind::BinaryExpr { op: BinaryOp::Add, right, .. } => {
                assert!(matches!(right.kind, ExprKind::BinaryExpr { op: BinaryOp::Mul, .. }));
            }
            other => panic!("expected top-level add, got {other:?}"),
        }
    }

    #[test]
    fn control_flow_keyword_is_rejected_but_does_not_crash() {
        let (_module, errors) = parse("void sample_pixel(vec2 a, vec2 b) { if (true) { } }");
        assert!(errors
            .iter()
            .any(|e| matches!(e, ParseError::UnsupportedControlFlow { .. })));
    }

    #[test]
    fn malformed_statement_recovers_to_next_one() {
        let (module, errors) = parse(
            "void sample_pixel(vec2 a, vec2 b) { int x = ; int y = 2; }\n\
             vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
        );
        assert!(!errors.is_empty());
        assert_eq!(module.funcs.len(), 2);
    }

    #[test]
    fn swizzle_member_chain_parses() {
        let (module, errors) = parse("vec3 v = foo.xzy;");
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert!(matches!(
            module.vars[0].init.as_ref().unwrap().kind,
            ExprKind::MemberExpr { .. }
        ));
    }

    #[test]
    fn uniform_function_is_rejected() {
        let (_module, errors) = parse("uniform void foo() {}\n");
        assert!(errors
            .iter()
            .any(|e| matches!(e, ParseError::VariabilityOnFunction { .. })));
    }

    #[test]
    fn varying_function_is_rejected_but_recovers() {
        let (module, errors) = parse(
            "varying vec3 bar() { return vec3(0.0, 0.0, 0.0); }\n\
             void sample_pixel(vec2 a, vec2 b) {}\n\
             vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, ParseError::VariabilityOnFunction { .. })));
        assert_eq!(module.funcs.len(), 2);
    }
}
