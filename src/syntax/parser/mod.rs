use crate::diagnostic::Diagnostic;
use crate::ir::{BinOp, DeviceArgument, Expr, ForType, KernelDef, KernelModule, Stmt, Type};
use crate::span::{Span, Spanned};

use super::lexer::Token;

/// Deepest statement/expression nesting accepted. Each level costs a few
/// recursive frames, and this must fit on a 2 MiB thread in debug builds.
pub(crate) const MAX_NESTING_DEPTH: u32 = 64;

type PResult<T> = Result<T, Diagnostic>;

pub(crate) struct Parser {
    tokens: Vec<Spanned<Token>>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    depth: u32,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Spanned<Token>>) -> Self {
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    /// Parse every `(kernel ...)` form. A malformed kernel is reported and
    /// skipped so later kernels still get checked.
    pub(crate) fn parse_module(mut self) -> Result<KernelModule, Vec<Diagnostic>> {
        let mut module = KernelModule::default();
        while !self.at(&Token::Eof) {
            let start = self.pos;
            match self.parse_kernel() {
                Ok(kernel) => module.kernels.push(kernel),
                Err(diag) => {
                    self.diagnostics.push(diag);
                    self.skip_form(start);
                }
            }
        }
        if self.diagnostics.is_empty() {
            Ok(module)
        } else {
            Err(self.diagnostics)
        }
    }

    // ── Kernels ──

    fn parse_kernel(&mut self) -> PResult<KernelDef> {
        self.expect(&Token::LParen)?;
        self.expect_keyword("kernel")?;
        let name = self.expect_atom("kernel name")?;

        self.expect(&Token::LParen)?;
        self.expect_keyword("args")?;
        let mut args = Vec::new();
        while !self.eat(&Token::RParen) {
            args.push(self.parse_arg()?);
        }

        let body = self.parse_body()?;
        Ok(KernelDef {
            name: name.node,
            args,
            body,
        })
    }

    fn parse_arg(&mut self) -> PResult<DeviceArgument> {
        self.expect(&Token::LParen)?;
        let kind = self.expect_atom("'buffer' or 'scalar'")?;
        let name = self.expect_atom("argument name")?;
        let ty = self.parse_type()?;
        self.expect(&Token::RParen)?;
        match kind.node.as_str() {
            "buffer" => Ok(DeviceArgument::buffer(name.node, ty)),
            "scalar" => Ok(DeviceArgument::scalar(name.node, ty)),
            other => Err(Diagnostic::error(
                format!("unknown argument kind '{}'", other),
                kind.span,
            )
            .with_help("arguments are written (buffer NAME TYPE) or (scalar NAME TYPE)".to_string())),
        }
    }

    // ── Statements ──

    /// Statements up to and including the closing `)` of the enclosing form.
    fn parse_body(&mut self) -> PResult<Stmt> {
        let mut stmts = Vec::new();
        while !self.eat(&Token::RParen) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(Stmt::block(stmts))
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        self.enter_nesting()?;
        let result = self.parse_stmt_inner();
        self.exit_nesting();
        result
    }

    fn parse_stmt_inner(&mut self) -> PResult<Stmt> {
        self.expect(&Token::LParen)?;
        let head = self.expect_atom("statement")?;
        match head.node.as_str() {
            "for" => {
                let name = self.expect_atom("loop variable")?;
                let kind = self.expect_atom("loop kind")?;
                let Some(for_type) = ForType::from_keyword(&kind.node) else {
                    return Err(Diagnostic::error(
                        format!("unknown loop kind '{}'", kind.node),
                        kind.span,
                    )
                    .with_help(
                        "expected serial, parallel, gpu_block, gpu_thread or gpu_lane".to_string(),
                    ));
                };
                let min = self.parse_expr()?;
                let extent = self.parse_expr()?;
                let body = self.parse_body()?;
                Ok(Stmt::for_loop(name.node, min, extent, for_type, body))
            }
            "store" => {
                let name = self.expect_atom("buffer name")?;
                let value = self.parse_expr()?;
                let index = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(Stmt::store(name.node, value, index))
            }
            "let" => {
                let name = self.expect_atom("variable name")?;
                let value = self.parse_expr()?;
                let body = self.parse_body()?;
                Ok(Stmt::let_stmt(name.node, value, body))
            }
            "if" => {
                let cond = self.parse_expr()?;
                let then_case = self.parse_stmt()?;
                let else_case = if self.at(&Token::RParen) {
                    None
                } else {
                    Some(self.parse_stmt()?)
                };
                self.expect(&Token::RParen)?;
                Ok(Stmt::if_then_else(cond, then_case, else_case))
            }
            "block" => {
                let mut stmts = Vec::new();
                while !self.eat(&Token::RParen) {
                    stmts.push(self.parse_stmt()?);
                }
                Ok(Stmt::Block(stmts))
            }
            "eval" => {
                let e = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(Stmt::evaluate(e))
            }
            other => Err(Diagnostic::error(
                format!("expected statement, found '{}'", other),
                head.span,
            )
            .with_note("statements are for, store, let, if, block and eval".to_string())),
        }
    }

    // ── Expressions ──

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.enter_nesting()?;
        let result = self.parse_expr_inner();
        self.exit_nesting();
        result
    }

    fn parse_expr_inner(&mut self) -> PResult<Expr> {
        if let Token::Atom(text) = self.peek() {
            let literal = parse_literal(text, self.current_span())?;
            self.advance();
            return Ok(literal);
        }

        self.expect(&Token::LParen)?;
        let head = self.expect_atom("expression")?;
        let e = match head.node.as_str() {
            "int" => {
                let ty = self.parse_type()?;
                let value = self.expect_atom("integer")?;
                let v = parse_number::<i64>(&value)?;
                Expr::IntImm { ty, value: v }
            }
            "uint" => {
                let ty = self.parse_type()?;
                let value = self.expect_atom("integer")?;
                let v = parse_number::<u64>(&value)?;
                Expr::UIntImm { ty, value: v }
            }
            "float" => {
                let ty = self.parse_type()?;
                let value = self.expect_atom("number")?;
                let v = parse_number::<f64>(&value)?;
                Expr::FloatImm { ty, value: v }
            }
            "var" => {
                let ty = self.parse_type()?;
                let name = self.expect_atom("variable name")?;
                Expr::var(ty, name.node)
            }
            "cast" => {
                let ty = self.parse_type()?;
                Expr::cast(ty, self.parse_expr()?)
            }
            "!" => Expr::not(self.parse_expr()?),
            "select" => {
                let cond = self.parse_expr()?;
                let t = self.parse_expr()?;
                let f = self.parse_expr()?;
                Expr::select(cond, t, f)
            }
            "load" => {
                let ty = self.parse_type()?;
                let name = self.expect_atom("buffer name")?;
                Expr::load(ty, name.node, self.parse_expr()?)
            }
            "call" => {
                let ty = self.parse_type()?;
                let name = self.expect_atom("function name")?;
                let mut args = Vec::new();
                while !self.at(&Token::RParen) {
                    args.push(self.parse_expr()?);
                }
                Expr::call(ty, name.node, args)
            }
            "let" => {
                let name = self.expect_atom("variable name")?;
                let value = self.parse_expr()?;
                Expr::let_in(name.node, value, self.parse_expr()?)
            }
            op => match BinOp::from_symbol(op) {
                Some(op) => {
                    let a = self.parse_expr()?;
                    Expr::binary(op, a, self.parse_expr()?)
                }
                None => {
                    return Err(Diagnostic::error(
                        format!("unknown expression form '{}'", op),
                        head.span,
                    ))
                }
            },
        };
        self.expect(&Token::RParen)?;
        Ok(e)
    }

    fn parse_type(&mut self) -> PResult<Type> {
        let name = self.expect_atom("type")?;
        Type::from_name(&name.node).ok_or_else(|| {
            Diagnostic::error(format!("unknown type '{}'", name.node), name.span)
                .with_note("types are written like f32, i32x4 or bool".to_string())
        })
    }

    // ── Token helpers ──

    fn enter_nesting(&mut self) -> PResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(Diagnostic::error(
                format!("nesting depth exceeded (maximum {} levels)", MAX_NESTING_DEPTH),
                self.current_span(),
            ));
        }
        Ok(())
    }

    fn exit_nesting(&mut self) {
        self.depth -= 1;
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].node
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn at(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> PResult<Span> {
        if self.at(token) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.unexpected(&token.description()))
        }
    }

    fn expect_atom(&mut self, what: &str) -> PResult<Spanned<String>> {
        if let Token::Atom(text) = self.peek().clone() {
            let span = self.current_span();
            self.advance();
            Ok(Spanned::new(text, span))
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> PResult<()> {
        match self.peek() {
            Token::Atom(text) if text == keyword => {
                self.advance();
                Ok(())
            }
            _ => Err(self.unexpected(&format!("'{}'", keyword))),
        }
    }

    fn unexpected(&self, expected: &str) -> Diagnostic {
        Diagnostic::error(
            format!("expected {}, found {}", expected, self.peek().description()),
            self.current_span(),
        )
    }

    /// Move past the form that opened at token `start`.
    fn skip_form(&mut self, start: usize) {
        self.pos = start;
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Token::Eof => return,
                Token::LParen => depth += 1,
                Token::RParen => depth = depth.saturating_sub(1),
                Token::Atom(_) => {}
            }
            self.advance();
            if depth == 0 {
                return;
            }
        }
    }
}

/// Literal atom: `7` (i32), `7u` (u32), `1.5` or `2e3` (f32).
fn parse_literal(text: &str, span: Span) -> PResult<Expr> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(Diagnostic::error(
            format!("expected expression, found '{}'", text),
            span,
        )
        .with_help("variables are written (var TYPE NAME)".to_string()));
    }
    let atom = Spanned::new(text.to_string(), span);
    if let Some(unsigned) = text.strip_suffix('u') {
        let v = parse_number::<u32>(&Spanned::new(unsigned.to_string(), span))?;
        return Ok(Expr::uint(v));
    }
    if text.contains(['.', 'e', 'E']) {
        return Ok(Expr::float(parse_number::<f32>(&atom)?));
    }
    Ok(Expr::int(parse_number::<i32>(&atom)?))
}

fn parse_number<T: std::str::FromStr>(atom: &Spanned<String>) -> PResult<T> {
    atom.node.parse::<T>().map_err(|_| {
        Diagnostic::error(
            format!(
                "invalid {} literal '{}'",
                std::any::type_name::<T>(),
                atom.node
            ),
            atom.span,
        )
    })
}
