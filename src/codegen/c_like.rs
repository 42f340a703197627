//! Generic C-family lowering shared by the shader dialects.
//!
//! `CLikeLowering` walks expressions and statements and emits text into an
//! `EmitterState`. Every node kind has a `visit_*` method with a C-family
//! default; a dialect overrides only the node kinds whose syntax differs
//! and reaches back into the shared lowering through the free functions
//! below (`lower_serial_for`, ...). Expressions lower to an identifier or
//! literal text; non-trivial right-hand sides are bound to fresh names via
//! `print_assignment`.

use std::collections::HashMap;

use super::CodegenError;
use crate::config::CodegenConfig;
use crate::ir::{BinOp, Expr, For, Stmt, Type};

type Result<T> = std::result::Result<T, CodegenError>;

// ─── Emitter state ────────────────────────────────────────────────

/// Output buffer plus the kernel-scoped symbol tables of one emitter.
#[derive(Clone, Debug)]
pub struct EmitterState {
    stream: String,
    indent: usize,
    indent_width: usize,
    scope_comments: bool,
    /// Right-hand-side text → bound identifier. Only valid within the
    /// scope that created the bindings.
    cache: HashMap<String, String>,
    next_id: usize,
    /// Buffers visible to the current kernel, by IR name.
    allocations: HashMap<String, Type>,
}

impl EmitterState {
    pub fn new(config: &CodegenConfig) -> Self {
        Self {
            stream: String::new(),
            indent: 0,
            indent_width: config.indent_width,
            scope_comments: config.scope_comments,
            cache: HashMap::new(),
            next_id: 0,
            allocations: HashMap::new(),
        }
    }

    /// Text emitted so far.
    pub fn source(&self) -> &str {
        &self.stream
    }

    /// Append raw text.
    pub fn write(&mut self, text: &str) {
        self.stream.push_str(text);
    }

    /// Append one line at the current indentation.
    pub fn write_line(&mut self, line: &str) {
        let indent = self.indent();
        self.stream.push_str(&indent);
        self.stream.push_str(line);
        self.stream.push('\n');
    }

    /// Indentation of the current nesting level.
    pub fn indent(&self) -> String {
        " ".repeat(self.indent * self.indent_width)
    }

    /// One level of indentation.
    pub fn indent_unit(&self) -> String {
        " ".repeat(self.indent_width)
    }

    /// A fresh identifier, unique within the module.
    pub fn unique_name(&mut self, prefix: char) -> String {
        let id = format!("{}{}", prefix, self.next_id);
        self.next_id += 1;
        id
    }

    /// Identifier already bound to `rhs` in the current scope.
    pub fn cached(&self, rhs: &str) -> Option<&str> {
        self.cache.get(rhs).map(String::as_str)
    }

    /// Bind `rhs` to an identifier, reusing a cached one when the same text
    /// was already bound. `render` turns a fresh id into the declaration line.
    pub fn assign(&mut self, rhs: &str, render: impl FnOnce(&str) -> String) -> String {
        if let Some(id) = self.cached(rhs) {
            return id.to_string();
        }
        let id = self.unique_name('_');
        let line = render(&id);
        self.write_line(&line);
        self.cache.insert(rhs.to_string(), id.clone());
        id
    }

    /// Forget every cached binding. Needed after a store, which may change
    /// what a cached load would read.
    pub fn invalidate_cache(&mut self) {
        self.cache.clear();
    }

    /// Emit `{` and enter a nested scope. Bindings made outside are not
    /// reused inside: a loop body runs many times and a `let` in it may
    /// shadow a name an outer binding was computed from.
    pub fn open_scope(&mut self) {
        self.cache.clear();
        self.write_line("{");
        self.indent += 1;
    }

    /// Leave a nested scope and emit `}`, optionally annotated.
    pub fn close_scope(&mut self, comment: &str) {
        self.cache.clear();
        self.indent = self.indent.saturating_sub(1);
        if self.scope_comments && !comment.is_empty() {
            self.write_line(&format!("}} // {}", comment));
        } else {
            self.write_line("}");
        }
    }

    pub fn register_buffer(&mut self, name: &str, elem: Type) {
        self.allocations.insert(name.to_string(), elem);
    }

    pub fn is_buffer(&self, name: &str) -> bool {
        self.allocations.contains_key(name)
    }

    /// Drop kernel-scoped tables before emitting the next kernel.
    pub fn reset_kernel(&mut self) {
        self.cache.clear();
        self.allocations.clear();
        self.indent = 0;
    }

    /// Drop everything, including emitted text and the id counter.
    pub fn reset_module(&mut self) {
        self.stream.clear();
        self.next_id = 0;
        self.reset_kernel();
    }
}

// ─── Names ────────────────────────────────────────────────────────

/// Make an IR name a valid C-family identifier.
///
/// Names starting with a letter get a leading underscore so they can never
/// collide with keywords; `.` becomes `_`, `$` becomes `__`, and any other
/// character outside `[A-Za-z0-9_]` becomes `___`.
pub fn c_print_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    if name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        out.push('_');
    }
    for c in name.chars() {
        match c {
            '.' => out.push('_'),
            '$' => out.push_str("__"),
            c if c == '_' || c.is_ascii_alphanumeric() => out.push(c),
            _ => out.push_str("___"),
        }
    }
    out
}

// ─── Lowering ─────────────────────────────────────────────────────

pub trait CLikeLowering {
    fn state(&self) -> &EmitterState;
    fn state_mut(&mut self) -> &mut EmitterState;

    // ── Dialect hooks ──

    /// Spelling of `ty` in the target language.
    fn print_type(&self, ty: Type) -> Result<String>;

    fn print_name(&self, name: &str) -> String {
        c_print_name(name)
    }

    /// Bind `rhs` to a fresh (or cached) identifier and return it.
    fn print_assignment(&mut self, ty: Type, rhs: &str) -> Result<String> {
        let ty = self.print_type(ty)?;
        Ok(self
            .state_mut()
            .assign(rhs, |id| format!("const {} {} = {};", ty, id, rhs)))
    }

    /// Declare the IR-named immutable `name` with value `value`.
    fn print_let(&mut self, ty: Type, name: &str, value: &str) -> Result<()> {
        let line = format!("const {} {} = {};", self.print_type(ty)?, self.print_name(name), value);
        self.state_mut().write_line(&line);
        Ok(())
    }

    /// Declaration of a mutable loop counter, without the trailing `;`.
    fn print_mutable_decl(&self, ty: Type, name: &str, init: &str) -> Result<String> {
        Ok(format!("{} {} = {}", self.print_type(ty)?, name, init))
    }

    // ── Dispatch ──

    /// Lower an expression; returns the identifier or literal holding it.
    fn print_expr(&mut self, e: &Expr) -> Result<String> {
        match e {
            Expr::IntImm { ty, value } => self.visit_int_imm(*ty, *value),
            Expr::UIntImm { ty, value } => self.visit_uint_imm(*ty, *value),
            Expr::FloatImm { ty, value } => self.visit_float_imm(*ty, *value),
            Expr::Variable { name, .. } => Ok(self.print_name(name)),
            Expr::Cast { ty, value } => self.visit_cast(*ty, value),
            Expr::Binary { op: BinOp::Min, a, b } => self.visit_min(e.ty(), a, b),
            Expr::Binary { op: BinOp::Max, a, b } => self.visit_max(e.ty(), a, b),
            Expr::Binary { op, a, b } => self.visit_binop(e.ty(), *op, a, b),
            Expr::Not { a } => self.visit_not(e.ty(), a),
            Expr::Select {
                cond,
                true_value,
                false_value,
            } => self.visit_select(e.ty(), cond, true_value, false_value),
            Expr::Load { ty, name, index } => self.visit_load(*ty, name, index),
            Expr::Call { ty, name, args } => self.visit_call(*ty, name, args),
            Expr::Let { name, value, body } => self.visit_let(name, value, body),
        }
    }

    /// Lower a statement into the output stream.
    fn print_stmt(&mut self, s: &Stmt) -> Result<()> {
        match s {
            Stmt::LetStmt { name, value, body } => self.visit_let_stmt(name, value, body),
            Stmt::For(op) => self.visit_for(op),
            Stmt::Store { name, value, index } => self.visit_store(name, value, index),
            Stmt::IfThenElse {
                cond,
                then_case,
                else_case,
            } => self.visit_if_then_else(cond, then_case, else_case.as_deref()),
            Stmt::Block(stmts) => stmts.iter().try_for_each(|s| self.print_stmt(s)),
            Stmt::Evaluate(e) => self.print_expr(e).map(|_| ()),
        }
    }

    // ── Expressions ──

    fn visit_int_imm(&mut self, ty: Type, value: i64) -> Result<String> {
        if ty == Type::i32() {
            Ok(value.to_string())
        } else {
            Ok(format!("({})({})", self.print_type(ty)?, value))
        }
    }

    fn visit_uint_imm(&mut self, ty: Type, value: u64) -> Result<String> {
        if ty.is_bool() {
            Ok(if value == 0 { "false" } else { "true" }.to_string())
        } else {
            Ok(format!("({})({})", self.print_type(ty)?, value))
        }
    }

    fn visit_float_imm(&mut self, ty: Type, value: f64) -> Result<String> {
        if ty.bits == 32 {
            // Exact bit pattern; the module prelude defines float_from_bits.
            let bits = (value as f32).to_bits() as i32;
            Ok(format!("float_from_bits({} /* {} */)", bits, value as f32))
        } else {
            Ok(format!("({})({:?})", self.print_type(ty)?, value))
        }
    }

    fn visit_cast(&mut self, ty: Type, value: &Expr) -> Result<String> {
        let v = self.print_expr(value)?;
        let rhs = format!("({})({})", self.print_type(ty)?, v);
        self.print_assignment(ty, &rhs)
    }

    fn visit_binop(&mut self, ty: Type, op: BinOp, a: &Expr, b: &Expr) -> Result<String> {
        let a = self.print_expr(a)?;
        let b = self.print_expr(b)?;
        self.print_assignment(ty, &format!("{} {} {}", a, op.symbol(), b))
    }

    fn visit_min(&mut self, ty: Type, a: &Expr, b: &Expr) -> Result<String> {
        let a = self.print_expr(a)?;
        let b = self.print_expr(b)?;
        self.print_assignment(ty, &format!("({a} < {b} ? {a} : {b})"))
    }

    fn visit_max(&mut self, ty: Type, a: &Expr, b: &Expr) -> Result<String> {
        let a = self.print_expr(a)?;
        let b = self.print_expr(b)?;
        self.print_assignment(ty, &format!("({a} > {b} ? {a} : {b})"))
    }

    fn visit_not(&mut self, ty: Type, a: &Expr) -> Result<String> {
        let a = self.print_expr(a)?;
        self.print_assignment(ty, &format!("!{}", a))
    }

    fn visit_select(
        &mut self,
        ty: Type,
        cond: &Expr,
        true_value: &Expr,
        false_value: &Expr,
    ) -> Result<String> {
        let c = self.print_expr(cond)?;
        let t = self.print_expr(true_value)?;
        let f = self.print_expr(false_value)?;
        self.print_assignment(ty, &format!("({} ? {} : {})", c, t, f))
    }

    fn visit_load(&mut self, ty: Type, name: &str, index: &Expr) -> Result<String> {
        let index = self.print_expr(index)?;
        let rhs = format!("{}[{}]", self.print_name(name), index);
        self.print_assignment(ty, &rhs)
    }

    fn visit_call(&mut self, ty: Type, name: &str, args: &[Expr]) -> Result<String> {
        let ids = args
            .iter()
            .map(|arg| self.print_expr(arg))
            .collect::<Result<Vec<_>>>()?;
        self.print_assignment(ty, &format!("{}({})", name, ids.join(", ")))
    }

    fn visit_let(&mut self, name: &str, value: &Expr, body: &Expr) -> Result<String> {
        let id = self.print_expr(value)?;
        self.print_let(value.ty(), name, &id)?;
        self.print_expr(body)
    }

    // ── Statements ──

    fn visit_let_stmt(&mut self, name: &str, value: &Expr, body: &Stmt) -> Result<()> {
        let id = self.print_expr(value)?;
        self.print_let(value.ty(), name, &id)?;
        self.print_stmt(body)
    }

    fn visit_for(&mut self, op: &For) -> Result<()> {
        lower_serial_for(self, op)
    }

    fn visit_store(&mut self, name: &str, value: &Expr, index: &Expr) -> Result<()> {
        let value = self.print_expr(value)?;
        let index = self.print_expr(index)?;
        let line = format!("{}[{}] = {};", self.print_name(name), index, value);
        let state = self.state_mut();
        state.write_line(&line);
        state.invalidate_cache();
        Ok(())
    }

    fn visit_if_then_else(
        &mut self,
        cond: &Expr,
        then_case: &Stmt,
        else_case: Option<&Stmt>,
    ) -> Result<()> {
        let c = self.print_expr(cond)?;
        self.state_mut().write_line(&format!("if ({})", c));
        self.state_mut().open_scope();
        self.print_stmt(then_case)?;
        self.state_mut().close_scope(&format!("if {}", c));
        if let Some(else_case) = else_case {
            self.state_mut().write_line("else");
            self.state_mut().open_scope();
            self.print_stmt(else_case)?;
            self.state_mut().close_scope(&format!("if {} else", c));
        }
        Ok(())
    }
}

/// Software loop: `for (decl = min; x < min + extent; x++) { body }`.
pub fn lower_serial_for<L: CLikeLowering + ?Sized>(l: &mut L, op: &For) -> Result<()> {
    let min = l.print_expr(&op.min)?;
    let extent = l.print_expr(&op.extent)?;
    let name = l.print_name(&op.name);
    let decl = l.print_mutable_decl(op.min.ty(), &name, &min)?;
    l.state_mut().write_line(&format!(
        "for ({}; {} < {} + {}; {}++)",
        decl, name, min, extent, name
    ));
    l.state_mut().open_scope();
    l.print_stmt(&op.body)?;
    l.state_mut().close_scope(&format!("for {}", name));
    Ok(())
}
