//! Recursive-descent traversal over IR nodes.
//!
//! Implementors override the hooks they care about and call the matching
//! `walk_*` function to keep descending.

use super::{Expr, For, Stmt};

pub trait Visitor: Sized {
    type Error;

    fn visit_expr(&mut self, expr: &Expr) -> Result<(), Self::Error> {
        walk_expr(self, expr)
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<(), Self::Error> {
        walk_stmt(self, stmt)
    }

    fn visit_for(&mut self, op: &For) -> Result<(), Self::Error> {
        walk_for(self, op)
    }
}

pub fn walk_expr<V: Visitor>(v: &mut V, expr: &Expr) -> Result<(), V::Error> {
    match expr {
        Expr::IntImm { .. }
        | Expr::UIntImm { .. }
        | Expr::FloatImm { .. }
        | Expr::Variable { .. } => Ok(()),
        Expr::Cast { value, .. } => v.visit_expr(value),
        Expr::Binary { a, b, .. } => {
            v.visit_expr(a)?;
            v.visit_expr(b)
        }
        Expr::Not { a } => v.visit_expr(a),
        Expr::Select {
            cond,
            true_value,
            false_value,
        } => {
            v.visit_expr(cond)?;
            v.visit_expr(true_value)?;
            v.visit_expr(false_value)
        }
        Expr::Load { index, .. } => v.visit_expr(index),
        Expr::Call { args, .. } => args.iter().try_for_each(|arg| v.visit_expr(arg)),
        Expr::Let { value, body, .. } => {
            v.visit_expr(value)?;
            v.visit_expr(body)
        }
    }
}

pub fn walk_stmt<V: Visitor>(v: &mut V, stmt: &Stmt) -> Result<(), V::Error> {
    match stmt {
        Stmt::LetStmt { value, body, .. } => {
            v.visit_expr(value)?;
            v.visit_stmt(body)
        }
        Stmt::For(op) => v.visit_for(op),
        Stmt::Store { value, index, .. } => {
            v.visit_expr(value)?;
            v.visit_expr(index)
        }
        Stmt::IfThenElse {
            cond,
            then_case,
            else_case,
        } => {
            v.visit_expr(cond)?;
            v.visit_stmt(then_case)?;
            match else_case {
                Some(else_case) => v.visit_stmt(else_case),
                None => Ok(()),
            }
        }
        Stmt::Block(stmts) => stmts.iter().try_for_each(|s| v.visit_stmt(s)),
        Stmt::Evaluate(e) => v.visit_expr(e),
    }
}

pub fn walk_for<V: Visitor>(v: &mut V, op: &For) -> Result<(), V::Error> {
    v.visit_expr(&op.min)?;
    v.visit_expr(&op.extent)?;
    v.visit_stmt(&op.body)
}
