//! Textual rendering of IR nodes in the `.kir` s-expression syntax.
//!
//! Error messages quote offending nodes through these impls, and the
//! parser in `syntax` reads the same notation back.

use std::fmt;

use super::{DeviceArgument, Expr, For, KernelDef, KernelModule, Stmt, Type, TypeCode};

impl Type {
    /// Parse a type name such as `f32`, `u8`, `bool` or `i32x4`.
    pub fn from_name(name: &str) -> Option<Type> {
        let (base, lanes) = match name.split_once('x') {
            Some((base, lanes)) => (base, lanes.parse::<u16>().ok()?),
            None => (name, 1),
        };
        if lanes == 0 {
            return None;
        }
        if base == "bool" {
            return Some(Type::bool().with_lanes(lanes));
        }
        let code = match base.as_bytes().first()? {
            b'i' => TypeCode::Int,
            b'u' => TypeCode::UInt,
            b'f' => TypeCode::Float,
            _ => return None,
        };
        let bits = base[1..].parse::<u8>().ok()?;
        if bits == 0 {
            return None;
        }
        Some(Type::new(code, bits, lanes))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bool() {
            f.write_str("bool")?;
        } else {
            let prefix = match self.code {
                TypeCode::Int => 'i',
                TypeCode::UInt => 'u',
                TypeCode::Float => 'f',
            };
            write!(f, "{}{}", prefix, self.bits)?;
        }
        if self.lanes != 1 {
            write!(f, "x{}", self.lanes)?;
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::IntImm { ty, value } if *ty == Type::i32() => write!(f, "{}", value),
            Expr::IntImm { ty, value } => write!(f, "(int {} {})", ty, value),
            Expr::UIntImm { ty, value } if *ty == Type::u32() => write!(f, "{}u", value),
            Expr::UIntImm { ty, value } => write!(f, "(uint {} {})", ty, value),
            Expr::FloatImm { ty, value } if *ty == Type::f32() => {
                write!(f, "{:?}", *value as f32)
            }
            Expr::FloatImm { ty, value } => write!(f, "(float {} {:?})", ty, value),
            Expr::Variable { ty, name } => write!(f, "(var {} {})", ty, name),
            Expr::Cast { ty, value } => write!(f, "(cast {} {})", ty, value),
            Expr::Binary { op, a, b } => write!(f, "({} {} {})", op.symbol(), a, b),
            Expr::Not { a } => write!(f, "(! {})", a),
            Expr::Select {
                cond,
                true_value,
                false_value,
            } => write!(f, "(select {} {} {})", cond, true_value, false_value),
            Expr::Load { ty, name, index } => write!(f, "(load {} {} {})", ty, name, index),
            Expr::Call { ty, name, args } => {
                write!(f, "(call {} {}", ty, name)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Let { name, value, body } => write!(f, "(let {} {} {})", name, value, body),
        }
    }
}

/// Write a statement body: blocks are flattened into the enclosing form.
fn write_body(f: &mut fmt::Formatter<'_>, body: &Stmt) -> fmt::Result {
    match body {
        Stmt::Block(stmts) => {
            for s in stmts {
                write!(f, " {}", s)?;
            }
            Ok(())
        }
        other => write!(f, " {}", other),
    }
}

impl fmt::Display for For {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(for {} {} {} {}",
            self.name, self.for_type, self.min, self.extent
        )?;
        write_body(f, &self.body)?;
        f.write_str(")")
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::LetStmt { name, value, body } => {
                write!(f, "(let {} {}", name, value)?;
                write_body(f, body)?;
                f.write_str(")")
            }
            Stmt::For(op) => write!(f, "{}", op),
            Stmt::Store { name, value, index } => {
                write!(f, "(store {} {} {})", name, value, index)
            }
            Stmt::IfThenElse {
                cond,
                then_case,
                else_case,
            } => {
                write!(f, "(if {} {}", cond, then_case)?;
                if let Some(else_case) = else_case {
                    write!(f, " {}", else_case)?;
                }
                f.write_str(")")
            }
            Stmt::Block(stmts) => {
                f.write_str("(block")?;
                for s in stmts {
                    write!(f, " {}", s)?;
                }
                f.write_str(")")
            }
            Stmt::Evaluate(e) => write!(f, "(eval {})", e),
        }
    }
}

impl fmt::Display for DeviceArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_buffer { "buffer" } else { "scalar" };
        write!(f, "({} {} {})", kind, self.name, self.ty)
    }
}

impl fmt::Display for KernelDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(kernel {} (args", self.name)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        f.write_str(")")?;
        write_body(f, &self.body)?;
        f.write_str(")")
    }
}

/// One kernel per line.
impl fmt::Display for KernelModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for kernel in &self.kernels {
            writeln!(f, "{}", kernel)?;
        }
        Ok(())
    }
}
