//! Kernel IR: the scheduled loop nest handed to the device code generator.
//!
//! The IR is a statically typed, side-effect-free expression language
//! embedded in a small structured statement language. Loops carry a
//! `ForType` that tells the backend whether they iterate in software or
//! map onto the hardware dispatch grid.

mod display;
pub mod simplify;
pub mod visit;

use std::fmt;

// ─── Types ────────────────────────────────────────────────────────

/// Base kind of a scalar or vector type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Int,
    UInt,
    Float,
}

/// A scalar or vector type: base kind, bit width, and lane count.
///
/// Booleans are the 1-bit unsigned type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Type {
    pub code: TypeCode,
    pub bits: u8,
    pub lanes: u16,
}

impl Type {
    pub const fn new(code: TypeCode, bits: u8, lanes: u16) -> Self {
        Self { code, bits, lanes }
    }

    pub const fn int(bits: u8) -> Self {
        Self::new(TypeCode::Int, bits, 1)
    }

    pub const fn uint(bits: u8) -> Self {
        Self::new(TypeCode::UInt, bits, 1)
    }

    pub const fn float(bits: u8) -> Self {
        Self::new(TypeCode::Float, bits, 1)
    }

    pub const fn bool() -> Self {
        Self::new(TypeCode::UInt, 1, 1)
    }

    pub const fn i32() -> Self {
        Self::int(32)
    }

    pub const fn u32() -> Self {
        Self::uint(32)
    }

    pub const fn f32() -> Self {
        Self::float(32)
    }

    /// Same base kind and width with a different lane count.
    pub const fn with_lanes(self, lanes: u16) -> Self {
        Self::new(self.code, self.bits, lanes)
    }

    /// The scalar type of one lane.
    pub const fn element_of(self) -> Self {
        self.with_lanes(1)
    }

    pub fn is_int(self) -> bool {
        self.code == TypeCode::Int
    }

    pub fn is_uint(self) -> bool {
        self.code == TypeCode::UInt
    }

    pub fn is_float(self) -> bool {
        self.code == TypeCode::Float
    }

    pub fn is_bool(self) -> bool {
        self.code == TypeCode::UInt && self.bits == 1
    }

    pub fn is_scalar(self) -> bool {
        self.lanes == 1
    }

    /// Storage size in bytes: each lane rounds up to whole bytes.
    pub fn bytes(self) -> usize {
        (self.bits as usize).div_ceil(8) * self.lanes as usize
    }
}

// ─── Loops ────────────────────────────────────────────────────────

/// How a loop is executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ForType {
    /// Ordinary software loop.
    Serial,
    /// Host-style parallel loop. Not allowed inside a device kernel.
    Parallel,
    /// Mapped onto the workgroup grid.
    GpuBlock,
    /// Mapped onto the threads of one workgroup.
    GpuThread,
    /// Mapped onto SIMD lanes of a thread.
    GpuLane,
}

impl ForType {
    /// True for loop kinds whose iteration is supplied by hardware dispatch.
    pub fn is_gpu(self) -> bool {
        matches!(self, ForType::GpuBlock | ForType::GpuThread | ForType::GpuLane)
    }

    /// Keyword used by the textual kernel format.
    pub fn keyword(self) -> &'static str {
        match self {
            ForType::Serial => "serial",
            ForType::Parallel => "parallel",
            ForType::GpuBlock => "gpu_block",
            ForType::GpuThread => "gpu_thread",
            ForType::GpuLane => "gpu_lane",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "serial" => Some(ForType::Serial),
            "parallel" => Some(ForType::Parallel),
            "gpu_block" => Some(ForType::GpuBlock),
            "gpu_thread" => Some(ForType::GpuThread),
            "gpu_lane" => Some(ForType::GpuLane),
            _ => None,
        }
    }
}

impl fmt::Display for ForType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

// ─── Expressions ──────────────────────────────────────────────────

/// Binary operators. Comparisons and logical operators produce booleans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    // ── Arithmetic ──
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,

    // ── Comparison ──
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // ── Logic ──
    And,
    Or,
}

impl BinOp {
    /// Infix spelling. `min`/`max` have none in C-family syntax and use
    /// their call name instead.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Min => "min",
            BinOp::Max => "max",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "%" => BinOp::Mod,
            "min" => BinOp::Min,
            "max" => BinOp::Max,
            "==" => BinOp::Eq,
            "!=" => BinOp::Ne,
            "<" => BinOp::Lt,
            "<=" => BinOp::Le,
            ">" => BinOp::Gt,
            ">=" => BinOp::Ge,
            "&&" => BinOp::And,
            "||" => BinOp::Or,
            _ => return None,
        };
        Some(op)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

/// A typed, side-effect-free expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    // ── Literals ──
    IntImm {
        ty: Type,
        value: i64,
    },
    UIntImm {
        ty: Type,
        value: u64,
    },
    FloatImm {
        ty: Type,
        value: f64,
    },

    // ── Values ──
    Variable {
        ty: Type,
        name: String,
    },
    Cast {
        ty: Type,
        value: Box<Expr>,
    },
    Binary {
        op: BinOp,
        a: Box<Expr>,
        b: Box<Expr>,
    },
    Not {
        a: Box<Expr>,
    },
    Select {
        cond: Box<Expr>,
        true_value: Box<Expr>,
        false_value: Box<Expr>,
    },

    // ── Memory and calls ──
    /// Read element `index` of the buffer called `name`.
    Load {
        ty: Type,
        name: String,
        index: Box<Expr>,
    },
    /// Call to an extern or intrinsic function by name.
    Call {
        ty: Type,
        name: String,
        args: Vec<Expr>,
    },

    // ── Binding ──
    Let {
        name: String,
        value: Box<Expr>,
        body: Box<Expr>,
    },
}

impl Expr {
    /// A 32-bit signed integer literal.
    pub fn int(value: i32) -> Self {
        Expr::IntImm {
            ty: Type::i32(),
            value: value as i64,
        }
    }

    /// A 32-bit unsigned integer literal.
    pub fn uint(value: u32) -> Self {
        Expr::UIntImm {
            ty: Type::u32(),
            value: value as u64,
        }
    }

    /// A 32-bit float literal.
    pub fn float(value: f32) -> Self {
        Expr::FloatImm {
            ty: Type::f32(),
            value: value as f64,
        }
    }

    pub fn var(ty: Type, name: impl Into<String>) -> Self {
        Expr::Variable {
            ty,
            name: name.into(),
        }
    }

    pub fn cast(ty: Type, value: Expr) -> Self {
        Expr::Cast {
            ty,
            value: Box::new(value),
        }
    }

    pub fn binary(op: BinOp, a: Expr, b: Expr) -> Self {
        Expr::Binary {
            op,
            a: Box::new(a),
            b: Box::new(b),
        }
    }

    pub fn add(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Add, a, b)
    }

    pub fn sub(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Sub, a, b)
    }

    pub fn mul(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Mul, a, b)
    }

    pub fn min(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Min, a, b)
    }

    pub fn max(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Max, a, b)
    }

    pub fn lt(a: Expr, b: Expr) -> Self {
        Self::binary(BinOp::Lt, a, b)
    }

    pub fn not(a: Expr) -> Self {
        Expr::Not { a: Box::new(a) }
    }

    pub fn select(cond: Expr, true_value: Expr, false_value: Expr) -> Self {
        Expr::Select {
            cond: Box::new(cond),
            true_value: Box::new(true_value),
            false_value: Box::new(false_value),
        }
    }

    pub fn load(ty: Type, name: impl Into<String>, index: Expr) -> Self {
        Expr::Load {
            ty,
            name: name.into(),
            index: Box::new(index),
        }
    }

    pub fn call(ty: Type, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            ty,
            name: name.into(),
            args,
        }
    }

    pub fn let_in(name: impl Into<String>, value: Expr, body: Expr) -> Self {
        Expr::Let {
            name: name.into(),
            value: Box::new(value),
            body: Box::new(body),
        }
    }

    /// The type this expression evaluates to.
    pub fn ty(&self) -> Type {
        match self {
            Expr::IntImm { ty, .. }
            | Expr::UIntImm { ty, .. }
            | Expr::FloatImm { ty, .. }
            | Expr::Variable { ty, .. }
            | Expr::Cast { ty, .. }
            | Expr::Load { ty, .. }
            | Expr::Call { ty, .. } => *ty,
            Expr::Binary { op, a, .. } => {
                if op.is_comparison() || op.is_logical() {
                    Type::bool().with_lanes(a.ty().lanes)
                } else {
                    a.ty()
                }
            }
            Expr::Not { a } => a.ty(),
            Expr::Select { true_value, .. } => true_value.ty(),
            Expr::Let { body, .. } => body.ty(),
        }
    }
}

// ─── Statements ───────────────────────────────────────────────────

/// A loop node. GPU-mapped loops are recognised by the name suffix of their
/// induction variable as well as by `for_type`.
#[derive(Clone, Debug, PartialEq)]
pub struct For {
    pub name: String,
    pub min: Expr,
    pub extent: Expr,
    pub for_type: ForType,
    pub body: Box<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    LetStmt {
        name: String,
        value: Expr,
        body: Box<Stmt>,
    },
    For(For),
    /// Write `value` to element `index` of the buffer called `name`.
    Store {
        name: String,
        value: Expr,
        index: Expr,
    },
    IfThenElse {
        cond: Expr,
        then_case: Box<Stmt>,
        else_case: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    Evaluate(Expr),
}

impl Stmt {
    pub fn for_loop(
        name: impl Into<String>,
        min: Expr,
        extent: Expr,
        for_type: ForType,
        body: Stmt,
    ) -> Self {
        Stmt::For(For {
            name: name.into(),
            min,
            extent,
            for_type,
            body: Box::new(body),
        })
    }

    pub fn store(name: impl Into<String>, value: Expr, index: Expr) -> Self {
        Stmt::Store {
            name: name.into(),
            value,
            index,
        }
    }

    pub fn let_stmt(name: impl Into<String>, value: Expr, body: Stmt) -> Self {
        Stmt::LetStmt {
            name: name.into(),
            value,
            body: Box::new(body),
        }
    }

    pub fn if_then_else(cond: Expr, then_case: Stmt, else_case: Option<Stmt>) -> Self {
        Stmt::IfThenElse {
            cond,
            then_case: Box::new(then_case),
            else_case: else_case.map(Box::new),
        }
    }

    /// Sequence statements; a single statement is returned unwrapped.
    pub fn block(mut stmts: Vec<Stmt>) -> Self {
        if stmts.len() == 1 {
            stmts.remove(0)
        } else {
            Stmt::Block(stmts)
        }
    }

    pub fn evaluate(e: Expr) -> Self {
        Stmt::Evaluate(e)
    }
}

// ─── Kernels ──────────────────────────────────────────────────────

/// A formal argument of a device kernel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceArgument {
    pub name: String,
    /// Element type for buffers, value type for scalars.
    pub ty: Type,
    pub is_buffer: bool,
}

impl DeviceArgument {
    pub fn buffer(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            is_buffer: true,
        }
    }

    pub fn scalar(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            is_buffer: false,
        }
    }
}

/// One kernel as handed over by the front end.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelDef {
    pub name: String,
    pub args: Vec<DeviceArgument>,
    pub body: Stmt,
}

/// The kernels of one pipeline, in emission order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KernelModule {
    pub kernels: Vec<KernelDef>,
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_bytes() {
        assert_eq!(Type::f32().bytes(), 4);
        assert_eq!(Type::bool().bytes(), 1);
        assert_eq!(Type::int(64).bytes(), 8);
        assert_eq!(Type::f32().with_lanes(4).bytes(), 16);
        assert_eq!(Type::int(16).with_lanes(2).bytes(), 4);
    }

    #[test]
    fn test_bool_is_one_bit_uint() {
        assert!(Type::bool().is_bool());
        assert!(Type::bool().is_uint());
        assert!(!Type::u32().is_bool());
    }

    #[test]
    fn test_comparison_type_is_bool() {
        let x = Expr::var(Type::f32().with_lanes(4), "x");
        let cmp = Expr::lt(x.clone(), x);
        assert_eq!(cmp.ty(), Type::bool().with_lanes(4));
    }

    #[test]
    fn test_arithmetic_type_follows_operand() {
        let e = Expr::add(Expr::uint(1), Expr::uint(2));
        assert_eq!(e.ty(), Type::u32());
        let m = Expr::max(Expr::float(1.0), Expr::float(2.0));
        assert_eq!(m.ty(), Type::f32());
    }

    #[test]
    fn test_for_type_keywords_roundtrip() {
        for ft in [
            ForType::Serial,
            ForType::Parallel,
            ForType::GpuBlock,
            ForType::GpuThread,
            ForType::GpuLane,
        ] {
            assert_eq!(ForType::from_keyword(ft.keyword()), Some(ft));
        }
        assert_eq!(ForType::from_keyword("vectorized"), None);
    }

    #[test]
    fn test_block_of_one_unwraps() {
        let s = Stmt::evaluate(Expr::int(0));
        assert_eq!(Stmt::block(vec![s.clone()]), s);
        assert!(matches!(Stmt::block(vec![s.clone(), s]), Stmt::Block(v) if v.len() == 2));
    }
}
