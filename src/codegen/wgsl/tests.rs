use super::*;
use crate::ir::{Expr, ForType, Stmt, Type};

fn lowering() -> WgslLowering {
    WgslLowering::new(&CodegenConfig::default())
}

fn thread_x() -> Expr {
    Expr::var(Type::i32(), "f.s0.x.__thread_id_x")
}

/// Buffer `buf` of f32, scalar `n`, one 256-wide thread loop storing
/// `f32(x)` at `buf[x]`.
fn scenario() -> (Stmt, Vec<DeviceArgument>) {
    let store = Stmt::store("buf", Expr::cast(Type::f32(), thread_x()), thread_x());
    let body = Stmt::for_loop(
        "f.s0.x.__thread_id_x",
        Expr::int(0),
        Expr::int(256),
        ForType::GpuThread,
        store,
    );
    let args = vec![
        DeviceArgument::buffer("buf", Type::f32()),
        DeviceArgument::scalar("n", Type::i32()),
    ];
    (body, args)
}

#[test]
fn test_scenario_kernel() {
    let (body, args) = scenario();
    let mut w = lowering();
    w.init_module();
    let info = w.add_kernel(&body, "k", &args).unwrap();
    assert_eq!(info.workgroup_size, [256, 1, 1]);
    assert_eq!(info.buffers[0].binding, 0);
    insta::assert_snapshot!(w.source(), @r"
fn float_from_bits(x : i32) -> f32 {return bitcast<f32>(x);}
struct BufferStruct_buf {
    data : array<f32>,
}
@group(0) @binding(0)
var<storage, read_write> _buf : BufferStruct_buf;

struct ArgsStruct_k {
    _n : i32,
}
@group(1) @binding(0)
var<uniform> Args_k : ArgsStruct_k;

@compute @workgroup_size(256, 1, 1)
fn k(
    @builtin(local_invocation_id) local_id : vec3<u32>,
    @builtin(workgroup_id) group_id : vec3<u32>,
)
{
    let _n = Args_k._n;
    let _f_s0_x___thread_id_x = i32(local_id.x);
    let _0 = f32(_f_s0_x___thread_id_x);
    _buf.data[_f_s0_x___thread_id_x] = _0;
} // shader k
");
}

#[test]
fn test_integer_literals_are_bound() {
    let mut w = lowering();
    assert_eq!(w.print_expr(&Expr::int(7)).unwrap(), "_0");
    assert_eq!(w.print_expr(&Expr::uint(7)).unwrap(), "_1");
    assert_eq!(w.print_expr(&Expr::int(7)).unwrap(), "_0");
    assert_eq!(w.source(), "let _0 = 7;\nlet _1 = 7u;\n");
}

#[test]
fn test_bool_literal_inline() {
    let mut w = lowering();
    let t = Expr::UIntImm {
        ty: Type::bool(),
        value: 1,
    };
    assert_eq!(w.print_expr(&t).unwrap(), "true");
    assert_eq!(w.source(), "");
}

#[test]
fn test_wide_integer_literals_rejected() {
    let mut w = lowering();
    let wide = Expr::IntImm {
        ty: Type::int(64),
        value: 1,
    };
    assert_eq!(
        w.print_expr(&wide),
        Err(CodegenError::UnsupportedIntWidth { ty: Type::int(64) })
    );
    let narrow = Expr::UIntImm {
        ty: Type::uint(16),
        value: 1,
    };
    assert!(matches!(
        w.print_expr(&narrow),
        Err(CodegenError::UnsupportedIntWidth { .. })
    ));
}

#[test]
fn test_min_max_become_builtin_calls() {
    let mut w = lowering();
    let a = Expr::var(Type::f32(), "a");
    let b = Expr::var(Type::f32(), "b");
    w.print_expr(&Expr::min(a.clone(), b.clone())).unwrap();
    w.print_expr(&Expr::max(a, b)).unwrap();
    assert_eq!(w.source(), "let _0 = min(_a, _b);\nlet _1 = max(_a, _b);\n");
}

#[test]
fn test_select_argument_order() {
    let mut w = lowering();
    let c = Expr::var(Type::bool(), "c");
    let e = Expr::select(c, Expr::var(Type::f32(), "t"), Expr::var(Type::f32(), "f"));
    w.print_expr(&e).unwrap();
    assert_eq!(w.source(), "let _0 = select(_f, _t, _c);\n");
}

#[test]
fn test_cast_is_constructor_call() {
    let mut w = lowering();
    let e = Expr::cast(Type::u32().with_lanes(4), Expr::var(Type::i32().with_lanes(4), "v"));
    w.print_expr(&e).unwrap();
    assert_eq!(w.source(), "let _0 = vec4<u32>(_v);\n");
}

#[test]
fn test_cast_to_unsupported_type() {
    let mut w = lowering();
    let e = Expr::cast(Type::float(64), Expr::var(Type::f32(), "v"));
    assert!(matches!(
        w.print_expr(&e),
        Err(CodegenError::UnsupportedFloatWidth { .. })
    ));
}

#[test]
fn test_shared_subexpressions_reuse_ids() {
    let mut w = lowering();
    let e = Expr::mul(thread_x(), Expr::var(Type::i32(), "n"));
    let body = Stmt::block(vec![Stmt::evaluate(e.clone()), Stmt::evaluate(e)]);
    w.print_stmt(&body).unwrap();
    assert_eq!(w.source(), "let _0 = _f_s0_x___thread_id_x * _n;\n");
}

#[test]
fn test_serial_loop() {
    let mut w = lowering();
    let body = Stmt::store("out", Expr::float(1.0), Expr::var(Type::i32(), "r"));
    let s = Stmt::for_loop(
        "r",
        Expr::int(0),
        Expr::var(Type::i32(), "n"),
        ForType::Serial,
        body,
    );
    w.print_stmt(&s).unwrap();
    let expected = "\
let _0 = 0;
for (var _r : i32 = _0; _r < _0 + _n; _r++)
{
    _out[_r] = float_from_bits(1065353216 /* 1 */);
} // for _r
";
    assert_eq!(w.source(), expected);
}

#[test]
fn test_serial_loop_body_rereads_buffer() {
    let mut w = lowering();
    let load = || Expr::load(Type::f32(), "buf", Expr::int(0));
    let body = Stmt::store("buf", Expr::add(load(), Expr::float(1.0)), Expr::int(0));
    let s = Stmt::block(vec![
        Stmt::evaluate(load()),
        Stmt::for_loop("r", Expr::int(0), Expr::int(4), ForType::Serial, body),
    ]);
    w.print_stmt(&s).unwrap();
    let expected = "\
let _0 = 0;
let _1 = _buf[_0];
let _2 = 4;
for (var _r : i32 = _0; _r < _0 + _2; _r++)
{
    let _3 = 0;
    let _4 = _buf[_3];
    let _5 = _4 + float_from_bits(1065353216 /* 1 */);
    _buf[_3] = _5;
} // for _r
";
    assert_eq!(w.source(), expected);
}

#[test]
fn test_block_loop_reads_group_id() {
    let mut w = lowering();
    let s = Stmt::for_loop(
        "f.s0.y.__block_id_y",
        Expr::int(0),
        Expr::var(Type::i32(), "n"),
        ForType::GpuBlock,
        Stmt::evaluate(Expr::var(Type::i32(), "f.s0.y.__block_id_y")),
    );
    w.print_stmt(&s).unwrap();
    assert_eq!(w.source(), "let _f_s0_y___block_id_y = i32(group_id.y);\n");
}

#[test]
fn test_rejected_loops() {
    let noop = || Stmt::evaluate(Expr::var(Type::i32(), "x"));
    let cases = [
        ("x", ForType::Parallel, 0),
        ("x", ForType::GpuLane, 0),
        ("f.s0.x.__thread_id_x", ForType::GpuLane, 0),
        ("f.s0.x.__thread_id_x", ForType::Serial, 0),
        ("f.s0.x.__block_id_x", ForType::Parallel, 0),
    ];
    for (name, for_type, min) in cases {
        let mut w = lowering();
        let s = Stmt::for_loop(name, Expr::int(min), Expr::int(4), for_type, noop());
        assert!(
            matches!(w.print_stmt(&s), Err(CodegenError::UnsupportedLoopKind { .. })),
            "{} {}",
            name,
            for_type
        );
    }
}

#[test]
fn test_gpu_loop_must_start_at_zero() {
    let mut w = lowering();
    let s = Stmt::for_loop(
        "f.s0.x.__block_id_x",
        Expr::int(1),
        Expr::int(4),
        ForType::GpuBlock,
        Stmt::evaluate(Expr::int(0)),
    );
    assert_eq!(
        w.print_stmt(&s),
        Err(CodegenError::NonZeroGpuLoopMinimum {
            name: "f.s0.x.__block_id_x".to_string(),
            min: "1".to_string(),
        })
    );
}

#[test]
fn test_fourth_axis_rejected() {
    let mut w = lowering();
    let s = Stmt::for_loop(
        "f.s0.x.__block_id_w",
        Expr::int(0),
        Expr::int(4),
        ForType::GpuBlock,
        Stmt::evaluate(Expr::int(0)),
    );
    assert!(matches!(
        w.print_stmt(&s),
        Err(CodegenError::InvalidWorkgroupAxis { .. })
    ));
}

#[test]
fn test_dynamic_workgroup_emits_no_function() {
    let (_, args) = scenario();
    let body = Stmt::for_loop(
        "f.s0.x.__thread_id_x",
        Expr::int(0),
        Expr::var(Type::i32(), "n"),
        ForType::GpuThread,
        Stmt::evaluate(Expr::int(0)),
    );
    let mut w = lowering();
    w.init_module();
    let err = w.add_kernel(&body, "k", &args).unwrap_err();
    assert!(matches!(
        err,
        CodegenError::DynamicWorkgroupSizeUnsupported { .. }
    ));
    assert!(w.source().contains("BufferStruct_buf"));
    assert!(!w.source().contains("fn k("));
}

#[test]
fn test_let_statement_binds_mangled_name() {
    let mut w = lowering();
    let s = Stmt::let_stmt(
        "t.0",
        Expr::add(Expr::var(Type::i32(), "a"), Expr::var(Type::i32(), "b")),
        Stmt::store("out", Expr::var(Type::i32(), "t.0"), Expr::var(Type::i32(), "a")),
    );
    w.print_stmt(&s).unwrap();
    assert_eq!(
        w.source(),
        "let _0 = _a + _b;\nlet _t_0 = _0;\n_out[_a] = _t_0;\n"
    );
}

#[test]
fn test_if_else_scopes() {
    let mut w = lowering();
    let c = Expr::lt(Expr::var(Type::i32(), "a"), Expr::var(Type::i32(), "b"));
    let s = Stmt::if_then_else(
        c,
        Stmt::store("out", Expr::var(Type::i32(), "a"), Expr::var(Type::i32(), "i")),
        Some(Stmt::store("out", Expr::var(Type::i32(), "b"), Expr::var(Type::i32(), "i"))),
    );
    w.print_stmt(&s).unwrap();
    let expected = "\
let _0 = _a < _b;
if (_0)
{
    _out[_i] = _a;
} // if _0
else
{
    _out[_i] = _b;
} // if _0 else
";
    assert_eq!(w.source(), expected);
}

#[test]
fn test_scope_comments_off() {
    let config = CodegenConfig {
        scope_comments: false,
        indent_width: 2,
        ..CodegenConfig::default()
    };
    let (body, args) = scenario();
    let mut w = WgslLowering::new(&config);
    w.init_module();
    w.add_kernel(&body, "k", &args).unwrap();
    assert!(w.source().ends_with("  _buf.data[_f_s0_x___thread_id_x] = _0;\n}\n\n"));
    assert!(w.source().contains("\n  @builtin(workgroup_id) group_id : vec3<u32>,\n"));
}
