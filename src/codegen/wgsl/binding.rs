//! Resource binding: storage structs for buffers, one uniform struct for
//! all scalar arguments.

use super::names::mangle;
use super::types::map_type;
use crate::codegen::c_like::EmitterState;
use crate::codegen::layout::{BufferBinding, UniformBlock, UniformField};
use crate::codegen::CodegenError;
use crate::ir::DeviceArgument;

/// Bind group holding the storage buffers.
pub const BUFFER_GROUP: u32 = 0;
/// Bind group holding the scalar-argument uniform struct.
pub const UNIFORM_GROUP: u32 = 1;

/// Bytes every scalar argument must occupy in the uniform struct.
const SCALAR_ARG_BYTES: usize = 4;

/// Declared resources of one kernel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bindings {
    pub buffers: Vec<BufferBinding>,
    pub uniforms: Option<UniformBlock>,
}

/// Emit the binding declarations of `kernel` and register its buffers in
/// the allocation table.
///
/// Buffers are numbered by their position among the buffer arguments.
/// Declarations already written stay in the stream if a later argument is
/// rejected.
pub fn bind_resources(
    state: &mut EmitterState,
    kernel: &str,
    args: &[DeviceArgument],
) -> Result<Bindings, CodegenError> {
    let mut bindings = Bindings::default();
    let indent = state.indent_unit();

    for arg in args.iter().filter(|a| a.is_buffer) {
        let elem = map_type(arg.ty)?;
        // Named before registration, so the declaration has no `.data`.
        let mangled = mangle(&arg.name, state);
        let binding = bindings.buffers.len() as u32;
        let struct_name = format!("BufferStruct{}", mangled);
        state.write_line(&format!("struct {} {{", struct_name));
        state.write_line(&format!("{}data : array<{}>,", indent, elem));
        state.write_line("}");
        state.write_line(&format!(
            "@group({}) @binding({})",
            BUFFER_GROUP, binding
        ));
        state.write_line(&format!(
            "var<storage, read_write> {} : {};",
            mangled, struct_name
        ));
        state.write_line("");
        state.register_buffer(&arg.name, arg.ty);
        bindings.buffers.push(BufferBinding {
            name: arg.name.clone(),
            mangled,
            binding,
            elem: arg.ty,
        });
    }

    let scalars: Vec<&DeviceArgument> = args.iter().filter(|a| !a.is_buffer).collect();
    if scalars.is_empty() {
        return Ok(bindings);
    }

    let mut fields = Vec::with_capacity(scalars.len());
    for (i, arg) in scalars.iter().enumerate() {
        let bytes = arg.ty.bytes();
        if bytes != SCALAR_ARG_BYTES {
            return Err(CodegenError::UnsupportedScalarArgSize {
                name: arg.name.clone(),
                ty: arg.ty,
                bytes,
            });
        }
        map_type(arg.ty)?;
        fields.push(UniformField {
            name: arg.name.clone(),
            mangled: mangle(&arg.name, state),
            ty: arg.ty,
            offset: i * SCALAR_ARG_BYTES,
        });
    }

    let block = UniformBlock {
        struct_name: format!("ArgsStruct_{}", kernel),
        var_name: format!("Args_{}", kernel),
        fields,
    };
    state.write_line(&format!("struct {} {{", block.struct_name));
    for field in &block.fields {
        let ty = map_type(field.ty)?;
        state.write_line(&format!("{}{} : {},", indent, field.mangled, ty));
    }
    state.write_line("}");
    state.write_line(&format!("@group({}) @binding(0)", UNIFORM_GROUP));
    state.write_line(&format!(
        "var<uniform> {} : {};",
        block.var_name, block.struct_name
    ));
    state.write_line("");
    bindings.uniforms = Some(block);
    Ok(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodegenConfig;
    use crate::ir::Type;

    fn state() -> EmitterState {
        EmitterState::new(&CodegenConfig::default())
    }

    #[test]
    fn test_buffers_numbered_among_buffers() {
        let mut s = state();
        let args = [
            DeviceArgument::scalar("n", Type::i32()),
            DeviceArgument::buffer("a", Type::f32()),
            DeviceArgument::scalar("m", Type::u32()),
            DeviceArgument::buffer("b", Type::i32().with_lanes(4)),
        ];
        let b = bind_resources(&mut s, "k", &args).unwrap();
        assert_eq!(b.buffers.len(), 2);
        assert_eq!(b.buffers[0].binding, 0);
        assert_eq!(b.buffers[1].binding, 1);
        assert_eq!(b.buffers[1].mangled, "_b");
        assert!(s.source().contains("@group(0) @binding(1)\nvar<storage, read_write> _b : BufferStruct_b;"));
        assert!(s.source().contains("data : array<vec4<i32>>,"));
        assert!(s.is_buffer("a") && s.is_buffer("b"));
        assert!(!s.is_buffer("n"));
    }

    #[test]
    fn test_one_uniform_struct_for_all_scalars() {
        let mut s = state();
        let args = [
            DeviceArgument::scalar("n", Type::i32()),
            DeviceArgument::scalar("scale", Type::f32()),
        ];
        let b = bind_resources(&mut s, "k", &args).unwrap();
        let u = b.uniforms.unwrap();
        assert_eq!(u.struct_name, "ArgsStruct_k");
        assert_eq!(u.var_name, "Args_k");
        assert_eq!(u.fields[1].offset, 4);
        let expected = "\
struct ArgsStruct_k {
    _n : i32,
    _scale : f32,
}
@group(1) @binding(0)
var<uniform> Args_k : ArgsStruct_k;

";
        assert_eq!(s.source(), expected);
        assert_eq!(s.source().matches("var<uniform>").count(), 1);
    }

    #[test]
    fn test_no_scalars_no_uniform() {
        let mut s = state();
        let b = bind_resources(&mut s, "k", &[DeviceArgument::buffer("a", Type::u32())]).unwrap();
        assert!(b.uniforms.is_none());
        assert!(!s.source().contains("ArgsStruct"));
    }

    #[test]
    fn test_wide_scalar_rejected_before_uniform() {
        let mut s = state();
        let args = [
            DeviceArgument::buffer("a", Type::f32()),
            DeviceArgument::scalar("n", Type::int(64)),
        ];
        let err = bind_resources(&mut s, "k", &args).unwrap_err();
        assert_eq!(
            err,
            CodegenError::UnsupportedScalarArgSize {
                name: "n".to_string(),
                ty: Type::int(64),
                bytes: 8,
            }
        );
        // The buffer declaration is not rolled back.
        assert!(s.source().contains("BufferStruct_a"));
        assert!(!s.source().contains("ArgsStruct_k"));
    }

    #[test]
    fn test_unsupported_buffer_type() {
        let mut s = state();
        let err = bind_resources(&mut s, "k", &[DeviceArgument::buffer("a", Type::float(64))])
            .unwrap_err();
        assert!(matches!(err, CodegenError::UnsupportedFloatWidth { .. }));
        assert_eq!(s.source(), "");
    }
}
