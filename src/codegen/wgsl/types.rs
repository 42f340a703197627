use crate::codegen::CodegenError;
use crate::ir::{Type, TypeCode};

/// Spell `ty` as a WGSL type: `f32`, `i32`, `u32`, `bool`, or `vecN<T>`
/// for 2 to 4 lanes.
pub fn map_type(ty: Type) -> Result<String, CodegenError> {
    let scalar = match ty.code {
        TypeCode::Float if ty.bits == 32 => "f32",
        TypeCode::Float => return Err(CodegenError::UnsupportedFloatWidth { ty }),
        _ if ty.bits == 1 => "bool",
        TypeCode::Int if ty.bits == 32 => "i32",
        TypeCode::UInt if ty.bits == 32 => "u32",
        TypeCode::Int | TypeCode::UInt => return Err(CodegenError::UnsupportedIntWidth { ty }),
    };
    match ty.lanes {
        1 => Ok(scalar.to_string()),
        2..=4 => Ok(format!("vec{}<{}>", ty.lanes, scalar)),
        _ => Err(CodegenError::UnsupportedVectorWidth { ty }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(map_type(Type::f32()).unwrap(), "f32");
        assert_eq!(map_type(Type::i32()).unwrap(), "i32");
        assert_eq!(map_type(Type::u32()).unwrap(), "u32");
        assert_eq!(map_type(Type::bool()).unwrap(), "bool");
        assert_eq!(map_type(Type::int(1)).unwrap(), "bool");
    }

    #[test]
    fn test_vectors() {
        assert_eq!(map_type(Type::f32().with_lanes(4)).unwrap(), "vec4<f32>");
        assert_eq!(map_type(Type::i32().with_lanes(2)).unwrap(), "vec2<i32>");
        assert_eq!(map_type(Type::bool().with_lanes(3)).unwrap(), "vec3<bool>");
    }

    #[test]
    fn test_supported_types_are_distinct() {
        let types = [Type::f32(), Type::i32(), Type::u32(), Type::bool()];
        let mut names: Vec<String> = types.iter().map(|t| map_type(*t).unwrap()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), types.len());
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            map_type(Type::float(64)),
            Err(CodegenError::UnsupportedFloatWidth {
                ty: Type::float(64)
            })
        );
        assert_eq!(
            map_type(Type::float(16)),
            Err(CodegenError::UnsupportedFloatWidth {
                ty: Type::float(16)
            })
        );
        assert_eq!(
            map_type(Type::int(64)),
            Err(CodegenError::UnsupportedIntWidth { ty: Type::int(64) })
        );
        assert_eq!(
            map_type(Type::uint(8)),
            Err(CodegenError::UnsupportedIntWidth { ty: Type::uint(8) })
        );
        let wide = Type::f32().with_lanes(8);
        assert_eq!(
            map_type(wide),
            Err(CodegenError::UnsupportedVectorWidth { ty: wide })
        );
    }

    #[test]
    fn test_width_checked_before_lanes() {
        let ty = Type::int(64).with_lanes(8);
        assert!(matches!(
            map_type(ty),
            Err(CodegenError::UnsupportedIntWidth { .. })
        ));
    }
}
