//! Per-kernel resource layout handed to the host driver.
//!
//! The emitted shader binds each buffer argument at `@group(0)` in argument
//! order and packs every scalar argument into one uniform struct at
//! `@group(1) @binding(0)`. `KernelInfo` records that layout so the host can
//! build matching bind groups without re-deriving it from the source text.

use thiserror::Error;

use crate::ir::Type;

/// Uniform buffers are sized in multiples of this many bytes.
pub const UNIFORM_ALIGNMENT: usize = 16;

/// Metadata of one emitted kernel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelInfo {
    pub name: String,
    pub workgroup_size: [u32; 3],
    pub buffers: Vec<BufferBinding>,
    pub uniforms: Option<UniformBlock>,
}

impl KernelInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            workgroup_size: [1, 1, 1],
            buffers: Vec::new(),
            uniforms: None,
        }
    }

    /// Threads per workgroup.
    pub fn invocations(&self) -> u64 {
        self.workgroup_size.iter().map(|&d| d as u64).product()
    }
}

/// A storage buffer bound at `@group(0) @binding(binding)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferBinding {
    pub name: String,
    pub mangled: String,
    pub binding: u32,
    pub elem: Type,
}

/// One scalar argument inside the uniform struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    pub mangled: String,
    pub ty: Type,
    /// Byte offset within the uniform buffer.
    pub offset: usize,
}

/// The uniform struct holding a kernel's scalar arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformBlock {
    pub struct_name: String,
    pub var_name: String,
    pub fields: Vec<UniformField>,
}

/// Runtime value of a scalar kernel argument.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScalarValue {
    I32(i32),
    U32(u32),
    F32(f32),
}

impl ScalarValue {
    fn ty(self) -> Type {
        match self {
            ScalarValue::I32(_) => Type::i32(),
            ScalarValue::U32(_) => Type::u32(),
            ScalarValue::F32(_) => Type::f32(),
        }
    }

    fn bits(self) -> u32 {
        match self {
            ScalarValue::I32(v) => v as u32,
            ScalarValue::U32(v) => v,
            ScalarValue::F32(v) => v.to_bits(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum UniformPackError {
    #[error("expected {expected} scalar arguments, got {found}")]
    ArgumentCount { expected: usize, found: usize },

    #[error("scalar argument '{name}' is {expected}, got {value:?}")]
    TypeMismatch {
        name: String,
        expected: Type,
        value: ScalarValue,
    },
}

impl UniformBlock {
    /// Size of the uniform buffer in bytes, padded to 16.
    pub fn size(&self) -> usize {
        (self.fields.len() * 4).next_multiple_of(UNIFORM_ALIGNMENT)
    }

    /// Pack argument values, in field order, into uniform buffer bytes.
    /// Each field is a little-endian 32-bit word at its recorded offset.
    pub fn pack(&self, values: &[ScalarValue]) -> Result<Vec<u8>, UniformPackError> {
        if values.len() != self.fields.len() {
            return Err(UniformPackError::ArgumentCount {
                expected: self.fields.len(),
                found: values.len(),
            });
        }
        let mut words = vec![0u32; self.size() / 4];
        for (field, value) in self.fields.iter().zip(values) {
            if value.ty() != field.ty {
                return Err(UniformPackError::TypeMismatch {
                    name: field.name.clone(),
                    expected: field.ty,
                    value: *value,
                });
            }
            words[field.offset / 4] = value.bits().to_le();
        }
        Ok(bytemuck::cast_slice::<u32, u8>(&words).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(types: &[(&str, Type)]) -> UniformBlock {
        UniformBlock {
            struct_name: "ArgsStruct_k".to_string(),
            var_name: "Args_k".to_string(),
            fields: types
                .iter()
                .enumerate()
                .map(|(i, (name, ty))| UniformField {
                    name: name.to_string(),
                    mangled: format!("_{}", name),
                    ty: *ty,
                    offset: i * 4,
                })
                .collect(),
        }
    }

    #[test]
    fn test_pack_little_endian_fields() {
        let b = block(&[("n", Type::i32()), ("scale", Type::f32())]);
        let bytes = b.pack(&[ScalarValue::I32(-2), ScalarValue::F32(1.0)]).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], &(-2i32).to_le_bytes());
        assert_eq!(&bytes[4..8], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[8..16], &[0u8; 8]);
    }

    #[test]
    fn test_size_rounds_to_sixteen() {
        let five: Vec<(&str, Type)> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|n| (*n, Type::u32()))
            .collect();
        assert_eq!(block(&five).size(), 32);
        assert_eq!(block(&[]).size(), 0);
    }

    #[test]
    fn test_pack_rejects_wrong_count() {
        let b = block(&[("n", Type::i32())]);
        let err = b.pack(&[]).unwrap_err();
        assert_eq!(
            err,
            UniformPackError::ArgumentCount {
                expected: 1,
                found: 0
            }
        );
    }

    #[test]
    fn test_pack_rejects_type_mismatch() {
        let b = block(&[("n", Type::i32())]);
        let err = b.pack(&[ScalarValue::F32(2.0)]).unwrap_err();
        assert!(err.to_string().contains("'n' is i32"), "{}", err);
    }

    #[test]
    fn test_invocations() {
        let mut info = KernelInfo::new("k");
        assert_eq!(info.invocations(), 1);
        info.workgroup_size = [16, 16, 1];
        assert_eq!(info.invocations(), 256);
    }
}
