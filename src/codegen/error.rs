//! Errors raised while emitting device code.
//!
//! Every variant is fatal to the current pipeline compilation. Nothing in
//! the backend catches or downgrades them; the driver aborts and reports.

use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::ir::{ForType, Type};
use crate::span::Span;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CodegenError {
    #[error("unsupported vector width in WGSL: {ty}")]
    UnsupportedVectorWidth { ty: Type },

    #[error("WGSL only supports 32-bit floats, found {ty}")]
    UnsupportedFloatWidth { ty: Type },

    #[error("WGSL only supports 32-bit integers, found {ty}")]
    UnsupportedIntWidth { ty: Type },

    #[error("non-buffer argument '{name}' of type {ty} is {bytes} bytes; only 32-bit scalar arguments are supported")]
    UnsupportedScalarArgSize { name: String, ty: Type, bytes: usize },

    #[error("dynamic workgroup sizes are not supported: loop '{name}' has extent {extent}")]
    DynamicWorkgroupSizeUnsupported { name: String, extent: String },

    #[error("'{name}' must be greater than zero, found extent {value}")]
    NonPositiveWorkgroupSize { name: String, value: i64 },

    #[error("extent {value} of '{name}' does not fit in a workgroup dimension")]
    WorkgroupSizeOverflow { name: String, value: i64 },

    #[error("invalid workgroup axis for loop variable '{name}'")]
    InvalidWorkgroupAxis { name: String },

    #[error("{reason}: loop '{name}' is {for_type}")]
    UnsupportedLoopKind {
        name: String,
        for_type: ForType,
        reason: &'static str,
    },

    #[error("GPU loop '{name}' must start at zero, found minimum {min}")]
    NonZeroGpuLoopMinimum { name: String, min: String },

    #[error("cannot add kernel '{kernel}': no module has been initialized")]
    ModuleNotInitialized { kernel: String },
}

impl CodegenError {
    /// Convert into a user-facing diagnostic with a remedy where one exists.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let d = Diagnostic::error(self.to_string(), Span::dummy());
        match self {
            CodegenError::UnsupportedVectorWidth { .. } => {
                d.with_help("WGSL vectors have 2, 3 or 4 lanes".to_string())
            }
            CodegenError::UnsupportedFloatWidth { .. } | CodegenError::UnsupportedIntWidth { .. } => {
                d.with_help("use f32, i32, u32 or bool".to_string())
            }
            CodegenError::UnsupportedScalarArgSize { .. } => d.with_note(
                "scalar arguments are packed into one uniform struct of 32-bit fields".to_string(),
            ),
            CodegenError::DynamicWorkgroupSizeUnsupported { .. } => d.with_help(
                "split the GPU thread loop by a constant factor so its extent is known".to_string(),
            ),
            CodegenError::InvalidWorkgroupAxis { .. } => {
                d.with_note("WebGPU supports at most three dispatch dimensions".to_string())
            }
            CodegenError::NonZeroGpuLoopMinimum { .. } => d.with_note(
                "dispatch indices start at zero; offset the loop body instead".to_string(),
            ),
            CodegenError::ModuleNotInitialized { .. } => {
                d.with_help("call init_module() before add_kernel()".to_string())
            }
            CodegenError::NonPositiveWorkgroupSize { .. }
            | CodegenError::WorkgroupSizeOverflow { .. }
            | CodegenError::UnsupportedLoopKind { .. } => d,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_offending_type() {
        let e = CodegenError::UnsupportedIntWidth { ty: Type::int(64) };
        assert_eq!(e.to_string(), "WGSL only supports 32-bit integers, found i64");
        let e = CodegenError::UnsupportedVectorWidth {
            ty: Type::f32().with_lanes(8),
        };
        assert!(e.to_string().contains("f32x8"));
    }

    #[test]
    fn test_loop_kind_message() {
        let e = CodegenError::UnsupportedLoopKind {
            name: "f.s0.x".to_string(),
            for_type: ForType::Parallel,
            reason: "cannot use parallel loops inside WebGPU shaders",
        };
        assert_eq!(
            e.to_string(),
            "cannot use parallel loops inside WebGPU shaders: loop 'f.s0.x' is parallel"
        );
    }

    #[test]
    fn test_diagnostic_carries_help() {
        let d = CodegenError::UnsupportedFloatWidth { ty: Type::float(64) }.to_diagnostic();
        assert_eq!(d.message, "WGSL only supports 32-bit floats, found f64");
        assert_eq!(d.help.as_deref(), Some("use f32, i32, u32 or bool"));
    }
}
