pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod gpu;
pub mod ir;
pub mod span;
pub mod syntax;

pub use codegen::{create_device_codegen, CodegenError, DeviceCodegen, KernelInfo, WebGpuCodegen};
pub use config::CodegenConfig;
pub use diagnostic::Diagnostic;
pub use ir::KernelModule;

/// Emit every kernel of `module`, in order, into one WGSL module.
pub fn compile_module(
    module: &KernelModule,
    config: &CodegenConfig,
) -> Result<WebGpuCodegen, CodegenError> {
    let mut codegen = WebGpuCodegen::new(config);
    codegen.init_module();
    for kernel in &module.kernels {
        codegen.add_kernel(&kernel.body, &kernel.name, &kernel.args)?;
    }
    Ok(codegen)
}

/// Parse `.kir` source and compile it. Parse errors carry spans into
/// `source`; code generation errors do not.
pub fn compile_source(
    source: &str,
    config: &CodegenConfig,
) -> Result<WebGpuCodegen, Vec<Diagnostic>> {
    let module = syntax::parse_module(source)?;
    compile_module(&module, config).map_err(|e| vec![e.to_diagnostic()])
}

/// Like [`compile_source`], but renders any diagnostics to stderr.
pub fn compile_source_reporting(
    source: &str,
    filename: &str,
    config: &CodegenConfig,
) -> Result<WebGpuCodegen, Vec<Diagnostic>> {
    compile_source(source, config).inspect_err(|errors| {
        diagnostic::render_diagnostics(errors, filename, source);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_source_two_kernels() {
        let src = "\
(kernel zero (args (buffer out f32))
  (for out.s0.x.__thread_id_x gpu_thread 0 64
    (store out 0.0 (var i32 out.s0.x.__thread_id_x))))
(kernel one (args (buffer out f32))
  (for out.s0.x.__thread_id_x gpu_thread 0 32
    (store out 1.0 (var i32 out.s0.x.__thread_id_x))))
";
        let cg = compile_source(src, &CodegenConfig::default()).unwrap();
        let sizes: Vec<[u32; 3]> = cg.kernels().iter().map(|k| k.workgroup_size).collect();
        assert_eq!(sizes, [[64, 1, 1], [32, 1, 1]]);
        assert!(cg.source().contains("} // shader one"));
    }

    #[test]
    fn test_codegen_error_becomes_diagnostic() {
        let src = "(kernel k (args (scalar n i64)))";
        let errors = compile_source(src, &CodegenConfig::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("'n'"));
        assert!(!errors[0].notes.is_empty());
    }

    #[test]
    fn test_parse_errors_returned() {
        let errors = compile_source("(kernel", &CodegenConfig::default()).unwrap_err();
        assert!(!errors.is_empty());
    }
}
