pub mod build;
pub mod check;
pub mod validate;

use std::path::Path;
use std::process;

use kernelgen::{CodegenConfig, DeviceCodegen, KernelInfo, WebGpuCodegen};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (env-filter syntax).
const LOG_ENV: &str = "KERNELGEN_LOG";

/// Install the stderr log subscriber. `--verbose` wins over the
/// environment; the default level is `warn`.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load `--config` if given, else the nearest `kernelgen.toml` above the
/// input, else defaults.
pub fn resolve_config(explicit: Option<&Path>, input: &Path) -> CodegenConfig {
    let found = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => CodegenConfig::find(input.parent().unwrap_or(Path::new("."))),
    };
    let Some(path) = found else {
        return CodegenConfig::default();
    };
    match CodegenConfig::load(&path) {
        Ok(config) => {
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        Err(e) => {
            eprintln!("error: {}", e.message);
            process::exit(1);
        }
    }
}

/// Read and compile a `.kir` file, exiting with rendered diagnostics on
/// failure.
pub fn compile_input(input: &Path, config: &CodegenConfig) -> WebGpuCodegen {
    if !input.extension().is_some_and(|e| e == "kir") {
        eprintln!("error: input must be a .kir file");
        process::exit(1);
    }
    let source = match std::fs::read_to_string(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", input.display(), e);
            process::exit(1);
        }
    };
    let filename = input.to_string_lossy();
    match kernelgen::compile_source_reporting(&source, &filename, config) {
        Ok(codegen) => codegen,
        Err(_) => process::exit(1),
    }
}

/// One line per kernel: name, workgroup size, and bindings.
pub fn kernel_summary(info: &KernelInfo) -> String {
    let [x, y, z] = info.workgroup_size;
    let buffers: Vec<String> = info
        .buffers
        .iter()
        .map(|b| format!("{}@{}:{}", b.name, b.binding, b.elem))
        .collect();
    let scalars = info
        .uniforms
        .as_ref()
        .map(|u| u.fields.len())
        .unwrap_or(0);
    format!(
        "{} workgroup=({}, {}, {}) buffers=[{}] scalars={}",
        info.name,
        x,
        y,
        z,
        buffers.join(", "),
        scalars
    )
}

pub fn print_kernel_summaries(codegen: &WebGpuCodegen) {
    for info in codegen.kernels() {
        eprintln!("  {}", kernel_summary(info));
    }
}
