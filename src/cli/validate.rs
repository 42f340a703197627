use std::path::PathBuf;
use std::process;

use clap::Args;

use super::{compile_input, resolve_config};

#[derive(Args)]
pub struct ValidateArgs {
    /// Input .kir file
    pub input: PathBuf,
    /// Config file (default: nearest kernelgen.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Exit with an error when no GPU adapter is available
    #[arg(long)]
    pub require_gpu: bool,
}

pub fn cmd_validate(args: ValidateArgs) {
    let ValidateArgs {
        input,
        config,
        require_gpu,
    } = args;
    let config = resolve_config(config.as_deref(), &input);
    let codegen = compile_input(&input, &config);

    let Some((device, _queue)) = kernelgen::gpu::try_create_device() else {
        if require_gpu {
            eprintln!("error: no GPU adapter available");
            process::exit(1);
        }
        eprintln!("warning: no GPU adapter available, skipped device validation");
        return;
    };

    match kernelgen::gpu::validate_wgsl(&device, codegen.source()) {
        Ok(()) => eprintln!("OK: {} validates on device", input.display()),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}
