use std::path::PathBuf;
use std::process;

use clap::Args;
use kernelgen::DeviceCodegen;

use super::{compile_input, print_kernel_summaries, resolve_config};

#[derive(Args)]
pub struct BuildArgs {
    /// Input .kir file
    pub input: PathBuf,
    /// Output .wgsl file (default: <input>.wgsl)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Config file (default: nearest kernelgen.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Also write the module source to stderr
    #[arg(long)]
    pub dump: bool,
}

pub fn cmd_build(args: BuildArgs) {
    let BuildArgs {
        input,
        output,
        config,
        dump,
    } = args;
    let config = resolve_config(config.as_deref(), &input);
    let codegen = compile_input(&input, &config);

    if dump {
        codegen.dump();
    }

    let out_path = output.unwrap_or_else(|| input.with_extension("wgsl"));
    if let Err(e) = std::fs::write(&out_path, codegen.source()) {
        eprintln!("error: cannot write '{}': {}", out_path.display(), e);
        process::exit(1);
    }
    eprintln!(
        "Compiled -> {} ({} kernels, {})",
        out_path.display(),
        codegen.kernels().len(),
        &codegen.fingerprint()[..16]
    );
    print_kernel_summaries(&codegen);
}
