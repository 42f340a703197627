use std::path::PathBuf;

use clap::Args;

use super::{compile_input, print_kernel_summaries, resolve_config};

#[derive(Args)]
pub struct CheckArgs {
    /// Input .kir file
    pub input: PathBuf,
    /// Config file (default: nearest kernelgen.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

pub fn cmd_check(args: CheckArgs) {
    let CheckArgs { input, config } = args;
    let config = resolve_config(config.as_deref(), &input);
    let codegen = compile_input(&input, &config);
    eprintln!("OK: {}", input.display());
    print_kernel_summaries(&codegen);
}
