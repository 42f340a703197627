use clap::{Parser, Subcommand};

mod cli;

#[derive(Parser)]
#[command(
    name = "kernelgen",
    version,
    about = "kernelgen: lower scheduled kernel loop nests to WGSL compute shaders"
)]
struct Cli {
    /// Log debug events to stderr (overrides KERNELGEN_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a .kir file to a WGSL module
    Build(cli::build::BuildArgs),
    /// Parse and lower a .kir file without writing output
    Check(cli::check::CheckArgs),
    /// Compile a .kir file and validate the module on a GPU
    Validate(cli::validate::ValidateArgs),
}

fn main() {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);

    match cli.command {
        Command::Build(args) => cli::build::cmd_build(args),
        Command::Check(args) => cli::check::cmd_check(args),
        Command::Validate(args) => cli::validate::cmd_validate(args),
    }
}
