use awd::{AddressMode, AwdSettings};

use crate::prelude::*;

#[allow(unused_imports)]
mod prelude {
    pub use std::path::{Path, PathBuf};

    pub use anyhow::{Context, Result as AnyResult, bail};
}

mod cmd {
    #[cfg(feature = "obj")]
    pub mod from_obj;
}

#[derive(clap::Parser, Debug)]
#[command(about = "Tool for producing AWD scene files.")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    /// Operation to perform
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Args, Debug)]
struct CommonArgs {
    /// Print extra info about what the tool is doing
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default)]
enum AddressModeArg {
    /// Always 16-bit block addresses
    Narrow,
    /// Always 32-bit block addresses
    Wide,
    /// 16-bit unless the document has too many blocks
    #[default]
    Auto,
}

#[derive(clap::Args, Debug)]
struct WriteArgs {
    /// Width of block addresses in the output file
    #[arg(long, value_enum, default_value_t)]
    address_mode: AddressModeArg,
    /// Write matrices and transforms with 64-bit floats
    #[arg(long)]
    wide_matrices: bool,
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Overwrite output file if it exists
    #[arg(short, long)]
    overwrite: bool,
}

#[derive(clap::Args, Debug)]
struct InputPaths {
    /// Path to the input files
    in_files: Vec<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct OutputPath {
    /// Path where to save the output file
    out_file: PathBuf,
}

#[derive(clap::Subcommand, Debug)]
enum CliCommand {
    /// Print information about the tool
    Version,
    /// Import meshes from OBJ files
    #[cfg(feature = "obj")]
    FromObj(cmd::from_obj::FromObjArgs),
}

impl From<AddressModeArg> for AddressMode {
    fn from(arg: AddressModeArg) -> Self {
        match arg {
            AddressModeArg::Narrow => AddressMode::Narrow,
            AddressModeArg::Wide => AddressMode::Wide,
            AddressModeArg::Auto => AddressMode::Auto,
        }
    }
}

impl From<&WriteArgs> for AwdSettings {
    fn from(args: &WriteArgs) -> Self {
        Self {
            address_mode: args.address_mode.into(),
            wide_matrices: args.wide_matrices,
        }
    }
}

fn run_command(cli: &Cli) -> AnyResult<()> {
    match &cli.command {
        CliCommand::Version => {
            // Verbose always prints version anyway
            if !cli.common.verbose {
                print_version();
            }
            Ok(())
        }
        #[cfg(feature = "obj")]
        CliCommand::FromObj(args) => cmd::from_obj::run(&cli.common, args),
    }
}

fn print_version() {
    eprintln!(
        "{} version {}. Writes file format version {}.{}.",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        awd::FORMAT_VERSION_MAJOR,
        awd::FORMAT_VERSION_MINOR,
    );
    eprintln!();
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(level.into()),
        )
        .init();
}

fn main() {
    use clap::Parser;
    let cli = Cli::parse();

    init_logging(cli.common.verbose);

    if cli.common.verbose {
        print_version();
    }

    if let Err(e) = run_command(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(2);
    }
}
