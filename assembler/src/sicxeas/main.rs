use std::error::Error;
use std::ffi::OsString;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use clap::ArgAction::{Set, SetTrue};
use clap::Parser;
use tracing::{event, span, Level};
use tracing_subscriber::prelude::*;

use assembler::*;

/// Two-pass assembler for SIC/XE programs
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// File from which assembly source is read.
    #[clap(action = Set)]
    input: OsString,

    /// File to which the object module is written (default: stdout).
    #[clap(action = Set, short = 'o', long)]
    output: Option<PathBuf>,

    /// Instruction catalog file (default: the standard SIC/XE
    /// instruction set).
    #[clap(action = Set, long)]
    catalog: Option<PathBuf>,

    /// File to which the symbol table is written.
    #[clap(action = Set, long)]
    symtab: Option<PathBuf>,

    /// File to which the literal table is written.
    #[clap(action = Set, long)]
    littab: Option<PathBuf>,

    /// When set, print an assembly listing on stdout.
    #[clap(action = SetTrue, long)]
    list: bool,
}

#[derive(Debug)]
enum Fail {
    /// We initialised the assembler but then it failed.
    AsmFail(AssemblerFailure),
    /// We were not able to correctly initialise the assembler.
    InitialisationFailure(String),
}

impl Display for Fail {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Fail::AsmFail(assembler_failure) => assembler_failure.fmt(f),
            Fail::InitialisationFailure(msg) => f.write_str(msg.as_str()),
        }
    }
}

impl Error for Fail {}

fn run_assembler() -> Result<(), Fail> {
    let cli = Cli::parse();

    // RUST_LOG selects which trace messages get printed; see
    // https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            return Err(Fail::InitialisationFailure(format!(
                "failed to initialise tracing filter (perhaps there is a problem with environment variables): {e}"
            )));
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let span = span!(Level::ERROR, "assemble", input=?cli.input, output=?cli.output);
    let _enter = span.enter();
    let options = OutputOptions {
        object: cli.output,
        symtab: cli.symtab,
        littab: cli.littab,
        list: cli.list,
    };
    let result = load_catalog(cli.catalog.as_deref())
        .and_then(|catalog| assemble_file(&cli.input, &catalog, &options))
        .map_err(Fail::AsmFail);
    if let Err(e) = &result {
        event!(Level::ERROR, "assembly failed: {:?}", e);
    } else {
        event!(Level::INFO, "assembly succeeded");
    }
    result
}

fn main() {
    match run_assembler() {
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}
