//! CLI front end for the BURS instruction selector (spec §4.2/§6).

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use clc_codegen::selector::{select_function, Architecture, Generic64, GenericRisc};
use clc_mdlog::{FileSink, NullSink, Sink};
use clc_reader::{emit_module, parse_isa_file, parse_module};

#[derive(Clone, Copy, ValueEnum)]
enum ArchTag {
    Generic64,
    GenericRisc,
}

/// Lower a clc IR file to a target architecture and print the result to
/// stdout.
#[derive(Parser)]
struct Cli {
    /// Path to the textual IR file to select instructions for.
    ir_file: PathBuf,
    /// The target architecture module to lower against.
    #[arg(value_enum)]
    arch: ArchTag,
    /// Path to the ISA description file (spec §6).
    #[arg(long)]
    isa: PathBuf,
    /// Write a markdown diagnostics report to this directory.
    #[arg(long, value_name = "DIR")]
    md_report: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let isa_text = fs::read_to_string(&cli.isa).with_context(|| format!("reading ISA file `{}`", cli.isa.display()))?;
    let isa = parse_isa_file(&isa_text).with_context(|| format!("parsing ISA file `{}`", cli.isa.display()))?;

    let ir_text = fs::read_to_string(&cli.ir_file).with_context(|| format!("reading IR file `{}`", cli.ir_file.display()))?;
    let mut module = parse_module(&ir_text, isa.clone()).with_context(|| format!("parsing IR file `{}`", cli.ir_file.display()))?;

    let sink: Box<dyn Sink> = match &cli.md_report {
        Some(dir) => Box::new(FileSink::new(dir, "select")?),
        None => Box::new(NullSink),
    };

    let arch: Box<dyn Architecture> = match cli.arch {
        ArchTag::Generic64 => Box::new(Generic64),
        ArchTag::GenericRisc => Box::new(GenericRisc),
    };

    for func in module.functions_mut() {
        log::debug!("selecting function `{}` against `{}`", func.name, arch.name());
        select_function(func, &isa, arch.as_ref()).with_context(|| format!("selecting function `{}`", func.name))?;
        sink.report(&format!("function `{}`", func.name), &format!("selected against `{}`", arch.name()))?;
    }

    print!("{}", emit_module(&module));
    Ok(())
}
