//! CLI front end for the SSA register allocator (spec §4.3/§6).

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use clc_codegen::regalloc::{allocate_function, Variant};
use clc_mdlog::{FileSink, NullSink, Sink};
use clc_reader::{emit_module, parse_isa_file, parse_module};

#[derive(Clone, Copy, ValueEnum)]
enum VariantTag {
    TopDown,
    BottomUp,
}

/// Allocate hardware registers for a clc IR file and print the result to
/// stdout.
#[derive(Parser)]
struct Cli {
    /// Path to the textual IR file to allocate.
    ir_file: PathBuf,
    /// Number of hardware registers available.
    k: usize,
    /// Path to the ISA description file (spec §6).
    #[arg(long)]
    isa: PathBuf,
    /// Name of the ISA-reserved stack pointer register.
    #[arg(long, default_value = "sp")]
    sp: String,
    /// Which coloring strategy to run for multi-block functions (a
    /// single-block function always uses the local variant; see §4.3).
    #[arg(long, value_enum, default_value = "top-down")]
    variant: VariantTag,
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
        Some(dir) => Box::new(FileSink::new(dir, "regalloc")?),
        None => Box::new(NullSink),
    };

    for func in module.functions_mut() {
        let is_single_block = func.num_blocks() == 1;
        let variant = match cli.variant {
            VariantTag::TopDown => Variant::TopDown,
            VariantTag::BottomUp => Variant::BottomUp,
        };
        log::debug!("allocating function `{}` with k={}", func.name, cli.k);
        allocate_function(func, &isa, &cli.sp, cli.k, variant).with_context(|| format!("allocating function `{}`", func.name))?;
        sink.report(
            &format!("function `{}`", func.name),
            &format!("allocated with k={} ({})", cli.k, if is_single_block { "local" } else { "graph coloring" }),
        )?;
    }

    print!("{}", emit_module(&module));
    Ok(())
}
