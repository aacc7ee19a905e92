//! CLI front end for the instruction scheduler (spec §4.1/§6). Modeled on
//! `wasmtime-cli`'s `src/bin/wasmtime.rs`: a `clap`-derive `Args` struct,
//! typed errors inside the library crates, `anyhow` only at this boundary.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use clc_codegen::scheduler::{schedule_ebb, schedule_local, LatencyTable};
use clc_mdlog::{FileSink, NullSink, Sink};
use clc_reader::{emit_module, parse_isa_file, parse_latency_file, parse_module};

/// Schedule a clc IR file and print the result to stdout.
#[derive(Parser)]
struct Cli {
    /// Path to the textual IR file to schedule.
    ir_file: PathBuf,
    /// Path to the ISA description file (spec §6).
    #[arg(long)]
    isa: PathBuf,
    /// Path to the latency table file (spec §6).
    #[arg(long)]
    latency: PathBuf,
    /// Schedule along EBB paths with cross-block motion instead of one
    /// block at a time.
    #[arg(long)]
    ebb: bool,
    /// Write a markdown diagnostics report to this directory.
    #[arg(long, value_name = "DIR")]
    md_report: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let isa_text = fs::read_to_string(&cli.isa).with_context(|| format!("reading ISA file `{}`", cli.isa.display()))?;
    let isa = parse_isa_file(&isa_text).with_context(|| format!("parsing ISA file `{}`", cli.isa.display()))?;

    let latency_text =
        fs::read_to_string(&cli.latency).with_context(|| format!("reading latency file `{}`", cli.latency.display()))?;
    let mut latencies = LatencyTable::new();
    for (opcode, cycles) in parse_latency_file(&latency_text)
        .with_context(|| format!("parsing latency file `{}`", cli.latency.display()))?
    {
        latencies.insert(opcode, cycles);
    }

    let ir_text = fs::read_to_string(&cli.ir_file).with_context(|| format!("reading IR file `{}`", cli.ir_file.display()))?;
    let mut module = parse_module(&ir_text, isa.clone()).with_context(|| format!("parsing IR file `{}`", cli.ir_file.display()))?;

    let sink: Box<dyn Sink> = match &cli.md_report {
        Some(dir) => Box::new(FileSink::new(dir, "schedule")?),
        None => Box::new(NullSink),
    };

    for func in module.functions_mut() {
        log::debug!("scheduling function `{}`", func.name);
        if cli.ebb {
            schedule_ebb(func, &isa, &latencies).with_context(|| format!("scheduling function `{}`", func.name))?;
        } else {
            schedule_local(func, &isa, &latencies).with_context(|| format!("scheduling function `{}`", func.name))?;
        }
        sink.report(&format!("function `{}`", func.name), &format!("scheduled {} blocks", func.num_blocks()))?;
    }

    print!("{}", emit_module(&module));
    Ok(())
}
