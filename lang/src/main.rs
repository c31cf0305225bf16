#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use miette::IntoDiagnostic;

use lang_diag::Errors;

mod toolchain;

#[derive(Parser, Debug)]
#[command(name = "lang", version, about = "Compiler for the L language")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compile a source file, assemble it with gcc and run the result
    Run {
        /// Input source file
        file: PathBuf,

        /// Write the generated assembly to <file>.S and stop
        #[arg(short = 'S')]
        assembly: bool,
    },
}

fn main() -> miette::Result<()> {
    match Cli::parse().cmd {
        None => {
            Cli::command().print_help().into_diagnostic()?;
            Ok(())
        }
        Some(Cmd::Run { file, assembly }) => run(&file, assembly),
    }
}

fn run(file: &Path, assembly: bool) -> miette::Result<()> {
    let src = fs::read_to_string(file).into_diagnostic()?;
    let filename = file.display().to_string();

    let (block, _comments, errs) = lang_parse::parse(&src, &filename);
    bail_on(&errs);

    let (info, errs) = lang_types::check(&block, &filename);
    bail_on(&errs);

    let frame = lang_ir::translate(&block, &info, &[lang_ir::loads]);
    let asm = lang_backend_x86::emit(&filename, &frame);

    if assembly {
        fs::write(format!("{filename}.S"), asm).into_diagnostic()?;
        return Ok(());
    }

    let status = toolchain::assemble_and_run(&asm)?;
    if !status.success() {
        return Err(miette::miette!("program exited with {status}"));
    }
    Ok(())
}

/// Source-level errors keep their one-line-per-error format on stderr instead
/// of going through the report handler.
fn bail_on(errs: &Errors) {
    if !errs.is_empty() {
        eprintln!("{errs}");
        std::process::exit(1);
    }
}
