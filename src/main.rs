// Command-line front end for the translator. Reads the textual instruction stream
// from the given file, runs the translation sweep against the LLVM backend, prints
// the finished module's IR to stdout, and writes the textual IR and bitcode files
// next to the working directory. Per-instruction diagnostics go to stderr and turn
// the exit status non-zero; scope mismatches and malformed lines abort with an
// error. An unreadable input is reported but still translated as an empty unit, so
// the tool always leaves a well-formed (if trivial) module behind.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use inkwell::context::Context;

use lir2llvm::{LlvmBackend, Program, TranslateError, TranslationContext, Translator};

#[derive(Parser, Debug)]
#[command(name = "lir2llvm", about = "Translate a linear textual IR into an LLVM module")]
struct Args {
    /// Input file holding one instruction record per line.
    input: Option<PathBuf>,

    /// Id of the instruction whose value the entry function returns. Defaults
    /// to the last top-level instruction that produced a value.
    #[arg(long)]
    result_id: Option<usize>,

    /// Where to write the textual LLVM IR.
    #[arg(long, default_value = "out.ll")]
    dump: PathBuf,

    /// Where to write the bitcode.
    #[arg(long, default_value = "out.bc")]
    bitcode: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let input = match &args.input {
        Some(input) => input,
        None => {
            // Mirror plain `--help`: usage on stdout, successful exit.
            let _ = Args::command().print_help();
            return ExitCode::SUCCESS;
        }
    };

    let source = match fs::read_to_string(input) {
        Ok(source) => source,
        Err(err) => {
            // Still emit an empty module so downstream steps have something
            // to consume.
            eprintln!("cannot read {}: {err}", input.display());
            String::new()
        }
    };

    let module_name = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string());
    let mut ctx = TranslationContext::new(module_name);
    if let Some(id) = args.result_id {
        ctx = ctx.with_result_id(id);
    }

    match run(&source, &ctx, &args) {
        Ok(clean) => {
            if clean {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Parse, translate, and write the outputs. Returns whether the unit lowered
/// without diagnostics.
fn run(source: &str, ctx: &TranslationContext, args: &Args) -> Result<bool, TranslateError> {
    let program = Program::parse(source)?;
    log::info!("parsed {} instructions", program.len());
    log::debug!("{}", program.print());

    let context = Context::create();
    let backend = LlvmBackend::new(&context, &ctx.module_name);
    let translation = Translator::new(&program, ctx, backend).run()?;

    for diagnostic in &translation.diagnostics {
        eprintln!("warning: {diagnostic}");
    }

    let ir = translation.output.to_ir_string();
    println!("{ir}");
    if let Err(err) = fs::write(&args.dump, &ir) {
        eprintln!("cannot write {}: {err}", args.dump.display());
    }
    if let Err(err) = fs::write(&args.bitcode, translation.output.bitcode()) {
        eprintln!("cannot write {}: {err}", args.bitcode.display());
    }

    Ok(translation.diagnostics.is_empty())
}
