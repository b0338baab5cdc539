//! CLI collaborator (`spec.md` §6: grammar/parser/emitter/loader/CLI are
//! "out of scope" for the evaluator core, specified only as contracts).
//! Grounded on the teacher's `cli.rs`/`cli/args.rs`: a `clap`-derived
//! argument struct, one subcommand per pipeline stage worth inspecting on
//! its own, dispatch through a `run()` free function, `termcolor` for
//! diagnostic output, errors rendered as `miette` reports rather than a
//! bare `Debug` dump.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::driver::InterpretOptions;
use crate::loader::FsLoader;
use crate::syntax::parser::PestParser;
use crate::syntax::Parser as ModlParser;
use crate::ModlError;

#[derive(Debug, Parser)]
#[command(
    name = "modl",
    version,
    about = "Evaluates MODL documents into a resolved JSON value tree."
)]
pub struct ModlArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse, lower, and interpret a document; print the result as JSON.
    Run {
        /// Path to the `.modl`/`.txt` source file.
        #[arg(required = true)]
        file: PathBuf,
        /// Override `*VERSION`'s expected value (default 1).
        #[arg(long)]
        version: Option<i64>,
        /// Override the import-restart cap (default 32).
        #[arg(long)]
        max_restarts: Option<u32>,
    },
    /// Print the concrete parse tree for a document, for debugging the
    /// grammar rather than the evaluator.
    Ast {
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Print the lowered raw value tree (pre-directive, pre-reference).
    Lower {
        #[arg(required = true)]
        file: PathBuf,
    },
    /// List the variable-method names registered by default.
    ListMethods,
}

/// The main entry point, invoked by `src/bin/modl.rs`.
pub fn run() {
    let args = ModlArgs::parse();
    let result = match &args.command {
        Command::Run { file, version, max_restarts } => handle_run(file, *version, *max_restarts),
        Command::Ast { file } => handle_ast(file),
        Command::Lower { file } => handle_lower(file),
        Command::ListMethods => handle_list_methods(),
    };

    if let Err(err) = result {
        print_error(&err);
        std::process::exit(1);
    }
}

fn read_source(path: &Path) -> Result<String, ModlError> {
    std::fs::read_to_string(path).map_err(|e| {
        crate::err_msg!(LoaderError, message: format!("failed to read `{}`: {e}", path.display()))
    })
}

fn handle_run(file: &Path, version: Option<i64>, max_restarts: Option<u32>) -> Result<(), ModlError> {
    let source = read_source(file)?;
    let parser = PestParser::new();
    let tree = parser.parse(&source)?;

    let base_dir = file.parent().map(PathBuf::from).unwrap_or_default();
    let mut options = InterpretOptions {
        loader: Arc::new(FsLoader::with_base_dir(base_dir)),
        ..InterpretOptions::default()
    };
    if let Some(v) = version {
        options.modl_version = v;
    }
    if let Some(m) = max_restarts {
        options.max_restarts = m;
    }

    let value = crate::driver::interpret(tree, &options)?;
    println!("{}", crate::emit::emit_json(&value));
    Ok(())
}

fn handle_ast(file: &Path) -> Result<(), ModlError> {
    let source = read_source(file)?;
    let tree = PestParser::new().parse(&source)?;
    println!("{tree:#?}");
    Ok(())
}

fn handle_lower(file: &Path) -> Result<(), ModlError> {
    let source = read_source(file)?;
    let tree = PestParser::new().parse(&source)?;
    let raw = crate::lower::lower(&tree)?;
    println!("{raw:#?}");
    Ok(())
}

fn handle_list_methods() -> Result<(), ModlError> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
    println!("Built-in variable methods:");
    let _ = stdout.reset();
    for name in ["t", "trim", "u", "upper"] {
        println!("  {name}");
    }
    Ok(())
}

fn print_error(err: &ModlError) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
    eprint!("error: ");
    let _ = stderr.reset();
    eprintln!("{err}");
}
