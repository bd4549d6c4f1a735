use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use javelin::config::CompilerOptions;
use javelin::diagnostics::{CompileError, render_diagnostic, render_error};

#[derive(Parser)]
#[command(name = "javelinc", version, about = "Lower for-each loops to stack-machine code")]
struct Cli {
    /// Compiler options file (defaults to javelin.toml next to the input)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the code listing and diagnostics of each method
    Lower {
        /// Compilation unit (JSON)
        file: PathBuf,
        /// Only lower the method with this name
        #[arg(long)]
        method: Option<String>,
    },
    /// Report diagnostics only; exits with 1 when there are errors
    Check {
        /// Compilation unit (JSON)
        file: PathBuf,
    },
    /// Pretty-print the methods of a unit
    Print {
        /// Compilation unit (JSON)
        file: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("JAVELIN_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (file, result) = match &cli.command {
        Commands::Lower { file, method } => (file, lower(file, cli.config.as_deref(), method.as_deref())),
        Commands::Check { file } => (file, check(file, cli.config.as_deref())),
        Commands::Print { file } => (file, print(file)),
    };
    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprint!("{}", render_error(None, &file.to_string_lossy(), &err));
            std::process::exit(1);
        }
    }
}

fn options_for(file: &Path, config: Option<&Path>) -> Result<CompilerOptions, CompileError> {
    match config {
        Some(path) => CompilerOptions::load(path),
        None => CompilerOptions::discover(file),
    }
}

/// Returns whether the unit lowered without a fatal error.
fn lower(file: &Path, config: Option<&Path>, only: Option<&str>) -> Result<bool, CompileError> {
    let options = options_for(file, config)?;
    let mut unit = javelin::load_unit(file)?;
    if let Some(name) = only {
        unit.methods.retain(|m| m.node.name.node == name);
        if unit.methods.is_empty() {
            eprintln!("error: no method named '{name}' in {}", file.display());
            return Ok(false);
        }
    }
    let source = unit.source.clone();
    let filename = file.to_string_lossy();
    let lowered = javelin::lower_unit(&mut unit, &options)?;
    for (i, method) in lowered.iter().enumerate() {
        if i > 0 {
            println!();
        }
        for diag in &method.diagnostics {
            eprint!("{}", render_diagnostic(source.as_deref(), &filename, diag));
        }
        match &method.code {
            Some(code) => print!("{code}"),
            None => println!("{}: not lowered", method.name),
        }
    }
    Ok(true)
}

/// Returns whether the unit is free of errors.
fn check(file: &Path, config: Option<&Path>) -> Result<bool, CompileError> {
    let options = options_for(file, config)?;
    let mut unit = javelin::load_unit(file)?;
    let source = unit.source.clone();
    let filename = file.to_string_lossy();
    let lowered = javelin::lower_unit(&mut unit, &options)?;
    let mut errors = 0;
    for method in &lowered {
        for diag in &method.diagnostics {
            print!("{}", render_diagnostic(source.as_deref(), &filename, diag));
        }
        errors += usize::from(method.has_errors());
    }
    if errors > 0 {
        eprintln!("{errors} method(s) with errors");
    }
    Ok(errors == 0)
}

fn print(file: &Path) -> Result<bool, CompileError> {
    let unit = javelin::load_unit(file)?;
    println!("{}", javelin::pretty::print_unit(&unit));
    Ok(true)
}
