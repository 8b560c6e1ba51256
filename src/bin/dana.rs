//! The `dana` binary: REPL and file-execution front end over
//! `dana::run_source` (spec.md §6 "CLI surface").

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dana::context::SandboxContext;
use dana::error::DanaError;
use dana::interpreter::Interpreter;
use dana::registry::Registries;

/// Run a DANA program, or start a REPL when no file is given.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// A `.na` source file to execute. Omit to start the REPL.
    #[arg(index = 1)]
    file: Option<PathBuf>,

    /// Enable DEBUG-level logging.
    #[arg(long)]
    debug: bool,

    /// Disable ANSI colors in log output.
    #[arg(long, conflicts_with = "force_color")]
    no_color: bool,

    /// Force ANSI colors even when stdout isn't a terminal.
    #[arg(long)]
    force_color: bool,
}

// Exit codes per spec.md §6: 0 success, 1 user error, 2 usage error (clap's
// own default for bad flags), 130 interrupted (the shell's SIGINT
// convention — left to the default signal disposition, since nothing here
// installs a handler).
const EXIT_OK: u8 = 0;
const EXIT_USER_ERROR: u8 = 1;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let colors = !cli.no_color || cli.force_color;
    dana::logging::init_logging(cli.debug, colors);

    match &cli.file {
        Some(path) => run_file(path),
        None => run_repl(),
    }
}

fn run_file(path: &PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("dana: cannot read '{}': {e}", path.display());
            return ExitCode::from(EXIT_USER_ERROR);
        }
    };

    let search_path = path.parent().map(|p| vec![p.to_path_buf()]).unwrap_or_default();
    let registries = Registries::new();
    let ctx = SandboxContext::with_search_path(registries, search_path);
    let mut interp = Interpreter::new(ctx);

    match run_program_source(&mut interp, &source) {
        Ok(_) => ExitCode::from(EXIT_OK),
        Err(e) => {
            report(&e);
            ExitCode::from(EXIT_USER_ERROR)
        }
    }
}

fn run_repl() -> ExitCode {
    let registries = Registries::new();
    let ctx = SandboxContext::new(registries);
    let mut interp = Interpreter::new(ctx);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!(">>> ");
        let _ = io::stdout().flush();

        let mut buffer = String::new();
        let Some(first) = next_line(&mut lines) else {
            println!();
            return ExitCode::from(EXIT_OK);
        };
        if first.trim().is_empty() {
            continue;
        }
        buffer.push_str(&first);
        buffer.push('\n');

        // A trailing colon or indented continuation keeps reading lines
        // (`... `) until a blank line ends the block, mirroring how a
        // Python-style REPL distinguishes a one-liner from `if`/`def`/etc.
        while buffer.trim_end().ends_with(':') || needs_continuation(&buffer) {
            print!("... ");
            let _ = io::stdout().flush();
            match next_line(&mut lines) {
                Some(line) if !line.trim().is_empty() => {
                    buffer.push_str(&line);
                    buffer.push('\n');
                }
                _ => break,
            }
        }

        match run_program_source(&mut interp, &buffer) {
            Ok(value) => {
                if !matches!(value, dana::types::Value::None) {
                    println!("{value}");
                }
            }
            Err(e) => report(&e),
        }
    }
}

fn next_line(lines: &mut std::io::Lines<io::StdinLock<'_>>) -> Option<String> {
    match lines.next()? {
        Ok(line) => Some(line),
        Err(_) => None,
    }
}

fn needs_continuation(buffer: &str) -> bool {
    buffer.lines().last().map(|l| l.starts_with(' ') || l.starts_with('\t')).unwrap_or(false)
}

fn run_program_source(interp: &mut Interpreter, source: &str) -> Result<dana::types::Value, DanaError> {
    let tokens = dana::lexer::Lexer::new(source)
        .lex()
        .map_err(|e| DanaError::Exception(dana::error::DanaException::syntax(e.message, dana::error::Location::new(e.position.0, e.position.1, ""))))?;
    let program = dana::parser::parse(tokens, source)?;
    interp.run_program(&program)
}

fn report(e: &DanaError) {
    eprintln!("{e}");
}
