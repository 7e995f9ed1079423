//! CLI argument parsing, exported from the library so integration tests can
//! exercise it.

use std::path::PathBuf;

/// Fully-parsed CLI arguments for a compilation request.
#[derive(Debug, Clone)]
pub struct CliArgs {
    pub path: PathBuf,
    /// Write output to this file instead of stdout.
    pub output: Option<PathBuf>,
    /// Run the optimizer pipeline after lowering (`-O`).
    pub optimize: bool,
    /// Verify the whole module after lowering (`-v`).
    pub verify: bool,
    /// Print the AST and skip lowering (`--ast`).
    pub ast: bool,
}

/// Result of `parse_args`.
#[derive(Debug)]
pub enum ParseArgsResult {
    /// Normal compilation request.
    Args(CliArgs),
    /// `--help` was present; caller should print usage and exit 0.
    Help,
    /// `-i` / `--interactive` was present; caller should run the line loop.
    Interactive,
}

/// Parses command-line arguments (the full `std::env::args()` slice
/// including `argv[0]`).
pub fn parse_args(args: &[String]) -> Result<ParseArgsResult, String> {
    let mut path: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut optimize = false;
    let mut verify = false;
    let mut ast = false;
    let mut i = 1usize;

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => return Ok(ParseArgsResult::Help),
            "--interactive" | "-i" => return Ok(ParseArgsResult::Interactive),
            "-o" => {
                i += 1;
                let file = args
                    .get(i)
                    .ok_or_else(|| "-o requires an argument".to_owned())?;
                output = Some(PathBuf::from(file));
            }
            "-O" => optimize = true,
            "-v" => verify = true,
            "--ast" => ast = true,
            arg if !arg.starts_with('-') => {
                if path.is_some() {
                    return Err(format!("unexpected extra input file: '{}'", arg));
                }
                path = Some(PathBuf::from(arg));
            }
            other => return Err(format!("unknown argument: '{}'", other)),
        }
        i += 1;
    }

    let path = path.ok_or_else(|| "no input file specified".to_owned())?;
    Ok(ParseArgsResult::Args(CliArgs {
        path,
        output,
        optimize,
        verify,
        ast,
    }))
}

/// Returns the usage/help text for the CLI.
pub fn help_text() -> &'static str {
    "minicc — compiler for a small C-like language, emitting LLVM IR\n\
     Usage: minicc [options] <file.c>\n\
     \n\
     Options:\n\
       -o <file>          Write IR text to <file> instead of stdout\n\
       -O                 Run the optimizer (mem2reg, simplifycfg, dce)\n\
       -v                 Verify the module after lowering\n\
       --ast              Print the AST and skip lowering\n\
       -i, --interactive  Read declarations from stdin, printing IR per declaration\n\
       -h, --help         Print this help and exit\n\
     \n\
     Notes:\n\
       '&&' and '||' evaluate both operands (no short-circuit).\n"
}
