use std::process;

use minicc::cli::{parse_args, ParseArgsResult};
use minicc::diagnostics::render_error;
use minicc::{compile, dump_ast, Options};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    match parse_args(&args) {
        Ok(ParseArgsResult::Help) => {
            print!("{}", minicc::cli::help_text());
            process::exit(0);
        }
        Ok(ParseArgsResult::Interactive) => {
            run_interactive();
        }
        Ok(ParseArgsResult::Args(cli)) => {
            let source = std::fs::read_to_string(&cli.path).unwrap_or_else(|e| {
                eprintln!("error: cannot read '{}': {}", cli.path.display(), e);
                process::exit(2);
            });

            let module_name = cli
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("module");

            let result = if cli.ast {
                dump_ast(&source)
            } else {
                compile(
                    &source,
                    module_name,
                    Options {
                        optimize: cli.optimize,
                        verify: cli.verify,
                    },
                )
            };

            match result {
                Ok(output) => {
                    if let Some(out_path) = cli.output {
                        if let Err(e) = std::fs::write(&out_path, &output) {
                            eprintln!("error: cannot write '{}': {}", out_path.display(), e);
                            process::exit(1);
                        }
                    } else {
                        print!("{}", output);
                    }
                }
                Err(e) => {
                    eprintln!("{}", render_error(&e));
                    process::exit(1);
                }
            }
        }
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!("{}", minicc::cli::help_text());
            process::exit(2);
        }
    }
}

/// Reads top-level declarations from stdin, lowering each into a persistent
/// module and printing its IR immediately. `exit` or `quit` ends the session
/// and dumps the full module.
fn run_interactive() {
    use std::io::{BufRead, Write};

    use minicc::codegen::emit_function_text;
    use minicc::lower::LowerCtx;
    use minicc::parser::lexer::Lexer;
    use minicc::parser::parse::Parser;

    let mut ctx = LowerCtx::new("interactive");
    eprintln!("minicc interactive mode  (type a declaration; 'exit' to finish)");
    let stdin = std::io::stdin();
    let mut pending = String::new();
    loop {
        if pending.is_empty() {
            eprint!(">> ");
        } else {
            eprint!(".. ");
        }
        let _ = std::io::stderr().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break, // EOF
            Ok(_) => {}
        }
        let trimmed = line.trim();
        if pending.is_empty() && (trimmed == "exit" || trimmed == "quit") {
            break;
        }
        if pending.is_empty() && trimmed.is_empty() {
            continue;
        }
        pending.push_str(&line);

        // Keep accumulating until the buffered text parses; an unexpected
        // end-of-file just means the declaration is not finished yet.
        let decls = {
            let mut parser = Parser::new(Lexer::new(&pending));
            let mut decls = Vec::new();
            let mut err = None;
            loop {
                match parser.at_eof() {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) => {
                        err = Some(e);
                        break;
                    }
                }
                match parser.parse_decl() {
                    Ok(decl) => decls.push(decl),
                    Err(e) => {
                        err = Some(e);
                        break;
                    }
                }
            }
            match err {
                None => Ok(decls),
                Some(e) => Err(e),
            }
        };

        match decls {
            Err(e) => {
                if matches!(e, minicc::Error::Parse(minicc::error::ParseError::UnexpectedEof { .. }))
                {
                    continue; // more input needed
                }
                eprintln!("{}", render_error(&e));
                pending.clear();
            }
            Ok(decls) => {
                pending.clear();
                for decl in decls {
                    match ctx.lower_decl(&decl) {
                        Ok(Some(id)) => {
                            if let Some(func) = ctx.module().function(id) {
                                match emit_function_text(ctx.module(), func) {
                                    Ok(text) => print!("{}", text),
                                    Err(e) => eprintln!("{}", render_error(&e.into())),
                                }
                            }
                        }
                        Ok(None) => {} // extern declaration, nothing to print
                        Err(e) => eprintln!("{}", render_error(&e)),
                    }
                }
            }
        }
    }

    println!("; full module");
    match minicc::codegen::emit_llvm_ir(ctx.module()) {
        Ok(text) => print!("{}", text),
        Err(e) => eprintln!("{}", render_error(&e.into())),
    }
}
