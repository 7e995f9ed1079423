//! minicc: an ahead-of-time compiler for a small C-like language.
//!
//! Compiler pipeline:
//!
//! ```text
//! source (.c) → Lexer → [Tokens] → Parser → [AST]
//!   → Lowerer → [IrModule] → (passes) → LLVM IR text
//! ```
//!
//! The compiler is a pure function of its input plus invocation flags: no
//! global state, no persistence. One compilation instantiates its own lexer,
//! parser, symbol environment, builder, and module.
//!
//! Language notes:
//! - `int` is the default scalar type; `float`/`double`/`char`/`bool` follow
//!   a fixed promotion policy (floats dominate, narrower integers
//!   sign-extend, `bool` zero-extends).
//! - `&&` and `||` evaluate both operands — there is no short-circuit.
//! - String literals become null-terminated global byte constants and
//!   evaluate to a pointer to their first byte.

pub mod cli;
pub mod codegen;
pub mod diagnostics;
pub mod error;
pub mod ir;
pub mod lower;
pub mod parser;
pub mod pass;

pub use error::Error;

/// Pipeline switches beyond plain compilation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Run the optimizer pipeline (mem2reg, simplifycfg, dce) after lowering.
    pub optimize: bool,
    /// Verify the whole module after lowering (and after optimization).
    pub verify: bool,
}

/// Compiles a source string through the full pipeline and returns the
/// module's LLVM IR text.
///
/// The pipeline aborts at the first error; a function that fails to lower or
/// verify leaves no partial IR in the module.
pub fn compile(source: &str, module_name: &str, options: Options) -> Result<String, Error> {
    use crate::parser::lexer::Lexer;
    use crate::parser::parse::Parser;
    use crate::pass::validate::verify_module;
    use crate::pass::{DcePass, Mem2RegPass, PassManager, SimplifyCfgPass};

    // 1. Lex + parse (tokens are pulled lazily by the parser).
    let program = Parser::new(Lexer::new(source)).parse_program()?;

    // 2. Lower. Each function is verified as it is built.
    let mut module = lower::lower(&program, module_name)?;

    // 3. Optimize on request.
    if options.optimize {
        let mut pm = PassManager::new();
        pm.add_pass(Mem2RegPass);
        pm.add_pass(SimplifyCfgPass);
        pm.add_pass(DcePass);
        pm.run(&mut module).map_err(|(_, e)| Error::Pass(e))?;
    }

    // 4. Verify on request.
    if options.verify {
        verify_module(&module)?;
    }

    // 5. Emit.
    Ok(codegen::emit_llvm_ir(&module)?)
}

/// Parses a source string and returns its AST pretty-printed, for `--ast`.
pub fn dump_ast(source: &str) -> Result<String, Error> {
    use crate::parser::lexer::Lexer;
    use crate::parser::parse::Parser;

    let program = Parser::new(Lexer::new(source)).parse_program()?;
    Ok(parser::print::emit_ast_text(&program)?)
}
