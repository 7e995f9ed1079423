use thiserror::Error;

use crate::parser::lexer::Pos;

/// Top-level error type for the compiler pipeline.
///
/// Every stage reports through one of the variants below; the driver is the
/// only place that prints. Rendering (including the source position suffix)
/// lives in [`crate::diagnostics`].
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Lower(#[from] LowerError),

    #[error(transparent)]
    Pass(#[from] PassError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Lex errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum LexError {
    #[error("unexpected character '{ch}'")]
    UnexpectedChar { ch: char, pos: Pos },

    #[error("unterminated string literal")]
    UnterminatedString { pos: Pos },

    #[error("unterminated character literal")]
    UnterminatedChar { pos: Pos },

    #[error("unterminated block comment")]
    UnterminatedComment { pos: Pos },

    #[error("invalid escape sequence '\\{ch}'")]
    InvalidEscape { ch: char, pos: Pos },

    #[error("invalid numeric literal '{text}'")]
    InvalidLiteral { text: String, pos: Pos },
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("expected {expected}, found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        pos: Pos,
    },

    #[error("unexpected end of file while parsing {context}")]
    UnexpectedEof { context: String, pos: Pos },
}

// ---------------------------------------------------------------------------
// Lowering errors (resolution + arity/type)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum LowerError {
    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String, pos: Pos },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String, pos: Pos },

    #[error("function '{name}' already declared")]
    DuplicateFunction { name: String, pos: Pos },

    #[error("function '{name}' expects {expected} argument(s), {found} given")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        pos: Pos,
    },

    #[error("'break' outside of a loop")]
    BreakOutsideLoop { pos: Pos },

    #[error("'continue' outside of a loop")]
    ContinueOutsideLoop { pos: Pos },

    #[error("operand of '{op}' must be a variable name")]
    InvalidAssignTarget { op: String, pos: Pos },

    #[error("return with a value in a function returning void")]
    ReturnValueInVoid { pos: Pos },

    #[error("return without a value in a function returning '{expected}'")]
    MissingReturnValue { expected: String, pos: Pos },

    #[error("void value used where a value is required")]
    VoidValue { pos: Pos },

    #[error("parameter '{name}' may not have type 'void'")]
    VoidParam { name: String, pos: Pos },

    #[error("variable '{name}' may not have type 'void'")]
    VoidVariable { name: String, pos: Pos },

    #[error("operator '{op}' cannot be applied to operand of type '{ty}'")]
    InvalidOperand { op: String, ty: String, pos: Pos },

    #[error("cannot convert value of type '{from}' to '{to}'")]
    InvalidConversion { from: String, to: String, pos: Pos },

    #[error("'{name}' is not indexable")]
    NotIndexable { name: String, pos: Pos },
}

// ---------------------------------------------------------------------------
// Pass / verification errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum PassError {
    #[error("block '{block}' in function '{func}' has no terminator")]
    MissingTerminator { func: String, block: String },

    #[error("block '{block}' in function '{func}' has an instruction after its terminator")]
    InstrAfterTerminator { func: String, block: String },

    #[error("verification failed in function '{func}': value {value} used before definition")]
    UseBeforeDef { func: String, value: String },

    #[error("verification failed in function '{func}': value {value} defined more than once")]
    MultipleDefinition { func: String, value: String },

    #[error("stack allocation outside the entry block in function '{func}'")]
    AllocaOutsideEntry { func: String },

    #[error("type error in function '{func}': {detail}")]
    TypeError { func: String, detail: String },
}

// ---------------------------------------------------------------------------
// Codegen errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("unsupported IR construct: {detail}")]
    Unsupported { detail: String },
}

impl From<std::fmt::Error> for CodegenError {
    fn from(e: std::fmt::Error) -> Self {
        CodegenError::Unsupported {
            detail: e.to_string(),
        }
    }
}
