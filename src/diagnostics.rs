//! Error rendering.
//!
//! Every user-visible failure is a single line:
//! `error: <message> at line L, column C`
//! (the position suffix is omitted for errors that carry none, such as I/O
//! and verification failures).

use crate::error::{Error, LexError, LowerError, ParseError};
use crate::parser::lexer::Pos;

/// Extracts the source position from errors that carry one.
pub fn error_pos(err: &Error) -> Option<Pos> {
    match err {
        Error::Lex(e) => Some(match e {
            LexError::UnexpectedChar { pos, .. }
            | LexError::UnterminatedString { pos }
            | LexError::UnterminatedChar { pos }
            | LexError::UnterminatedComment { pos }
            | LexError::InvalidEscape { pos, .. }
            | LexError::InvalidLiteral { pos, .. } => *pos,
        }),
        Error::Parse(e) => Some(match e {
            ParseError::UnexpectedToken { pos, .. } | ParseError::UnexpectedEof { pos, .. } => *pos,
        }),
        Error::Lower(e) => Some(match e {
            LowerError::UnknownVariable { pos, .. }
            | LowerError::UnknownFunction { pos, .. }
            | LowerError::DuplicateFunction { pos, .. }
            | LowerError::ArityMismatch { pos, .. }
            | LowerError::BreakOutsideLoop { pos }
            | LowerError::ContinueOutsideLoop { pos }
            | LowerError::InvalidAssignTarget { pos, .. }
            | LowerError::ReturnValueInVoid { pos }
            | LowerError::MissingReturnValue { pos, .. }
            | LowerError::VoidValue { pos }
            | LowerError::VoidParam { pos, .. }
            | LowerError::VoidVariable { pos, .. }
            | LowerError::InvalidOperand { pos, .. }
            | LowerError::InvalidConversion { pos, .. }
            | LowerError::NotIndexable { pos, .. } => *pos,
        }),
        Error::Pass(_) | Error::Codegen(_) | Error::Io(_) => None,
    }
}

/// Renders the single-line diagnostic for `err`.
pub fn render_error(err: &Error) -> String {
    match error_pos(err) {
        Some(pos) => format!("error: {} at {}", err, pos),
        None => format!("error: {}", err),
    }
}
