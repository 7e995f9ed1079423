//! Lazy lexer for the C-like source language.
//!
//! Tokens are produced on demand: the parser pulls them one at a time through
//! [`Lexer::peek`] / [`Lexer::next`] with a single token of lookahead buffered
//! inside the lexer. Only the ASCII subset is lexically meaningful; any other
//! byte outside a string, character literal, or comment is a fatal error.

use crate::error::LexError;

/// A 1-based (line, column) source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Int,
    Float,
    Double,
    Char,
    Void,
    Bool,
    If,
    Else,
    While,
    For,
    Return,
    Break,
    Continue,
    Extern,
    True,
    False,

    // Literals
    Ident(String),
    IntLit(i64),
    FloatLit(f64),
    StrLit(Vec<u8>),
    CharLit(u8),

    // Punctuation
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
    Comma,    // ,
    Semi,     // ;

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Assign,     // =
    Lt,         // <
    Gt,         // >
    Bang,       // !
    Tilde,      // ~
    Amp,        // &
    Pipe,       // |
    Caret,      // ^
    EqEq,       // ==
    NotEq,      // !=
    LtEq,       // <=
    GtEq,       // >=
    AmpAmp,     // &&
    PipePipe,   // ||
    Shl,        // <<
    Shr,        // >>
    PlusPlus,   // ++
    MinusMinus, // --

    Eof,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Int => write!(f, "int"),
            Token::Float => write!(f, "float"),
            Token::Double => write!(f, "double"),
            Token::Char => write!(f, "char"),
            Token::Void => write!(f, "void"),
            Token::Bool => write!(f, "bool"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::For => write!(f, "for"),
            Token::Return => write!(f, "return"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::Extern => write!(f, "extern"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Ident(s) => write!(f, "{}", s),
            Token::IntLit(n) => write!(f, "{}", n),
            Token::FloatLit(x) => write!(f, "{}", x),
            Token::StrLit(bytes) => write!(f, "\"{}\"", String::from_utf8_lossy(bytes)),
            Token::CharLit(b) => write!(f, "'{}'", *b as char),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Semi => write!(f, ";"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Assign => write!(f, "="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Bang => write!(f, "!"),
            Token::Tilde => write!(f, "~"),
            Token::Amp => write!(f, "&"),
            Token::Pipe => write!(f, "|"),
            Token::Caret => write!(f, "^"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::AmpAmp => write!(f, "&&"),
            Token::PipePipe => write!(f, "||"),
            Token::Shl => write!(f, "<<"),
            Token::Shr => write!(f, ">>"),
            Token::PlusPlus => write!(f, "++"),
            Token::MinusMinus => write!(f, "--"),
            Token::Eof => write!(f, "<eof>"),
        }
    }
}

/// A token together with the position of its first byte.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub tok: Token,
    pub pos: Pos,
}

pub struct Lexer<'src> {
    src: &'src [u8],
    pos: usize,
    line: u32,
    col: u32,
    /// The scanned-but-unconsumed token, filled on demand.
    lookahead: Option<Spanned>,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
            lookahead: None,
        }
    }

    /// Returns the current token without consuming it.
    pub fn peek(&mut self) -> Result<&Token, LexError> {
        self.fill()?;
        Ok(&self.lookahead.as_ref().unwrap().tok)
    }

    /// Returns the current token and advances past it.
    pub fn next(&mut self) -> Result<Spanned, LexError> {
        self.fill()?;
        Ok(self.lookahead.take().unwrap())
    }

    /// Returns the (line, column) of the current token.
    pub fn position(&mut self) -> Result<Pos, LexError> {
        self.fill()?;
        Ok(self.lookahead.as_ref().unwrap().pos)
    }

    /// Drains the remaining input into a flat token list. Used by tests and
    /// anything that prefers an eager stream.
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next()?;
            let done = spanned.tok == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn fill(&mut self) -> Result<(), LexError> {
        if self.lookahead.is_none() {
            let spanned = self.scan_token()?;
            self.lookahead = Some(spanned);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Byte-level scanning
    // -----------------------------------------------------------------------

    fn peek_byte(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_byte2(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> u8 {
        let b = self.src[self.pos];
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        b
    }

    fn here(&self) -> Pos {
        Pos::new(self.line, self.col)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            while matches!(self.peek_byte(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
                self.bump();
            }
            match (self.peek_byte(), self.peek_byte2()) {
                (Some(b'/'), Some(b'/')) => {
                    while self.peek_byte().map_or(false, |b| b != b'\n') {
                        self.bump();
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    let start = self.here();
                    self.bump();
                    self.bump();
                    // Block comments do not nest; the first `*/` closes.
                    loop {
                        match (self.peek_byte(), self.peek_byte2()) {
                            (Some(b'*'), Some(b'/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => {
                                return Err(LexError::UnterminatedComment { pos: start })
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_token(&mut self) -> Result<Spanned, LexError> {
        self.skip_whitespace_and_comments()?;
        let start = self.here();

        let b = match self.peek_byte() {
            Some(b) => b,
            None => {
                return Ok(Spanned {
                    tok: Token::Eof,
                    pos: start,
                })
            }
        };

        // Maximal munch: two-byte operators before their one-byte prefixes.
        let two = match (b, self.peek_byte2()) {
            (b'=', Some(b'=')) => Some(Token::EqEq),
            (b'!', Some(b'=')) => Some(Token::NotEq),
            (b'<', Some(b'=')) => Some(Token::LtEq),
            (b'>', Some(b'=')) => Some(Token::GtEq),
            (b'&', Some(b'&')) => Some(Token::AmpAmp),
            (b'|', Some(b'|')) => Some(Token::PipePipe),
            (b'<', Some(b'<')) => Some(Token::Shl),
            (b'>', Some(b'>')) => Some(Token::Shr),
            (b'+', Some(b'+')) => Some(Token::PlusPlus),
            (b'-', Some(b'-')) => Some(Token::MinusMinus),
            _ => None,
        };
        if let Some(tok) = two {
            self.bump();
            self.bump();
            return Ok(Spanned { tok, pos: start });
        }

        let one = match b {
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b'{' => Some(Token::LBrace),
            b'}' => Some(Token::RBrace),
            b'[' => Some(Token::LBracket),
            b']' => Some(Token::RBracket),
            b',' => Some(Token::Comma),
            b';' => Some(Token::Semi),
            b'+' => Some(Token::Plus),
            b'-' => Some(Token::Minus),
            b'*' => Some(Token::Star),
            b'/' => Some(Token::Slash),
            b'%' => Some(Token::Percent),
            b'=' => Some(Token::Assign),
            b'<' => Some(Token::Lt),
            b'>' => Some(Token::Gt),
            b'!' => Some(Token::Bang),
            b'~' => Some(Token::Tilde),
            b'&' => Some(Token::Amp),
            b'|' => Some(Token::Pipe),
            b'^' => Some(Token::Caret),
            _ => None,
        };
        if let Some(tok) = one {
            self.bump();
            return Ok(Spanned { tok, pos: start });
        }

        if b == b'"' {
            return self.scan_string(start);
        }
        if b == b'\'' {
            return self.scan_char(start);
        }
        if b.is_ascii_digit() {
            return self.scan_number(start);
        }
        if b.is_ascii_alphabetic() || b == b'_' {
            return Ok(self.scan_ident_or_keyword(start));
        }

        Err(LexError::UnexpectedChar {
            ch: b as char,
            pos: start,
        })
    }

    fn scan_escape(&mut self, start: Pos) -> Result<u8, LexError> {
        self.bump(); // consume the backslash
        match self.peek_byte() {
            Some(b'n') => {
                self.bump();
                Ok(b'\n')
            }
            Some(b't') => {
                self.bump();
                Ok(b'\t')
            }
            Some(b'\\') => {
                self.bump();
                Ok(b'\\')
            }
            Some(b'"') => {
                self.bump();
                Ok(b'"')
            }
            Some(b'\'') => {
                self.bump();
                Ok(b'\'')
            }
            Some(other) => Err(LexError::InvalidEscape {
                ch: other as char,
                pos: self.here(),
            }),
            None => Err(LexError::UnterminatedString { pos: start }),
        }
    }

    fn scan_string(&mut self, start: Pos) -> Result<Spanned, LexError> {
        self.bump(); // opening quote
        let mut bytes = Vec::new();
        loop {
            match self.peek_byte() {
                None | Some(b'\n') => return Err(LexError::UnterminatedString { pos: start }),
                Some(b'"') => {
                    self.bump();
                    return Ok(Spanned {
                        tok: Token::StrLit(bytes),
                        pos: start,
                    });
                }
                Some(b'\\') => bytes.push(self.scan_escape(start)?),
                Some(b) => {
                    self.bump();
                    bytes.push(b);
                }
            }
        }
    }

    fn scan_char(&mut self, start: Pos) -> Result<Spanned, LexError> {
        self.bump(); // opening quote
        let value = match self.peek_byte() {
            None | Some(b'\n') | Some(b'\'') => {
                return Err(LexError::UnterminatedChar { pos: start })
            }
            Some(b'\\') => self.scan_escape(start)?,
            Some(b) => {
                self.bump();
                b
            }
        };
        match self.peek_byte() {
            Some(b'\'') => {
                self.bump();
                Ok(Spanned {
                    tok: Token::CharLit(value),
                    pos: start,
                })
            }
            _ => Err(LexError::UnterminatedChar { pos: start }),
        }
    }

    fn scan_number(&mut self, start: Pos) -> Result<Spanned, LexError> {
        let digits_start = self.pos;
        while self.peek_byte().map_or(false, |b| b.is_ascii_digit()) {
            self.bump();
        }
        // `12.5` is one float token; `12.` or `12.foo` leaves the dot behind.
        let is_float =
            self.peek_byte() == Some(b'.') && self.peek_byte2().map_or(false, |b| b.is_ascii_digit());
        if is_float {
            self.bump(); // consume '.'
            while self.peek_byte().map_or(false, |b| b.is_ascii_digit()) {
                self.bump();
            }
            let text = std::str::from_utf8(&self.src[digits_start..self.pos]).unwrap_or("");
            let value: f64 = text.parse().map_err(|_| LexError::InvalidLiteral {
                text: text.to_owned(),
                pos: start,
            })?;
            Ok(Spanned {
                tok: Token::FloatLit(value),
                pos: start,
            })
        } else {
            let text = std::str::from_utf8(&self.src[digits_start..self.pos]).unwrap_or("");
            let value: i64 = text.parse().map_err(|_| LexError::InvalidLiteral {
                text: text.to_owned(),
                pos: start,
            })?;
            Ok(Spanned {
                tok: Token::IntLit(value),
                pos: start,
            })
        }
    }

    fn scan_ident_or_keyword(&mut self, start: Pos) -> Spanned {
        let ident_start = self.pos;
        while self
            .peek_byte()
            .map_or(false, |b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.bump();
        }
        let text = std::str::from_utf8(&self.src[ident_start..self.pos]).unwrap_or("");
        let tok = match text {
            "int" => Token::Int,
            "float" => Token::Float,
            "double" => Token::Double,
            "char" => Token::Char,
            "void" => Token::Void,
            "bool" => Token::Bool,
            "if" => Token::If,
            "else" => Token::Else,
            "while" => Token::While,
            "for" => Token::For,
            "return" => Token::Return,
            "break" => Token::Break,
            "continue" => Token::Continue,
            "extern" => Token::Extern,
            "true" => Token::True,
            "false" => Token::False,
            _ => Token::Ident(text.to_owned()),
        };
        Spanned { tok, pos: start }
    }
}
