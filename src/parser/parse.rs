//! Handwritten recursive-descent parser.
//!
//! Binary expressions use precedence climbing over a single table; everything
//! else is plain recursive descent with one token of lookahead pulled lazily
//! from the lexer. The first unexpected token aborts the parse — there is no
//! multi-error recovery.
//!
//! Grammar (informal):
//! ```text
//! program     := decl*
//! decl        := func_def | extern_decl
//! extern_decl := "extern" type IDENT "(" param_list ")" ";"
//! func_def    := type IDENT "(" param_list ")" block
//! param_list  := (type IDENT ("," type IDENT)*)?
//! type        := "int" | "float" | "double" | "char" | "void" | "bool"
//! block       := "{" stmt* "}"
//! stmt        := var_decl | if | while | for | return | break | continue
//!              | block | expr ";"
//! var_decl    := type IDENT ("=" expr)? ";"
//! for         := "for" "(" (var_decl | expr? ";") expr? ";" expr? ")" stmt
//! expr        := binary ("=" expr)?      -- "=" only after a bare name
//! binary      := unary (BINOP binary)*   -- precedence climbing
//! unary       := ("-" | "+" | "!" | "~" | "++" | "--") unary | postfix
//! postfix     := primary ("(" args ")" | "[" expr "]" | "++" | "--")*
//! primary     := LITERAL | IDENT | "(" expr ")"
//! ```

use crate::error::{Error, ParseError};
use crate::parser::ast::{BinOp, CType, Decl, Expr, Ident, Param, Program, Stmt, UnaryOp};
use crate::parser::lexer::{Lexer, Pos, Token};

pub struct Parser<'src> {
    lexer: Lexer<'src>,
}

/// Binary operator precedence, low to high. Assignment (level 1) is handled
/// separately in [`Parser::parse_expr`] because its left side is restricted
/// to a bare name.
fn bin_prec(tok: &Token) -> Option<(BinOp, u8)> {
    let entry = match tok {
        Token::PipePipe => (BinOp::Or, 2),
        Token::AmpAmp => (BinOp::And, 3),
        Token::Pipe => (BinOp::BitOr, 4),
        Token::Caret => (BinOp::BitXor, 5),
        Token::Amp => (BinOp::BitAnd, 6),
        Token::EqEq => (BinOp::Eq, 7),
        Token::NotEq => (BinOp::Ne, 7),
        Token::Lt => (BinOp::Lt, 8),
        Token::LtEq => (BinOp::Le, 8),
        Token::Gt => (BinOp::Gt, 8),
        Token::GtEq => (BinOp::Ge, 8),
        Token::Shl => (BinOp::Shl, 9),
        Token::Shr => (BinOp::Shr, 9),
        Token::Plus => (BinOp::Add, 10),
        Token::Minus => (BinOp::Sub, 10),
        Token::Star => (BinOp::Mul, 11),
        Token::Slash => (BinOp::Div, 11),
        Token::Percent => (BinOp::Rem, 11),
        _ => return None,
    };
    Some(entry)
}

fn type_of_token(tok: &Token) -> Option<CType> {
    match tok {
        Token::Int => Some(CType::Int),
        Token::Float => Some(CType::Float),
        Token::Double => Some(CType::Double),
        Token::Char => Some(CType::Char),
        Token::Void => Some(CType::Void),
        Token::Bool => Some(CType::Bool),
        _ => None,
    }
}

impl<'src> Parser<'src> {
    pub fn new(lexer: Lexer<'src>) -> Self {
        Self { lexer }
    }

    pub fn from_source(source: &'src str) -> Self {
        Self::new(Lexer::new(source))
    }

    // -----------------------------------------------------------------------
    // Token stream helpers
    // -----------------------------------------------------------------------

    fn peek(&mut self) -> Result<Token, Error> {
        Ok(self.lexer.peek()?.clone())
    }

    fn pos(&mut self) -> Result<Pos, Error> {
        Ok(self.lexer.position()?)
    }

    fn advance(&mut self) -> Result<(Token, Pos), Error> {
        let spanned = self.lexer.next()?;
        Ok((spanned.tok, spanned.pos))
    }

    fn expect(&mut self, expected: &Token) -> Result<Pos, Error> {
        if self.lexer.peek()? == expected {
            Ok(self.advance()?.1)
        } else {
            Err(self.unexpected(&format!("'{}'", expected)))
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, Error> {
        match self.peek()? {
            Token::Ident(name) => {
                let (_, pos) = self.advance()?;
                Ok(Ident { name, pos })
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn eat(&mut self, tok: &Token) -> Result<bool, Error> {
        if self.lexer.peek()? == tok {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn unexpected(&mut self, expected: &str) -> Error {
        // Both peek and position have already succeeded by the time an
        // unexpected token is reported, so the fallbacks are unreachable.
        let found = self
            .lexer
            .peek()
            .map(|t| t.to_string())
            .unwrap_or_else(|_| "<error>".to_owned());
        let pos = self.lexer.position().unwrap_or(Pos::new(1, 1));
        if found == "<eof>" {
            Error::Parse(ParseError::UnexpectedEof {
                context: expected.to_owned(),
                pos,
            })
        } else {
            Error::Parse(ParseError::UnexpectedToken {
                expected: expected.to_owned(),
                found,
                pos,
            })
        }
    }

    // -----------------------------------------------------------------------
    // Top-level
    // -----------------------------------------------------------------------

    pub fn parse_program(&mut self) -> Result<Program, Error> {
        let mut decls = Vec::new();
        while self.peek()? != Token::Eof {
            decls.push(self.parse_decl()?);
        }
        Ok(Program { decls })
    }

    /// Parses a single top-level declaration. Used by the interactive driver,
    /// which lowers one declaration at a time.
    pub fn parse_decl(&mut self) -> Result<Decl, Error> {
        if self.peek()? == Token::Extern {
            return self.parse_extern_decl();
        }
        let pos = self.pos()?;
        let return_ty = self.parse_type()?;
        let name = self.expect_ident()?;
        self.expect(&Token::LParen)?;
        let params = self.parse_param_list()?;
        self.expect(&Token::RParen)?;
        let body = self.parse_block()?;
        Ok(Decl::Function {
            return_ty,
            name,
            params,
            body,
            pos,
        })
    }

    /// Returns `true` when the remaining input is only end-of-file.
    pub fn at_eof(&mut self) -> Result<bool, Error> {
        Ok(self.peek()? == Token::Eof)
    }

    fn parse_extern_decl(&mut self) -> Result<Decl, Error> {
        let pos = self.expect(&Token::Extern)?;
        let return_ty = self.parse_type()?;
        let name = self.expect_ident()?;
        self.expect(&Token::LParen)?;
        let params = self.parse_param_list()?;
        self.expect(&Token::RParen)?;
        self.expect(&Token::Semi)?;
        Ok(Decl::Extern {
            return_ty,
            name,
            params,
            pos,
        })
    }

    fn parse_param_list(&mut self) -> Result<Vec<Param>, Error> {
        let mut params = Vec::new();
        if self.peek()? == Token::RParen {
            return Ok(params);
        }
        loop {
            let ty = self.parse_type()?;
            let name = self.expect_ident()?;
            params.push(Param { ty, name });
            if !self.eat(&Token::Comma)? {
                return Ok(params);
            }
        }
    }

    fn parse_type(&mut self) -> Result<CType, Error> {
        match type_of_token(self.lexer.peek()?) {
            Some(ty) => {
                self.advance()?;
                Ok(ty)
            }
            None => Err(self.unexpected("type name")),
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn parse_block(&mut self) -> Result<Stmt, Error> {
        let pos = self.expect(&Token::LBrace)?;
        let mut stmts = Vec::new();
        while self.peek()? != Token::RBrace {
            if self.peek()? == Token::Eof {
                return Err(self.unexpected("'}'"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&Token::RBrace)?;
        Ok(Stmt::Block { stmts, pos })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        match self.peek()? {
            tok if type_of_token(&tok).is_some() => self.parse_var_decl(),
            Token::If => self.parse_if(),
            Token::While => self.parse_while(),
            Token::For => self.parse_for(),
            Token::Return => self.parse_return(),
            Token::Break => {
                let (_, pos) = self.advance()?;
                self.expect(&Token::Semi)?;
                Ok(Stmt::Break { pos })
            }
            Token::Continue => {
                let (_, pos) = self.advance()?;
                self.expect(&Token::Semi)?;
                Ok(Stmt::Continue { pos })
            }
            Token::LBrace => self.parse_block(),
            _ => {
                let expr = self.parse_expr()?;
                self.expect(&Token::Semi)?;
                Ok(Stmt::Expr(Box::new(expr)))
            }
        }
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, Error> {
        let pos = self.pos()?;
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        let init = if self.eat(&Token::Assign)? {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.expect(&Token::Semi)?;
        Ok(Stmt::VarDecl {
            ty,
            name,
            init,
            pos,
        })
    }

    fn parse_if(&mut self) -> Result<Stmt, Error> {
        let pos = self.expect(&Token::If)?;
        self.expect(&Token::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&Token::RParen)?;
        let then_branch = self.parse_stmt()?;
        // The dangling else binds to the nearest preceding `if`, which is
        // exactly what greedy consumption here produces.
        let else_branch = if self.eat(&Token::Else)? {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch,
            pos,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, Error> {
        let pos = self.expect(&Token::While)?;
        self.expect(&Token::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&Token::RParen)?;
        let body = self.parse_stmt()?;
        Ok(Stmt::While {
            cond: Box::new(cond),
            body: Box::new(body),
            pos,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, Error> {
        let pos = self.expect(&Token::For)?;
        self.expect(&Token::LParen)?;

        // The init clause may declare a variable scoped to the loop header.
        let init = if self.eat(&Token::Semi)? {
            None
        } else if type_of_token(&self.peek()?).is_some() {
            Some(Box::new(self.parse_var_decl()?))
        } else {
            let expr = self.parse_expr()?;
            self.expect(&Token::Semi)?;
            Some(Box::new(Stmt::Expr(Box::new(expr))))
        };

        let cond = if self.peek()? == Token::Semi {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.expect(&Token::Semi)?;

        let step = if self.peek()? == Token::RParen {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.expect(&Token::RParen)?;

        let body = self.parse_stmt()?;
        Ok(Stmt::For {
            init,
            cond,
            step,
            body: Box::new(body),
            pos,
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, Error> {
        let pos = self.expect(&Token::Return)?;
        let value = if self.peek()? == Token::Semi {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.expect(&Token::Semi)?;
        Ok(Stmt::Return { value, pos })
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    pub fn parse_expr(&mut self) -> Result<Expr, Error> {
        let lhs = self.parse_binary(0)?;
        if self.peek()? != Token::Assign {
            return Ok(lhs);
        }
        match lhs {
            Expr::Var(target) => {
                self.advance()?; // consume '='
                let value = self.parse_expr()?; // right-associative
                let pos = target.pos;
                Ok(Expr::Assign {
                    target,
                    value: Box::new(value),
                    pos,
                })
            }
            _ => Err(self.unexpected("';' (assignment target must be a variable name)")),
        }
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, Error> {
        let mut lhs = self.parse_unary()?;
        while let Some((op, prec)) = bin_prec(self.lexer.peek()?) {
            if prec < min_prec {
                break;
            }
            self.advance()?;
            // All table operators are left-associative: parse the right side
            // at one level tighter.
            let rhs = self.parse_binary(prec + 1)?;
            let pos = lhs.pos();
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                pos,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let op = match self.peek()? {
            Token::Minus => Some(UnaryOp::Neg),
            Token::Plus => Some(UnaryOp::Plus),
            Token::Bang => Some(UnaryOp::Not),
            Token::Tilde => Some(UnaryOp::BitNot),
            Token::PlusPlus => Some(UnaryOp::Inc),
            Token::MinusMinus => Some(UnaryOp::Dec),
            _ => None,
        };
        match op {
            Some(op) => {
                let (_, pos) = self.advance()?;
                let operand = self.parse_unary()?; // prefix chain is right-associative
                Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                    postfix: false,
                    pos,
                })
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek()? {
                Token::LParen => {
                    let callee = match expr {
                        Expr::Var(ident) => ident,
                        _ => return Err(self.unexpected("a function name before '('")),
                    };
                    self.advance()?;
                    let args = self.parse_args()?;
                    self.expect(&Token::RParen)?;
                    let pos = callee.pos;
                    expr = Expr::Call { callee, args, pos };
                }
                Token::LBracket => {
                    let base = match expr {
                        Expr::Var(ident) => ident,
                        _ => return Err(self.unexpected("an indexable name before '['")),
                    };
                    self.advance()?;
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket)?;
                    let pos = base.pos;
                    expr = Expr::Index {
                        base,
                        index: Box::new(index),
                        pos,
                    };
                }
                Token::PlusPlus | Token::MinusMinus => {
                    let (tok, _) = self.advance()?;
                    let op = if tok == Token::PlusPlus {
                        UnaryOp::Inc
                    } else {
                        UnaryOp::Dec
                    };
                    let pos = expr.pos();
                    expr = Expr::Unary {
                        op,
                        operand: Box::new(expr),
                        postfix: true,
                        pos,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, Error> {
        let mut args = Vec::new();
        if self.peek()? == Token::RParen {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if !self.eat(&Token::Comma)? {
                return Ok(args);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        match self.peek()? {
            Token::IntLit(value) => {
                let (_, pos) = self.advance()?;
                Ok(Expr::IntLit { value, pos })
            }
            Token::FloatLit(value) => {
                let (_, pos) = self.advance()?;
                Ok(Expr::FloatLit { value, pos })
            }
            Token::StrLit(value) => {
                let (_, pos) = self.advance()?;
                Ok(Expr::StrLit { value, pos })
            }
            Token::CharLit(value) => {
                let (_, pos) = self.advance()?;
                Ok(Expr::CharLit { value, pos })
            }
            Token::True => {
                let (_, pos) = self.advance()?;
                Ok(Expr::BoolLit { value: true, pos })
            }
            Token::False => {
                let (_, pos) = self.advance()?;
                Ok(Expr::BoolLit { value: false, pos })
            }
            Token::Ident(name) => {
                let (_, pos) = self.advance()?;
                Ok(Expr::Var(Ident { name, pos }))
            }
            Token::LParen => {
                self.advance()?;
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}
