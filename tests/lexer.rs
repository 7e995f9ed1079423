//! Lexer tests: token streams, positions, maximal munch, and lex errors.

use minicc::error::LexError;
use minicc::parser::lexer::{Lexer, Pos, Token};

fn tokens_of(src: &str) -> Vec<Token> {
    Lexer::new(src)
        .tokenize()
        .expect("lexing should succeed")
        .into_iter()
        .map(|s| s.tok)
        .collect()
}

#[test]
fn test_simple_declaration() {
    assert_eq!(
        tokens_of("int x = 42;"),
        vec![
            Token::Int,
            Token::Ident("x".into()),
            Token::Assign,
            Token::IntLit(42),
            Token::Semi,
            Token::Eof,
        ]
    );
}

#[test]
fn test_keywords_and_identifiers() {
    assert_eq!(
        tokens_of("while whilex _if bool true"),
        vec![
            Token::While,
            Token::Ident("whilex".into()),
            Token::Ident("_if".into()),
            Token::Bool,
            Token::True,
            Token::Eof,
        ]
    );
}

#[test]
fn test_maximal_munch() {
    assert_eq!(
        tokens_of("<= < << == = ++ + -- - && & || |"),
        vec![
            Token::LtEq,
            Token::Lt,
            Token::Shl,
            Token::EqEq,
            Token::Assign,
            Token::PlusPlus,
            Token::Plus,
            Token::MinusMinus,
            Token::Minus,
            Token::AmpAmp,
            Token::Amp,
            Token::PipePipe,
            Token::Pipe,
            Token::Eof,
        ]
    );
}

#[test]
fn test_float_literal_requires_digits_after_dot() {
    assert_eq!(
        tokens_of("3.14 10"),
        vec![Token::FloatLit(3.14), Token::IntLit(10), Token::Eof]
    );
    // A dot without a following digit is not part of the number; since '.'
    // is not a token either, it is a lex error when reached.
    let err = Lexer::new("12.").tokenize().unwrap_err();
    assert!(matches!(err, LexError::UnexpectedChar { ch: '.', .. }));
}

#[test]
fn test_string_and_char_literals() {
    assert_eq!(
        tokens_of(r#""ab\n" 'A' '\t'"#),
        vec![
            Token::StrLit(vec![b'a', b'b', b'\n']),
            Token::CharLit(b'A'),
            Token::CharLit(b'\t'),
            Token::Eof,
        ]
    );
}

#[test]
fn test_comments_are_skipped() {
    assert_eq!(
        tokens_of("1 // line comment\n 2 /* block\ncomment */ 3"),
        vec![
            Token::IntLit(1),
            Token::IntLit(2),
            Token::IntLit(3),
            Token::Eof,
        ]
    );
}

#[test]
fn test_block_comment_does_not_nest() {
    // The first `*/` closes the comment; the rest is real input.
    assert_eq!(
        tokens_of("/* a /* b */ 7"),
        vec![Token::IntLit(7), Token::Eof]
    );
}

#[test]
fn test_unterminated_block_comment_is_fatal() {
    let err = Lexer::new("1 /* never closed").tokenize().unwrap_err();
    assert!(matches!(err, LexError::UnterminatedComment { .. }));
}

#[test]
fn test_unterminated_string_is_fatal() {
    let err = Lexer::new("\"abc").tokenize().unwrap_err();
    assert!(matches!(err, LexError::UnterminatedString { .. }));
}

#[test]
fn test_unknown_byte_is_fatal() {
    let err = Lexer::new("a @ b").tokenize().unwrap_err();
    assert!(matches!(err, LexError::UnexpectedChar { ch: '@', .. }));
}

#[test]
fn test_non_ascii_outside_string_is_fatal() {
    assert!(Lexer::new("int é = 1;").tokenize().is_err());
    // Inside a string the same bytes are carried through untouched.
    assert!(Lexer::new("\"é\"").tokenize().is_ok());
}

#[test]
fn test_positions_are_one_based() {
    let spanned = Lexer::new("int x\n  = 1;").tokenize().unwrap();
    assert_eq!(spanned[0].pos, Pos::new(1, 1)); // int
    assert_eq!(spanned[1].pos, Pos::new(1, 5)); // x
    assert_eq!(spanned[2].pos, Pos::new(2, 3)); // =
    assert_eq!(spanned[3].pos, Pos::new(2, 5)); // 1
}

#[test]
fn test_peek_does_not_consume() {
    let mut lexer = Lexer::new("a b");
    assert_eq!(lexer.peek().unwrap(), &Token::Ident("a".into()));
    assert_eq!(lexer.peek().unwrap(), &Token::Ident("a".into()));
    assert_eq!(lexer.position().unwrap(), Pos::new(1, 1));
    assert_eq!(lexer.next().unwrap().tok, Token::Ident("a".into()));
    assert_eq!(lexer.position().unwrap(), Pos::new(1, 3));
}

#[test]
fn test_determinism() {
    let src = "int f(int a) { return a * 2; } // tail";
    let first = Lexer::new(src).tokenize().unwrap();
    let second = Lexer::new(src).tokenize().unwrap();
    assert_eq!(first, second);
}
