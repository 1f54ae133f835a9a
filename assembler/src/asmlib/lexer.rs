//! Lexical analysis of operand fields.
use logos::Logos;

use super::ast::{Constant, ConstantKind};
use super::types::ErrorKind;

mod rx;
#[cfg(test)]
mod tests;

/// The pieces an operand expression is made of.  Operands never
/// contain spaces in well-formed source, but we tolerate them.
#[derive(Debug, PartialEq, Eq, Logos, Clone)]
#[logos(skip r"[ ]+")]
pub(crate) enum Lexeme {
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("#")]
    Hash,

    #[token("@")]
    At,

    #[regex("[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Number(i64),

    #[regex("[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Name(String),
}

/// Split `text` into lexemes.
pub(crate) fn lex(text: &str) -> Result<Vec<Lexeme>, ErrorKind> {
    let mut lexer = Lexeme::lexer(text);
    let mut lexemes = Vec::new();
    while let Some(item) = lexer.next() {
        match item {
            Ok(lexeme) => lexemes.push(lexeme),
            Err(()) => {
                return Err(ErrorKind::parse(format!(
                    "unexpected '{}' in '{text}'",
                    lexer.slice()
                )));
            }
        }
    }
    Ok(lexemes)
}

/// Returns true if `text` is a complete quoted constant with its
/// closing quote missing.
fn is_unterminated_constant(text: &str) -> bool {
    rx::UNTERMINATED_CONSTANT.is_match(text)
}

/// Parse a `C'...'` or `X'...'` constant.
pub(crate) fn constant(text: &str) -> Result<Constant, ErrorKind> {
    let Some(captures) = rx::CONSTANT.captures(text) else {
        return Err(if is_unterminated_constant(text) {
            ErrorKind::parse(format!("unterminated quote in {text}"))
        } else {
            ErrorKind::parse(format!("expected C'...' or X'...' but got {text}"))
        });
    };
    let kind = match &captures[1] {
        "C" => ConstantKind::Character,
        _ => ConstantKind::Hex,
    };
    let body = captures[2].to_string();
    if body.is_empty() {
        return Err(ErrorKind::parse("constants may not be empty"));
    }
    if kind == ConstantKind::Hex && !rx::HEX_DIGITS.is_match(&body) {
        return Err(ErrorKind::parse(format!(
            "X'...' constants may only contain hexadecimal digits, but got {body}"
        )));
    }
    Ok(Constant { kind, body })
}
