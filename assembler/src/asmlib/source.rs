//! Splitting source lines into statements.
//!
//! A statement line has up to four tab-separated fields: label,
//! operator, operands and comment.  The operand field is a
//! comma-separated list; commas inside a quoted constant such as
//! `C'A,B'` do not separate operands.  A line starting with `.` is a
//! comment.
use tracing::{event, Level};

use super::ast::{Operator, Token};
use super::parser::symbol_name;
use super::types::{ErrorKind, LineNumber, ProgramError};


/// A statement may have no more than this many operands.
pub(crate) const MAX_OPERANDS: usize = 3;

fn split_operands(line: LineNumber, field: &str) -> Result<Vec<String>, ProgramError> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(Vec::new());
    }
    let mut operands = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in field.chars() {
        match ch {
            '\'' => {
                quoted = !quoted;
                current.push(ch);
            }
            ',' if !quoted => {
                operands.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if quoted {
        return Err(ProgramError::new(
            line,
            current.trim(),
            ErrorKind::parse("unterminated quote"),
        ));
    }
    operands.push(current);
    let operands: Vec<String> = operands.iter().map(|s| s.trim().to_string()).collect();
    if operands.iter().any(String::is_empty) {
        return Err(ProgramError::new(
            line,
            field,
            ErrorKind::parse("empty operand"),
        ));
    }
    if operands.len() > MAX_OPERANDS {
        return Err(ProgramError::new(
            line,
            field,
            ErrorKind::parse(format!(
                "a statement may have at most {MAX_OPERANDS} operands but this one has {}",
                operands.len()
            )),
        ));
    }
    Ok(operands)
}

/// Convert one line of source into a statement.  Returns `None` for
/// a blank line.
///
/// # Errors
///
/// `ParseFailure` when the line has no operator field, when the label
/// is not a valid name, or when the operand field is malformed.
pub fn tokenize_line(line: LineNumber, text: &str) -> Result<Option<Token>, ProgramError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    if let Some(comment) = text.strip_prefix('.') {
        return Ok(Some(Token::comment_only(line, comment.to_string())));
    }
    let mut fields = text.splitn(4, '\t');
    let label_field = fields.next().unwrap_or_default().trim();
    let operator_field = fields.next().unwrap_or_default().trim();
    let operand_field = fields.next().unwrap_or_default();
    let comment = fields
        .next()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    if operator_field.is_empty() {
        return Err(ProgramError::new(
            line,
            text.trim(),
            ErrorKind::parse("missing operator (fields must be separated by tabs)"),
        ));
    }
    let label = if label_field.is_empty() {
        None
    } else {
        Some(symbol_name(label_field).map_err(|e| ProgramError::new(line, label_field, e))?)
    };
    let (mnemonic, extended) = match operator_field.strip_prefix('+') {
        Some(rest) => (rest, true),
        None => (operator_field, false),
    };
    if mnemonic.is_empty() || !mnemonic.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return Err(ProgramError::new(
            line,
            operator_field,
            ErrorKind::parse("operators must be alphanumeric"),
        ));
    }
    let operands = split_operands(line, operand_field)?;
    let mut token = Token::comment_only(line, String::new());
    token.comment = comment;
    token.label = label;
    token.operator = Some(Operator {
        mnemonic: mnemonic.to_string(),
        extended,
    });
    token.operands = operands;
    Ok(Some(token))
}

/// Convert a whole program into statements.
///
/// # Errors
///
/// The first line which [`tokenize_line`] rejects.
pub fn tokenize_source(source: &str) -> Result<Vec<Token>, ProgramError> {
    let mut tokens = Vec::new();
    for (line, text) in source.lines().enumerate().map(|(n, text)| (n + 1, text)) {
        if let Some(token) = tokenize_line(line, text)? {
            tokens.push(token);
        }
    }
    event!(
        Level::DEBUG,
        "source contains {} statements and comments",
        tokens.len()
    );
    Ok(tokens)
}
