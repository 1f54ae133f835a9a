use super::super::ast::ConstantKind;
use super::super::types::ErrorKind;
use super::*;

#[test]
fn test_lex_expression() {
    assert_eq!(
        lex("BUFEND-BUFFER"),
        Ok(vec![
            Lexeme::Name("BUFEND".to_string()),
            Lexeme::Minus,
            Lexeme::Name("BUFFER".to_string()),
        ])
    );
    assert_eq!(lex("*"), Ok(vec![Lexeme::Star]));
    assert_eq!(
        lex("#4096"),
        Ok(vec![Lexeme::Hash, Lexeme::Number(4096)])
    );
    assert_eq!(
        lex("@RETADR"),
        Ok(vec![Lexeme::At, Lexeme::Name("RETADR".to_string())])
    );
}

#[test]
fn test_lex_tolerates_spaces() {
    assert_eq!(
        lex("A + 3"),
        Ok(vec![
            Lexeme::Name("A".to_string()),
            Lexeme::Plus,
            Lexeme::Number(3)
        ])
    );
}

#[test]
fn test_lex_rejects_junk() {
    assert!(matches!(lex("A%B"), Err(ErrorKind::ParseFailure(_))));
    // Too large for any field.
    assert!(matches!(
        lex("99999999999999999999999"),
        Err(ErrorKind::ParseFailure(_))
    ));
}

#[test]
fn test_character_constant() {
    let c = constant("C'EOF'").expect("constant should be valid");
    assert_eq!(c.kind, ConstantKind::Character);
    assert_eq!(c.body, "EOF");
}

#[test]
fn test_hex_constant() {
    let c = constant("X'F1'").expect("constant should be valid");
    assert_eq!(c.kind, ConstantKind::Hex);
    assert_eq!(c.bytes(), vec![0xF1]);
}

#[test]
fn test_bad_constants() {
    for bad in ["C'EOF", "X'ZZ'", "C''", "Q'AB'", "EOF"] {
        assert!(
            matches!(constant(bad), Err(ErrorKind::ParseFailure(_))),
            "{bad} should have been rejected"
        );
    }
    assert!(is_unterminated_constant("C'EOF"));
    assert!(!is_unterminated_constant("C'EOF'"));
}
