//! Single-pass, position-tracking lexer: source text to a token stream.

use std::fmt::{self, Display, Formatter};

use crate::token::{Terminal, Token};
use crate::util::Position;

/// A lexical error: the lexer never panics on ill-formed input, it records one of these
/// and keeps scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub position: Position,
    pub message: String,
}

impl LexError {
    fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

impl Display for LexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "LexError at {}: {}", self.position, self.message)
    }
}

const MAX_IDENTIFIER_LEN: usize = 255;

/// Scans a source string into a token stream, tracking `offset`/`line`/`column` as it goes.
///
/// `tokenize` never throws: malformed input is reported as a [`LexError`] and scanning
/// continues past it, so a caller always gets a best-effort token list back alongside
/// whatever errors were collected.
pub struct Lexer;

impl Lexer {
    /// Tokenize `source`, always appending a trailing `DOLLAR` token if the input did not
    /// already end with one.
    pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
        let bytes = source.as_bytes();
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        let mut offset = 0usize;
        let mut line = 1usize;
        let mut column = 1usize;

        macro_rules! advance {
            ($n:expr) => {{
                for _ in 0..$n {
                    if bytes[offset] == b'\n' {
                        line += 1;
                        column = 1;
                    } else {
                        column += 1;
                    }
                    offset += 1;
                }
            }};
        }

        while offset < bytes.len() {
            let c = bytes[offset];
            let start_pos = Position::new(offset, line, column);

            match c {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    advance!(1);
                }
                b'0'..=b'9' => {
                    let start = offset;
                    let mut dot_count = 0usize;
                    while offset < bytes.len()
                        && (bytes[offset].is_ascii_digit() || bytes[offset] == b'.')
                    {
                        if bytes[offset] == b'.' {
                            dot_count += 1;
                        }
                        advance!(1);
                    }
                    let lexeme = &source[start..offset];
                    if dot_count > 1 {
                        errors.push(LexError::new(
                            start_pos,
                            format!("invalid number literal '{}'", lexeme),
                        ));
                    } else {
                        tokens.push(Token::new(Terminal::Number, lexeme, start_pos));
                    }
                }
                b'A'..=b'Z' | b'a'..=b'z' | b'_' => {
                    let start = offset;
                    while offset < bytes.len()
                        && (bytes[offset].is_ascii_alphanumeric() || bytes[offset] == b'_')
                    {
                        advance!(1);
                    }
                    let lexeme = &source[start..offset];
                    if lexeme.len() > MAX_IDENTIFIER_LEN {
                        errors.push(LexError::new(
                            start_pos,
                            format!(
                                "identifier '{}…' exceeds maximum length of {} characters",
                                &lexeme[..32.min(lexeme.len())],
                                MAX_IDENTIFIER_LEN
                            ),
                        ));
                    } else {
                        let kind = match lexeme.to_ascii_lowercase().as_str() {
                            "true" => Terminal::True,
                            "false" => Terminal::False,
                            "if" => Terminal::If,
                            _ => Terminal::Identifier,
                        };
                        tokens.push(Token::new(kind, lexeme, start_pos));
                    }
                }
                _ => {
                    if let Some((kind, len)) = match_two_char_operator(&bytes[offset..]) {
                        tokens.push(Token::new(kind, &source[offset..offset + len], start_pos));
                        advance!(len);
                    } else if let Some(kind) = match_one_char_operator(c) {
                        tokens.push(Token::new(
                            kind,
                            &source[offset..offset + 1],
                            start_pos,
                        ));
                        advance!(1);
                    } else if c.is_ascii_control() {
                        errors.push(LexError::new(
                            start_pos,
                            format!("control character 0x{:02x} in source", c),
                        ));
                        advance!(1);
                    } else {
                        errors.push(LexError::new(
                            start_pos,
                            format!("unrecognized character '{}'", c as char),
                        ));
                        advance!(1);
                    }
                }
            }
        }

        if tokens.last().map(|t| t.kind) != Some(Terminal::Dollar) {
            tokens.push(Token::dollar(Position::new(offset, line, column)));
        }

        (tokens, errors)
    }
}

fn match_two_char_operator(bytes: &[u8]) -> Option<(Terminal, usize)> {
    if bytes.len() < 2 {
        return None;
    }
    let kind = match &bytes[0..2] {
        b"==" => Terminal::Equal,
        b"!=" => Terminal::NotEqual,
        b"<=" => Terminal::LessEqual,
        b">=" => Terminal::GreaterEqual,
        b"&&" => Terminal::And,
        b"||" => Terminal::Or,
        _ => return None,
    };
    Some((kind, 2))
}

fn match_one_char_operator(c: u8) -> Option<Terminal> {
    Some(match c {
        b'+' => Terminal::Plus,
        b'-' => Terminal::Minus,
        b'*' => Terminal::Multiply,
        b'/' => Terminal::Divide,
        b'%' => Terminal::Modulo,
        b'^' => Terminal::Power,
        b'(' => Terminal::LeftParen,
        b')' => Terminal::RightParen,
        b',' => Terminal::Comma,
        b'<' => Terminal::Less,
        b'>' => Terminal::Greater,
        b'!' => Terminal::Not,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Terminal> {
        Lexer::tokenize(source).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_arithmetic_expression() {
        assert_eq!(
            kinds("1 + 2 * 3"),
            vec![
                Terminal::Number,
                Terminal::Plus,
                Terminal::Number,
                Terminal::Multiply,
                Terminal::Number,
                Terminal::Dollar,
            ]
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(kinds("TRUE"), vec![Terminal::True, Terminal::Dollar]);
        assert_eq!(kinds("False"), vec![Terminal::False, Terminal::Dollar]);
        assert_eq!(kinds("If"), vec![Terminal::If, Terminal::Dollar]);
    }

    #[test]
    fn two_char_operators_take_priority() {
        assert_eq!(kinds("a <= b"), vec![
            Terminal::Identifier,
            Terminal::LessEqual,
            Terminal::Identifier,
            Terminal::Dollar,
        ]);
        assert_eq!(kinds("a<b"), vec![
            Terminal::Identifier,
            Terminal::Less,
            Terminal::Identifier,
            Terminal::Dollar,
        ]);
    }

    #[test]
    fn always_appends_dollar() {
        let (tokens, _) = Lexer::tokenize("1");
        assert_eq!(tokens.last().unwrap().kind, Terminal::Dollar);
    }

    #[test]
    fn invalid_number_is_an_error_not_a_panic() {
        let (_, errors) = Lexer::tokenize("1.2.3");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn overlong_identifier_is_reported() {
        let ident = "a".repeat(300);
        let (_, errors) = Lexer::tokenize(&ident);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn unknown_character_is_skipped_and_reported() {
        let (tokens, errors) = Lexer::tokenize("1 @ 2");
        assert_eq!(errors.len(), 1);
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![Terminal::Number, Terminal::Number, Terminal::Dollar]
        );
    }

    #[test]
    fn tracks_line_and_column_across_newlines() {
        let (tokens, _) = Lexer::tokenize("1\n22");
        assert_eq!(tokens[0].position.line, 1);
        assert_eq!(tokens[1].position.line, 2);
        assert_eq!(tokens[1].position.column, 1);
    }
}
