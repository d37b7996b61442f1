use crate::error::{RulesError, RulesResult};

/// A lexical token with its byte offset in the source.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Bang,
    Question,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Eof,
}

/// Split a rule expression into tokens.
pub fn tokenize(source: &str) -> RulesResult<Vec<Token>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    let syntax = |offset: usize, reason: &str| RulesError::Syntax {
        expression: source.to_string(),
        offset,
        reason: reason.to_string(),
    };

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let kind = match c {
            b'(' => single(&mut i, TokenKind::LParen),
            b')' => single(&mut i, TokenKind::RParen),
            b'[' => single(&mut i, TokenKind::LBracket),
            b']' => single(&mut i, TokenKind::RBracket),
            b',' => single(&mut i, TokenKind::Comma),
            b'?' => single(&mut i, TokenKind::Question),
            b':' => single(&mut i, TokenKind::Colon),
            b'+' => single(&mut i, TokenKind::Plus),
            b'-' => single(&mut i, TokenKind::Minus),
            b'*' => single(&mut i, TokenKind::Star),
            b'/' => single(&mut i, TokenKind::Slash),
            b'%' => single(&mut i, TokenKind::Percent),
            b'.' if !bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                single(&mut i, TokenKind::Dot)
            }
            b'<' | b'>' => {
                let or_equal = bytes.get(i + 1) == Some(&b'=');
                i += if or_equal { 2 } else { 1 };
                match (c, or_equal) {
                    (b'<', false) => TokenKind::Lt,
                    (b'<', true) => TokenKind::Le,
                    (_, false) => TokenKind::Gt,
                    (_, true) => TokenKind::Ge,
                }
            }
            b'=' | b'!' => {
                let next = bytes.get(i + 1) == Some(&b'=');
                if c == b'!' && !next {
                    single(&mut i, TokenKind::Bang)
                } else if !next {
                    return Err(syntax(start, "assignment is not allowed; use '=='"));
                } else {
                    // Strict and loose forms mean the same thing here.
                    let strict = bytes.get(i + 2) == Some(&b'=');
                    i += if strict { 3 } else { 2 };
                    if c == b'=' {
                        TokenKind::Eq
                    } else {
                        TokenKind::Ne
                    }
                }
            }
            b'&' | b'|' => {
                if bytes.get(i + 1) != Some(&c) {
                    return Err(syntax(start, "bitwise operators are not supported"));
                }
                i += 2;
                if c == b'&' {
                    TokenKind::And
                } else {
                    TokenKind::Or
                }
            }
            b'\'' | b'"' => {
                let (text, end) = read_string(source, i).map_err(|reason| syntax(start, reason))?;
                i = end;
                TokenKind::Str(text)
            }
            b'0'..=b'9' | b'.' => {
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                let text = &source[start..i];
                let n = text
                    .parse::<f64>()
                    .map_err(|_| syntax(start, "malformed number"))?;
                TokenKind::Number(n)
            }
            c if c == b'$' || c == b'_' || c.is_ascii_alphabetic() => {
                while i < bytes.len()
                    && (bytes[i] == b'$' || bytes[i] == b'_' || bytes[i].is_ascii_alphanumeric())
                {
                    i += 1;
                }
                match &source[start..i] {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "null" => TokenKind::Null,
                    ident => TokenKind::Ident(ident.to_string()),
                }
            }
            _ => return Err(syntax(start, "unexpected character")),
        };

        tokens.push(Token {
            kind,
            offset: start,
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        offset: source.len(),
    });
    Ok(tokens)
}

fn single(i: &mut usize, kind: TokenKind) -> TokenKind {
    *i += 1;
    kind
}

/// Read a quoted string starting at `start`. Returns the unescaped text and
/// the offset just past the closing quote.
fn read_string(source: &str, start: usize) -> Result<(String, usize), &'static str> {
    let mut chars = source[start..].char_indices();
    let (_, quote) = chars.next().ok_or("unterminated string")?;
    let mut out = String::new();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '\\' => {
                let (_, escaped) = chars.next().ok_or("unterminated escape")?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
            }
            c if c == quote => return Ok((out, start + pos + c.len_utf8())),
            c => out.push(c),
        }
    }
    Err("unterminated string")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn operators_and_identifiers() {
        assert_eq!(
            kinds("auth.uid === $uid"),
            vec![
                TokenKind::Ident("auth".into()),
                TokenKind::Dot,
                TokenKind::Ident("uid".into()),
                TokenKind::Eq,
                TokenKind::Ident("$uid".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn loose_and_strict_equality_match() {
        assert_eq!(kinds("a == b"), kinds("a === b"));
        assert_eq!(kinds("a != b"), kinds("a !== b"));
    }

    #[test]
    fn literals() {
        assert_eq!(
            kinds("true false null 12.5 'it\\'s' \"x\""),
            vec![
                TokenKind::True,
                TokenKind::False,
                TokenKind::Null,
                TokenKind::Number(12.5),
                TokenKind::Str("it's".into()),
                TokenKind::Str("x".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comparison_operators() {
        assert_eq!(
            kinds("< <= > >= && ||"),
            vec![
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Gt,
                TokenKind::Ge,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn rejects_assignment_and_bitwise() {
        assert!(tokenize("a = b").is_err());
        assert!(tokenize("a & b").is_err());
        assert!(tokenize("'open").is_err());
        assert!(tokenize("a # b").is_err());
    }
}
