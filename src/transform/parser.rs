//! Statement text -> invocation AST.
//!
//! The grammar is a single function call whose arguments are literals, enum
//! symbols, paths or nested calls:
//!
//! ```text
//! truncate_all(attributes, 64)
//! set(attributes["size"], Int(attributes["size"]))
//! convert_summary_count_val_to_sum("delta", true)
//! ```

use super::error::ParseError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub function: String,
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Literal(Literal),
    Path(PathExpr),
    Enum(String),
    Invocation(Invocation),
}

impl Argument {
    /// Short syntactic description used in bind errors.
    pub fn describe(&self) -> &'static str {
        match self {
            Argument::Literal(Literal::String(_)) => "a string literal",
            Argument::Literal(Literal::Int(_)) => "an int literal",
            Argument::Literal(Literal::Float(_)) => "a float literal",
            Argument::Literal(Literal::Bool(_)) => "a bool literal",
            Argument::Literal(Literal::Bytes(_)) => "a bytes literal",
            Argument::Literal(Literal::Nil) => "nil",
            Argument::Path(_) => "a path",
            Argument::Enum(_) => "an enum symbol",
            Argument::Invocation(_) => "a function call",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Nil,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    String(String),
    Int(i64),
}

/// `resource.attributes["k"][0]` is `fields = [resource, attributes]`,
/// `keys = ["k", 0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    pub fields: Vec<String>,
    pub keys: Vec<Key>,
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fields.join("."))?;
        for key in &self.keys {
            match key {
                Key::String(s) => write!(f, "[{s:?}]")?,
                Key::Int(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}

/// Parse one statement.
pub fn parse_statement(input: &str) -> Result<Invocation, ParseError> {
    let mut parser = Parser { input, pos: 0 };
    parser.skip_whitespace();
    let invocation = parser.invocation()?;
    parser.skip_whitespace();
    if parser.pos < input.len() {
        return Err(ParseError::TrailingInput { offset: parser.pos });
    }
    Ok(invocation)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, wanted: char, expected: &'static str) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == wanted => {
                self.bump();
                Ok(())
            }
            Some(found) => Err(ParseError::UnexpectedChar {
                offset: self.pos,
                found,
                expected,
            }),
            None => Err(ParseError::UnexpectedEnd {
                offset: self.pos,
                expected,
            }),
        }
    }

    fn ident(&mut self, expected: &'static str) -> Result<&'a str, ParseError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            Some(found) => {
                return Err(ParseError::UnexpectedChar {
                    offset: self.pos,
                    found,
                    expected,
                })
            }
            None => {
                return Err(ParseError::UnexpectedEnd {
                    offset: self.pos,
                    expected,
                })
            }
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        Ok(&self.input[start..self.pos])
    }

    fn invocation(&mut self) -> Result<Invocation, ParseError> {
        let function = self.ident("a function name")?.to_string();
        self.expect('(', "`(`")?;
        let arguments = self.arguments()?;
        Ok(Invocation {
            function,
            arguments,
        })
    }

    /// Arguments after the opening parenthesis, consuming the closing one.
    fn arguments(&mut self) -> Result<Vec<Argument>, ParseError> {
        let mut arguments = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(arguments);
        }
        loop {
            self.skip_whitespace();
            arguments.push(self.argument()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(')') => return Ok(arguments),
                Some(found) => {
                    return Err(ParseError::UnexpectedChar {
                        offset: self.pos - found.len_utf8(),
                        found,
                        expected: "`,` or `)`",
                    })
                }
                None => {
                    return Err(ParseError::UnexpectedEnd {
                        offset: self.pos,
                        expected: "`,` or `)`",
                    })
                }
            }
        }
    }

    fn argument(&mut self) -> Result<Argument, ParseError> {
        match self.peek() {
            Some('"') => Ok(Argument::Literal(Literal::String(self.string()?))),
            Some('0') if matches!(self.peek_at(1), Some('x') | Some('X')) => {
                Ok(Argument::Literal(Literal::Bytes(self.bytes()?)))
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => {
                Ok(Argument::Literal(self.number()?))
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.word_argument(),
            Some(found) => Err(ParseError::UnexpectedChar {
                offset: self.pos,
                found,
                expected: "an argument",
            }),
            None => Err(ParseError::UnexpectedEnd {
                offset: self.pos,
                expected: "an argument",
            }),
        }
    }

    /// Identifier-led argument: keyword, enum, nested call or path.
    fn word_argument(&mut self) -> Result<Argument, ParseError> {
        let word = self.ident("an argument")?;
        let next = self.peek();
        if next == Some('(') {
            self.bump();
            let arguments = self.arguments()?;
            return Ok(Argument::Invocation(Invocation {
                function: word.to_string(),
                arguments,
            }));
        }
        if next != Some('.') && next != Some('[') {
            match word {
                "true" => return Ok(Argument::Literal(Literal::Bool(true))),
                "false" => return Ok(Argument::Literal(Literal::Bool(false))),
                "nil" => return Ok(Argument::Literal(Literal::Nil)),
                _ if is_enum_symbol(word) => return Ok(Argument::Enum(word.to_string())),
                _ => {}
            }
        }
        let mut fields = vec![word.to_string()];
        while self.peek() == Some('.') {
            self.bump();
            fields.push(self.ident("a path segment")?.to_string());
        }
        let mut keys = Vec::new();
        while self.peek() == Some('[') {
            self.bump();
            self.skip_whitespace();
            let key = match self.peek() {
                Some('"') => Key::String(self.string()?),
                _ => match self.number()? {
                    Literal::Int(i) => Key::Int(i),
                    _ => {
                        return Err(ParseError::InvalidNumber {
                            offset: self.pos,
                            text: "index must be an integer".to_string(),
                        })
                    }
                },
            };
            keys.push(key);
            self.expect(']', "`]`")?;
        }
        Ok(Argument::Path(PathExpr { fields, keys }))
    }

    fn string(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => {
                    let offset = self.pos - 1;
                    match self.bump() {
                        Some('"') => out.push('"'),
                        Some('\\') => out.push('\\'),
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        _ => return Err(ParseError::InvalidEscape { offset }),
                    }
                }
                Some(c) => out.push(c),
                None => return Err(ParseError::UnterminatedString { offset: start }),
            }
        }
    }

    fn bytes(&mut self) -> Result<Vec<u8>, ParseError> {
        let start = self.pos;
        self.bump();
        self.bump();
        let digits_start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            self.bump();
        }
        const_hex::decode(&self.input[digits_start..self.pos])
            .map_err(|_| ParseError::InvalidBytes { offset: start })
    }

    fn number(&mut self) -> Result<Literal, ParseError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.bump();
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else if c == '.' || c == 'e' || c == 'E' {
                is_float = true;
                self.bump();
                if matches!(self.peek(), Some('-') | Some('+')) && (c == 'e' || c == 'E') {
                    self.bump();
                }
            } else {
                break;
            }
        }
        let text = &self.input[start..self.pos];
        let invalid = || ParseError::InvalidNumber {
            offset: start,
            text: text.to_string(),
        };
        if is_float {
            text.parse().map(Literal::Float).map_err(|_| invalid())
        } else {
            text.parse().map(Literal::Int).map_err(|_| invalid())
        }
    }
}

fn is_enum_symbol(word: &str) -> bool {
    let mut chars = word.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(fields: &[&str], keys: Vec<Key>) -> Argument {
        Argument::Path(PathExpr {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            keys,
        })
    }

    #[test]
    fn parses_literals_and_paths() {
        let inv = parse_statement(r#"limit(resource.attributes, -3, "svc\"x")"#).unwrap();
        assert_eq!(inv.function, "limit");
        assert_eq!(
            inv.arguments,
            vec![
                path(&["resource", "attributes"], vec![]),
                Argument::Literal(Literal::Int(-3)),
                Argument::Literal(Literal::String("svc\"x".into())),
            ]
        );
    }

    #[test]
    fn parses_nested_calls_and_keys() {
        let inv = parse_statement(r#"set(attributes["a"][0], Double(attributes["b"]))"#).unwrap();
        assert_eq!(
            inv.arguments[0],
            path(&["attributes"], vec![Key::String("a".into()), Key::Int(0)])
        );
        match &inv.arguments[1] {
            Argument::Invocation(nested) => {
                assert_eq!(nested.function, "Double");
                assert_eq!(nested.arguments.len(), 1);
            }
            other => panic!("expected nested call, got {other:?}"),
        }
    }

    #[test]
    fn distinguishes_keywords_and_enums() {
        let inv = parse_statement("f(true, false, nil, SPAN_KIND_SERVER, 1.5, 0xbeef)").unwrap();
        assert_eq!(
            inv.arguments,
            vec![
                Argument::Literal(Literal::Bool(true)),
                Argument::Literal(Literal::Bool(false)),
                Argument::Literal(Literal::Nil),
                Argument::Enum("SPAN_KIND_SERVER".into()),
                Argument::Literal(Literal::Float(1.5)),
                Argument::Literal(Literal::Bytes(vec![0xbe, 0xef])),
            ]
        );
    }

    #[test]
    fn empty_argument_list() {
        let inv = parse_statement("  convert_sum_to_gauge( ) ").unwrap();
        assert!(inv.arguments.is_empty());
    }

    #[test]
    fn reports_offsets() {
        assert_eq!(
            parse_statement("set(attributes, 1"),
            Err(ParseError::UnexpectedEnd {
                offset: 17,
                expected: "`,` or `)`"
            })
        );
        assert_eq!(
            parse_statement("f() g"),
            Err(ParseError::TrailingInput { offset: 4 })
        );
        assert!(matches!(
            parse_statement(r#"f("open)"#),
            Err(ParseError::UnterminatedString { offset: 2 })
        ));
    }

    #[test]
    fn path_display_round_trips_text() {
        let inv = parse_statement(r#"f(attributes["k"][2])"#).unwrap();
        match &inv.arguments[0] {
            Argument::Path(p) => assert_eq!(p.to_string(), r#"attributes["k"][2]"#),
            other => panic!("expected path, got {other:?}"),
        }
    }
}
