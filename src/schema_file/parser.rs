//! Parser for `cube(<name>, { ... })` schema files.
//!
//! The accepted syntax is the subset of JavaScript object literals used by
//! cube definitions:
//!
//! ```text
//! cube(`Orders`, {
//!   sql: `SELECT * FROM orders`,
//!   measures: { count: { type: `count`, drillMembers: [id] } },
//!   dimensions: { id: { sql: `id`, type: `number`, primaryKey: true } },
//! });
//! ```
//!
//! Strings may use backticks, single or double quotes. Bare identifiers are
//! accepted where a string is expected and reported as [`Lint`]s.

use serde_json::{Map, Number, Value};

use super::error::{ParseError, ParseErrorKind};
use super::Lint;

/// Maximum nesting of arrays and objects inside a cube body.
pub const MAX_DEPTH: usize = 64;

/// One `cube(...)` call, before typed deserialization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCube {
    pub name: String,
    pub body: Value,
    pub lints: Vec<Lint>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    String(String),
    Number(Number),
    Bool(bool),
    Ident { name: String, line: usize, column: usize },
    Array(Vec<Literal>),
    Object(Vec<(String, Literal)>),
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
    depth: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            column: 1,
            depth: 0,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.line, self.column)
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    match self.advance() {
                        Some('/') => {
                            while let Some(c) = self.advance() {
                                if c == '\n' {
                                    break;
                                }
                            }
                        }
                        Some('*') => {
                            let mut star = false;
                            loop {
                                match self.advance() {
                                    Some('/') if star => break,
                                    Some(c) => star = c == '*',
                                    None => {
                                        return Err(ParseError::new(
                                            ParseErrorKind::UnterminatedComment,
                                            line,
                                            column,
                                        ))
                                    }
                                }
                            }
                        }
                        Some(found) => {
                            return Err(self.error(ParseErrorKind::UnexpectedChar {
                                found,
                                expected: "comment",
                            }))
                        }
                        None => return Err(self.error(ParseErrorKind::UnexpectedEof("comment"))),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn expect(&mut self, expected: char, what: &'static str) -> Result<(), ParseError> {
        self.skip_trivia()?;
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(found) => Err(self.error(ParseErrorKind::UnexpectedChar {
                found,
                expected: what,
            })),
            None => Err(self.error(ParseErrorKind::UnexpectedEof(what))),
        }
    }

    /// Consumes `c` if it is the next significant character.
    fn eat(&mut self, c: char) -> Result<bool, ParseError> {
        self.skip_trivia()?;
        if self.peek() == Some(c) {
            self.advance();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }
        ident
    }

    fn string(&mut self, quote: char) -> Result<String, ParseError> {
        let (line, column) = (self.line, self.column);
        self.advance();

        let mut value = String::new();
        loop {
            match self.advance() {
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c) => value.push(c),
                    None => break,
                },
                Some(c) if c == quote => return Ok(value),
                Some('\n') if quote != '`' => break,
                Some(c) => value.push(c),
                None => break,
            }
        }

        Err(ParseError::new(
            ParseErrorKind::UnterminatedString,
            line,
            column,
        ))
    }

    fn number(&mut self) -> Result<Number, ParseError> {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }

        if let Ok(n) = text.parse::<i64>() {
            return Ok(Number::from(n));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidNumber(text), line, column))
    }

    fn key(&mut self) -> Result<String, ParseError> {
        self.skip_trivia()?;
        match self.peek() {
            Some(q @ ('`' | '\'' | '"')) => self.string(q),
            Some(c) if c.is_alphabetic() || c == '_' || c == '$' => Ok(self.identifier()),
            Some(found) => Err(self.error(ParseErrorKind::UnexpectedChar {
                found,
                expected: "object key",
            })),
            None => Err(self.error(ParseErrorKind::UnexpectedEof("object key"))),
        }
    }

    fn literal(&mut self) -> Result<Literal, ParseError> {
        self.skip_trivia()?;
        let (line, column) = (self.line, self.column);
        match self.peek() {
            Some(q @ ('`' | '\'' | '"')) => Ok(Literal::String(self.string(q)?)),
            Some('{') => self.nested(Self::object),
            Some('[') => self.nested(Self::array),
            Some(c) if c.is_ascii_digit() || c == '-' => Ok(Literal::Number(self.number()?)),
            Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {
                let name = self.identifier();
                Ok(match name.as_str() {
                    "true" => Literal::Bool(true),
                    "false" => Literal::Bool(false),
                    _ => Literal::Ident { name, line, column },
                })
            }
            Some(found) => Err(self.error(ParseErrorKind::UnexpectedChar {
                found,
                expected: "value",
            })),
            None => Err(self.error(ParseErrorKind::UnexpectedEof("value"))),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Literal, ParseError>,
    ) -> Result<Literal, ParseError> {
        if self.depth == MAX_DEPTH {
            return Err(self.error(ParseErrorKind::TooDeep(MAX_DEPTH)));
        }
        self.depth += 1;
        let literal = parse(self);
        self.depth -= 1;
        literal
    }

    fn array(&mut self) -> Result<Literal, ParseError> {
        self.expect('[', "`[`")?;
        let mut items = Vec::new();
        loop {
            if self.eat(']')? {
                return Ok(Literal::Array(items));
            }
            items.push(self.literal()?);
            if !self.eat(',')? {
                self.expect(']', "`,` or `]`")?;
                return Ok(Literal::Array(items));
            }
        }
    }

    fn object(&mut self) -> Result<Literal, ParseError> {
        Ok(Literal::Object(self.entries()?))
    }

    fn entries(&mut self) -> Result<Vec<(String, Literal)>, ParseError> {
        self.expect('{', "`{`")?;
        let mut entries: Vec<(String, Literal)> = Vec::new();
        loop {
            if self.eat('}')? {
                return Ok(entries);
            }

            self.skip_trivia()?;
            let (line, column) = (self.line, self.column);
            let key = self.key()?;
            if entries.iter().any(|(k, _)| *k == key) {
                return Err(ParseError::new(
                    ParseErrorKind::DuplicateKey(key),
                    line,
                    column,
                ));
            }
            self.expect(':', "`:`")?;
            let value = self.literal()?;
            entries.push((key, value));

            if !self.eat(',')? {
                self.expect('}', "`,` or `}`")?;
                return Ok(entries);
            }
        }
    }

    fn cube(&mut self) -> Result<RawCube, ParseError> {
        self.skip_trivia()?;
        let (line, column) = (self.line, self.column);
        let callee = self.identifier();
        if callee != "cube" {
            if callee.is_empty() {
                return Err(match self.peek() {
                    Some(found) => self.error(ParseErrorKind::UnexpectedChar {
                        found,
                        expected: "`cube`",
                    }),
                    None => self.error(ParseErrorKind::UnexpectedEof("`cube`")),
                });
            }
            return Err(ParseError::new(
                ParseErrorKind::UnknownDeclaration(callee),
                line,
                column,
            ));
        }

        self.expect('(', "`(`")?;
        self.skip_trivia()?;
        let mut lints = Vec::new();
        let (name_line, name_column) = (self.line, self.column);
        let name = match self.peek() {
            Some(q @ ('`' | '\'' | '"')) => self.string(q)?,
            Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {
                let name = self.identifier();
                lints.push(Lint {
                    cube: name.clone(),
                    path: Vec::new(),
                    identifier: name.clone(),
                    line: name_line,
                    column: name_column,
                });
                name
            }
            Some(found) => {
                return Err(self.error(ParseErrorKind::UnexpectedChar {
                    found,
                    expected: "cube name",
                }))
            }
            None => return Err(self.error(ParseErrorKind::UnexpectedEof("cube name"))),
        };
        self.expect(',', "`,`")?;

        self.skip_trivia()?;
        let (body_line, body_column) = (self.line, self.column);
        let entries = self.entries()?;
        if entries.iter().any(|(k, _)| k == "name") {
            return Err(ParseError::new(
                ParseErrorKind::DuplicateKey("name".to_string()),
                body_line,
                body_column,
            ));
        }

        self.eat(',')?;
        self.expect(')', "`)`")?;
        self.eat(';')?;

        let mut path = Vec::new();
        let mut body = into_json(Literal::Object(entries), &name, &mut path, &mut lints);
        if let Value::Object(map) = &mut body {
            map.insert("name".to_string(), Value::String(name.clone()));
        }

        Ok(RawCube {
            name,
            body,
            lints,
            line,
        })
    }
}

fn into_json(
    literal: Literal,
    cube: &str,
    path: &mut Vec<String>,
    lints: &mut Vec<Lint>,
) -> Value {
    match literal {
        Literal::String(s) => Value::String(s),
        Literal::Number(n) => Value::Number(n),
        Literal::Bool(b) => Value::Bool(b),
        Literal::Ident { name, line, column } => {
            lints.push(Lint {
                cube: cube.to_string(),
                path: path.clone(),
                identifier: name.clone(),
                line,
                column,
            });
            Value::String(name)
        }
        Literal::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| into_json(item, cube, path, lints))
                .collect(),
        ),
        Literal::Object(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                path.push(key.clone());
                let value = into_json(value, cube, path, lints);
                path.pop();
                map.insert(key, value);
            }
            Value::Object(map)
        }
    }
}

/// Parses every `cube(...)` call in `src`.
pub fn parse_cubes(src: &str) -> Result<Vec<RawCube>, ParseError> {
    let mut cursor = Cursor::new(src);
    let mut cubes = Vec::new();
    loop {
        cursor.skip_trivia()?;
        if cursor.peek().is_none() {
            return Ok(cubes);
        }
        cubes.push(cursor.cube()?);
    }
}
