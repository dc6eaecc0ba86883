use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unexpected character `{found}`, expected {expected}")]
    UnexpectedChar { found: char, expected: &'static str },

    #[error("unexpected end of input, expected {0}")]
    UnexpectedEof(&'static str),

    #[error("unterminated string")]
    UnterminatedString,

    #[error("unterminated comment")]
    UnterminatedComment,

    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    #[error("duplicate key `{0}`")]
    DuplicateKey(String),

    #[error("unknown declaration `{0}`, expected `cube`")]
    UnknownDeclaration(String),

    #[error("values nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Syntax error in a cube schema file, with its 1-indexed position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at line {line}, column {column}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}
