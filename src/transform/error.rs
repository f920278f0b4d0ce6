//! Error taxonomy of the statement engine.
//!
//! Construction-time failures (`ParseError`, `BindError`, `BuildError`,
//! `RegistryError`) surface once while a processor is built. Runtime failures
//! (`PathError`, `RuntimeError`) surface per record.

use super::arguments::ArgKind;
use crate::model::ValueKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected end of statement at offset {offset}, expected {expected}")]
    UnexpectedEnd { offset: usize, expected: &'static str },
    #[error("unexpected character {found:?} at offset {offset}, expected {expected}")]
    UnexpectedChar {
        offset: usize,
        found: char,
        expected: &'static str,
    },
    #[error("invalid number literal `{text}` at offset {offset}")]
    InvalidNumber { offset: usize, text: String },
    #[error("invalid bytes literal at offset {offset}")]
    InvalidBytes { offset: usize },
    #[error("invalid escape sequence at offset {offset}")]
    InvalidEscape { offset: usize },
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("unexpected trailing input at offset {offset}")]
    TrailingInput { offset: usize },
}

/// Structural mismatch between a call and the function's declared parameters.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("expected between {min} and {max} arguments, got {actual}")]
    WrongArity {
        min: usize,
        max: usize,
        actual: usize,
    },
    #[error("argument {position} must be {expected}, got {found}")]
    WrongArgumentKind {
        position: usize,
        expected: ArgKind,
        found: &'static str,
    },
    #[error("argument {position}: unknown enum value `{symbol}`")]
    UnknownEnum { position: usize, symbol: String },
    #[error("argument {position}: unknown path `{path}`")]
    InvalidPath { position: usize, path: String },
    #[error("argument {position}: {source}")]
    Nested {
        position: usize,
        #[source]
        source: Box<CompileError>,
    },
}

/// A well-formed call whose argument values are invalid for this function.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid value for `{argument}`: {message}")]
    InvalidValue {
        argument: &'static str,
        message: String,
    },
    #[error("unknown aggregation temporality `{0}`")]
    UnknownTemporality(String),
    #[error("argument `{0}` was not bound with the requested kind")]
    MissingArgument(&'static str),
}

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("function `{0}` is already registered")]
    DuplicateFunction(String),
    #[error("function `{function}` has an invalid parameter list: {reason}")]
    InvalidSchema {
        function: &'static str,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("`{function}`: {source}")]
    Bind {
        function: String,
        #[source]
        source: BindError,
    },
    #[error("`{function}`: {source}")]
    Build {
        function: String,
        #[source]
        source: BuildError,
    },
}

/// A compile failure tied to the statement text that caused it.
#[derive(Debug, Error)]
#[error("statement `{statement}`: {source}")]
pub struct StatementError {
    pub statement: String,
    #[source]
    pub source: CompileError,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("path `{path}`: intermediate container does not exist")]
    MissingContainer { path: String },
    #[error("path `{path}`: index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        path: String,
        index: i64,
        len: usize,
    },
    #[error("path `{path}`: cannot index into a {kind} value")]
    NotIndexable { path: String, kind: ValueKind },
    #[error("path `{path}`: key does not fit a {kind} value")]
    KeyMismatch { path: String, kind: ValueKind },
    #[error("path `{path}`: field is not present on this record")]
    FieldNotPresent { path: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("`{target}` expects {expected}, got {found}")]
    TypeMismatch {
        target: String,
        expected: &'static str,
        found: ValueKind,
    },
    #[error("`{target}`: {message}")]
    InvalidValue { target: String, message: String },
}

/// A runtime failure tied to the statement and record it happened on.
#[derive(Debug, Error)]
#[error("statement `{statement}` failed on {record}: {source}")]
pub struct ExecutionError {
    pub statement: String,
    pub record: String,
    #[source]
    pub source: RuntimeError,
}
