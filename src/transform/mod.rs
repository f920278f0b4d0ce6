//! Statement engine for OTLP records.
//!
//! A statement is a single function call such as
//! `truncate_all(attributes, 64)`. Statements are parsed, bound against a
//! function's parameter list and built into closures once, then applied to
//! every record through a context that exposes that record's paths.

pub mod arguments;
pub mod contexts;
pub mod error;
pub mod functions;
pub mod parser;
pub mod path;
pub mod registry;
pub mod runtime;

pub use arguments::{bind, ArgKind, BoundArguments, Getter, ParamDefault, Parameter};
pub use contexts::{
    DataPointContext, FieldError, LogContext, MapSlot, MetricAccess, MetricContext, PathTarget,
    SiblingSink, SpanContext, TransformContext,
};
pub use error::{
    BindError, BuildError, CompileError, ExecutionError, ParseError, PathError, RegistryError,
    RuntimeError, StatementError,
};
pub use functions::{init_registries, StandardFunctions};
pub use parser::{parse_statement, Argument, Invocation, Key, Literal, PathExpr};
pub use path::PathAccessor;
pub use registry::{expr_func, ExprFunc, FunctionFactory, FunctionRegistry};
pub use runtime::{ErrorMode, Statement, Statements};
