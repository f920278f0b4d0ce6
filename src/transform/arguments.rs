//! Parameter declarations and the argument binder.
//!
//! A function declares its call signature as a static slice of
//! [`Parameter`]s. [`bind`] matches a parsed call against that slice
//! positionally and yields [`BoundArguments`], from which the function's
//! builder pulls typed values by keyword.

use super::contexts::TransformContext;
use super::error::{BindError, BuildError, RuntimeError};
use super::parser::{Argument, Literal};
use super::path::PathAccessor;
use super::registry::{ExprFunc, FunctionRegistry};
use crate::model::Value;
use std::fmt;

/// Declared kind of a parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Any value source: literal, path, enum symbol or nested call.
    Getter,
    /// A path that can be written.
    GetSetter,
    String,
    Int,
    Bool,
    Enum,
    /// A nested call, bound to a compiled function.
    Function,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ArgKind::Getter => "a value",
            ArgKind::GetSetter => "a settable path",
            ArgKind::String => "a string literal",
            ArgKind::Int => "an int literal",
            ArgKind::Bool => "a bool literal",
            ArgKind::Enum => "an enum symbol",
            ArgKind::Function => "a function call",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    Str(&'static str),
    Int(i64),
    Bool(bool),
}

impl ParamDefault {
    /// Whether this default can fill a slot of `kind`.
    pub fn fits(self, kind: ArgKind) -> bool {
        matches!(
            (self, kind),
            (ParamDefault::Str(_), ArgKind::String)
                | (ParamDefault::Int(_), ArgKind::Int)
                | (ParamDefault::Bool(_), ArgKind::Bool)
                | (_, ArgKind::Getter)
        )
    }

    fn value(self) -> Value {
        match self {
            ParamDefault::Str(s) => Value::Str(s.to_string()),
            ParamDefault::Int(i) => Value::Int(i),
            ParamDefault::Bool(b) => Value::Bool(b),
        }
    }
}

/// One slot of a function's call signature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    pub keyword: &'static str,
    pub kind: ArgKind,
    pub required: bool,
    pub default: Option<ParamDefault>,
}

impl Parameter {
    pub const fn required(keyword: &'static str, kind: ArgKind) -> Self {
        Parameter {
            keyword,
            kind,
            required: true,
            default: None,
        }
    }

    pub const fn optional(keyword: &'static str, kind: ArgKind, default: ParamDefault) -> Self {
        Parameter {
            keyword,
            kind,
            required: false,
            default: Some(default),
        }
    }
}

// ============================================================================
// Bound values
// ============================================================================

/// A read-only value source evaluated against a context at call time.
pub enum Getter<C: TransformContext> {
    Literal(Value),
    Path(PathAccessor<C>),
    Call(ExprFunc<C>),
}

impl<C: TransformContext> Getter<C> {
    pub fn get(&self, ctx: &mut C) -> Result<Value, RuntimeError> {
        match self {
            Getter::Literal(value) => Ok(value.clone()),
            Getter::Path(path) => path.get(ctx),
            Getter::Call(func) => func(ctx),
        }
    }
}

impl<C: TransformContext> Clone for Getter<C> {
    fn clone(&self) -> Self {
        match self {
            Getter::Literal(value) => Getter::Literal(value.clone()),
            Getter::Path(path) => Getter::Path(path.clone()),
            Getter::Call(func) => Getter::Call(func.clone()),
        }
    }
}

impl<C: TransformContext> fmt::Debug for Getter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Getter::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Getter::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Getter::Call(_) => f.write_str("Call(..)"),
        }
    }
}

pub enum BoundValue<C: TransformContext> {
    Getter(Getter<C>),
    GetSetter(PathAccessor<C>),
    String(String),
    Int(i64),
    Bool(bool),
    Enum(i64),
    Function(ExprFunc<C>),
}

struct Slot<C: TransformContext> {
    keyword: &'static str,
    value: Option<BoundValue<C>>,
    explicit: bool,
}

/// Arguments of one call, bound slot by slot to the function's parameters.
///
/// Every slot is filled: omitted optional parameters carry their declared
/// default. Builders take values out by keyword; asking for a keyword with
/// the wrong accessor is a [`BuildError::MissingArgument`].
pub struct BoundArguments<C: TransformContext> {
    slots: Vec<Slot<C>>,
}

impl<C: TransformContext> BoundArguments<C> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True when `keyword` was omitted and holds its declared default.
    pub fn is_defaulted(&self, keyword: &str) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.keyword == keyword && !slot.explicit)
    }

    fn take(&mut self, keyword: &'static str) -> Result<BoundValue<C>, BuildError> {
        self.slots
            .iter_mut()
            .find(|slot| slot.keyword == keyword)
            .and_then(|slot| slot.value.take())
            .ok_or(BuildError::MissingArgument(keyword))
    }

    fn peek(&self, keyword: &'static str) -> Result<&BoundValue<C>, BuildError> {
        self.slots
            .iter()
            .find(|slot| slot.keyword == keyword)
            .and_then(|slot| slot.value.as_ref())
            .ok_or(BuildError::MissingArgument(keyword))
    }

    pub fn getter(&mut self, keyword: &'static str) -> Result<Getter<C>, BuildError> {
        match self.take(keyword)? {
            BoundValue::Getter(getter) => Ok(getter),
            BoundValue::GetSetter(path) => Ok(Getter::Path(path)),
            BoundValue::Function(func) => Ok(Getter::Call(func)),
            _ => Err(BuildError::MissingArgument(keyword)),
        }
    }

    pub fn get_setter(&mut self, keyword: &'static str) -> Result<PathAccessor<C>, BuildError> {
        match self.take(keyword)? {
            BoundValue::GetSetter(path) => Ok(path),
            _ => Err(BuildError::MissingArgument(keyword)),
        }
    }

    pub fn function(&mut self, keyword: &'static str) -> Result<ExprFunc<C>, BuildError> {
        match self.take(keyword)? {
            BoundValue::Function(func) => Ok(func),
            _ => Err(BuildError::MissingArgument(keyword)),
        }
    }

    pub fn string(&self, keyword: &'static str) -> Result<String, BuildError> {
        match self.peek(keyword)? {
            BoundValue::String(s) => Ok(s.clone()),
            _ => Err(BuildError::MissingArgument(keyword)),
        }
    }

    pub fn int(&self, keyword: &'static str) -> Result<i64, BuildError> {
        match self.peek(keyword)? {
            BoundValue::Int(i) => Ok(*i),
            _ => Err(BuildError::MissingArgument(keyword)),
        }
    }

    pub fn bool(&self, keyword: &'static str) -> Result<bool, BuildError> {
        match self.peek(keyword)? {
            BoundValue::Bool(b) => Ok(*b),
            _ => Err(BuildError::MissingArgument(keyword)),
        }
    }

    pub fn enum_value(&self, keyword: &'static str) -> Result<i64, BuildError> {
        match self.peek(keyword)? {
            BoundValue::Enum(v) => Ok(*v),
            _ => Err(BuildError::MissingArgument(keyword)),
        }
    }
}

// ============================================================================
// Binder
// ============================================================================

/// Binds `arguments` positionally against `parameters`.
///
/// Arity is checked before any slot, so a call with the wrong number of
/// arguments always fails with [`BindError::WrongArity`]. Positions in
/// errors are zero-based. Paths are resolved against the context kind but
/// never evaluated.
pub fn bind<C: TransformContext>(
    parameters: &'static [Parameter],
    arguments: &[Argument],
    registry: &FunctionRegistry<C>,
) -> Result<BoundArguments<C>, BindError> {
    let min = parameters.iter().filter(|p| p.required).count();
    let max = parameters.len();
    if arguments.len() < min || arguments.len() > max {
        return Err(BindError::WrongArity {
            min,
            max,
            actual: arguments.len(),
        });
    }

    let mut slots = Vec::with_capacity(max);
    for (position, param) in parameters.iter().enumerate() {
        let slot = match arguments.get(position) {
            Some(argument) => Slot {
                keyword: param.keyword,
                value: Some(bind_one(position, param.kind, argument, registry)?),
                explicit: true,
            },
            None => Slot {
                keyword: param.keyword,
                value: param.default.map(|d| default_value(param.kind, d)),
                explicit: false,
            },
        };
        slots.push(slot);
    }
    Ok(BoundArguments { slots })
}

fn default_value<C: TransformContext>(kind: ArgKind, default: ParamDefault) -> BoundValue<C> {
    match (kind, default) {
        (ArgKind::Getter, d) => BoundValue::Getter(Getter::Literal(d.value())),
        (_, ParamDefault::Str(s)) => BoundValue::String(s.to_string()),
        (_, ParamDefault::Int(i)) => BoundValue::Int(i),
        (_, ParamDefault::Bool(b)) => BoundValue::Bool(b),
    }
}

fn bind_one<C: TransformContext>(
    position: usize,
    kind: ArgKind,
    argument: &Argument,
    registry: &FunctionRegistry<C>,
) -> Result<BoundValue<C>, BindError> {
    let wrong_kind = || BindError::WrongArgumentKind {
        position,
        expected: kind,
        found: argument.describe(),
    };
    let bound = match (kind, argument) {
        (ArgKind::Getter, Argument::Literal(literal)) => {
            BoundValue::Getter(Getter::Literal(literal_value(literal)))
        }
        (ArgKind::Getter, Argument::Path(expr)) => {
            BoundValue::Getter(Getter::Path(resolve_path(position, expr)?))
        }
        (ArgKind::Getter, Argument::Enum(symbol)) => {
            BoundValue::Getter(Getter::Literal(Value::Int(resolve_enum::<C>(position, symbol)?)))
        }
        (ArgKind::Getter, Argument::Invocation(inv)) => {
            BoundValue::Getter(Getter::Call(compile_nested(position, inv, registry)?))
        }
        (ArgKind::GetSetter, Argument::Path(expr)) => {
            BoundValue::GetSetter(resolve_path(position, expr)?)
        }
        (ArgKind::String, Argument::Literal(Literal::String(s))) => BoundValue::String(s.clone()),
        (ArgKind::Int, Argument::Literal(Literal::Int(i))) => BoundValue::Int(*i),
        (ArgKind::Bool, Argument::Literal(Literal::Bool(b))) => BoundValue::Bool(*b),
        (ArgKind::Enum, Argument::Enum(symbol)) => {
            BoundValue::Enum(resolve_enum::<C>(position, symbol)?)
        }
        (ArgKind::Function, Argument::Invocation(inv)) => {
            BoundValue::Function(compile_nested(position, inv, registry)?)
        }
        _ => return Err(wrong_kind()),
    };
    Ok(bound)
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::String(s) => Value::Str(s.clone()),
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Double(*f),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Bytes(b) => Value::Bytes(b.clone()),
        Literal::Nil => Value::Absent,
    }
}

fn resolve_path<C: TransformContext>(
    position: usize,
    expr: &super::parser::PathExpr,
) -> Result<PathAccessor<C>, BindError> {
    PathAccessor::resolve(expr).ok_or_else(|| BindError::InvalidPath {
        position,
        path: expr.to_string(),
    })
}

fn resolve_enum<C: TransformContext>(position: usize, symbol: &str) -> Result<i64, BindError> {
    C::parse_enum(symbol).ok_or_else(|| BindError::UnknownEnum {
        position,
        symbol: symbol.to_string(),
    })
}

fn compile_nested<C: TransformContext>(
    position: usize,
    invocation: &super::parser::Invocation,
    registry: &FunctionRegistry<C>,
) -> Result<ExprFunc<C>, BindError> {
    registry
        .compile_invocation(invocation)
        .map_err(|source| BindError::Nested {
            position,
            source: Box::new(source),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::contexts::LogContext;
    use crate::transform::error::CompileError;
    use crate::transform::parser::parse_statement;
    use crate::transform::registry::{expr_func, FunctionFactory};

    const PARAMS: &[Parameter] = &[
        Parameter::required("target", ArgKind::GetSetter),
        Parameter::required("limit", ArgKind::Int),
        Parameter::optional("priority_key", ArgKind::String, ParamDefault::Str("")),
    ];

    const VALUE_PARAMS: &[Parameter] = &[Parameter::required("value", ArgKind::Getter)];

    fn registry() -> FunctionRegistry<LogContext> {
        let mut registry = FunctionRegistry::new();
        registry
            .register(FunctionFactory::new(
                "Echo",
                VALUE_PARAMS,
                |mut args: BoundArguments<LogContext>| {
                    let value = args.getter("value")?;
                    Ok(expr_func(move |ctx: &mut LogContext| value.get(ctx)))
                },
            ))
            .unwrap();
        registry
    }

    fn bind_text(text: &str) -> Result<BoundArguments<LogContext>, BindError> {
        let inv = parse_statement(text).unwrap();
        bind(PARAMS, &inv.arguments, &registry())
    }

    #[test]
    fn omitted_optional_takes_default() {
        let args = bind_text(r#"limit(attributes, 3)"#).unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(args.int("limit").unwrap(), 3);
        assert_eq!(args.string("priority_key").unwrap(), "");
        assert!(args.is_defaulted("priority_key"));
        assert!(!args.is_defaulted("limit"));
    }

    #[test]
    fn explicit_optional_overrides_default() {
        let args = bind_text(r#"limit(attributes, 3, "service")"#).unwrap();
        assert_eq!(args.string("priority_key").unwrap(), "service");
        assert!(!args.is_defaulted("priority_key"));
    }

    #[test]
    fn arity_is_checked_first() {
        for text in ["limit(attributes)", r#"limit(1, 2, "a", "b")"#, "limit()"] {
            match bind_text(text) {
                Err(BindError::WrongArity { min: 2, max: 3, .. }) => {}
                other => panic!("{text}: expected arity error, got {:?}", other.err()),
            }
        }
    }

    #[test]
    fn literal_rejected_for_path_slot() {
        match bind_text(r#"limit("attributes", 3)"#) {
            Err(BindError::WrongArgumentKind {
                position: 0,
                expected: ArgKind::GetSetter,
                found,
            }) => assert_eq!(found, "a string literal"),
            other => panic!("unexpected {:?}", other.err()),
        }
    }

    #[test]
    fn path_rejected_for_int_slot() {
        assert!(matches!(
            bind_text("limit(attributes, attributes)"),
            Err(BindError::WrongArgumentKind { position: 1, expected: ArgKind::Int, .. })
        ));
    }

    #[test]
    fn unknown_path_and_enum() {
        assert!(matches!(
            bind_text("limit(bogus.field, 1)"),
            Err(BindError::InvalidPath { position: 0, .. })
        ));
        let inv = parse_statement("Echo(SEVERITY_NUMBER_NOPE)").unwrap();
        assert!(matches!(
            bind(VALUE_PARAMS, &inv.arguments, &registry()),
            Err(BindError::UnknownEnum { position: 0, .. })
        ));
    }

    #[test]
    fn nested_calls_compile_through_registry() {
        let inv = parse_statement(r#"f(Echo("x"))"#).unwrap();
        let mut args = bind(VALUE_PARAMS, &inv.arguments, &registry()).unwrap();
        let getter = args.getter("value").unwrap();
        let mut ctx = LogContext::new(Default::default(), Default::default(), Default::default());
        assert_eq!(getter.get(&mut ctx).unwrap(), Value::from("x"));

        let inv = parse_statement(r#"f(Missing("x"))"#).unwrap();
        match bind(VALUE_PARAMS, &inv.arguments, &registry()) {
            Err(BindError::Nested { position: 0, source }) => {
                assert!(matches!(*source, CompileError::UnknownFunction(_)))
            }
            other => panic!("unexpected {:?}", other.err()),
        }
    }

    #[test]
    fn wrong_accessor_is_missing_argument() {
        let mut args = bind_text("limit(attributes, 3)").unwrap();
        assert!(matches!(
            args.bool("limit"),
            Err(BuildError::MissingArgument("limit"))
        ));
        assert!(args.get_setter("target").is_ok());
        assert!(matches!(
            args.get_setter("target"),
            Err(BuildError::MissingArgument("target"))
        ));
    }
}
