//! Editors: functions that rewrite the record in place and return nothing.

use crate::model::{Value, ValueKind};
use crate::transform::arguments::{ArgKind, BoundArguments, ParamDefault, Parameter};
use crate::transform::contexts::TransformContext;
use crate::transform::error::BuildError;
use crate::transform::path::PathAccessor;
use crate::transform::registry::{expr_func, ExprFunc, FunctionFactory};

// --- set ---
const SET_PARAMS: &[Parameter] = &[
    Parameter::required("target", ArgKind::GetSetter),
    Parameter::required("value", ArgKind::Getter),
];

pub fn set<C: TransformContext>() -> FunctionFactory<C> {
    FunctionFactory::new("set", SET_PARAMS, build_set)
}

fn build_set<C: TransformContext>(
    mut args: BoundArguments<C>,
) -> Result<ExprFunc<C>, BuildError> {
    let target = args.get_setter("target")?;
    let value = args.getter("value")?;
    Ok(expr_func(move |ctx: &mut C| {
        let v = value.get(ctx)?;
        target.set(ctx, v)?;
        Ok(Value::Absent)
    }))
}

// --- delete_key ---
const DELETE_KEY_PARAMS: &[Parameter] = &[
    Parameter::required("target", ArgKind::GetSetter),
    Parameter::required("key", ArgKind::String),
];

pub fn delete_key<C: TransformContext>() -> FunctionFactory<C> {
    FunctionFactory::new("delete_key", DELETE_KEY_PARAMS, build_delete_key)
}

fn build_delete_key<C: TransformContext>(
    mut args: BoundArguments<C>,
) -> Result<ExprFunc<C>, BuildError> {
    let target = map_target(&mut args, "target")?;
    let key = args.string("key")?;
    Ok(expr_func(move |ctx: &mut C| {
        target.map_mut(ctx)?.remove(&key);
        Ok(Value::Absent)
    }))
}

// --- truncate_all ---
/// Truncate every string value of a map to at most `limit` bytes.
const TRUNCATE_ALL_PARAMS: &[Parameter] = &[
    Parameter::required("target", ArgKind::GetSetter),
    Parameter::required("limit", ArgKind::Int),
];

pub fn truncate_all<C: TransformContext>() -> FunctionFactory<C> {
    FunctionFactory::new("truncate_all", TRUNCATE_ALL_PARAMS, build_truncate_all)
}

fn build_truncate_all<C: TransformContext>(
    mut args: BoundArguments<C>,
) -> Result<ExprFunc<C>, BuildError> {
    let limit = non_negative_limit(args.int("limit")?)?;
    let target = map_target(&mut args, "target")?;
    Ok(expr_func(move |ctx: &mut C| {
        for (_, value) in target.map_mut(ctx)?.iter_mut() {
            if let Value::Str(s) = value {
                truncate_str(s, limit);
            }
        }
        Ok(Value::Absent)
    }))
}

/// Cuts `s` to at most `limit` bytes. A multi-byte character straddling the
/// limit is dropped whole so the result stays valid UTF-8.
pub(crate) fn truncate_str(s: &mut String, limit: usize) {
    if s.len() <= limit {
        return;
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

// --- limit ---
/// Keep at most `limit` entries of a map. `priority_key`, when present, is
/// kept first; the rest are kept in insertion order.
const LIMIT_PARAMS: &[Parameter] = &[
    Parameter::required("target", ArgKind::GetSetter),
    Parameter::required("limit", ArgKind::Int),
    Parameter::optional("priority_key", ArgKind::String, ParamDefault::Str("")),
];

pub fn limit<C: TransformContext>() -> FunctionFactory<C> {
    FunctionFactory::new("limit", LIMIT_PARAMS, build_limit)
}

fn build_limit<C: TransformContext>(
    mut args: BoundArguments<C>,
) -> Result<ExprFunc<C>, BuildError> {
    let limit = non_negative_limit(args.int("limit")?)?;
    let priority_key = args.string("priority_key")?;
    let target = map_target(&mut args, "target")?;
    Ok(expr_func(move |ctx: &mut C| {
        let map = target.map_mut(ctx)?;
        if map.len() <= limit {
            return Ok(Value::Absent);
        }
        let keep_priority =
            limit > 0 && !priority_key.is_empty() && map.contains_key(&priority_key);
        let mut kept = usize::from(keep_priority);
        map.retain(|key, _| {
            if keep_priority && *key == priority_key {
                return true;
            }
            if kept < limit {
                kept += 1;
                true
            } else {
                false
            }
        });
        Ok(Value::Absent)
    }))
}

/// A settable path that may hold a map. Typed fields of any other kind are
/// refused here rather than on every record.
fn map_target<C: TransformContext>(
    args: &mut BoundArguments<C>,
    keyword: &'static str,
) -> Result<PathAccessor<C>, BuildError> {
    let target = args.get_setter(keyword)?;
    match target.static_kind() {
        Some(kind) if kind != ValueKind::Map => Err(BuildError::InvalidValue {
            argument: keyword,
            message: format!("`{}` holds a {kind} value, expected a map", target.text()),
        }),
        _ => Ok(target),
    }
}

fn non_negative_limit(limit: i64) -> Result<usize, BuildError> {
    usize::try_from(limit).map_err(|_| BuildError::InvalidValue {
        argument: "limit",
        message: format!("must be non-negative, got {limit}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeMap, LogRecord, Resource};
    use crate::transform::contexts::LogContext;
    use crate::transform::error::{CompileError, RuntimeError};
    use crate::transform::parser::parse_statement;
    use crate::transform::registry::FunctionRegistry;

    fn registry() -> FunctionRegistry<LogContext> {
        let mut registry = FunctionRegistry::new();
        for factory in [set(), delete_key(), truncate_all(), limit()] {
            registry.register(factory).unwrap();
        }
        registry
    }

    fn compile(text: &str) -> Result<ExprFunc<LogContext>, CompileError> {
        registry().compile_invocation(&parse_statement(text).unwrap())
    }

    fn ctx(attrs: &[(&str, Value)]) -> LogContext {
        let record = LogRecord {
            attributes: attrs.iter().cloned().collect(),
            ..Default::default()
        };
        LogContext::new(record, Resource::default(), Default::default())
    }

    fn attributes(ctx: LogContext) -> AttributeMap {
        ctx.into_parts().0.attributes
    }

    #[test]
    fn truncate_all_negative_limit_fails_at_build() {
        match compile("truncate_all(attributes, -1)") {
            Err(CompileError::Build {
                function,
                source: BuildError::InvalidValue { argument: "limit", .. },
            }) => assert_eq!(function, "truncate_all"),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("negative limit accepted"),
        }
    }

    #[test]
    fn truncate_all_zero_empties_strings() {
        let func = compile("truncate_all(attributes, 0)").unwrap();
        let mut ctx = ctx(&[("a", Value::from("abc")), ("n", Value::from(12i64))]);
        func(&mut ctx).unwrap();
        let attrs = attributes(ctx);
        assert_eq!(attrs.get("a"), Some(&Value::from("")));
        assert_eq!(attrs.get("n"), Some(&Value::from(12i64)));
    }

    #[test]
    fn truncate_all_leaves_short_values() {
        let func = compile("truncate_all(attributes, 5)").unwrap();
        let mut ctx = ctx(&[
            ("short", Value::from("abcde")),
            ("long", Value::from("abcdefgh")),
        ]);
        func(&mut ctx).unwrap();
        let attrs = attributes(ctx);
        assert_eq!(attrs.get("short"), Some(&Value::from("abcde")));
        assert_eq!(attrs.get("long"), Some(&Value::from("abcde")));
    }

    #[test]
    fn truncate_all_is_idempotent() {
        let func = compile("truncate_all(attributes, 3)").unwrap();
        let mut once = ctx(&[("a", Value::from("abcdef")), ("b", Value::from("xy"))]);
        func(&mut once).unwrap();
        let mut twice = ctx(&[("a", Value::from("abcdef")), ("b", Value::from("xy"))]);
        func(&mut twice).unwrap();
        func(&mut twice).unwrap();
        assert_eq!(attributes(once), attributes(twice));
    }

    #[test]
    fn truncate_all_on_empty_map_is_noop() {
        let func = compile("truncate_all(attributes, 1)").unwrap();
        let mut ctx = ctx(&[]);
        func(&mut ctx).unwrap();
        assert!(attributes(ctx).is_empty());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let mut s = "héllo".to_string();
        truncate_str(&mut s, 2);
        assert_eq!(s, "h");
    }

    #[test]
    fn map_editors_reject_typed_targets_at_build() {
        for text in [
            "truncate_all(severity_text, 1)",
            "limit(time_unix_nano, 1)",
            r#"delete_key(flags, "x")"#,
        ] {
            match compile(text) {
                Err(CompileError::Build {
                    source: BuildError::InvalidValue { argument: "target", .. },
                    ..
                }) => {}
                Err(other) => panic!("{text}: unexpected error {other}"),
                Ok(_) => panic!("{text}: non-map target accepted"),
            }
        }
        assert!(compile("truncate_all(resource.attributes, 1)").is_ok());
        assert!(compile(r#"delete_key(body, "x")"#).is_ok());
    }

    #[test]
    fn truncate_all_on_scalar_attribute_fails_per_record() {
        let func = compile(r#"truncate_all(attributes["scalar"], 1)"#).unwrap();
        let mut ctx = ctx(&[("scalar", Value::from("abc"))]);
        assert!(matches!(
            func(&mut ctx),
            Err(RuntimeError::TypeMismatch { expected: "map", found: ValueKind::Str, .. })
        ));
    }

    #[test]
    fn limit_keeps_priority_key() {
        let func = compile(r#"limit(attributes, 2, "c")"#).unwrap();
        let mut ctx = ctx(&[
            ("a", Value::from(1i64)),
            ("b", Value::from(2i64)),
            ("c", Value::from(3i64)),
        ]);
        func(&mut ctx).unwrap();
        let keys: Vec<_> = attributes(ctx).keys().cloned().collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn limit_zero_clears_map() {
        let func = compile(r#"limit(attributes, 0, "a")"#).unwrap();
        let mut ctx = ctx(&[("a", Value::from(1i64))]);
        func(&mut ctx).unwrap();
        assert!(attributes(ctx).is_empty());
        assert!(compile("limit(attributes, -2)").is_err());
    }

    #[test]
    fn set_and_delete_key() {
        let set_fn = compile(r#"set(attributes["env"], "prod")"#).unwrap();
        let delete_fn = compile(r#"delete_key(attributes, "tmp")"#).unwrap();
        let mut ctx = ctx(&[("tmp", Value::from(true))]);
        set_fn(&mut ctx).unwrap();
        delete_fn(&mut ctx).unwrap();
        let attrs = attributes(ctx);
        assert_eq!(attrs.get("env"), Some(&Value::from("prod")));
        assert!(!attrs.contains_key("tmp"));
    }
}
