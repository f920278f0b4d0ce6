//! Path accessor: read and write a context through a resolved path.

use super::contexts::{FieldError, MapSlot, PathTarget, TransformContext};
use super::error::{PathError, RuntimeError};
use super::parser::{Key, PathExpr};
use crate::model::{AttributeMap, Value, ValueKind};
use std::fmt;

/// A path bound to one context kind. Resolution against the context's field
/// table happens once at bind time; only the keys are walked per call.
pub struct PathAccessor<C: TransformContext> {
    target: PathTarget<C::Field>,
    keys: Vec<Key>,
    text: String,
}

impl<C: TransformContext> Clone for PathAccessor<C> {
    fn clone(&self) -> Self {
        PathAccessor {
            target: self.target,
            keys: self.keys.clone(),
            text: self.text.clone(),
        }
    }
}

impl<C: TransformContext> fmt::Debug for PathAccessor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathAccessor")
            .field("target", &self.target)
            .field("path", &self.text)
            .finish()
    }
}

impl<C: TransformContext> PathAccessor<C> {
    /// `None` when the context kind has no such path.
    pub fn resolve(expr: &PathExpr) -> Option<Self> {
        let target = C::resolve_path(&expr.fields)?;
        Some(PathAccessor {
            target,
            keys: expr.keys.clone(),
            text: expr.to_string(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The kind this path yields on every record, when that is fixed at bind
    /// time. Keyed paths and the log body are only known per record.
    pub fn static_kind(&self) -> Option<ValueKind> {
        if !self.keys.is_empty() {
            return None;
        }
        match self.target {
            PathTarget::Attributes(_) => Some(ValueKind::Map),
            PathTarget::Field(field) => C::field_kind(field),
        }
    }

    pub fn get(&self, ctx: &C) -> Result<Value, RuntimeError> {
        match self.target {
            PathTarget::Attributes(slot) => {
                let map = self.record_map(ctx, slot)?;
                let Some((first, rest)) = self.keys.split_first() else {
                    return Ok(Value::Map(map.clone()));
                };
                let Some(entry) = map.get(self.map_key(first, ValueKind::Map)?) else {
                    return Ok(Value::Absent);
                };
                Ok(lookup(entry, rest, &self.text)?
                    .cloned()
                    .unwrap_or(Value::Absent))
            }
            PathTarget::Field(field) => {
                let value = ctx.get_field(field);
                if self.keys.is_empty() {
                    return Ok(value);
                }
                Ok(lookup(&value, &self.keys, &self.text)?
                    .cloned()
                    .unwrap_or(Value::Absent))
            }
        }
    }

    /// Writes `value` at this path. Writing `Absent` leaves the record as is,
    /// but the container the write would land in must still exist.
    pub fn set(&self, ctx: &mut C, value: Value) -> Result<(), RuntimeError> {
        if value.is_absent() {
            return Ok(self.check_container(ctx)?);
        }
        match self.target {
            PathTarget::Attributes(slot) => {
                let map = self.record_map_mut(ctx, slot)?;
                if self.keys.is_empty() {
                    match value {
                        Value::Map(replacement) => {
                            *map = replacement;
                            Ok(())
                        }
                        other => Err(RuntimeError::TypeMismatch {
                            target: self.text.clone(),
                            expected: "map",
                            found: other.kind(),
                        }),
                    }
                } else {
                    Ok(set_in_map(map, &self.keys, value, &self.text)?)
                }
            }
            PathTarget::Field(field) => {
                if self.keys.is_empty() {
                    return ctx
                        .set_field(field, value)
                        .map_err(|e| self.field_error(e));
                }
                let kind = ctx.get_field(field).kind();
                let root = ctx.field_value_mut(field).ok_or_else(|| PathError::NotIndexable {
                    path: self.text.clone(),
                    kind,
                })?;
                Ok(set_in_value(root, &self.keys, value, &self.text)?)
            }
        }
    }

    /// Mutable access to the map this path names, for editors that rewrite
    /// a map in place.
    pub fn map_mut<'c>(&self, ctx: &'c mut C) -> Result<&'c mut AttributeMap, RuntimeError> {
        let value = match self.target {
            PathTarget::Attributes(slot) => {
                let map = self.record_map_mut(ctx, slot)?;
                let Some((first, rest)) = self.keys.split_first() else {
                    return Ok(map);
                };
                let key = self.map_key(first, ValueKind::Map)?;
                let entry = map
                    .get_mut(key)
                    .ok_or_else(|| self.not_a_map(ValueKind::Absent))?;
                lookup_mut(entry, rest, &self.text)?
            }
            PathTarget::Field(field) => {
                let kind = ctx.get_field(field).kind();
                let root = ctx
                    .field_value_mut(field)
                    .ok_or_else(|| self.not_a_map(kind))?;
                lookup_mut(root, &self.keys, &self.text)?
            }
        };
        match value {
            Some(Value::Map(map)) => Ok(map),
            Some(other) => Err(self.not_a_map(other.kind())),
            None => Err(self.not_a_map(ValueKind::Absent)),
        }
    }

    /// Walks every key but the last, as `set` would, without writing.
    fn check_container(&self, ctx: &C) -> Result<(), PathError> {
        let Some((_, parents)) = self.keys.split_last() else {
            return match self.target {
                PathTarget::Attributes(slot) => self.record_map(ctx, slot).map(|_| ()),
                PathTarget::Field(_) => Ok(()),
            };
        };
        let container = match self.target {
            PathTarget::Attributes(slot) => {
                let map = self.record_map(ctx, slot)?;
                let Some((first, rest)) = parents.split_first() else {
                    return Ok(());
                };
                match map.get(self.map_key(first, ValueKind::Map)?) {
                    Some(entry) => lookup(entry, rest, &self.text)?.cloned(),
                    None => None,
                }
            }
            PathTarget::Field(field) => {
                let root = ctx.get_field(field);
                lookup(&root, parents, &self.text)?.cloned()
            }
        };
        match container {
            Some(Value::Absent) | None => Err(PathError::MissingContainer {
                path: self.text.clone(),
            }),
            Some(_) => Ok(()),
        }
    }

    fn record_map<'c>(&self, ctx: &'c C, slot: MapSlot) -> Result<&'c AttributeMap, PathError> {
        ctx.attributes(slot).ok_or_else(|| PathError::FieldNotPresent {
            path: self.text.clone(),
        })
    }

    fn record_map_mut<'c>(
        &self,
        ctx: &'c mut C,
        slot: MapSlot,
    ) -> Result<&'c mut AttributeMap, PathError> {
        ctx.attributes_mut(slot)
            .ok_or_else(|| PathError::FieldNotPresent {
                path: self.text.clone(),
            })
    }

    fn map_key<'k>(&self, key: &'k Key, kind: ValueKind) -> Result<&'k str, PathError> {
        match key {
            Key::String(s) => Ok(s),
            Key::Int(_) => Err(PathError::KeyMismatch {
                path: self.text.clone(),
                kind,
            }),
        }
    }

    fn not_a_map(&self, found: ValueKind) -> RuntimeError {
        RuntimeError::TypeMismatch {
            target: self.text.clone(),
            expected: "map",
            found,
        }
    }

    fn field_error(&self, err: FieldError) -> RuntimeError {
        match err {
            FieldError::TypeMismatch { expected, found } => RuntimeError::TypeMismatch {
                target: self.text.clone(),
                expected,
                found,
            },
            FieldError::NotPresent => PathError::FieldNotPresent {
                path: self.text.clone(),
            }
            .into(),
            FieldError::ReadOnly => RuntimeError::InvalidValue {
                target: self.text.clone(),
                message: "field is read-only".to_string(),
            },
            FieldError::Invalid(message) => RuntimeError::InvalidValue {
                target: self.text.clone(),
                message,
            },
        }
    }
}

/// Walks `keys` below `value`. `Ok(None)` when a map key is missing.
fn lookup<'v>(value: &'v Value, keys: &[Key], path: &str) -> Result<Option<&'v Value>, PathError> {
    let mut current = value;
    for key in keys {
        current = match (current, key) {
            (Value::Map(map), Key::String(k)) => match map.get(k) {
                Some(next) => next,
                None => return Ok(None),
            },
            (Value::Slice(items), Key::Int(i)) => slice_index(items.len(), *i, path)
                .map(|idx| &items[idx])?,
            (Value::Absent, _) => return Ok(None),
            (Value::Map(_), Key::Int(_)) | (Value::Slice(_), Key::String(_)) => {
                return Err(PathError::KeyMismatch {
                    path: path.to_string(),
                    kind: current.kind(),
                })
            }
            (other, _) => {
                return Err(PathError::NotIndexable {
                    path: path.to_string(),
                    kind: other.kind(),
                })
            }
        };
    }
    Ok(Some(current))
}

fn lookup_mut<'v>(
    value: &'v mut Value,
    keys: &[Key],
    path: &str,
) -> Result<Option<&'v mut Value>, PathError> {
    let Some((key, rest)) = keys.split_first() else {
        return Ok(Some(value));
    };
    let kind = value.kind();
    let next = match (value, key) {
        (Value::Map(map), Key::String(k)) => match map.get_mut(k) {
            Some(next) => next,
            None => return Ok(None),
        },
        (Value::Slice(items), Key::Int(i)) => {
            let idx = slice_index(items.len(), *i, path)?;
            &mut items[idx]
        }
        (Value::Absent, _) => return Ok(None),
        (Value::Map(_), _) | (Value::Slice(_), _) => {
            return Err(PathError::KeyMismatch {
                path: path.to_string(),
                kind,
            })
        }
        _ => {
            return Err(PathError::NotIndexable {
                path: path.to_string(),
                kind,
            })
        }
    };
    lookup_mut(next, rest, path)
}

/// Inserts into `map` at `keys`. The leaf entry is created when missing;
/// intermediate containers must already exist.
fn set_in_map(
    map: &mut AttributeMap,
    keys: &[Key],
    value: Value,
    path: &str,
) -> Result<(), PathError> {
    let Some((first, rest)) = keys.split_first() else {
        return Ok(());
    };
    let Key::String(key) = first else {
        return Err(PathError::KeyMismatch {
            path: path.to_string(),
            kind: ValueKind::Map,
        });
    };
    if rest.is_empty() {
        map.insert(key.clone(), value);
        return Ok(());
    }
    match map.get_mut(key) {
        Some(inner) => set_in_value(inner, rest, value, path),
        None => Err(PathError::MissingContainer {
            path: path.to_string(),
        }),
    }
}

fn set_in_value(
    target: &mut Value,
    keys: &[Key],
    value: Value,
    path: &str,
) -> Result<(), PathError> {
    match target {
        Value::Map(map) => set_in_map(map, keys, value, path),
        Value::Slice(items) => {
            let Some((first, rest)) = keys.split_first() else {
                return Ok(());
            };
            let Key::Int(i) = first else {
                return Err(PathError::KeyMismatch {
                    path: path.to_string(),
                    kind: ValueKind::Slice,
                });
            };
            let idx = slice_index(items.len(), *i, path)?;
            if rest.is_empty() {
                items[idx] = value;
                Ok(())
            } else {
                set_in_value(&mut items[idx], rest, value, path)
            }
        }
        Value::Absent => Err(PathError::MissingContainer {
            path: path.to_string(),
        }),
        other => Err(PathError::NotIndexable {
            path: path.to_string(),
            kind: other.kind(),
        }),
    }
}

fn slice_index(len: usize, index: i64, path: &str) -> Result<usize, PathError> {
    usize::try_from(index)
        .ok()
        .filter(|idx| *idx < len)
        .ok_or_else(|| PathError::IndexOutOfBounds {
            path: path.to_string(),
            index,
            len,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LogRecord, Resource};
    use crate::transform::contexts::LogContext;
    use crate::transform::parser::{parse_statement, Argument};

    fn accessor(text: &str) -> PathAccessor<LogContext> {
        let inv = parse_statement(&format!("f({text})")).unwrap();
        match &inv.arguments[0] {
            Argument::Path(expr) => PathAccessor::resolve(expr).expect("known path"),
            other => panic!("expected path, got {other:?}"),
        }
    }

    fn ctx() -> LogContext {
        let mut nested = AttributeMap::new();
        nested.insert("inner", Value::from("deep"));
        let record = LogRecord {
            attributes: [
                ("http.method", Value::from("GET")),
                ("nested", Value::Map(nested)),
                ("list", Value::Slice(vec![Value::from(1i64), Value::from(2i64)])),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        LogContext::new(record, Resource::default(), Default::default())
    }

    #[test]
    fn missing_attribute_reads_absent() {
        let ctx = ctx();
        assert_eq!(accessor(r#"attributes["nope"]"#).get(&ctx).unwrap(), Value::Absent);
        assert_eq!(
            accessor(r#"attributes["nope"]["deeper"]"#).get(&ctx).unwrap(),
            Value::Absent
        );
    }

    #[test]
    fn nested_reads_walk_maps_and_slices() {
        let ctx = ctx();
        assert_eq!(
            accessor(r#"attributes["nested"]["inner"]"#).get(&ctx).unwrap(),
            Value::from("deep")
        );
        assert_eq!(
            accessor(r#"attributes["list"][1]"#).get(&ctx).unwrap(),
            Value::from(2i64)
        );
        assert!(matches!(
            accessor(r#"attributes["list"][5]"#).get(&ctx),
            Err(RuntimeError::Path(PathError::IndexOutOfBounds { index: 5, len: 2, .. }))
        ));
        assert!(matches!(
            accessor(r#"attributes["http.method"]["x"]"#).get(&ctx),
            Err(RuntimeError::Path(PathError::NotIndexable { .. }))
        ));
    }

    #[test]
    fn set_then_get_observes_write() {
        let mut ctx = ctx();
        let path = accessor(r#"attributes["fresh"]"#);
        path.set(&mut ctx, Value::from(7i64)).unwrap();
        assert_eq!(path.get(&ctx).unwrap(), Value::from(7i64));

        let nested = accessor(r#"attributes["nested"]["added"]"#);
        nested.set(&mut ctx, Value::from(true)).unwrap();
        assert_eq!(nested.get(&ctx).unwrap(), Value::from(true));
    }

    #[test]
    fn set_into_missing_container_fails() {
        let mut ctx = ctx();
        let err = accessor(r#"attributes["missing"]["leaf"]"#)
            .set(&mut ctx, Value::from("x"))
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Path(PathError::MissingContainer { .. })
        ));
        assert_eq!(
            accessor(r#"attributes["missing"]"#).get(&ctx).unwrap(),
            Value::Absent
        );
    }

    #[test]
    fn set_absent_is_noop() {
        let mut ctx = ctx();
        accessor(r#"attributes["http.method"]"#)
            .set(&mut ctx, Value::Absent)
            .unwrap();
        assert_eq!(
            accessor(r#"attributes["http.method"]"#).get(&ctx).unwrap(),
            Value::from("GET")
        );
        accessor(r#"attributes["nested"]["new"]"#)
            .set(&mut ctx, Value::Absent)
            .unwrap();
        assert_eq!(
            accessor(r#"attributes["nested"]["new"]"#).get(&ctx).unwrap(),
            Value::Absent
        );
    }

    #[test]
    fn set_absent_into_missing_container_fails() {
        let mut ctx = ctx();
        for path in [r#"attributes["missing"]["leaf"]"#, r#"body["msg"]"#] {
            let err = accessor(path).set(&mut ctx, Value::Absent).unwrap_err();
            assert!(
                matches!(err, RuntimeError::Path(PathError::MissingContainer { .. })),
                "{path}: {err:?}"
            );
        }
    }

    #[test]
    fn whole_map_write_requires_map() {
        let mut ctx = ctx();
        let err = accessor("attributes")
            .set(&mut ctx, Value::from("flat"))
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::TypeMismatch { expected: "map", found: ValueKind::Str, .. }
        ));
    }

    #[test]
    fn map_mut_reaches_nested_maps() {
        let mut ctx = ctx();
        accessor(r#"attributes["nested"]"#)
            .map_mut(&mut ctx)
            .unwrap()
            .insert("k", Value::from(1i64));
        assert_eq!(
            accessor(r#"attributes["nested"]["k"]"#).get(&ctx).unwrap(),
            Value::from(1i64)
        );
        assert!(accessor(r#"attributes["list"]"#).map_mut(&mut ctx).is_err());
    }

    #[test]
    fn static_kind_known_for_typed_fields() {
        assert_eq!(accessor("attributes").static_kind(), Some(ValueKind::Map));
        assert_eq!(
            accessor("resource.attributes").static_kind(),
            Some(ValueKind::Map)
        );
        assert_eq!(accessor("severity_text").static_kind(), Some(ValueKind::Str));
        assert_eq!(accessor("time_unix_nano").static_kind(), Some(ValueKind::Int));
        assert_eq!(accessor("body").static_kind(), None);
        assert_eq!(accessor(r#"attributes["nested"]"#).static_kind(), None);
    }

    #[test]
    fn typed_field_rejects_wrong_kind() {
        let mut ctx = ctx();
        let err = accessor("severity_text")
            .set(&mut ctx, Value::from(3i64))
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::TypeMismatch { expected: "string", .. }
        ));
    }
}
