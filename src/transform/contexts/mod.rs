//! Per-telemetry-kind contexts.
//!
//! A context owns one record (plus its resource and scope) for the duration
//! of a statement pass. Path accessors and function bodies are written once
//! against [`TransformContext`]; each kind decides which fields exist.

mod datapoint;
mod log;
mod metric;
mod span;

pub use datapoint::{DataPointContext, DataPointField};
pub use log::{LogContext, LogField};
pub use metric::{MetricContext, MetricField};
pub use span::{SpanContext, SpanField};

use crate::model::{AttributeMap, InstrumentationScope, Metric, Resource, Value, ValueKind};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Which attribute map a path names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSlot {
    Record,
    Resource,
    Scope,
}

/// Resolved first segment(s) of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathTarget<F> {
    Field(F),
    Attributes(MapSlot),
}

/// Why a context refused a field write. The path accessor adds the path text.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    TypeMismatch {
        expected: &'static str,
        found: ValueKind,
    },
    NotPresent,
    ReadOnly,
    Invalid(String),
}

/// Capability set every telemetry context provides.
pub trait TransformContext: Send + 'static {
    type Field: Copy + fmt::Debug + Send + Sync + 'static;
    /// Record type appended next to the current one by `emit_sibling`.
    type Sibling: Send + 'static;

    const NAME: &'static str;

    /// Resolves the dotted part of a path. `None` means the path does not exist
    /// for this context kind.
    fn resolve_path(fields: &[String]) -> Option<PathTarget<Self::Field>>;

    fn parse_enum(symbol: &str) -> Option<i64> {
        let _ = symbol;
        None
    }

    /// The kind every value of `field` has. `None` when the kind is only
    /// known per record (the log body).
    fn field_kind(field: Self::Field) -> Option<ValueKind>;

    fn get_field(&self, field: Self::Field) -> Value;

    fn set_field(&mut self, field: Self::Field, value: Value) -> Result<(), FieldError>;

    /// In-place access for fields that hold a structured value (the log body).
    fn field_value_mut(&mut self, field: Self::Field) -> Option<&mut Value> {
        let _ = field;
        None
    }

    fn attributes(&self, slot: MapSlot) -> Option<&AttributeMap>;

    fn attributes_mut(&mut self, slot: MapSlot) -> Option<&mut AttributeMap>;

    fn emit_sibling(&mut self, record: Self::Sibling);

    /// Human-readable identity of the record, used in runtime errors.
    fn describe(&self) -> String;
}

/// Contexts positioned on a metric (the metric itself or one of its points).
pub trait MetricAccess: TransformContext<Sibling = Metric> {
    fn metric(&self) -> &Metric;
    fn metric_mut(&mut self) -> &mut Metric;
}

/// Append-only buffer of sibling records emitted while a collection is
/// iterated. Drained into the collection once its pass is over.
#[derive(Debug)]
pub struct SiblingSink<T>(Arc<Mutex<Vec<T>>>);

impl<T> SiblingSink<T> {
    pub fn new() -> Self {
        SiblingSink(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn push(&self, record: T) {
        self.0.lock().push(record);
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.0.lock())
    }
}

impl<T> Clone for SiblingSink<T> {
    fn clone(&self) -> Self {
        SiblingSink(Arc::clone(&self.0))
    }
}

impl<T> Default for SiblingSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Paths shared by every context
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommonField {
    ResourceDroppedAttributesCount,
    ScopeName,
    ScopeVersion,
    ScopeDroppedAttributesCount,
}

pub(crate) fn resolve_common<F>(
    fields: &[&str],
    wrap: impl FnOnce(CommonField) -> F,
) -> Option<PathTarget<F>> {
    let target = match fields {
        ["attributes"] => PathTarget::Attributes(MapSlot::Record),
        ["resource", "attributes"] => PathTarget::Attributes(MapSlot::Resource),
        ["instrumentation_scope", "attributes"] => PathTarget::Attributes(MapSlot::Scope),
        ["resource", "dropped_attributes_count"] => {
            PathTarget::Field(wrap(CommonField::ResourceDroppedAttributesCount))
        }
        ["instrumentation_scope", "name"] => PathTarget::Field(wrap(CommonField::ScopeName)),
        ["instrumentation_scope", "version"] => PathTarget::Field(wrap(CommonField::ScopeVersion)),
        ["instrumentation_scope", "dropped_attributes_count"] => {
            PathTarget::Field(wrap(CommonField::ScopeDroppedAttributesCount))
        }
        _ => return None,
    };
    Some(target)
}

impl CommonField {
    pub(crate) fn kind(self) -> ValueKind {
        match self {
            CommonField::ScopeName | CommonField::ScopeVersion => ValueKind::Str,
            CommonField::ResourceDroppedAttributesCount
            | CommonField::ScopeDroppedAttributesCount => ValueKind::Int,
        }
    }

    pub(crate) fn get(self, resource: &Resource, scope: &InstrumentationScope) -> Value {
        match self {
            CommonField::ResourceDroppedAttributesCount => {
                Value::Int(resource.dropped_attributes_count.into())
            }
            CommonField::ScopeName => Value::Str(scope.name.clone()),
            CommonField::ScopeVersion => Value::Str(scope.version.clone()),
            CommonField::ScopeDroppedAttributesCount => {
                Value::Int(scope.dropped_attributes_count.into())
            }
        }
    }

    pub(crate) fn set(
        self,
        resource: &mut Resource,
        scope: &mut InstrumentationScope,
        value: Value,
    ) -> Result<(), FieldError> {
        match self {
            CommonField::ResourceDroppedAttributesCount => {
                resource.dropped_attributes_count = expect_u32(value)?
            }
            CommonField::ScopeName => scope.name = expect_string(value)?,
            CommonField::ScopeVersion => scope.version = expect_string(value)?,
            CommonField::ScopeDroppedAttributesCount => {
                scope.dropped_attributes_count = expect_u32(value)?
            }
        }
        Ok(())
    }
}

pub(crate) fn split_fields(fields: &[String]) -> Vec<&str> {
    fields.iter().map(String::as_str).collect()
}

pub(crate) fn select_map<'a>(
    slot: MapSlot,
    record: &'a AttributeMap,
    resource: &'a Resource,
    scope: &'a InstrumentationScope,
) -> &'a AttributeMap {
    match slot {
        MapSlot::Record => record,
        MapSlot::Resource => &resource.attributes,
        MapSlot::Scope => &scope.attributes,
    }
}

pub(crate) fn select_map_mut<'a>(
    slot: MapSlot,
    record: &'a mut AttributeMap,
    resource: &'a mut Resource,
    scope: &'a mut InstrumentationScope,
) -> &'a mut AttributeMap {
    match slot {
        MapSlot::Record => record,
        MapSlot::Resource => &mut resource.attributes,
        MapSlot::Scope => &mut scope.attributes,
    }
}

// ============================================================================
// Typed field conversions
// ============================================================================

fn mismatch(expected: &'static str, value: &Value) -> FieldError {
    FieldError::TypeMismatch {
        expected,
        found: value.kind(),
    }
}

pub(crate) fn expect_string(value: Value) -> Result<String, FieldError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(mismatch("string", &other)),
    }
}

pub(crate) fn expect_int(value: Value) -> Result<i64, FieldError> {
    match value {
        Value::Int(i) => Ok(i),
        other => Err(mismatch("int", &other)),
    }
}

pub(crate) fn expect_i32(value: Value) -> Result<i32, FieldError> {
    let i = expect_int(value)?;
    i32::try_from(i).map_err(|_| FieldError::Invalid(format!("{i} does not fit in 32 bits")))
}

pub(crate) fn expect_u32(value: Value) -> Result<u32, FieldError> {
    let i = expect_int(value)?;
    u32::try_from(i)
        .map_err(|_| FieldError::Invalid(format!("{i} is not a valid unsigned 32-bit value")))
}

pub(crate) fn expect_u64(value: Value) -> Result<u64, FieldError> {
    let i = expect_int(value)?;
    u64::try_from(i).map_err(|_| FieldError::Invalid(format!("{i} is negative")))
}

/// Doubles accept ints as well; every i64 has an f64 neighbour.
pub(crate) fn expect_double(value: Value) -> Result<f64, FieldError> {
    match value {
        Value::Double(d) => Ok(d),
        Value::Int(i) => Ok(i as f64),
        other => Err(mismatch("double", &other)),
    }
}

pub(crate) fn expect_bool(value: Value) -> Result<bool, FieldError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(mismatch("bool", &other)),
    }
}

/// Raw id bytes of a fixed length (16 for trace ids, 8 for span ids).
pub(crate) fn expect_id(value: Value, len: usize) -> Result<Vec<u8>, FieldError> {
    match value {
        Value::Bytes(b) if b.len() == len || b.is_empty() => Ok(b),
        Value::Bytes(b) => Err(FieldError::Invalid(format!(
            "id must be {len} bytes, got {}",
            b.len()
        ))),
        other => Err(mismatch("bytes", &other)),
    }
}

/// Hex-encoded id, as read and written through the `.string` paths.
pub(crate) fn expect_hex_id(value: Value, len: usize) -> Result<Vec<u8>, FieldError> {
    let text = expect_string(value)?;
    let bytes = const_hex::decode(&text)
        .map_err(|e| FieldError::Invalid(format!("`{text}` is not a hex id: {e}")))?;
    expect_id(Value::Bytes(bytes), len)
}

pub(crate) fn id_value(id: &[u8]) -> Value {
    Value::Bytes(id.to_vec())
}

pub(crate) fn hex_id_value(id: &[u8]) -> Value {
    Value::Str(const_hex::encode(id))
}

pub(crate) fn u64_value(value: u64) -> Value {
    Value::Int(value as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_paths_resolve() {
        let fields = ["resource", "attributes"];
        assert_eq!(
            resolve_common(&fields, |c| c),
            Some(PathTarget::Attributes(MapSlot::Resource))
        );
        let fields = ["instrumentation_scope", "version"];
        assert_eq!(
            resolve_common(&fields, |c| c),
            Some(PathTarget::Field(CommonField::ScopeVersion))
        );
        assert_eq!(resolve_common(&["resource"], |c| c), None);
    }

    #[test]
    fn common_field_writes_are_typed() {
        let mut resource = Resource::default();
        let mut scope = InstrumentationScope::default();
        CommonField::ScopeName
            .set(&mut resource, &mut scope, Value::from("lib"))
            .unwrap();
        assert_eq!(scope.name, "lib");
        let err = CommonField::ResourceDroppedAttributesCount
            .set(&mut resource, &mut scope, Value::from("x"))
            .unwrap_err();
        assert_eq!(
            err,
            FieldError::TypeMismatch {
                expected: "int",
                found: ValueKind::Str
            }
        );
        assert!(matches!(
            CommonField::ScopeDroppedAttributesCount.set(
                &mut resource,
                &mut scope,
                Value::Int(-1)
            ),
            Err(FieldError::Invalid(_))
        ));
    }

    #[test]
    fn hex_ids_round_trip_through_strings() {
        let id = expect_hex_id(Value::from("0102030405060708"), 8).unwrap();
        assert_eq!(id, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(hex_id_value(&id), Value::from("0102030405060708"));
        assert!(expect_hex_id(Value::from("0102"), 8).is_err());
    }

    #[test]
    fn sibling_sink_shares_buffer_across_clones() {
        let sink = SiblingSink::new();
        let other = sink.clone();
        other.push(1);
        sink.push(2);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.drain(), vec![1, 2]);
        assert!(other.is_empty());
    }
}
