//! In-memory telemetry model the transform engine reads and rewrites.
//!
//! The model mirrors the OTLP hierarchy (resource -> scope -> record) but uses
//! owned Rust types with an insertion-ordered attribute map, so statements can
//! mutate records in place. Conversion from and to the wire messages lives in
//! [`crate::decode`].

pub mod logs;
pub mod metrics;
pub mod traces;

use indexmap::IndexMap;
use std::fmt;

pub use logs::{LogRecord, LogsData, ResourceLogs, ScopeLogs};
pub use metrics::{
    AggregationTemporality, Buckets, DataPointFields, DataPointMut, DataPointRef,
    ExponentialHistogram, ExponentialHistogramDataPoint, Gauge, Histogram, HistogramDataPoint,
    Metric, MetricData, MetricType, MetricsData, NumberDataPoint, NumberValue, ResourceMetrics,
    ScopeMetrics, Sum, Summary, SummaryDataPoint, ValueAtQuantile,
};
pub use traces::{ResourceSpans, ScopeSpans, Span, SpanStatus, TracesData};

// ============================================================================
// Value
// ============================================================================

/// A dynamically typed telemetry value.
///
/// `Absent` is distinct from every empty value: an attribute that does not
/// exist reads as `Absent`, never as `Str("")` or `Int(0)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Str(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Map(AttributeMap),
    Slice(Vec<Value>),
    #[default]
    Absent,
}

/// The kind tag of a [`Value`], used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Str,
    Int,
    Double,
    Bool,
    Bytes,
    Map,
    Slice,
    Absent,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Str => "string",
            ValueKind::Int => "int",
            ValueKind::Double => "double",
            ValueKind::Bool => "bool",
            ValueKind::Bytes => "bytes",
            ValueKind::Map => "map",
            ValueKind::Slice => "slice",
            ValueKind::Absent => "absent",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Str(_) => ValueKind::Str,
            Value::Int(_) => ValueKind::Int,
            Value::Double(_) => ValueKind::Double,
            Value::Bool(_) => ValueKind::Bool,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Map(_) => ValueKind::Map,
            Value::Slice(_) => ValueKind::Slice,
            Value::Absent => ValueKind::Absent,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&AttributeMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<AttributeMap> for Value {
    fn from(m: AttributeMap) -> Self {
        Value::Map(m)
    }
}

// ============================================================================
// AttributeMap
// ============================================================================

/// Insertion-ordered attribute map owned by a record, resource or scope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeMap(IndexMap<String, Value>);

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Inserts or replaces `key`. A replaced key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Removes `key`, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn retain(&mut self, keep: impl FnMut(&String, &mut Value) -> bool) {
        self.0.retain(keep)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Value)> {
        self.0.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for AttributeMap {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        AttributeMap(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl IntoIterator for AttributeMap {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// ============================================================================
// Resource / scope
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resource {
    pub attributes: AttributeMap,
    pub dropped_attributes_count: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstrumentationScope {
    pub name: String,
    pub version: String,
    pub attributes: AttributeMap,
    pub dropped_attributes_count: u32,
}
