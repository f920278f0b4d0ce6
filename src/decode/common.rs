//! Common conversions shared across the OTLP codecs

use opentelemetry_proto::tonic::common::v1::{
    any_value, AnyValue, ArrayValue, InstrumentationScope as ProtoScope, KeyValue, KeyValueList,
};
use opentelemetry_proto::tonic::resource::v1::Resource as ProtoResource;
use thiserror::Error;

use crate::model::{AttributeMap, InstrumentationScope, Resource, Value};

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur while decoding or encoding OTLP payloads
#[derive(Debug, Error)]
pub enum DecodeError {
    /// JSON (de)serialization failed
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),
    /// Protobuf decoding failed
    #[error("protobuf decode error: {0}")]
    Protobuf(#[from] prost::DecodeError),
    /// Unsupported or invalid payload
    #[error("unsupported payload: {0}")]
    Unsupported(String),
}

// ============================================================================
// Protobuf -> model
// ============================================================================

/// Convert a protobuf Resource into the model. A missing resource decodes as empty.
pub fn resource_from_proto(resource: Option<ProtoResource>) -> Resource {
    resource
        .map(|res| Resource {
            attributes: attributes_from_proto(res.attributes),
            dropped_attributes_count: res.dropped_attributes_count,
        })
        .unwrap_or_default()
}

/// Convert a protobuf InstrumentationScope into the model.
pub fn scope_from_proto(scope: Option<ProtoScope>) -> InstrumentationScope {
    scope
        .map(|scope| InstrumentationScope {
            name: scope.name,
            version: scope.version,
            attributes: attributes_from_proto(scope.attributes),
            dropped_attributes_count: scope.dropped_attributes_count,
        })
        .unwrap_or_default()
}

/// Convert protobuf KeyValues into an AttributeMap. Pairs without a value are skipped.
pub fn attributes_from_proto(attrs: Vec<KeyValue>) -> AttributeMap {
    attrs
        .into_iter()
        .filter_map(|kv| kv.value.map(|v| (kv.key, any_value_from_proto(v))))
        .collect()
}

/// Convert a protobuf AnyValue into a model Value
pub fn any_value_from_proto(av: AnyValue) -> Value {
    match av.value {
        Some(any_value::Value::StringValue(s)) => Value::Str(s),
        Some(any_value::Value::BoolValue(b)) => Value::Bool(b),
        Some(any_value::Value::IntValue(i)) => Value::Int(i),
        Some(any_value::Value::DoubleValue(d)) => Value::Double(d),
        Some(any_value::Value::ArrayValue(arr)) => {
            Value::Slice(arr.values.into_iter().map(any_value_from_proto).collect())
        }
        Some(any_value::Value::KvlistValue(kvlist)) => {
            Value::Map(attributes_from_proto(kvlist.values))
        }
        Some(any_value::Value::BytesValue(bytes)) => Value::Bytes(bytes),
        None => Value::Absent,
    }
}

// ============================================================================
// Model -> protobuf
// ============================================================================

pub fn resource_to_proto(resource: Resource) -> Option<ProtoResource> {
    Some(ProtoResource {
        attributes: attributes_to_proto(resource.attributes),
        dropped_attributes_count: resource.dropped_attributes_count,
        ..Default::default()
    })
}

pub fn scope_to_proto(scope: InstrumentationScope) -> Option<ProtoScope> {
    Some(ProtoScope {
        name: scope.name,
        version: scope.version,
        attributes: attributes_to_proto(scope.attributes),
        dropped_attributes_count: scope.dropped_attributes_count,
    })
}

/// Convert an AttributeMap into protobuf KeyValues, keeping insertion order.
/// Absent entries are dropped.
pub fn attributes_to_proto(attrs: AttributeMap) -> Vec<KeyValue> {
    attrs
        .into_iter()
        .filter_map(|(key, value)| {
            any_value_to_proto(value).map(|v| KeyValue {
                key,
                value: Some(v),
            })
        })
        .collect()
}

/// Convert a model Value into a protobuf AnyValue; `None` for Absent.
pub fn any_value_to_proto(value: Value) -> Option<AnyValue> {
    let inner = match value {
        Value::Str(s) => any_value::Value::StringValue(s),
        Value::Bool(b) => any_value::Value::BoolValue(b),
        Value::Int(i) => any_value::Value::IntValue(i),
        Value::Double(d) => any_value::Value::DoubleValue(d),
        Value::Bytes(bytes) => any_value::Value::BytesValue(bytes),
        Value::Slice(items) => any_value::Value::ArrayValue(ArrayValue {
            values: items.into_iter().filter_map(any_value_to_proto).collect(),
        }),
        Value::Map(map) => any_value::Value::KvlistValue(KeyValueList {
            values: attributes_to_proto(map),
        }),
        Value::Absent => return None,
    };
    Some(AnyValue { value: Some(inner) })
}

// ============================================================================
// JSON utilities
// ============================================================================

/// Quick heuristic to detect whether a payload looks like JSON.
pub fn looks_like_json(body: &[u8]) -> bool {
    body.iter()
        .find(|b| !b.is_ascii_whitespace())
        .map(|b| *b == b'{' || *b == b'[')
        .unwrap_or(false)
}
