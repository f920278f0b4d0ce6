use super::metric::lookup_enum;
use super::{
    expect_hex_id, expect_i32, expect_id, expect_string, expect_u32, expect_u64, hex_id_value,
    id_value, resolve_common, select_map, select_map_mut, split_fields, u64_value, CommonField,
    FieldError, MapSlot, PathTarget, SiblingSink, TransformContext,
};
use crate::model::{AttributeMap, InstrumentationScope, Resource, Span, Value, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanField {
    Name,
    Kind,
    TraceId,
    TraceIdString,
    SpanId,
    SpanIdString,
    ParentSpanId,
    ParentSpanIdString,
    TraceState,
    Flags,
    StartTimeUnixNano,
    EndTimeUnixNano,
    StatusCode,
    StatusMessage,
    DroppedAttributesCount,
    DroppedEventsCount,
    DroppedLinksCount,
    Common(CommonField),
}

const SPAN_ENUMS: &[(&str, i64)] = &[
    ("SPAN_KIND_UNSPECIFIED", 0),
    ("SPAN_KIND_INTERNAL", 1),
    ("SPAN_KIND_SERVER", 2),
    ("SPAN_KIND_CLIENT", 3),
    ("SPAN_KIND_PRODUCER", 4),
    ("SPAN_KIND_CONSUMER", 5),
    ("STATUS_CODE_UNSET", 0),
    ("STATUS_CODE_OK", 1),
    ("STATUS_CODE_ERROR", 2),
];

#[derive(Debug)]
pub struct SpanContext {
    span: Span,
    resource: Resource,
    scope: InstrumentationScope,
    sink: SiblingSink<Span>,
}

impl SpanContext {
    pub fn new(span: Span, resource: Resource, scope: InstrumentationScope) -> Self {
        SpanContext {
            span,
            resource,
            scope,
            sink: SiblingSink::new(),
        }
    }

    pub fn with_sink(mut self, sink: SiblingSink<Span>) -> Self {
        self.sink = sink;
        self
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn into_parts(self) -> (Span, Resource, InstrumentationScope) {
        (self.span, self.resource, self.scope)
    }
}

impl TransformContext for SpanContext {
    type Field = SpanField;
    type Sibling = Span;

    const NAME: &'static str = "span";

    fn resolve_path(fields: &[String]) -> Option<PathTarget<SpanField>> {
        let parts = split_fields(fields);
        let field = match parts.as_slice() {
            ["name"] => SpanField::Name,
            ["kind"] => SpanField::Kind,
            ["trace_id"] => SpanField::TraceId,
            ["trace_id", "string"] => SpanField::TraceIdString,
            ["span_id"] => SpanField::SpanId,
            ["span_id", "string"] => SpanField::SpanIdString,
            ["parent_span_id"] => SpanField::ParentSpanId,
            ["parent_span_id", "string"] => SpanField::ParentSpanIdString,
            ["trace_state"] => SpanField::TraceState,
            ["flags"] => SpanField::Flags,
            ["start_time_unix_nano"] => SpanField::StartTimeUnixNano,
            ["end_time_unix_nano"] => SpanField::EndTimeUnixNano,
            ["status", "code"] => SpanField::StatusCode,
            ["status", "message"] => SpanField::StatusMessage,
            ["dropped_attributes_count"] => SpanField::DroppedAttributesCount,
            ["dropped_events_count"] => SpanField::DroppedEventsCount,
            ["dropped_links_count"] => SpanField::DroppedLinksCount,
            other => return resolve_common(other, SpanField::Common),
        };
        Some(PathTarget::Field(field))
    }

    fn parse_enum(symbol: &str) -> Option<i64> {
        lookup_enum(SPAN_ENUMS, symbol)
    }

    fn field_kind(field: SpanField) -> Option<ValueKind> {
        let kind = match field {
            SpanField::Name
            | SpanField::TraceIdString
            | SpanField::SpanIdString
            | SpanField::ParentSpanIdString
            | SpanField::TraceState
            | SpanField::StatusMessage => ValueKind::Str,
            SpanField::TraceId | SpanField::SpanId | SpanField::ParentSpanId => ValueKind::Bytes,
            SpanField::Kind
            | SpanField::Flags
            | SpanField::StartTimeUnixNano
            | SpanField::EndTimeUnixNano
            | SpanField::StatusCode
            | SpanField::DroppedAttributesCount
            | SpanField::DroppedEventsCount
            | SpanField::DroppedLinksCount => ValueKind::Int,
            SpanField::Common(common) => common.kind(),
        };
        Some(kind)
    }

    fn get_field(&self, field: SpanField) -> Value {
        let span = &self.span;
        match field {
            SpanField::Name => Value::Str(span.name.clone()),
            SpanField::Kind => Value::Int(span.kind.into()),
            SpanField::TraceId => id_value(&span.trace_id),
            SpanField::TraceIdString => hex_id_value(&span.trace_id),
            SpanField::SpanId => id_value(&span.span_id),
            SpanField::SpanIdString => hex_id_value(&span.span_id),
            SpanField::ParentSpanId => id_value(&span.parent_span_id),
            SpanField::ParentSpanIdString => hex_id_value(&span.parent_span_id),
            SpanField::TraceState => Value::Str(span.trace_state.clone()),
            SpanField::Flags => Value::Int(span.flags.into()),
            SpanField::StartTimeUnixNano => u64_value(span.start_time_unix_nano),
            SpanField::EndTimeUnixNano => u64_value(span.end_time_unix_nano),
            SpanField::StatusCode => Value::Int(span.status.code.into()),
            SpanField::StatusMessage => Value::Str(span.status.message.clone()),
            SpanField::DroppedAttributesCount => Value::Int(span.dropped_attributes_count.into()),
            SpanField::DroppedEventsCount => Value::Int(span.dropped_events_count.into()),
            SpanField::DroppedLinksCount => Value::Int(span.dropped_links_count.into()),
            SpanField::Common(common) => common.get(&self.resource, &self.scope),
        }
    }

    fn set_field(&mut self, field: SpanField, value: Value) -> Result<(), FieldError> {
        let span = &mut self.span;
        match field {
            SpanField::Name => span.name = expect_string(value)?,
            SpanField::Kind => span.kind = expect_i32(value)?,
            SpanField::TraceId => span.trace_id = expect_id(value, 16)?,
            SpanField::TraceIdString => span.trace_id = expect_hex_id(value, 16)?,
            SpanField::SpanId => span.span_id = expect_id(value, 8)?,
            SpanField::SpanIdString => span.span_id = expect_hex_id(value, 8)?,
            SpanField::ParentSpanId => span.parent_span_id = expect_id(value, 8)?,
            SpanField::ParentSpanIdString => span.parent_span_id = expect_hex_id(value, 8)?,
            SpanField::TraceState => span.trace_state = expect_string(value)?,
            SpanField::Flags => span.flags = expect_u32(value)?,
            SpanField::StartTimeUnixNano => span.start_time_unix_nano = expect_u64(value)?,
            SpanField::EndTimeUnixNano => span.end_time_unix_nano = expect_u64(value)?,
            SpanField::StatusCode => span.status.code = expect_i32(value)?,
            SpanField::StatusMessage => span.status.message = expect_string(value)?,
            SpanField::DroppedAttributesCount => span.dropped_attributes_count = expect_u32(value)?,
            SpanField::DroppedEventsCount => span.dropped_events_count = expect_u32(value)?,
            SpanField::DroppedLinksCount => span.dropped_links_count = expect_u32(value)?,
            SpanField::Common(common) => common.set(&mut self.resource, &mut self.scope, value)?,
        }
        Ok(())
    }

    fn attributes(&self, slot: MapSlot) -> Option<&AttributeMap> {
        Some(select_map(
            slot,
            &self.span.attributes,
            &self.resource,
            &self.scope,
        ))
    }

    fn attributes_mut(&mut self, slot: MapSlot) -> Option<&mut AttributeMap> {
        Some(select_map_mut(
            slot,
            &mut self.span.attributes,
            &mut self.resource,
            &mut self.scope,
        ))
    }

    fn emit_sibling(&mut self, record: Span) {
        self.sink.push(record);
    }

    fn describe(&self) -> String {
        format!(
            "span `{}` ({})",
            self.span.name,
            const_hex::encode(&self.span.span_id)
        )
    }
}
