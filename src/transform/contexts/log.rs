use super::metric::lookup_enum;
use super::{
    expect_hex_id, expect_i32, expect_id, expect_string, expect_u32, expect_u64, hex_id_value,
    id_value, resolve_common, select_map, select_map_mut, split_fields, u64_value, CommonField,
    FieldError, MapSlot, PathTarget, SiblingSink, TransformContext,
};
use crate::model::{AttributeMap, InstrumentationScope, LogRecord, Resource, Value, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogField {
    Body,
    SeverityNumber,
    SeverityText,
    TimeUnixNano,
    ObservedTimeUnixNano,
    Flags,
    TraceId,
    TraceIdString,
    SpanId,
    SpanIdString,
    DroppedAttributesCount,
    Common(CommonField),
}

const SEVERITY_ENUMS: &[(&str, i64)] = &[
    ("SEVERITY_NUMBER_UNSPECIFIED", 0),
    ("SEVERITY_NUMBER_TRACE", 1),
    ("SEVERITY_NUMBER_TRACE2", 2),
    ("SEVERITY_NUMBER_TRACE3", 3),
    ("SEVERITY_NUMBER_TRACE4", 4),
    ("SEVERITY_NUMBER_DEBUG", 5),
    ("SEVERITY_NUMBER_DEBUG2", 6),
    ("SEVERITY_NUMBER_DEBUG3", 7),
    ("SEVERITY_NUMBER_DEBUG4", 8),
    ("SEVERITY_NUMBER_INFO", 9),
    ("SEVERITY_NUMBER_INFO2", 10),
    ("SEVERITY_NUMBER_INFO3", 11),
    ("SEVERITY_NUMBER_INFO4", 12),
    ("SEVERITY_NUMBER_WARN", 13),
    ("SEVERITY_NUMBER_WARN2", 14),
    ("SEVERITY_NUMBER_WARN3", 15),
    ("SEVERITY_NUMBER_WARN4", 16),
    ("SEVERITY_NUMBER_ERROR", 17),
    ("SEVERITY_NUMBER_ERROR2", 18),
    ("SEVERITY_NUMBER_ERROR3", 19),
    ("SEVERITY_NUMBER_ERROR4", 20),
    ("SEVERITY_NUMBER_FATAL", 21),
    ("SEVERITY_NUMBER_FATAL2", 22),
    ("SEVERITY_NUMBER_FATAL3", 23),
    ("SEVERITY_NUMBER_FATAL4", 24),
];

#[derive(Debug)]
pub struct LogContext {
    record: LogRecord,
    resource: Resource,
    scope: InstrumentationScope,
    sink: SiblingSink<LogRecord>,
}

impl LogContext {
    pub fn new(record: LogRecord, resource: Resource, scope: InstrumentationScope) -> Self {
        LogContext {
            record,
            resource,
            scope,
            sink: SiblingSink::new(),
        }
    }

    pub fn with_sink(mut self, sink: SiblingSink<LogRecord>) -> Self {
        self.sink = sink;
        self
    }

    pub fn record(&self) -> &LogRecord {
        &self.record
    }

    pub fn into_parts(self) -> (LogRecord, Resource, InstrumentationScope) {
        (self.record, self.resource, self.scope)
    }
}

impl TransformContext for LogContext {
    type Field = LogField;
    type Sibling = LogRecord;

    const NAME: &'static str = "log";

    fn resolve_path(fields: &[String]) -> Option<PathTarget<LogField>> {
        let parts = split_fields(fields);
        let field = match parts.as_slice() {
            ["body"] => LogField::Body,
            ["severity_number"] => LogField::SeverityNumber,
            ["severity_text"] => LogField::SeverityText,
            ["time_unix_nano"] => LogField::TimeUnixNano,
            ["observed_time_unix_nano"] => LogField::ObservedTimeUnixNano,
            ["flags"] => LogField::Flags,
            ["trace_id"] => LogField::TraceId,
            ["trace_id", "string"] => LogField::TraceIdString,
            ["span_id"] => LogField::SpanId,
            ["span_id", "string"] => LogField::SpanIdString,
            ["dropped_attributes_count"] => LogField::DroppedAttributesCount,
            other => return resolve_common(other, LogField::Common),
        };
        Some(PathTarget::Field(field))
    }

    fn parse_enum(symbol: &str) -> Option<i64> {
        lookup_enum(SEVERITY_ENUMS, symbol)
    }

    fn field_kind(field: LogField) -> Option<ValueKind> {
        let kind = match field {
            LogField::Body => return None,
            LogField::SeverityText | LogField::TraceIdString | LogField::SpanIdString => {
                ValueKind::Str
            }
            LogField::TraceId | LogField::SpanId => ValueKind::Bytes,
            LogField::SeverityNumber
            | LogField::TimeUnixNano
            | LogField::ObservedTimeUnixNano
            | LogField::Flags
            | LogField::DroppedAttributesCount => ValueKind::Int,
            LogField::Common(common) => common.kind(),
        };
        Some(kind)
    }

    fn get_field(&self, field: LogField) -> Value {
        let record = &self.record;
        match field {
            LogField::Body => record.body.clone(),
            LogField::SeverityNumber => Value::Int(record.severity_number.into()),
            LogField::SeverityText => Value::Str(record.severity_text.clone()),
            LogField::TimeUnixNano => u64_value(record.time_unix_nano),
            LogField::ObservedTimeUnixNano => u64_value(record.observed_time_unix_nano),
            LogField::Flags => Value::Int(record.flags.into()),
            LogField::TraceId => id_value(&record.trace_id),
            LogField::TraceIdString => hex_id_value(&record.trace_id),
            LogField::SpanId => id_value(&record.span_id),
            LogField::SpanIdString => hex_id_value(&record.span_id),
            LogField::DroppedAttributesCount => Value::Int(record.dropped_attributes_count.into()),
            LogField::Common(common) => common.get(&self.resource, &self.scope),
        }
    }

    fn set_field(&mut self, field: LogField, value: Value) -> Result<(), FieldError> {
        let record = &mut self.record;
        match field {
            LogField::Body => record.body = value,
            LogField::SeverityNumber => record.severity_number = expect_i32(value)?,
            LogField::SeverityText => record.severity_text = expect_string(value)?,
            LogField::TimeUnixNano => record.time_unix_nano = expect_u64(value)?,
            LogField::ObservedTimeUnixNano => record.observed_time_unix_nano = expect_u64(value)?,
            LogField::Flags => record.flags = expect_u32(value)?,
            LogField::TraceId => record.trace_id = expect_id(value, 16)?,
            LogField::TraceIdString => record.trace_id = expect_hex_id(value, 16)?,
            LogField::SpanId => record.span_id = expect_id(value, 8)?,
            LogField::SpanIdString => record.span_id = expect_hex_id(value, 8)?,
            LogField::DroppedAttributesCount => {
                record.dropped_attributes_count = expect_u32(value)?
            }
            LogField::Common(common) => common.set(&mut self.resource, &mut self.scope, value)?,
        }
        Ok(())
    }

    fn field_value_mut(&mut self, field: LogField) -> Option<&mut Value> {
        match field {
            LogField::Body => Some(&mut self.record.body),
            _ => None,
        }
    }

    fn attributes(&self, slot: MapSlot) -> Option<&AttributeMap> {
        Some(select_map(
            slot,
            &self.record.attributes,
            &self.resource,
            &self.scope,
        ))
    }

    fn attributes_mut(&mut self, slot: MapSlot) -> Option<&mut AttributeMap> {
        Some(select_map_mut(
            slot,
            &mut self.record.attributes,
            &mut self.resource,
            &mut self.scope,
        ))
    }

    fn emit_sibling(&mut self, record: LogRecord) {
        self.sink.push(record);
    }

    fn describe(&self) -> String {
        format!(
            "log record (time_unix_nano={}, severity_number={})",
            self.record.time_unix_nano, self.record.severity_number
        )
    }
}
