//! OTLP log codec - protobuf messages to and from the model

use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::logs::v1 as proto;

use super::common::{
    any_value_from_proto, any_value_to_proto, attributes_from_proto, attributes_to_proto,
    resource_from_proto, resource_to_proto, scope_from_proto, scope_to_proto,
};
use crate::model::{LogRecord, LogsData, ResourceLogs, ScopeLogs, Value};

// ============================================================================
// Protobuf -> model
// ============================================================================

pub fn from_request(request: ExportLogsServiceRequest) -> LogsData {
    LogsData {
        resource_logs: request
            .resource_logs
            .into_iter()
            .map(|rl| ResourceLogs {
                resource: resource_from_proto(rl.resource),
                scope_logs: rl
                    .scope_logs
                    .into_iter()
                    .map(|sl| ScopeLogs {
                        scope: scope_from_proto(sl.scope),
                        log_records: sl.log_records.into_iter().map(record_from_proto).collect(),
                        schema_url: sl.schema_url,
                    })
                    .collect(),
                schema_url: rl.schema_url,
            })
            .collect(),
    }
}

fn record_from_proto(record: proto::LogRecord) -> LogRecord {
    LogRecord {
        time_unix_nano: record.time_unix_nano,
        observed_time_unix_nano: record.observed_time_unix_nano,
        severity_number: record.severity_number,
        severity_text: record.severity_text,
        body: record.body.map(any_value_from_proto).unwrap_or(Value::Absent),
        attributes: attributes_from_proto(record.attributes),
        dropped_attributes_count: record.dropped_attributes_count,
        flags: record.flags,
        trace_id: record.trace_id,
        span_id: record.span_id,
    }
}

// ============================================================================
// Model -> protobuf
// ============================================================================

pub fn to_request(data: LogsData) -> ExportLogsServiceRequest {
    ExportLogsServiceRequest {
        resource_logs: data
            .resource_logs
            .into_iter()
            .map(|rl| proto::ResourceLogs {
                resource: resource_to_proto(rl.resource),
                scope_logs: rl
                    .scope_logs
                    .into_iter()
                    .map(|sl| proto::ScopeLogs {
                        scope: scope_to_proto(sl.scope),
                        log_records: sl.log_records.into_iter().map(record_to_proto).collect(),
                        schema_url: sl.schema_url,
                    })
                    .collect(),
                schema_url: rl.schema_url,
            })
            .collect(),
    }
}

fn record_to_proto(record: LogRecord) -> proto::LogRecord {
    proto::LogRecord {
        time_unix_nano: record.time_unix_nano,
        observed_time_unix_nano: record.observed_time_unix_nano,
        severity_number: record.severity_number,
        severity_text: record.severity_text,
        body: any_value_to_proto(record.body),
        attributes: attributes_to_proto(record.attributes),
        dropped_attributes_count: record.dropped_attributes_count,
        flags: record.flags,
        trace_id: record.trace_id,
        span_id: record.span_id,
        ..Default::default()
    }
}

// ============================================================================
// Tests
// ============================================================================
