//! OTLP trace codec - protobuf messages to and from the model

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::trace::v1 as proto;

use super::common::{
    attributes_from_proto, attributes_to_proto, resource_from_proto, resource_to_proto,
    scope_from_proto, scope_to_proto,
};
use crate::model::{ResourceSpans, ScopeSpans, Span, SpanStatus, TracesData};

// ============================================================================
// Protobuf -> model
// ============================================================================

pub fn from_request(request: ExportTraceServiceRequest) -> TracesData {
    TracesData {
        resource_spans: request
            .resource_spans
            .into_iter()
            .map(|rs| ResourceSpans {
                resource: resource_from_proto(rs.resource),
                scope_spans: rs
                    .scope_spans
                    .into_iter()
                    .map(|ss| ScopeSpans {
                        scope: scope_from_proto(ss.scope),
                        spans: ss.spans.into_iter().map(span_from_proto).collect(),
                        schema_url: ss.schema_url,
                    })
                    .collect(),
                schema_url: rs.schema_url,
            })
            .collect(),
    }
}

fn span_from_proto(span: proto::Span) -> Span {
    let status = span
        .status
        .map(|s| SpanStatus {
            code: s.code,
            message: s.message,
        })
        .unwrap_or_default();
    Span {
        trace_id: span.trace_id,
        span_id: span.span_id,
        trace_state: span.trace_state,
        parent_span_id: span.parent_span_id,
        flags: span.flags,
        name: span.name,
        kind: span.kind,
        start_time_unix_nano: span.start_time_unix_nano,
        end_time_unix_nano: span.end_time_unix_nano,
        attributes: attributes_from_proto(span.attributes),
        dropped_attributes_count: span.dropped_attributes_count,
        events: span.events,
        dropped_events_count: span.dropped_events_count,
        links: span.links,
        dropped_links_count: span.dropped_links_count,
        status,
    }
}

// ============================================================================
// Model -> protobuf
// ============================================================================

pub fn to_request(data: TracesData) -> ExportTraceServiceRequest {
    ExportTraceServiceRequest {
        resource_spans: data
            .resource_spans
            .into_iter()
            .map(|rs| proto::ResourceSpans {
                resource: resource_to_proto(rs.resource),
                scope_spans: rs
                    .scope_spans
                    .into_iter()
                    .map(|ss| proto::ScopeSpans {
                        scope: scope_to_proto(ss.scope),
                        spans: ss.spans.into_iter().map(span_to_proto).collect(),
                        schema_url: ss.schema_url,
                    })
                    .collect(),
                schema_url: rs.schema_url,
            })
            .collect(),
    }
}

fn span_to_proto(span: Span) -> proto::Span {
    proto::Span {
        trace_id: span.trace_id,
        span_id: span.span_id,
        trace_state: span.trace_state,
        parent_span_id: span.parent_span_id,
        flags: span.flags,
        name: span.name,
        kind: span.kind,
        start_time_unix_nano: span.start_time_unix_nano,
        end_time_unix_nano: span.end_time_unix_nano,
        attributes: attributes_to_proto(span.attributes),
        dropped_attributes_count: span.dropped_attributes_count,
        events: span.events,
        dropped_events_count: span.dropped_events_count,
        links: span.links,
        dropped_links_count: span.dropped_links_count,
        status: Some(proto::Status {
            code: span.status.code,
            message: span.status.message,
        }),
        ..Default::default()
    }
}

// ============================================================================
// Tests
// ============================================================================
