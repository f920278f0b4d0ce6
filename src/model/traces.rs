use super::{AttributeMap, InstrumentationScope, Resource};
use opentelemetry_proto::tonic::trace::v1::span::{Event, Link};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TracesData {
    pub resource_spans: Vec<ResourceSpans>,
}

impl TracesData {
    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.resource_spans
            .iter()
            .flat_map(|rs| &rs.scope_spans)
            .flat_map(|ss| &ss.spans)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceSpans {
    pub resource: Resource,
    pub scope_spans: Vec<ScopeSpans>,
    pub schema_url: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScopeSpans {
    pub scope: InstrumentationScope,
    pub spans: Vec<Span>,
    pub schema_url: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpanStatus {
    pub code: i32,
    pub message: String,
}

/// A span. Events and links are carried through untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Span {
    pub trace_id: Vec<u8>,
    pub span_id: Vec<u8>,
    pub trace_state: String,
    pub parent_span_id: Vec<u8>,
    pub flags: u32,
    pub name: String,
    pub kind: i32,
    pub start_time_unix_nano: u64,
    pub end_time_unix_nano: u64,
    pub attributes: AttributeMap,
    pub dropped_attributes_count: u32,
    pub events: Vec<Event>,
    pub dropped_events_count: u32,
    pub links: Vec<Link>,
    pub dropped_links_count: u32,
    pub status: SpanStatus,
}
